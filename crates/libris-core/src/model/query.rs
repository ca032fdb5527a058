use libris_api::Book;

/// Case-insensitive substring search over title, author, genre and ISBN.
///
/// An empty or whitespace-only query matches every book.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookQuery {
    needle: String,
}

impl BookQuery {
    pub fn new(text: &str) -> Self {
        Self {
            needle: text.trim().to_lowercase(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.needle.is_empty()
    }

    pub fn matches(&self, book: &Book) -> bool {
        if self.needle.is_empty() {
            return true;
        }
        [&book.title, &book.author, &book.genre, &book.isbn]
            .iter()
            .any(|field| field.to_lowercase().contains(&self.needle))
    }

    pub fn filter<'a, I>(&self, books: I) -> Vec<&'a Book>
    where
        I: IntoIterator<Item = &'a Book>,
    {
        books.into_iter().filter(|b| self.matches(b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use libris_api::EntityId;

    use super::*;

    fn book(id: &str, title: &str, author: &str, genre: &str, isbn: &str) -> Book {
        Book {
            id: EntityId::from(id),
            title: title.into(),
            author: author.into(),
            genre: genre.into(),
            isbn: isbn.into(),
            total_copies: 1,
            borrowings_count: 0,
        }
    }

    #[test]
    fn searches_every_field_case_insensitively() {
        let books = vec![
            book("1", "Dune", "Frank Herbert", "Science Fiction", "9780441013593"),
            book("2", "Emma", "Jane Austen", "Romance", "9780141439587"),
        ];

        let ids = |q: &str| -> Vec<String> {
            BookQuery::new(q)
                .filter(&books)
                .iter()
                .map(|b| b.id.to_string())
                .collect()
        };

        assert_eq!(ids("dune"), ["1"]);
        assert_eq!(ids("AUSTEN"), ["2"]);
        assert_eq!(ids("fiction"), ["1"]);
        assert_eq!(ids("0141"), ["2"]);
        assert_eq!(ids("  "), ["1", "2"]);
        assert!(ids("tolkien").is_empty());
    }
}
