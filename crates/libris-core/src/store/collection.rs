// ── Ordered collection ──
//
// A list of entities in server order held in a `watch` channel, so readers
// get cheap `Arc` snapshots. Mutations go through `modify`, which hands the
// closure a private copy-on-write vector.

use std::sync::Arc;

use libris_api::{ActiveBorrowing, Book, EntityId};
use tokio::sync::watch;

/// Entities addressable by id.
pub trait Keyed {
    fn key(&self) -> &EntityId;
}

impl Keyed for Book {
    fn key(&self) -> &EntityId {
        &self.id
    }
}

impl Keyed for ActiveBorrowing {
    fn key(&self) -> &EntityId {
        &self.id
    }
}

/// Ordered list of `T`.
pub struct Collection<T: Keyed + Clone + Send + Sync + 'static> {
    /// Full snapshot; every mutation publishes a new one.
    snapshot: watch::Sender<Arc<Vec<T>>>,

    /// Set once the list has been replaced wholesale from the server.
    loaded: watch::Sender<bool>,
}

impl<T: Keyed + Clone + Send + Sync + 'static> Collection<T> {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        let (loaded, _) = watch::channel(false);
        Self { snapshot, loaded }
    }

    /// Replace the whole list (after a fetch).
    pub fn replace_all(&self, items: Vec<T>) {
        self.snapshot.send_replace(Arc::new(items));
        self.loaded.send_replace(true);
    }

    /// Run `f` against the list. A new snapshot is published only when `f`
    /// returns `true`.
    pub fn modify<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut Vec<T>) -> bool,
    {
        self.snapshot
            .send_if_modified(|snap| f(Arc::make_mut(snap)))
    }

    pub fn get(&self, id: &EntityId) -> Option<T> {
        self.snapshot
            .borrow()
            .iter()
            .find(|item| item.key() == id)
            .cloned()
    }

    /// Current snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<Vec<T>> {
        self.snapshot.borrow().clone()
    }

    /// Whether a server list has been stored. An empty loaded list is
    /// still loaded.
    pub fn is_loaded(&self) -> bool {
        *self.loaded.borrow()
    }

    pub fn len(&self) -> usize {
        self.snapshot.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Keyed + Clone + Send + Sync + 'static> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn book(id: &str) -> Book {
        Book {
            id: EntityId::from(id),
            title: format!("Book {id}"),
            author: "Anon".into(),
            genre: String::new(),
            isbn: String::new(),
            total_copies: 1,
            borrowings_count: 0,
        }
    }

    #[test]
    fn replace_and_lookup() {
        let books = Collection::new();
        assert!(!books.is_loaded());
        books.replace_all(vec![book("1"), book("2")]);

        assert_eq!(books.len(), 2);
        assert_eq!(books.get(&EntityId::from("1")).unwrap().title, "Book 1");
        assert!(books.get(&EntityId::from("9")).is_none());
        assert!(books.is_loaded());
    }

    #[test]
    fn empty_server_list_counts_as_loaded() {
        let books: Collection<Book> = Collection::new();
        books.replace_all(Vec::new());
        assert!(books.is_empty());
        assert!(books.is_loaded());
    }

    #[test]
    fn modify_copies_on_write() {
        let books = Collection::new();
        books.replace_all(vec![book("1")]);
        let before = books.snapshot();

        assert!(!books.modify(|_| false));
        assert!(books.modify(|v| {
            v.push(book("2"));
            true
        }));
        // Old snapshots are never mutated in place.
        assert_eq!(before.len(), 1);
        assert_eq!(books.len(), 2);
    }
}
