//! Book catalog command handlers.

use libris_core::model::is_valid_isbn;
use libris_core::status::{availability, remaining_copies};
use libris_core::{Applied, Book, BookChanges, BookInput, BookQuery, Capability, View};
use tabled::Tabled;

use crate::cli::{BooksArgs, BooksCommand};
use crate::error::CliError;
use crate::output;
use crate::shell::Shell;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct BookRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Author")]
    author: String,
    #[tabled(rename = "Genre")]
    genre: String,
    #[tabled(rename = "Available")]
    copies: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&Book> for BookRow {
    fn from(b: &Book) -> Self {
        Self {
            id: b.id.to_string(),
            title: b.title.clone(),
            author: b.author.clone(),
            genre: b.genre.clone(),
            copies: format!("{}/{}", remaining_copies(b), b.total_copies),
            status: availability(b).to_string(),
        }
    }
}

fn detail(b: &Book) -> String {
    [
        format!("ID:        {}", b.id),
        format!("Title:     {}", b.title),
        format!("Author:    {}", b.author),
        format!("Genre:     {}", b.genre),
        format!("ISBN:      {}", b.isbn),
        format!("Copies:    {}", b.total_copies),
        format!("Borrowed:  {}", b.borrowings_count),
        format!("Available: {} ({})", remaining_copies(b), availability(b)),
    ]
    .join("\n")
}

fn check_isbn(isbn: &str) -> Result<(), CliError> {
    if is_valid_isbn(isbn) {
        Ok(())
    } else {
        Err(CliError::Validation {
            field: "isbn".into(),
            reason: format!("'{isbn}' is not a valid ISBN-10 or ISBN-13"),
        })
    }
}

fn print_book(shell: &Shell, book: &Book) -> Result<(), CliError> {
    let presentation = shell.presentation;
    let out = output::render_single(presentation.output, book, detail, |b| b.id.to_string())?;
    output::print_output(&out, presentation.quiet);
    Ok(())
}

pub async fn handle(shell: &mut Shell, args: BooksArgs) -> Result<(), CliError> {
    let coordinator = shell.require(View::Books)?.clone();
    let presentation = shell.presentation;

    match args.command {
        BooksCommand::List { search } => {
            let books = coordinator.load_books().await?;
            let query = BookQuery::new(search.as_deref().unwrap_or_default());
            let shown: Vec<Book> = query.filter(books.iter()).into_iter().cloned().collect();
            let out = output::render_list(presentation.output, &shown, |b| BookRow::from(b), |b| {
                b.id.to_string()
            })?;
            output::print_output(&out, presentation.quiet);
            Ok(())
        }

        BooksCommand::Show { id } => {
            let id = util::entity_id(&id, "id")?;
            let book = coordinator.load_book(&id).await?;
            print_book(shell, &book)
        }

        BooksCommand::Create {
            title,
            author,
            genre,
            isbn,
            copies,
        } => {
            util::require_capability(shell, Capability::ManageCatalog, "add books")?;
            check_isbn(&isbn)?;
            let input = BookInput {
                title,
                author,
                genre,
                isbn,
                total_copies: copies,
            };
            coordinator.create_book(input).await?;
            if let Some(book) = coordinator.books().first() {
                print_book(shell, book)?;
            }
            Ok(())
        }

        BooksCommand::Update {
            id,
            title,
            author,
            genre,
            isbn,
            copies,
        } => {
            util::require_capability(shell, Capability::ManageCatalog, "edit books")?;
            let id = util::entity_id(&id, "id")?;
            if let Some(ref isbn) = isbn {
                check_isbn(isbn)?;
            }
            let changes = BookChanges {
                title,
                author,
                genre,
                isbn,
                total_copies: copies,
            };
            if changes.is_empty() {
                return Err(CliError::Validation {
                    field: "update".into(),
                    reason: "nothing to change; pass at least one of --title, --author, \
                             --genre, --isbn or --copies"
                        .into(),
                });
            }
            coordinator.update_book(id.clone(), changes).await?;
            if let Some(book) = coordinator.book(&id) {
                print_book(shell, &book)?;
            }
            Ok(())
        }

        BooksCommand::Delete { id } => {
            util::require_capability(shell, Capability::ManageCatalog, "delete books")?;
            let id = util::entity_id(&id, "id")?;
            if !util::confirm(shell, &format!("Delete book {id}?"), "books delete")? {
                return Ok(());
            }
            coordinator.delete_book(id).await?;
            Ok(())
        }

        BooksCommand::Borrow { id } => {
            util::require_capability(shell, Capability::BorrowBooks, "borrow books")?;
            let id = util::entity_id(&id, "id")?;
            if coordinator.borrow_book(id.clone()).await? == Applied::Patched {
                if let Some(book) = coordinator.book(&id) {
                    print_book(shell, &book)?;
                }
            }
            Ok(())
        }
    }
}
