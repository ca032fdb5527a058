// ── Mutating actions and their reconciliation policy ──
//
// Every action maps to exactly one request and one policy. The policy says
// how the local book list follows the server's answer; `reduce` applies it
// without touching the network.

use std::fmt;

use libris_api::{Book, BookChanges, BookInput, EntityId, Operation};
use strum::{Display, EnumIter};

use crate::store::ActionKey;

/// A mutation a view can request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CreateBook(BookInput),
    UpdateBook { id: EntityId, changes: BookChanges },
    DeleteBook { id: EntityId },
    BorrowBook { id: EntityId },
    ReturnBorrowing { id: EntityId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum ActionKind {
    CreateBook,
    UpdateBook,
    DeleteBook,
    BorrowBook,
    ReturnBorrowing,
}

/// What an action is aimed at, for per-target loading flags.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// A book that does not exist yet. Creates share this slot.
    NewBook,
    Book(EntityId),
    Borrowing(EntityId),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NewBook => f.write_str("new book"),
            Self::Book(id) => write!(f, "book {id}"),
            Self::Borrowing(id) => write!(f, "borrowing {id}"),
        }
    }
}

/// Data a view re-fetches after an action whose effect it cannot patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum RefreshTarget {
    Books,
    LibrarianDashboard,
    MemberDashboard,
    CurrentBorrowings,
}

/// How the local book list follows a successful action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Put the server's entity at the front.
    Prepend,
    /// Swap in the server's entity at the same position.
    ReplaceById,
    RemoveById,
    /// Bump `borrowings_count` by one; nothing else changes.
    IncrementBorrowings,
    /// Leave the list alone and re-fetch these.
    Refetch(&'static [RefreshTarget]),
}

const AFTER_RETURN: &[RefreshTarget] = &[
    RefreshTarget::LibrarianDashboard,
    RefreshTarget::CurrentBorrowings,
];

impl ActionKind {
    pub const fn policy(self) -> Policy {
        match self {
            Self::CreateBook => Policy::Prepend,
            Self::UpdateBook => Policy::ReplaceById,
            Self::DeleteBook => Policy::RemoveById,
            Self::BorrowBook => Policy::IncrementBorrowings,
            Self::ReturnBorrowing => Policy::Refetch(AFTER_RETURN),
        }
    }

    pub const fn operation(self) -> Operation {
        match self {
            Self::CreateBook => Operation::CreateBook,
            Self::UpdateBook => Operation::UpdateBook,
            Self::DeleteBook => Operation::DeleteBook,
            Self::BorrowBook => Operation::BorrowBook,
            Self::ReturnBorrowing => Operation::ReturnBorrowing,
        }
    }
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::CreateBook(_) => ActionKind::CreateBook,
            Self::UpdateBook { .. } => ActionKind::UpdateBook,
            Self::DeleteBook { .. } => ActionKind::DeleteBook,
            Self::BorrowBook { .. } => ActionKind::BorrowBook,
            Self::ReturnBorrowing { .. } => ActionKind::ReturnBorrowing,
        }
    }

    pub fn target(&self) -> Target {
        match self {
            Self::CreateBook(_) => Target::NewBook,
            Self::UpdateBook { id, .. } | Self::DeleteBook { id } | Self::BorrowBook { id } => {
                Target::Book(id.clone())
            }
            Self::ReturnBorrowing { id } => Target::Borrowing(id.clone()),
        }
    }

    pub fn key(&self) -> ActionKey {
        ActionKey::new(self.kind(), self.target())
    }

    pub fn policy(&self) -> Policy {
        self.kind().policy()
    }

    pub fn operation(&self) -> Operation {
        self.kind().operation()
    }
}

/// What the server confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Created or updated entity as returned by the server.
    Book(Book),
    Deleted(EntityId),
    Borrowed(EntityId),
    Returned(EntityId),
}

/// What `reduce` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Effect {
    Patched,
    /// Nothing matched (e.g. the book is not in this view's list).
    #[default]
    Unchanged,
    Refetch(&'static [RefreshTarget]),
}

impl Effect {
    pub fn changed(self) -> bool {
        self == Self::Patched
    }
}

/// Apply `policy` for `outcome` to `books`.
///
/// Outcomes that do not fit the policy leave the list untouched.
pub fn reduce(books: &mut Vec<Book>, policy: Policy, outcome: &Outcome) -> Effect {
    match (policy, outcome) {
        (Policy::Prepend, Outcome::Book(book)) => {
            // A duplicate id would mean the create raced a refetch.
            books.retain(|b| b.id != book.id);
            books.insert(0, book.clone());
            Effect::Patched
        }
        (Policy::ReplaceById, Outcome::Book(book)) => {
            match books.iter_mut().find(|b| b.id == book.id) {
                Some(slot) => {
                    *slot = book.clone();
                    Effect::Patched
                }
                None => Effect::Unchanged,
            }
        }
        (Policy::RemoveById, Outcome::Deleted(id)) => {
            let before = books.len();
            books.retain(|b| &b.id != id);
            if books.len() == before {
                Effect::Unchanged
            } else {
                Effect::Patched
            }
        }
        (Policy::IncrementBorrowings, Outcome::Borrowed(id)) => {
            match books.iter_mut().find(|b| &b.id == id) {
                Some(book) => {
                    book.borrowings_count = book.borrowings_count.saturating_add(1);
                    Effect::Patched
                }
                None => Effect::Unchanged,
            }
        }
        (Policy::Refetch(targets), _) => Effect::Refetch(targets),
        _ => Effect::Unchanged,
    }
}
