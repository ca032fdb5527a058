//! Business logic between `libris-api` and front ends.
//!
//! - **[`Coordinator`]**: Per-view owner of the book list, current
//!   borrowings and dashboard payloads. Runs mutating [`Action`]s with a
//!   per-target in-flight flag, reconciles results through one policy table
//!   ([`action::reduce`]) and publishes [`Notification`]s.
//!
//! - **[`AccountService`]**: Login, sign-up and logout flows. Logout always
//!   clears the local session, even when the server call fails.
//!
//! - **Status engine** ([`status`]): Pure derivations over borrowing
//!   records: overdue / active / due today, availability of a book, counts.
//!   [`dashboard`] builds member and librarian projections from them.
//!
//! - **[`Navigator`]**: Current view plus the redirect rules: login on an
//!   invalidated session, guest-only and session-only views.
//!
//! - **[`Collection<T>`]**: Ordered list storage built on
//!   `tokio::sync::watch`.

pub mod account;
pub mod action;
pub mod config;
pub mod coordinator;
pub mod dashboard;
pub mod error;
pub mod model;
pub mod navigation;
pub mod notify;
pub mod status;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use account::AccountService;
pub use action::{Action, ActionKind, Effect, Outcome, Policy, RefreshTarget, Target};
pub use config::{ClientConfig, LoginCredentials, TlsVerification};
pub use coordinator::{Applied, Coordinator};
pub use dashboard::{LibrarianSnapshot, MemberSnapshot};
pub use error::CoreError;
pub use model::BookQuery;
pub use navigation::{Navigator, View};
pub use notify::{Level, Notification, Notifier};
pub use status::{Availability, BorrowingCounts, DueTracked};
pub use store::{ActionKey, Collection, InFlight, InFlightGuard, Keyed};

// Re-export the wire types used throughout the public API.
pub use libris_api::{
    ActiveBorrowing, ApiClient, AuthEvent, Book, BookChanges, BookInput, BookRef, BorrowRecord,
    BorrowingStatus, Capability, EntityId, LibrarianDashboard, MemberBorrowing, MemberDashboard,
    MemberRef, Operation, OverdueBookItem, OverdueMember, Role, Session, SessionChange,
    SessionStore, SignUpRequest, Subscription,
};
