// libris-api: Async Rust client for the Libris library-management REST API.
//
// The client holds a shared bearer header owned by the `SessionStore`.
// Every response passes through one interceptor that tears the session
// down on 401/403 and publishes an `AuthEvent` for whoever drives
// navigation. Endpoint groups live in their own modules as `impl ApiClient`
// blocks.

pub mod account;
pub mod auth;
pub mod books;
pub mod borrowings;
pub mod client;
pub mod dashboards;
pub mod error;
pub mod models;
pub mod session;
pub mod transport;

pub use auth::{AuthEvent, AuthHeader, Capability, Role};
pub use client::ApiClient;
pub use error::{Error, Operation};
pub use models::{
    ActiveBorrowing, Book, BookChanges, BookInput, BookRef, BorrowRecord, BorrowingStatus,
    EntityId, LibrarianDashboard, MemberBorrowing, MemberDashboard, MemberRef, OverdueBookItem,
    OverdueMember, SignUpRequest,
};
pub use session::{
    MemoryStorage, ROLE_KEY, Session, SessionChange, SessionStorage, SessionStore, StorageError,
    StorageEvent, Subscription, TOKEN_KEY,
};
pub use transport::{TlsMode, TransportConfig};
