use reqwest::StatusCode;
use strum::{Display, EnumIter};
use thiserror::Error;

use crate::session::StorageError;

/// Top-level error type for the `libris-api` crate.
///
/// Covers every failure mode of a single request: authorization, transport,
/// server-side rejection and decoding. `libris-core` maps these into
/// operation-aware errors with user-facing messages.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authorization ───────────────────────────────────────────────
    /// The server answered 401 or 403. The local session has already been
    /// cleared by the time this is returned.
    #[error("Unauthorized (HTTP {status})")]
    Unauthorized {
        status: StatusCode,
        message: Option<String>,
    },

    /// A 200 login response did not carry a token.
    #[error("Login response did not include an auth token")]
    MissingToken,

    // ── Server ──────────────────────────────────────────────────────
    /// Non-success status from the server, with the message it supplied.
    #[error("API error (HTTP {status}): {}", .message.as_deref().unwrap_or("no message"))]
    Api {
        status: StatusCode,
        message: Option<String>,
    },

    /// A success status the operation does not accept (e.g. 202 on create).
    #[error("Unexpected status {status} (expected one of {expected:?})")]
    UnexpectedStatus {
        status: StatusCode,
        expected: Vec<u16>,
    },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The base URL cannot carry path segments (e.g. `mailto:`).
    #[error("Base URL cannot be used for API requests: {0}")]
    InvalidBaseUrl(String),

    /// TLS setup or client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// Session storage rejected a write during login.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl Error {
    /// Returns `true` if the server refused the credential (401/403).
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Returns `true` for a 5xx answer.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Api { status, .. } if status.is_server_error())
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Unauthorized { status, .. }
            | Self::Api { status, .. }
            | Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::Transport(e) => e.status(),
            _ => None,
        }
    }

    /// The message supplied by the server in the response body.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } | Self::Unauthorized { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Message to show a user: the server's message, then the transport
    /// message, then the operation's default.
    pub fn user_message(&self, operation: Operation) -> String {
        if let Some(message) = self.server_message().filter(|m| !m.trim().is_empty()) {
            return message.to_owned();
        }
        match self {
            Self::Transport(e) => e.to_string(),
            _ => operation.default_message().to_owned(),
        }
    }
}

/// Every request the client can make, used to pick default failure messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum Operation {
    Login,
    Logout,
    SignUp,
    ListBooks,
    GetBook,
    CreateBook,
    UpdateBook,
    DeleteBook,
    BorrowBook,
    ReturnBorrowing,
    CurrentBorrowings,
    LibrarianDashboard,
    MemberDashboard,
}

impl Operation {
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::Login => "Login failed",
            Self::Logout => "Logout failed",
            Self::SignUp => "Sign up failed",
            Self::ListBooks => "Failed to fetch books",
            Self::GetBook => "Failed to fetch book",
            Self::CreateBook => "Failed to create book",
            Self::UpdateBook => "Failed to update book",
            Self::DeleteBook => "Failed to delete book",
            Self::BorrowBook => "Failed to borrow book",
            Self::ReturnBorrowing => "Failed to mark as returned",
            Self::CurrentBorrowings => "Failed to fetch current borrowings",
            Self::LibrarianDashboard | Self::MemberDashboard => "Failed to fetch dashboard",
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// Accepts `{"message": ..}`, `{"error": ..}` and `{"errors": [..]}`; any
/// other body yields `None`.
pub(crate) fn parse_server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let text = |v: &serde_json::Value| v.as_str().map(str::to_owned);

    if let Some(message) = value.get("message").and_then(text) {
        return Some(message);
    }
    if let Some(message) = value.get("error").and_then(text) {
        return Some(message);
    }
    let joined = value
        .get("errors")?
        .as_array()?
        .iter()
        .filter_map(serde_json::Value::as_str)
        .collect::<Vec<_>>()
        .join("; ");
    (!joined.is_empty()).then_some(joined)
}
