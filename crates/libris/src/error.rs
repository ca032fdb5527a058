//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use libris_config::ConfigError;
use libris_core::CoreError;
use miette::Diagnostic;
use thiserror::Error;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const REJECTED: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const BUSY: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(libris::connection_failed),
        help(
            "Check that the server is running and reachable.\n\
             Override the address with --api-url or LIBRIS_API_URL."
        )
    )]
    ConnectionFailed { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(libris::auth), help("Run: login"))]
    SessionExpired { message: String },

    #[error("Not logged in")]
    #[diagnostic(code(libris::not_logged_in), help("Run: login <email>"))]
    NotLoggedIn,

    #[error("A {role} account cannot {action}")]
    #[diagnostic(
        code(libris::not_permitted),
        help("Log in with an account whose role allows this.")
    )]
    NotPermitted { action: String, role: String },

    #[error("No password available for {email}")]
    #[diagnostic(
        code(libris::no_credentials),
        help(
            "Set LIBRIS_PASSWORD, set password_env in your profile,\n\
             or run the shell in a terminal to be prompted."
        )
    )]
    NoPassword { email: String },

    #[error("No email given")]
    #[diagnostic(
        code(libris::no_email),
        help("Pass one: login <email>, or set email in your profile.")
    )]
    NoEmail,

    // ── Server answers ───────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(libris::rejected))]
    Rejected { message: String },

    #[error("{message}")]
    #[diagnostic(code(libris::server_error), help("The server failed; try again later."))]
    Server { message: String },

    #[error("{message}")]
    #[diagnostic(code(libris::busy), help("Wait for the running request to finish."))]
    Busy { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(libris::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(libris::config),
        help("Check the configuration file or pass --api-url.")
    )]
    Config(#[from] ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(libris::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::SessionExpired { .. }
            | Self::NotLoggedIn
            | Self::NoPassword { .. }
            | Self::NoEmail => exit_code::AUTH,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::NotPermitted { .. } => exit_code::PERMISSION,
            Self::Busy { .. } => exit_code::BUSY,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Whether a notification already told the user about this failure.
    pub fn was_notified(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::Rejected { .. } | Self::Server { .. }
        )
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let message = err.user_message();
        match err {
            CoreError::Transport { .. } => Self::ConnectionFailed { message },
            CoreError::Unauthorized { .. } => Self::SessionExpired { message },
            CoreError::Rejected { .. } | CoreError::OperationFailed { .. } => {
                Self::Rejected { message }
            }
            CoreError::Server { .. } => Self::Server { message },
            CoreError::Busy { .. } => Self::Busy { message },
            CoreError::Config { message } => Self::Validation {
                field: "configuration".into(),
                reason: message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use libris_core::Operation;

    use super::*;

    #[test]
    fn core_errors_keep_their_message() {
        let err: CliError = CoreError::Rejected {
            operation: Operation::DeleteBook,
            status: 422,
            message: "Book has active borrowings".into(),
        }
        .into();
        assert_eq!(err.to_string(), "Book has active borrowings");
        assert_eq!(err.exit_code(), exit_code::REJECTED);

        let err: CliError = CoreError::Unauthorized {
            operation: Operation::ListBooks,
            status: 401,
        }
        .into();
        assert_eq!(err.exit_code(), exit_code::AUTH);
    }
}
