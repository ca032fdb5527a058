// ── Core error types ──
//
// Operation-aware errors from libris-core. Front ends show
// `user_message()`; the variant tells them what kind of failure it was.
// `CoreError::from_api` translates transport-layer errors using the
// operation for default messages.

use libris_api::Operation;
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The request never got an answer.
    #[error("{message}")]
    Transport {
        operation: Operation,
        message: String,
    },

    /// The server refused the credential. The session is already cleared.
    #[error("Your session has expired. Please log in again.")]
    Unauthorized {
        operation: Operation,
        status: u16,
    },

    /// A 4xx validation or business-rule failure.
    #[error("{message}")]
    Rejected {
        operation: Operation,
        status: u16,
        message: String,
    },

    /// A 5xx answer. Not retried.
    #[error("{message}")]
    Server {
        operation: Operation,
        status: u16,
        message: String,
    },

    /// Unexpected status, undecodable body or a local failure.
    #[error("{message}")]
    OperationFailed {
        operation: Operation,
        message: String,
    },

    /// The same action is already running for this target.
    #[error("{operation} is already in progress for {target}")]
    Busy {
        operation: Operation,
        target: String,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Translate an API error raised while performing `operation`.
    pub fn from_api(operation: Operation, err: libris_api::Error) -> Self {
        use libris_api::Error as Api;

        let message = err.user_message(operation);
        let detail = err.to_string();
        match err {
            // A rejected login is a wrong password, not an expired session.
            Api::Unauthorized { status, .. } if operation == Operation::Login => Self::Rejected {
                operation,
                status: status.as_u16(),
                message,
            },
            Api::Unauthorized { status, .. } => Self::Unauthorized {
                operation,
                status: status.as_u16(),
            },
            Api::Api { status, .. } if status.is_server_error() => Self::Server {
                operation,
                status: status.as_u16(),
                message,
            },
            Api::Api { status, .. } => Self::Rejected {
                operation,
                status: status.as_u16(),
                message,
            },
            Api::Transport(_) => Self::Transport { operation, message },
            Api::InvalidUrl(_) | Api::InvalidBaseUrl(_) | Api::Tls(_) => {
                Self::Config { message: detail }
            }
            Api::Storage(_) => Self::OperationFailed {
                operation,
                message: detail,
            },
            Api::MissingToken | Api::UnexpectedStatus { .. } | Api::Deserialization { .. } => {
                Self::OperationFailed { operation, message }
            }
        }
    }

    /// Text for a notification.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::Transport { operation, .. }
            | Self::Unauthorized { operation, .. }
            | Self::Rejected { operation, .. }
            | Self::Server { operation, .. }
            | Self::OperationFailed { operation, .. }
            | Self::Busy { operation, .. } => Some(*operation),
            Self::Config { .. } => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;

    fn api(status: StatusCode, message: Option<&str>) -> libris_api::Error {
        libris_api::Error::Api {
            status,
            message: message.map(str::to_owned),
        }
    }

    #[test]
    fn four_xx_is_rejected_with_server_message() {
        let err = CoreError::from_api(
            Operation::CreateBook,
            api(StatusCode::UNPROCESSABLE_ENTITY, Some("Isbn is invalid")),
        );
        assert!(matches!(err, CoreError::Rejected { status: 422, .. }));
        assert_eq!(err.user_message(), "Isbn is invalid");
    }

    #[test]
    fn five_xx_is_server_failure_with_default() {
        let err = CoreError::from_api(
            Operation::ReturnBorrowing,
            api(StatusCode::BAD_GATEWAY, None),
        );
        assert!(matches!(err, CoreError::Server { status: 502, .. }));
        assert_eq!(err.user_message(), "Failed to mark as returned");
        assert_eq!(err.operation(), Some(Operation::ReturnBorrowing));
    }

    #[test]
    fn unauthorized_depends_on_operation() {
        let rejected_login = CoreError::from_api(
            Operation::Login,
            libris_api::Error::Unauthorized {
                status: StatusCode::UNAUTHORIZED,
                message: None,
            },
        );
        assert!(matches!(rejected_login, CoreError::Rejected { .. }));
        assert_eq!(rejected_login.user_message(), "Login failed");

        let expired = CoreError::from_api(
            Operation::ListBooks,
            libris_api::Error::Unauthorized {
                status: StatusCode::FORBIDDEN,
                message: Some("forbidden".into()),
            },
        );
        assert!(expired.is_unauthorized());
    }

    #[test]
    fn undecodable_body_uses_default() {
        let err = CoreError::from_api(
            Operation::MemberDashboard,
            libris_api::Error::Deserialization {
                message: "expected value".into(),
                body: "<html>".into(),
            },
        );
        assert_eq!(err.user_message(), "Failed to fetch dashboard");
    }
}
