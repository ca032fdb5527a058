// Roles, capabilities and the shared bearer header.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Account role as reported by the server at login.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    Member,
    Librarian,
}

/// Things a session may or may not be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Capability {
    BrowseCatalog,
    ManageCatalog,
    BorrowBooks,
    MarkReturned,
    LibrarianDashboard,
    MemberDashboard,
}

impl Role {
    pub fn can(self, capability: Capability) -> bool {
        match capability {
            Capability::BrowseCatalog => true,
            Capability::ManageCatalog
            | Capability::MarkReturned
            | Capability::LibrarianDashboard => self == Self::Librarian,
            Capability::BorrowBooks | Capability::MemberDashboard => self == Self::Member,
        }
    }
}

/// Published by the client when the server refuses the credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    Unauthorized { status: StatusCode },
}

/// Bearer credential attached to every outgoing request while set.
///
/// Cheap to clone; all clones share one slot. The `SessionStore` is the
/// only writer during normal operation.
#[derive(Clone, Default)]
pub struct AuthHeader {
    token: Arc<ArcSwapOption<SecretString>>,
}

impl AuthHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, token: &SecretString) {
        self.token.store(Some(Arc::new(token.clone())));
    }

    pub fn clear(&self) {
        self.token.store(None);
    }

    pub fn is_set(&self) -> bool {
        self.token.load().is_some()
    }

    /// Attach `Authorization: Bearer <token>` if a credential is present.
    pub(crate) fn apply(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token.load_full() {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }
}

impl fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthHeader")
            .field("set", &self.is_set())
            .finish()
    }
}
