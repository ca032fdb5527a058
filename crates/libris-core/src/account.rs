// ── Account flows ──
//
// Login, sign-up and logout with their notifications. Logout always ends
// with an empty local session, whatever the server said.

use std::sync::Arc;

use libris_api::{ApiClient, Operation, Role, SignUpRequest};
use secrecy::SecretString;
use tracing::{info, warn};

use crate::error::CoreError;
use crate::notify::Notifier;

const LOGOUT_FALLBACK_WARNING: &str = "Server logout failed. Cleared session locally.";

pub struct AccountService {
    client: Arc<ApiClient>,
    notifier: Notifier,
}

impl AccountService {
    pub fn new(client: Arc<ApiClient>, notifier: Notifier) -> Self {
        Self { client, notifier }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    /// Log in and store the session. Returns the role the server reported.
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Option<Role>, CoreError> {
        match self.client.login(email, password).await {
            Ok(session) => {
                let greeting = match session.role {
                    Some(role) => format!("Logged in as {role}"),
                    None => "Logged in".to_owned(),
                };
                self.notifier.success(greeting);
                Ok(session.role)
            }
            Err(e) => {
                let err = CoreError::from_api(Operation::Login, e);
                self.notifier.error(err.user_message());
                Err(err)
            }
        }
    }

    /// Register a member account. Does not log in.
    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<(), CoreError> {
        match self.client.sign_up(request).await {
            Ok(()) => {
                self.notifier
                    .success("Account created. You can now log in.");
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from_api(Operation::SignUp, e);
                self.notifier.error(err.user_message());
                Err(err)
            }
        }
    }

    /// End the session on the server, then clear it locally regardless.
    ///
    /// Returns whether the server confirmed the logout.
    pub async fn logout(&self) -> bool {
        let confirmed = match self.client.logout().await {
            Ok(()) => true,
            Err(e) => {
                let err = CoreError::from_api(Operation::Logout, e);
                warn!(error = %err, "server logout failed");
                false
            }
        };

        self.client.session().logout();

        if confirmed {
            info!("logged out");
            self.notifier.success("Logged out");
        } else {
            self.notifier.warning(LOGOUT_FALLBACK_WARNING);
        }
        confirmed
    }
}
