// ── Runtime client configuration ──
//
// These types describe *how* to reach a Libris server. They carry
// credentials and transport tuning, but never touch disk. The CLI builds a
// `ClientConfig` from a profile and hands it in.

use std::sync::Arc;
use std::time::Duration;

use libris_api::{ApiClient, SessionStore, TlsMode, TransportConfig};
use secrecy::SecretString;
use url::Url;

use crate::error::CoreError;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed development servers).
    DangerAcceptInvalid,
}

/// Email and password used for an automatic login.
#[derive(Debug, Clone)]
pub struct LoginCredentials {
    pub email: String,
    pub password: SecretString,
}

/// Configuration for talking to one Libris server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root (e.g. `http://localhost:3000/api`).
    pub api_url: Url,
    pub tls: TlsVerification,
    pub timeout: Duration,
    pub user_agent: String,
    /// Log in with these right after start-up, if present.
    pub credentials: Option<LoginCredentials>,
}

impl ClientConfig {
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            user_agent: concat!("libris/", env!("CARGO_PKG_VERSION")).to_owned(),
            credentials: None,
        }
    }

    /// Transport settings for the api crate.
    pub fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
            user_agent: self.user_agent.clone(),
        }
    }

    /// Build an API client bound to `session`.
    pub fn build_client(&self, session: Arc<SessionStore>) -> Result<ApiClient, CoreError> {
        ApiClient::new(self.api_url.clone(), session, &self.transport()).map_err(|e| {
            CoreError::Config {
                message: e.to_string(),
            }
        })
    }
}
