// Libris API HTTP client
//
// Wraps `reqwest::Client` with URL construction, bearer-header injection
// and the response interceptor. Endpoint modules (account, books,
// borrowings, dashboards) are implemented as inherent methods in separate
// files to keep this module focused on transport mechanics.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use url::Url;

use crate::auth::AuthEvent;
use crate::error::{Error, parse_server_message};
use crate::session::SessionStore;
use crate::transport::TransportConfig;

const AUTH_EVENT_CHANNEL_SIZE: usize = 16;

/// Raw HTTP client for the Libris REST API.
///
/// Requests carry `Authorization: Bearer <token>` while the session store
/// holds a credential. Any 401/403 answer clears the session and is
/// published as [`AuthEvent::Unauthorized`] before the error is returned.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    session: Arc<SessionStore>,
    auth_events: broadcast::Sender<AuthEvent>,
}

impl ApiClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the API root, e.g. `http://localhost:3000/api`.
    pub fn new(
        base_url: Url,
        session: Arc<SessionStore>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, session))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, session: Arc<SessionStore>) -> Self {
        let (auth_events, _) = broadcast::channel(AUTH_EVENT_CHANNEL_SIZE);
        Self {
            http,
            base_url,
            session,
            auth_events,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Attach `credential` to every request built from now on.
    pub fn set_credential_header(&self, credential: &SecretString) {
        self.session.header().set(credential);
    }

    pub fn clear_credential_header(&self) {
        self.session.header().clear();
    }

    /// Receive an event for every 401/403 the interceptor handles.
    pub fn subscribe_auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth_events.subscribe()
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/{segments..}`, percent-encoding each segment.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a request with no body and return the checked response.
    pub(crate) async fn send(
        &self,
        method: Method,
        url: Url,
        accepted: &[u16],
    ) -> Result<Response, Error> {
        debug!("{method} {url}");
        let builder = self.http.request(method, url);
        self.execute(builder, accepted).await
    }

    /// Send a request with a JSON body and return the checked response.
    pub(crate) async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: &B,
        accepted: &[u16],
    ) -> Result<Response, Error> {
        debug!("{method} {url}");
        let builder = self.http.request(method, url).json(body);
        self.execute(builder, accepted).await
    }

    /// Send a GET request and decode the JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        let resp = self.send(Method::GET, url, &[200]).await?;
        decode(resp).await
    }

    async fn execute(&self, builder: RequestBuilder, accepted: &[u16]) -> Result<Response, Error> {
        let resp = self.session.header().apply(builder).send().await?;
        self.intercept(resp, accepted).await
    }

    /// The single response interceptor.
    async fn intercept(&self, resp: Response, accepted: &[u16]) -> Result<Response, Error> {
        let status = resp.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = resp.text().await.unwrap_or_default();
            self.on_unauthorized(status);
            return Err(Error::Unauthorized {
                status,
                message: parse_server_message(&body),
            });
        }

        if accepted.contains(&status.as_u16()) {
            return Ok(resp);
        }

        if status.is_success() {
            return Err(Error::UnexpectedStatus {
                status,
                expected: accepted.to_vec(),
            });
        }

        let body = resp.text().await.unwrap_or_default();
        Err(Error::Api {
            status,
            message: parse_server_message(&body),
        })
    }

    fn on_unauthorized(&self, status: StatusCode) {
        let had_session = self.session.is_logged_in();
        self.session.logout();
        if had_session {
            warn!(%status, "credential rejected by server; session cleared");
        } else {
            debug!(%status, "request rejected without a session");
        }
        // No receivers is fine: nobody is driving navigation.
        let _ = self.auth_events.send(AuthEvent::Unauthorized { status });
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Decode a JSON body, keeping a preview of the raw text on failure.
pub(crate) async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, Error> {
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body,
        }
    })
}
