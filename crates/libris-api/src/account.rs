// Account endpoints: login, logout, sign-up.

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::{debug, info};

use crate::client::{ApiClient, decode};
use crate::error::Error;
use crate::models::{LoginResponse, SignUpRequest};
use crate::session::Session;

impl ApiClient {
    /// Authenticate and store the returned session.
    ///
    /// `POST /session` with `{email_address, password}`. The token and role
    /// are written to the session store, which also sets the bearer header.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<Session, Error> {
        let url = self.endpoint(&["session"])?;
        let body = json!({
            "email_address": email,
            "password": password.expose_secret(),
        });

        let resp = self.send_json(Method::POST, url, &body, &[200]).await?;
        let parsed: LoginResponse = decode(resp).await?;

        let token = parsed
            .auth_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(Error::MissingToken)?;
        let session = Session::new(SecretString::from(token.to_owned()), parsed.role());

        self.session().set_session(session.clone())?;
        info!(role = ?session.role, "logged in");
        Ok(session)
    }

    /// End the session on the server.
    ///
    /// `DELETE /session`. The local session is left alone; callers clear it
    /// whatever the outcome.
    pub async fn logout(&self) -> Result<(), Error> {
        let url = self.endpoint(&["session"])?;
        self.send(Method::DELETE, url, &[200, 204]).await?;
        debug!("server session ended");
        Ok(())
    }

    /// Register a new member account.
    ///
    /// `POST /sign-up` with `{user: {name, email_address, password,
    /// password_confirmation}}`. Does not log in.
    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<(), Error> {
        let url = self.endpoint(&["sign-up"])?;
        let body = json!({
            "user": {
                "name": request.name,
                "email_address": request.email_address,
                "password": request.password.expose_secret(),
                "password_confirmation": request.password_confirmation.expose_secret(),
            }
        });
        self.send_json(Method::POST, url, &body, &[200, 201]).await?;
        info!(email = %request.email_address, "account created");
        Ok(())
    }
}
