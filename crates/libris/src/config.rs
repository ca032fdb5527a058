//! CLI configuration: thin wrapper around `libris_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--api-url, --email, --insecure, --timeout).

use libris_config::{Config, Profile};
use libris_core::ClientConfig;
use secrecy::SecretString;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Everything the shell needs from configuration.
#[derive(Debug)]
pub struct Resolved {
    pub profile_name: String,
    pub client: ClientConfig,
    pub email: Option<String>,
    pub password: Option<SecretString>,
}

/// Apply flag overrides to a profile. Flags win over profile values.
pub fn apply_overrides(mut profile: Profile, global: &GlobalOpts) -> Profile {
    if let Some(ref url) = global.api_url {
        profile.api_url.clone_from(url);
    }
    if let Some(ref email) = global.email {
        profile.email = Some(email.clone());
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if global.timeout.is_some() {
        profile.timeout = global.timeout;
    }
    profile
}

/// Resolve the active profile from `config` and the global flags.
pub fn resolve(config: &Config, global: &GlobalOpts) -> Result<Resolved, CliError> {
    let (profile_name, profile) = config.resolve_profile(global.profile.as_deref())?;
    let profile = apply_overrides(profile, global);
    let client = libris_config::profile_to_client_config(&profile, &config.defaults)?;

    Ok(Resolved {
        profile_name,
        password: libris_config::resolve_password(&profile),
        email: profile.email,
        client,
    })
}
