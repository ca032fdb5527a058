//! Profile configuration for libris front ends.
//!
//! TOML profiles, password resolution (env var + plaintext), and
//! translation to `libris_core::ClientConfig`. The binary layers its
//! command-line flags on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use libris_core::{ClientConfig, LoginCredentials, TlsVerification};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Environment variable consulted for a password when the profile names none.
pub const PASSWORD_ENV: &str = "LIBRIS_PASSWORD";

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found in {path}")]
    UnknownProfile { name: String, path: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level `config.toml`.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is requested.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named server profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Pick the profile to use.
    ///
    /// An explicitly requested profile must exist. The default profile may
    /// be absent, in which case a local-server profile is used.
    pub fn resolve_profile(&self, requested: Option<&str>) -> Result<(String, Profile), ConfigError> {
        if let Some(name) = requested {
            return self
                .profiles
                .get(name)
                .cloned()
                .map(|profile| (name.to_owned(), profile))
                .ok_or_else(|| ConfigError::UnknownProfile {
                    name: name.to_owned(),
                    path: config_path().display().to_string(),
                });
        }

        let name = self.default_profile.as_deref().unwrap_or("default");
        let profile = self.profiles.get(name).cloned().unwrap_or_default();
        Ok((name.to_owned(), profile))
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named server profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// API root, e.g. "http://localhost:3000/api".
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Account used for `login` when no email is given.
    pub email: Option<String>,

    /// Plaintext password (prefer `password_env`).
    pub password: Option<String>,

    /// Environment variable holding the password.
    pub password_env: Option<String>,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout, in seconds.
    pub timeout: Option<u64>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            email: None,
            password: None,
            password_env: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "libris", "libris").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("libris");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from `path` layered over defaults and under `LIBRIS_`
/// environment variables (`LIBRIS_DEFAULTS__TIMEOUT=10`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("LIBRIS_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load the full Config from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config, returning a default if the file doesn't exist or is broken.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve a password: the profile's `password_env`, then
/// [`PASSWORD_ENV`], then plaintext in the profile.
pub fn resolve_password(profile: &Profile) -> Option<SecretString> {
    if let Some(ref env_name) = profile.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    if let Ok(val) = std::env::var(PASSWORD_ENV) {
        return Some(SecretString::from(val));
    }

    profile
        .password
        .as_ref()
        .map(|pw| SecretString::from(pw.clone()))
}

/// Credentials for an automatic login, when both email and password are
/// configured.
pub fn resolve_credentials(profile: &Profile) -> Option<LoginCredentials> {
    let email = profile.email.clone()?;
    let password = resolve_password(profile)?;
    Some(LoginCredentials { email, password })
}

/// Build a `ClientConfig` from a profile, falling back to `defaults`.
pub fn profile_to_client_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<ClientConfig, ConfigError> {
    let api_url: url::Url = profile
        .api_url
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "api_url".into(),
            reason: format!("invalid URL: {}", profile.api_url),
        })?;

    if !matches!(api_url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "api_url".into(),
            reason: format!("expected an http(s) URL, got '{}'", profile.api_url),
        });
    }

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let mut config = ClientConfig::new(api_url);
    config.tls = tls;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.credentials = resolve_credentials(profile);
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn write(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.default_profile.as_deref(), Some("default"));
        assert_eq!(config.defaults.timeout, 30);
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn profiles_are_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"
default_profile = "campus"

[defaults]
timeout = 12

[profiles.campus]
api_url = "https://library.example.edu/api"
email = "ada@example.edu"
password = "hunter2"
"#,
        );

        let config = load_config_from(&path).unwrap();
        let (name, profile) = config.resolve_profile(None).unwrap();
        assert_eq!(name, "campus");
        assert_eq!(profile.api_url, "https://library.example.edu/api");

        let client = profile_to_client_config(&profile, &config.defaults).unwrap();
        assert_eq!(client.timeout, Duration::from_secs(12));
        assert_eq!(client.tls, TlsVerification::SystemDefaults);
        let creds = client.credentials.unwrap();
        assert_eq!(creds.email, "ada@example.edu");
        assert_eq!(creds.password.expose_secret(), "hunter2");
    }

    #[test]
    fn unknown_requested_profile_is_an_error() {
        let config = Config::default();
        let err = config.resolve_profile(Some("nope")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProfile { .. }));
    }

    #[test]
    fn absent_default_profile_points_at_local_server() {
        let (name, profile) = Config::default().resolve_profile(None).unwrap();
        assert_eq!(name, "default");
        assert_eq!(profile.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn invalid_url_is_rejected() {
        let profile = Profile {
            api_url: "ftp://library".into(),
            ..Profile::default()
        };
        let err = profile_to_client_config(&profile, &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));

        let profile = Profile {
            api_url: "not a url".into(),
            ..Profile::default()
        };
        assert!(profile_to_client_config(&profile, &Defaults::default()).is_err());
    }

    #[test]
    fn insecure_and_ca_cert() {
        let profile = Profile {
            insecure: Some(true),
            ca_cert: Some("/etc/ca.pem".into()),
            ..Profile::default()
        };
        let client = profile_to_client_config(&profile, &Defaults::default()).unwrap();
        assert_eq!(client.tls, TlsVerification::DangerAcceptInvalid);

        let profile = Profile {
            ca_cert: Some("/etc/ca.pem".into()),
            ..Profile::default()
        };
        let client = profile_to_client_config(&profile, &Defaults::default()).unwrap();
        assert_eq!(client.tls, TlsVerification::CustomCa("/etc/ca.pem".into()));
    }

    #[test]
    fn credentials_need_an_email() {
        let profile = Profile {
            password: Some("pw".into()),
            password_env: Some("LIBRIS_TEST_UNSET_PASSWORD_VAR".into()),
            ..Profile::default()
        };
        assert!(resolve_credentials(&profile).is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.profiles.insert(
            "default".into(),
            Profile {
                api_url: "https://books.example.org/api".into(),
                email: Some("grace@example.org".into()),
                ..Profile::default()
            },
        );
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        let profile = &loaded.profiles["default"];
        assert_eq!(profile.api_url, "https://books.example.org/api");
        assert_eq!(profile.email.as_deref(), Some("grace@example.org"));
    }
}
