//! Shared helpers for command handlers.

use libris_core::{Capability, EntityId};
use secrecy::SecretString;

use crate::error::CliError;
use crate::shell::Shell;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(shell: &Shell, message: &str, action: &str) -> Result<bool, CliError> {
    if shell.presentation.yes {
        return Ok(true);
    }
    if !shell.presentation.interactive {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Read a password without echo.
pub fn prompt_password(prompt: &str) -> Result<SecretString, CliError> {
    let password = dialoguer::Password::new()
        .with_prompt(prompt)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(SecretString::from(password))
}

/// Fail unless the session's role allows `capability`.
pub fn require_capability(
    shell: &Shell,
    capability: Capability,
    action: &str,
) -> Result<(), CliError> {
    let session = shell.session();
    if !session.is_logged_in() {
        return Err(CliError::NotLoggedIn);
    }
    if !session.can(capability) {
        return Err(CliError::NotPermitted {
            action: action.into(),
            role: session
                .role()
                .map_or_else(|| "unknown".to_owned(), |role| role.to_string()),
        });
    }
    Ok(())
}

pub fn entity_id(raw: &str, field: &str) -> Result<EntityId, CliError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CliError::Validation {
            field: field.into(),
            reason: "must not be empty".into(),
        });
    }
    Ok(EntityId::from(trimmed))
}
