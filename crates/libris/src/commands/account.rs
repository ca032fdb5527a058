//! Login, logout, sign-up and whoami.

use libris_core::{SignUpRequest, View};
use secrecy::SecretString;

use crate::error::CliError;
use crate::output;
use crate::shell::Shell;

use super::util;

pub async fn login(shell: &mut Shell, email: Option<String>) -> Result<(), CliError> {
    if shell.enter(View::Login) != View::Login {
        output::notice(
            "Already logged in. Run logout first to switch accounts.",
            shell.presentation.color,
        );
        return Ok(());
    }

    let email = email
        .or_else(|| shell.default_email.clone())
        .ok_or(CliError::NoEmail)?;
    let password = match shell.default_password.clone() {
        Some(password) => password,
        None if shell.presentation.interactive => util::prompt_password("Password")?,
        None => return Err(CliError::NoPassword { email }),
    };

    shell.account.login(&email, &password).await?;
    shell.enter(View::Home);
    Ok(())
}

pub async fn logout(shell: &mut Shell) {
    if !shell.session().is_logged_in() {
        output::notice("Not logged in", shell.presentation.color);
        return;
    }
    shell.account.logout().await;
    shell.enter(View::Home);
}

pub async fn sign_up(shell: &mut Shell, name: String, email: String) -> Result<(), CliError> {
    if shell.enter(View::SignUp) != View::SignUp {
        output::notice(
            "Already logged in. Run logout first to create another account.",
            shell.presentation.color,
        );
        return Ok(());
    }

    let (password, password_confirmation) = if shell.presentation.interactive {
        (
            util::prompt_password("Password")?,
            util::prompt_password("Confirm password")?,
        )
    } else {
        let password: SecretString = shell
            .default_password
            .clone()
            .ok_or_else(|| CliError::NoPassword {
                email: email.clone(),
            })?;
        (password.clone(), password)
    };

    let request = SignUpRequest {
        name,
        email_address: email,
        password,
        password_confirmation,
    };
    shell.account.sign_up(&request).await?;
    shell.enter(View::Login);
    Ok(())
}

pub fn whoami(shell: &Shell) {
    let session = shell.session();
    let line = if session.is_logged_in() {
        match session.role() {
            Some(role) => format!("Logged in as {role}"),
            None => "Logged in (role unknown)".to_owned(),
        }
    } else {
        "Not logged in".to_owned()
    };
    output::print_output(&line, false);
}
