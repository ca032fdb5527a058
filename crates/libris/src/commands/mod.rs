//! Command dispatch: bridges parsed commands -> core services -> output.

pub mod account;
pub mod books;
pub mod borrowings;
pub mod dashboard;
pub mod util;

use crate::cli::Command;
use crate::error::CliError;
use crate::output;
use crate::shell::Shell;

/// Whether the shell keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub async fn dispatch(shell: &mut Shell, cmd: Command) -> Result<Flow, CliError> {
    tracing::debug!(command = ?cmd, "dispatching command");
    match cmd {
        Command::Login { email } => account::login(shell, email).await?,
        Command::Logout => account::logout(shell).await,
        Command::Signup { name, email } => account::sign_up(shell, name, email).await?,
        Command::Whoami => account::whoami(shell),
        Command::Books(args) => books::handle(shell, args).await?,
        Command::Returns(args) => borrowings::handle_returns(shell, args).await?,
        Command::Borrowings => borrowings::list_current(shell).await?,
        Command::Dashboard => dashboard::show(shell).await?,
        Command::Goto { view } => {
            let landed = shell.enter(view);
            if landed != view {
                output::notice(
                    &format!("{view} is not available; went to {landed}"),
                    shell.presentation.color,
                );
            }
        }
        Command::Exit => return Ok(Flow::Exit),
    }
    Ok(Flow::Continue)
}
