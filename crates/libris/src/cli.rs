//! Clap derive structures for the `libris` shell.
//!
//! The same command tree is parsed from the process arguments (one-shot)
//! and from each line typed at the shell prompt.

use clap::{Args, Parser, Subcommand, ValueEnum};
use libris_core::View;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// libris -- interactive client for a Libris library service
#[derive(Debug, Parser)]
#[command(
    name = "libris",
    version,
    about = "Browse, borrow and manage library books from the terminal",
    long_about = "An interactive client for a Libris library service.\n\n\
        Without a command, starts a shell that reads one command per line.\n\
        With a command, runs it once and exits.",
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// One line typed at the shell prompt.
#[derive(Debug, Parser)]
#[command(
    name = "libris",
    no_binary_name = true,
    disable_version_flag = true
)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Server profile to use
    #[arg(long, short = 'p', env = "LIBRIS_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API root URL (overrides profile)
    #[arg(long, env = "LIBRIS_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Account email (overrides profile)
    #[arg(long, env = "LIBRIS_EMAIL", global = true)]
    pub email: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "LIBRIS_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "LIBRIS_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "LIBRIS_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in with email and password
    Login {
        /// Account email (defaults to --email or the profile's email)
        email: Option<String>,
    },

    /// End the session
    Logout,

    /// Create a member account
    #[command(alias = "sign-up")]
    Signup {
        /// Display name
        #[arg(long)]
        name: String,

        /// Account email
        #[arg(long)]
        email: String,
    },

    /// Show the current session
    Whoami,

    /// Browse and manage the catalog
    #[command(alias = "b")]
    Books(BooksArgs),

    /// Mark borrowings as returned (librarian)
    Returns(ReturnsArgs),

    /// List every current borrowing (librarian)
    Borrowings,

    /// Show the dashboard for the current role
    #[command(alias = "dash")]
    Dashboard,

    /// Switch to another view
    Goto {
        /// home, login, sign-up, books or dashboard
        view: View,
    },

    /// Leave the shell
    #[command(alias = "quit")]
    Exit,
}

// ── Books ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct BooksArgs {
    #[command(subcommand)]
    pub command: BooksCommand,
}

#[derive(Debug, Subcommand)]
pub enum BooksCommand {
    /// List books
    #[command(alias = "ls")]
    List {
        /// Only books whose title, author or genre contains this text
        #[arg(long, short = 's')]
        search: Option<String>,
    },

    /// Show one book
    #[command(alias = "get")]
    Show {
        /// Book ID
        id: String,
    },

    /// Add a book to the catalog (librarian)
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        genre: String,
        #[arg(long)]
        isbn: String,
        /// Number of copies owned
        #[arg(long, default_value = "1")]
        copies: u32,
    },

    /// Change fields of a book (librarian)
    Update {
        /// Book ID
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        genre: Option<String>,
        #[arg(long)]
        isbn: Option<String>,
        #[arg(long)]
        copies: Option<u32>,
    },

    /// Remove a book from the catalog (librarian)
    #[command(alias = "rm")]
    Delete {
        /// Book ID
        id: String,
    },

    /// Borrow a copy (member)
    Borrow {
        /// Book ID
        id: String,
    },
}

// ── Returns ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ReturnsArgs {
    #[command(subcommand)]
    pub command: ReturnsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ReturnsCommand {
    /// Mark a borrowing as returned
    Mark {
        /// Borrowing ID
        borrowing_id: String,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
        ShellLine::command().debug_assert();
    }

    #[test]
    fn parses_shell_lines() {
        let line = ShellLine::try_parse_from(["books", "update", "7", "--copies", "3"]).unwrap();
        match line.command {
            Command::Books(BooksArgs {
                command: BooksCommand::Update { id, copies, title, .. },
            }) => {
                assert_eq!(id, "7");
                assert_eq!(copies, Some(3));
                assert!(title.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let line = ShellLine::try_parse_from(["goto", "sign-up"]).unwrap();
        assert!(matches!(line.command, Command::Goto { view: View::SignUp }));

        let line = ShellLine::try_parse_from(["quit"]).unwrap();
        assert!(matches!(line.command, Command::Exit));
    }
}
