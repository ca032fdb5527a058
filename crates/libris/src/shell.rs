//! The interactive shell and the state it carries between commands.
//!
//! One `Shell` owns the API client, the account flows, the navigator and
//! the coordinator of the current view. Moving to another view closes the
//! previous coordinator so its late answers are dropped. Session changes,
//! including ones written by another context, re-run the view guards.

use std::io::{IsTerminal, Write};
use std::sync::Arc;

use clap::Parser;
use libris_core::{
    AccountService, ApiClient, AuthEvent, Coordinator, Navigator, Notification, Notifier,
    SessionChange, SessionStore, Subscription, View,
};
use secrecy::SecretString;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cli::{ColorMode, OutputFormat, ShellLine};
use crate::commands::{self, Flow};
use crate::error::CliError;
use crate::output;

/// Presentation settings taken from the global flags.
#[derive(Debug, Clone, Copy)]
pub struct Presentation {
    pub output: OutputFormat,
    pub color: bool,
    pub quiet: bool,
    pub yes: bool,
    pub interactive: bool,
}

impl Presentation {
    pub fn new(output: OutputFormat, color: ColorMode, quiet: bool, yes: bool) -> Self {
        Self {
            output,
            color: output::should_color(color),
            quiet,
            yes,
            interactive: std::io::stdin().is_terminal(),
        }
    }
}

pub struct Shell {
    pub presentation: Presentation,
    pub client: Arc<ApiClient>,
    pub account: AccountService,
    pub navigator: Navigator,
    /// Email used by `login` when none is given.
    pub default_email: Option<String>,
    /// Password resolved from the profile or environment.
    pub default_password: Option<SecretString>,
    notifier: Notifier,
    coordinator: Coordinator,
    view: View,
    notifications: broadcast::Receiver<Notification>,
    auth_events: broadcast::Receiver<AuthEvent>,
    session_changes: mpsc::UnboundedReceiver<SessionChange>,
    /// Unsubscribes on drop.
    _session_subscription: Subscription,
    storage_watch: Option<JoinHandle<()>>,
}

impl Shell {
    /// Must be called from within a tokio runtime.
    pub fn new(client: Arc<ApiClient>, presentation: Presentation) -> Self {
        let (changes_tx, session_changes) = mpsc::unbounded_channel();
        let session_subscription = client.session().subscribe(move |change| {
            // The shell owns the receiver; a closed channel means it is gone.
            let _ = changes_tx.send(change);
        });
        let storage_watch = client.session().watch_storage();

        let notifier = Notifier::new();
        let notifications = notifier.subscribe();
        let auth_events = client.subscribe_auth_events();
        let account = AccountService::new(Arc::clone(&client), notifier.clone());
        let coordinator = Coordinator::new(Arc::clone(&client), notifier.clone());
        Self {
            presentation,
            account,
            navigator: Navigator::new(View::Home),
            default_email: None,
            default_password: None,
            notifier,
            coordinator,
            view: View::Home,
            notifications,
            auth_events,
            session_changes,
            _session_subscription: session_subscription,
            storage_watch,
            client,
        }
    }

    pub fn session(&self) -> &SessionStore {
        self.client.session()
    }

    /// Coordinator of the current view.
    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    /// Move to `target` through the session guards. Returns where the
    /// navigator landed; the coordinator is replaced if the view changed.
    pub fn enter(&mut self, target: View) -> View {
        let landed = self.navigator.go(target, self.client.session());
        self.sync_view();
        landed
    }

    /// Like [`enter`](Self::enter), but fails unless `target` was reached.
    pub fn require(&mut self, target: View) -> Result<&Coordinator, CliError> {
        let landed = self.enter(target);
        if landed != target && landed == View::Login {
            return Err(CliError::NotLoggedIn);
        }
        Ok(&self.coordinator)
    }

    /// Swap the coordinator when the navigator moved to another view.
    fn sync_view(&mut self) {
        let current = self.navigator.current();
        if current == self.view {
            return;
        }
        debug!(from = %self.view, to = %current, "switching view");
        self.coordinator.close();
        self.coordinator = Coordinator::new(Arc::clone(&self.client), self.notifier.clone());
        self.view = current;
    }

    /// Print pending notifications and react to session invalidation.
    pub fn flush(&mut self) {
        let color = self.presentation.color;

        loop {
            match self.auth_events.try_recv() {
                Ok(AuthEvent::Unauthorized { status }) => {
                    debug!(%status, "session invalidated");
                    if self.navigator.on_unauthorized() {
                        output::notice("Your session has expired. Back to login.", color);
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => {
                    self.navigator.on_unauthorized();
                }
                Err(_) => break,
            }
        }

        let mut changed = false;
        while let Ok(change) = self.session_changes.try_recv() {
            debug!(?change, "session changed");
            changed = true;
        }
        if changed {
            if let Some(view) = self.navigator.revalidate(self.client.session()) {
                output::notice(&format!("Session changed. Now on {view}."), color);
            }
        }
        self.sync_view();

        while let Ok(note) = self.notifications.try_recv() {
            if !self.presentation.quiet || note.level == libris_core::Level::Error {
                eprintln!("{}", output::format_notification(&note, color));
            }
        }
    }

    /// Run one parsed command, then flush notifications.
    pub async fn run_command(&mut self, command: crate::cli::Command) -> Result<Flow, CliError> {
        let result = commands::dispatch(self, command).await;
        self.flush();
        result
    }

    /// Read commands from stdin until `exit` or end of input.
    pub async fn repl(&mut self) -> Result<(), CliError> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            if self.presentation.interactive {
                print!("libris [{}]> ", self.view);
                let _ = std::io::stdout().flush();
            }

            let Some(line) = lines.next_line().await? else {
                break;
            };

            let words = match split_words(&line) {
                Ok(words) => words,
                Err(reason) => {
                    output::notice(&format!("error: {reason}"), self.presentation.color);
                    continue;
                }
            };
            if words.is_empty() {
                continue;
            }

            let parsed = match ShellLine::try_parse_from(&words) {
                Ok(parsed) => parsed,
                Err(e) => {
                    let _ = e.print();
                    continue;
                }
            };

            match self.run_command(parsed.command).await {
                Ok(Flow::Exit) => break,
                Ok(Flow::Continue) => {}
                Err(err) if err.was_notified() => {}
                Err(err) => {
                    eprintln!("{:?}", miette::Report::new(err));
                }
            }
        }

        self.coordinator.close();
        Ok(())
    }
}

impl Drop for Shell {
    fn drop(&mut self) {
        if let Some(task) = self.storage_watch.take() {
            task.abort();
        }
    }
}

/// Split a command line into words. Single and double quotes group words;
/// a backslash escapes the next character outside single quotes.
pub fn split_words(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('"') | None, '\\') => match chars.next() {
                Some(escaped) => {
                    current.push(escaped);
                    in_word = true;
                }
                None => return Err("trailing backslash".into()),
            },
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if let Some(q) = quote {
        return Err(format!("unclosed {q}"));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
