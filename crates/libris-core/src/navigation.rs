// ── Navigation ──
//
// The current view and the redirect rules around the session: guests
// cannot open session-only views, signed-in users skip the login forms,
// and an invalidated session sends a protected view back to login.

use std::sync::{Arc, Mutex, PoisonError};

use libris_api::{AuthEvent, SessionStore};
use serde::Serialize;
use strum::{Display, EnumIter, EnumString};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, EnumIter, Default,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum View {
    #[default]
    Home,
    Login,
    SignUp,
    Books,
    Dashboard,
}

impl View {
    pub const fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Login => "/login",
            Self::SignUp => "/sign-up",
            Self::Books => "/books",
            Self::Dashboard => "/dashboard",
        }
    }

    /// Only meaningful without a session.
    pub const fn is_guest_only(self) -> bool {
        matches!(self, Self::Login | Self::SignUp)
    }

    pub const fn requires_session(self) -> bool {
        matches!(self, Self::Dashboard)
    }
}

/// Where a request for `target` actually lands given the session.
pub fn resolve(target: View, session: &SessionStore) -> View {
    let logged_in = session.is_logged_in();
    if target.is_guest_only() && logged_in {
        View::Home
    } else if target.requires_session() && !logged_in {
        View::Login
    } else {
        target
    }
}

struct Inner {
    current: watch::Sender<View>,
    history: Mutex<Vec<View>>,
}

/// Holder of the current view.
#[derive(Clone)]
pub struct Navigator {
    inner: Arc<Inner>,
}

impl Navigator {
    pub fn new(start: View) -> Self {
        let (current, _) = watch::channel(start);
        Self {
            inner: Arc::new(Inner {
                current,
                history: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn current(&self) -> View {
        *self.inner.current.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<View> {
        self.inner.current.subscribe()
    }

    /// Go to `view` unconditionally. Returns the previous view.
    pub fn navigate(&self, view: View) -> View {
        let previous = self.inner.current.send_replace(view);
        self.lock_history().push(view);
        debug!(from = %previous, to = %view, "navigate");
        previous
    }

    /// Go to `target` after applying the session guards. Returns where we
    /// ended up.
    pub fn go(&self, target: View, session: &SessionStore) -> View {
        let landed = resolve(target, session);
        self.navigate(landed);
        landed
    }

    /// Re-apply the session guards to the current view after the session
    /// changed underneath it. Returns the new view if it had to move.
    pub fn revalidate(&self, session: &SessionStore) -> Option<View> {
        let current = self.current();
        let landed = resolve(current, session);
        if landed == current {
            return None;
        }
        debug!(from = %current, to = %landed, "view no longer allowed for session");
        self.navigate(landed);
        Some(landed)
    }

    /// Every navigation performed, oldest first.
    pub fn history(&self) -> Vec<View> {
        self.lock_history().clone()
    }

    /// Redirect to login after the server refused the session, unless the
    /// user is already on the home or login view. Returns whether it
    /// navigated.
    pub fn on_unauthorized(&self) -> bool {
        let current = self.current();
        if matches!(current, View::Home | View::Login) {
            return false;
        }
        info!(from = %current, "session invalidated; redirecting to login");
        self.navigate(View::Login);
        true
    }

    /// Run [`on_unauthorized`](Self::on_unauthorized) for every event until
    /// the sender goes away.
    pub fn spawn_unauthorized_redirect(
        &self,
        mut events: broadcast::Receiver<AuthEvent>,
    ) -> JoinHandle<()> {
        let navigator = self.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(AuthEvent::Unauthorized { .. }) => {
                        navigator.on_unauthorized();
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "auth event receiver lagged");
                        navigator.on_unauthorized();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    fn lock_history(&self) -> std::sync::MutexGuard<'_, Vec<View>> {
        self.inner
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(View::Home)
    }
}

impl std::fmt::Debug for Navigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Navigator")
            .field("current", &self.current())
            .finish_non_exhaustive()
    }
}
