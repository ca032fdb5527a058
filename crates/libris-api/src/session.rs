// Session store: the single owner of the credential and role.
//
// Values live in a key/value `SessionStorage` (JSON-encoded strings), the
// volatile per-process analogue of a browser tab's session storage. Reads
// never fail: a missing, unreadable or malformed entry is "no session".
// Writes keep the bearer header in step with storage and notify every
// subscriber.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{AuthHeader, Capability, Role};

/// Storage key holding the JSON-encoded bearer token.
pub const TOKEN_KEY: &str = "app.auth.token";
/// Storage key holding the JSON-encoded role.
pub const ROLE_KEY: &str = "app.auth.role";

const EVENT_CHANNEL_SIZE: usize = 64;

// ── Storage backend ─────────────────────────────────────────────────

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("session storage unavailable: {0}")]
    Unavailable(String),

    #[error("session storage quota exceeded")]
    QuotaExceeded,
}

/// A write observed on a storage shared between contexts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    /// Context id of the writer.
    pub origin: Uuid,
}

/// Key/value string storage backing a [`SessionStore`].
pub trait SessionStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&self, key: &str, value: &str, origin: Uuid) -> Result<(), StorageError>;

    fn remove_item(&self, key: &str, origin: Uuid) -> Result<(), StorageError>;

    /// Writes from any context, if this backend publishes them.
    fn events(&self) -> Option<broadcast::Receiver<StorageEvent>> {
        None
    }
}

/// In-memory storage. Clones share the same map and event channel, which is
/// how several contexts share one storage in tests and in the shell.
#[derive(Clone)]
pub struct MemoryStorage {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    items: Mutex<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            inner: Arc::new(MemoryInner {
                items: Mutex::new(HashMap::new()),
                events,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.inner
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, key: &str, origin: Uuid) {
        let _ = self.inner.events.send(StorageEvent {
            key: key.to_owned(),
            origin,
        });
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("entries", &self.len())
            .finish()
    }
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str, origin: Uuid) -> Result<(), StorageError> {
        self.lock().insert(key.to_owned(), value.to_owned());
        self.publish(key, origin);
        Ok(())
    }

    fn remove_item(&self, key: &str, origin: Uuid) -> Result<(), StorageError> {
        let removed = self.lock().remove(key).is_some();
        if removed {
            self.publish(key, origin);
        }
        Ok(())
    }

    fn events(&self) -> Option<broadcast::Receiver<StorageEvent>> {
        Some(self.inner.events.subscribe())
    }
}

// ── Session value ───────────────────────────────────────────────────

/// Credential and role, written and cleared together.
#[derive(Debug, Clone)]
pub struct Session {
    pub credential: SecretString,
    pub role: Option<Role>,
}

impl Session {
    pub fn new(credential: SecretString, role: Option<Role>) -> Self {
        Self { credential, role }
    }
}

/// What a subscriber is told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    SignedIn { role: Option<Role> },
    SignedOut,
    /// Another context sharing the storage changed it.
    External,
}

// ── Observers ───────────────────────────────────────────────────────

type Callback = Arc<dyn Fn(SessionChange) + Send + Sync>;

#[derive(Default)]
struct Observers {
    next_id: AtomicU64,
    list: Mutex<Vec<(u64, Callback)>>,
}

impl Observers {
    fn add(&self, callback: Callback) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.list
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, callback));
        id
    }

    fn remove(&self, id: u64) {
        self.list
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(existing, _)| *existing != id);
    }

    fn notify(&self, change: SessionChange) {
        // Snapshot first so callbacks may subscribe or unsubscribe.
        let callbacks: Vec<Callback> = self
            .list
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in callbacks {
            callback(change);
        }
    }

    fn len(&self) -> usize {
        self.list.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Handle returned by [`SessionStore::subscribe`]. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    observers: Weak<Observers>,
    active: bool,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Keep the callback registered for the lifetime of the store.
    pub fn detach(mut self) {
        self.active = false;
    }

    fn release(&mut self) {
        if std::mem::take(&mut self.active) {
            if let Some(observers) = self.observers.upgrade() {
                observers.remove(self.id);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}

// ── Store ───────────────────────────────────────────────────────────

/// Owner of the credential and role for one client context.
pub struct SessionStore {
    context: Uuid,
    primary: Arc<dyn SessionStorage>,
    fallbacks: Vec<Arc<dyn SessionStorage>>,
    header: AuthHeader,
    observers: Arc<Observers>,
}

impl SessionStore {
    /// Create a store over `storage` with a fresh bearer header.
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self::with_header(storage, AuthHeader::new())
    }

    /// Create a store that drives an existing header. The header is primed
    /// from any token already present in storage.
    pub fn with_header(storage: Arc<dyn SessionStorage>, header: AuthHeader) -> Self {
        let store = Self {
            context: Uuid::new_v4(),
            primary: storage,
            fallbacks: Vec::new(),
            header,
            observers: Arc::new(Observers::default()),
        };
        store.sync_header();
        store
    }

    /// A volatile in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Another location that logout must also clear.
    pub fn with_fallback(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.fallbacks.push(storage);
        self
    }

    pub fn context_id(&self) -> Uuid {
        self.context
    }

    pub fn header(&self) -> &AuthHeader {
        &self.header
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub fn credential(&self) -> Option<SecretString> {
        read_credential(self.primary.as_ref())
    }

    /// The stored role; `None` whenever there is no credential.
    pub fn role(&self) -> Option<Role> {
        self.credential()?;
        read_json::<Role>(self.primary.as_ref(), ROLE_KEY)
    }

    pub fn session(&self) -> Option<Session> {
        let credential = self.credential()?;
        let role = read_json::<Role>(self.primary.as_ref(), ROLE_KEY);
        Some(Session { credential, role })
    }

    pub fn is_logged_in(&self) -> bool {
        self.credential().is_some()
    }

    /// Whether the current session may use `capability`. Guests may only
    /// browse the catalog.
    pub fn can(&self, capability: Capability) -> bool {
        match self.role() {
            Some(role) => role.can(capability),
            None => capability == Capability::BrowseCatalog,
        }
    }

    // ── Writes ──────────────────────────────────────────────────────

    /// Store a credential and optional role, then set the bearer header.
    pub fn login(&self, credential: SecretString, role: Option<Role>) -> Result<(), StorageError> {
        self.set_session(Session { credential, role })
    }

    /// Write credential and role as one unit. On a failed write nothing is
    /// left behind and the header is untouched.
    pub fn set_session(&self, session: Session) -> Result<(), StorageError> {
        let token = encode(session.credential.expose_secret());
        self.primary.set_item(TOKEN_KEY, &token, self.context)?;

        let role_write = match session.role {
            Some(role) => self
                .primary
                .set_item(ROLE_KEY, &encode(&role), self.context),
            None => self.primary.remove_item(ROLE_KEY, self.context),
        };
        if let Err(e) = role_write {
            let _ = self.primary.remove_item(TOKEN_KEY, self.context);
            let _ = self.primary.remove_item(ROLE_KEY, self.context);
            return Err(e);
        }

        self.header.set(&session.credential);
        info!(role = ?session.role, "session stored");
        self.observers
            .notify(SessionChange::SignedIn { role: session.role });
        Ok(())
    }

    /// Remove credential and role from every known location, clear the
    /// header and notify. Never fails; calling it twice is harmless.
    pub fn logout(&self) {
        for storage in std::iter::once(&self.primary).chain(&self.fallbacks) {
            for key in [TOKEN_KEY, ROLE_KEY] {
                if let Err(e) = storage.remove_item(key, self.context) {
                    warn!(key, error = %e, "failed to clear session entry");
                }
            }
        }
        self.header.clear();
        debug!("session cleared");
        self.observers.notify(SessionChange::SignedOut);
    }

    /// Alias of [`logout`](Self::logout).
    pub fn clear_session(&self) {
        self.logout();
    }

    // ── Notifications ───────────────────────────────────────────────

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(SessionChange) + Send + Sync + 'static,
    {
        let id = self.observers.add(Arc::new(callback));
        Subscription {
            id,
            observers: Arc::downgrade(&self.observers),
            active: true,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.observers.len()
    }

    /// Forward writes made by other contexts on the primary storage to this
    /// store's subscribers, re-syncing the header first.
    ///
    /// Returns `None` when the backend publishes no events. Must be called
    /// from within a tokio runtime.
    pub fn watch_storage(&self) -> Option<JoinHandle<()>> {
        let mut events = self.primary.events()?;
        let context = self.context;
        let primary = Arc::clone(&self.primary);
        let header = self.header.clone();
        let observers = Arc::clone(&self.observers);

        Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) if event.origin == context => {}
                    Ok(event) => {
                        debug!(key = %event.key, "session storage changed in another context");
                        match read_credential(primary.as_ref()) {
                            Some(token) => header.set(&token),
                            None => header.clear(),
                        }
                        observers.notify(SessionChange::External);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "storage event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }))
    }

    fn sync_header(&self) {
        match self.credential() {
            Some(token) => self.header.set(&token),
            None => self.header.clear(),
        }
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("context", &self.context)
            .field("fallbacks", &self.fallbacks.len())
            .field("header", &self.header)
            .field("subscribers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn read_credential(storage: &dyn SessionStorage) -> Option<SecretString> {
    read_json::<String>(storage, TOKEN_KEY)
        .filter(|token| !token.is_empty())
        .map(SecretString::from)
}

fn read_json<T: serde::de::DeserializeOwned>(storage: &dyn SessionStorage, key: &str) -> Option<T> {
    let raw = match storage.get_item(key) {
        Ok(raw) => raw?,
        Err(e) => {
            debug!(key, error = %e, "session storage read failed");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(key, error = %e, "ignoring malformed session entry");
            None
        }
    }
}

fn encode<T: serde::Serialize + ?Sized>(value: &T) -> String {
    // Strings and unit enums always serialize.
    serde_json::to_string(value).unwrap_or_default()
}
