// ── Action / refresh coordinator ──
//
// One coordinator per view. It owns that view's book list, current
// borrowings and dashboard payloads, runs mutating actions one request at
// a time per target, and reconciles answers through the policy table in
// `action`. Once the view closes, late answers are dropped on the floor.

use std::sync::Arc;

use chrono::{DateTime, TimeZone};
use libris_api::{
    ActiveBorrowing, ApiClient, Book, BookChanges, BookInput, EntityId, LibrarianDashboard,
    MemberDashboard, Operation,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::action::{self, Action, Effect, Outcome, Policy, RefreshTarget};
use crate::dashboard::{LibrarianSnapshot, MemberSnapshot};
use crate::error::CoreError;
use crate::notify::Notifier;
use crate::store::{ActionKey, Collection, InFlight};

/// How an action's result reached local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The book list was patched in place.
    Patched,
    /// The server confirmed, but nothing in this view's list matched.
    Unchanged,
    /// Affected data was re-fetched.
    Refetched,
    /// The view closed before the answer arrived; nothing was touched.
    Discarded,
}

struct Inner {
    client: Arc<ApiClient>,
    notifier: Notifier,
    books: Collection<Book>,
    current_borrowings: Collection<ActiveBorrowing>,
    librarian_dashboard: watch::Sender<Option<Arc<LibrarianDashboard>>>,
    member_dashboard: watch::Sender<Option<Arc<MemberDashboard>>>,
    in_flight: InFlight,
    scope: CancellationToken,
}

/// Per-view owner of collections and mutating actions.
///
/// Cheaply cloneable via `Arc<Inner>`; clones share state.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

impl Coordinator {
    pub fn new(client: Arc<ApiClient>, notifier: Notifier) -> Self {
        let (librarian_dashboard, _) = watch::channel(None);
        let (member_dashboard, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                client,
                notifier,
                books: Collection::new(),
                current_borrowings: Collection::new(),
                librarian_dashboard,
                member_dashboard,
                in_flight: InFlight::new(),
                scope: CancellationToken::new(),
            }),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Close the view. Answers arriving afterwards are discarded.
    pub fn close(&self) {
        debug!("closing coordinator");
        self.inner.scope.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.scope.is_cancelled()
    }

    // ── State access ─────────────────────────────────────────────────

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.inner.client
    }

    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    pub fn books(&self) -> Arc<Vec<Book>> {
        self.inner.books.snapshot()
    }

    pub fn book(&self, id: &EntityId) -> Option<Book> {
        self.inner.books.get(id)
    }

    pub fn current_borrowings(&self) -> Arc<Vec<ActiveBorrowing>> {
        self.inner.current_borrowings.snapshot()
    }

    pub fn librarian_dashboard(&self) -> Option<Arc<LibrarianDashboard>> {
        self.inner.librarian_dashboard.borrow().clone()
    }

    pub fn member_dashboard(&self) -> Option<Arc<MemberDashboard>> {
        self.inner.member_dashboard.borrow().clone()
    }

    /// Librarian projection of what this view has loaded, as of `now`.
    pub fn librarian_snapshot<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> LibrarianSnapshot {
        let dashboard = self.librarian_dashboard();
        let current = self
            .inner
            .current_borrowings
            .is_loaded()
            .then(|| self.current_borrowings());
        LibrarianSnapshot::derive(
            dashboard.as_deref(),
            current.as_deref().map(Vec::as_slice),
            now,
        )
    }

    /// Member projection, once the member dashboard has been loaded.
    pub fn member_snapshot<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<MemberSnapshot> {
        self.member_dashboard()
            .map(|dashboard| MemberSnapshot::derive(&dashboard, now))
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.inner.in_flight
    }

    pub fn is_loading(&self, key: &ActionKey) -> bool {
        self.inner.in_flight.is_loading(key)
    }

    // ── Fetches ──────────────────────────────────────────────────────

    pub async fn load_books(&self) -> Result<Arc<Vec<Book>>, CoreError> {
        let result = self.inner.client.list_books().await;
        if let Some(books) = self.settle(Operation::ListBooks, result)? {
            self.inner.books.replace_all(books);
        }
        Ok(self.books())
    }

    /// Fetch one book, refreshing its row if this view lists it.
    pub async fn load_book(&self, id: &EntityId) -> Result<Book, CoreError> {
        match self.inner.client.get_book(id).await {
            Ok(book) => {
                if !self.is_closed() {
                    self.patch(Policy::ReplaceById, &Outcome::Book(book.clone()));
                }
                Ok(book)
            }
            Err(e) => Err(self.fail(Operation::GetBook, e)),
        }
    }

    pub async fn load_current_borrowings(&self) -> Result<Arc<Vec<ActiveBorrowing>>, CoreError> {
        let result = self.inner.client.current_borrowings().await;
        if let Some(items) = self.settle(Operation::CurrentBorrowings, result)? {
            self.inner.current_borrowings.replace_all(items);
        }
        Ok(self.current_borrowings())
    }

    pub async fn load_librarian_dashboard(
        &self,
    ) -> Result<Option<Arc<LibrarianDashboard>>, CoreError> {
        let result = self.inner.client.librarian_dashboard().await;
        if let Some(dashboard) = self.settle(Operation::LibrarianDashboard, result)? {
            self.inner
                .librarian_dashboard
                .send_replace(Some(Arc::new(dashboard)));
        }
        Ok(self.librarian_dashboard())
    }

    pub async fn load_member_dashboard(&self) -> Result<Option<Arc<MemberDashboard>>, CoreError> {
        let result = self.inner.client.member_dashboard().await;
        if let Some(dashboard) = self.settle(Operation::MemberDashboard, result)? {
            self.inner
                .member_dashboard
                .send_replace(Some(Arc::new(dashboard)));
        }
        Ok(self.member_dashboard())
    }

    /// Re-fetch `targets` concurrently.
    ///
    /// Every load runs to completion and reports its own failure; the first
    /// failure (in `RefreshTarget` order) is returned so callers do not
    /// present data left over from an earlier load.
    pub async fn refresh(&self, targets: &[RefreshTarget]) -> Result<(), CoreError> {
        let wants = |target| targets.contains(&target);

        let books = async {
            if wants(RefreshTarget::Books) {
                self.load_books().await?;
            }
            Ok::<_, CoreError>(())
        };
        let librarian = async {
            if wants(RefreshTarget::LibrarianDashboard) {
                self.load_librarian_dashboard().await?;
            }
            Ok::<_, CoreError>(())
        };
        let member = async {
            if wants(RefreshTarget::MemberDashboard) {
                self.load_member_dashboard().await?;
            }
            Ok::<_, CoreError>(())
        };
        let current = async {
            if wants(RefreshTarget::CurrentBorrowings) {
                self.load_current_borrowings().await?;
            }
            Ok::<_, CoreError>(())
        };

        let (books, librarian, member, current) = tokio::join!(books, librarian, member, current);
        books.and(librarian).and(member).and(current)
    }

    // ── Actions ──────────────────────────────────────────────────────

    pub async fn create_book(&self, input: BookInput) -> Result<Applied, CoreError> {
        self.execute(Action::CreateBook(input)).await
    }

    pub async fn update_book(
        &self,
        id: EntityId,
        changes: BookChanges,
    ) -> Result<Applied, CoreError> {
        self.execute(Action::UpdateBook { id, changes }).await
    }

    pub async fn delete_book(&self, id: EntityId) -> Result<Applied, CoreError> {
        self.execute(Action::DeleteBook { id }).await
    }

    pub async fn borrow_book(&self, id: EntityId) -> Result<Applied, CoreError> {
        self.execute(Action::BorrowBook { id }).await
    }

    pub async fn return_borrowing(&self, id: EntityId) -> Result<Applied, CoreError> {
        self.execute(Action::ReturnBorrowing { id }).await
    }

    /// Run one action: claim its target, send exactly one request, then
    /// reconcile and notify.
    ///
    /// A target already in flight is refused with [`CoreError::Busy`] and no
    /// request is sent. Failures publish one error notification (except
    /// 401/403, which the navigation listener handles) and leave local
    /// state untouched.
    pub async fn execute(&self, action: Action) -> Result<Applied, CoreError> {
        let key = action.key();
        let operation = action.operation();

        let Some(_guard) = self.inner.in_flight.try_begin(key.clone()) else {
            debug!(kind = %key.kind, target = %key.target, "action already in flight");
            return Err(CoreError::Busy {
                operation,
                target: key.target.to_string(),
            });
        };

        let policy = action.policy();
        let success = self.success_message(&action);

        let outcome = match self.dispatch(action).await {
            Ok(outcome) => outcome,
            Err(err) => {
                if !self.is_closed() {
                    self.report(&err);
                }
                return Err(err);
            }
        };

        if self.is_closed() {
            debug!(%operation, "view closed; discarding result");
            return Ok(Applied::Discarded);
        }

        let effect = self.patch(policy, &outcome);
        self.inner.notifier.success(success);

        Ok(match effect {
            Effect::Patched => Applied::Patched,
            Effect::Unchanged => Applied::Unchanged,
            Effect::Refetch(targets) => {
                // The action itself succeeded; failed reloads are already reported.
                if let Err(err) = self.refresh(targets).await {
                    debug!(error = %err, "refetch after action failed");
                }
                Applied::Refetched
            }
        })
    }

    async fn dispatch(&self, action: Action) -> Result<Outcome, CoreError> {
        let client = &self.inner.client;
        let operation = action.operation();
        let result = match action {
            Action::CreateBook(input) => client.create_book(&input).await.map(Outcome::Book),
            Action::UpdateBook { id, changes } => {
                client.update_book(&id, &changes).await.map(Outcome::Book)
            }
            Action::DeleteBook { id } => client.delete_book(&id).await.map(|()| Outcome::Deleted(id)),
            Action::BorrowBook { id } => client.borrow_book(&id).await.map(|()| Outcome::Borrowed(id)),
            Action::ReturnBorrowing { id } => client
                .return_borrowing(&id)
                .await
                .map(|()| Outcome::Returned(id)),
        };
        result.map_err(|e| CoreError::from_api(operation, e))
    }

    fn patch(&self, policy: Policy, outcome: &Outcome) -> Effect {
        let mut effect = Effect::Unchanged;
        self.inner.books.modify(|books| {
            effect = action::reduce(books, policy, outcome);
            effect.changed()
        });
        effect
    }

    fn success_message(&self, action: &Action) -> String {
        match action {
            Action::CreateBook(_) => "Book created".to_owned(),
            Action::UpdateBook { .. } => "Book updated".to_owned(),
            Action::DeleteBook { .. } => "Book deleted".to_owned(),
            Action::BorrowBook { id } => match self.inner.books.get(id) {
                Some(book) => format!("Borrowed \"{}\"", book.title),
                None => "Book borrowed".to_owned(),
            },
            Action::ReturnBorrowing { .. } => "Marked as returned".to_owned(),
        }
    }

    /// Map a fetch result: `Ok(None)` once the view is closed, one error
    /// notification on failure.
    fn settle<T>(
        &self,
        operation: Operation,
        result: Result<T, libris_api::Error>,
    ) -> Result<Option<T>, CoreError> {
        match result {
            Ok(_) if self.is_closed() => {
                debug!(%operation, "view closed; discarding fetch");
                Ok(None)
            }
            Ok(value) => Ok(Some(value)),
            Err(e) => Err(self.fail(operation, e)),
        }
    }

    /// Translate a failed request, notifying unless the view is closed.
    fn fail(&self, operation: Operation, err: libris_api::Error) -> CoreError {
        let err = CoreError::from_api(operation, err);
        if !self.is_closed() {
            self.report(&err);
        }
        err
    }

    fn report(&self, err: &CoreError) {
        if err.is_unauthorized() {
            debug!(error = %err, "not notifying; session redirect handles it");
            return;
        }
        self.inner.notifier.error(err.user_message());
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("books", &self.inner.books.len())
            .field("current_borrowings", &self.inner.current_borrowings.len())
            .field("in_flight", &self.inner.in_flight.len())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
