#![allow(clippy::unwrap_used)]
// Integration tests for `Coordinator` and `AccountService` against a mock server.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use secrecy::SecretString;
use serde_json::json;
use tokio::sync::broadcast;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use libris_core::{
    AccountService, Applied, ApiClient, BookChanges, BookInput, CoreError, Coordinator, EntityId,
    Level, Navigator, Notification, Notifier, RefreshTarget, Role, SessionStore, View,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Coordinator) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/api", server.uri())).unwrap();
    let session = Arc::new(SessionStore::in_memory());
    session
        .login(SecretString::from("tok".to_owned()), Some(Role::Librarian))
        .unwrap();
    let client = ApiClient::with_client(reqwest::Client::new(), base_url, session);
    let coordinator = Coordinator::new(Arc::new(client), Notifier::new());
    (server, coordinator)
}

fn book_json(id: &str, title: &str, borrowed: u32) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "author": "Frank Herbert",
        "genre": "Science Fiction",
        "isbn": "9780441013593",
        "total_copies": 5,
        "borrowings_count": borrowed
    })
}

async fn mount_books(server: &MockServer, books: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/books"))
        .respond_with(ResponseTemplate::new(200).set_body_json(books))
        .up_to_n_times(1)
        .mount(server)
        .await;
}

fn ids(coordinator: &Coordinator) -> Vec<String> {
    coordinator
        .books()
        .iter()
        .map(|b| b.id.as_str().to_owned())
        .collect()
}

fn drain(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

// ── Reconciliation ──────────────────────────────────────────────────

#[tokio::test]
async fn test_borrow_increments_count_without_refetch() {
    let (server, coordinator) = setup().await;
    mount_books(&server, json!([book_json("1", "Dune", 3)])).await;
    coordinator.load_books().await.unwrap();

    Mock::given(method("POST"))
        .and(path("/api/borrowings"))
        .and(body_json(json!({"book_id": "1"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "77"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/books"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let mut notes = coordinator.notifier().subscribe();
    let applied = coordinator.borrow_book(EntityId::from("1")).await.unwrap();

    assert_eq!(applied, Applied::Patched);
    assert_eq!(coordinator.book(&EntityId::from("1")).unwrap().borrowings_count, 4);
    let notes = drain(&mut notes);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, Level::Success);
    assert_eq!(notes[0].message, "Borrowed \"Dune\"");
}

#[tokio::test]
async fn test_delete_removes_exactly_one_row() {
    let (server, coordinator) = setup().await;
    mount_books(
        &server,
        json!([book_json("1", "Dune", 0), book_json("2", "Emma", 0)]),
    )
    .await;
    coordinator.load_books().await.unwrap();

    Mock::given(method("DELETE"))
        .and(path("/api/books/1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let applied = coordinator.delete_book(EntityId::from("1")).await.unwrap();
    assert_eq!(applied, Applied::Patched);
    assert_eq!(ids(&coordinator), ["2"]);
}

#[tokio::test]
async fn test_failed_delete_leaves_list_and_notifies_once() {
    let (server, coordinator) = setup().await;
    mount_books(
        &server,
        json!([book_json("1", "Dune", 0), book_json("2", "Emma", 0)]),
    )
    .await;
    coordinator.load_books().await.unwrap();

    Mock::given(method("DELETE"))
        .and(path("/api/books/1"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"error": "Book has active borrowings"})),
        )
        .mount(&server)
        .await;

    let mut notes = coordinator.notifier().subscribe();
    let err = coordinator
        .delete_book(EntityId::from("1"))
        .await
        .unwrap_err();

    assert_eq!(err.user_message(), "Book has active borrowings");
    assert_eq!(ids(&coordinator), ["1", "2"]);
    let notes = drain(&mut notes);
    assert_eq!(
        notes,
        [Notification {
            level: Level::Error,
            message: "Book has active borrowings".into()
        }]
    );
    assert!(!coordinator.in_flight().is_loading(&libris_core::ActionKey::new(
        libris_core::ActionKind::DeleteBook,
        libris_core::Target::Book(EntityId::from("1")),
    )));
}

#[tokio::test]
async fn test_create_prepends_server_entity() {
    let (server, coordinator) = setup().await;
    mount_books(&server, json!([book_json("1", "Emma", 0)])).await;
    coordinator.load_books().await.unwrap();

    Mock::given(method("POST"))
        .and(path("/api/books"))
        .respond_with(ResponseTemplate::new(201).set_body_json(book_json("b1", "Dune", 0)))
        .mount(&server)
        .await;

    let input = BookInput {
        title: "Dune".into(),
        author: "Frank Herbert".into(),
        genre: "Science Fiction".into(),
        isbn: "9780441013593".into(),
        total_copies: 5,
    };
    let applied = coordinator.create_book(input).await.unwrap();

    assert_eq!(applied, Applied::Patched);
    assert_eq!(ids(&coordinator), ["b1", "1"]);
}

#[tokio::test]
async fn test_update_replaces_row_in_place() {
    let (server, coordinator) = setup().await;
    mount_books(
        &server,
        json!([book_json("1", "Dune", 0), book_json("2", "Emma", 0)]),
    )
    .await;
    coordinator.load_books().await.unwrap();

    Mock::given(method("PUT"))
        .and(path("/api/books/2"))
        .and(body_json(json!({"book": {"title": "Emma (annotated)"}})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(book_json("2", "Emma (annotated)", 0)),
        )
        .mount(&server)
        .await;

    let changes = BookChanges {
        title: Some("Emma (annotated)".into()),
        ..BookChanges::default()
    };
    coordinator
        .update_book(EntityId::from("2"), changes)
        .await
        .unwrap();

    assert_eq!(ids(&coordinator), ["1", "2"]);
    assert_eq!(
        coordinator.book(&EntityId::from("2")).unwrap().title,
        "Emma (annotated)"
    );
}

// ── In-flight guard ─────────────────────────────────────────────────

#[tokio::test]
async fn test_second_action_on_same_target_is_busy() {
    let (server, coordinator) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/borrowings"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (first, second) = tokio::join!(
        coordinator.borrow_book(EntityId::from("1")),
        coordinator.borrow_book(EntityId::from("1")),
    );

    assert!(first.is_ok());
    let err = second.unwrap_err();
    assert!(err.is_busy());
    assert!(coordinator.in_flight().is_empty());
}

#[tokio::test]
async fn test_different_targets_run_concurrently() {
    let (server, coordinator) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/borrowings"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(50)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let (first, second) = tokio::join!(
        coordinator.borrow_book(EntityId::from("1")),
        coordinator.borrow_book(EntityId::from("2")),
    );
    assert!(first.is_ok());
    assert!(second.is_ok());
}

// ── Refetch ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_return_refetches_dashboard_and_current_borrowings() {
    let (server, coordinator) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/borrowings/7/return"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dashboards/librarian"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_books": 12,
            "total_borrowed_books": 3,
            "books_due_today": 1,
            "overdue_members": []
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/borrowings/current"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "8",
            "user_name": "Ada",
            "book_title": "Dune",
            "borrowed_at": "2026-10-01T10:00:00Z",
            "due_date": "2026-10-15T10:00:00Z"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let mut notes = coordinator.notifier().subscribe();
    let applied = coordinator
        .return_borrowing(EntityId::from("7"))
        .await
        .unwrap();

    assert_eq!(applied, Applied::Refetched);
    assert_eq!(coordinator.librarian_dashboard().unwrap().total_books, 12);
    assert_eq!(coordinator.current_borrowings().len(), 1);
    assert_eq!(drain(&mut notes)[0].message, "Marked as returned");

    // Counts come from the refetched list, not the dashboard's cached 3 / 1.
    let morning = Utc.with_ymd_and_hms(2026, 10, 15, 8, 0, 0).unwrap();
    let snap = coordinator.librarian_snapshot(&morning);
    assert_eq!(snap.total_books, 12);
    assert_eq!(snap.total_borrowed_books, 1);
    assert_eq!(snap.books_due_today, 1);
}

#[tokio::test]
async fn test_failed_refresh_is_returned_after_earlier_success() {
    let (server, coordinator) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/dashboards/librarian"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_books": 12,
            "total_borrowed_books": 0,
            "books_due_today": 0,
            "overdue_members": []
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dashboards/librarian"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"error": "Database unavailable"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/borrowings/current"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let targets = [
        RefreshTarget::LibrarianDashboard,
        RefreshTarget::CurrentBorrowings,
    ];
    coordinator.refresh(&targets).await.unwrap();

    let mut notes = coordinator.notifier().subscribe();
    let err = coordinator.refresh(&targets).await.unwrap_err();

    assert!(matches!(err, CoreError::Server { status: 500, .. }));
    // The earlier payload is still held, but the caller was told it is stale.
    assert_eq!(coordinator.librarian_dashboard().unwrap().total_books, 12);
    let notes = drain(&mut notes);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, Level::Error);
    assert_eq!(notes[0].message, "Database unavailable");
}

// ── Session invalidation ────────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized_clears_session_and_redirects_once() {
    let (server, coordinator) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/dashboards/librarian"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let navigator = Navigator::new(View::Dashboard);
    let mut views = navigator.subscribe();
    let redirect = navigator.spawn_unauthorized_redirect(coordinator.client().subscribe_auth_events());
    let mut notes = coordinator.notifier().subscribe();

    let err = coordinator.load_librarian_dashboard().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(matches!(err, CoreError::Unauthorized { .. }));
    assert!(!coordinator.client().session().is_logged_in());

    views.changed().await.unwrap();
    assert_eq!(*views.borrow_and_update(), View::Login);
    assert_eq!(navigator.history(), [View::Login]);
    assert!(drain(&mut notes).is_empty());

    redirect.abort();
}

// ── Closing ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_result_after_close_is_discarded() {
    let (server, coordinator) = setup().await;
    mount_books(&server, json!([book_json("1", "Dune", 3)])).await;
    coordinator.load_books().await.unwrap();

    Mock::given(method("POST"))
        .and(path("/api/borrowings"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;

    let mut notes = coordinator.notifier().subscribe();
    let closer = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        coordinator.close();
    };
    let (applied, ()) = tokio::join!(coordinator.borrow_book(EntityId::from("1")), closer);

    assert_eq!(applied.unwrap(), Applied::Discarded);
    assert_eq!(coordinator.book(&EntityId::from("1")).unwrap().borrowings_count, 3);
    assert!(drain(&mut notes).is_empty());
}

// ── Account flows ───────────────────────────────────────────────────

#[tokio::test]
async fn test_logout_clears_session_even_when_server_fails() {
    let (server, coordinator) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/session"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let notifier = Notifier::new();
    let mut notes = notifier.subscribe();
    let account = AccountService::new(Arc::clone(coordinator.client()), notifier);

    assert!(!account.logout().await);
    assert!(!coordinator.client().session().is_logged_in());
    let notes = drain(&mut notes);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, Level::Warning);
}

#[tokio::test]
async fn test_login_failure_reports_server_message() {
    let (server, coordinator) = setup().await;
    coordinator.client().session().logout();

    Mock::given(method("POST"))
        .and(path("/api/session"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid email or password"})),
        )
        .mount(&server)
        .await;

    let notifier = Notifier::new();
    let mut notes = notifier.subscribe();
    let account = AccountService::new(Arc::clone(coordinator.client()), notifier);

    let err = account
        .login("ada@example.com", &SecretString::from("nope".to_owned()))
        .await
        .unwrap_err();

    assert!(!err.is_unauthorized());
    assert_eq!(err.user_message(), "Invalid email or password");
    assert_eq!(drain(&mut notes)[0].message, "Invalid email or password");
}
