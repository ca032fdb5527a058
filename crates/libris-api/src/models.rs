// Wire types for the Libris REST API.
//
// Identifiers arrive as JSON strings or numbers depending on the backend;
// both normalise to `EntityId`. Timestamps accept RFC 3339, naive
// date-times and bare dates (midnight UTC).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::Display;

// ── Identifiers ─────────────────────────────────────────────────────

/// Record identifier, always held as its string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for EntityId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Self(s),
            Raw::Unsigned(n) => Self(n.to_string()),
            Raw::Signed(n) => Self(n.to_string()),
        })
    }
}

// ── Books ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: EntityId,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub isbn: String,
    #[serde(default)]
    pub total_copies: u32,
    #[serde(default)]
    pub borrowings_count: u32,
}

/// Fields for creating a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookInput {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub isbn: String,
    pub total_copies: u32,
}

/// Partial update; only present fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_copies: Option<u32>,
}

impl BookChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ── Accounts ────────────────────────────────────────────────────────

/// Sign-up form. The password is only exposed while serializing the body.
#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub name: String,
    pub email_address: String,
    pub password: secrecy::SecretString,
    pub password_confirmation: secrecy::SecretString,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub user: Option<LoginUser>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginUser {
    #[serde(default)]
    pub role: Option<String>,
}

impl LoginResponse {
    /// Role from `user.role`, falling back to a top-level `role`. Unknown
    /// role names are treated as absent.
    pub(crate) fn role(&self) -> Option<crate::auth::Role> {
        self.user
            .as_ref()
            .and_then(|u| u.role.as_deref())
            .or(self.role.as_deref())
            .and_then(|r| r.parse().ok())
    }
}

// ── Borrowings ──────────────────────────────────────────────────────

/// Display status of a borrowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum BorrowingStatus {
    Borrowed,
    Overdue,
    Returned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRef {
    pub id: EntityId,
    pub title: String,
    #[serde(default)]
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRef {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// A member's own borrowing with the full book reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowRecord {
    pub id: EntityId,
    pub book: BookRef,
    #[serde(with = "timestamp")]
    pub borrowed_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub due_date: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub returned_at: Option<DateTime<Utc>>,
}

/// Row of the library-wide current borrowings list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveBorrowing {
    pub id: EntityId,
    pub user_name: String,
    pub book_title: String,
    #[serde(with = "timestamp")]
    pub borrowed_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub due_date: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub returned_at: Option<DateTime<Utc>>,
}

/// Older member dashboard row carrying a server-computed status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberBorrowing {
    pub id: EntityId,
    pub title: String,
    #[serde(with = "timestamp")]
    pub due_date: DateTime<Utc>,
    pub status: BorrowingStatus,
}

// ── Dashboards ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverdueBookItem {
    pub book_id: EntityId,
    pub title: String,
    #[serde(with = "timestamp")]
    pub due_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borrowing_id: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverdueMember {
    pub member: MemberRef,
    #[serde(default)]
    pub overdue: Vec<OverdueBookItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarianDashboard {
    #[serde(default)]
    pub total_books: u32,
    #[serde(default)]
    pub total_borrowed_books: u32,
    #[serde(default)]
    pub books_due_today: u32,
    #[serde(default)]
    pub overdue_members: Vec<OverdueMember>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDashboard {
    #[serde(default)]
    pub my_borrowed_count: Option<u32>,
    #[serde(default)]
    pub my_overdue_count: Option<u32>,
    #[serde(default)]
    pub my_due_today_count: Option<u32>,
    #[serde(default)]
    pub my_borrowings: Vec<MemberBorrowing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<Vec<BorrowRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overdue: Option<Vec<BorrowRecord>>,
}

// ── Timestamps ──────────────────────────────────────────────────────

pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(naive.and_utc());
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        #[allow(clippy::ref_option)]
        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(raw) if raw.is_empty() => Ok(None),
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn ids_accept_strings_and_numbers() {
        let book: Book = serde_json::from_value(json!({
            "id": 42, "title": "Dune", "author": "Frank Herbert",
            "genre": "SF", "isbn": "9780441013593",
            "total_copies": 3, "borrowings_count": 1
        }))
        .unwrap();
        assert_eq!(book.id, EntityId::from("42"));

        let item: OverdueBookItem = serde_json::from_value(json!({
            "book_id": "b1", "title": "Dune", "due_date": "2024-06-01"
        }))
        .unwrap();
        assert_eq!(item.book_id.as_str(), "b1");
        assert_eq!(item.borrowing_id, None);
    }

    #[test]
    fn ids_serialize_as_strings() {
        assert_eq!(json!(EntityId::from(7)), json!("7"));
    }

    #[test]
    fn timestamps_accept_several_shapes() {
        let expected = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
        assert_eq!(timestamp::parse("2024-06-15"), Some(expected));
        assert_eq!(timestamp::parse("2024-06-15T00:00:00Z"), Some(expected));
        assert_eq!(timestamp::parse("2024-06-15T02:00:00+02:00"), Some(expected));
        assert_eq!(timestamp::parse("2024-06-15T00:00:00.000"), Some(expected));
        assert_eq!(timestamp::parse("tomorrow"), None);
    }

    #[test]
    fn returned_at_may_be_null_or_missing() {
        let with_null: ActiveBorrowing = serde_json::from_value(json!({
            "id": 1, "user_name": "Ada", "book_title": "Dune",
            "borrowed_at": "2024-06-01T10:00:00Z", "due_date": "2024-06-15T10:00:00Z",
            "returned_at": null
        }))
        .unwrap();
        assert_eq!(with_null.returned_at, None);

        let record: BorrowRecord = serde_json::from_value(json!({
            "id": "r1", "book": {"id": 3, "title": "Dune", "author": "Frank Herbert"},
            "borrowed_at": "2024-06-01T10:00:00Z", "due_date": "2024-06-15T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(record.returned_at, None);
        assert_eq!(record.book.id.as_str(), "3");
    }

    #[test]
    fn book_changes_skip_absent_fields() {
        let changes = BookChanges {
            total_copies: Some(5),
            ..BookChanges::default()
        };
        assert_eq!(serde_json::to_value(&changes).unwrap(), json!({"total_copies": 5}));
        assert!(BookChanges::default().is_empty());
        assert!(!changes.is_empty());
    }

    #[test]
    fn member_dashboard_tolerates_both_shapes() {
        let legacy: MemberDashboard = serde_json::from_value(json!({
            "my_borrowed_count": 2, "my_overdue_count": 1, "my_due_today_count": 0,
            "my_borrowings": [
                {"id": 1, "title": "Dune", "due_date": "2024-06-01", "status": "overdue"}
            ]
        }))
        .unwrap();
        assert_eq!(legacy.my_borrowings[0].status, BorrowingStatus::Overdue);
        assert!(legacy.active.is_none());

        let modern: MemberDashboard = serde_json::from_value(json!({"active": [], "overdue": []})).unwrap();
        assert_eq!(modern.active, Some(vec![]));
        assert_eq!(modern.my_borrowed_count, None);
    }

    #[test]
    fn login_role_precedence() {
        let nested: LoginResponse = serde_json::from_value(json!({
            "auth_token": "t", "user": {"role": "librarian"}, "role": "member"
        }))
        .unwrap();
        assert_eq!(nested.role(), Some(crate::auth::Role::Librarian));

        let flat: LoginResponse = serde_json::from_value(json!({"auth_token": "t", "role": "member"})).unwrap();
        assert_eq!(flat.role(), Some(crate::auth::Role::Member));

        let unknown: LoginResponse = serde_json::from_value(json!({"auth_token": "t", "role": "admin"})).unwrap();
        assert_eq!(unknown.role(), None);
    }
}
