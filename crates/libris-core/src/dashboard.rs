// ── Dashboard projections ──
//
// Member and librarian views of the dashboard payloads, grouped by derived
// status. Rebuilt from the raw payload on every read.

use chrono::{DateTime, TimeZone};
use libris_api::{
    ActiveBorrowing, BorrowRecord, BorrowingStatus, LibrarianDashboard, MemberBorrowing,
    MemberDashboard, OverdueMember,
};
use serde::Serialize;

use crate::status::{self, BorrowingCounts};

/// What a member sees about their own borrowings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemberSnapshot {
    pub counts: BorrowingCounts,
    pub active: Vec<BorrowRecord>,
    pub overdue: Vec<BorrowRecord>,
    pub returned: Vec<BorrowRecord>,
    /// Rows from servers that only send pre-computed statuses.
    pub legacy: Vec<MemberBorrowing>,
}

impl MemberSnapshot {
    /// Derive from a member dashboard.
    ///
    /// When the payload carries raw records (`active` / `overdue`), they are
    /// merged, de-duplicated by id and re-classified against `now`; the
    /// server's counts are ignored. Otherwise the server's counts and
    /// statuses are used as sent.
    pub fn derive<Tz: TimeZone>(dashboard: &MemberDashboard, now: &DateTime<Tz>) -> Self {
        if dashboard.active.is_none() && dashboard.overdue.is_none() {
            return Self::from_server_counts(dashboard);
        }

        let mut records: Vec<&BorrowRecord> = Vec::new();
        for record in dashboard
            .active
            .iter()
            .chain(dashboard.overdue.iter())
            .flatten()
        {
            if !records.iter().any(|r| r.id == record.id) {
                records.push(record);
            }
        }

        let counts = status::summarize(records.iter().copied(), now);
        let mut snapshot = Self {
            counts,
            ..Self::default()
        };
        for record in records {
            let bucket = match status::status(record, now) {
                BorrowingStatus::Borrowed => &mut snapshot.active,
                BorrowingStatus::Overdue => &mut snapshot.overdue,
                BorrowingStatus::Returned => &mut snapshot.returned,
            };
            bucket.push(record.clone());
        }
        snapshot
    }

    fn from_server_counts(dashboard: &MemberDashboard) -> Self {
        let borrowed = dashboard.my_borrowed_count.map_or_else(
            || {
                dashboard
                    .my_borrowings
                    .iter()
                    .filter(|b| b.status != BorrowingStatus::Returned)
                    .count()
            },
            widen,
        );
        let overdue = dashboard.my_overdue_count.map_or_else(
            || {
                dashboard
                    .my_borrowings
                    .iter()
                    .filter(|b| b.status == BorrowingStatus::Overdue)
                    .count()
            },
            widen,
        );
        let returned = dashboard
            .my_borrowings
            .iter()
            .filter(|b| b.status == BorrowingStatus::Returned)
            .count();

        Self {
            counts: BorrowingCounts {
                borrowed,
                active: borrowed.saturating_sub(overdue),
                overdue,
                due_today: dashboard.my_due_today_count.map_or(0, widen),
                returned,
            },
            legacy: dashboard.my_borrowings.clone(),
            ..Self::default()
        }
    }
}

/// What a librarian sees: library-wide totals, overdue members and the
/// current borrowings list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LibrarianSnapshot {
    pub total_books: u32,
    /// Unreturned borrowings. Counted from the current list once it is
    /// loaded, else the server's figure.
    pub total_borrowed_books: usize,
    /// Unreturned borrowings due on `now`'s calendar day, sourced like
    /// `total_borrowed_books`.
    pub books_due_today: usize,
    pub overdue_members: Vec<OverdueMember>,
    /// Overdue items across all members, re-checked against `now`.
    pub overdue_items: usize,
    pub current: Vec<(ActiveBorrowing, BorrowingStatus)>,
    pub current_counts: BorrowingCounts,
}

impl LibrarianSnapshot {
    /// Combine the dashboard aggregate and the current borrowings list,
    /// either of which may not have been loaded yet.
    ///
    /// When the current list is present its records are re-classified
    /// against `now` and the borrowed and due-today figures come from them;
    /// the server's cached counts are only used without it.
    pub fn derive<Tz: TimeZone>(
        dashboard: Option<&LibrarianDashboard>,
        current: Option<&[ActiveBorrowing]>,
        now: &DateTime<Tz>,
    ) -> Self {
        let mut snapshot = Self::default();

        if let Some(dashboard) = dashboard {
            snapshot.total_books = dashboard.total_books;
            snapshot.total_borrowed_books = widen(dashboard.total_borrowed_books);
            snapshot.books_due_today = widen(dashboard.books_due_today);
            snapshot.overdue_members = dashboard.overdue_members.clone();
            snapshot.overdue_items = dashboard
                .overdue_members
                .iter()
                .flat_map(|m| &m.overdue)
                .filter(|item| status::is_overdue(*item, now))
                .count();
        }

        if let Some(current) = current {
            snapshot.current = current
                .iter()
                .map(|b| (b.clone(), status::status(b, now)))
                .collect();
            snapshot.current_counts = status::summarize(current, now);
            snapshot.total_borrowed_books = snapshot.current_counts.borrowed;
            snapshot.books_due_today = snapshot.current_counts.due_today;
        }
        snapshot
    }
}

fn widen(n: u32) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};
    use libris_api::{BookRef, EntityId, MemberRef, OverdueBookItem};
    use pretty_assertions::assert_eq;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn record(id: &str, due_hours: i64, returned: bool) -> BorrowRecord {
        BorrowRecord {
            id: EntityId::from(id),
            book: BookRef {
                id: EntityId::from("b1"),
                title: "Dune".into(),
                author: "Frank Herbert".into(),
            },
            borrowed_at: now() - Duration::days(14),
            due_date: now() + Duration::hours(due_hours),
            returned_at: returned.then(now),
        }
    }

    fn member_dashboard() -> MemberDashboard {
        MemberDashboard {
            my_borrowed_count: None,
            my_overdue_count: None,
            my_due_today_count: None,
            my_borrowings: Vec::new(),
            active: None,
            overdue: None,
        }
    }

    #[test]
    fn member_snapshot_reclassifies_raw_records() {
        let dashboard = MemberDashboard {
            // Server counts are stale and must be ignored.
            my_borrowed_count: Some(9),
            // "r1" was active when the server answered but is overdue now.
            active: Some(vec![record("r1", -2, false), record("r2", 48, false)]),
            overdue: Some(vec![record("r1", -2, false), record("r3", -72, false)]),
            ..member_dashboard()
        };

        let snap = MemberSnapshot::derive(&dashboard, &now());

        assert_eq!(snap.counts.borrowed, 3);
        assert_eq!(snap.counts.overdue, 2);
        assert_eq!(snap.counts.active, 1);
        assert_eq!(snap.counts.due_today, 1);
        let overdue_ids: Vec<_> = snap.overdue.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(overdue_ids, ["r1", "r3"]);
        assert_eq!(snap.active[0].id.as_str(), "r2");
        assert!(snap.legacy.is_empty());
    }

    #[test]
    fn member_snapshot_falls_back_to_server_counts() {
        let dashboard = MemberDashboard {
            my_borrowed_count: Some(2),
            my_overdue_count: Some(1),
            my_due_today_count: Some(1),
            my_borrowings: vec![
                MemberBorrowing {
                    id: EntityId::from("1"),
                    title: "Dune".into(),
                    due_date: now(),
                    status: BorrowingStatus::Borrowed,
                },
                MemberBorrowing {
                    id: EntityId::from("2"),
                    title: "Emma".into(),
                    due_date: now() - Duration::days(1),
                    status: BorrowingStatus::Overdue,
                },
            ],
            ..member_dashboard()
        };

        let snap = MemberSnapshot::derive(&dashboard, &now());
        assert_eq!(
            snap.counts,
            BorrowingCounts {
                borrowed: 2,
                active: 1,
                overdue: 1,
                due_today: 1,
                returned: 0,
            }
        );
        assert_eq!(snap.legacy.len(), 2);
    }

    #[test]
    fn member_snapshot_counts_from_rows_when_server_omits_them() {
        let dashboard = MemberDashboard {
            my_borrowings: vec![MemberBorrowing {
                id: EntityId::from("1"),
                title: "Dune".into(),
                due_date: now(),
                status: BorrowingStatus::Overdue,
            }],
            ..member_dashboard()
        };
        let snap = MemberSnapshot::derive(&dashboard, &now());
        assert_eq!(snap.counts.borrowed, 1);
        assert_eq!(snap.counts.overdue, 1);
        assert_eq!(snap.counts.active, 0);
    }

    #[test]
    fn librarian_snapshot_combines_dashboard_and_current() {
        let dashboard = LibrarianDashboard {
            total_books: 10,
            total_borrowed_books: 3,
            books_due_today: 1,
            overdue_members: vec![OverdueMember {
                member: MemberRef {
                    id: EntityId::from("m1"),
                    name: "Bob".into(),
                    email: "bob@example.com".into(),
                },
                overdue: vec![OverdueBookItem {
                    book_id: EntityId::from("b2"),
                    title: "Emma".into(),
                    due_date: now() - Duration::days(2),
                    borrowing_id: Some(EntityId::from("x")),
                }],
            }],
        };
        let current = vec![
            ActiveBorrowing {
                id: EntityId::from("c1"),
                user_name: "Ada".into(),
                book_title: "Dune".into(),
                borrowed_at: now() - Duration::days(10),
                due_date: now() + Duration::days(4),
                returned_at: None,
            },
            ActiveBorrowing {
                id: EntityId::from("c2"),
                user_name: "Bob".into(),
                book_title: "Emma".into(),
                borrowed_at: now() - Duration::days(20),
                due_date: now() - Duration::days(2),
                returned_at: None,
            },
        ];

        let snap = LibrarianSnapshot::derive(Some(&dashboard), Some(current.as_slice()), &now());

        assert_eq!(snap.total_books, 10);
        // The server said 3 borrowed and 1 due today; the list says otherwise.
        assert_eq!(snap.total_borrowed_books, 2);
        assert_eq!(snap.books_due_today, 0);
        assert_eq!(snap.overdue_items, 1);
        assert_eq!(snap.current[0].1, BorrowingStatus::Borrowed);
        assert_eq!(snap.current[1].1, BorrowingStatus::Overdue);
        assert_eq!(snap.current_counts.overdue, 1);
        assert_eq!(snap.current_counts.active, 1);
    }

    #[test]
    fn librarian_counts_follow_raw_records_over_server_cache() {
        let dashboard = LibrarianDashboard {
            total_books: 4,
            total_borrowed_books: 0,
            books_due_today: 0,
            overdue_members: Vec::new(),
        };
        let current = [ActiveBorrowing {
            id: EntityId::from("c1"),
            user_name: "Ada".into(),
            book_title: "Dune".into(),
            borrowed_at: now() - Duration::days(14),
            due_date: now() + Duration::hours(2),
            returned_at: None,
        }];

        let snap = LibrarianSnapshot::derive(Some(&dashboard), Some(current.as_slice()), &now());

        assert_eq!(snap.total_borrowed_books, 1);
        assert_eq!(snap.books_due_today, 1);
        assert_eq!(snap.books_due_today, snap.current_counts.due_today);
    }

    #[test]
    fn librarian_counts_use_server_figures_until_list_loads() {
        let dashboard = LibrarianDashboard {
            total_books: 4,
            total_borrowed_books: 3,
            books_due_today: 1,
            overdue_members: Vec::new(),
        };

        let snap = LibrarianSnapshot::derive(Some(&dashboard), None, &now());

        assert_eq!(snap.total_borrowed_books, 3);
        assert_eq!(snap.books_due_today, 1);
        assert!(snap.current.is_empty());
    }

    #[test]
    fn librarian_snapshot_without_dashboard() {
        let snap = LibrarianSnapshot::derive(None, None, &now());
        assert_eq!(snap, LibrarianSnapshot::default());

        let snap = LibrarianSnapshot::derive(None, Some(&[][..]), &now());
        assert_eq!(snap, LibrarianSnapshot::default());
    }
}
