// ── Borrowing status engine ──
//
// Pure derivations over borrowing records and books. Nothing here is
// stored: every caller passes `now` and gets a fresh answer, so counts and
// labels can never drift from the records they describe.

use chrono::{DateTime, TimeZone, Utc};
use libris_api::{ActiveBorrowing, Book, BorrowRecord, BorrowingStatus, OverdueBookItem};
use serde::Serialize;
use strum::Display;

/// Anything with a due date and an optional return time.
pub trait DueTracked {
    fn due_date(&self) -> DateTime<Utc>;
    fn returned_at(&self) -> Option<DateTime<Utc>>;
}

impl DueTracked for BorrowRecord {
    fn due_date(&self) -> DateTime<Utc> {
        self.due_date
    }

    fn returned_at(&self) -> Option<DateTime<Utc>> {
        self.returned_at
    }
}

impl DueTracked for ActiveBorrowing {
    fn due_date(&self) -> DateTime<Utc> {
        self.due_date
    }

    fn returned_at(&self) -> Option<DateTime<Utc>> {
        self.returned_at
    }
}

/// Listed as overdue by the server, so never returned.
impl DueTracked for OverdueBookItem {
    fn due_date(&self) -> DateTime<Utc> {
        self.due_date
    }

    fn returned_at(&self) -> Option<DateTime<Utc>> {
        None
    }
}

// ── Borrowing status ────────────────────────────────────────────────

/// Unreturned and past due. A record due exactly at `now` is not overdue.
pub fn is_overdue<R, Tz>(record: &R, now: &DateTime<Tz>) -> bool
where
    R: DueTracked + ?Sized,
    Tz: TimeZone,
{
    record.returned_at().is_none() && record.due_date() < now.with_timezone(&Utc)
}

/// Unreturned and not overdue.
pub fn is_active<R, Tz>(record: &R, now: &DateTime<Tz>) -> bool
where
    R: DueTracked + ?Sized,
    Tz: TimeZone,
{
    record.returned_at().is_none() && !is_overdue(record, now)
}

/// Unreturned and due on `now`'s calendar day, in `now`'s time zone.
pub fn is_due_today<R, Tz>(record: &R, now: &DateTime<Tz>) -> bool
where
    R: DueTracked + ?Sized,
    Tz: TimeZone,
{
    record.returned_at().is_none()
        && record.due_date().with_timezone(&now.timezone()).date_naive() == now.date_naive()
}

pub fn status<R, Tz>(record: &R, now: &DateTime<Tz>) -> BorrowingStatus
where
    R: DueTracked + ?Sized,
    Tz: TimeZone,
{
    if record.returned_at().is_some() {
        BorrowingStatus::Returned
    } else if is_overdue(record, now) {
        BorrowingStatus::Overdue
    } else {
        BorrowingStatus::Borrowed
    }
}

// ── Availability ────────────────────────────────────────────────────

/// Copies left on the shelf, never negative.
pub fn remaining_copies(book: &Book) -> u32 {
    book.total_copies.saturating_sub(book.borrowings_count)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
pub enum Availability {
    #[strum(serialize = "Unavailable")]
    Unavailable,
    #[strum(serialize = "Low stock")]
    LowStock,
    #[strum(serialize = "Available")]
    Available,
}

impl Availability {
    pub const LOW_STOCK_MAX: u32 = 2;

    pub fn from_remaining(remaining: u32) -> Self {
        match remaining {
            0 => Self::Unavailable,
            n if n <= Self::LOW_STOCK_MAX => Self::LowStock,
            _ => Self::Available,
        }
    }
}

pub fn availability(book: &Book) -> Availability {
    Availability::from_remaining(remaining_copies(book))
}

// ── Counts ──────────────────────────────────────────────────────────

/// Sizes of the filtered subsets of a list of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BorrowingCounts {
    /// Not yet returned.
    pub borrowed: usize,
    pub active: usize,
    pub overdue: usize,
    pub due_today: usize,
    pub returned: usize,
}

pub fn summarize<'a, R, I, Tz>(records: I, now: &DateTime<Tz>) -> BorrowingCounts
where
    R: DueTracked + 'a,
    I: IntoIterator<Item = &'a R>,
    Tz: TimeZone,
{
    records
        .into_iter()
        .fold(BorrowingCounts::default(), |mut counts, record| {
            if record.returned_at().is_some() {
                counts.returned += 1;
                return counts;
            }
            counts.borrowed += 1;
            if is_overdue(record, now) {
                counts.overdue += 1;
            } else {
                counts.active += 1;
            }
            if is_due_today(record, now) {
                counts.due_today += 1;
            }
            counts
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, FixedOffset};
    use libris_api::EntityId;

    use super::*;

    struct Rec {
        due: DateTime<Utc>,
        returned: Option<DateTime<Utc>>,
    }

    impl DueTracked for Rec {
        fn due_date(&self) -> DateTime<Utc> {
            self.due
        }

        fn returned_at(&self) -> Option<DateTime<Utc>> {
            self.returned
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn due_in(hours: i64) -> Rec {
        Rec {
            due: now() + Duration::hours(hours),
            returned: None,
        }
    }

    fn book(total: u32, borrowed: u32) -> Book {
        Book {
            id: EntityId::from("1"),
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            genre: "SF".into(),
            isbn: "9780441013593".into(),
            total_copies: total,
            borrowings_count: borrowed,
        }
    }

    #[test]
    fn past_due_is_overdue() {
        let r = due_in(-1);
        assert!(is_overdue(&r, &now()));
        assert!(!is_active(&r, &now()));
        assert_eq!(status(&r, &now()), BorrowingStatus::Overdue);
        assert_eq!(status(&r, &now()).to_string(), "Overdue");
    }

    #[test]
    fn due_exactly_now_is_active_and_due_today() {
        let r = due_in(0);
        assert!(!is_overdue(&r, &now()));
        assert!(is_active(&r, &now()));
        assert!(is_due_today(&r, &now()));
        assert_eq!(status(&r, &now()).to_string(), "Borrowed");
    }

    #[test]
    fn returned_wins_over_everything() {
        let r = Rec {
            due: now() - Duration::days(3),
            returned: Some(now() - Duration::days(1)),
        };
        assert!(!is_overdue(&r, &now()));
        assert!(!is_active(&r, &now()));
        assert!(!is_due_today(&r, &now()));
        assert_eq!(status(&r, &now()).to_string(), "Returned");
    }

    #[test]
    fn due_today_uses_local_calendar_day() {
        // 23:30 UTC on the 15th is already the 16th at UTC+2.
        let r = Rec {
            due: Utc.with_ymd_and_hms(2024, 6, 15, 23, 30, 0).unwrap(),
            returned: None,
        };
        let utc_now = now();
        let plus_two = utc_now.with_timezone(&FixedOffset::east_opt(2 * 3600).unwrap());
        assert!(is_due_today(&r, &utc_now));
        assert!(!is_due_today(&r, &plus_two));
    }

    #[test]
    fn remaining_never_negative() {
        assert_eq!(remaining_copies(&book(5, 2)), 3);
        assert_eq!(remaining_copies(&book(2, 5)), 0);
    }

    #[test]
    fn availability_thresholds() {
        assert_eq!(availability(&book(3, 3)), Availability::Unavailable);
        assert_eq!(availability(&book(3, 2)), Availability::LowStock);
        assert_eq!(availability(&book(3, 1)), Availability::LowStock);
        assert_eq!(availability(&book(3, 0)), Availability::Available);
        assert_eq!(availability(&book(1, 4)).to_string(), "Unavailable");
        assert_eq!(Availability::LowStock.to_string(), "Low stock");
    }

    #[test]
    fn counts_are_subset_sizes() {
        let records = vec![
            due_in(-48),
            due_in(-1),
            due_in(0),
            due_in(72),
            Rec {
                due: now() - Duration::days(2),
                returned: Some(now()),
            },
        ];
        let counts = summarize(&records, &now());
        assert_eq!(
            counts,
            BorrowingCounts {
                borrowed: 4,
                active: 2,
                overdue: 2,
                due_today: 2,
                returned: 1,
            }
        );
    }
}
