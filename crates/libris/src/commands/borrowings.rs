//! Current borrowings and returns (librarian).

use chrono::Local;
use libris_core::{ActiveBorrowing, BorrowingStatus, Capability, Coordinator, View};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::{ReturnsArgs, ReturnsCommand};
use crate::error::CliError;
use crate::output;
use crate::shell::{Presentation, Shell};

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub(super) struct BorrowingRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Member")]
    member: String,
    #[tabled(rename = "Book")]
    book: String,
    #[tabled(rename = "Borrowed")]
    borrowed: String,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Status")]
    status: String,
}

/// A current borrowing with its status as of now.
#[derive(Serialize)]
pub(super) struct CurrentItem<'a> {
    #[serde(flatten)]
    borrowing: &'a ActiveBorrowing,
    status: BorrowingStatus,
}

impl From<&CurrentItem<'_>> for BorrowingRow {
    fn from(item: &CurrentItem<'_>) -> Self {
        let b = item.borrowing;
        Self {
            id: b.id.to_string(),
            member: b.user_name.clone(),
            book: b.book_title.clone(),
            borrowed: b.borrowed_at.with_timezone(&Local).format("%Y-%m-%d").to_string(),
            due: b.due_date.with_timezone(&Local).format("%Y-%m-%d").to_string(),
            status: item.status.to_string(),
        }
    }
}

/// Render the current borrowings known to `coordinator`.
pub(super) fn print_current(
    coordinator: &Coordinator,
    presentation: Presentation,
) -> Result<(), CliError> {
    let snapshot = coordinator.librarian_snapshot(&Local::now());
    let items: Vec<CurrentItem<'_>> = snapshot
        .current
        .iter()
        .map(|(borrowing, status)| CurrentItem {
            borrowing,
            status: *status,
        })
        .collect();
    let out = output::render_list(presentation.output, &items, |item| BorrowingRow::from(item), |item| {
        item.borrowing.id.to_string()
    })?;
    output::print_output(&out, presentation.quiet);
    Ok(())
}

pub async fn list_current(shell: &mut Shell) -> Result<(), CliError> {
    util::require_capability(shell, Capability::MarkReturned, "list current borrowings")?;
    let coordinator = shell.require(View::Dashboard)?.clone();
    coordinator.load_current_borrowings().await?;
    print_current(&coordinator, shell.presentation)
}

pub async fn handle_returns(shell: &mut Shell, args: ReturnsArgs) -> Result<(), CliError> {
    match args.command {
        ReturnsCommand::Mark { borrowing_id } => {
            util::require_capability(shell, Capability::MarkReturned, "mark returns")?;
            let id = util::entity_id(&borrowing_id, "borrowing_id")?;
            let coordinator = shell.require(View::Dashboard)?.clone();
            coordinator.return_borrowing(id).await?;
            print_current(&coordinator, shell.presentation)
        }
    }
}
