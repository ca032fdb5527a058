//! Role-specific dashboards.

use chrono::Local;
use libris_core::{
    BorrowRecord, BorrowingStatus, Capability, LibrarianSnapshot, MemberSnapshot, RefreshTarget,
    View,
};
use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::output;
use crate::shell::Shell;

use super::borrowings;

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Book")]
    book: String,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn record_row(record: &BorrowRecord, status: BorrowingStatus) -> RecordRow {
    RecordRow {
        id: record.id.to_string(),
        book: record.book.title.clone(),
        due: record.due_date.with_timezone(&Local).format("%Y-%m-%d").to_string(),
        status: status.to_string(),
    }
}

#[derive(Tabled)]
struct OverdueRow {
    #[tabled(rename = "Member")]
    member: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Book")]
    book: String,
    #[tabled(rename = "Due")]
    due: String,
}

fn member_summary(snap: &MemberSnapshot) -> String {
    let mut sections = vec![
        [
            format!("Borrowed:  {}", snap.counts.borrowed),
            format!("Overdue:   {}", snap.counts.overdue),
            format!("Due today: {}", snap.counts.due_today),
        ]
        .join("\n"),
    ];

    let rows: Vec<RecordRow> = snap
        .overdue
        .iter()
        .map(|r| record_row(r, BorrowingStatus::Overdue))
        .chain(
            snap.active
                .iter()
                .map(|r| record_row(r, BorrowingStatus::Borrowed)),
        )
        .chain(
            snap.legacy.iter().map(|b| RecordRow {
                id: b.id.to_string(),
                book: b.title.clone(),
                due: b.due_date.with_timezone(&Local).format("%Y-%m-%d").to_string(),
                status: b.status.to_string(),
            }),
        )
        .collect();
    if !rows.is_empty() {
        sections.push(output::render_table(&rows));
    }
    sections.join("\n\n")
}

fn librarian_summary(snap: &LibrarianSnapshot) -> String {
    let mut sections = vec![
        [
            format!("Books:          {}", snap.total_books),
            format!("Borrowed:       {}", snap.total_borrowed_books),
            format!("Due today:      {}", snap.books_due_today),
            format!("Overdue items:  {}", snap.overdue_items),
        ]
        .join("\n"),
    ];

    let rows: Vec<OverdueRow> = snap
        .overdue_members
        .iter()
        .flat_map(|entry| {
            entry.overdue.iter().map(|item| OverdueRow {
                member: entry.member.name.clone(),
                email: entry.member.email.clone(),
                book: item.title.clone(),
                due: item.due_date.with_timezone(&Local).format("%Y-%m-%d").to_string(),
            })
        })
        .collect();
    if !rows.is_empty() {
        sections.push(output::render_table(&rows));
    }
    sections.join("\n\n")
}

pub async fn show(shell: &mut Shell) -> Result<(), CliError> {
    let coordinator = shell.require(View::Dashboard)?.clone();
    let presentation = shell.presentation;
    let now = Local::now();

    if shell.session().can(Capability::LibrarianDashboard) {
        coordinator
            .refresh(&[
                RefreshTarget::LibrarianDashboard,
                RefreshTarget::CurrentBorrowings,
            ])
            .await?;
        let snap = coordinator.librarian_snapshot(&now);
        let out = output::render_single(presentation.output, &snap, librarian_summary, |s| {
            s.total_books.to_string()
        })?;
        output::print_output(&out, presentation.quiet);
        if matches!(presentation.output, OutputFormat::Table) && !snap.current.is_empty() {
            borrowings::print_current(&coordinator, presentation)?;
        }
        return Ok(());
    }

    // Members, and sessions whose role the server did not report.
    coordinator.load_member_dashboard().await?;
    let Some(snap) = coordinator.member_snapshot(&now) else {
        return Ok(());
    };
    let out = output::render_single(presentation.output, &snap, member_summary, |s| {
        s.counts.borrowed.to_string()
    })?;
    output::print_output(&out, presentation.quiet);
    Ok(())
}
