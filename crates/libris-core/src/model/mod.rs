// ── Domain model helpers ──
//
// Book and borrowing types are the api crate's wire types; this module adds
// what front ends need around them: catalog search and ISBN validation.

pub mod isbn;
pub mod query;

pub use isbn::{is_valid_isbn, normalize_isbn};
pub use query::BookQuery;
