// ── Per-view state ──
//
// Ordered reactive collections and the in-flight action table.

mod collection;
mod in_flight;

pub use collection::{Collection, Keyed};
pub use in_flight::{ActionKey, InFlight, InFlightGuard};
