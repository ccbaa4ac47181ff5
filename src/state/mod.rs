//! Entity lifecycle
//!
//! Every entity in a run moves through [`EntityState`]:
//! `Pending -> InFlight -> {Completed, PartiallyFailed, Cancelled}`, or
//! `Pending -> Skipped` when a checkpoint already marks it done.

mod entity_state;

pub use entity_state::EntityState;
