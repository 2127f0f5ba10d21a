//! fpt-reconcile
//!
//! Shift-entry reconciliation engine.
//!
//! - Continuity: each entry starts from the chronological predecessor's end index
//! - Validation: payloads become typed entries or a named `EntryError`
//! - Writer: exactly one log per (machine, date, shift), then NE propagation
//! - Registry operations: batch item dispatch, item delete guard, shift board
//!
//! All storage goes through the `ProductionStore` / `RegistryStore` traits; this
//! crate never talks to a database directly.

pub mod authz;
pub mod continuity;
pub mod dispatch;
pub mod entry;
mod error;
pub mod store;
pub mod writer;

pub use authz::{authorize, require_elevated};
pub use continuity::{resolve_prior_end, resolve_start, select_prior, StartIndex, StartSource};
pub use dispatch::{delete_item, dispatch_item, shift_board, DispatchOutcome};
pub use entry::{
    build_note, preview_entry, submit_entry, validate, Confirmation, EntryPolicy, EntryPreview,
    ShiftEntry, SubmitOutcome,
};
pub use error::EntryError;
pub use store::{ProductionStore, RegistryStore};
pub use writer::{propagate_ne, upsert_log, WriteOutcome};
