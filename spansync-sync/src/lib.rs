//! # spansync-sync
//!
//! Marker synchronization across records.
//!
//! - [`UnidirSync`] refills `note` markers from the record they name.
//! - [`BidirSync`] keeps `sid` peer groups identical.
//! - [`hooks`] wires both to host editor events.
//! - [`pipeline::run`] runs a scoped sync, optionally as a dry run;
//!   [`diff::diff_record`] shows what it would change.

pub mod bidir;
pub mod context;
pub mod diff;
pub mod dry_run;
pub mod error;
pub mod hooks;
pub mod pipeline;
pub mod unidir;

pub use bidir::{are_coherent, BidirSync, ConflictResolver, FixedResolution, Resolution};
pub use context::SyncContext;
pub use dry_run::DryRunStore;
pub use error::SyncError;
pub use pipeline::{RecordOutcome, SyncReport, SyncScope};
pub use unidir::UnidirSync;
