//! File-backed ledger for the intake service: one CSV file per calendar day.
//!
//! Every write is a full read-reconcile-rewrite, published with an atomic
//! rename, and serialized per file so concurrent appends are never lost.

mod store;
mod table;

pub mod error;

pub use error::{Error, Result};
pub use store::CsvLedger;
pub use table::Table;
