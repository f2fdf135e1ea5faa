//! Directory tree reconciliation.
//!
//! One pass compares a source tree with its replica and mutates the replica
//! until both hold the same relative paths with the same file contents.

mod checksum;
mod reconciler;

pub use checksum::Checksum;
pub use reconciler::{PassSummary, ReconcileError, Reconciler};
