//! `hermes-recon`: import reconciliation engine.
//!
//! Pure engine crate: receives parsed candidates or decoded backup entries
//! and applies them to any [`hermes_core::OrderStore`]. No file formats or
//! CLI dependencies.

pub mod engine;
pub mod error;
pub mod matcher;
pub mod model;

pub use engine::{reconcile, restore};
pub use error::{CandidateError, ReconError};
pub use model::{
    CandidateOutcome, ImportReport, ImportSummary, Outcome, ReconcileOptions, RejectedEntry,
    RestoreReport, RestoreSummary,
};
