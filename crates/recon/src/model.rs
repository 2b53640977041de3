use serde::Serialize;

use hermes_core::LookupField;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Replace matched records instead of skipping them.
    pub overwrite: bool,
    /// Business key used to find an existing record.
    pub lookup: LookupField,
}

// ---------------------------------------------------------------------------
// Import results
// ---------------------------------------------------------------------------

/// What happened to one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Outcome {
    Imported { id: String },
    Updated { id: String },
    Skipped { existing_id: String },
    Failed { reason: String },
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Imported { .. } => write!(f, "imported"),
            Self::Updated { .. } => write!(f, "updated"),
            Self::Skipped { .. } => write!(f, "skipped"),
            Self::Failed { .. } => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateOutcome {
    /// Source line of the candidate, 0 when unknown.
    pub line: usize,
    pub order_number: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Tallies for one batch. `total == imported + updated + skipped + errors`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
    pub total: usize,
}

impl ImportSummary {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Imported { .. } => self.imported += 1,
            Outcome::Updated { .. } => self.updated += 1,
            Outcome::Skipped { .. } => self.skipped += 1,
            Outcome::Failed { .. } => self.errors += 1,
        }
        self.total += 1;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub summary: ImportSummary,
    pub outcomes: Vec<CandidateOutcome>,
}

impl ImportReport {
    pub fn push(&mut self, outcome: CandidateOutcome) {
        self.summary.record(&outcome.outcome);
        self.outcomes.push(outcome);
    }

    pub fn failures(&self) -> impl Iterator<Item = &CandidateOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Failed { .. }))
    }
}

// ---------------------------------------------------------------------------
// Restore results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RestoreSummary {
    pub restored: usize,
    pub errors: usize,
    pub total: usize,
}

/// A backup entry that was not written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedEntry {
    /// 0-based position in the backup's `data` array.
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub summary: RestoreSummary,
    pub rejected: Vec<RejectedEntry>,
}
