//! Analysis context: the explicit "as of" state of one run.
//!
//! Replaces any notion of a global current dataset. Every stage
//! receives the context by reference; nothing reads process state.

use crate::types::RunId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisContext {
    pub run_id:         RunId,
    pub reference_date: NaiveDate,
    pub computed_at:    DateTime<Utc>,
}

impl AnalysisContext {
    /// New context with a fresh run id, stamped now.
    /// `reference_date` defaults to today (UTC) when `None`.
    pub fn new(reference_date: Option<NaiveDate>) -> Self {
        let computed_at = Utc::now();
        Self {
            run_id: format!("rfm-{}", uuid::Uuid::new_v4()),
            reference_date: reference_date.unwrap_or_else(|| computed_at.date_naive()),
            computed_at,
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<RunId>) -> Self {
        self.run_id = run_id.into();
        self
    }

    /// Pin the computation timestamp. Used for reproducible reports.
    pub fn with_computed_at(mut self, computed_at: DateTime<Utc>) -> Self {
        self.computed_at = computed_at;
        self
    }
}
