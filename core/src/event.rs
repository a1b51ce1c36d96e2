//! The analysis event log.
//!
//! RULE: Stages report what they did ONLY through events.
//! The engine appends every event to the run's log in emission order.
//! Variants are appended over time, never removed or reordered.

use crate::{
    percentile::Metric,
    segment::Segment,
    types::RunId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisEvent {
    // ── Engine events ──────────────────────────────
    RunInitialized {
        run_id:         RunId,
        reference_date: NaiveDate,
        transactions:   usize,
    },
    RunCompleted {
        run_id:    RunId,
        customers: usize,
    },
    EmptyDataset,

    // ── Validation events ──────────────────────────
    RecordsValidated {
        accepted: usize,
        rejected: usize,
    },
    RecordRejected {
        index:       usize,
        customer_id: String,
        field:       String,
        reason:      String,
    },

    // ── RFM derivation events ──────────────────────
    CustomersDerived {
        customers: usize,
    },

    // ── Scoring events ─────────────────────────────
    BreakpointsComputed {
        metric:      Metric,
        breakpoints: Vec<f64>,
    },
    DegeneratePercentile {
        metric: Metric,
        value:  f64,
    },

    // ── Segmentation events ────────────────────────
    SegmentsAssigned {
        counts: Vec<(Segment, usize)>,
    },
}

impl AnalysisEvent {
    /// Stable string name of the variant, used for the `event_type` field.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RunInitialized { .. }       => "run_initialized",
            Self::RunCompleted { .. }         => "run_completed",
            Self::EmptyDataset                => "empty_dataset",
            Self::RecordsValidated { .. }     => "records_validated",
            Self::RecordRejected { .. }       => "record_rejected",
            Self::CustomersDerived { .. }     => "customers_derived",
            Self::BreakpointsComputed { .. }  => "breakpoints_computed",
            Self::DegeneratePercentile { .. } => "degenerate_percentile",
            Self::SegmentsAssigned { .. }     => "segments_assigned",
        }
    }
}

/// One row of the run's event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub seq:        u64,
    pub run_id:     RunId,
    pub stage:      String,
    pub event_type: String,
    pub payload:    String,
}
