//! The analysis engine: one full pipeline pass per call.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Validation          (reject malformed records)
//!   2. RFM calculator      (raw recency / frequency / monetary)
//!   3. Percentile scorer   (1..=5 scores per metric)
//!   4. Segment classifier  (score triple → segment)
//!   5. Join                (per-customer table)
//!
//! RULES:
//!   - Each stage reads ONLY the previous stage's table and returns a new one.
//!   - No stage calls another stage directly.
//!   - Every stage event is recorded in the run's event log.
//!   - The engine holds configuration only. Each run owns its data, so
//!     one engine can serve concurrent runs.

use crate::{
    aggregation::{AggregationEngine, SegmentFilter},
    config::RfmConfig,
    context::AnalysisContext,
    customer_table::CustomerTable,
    error::RfmResult,
    event::{AnalysisEvent, EventLogEntry},
    percentile_scorer::PercentileScorer,
    report::AnalysisReport,
    rfm_calculator::RfmCalculator,
    segment_classifier::SegmentClassifier,
    stage::AnalysisStage,
    store::TransactionStore,
    types::RunId,
    validation::{RejectedRecord, TransactionValidator},
};
use chrono::NaiveDate;

// ── Event log ────────────────────────────────────────────────────────────────

struct EventLog {
    run_id:  RunId,
    entries: Vec<EventLogEntry>,
}

impl EventLog {
    fn new(run_id: RunId) -> Self {
        Self { run_id, entries: Vec::new() }
    }

    fn append(&mut self, stage: &str, event: &AnalysisEvent) -> RfmResult<()> {
        self.entries.push(EventLogEntry {
            seq:        self.entries.len() as u64,
            run_id:     self.run_id.clone(),
            stage:      stage.to_string(),
            event_type: event.type_name().to_string(),
            payload:    serde_json::to_string(event)?,
        });
        Ok(())
    }
}

fn run_stage<S: AnalysisStage>(
    stage: &S,
    ctx: &AnalysisContext,
    input: &S::Input,
    event_log: &mut EventLog,
) -> RfmResult<S::Output> {
    let output = stage.run(ctx, input)?;
    for event in &output.events {
        event_log.append(stage.name(), event)?;
    }
    log::debug!("Stage '{}' emitted {} events", stage.name(), output.events.len());
    Ok(output.table)
}

// ── Run result ───────────────────────────────────────────────────────────────

/// Everything one pipeline pass produced. Immutable; a changed dataset or
/// reference date means a new run.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub context:        AnalysisContext,
    /// Accepted transactions only.
    pub transactions:   TransactionStore,
    pub customers:      CustomerTable,
    pub rejected:       Vec<RejectedRecord>,
    active_window_days: i64,
    events:             Vec<EventLogEntry>,
}

impl AnalysisRun {
    pub fn run_id(&self) -> &str {
        &self.context.run_id
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.context.reference_date
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }

    /// Recency cutoff, in days, for the active-customer KPI.
    pub fn active_window_days(&self) -> i64 {
        self.active_window_days
    }

    pub fn events(&self) -> &[EventLogEntry] {
        &self.events
    }

    /// Summary views over every customer.
    pub fn aggregates(&self) -> AggregationEngine<'_> {
        self.aggregates_for(SegmentFilter::all())
    }

    /// Summary views restricted to the segments in `filter`.
    pub fn aggregates_for(&self, filter: SegmentFilter) -> AggregationEngine<'_> {
        AggregationEngine::new(&self.customers, &self.transactions, self.context.computed_at)
            .with_active_window(self.active_window_days)
            .with_filter(filter)
    }

    pub fn report(&self, filter: SegmentFilter) -> AnalysisReport {
        AnalysisReport::build(self, filter)
    }
}

// ── Engine ───────────────────────────────────────────────────────────────────

pub struct RfmEngine {
    config:     RfmConfig,
    validator:  TransactionValidator,
    calculator: RfmCalculator,
    scorer:     PercentileScorer,
    classifier: SegmentClassifier,
}

impl RfmEngine {
    /// Build an engine, rejecting invalid configuration up front.
    pub fn new(config: RfmConfig) -> RfmResult<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    /// Engine with the reference policy.
    pub fn reference() -> Self {
        Self::from_valid_config(RfmConfig::reference())
    }

    fn from_valid_config(config: RfmConfig) -> Self {
        Self {
            validator:  TransactionValidator::new(config.validation),
            calculator: RfmCalculator,
            scorer:     PercentileScorer::new(config.scoring.clone()),
            classifier: SegmentClassifier::new(config.segment_rules.clone()),
            config,
        }
    }

    pub fn config(&self) -> &RfmConfig {
        &self.config
    }

    /// Run the full pipeline as of `reference_date` (today when `None`).
    pub fn run(
        &self,
        store: &TransactionStore,
        reference_date: Option<NaiveDate>,
    ) -> RfmResult<AnalysisRun> {
        self.run_with_context(AnalysisContext::new(reference_date), store)
    }

    /// Run the full pipeline with an explicit context.
    pub fn run_with_context(
        &self,
        ctx: AnalysisContext,
        store: &TransactionStore,
    ) -> RfmResult<AnalysisRun> {
        let mut event_log = EventLog::new(ctx.run_id.clone());
        event_log.append("engine", &AnalysisEvent::RunInitialized {
            run_id:         ctx.run_id.clone(),
            reference_date: ctx.reference_date,
            transactions:   store.len(),
        })?;

        let batch = run_stage(&self.validator, &ctx, store, &mut event_log)?;
        if batch.accepted.is_empty() {
            log::info!("Run {}: no transactions to analyse", ctx.run_id);
            event_log.append("engine", &AnalysisEvent::EmptyDataset)?;
        }

        let rfm = run_stage(&self.calculator, &ctx, &batch.accepted, &mut event_log)?;
        let scores = run_stage(&self.scorer, &ctx, rfm.as_slice(), &mut event_log)?;
        let segments = run_stage(&self.classifier, &ctx, scores.as_slice(), &mut event_log)?;
        let customers = CustomerTable::join(&rfm, &scores, &segments)?;

        event_log.append("engine", &AnalysisEvent::RunCompleted {
            run_id:    ctx.run_id.clone(),
            customers: customers.len(),
        })?;
        log::info!(
            "Run {} complete: {} customers, {} transactions accepted, {} rejected",
            ctx.run_id,
            customers.len(),
            batch.accepted.len(),
            batch.rejected.len()
        );

        Ok(AnalysisRun {
            context:            ctx,
            transactions:       batch.accepted,
            customers,
            rejected:           batch.rejected,
            active_window_days: self.config.active_window_days,
            events:             event_log.entries,
        })
    }
}

impl Default for RfmEngine {
    fn default() -> Self {
        Self::reference()
    }
}
