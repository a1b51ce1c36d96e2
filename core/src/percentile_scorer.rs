//! Percentile scoring: raw R/F/M values to 1..=5 scores.
//!
//! Scores are relative to the population passed in. They are not
//! stable per-customer constants: a new population means new scores.
//!
//! Frequency and Monetary score 1 in the lowest bucket, 5 in the highest.
//! Recency is reversed: the most recent bucket scores 5.
//! Equal raw values always land in the same bucket.

use crate::{
    config::ScoringConfig,
    context::AnalysisContext,
    error::RfmResult,
    event::AnalysisEvent,
    percentile::{Breakpoints, Direction, Metric},
    rfm_calculator::CustomerRfm,
    stage::{AnalysisStage, StageOutput},
    types::{rfm_code, CustomerId, Score, MAX_SCORE},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerScore {
    pub customer_id: CustomerId,
    pub r_score:     Score,
    pub f_score:     Score,
    pub m_score:     Score,
    pub rfm_score:   u16,
}

impl CustomerScore {
    pub fn new(customer_id: impl Into<CustomerId>, r: Score, f: Score, m: Score) -> Self {
        Self {
            customer_id: customer_id.into(),
            r_score:     r,
            f_score:     f,
            m_score:     m,
            rfm_score:   rfm_code(r, f, m),
        }
    }
}

/// Breakpoints for all three metrics of one population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakpoints {
    pub recency:   Breakpoints,
    pub frequency: Breakpoints,
    pub monetary:  Breakpoints,
}

impl ScoreBreakpoints {
    pub fn for_metric(&self, metric: Metric) -> &Breakpoints {
        match metric {
            Metric::Recency   => &self.recency,
            Metric::Frequency => &self.frequency,
            Metric::Monetary  => &self.monetary,
        }
    }
}

fn raw_value(row: &CustomerRfm, metric: Metric) -> f64 {
    match metric {
        Metric::Recency   => row.recency_days as f64,
        Metric::Frequency => row.frequency as f64,
        Metric::Monetary  => row.monetary,
    }
}

/// Map a 1-based bucket to a score in the metric's direction.
fn bucket_score(bucket: usize, direction: Direction) -> Score {
    let bucket = bucket.clamp(1, MAX_SCORE as usize) as Score;
    match direction {
        Direction::Normal   => bucket,
        Direction::Reversed => MAX_SCORE + 1 - bucket,
    }
}

pub struct PercentileScorer {
    config: ScoringConfig,
}

impl PercentileScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn breakpoints(&self, rows: &[CustomerRfm]) -> ScoreBreakpoints {
        let compute = |metric: Metric| {
            let values: Vec<f64> = rows.iter().map(|r| raw_value(r, metric)).collect();
            Breakpoints::compute(&values, &self.config.quantile_cuts)
        };
        ScoreBreakpoints {
            recency:   compute(Metric::Recency),
            frequency: compute(Metric::Frequency),
            monetary:  compute(Metric::Monetary),
        }
    }

    /// Score a single raw value against precomputed breakpoints.
    pub fn score_value(breakpoints: &Breakpoints, metric: Metric, value: f64) -> Score {
        bucket_score(breakpoints.bucket(value), metric.direction())
    }

    /// Score every row against breakpoints of the same population.
    pub fn score(&self, rows: &[CustomerRfm]) -> Vec<CustomerScore> {
        let bps = self.breakpoints(rows);
        Self::score_with(&bps, rows)
    }

    fn score_with(bps: &ScoreBreakpoints, rows: &[CustomerRfm]) -> Vec<CustomerScore> {
        rows.iter()
            .map(|row| {
                let score = |metric: Metric| {
                    Self::score_value(bps.for_metric(metric), metric, raw_value(row, metric))
                };
                CustomerScore::new(
                    row.customer_id.clone(),
                    score(Metric::Recency),
                    score(Metric::Frequency),
                    score(Metric::Monetary),
                )
            })
            .collect()
    }
}

impl AnalysisStage for PercentileScorer {
    type Input = [CustomerRfm];
    type Output = Vec<CustomerScore>;

    fn name(&self) -> &'static str {
        "percentile_scorer"
    }

    fn run(
        &self,
        _ctx: &AnalysisContext,
        input: &[CustomerRfm],
    ) -> RfmResult<StageOutput<Vec<CustomerScore>>> {
        let bps = self.breakpoints(input);
        let mut events = Vec::new();

        for metric in Metric::ALL {
            let metric_bps = bps.for_metric(metric);
            if metric_bps.values().is_empty() {
                continue;
            }
            events.push(AnalysisEvent::BreakpointsComputed {
                metric,
                breakpoints: metric_bps.values().to_vec(),
            });
            if metric_bps.is_degenerate() {
                let value = metric_bps.values()[0];
                log::warn!(
                    "All {} customers share {metric} = {value}; every customer gets the same {metric} score",
                    input.len()
                );
                events.push(AnalysisEvent::DegeneratePercentile { metric, value });
            }
        }

        Ok(StageOutput::with_events(Self::score_with(&bps, input), events))
    }
}
