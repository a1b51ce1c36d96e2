//! The joined per-customer table: raw values, scores and segment.

use crate::{
    error::{RfmError, RfmResult},
    percentile_scorer::CustomerScore,
    rfm_calculator::CustomerRfm,
    segment::Segment,
    segment_classifier::CustomerSegment,
    types::{CustomerId, Score},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRow {
    pub customer_id:  CustomerId,
    pub recency_days: i64,
    pub frequency:    u32,
    pub monetary:     f64,
    pub r_score:      Score,
    pub f_score:      Score,
    pub m_score:      Score,
    pub rfm_score:    u16,
    pub segment:      Segment,
}

/// Rows ordered by customer id. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerTable {
    rows: Vec<CustomerRow>,
}

impl CustomerTable {
    /// Join the three stage outputs. They must describe the same
    /// customers in the same order.
    pub fn join(
        rfm: &[CustomerRfm],
        scores: &[CustomerScore],
        segments: &[CustomerSegment],
    ) -> RfmResult<Self> {
        if rfm.len() != scores.len() || rfm.len() != segments.len() {
            return Err(RfmError::Other(anyhow::anyhow!(
                "stage tables disagree on customer count: rfm={}, scores={}, segments={}",
                rfm.len(),
                scores.len(),
                segments.len()
            )));
        }

        let rows = rfm
            .iter()
            .zip(scores)
            .zip(segments)
            .map(|((raw, score), seg)| {
                if raw.customer_id != score.customer_id || raw.customer_id != seg.customer_id {
                    return Err(RfmError::Other(anyhow::anyhow!(
                        "stage tables out of order at customer '{}'",
                        raw.customer_id
                    )));
                }
                Ok(CustomerRow {
                    customer_id:  raw.customer_id.clone(),
                    recency_days: raw.recency_days,
                    frequency:    raw.frequency,
                    monetary:     raw.monetary,
                    r_score:      score.r_score,
                    f_score:      score.f_score,
                    m_score:      score.m_score,
                    rfm_score:    score.rfm_score,
                    segment:      seg.segment,
                })
            })
            .collect::<RfmResult<Vec<_>>>()?;

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[CustomerRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, customer_id: &str) -> Option<&CustomerRow> {
        self.rows
            .binary_search_by(|row| row.customer_id.as_str().cmp(customer_id))
            .ok()
            .map(|i| &self.rows[i])
    }

    /// Rows sorted by rfm_score descending, then customer id.
    pub fn ranked(&self) -> Vec<&CustomerRow> {
        let mut ranked: Vec<&CustomerRow> = self.rows.iter().collect();
        ranked.sort_by(|a, b| {
            b.rfm_score
                .cmp(&a.rfm_score)
                .then_with(|| a.customer_id.cmp(&b.customer_id))
        });
        ranked
    }
}
