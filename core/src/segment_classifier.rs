//! Segment classification: a score triple to exactly one segment.
//!
//! Rules are evaluated in table order and the first match wins, so
//! overlapping conditions always resolve the same way. Anything no
//! rule matches goes to the table's fallback segment.

use crate::{
    config::{EngagementCondition, SegmentRule, SegmentRuleTable},
    context::AnalysisContext,
    error::RfmResult,
    event::AnalysisEvent,
    percentile_scorer::CustomerScore,
    segment::Segment,
    stage::{AnalysisStage, StageOutput},
    types::{CustomerId, Score},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSegment {
    pub customer_id: CustomerId,
    pub segment:     Segment,
}

impl EngagementCondition {
    pub fn matches(&self, f: Score, m: Score) -> bool {
        match *self {
            Self::Any => true,
            Self::AllAtLeast { frequency, monetary } => f >= frequency && m >= monetary,
            Self::AnyAtMost { frequency, monetary }  => f <= frequency || m <= monetary,
        }
    }
}

impl SegmentRule {
    pub fn matches(&self, r: Score, f: Score, m: Score) -> bool {
        self.recency.contains(r) && self.engagement.matches(f, m)
    }
}

pub struct SegmentClassifier {
    table: SegmentRuleTable,
}

impl SegmentClassifier {
    pub fn new(table: SegmentRuleTable) -> Self {
        Self { table }
    }

    /// Classifier with the reference rule table.
    pub fn reference() -> Self {
        Self::new(SegmentRuleTable::reference())
    }

    pub fn classify(&self, r: Score, f: Score, m: Score) -> Segment {
        self.table
            .rules
            .iter()
            .find(|rule| rule.matches(r, f, m))
            .map(|rule| rule.segment)
            .unwrap_or(self.table.fallback)
    }

    pub fn classify_all(&self, scores: &[CustomerScore]) -> Vec<CustomerSegment> {
        scores
            .iter()
            .map(|s| CustomerSegment {
                customer_id: s.customer_id.clone(),
                segment:     self.classify(s.r_score, s.f_score, s.m_score),
            })
            .collect()
    }
}

impl AnalysisStage for SegmentClassifier {
    type Input = [CustomerScore];
    type Output = Vec<CustomerSegment>;

    fn name(&self) -> &'static str {
        "segment_classifier"
    }

    fn run(
        &self,
        _ctx: &AnalysisContext,
        input: &[CustomerScore],
    ) -> RfmResult<StageOutput<Vec<CustomerSegment>>> {
        let segments = self.classify_all(input);
        let counts = Segment::ALL
            .iter()
            .map(|seg| (*seg, segments.iter().filter(|s| s.segment == *seg).count()))
            .collect();
        Ok(StageOutput::with_events(
            segments,
            vec![AnalysisEvent::SegmentsAssigned { counts }],
        ))
    }
}
