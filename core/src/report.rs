//! Report export: every summary view of a run, in one serializable bundle.

use crate::{
    aggregation::{
        Kpis, MonthlyRevenue, PeriodRevenue, ScoreHistogram, SegmentActivity, SegmentCount,
        SegmentFilter, SegmentPreferredProduct, SegmentRevenue, SegmentTopProduct,
    },
    customer_table::CustomerRow,
    engine::AnalysisRun,
    error::RfmResult,
    segment::Segment,
    types::RunId,
    validation::RejectedRecord,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub run_id:                       RunId,
    pub reference_date:               NaiveDate,
    pub segments:                     Vec<Segment>,
    pub kpis:                         Kpis,
    pub segment_distribution:         Vec<SegmentCount>,
    pub monthly_revenue_trend:        Vec<MonthlyRevenue>,
    pub revenue_by_period:            Vec<PeriodRevenue>,
    pub recency_frequency_comparison: Vec<SegmentActivity>,
    pub top_product_by_segment:       Vec<SegmentTopProduct>,
    pub preferred_product_by_segment: Vec<SegmentPreferredProduct>,
    pub segment_revenue_contribution: Vec<SegmentRevenue>,
    pub score_distribution:           Vec<ScoreHistogram>,
    /// Customers in the view, highest RFM score first.
    pub customers:                    Vec<CustomerRow>,
    pub rejected:                     Vec<RejectedRecord>,
}

impl AnalysisReport {
    pub fn build(run: &AnalysisRun, filter: SegmentFilter) -> Self {
        let customers = run
            .customers
            .ranked()
            .into_iter()
            .filter(|row| filter.includes(row.segment))
            .cloned()
            .collect();
        let segments = filter.segments().iter().copied().collect();
        let agg = run.aggregates_for(filter);

        Self {
            run_id:                       run.run_id().to_string(),
            reference_date:               run.reference_date(),
            segments,
            kpis:                         agg.kpis(),
            segment_distribution:         agg.segment_distribution(),
            monthly_revenue_trend:        agg.monthly_revenue_trend(),
            revenue_by_period:            agg.revenue_by_period(),
            recency_frequency_comparison: agg.recency_frequency_comparison(),
            top_product_by_segment:       agg.top_product_by_segment(),
            preferred_product_by_segment: agg.preferred_product_by_segment(),
            segment_revenue_contribution: agg.segment_revenue_contribution(),
            score_distribution:           agg.score_distribution(),
            customers,
            rejected:                     run.rejected.clone(),
        }
    }

    pub fn to_json(&self) -> RfmResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
