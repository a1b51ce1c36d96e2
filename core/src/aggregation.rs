//! Aggregation engine: read-only summary views over one analysis run.
//!
//! Every query is recomputed from the customer table and the accepted
//! transactions on each call. Nothing is cached.
//!
//! A SegmentFilter restricts the view to a set of segments. Queries over
//! transactions then only see orders of customers inside the view.
//! An empty view reports zeros, never an error.

use crate::{
    config::DEFAULT_ACTIVE_WINDOW_DAYS,
    customer_table::{CustomerRow, CustomerTable},
    percentile::Metric,
    segment::Segment,
    store::{Transaction, TransactionStore},
    types::{MAX_SCORE, MIN_SCORE},
};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

// ── Filter ───────────────────────────────────────────────────────────────────

/// Which segments a view covers. Default: all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentFilter {
    segments: BTreeSet<Segment>,
}

impl SegmentFilter {
    pub fn all() -> Self {
        Self { segments: Segment::ALL.into_iter().collect() }
    }

    pub fn only(segments: impl IntoIterator<Item = Segment>) -> Self {
        Self { segments: segments.into_iter().collect() }
    }

    pub fn includes(&self, segment: Segment) -> bool {
        self.segments.contains(&segment)
    }

    pub fn segments(&self) -> &BTreeSet<Segment> {
        &self.segments
    }
}

impl Default for SegmentFilter {
    fn default() -> Self {
        Self::all()
    }
}

// ── Views ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub total_customers:    usize,
    pub total_revenue:      f64,
    pub champion_customers: usize,
    pub at_risk_customers:  usize,
    pub active_customers:   usize,
    pub avg_recency_days:   f64,
    pub avg_frequency:      f64,
    pub avg_monetary:       f64,
    pub computed_at:        DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentCount {
    pub segment:   Segment,
    pub customers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    /// Calendar month, 1 = January.
    pub month:   u32,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodRevenue {
    pub year:    i32,
    pub month:   u32,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentActivity {
    pub segment:           Segment,
    pub customers:         usize,
    pub mean_recency_days: Option<f64>,
    pub mean_frequency:    Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentTopProduct {
    pub segment:      Segment,
    pub product:      Option<String>,
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentPreferredProduct {
    pub segment:   Segment,
    pub product:   Option<String>,
    /// Customers in the segment whose most-ordered product this is.
    pub customers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRevenue {
    pub segment:   Segment,
    pub revenue:   f64,
    pub share_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreHistogram {
    pub metric: Metric,
    /// counts[i] = customers with score i + 1.
    pub counts: [usize; MAX_SCORE as usize],
}

// ── Engine ───────────────────────────────────────────────────────────────────

pub struct AggregationEngine<'a> {
    customers:          &'a CustomerTable,
    transactions:       &'a TransactionStore,
    computed_at:        DateTime<Utc>,
    filter:             SegmentFilter,
    active_window_days: i64,
}

impl<'a> AggregationEngine<'a> {
    pub fn new(
        customers: &'a CustomerTable,
        transactions: &'a TransactionStore,
        computed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            customers,
            transactions,
            computed_at,
            filter: SegmentFilter::all(),
            active_window_days: DEFAULT_ACTIVE_WINDOW_DAYS,
        }
    }

    pub fn with_filter(mut self, filter: SegmentFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_active_window(mut self, days: i64) -> Self {
        self.active_window_days = days;
        self
    }

    pub fn filter(&self) -> &SegmentFilter {
        &self.filter
    }

    /// Customers inside the current view.
    pub fn rows(&self) -> impl Iterator<Item = &'a CustomerRow> + '_ {
        let customers: &'a CustomerTable = self.customers;
        customers
            .rows()
            .iter()
            .filter(move |row| self.filter.includes(row.segment))
    }

    fn segment_by_customer(&self) -> HashMap<&'a str, Segment> {
        self.rows()
            .map(|row| (row.customer_id.as_str(), row.segment))
            .collect()
    }

    /// Transactions of customers inside the view, tagged with their segment.
    fn view_transactions(&self) -> Vec<(&'a Transaction, Segment)> {
        let segments = self.segment_by_customer();
        self.transactions
            .iter()
            .filter_map(|txn| {
                segments
                    .get(txn.customer_id.as_str())
                    .map(|seg| (txn, *seg))
            })
            .collect()
    }

    pub fn kpis(&self) -> Kpis {
        let rows: Vec<&CustomerRow> = self.rows().collect();
        let n = rows.len();
        let mean = |sum: f64| if n == 0 { 0.0 } else { sum / n as f64 };

        let total_revenue: f64 = rows.iter().map(|r| r.monetary).sum();
        Kpis {
            total_customers:    n,
            total_revenue,
            champion_customers: rows.iter().filter(|r| r.segment == Segment::Champion).count(),
            at_risk_customers:  rows.iter().filter(|r| r.segment == Segment::AtRisk).count(),
            active_customers:   rows
                .iter()
                .filter(|r| r.recency_days <= self.active_window_days)
                .count(),
            avg_recency_days:   mean(rows.iter().map(|r| r.recency_days as f64).sum()),
            avg_frequency:      mean(rows.iter().map(|r| r.frequency as f64).sum()),
            avg_monetary:       mean(total_revenue),
            computed_at:        self.computed_at,
        }
    }

    /// Customer count per segment, all five segments present.
    pub fn segment_distribution(&self) -> Vec<SegmentCount> {
        let mut counts: BTreeMap<Segment, usize> =
            Segment::ALL.into_iter().map(|s| (s, 0)).collect();
        for row in self.rows() {
            *counts.entry(row.segment).or_default() += 1;
        }
        counts
            .into_iter()
            .map(|(segment, customers)| SegmentCount { segment, customers })
            .collect()
    }

    /// Revenue per calendar month (Jan..Dec) across every year.
    pub fn monthly_revenue_trend(&self) -> Vec<MonthlyRevenue> {
        let mut totals = [0.0_f64; 12];
        for (txn, _) in self.view_transactions() {
            totals[txn.order_date.month0() as usize] += txn.amount;
        }
        totals
            .iter()
            .enumerate()
            .map(|(i, revenue)| MonthlyRevenue { month: i as u32 + 1, revenue: *revenue })
            .collect()
    }

    /// Revenue per year-month from the first to the last order month.
    /// Months without orders report 0.
    pub fn revenue_by_period(&self) -> Vec<PeriodRevenue> {
        let mut totals: BTreeMap<(i32, u32), f64> = BTreeMap::new();
        for (txn, _) in self.view_transactions() {
            *totals
                .entry((txn.order_date.year(), txn.order_date.month()))
                .or_default() += txn.amount;
        }

        let (Some(first), Some(last)) = (
            totals.keys().next().copied(),
            totals.keys().next_back().copied(),
        ) else {
            return Vec::new();
        };

        let mut periods = Vec::new();
        let (mut year, mut month) = first;
        while (year, month) <= last {
            periods.push(PeriodRevenue {
                year,
                month,
                revenue: totals.get(&(year, month)).copied().unwrap_or(0.0),
            });
            if month == 12 {
                year += 1;
                month = 1;
            } else {
                month += 1;
            }
        }
        periods
    }

    /// Mean recency and frequency per segment. Means are `None` for
    /// segments with no customers in the view.
    pub fn recency_frequency_comparison(&self) -> Vec<SegmentActivity> {
        let mut acc: BTreeMap<Segment, (usize, f64, f64)> =
            Segment::ALL.into_iter().map(|s| (s, (0, 0.0, 0.0))).collect();
        for row in self.rows() {
            let entry = acc.entry(row.segment).or_default();
            entry.0 += 1;
            entry.1 += row.recency_days as f64;
            entry.2 += row.frequency as f64;
        }
        acc.into_iter()
            .map(|(segment, (n, recency, frequency))| {
                let mean = |sum: f64| (n > 0).then(|| sum / n as f64);
                SegmentActivity {
                    segment,
                    customers: n,
                    mean_recency_days: mean(recency),
                    mean_frequency: mean(frequency),
                }
            })
            .collect()
    }

    /// Highest-revenue product per segment. Ties go to the product name
    /// that sorts first.
    pub fn top_product_by_segment(&self) -> Vec<SegmentTopProduct> {
        let mut by_segment: BTreeMap<Segment, BTreeMap<&str, f64>> = BTreeMap::new();
        for (txn, segment) in self.view_transactions() {
            *by_segment
                .entry(segment)
                .or_default()
                .entry(txn.product.as_str())
                .or_default() += txn.amount;
        }

        Segment::ALL
            .into_iter()
            .map(|segment| {
                let best = by_segment.get(&segment).and_then(max_by_value);
                SegmentTopProduct {
                    segment,
                    product:      best.map(|(p, _)| p.to_string()),
                    total_amount: best.map(|(_, amount)| amount).unwrap_or(0.0),
                }
            })
            .collect()
    }

    /// Each customer's most-ordered product, then the most common of those
    /// per segment. Ties at either level go to the name that sorts first.
    pub fn preferred_product_by_segment(&self) -> Vec<SegmentPreferredProduct> {
        let mut orders: BTreeMap<&str, BTreeMap<&str, usize>> = BTreeMap::new();
        let mut customer_segment: BTreeMap<&str, Segment> = BTreeMap::new();
        for (txn, segment) in self.view_transactions() {
            *orders
                .entry(txn.customer_id.as_str())
                .or_default()
                .entry(txn.product.as_str())
                .or_default() += 1;
            customer_segment.insert(txn.customer_id.as_str(), segment);
        }

        let mut by_segment: BTreeMap<Segment, BTreeMap<&str, usize>> = BTreeMap::new();
        for (customer, products) in &orders {
            let Some((preferred, _)) = max_by_value(products) else { continue };
            if let Some(segment) = customer_segment.get(customer) {
                *by_segment
                    .entry(*segment)
                    .or_default()
                    .entry(preferred)
                    .or_default() += 1;
            }
        }

        Segment::ALL
            .into_iter()
            .map(|segment| {
                let best = by_segment.get(&segment).and_then(max_by_value);
                SegmentPreferredProduct {
                    segment,
                    product:   best.map(|(p, _)| p.to_string()),
                    customers: best.map(|(_, n)| n).unwrap_or(0),
                }
            })
            .collect()
    }

    /// Monetary total per segment and its share of the view's revenue.
    pub fn segment_revenue_contribution(&self) -> Vec<SegmentRevenue> {
        let mut revenue: BTreeMap<Segment, f64> =
            Segment::ALL.into_iter().map(|s| (s, 0.0)).collect();
        for row in self.rows() {
            *revenue.entry(row.segment).or_default() += row.monetary;
        }
        let total: f64 = revenue.values().sum();
        revenue
            .into_iter()
            .map(|(segment, revenue)| SegmentRevenue {
                segment,
                revenue,
                share_pct: if total > 0.0 { revenue / total * 100.0 } else { 0.0 },
            })
            .collect()
    }

    /// Customers per score value for R, F and M.
    pub fn score_distribution(&self) -> Vec<ScoreHistogram> {
        Metric::ALL
            .into_iter()
            .map(|metric| {
                let mut counts = [0usize; MAX_SCORE as usize];
                for row in self.rows() {
                    let score = match metric {
                        Metric::Recency   => row.r_score,
                        Metric::Frequency => row.f_score,
                        Metric::Monetary  => row.m_score,
                    };
                    if (MIN_SCORE..=MAX_SCORE).contains(&score) {
                        counts[(score - MIN_SCORE) as usize] += 1;
                    }
                }
                ScoreHistogram { metric, counts }
            })
            .collect()
    }
}

/// Entry with the largest value; the first key wins ties because
/// BTreeMap iterates in key order and only a strictly larger value replaces.
fn max_by_value<'k, V: PartialOrd + Copy>(map: &BTreeMap<&'k str, V>) -> Option<(&'k str, V)> {
    let mut best: Option<(&'k str, V)> = None;
    for (key, value) in map {
        match best {
            Some((_, best_value)) if *value <= best_value => {}
            _ => best = Some((*key, *value)),
        }
    }
    best
}
