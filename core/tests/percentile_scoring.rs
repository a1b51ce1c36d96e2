use chrono::NaiveDate;
use rfm_core::{
    config::ScoringConfig,
    engine::RfmEngine,
    percentile::{Breakpoints, Metric},
    percentile_scorer::PercentileScorer,
    rfm_calculator::CustomerRfm,
    store::{Transaction, TransactionStore},
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn row(id: &str, recency_days: i64, frequency: u32, monetary: f64) -> CustomerRfm {
    CustomerRfm {
        customer_id: id.into(),
        recency_days,
        frequency,
        monetary,
    }
}

fn scorer() -> PercentileScorer {
    PercentileScorer::new(ScoringConfig::default())
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Frequencies 1..5 split into one customer per quintile.
#[test]
fn five_distinct_frequencies_score_one_to_five() {
    let rows: Vec<_> = (1..=5)
        .map(|f| row(&format!("c{f}"), 10, f, 100.0))
        .collect();

    let scores = scorer().score(&rows);
    let f_scores: Vec<u8> = scores.iter().map(|s| s.f_score).collect();
    assert_eq!(f_scores, vec![1, 2, 3, 4, 5]);
}

/// Recency is reversed: the smallest recency scores 5.
#[test]
fn recency_scores_in_reverse() {
    let rows: Vec<_> = [0, 10, 20, 30, 40]
        .iter()
        .enumerate()
        .map(|(i, r)| row(&format!("c{i}"), *r, 1, 1.0))
        .collect();

    let scores = scorer().score(&rows);
    let r_scores: Vec<u8> = scores.iter().map(|s| s.r_score).collect();
    assert_eq!(r_scores, vec![5, 4, 3, 2, 1]);
}

/// rfm_score is r*100 + f*10 + m for every customer.
#[test]
fn rfm_score_combines_the_three_digits() {
    let rows = vec![
        row("a", 0, 9, 900.0),
        row("b", 50, 1, 5.0),
        row("c", 20, 4, 300.0),
        row("d", 35, 2, 40.0),
        row("e", 5, 6, 120.0),
        row("f", 70, 3, 60.0),
    ];
    for s in scorer().score(&rows) {
        assert!((1..=5).contains(&s.r_score));
        assert!((1..=5).contains(&s.f_score));
        assert!((1..=5).contains(&s.m_score));
        assert_eq!(
            s.rfm_score,
            s.r_score as u16 * 100 + s.f_score as u16 * 10 + s.m_score as u16
        );
    }
}

/// Identical raw values collapse every breakpoint; all customers share
/// one score per metric and nothing panics.
#[test]
fn identical_values_share_a_score() {
    let rows: Vec<_> = (0..7).map(|i| row(&format!("c{i}"), 12, 3, 50.0)).collect();

    let bps = scorer().breakpoints(&rows);
    for metric in Metric::ALL {
        assert!(bps.for_metric(metric).is_degenerate(), "{metric} should be degenerate");
    }

    let scores = scorer().score(&rows);
    for s in &scores {
        assert_eq!((s.r_score, s.f_score, s.m_score), (5, 1, 1));
    }
}

/// A single customer is the degenerate case of a population of one.
#[test]
fn single_customer_scores_lowest_bucket() {
    let scores = scorer().score(&[row("solo", 3, 2, 19.0)]);
    assert_eq!(scores.len(), 1);
    assert_eq!((scores[0].r_score, scores[0].f_score, scores[0].m_score), (5, 1, 1));
    assert_eq!(scores[0].rfm_score, 511);
}

/// Identical customers make every metric degenerate; the run still succeeds
/// and records one event per metric.
#[test]
fn degenerate_metrics_are_recorded_not_rejected() {
    let as_of = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
    let order = NaiveDate::from_ymd_opt(2024, 6, 20).unwrap();
    let store: TransactionStore = vec![
        Transaction::new("a", order, 50.0, "Books"),
        Transaction::new("b", order, 50.0, "Books"),
    ]
    .into();

    let run = RfmEngine::reference().run(&store, Some(as_of)).unwrap();
    let degenerate = run
        .events()
        .iter()
        .filter(|e| e.event_type == "degenerate_percentile")
        .count();
    assert_eq!(degenerate, 3);
    for row in run.customers.rows() {
        assert_eq!(row.rfm_score, 511);
    }
}

/// Nine one-order customers collapse every frequency breakpoint to 1, but
/// the population is still mixed: no degenerate event for frequency.
#[test]
fn collapsed_breakpoints_with_an_outlier_are_not_degenerate() {
    let as_of = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
    let order = NaiveDate::from_ymd_opt(2024, 6, 20).unwrap();
    let mut txns: Vec<Transaction> = (0..9)
        .map(|i| Transaction::new(format!("c{i}"), order, 40.0, "Books"))
        .collect();
    txns.extend((0..9).map(|_| Transaction::new("c9", order, 40.0, "Books")));
    let store: TransactionStore = txns.into();

    let run = RfmEngine::reference().run(&store, Some(as_of)).unwrap();
    let frequency_degenerate = run.events().iter().any(|e| {
        e.event_type == "degenerate_percentile" && e.payload.contains("\"frequency\"")
    });
    assert!(!frequency_degenerate);
    assert_eq!(run.customers.get("c9").unwrap().f_score, 5);
    assert_eq!(run.customers.get("c0").unwrap().f_score, 1);
}

/// Equal raw values always get equal scores, so bucketing stays monotonic.
#[test]
fn ties_do_not_split_across_buckets() {
    let rows = vec![
        row("a", 1, 2, 10.0),
        row("b", 1, 2, 10.0),
        row("c", 1, 2, 10.0),
        row("d", 9, 8, 90.0),
        row("e", 9, 8, 90.0),
    ];
    let scores = scorer().score(&rows);
    assert_eq!(scores[0].f_score, scores[1].f_score);
    assert_eq!(scores[1].f_score, scores[2].f_score);
    assert_eq!(scores[3].f_score, scores[4].f_score);
    assert!(scores[3].f_score > scores[0].f_score);
    assert!(scores[3].r_score < scores[0].r_score);
}

/// Breakpoints follow linear interpolation between ranked observations.
#[test]
fn breakpoints_use_linear_interpolation() {
    let bp = Breakpoints::compute(&[5.0, 1.0, 4.0, 2.0, 3.0], &[0.2, 0.4, 0.6, 0.8]);
    let expected = [1.8, 2.6, 3.4, 4.2];
    for (got, want) in bp.values().iter().zip(expected) {
        assert!((got - want).abs() < 1e-9, "got {got}, want {want}");
    }
}

/// Empty population: nothing to score, no breakpoints.
#[test]
fn empty_population_scores_nothing() {
    let s = scorer();
    assert!(s.score(&[]).is_empty());
    assert!(s.breakpoints(&[]).recency.values().is_empty());
}
