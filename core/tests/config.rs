use chrono::{NaiveDate, TimeZone, Utc};
use rfm_core::{
    aggregation::AggregationEngine,
    config::{
        EngagementCondition, RfmConfig, ScoreRange, SegmentRuleTable, ValidationPolicy,
        DEFAULT_ACTIVE_WINDOW_DAYS,
    },
    context::AnalysisContext,
    engine::RfmEngine,
    error::RfmError,
    segment::Segment,
    store::{Transaction, TransactionStore},
};
use std::{fs, path::PathBuf};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn data_dir() -> String {
    format!("{}/../data", env!("CARGO_MANIFEST_DIR"))
}

/// Fresh `<tmp>/<name>/rfm` directory holding copies of the named shipped files.
fn scratch_data_dir(name: &str, files: &[&str]) -> PathBuf {
    let root = std::env::temp_dir().join(format!("rfm-config-{name}-{}", std::process::id()));
    let rfm = root.join("rfm");
    let _ = fs::remove_dir_all(&root);
    fs::create_dir_all(&rfm).unwrap();
    for file in files {
        fs::copy(format!("{}/rfm/{file}", data_dir()), rfm.join(file)).unwrap();
    }
    root
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// The shipped data/ files describe exactly the reference policy.
#[test]
fn shipped_config_matches_reference_policy() {
    let loaded = RfmConfig::load(&data_dir()).expect("load data/rfm");
    assert_eq!(loaded, RfmConfig::reference());
}

#[test]
fn missing_config_dir_is_an_error() {
    let err = RfmConfig::load("/nonexistent/rfm-data").unwrap_err();
    assert!(err.to_string().contains("Cannot read"), "{err}");
}

#[test]
fn wrong_number_of_quantile_cuts_is_rejected() {
    let mut config = RfmConfig::reference();
    config.scoring.quantile_cuts = vec![0.25, 0.5, 0.75];
    assert!(matches!(RfmEngine::new(config), Err(RfmError::InvalidConfig(_))));
}

#[test]
fn unordered_quantile_cuts_are_rejected() {
    let mut config = RfmConfig::reference();
    config.scoring.quantile_cuts = vec![0.2, 0.6, 0.4, 0.8];
    assert!(matches!(config.validate(), Err(RfmError::InvalidConfig(_))));
}

#[test]
fn rule_scores_outside_one_to_five_are_rejected() {
    let mut config = RfmConfig::reference();
    config.segment_rules.rules[0].recency = ScoreRange::new(0, 5);
    assert!(matches!(config.validate(), Err(RfmError::InvalidConfig(_))));

    let mut config = RfmConfig::reference();
    config.segment_rules.rules[1].engagement =
        EngagementCondition::AllAtLeast { frequency: 6, monetary: 3 };
    assert!(matches!(config.validate(), Err(RfmError::InvalidConfig(_))));
}

/// Rule tables round-trip through the on-disk JSON shape.
#[test]
fn rule_table_parses_from_json() {
    let table: SegmentRuleTable = serde_json::from_str(
        r#"{
            "rules": [
                {
                    "segment": "Loyal Customer",
                    "recency": { "min": 2, "max": 5 },
                    "engagement": { "type": "all_at_least", "frequency": 2, "monetary": 1 }
                }
            ],
            "fallback": "At Risk Customer"
        }"#,
    )
    .unwrap();

    assert_eq!(table.rules.len(), 1);
    assert_eq!(table.rules[0].segment, Segment::Loyal);
    assert_eq!(table.fallback, Segment::AtRisk);
}

#[test]
fn validation_policy_defaults_to_reject_invalid() {
    assert_eq!(RfmConfig::default().validation, ValidationPolicy::RejectInvalid);
}

/// Run settings live in their own file; scoring.json holds only the cuts.
#[test]
fn run_settings_are_loaded_from_their_own_file() {
    let scoring: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(format!("{}/rfm/scoring.json", data_dir())).unwrap())
            .unwrap();
    let keys: Vec<&str> = scoring.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["quantile_cuts"]);

    let dir = scratch_data_dir("settings", &["scoring.json", "segment_rules.json"]);
    let err = RfmConfig::load(dir.to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("run_settings.json"), "{err}");

    fs::write(
        dir.join("rfm/run_settings.json"),
        r#"{ "validation": "strict", "active_window_days": 90 }"#,
    )
    .unwrap();
    let loaded = RfmConfig::load(dir.to_str().unwrap()).unwrap();
    assert_eq!(loaded.validation, ValidationPolicy::Strict);
    assert_eq!(loaded.active_window_days, 90);
    assert_eq!(loaded.scoring, RfmConfig::reference().scoring);
    let _ = fs::remove_dir_all(&dir);
}

/// The config default and a bare aggregation engine agree on the window.
#[test]
fn active_window_default_is_shared() {
    assert_eq!(RfmConfig::reference().active_window_days, DEFAULT_ACTIVE_WINDOW_DAYS);

    let as_of = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
    let store: TransactionStore = vec![
        Transaction::new("edge", as_of - chrono::Duration::days(DEFAULT_ACTIVE_WINDOW_DAYS), 10.0, "A"),
        Transaction::new("late", as_of - chrono::Duration::days(DEFAULT_ACTIVE_WINDOW_DAYS + 1), 10.0, "A"),
    ]
    .into();
    let at = Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap();
    let ctx = AnalysisContext::new(Some(as_of)).with_computed_at(at);
    let run = RfmEngine::reference().run_with_context(ctx, &store).unwrap();

    let bare = AggregationEngine::new(&run.customers, &run.transactions, at);
    assert_eq!(bare.kpis().active_customers, 1);
    assert_eq!(bare.kpis(), run.aggregates().kpis());
}

/// The reference engine is the validated engine over the reference config.
#[test]
fn reference_engine_matches_engine_built_from_reference_config() {
    let built = RfmEngine::new(RfmConfig::reference()).unwrap();
    let reference = RfmEngine::reference();
    assert_eq!(built.config(), reference.config());

    let as_of = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
    let store: TransactionStore = (1..=5)
        .map(|k: i64| {
            let order = as_of - chrono::Duration::days(k * 7);
            Transaction::new(format!("c{k}"), order, k as f64 * 15.0, "Books")
        })
        .collect();
    let at = Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap();
    let run = |engine: &RfmEngine| {
        let ctx = AnalysisContext::new(Some(as_of)).with_run_id("same-run").with_computed_at(at);
        engine.run_with_context(ctx, &store).unwrap()
    };
    assert_eq!(run(&built).customers, run(&reference).customers);
}
