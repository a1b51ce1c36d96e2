use crate::{
    error::{RfmError, RfmResult},
    segment::Segment,
    types::{Score, MAX_SCORE, MIN_SCORE},
};
use serde::{Deserialize, Serialize};

// ── Scoring ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Quantiles at which breakpoints are taken. Four ascending cuts
    /// in (0, 1) yield five buckets.
    pub quantile_cuts: Vec<f64>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self { quantile_cuts: vec![0.2, 0.4, 0.6, 0.8] }
    }
}

// ── Segment rules ──────────────────────────────────────────────────

/// Inclusive score range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub min: Score,
    pub max: Score,
}

impl ScoreRange {
    pub const fn new(min: Score, max: Score) -> Self {
        Self { min, max }
    }

    pub const fn at_least(min: Score) -> Self {
        Self { min, max: MAX_SCORE }
    }

    pub const fn exactly(score: Score) -> Self {
        Self { min: score, max: score }
    }

    pub fn contains(&self, score: Score) -> bool {
        (self.min..=self.max).contains(&score)
    }
}

/// Condition on the frequency and monetary scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngagementCondition {
    /// No constraint.
    Any,
    /// Both scores at or above their minimum.
    AllAtLeast { frequency: Score, monetary: Score },
    /// Either score at or below its maximum.
    AnyAtMost { frequency: Score, monetary: Score },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRule {
    pub segment:    Segment,
    pub recency:    ScoreRange,
    pub engagement: EngagementCondition,
}

/// Rules in priority order. First match wins; `fallback` catches the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRuleTable {
    pub rules:    Vec<SegmentRule>,
    pub fallback: Segment,
}

impl SegmentRuleTable {
    /// Reference policy:
    ///   1. Champion: r ≥ 4, f ≥ 4, m ≥ 4
    ///   2. Loyal   : r ≥ 3, f ≥ 3, m ≥ 3
    ///   3. Fence   : r ≥ 3, f ≤ 2 or m ≤ 2
    ///   4. At Risk : r = 2
    ///   5. Churned : r = 1, and anything unmatched
    pub fn reference() -> Self {
        Self {
            rules: vec![
                SegmentRule {
                    segment:    Segment::Champion,
                    recency:    ScoreRange::at_least(4),
                    engagement: EngagementCondition::AllAtLeast { frequency: 4, monetary: 4 },
                },
                SegmentRule {
                    segment:    Segment::Loyal,
                    recency:    ScoreRange::at_least(3),
                    engagement: EngagementCondition::AllAtLeast { frequency: 3, monetary: 3 },
                },
                SegmentRule {
                    segment:    Segment::FenceSitter,
                    recency:    ScoreRange::at_least(3),
                    engagement: EngagementCondition::AnyAtMost { frequency: 2, monetary: 2 },
                },
                SegmentRule {
                    segment:    Segment::AtRisk,
                    recency:    ScoreRange::exactly(2),
                    engagement: EngagementCondition::Any,
                },
                SegmentRule {
                    segment:    Segment::Churned,
                    recency:    ScoreRange::exactly(1),
                    engagement: EngagementCondition::Any,
                },
            ],
            fallback: Segment::Churned,
        }
    }
}

// ── Validation ─────────────────────────────────────────────────────

/// What to do with malformed transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPolicy {
    /// Drop invalid records, report them, continue with the rest.
    #[default]
    RejectInvalid,
    /// Fail the run on the first batch containing any invalid record.
    Strict,
}

/// A customer counts as active when recency_days ≤ this many days.
pub const DEFAULT_ACTIVE_WINDOW_DAYS: i64 = 30;

// ── Files on disk ──────────────────────────────────────────────────

/// `rfm/run_settings.json`: how a run treats its input and reports activity.
#[derive(Debug, Clone, Deserialize)]
struct RunSettingsFile {
    #[serde(default)]
    validation: ValidationPolicy,
    #[serde(default = "default_active_window_days")]
    active_window_days: i64,
}

fn default_active_window_days() -> i64 {
    DEFAULT_ACTIVE_WINDOW_DAYS
}

// ── Top-level config ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfmConfig {
    pub scoring:            ScoringConfig,
    pub segment_rules:      SegmentRuleTable,
    pub validation:         ValidationPolicy,
    /// A customer counts as active when recency_days ≤ this.
    pub active_window_days: i64,
}

impl RfmConfig {
    /// Load from the data/ directory.
    /// In tests, use RfmConfig::reference().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let scoring_path = format!("{data_dir}/rfm/scoring.json");
        let scoring_content = std::fs::read_to_string(&scoring_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {scoring_path}: {e}"))?;
        let scoring: ScoringConfig = serde_json::from_str(&scoring_content)?;

        let rules_path = format!("{data_dir}/rfm/segment_rules.json");
        let rules_content = std::fs::read_to_string(&rules_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {rules_path}: {e}"))?;
        let segment_rules: SegmentRuleTable = serde_json::from_str(&rules_content)?;

        let settings_path = format!("{data_dir}/rfm/run_settings.json");
        let settings_content = std::fs::read_to_string(&settings_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {settings_path}: {e}"))?;
        let settings: RunSettingsFile = serde_json::from_str(&settings_content)?;

        let config = Self {
            scoring,
            segment_rules,
            validation: settings.validation,
            active_window_days: settings.active_window_days,
        };
        config.validate()?;
        log::debug!(
            "Loaded RFM config from {data_dir}: {} segment rules",
            config.segment_rules.rules.len()
        );
        Ok(config)
    }

    /// The reference policy with hardcoded defaults.
    pub fn reference() -> Self {
        Self {
            scoring:            ScoringConfig::default(),
            segment_rules:      SegmentRuleTable::reference(),
            validation:         ValidationPolicy::RejectInvalid,
            active_window_days: DEFAULT_ACTIVE_WINDOW_DAYS,
        }
    }

    pub fn with_validation(mut self, validation: ValidationPolicy) -> Self {
        self.validation = validation;
        self
    }

    /// Reject configs that could produce scores outside 1..=5.
    pub fn validate(&self) -> RfmResult<()> {
        let cuts = &self.scoring.quantile_cuts;
        let expected = (MAX_SCORE - MIN_SCORE) as usize;
        if cuts.len() != expected {
            return Err(RfmError::InvalidConfig(format!(
                "expected {expected} quantile cuts, got {}",
                cuts.len()
            )));
        }
        if cuts.iter().any(|q| !(q.is_finite() && *q > 0.0 && *q < 1.0)) {
            return Err(RfmError::InvalidConfig(
                "quantile cuts must lie strictly between 0 and 1".into(),
            ));
        }
        if cuts.windows(2).any(|w| w[0] >= w[1]) {
            return Err(RfmError::InvalidConfig(
                "quantile cuts must be strictly ascending".into(),
            ));
        }

        let in_domain = |s: Score| (MIN_SCORE..=MAX_SCORE).contains(&s);
        for rule in &self.segment_rules.rules {
            let range = rule.recency;
            if !in_domain(range.min) || !in_domain(range.max) || range.min > range.max {
                return Err(RfmError::InvalidConfig(format!(
                    "rule for {} has invalid recency range {}..={}",
                    rule.segment, range.min, range.max
                )));
            }
            let engagement_ok = match rule.engagement {
                EngagementCondition::Any => true,
                EngagementCondition::AllAtLeast { frequency, monetary }
                | EngagementCondition::AnyAtMost { frequency, monetary } => {
                    in_domain(frequency) && in_domain(monetary)
                }
            };
            if !engagement_ok {
                return Err(RfmError::InvalidConfig(format!(
                    "rule for {} has an engagement score outside {MIN_SCORE}..={MAX_SCORE}",
                    rule.segment
                )));
            }
        }

        if self.active_window_days < 0 {
            return Err(RfmError::InvalidConfig(
                "active_window_days must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

impl Default for RfmConfig {
    fn default() -> Self {
        Self::reference()
    }
}
