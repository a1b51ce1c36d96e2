//! The five customer behaviour segments.

use crate::error::RfmError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Declaration order is the canonical reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Segment {
    #[serde(rename = "Champion Customer")]
    Champion,
    #[serde(rename = "Loyal Customer")]
    Loyal,
    #[serde(rename = "Fence Sitter")]
    FenceSitter,
    #[serde(rename = "At Risk Customer")]
    AtRisk,
    #[serde(rename = "Churned Customer")]
    Churned,
}

impl Segment {
    pub const ALL: [Segment; 5] = [
        Segment::Champion,
        Segment::Loyal,
        Segment::FenceSitter,
        Segment::AtRisk,
        Segment::Churned,
    ];

    /// Display label, identical to the serialized form.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Champion    => "Champion Customer",
            Self::Loyal       => "Loyal Customer",
            Self::FenceSitter => "Fence Sitter",
            Self::AtRisk      => "At Risk Customer",
            Self::Churned     => "Churned Customer",
        }
    }

    /// Short snake_case key, accepted by `from_str` alongside the label.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Champion    => "champion",
            Self::Loyal       => "loyal",
            Self::FenceSitter => "fence_sitter",
            Self::AtRisk      => "at_risk",
            Self::Churned     => "churned",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Segment {
    type Err = RfmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Segment::ALL
            .into_iter()
            .find(|seg| {
                seg.label().eq_ignore_ascii_case(wanted) || seg.key().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| RfmError::UnknownSegment { name: s.to_string() })
    }
}
