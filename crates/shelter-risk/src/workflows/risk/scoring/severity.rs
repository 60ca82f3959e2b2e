use serde::{Deserialize, Serialize};

use super::config::SeverityThresholds;

/// Ordered severity tiers, least severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeverityTier {
    Low,
    Moderate,
    Elevated,
    High,
    Critical,
}

impl SeverityTier {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::Elevated => "elevated",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl SeverityThresholds {
    pub fn classify(&self, score: u8) -> SeverityTier {
        if score >= self.critical {
            SeverityTier::Critical
        } else if score >= self.high {
            SeverityTier::High
        } else if score >= self.elevated {
            SeverityTier::Elevated
        } else if score >= self.moderate {
            SeverityTier::Moderate
        } else {
            SeverityTier::Low
        }
    }

    /// Boundaries that raise alerts when crossed upward, most severe first.
    pub fn alert_boundaries(&self) -> [(SeverityTier, u8); 3] {
        [
            (SeverityTier::Critical, self.critical),
            (SeverityTier::High, self.high),
            (SeverityTier::Elevated, self.elevated),
        ]
    }
}
