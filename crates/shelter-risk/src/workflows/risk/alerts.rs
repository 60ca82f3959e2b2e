use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::AnimalId;
use super::scoring::{RiskReasons, SeverityThresholds, SeverityTier};

/// Event emitted when an animal's score worsens past a tier boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAlert {
    pub animal_id: AnimalId,
    pub previous_score: u8,
    pub new_score: u8,
    pub previous_tier: SeverityTier,
    pub new_tier: SeverityTier,
    /// Boundary that was crossed.
    pub boundary: SeverityTier,
    pub reasons: RiskReasons,
    pub raised_at: DateTime<Utc>,
}

impl RiskAlert {
    pub fn summary(&self) -> String {
        format!(
            "animal {} rose from {} ({}) to {} ({})",
            self.animal_id,
            self.previous_score,
            self.previous_tier.label(),
            self.new_score,
            self.new_tier.label()
        )
    }
}

/// Highest alerting boundary that `new_score` reached and `previous_score` had not.
///
/// Only the critical, high and elevated boundaries alert. Downward moves never do.
pub fn detect_crossing(
    previous_score: u8,
    new_score: u8,
    thresholds: &SeverityThresholds,
) -> Option<SeverityTier> {
    thresholds
        .alert_boundaries()
        .into_iter()
        .find(|(_, boundary)| new_score >= *boundary && previous_score < *boundary)
        .map(|(tier, _)| tier)
}

/// Compares a stored score against a fresh one and builds the alert, if any.
pub fn crossing_alert(
    animal_id: &AnimalId,
    previous_score: u8,
    new_score: u8,
    thresholds: &SeverityThresholds,
    reasons: &RiskReasons,
    raised_at: DateTime<Utc>,
) -> Option<RiskAlert> {
    let boundary = detect_crossing(previous_score, new_score, thresholds)?;
    Some(RiskAlert {
        animal_id: animal_id.clone(),
        previous_score,
        new_score,
        previous_tier: thresholds.classify(previous_score),
        new_tier: thresholds.classify(new_score),
        boundary,
        reasons: reasons.clone(),
        raised_at,
    })
}
