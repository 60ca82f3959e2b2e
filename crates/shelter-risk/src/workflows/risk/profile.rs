use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{AnimalId, SpecialNeedsCategory};
use super::scoring::{
    KennelStress, RiskFactorScore, RiskReasons, ScoringOutcome, SeverityThresholds, SeverityTier,
};

/// Persisted risk summary; one per animal, upserted on every recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub animal_id: AnimalId,
    pub urgency_score: u8,
    pub severity: SeverityTier,
    pub reasons: RiskReasons,
    pub factor_scores: Vec<RiskFactorScore>,
    pub length_of_stay: u32,
    pub los_ratio: f64,
    pub los_percentile: f64,
    pub is_senior: bool,
    pub has_special_needs: bool,
    pub special_needs_categories: Vec<SpecialNeedsCategory>,
    pub kennel_stress: Option<KennelStress>,
    pub needs_enrichment: bool,
    pub predicted_adoptability: f64,
    pub last_calculated: DateTime<Utc>,
    pub algorithm_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_override: Option<ManualOverride>,
}

impl RiskProfile {
    pub fn is_manual_override(&self) -> bool {
        self.manual_override.is_some()
    }
}

/// Staff-supplied score that automatic recomputes must not overwrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualOverride {
    pub reason: String,
    pub author: String,
    pub applied_at: DateTime<Utc>,
}

/// What to do with an existing manual override on recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverrideHandling {
    #[default]
    Preserve,
    Clear,
}

/// Builds the profile to persist from a fresh outcome and the stored profile.
///
/// An overridden profile keeps its score, severity and override metadata unless
/// `handling` is [`OverrideHandling::Clear`]; factor scores and signals always refresh.
pub fn assemble_profile(
    outcome: &ScoringOutcome,
    existing: Option<&RiskProfile>,
    handling: OverrideHandling,
) -> RiskProfile {
    let mut profile = RiskProfile {
        animal_id: outcome.animal_id.clone(),
        urgency_score: outcome.urgency_score,
        severity: outcome.severity,
        reasons: outcome.reasons.clone(),
        factor_scores: outcome.factors.clone(),
        length_of_stay: outcome.signals.days_in_shelter,
        los_ratio: outcome.signals.los_ratio,
        los_percentile: outcome.signals.los_percentile,
        is_senior: outcome.signals.is_senior,
        has_special_needs: outcome.signals.has_special_needs,
        special_needs_categories: outcome.signals.special_needs_categories.clone(),
        kennel_stress: outcome.signals.kennel_stress,
        needs_enrichment: outcome.signals.needs_enrichment,
        predicted_adoptability: outcome.signals.predicted_adoptability,
        last_calculated: outcome.evaluated_at,
        algorithm_version: outcome.algorithm_version.clone(),
        manual_override: None,
    };

    if handling == OverrideHandling::Preserve {
        if let Some(previous) = existing.filter(|previous| previous.is_manual_override()) {
            profile.urgency_score = previous.urgency_score;
            profile.severity = previous.severity;
            profile.manual_override = previous.manual_override.clone();
        }
    }

    profile
}

/// Pins a profile to a staff-chosen score.
pub fn apply_manual_override(
    profile: &mut RiskProfile,
    score: u8,
    thresholds: &SeverityThresholds,
    manual: ManualOverride,
) {
    let score = score.min(100);
    profile.urgency_score = score;
    profile.severity = thresholds.classify(score);
    profile.manual_override = Some(manual);
}
