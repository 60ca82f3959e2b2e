mod config;
mod factors;
mod reasons;
mod severity;

pub use config::{
    ConfigSource, FactorWeights, JsonFileConfigSource, RiskConfigError, RiskScoringConfig,
    SeverityThresholds, StandardConfigSource, TargetLosEntry, TargetLosTable,
};
pub use factors::{KennelStress, ScoreSignals};
pub use reasons::{RiskReason, RiskReasons};
pub use severity::SeverityTier;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{AnimalId, AnimalSnapshot, SupportingContext};
use factors::evaluate_factors;

/// Stateless scorer bound to one validated configuration.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    config: RiskScoringConfig,
}

impl ScoringEngine {
    /// Validates the config; an engine never exists for an invalid one.
    pub fn new(config: RiskScoringConfig) -> Result<Self, RiskConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn from_source(source: &dyn ConfigSource) -> Result<Self, RiskConfigError> {
        Self::new(source.load_risk_scoring_config()?)
    }

    pub fn config(&self) -> &RiskScoringConfig {
        &self.config
    }

    pub fn score(
        &self,
        animal: &AnimalSnapshot,
        context: &SupportingContext,
        as_of: DateTime<Utc>,
    ) -> ScoringOutcome {
        let (evaluations, signals) =
            evaluate_factors(animal, context, &self.config, as_of.date_naive());

        let mut reasons = RiskReasons::new();
        let factors: Vec<RiskFactorScore> = evaluations
            .into_iter()
            .map(|(factor, evaluation)| {
                reasons.extend(evaluation.reasons.iter().copied());
                let weight = factor.weight(&self.config.weights);
                RiskFactorScore {
                    factor,
                    raw_score: evaluation.raw_score,
                    normalized_score: evaluation.score,
                    weight,
                    weighted_contribution: evaluation.score * weight,
                    explanation: evaluation.explanation,
                    evaluated_at: as_of,
                }
            })
            .collect();

        let urgency_score = composite_score(&factors);
        let severity = self.config.thresholds.classify(urgency_score);

        ScoringOutcome {
            animal_id: animal.id.clone(),
            urgency_score,
            severity,
            reasons,
            factors,
            signals,
            algorithm_version: self.config.version.clone(),
            evaluated_at: as_of,
        }
    }
}

/// Weighted sum of factor scores, rounded and clamped to 0..=100.
pub fn composite_score(factors: &[RiskFactorScore]) -> u8 {
    let total: f64 = factors
        .iter()
        .map(|factor| factor.weighted_contribution)
        .sum();
    total.round().clamp(0.0, 100.0) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactorKind {
    LengthOfStay,
    Medical,
    Behavioral,
    Capacity,
    Adoptability,
    SpecialCategories,
}

impl RiskFactorKind {
    pub fn weight(self, weights: &FactorWeights) -> f64 {
        match self {
            Self::LengthOfStay => weights.length_of_stay,
            Self::Medical => weights.medical,
            Self::Behavioral => weights.behavioral,
            Self::Capacity => weights.capacity,
            Self::Adoptability => weights.adoptability,
            Self::SpecialCategories => weights.special_categories,
        }
    }
}

/// Discrete factor contribution kept for audits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactorScore {
    pub factor: RiskFactorKind,
    pub raw_score: f64,
    pub normalized_score: f64,
    pub weight: f64,
    pub weighted_contribution: f64,
    pub explanation: String,
    pub evaluated_at: DateTime<Utc>,
}

/// Result of one scoring pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringOutcome {
    pub animal_id: AnimalId,
    pub urgency_score: u8,
    pub severity: SeverityTier,
    pub reasons: RiskReasons,
    pub factors: Vec<RiskFactorScore>,
    pub signals: ScoreSignals,
    pub algorithm_version: String,
    pub evaluated_at: DateTime<Utc>,
}
