//! Urgency scoring for shelter animals.
//!
//! Six factor evaluators feed a weighted composite that is classified into a
//! severity tier, assembled into a persisted [`RiskProfile`], and compared with
//! the previous score to raise threshold-crossing alerts. The batch recalculator
//! drives the same pipeline across an organization's active population.

pub mod alerts;
pub mod batch;
pub mod domain;
pub mod profile;
pub mod repository;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use alerts::{crossing_alert, detect_crossing, RiskAlert};
pub use batch::{
    BatchError, BatchItemError, BatchOptions, BatchRecalculator, BatchSummary, BatchTarget,
};
pub use domain::{
    AdoptionInterest, AgeCategory, AnimalId, AnimalSize, AnimalSnapshot, AnimalStatus,
    AssessmentResult, BehavioralAssessment, CapacitySnapshot, MedicalRecord, OrganizationId,
    PopulationCounts, Species, SpecialNeedsCategory, SupportingContext,
};
pub use profile::{
    apply_manual_override, assemble_profile, ManualOverride, OverrideHandling, RiskProfile,
};
pub use repository::{
    AlertError, AlertSink, AnimalRecordProvider, ProviderError, RiskProfileStore,
    RiskProfileView, StoreError,
};
pub use scoring::{
    composite_score, ConfigSource, FactorWeights, JsonFileConfigSource, KennelStress,
    RiskConfigError, RiskFactorKind, RiskFactorScore, RiskReason, RiskReasons,
    RiskScoringConfig, ScoreSignals, ScoringEngine, ScoringOutcome, SeverityThresholds,
    SeverityTier, StandardConfigSource, TargetLosEntry, TargetLosTable,
};
pub use service::{Recalculation, RiskScoringService, RiskServiceError};
