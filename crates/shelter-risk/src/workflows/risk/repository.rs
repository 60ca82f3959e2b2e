use serde::Serialize;

use super::alerts::RiskAlert;
use super::domain::{
    AdoptionInterest, AnimalId, AnimalSnapshot, BehavioralAssessment, MedicalRecord,
    OrganizationId, PopulationCounts, Species,
};
use super::profile::RiskProfile;
use super::scoring::{RiskReason, SeverityTier};

/// Read access to animal records and the context a scoring pass needs.
pub trait AnimalRecordProvider: Send + Sync {
    fn animal(&self, id: &AnimalId) -> Result<AnimalSnapshot, ProviderError>;
    fn medical_records(&self, id: &AnimalId) -> Result<Vec<MedicalRecord>, ProviderError>;
    fn behavioral_assessments(
        &self,
        id: &AnimalId,
    ) -> Result<Vec<BehavioralAssessment>, ProviderError>;
    /// Counts for the whole organization when `species` is `None`.
    fn population_counts(
        &self,
        organization: &OrganizationId,
        species: Option<Species>,
    ) -> Result<Option<PopulationCounts>, ProviderError>;
    fn adoption_interest(&self, id: &AnimalId) -> Result<AdoptionInterest, ProviderError>;
    /// Animals of the organization in an active status.
    fn active_animal_ids(&self, organization: &OrganizationId)
        -> Result<Vec<AnimalId>, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("animal {0} not found")]
    NotFound(AnimalId),
    #[error("malformed record: {0}")]
    Malformed(String),
    #[error("record provider unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction for risk profiles. `upsert` must be atomic per animal.
pub trait RiskProfileStore: Send + Sync {
    fn upsert(&self, profile: RiskProfile) -> Result<(), StoreError>;
    fn get(&self, animal_id: &AnimalId) -> Result<Option<RiskProfile>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("profile store unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook for threshold-crossing alerts (notification or webhook adapters).
pub trait AlertSink: Send + Sync {
    fn publish(&self, alert: RiskAlert) -> Result<(), AlertError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("alert transport unavailable: {0}")]
    Transport(String),
}

/// Compact representation of a profile for command output.
#[derive(Debug, Clone, Serialize)]
pub struct RiskProfileView {
    pub animal_id: AnimalId,
    pub urgency_score: u8,
    pub severity: SeverityTier,
    pub reasons: Vec<RiskReason>,
    pub length_of_stay: u32,
    pub algorithm_version: String,
    pub manual_override: bool,
}

impl From<&RiskProfile> for RiskProfileView {
    fn from(profile: &RiskProfile) -> Self {
        Self {
            animal_id: profile.animal_id.clone(),
            urgency_score: profile.urgency_score,
            severity: profile.severity,
            reasons: profile.reasons.as_slice().to_vec(),
            length_of_stay: profile.length_of_stay,
            algorithm_version: profile.algorithm_version.clone(),
            manual_override: profile.is_manual_override(),
        }
    }
}
