use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Deserialize;
use shelter_risk::config::MAX_BATCH_CONCURRENCY;
use shelter_risk::error::AppError;
use shelter_risk::workflows::risk::{
    AdoptionInterest, AlertError, AlertSink, AnimalId, AnimalRecordProvider, AnimalSnapshot,
    BehavioralAssessment, MedicalRecord, OrganizationId, PopulationCounts, ProviderError,
    RiskAlert, RiskProfile, RiskProfileStore, Species, StoreError,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Shelter records exported as a single JSON document.
#[derive(Debug, Deserialize)]
struct ShelterDataset {
    animals: Vec<AnimalSnapshot>,
    #[serde(default)]
    medical_records: HashMap<AnimalId, Vec<MedicalRecord>>,
    #[serde(default)]
    behavioral_assessments: HashMap<AnimalId, Vec<BehavioralAssessment>>,
    #[serde(default)]
    adoption_interest: HashMap<AnimalId, AdoptionInterest>,
    #[serde(default)]
    populations: Vec<PopulationEntry>,
}

#[derive(Debug, Deserialize)]
struct PopulationEntry {
    organization_id: OrganizationId,
    #[serde(default)]
    species: Option<Species>,
    current: u32,
    capacity: u32,
}

/// Read-only provider over a dataset file.
pub(crate) struct DatasetRecordProvider {
    animals: HashMap<AnimalId, AnimalSnapshot>,
    medical_records: HashMap<AnimalId, Vec<MedicalRecord>>,
    behavioral_assessments: HashMap<AnimalId, Vec<BehavioralAssessment>>,
    adoption_interest: HashMap<AnimalId, AdoptionInterest>,
    populations: HashMap<(OrganizationId, Option<Species>), PopulationCounts>,
}

impl DatasetRecordProvider {
    pub(crate) fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        let dataset: ShelterDataset = serde_json::from_str(&raw)?;
        let provider = Self::from_dataset(dataset);
        debug!(
            path = %path.display(),
            animals = provider.animals.len(),
            "loaded shelter dataset"
        );
        Ok(provider)
    }

    fn from_dataset(dataset: ShelterDataset) -> Self {
        Self {
            animals: dataset
                .animals
                .into_iter()
                .map(|animal| (animal.id.clone(), animal))
                .collect(),
            medical_records: dataset.medical_records,
            behavioral_assessments: dataset.behavioral_assessments,
            adoption_interest: dataset.adoption_interest,
            populations: dataset
                .populations
                .into_iter()
                .map(|entry| {
                    (
                        (entry.organization_id, entry.species),
                        PopulationCounts {
                            current: entry.current,
                            capacity: entry.capacity,
                        },
                    )
                })
                .collect(),
        }
    }
}

impl AnimalRecordProvider for DatasetRecordProvider {
    fn animal(&self, id: &AnimalId) -> Result<AnimalSnapshot, ProviderError> {
        self.animals
            .get(id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(id.clone()))
    }

    fn medical_records(&self, id: &AnimalId) -> Result<Vec<MedicalRecord>, ProviderError> {
        Ok(self.medical_records.get(id).cloned().unwrap_or_default())
    }

    fn behavioral_assessments(
        &self,
        id: &AnimalId,
    ) -> Result<Vec<BehavioralAssessment>, ProviderError> {
        Ok(self
            .behavioral_assessments
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    fn population_counts(
        &self,
        organization: &OrganizationId,
        species: Option<Species>,
    ) -> Result<Option<PopulationCounts>, ProviderError> {
        Ok(self
            .populations
            .get(&(organization.clone(), species))
            .copied())
    }

    fn adoption_interest(&self, id: &AnimalId) -> Result<AdoptionInterest, ProviderError> {
        Ok(self.adoption_interest.get(id).copied().unwrap_or_default())
    }

    fn active_animal_ids(
        &self,
        organization: &OrganizationId,
    ) -> Result<Vec<AnimalId>, ProviderError> {
        let mut ids: Vec<AnimalId> = self
            .animals
            .values()
            .filter(|animal| &animal.organization_id == organization && animal.status.is_active())
            .map(|animal| animal.id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryProfileStore {
    profiles: Arc<Mutex<HashMap<AnimalId, RiskProfile>>>,
}

impl InMemoryProfileStore {
    /// Stored profiles, most urgent first.
    pub(crate) fn ranked(&self) -> Vec<RiskProfile> {
        let guard = self.profiles.lock().expect("profile store mutex poisoned");
        let mut profiles: Vec<RiskProfile> = guard.values().cloned().collect();
        profiles.sort_by(|left, right| {
            right
                .urgency_score
                .cmp(&left.urgency_score)
                .then_with(|| left.animal_id.cmp(&right.animal_id))
        });
        profiles
    }
}

impl RiskProfileStore for InMemoryProfileStore {
    fn upsert(&self, profile: RiskProfile) -> Result<(), StoreError> {
        let mut guard = self.profiles.lock().expect("profile store mutex poisoned");
        guard.insert(profile.animal_id.clone(), profile);
        Ok(())
    }

    fn get(&self, animal_id: &AnimalId) -> Result<Option<RiskProfile>, StoreError> {
        let guard = self.profiles.lock().expect("profile store mutex poisoned");
        Ok(guard.get(animal_id).cloned())
    }
}

/// Writes alerts to the log and keeps them for the command summary.
#[derive(Default, Clone)]
pub(crate) struct LoggingAlertSink {
    events: Arc<Mutex<Vec<RiskAlert>>>,
}

impl AlertSink for LoggingAlertSink {
    fn publish(&self, alert: RiskAlert) -> Result<(), AlertError> {
        info!(
            animal_id = %alert.animal_id,
            previous_score = alert.previous_score,
            new_score = alert.new_score,
            boundary = alert.boundary.label(),
            "risk threshold crossed"
        );
        let mut guard = self.events.lock().expect("alert mutex poisoned");
        guard.push(alert);
        Ok(())
    }
}

impl LoggingAlertSink {
    pub(crate) fn events(&self) -> Vec<RiskAlert> {
        self.events.lock().expect("alert mutex poisoned").clone()
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_concurrency(raw: &str) -> Result<usize, String> {
    raw.trim()
        .parse::<usize>()
        .ok()
        .filter(|value| (1..=MAX_BATCH_CONCURRENCY).contains(value))
        .ok_or_else(|| {
            format!("concurrency must be between 1 and {MAX_BATCH_CONCURRENCY}, got '{raw}'")
        })
}

pub(crate) fn parse_timeout_ms(raw: &str) -> Result<u64, String> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|value| *value > 0)
        .ok_or_else(|| format!("timeout must be a positive number of milliseconds, got '{raw}'"))
}

/// Start of the given day in UTC, or now.
pub(crate) fn reference_instant(date: Option<NaiveDate>) -> DateTime<Utc> {
    match date {
        Some(date) => Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)),
        None => Utc::now(),
    }
}
