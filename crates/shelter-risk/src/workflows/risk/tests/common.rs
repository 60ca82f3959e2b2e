use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::workflows::risk::alerts::RiskAlert;
use crate::workflows::risk::domain::{
    AdoptionInterest, AgeCategory, AnimalId, AnimalSnapshot, AnimalStatus, BehavioralAssessment,
    MedicalRecord, OrganizationId, PopulationCounts, Species,
};
use crate::workflows::risk::profile::RiskProfile;
use crate::workflows::risk::repository::{
    AlertError, AlertSink, AnimalRecordProvider, ProviderError, RiskProfileStore, StoreError,
};
use crate::workflows::risk::scoring::{RiskScoringConfig, ScoringEngine};
use crate::workflows::risk::service::RiskScoringService;

pub(super) const ORG: &str = "org-riverside";

pub(super) fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn organization() -> OrganizationId {
    OrganizationId(ORG.to_string())
}

pub(super) fn animal_id(raw: &str) -> AnimalId {
    AnimalId(raw.to_string())
}

/// Adult dog, 10 days in care, nothing notable.
pub(super) fn dog(id: &str) -> AnimalSnapshot {
    AnimalSnapshot {
        id: animal_id(id),
        organization_id: organization(),
        name: format!("Dog {id}"),
        species: Species::Dog,
        age_category: Some(AgeCategory::Adult),
        birth_date: None,
        intake_date: date(2025, 6, 5),
        size: None,
        primary_color: Some("brown".to_string()),
        special_needs: None,
        special_needs_categories: Vec::new(),
        medical_conditions: Vec::new(),
        status: AnimalStatus::Available,
    }
}

/// Senior dog on daily medication, 45 days into a 30-day target.
pub(super) fn senior_on_medication(id: &str) -> AnimalSnapshot {
    AnimalSnapshot {
        age_category: Some(AgeCategory::Senior),
        intake_date: date(2025, 5, 1),
        special_needs: Some("Daily medication".to_string()),
        ..dog(id)
    }
}

pub(super) fn engine() -> ScoringEngine {
    ScoringEngine::new(RiskScoringConfig::standard()).expect("standard config is valid")
}

#[derive(Debug, Clone, Default)]
pub(super) struct AnimalFixture {
    pub(super) snapshot: Option<AnimalSnapshot>,
    pub(super) medical: Vec<MedicalRecord>,
    pub(super) behavioral: Vec<BehavioralAssessment>,
    pub(super) interest: AdoptionInterest,
}

#[derive(Default, Clone)]
pub(super) struct MemoryProvider {
    animals: Arc<Mutex<HashMap<AnimalId, AnimalFixture>>>,
    populations: Arc<Mutex<HashMap<Option<Species>, PopulationCounts>>>,
    stalls: Arc<Mutex<HashMap<AnimalId, Duration>>>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl MemoryProvider {
    pub(super) fn with_animals(animals: impl IntoIterator<Item = AnimalSnapshot>) -> Self {
        let provider = Self::default();
        for animal in animals {
            provider.insert(animal);
        }
        provider
    }

    pub(super) fn insert(&self, animal: AnimalSnapshot) {
        self.animals
            .lock()
            .expect("provider mutex poisoned")
            .insert(
                animal.id.clone(),
                AnimalFixture {
                    snapshot: Some(animal),
                    ..AnimalFixture::default()
                },
            );
    }

    pub(super) fn update(&self, id: &AnimalId, change: impl FnOnce(&mut AnimalFixture)) {
        let mut animals = self.animals.lock().expect("provider mutex poisoned");
        change(animals.entry(id.clone()).or_default());
    }

    pub(super) fn set_population(&self, species: Option<Species>, current: u32, capacity: u32) {
        self.populations
            .lock()
            .expect("provider mutex poisoned")
            .insert(species, PopulationCounts { current, capacity });
    }

    /// Delays the next snapshot lookup for `id`, after the snapshot was read.
    pub(super) fn stall(&self, id: &AnimalId, delay: Duration) {
        self.stalls
            .lock()
            .expect("provider mutex poisoned")
            .insert(id.clone(), delay);
    }

    /// Most snapshot lookups observed running at the same time.
    pub(super) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn fixture(&self, id: &AnimalId) -> Result<AnimalFixture, ProviderError> {
        self.animals
            .lock()
            .expect("provider mutex poisoned")
            .get(id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(id.clone()))
    }
}

impl AnimalRecordProvider for MemoryProvider {
    fn animal(&self, id: &AnimalId) -> Result<AnimalSnapshot, ProviderError> {
        let snapshot = self
            .fixture(id)?
            .snapshot
            .ok_or_else(|| ProviderError::NotFound(id.clone()));
        let stall = self
            .stalls
            .lock()
            .expect("provider mutex poisoned")
            .remove(id);

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = stall {
            std::thread::sleep(delay);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        snapshot
    }

    fn medical_records(&self, id: &AnimalId) -> Result<Vec<MedicalRecord>, ProviderError> {
        Ok(self.fixture(id)?.medical)
    }

    fn behavioral_assessments(
        &self,
        id: &AnimalId,
    ) -> Result<Vec<BehavioralAssessment>, ProviderError> {
        Ok(self.fixture(id)?.behavioral)
    }

    fn population_counts(
        &self,
        _organization: &OrganizationId,
        species: Option<Species>,
    ) -> Result<Option<PopulationCounts>, ProviderError> {
        Ok(self
            .populations
            .lock()
            .expect("provider mutex poisoned")
            .get(&species)
            .copied())
    }

    fn adoption_interest(&self, id: &AnimalId) -> Result<AdoptionInterest, ProviderError> {
        Ok(self.fixture(id)?.interest)
    }

    fn active_animal_ids(
        &self,
        organization: &OrganizationId,
    ) -> Result<Vec<AnimalId>, ProviderError> {
        let animals = self.animals.lock().expect("provider mutex poisoned");
        let mut ids: Vec<AnimalId> = animals
            .values()
            .filter_map(|fixture| fixture.snapshot.as_ref())
            .filter(|snapshot| {
                &snapshot.organization_id == organization && snapshot.status.is_active()
            })
            .map(|snapshot| snapshot.id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryStore {
    profiles: Arc<Mutex<HashMap<AnimalId, RiskProfile>>>,
}

impl MemoryStore {
    pub(super) fn len(&self) -> usize {
        self.profiles.lock().expect("store mutex poisoned").len()
    }
}

impl RiskProfileStore for MemoryStore {
    fn upsert(&self, profile: RiskProfile) -> Result<(), StoreError> {
        self.profiles
            .lock()
            .expect("store mutex poisoned")
            .insert(profile.animal_id.clone(), profile);
        Ok(())
    }

    fn get(&self, animal_id: &AnimalId) -> Result<Option<RiskProfile>, StoreError> {
        Ok(self
            .profiles
            .lock()
            .expect("store mutex poisoned")
            .get(animal_id)
            .cloned())
    }
}

pub(super) struct UnavailableStore;

impl RiskProfileStore for UnavailableStore {
    fn upsert(&self, _profile: RiskProfile) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn get(&self, _animal_id: &AnimalId) -> Result<Option<RiskProfile>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryAlerts {
    events: Arc<Mutex<Vec<RiskAlert>>>,
}

impl MemoryAlerts {
    pub(super) fn events(&self) -> Vec<RiskAlert> {
        self.events.lock().expect("alert mutex poisoned").clone()
    }
}

impl AlertSink for MemoryAlerts {
    fn publish(&self, alert: RiskAlert) -> Result<(), AlertError> {
        self.events
            .lock()
            .expect("alert mutex poisoned")
            .push(alert);
        Ok(())
    }
}

pub(super) struct OfflineAlerts;

impl AlertSink for OfflineAlerts {
    fn publish(&self, _alert: RiskAlert) -> Result<(), AlertError> {
        Err(AlertError::Transport("webhook endpoint refused".to_string()))
    }
}

pub(super) type MemoryService = RiskScoringService<MemoryProvider, MemoryStore, MemoryAlerts>;

pub(super) fn build_service(
    provider: MemoryProvider,
) -> (Arc<MemoryService>, Arc<MemoryProvider>, Arc<MemoryStore>, Arc<MemoryAlerts>) {
    let provider = Arc::new(provider);
    let store = Arc::new(MemoryStore::default());
    let alerts = Arc::new(MemoryAlerts::default());
    let service = Arc::new(RiskScoringService::new(
        provider.clone(),
        store.clone(),
        alerts.clone(),
        engine(),
    ));
    (service, provider, store, alerts)
}
