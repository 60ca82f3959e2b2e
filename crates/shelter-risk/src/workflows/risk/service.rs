use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::alerts::{crossing_alert, RiskAlert};
use super::domain::{AnimalId, AnimalSnapshot, CapacitySnapshot, SupportingContext};
use super::profile::{
    apply_manual_override, assemble_profile, ManualOverride, OverrideHandling, RiskProfile,
};
use super::repository::{
    AlertSink, AnimalRecordProvider, ProviderError, RiskProfileStore, StoreError,
};
use super::scoring::ScoringEngine;

/// Service composing the record provider, profile store, alert sink and engine.
///
/// [`recalculate`](Self::recalculate) is the inline discipline: the profile is
/// persisted before the call returns. [`spawn_recalculation`](Self::spawn_recalculation)
/// is fire-and-forget and only logs failures.
pub struct RiskScoringService<P, S, A> {
    provider: Arc<P>,
    store: Arc<S>,
    alerts: Arc<A>,
    engine: Arc<ScoringEngine>,
    locks: AnimalLocks,
}

/// Outcome of one recompute.
#[derive(Debug, Clone, PartialEq)]
pub struct Recalculation {
    pub profile: RiskProfile,
    pub alert: Option<RiskAlert>,
}

impl<P, S, A> RiskScoringService<P, S, A>
where
    P: AnimalRecordProvider + 'static,
    S: RiskProfileStore + 'static,
    A: AlertSink + 'static,
{
    pub fn new(provider: Arc<P>, store: Arc<S>, alerts: Arc<A>, engine: ScoringEngine) -> Self {
        Self {
            provider,
            store,
            alerts,
            engine: Arc::new(engine),
            locks: AnimalLocks::default(),
        }
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    pub(crate) fn provider(&self) -> &P {
        &self.provider
    }

    /// Recompute and persist one animal's profile as of now.
    pub fn recalculate(
        &self,
        animal_id: &AnimalId,
        handling: OverrideHandling,
    ) -> Result<Recalculation, RiskServiceError> {
        self.recalculate_at(animal_id, Utc::now(), handling)
    }

    /// Recompute against an explicit reference instant.
    pub fn recalculate_at(
        &self,
        animal_id: &AnimalId,
        as_of: DateTime<Utc>,
        handling: OverrideHandling,
    ) -> Result<Recalculation, RiskServiceError> {
        self.with_animal_lock(animal_id, || -> Result<Recalculation, RiskServiceError> {
            let animal = self.provider.animal(animal_id)?;
            self.run_pipeline(animal, as_of, handling, None)
        })
    }

    /// Batch entry point: inactive animals are refused instead of scored, and
    /// nothing is written once `gate` has been abandoned.
    pub(crate) fn recalculate_active(
        &self,
        animal_id: &AnimalId,
        as_of: DateTime<Utc>,
        gate: &CommitGate,
    ) -> Result<Recalculation, RiskServiceError> {
        self.with_animal_lock(animal_id, || -> Result<Recalculation, RiskServiceError> {
            let animal = self.provider.animal(animal_id)?;
            if !animal.status.is_active() {
                return Err(RiskServiceError::Ineligible {
                    animal_id: animal_id.clone(),
                    status: animal.status.label(),
                });
            }
            self.run_pipeline(animal, as_of, OverrideHandling::Preserve, Some(gate))
        })
    }

    /// Fire-and-forget recompute on the blocking pool. Must be called within a
    /// tokio runtime.
    pub fn spawn_recalculation(self: &Arc<Self>, animal_id: AnimalId) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            if let Err(error) = service.recalculate(&animal_id, OverrideHandling::Preserve) {
                warn!(animal_id = %animal_id, %error, "background risk recalculation failed");
            }
        })
    }

    /// Collect everything the engine reads besides the snapshot. Missing data
    /// comes back empty rather than as an error.
    pub fn gather_context(
        &self,
        animal: &AnimalSnapshot,
    ) -> Result<SupportingContext, RiskServiceError> {
        let medical_records = self.provider.medical_records(&animal.id)?;
        let behavioral_assessments = self.provider.behavioral_assessments(&animal.id)?;
        let capacity = CapacitySnapshot {
            organization: self
                .provider
                .population_counts(&animal.organization_id, None)?,
            species: self
                .provider
                .population_counts(&animal.organization_id, Some(animal.species))?,
        };
        let adoption_interest = self.provider.adoption_interest(&animal.id)?;

        Ok(SupportingContext {
            medical_records,
            behavioral_assessments,
            capacity,
            adoption_interest,
        })
    }

    pub fn profile(&self, animal_id: &AnimalId) -> Result<RiskProfile, RiskServiceError> {
        self.store
            .get(animal_id)?
            .ok_or_else(|| RiskServiceError::ProfileNotFound(animal_id.clone()))
    }

    /// Pin an existing profile to a staff-chosen score.
    pub fn override_score(
        &self,
        animal_id: &AnimalId,
        score: u8,
        reason: impl Into<String>,
        author: impl Into<String>,
    ) -> Result<RiskProfile, RiskServiceError> {
        let manual = ManualOverride {
            reason: reason.into(),
            author: author.into(),
            applied_at: Utc::now(),
        };
        let author = manual.author.clone();

        self.with_animal_lock(animal_id, || -> Result<RiskProfile, RiskServiceError> {
            let mut profile = self.profile(animal_id)?;
            apply_manual_override(
                &mut profile,
                score,
                &self.engine.config().thresholds,
                manual,
            );
            self.store.upsert(profile.clone())?;
            info!(
                animal_id = %animal_id,
                score = profile.urgency_score,
                author = %author,
                "manual risk override applied"
            );
            Ok(profile)
        })
    }

    /// Drop a manual override and return to the computed score.
    pub fn clear_override(&self, animal_id: &AnimalId) -> Result<Recalculation, RiskServiceError> {
        self.recalculate(animal_id, OverrideHandling::Clear)
    }

    fn run_pipeline(
        &self,
        animal: AnimalSnapshot,
        as_of: DateTime<Utc>,
        handling: OverrideHandling,
        gate: Option<&CommitGate>,
    ) -> Result<Recalculation, RiskServiceError> {
        let context = self.gather_context(&animal)?;
        let existing = self.store.get(&animal.id)?;

        let outcome = self.engine.score(&animal, &context, as_of);
        let profile = assemble_profile(&outcome, existing.as_ref(), handling);
        if gate.is_some_and(|gate| !gate.commit()) {
            return Err(RiskServiceError::Abandoned(animal.id));
        }
        self.store.upsert(profile.clone())?;

        debug!(
            animal_id = %animal.id,
            urgency_score = outcome.urgency_score,
            severity = outcome.severity.label(),
            preserved_override = profile.is_manual_override(),
            "risk profile recalculated"
        );

        // First scoring sets the baseline; overridden profiles keep their pinned score.
        let alert = match &existing {
            Some(previous) if !profile.is_manual_override() => crossing_alert(
                &animal.id,
                previous.urgency_score,
                profile.urgency_score,
                &self.engine.config().thresholds,
                &profile.reasons,
                as_of,
            ),
            _ => None,
        };

        if let Some(alert) = &alert {
            info!(animal_id = %animal.id, boundary = alert.boundary.label(), "{}", alert.summary());
            if let Err(error) = self.alerts.publish(alert.clone()) {
                warn!(animal_id = %animal.id, %error, "failed to publish risk alert");
            }
        }

        Ok(Recalculation { profile, alert })
    }

    fn with_animal_lock<T>(&self, animal_id: &AnimalId, work: impl FnOnce() -> T) -> T {
        let slot = self.locks.slot(animal_id);
        let result = {
            let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
            work()
        };
        self.locks.release(animal_id, &slot);
        result
    }
}

/// Per-animal mutexes so one animal is never recomputed concurrently.
#[derive(Default)]
struct AnimalLocks {
    slots: Mutex<HashMap<AnimalId, Arc<Mutex<()>>>>,
}

impl AnimalLocks {
    fn slot(&self, animal_id: &AnimalId) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(animal_id.clone()).or_default())
    }

    fn release(&self, animal_id: &AnimalId, slot: &Arc<Mutex<()>>) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map and the caller still hold it.
        if Arc::strong_count(slot) == 2 {
            slots.remove(animal_id);
        }
    }
}

const GATE_OPEN: u8 = 0;
const GATE_COMMITTED: u8 = 1;
const GATE_ABANDONED: u8 = 2;

/// One-shot race between a worker persisting its result and a caller giving up
/// on it. Exactly one of [`commit`](Self::commit) and [`abandon`](Self::abandon)
/// succeeds.
#[derive(Debug, Default)]
pub(crate) struct CommitGate {
    state: AtomicU8,
}

impl CommitGate {
    pub(crate) fn commit(&self) -> bool {
        self.transition(GATE_COMMITTED)
    }

    pub(crate) fn abandon(&self) -> bool {
        self.transition(GATE_ABANDONED)
    }

    fn transition(&self, to: u8) -> bool {
        self.state
            .compare_exchange(GATE_OPEN, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Error raised by the scoring service.
#[derive(Debug, thiserror::Error)]
pub enum RiskServiceError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("animal {animal_id} has status {status} and is not scored")]
    Ineligible {
        animal_id: AnimalId,
        status: &'static str,
    },
    #[error("no risk profile stored for animal {0}")]
    ProfileNotFound(AnimalId),
    #[error("recalculation of animal {0} was abandoned before its profile was written")]
    Abandoned(AnimalId),
}

impl RiskServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RiskServiceError::Provider(ProviderError::NotFound(_))
                | RiskServiceError::ProfileNotFound(_)
        )
    }
}
