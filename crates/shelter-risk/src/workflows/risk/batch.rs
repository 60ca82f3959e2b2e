use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::domain::{AnimalId, OrganizationId};
use super::repository::{AlertSink, AnimalRecordProvider, ProviderError, RiskProfileStore};
use super::service::{CommitGate, Recalculation, RiskScoringService, RiskServiceError};
use crate::config::ScoringSettings;

/// Population a batch run covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchTarget {
    /// Every active animal of the organization.
    Organization(OrganizationId),
    /// Explicit list; inactive animals are reported as per-item errors.
    Animals(Vec<AnimalId>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub concurrency: usize,
    pub item_timeout: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: 16,
            item_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&ScoringSettings> for BatchOptions {
    fn from(settings: &ScoringSettings) -> Self {
        Self {
            concurrency: settings.batch_concurrency,
            item_timeout: settings.item_timeout,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItemError {
    pub animal_id: AnimalId,
    pub error: String,
}

/// Counts returned to the caller once the run settles.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub updated: usize,
    pub errors: Vec<BatchItemError>,
    pub alerts_raised: usize,
    /// Set when cancellation stopped items from being enqueued.
    pub cancelled: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("unable to enumerate animals for organization {organization}: {source}")]
    Enumeration {
        organization: OrganizationId,
        source: ProviderError,
    },
    #[error("enumeration task failed: {0}")]
    Task(String),
}

enum ItemResult {
    Updated { alert_raised: bool },
    Failed(String),
}

fn item_result(joined: Result<Result<Recalculation, RiskServiceError>, JoinError>) -> ItemResult {
    match joined {
        Ok(Ok(recalculation)) => ItemResult::Updated {
            alert_raised: recalculation.alert.is_some(),
        },
        Ok(Err(error)) => ItemResult::Failed(error.to_string()),
        Err(join_error) => ItemResult::Failed(format!("recalculation task failed: {join_error}")),
    }
}

/// Drives the scoring pipeline over a population with bounded concurrency.
///
/// Each item runs on the blocking pool under `item_timeout` and holds its
/// concurrency permit until that work returns. A timed-out item is recorded as an
/// error and its late result is discarded unwritten. Failures never abort the run.
pub struct BatchRecalculator<P, S, A> {
    service: Arc<RiskScoringService<P, S, A>>,
    options: BatchOptions,
}

impl<P, S, A> BatchRecalculator<P, S, A>
where
    P: AnimalRecordProvider + 'static,
    S: RiskProfileStore + 'static,
    A: AlertSink + 'static,
{
    pub fn new(service: Arc<RiskScoringService<P, S, A>>, options: BatchOptions) -> Self {
        let options = BatchOptions {
            concurrency: options.concurrency.max(1),
            ..options
        };
        Self { service, options }
    }

    pub async fn run(
        &self,
        target: BatchTarget,
        cancel: CancellationToken,
    ) -> Result<BatchSummary, BatchError> {
        self.run_at(target, Utc::now(), cancel).await
    }

    /// Runs with one reference instant shared by every item.
    pub async fn run_at(
        &self,
        target: BatchTarget,
        as_of: DateTime<Utc>,
        cancel: CancellationToken,
    ) -> Result<BatchSummary, BatchError> {
        let animal_ids = self.resolve(target).await?;
        let total = animal_ids.len();
        info!(
            total,
            concurrency = self.options.concurrency,
            "starting batch risk recalculation"
        );

        let semaphore = Arc::new(Semaphore::new(self.options.concurrency));
        let mut tasks = JoinSet::new();
        let mut submitted = Vec::with_capacity(total);
        let mut cancelled = false;

        for animal_id in animal_ids {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let position = submitted.len();
            submitted.push(animal_id.clone());
            let service = Arc::clone(&self.service);
            let timeout = self.options.item_timeout;

            tasks.spawn(async move {
                let gate = Arc::new(CommitGate::default());
                let worker_gate = Arc::clone(&gate);
                let work_id = animal_id.clone();
                // The permit lives as long as the blocking work, not this task.
                let mut work = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    service.recalculate_active(&work_id, as_of, &worker_gate)
                });

                let result = match tokio::time::timeout(timeout, &mut work).await {
                    Ok(joined) => item_result(joined),
                    Err(_) if gate.abandon() => ItemResult::Failed(format!(
                        "timed out after {}ms",
                        timeout.as_millis()
                    )),
                    // Already writing; report what it actually did.
                    Err(_) => item_result(work.await),
                };

                if let ItemResult::Failed(error) = &result {
                    warn!(animal_id = %animal_id, %error, "risk recalculation failed");
                }
                (position, result)
            });
        }

        if cancelled {
            info!(
                enqueued = submitted.len(),
                total, "batch cancelled, draining in-flight items"
            );
        }

        let mut results: Vec<Option<ItemResult>> = submitted.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, result)) => results[position] = Some(result),
                Err(error) => warn!(%error, "batch worker aborted"),
            }
        }

        let mut summary = BatchSummary {
            total,
            cancelled,
            ..BatchSummary::default()
        };
        for (animal_id, result) in submitted.into_iter().zip(results) {
            match result {
                Some(ItemResult::Updated { alert_raised }) => {
                    summary.updated += 1;
                    if alert_raised {
                        summary.alerts_raised += 1;
                    }
                }
                Some(ItemResult::Failed(error)) => {
                    summary.errors.push(BatchItemError { animal_id, error })
                }
                None => summary.errors.push(BatchItemError {
                    animal_id,
                    error: "batch worker aborted".to_string(),
                }),
            }
        }

        info!(
            total = summary.total,
            updated = summary.updated,
            errors = summary.errors.len(),
            alerts = summary.alerts_raised,
            cancelled = summary.cancelled,
            "batch risk recalculation finished"
        );
        Ok(summary)
    }

    async fn resolve(&self, target: BatchTarget) -> Result<Vec<AnimalId>, BatchError> {
        let animal_ids = match target {
            BatchTarget::Animals(animal_ids) => animal_ids,
            BatchTarget::Organization(organization) => {
                let service = Arc::clone(&self.service);
                let lookup = organization.clone();
                tokio::task::spawn_blocking(move || service.provider().active_animal_ids(&lookup))
                    .await
                    .map_err(|error| BatchError::Task(error.to_string()))?
                    .map_err(|source| BatchError::Enumeration {
                        organization,
                        source,
                    })?
            }
        };

        let mut seen = HashSet::new();
        let unique: Vec<AnimalId> = animal_ids
            .into_iter()
            .filter(|animal_id| seen.insert(animal_id.clone()))
            .collect();
        debug!(count = unique.len(), "resolved batch population");
        Ok(unique)
    }
}
