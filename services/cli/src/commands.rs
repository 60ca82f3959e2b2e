use crate::cli::{RecalculateArgs, ScoreArgs, ValidateConfigArgs};
use crate::infra::{
    reference_instant, DatasetRecordProvider, InMemoryProfileStore, LoggingAlertSink,
};
use serde::Serialize;
use shelter_risk::config::AppConfig;
use shelter_risk::error::AppError;
use shelter_risk::workflows::risk::{
    AnimalId, BatchOptions, BatchRecalculator, BatchSummary, BatchTarget, ConfigSource,
    JsonFileConfigSource, OrganizationId, OverrideHandling, RiskAlert, RiskProfile,
    RiskProfileStore, RiskProfileView, RiskScoringConfig, RiskScoringService, RiskServiceError,
    ScoringEngine, StandardConfigSource,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Serialize)]
struct RecalculationReport {
    summary: BatchSummary,
    profiles: Vec<RiskProfileView>,
    alerts: Vec<RiskAlert>,
}

#[derive(Serialize)]
struct ConfigReport<'a> {
    source: String,
    weight_sum: f64,
    config: &'a RiskScoringConfig,
}

pub(crate) fn run_score(config: &AppConfig, args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        dataset,
        animal,
        as_of,
        config: config_path,
        explain,
    } = args;

    let engine = load_engine(config_path.or_else(|| config.scoring.risk_config_path.clone()))?;
    let provider = Arc::new(DatasetRecordProvider::load(&dataset)?);
    let service = RiskScoringService::new(
        provider,
        Arc::new(InMemoryProfileStore::default()),
        Arc::new(LoggingAlertSink::default()),
        engine,
    );

    let recalculation = service.recalculate_at(
        &AnimalId(animal),
        reference_instant(as_of),
        OverrideHandling::Preserve,
    )?;

    if explain {
        print_json(&recalculation.profile)
    } else {
        print_json(&RiskProfileView::from(&recalculation.profile))
    }
}

pub(crate) async fn run_recalculate(
    config: &AppConfig,
    args: RecalculateArgs,
) -> Result<(), AppError> {
    let RecalculateArgs {
        dataset,
        organization,
        animals,
        as_of,
        config: config_path,
        previous,
        output,
        concurrency,
        timeout_ms,
    } = args;

    let engine = load_engine(config_path.or_else(|| config.scoring.risk_config_path.clone()))?;
    let provider = Arc::new(DatasetRecordProvider::load(&dataset)?);
    let store = Arc::new(InMemoryProfileStore::default());
    if let Some(path) = previous {
        seed_profiles(&store, &path)?;
    }
    let alerts = Arc::new(LoggingAlertSink::default());
    let service = Arc::new(RiskScoringService::new(
        provider,
        store.clone(),
        alerts.clone(),
        engine,
    ));

    let mut options = BatchOptions::from(&config.scoring);
    if let Some(concurrency) = concurrency {
        options.concurrency = concurrency;
    }
    if let Some(timeout_ms) = timeout_ms {
        options.item_timeout = Duration::from_millis(timeout_ms);
    }

    let target = match organization {
        Some(organization) => BatchTarget::Organization(OrganizationId(organization)),
        None => BatchTarget::Animals(animals.into_iter().map(AnimalId).collect()),
    };

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping batch after in-flight items");
            interrupt.cancel();
        }
    });

    let summary = BatchRecalculator::new(service, options)
        .run_at(target, reference_instant(as_of), cancel)
        .await;
    watcher.abort();
    let summary = summary?;

    let profiles = store.ranked();
    if let Some(path) = output {
        std::fs::write(&path, serde_json::to_string_pretty(&profiles)?)?;
        info!(path = %path.display(), count = profiles.len(), "wrote risk profiles");
    }

    print_json(&RecalculationReport {
        summary,
        profiles: profiles.iter().map(RiskProfileView::from).collect(),
        alerts: alerts.events(),
    })
}

pub(crate) fn run_validate_config(
    config: &AppConfig,
    args: ValidateConfigArgs,
) -> Result<(), AppError> {
    let path = args
        .config
        .or_else(|| config.scoring.risk_config_path.clone());
    let source = describe_source(path.as_deref());
    let engine = load_engine(path)?;

    print_json(&ConfigReport {
        source,
        weight_sum: engine.config().weights.sum(),
        config: engine.config(),
    })
}

fn load_engine(path: Option<PathBuf>) -> Result<ScoringEngine, AppError> {
    let source: Box<dyn ConfigSource> = match path {
        Some(path) => Box::new(JsonFileConfigSource::new(path)),
        None => Box::new(StandardConfigSource),
    };
    let engine = ScoringEngine::from_source(source.as_ref())?;
    info!(version = %engine.config().version, "scoring config loaded");
    Ok(engine)
}

fn describe_source(path: Option<&Path>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "built-in standard".to_string(),
    }
}

fn seed_profiles(store: &InMemoryProfileStore, path: &Path) -> Result<(), AppError> {
    let raw = std::fs::read_to_string(path)?;
    let profiles: Vec<RiskProfile> = serde_json::from_str(&raw)?;
    let count = profiles.len();
    for profile in profiles {
        store.upsert(profile).map_err(RiskServiceError::from)?;
    }
    info!(path = %path.display(), count, "seeded previous risk profiles");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
