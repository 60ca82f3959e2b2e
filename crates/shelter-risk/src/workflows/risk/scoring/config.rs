use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::super::domain::{AgeCategory, Species};

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Versioned scoring configuration. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScoringConfig {
    pub version: String,
    pub weights: FactorWeights,
    pub thresholds: SeverityThresholds,
    pub target_los: TargetLosTable,
}

impl RiskScoringConfig {
    pub fn standard() -> Self {
        Self {
            version: "2.0.0".to_string(),
            weights: FactorWeights::standard(),
            thresholds: SeverityThresholds::standard(),
            target_los: TargetLosTable::standard(),
        }
    }

    /// Rejects configs that would produce meaningless scores.
    pub fn validate(&self) -> Result<(), RiskConfigError> {
        if self.version.trim().is_empty() {
            return Err(RiskConfigError::MissingVersion);
        }
        self.weights.validate()?;
        self.thresholds.validate()?;
        self.target_los.validate()
    }
}

/// Fractional contribution of each factor to the urgency score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorWeights {
    pub length_of_stay: f64,
    pub medical: f64,
    pub behavioral: f64,
    pub capacity: f64,
    pub adoptability: f64,
    pub special_categories: f64,
}

impl FactorWeights {
    pub const fn standard() -> Self {
        Self {
            length_of_stay: 0.25,
            medical: 0.20,
            behavioral: 0.15,
            capacity: 0.15,
            adoptability: 0.15,
            special_categories: 0.10,
        }
    }

    /// Reduced weighting for organizations without medical, behavioral or
    /// adoption-interest data.
    pub const fn simplified() -> Self {
        Self {
            length_of_stay: 0.45,
            medical: 0.0,
            behavioral: 0.0,
            capacity: 0.15,
            adoptability: 0.0,
            special_categories: 0.40,
        }
    }

    pub fn sum(&self) -> f64 {
        self.length_of_stay
            + self.medical
            + self.behavioral
            + self.capacity
            + self.adoptability
            + self.special_categories
    }

    fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("length_of_stay", self.length_of_stay),
            ("medical", self.medical),
            ("behavioral", self.behavioral),
            ("capacity", self.capacity),
            ("adoptability", self.adoptability),
            ("special_categories", self.special_categories),
        ]
    }

    fn validate(&self) -> Result<(), RiskConfigError> {
        for (factor, weight) in self.entries() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(RiskConfigError::InvalidWeight { factor, weight });
            }
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(RiskConfigError::WeightSum { sum });
        }
        Ok(())
    }
}

/// Lower bounds of each severity tier above `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityThresholds {
    pub critical: u8,
    pub high: u8,
    pub elevated: u8,
    pub moderate: u8,
}

impl SeverityThresholds {
    pub const fn standard() -> Self {
        Self {
            critical: 80,
            high: 60,
            elevated: 40,
            moderate: 20,
        }
    }

    fn validate(&self) -> Result<(), RiskConfigError> {
        let descending = self.critical > self.high
            && self.high > self.elevated
            && self.elevated > self.moderate;
        if !descending {
            return Err(RiskConfigError::ThresholdOrder {
                thresholds: [self.critical, self.high, self.elevated, self.moderate],
            });
        }
        if self.critical > 100 {
            return Err(RiskConfigError::ThresholdRange {
                value: self.critical,
            });
        }
        Ok(())
    }
}

/// Target length of stay in days, keyed by species and optionally age.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetLosTable {
    pub default_days: u32,
    #[serde(default)]
    pub entries: Vec<TargetLosEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetLosEntry {
    pub species: Species,
    #[serde(default)]
    pub age_category: Option<AgeCategory>,
    pub days: u32,
}

impl TargetLosTable {
    pub fn standard() -> Self {
        let entry = |species, age_category, days| TargetLosEntry {
            species,
            age_category,
            days,
        };
        Self {
            default_days: 30,
            entries: vec![
                entry(Species::Dog, None, 30),
                entry(Species::Dog, Some(AgeCategory::Baby), 14),
                entry(Species::Cat, None, 45),
                entry(Species::Cat, Some(AgeCategory::Baby), 21),
                entry(Species::Rabbit, None, 60),
                entry(Species::Other, None, 45),
            ],
        }
    }

    /// Exact species/age entry, then the species-wide entry, then the default.
    pub fn target_days(&self, species: Species, age: AgeCategory) -> u32 {
        let exact = self
            .entries
            .iter()
            .find(|entry| entry.species == species && entry.age_category == Some(age));
        let species_wide = || {
            self.entries
                .iter()
                .find(|entry| entry.species == species && entry.age_category.is_none())
        };

        exact
            .or_else(species_wide)
            .map(|entry| entry.days)
            .unwrap_or(self.default_days)
    }

    fn validate(&self) -> Result<(), RiskConfigError> {
        if self.default_days == 0 {
            return Err(RiskConfigError::TargetLos {
                detail: "default_days must be at least 1".to_string(),
            });
        }
        if let Some(entry) = self.entries.iter().find(|entry| entry.days == 0) {
            return Err(RiskConfigError::TargetLos {
                detail: format!(
                    "target for {:?}/{:?} must be at least 1 day",
                    entry.species, entry.age_category
                ),
            });
        }
        Ok(())
    }
}

/// Reasons a scoring config is refused at load.
#[derive(Debug, thiserror::Error)]
pub enum RiskConfigError {
    #[error("scoring config version must not be empty")]
    MissingVersion,
    #[error("weight for {factor} must be a non-negative number, got {weight}")]
    InvalidWeight { factor: &'static str, weight: f64 },
    #[error("factor weights must sum to 1.0, got {sum:.6}")]
    WeightSum { sum: f64 },
    #[error("severity thresholds must be strictly descending, got {thresholds:?}")]
    ThresholdOrder { thresholds: [u8; 4] },
    #[error("severity threshold {value} exceeds 100")]
    ThresholdRange { value: u8 },
    #[error("invalid target length of stay: {detail}")]
    TargetLos { detail: String },
    #[error("unable to read scoring config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unable to parse scoring config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Source of the scoring config; implementations validate before returning.
pub trait ConfigSource: Send + Sync {
    fn load_risk_scoring_config(&self) -> Result<RiskScoringConfig, RiskConfigError>;
}

/// Built-in standard configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardConfigSource;

impl ConfigSource for StandardConfigSource {
    fn load_risk_scoring_config(&self) -> Result<RiskScoringConfig, RiskConfigError> {
        let config = RiskScoringConfig::standard();
        config.validate()?;
        Ok(config)
    }
}

/// JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileConfigSource {
    path: PathBuf,
}

impl JsonFileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for JsonFileConfigSource {
    fn load_risk_scoring_config(&self) -> Result<RiskScoringConfig, RiskConfigError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|source| RiskConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        let config: RiskScoringConfig =
            serde_json::from_str(&raw).map_err(|source| RiskConfigError::Parse {
                path: self.path.clone(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }
}
