use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier wrapper for animals tracked by a shelter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnimalId(pub String);

impl fmt::Display for AnimalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for the owning shelter or rescue organization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganizationId(pub String);

impl fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    Dog,
    Cat,
    Rabbit,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeCategory {
    Baby,
    Young,
    Adult,
    Senior,
    Geriatric,
}

impl AgeCategory {
    /// Buckets an age in whole years.
    pub fn from_years(years: i32) -> Self {
        match years {
            i32::MIN..=0 => Self::Baby,
            1..=2 => Self::Young,
            3..=7 => Self::Adult,
            8..=11 => Self::Senior,
            _ => Self::Geriatric,
        }
    }

    pub const fn is_senior(self) -> bool {
        matches!(self, Self::Senior | Self::Geriatric)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimalSize {
    Small,
    Medium,
    Large,
    ExtraLarge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimalStatus {
    InShelter,
    Foster,
    Medical,
    Hold,
    Available,
    Pending,
    Adopted,
    Transferred,
    ReturnedToOwner,
    Deceased,
}

impl AnimalStatus {
    /// Statuses that keep an animal in the scored population.
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            Self::InShelter
                | Self::Foster
                | Self::Medical
                | Self::Hold
                | Self::Available
                | Self::Pending
        )
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::InShelter => "in_shelter",
            Self::Foster => "foster",
            Self::Medical => "medical",
            Self::Hold => "hold",
            Self::Available => "available",
            Self::Pending => "pending",
            Self::Adopted => "adopted",
            Self::Transferred => "transferred",
            Self::ReturnedToOwner => "returned_to_owner",
            Self::Deceased => "deceased",
        }
    }
}

/// Structured accommodation tags for animals with special needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpecialNeedsCategory {
    Medication,
    Diet,
    Vision,
    Hearing,
    Mobility,
    Other,
}

/// Read-only view of an animal record as supplied by the record provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalSnapshot {
    pub id: AnimalId,
    pub organization_id: OrganizationId,
    #[serde(default)]
    pub name: String,
    pub species: Species,
    #[serde(default)]
    pub age_category: Option<AgeCategory>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    pub intake_date: NaiveDate,
    #[serde(default)]
    pub size: Option<AnimalSize>,
    #[serde(default)]
    pub primary_color: Option<String>,
    #[serde(default)]
    pub special_needs: Option<String>,
    #[serde(default)]
    pub special_needs_categories: Vec<SpecialNeedsCategory>,
    #[serde(default)]
    pub medical_conditions: Vec<String>,
    pub status: AnimalStatus,
}

impl AnimalSnapshot {
    /// Age bucket used for target LOS lookups and the senior flag.
    ///
    /// An explicit category wins over a birth date; animals with neither are
    /// treated as adults.
    pub fn age_bucket(&self, on: NaiveDate) -> AgeCategory {
        if let Some(category) = self.age_category {
            return category;
        }

        match self.birth_date {
            Some(born) => AgeCategory::from_years(whole_years_between(born, on)),
            None => AgeCategory::Adult,
        }
    }

    /// Whole days since intake, clamped at zero for intake dates in the future.
    pub fn days_in_shelter(&self, on: NaiveDate) -> u32 {
        let days = (on - self.intake_date).num_days().max(0);
        u32::try_from(days).unwrap_or(u32::MAX)
    }
}

fn whole_years_between(start: NaiveDate, end: NaiveDate) -> i32 {
    let mut years = end.year() - start.year();
    if (end.month(), end.day()) < (start.month(), start.day()) {
        years -= 1;
    }
    years
}

/// Veterinary record relevant to adoptability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub recorded_on: NaiveDate,
    pub diagnosis: String,
    #[serde(default)]
    pub follow_up_required: bool,
    #[serde(default)]
    pub follow_up_date: Option<NaiveDate>,
    #[serde(default)]
    pub affects_adoptability: bool,
    #[serde(default = "default_treatable")]
    pub is_treatable: bool,
}

fn default_treatable() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssessmentResult {
    Adoptable,
    NeedsTraining,
    Restricted,
    RescueOnly,
    Concerning,
    NotAdoptable,
}

/// Behavioral evaluation captured by staff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehavioralAssessment {
    pub assessed_on: NaiveDate,
    pub result: AssessmentResult,
    pub overall_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PopulationCounts {
    pub current: u32,
    pub capacity: u32,
}

impl PopulationCounts {
    /// Occupancy as a percentage, `None` when no capacity is configured.
    pub fn occupancy_pct(&self) -> Option<f64> {
        (self.capacity > 0).then(|| f64::from(self.current) * 100.0 / f64::from(self.capacity))
    }
}

/// Organization-wide and species-specific population figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CapacitySnapshot {
    #[serde(default)]
    pub organization: Option<PopulationCounts>,
    #[serde(default)]
    pub species: Option<PopulationCounts>,
}

/// Adoption-interest counters; treated as an opaque external signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdoptionInterest {
    pub profile_views: u32,
    pub inquiry_count: u32,
}

/// Everything besides the snapshot that one scoring pass reads.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SupportingContext {
    #[serde(default)]
    pub medical_records: Vec<MedicalRecord>,
    #[serde(default)]
    pub behavioral_assessments: Vec<BehavioralAssessment>,
    #[serde(default)]
    pub capacity: CapacitySnapshot,
    #[serde(default)]
    pub adoption_interest: AdoptionInterest,
}
