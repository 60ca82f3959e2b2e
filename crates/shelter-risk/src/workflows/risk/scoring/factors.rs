use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::super::domain::{
    AdoptionInterest, AgeCategory, AnimalSize, AnimalSnapshot, AssessmentResult,
    BehavioralAssessment, CapacitySnapshot, MedicalRecord, Species, SpecialNeedsCategory,
    SupportingContext,
};
use super::config::RiskScoringConfig;
use super::reasons::RiskReason;
use super::RiskFactorKind;

const MEDICAL_URGENT_WINDOW_DAYS: i64 = 3;
const ADOPTABILITY_BASELINE: f64 = 50.0;
const LOW_INTEREST_MIN_DAYS: u32 = 14;

const SENIOR_POINTS: f64 = 20.0;
const SPECIAL_NEEDS_POINTS: f64 = 15.0;
const LARGE_BREED_POINTS: f64 = 10.0;
const BLACK_ANIMAL_POINTS: f64 = 5.0;

const SPECIAL_NEEDS_KEYWORDS: [(SpecialNeedsCategory, &[&str]); 4] = [
    (
        SpecialNeedsCategory::Medication,
        &["medication", "medicine", "meds"],
    ),
    (SpecialNeedsCategory::Diet, &["diet", "food"]),
    (SpecialNeedsCategory::Vision, &["blind", "vision"]),
    (SpecialNeedsCategory::Hearing, &["deaf", "hearing"]),
];

/// Behavioral deterioration derived from consecutive assessment deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KennelStress {
    Mild,
    Moderate,
    Severe,
}

/// Side observations gathered while evaluating factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSignals {
    pub days_in_shelter: u32,
    pub target_los_days: u32,
    pub los_ratio: f64,
    pub los_percentile: f64,
    pub age_category: AgeCategory,
    pub is_senior: bool,
    pub has_special_needs: bool,
    pub special_needs_categories: Vec<SpecialNeedsCategory>,
    pub kennel_stress: Option<KennelStress>,
    pub needs_enrichment: bool,
    pub predicted_adoptability: f64,
}

/// One evaluator's output before weighting.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FactorEvaluation {
    /// Score on the evaluator's native scale (0-10 for medical and behavioral).
    pub raw_score: f64,
    /// Score on the 0-100 scale fed to the composite.
    pub score: f64,
    pub reasons: Vec<RiskReason>,
    pub explanation: String,
}

impl FactorEvaluation {
    fn percent(score: f64, reasons: Vec<RiskReason>, explanation: String) -> Self {
        Self {
            raw_score: score,
            score,
            reasons,
            explanation,
        }
    }

    fn tenths(raw_score: f64, reasons: Vec<RiskReason>, explanation: String) -> Self {
        Self {
            raw_score,
            score: raw_score * 10.0,
            reasons,
            explanation,
        }
    }
}

/// Runs every evaluator in factor order.
pub(crate) fn evaluate_factors(
    animal: &AnimalSnapshot,
    context: &SupportingContext,
    config: &RiskScoringConfig,
    today: NaiveDate,
) -> (Vec<(RiskFactorKind, FactorEvaluation)>, ScoreSignals) {
    let age_category = animal.age_bucket(today);
    let days_in_shelter = animal.days_in_shelter(today);
    let target_los_days = config.target_los.target_days(animal.species, age_category);

    let los = length_of_stay(days_in_shelter, target_los_days);
    let medical = medical(&context.medical_records, today);
    let behavioral = behavioral(&context.behavioral_assessments, los.ratio);
    let capacity = capacity(&context.capacity);
    let adoptability = adoptability(&context.adoption_interest, days_in_shelter);
    let special = special_categories(animal, age_category);

    let signals = ScoreSignals {
        days_in_shelter,
        target_los_days,
        los_ratio: los.ratio,
        los_percentile: los.percentile,
        age_category,
        is_senior: special.is_senior,
        has_special_needs: special.has_special_needs,
        special_needs_categories: special.categories,
        kennel_stress: behavioral.kennel_stress,
        needs_enrichment: behavioral.needs_enrichment,
        predicted_adoptability: adoptability.predicted,
    };

    let evaluations = vec![
        (RiskFactorKind::LengthOfStay, los.evaluation),
        (RiskFactorKind::Medical, medical),
        (RiskFactorKind::Behavioral, behavioral.evaluation),
        (RiskFactorKind::Capacity, capacity),
        (RiskFactorKind::Adoptability, adoptability.evaluation),
        (RiskFactorKind::SpecialCategories, special.evaluation),
    ];

    (evaluations, signals)
}

pub(crate) struct LosOutcome {
    pub evaluation: FactorEvaluation,
    pub ratio: f64,
    pub percentile: f64,
}

pub(crate) fn length_of_stay(days_in_shelter: u32, target_days: u32) -> LosOutcome {
    let ratio = f64::from(days_in_shelter) / f64::from(target_days.max(1));

    let (score, reasons) = if ratio >= 3.0 {
        (100.0, vec![RiskReason::LongLos])
    } else if ratio >= 2.0 {
        (80.0, vec![RiskReason::LongLos])
    } else if ratio >= 1.5 {
        (60.0, vec![RiskReason::LongLos])
    } else if ratio >= 1.0 {
        (40.0, Vec::new())
    } else {
        (ratio * 40.0, Vec::new())
    };

    let explanation = if ratio >= 1.0 {
        format!("{days_in_shelter} days in care is {ratio:.2}x the {target_days}-day target")
    } else {
        format!("{days_in_shelter} of {target_days} target days in care")
    };

    LosOutcome {
        evaluation: FactorEvaluation::percent(score, reasons, explanation),
        ratio,
        percentile: (ratio * 50.0).min(99.0),
    }
}

pub(crate) fn medical(records: &[MedicalRecord], today: NaiveDate) -> FactorEvaluation {
    let urgent_cutoff = today + Duration::days(MEDICAL_URGENT_WINDOW_DAYS);
    let mut raw_score: f64 = 0.0;
    let mut urgent = Vec::new();
    let mut critical = Vec::new();

    let flagged = records.iter().filter(|record| {
        record.follow_up_required && (record.affects_adoptability || !record.is_treatable)
    });

    for record in flagged {
        if record
            .follow_up_date
            .map(|due| due <= urgent_cutoff)
            .unwrap_or(false)
        {
            urgent.push(record.diagnosis.as_str());
        }

        if !record.is_treatable {
            raw_score = raw_score.max(8.0);
            critical.push(record.diagnosis.as_str());
        } else {
            raw_score = raw_score.max(6.0);
        }
    }

    let mut reasons = Vec::new();
    let mut notes = Vec::new();
    if !urgent.is_empty() {
        reasons.push(RiskReason::MedicalUrgent);
        notes.push(format!("follow-up due: {}", urgent.join(", ")));
    }
    if !critical.is_empty() {
        reasons.push(RiskReason::MedicalCritical);
        notes.push(format!("non-treatable: {}", critical.join(", ")));
    }

    let explanation = if raw_score > 0.0 && notes.is_empty() {
        "condition affecting adoptability requires follow-up".to_string()
    } else if notes.is_empty() {
        "no outstanding medical concerns".to_string()
    } else {
        notes.join("; ")
    };

    FactorEvaluation::tenths(raw_score, reasons, explanation)
}

pub(crate) struct BehavioralOutcome {
    pub evaluation: FactorEvaluation,
    pub kennel_stress: Option<KennelStress>,
    pub needs_enrichment: bool,
}

pub(crate) fn behavioral(assessments: &[BehavioralAssessment], los_ratio: f64) -> BehavioralOutcome {
    let mut ordered: Vec<&BehavioralAssessment> = assessments.iter().collect();
    ordered.sort_by_key(|assessment| assessment.assessed_on);

    let mut reasons = Vec::new();
    let mut notes = Vec::new();

    let raw_score = match ordered.last() {
        Some(latest) => {
            let raw = match latest.result {
                AssessmentResult::Concerning | AssessmentResult::NotAdoptable => {
                    reasons.push(RiskReason::BehavioralDecline);
                    8.0
                }
                AssessmentResult::RescueOnly | AssessmentResult::Restricted => 6.0,
                AssessmentResult::NeedsTraining => 4.0,
                AssessmentResult::Adoptable => 0.0,
            };
            notes.push(format!(
                "latest assessment {:?} on {}",
                latest.result, latest.assessed_on
            ));
            raw
        }
        None => 0.0,
    };

    let mut kennel_stress = None;
    if let [.., previous, latest] = ordered.as_slice() {
        let decline = previous.overall_score - latest.overall_score;
        kennel_stress = if decline >= 3.0 {
            Some(KennelStress::Severe)
        } else if decline >= 2.0 {
            Some(KennelStress::Moderate)
        } else if decline >= 1.0 {
            Some(KennelStress::Mild)
        } else {
            None
        };
        if matches!(
            kennel_stress,
            Some(KennelStress::Severe | KennelStress::Moderate)
        ) {
            reasons.push(RiskReason::KennelStress);
        }
        if decline > 0.0 {
            notes.push(format!("assessment score declined by {decline:.1}"));
        }
    }

    let mut needs_enrichment = false;
    if kennel_stress.is_none() && los_ratio > 2.0 {
        kennel_stress = Some(KennelStress::Moderate);
        needs_enrichment = true;
        notes.push("extended stay without stress data, enrichment recommended".to_string());
    }

    let explanation = if notes.is_empty() {
        "no behavioral assessments on file".to_string()
    } else {
        notes.join("; ")
    };

    BehavioralOutcome {
        evaluation: FactorEvaluation::tenths(raw_score, reasons, explanation),
        kennel_stress,
        needs_enrichment,
    }
}

pub(crate) fn capacity(snapshot: &CapacitySnapshot) -> FactorEvaluation {
    let organization = snapshot.organization.and_then(|counts| counts.occupancy_pct());
    let species = snapshot.species.and_then(|counts| counts.occupancy_pct());

    let Some(pct) = [organization, species].into_iter().flatten().reduce(f64::max) else {
        return FactorEvaluation::percent(0.0, Vec::new(), "no capacity data".to_string());
    };

    let (score, reasons) = if pct > 100.0 {
        (80.0, vec![RiskReason::CapacityPressure])
    } else if pct > 90.0 {
        (60.0, vec![RiskReason::CapacityPressure])
    } else if pct > 80.0 {
        (40.0, Vec::new())
    } else {
        (0.0, Vec::new())
    };

    FactorEvaluation::percent(score, reasons, format!("population at {pct:.0}% of capacity"))
}

pub(crate) struct AdoptabilityOutcome {
    pub evaluation: FactorEvaluation,
    pub predicted: f64,
}

pub(crate) fn adoptability(interest: &AdoptionInterest, days_in_shelter: u32) -> AdoptabilityOutcome {
    let mut predicted = ADOPTABILITY_BASELINE;
    let mut reasons = Vec::new();
    let mut explanation = "no profile views recorded, baseline adoptability".to_string();

    if interest.profile_views > 0 {
        let ratio = f64::from(interest.inquiry_count) / f64::from(interest.profile_views);
        if ratio < 0.01 && days_in_shelter > LOW_INTEREST_MIN_DAYS {
            predicted = 30.0;
            reasons.push(RiskReason::LowInterest);
        } else if ratio > 0.1 {
            predicted = 70.0;
        }
        explanation = format!(
            "{} inquiries from {} profile views",
            interest.inquiry_count, interest.profile_views
        );
    }

    AdoptabilityOutcome {
        evaluation: FactorEvaluation::percent(100.0 - predicted, reasons, explanation),
        predicted,
    }
}

pub(crate) struct SpecialCategoryOutcome {
    pub evaluation: FactorEvaluation,
    pub is_senior: bool,
    pub has_special_needs: bool,
    pub categories: Vec<SpecialNeedsCategory>,
}

pub(crate) fn special_categories(
    animal: &AnimalSnapshot,
    age_category: AgeCategory,
) -> SpecialCategoryOutcome {
    let mut score = 0.0;
    let mut reasons = Vec::new();

    let is_senior = age_category.is_senior();
    if is_senior {
        score += SENIOR_POINTS;
        reasons.push(RiskReason::Senior);
    }

    let special_text = animal
        .special_needs
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty());
    let has_conditions = animal
        .medical_conditions
        .iter()
        .any(|condition| !condition.trim().is_empty());
    let has_special_needs =
        special_text.is_some() || has_conditions || !animal.special_needs_categories.is_empty();

    let categories = if animal.special_needs_categories.is_empty() {
        special_text.map(keyword_categories).unwrap_or_default()
    } else {
        let mut structured = Vec::new();
        for category in &animal.special_needs_categories {
            if !structured.contains(category) {
                structured.push(*category);
            }
        }
        structured
    };

    if has_special_needs {
        score += SPECIAL_NEEDS_POINTS;
        reasons.push(RiskReason::SpecialNeeds);
    }

    if animal.species == Species::Dog
        && matches!(animal.size, Some(AnimalSize::Large | AnimalSize::ExtraLarge))
    {
        score += LARGE_BREED_POINTS;
        reasons.push(RiskReason::LargeBreed);
    }

    if animal
        .primary_color
        .as_deref()
        .map(|color| color.trim().eq_ignore_ascii_case("black"))
        .unwrap_or(false)
    {
        score += BLACK_ANIMAL_POINTS;
        reasons.push(RiskReason::BlackAnimal);
    }

    let explanation = if reasons.is_empty() {
        "no special categories".to_string()
    } else {
        reasons
            .iter()
            .map(|reason| reason.label())
            .collect::<Vec<_>>()
            .join(", ")
    };

    SpecialCategoryOutcome {
        evaluation: FactorEvaluation::percent(f64::min(score, 100.0), reasons, explanation),
        is_senior,
        has_special_needs,
        categories,
    }
}

fn keyword_categories(text: &str) -> Vec<SpecialNeedsCategory> {
    let lowered = text.to_lowercase();
    SPECIAL_NEEDS_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|keyword| lowered.contains(keyword)))
        .map(|(category, _)| *category)
        .collect()
}
