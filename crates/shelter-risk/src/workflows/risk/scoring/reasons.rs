use serde::{Deserialize, Serialize};

/// Closed set of tags explaining why an animal carries risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskReason {
    LongLos,
    MedicalUrgent,
    MedicalCritical,
    BehavioralDecline,
    KennelStress,
    CapacityPressure,
    LowInterest,
    Senior,
    SpecialNeeds,
    LargeBreed,
    BlackAnimal,
}

impl RiskReason {
    pub const fn label(self) -> &'static str {
        match self {
            Self::LongLos => "long length of stay",
            Self::MedicalUrgent => "medical follow-up due",
            Self::MedicalCritical => "non-treatable medical condition",
            Self::BehavioralDecline => "concerning behavioral assessment",
            Self::KennelStress => "kennel stress",
            Self::CapacityPressure => "shelter over capacity",
            Self::LowInterest => "low adoption interest",
            Self::Senior => "senior animal",
            Self::SpecialNeeds => "special needs",
            Self::LargeBreed => "large breed dog",
            Self::BlackAnimal => "black coat",
        }
    }
}

/// Insertion-ordered set of reasons; duplicates are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskReasons(Vec<RiskReason>);

impl RiskReasons {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the reason was already present.
    pub fn insert(&mut self, reason: RiskReason) -> bool {
        if self.0.contains(&reason) {
            return false;
        }
        self.0.push(reason);
        true
    }

    pub fn extend(&mut self, reasons: impl IntoIterator<Item = RiskReason>) {
        for reason in reasons {
            self.insert(reason);
        }
    }

    pub fn contains(&self, reason: RiskReason) -> bool {
        self.0.contains(&reason)
    }

    pub fn iter(&self) -> impl Iterator<Item = RiskReason> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[RiskReason] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<RiskReason> for RiskReasons {
    fn from_iter<I: IntoIterator<Item = RiskReason>>(iter: I) -> Self {
        let mut reasons = Self::new();
        reasons.extend(iter);
        reasons
    }
}
