//! Risk levels, their presentation profiles, and assessment results.

use serde::{Deserialize, Serialize};

/// CKD risk classification produced by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Code 0
    Low,
    /// Code 1
    Moderate,
    /// Code 2
    High,
}

/// The classifier returned a code with no risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Unrecognized risk code {0} (expected 0, 1 or 2)")]
pub struct UnrecognizedRiskCode(pub i64);

/// Everything the presentation layer needs for one risk level.
#[derive(Debug, PartialEq, Eq)]
pub struct RiskProfile {
    pub level: RiskLevel,
    pub code: u8,
    pub label: &'static str,
    /// Display color (RGB)
    pub color: (u8, u8, u8),
    pub recommendations: [&'static str; 3],
}

/// Presentation table indexed by risk code.
pub static RISK_PROFILES: [RiskProfile; 3] = [
    RiskProfile {
        level: RiskLevel::Low,
        code: 0,
        label: "Low Risk",
        color: (16, 185, 129), // Emerald (#10B981)
        recommendations: [
            "Keep a balanced, low-sodium diet and stay well hydrated",
            "Recheck blood pressure and kidney function at routine annual visits",
            "Avoid unnecessary use of nephrotoxic drugs such as NSAIDs",
        ],
    },
    RiskProfile {
        level: RiskLevel::Moderate,
        code: 1,
        label: "Moderate Risk",
        color: (251, 191, 36), // Amber (#FBBF24)
        recommendations: [
            "Repeat renal panel (creatinine, eGFR, urine albumin) within 3 months",
            "Review current medications for nephrotoxic interactions",
            "Tighten blood pressure and glucose control with the care team",
        ],
    },
    RiskProfile {
        level: RiskLevel::High,
        code: 2,
        label: "High Risk",
        color: (244, 63, 94), // Rose (#F43F5E)
        recommendations: [
            "Refer to nephrology for prompt evaluation",
            "Stop or substitute nephrotoxic drugs where clinically possible",
            "Monitor renal function closely and manage blood pressure aggressively",
        ],
    },
];

impl RiskLevel {
    /// Map a raw classifier code to a level.
    ///
    /// # Errors
    /// Returns [`UnrecognizedRiskCode`] for anything other than 0, 1 or 2.
    pub fn from_code(code: i64) -> Result<Self, UnrecognizedRiskCode> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| RISK_PROFILES.get(idx))
            .map(|profile| profile.level)
            .ok_or(UnrecognizedRiskCode(code))
    }

    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// The presentation profile for this level.
    #[must_use]
    pub fn profile(self) -> &'static RiskProfile {
        &RISK_PROFILES[self as usize]
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        self.profile().label
    }
}

impl TryFrom<i64> for RiskLevel {
    type Error = UnrecognizedRiskCode;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of one prediction request. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    /// Random request identifier
    pub id: String,

    /// Risk classification
    pub risk_level: RiskLevel,

    /// Per-class probabilities (Low, Moderate, High), when the classifier
    /// exposes them
    pub probabilities: Option<[f64; 3]>,

    /// Timestamp of the assessment
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Assessment {
    #[must_use]
    pub fn new(risk_level: RiskLevel, probabilities: Option<[f64; 3]>) -> Self {
        Self {
            id: uuid_v4(),
            risk_level,
            probabilities,
            created_at: chrono::Utc::now(),
        }
    }

    /// Probability assigned to the predicted level, if known.
    #[must_use]
    pub fn confidence(&self) -> Option<f64> {
        self.probabilities
            .map(|p| p[self.risk_level as usize])
    }
}

/// Generate a random UUID v4 using a CSPRNG seeded from OS entropy.
fn uuid_v4() -> String {
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    let mut rng = ChaCha20Rng::from_entropy();
    let mut bytes: [u8; 16] = rng.gen();
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}
