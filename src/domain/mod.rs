//! Domain layer: Core clinical types and logic.
//!
//! Pure Rust types with no I/O. Everything here is deterministic and
//! testable without a model artifact.

pub mod categorical;
pub mod normalize;
mod patient;
mod risk;

pub use categorical::{map_categorical, CategoryTable, UnknownCategoryError};
pub use normalize::normalize;
pub use patient::{PatientRecord, RawPatientInput, FEATURE_COUNT, FEATURE_NAMES};
pub use risk::{Assessment, RiskLevel, RiskProfile, UnrecognizedRiskCode, RISK_PROFILES};

/// Collection bounds for the form fields.
pub mod bounds {
    pub use super::patient::{
        AGE_RANGE, CREATININE_COLLECTED, DIASTOLIC_COLLECTED, SCORE_COLLECTED,
        SYSTOLIC_COLLECTED, UREA_COLLECTED,
    };
}
