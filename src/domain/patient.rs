//! Patient data types for CKD risk prediction.

use serde::{Deserialize, Serialize};

use super::categorical::{ALBUMIN_LEVEL, MEDICAL_HISTORY, NEPHROTOXIC_DRUG};

/// Raw patient input as collected by the form.
///
/// Numeric fields carry collected-range values; categorical fields carry the
/// labels shown to the user. See [`crate::domain::normalize`] for the
/// conversion into a [`PatientRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPatientInput {
    /// Age in years (18-100)
    pub patient_age: u32,

    /// Systolic blood pressure in mmHg (collected 80-200)
    pub bp_systolic: f64,

    /// Diastolic blood pressure in mmHg (collected 50-150)
    pub bp_diastolic: f64,

    /// Blood urea (0.0-5.0)
    pub blood_urea: f64,

    /// Serum creatinine (collected 0.0-5.0)
    pub serum_creatinine: f64,

    /// One of the [`ALBUMIN_LEVEL`] labels
    pub albumin: String,

    /// One of the [`MEDICAL_HISTORY`] labels
    pub diabetes: String,

    /// One of the [`MEDICAL_HISTORY`] labels
    pub hypertension: String,

    /// One of the [`NEPHROTOXIC_DRUG`] labels
    pub nephrotoxic: String,

    /// Composite toxicity score (0.0-1.0)
    pub toxicity_score_composite: f64,

    /// Pharmacokinetic toxic interaction score (0.0-1.0)
    pub pk_toxic_interaction_score: f64,
}

impl Default for RawPatientInput {
    fn default() -> Self {
        Self {
            patient_age: 50,
            bp_systolic: 120.0,
            bp_diastolic: 80.0,
            blood_urea: 1.0,
            serum_creatinine: 1.0,
            albumin: "Normal".to_string(),
            diabetes: "No history".to_string(),
            hypertension: "No history".to_string(),
            nephrotoxic: "Not used".to_string(),
            toxicity_score_composite: 0.5,
            pk_toxic_interaction_score: 0.5,
        }
    }
}

/// Collection bounds enforced at the input boundary.
pub const AGE_RANGE: (u32, u32) = (18, 100);
pub const SYSTOLIC_COLLECTED: (f64, f64) = (80.0, 200.0);
pub const DIASTOLIC_COLLECTED: (f64, f64) = (50.0, 150.0);
pub const UREA_COLLECTED: (f64, f64) = (0.0, 5.0);
pub const CREATININE_COLLECTED: (f64, f64) = (0.0, 5.0);
pub const SCORE_COLLECTED: (f64, f64) = (0.0, 1.0);

impl RawPatientInput {
    /// Validate that numeric values are inside the collection domain.
    ///
    /// Categorical labels are not checked here; an unknown label surfaces
    /// as an error during normalization.
    ///
    /// # Errors
    /// Returns every violation found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !(AGE_RANGE.0..=AGE_RANGE.1).contains(&self.patient_age) {
            errors.push(format!(
                "Age {} out of range [{}, {}]",
                self.patient_age, AGE_RANGE.0, AGE_RANGE.1
            ));
        }

        let numeric = [
            ("Systolic BP", self.bp_systolic, SYSTOLIC_COLLECTED),
            ("Diastolic BP", self.bp_diastolic, DIASTOLIC_COLLECTED),
            ("Blood urea", self.blood_urea, UREA_COLLECTED),
            ("Serum creatinine", self.serum_creatinine, CREATININE_COLLECTED),
            ("Toxicity score", self.toxicity_score_composite, SCORE_COLLECTED),
            ("PK interaction score", self.pk_toxic_interaction_score, SCORE_COLLECTED),
        ];
        for (label, value, (min, max)) in numeric {
            if !value.is_finite() {
                errors.push(format!("{label} must be a finite number"));
            } else if !(min..=max).contains(&value) {
                errors.push(format!("{label} {value} out of range [{min}, {max}]"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Normalized feature record consumed by the classifier.
///
/// Field order matches [`FEATURE_NAMES`] and the trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub patient_age: u32,
    pub bp_systolic: f64,
    pub bp_diastolic: f64,
    pub blood_urea: f64,
    pub serum_creatinine: f64,
    pub albumin: u8,
    pub diabetes: u8,
    pub hypertension: u8,
    pub nephrotoxic_label: u8,
    pub toxicity_score_composite: f64,
    pub pk_toxic_interaction_score: f64,
}

/// Number of features the classifier consumes.
pub const FEATURE_COUNT: usize = 11;

/// Feature names in model order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "patient_age",
    "bp_systolic",
    "bp_diastolic",
    "blood_urea",
    "serum_creatinine",
    "albumin",
    "diabetes",
    "hypertension",
    "nephrotoxic_label",
    "toxicity_score_composite",
    "pk_toxic_interaction_score",
];

impl PatientRecord {
    /// Convert to a dense feature vector in [`FEATURE_NAMES`] order.
    #[must_use]
    pub fn to_vec(&self) -> [f64; FEATURE_COUNT] {
        [
            f64::from(self.patient_age),
            self.bp_systolic,
            self.bp_diastolic,
            self.blood_urea,
            self.serum_creatinine,
            f64::from(self.albumin),
            f64::from(self.diabetes),
            f64::from(self.hypertension),
            f64::from(self.nephrotoxic_label),
            self.toxicity_score_composite,
            self.pk_toxic_interaction_score,
        ]
    }

    /// Re-label the categorical codes, yielding input that normalizes back
    /// to this record.
    ///
    /// Codes outside a table fall back to an empty label, which fails
    /// normalization.
    #[must_use]
    pub fn to_raw_input(&self) -> RawPatientInput {
        let label = |table: &super::categorical::CategoryTable, code: u8| {
            table.label_for(code).unwrap_or_default().to_string()
        };

        RawPatientInput {
            patient_age: self.patient_age,
            bp_systolic: self.bp_systolic,
            bp_diastolic: self.bp_diastolic,
            blood_urea: self.blood_urea,
            serum_creatinine: self.serum_creatinine,
            albumin: label(&ALBUMIN_LEVEL, self.albumin),
            diabetes: label(&MEDICAL_HISTORY, self.diabetes),
            hypertension: label(&MEDICAL_HISTORY, self.hypertension),
            nephrotoxic: label(&NEPHROTOXIC_DRUG, self.nephrotoxic_label),
            toxicity_score_composite: self.toxicity_score_composite,
            pk_toxic_interaction_score: self.pk_toxic_interaction_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> PatientRecord {
        PatientRecord {
            patient_age: 50,
            bp_systolic: 180.0,
            bp_diastolic: 80.0,
            blood_urea: 1.0,
            serum_creatinine: 1.0,
            albumin: 1,
            diabetes: 0,
            hypertension: 1,
            nephrotoxic_label: 1,
            toxicity_score_composite: 0.5,
            pk_toxic_interaction_score: 0.5,
        }
    }

    #[test]
    fn test_record_to_vec_order() {
        let v = sample_record().to_vec();
        assert_eq!(v.len(), FEATURE_NAMES.len());
        assert_eq!(
            v,
            [50.0, 180.0, 80.0, 1.0, 1.0, 1.0, 0.0, 1.0, 1.0, 0.5, 0.5]
        );
    }

    #[test]
    fn test_to_raw_input_labels() {
        let raw = sample_record().to_raw_input();
        assert_eq!(raw.albumin, "Normal");
        assert_eq!(raw.diabetes, "No history");
        assert_eq!(raw.hypertension, "Diagnosed");
        assert_eq!(raw.nephrotoxic, "Used");
    }

    #[test]
    fn test_default_input_is_valid() {
        assert!(RawPatientInput::default().validate().is_ok());
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let invalid = RawPatientInput {
            patient_age: 10,
            bp_systolic: 250.0,
            serum_creatinine: f64::NAN,
            pk_toxic_interaction_score: 1.5,
            ..Default::default()
        };
        let errors = invalid.validate().unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors[0].starts_with("Age 10"));
        assert!(errors.iter().any(|e| e.contains("finite")));
    }

    #[test]
    fn test_validation_bounds_inclusive() {
        let edge = RawPatientInput {
            patient_age: 100,
            bp_systolic: 200.0,
            bp_diastolic: 50.0,
            blood_urea: 0.0,
            serum_creatinine: 5.0,
            toxicity_score_composite: 1.0,
            pk_toxic_interaction_score: 0.0,
            ..Default::default()
        };
        assert!(edge.validate().is_ok());
    }
}
