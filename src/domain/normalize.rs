//! Feature normalization: label mapping and range clipping.
//!
//! Mirrors the preprocessing the classifier was trained with. Pure and
//! stateless; normalizing an already-normalized record is a no-op.

use super::categorical::{
    map_categorical, UnknownCategoryError, ALBUMIN_LEVEL, MEDICAL_HISTORY, NEPHROTOXIC_DRUG,
};
use super::patient::{PatientRecord, RawPatientInput};

/// Systolic range seen during training.
pub const SYSTOLIC_TRAINED: (f64, f64) = (80.0, 180.0);

/// Diastolic range seen during training.
pub const DIASTOLIC_TRAINED: (f64, f64) = (50.0, 120.0);

/// Lower bound for serum creatinine. There is no upper clip.
pub const CREATININE_FLOOR: f64 = 0.0;

/// Clamp `value` into `[min, max]`.
#[must_use]
pub fn clip(value: f64, min: f64, max: f64) -> f64 {
    min.max(value.min(max))
}

/// Clamp `value` from below only.
#[must_use]
pub fn clip_lower(value: f64, min: f64) -> f64 {
    min.max(value)
}

impl PatientRecord {
    /// Apply the training-range clips: systolic, then diastolic, then the
    /// creatinine floor. Every other field is left untouched.
    #[must_use]
    pub fn clamp_to_training_ranges(mut self) -> Self {
        self.bp_systolic = clip(self.bp_systolic, SYSTOLIC_TRAINED.0, SYSTOLIC_TRAINED.1);
        self.bp_diastolic = clip(self.bp_diastolic, DIASTOLIC_TRAINED.0, DIASTOLIC_TRAINED.1);
        self.serum_creatinine = clip_lower(self.serum_creatinine, CREATININE_FLOOR);
        self
    }
}

/// Build the classifier-ready record from raw form input.
///
/// # Errors
/// Returns [`UnknownCategoryError`] if any categorical label is outside its
/// fixed table.
pub fn normalize(raw: &RawPatientInput) -> Result<PatientRecord, UnknownCategoryError> {
    let record = PatientRecord {
        patient_age: raw.patient_age,
        bp_systolic: raw.bp_systolic,
        bp_diastolic: raw.bp_diastolic,
        blood_urea: raw.blood_urea,
        serum_creatinine: raw.serum_creatinine,
        albumin: map_categorical(&raw.albumin, &ALBUMIN_LEVEL)?,
        diabetes: map_categorical(&raw.diabetes, &MEDICAL_HISTORY)?,
        hypertension: map_categorical(&raw.hypertension, &MEDICAL_HISTORY)?,
        nephrotoxic_label: map_categorical(&raw.nephrotoxic, &NEPHROTOXIC_DRUG)?,
        toxicity_score_composite: raw.toxicity_score_composite,
        pk_toxic_interaction_score: raw.pk_toxic_interaction_score,
    };

    Ok(record.clamp_to_training_ranges())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn scenario_input() -> RawPatientInput {
        RawPatientInput {
            patient_age: 50,
            bp_systolic: 190.0,
            bp_diastolic: 80.0,
            blood_urea: 1.0,
            serum_creatinine: 1.0,
            albumin: "Normal".into(),
            diabetes: "No history".into(),
            hypertension: "Diagnosed".into(),
            nephrotoxic: "Used".into(),
            toxicity_score_composite: 0.5,
            pk_toxic_interaction_score: 0.5,
        }
    }

    #[test]
    fn test_clip_boundaries() {
        assert_eq!(clip(80.0, 80.0, 180.0), 80.0);
        assert_eq!(clip(200.0, 80.0, 180.0), 180.0);
        assert_eq!(clip(150.0, 50.0, 120.0), 120.0);
        assert_eq!(clip(50.0, 50.0, 120.0), 50.0);
        assert_eq!(clip(40.0, 50.0, 120.0), 50.0);
        assert_eq!(clip_lower(-0.3, 0.0), 0.0);
        assert_eq!(clip_lower(7.5, 0.0), 7.5);
    }

    #[test]
    fn test_end_to_end_scenario() {
        let record = normalize(&scenario_input()).expect("valid labels");
        assert_eq!(
            record,
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
        );
    }

    #[test]
    fn test_negative_creatinine_floors_to_zero() {
        let raw = RawPatientInput {
            serum_creatinine: -1.2,
            ..scenario_input()
        };
        assert_eq!(normalize(&raw).unwrap().serum_creatinine, 0.0);
    }

    #[test]
    fn test_creatinine_has_no_upper_clip() {
        let raw = RawPatientInput {
            serum_creatinine: 12.0,
            ..scenario_input()
        };
        assert_eq!(normalize(&raw).unwrap().serum_creatinine, 12.0);
    }

    #[test]
    fn test_unknown_label_is_fatal() {
        let raw = RawPatientInput {
            albumin: "Moderate".into(),
            ..scenario_input()
        };
        let err = normalize(&raw).unwrap_err();
        assert_eq!(err.table, ALBUMIN_LEVEL.name);
        assert_eq!(err.label, "Moderate");
    }

    #[test]
    fn test_other_fields_pass_through() {
        let raw = RawPatientInput {
            blood_urea: 4.9,
            toxicity_score_composite: 0.0,
            pk_toxic_interaction_score: 1.0,
            ..scenario_input()
        };
        let record = normalize(&raw).unwrap();
        assert_eq!(record.blood_urea, 4.9);
        assert_eq!(record.toxicity_score_composite, 0.0);
        assert_eq!(record.pk_toxic_interaction_score, 1.0);
    }

    fn arb_input() -> impl Strategy<Value = RawPatientInput> {
        (
            18u32..=100,
            80.0f64..=200.0,
            50.0f64..=150.0,
            0.0f64..=5.0,
            -1.0f64..=5.0,
            0usize..3,
            0usize..2,
            0usize..2,
            0usize..2,
            0.0f64..=1.0,
            0.0f64..=1.0,
        )
            .prop_map(
                |(age, sys, dia, urea, creat, alb, dm, htn, neph, tox, pk)| RawPatientInput {
                    patient_age: age,
                    bp_systolic: sys,
                    bp_diastolic: dia,
                    blood_urea: urea,
                    serum_creatinine: creat,
                    albumin: ALBUMIN_LEVEL.entries[alb].0.to_string(),
                    diabetes: MEDICAL_HISTORY.entries[dm].0.to_string(),
                    hypertension: MEDICAL_HISTORY.entries[htn].0.to_string(),
                    nephrotoxic: NEPHROTOXIC_DRUG.entries[neph].0.to_string(),
                    toxicity_score_composite: tox,
                    pk_toxic_interaction_score: pk,
                },
            )
    }

    proptest! {
        #[test]
        fn prop_ranges_hold(raw in arb_input()) {
            let record = normalize(&raw).unwrap();
            prop_assert!((80.0..=180.0).contains(&record.bp_systolic));
            prop_assert!((50.0..=120.0).contains(&record.bp_diastolic));
            prop_assert!(record.serum_creatinine >= 0.0);
            if raw.serum_creatinine >= 0.0 {
                prop_assert_eq!(record.serum_creatinine, raw.serum_creatinine);
            }
            if raw.bp_systolic <= 180.0 {
                prop_assert_eq!(record.bp_systolic, raw.bp_systolic);
            }
            if raw.bp_diastolic <= 120.0 {
                prop_assert_eq!(record.bp_diastolic, raw.bp_diastolic);
            }
        }

        #[test]
        fn prop_normalize_is_idempotent(raw in arb_input()) {
            let once = normalize(&raw).unwrap();
            let twice = normalize(&once.to_raw_input()).unwrap();
            prop_assert_eq!(&twice, &once);
            prop_assert_eq!(once.clone().clamp_to_training_ranges(), once);
        }
    }
}
