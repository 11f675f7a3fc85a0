//! Classifier port: Trait for the pretrained CKD risk model.
//!
//! Abstracts the model artifact (and whatever library produced it) from
//! the application logic.

use crate::domain::PatientRecord;

/// Errors raised while loading or running a classifier.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Model load failed: {0}")]
    ModelLoad(String),

    #[error("Invalid model format: {0}")]
    Format(String),

    #[error("Model signature verification failed: {0}")]
    Signature(String),

    #[error("Feature mismatch: expected {expected}, got {actual}")]
    FeatureMismatch { expected: String, actual: String },

    #[error("Prediction failed: {0}")]
    Prediction(String),
}

/// Trait for risk classifiers.
///
/// Implementations are loaded once and shared read-only for the process
/// lifetime.
pub trait RiskClassifier: Send + Sync {
    /// Predict the raw risk code for a normalized record.
    ///
    /// The code is not validated here; callers map it with
    /// [`crate::domain::RiskLevel::from_code`].
    ///
    /// # Errors
    /// Returns `ClassifierError::Prediction` if the model cannot score the
    /// record.
    fn predict(&self, record: &PatientRecord) -> Result<i64, ClassifierError>;

    /// Per-class probabilities, if the model exposes them.
    ///
    /// # Errors
    /// Returns `ClassifierError::Prediction` if the model cannot score the
    /// record.
    fn predict_proba(&self, _record: &PatientRecord) -> Result<Option<Vec<f64>>, ClassifierError> {
        Ok(None)
    }

    /// Feature names in the order the model consumes them.
    fn feature_names(&self) -> &[String];
}
