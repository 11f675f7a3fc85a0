//! Assessment service: Normalize, classify, and map to a risk level.

use std::sync::Arc;

use crate::domain::{normalize, Assessment, RawPatientInput, RiskLevel};
use crate::ports::{ClassifierError, RiskClassifier};
use crate::NephroError;

/// Service for running one risk assessment per submitted form.
///
/// The classifier is loaded once at startup and shared read-only.
pub struct AssessmentService<C>
where
    C: RiskClassifier,
{
    classifier: Arc<C>,
}

impl<C> Clone for AssessmentService<C>
where
    C: RiskClassifier,
{
    fn clone(&self) -> Self {
        Self {
            classifier: Arc::clone(&self.classifier),
        }
    }
}

impl<C> AssessmentService<C>
where
    C: RiskClassifier,
{
    /// Create a new assessment service.
    pub fn new(classifier: Arc<C>) -> Self {
        Self { classifier }
    }

    #[must_use]
    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Assess one patient.
    ///
    /// # Errors
    /// Returns error if a categorical label is unknown, the classifier
    /// fails, or the classifier returns a code with no risk level.
    pub fn assess(&self, raw: &RawPatientInput) -> Result<Assessment, NephroError> {
        let record = normalize(raw)?;
        tracing::debug!("Input normalized ({} features)", record.to_vec().len());

        let code = self.classifier.predict(&record)?;
        let probabilities = match self.classifier.predict_proba(&record)? {
            Some(p) => Some(<[f64; 3]>::try_from(p.as_slice()).map_err(|_| {
                ClassifierError::Prediction(format!(
                    "Expected 3 class probabilities, got {}",
                    p.len()
                ))
            })?),
            None => None,
        };

        let risk_level = match RiskLevel::from_code(code) {
            Ok(level) => level,
            Err(e) => {
                tracing::error!("Classifier returned unrecognized risk code {code}");
                return Err(e.into());
            }
        };

        let assessment = Assessment::new(risk_level, probabilities);
        tracing::info!(
            "Assessment complete (risk_code={}, probabilities={})",
            risk_level.code(),
            assessment.probabilities.is_some()
        );
        Ok(assessment)
    }
}
