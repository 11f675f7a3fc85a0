//! Adapters layer: Concrete implementations of ports.
//!
//! - `xgboost`: gradient-boosted tree classifier from XGBoost JSON
//! - `sanitize`: identifier and key redaction for logs

pub mod sanitize;
pub mod xgboost;

pub use xgboost::{GradientBoostedClassifier, ModelTrust};
