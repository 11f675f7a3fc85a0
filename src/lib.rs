//! # NephroCheck
//!
//! Chronic kidney disease risk screening from a pretrained classifier.
//!
//! This crate provides:
//! - A feature normalizer that turns form input into the model's feature vector
//! - A gradient-boosted tree classifier loaded from a signed XGBoost artifact
//! - Color-coded risk presentation in a terminal UI
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core clinical types (records, categorical tables, risk profiles)
//! - `ports`: Trait definitions for the classifier
//! - `adapters`: Concrete implementations (XGBoost JSON, log sanitization)
//! - `application`: The assessment use case
//! - `tui`: Terminal user interface

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod tui;

pub use domain::{Assessment, PatientRecord, RawPatientInput, RiskLevel};

/// Result type for NephroCheck operations
pub type Result<T> = std::result::Result<T, NephroError>;

/// Main error type for NephroCheck
#[derive(Debug, thiserror::Error)]
pub enum NephroError {
    #[error(transparent)]
    Category(#[from] domain::UnknownCategoryError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ports::ClassifierError),

    #[error(transparent)]
    RiskCode(#[from] domain::UnrecognizedRiskCode),

    #[error("Invalid patient data: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
