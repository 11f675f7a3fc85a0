//! Application layer: Use cases and services.
//!
//! Orchestrates domain logic with the classifier port.

mod assessment;

pub use assessment::AssessmentService;
