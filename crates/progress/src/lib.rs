//! Progress Tracking
//!
//! Section completion, assessment gates, and the facade UI code uses.

#![warn(missing_docs)]

pub mod gate;
pub mod manager;
pub mod tracker;
pub mod facade;

pub use gate::{AssessmentGate, GateOutcome};
pub use manager::ProgressManager;
pub use tracker::ProgressSummary;
pub use facade::ProgressFacade;
