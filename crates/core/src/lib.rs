//! Syllabus core data models.
//!
//! This crate defines the static course catalog and the learner progress
//! state that the progress engine tracks.

#![warn(missing_docs)]

// Identities
mod id;

// Static catalog
mod course;
mod provider;
pub mod builtin;

// Mutable learner state
mod progress;

pub use id::{AssessmentKey, ModuleId, SectionId};
pub use course::{
    AssessmentItem, AssessmentKind, CatalogError, CourseStructure, Module, Section,
};
pub use provider::{CourseStructureProvider, StaticCourse};
pub use builtin::builtin_course;
pub use progress::{
    CourseProgress, Hydration, ModuleProgress, ModuleStatus, Position, ProgressState,
};
