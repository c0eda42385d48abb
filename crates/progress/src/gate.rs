//! Assessment gates.
//!
//! A module that declares required assessment keys is only complete once
//! every one of them has been recorded as passed. Results are kept in the
//! same [`ProgressState`] as section completion.

use serde::Serialize;
use syllabus_core::{AssessmentKey, CourseStructure, ProgressState};
use tracing::debug;

/// Per-key breakdown of a module's gate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GateOutcome {
    /// Keys recorded as correct
    pub passed: Vec<AssessmentKey>,

    /// Keys recorded as incorrect
    pub failed: Vec<AssessmentKey>,

    /// Keys not yet attempted
    pub pending: Vec<AssessmentKey>,
}

impl GateOutcome {
    /// Whether every required key passed.
    pub fn is_satisfied(&self) -> bool {
        self.failed.is_empty() && self.pending.is_empty()
    }
}

/// Evaluates and records assessment results against the catalog.
#[derive(Debug, Clone, Copy)]
pub struct AssessmentGate<'a> {
    course: &'a CourseStructure,
}

impl<'a> AssessmentGate<'a> {
    /// Create a gate over a catalog.
    pub fn new(course: &'a CourseStructure) -> Self {
        Self { course }
    }

    /// Record a result for a required key.
    ///
    /// Returns whether the stored value changed. Unknown modules and keys the
    /// module does not require are ignored. A `false` after a `true` is
    /// recorded as is.
    pub fn record_result(
        &self,
        state: &mut ProgressState,
        module_id: &str,
        key: &str,
        correct: bool,
    ) -> bool {
        let Some(module) = self.course.module(module_id) else {
            debug!("Ignoring result for unknown module {}", module_id);
            return false;
        };
        if !module.requires_key(key) {
            debug!("Ignoring result for undeclared key {} in {}", key, module_id);
            return false;
        }

        let previous = state
            .quiz_results
            .entry(module.id.clone())
            .or_default()
            .insert(AssessmentKey::new(key), correct);
        previous != Some(correct)
    }

    /// Whether every required key of the module maps to `true`.
    ///
    /// Modules without required keys, and unknown modules, are trivially
    /// satisfied.
    pub fn is_satisfied(&self, state: &ProgressState, module_id: &str) -> bool {
        let Some(module) = self.course.module(module_id) else {
            return true;
        };
        let results = state.quiz_results.get(module_id);
        module.required_keys().all(|key| {
            results
                .and_then(|r| r.get(key.as_str()))
                .copied()
                .unwrap_or(false)
        })
    }

    /// Break the module's gate down by key, in declaration order.
    pub fn outcome(&self, state: &ProgressState, module_id: &str) -> Option<GateOutcome> {
        let module = self.course.module(module_id)?;
        let results = state.quiz_results.get(module_id);

        let mut outcome = GateOutcome::default();
        for key in module.required_keys() {
            match results.and_then(|r| r.get(key.as_str())) {
                Some(true) => outcome.passed.push(key.clone()),
                Some(false) => outcome.failed.push(key.clone()),
                None => outcome.pending.push(key.clone()),
            }
        }
        Some(outcome)
    }
}
