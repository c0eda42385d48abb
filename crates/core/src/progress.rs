//! Learner progress model - the one mutable, persisted entity.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::course::CourseStructure;
use crate::id::{AssessmentKey, ModuleId, SectionId};

/// Where the learner currently is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Current module
    pub module_id: ModuleId,

    /// Current section within the module
    pub section_id: SectionId,
}

impl Position {
    /// Create a position.
    pub fn new(module_id: impl Into<ModuleId>, section_id: impl Into<SectionId>) -> Self {
        Self {
            module_id: module_id.into(),
            section_id: section_id.into(),
        }
    }
}

/// Completed sections, current position and assessment results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    /// Completed section ids per module
    pub completed: BTreeMap<ModuleId, BTreeSet<SectionId>>,

    /// Current position, if any
    pub current: Option<Position>,

    /// Recorded assessment results per module
    pub quiz_results: BTreeMap<ModuleId, BTreeMap<AssessmentKey, bool>>,
}

impl ProgressState {
    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.completed.values().all(BTreeSet::is_empty)
            && self.current.is_none()
            && self.quiz_results.values().all(BTreeMap::is_empty)
    }

    /// Number of completed sections recorded for a module.
    pub fn completed_count(&self, module_id: &str) -> usize {
        self.completed.get(module_id).map_or(0, BTreeSet::len)
    }

    /// Drop everything that does not reference the catalog.
    ///
    /// Returns the number of entries removed. Afterwards every completed
    /// section exists in its module, the position is valid or unset, and quiz
    /// results exist only for declared keys of gated modules.
    pub fn retain_known(&mut self, course: &CourseStructure) -> usize {
        let mut dropped = 0;

        self.completed.retain(|module_id, sections| {
            let Some(module) = course.module(module_id.as_str()) else {
                dropped += sections.len();
                return false;
            };
            let before = sections.len();
            sections.retain(|s| module.has_section(s.as_str()));
            dropped += before - sections.len();
            !sections.is_empty()
        });

        if let Some(pos) = &self.current {
            if !course.contains(pos.module_id.as_str(), pos.section_id.as_str()) {
                self.current = None;
                dropped += 1;
            }
        }

        self.quiz_results.retain(|module_id, results| {
            let Some(module) = course.module(module_id.as_str()) else {
                dropped += results.len();
                return false;
            };
            let before = results.len();
            results.retain(|key, _| module.requires_key(key.as_str()));
            dropped += before - results.len();
            !results.is_empty()
        });

        dropped
    }
}

/// Learner-facing status of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleStatus {
    /// No section completed
    NotStarted,
    /// Some but not all sections completed
    InProgress,
    /// All sections completed, assessment not yet passed
    GatePending,
    /// All sections completed and assessment passed
    Completed,
}

impl ModuleStatus {
    /// Derive the status from section counts and the gate decision.
    pub fn derive(completed: usize, total: usize, gate_satisfied: bool) -> Self {
        if completed == 0 && total > 0 {
            Self::NotStarted
        } else if completed < total {
            Self::InProgress
        } else if gate_satisfied {
            Self::Completed
        } else {
            Self::GatePending
        }
    }

    /// True for both `InProgress` and `GatePending`.
    pub fn is_in_progress(self) -> bool {
        matches!(self, Self::InProgress | Self::GatePending)
    }
}

impl std::fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "not started",
            Self::InProgress => "in progress",
            Self::GatePending => "assessment pending",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Progress of one module, computed on demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleProgress {
    /// Module
    pub module_id: ModuleId,

    /// Completed sections
    pub completed_sections: usize,

    /// Total sections
    pub total_sections: usize,

    /// Whether the assessment gate is satisfied
    pub assessment_satisfied: bool,

    /// Derived status
    pub status: ModuleStatus,
}

impl ModuleProgress {
    /// Completion ratio in `0.0..=1.0`.
    pub fn ratio(&self) -> f64 {
        ratio(self.completed_sections, self.total_sections)
    }

    /// Completion percentage rounded to the nearest integer.
    pub fn percent(&self) -> u8 {
        percent(self.completed_sections, self.total_sections)
    }
}

/// Progress of the whole course, computed on demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseProgress {
    /// Completed sections across all modules
    pub completed_sections: usize,

    /// Total sections across all modules
    pub total_sections: usize,

    /// Modules whose status is `Completed`
    pub completed_modules: usize,

    /// Number of modules
    pub total_modules: usize,
}

impl CourseProgress {
    /// Completion percentage rounded to the nearest integer.
    pub fn percent(&self) -> u8 {
        percent(self.completed_sections, self.total_sections)
    }
}

fn ratio(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    done as f64 / total as f64
}

fn percent(done: usize, total: usize) -> u8 {
    // Half-up rounding: 1/8 is 12.5% and shows as 13.
    (ratio(done, total) * 100.0).round().clamp(0.0, 100.0) as u8
}

/// A value that is only available once stored progress has been read.
///
/// `Unresolved` is distinct from "resolved with defaults" so consumers can
/// render a placeholder instead of a misleading zero.
#[derive(Debug, Clone, PartialEq)]
pub enum Hydration<T> {
    /// Stored progress has not been read yet
    Unresolved,
    /// Stored progress has been read
    Resolved(T),
}

impl<T> Hydration<T> {
    /// Whether the value is available.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// The value, if resolved.
    pub fn resolved(self) -> Option<T> {
        match self {
            Self::Resolved(v) => Some(v),
            Self::Unresolved => None,
        }
    }

    /// Map the resolved value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Hydration<U> {
        match self {
            Self::Resolved(v) => Hydration::Resolved(f(v)),
            Self::Unresolved => Hydration::Unresolved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::{AssessmentKind, Module};

    fn course() -> CourseStructure {
        CourseStructure::new(vec![Module::new("m1", "M1")
            .section("a", "A")
            .section("b", "B")
            .requires("q", AssessmentKind::MultipleChoice)])
        .unwrap()
    }

    #[test]
    fn test_percent_sequence_for_eight_sections() {
        let seq: Vec<u8> = (1..=8).map(|k| percent(k, 8)).collect();
        assert_eq!(seq, vec![13, 25, 38, 50, 63, 75, 88, 100]);
        assert_eq!(percent(0, 0), 0);
    }

    #[test]
    fn test_module_ratio() {
        let progress = ModuleProgress {
            module_id: ModuleId::new("m1"),
            completed_sections: 3,
            total_sections: 8,
            assessment_satisfied: true,
            status: ModuleStatus::derive(3, 8, true),
        };
        assert_eq!(progress.ratio(), 0.375);
        assert_eq!(progress.percent(), 38);
        assert_eq!(progress.status, ModuleStatus::InProgress);
    }

    #[test]
    fn test_status_derivation() {
        assert_eq!(ModuleStatus::derive(0, 4, true), ModuleStatus::NotStarted);
        assert_eq!(ModuleStatus::derive(2, 4, true), ModuleStatus::InProgress);
        assert_eq!(ModuleStatus::derive(4, 4, false), ModuleStatus::GatePending);
        assert_eq!(ModuleStatus::derive(4, 4, true), ModuleStatus::Completed);
        assert!(ModuleStatus::GatePending.is_in_progress());
        assert!(!ModuleStatus::Completed.is_in_progress());
    }

    #[test]
    fn test_retain_known_drops_dangling_entries() {
        let mut state = ProgressState::default();
        state.completed.insert(
            ModuleId::new("m1"),
            ["a", "gone"].into_iter().map(SectionId::from).collect(),
        );
        state
            .completed
            .insert(ModuleId::new("removed"), [SectionId::from("x")].into());
        state.current = Some(Position::new("m1", "gone"));
        state.quiz_results.insert(
            ModuleId::new("m1"),
            [(AssessmentKey::from("q"), true), (AssessmentKey::from("old"), true)].into(),
        );

        let dropped = state.retain_known(&course());

        assert_eq!(dropped, 4);
        assert_eq!(state.completed_count("m1"), 1);
        assert!(!state.completed.contains_key("removed"));
        assert!(state.current.is_none());
        assert_eq!(state.quiz_results["m1"].len(), 1);
    }

    #[test]
    fn test_hydration() {
        let h: Hydration<u8> = Hydration::Unresolved;
        assert!(!h.is_resolved());
        assert_eq!(Hydration::Resolved(2).map(|v| v * 2).resolved(), Some(4));
    }
}
