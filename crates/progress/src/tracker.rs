//! Derived progress views.
//!
//! Nothing here is stored: every view is recomputed from the catalog and the
//! current [`ProgressState`].

use serde::Serialize;
use syllabus_core::{
    CourseProgress, CourseStructure, Module, ModuleProgress, ModuleStatus, Position,
    ProgressState, SectionId,
};

use crate::gate::AssessmentGate;

/// Everything a dashboard needs in one read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSummary {
    /// Progress per module, in course order
    pub modules: Vec<ModuleProgress>,

    /// Whole-course progress
    pub course: CourseProgress,

    /// Current position
    pub current: Option<Position>,
}

/// Completed section ids of a module, in declared section order.
///
/// Ids no longer in the catalog are skipped.
pub fn completed_sections(module: &Module, state: &ProgressState) -> Vec<SectionId> {
    let Some(done) = state.completed.get(module.id.as_str()) else {
        return Vec::new();
    };
    module
        .sections
        .iter()
        .filter(|s| done.contains(s.id.as_str()))
        .map(|s| s.id.clone())
        .collect()
}

/// Progress of one module.
pub fn module_progress(
    course: &CourseStructure,
    module: &Module,
    state: &ProgressState,
) -> ModuleProgress {
    let completed_sections = completed_sections(module, state).len();
    let total_sections = module.total_sections();
    let assessment_satisfied = AssessmentGate::new(course).is_satisfied(state, module.id.as_str());

    ModuleProgress {
        module_id: module.id.clone(),
        completed_sections,
        total_sections,
        assessment_satisfied,
        status: ModuleStatus::derive(completed_sections, total_sections, assessment_satisfied),
    }
}

/// Progress of the whole course.
pub fn course_progress(course: &CourseStructure, state: &ProgressState) -> CourseProgress {
    summarize(course, state).course
}

/// Per-module and whole-course progress.
pub fn summarize(course: &CourseStructure, state: &ProgressState) -> ProgressSummary {
    let modules: Vec<ModuleProgress> = course
        .modules()
        .iter()
        .map(|m| module_progress(course, m, state))
        .collect();

    let course_progress = CourseProgress {
        completed_sections: modules.iter().map(|m| m.completed_sections).sum(),
        total_sections: course.total_sections(),
        completed_modules: modules
            .iter()
            .filter(|m| m.status == ModuleStatus::Completed)
            .count(),
        total_modules: modules.len(),
    };

    ProgressSummary {
        modules,
        course: course_progress,
        current: state.current.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syllabus_core::{AssessmentKind, ModuleId};

    fn course() -> CourseStructure {
        CourseStructure::new(vec![
            Module::new("m1", "M1")
                .section("a", "A")
                .section("b", "B")
                .section("c", "C"),
            Module::new("m2", "M2")
                .section("x", "X")
                .requires("q", AssessmentKind::FreeText),
        ])
        .unwrap()
    }

    #[test]
    fn test_completed_sections_in_declared_order() {
        let course = course();
        let mut state = ProgressState::default();
        state.completed.insert(
            ModuleId::new("m1"),
            ["c", "a", "stale"].into_iter().map(SectionId::from).collect(),
        );

        let m1 = course.module("m1").unwrap();
        assert_eq!(
            completed_sections(m1, &state),
            vec![SectionId::from("a"), SectionId::from("c")]
        );
        assert_eq!(module_progress(&course, m1, &state).completed_sections, 2);
    }

    #[test]
    fn test_summary() {
        let course = course();
        let mut state = ProgressState::default();
        state
            .completed
            .insert(ModuleId::new("m2"), [SectionId::from("x")].into());

        let summary = summarize(&course, &state);
        assert_eq!(summary.modules[0].status, ModuleStatus::NotStarted);
        assert_eq!(summary.modules[1].status, ModuleStatus::GatePending);
        assert_eq!(summary.course.completed_sections, 1);
        assert_eq!(summary.course.total_sections, 4);
        assert_eq!(summary.course.completed_modules, 0);
        assert_eq!(summary.course.percent(), 25);

        state
            .quiz_results
            .entry(ModuleId::new("m2"))
            .or_default()
            .insert("q".into(), true);
        assert_eq!(course_progress(&course, &state).completed_modules, 1);
    }
}
