//! The one surface UI code talks to.

use syllabus_core::{
    CourseProgress, CourseStructure, CourseStructureProvider, Hydration, ModuleId,
    ModuleProgress, Position, SectionId,
};
use syllabus_storage::ProgressStore;

use crate::gate::GateOutcome;
use crate::manager::ProgressManager;
use crate::tracker::ProgressSummary;

/// Stable progress API for views and navigation code.
///
/// Construct one at application start and pass it to consumers; there is no
/// global instance. Every operation delegates to [`ProgressManager`].
pub struct ProgressFacade<P: CourseStructureProvider, S: ProgressStore> {
    manager: ProgressManager<P, S>,
}

impl<P: CourseStructureProvider, S: ProgressStore> ProgressFacade<P, S> {
    /// Create an unresolved facade.
    pub fn new(provider: P, store: S) -> Self {
        Self {
            manager: ProgressManager::new(provider, store),
        }
    }

    /// Read stored progress. Call once after first render.
    pub fn hydrate(&mut self) {
        self.manager.hydrate();
    }

    /// The course catalog.
    pub fn course_structure(&self) -> &CourseStructure {
        self.manager.course_structure()
    }

    /// Completed section ids of a module, in declared section order.
    pub fn completed_sections(&self, module_id: &str) -> Vec<SectionId> {
        self.manager.completed_sections(module_id)
    }

    /// Mark a section as completed. Unknown ids are ignored.
    pub fn mark_section_complete(&mut self, module_id: &str, section_id: &str) -> bool {
        self.manager.mark_section_complete(module_id, section_id)
    }

    /// Move the current position. Invalid pairs are ignored.
    pub fn set_current_position(&mut self, module_id: &str, section_id: &str) -> bool {
        self.manager.set_current_position(module_id, section_id)
    }

    /// Record an assessment result. Unknown modules and keys are ignored.
    pub fn record_quiz_result(&mut self, module_id: &str, key: &str, correct: bool) -> bool {
        self.manager.record_quiz_result(module_id, key, correct)
    }

    /// Whether the module's assessment gate is satisfied.
    pub fn is_module_assessment_satisfied(&self, module_id: &str) -> bool {
        self.manager.is_module_assessment_satisfied(module_id)
    }

    /// Forget all progress. Irreversible.
    pub fn reset_progress(&mut self) {
        self.manager.reset_progress();
    }

    /// Current module id.
    pub fn current_module_id(&self) -> Option<&ModuleId> {
        self.manager.current_module_id()
    }

    /// Current section id.
    pub fn current_section_id(&self) -> Option<&SectionId> {
        self.manager.current_section_id()
    }

    /// Apply the `section` page parameter of a module page.
    ///
    /// A valid section overrides any restored position; anything else is
    /// ignored. Hydrates first so the restored position cannot override the
    /// parameter afterwards.
    pub fn apply_section_param(&mut self, module_id: &str, section: Option<&str>) -> bool {
        self.manager.hydrate();
        match section {
            Some(section_id) => self.manager.set_current_position(module_id, section_id),
            None => false,
        }
    }

    /// Whether `module_id` is the module the learner is in. Exact match only.
    pub fn is_active_module(&self, module_id: &str) -> bool {
        self.current_module_id().is_some_and(|m| m.as_str() == module_id)
    }

    /// Resolve a route path to a module id by whole path segment.
    pub fn module_id_from_path(&self, path: &str) -> Option<&ModuleId> {
        self.course_structure().module_id_from_path(path)
    }

    /// Progress of one module.
    pub fn module_progress(&self, module_id: &str) -> Option<ModuleProgress> {
        self.manager.module_progress(module_id)
    }

    /// Per-key breakdown of a module's assessment gate.
    pub fn assessment_outcome(&self, module_id: &str) -> Option<GateOutcome> {
        self.manager.assessment_outcome(module_id)
    }

    /// Progress of the whole course.
    pub fn course_progress(&self) -> CourseProgress {
        self.manager.course_progress()
    }

    /// Full summary, `Unresolved` until stored progress is read.
    pub fn snapshot(&self) -> Hydration<ProgressSummary> {
        self.manager.summary()
    }

    /// Where "continue" should take the learner.
    pub fn resume_target(&self) -> Option<Position> {
        self.manager.resume_target()
    }

    /// The section after the given one.
    pub fn next_section(&self, module_id: &str, section_id: &str) -> Option<Position> {
        self.manager.next_section(module_id, section_id)
    }

    /// The section before the given one.
    pub fn previous_section(&self, module_id: &str, section_id: &str) -> Option<Position> {
        self.manager.previous_section(module_id, section_id)
    }

    /// Whether progress is still being saved durably.
    pub fn is_durable(&self) -> bool {
        self.manager.is_durable()
    }
}
