//! Progress manager - the single owner of learner progress.

use std::cell::{OnceCell, RefCell};

use syllabus_core::{
    CourseProgress, CourseStructure, CourseStructureProvider, Hydration, ModuleId,
    ModuleProgress, ModuleStatus, Position, ProgressState, SectionId,
};
use syllabus_storage::ProgressStore;
use tracing::{debug, info};

use crate::gate::{AssessmentGate, GateOutcome};
use crate::tracker::{self, ProgressSummary};

/// Owns the in-memory progress state and keeps the store in sync with it.
///
/// Stored progress is read once, by [`hydrate`] or by whichever query or
/// mutation needs it first, so no answer is ever computed from state that
/// has not been loaded. [`summary`] and [`state`] never read the store; they
/// report [`Hydration::Unresolved`] until the first read so a view can show a
/// placeholder instead of zeros.
///
/// [`hydrate`]: ProgressManager::hydrate
/// [`summary`]: ProgressManager::summary
/// [`state`]: ProgressManager::state
pub struct ProgressManager<P: CourseStructureProvider, S: ProgressStore> {
    provider: P,
    store: RefCell<S>,
    state: OnceCell<ProgressState>,
}

impl<P: CourseStructureProvider, S: ProgressStore> ProgressManager<P, S> {
    /// Create an unresolved manager.
    pub fn new(provider: P, store: S) -> Self {
        Self {
            provider,
            store: RefCell::new(store),
            state: OnceCell::new(),
        }
    }

    /// Read stored progress if that has not happened yet.
    pub fn hydrate(&mut self) -> &ProgressState {
        self.view()
    }

    /// Whether stored progress has been read.
    pub fn is_resolved(&self) -> bool {
        self.state.get().is_some()
    }

    /// The current state, without reading the store.
    pub fn state(&self) -> Hydration<&ProgressState> {
        match self.state.get() {
            Some(state) => Hydration::Resolved(state),
            None => Hydration::Unresolved,
        }
    }

    /// Whether saves are still reaching durable storage.
    pub fn is_durable(&self) -> bool {
        self.store.borrow().is_durable()
    }

    /// The course catalog.
    pub fn course_structure(&self) -> &CourseStructure {
        self.provider.course_structure()
    }

    fn view(&self) -> &ProgressState {
        self.state.get_or_init(|| {
            load_sanitized(&mut *self.store.borrow_mut(), self.provider.course_structure())
        })
    }

    /// Apply `f` to the loaded state and save if it reports a change.
    fn mutate<R>(
        &mut self,
        f: impl FnOnce(&CourseStructure, &mut ProgressState) -> (bool, R),
    ) -> R {
        let Self {
            provider,
            store,
            state,
        } = self;
        let course = provider.course_structure();
        let store = store.get_mut();

        let mut current = state.take().unwrap_or_else(|| load_sanitized(store, course));
        let (changed, out) = f(course, &mut current);
        if changed {
            store.save(&current);
        }
        *state = OnceCell::from(current);
        out
    }

    // === Mutations ===

    /// Mark a section as completed.
    ///
    /// Unknown module or section ids are ignored. Returns whether the section
    /// was newly added; the store is written only in that case.
    pub fn mark_section_complete(&mut self, module_id: &str, section_id: &str) -> bool {
        self.mutate(|course, state| {
            let Some(section) = course.section(module_id, section_id) else {
                debug!("Ignoring completion of unknown section {}/{}", module_id, section_id);
                return (false, false);
            };

            let added = state
                .completed
                .entry(ModuleId::new(module_id))
                .or_default()
                .insert(section.id.clone());
            if added {
                debug!("Completed section {}/{}", module_id, section_id);
            }
            (added, added)
        })
    }

    /// Move the current position.
    ///
    /// Invalid pairs are ignored and leave the position untouched. Returns
    /// whether the pair was valid.
    pub fn set_current_position(&mut self, module_id: &str, section_id: &str) -> bool {
        self.mutate(|course, state| {
            if !course.contains(module_id, section_id) {
                debug!("Ignoring position {}/{} not in the course", module_id, section_id);
                return (false, false);
            }

            let position = Position::new(module_id, section_id);
            let moved = state.current.as_ref() != Some(&position);
            state.current = Some(position);
            (moved, true)
        })
    }

    /// Record an assessment result. See [`AssessmentGate::record_result`].
    pub fn record_quiz_result(&mut self, module_id: &str, key: &str, correct: bool) -> bool {
        self.mutate(|course, state| {
            let changed = AssessmentGate::new(course).record_result(state, module_id, key, correct);
            if changed {
                debug!("Recorded {}/{} = {}", module_id, key, correct);
            }
            (changed, changed)
        })
    }

    /// Forget all progress, in memory and in storage.
    pub fn reset_progress(&mut self) {
        info!("Resetting all course progress");
        self.state = OnceCell::from(ProgressState::default());
        self.store.get_mut().clear();
    }

    // === Queries ===

    /// Completed section ids of a module, in declared section order.
    pub fn completed_sections(&self, module_id: &str) -> Vec<SectionId> {
        match self.course_structure().module(module_id) {
            Some(module) => tracker::completed_sections(module, self.view()),
            None => Vec::new(),
        }
    }

    /// Whether the module's assessment gate is satisfied.
    pub fn is_module_assessment_satisfied(&self, module_id: &str) -> bool {
        AssessmentGate::new(self.course_structure()).is_satisfied(self.view(), module_id)
    }

    /// Per-key breakdown of the module's assessment gate.
    pub fn assessment_outcome(&self, module_id: &str) -> Option<GateOutcome> {
        AssessmentGate::new(self.course_structure()).outcome(self.view(), module_id)
    }

    /// Progress of one module, `None` for unknown modules.
    pub fn module_progress(&self, module_id: &str) -> Option<ModuleProgress> {
        let course = self.course_structure();
        let module = course.module(module_id)?;
        Some(tracker::module_progress(course, module, self.view()))
    }

    /// Status of one module, `None` for unknown modules.
    pub fn module_status(&self, module_id: &str) -> Option<ModuleStatus> {
        self.module_progress(module_id).map(|p| p.status)
    }

    /// Progress of the whole course.
    pub fn course_progress(&self) -> CourseProgress {
        tracker::course_progress(self.course_structure(), self.view())
    }

    /// Full progress summary, unresolved until stored progress is read.
    pub fn summary(&self) -> Hydration<ProgressSummary> {
        self.state()
            .map(|state| tracker::summarize(self.course_structure(), state))
    }

    /// Current position.
    pub fn current_position(&self) -> Option<&Position> {
        self.view().current.as_ref()
    }

    /// Current module id.
    pub fn current_module_id(&self) -> Option<&ModuleId> {
        self.current_position().map(|p| &p.module_id)
    }

    /// Current section id.
    pub fn current_section_id(&self) -> Option<&SectionId> {
        self.current_position().map(|p| &p.section_id)
    }

    // === Navigation ===

    /// The section after the given one, crossing into the next module.
    pub fn next_section(&self, module_id: &str, section_id: &str) -> Option<Position> {
        let mut flat = self.flat_sections();
        flat.by_ref()
            .find(|(m, s)| m.as_str() == module_id && s.as_str() == section_id)?;
        flat.next().map(|(m, s)| Position::new(m.clone(), s.clone()))
    }

    /// The section before the given one, crossing into the previous module.
    pub fn previous_section(&self, module_id: &str, section_id: &str) -> Option<Position> {
        let mut flat = self.flat_sections().rev();
        flat.by_ref()
            .find(|(m, s)| m.as_str() == module_id && s.as_str() == section_id)?;
        flat.next().map(|(m, s)| Position::new(m.clone(), s.clone()))
    }

    /// Where "continue" should take the learner.
    ///
    /// The current position if set, otherwise the first incomplete section of
    /// the first module that is not completed.
    pub fn resume_target(&self) -> Option<Position> {
        if let Some(pos) = self.current_position() {
            return Some(pos.clone());
        }

        let course = self.course_structure();
        let state = self.view();
        course
            .modules()
            .iter()
            .filter(|m| tracker::module_progress(course, m, state).status != ModuleStatus::Completed)
            .find_map(|m| {
                let done = state.completed.get(m.id.as_str());
                m.sections
                    .iter()
                    .find(|s| !done.is_some_and(|d| d.contains(s.id.as_str())))
                    .map(|s| Position::new(m.id.clone(), s.id.clone()))
            })
    }

    fn flat_sections(&self) -> impl DoubleEndedIterator<Item = (&ModuleId, &SectionId)> {
        self.course_structure()
            .modules()
            .iter()
            .flat_map(|m| m.sections.iter().map(move |s| (&m.id, &s.id)))
    }
}

fn load_sanitized<S: ProgressStore>(store: &mut S, course: &CourseStructure) -> ProgressState {
    let mut state = store.load();
    let dropped = state.retain_known(course);
    if dropped > 0 {
        info!(dropped, "Dropped stored progress that no longer matches the course");
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use syllabus_core::{AssessmentKind, Module, StaticCourse};
    use syllabus_storage::{KvBackend, KvProgressStore, MemoryBackend, StoreConfig};

    fn course() -> StaticCourse {
        let mut eight = Module::new("module-1", "Eight");
        for i in 1..=8 {
            eight = eight.section(format!("s{}", i), format!("Section {}", i));
        }
        let eight = eight
            .requires("quiz-a", AssessmentKind::MultipleChoice)
            .requires("quiz-b", AssessmentKind::Matching);
        let short = Module::new("module-2", "Short")
            .section("intro", "Intro")
            .section("outro", "Outro");
        StaticCourse::new(CourseStructure::new(vec![eight, short]).unwrap())
    }

    fn manager() -> ProgressManager<StaticCourse, KvProgressStore<MemoryBackend>> {
        ProgressManager::new(course(), KvProgressStore::new(MemoryBackend::new()))
    }

    #[test]
    fn test_percent_scenario() {
        let mut manager = manager();
        let mut percents = Vec::new();
        for i in 1..=8 {
            manager.mark_section_complete("module-1", &format!("s{}", i));
            percents.push(manager.module_progress("module-1").unwrap().percent());
        }
        assert_eq!(percents, vec![13, 25, 38, 50, 63, 75, 88, 100]);
    }

    #[test]
    fn test_mark_is_idempotent() {
        let mut manager = manager();
        assert!(manager.mark_section_complete("module-2", "intro"));
        let once = manager.completed_sections("module-2");
        assert!(!manager.mark_section_complete("module-2", "intro"));
        assert_eq!(manager.completed_sections("module-2"), once);
    }

    #[test]
    fn test_unknown_references_are_noops() {
        let mut manager = manager();
        assert!(!manager.mark_section_complete("module-9", "intro"));
        assert!(!manager.mark_section_complete("module-2", "s1"));
        assert!(manager.completed_sections("module-9").is_empty());
        assert!(manager.state().resolved().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_position_keeps_previous() {
        let mut manager = manager();
        assert!(manager.set_current_position("module-1", "s3"));
        assert!(!manager.set_current_position("module-1", "unknown-section"));
        assert!(!manager.set_current_position("module-3", "s3"));
        assert_eq!(manager.current_module_id().unwrap(), "module-1");
        assert_eq!(manager.current_section_id().unwrap(), "s3");
    }

    #[test]
    fn test_status_lifecycle_with_gate() {
        let mut manager = manager();
        assert_eq!(manager.module_status("module-1"), Some(ModuleStatus::NotStarted));

        manager.mark_section_complete("module-1", "s1");
        assert_eq!(manager.module_status("module-1"), Some(ModuleStatus::InProgress));

        for i in 2..=8 {
            manager.mark_section_complete("module-1", &format!("s{}", i));
        }
        assert_eq!(manager.module_status("module-1"), Some(ModuleStatus::GatePending));

        manager.record_quiz_result("module-1", "quiz-a", true);
        manager.record_quiz_result("module-1", "quiz-b", true);
        assert_eq!(manager.module_status("module-1"), Some(ModuleStatus::Completed));

        manager.record_quiz_result("module-1", "quiz-b", false);
        assert_eq!(manager.module_status("module-1"), Some(ModuleStatus::GatePending));
    }

    #[test]
    fn test_ungated_module_skips_gate_pending() {
        let mut manager = manager();
        manager.mark_section_complete("module-2", "intro");
        manager.mark_section_complete("module-2", "outro");
        assert_eq!(manager.module_status("module-2"), Some(ModuleStatus::Completed));
        assert!(manager.is_module_assessment_satisfied("module-2"));
    }

    #[test]
    fn test_reset_completeness() {
        let mut manager = manager();
        manager.mark_section_complete("module-1", "s1");
        manager.mark_section_complete("module-2", "intro");
        manager.set_current_position("module-2", "intro");
        manager.record_quiz_result("module-1", "quiz-a", true);

        manager.reset_progress();

        for module in ["module-1", "module-2"] {
            assert!(manager.completed_sections(module).is_empty());
        }
        assert!(manager.current_position().is_none());
        assert!(!manager.is_module_assessment_satisfied("module-1"));
        assert!(manager.is_module_assessment_satisfied("module-2"));
        assert!(manager.is_resolved());
    }

    #[test]
    fn test_progress_persists_across_managers() {
        let mut first = manager();
        first.mark_section_complete("module-2", "outro");
        first.set_current_position("module-2", "outro");
        first.record_quiz_result("module-1", "quiz-a", true);
        let backend = first.store.borrow().backend().clone();

        let mut second = ProgressManager::new(course(), KvProgressStore::new(backend));
        assert!(!second.is_resolved());

        second.hydrate();
        assert_eq!(second.completed_sections("module-2"), vec![SectionId::from("outro")]);
        assert_eq!(second.current_section_id().unwrap(), "outro");
        assert_eq!(
            second.assessment_outcome("module-1").unwrap().passed.len(),
            1
        );
    }

    #[test]
    fn test_queries_read_stored_progress_before_hydrate() {
        let mut backend = MemoryBackend::new();
        backend.insert_raw(
            "course-progress",
            r#"{"completed": {"module-2": ["intro"]},
                "currentModuleId": "module-2", "currentSectionId": "intro"}"#,
        );
        let manager = ProgressManager::new(course(), KvProgressStore::new(backend));
        assert_eq!(manager.summary(), Hydration::Unresolved);

        assert_eq!(manager.resume_target(), Some(Position::new("module-2", "intro")));
        assert_eq!(manager.completed_sections("module-2"), vec![SectionId::from("intro")]);
        assert_eq!(manager.module_status("module-2"), Some(ModuleStatus::InProgress));
        assert!(manager.is_resolved());
        assert!(manager.summary().is_resolved());
    }

    #[test]
    fn test_reset_removes_durable_records() {
        let course = course();
        let mut backend = MemoryBackend::new();
        backend.insert_raw("module-1-quiz-results", r#"{"quiz-a": true}"#);
        backend.insert_raw("other-course-progress", "{}");
        let config = StoreConfig::for_course(course.course_structure());

        let store = KvProgressStore::with_config(backend, config.clone());
        let mut manager = ProgressManager::new(course.clone(), store);
        assert!(!manager.is_module_assessment_satisfied("module-1"));
        assert_eq!(manager.assessment_outcome("module-1").unwrap().passed.len(), 1);
        manager.mark_section_complete("module-2", "intro");
        manager.reset_progress();

        let backend = manager.store.borrow().backend().clone();
        assert_eq!(backend.keys().unwrap(), vec!["other-course-progress".to_string()]);

        let store = KvProgressStore::with_config(backend, config);
        let mut reopened = ProgressManager::new(course, store);
        assert!(reopened.hydrate().is_empty());
        assert!(reopened.assessment_outcome("module-1").unwrap().passed.is_empty());
    }

    #[test]
    fn test_stale_entries_dropped_on_load() {
        let mut backend = MemoryBackend::new();
        backend.insert_raw(
            "course-progress",
            r#"{"completed": {"module-2": ["intro", "retired"], "module-0": ["x"]},
                "currentModuleId": "module-2", "currentSectionId": "retired"}"#,
        );
        let mut manager = ProgressManager::new(course(), KvProgressStore::new(backend));
        let state = manager.hydrate().clone();

        assert_eq!(state.completed.len(), 1);
        assert_eq!(state.completed_count("module-2"), 1);
        assert!(state.current.is_none());
    }

    #[test]
    fn test_summary_hydration_phases() {
        let mut manager = manager();
        assert_eq!(manager.summary(), Hydration::Unresolved);

        manager.hydrate();
        let summary = manager.summary().resolved().unwrap();
        assert_eq!(summary.course.completed_sections, 0);
        assert_eq!(summary.modules.len(), 2);
    }

    #[test]
    fn test_mutation_hydrates_first() {
        let mut backend = MemoryBackend::new();
        backend.insert_raw("course-progress", r#"{"completed": {"module-2": ["intro"]}}"#);
        let mut manager = ProgressManager::new(course(), KvProgressStore::new(backend));

        manager.mark_section_complete("module-2", "outro");
        assert_eq!(manager.completed_sections("module-2").len(), 2);
    }

    #[test]
    fn test_no_write_without_change() {
        let mut manager = manager();
        manager.set_current_position("module-2", "intro");
        let before = manager.store.borrow().backend().get("course-progress").unwrap();

        manager.set_current_position("module-2", "intro");
        manager.mark_section_complete("module-2", "missing");
        assert_eq!(manager.store.borrow().backend().get("course-progress").unwrap(), before);
    }

    #[test]
    fn test_quota_failure_keeps_memory_state() {
        let store = KvProgressStore::new(MemoryBackend::new().with_quota(8));
        let mut manager = ProgressManager::new(course(), store);

        manager.mark_section_complete("module-2", "intro");
        manager.mark_section_complete("module-2", "outro");
        assert!(!manager.is_durable());
        assert_eq!(manager.module_status("module-2"), Some(ModuleStatus::Completed));
    }

    #[test]
    fn test_navigation() {
        let mut manager = manager();
        assert_eq!(
            manager.next_section("module-1", "s8"),
            Some(Position::new("module-2", "intro"))
        );
        assert_eq!(
            manager.previous_section("module-2", "intro"),
            Some(Position::new("module-1", "s8"))
        );
        assert_eq!(manager.next_section("module-2", "outro"), None);
        assert_eq!(manager.previous_section("module-1", "s1"), None);
        assert_eq!(manager.next_section("module-1", "missing"), None);

        assert_eq!(manager.resume_target(), Some(Position::new("module-1", "s1")));
        manager.mark_section_complete("module-1", "s1");
        assert_eq!(manager.resume_target(), Some(Position::new("module-1", "s2")));
        manager.set_current_position("module-2", "outro");
        assert_eq!(manager.resume_target(), Some(Position::new("module-2", "outro")));
    }
}
