//! The course compiled into the player.

use crate::course::{AssessmentKind, CourseStructure, Module};
use crate::provider::StaticCourse;

/// Module ids of the built-in course.
pub mod ids {
    /// Version control fundamentals (gated)
    pub const FUNDAMENTALS: &str = "module-1";
    /// Branching and merging (ungated)
    pub const BRANCHING: &str = "module-2";
    /// Collaboration workflows (gated)
    pub const COLLABORATION: &str = "module-3";
}

fn modules() -> Vec<Module> {
    vec![
        Module::new(ids::FUNDAMENTALS, "Version Control Fundamentals")
            .section("why-version-control", "Why Version Control?")
            .section("snapshots", "Snapshots, Not Differences")
            .section("three-states", "The Three States")
            .section("first-repository", "Your First Repository")
            .section("staging", "Staging Changes")
            .section("committing", "Writing Good Commits")
            .section("history", "Reading History")
            .section("undoing", "Undoing Things")
            .requires("matching-exercise", AssessmentKind::Matching)
            .requires("free-text-exercise", AssessmentKind::FreeText)
            .requires("quiz-three-states", AssessmentKind::MultipleChoice)
            .requires("quiz-staging", AssessmentKind::MultipleChoice)
            .requires("quiz-history", AssessmentKind::MultipleChoice),
        Module::new(ids::BRANCHING, "Branching and Merging")
            .section("what-is-a-branch", "What Is a Branch?")
            .section("switching", "Switching Branches")
            .section("fast-forward", "Fast-Forward Merges")
            .section("three-way-merge", "Three-Way Merges")
            .section("conflicts", "Resolving Conflicts"),
        Module::new(ids::COLLABORATION, "Collaboration Workflows")
            .section("remotes", "Working with Remotes")
            .section("fetch-pull", "Fetch versus Pull")
            .section("pushing", "Pushing Your Work")
            .section("pull-requests", "Pull Requests")
            .section("code-review", "Reviewing Code")
            .section("rebasing", "Rebasing Shared History")
            .requires("workflow-matching", AssessmentKind::Matching)
            .requires("quiz-rebase", AssessmentKind::MultipleChoice),
    ]
}

/// The compiled-in course catalog.
pub fn builtin_course() -> StaticCourse {
    match CourseStructure::new(modules()) {
        Ok(structure) => StaticCourse::new(structure),
        // Unreachable while `builtin_catalog_is_valid` passes.
        Err(e) => panic!("built-in course catalog is invalid: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::CourseStructureProvider;

    #[test]
    fn builtin_catalog_is_valid() {
        assert!(CourseStructure::new(modules()).is_ok());
    }

    #[test]
    fn test_builtin_shape() {
        let course = builtin_course();
        let structure = course.course_structure();
        assert_eq!(structure.modules().len(), 3);

        let first = structure.module(ids::FUNDAMENTALS).unwrap();
        assert_eq!(first.total_sections(), 8);
        assert_eq!(first.required_keys().count(), 5);
        assert!(!structure.module(ids::BRANCHING).unwrap().is_gated());
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(
            builtin_course().course_structure(),
            builtin_course().course_structure()
        );
    }
}
