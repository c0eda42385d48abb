//! Catalog source abstraction.

use crate::course::CourseStructure;

/// Supplies the immutable course catalog.
///
/// Implementations must return the same catalog on every call for the
/// lifetime of the process.
pub trait CourseStructureProvider: Send + Sync {
    /// The course catalog.
    fn course_structure(&self) -> &CourseStructure;
}

/// Provider over a catalog built once at startup.
#[derive(Debug, Clone)]
pub struct StaticCourse {
    structure: CourseStructure,
}

impl StaticCourse {
    /// Wrap a catalog.
    pub fn new(structure: CourseStructure) -> Self {
        Self { structure }
    }
}

impl CourseStructureProvider for StaticCourse {
    fn course_structure(&self) -> &CourseStructure {
        &self.structure
    }
}

impl<P: CourseStructureProvider + ?Sized> CourseStructureProvider for std::sync::Arc<P> {
    fn course_structure(&self) -> &CourseStructure {
        (**self).course_structure()
    }
}
