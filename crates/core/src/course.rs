//! Course catalog model - modules, sections and assessment requirements.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::id::{AssessmentKey, ModuleId, SectionId};

/// The smallest navigable and completable unit of a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Identifier, unique within the module
    pub id: SectionId,

    /// Display title
    pub title: String,
}

impl Section {
    /// Create a new section.
    pub fn new(id: impl Into<SectionId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// Kind of graded exercise behind an assessment key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentKind {
    /// Drag-and-match exercise
    Matching,
    /// Free-text answer checked against expected keywords
    FreeText,
    /// Single multiple-choice question
    MultipleChoice,
}

/// A required assessment item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentItem {
    /// Key under which results are recorded
    pub key: AssessmentKey,

    /// Exercise kind
    pub kind: AssessmentKind,
}

/// A top-level unit of course content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Identifier, unique within the course
    pub id: ModuleId,

    /// Display title
    pub title: String,

    /// Sections in reading order
    pub sections: Vec<Section>,

    /// Required assessment items; empty means the module has no gate
    pub assessment: Vec<AssessmentItem>,
}

impl Module {
    /// Create a module with no sections and no gate.
    pub fn new(id: impl Into<ModuleId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            sections: Vec::new(),
            assessment: Vec::new(),
        }
    }

    /// Append a section.
    pub fn section(mut self, id: impl Into<SectionId>, title: impl Into<String>) -> Self {
        self.sections.push(Section::new(id, title));
        self
    }

    /// Append a required assessment item.
    pub fn requires(mut self, key: impl Into<AssessmentKey>, kind: AssessmentKind) -> Self {
        self.assessment.push(AssessmentItem {
            key: key.into(),
            kind,
        });
        self
    }

    /// Whether the module declares an assessment gate.
    pub fn is_gated(&self) -> bool {
        !self.assessment.is_empty()
    }

    /// Whether `section_id` is one of this module's sections.
    pub fn has_section(&self, section_id: &str) -> bool {
        self.section_index(section_id).is_some()
    }

    /// Position of a section in reading order.
    pub fn section_index(&self, section_id: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.id == section_id)
    }

    /// Whether `key` is a required assessment key of this module.
    pub fn requires_key(&self, key: &str) -> bool {
        self.assessment.iter().any(|a| a.key == key)
    }

    /// Iterate the required assessment keys.
    pub fn required_keys(&self) -> impl Iterator<Item = &AssessmentKey> {
        self.assessment.iter().map(|a| &a.key)
    }

    /// Number of sections.
    pub fn total_sections(&self) -> usize {
        self.sections.len()
    }
}

/// Errors raised while assembling a catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// Two modules share an id
    #[error("duplicate module id: {0}")]
    DuplicateModule(ModuleId),

    /// Two sections of one module share an id
    #[error("duplicate section id {section} in module {module}")]
    DuplicateSection {
        /// Owning module
        module: ModuleId,
        /// Offending section
        section: SectionId,
    },

    /// Two assessment items of one module share a key
    #[error("duplicate assessment key {key} in module {module}")]
    DuplicateAssessmentKey {
        /// Owning module
        module: ModuleId,
        /// Offending key
        key: AssessmentKey,
    },
}

/// The entire static catalog. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseStructure {
    modules: Vec<Module>,
}

impl CourseStructure {
    /// Build a catalog, rejecting duplicate ids.
    pub fn new(modules: Vec<Module>) -> Result<Self, CatalogError> {
        validate(&modules)?;
        Ok(Self { modules })
    }

    /// Modules in course order.
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Look up a module by exact id.
    pub fn module(&self, module_id: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == module_id)
    }

    /// Look up a section by exact module and section id.
    pub fn section(&self, module_id: &str, section_id: &str) -> Option<&Section> {
        self.module(module_id)?
            .sections
            .iter()
            .find(|s| s.id == section_id)
    }

    /// Whether the pair names a real module and one of its sections.
    pub fn contains(&self, module_id: &str, section_id: &str) -> bool {
        self.section(module_id, section_id).is_some()
    }

    /// Total number of sections across all modules.
    pub fn total_sections(&self) -> usize {
        self.modules.iter().map(Module::total_sections).sum()
    }

    /// Resolve a route path to a module id.
    ///
    /// Matches whole path segments only, so `/modules/module-10` never
    /// resolves to `module-1`.
    pub fn module_id_from_path(&self, path: &str) -> Option<&ModuleId> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .find_map(|segment| self.module(segment).map(|m| &m.id))
    }
}

fn validate(modules: &[Module]) -> Result<(), CatalogError> {
    let mut module_ids = HashSet::new();
    for module in modules {
        if !module_ids.insert(module.id.as_str()) {
            return Err(CatalogError::DuplicateModule(module.id.clone()));
        }

        let mut section_ids = HashSet::new();
        for section in &module.sections {
            if !section_ids.insert(section.id.as_str()) {
                return Err(CatalogError::DuplicateSection {
                    module: module.id.clone(),
                    section: section.id.clone(),
                });
            }
        }

        let mut keys = HashSet::new();
        for item in &module.assessment {
            if !keys.insert(item.key.as_str()) {
                return Err(CatalogError::DuplicateAssessmentKey {
                    module: module.id.clone(),
                    key: item.key.clone(),
                });
            }
        }
    }
    Ok(())
}
