//! Durable progress persistence over a key/value backend.
//!
//! Section completion, current position and assessment results are written
//! as one record under a single key, so a save either lands completely or not
//! at all. Older installs kept assessment results in separate per-module
//! records (`<module>-quiz-results`). Those records are looked up only for the
//! modules named in [`StoreConfig::modules`]; one that fills a gap in the main
//! record is merged in on load and removed after the next successful save.
//! Superseded or unreadable ones are left alone until [`ProgressStore::clear`].

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use syllabus_core::{AssessmentKey, CourseStructure, ModuleId, Position, ProgressState, SectionId};
use tracing::{debug, info, warn};

use super::{KvBackend, StorageError};

/// Current record schema version.
pub const RECORD_VERSION: u32 = 2;

const MAIN_KEY: &str = "course-progress";
const LEGACY_QUIZ_SUFFIX: &str = "-quiz-results";

/// Persists progress across sessions.
///
/// Implementations never fail: unreadable data loads as defaults and failed
/// writes leave the in-memory state authoritative.
pub trait ProgressStore: Send {
    /// Read stored progress, or defaults if absent or invalid.
    fn load(&mut self) -> ProgressState;

    /// Overwrite stored progress.
    fn save(&mut self, state: &ProgressState);

    /// Remove every stored progress record.
    fn clear(&mut self);

    /// Whether saves are still reaching durable storage.
    fn is_durable(&self) -> bool {
        true
    }
}

impl<S: ProgressStore + ?Sized> ProgressStore for Box<S> {
    fn load(&mut self) -> ProgressState {
        (**self).load()
    }

    fn save(&mut self, state: &ProgressState) {
        (**self).save(state)
    }

    fn clear(&mut self) {
        (**self).clear()
    }

    fn is_durable(&self) -> bool {
        (**self).is_durable()
    }
}

/// Store configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Prepended to every key, to keep several courses in one backend
    pub key_prefix: String,

    /// Modules whose legacy quiz records belong to this course
    pub modules: Vec<ModuleId>,
}

impl StoreConfig {
    /// Set the key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Config covering every module of a course.
    pub fn for_course(course: &CourseStructure) -> Self {
        Self::default().with_modules(course.modules().iter().map(|m| m.id.clone()))
    }

    /// Set the modules whose legacy quiz records this store owns.
    pub fn with_modules(mut self, modules: impl IntoIterator<Item = ModuleId>) -> Self {
        self.modules = modules.into_iter().collect();
        self
    }

    /// Key of the main progress record.
    pub fn main_key(&self) -> String {
        format!("{}{}", self.key_prefix, MAIN_KEY)
    }

    /// Key of a legacy per-module quiz record.
    pub fn legacy_quiz_key(&self, module_id: &str) -> String {
        format!("{}{}{}", self.key_prefix, module_id, LEGACY_QUIZ_SUFFIX)
    }

    /// Every key this store may write or remove.
    pub fn owned_keys(&self) -> Vec<String> {
        std::iter::once(self.main_key())
            .chain(self.modules.iter().map(|m| self.legacy_quiz_key(m.as_str())))
            .collect()
    }
}

/// On-disk shape of the main record.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgressRecord {
    /// Missing in records written before assessment results were merged in
    #[serde(default = "first_version")]
    version: u32,
    completed: BTreeMap<ModuleId, Vec<SectionId>>,
    #[serde(default)]
    current_module_id: Option<ModuleId>,
    #[serde(default)]
    current_section_id: Option<SectionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    quiz_results: Option<BTreeMap<ModuleId, BTreeMap<AssessmentKey, bool>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

fn first_version() -> u32 {
    1
}

type QuizRecord = BTreeMap<AssessmentKey, bool>;

impl ProgressRecord {
    fn from_state(state: &ProgressState) -> Self {
        let (current_module_id, current_section_id) = match &state.current {
            Some(pos) => (Some(pos.module_id.clone()), Some(pos.section_id.clone())),
            None => (None, None),
        };
        Self {
            version: RECORD_VERSION,
            completed: state
                .completed
                .iter()
                .filter(|(_, sections)| !sections.is_empty())
                .map(|(m, sections)| (m.clone(), sections.iter().cloned().collect()))
                .collect(),
            current_module_id,
            current_section_id,
            quiz_results: Some(
                state
                    .quiz_results
                    .iter()
                    .filter(|(_, results)| !results.is_empty())
                    .map(|(m, results)| (m.clone(), results.clone()))
                    .collect(),
            ),
            updated_at: Some(Utc::now()),
        }
    }

    fn into_state(self) -> ProgressState {
        let current = match (self.current_module_id, self.current_section_id) {
            (Some(module_id), Some(section_id)) => Some(Position { module_id, section_id }),
            (None, None) => None,
            (m, s) => {
                warn!(
                    module = ?m,
                    section = ?s,
                    "Stored position is half set; dropping it"
                );
                None
            }
        };
        ProgressState {
            completed: self
                .completed
                .into_iter()
                .map(|(m, sections)| (m, sections.into_iter().collect::<BTreeSet<_>>()))
                .collect(),
            current,
            quiz_results: self.quiz_results.unwrap_or_default(),
        }
    }
}

/// [`ProgressStore`] over any [`KvBackend`].
#[derive(Debug)]
pub struct KvProgressStore<B: KvBackend> {
    backend: B,
    config: StoreConfig,
    degraded: bool,
    migrated_keys: Vec<String>,
}

impl<B: KvBackend> KvProgressStore<B> {
    /// Create a store with the default configuration.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, StoreConfig::default())
    }

    /// Create a store with an explicit configuration.
    pub fn with_config(backend: B, config: StoreConfig) -> Self {
        Self {
            backend,
            config,
            degraded: false,
            migrated_keys: Vec::new(),
        }
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn read_main(&self) -> Option<ProgressState> {
        let key = self.config.main_key();
        let raw = match self.backend.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No stored progress under {}", key);
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Progress storage unavailable; starting fresh");
                return None;
            }
        };

        let record: ProgressRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Stored progress is corrupt; starting fresh");
                return None;
            }
        };

        if record.version == 0 || record.version > RECORD_VERSION {
            warn!(
                version = record.version,
                "Stored progress has unsupported schema version; starting fresh"
            );
            return None;
        }

        Some(record.into_state())
    }

    fn read_legacy_quizzes(&mut self, state: &mut ProgressState) {
        for module_id in self.config.modules.clone() {
            if state.quiz_results.contains_key(&module_id) {
                continue;
            }

            let key = self.config.legacy_quiz_key(module_id.as_str());
            let parsed = self
                .backend
                .get(&key)
                .and_then(|raw| match raw {
                    Some(raw) => Ok(Some(serde_json::from_str::<QuizRecord>(&raw)?)),
                    None => Ok(None),
                });
            match parsed {
                Ok(Some(results)) => {
                    info!("Migrating legacy quiz results for {}", module_id);
                    state.quiz_results.insert(module_id, results);
                    self.migrated_keys.push(key);
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Ignoring unreadable quiz record {}", key),
            }
        }
    }

    fn fail(&mut self, op: &str, e: StorageError) {
        warn!(
            error = %e,
            "Progress {} failed; keeping progress in memory for this session",
            op
        );
        self.degraded = true;
    }
}

impl<B: KvBackend> ProgressStore for KvProgressStore<B> {
    fn load(&mut self) -> ProgressState {
        self.migrated_keys.clear();
        let mut state = self.read_main().unwrap_or_default();
        self.read_legacy_quizzes(&mut state);
        state
    }

    fn save(&mut self, state: &ProgressState) {
        if self.degraded {
            debug!("Progress storage degraded; skipping save");
            return;
        }

        let json = match serde_json::to_string(&ProgressRecord::from_state(state)) {
            Ok(json) => json,
            Err(e) => return self.fail("serialization", e.into()),
        };
        if let Err(e) = self.backend.set(&self.config.main_key(), &json) {
            return self.fail("save", e);
        }

        for key in std::mem::take(&mut self.migrated_keys) {
            if let Err(e) = self.backend.remove(&key) {
                debug!(error = %e, "Could not remove migrated record {}", key);
            }
        }
    }

    fn clear(&mut self) {
        self.migrated_keys.clear();
        for key in self.config.owned_keys() {
            if let Err(e) = self.backend.remove(&key) {
                warn!(error = %e, "Could not remove progress record {}", key);
            }
        }
    }

    fn is_durable(&self) -> bool {
        !self.degraded
    }
}

/// A store that keeps nothing. Progress lives only in memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct EphemeralStore;

impl ProgressStore for EphemeralStore {
    fn load(&mut self) -> ProgressState {
        ProgressState::default()
    }

    fn save(&mut self, _state: &ProgressState) {}

    fn clear(&mut self) {}

    fn is_durable(&self) -> bool {
        false
    }
}
