//! Version lineage for one analysis artifact.
//!
//! This module owns the ordered, append-only history of versions produced
//! by iterative refinement, the global chat/context log, locking state,
//! and save-target resolution. The lineage is mutated only through its own
//! operations; no other component touches the version array directly.

mod naming;

pub use naming::generate_element_name;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{LineageError, LineageResult};

/// Output substituted when an empty initial output is supplied.
pub const DEFAULT_OUTPUT: &str = "Analysis result";
/// Instruction substituted when an empty seed instruction is supplied.
pub const DEFAULT_INSTRUCTION: &str = "User analysis request";

/// The logical subject of analysis being iteratively refined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Opaque unique identifier, assigned once at creation.
    pub id: String,
    /// Human-readable label, mutable until save.
    pub name: String,
    /// When the artifact was created.
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// One immutable snapshot of the artifact's output.
///
/// Only the `locked`/`saved` transition fields change after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    /// 1-based sequence index, unique within an artifact, never reused.
    pub number: u32,
    /// The textual analysis content at this version.
    pub output: String,
    /// The exact context that produced this version, kept for audit.
    pub context_used: String,
    /// Every user instruction issued up to and including this version.
    pub chat_history: Vec<String>,
    /// One-way finalization flag (false at creation, never unlocked).
    pub locked: bool,
    /// Set exactly once, when `locked` transitions to true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_at: Option<DateTime<Utc>>,
    /// True once this exact version has been successfully persisted.
    pub saved: bool,
    /// When this version was persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
}

/// Per-version entry in the save record's audit manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionSummary {
    /// Version number.
    pub version: u32,
    /// Whether the version was locked at save time.
    pub locked: bool,
    /// Version creation time.
    pub timestamp: DateTime<Utc>,
}

/// Payload handed to the element store when a version is saved.
///
/// Field names match the persisted element format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveRecord {
    /// Artifact identifier.
    pub element_id: String,
    /// Display name (explicit override or the generated artifact name).
    pub element_name: String,
    /// Number of the version being persisted.
    pub saved_version: u32,
    /// Output text of the saved version.
    pub output: String,
    /// Full instruction history snapshot of the saved version.
    pub full_chat_history: Vec<String>,
    /// Context that produced the saved version.
    pub context_used: String,
    /// Artifact creation time.
    pub created_at: DateTime<Utc>,
    /// Wall-clock save time.
    pub saved_at: DateTime<Utc>,
    /// Audit manifest of every version in the lineage.
    pub all_versions: Vec<VersionSummary>,
}

/// Authoritative owner of an artifact's version history, locking state,
/// and chat context.
///
/// A lineage starts empty; [`VersionLineage::initialize`] seeds it with
/// Version #1 once the first analysis output exists. All mutation goes
/// through `append`, the lock transition, and the save transition. The
/// history itself is append-only.
#[derive(Debug, Clone, Default)]
pub struct VersionLineage {
    artifact: Option<Artifact>,
    versions: Vec<Version>,
    /// Viewing/selection pointer; 0 while the lineage is empty.
    current: u32,
    /// Version numbers in the order they were locked.
    locked_order: Vec<u32>,
    /// Global instruction log, strictly append-only.
    chat_history: Vec<String>,
    original_prompt: String,
    selected_for_save: Option<u32>,
}

impl VersionLineage {
    /// Create an empty, uninitialized lineage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the lineage holds at least one version.
    pub fn is_initialized(&self) -> bool {
        !self.versions.is_empty()
    }

    /// Seed the lineage with a fresh artifact and Version #1.
    ///
    /// Replaces any existing state. Empty inputs are substituted with
    /// defensive defaults, so this operation cannot fail. The artifact
    /// name is derived from the seed instruction.
    pub fn initialize(&mut self, initial_output: &str, seed_instruction: &str) -> &Version {
        let output = non_empty_or(initial_output, DEFAULT_OUTPUT);
        let instruction = non_empty_or(seed_instruction, DEFAULT_INSTRUCTION);

        let name = generate_element_name(&instruction);
        let artifact = Artifact::new(&name);

        info!(
            artifact_id = %artifact.id,
            name = %artifact.name,
            "Initializing version lineage"
        );

        self.artifact = Some(artifact);
        self.chat_history = vec![instruction.clone()];
        self.original_prompt = instruction.clone();
        self.locked_order.clear();
        self.selected_for_save = None;
        self.versions = vec![Version {
            number: 1,
            output,
            context_used: instruction,
            chat_history: self.chat_history.clone(),
            locked: false,
            locked_at: None,
            saved: false,
            saved_at: None,
            timestamp: Utc::now(),
        }];
        self.current = 1;

        &self.versions[0]
    }

    /// Initialize from fallback content if the lineage is still empty.
    ///
    /// The explicit repair path for callers that reach a lock or save
    /// action before the first analysis result arrived. A no-op on an
    /// already-initialized lineage.
    pub fn ensure_initialized(&mut self, fallback_output: &str) {
        if !self.is_initialized() {
            debug!("Lineage uninitialized, seeding from fallback content");
            self.initialize(fallback_output, DEFAULT_INSTRUCTION);
        }
    }

    /// Append a new version produced by a refinement turn.
    ///
    /// Pushes the instruction onto the global chat history and creates the
    /// next version with a snapshot of that history. The current pointer
    /// moves to the new version.
    pub fn append(&mut self, new_output: &str, instruction: &str, context_used: &str) -> &Version {
        // Appending to a never-initialized lineage still yields a coherent
        // artifact; the instruction doubles as the originating prompt.
        if self.artifact.is_none() {
            self.artifact = Some(Artifact::new(generate_element_name(instruction)));
            self.original_prompt = instruction.to_string();
        }

        self.chat_history.push(instruction.to_string());

        let number = self.versions.len() as u32 + 1;
        self.versions.push(Version {
            number,
            output: new_output.to_string(),
            context_used: context_used.to_string(),
            chat_history: self.chat_history.clone(),
            locked: false,
            locked_at: None,
            saved: false,
            saved_at: None,
            timestamp: Utc::now(),
        });
        self.current = number;

        debug!(version = number, "Appended new version");

        &self.versions[number as usize - 1]
    }

    /// Lock a version, defaulting to the current one.
    ///
    /// Locking is monotonic; a second lock of the same version yields the
    /// informational [`LineageError::AlreadyLocked`] and changes nothing.
    pub fn lock(&mut self, version: Option<u32>) -> LineageResult<&Version> {
        if self.versions.is_empty() {
            return Err(LineageError::EmptyLineage);
        }

        let target = version.unwrap_or(self.current);
        let index = self.index_of(target)?;

        if self.versions[index].locked {
            return Err(LineageError::AlreadyLocked { version: target });
        }

        self.versions[index].locked = true;
        self.versions[index].locked_at = Some(Utc::now());
        self.locked_order.push(target);

        info!(version = target, "Version locked");

        Ok(&self.versions[index])
    }

    /// Explicitly choose which version a subsequent save targets.
    ///
    /// The selection is not validated here; a dangling number surfaces as
    /// [`LineageError::VersionNotFound`] when the save target is resolved.
    /// Locking the selected version is encouraged but not enforced.
    pub fn select_for_save(&mut self, version: u32) {
        debug!(version, "Version selected for save");
        self.selected_for_save = Some(version);
    }

    /// The explicit save selection, if one was made.
    pub fn selected_for_save(&self) -> Option<u32> {
        self.selected_for_save
    }

    /// Resolve which version a save would persist.
    ///
    /// Resolution order: explicit selection, then the most recently locked
    /// version, then Version #1 as the last-resort default.
    pub fn resolve_save_target(&self) -> LineageResult<&Version> {
        if self.versions.is_empty() {
            return Err(LineageError::EmptyLineage);
        }

        if let Some(selected) = self.selected_for_save {
            return self.index_of(selected).map(|i| &self.versions[i]);
        }

        if let Some(&last_locked) = self.locked_order.last() {
            return self.index_of(last_locked).map(|i| &self.versions[i]);
        }

        Ok(&self.versions[0])
    }

    /// Assemble the save payload for the resolved target version.
    ///
    /// An empty or whitespace display name falls back to the artifact's
    /// generated name. The version's `saved` flag is not touched here;
    /// callers flip it via [`VersionLineage::mark_saved`] once the store
    /// acknowledges the persist.
    pub fn build_save_record(&self, display_name: Option<&str>) -> LineageResult<SaveRecord> {
        let target = self.resolve_save_target()?;
        let artifact = self.artifact.as_ref().ok_or(LineageError::EmptyLineage)?;

        let element_name = display_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| artifact.name.clone());

        Ok(SaveRecord {
            element_id: artifact.id.clone(),
            element_name,
            saved_version: target.number,
            output: target.output.clone(),
            full_chat_history: target.chat_history.clone(),
            context_used: target.context_used.clone(),
            created_at: artifact.created_at,
            saved_at: Utc::now(),
            all_versions: self
                .versions
                .iter()
                .map(|v| VersionSummary {
                    version: v.number,
                    locked: v.locked,
                    timestamp: v.timestamp,
                })
                .collect(),
        })
    }

    /// Record that a version was successfully persisted.
    pub fn mark_saved(&mut self, version: u32) -> LineageResult<&Version> {
        let index = self.index_of(version)?;
        self.versions[index].saved = true;
        self.versions[index].saved_at = Some(Utc::now());

        info!(version, "Version marked as saved");

        Ok(&self.versions[index])
    }

    /// Redirect the viewing pointer to an existing version.
    ///
    /// The sequence itself is untouched; this only changes which version
    /// `current_version` (and a lock with no argument) refers to.
    pub fn set_current(&mut self, version: u32) -> LineageResult<()> {
        self.index_of(version)?;
        self.current = version;
        Ok(())
    }

    /// Override the artifact's display name.
    ///
    /// No effect before initialization; the name is regenerated from the
    /// seed instruction at that point anyway.
    pub fn rename_artifact(&mut self, name: &str) {
        if let Some(artifact) = self.artifact.as_mut() {
            artifact.name = name.to_string();
        }
    }

    /// The artifact, once the lineage has been initialized.
    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    /// The version the current pointer references.
    pub fn current_version(&self) -> Option<&Version> {
        self.index_of(self.current).ok().map(|i| &self.versions[i])
    }

    /// Number of the version the current pointer references.
    pub fn current_number(&self) -> u32 {
        self.current
    }

    /// Look up a version by number.
    pub fn version(&self, number: u32) -> Option<&Version> {
        self.index_of(number).ok().map(|i| &self.versions[i])
    }

    /// All versions in sequence order.
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    /// Number of versions in the lineage.
    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    /// The global instruction log.
    pub fn chat_history(&self) -> &[String] {
        &self.chat_history
    }

    /// The instruction that seeded the lineage.
    pub fn original_prompt(&self) -> &str {
        &self.original_prompt
    }

    /// Version numbers in the order they were locked.
    pub fn locked_numbers(&self) -> &[u32] {
        &self.locked_order
    }

    fn index_of(&self, number: u32) -> LineageResult<usize> {
        // Versions are contiguous from 1, so the number doubles as an index.
        if number >= 1 && (number as usize) <= self.versions.len() {
            Ok(number as usize - 1)
        } else {
            Err(LineageError::VersionNotFound { version: number })
        }
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}
