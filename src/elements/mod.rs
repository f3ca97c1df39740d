//! Element persistence for saved analyses.
//!
//! A "saved element" is one version of an artifact, persisted together
//! with its chat history and an audit manifest of the whole lineage.
//! Saving the same element id again updates the stored record in place.

mod sqlite;

pub use sqlite::SqliteElementStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageResult;
use crate::lineage::SaveRecord;

/// Characters of output shown in a dashboard summary.
const PREVIEW_CHARS: usize = 200;

/// How a save was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveAction {
    /// A new element was stored.
    Created,
    /// An existing element was overwritten.
    Updated,
}

impl std::fmt::Display for SaveAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveAction::Created => write!(f, "created"),
            SaveAction::Updated => write!(f, "updated"),
        }
    }
}

/// Acknowledgement returned by the store after a successful save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveAck {
    /// Identifier of the stored element.
    pub element_id: String,
    /// Whether the element was created or updated.
    pub action: SaveAction,
}

/// A persisted element as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedElement {
    /// The save payload as it was persisted.
    #[serde(flatten)]
    pub record: SaveRecord,
    /// Set when the element has been overwritten after its first save.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Dashboard summary of a saved element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementSummary {
    /// Element identifier.
    pub element_id: String,
    /// Display name.
    pub element_name: String,
    /// Version number that was saved.
    pub saved_version: u32,
    /// Artifact creation time.
    pub created_at: DateTime<Utc>,
    /// When the element was saved.
    pub saved_at: DateTime<Utc>,
    /// Truncated output excerpt.
    pub output_preview: String,
    /// Number of chat instructions in the saved history.
    pub chat_count: usize,
    /// Number of versions in the audit manifest.
    pub version_count: usize,
}

/// Aggregate statistics over all saved elements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementStats {
    /// Number of saved elements.
    pub total_elements: usize,
    /// Versions across all saved manifests.
    pub total_versions: usize,
    /// Chat instructions across all saved histories.
    pub total_chat_messages: usize,
    /// Most recent save time, if any element exists.
    pub latest_save: Option<DateTime<Utc>>,
}

/// Persistence collaborator for finalized elements.
#[async_trait]
pub trait ElementStore: Send + Sync {
    /// Persist a save record, creating or updating by element id.
    async fn save_element(&self, record: &SaveRecord) -> StorageResult<SaveAck>;

    /// Fetch a stored element by id.
    async fn get_element(&self, element_id: &str) -> StorageResult<Option<SavedElement>>;

    /// List summaries of every stored element, newest save first.
    async fn list_elements(&self) -> StorageResult<Vec<ElementSummary>>;

    /// Delete an element by id; false when no such element exists.
    async fn delete_element(&self, element_id: &str) -> StorageResult<bool>;

    /// Aggregate statistics over all stored elements.
    async fn stats(&self) -> StorageResult<ElementStats>;
}

/// Excerpt an output for dashboard display.
pub(crate) fn output_preview(output: &str) -> String {
    match output.char_indices().nth(PREVIEW_CHARS) {
        Some((index, _)) => format!("{}...", &output[..index]),
        None => output.to_string(),
    }
}
