//! Editing session wiring.
//!
//! [`AnalysisSession`] owns the single [`VersionLineage`] of an editing
//! session and hands it by reference to the iteration controller and the
//! presentation layer. There is no ambient singleton; dropping the
//! session discards the lineage unless a version was explicitly saved.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::Config;
use crate::elements::{ElementStore, SaveAck, SqliteElementStore};
use crate::error::{AppResult, LineageError};
use crate::iteration::IterationController;
use crate::lineage::{Version, VersionLineage};
use crate::refinement::{AnalysisRequest, HttpRefinementClient, Method};

/// One editing session: an owned lineage, the refinement controller, and
/// the element store used when a version is persisted.
pub struct AnalysisSession {
    lineage: Arc<Mutex<VersionLineage>>,
    controller: IterationController<HttpRefinementClient>,
    client: HttpRefinementClient,
    store: SqliteElementStore,
    method: Method,
}

impl AnalysisSession {
    /// Create a session from configuration.
    pub async fn new(config: &Config) -> AppResult<Self> {
        let client = HttpRefinementClient::new(&config.backend, config.request.clone())?;
        let store = SqliteElementStore::new(&config.database).await?;
        Ok(Self::from_parts(client, store))
    }

    /// Create a session from an existing client and store.
    pub fn from_parts(client: HttpRefinementClient, store: SqliteElementStore) -> Self {
        let lineage = Arc::new(Mutex::new(VersionLineage::new()));
        let controller = IterationController::new(Arc::clone(&lineage), client.clone());
        Self {
            lineage,
            controller,
            client,
            store,
            method: Method::default(),
        }
    }

    /// Handle on the session's lineage, for presentation layers.
    pub fn lineage(&self) -> Arc<Mutex<VersionLineage>> {
        Arc::clone(&self.lineage)
    }

    /// The currently selected analysis method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Switch the analysis method for subsequent turns.
    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    /// Whether a refinement turn is in flight.
    pub fn is_busy(&self) -> bool {
        self.controller.is_busy()
    }

    /// Run the initial analysis and seed the lineage with Version #1.
    ///
    /// Replaces any lineage already held by this session.
    pub async fn begin(&self, prompt: &str) -> AppResult<Version> {
        let request = AnalysisRequest::new(prompt).with_method(self.method);
        let outcome = self.client.run_analysis(&request).await?;

        let mut lineage = self.lineage.lock().await;
        if lineage.is_initialized() {
            warn!("Replacing an existing lineage with a fresh analysis");
        }
        let version = lineage.initialize(&outcome.result, prompt).clone();

        info!(
            artifact = %lineage.artifact().map(|a| a.name.as_str()).unwrap_or_default(),
            "Editing session started"
        );

        Ok(version)
    }

    /// Submit one refinement instruction.
    pub async fn refine(&self, instruction: &str) -> AppResult<Version> {
        let version = self
            .controller
            .submit_instruction(instruction, self.method)
            .await?;
        Ok(version)
    }

    /// Lock a version, defaulting to the current one.
    pub async fn lock_version(&self, version: Option<u32>) -> AppResult<Version> {
        let mut lineage = self.lineage.lock().await;
        let version = lineage.lock(version)?.clone();
        Ok(version)
    }

    /// Seed the lineage from fallback content if it is still empty.
    pub async fn ensure_initialized(&self, fallback_output: &str) {
        self.lineage.lock().await.ensure_initialized(fallback_output);
    }

    /// Choose which version a subsequent save targets.
    pub async fn select_version(&self, version: u32) {
        self.lineage.lock().await.select_for_save(version);
    }

    /// Redirect viewing to an existing version and return it.
    pub async fn view_version(&self, version: u32) -> AppResult<Version> {
        let mut lineage = self.lineage.lock().await;
        lineage.set_current(version)?;
        lineage
            .version(version)
            .cloned()
            .ok_or_else(|| LineageError::VersionNotFound { version }.into())
    }

    /// Override the artifact's display name.
    pub async fn rename(&self, name: &str) {
        self.lineage.lock().await.rename_artifact(name);
    }

    /// Persist the resolved save target as a named element.
    ///
    /// The version's `saved` flag flips only after the store acknowledges.
    pub async fn save(&self, display_name: Option<&str>) -> AppResult<SaveAck> {
        let record = self.lineage.lock().await.build_save_record(display_name)?;
        let ack = self.store.save_element(&record).await?;
        self.lineage.lock().await.mark_saved(record.saved_version)?;

        info!(
            element_id = %ack.element_id,
            version = record.saved_version,
            action = %ack.action,
            "Element persisted"
        );

        Ok(ack)
    }

    /// The version the lineage's current pointer references.
    pub async fn current_version(&self) -> Option<Version> {
        self.lineage.lock().await.current_version().cloned()
    }

    /// Snapshot of every version, in sequence order.
    pub async fn versions(&self) -> Vec<Version> {
        self.lineage.lock().await.versions().to_vec()
    }

    /// The artifact's display name, once initialized.
    pub async fn element_name(&self) -> Option<String> {
        self.lineage
            .lock()
            .await
            .artifact()
            .map(|a| a.name.clone())
    }
}
