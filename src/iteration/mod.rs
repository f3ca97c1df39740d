//! Refinement turn orchestration.
//!
//! [`IterationController`] drives one refinement turn end-to-end: it
//! captures the current context from the lineage, calls the external
//! refinement service, and appends the result as a new version. A
//! mutual-exclusion flag rejects a second turn while one is in flight;
//! interleaved turns would race on `append` and corrupt the version
//! ordering.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::error::{IterationError, IterationResult};
use crate::lineage::{Version, VersionLineage};
use crate::refinement::{ElementContext, Method, RefinementRequest, RefinementService};

/// Characters of prior output embedded in a version's audit context.
///
/// The full untruncated output still travels to the backend as
/// `current_context`; only the per-version audit string is excerpted.
const CONTEXT_EXCERPT_CHARS: usize = 500;

/// Orchestrates refinement turns against a shared [`VersionLineage`].
///
/// The controller is the only component that talks to the refinement
/// collaborator. It never mutates the lineage on a failed turn.
pub struct IterationController<S> {
    lineage: Arc<Mutex<VersionLineage>>,
    service: S,
    busy: AtomicBool,
}

impl<S: RefinementService> IterationController<S> {
    /// Create a controller over the given lineage and service.
    pub fn new(lineage: Arc<Mutex<VersionLineage>>, service: S) -> Self {
        Self {
            lineage,
            service,
            busy: AtomicBool::new(false),
        }
    }

    /// Handle on the shared lineage.
    pub fn lineage(&self) -> Arc<Mutex<VersionLineage>> {
        Arc::clone(&self.lineage)
    }

    /// Whether a refinement turn is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Submit one refinement instruction and append the result.
    ///
    /// Fails fast with [`IterationError::EmptyInstruction`] for a blank
    /// instruction and [`IterationError::Busy`] while another turn is
    /// outstanding. Any backend failure surfaces as a single normalized
    /// [`IterationError::RefinementFailed`] with the lineage untouched.
    /// The busy flag is released on every exit path.
    pub async fn submit_instruction(
        &self,
        instruction: &str,
        method: Method,
    ) -> IterationResult<Version> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(IterationError::EmptyInstruction);
        }

        let _busy = BusyGuard::acquire(&self.busy)?;

        // Snapshot the context, then release the lineage for the duration
        // of the backend call.
        let (context, chat_history, element_context) = {
            let lineage = self.lineage.lock().await;
            let context = lineage
                .current_version()
                .map(|v| v.output.clone())
                .unwrap_or_default();
            let element_context = lineage.is_initialized().then(|| ElementContext {
                current_version: lineage.current_number(),
                original_prompt: lineage.original_prompt().to_string(),
            });
            (context, lineage.chat_history().to_vec(), element_context)
        };

        debug!(
            method = %method,
            context_len = context.len(),
            "Submitting refinement instruction"
        );

        let mut request = RefinementRequest::new(instruction)
            .with_method(method)
            .with_context(context.clone())
            .with_chat_history(chat_history);
        if let Some(element_context) = element_context {
            request = request.with_element_context(element_context);
        }

        let outcome = match self.service.request_refinement(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Refinement turn failed, lineage unchanged");
                return Err(IterationError::RefinementFailed {
                    message: e.to_string(),
                });
            }
        };

        let context_used = format!(
            "Previous output: {}... + User request: {}",
            truncate_chars(&context, CONTEXT_EXCERPT_CHARS),
            instruction
        );

        let mut lineage = self.lineage.lock().await;
        let version = lineage
            .append(&outcome.updated_output, instruction, &context_used)
            .clone();

        info!(
            version = version.number,
            ai_response = %outcome.ai_response,
            "Refinement turn completed"
        );

        Ok(version)
    }
}

/// Mutual-exclusion guard for one in-flight refinement turn.
///
/// Dropping the guard releases the flag, so release is guaranteed on
/// every exit path, errors included.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> IterationResult<Self> {
        if flag
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(IterationError::Busy);
        }
        Ok(Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Truncate on a character boundary without allocating.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((index, _)) => &s[..index],
        None => s,
    }
}
