//! Analysis backend client and types.
//!
//! The backend proxies the LLM that produces analysis output. Two calls
//! matter to this crate: the initial analysis that seeds Version #1, and
//! the refinement call that drives each iteration turn. The
//! [`RefinementService`] trait is the seam the iteration controller
//! depends on; [`HttpRefinementClient`] is the production implementation.

mod client;
mod types;

pub use client::HttpRefinementClient;
pub use types::*;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::error::RefinementResult;

/// External refinement collaborator consumed by the iteration controller.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RefinementService: Send + Sync {
    /// Submit one refinement turn to the backend.
    ///
    /// Implementations must either return the refined output or a typed
    /// error; a well-formed response carrying an explicit failure flag is
    /// an error, not a degenerate success.
    async fn request_refinement(
        &self,
        request: RefinementRequest,
    ) -> RefinementResult<RefinementOutcome>;
}
