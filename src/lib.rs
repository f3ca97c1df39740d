//! # Analysis Refinery
//!
//! Session engine for iteratively refining AI-produced document analyses.
//! An analysis backend (an HTTP service proxying an LLM) produces the
//! output; this crate owns everything stateful around it:
//!
//! - **Version lineage**: every refinement appends an immutable version
//!   with a snapshot of the instruction history that produced it
//! - **Locking**: versions are finalized one-way and prioritized for save
//! - **Iteration turns**: one instruction → one backend call → one new
//!   version, with a busy-flag guard against interleaved turns
//! - **Element persistence**: a chosen version is saved as a named
//!   element, with the full lineage manifest kept for audit
//!
//! ## Architecture
//!
//! ```text
//! CLI / UI → AnalysisSession → IterationController → Backend (HTTP)
//!                  ↓
//!            VersionLineage (session state)
//!                  ↓  explicit save
//!            SQLite (saved elements)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use analysis_refinery::{AnalysisSession, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let session = AnalysisSession::new(&config).await?;
//!     session.begin("Summarize the complaints in this document").await?;
//!     session.refine("Break the numbers down by country").await?;
//!     session.lock_version(None).await?;
//!     session.save(Some("Complaint Breakdown")).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Configuration management loaded from the environment.
pub mod config;
/// Element persistence for saved analyses.
pub mod elements;
/// Error types and result aliases for the application.
pub mod error;
/// Refinement turn orchestration with busy-flag exclusion.
pub mod iteration;
/// Version lineage, locking, and save-target resolution.
pub mod lineage;
/// Analysis backend client and request/response types.
pub mod refinement;
/// Editing session wiring lineage, controller, and store.
pub mod session;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use session::AnalysisSession;
