//! Run executor for the AtChem2 box model.
//!
//! Provides:
//! - Scoped per-segment copies of the AtChem2 template
//! - Build and run steps as child processes with a wall-clock limit
//! - The `SegmentRunner` seam used by the orchestrator, with the AtChem2 implementation

pub mod atchem2;
pub mod error;
pub mod process;
pub mod runner;
pub mod workspace;

pub use atchem2::AtChem2Runner;
pub use error::{SimError, SimResult, Step};
pub use runner::{SegmentJob, SegmentRunner};
pub use workspace::SegmentWorkspace;
