//! cf-core: stable foundation for chamberflow.
//!
//! Contains:
//! - numeric (Real + tolerances + float helpers)
//! - time (model-time grid shared by planning and stitching)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod time;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use time::TimeGrid;
