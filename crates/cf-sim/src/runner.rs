//! The seam between orchestration and the simulator.

use crate::error::SimResult;
use cf_config::{ModelConfig, ModelParameters};
use cf_results::OutputTables;

/// Everything one simulator sub-run needs.
#[derive(Debug, Clone)]
pub struct SegmentJob<'a> {
    pub index: usize,
    pub start: f64,
    pub config: ModelConfig<'a>,
    pub parameters: ModelParameters,
}

/// Something that can execute one segment and return its raw output tables.
pub trait SegmentRunner {
    /// Every species named in the mechanism, in first-appearance order.
    fn mechanism_species(&mut self) -> SimResult<Vec<String>>;

    fn run_segment(&mut self, job: &SegmentJob<'_>) -> SimResult<OutputTables>;
}
