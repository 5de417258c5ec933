use crate::mode::RunMode;

#[derive(Debug, Clone, PartialEq)]
pub enum RunStage {
    Validating,
    Planning,
    RunningSegment,
    SelectingOutputs,
    Completed,
}

/// Position of the segment being run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SegmentProgress {
    pub index: usize,
    pub count: usize,
    pub start: f64,
    pub end: f64,
    pub fraction_complete: f64,
}

#[derive(Debug, Clone)]
pub struct RunProgressEvent {
    pub mode: Option<RunMode>,
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
    pub segment: Option<SegmentProgress>,
}
