//! Segment planning: how a model-time window is split into simulator runs.

use cf_config::{InjectionDef, TimePoint};
use cf_core::time::{same_time, steps_between};
use cf_core::TimeGrid;
use cf_results::StitchWindow;
use std::collections::BTreeMap;

use crate::error::{AppError, AppResult};

/// One simulator sub-run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub index: usize,
    pub count: usize,
    pub start: f64,
    pub end: f64,
    /// Steps handed to the simulator; may run past `end`.
    pub n_steps: usize,
}

impl Segment {
    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    /// Range of model time this segment contributes to the combined result.
    pub fn window(&self, step_size: f64) -> StitchWindow {
        StitchWindow::new(self.start, self.end, step_size, self.is_first())
    }
}

/// Injection targets sharing one model time.
#[derive(Debug, Clone, PartialEq)]
pub struct InjectionEvent {
    pub time: f64,
    pub targets: BTreeMap<String, f64>,
}

/// Merge injection definitions by time, dropping events outside `(t_start, t_end)`.
///
/// An event at `t_start` is dropped as well: the initial concentrations already
/// describe that instant.
pub fn merge_injections(defs: &[InjectionDef], grid: &TimeGrid) -> Vec<InjectionEvent> {
    let mut events: Vec<InjectionEvent> = Vec::new();
    for def in defs {
        if !grid.contains_interior(def.time) {
            tracing::warn!(
                time = def.time,
                t_start = grid.t_start(),
                t_end = grid.t_end(),
                "ignoring injection outside the model window"
            );
            continue;
        }
        match events.iter_mut().find(|e| same_time(e.time, def.time)) {
            Some(event) => event
                .targets
                .extend(def.species.iter().map(|(k, v)| (k.clone(), *v))),
            None => events.push(InjectionEvent {
                time: def.time,
                targets: def.species.clone(),
            }),
        }
    }
    events.sort_by(|a, b| a.time.total_cmp(&b.time));
    events
}

/// Segment start times: `t_start` followed by every interior time, ascending and
/// without duplicates.
pub fn injection_boundaries(times: impl IntoIterator<Item = f64>, grid: &TimeGrid) -> Vec<f64> {
    let mut interior: Vec<f64> = times
        .into_iter()
        .filter(|t| grid.contains_interior(*t))
        .collect();
    interior.sort_by(f64::total_cmp);
    interior.dedup_by(|a, b| same_time(*a, *b));

    let mut boundaries = Vec::with_capacity(interior.len() + 1);
    boundaries.push(grid.t_start());
    boundaries.extend(interior);
    boundaries
}

/// One segment per injection interval.
///
/// Each segment runs one step past its end so that its final sample overlaps the
/// next segment's start.
pub fn plan_injection_segments(events: &[InjectionEvent], grid: &TimeGrid) -> Vec<Segment> {
    let boundaries = injection_boundaries(events.iter().map(|e| e.time), grid);
    let count = boundaries.len();
    boundaries
        .iter()
        .enumerate()
        .map(|(index, &start)| {
            let end = boundaries.get(index + 1).copied().unwrap_or(grid.t_end());
            Segment {
                index,
                count,
                start,
                end,
                n_steps: steps_between(start, end, grid.step_size()) + 1,
            }
        })
        .collect()
}

/// One single-step segment per model step.
pub fn plan_nox_segments(grid: &TimeGrid) -> Vec<Segment> {
    let count = grid.step_count();
    (0..count)
        .map(|index| Segment {
            index,
            count,
            start: grid.time_at(index),
            end: grid.time_at(index + 1),
            n_steps: 1,
        })
        .collect()
}

pub fn plan_plain(grid: &TimeGrid) -> Vec<Segment> {
    vec![Segment {
        index: 0,
        count: 1,
        start: grid.t_start(),
        end: grid.t_end(),
        n_steps: grid.step_count(),
    }]
}

/// Value of `series` at every grid time, by linear interpolation between points.
///
/// The last value is held past the final point. A grid time before the first
/// point cannot be filled and is an error.
pub fn densify_nox(series: &[TimePoint], grid: &TimeGrid) -> AppResult<Vec<f64>> {
    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return Err(AppError::Planning {
            what: "NOx constraint series is empty".to_string(),
        });
    };

    grid.times()
        .map(|t| {
            if t < first.time && !same_time(t, first.time) {
                return Err(AppError::Planning {
                    what: format!(
                        "NOx constraint starts at t={} but the model starts at t={t}",
                        first.time
                    ),
                });
            }
            if t >= last.time {
                return Ok(last.value);
            }
            let upper = series.partition_point(|p| p.time <= t);
            let (a, b) = (&series[upper.saturating_sub(1)], &series[upper]);
            if same_time(a.time, b.time) {
                return Ok(b.value);
            }
            let frac = ((t - a.time) / (b.time - a.time)).clamp(0.0, 1.0);
            Ok(a.value + frac * (b.value - a.value))
        })
        .collect()
}
