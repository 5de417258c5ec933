//! Model-time grid.
//!
//! All model times are seconds since midnight of the configured start date, the
//! same convention the simulator uses for `model.parameters`.

use crate::numeric::{Real, Tolerances, nearly_equal};
use crate::{CoreError, CoreResult};

/// Tolerance used whenever two model times are compared.
pub const TIME_TOLERANCE: Tolerances = Tolerances {
    abs: 1e-9,
    rel: 1e-12,
};

/// Slack applied before flooring a step ratio so that `30.0 / 0.1` counts 300 steps.
const STEP_SLACK: Real = 1e-9;

pub fn same_time(a: Real, b: Real) -> bool {
    nearly_equal(a, b, TIME_TOLERANCE)
}

/// Number of whole steps of `step_size` that fit in `[from, to]`.
pub fn steps_between(from: Real, to: Real, step_size: Real) -> usize {
    let ratio = (to - from) / step_size;
    if ratio <= 0.0 {
        0
    } else {
        (ratio + STEP_SLACK).floor() as usize
    }
}

/// A fixed-step model-time window `[t_start, t_end]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeGrid {
    t_start: Real,
    t_end: Real,
    step_size: Real,
}

impl TimeGrid {
    pub fn new(t_start: Real, t_end: Real, step_size: Real) -> CoreResult<Self> {
        let invalid = |what| CoreError::InvalidWindow {
            what,
            t_start,
            t_end,
            step_size,
        };
        if !(t_start.is_finite() && t_end.is_finite() && step_size.is_finite()) {
            return Err(invalid("non-finite bound"));
        }
        if step_size <= 0.0 {
            return Err(invalid("step size must be positive"));
        }
        if t_end <= t_start {
            return Err(invalid("t_end must be after t_start"));
        }
        if steps_between(t_start, t_end, step_size) == 0 {
            return Err(invalid("window shorter than one step"));
        }
        Ok(Self {
            t_start,
            t_end,
            step_size,
        })
    }

    pub fn t_start(&self) -> Real {
        self.t_start
    }

    pub fn t_end(&self) -> Real {
        self.t_end
    }

    pub fn step_size(&self) -> Real {
        self.step_size
    }

    /// Integral step count (floor-divided).
    pub fn step_count(&self) -> usize {
        steps_between(self.t_start, self.t_end, self.step_size)
    }

    pub fn time_at(&self, step: usize) -> Real {
        self.t_start + step as Real * self.step_size
    }

    /// Last time actually reached by the grid (`t_end` when the window divides evenly).
    pub fn last_time(&self) -> Real {
        self.time_at(self.step_count())
    }

    /// Every grid time from `t_start` to `last_time()`, inclusive.
    pub fn times(&self) -> impl Iterator<Item = Real> + '_ {
        (0..=self.step_count()).map(move |i| self.time_at(i))
    }

    /// Strictly inside `(t_start, t_end)`.
    pub fn contains_interior(&self, t: Real) -> bool {
        t > self.t_start
            && t < self.t_end
            && !same_time(t, self.t_start)
            && !same_time(t, self.t_end)
    }

    /// Whether `t` is `t_start + k * step_size` for some integer `k`.
    pub fn is_on_grid(&self, t: Real) -> bool {
        let k = ((t - self.t_start) / self.step_size).round();
        same_time(self.t_start + k * self.step_size, t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_count_floors() {
        let grid = TimeGrid::new(0.0, 25.0, 10.0).unwrap();
        assert_eq!(grid.step_count(), 2);
        assert_eq!(grid.last_time(), 20.0);
        assert_eq!(grid.times().collect::<Vec<_>>(), vec![0.0, 10.0, 20.0]);
    }

    #[test]
    fn step_count_tolerates_float_noise() {
        let grid = TimeGrid::new(0.0, 0.3, 0.1).unwrap();
        assert_eq!(grid.step_count(), 3);
    }

    #[test]
    fn rejects_degenerate_windows() {
        assert!(TimeGrid::new(0.0, 0.0, 1.0).is_err());
        assert!(TimeGrid::new(10.0, 0.0, 1.0).is_err());
        assert!(TimeGrid::new(0.0, 10.0, 0.0).is_err());
        assert!(TimeGrid::new(0.0, 5.0, 10.0).is_err());
        assert!(TimeGrid::new(f64::NAN, 5.0, 1.0).is_err());
    }

    #[test]
    fn interior_excludes_bounds() {
        let grid = TimeGrid::new(0.0, 20.0, 10.0).unwrap();
        assert!(!grid.contains_interior(0.0));
        assert!(grid.contains_interior(10.0));
        assert!(!grid.contains_interior(20.0));
        assert!(!grid.contains_interior(-5.0));
    }

    #[test]
    fn grid_membership() {
        let grid = TimeGrid::new(100.0, 400.0, 50.0).unwrap();
        assert!(grid.is_on_grid(250.0));
        assert!(!grid.is_on_grid(260.0));
    }
}
