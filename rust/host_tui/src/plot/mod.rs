//! Live plot data: a decimated, bounded copy of the telemetry with a scrolling time axis.

use std::collections::VecDeque;

use el_messages::Sample;

pub mod figure;

/// Only samples whose timestamp is a multiple of this are plotted.
pub const DECIMATION_MS: u32 = 50;
/// Width of the time axis before the first scroll.
pub const INITIAL_SPAN_MS: u32 = 10_000;
/// How far the time axis jumps once data passes its right edge.
pub const SCROLL_STEP_MS: u32 = 20_000;
/// Enough points to fill a whole scrolled window.
pub const CAPACITY: usize = (SCROLL_STEP_MS / DECIMATION_MS) as usize;

/// Default vertical ranges. They grow to include the data.
pub const ANGLE_BOUNDS: [f64; 2] = [0.0, 90.0];
pub const DUTY_BOUNDS: [f64; 2] = [0.0, 100.0];

#[derive(Debug)]
pub struct PlotWindow {
    angles: VecDeque<(f64, f64)>,
    duties: VecDeque<(f64, f64)>,
    x_bounds: [f64; 2],
}

impl Default for PlotWindow {
    fn default() -> Self {
        Self {
            angles: VecDeque::with_capacity(CAPACITY),
            duties: VecDeque::with_capacity(CAPACITY),
            x_bounds: [0.0, f64::from(INITIAL_SPAN_MS)],
        }
    }
}

impl PlotWindow {
    /// Adds a sample if it falls on the decimation grid, and scrolls the time axis if needed.
    pub fn push(&mut self, sample: &Sample) {
        let time = f64::from(sample.time_ms);
        if sample.time_ms % DECIMATION_MS == 0 {
            if self.angles.len() == CAPACITY {
                self.angles.pop_front();
                self.duties.pop_front();
            }
            self.angles.push_back((time, f64::from(sample.angle_deg)));
            self.duties.push_back((time, f64::from(sample.duty_percent)));
        }
        while time > self.x_bounds[1] {
            let right = self.x_bounds[1];
            self.x_bounds = [right, right + f64::from(SCROLL_STEP_MS)];
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub fn x_bounds(&self) -> [f64; 2] {
        self.x_bounds
    }

    pub fn angle_bounds(&self) -> [f64; 2] {
        widen(ANGLE_BOUNDS, &self.angles)
    }

    pub fn duty_bounds(&self) -> [f64; 2] {
        widen(DUTY_BOUNDS, &self.duties)
    }

    /// The angle and duty series, oldest point first.
    pub fn series(&mut self) -> (&[(f64, f64)], &[(f64, f64)]) {
        (self.angles.make_contiguous(), self.duties.make_contiguous())
    }
}

fn widen(bounds: [f64; 2], points: &VecDeque<(f64, f64)>) -> [f64; 2] {
    points
        .iter()
        .fold(bounds, |[low, high], &(_, y)| [low.min(y), high.max(y)])
}
