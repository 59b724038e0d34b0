//! "Nice number" tick placement used to size the bin that zero
//! concentrations fall into.

const DEFAULT_STEPS: [f64; 10] = [1.0, 1.5, 2.0, 2.5, 3.0, 4.0, 5.0, 6.0, 8.0, 10.0];
const MIN_TICKS: usize = 2;
const OFFSET_THRESHOLD: f64 = 100.0;

#[derive(Debug, Clone)]
pub struct MaxNLocator {
    bins: usize,
    extended_steps: Vec<f64>,
}

impl MaxNLocator {
    pub fn new(bins: usize) -> Self {
        Self {
            bins: bins.max(1),
            extended_steps: staircase(&DEFAULT_STEPS),
        }
    }

    /// At most `bins + 1` evenly spaced round values covering `[vmin, vmax]`.
    pub fn tick_values(&self, vmin: f64, vmax: f64) -> Vec<f64> {
        let (vmin, vmax) = nonsingular(vmin, vmax, 1e-13, 1e-14);
        self.raw_ticks(vmin, vmax)
    }

    /// One tick interval below the first tick: strictly below `vmin`.
    pub fn sentinel_below(&self, vmin: f64, vmax: f64) -> f64 {
        let ticks = self.tick_values(vmin, vmax);
        match ticks.as_slice() {
            [first, second, ..] => first - (second - first),
            [first] => first - 1.0,
            [] => vmin - 1.0,
        }
    }

    fn raw_ticks(&self, vmin: f64, vmax: f64) -> Vec<f64> {
        let (scale, offset) = scale_range(vmin, vmax, self.bins);
        let low_bound = vmin - offset;
        let high_bound = vmax - offset;
        let steps = self
            .extended_steps
            .iter()
            .map(|step| step * scale)
            .collect::<Vec<_>>();
        let raw_step = (high_bound - low_bound) / self.bins as f64;
        let first_large = steps
            .iter()
            .position(|step| *step >= raw_step)
            .unwrap_or(steps.len() - 1);

        let mut ticks = Vec::new();
        for &step in steps[..=first_large].iter().rev() {
            let best_vmin = (low_bound / step).floor() * step;
            let edge = EdgeInteger::new(step, offset);
            let low = edge.le(low_bound - best_vmin) as i64;
            let high = edge.ge(high_bound - best_vmin) as i64;
            ticks = (low..=high)
                .map(|n| n as f64 * step + best_vmin)
                .collect::<Vec<_>>();
            let visible = ticks
                .iter()
                .filter(|tick| **tick <= high_bound && **tick >= low_bound)
                .count();
            if visible >= MIN_TICKS {
                break;
            }
        }
        ticks.into_iter().map(|tick| tick + offset).collect()
    }
}

fn staircase(steps: &[f64]) -> Vec<f64> {
    let mut extended = steps[..steps.len() - 1]
        .iter()
        .map(|step| 0.1 * step)
        .collect::<Vec<_>>();
    extended.extend_from_slice(steps);
    extended.push(10.0 * steps[1]);
    extended
}

fn scale_range(vmin: f64, vmax: f64, bins: usize) -> (f64, f64) {
    let span = (vmax - vmin).abs();
    let mean = (vmax + vmin) / 2.0;
    let offset = if mean.abs() / span < OFFSET_THRESHOLD {
        0.0
    } else {
        10f64.powf(mean.abs().log10().floor()).copysign(mean)
    };
    let scale = 10f64.powf((span / bins as f64).log10().floor());
    (scale, offset)
}

/// Widens an empty or non-finite interval so ticks can be placed on it.
fn nonsingular(vmin: f64, vmax: f64, expander: f64, tiny: f64) -> (f64, f64) {
    if !vmin.is_finite() || !vmax.is_finite() {
        return (-expander, expander);
    }
    let (mut low, mut high) = if vmax < vmin { (vmax, vmin) } else { (vmin, vmax) };
    let max_abs = low.abs().max(high.abs());
    if max_abs < (1e6 / tiny) * f64::MIN_POSITIVE {
        low = -expander;
        high = expander;
    } else if high - low <= max_abs * tiny {
        if high == 0.0 && low == 0.0 {
            low = -expander;
            high = expander;
        } else {
            low -= expander * low.abs();
            high += expander * high.abs();
        }
    }
    (low, high)
}

struct EdgeInteger {
    step: f64,
    offset: f64,
}

impl EdgeInteger {
    fn new(step: f64, offset: f64) -> Self {
        Self {
            step,
            offset: offset.abs(),
        }
    }

    fn close_to(&self, ms: f64, edge: f64) -> bool {
        let tolerance = if self.offset > 0.0 {
            let digits = (self.offset / self.step).log10();
            10f64.powf(digits - 12.0).max(1e-10).min(0.4999)
        } else {
            1e-10
        };
        (ms - edge).abs() < tolerance
    }

    /// Largest n with n * step <= x.
    fn le(&self, x: f64) -> f64 {
        let (quotient, remainder) = floor_divmod(x, self.step);
        if self.close_to(remainder / self.step, 1.0) {
            quotient + 1.0
        } else {
            quotient
        }
    }

    /// Smallest n with n * step >= x.
    fn ge(&self, x: f64) -> f64 {
        let (quotient, remainder) = floor_divmod(x, self.step);
        if self.close_to(remainder / self.step, 0.0) {
            quotient
        } else {
            quotient + 1.0
        }
    }
}

fn floor_divmod(x: f64, step: f64) -> (f64, f64) {
    let remainder = x.rem_euclid(step);
    (((x - remainder) / step).round(), remainder)
}
