use ndarray::Array4;

use super::ticks::MaxNLocator;
use crate::common::constants::TICK_BIN_COUNT;

/// Log10-scaled concentrations with zero cells pinned to `sentinel`.
#[derive(Debug, Clone)]
pub struct LogField {
    pub values: Array4<f64>,
    pub sentinel: f64,
}

/// Takes `log10` of every cell and replaces the `-inf` produced by zero
/// concentrations with a finite value one tick interval below the smallest
/// finite logarithm, so zero cells fall under the lowest contour band.
pub fn log10_remap(concentrations: &Array4<f64>) -> LogField {
    let mut values = concentrations.mapv(f64::log10);
    let (min, max) = values
        .iter()
        .copied()
        .filter(|value| value.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), value| {
            (low.min(value), high.max(value))
        });
    let (min, max) = if min.is_finite() { (min, max) } else { (f64::NAN, f64::NAN) };

    let sentinel = MaxNLocator::new(TICK_BIN_COUNT).sentinel_below(min, max);
    values.mapv_inplace(|value| {
        if value == f64::NEG_INFINITY {
            sentinel
        } else {
            value
        }
    });
    LogField { values, sentinel }
}
