//! Index-space resampling of fibers onto a fixed number of samples.
//!
//! Samples are spaced evenly over the *indices* of the source polyline, not
//! over its arc length, and every sample snaps to the nearest existing source
//! point. Both endpoints are always kept.

use super::error::{FiberError, FiberResult};

/// Fractional source indices for `target_count` samples over a fiber with
/// `source_point_count` points.
///
/// `position[i] = i * (source_point_count - 1) / (target_count - 1)`. The
/// numerator is multiplied out before dividing, so the last position is
/// exactly `source_point_count - 1` and equal counts give exact integers.
pub fn sample_positions(source_point_count: usize, target_count: usize) -> FiberResult<Vec<f64>> {
    if target_count < 2 {
        return Err(FiberError::SampleCountTooSmall {
            count: target_count,
        });
    }
    if source_point_count == 0 {
        return Err(FiberError::EmptySource);
    }

    let last_source = (source_point_count - 1) as f64;
    let denom = (target_count - 1) as f64;
    Ok((0..target_count)
        .map(|i| (i as f64 * last_source) / denom)
        .collect())
}

/// Source point indices selected by nearest-neighbor rounding of
/// [`sample_positions`]. Ties round away from zero.
pub fn nearest_source_indices(
    source_point_count: usize,
    target_count: usize,
) -> FiberResult<Vec<usize>> {
    let positions = sample_positions(source_point_count, target_count)?;
    let last = source_point_count - 1;
    Ok(positions
        .into_iter()
        .map(|pos| (pos.round() as usize).min(last))
        .collect())
}
