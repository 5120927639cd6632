use std::ops::Range;

/// A line needs at least two points, so every intermediate step gets two.
pub const MIN_POINTS_PER_STEP: i64 = 2;

/// Number of overview points assigned to one step when the route provider
/// did not send per-step polylines.
///
/// The last step always takes whatever is left (`total_points - current_point_index`),
/// which keeps the sum over all steps equal to `total_points` regardless of the
/// rounding or the two-point floor applied to earlier steps.
///
/// Callers must check `total_step_distance > 0` and that at least two overview
/// points exist before using this; see [`partition_overview`].
pub fn allocate_points_per_step(
    total_points: i64,
    step_distance: f64,
    total_step_distance: f64,
    is_last_step: bool,
    current_point_index: i64,
) -> i64 {
    if is_last_step {
        return total_points - current_point_index;
    }
    let ratio = step_distance / total_step_distance;
    let raw = (total_points as f64 * ratio).floor() as i64;
    raw.max(MIN_POINTS_PER_STEP)
}

/// Splits `0..total_points` into one contiguous range per step.
///
/// Returns `None` when proportional allocation does not apply (fewer than two
/// points, no steps, or a non-positive total step distance); the caller then
/// draws the overview as a single polyline. Ranges are clamped to the overview,
/// so late steps may receive an empty range when earlier steps consumed
/// everything through the two-point floor.
pub fn partition_overview(total_points: usize, step_distances: &[f64]) -> Option<Vec<Range<usize>>> {
    if total_points < 2 || step_distances.is_empty() {
        return None;
    }
    let total_step_distance: f64 = step_distances.iter().sum();
    if !(total_step_distance > 0.0) || !total_step_distance.is_finite() {
        return None;
    }

    let last = step_distances.len() - 1;
    let mut index = 0usize;
    let mut ranges = Vec::with_capacity(step_distances.len());

    for (step_idx, distance) in step_distances.iter().enumerate() {
        let allocated = allocate_points_per_step(
            total_points as i64,
            *distance,
            total_step_distance,
            step_idx == last,
            index as i64,
        );
        let end = (index as i64 + allocated.max(0)).min(total_points as i64) as usize;
        tracing::debug!(
            "fallback step {step_idx}: distance={distance:.0}m allocated={allocated} range={index}..{end}"
        );
        ranges.push(index..end);
        index = end;
    }

    Some(ranges)
}
