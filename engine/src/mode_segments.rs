//! Contiguous transport mode segments built from classifier samples.
//!
//! Samples must arrive in non-decreasing time order. The segment list is owned
//! by the active trip session; the last segment is extended in place while the
//! classifier keeps reporting the same mode.

use serde::Serialize;

use crate::models::{ModeSegment, TransportMode, TransportModeSegment};

/// Applies one classifier sample.
pub fn observe(segments: &mut Vec<ModeSegment>, mode: TransportMode, now_ms: i64) {
    if let Some(last) = segments.last_mut() {
        last.end_time_ms = now_ms;
        if last.mode == mode {
            return;
        }
        tracing::debug!("mode change {:?} -> {:?} at {now_ms}", last.mode, mode);
    }
    segments.push(ModeSegment::starting_at(mode, now_ms));
}

/// Freezes the running segment when the trip ends.
pub fn close_last_segment(segments: &mut [ModeSegment], now_ms: i64) {
    if let Some(last) = segments.last_mut() {
        last.end_time_ms = now_ms.max(last.start_time_ms);
    }
}

/// Total time per mode, in order of first appearance.
fn durations_by_mode(segments: &[ModeSegment]) -> Vec<(TransportMode, i64)> {
    let mut totals: Vec<(TransportMode, i64)> = Vec::new();
    for segment in segments {
        match totals.iter_mut().find(|(mode, _)| *mode == segment.mode) {
            Some((_, total)) => *total += segment.duration_ms(),
            None => totals.push((segment.mode, segment.duration_ms())),
        }
    }
    totals
}

/// Mode with the largest cumulative duration. Walking for an empty trip;
/// ties go to the mode that appeared first.
pub fn dominant_mode(segments: &[ModeSegment]) -> TransportMode {
    durations_by_mode(segments)
        .into_iter()
        .fold(None::<(TransportMode, i64)>, |best, (mode, total)| match best {
            Some((_, best_total)) if best_total >= total => best,
            _ => Some((mode, total)),
        })
        .map(|(mode, _)| mode)
        .unwrap_or(TransportMode::Walking)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeDistance {
    pub mode: String,
    pub distance_meters: f64,
    pub duration_seconds: i64,
}

/// Splits the trip distance between modes by their share of the total time.
///
/// When no time has elapsed at all (every segment is a single sample) the
/// distance is shared evenly between the observed modes.
pub fn to_time_weighted_breakdown(segments: &[ModeSegment], total_distance_meters: f64) -> Vec<ModeDistance> {
    let totals = durations_by_mode(segments);
    if totals.is_empty() {
        return Vec::new();
    }
    let total_ms: i64 = totals.iter().map(|(_, ms)| ms).sum();
    let mode_count = totals.len() as f64;

    totals
        .into_iter()
        .map(|(mode, ms)| {
            let share = if total_ms > 0 {
                ms as f64 / total_ms as f64
            } else {
                1.0 / mode_count
            };
            ModeDistance {
                mode: mode.dict_value().to_string(),
                distance_meters: total_distance_meters * share,
                duration_seconds: ms / 1000,
            }
        })
        .collect()
}

/// Per-segment upload form: distance in kilometres, duration in seconds.
pub fn to_transport_mode_segments(segments: &[ModeSegment], total_distance_meters: f64) -> Vec<TransportModeSegment> {
    if segments.is_empty() {
        return Vec::new();
    }
    let total_ms: i64 = segments.iter().map(ModeSegment::duration_ms).sum();
    let segment_count = segments.len() as f64;

    segments
        .iter()
        .map(|segment| {
            let ratio = if total_ms > 0 {
                segment.duration_ms() as f64 / total_ms as f64
            } else {
                1.0 / segment_count
            };
            TransportModeSegment {
                mode: segment.mode.dict_value().to_string(),
                sub_distance: total_distance_meters / 1000.0 * ratio,
                sub_duration: segment.duration_ms() / 1000,
            }
        })
        .collect()
}
