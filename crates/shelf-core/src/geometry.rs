//! Pure geometry queries over footprints and segment boundaries.
//!
//! All lengths are in metres. These functions hold no state and never
//! touch the arena; the planogram-level queries in
//! [`Planogram`](crate::Planogram) are built from them.

/// Percentage (0–100) of the footprint `[left, right)` lying inside
/// `[seg_left, seg_right)`.
///
/// The footprint is clamped to the segment bounds before measuring.
/// A zero-width (or inverted) footprint has no measurable share and
/// returns 0.
pub fn overlap_percentage(left: f64, right: f64, seg_left: f64, seg_right: f64) -> f64 {
    let width = right - left;
    if width.is_nan() || width <= 0.0 {
        return 0.0;
    }
    let overlap = (right.min(seg_right) - left.max(seg_left)).max(0.0);
    overlap / width * 100.0
}

/// Whether the footprint `[left, right)` spans `boundary`.
///
/// Both sides of the comparison carry `tolerance`, so an item that only
/// touches the boundary through floating-point noise is not reported.
pub fn crosses_boundary(left: f64, right: f64, boundary: f64, tolerance: f64) -> bool {
    left < boundary - tolerance && right > boundary + tolerance
}

/// Quantize a Y coordinate to a shelf level with the given step.
///
/// Two positions are on the same level when their quantized values are
/// equal. With `step = 0.001` this is millimetre rounding.
pub fn shelf_level(y: f64, step: f64) -> i64 {
    (y / step).round() as i64
}

/// Days of supply: `capacity / movement * 7`.
///
/// Returns `None` ("not applicable") when either input is not positive,
/// which callers treat as effectively infinite.
pub fn days_of_supply(capacity: f64, movement: f64) -> Option<f64> {
    if movement > 0.0 && capacity > 0.0 {
        Some(capacity / movement * 7.0)
    } else {
        None
    }
}
