//! Threshold policy for automatic extraction control.
//!
//! Any exceedance engages the fan at a 50% floor (low duty moves too
//! little air to extract anything) and scales linearly to full speed as
//! the exceedance grows toward 500 ppm over threshold.

/// Span of exceedance (ppm over threshold) mapped onto the speed range.
const EXCESS_SPAN_PPM: f32 = 500.0;

/// Minimum effective extraction speed once engaged (percent).
const FLOOR_PERCENT: f32 = 50.0;

/// Map a gas reading onto a fan target percent.
///
/// * `ppm <= threshold` → `0` (fan off).
/// * otherwise `excess = ppm - threshold` is mapped linearly from
///   `[0, 500]` onto `[50, 100]` and clamped, so anything beyond
///   500 ppm over threshold saturates at full speed.
pub fn auto_target_percent(ppm: f32, threshold_ppm: f32) -> u8 {
    if ppm <= threshold_ppm {
        return 0;
    }
    let excess = ppm - threshold_ppm;
    let percent = FLOOR_PERCENT + (excess / EXCESS_SPAN_PPM) * (100.0 - FLOOR_PERCENT);
    percent.clamp(FLOOR_PERCENT, 100.0) as u8
}
