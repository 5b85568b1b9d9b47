//! System configuration parameters
//!
//! All tunable parameters for the gas-extraction controller. Values can
//! be overridden at runtime through the `set_umbral` command (threshold)
//! or at construction time by the wiring layer.

use serde::{Deserialize, Serialize};

/// Identity string reported in every outbound status payload.
pub const GATEWAY_ID: &str = "esp32-central-88";

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Gas threshold ---
    /// Gas concentration (ppm) above which the extractor engages in
    /// automatic mode.
    pub gas_threshold_ppm: f32,

    // --- Extractor fan ---
    /// Hardware PWM ceiling for the fan output (0-255).
    pub pwm_max: u8,
    /// Duty units added/removed per ramp tick.
    pub ramp_step: u8,
    /// Minimum wall-clock spacing between ramp ticks (milliseconds).
    pub ramp_interval_ms: u32,
    /// Snap the starting duty up to `min_start_duty` when powering on.
    pub soft_start_enabled: bool,
    /// Minimum PWM duty that reliably starts the motor from standstill.
    pub min_start_duty: u8,
    /// Percent used by `turn_on` when the caller gives no explicit value.
    pub turn_on_default_percent: u8,

    // --- Manual override ---
    /// How long a manual activation holds before reverting to automatic
    /// control (milliseconds).
    pub manual_window_ms: u64,
    /// Percent used by `extractor_on` when no explicit value is given.
    pub manual_default_percent: u8,

    // --- Timing ---
    /// Control loop interval (milliseconds) — drives fan ramp progression
    /// and the manual-window expiry poll.
    pub control_loop_interval_ms: u32,
    /// Status report interval (seconds).
    pub telemetry_interval_secs: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Threshold
            gas_threshold_ppm: 500.0,

            // Fan
            pwm_max: 255,
            ramp_step: 5,
            ramp_interval_ms: 50,
            soft_start_enabled: true,
            min_start_duty: 100,
            turn_on_default_percent: 50,

            // Manual override
            manual_window_ms: 60_000, // 1 minute
            manual_default_percent: 80,

            // Timing
            control_loop_interval_ms: 50, // matches the ramp interval
            telemetry_interval_secs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = SystemConfig::default();
        assert!(c.gas_threshold_ppm > 0.0);
        assert!(c.ramp_step > 0);
        assert!(c.ramp_interval_ms > 0);
        assert!(c.min_start_duty <= c.pwm_max);
        assert!(c.manual_default_percent > 0 && c.manual_default_percent <= 100);
        assert!(c.turn_on_default_percent > 0 && c.turn_on_default_percent <= 100);
        assert!(c.manual_window_ms > 0);
        assert!(c.control_loop_interval_ms > 0);
    }

    #[test]
    fn serde_roundtrip() {
        let c = SystemConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: SystemConfig = serde_json::from_str(&json).unwrap();
        assert!((c.gas_threshold_ppm - c2.gas_threshold_ppm).abs() < 0.001);
        assert_eq!(c.pwm_max, c2.pwm_max);
        assert_eq!(c.manual_window_ms, c2.manual_window_ms);
    }

    #[test]
    fn timing_ratios_make_sense() {
        let c = SystemConfig::default();
        assert!(
            c.control_loop_interval_ms <= c.ramp_interval_ms,
            "the loop must run at least as often as the ramp wants ticks"
        );
        assert!(
            u64::from(c.control_loop_interval_ms) < c.manual_window_ms,
            "expiry poll must be far finer than the manual window"
        );
    }
}
