//! Extractor fan driver with bounded, rate-limited ramping.
//!
//! Drives the fan output toward a requested duty without abrupt jumps,
//! honoring a configurable minimum start duty (motor stiction) and a
//! maximum allowed duty (hardware ceiling). Ramp progression is driven by
//! `tick()` with a caller-supplied monotonic clock, so it advances even
//! when no reading or command arrives for a long interval.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: current duty is written to the LEDC channel via hw_init.
//! On host/test: state is tracked in-memory only.
//!
//! `set_target_percent` is the sole entry point other components use to
//! request a speed — both automatic and manual control funnel through it.
//! `emergency_stop` is the one operation allowed to bypass the ramp.

use log::{info, warn};

use crate::config::SystemConfig;
use crate::drivers::hw_init;
use crate::error::ConfigError;

pub struct FanActuator {
    /// PWM duty currently applied to the output (0..=pwm_max).
    current_speed: u8,
    /// PWM duty the ramp is moving toward (0..=pwm_max).
    target_speed: u8,
    /// Minimum duty that reliably starts the motor from standstill.
    min_start_duty: u8,
    /// Hardware ceiling; all targets and the output are clamped to it.
    pwm_max: u8,
    /// Duty units moved per due tick.
    ramp_step: u8,
    /// Minimum wall-clock spacing between due ticks.
    ramp_interval_ms: u32,
    /// Percent used by [`turn_on_default`](Self::turn_on_default).
    turn_on_default_percent: u8,
    /// Clock value at the last due tick.
    last_tick_ms: u64,
    transitioning: bool,
    powered_on: bool,
    soft_start_enabled: bool,
}

impl FanActuator {
    /// Construct from configuration: output at zero duty, powered off.
    ///
    /// Zero ramp values in the config are clamped up to 1 with a warning
    /// rather than rejected — a controller with no fan is worse than one
    /// that ramps oddly. Runtime reconfiguration via [`configure_ramp`]
    /// rejects them instead.
    ///
    /// [`configure_ramp`]: FanActuator::configure_ramp
    pub fn new(config: &SystemConfig) -> Self {
        if config.ramp_step == 0 || config.ramp_interval_ms == 0 {
            warn!("zero ramp step/interval in config, clamping to 1");
        }
        let mut fan = Self {
            current_speed: 0,
            target_speed: 0,
            min_start_duty: config.min_start_duty.min(config.pwm_max),
            pwm_max: config.pwm_max,
            ramp_step: config.ramp_step.max(1),
            ramp_interval_ms: config.ramp_interval_ms.max(1),
            turn_on_default_percent: config.turn_on_default_percent.min(100),
            last_tick_ms: 0,
            transitioning: false,
            powered_on: false,
            soft_start_enabled: config.soft_start_enabled,
        };
        fan.initialize();
        fan
    }

    /// Reset to zero duty, powered off, not transitioning.
    pub fn initialize(&mut self) {
        self.current_speed = 0;
        self.target_speed = 0;
        self.transitioning = false;
        self.powered_on = false;
        self.apply_duty();
    }

    // ── Configuration ─────────────────────────────────────────

    /// Set the ramp rate: `step` duty units per tick, at most one tick
    /// per `interval_ms`. Non-positive values are rejected and the
    /// previous configuration is retained.
    pub fn configure_ramp(&mut self, step: u8, interval_ms: u32) -> Result<(), ConfigError> {
        if step == 0 {
            return Err(ConfigError::RampStepZero);
        }
        if interval_ms == 0 {
            return Err(ConfigError::RampIntervalZero);
        }
        self.ramp_step = step;
        self.ramp_interval_ms = interval_ms;
        Ok(())
    }

    /// Enable/disable the soft-start floor. `min_start_duty` is clamped
    /// to the current ceiling.
    pub fn configure_soft_start(&mut self, enabled: bool, min_start_duty: u8) {
        self.soft_start_enabled = enabled;
        self.min_start_duty = min_start_duty.min(self.pwm_max);
    }

    /// Set the hardware duty ceiling. Current and target values above the
    /// new ceiling are clamped down immediately.
    pub fn set_max_duty(&mut self, max: u8) {
        self.pwm_max = max;
        if self.target_speed > max {
            self.target_speed = max;
        }
        if self.current_speed > max {
            self.current_speed = max;
            self.apply_duty();
        }
        self.transitioning = self.current_speed != self.target_speed;
    }

    // ── Speed requests ────────────────────────────────────────

    /// Request a speed as a percent of the ceiling. The sole entry point
    /// for both automatic and manual control.
    ///
    /// * `0` always powers off — the soft-start floor applies only to the
    ///   starting duty when powering on, never prevents powering off.
    /// * Values above 100 are clamped, not rejected.
    pub fn set_target_percent(&mut self, percent: u8) {
        let percent = percent.min(100);
        let duty = ((u16::from(percent) * u16::from(self.pwm_max)) / 100) as u8;

        if percent == 0 {
            self.target_speed = 0;
            self.powered_on = false;
        } else {
            if self.soft_start_enabled && !self.powered_on {
                // Off → on: snap the starting duty up to the stiction
                // floor so the motor has enough torque to begin spinning.
                let floor = self.min_start_duty.min(self.pwm_max);
                if self.current_speed < floor {
                    self.current_speed = floor;
                    self.apply_duty();
                }
            }
            self.powered_on = true;
            self.target_speed = duty;
        }

        self.transitioning = self.current_speed != self.target_speed;
    }

    /// Convenience wrapper: run at `percent`.
    pub fn turn_on(&mut self, percent: u8) {
        self.set_target_percent(percent);
    }

    /// Run at the configured default turn-on percent.
    pub fn turn_on_default(&mut self) {
        self.set_target_percent(self.turn_on_default_percent);
    }

    /// Convenience wrapper: ramp down to off.
    pub fn turn_off(&mut self) {
        self.set_target_percent(0);
    }

    // ── Ramp progression ──────────────────────────────────────

    /// Advance the ramp by one bounded step if the interval has elapsed.
    ///
    /// No-op unless `now_ms - last_tick >= ramp_interval_ms`, which also
    /// tolerates a non-advancing clock. Moves `current` toward `target`
    /// by at most `ramp_step`, never overshooting.
    pub fn tick(&mut self, now_ms: u64) {
        if now_ms.saturating_sub(self.last_tick_ms) < u64::from(self.ramp_interval_ms) {
            return;
        }
        self.last_tick_ms = now_ms;

        if self.current_speed == self.target_speed {
            self.transitioning = false;
            return;
        }

        if self.current_speed < self.target_speed {
            self.current_speed = self
                .current_speed
                .saturating_add(self.ramp_step)
                .min(self.target_speed)
                .min(self.pwm_max);
        } else {
            self.current_speed = self
                .current_speed
                .saturating_sub(self.ramp_step)
                .max(self.target_speed);
        }

        self.transitioning = self.current_speed != self.target_speed;
        self.apply_duty();
    }

    /// Unconditional stop: zero duty now, bypassing the ramp limit.
    /// The only operation allowed to violate the rate limit; takes effect
    /// before the next tick.
    pub fn emergency_stop(&mut self) {
        info!("EMERGENCY STOP: fan output forced to zero");
        self.current_speed = 0;
        self.target_speed = 0;
        self.powered_on = false;
        self.transitioning = false;
        self.apply_duty();
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn current_speed(&self) -> u8 {
        self.current_speed
    }

    pub fn target_speed(&self) -> u8 {
        self.target_speed
    }

    pub fn max_duty(&self) -> u8 {
        self.pwm_max
    }

    pub fn is_powered(&self) -> bool {
        self.powered_on
    }

    pub fn is_transitioning(&self) -> bool {
        self.transitioning
    }

    /// Human-readable one-line status for logs and diagnostics.
    pub fn status(&self) -> String {
        format!(
            "speed={}/{} max={} powered={} transitioning={} soft_start={}",
            self.current_speed,
            self.target_speed,
            self.pwm_max,
            self.powered_on,
            self.transitioning,
            self.soft_start_enabled,
        )
    }

    // ── Internal ──────────────────────────────────────────────

    /// Push the current duty out to the PWM channel (no-op on host).
    fn apply_duty(&self) {
        hw_init::ledc_set(hw_init::LEDC_CH_EXTRACTOR, self.current_speed);
    }
}
