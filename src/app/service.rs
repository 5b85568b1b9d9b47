//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the control arbiter and the fan actuator and
//! orchestrates them: readings, commands, and time all enter here, fan
//! targets and events leave here. All I/O flows through the port traits
//! injected at call sites, making the entire service testable with a
//! mock sink.
//!
//! ```text
//!  readings ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!  commands ──▶ │        AppService        │
//!    tick   ──▶ │  ControlArbiter · Fan    │ ──▶ PWM duty
//!               └──────────────────────────┘
//! ```

use log::{info, warn};

use crate::config::{SystemConfig, GATEWAY_ID};
use crate::control::arbiter::ControlArbiter;
use crate::drivers::fan::FanActuator;
use crate::error::CommandError;
use crate::fsm::context::GasReading;
use crate::fsm::ModeId;

use super::commands::{self, Command};
use super::events::{mode_name, AppEvent, FanStatus, SensorStatus, StatusReport};
use super::ports::EventSink;

/// The application service orchestrates all domain logic.
pub struct AppService {
    arbiter: ControlArbiter,
    fan: FanActuator,
    tick_count: u64,
}

impl AppService {
    /// Construct the service: arbiter in automatic mode, fan off.
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            arbiter: ControlArbiter::new(config),
            fan: FanActuator::new(config),
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Announce startup through the sink.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Started(self.arbiter.mode()));
        info!("controller started in {} mode", mode_name(self.arbiter.mode()));
    }

    // ── Inputs ────────────────────────────────────────────────

    /// Feed a decoded gas reading into the controller.
    pub fn handle_reading(&mut self, reading: GasReading, now_ms: u64, sink: &mut impl EventSink) {
        let prev = self.arbiter.mode();
        sink.emit(&AppEvent::ReadingAccepted(reading));

        if let Some(percent) = self.arbiter.handle_reading(reading, now_ms) {
            self.apply_target(percent, sink);
        }
        self.emit_mode_change(prev, sink);
    }

    /// Parse and apply one raw command line. Rejected commands leave all
    /// state untouched and are reported through the sink and the return
    /// value.
    pub fn handle_command(
        &mut self,
        raw: &str,
        now_ms: u64,
        sink: &mut impl EventSink,
    ) -> Result<(), CommandError> {
        let cmd = match commands::parse(raw) {
            Ok(cmd) => cmd,
            Err(e) => {
                warn!("rejected command {:?}: {}", raw, e);
                sink.emit(&AppEvent::CommandRejected(e));
                return Err(e);
            }
        };

        let prev = self.arbiter.mode();
        match cmd {
            Command::TurnOnManual { percent } => {
                let percent = self.arbiter.manual_on(percent, now_ms);
                self.apply_target(percent, sink);
            }
            Command::TurnOffManual => {
                self.arbiter.manual_off(now_ms);
                self.apply_target(0, sink);
            }
            Command::EnableAuto => {
                if let Some(percent) = self.arbiter.set_auto(now_ms) {
                    self.apply_target(percent, sink);
                }
            }
            Command::DisableAuto => {
                self.arbiter.set_manual_idle(now_ms);
            }
            Command::SetThreshold(ppm) => {
                if let Err(e) = self.arbiter.set_threshold(ppm, now_ms) {
                    sink.emit(&AppEvent::CommandRejected(e));
                    return Err(e);
                }
                sink.emit(&AppEvent::ThresholdChanged(ppm));
                // In automatic mode the new threshold takes effect
                // immediately, not on the next reading.
                if let Some(percent) = self.arbiter.poll(now_ms) {
                    self.apply_target(percent, sink);
                }
            }
        }

        sink.emit(&AppEvent::CommandAccepted(cmd));
        self.emit_mode_change(prev, sink);
        Ok(())
    }

    /// One pass of the serialized control loop: drive manual-window
    /// expiry and advance the fan ramp.
    pub fn tick(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        self.tick_count += 1;
        let prev = self.arbiter.mode();

        if let Some(percent) = self.arbiter.poll(now_ms) {
            self.apply_target(percent, sink);
        }
        self.emit_mode_change(prev, sink);

        self.fan.tick(now_ms);
    }

    /// Unconditional stop: zero the fan now and disarm automatic control
    /// so nothing restarts it until an operator re-enables a mode.
    pub fn emergency_stop(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        let prev = self.arbiter.mode();
        self.fan.emergency_stop();
        self.arbiter.disarm(now_ms);
        sink.emit(&AppEvent::EmergencyStop);
        self.emit_mode_change(prev, sink);
    }

    // ── Queries ───────────────────────────────────────────────

    /// Build the status payload published on the status topic.
    pub fn build_status(&self, now_ms: u64) -> StatusReport {
        let snap = self.arbiter.snapshot(now_ms);
        StatusReport {
            gateway_id: GATEWAY_ID,
            mode: mode_name(snap.mode),
            threshold_ppm: snap.threshold_ppm,
            manual_remaining_ms: snap.manual_remaining_ms,
            sensor: snap.last_reading.map(|r| SensorStatus {
                ppm: r.ppm,
                ratio: r.ratio,
                raw: r.raw,
                alert: r.ppm > snap.threshold_ppm,
                age_ms: now_ms.saturating_sub(r.timestamp_ms),
            }),
            fan: FanStatus {
                current_duty: self.fan.current_speed(),
                target_duty: self.fan.target_speed(),
                max_duty: self.fan.max_duty(),
                powered: self.fan.is_powered(),
                transitioning: self.fan.is_transitioning(),
            },
            uptime_ms: now_ms,
        }
    }

    pub fn mode(&self) -> ModeId {
        self.arbiter.mode()
    }

    pub fn fan(&self) -> &FanActuator {
        &self.fan
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // ── Internal ──────────────────────────────────────────────

    fn apply_target(&mut self, percent: u8, sink: &mut impl EventSink) {
        let before = self.fan.target_speed();
        self.fan.set_target_percent(percent);
        let duty = self.fan.target_speed();
        if duty != before {
            sink.emit(&AppEvent::FanTargetChanged { percent, duty });
        }
    }

    fn emit_mode_change(&self, prev: ModeId, sink: &mut impl EventSink) {
        let now = self.arbiter.mode();
        if now != prev {
            info!("mode {} -> {}", mode_name(prev), mode_name(now));
            sink.emit(&AppEvent::ModeChanged { from: prev, to: now });
        }
    }
}
