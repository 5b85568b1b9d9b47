//! Automatic/manual control arbiter.
//!
//! Owns the mode machine, the threshold, and the most recent reading, and
//! turns readings, operator requests, and the passage of time into fan
//! target requests. The arbiter never touches the actuator itself — the
//! application service forwards the returned percents — and it never
//! reads a clock: `now_ms` comes in on every call.

use log::{info, warn};

use crate::config::SystemConfig;
use crate::error::CommandError;
use crate::fsm::context::{ArbiterContext, GasReading};
use crate::fsm::states::build_mode_table;
use crate::fsm::{ModeId, ModeMachine};

/// Upper bound for operator-supplied thresholds (ppm). MQ-class sensors
/// saturate far below this; anything larger is a mistake, not a request.
const MAX_THRESHOLD_PPM: f32 = 10_000.0;

/// Read-only view of the arbiter for status reporting.
#[derive(Debug, Clone, Copy)]
pub struct ArbiterSnapshot {
    pub mode: ModeId,
    pub threshold_ppm: f32,
    pub manual_remaining_ms: Option<u64>,
    pub last_reading: Option<GasReading>,
}

/// The control arbiter.
pub struct ControlArbiter {
    machine: ModeMachine,
    ctx: ArbiterContext,
    manual_default_percent: u8,
}

impl ControlArbiter {
    /// Construct the arbiter in automatic mode.
    pub fn new(config: &SystemConfig) -> Self {
        let mut ctx = ArbiterContext::new(config);
        let mut machine = ModeMachine::new(build_mode_table(), ModeId::Auto);
        machine.start(&mut ctx);
        Self {
            machine,
            ctx,
            manual_default_percent: config.manual_default_percent,
        }
    }

    // ── Inputs ────────────────────────────────────────────────

    /// Feed a new gas reading. Returns the fan target request this
    /// reading produced, if any (none while manually overridden).
    pub fn handle_reading(&mut self, reading: GasReading, now_ms: u64) -> Option<u8> {
        self.ctx.now_ms = now_ms;
        self.ctx.last_reading = Some(reading);
        self.machine.poll(&mut self.ctx);
        self.ctx.requested_percent.take()
    }

    /// Time-only poll: drives manual-window expiry and keeps the
    /// automatic target derived from the stored reading.
    pub fn poll(&mut self, now_ms: u64) -> Option<u8> {
        self.ctx.now_ms = now_ms;
        self.machine.poll(&mut self.ctx);
        self.ctx.requested_percent.take()
    }

    // ── Operator requests ─────────────────────────────────────

    /// `extractor_on[:percent]` — start (or refresh) a manual window and
    /// return the percent to forward to the fan. `None` uses the
    /// configured default; values over 100 are clamped.
    pub fn manual_on(&mut self, percent: Option<u8>, now_ms: u64) -> u8 {
        let percent = percent.unwrap_or(self.manual_default_percent).min(100);
        self.ctx.now_ms = now_ms;
        self.ctx.manual_until_ms = Some(now_ms.saturating_add(self.ctx.manual_window_ms));
        self.machine.force_transition(ModeId::ManualActive, &mut self.ctx);
        self.ctx.requested_percent = None;
        info!("manual extraction at {}% for {}ms", percent, self.ctx.manual_window_ms);
        percent
    }

    /// `extractor_off` — stop the fan and leave automatic control
    /// disabled (the original controller's behavior from any mode).
    /// Returns the 0% to forward.
    pub fn manual_off(&mut self, now_ms: u64) -> u8 {
        self.ctx.now_ms = now_ms;
        self.machine.force_transition(ModeId::ManualIdle, &mut self.ctx);
        self.ctx.requested_percent = None;
        0
    }

    /// `modo_auto_on` — return to automatic control, re-deriving the
    /// target from the stored reading immediately.
    pub fn set_auto(&mut self, now_ms: u64) -> Option<u8> {
        self.ctx.now_ms = now_ms;
        self.machine.force_transition(ModeId::Auto, &mut self.ctx);
        self.ctx.requested_percent.take()
    }

    /// `modo_auto_off` — disable automatic control without changing the
    /// fan's current request.
    pub fn set_manual_idle(&mut self, now_ms: u64) {
        self.ctx.now_ms = now_ms;
        self.machine.force_transition(ModeId::ManualIdle, &mut self.ctx);
        self.ctx.requested_percent = None;
    }

    /// `set_umbral:<value>` — update the automatic threshold. Rejected
    /// values leave the previous threshold in place.
    pub fn set_threshold(&mut self, ppm: f32, now_ms: u64) -> Result<(), CommandError> {
        if !ppm.is_finite() || ppm <= 0.0 || ppm > MAX_THRESHOLD_PPM {
            warn!("rejected threshold {}", ppm);
            return Err(CommandError::ThresholdOutOfRange(ppm));
        }
        self.ctx.now_ms = now_ms;
        self.ctx.threshold_ppm = ppm;
        info!("threshold set to {:.1} ppm", ppm);
        Ok(())
    }

    /// Drop straight to `ManualIdle` without touching the fan request.
    /// Used by the emergency-stop path so automatic control cannot
    /// restart the fan until the operator re-enables it.
    pub fn disarm(&mut self, now_ms: u64) {
        self.set_manual_idle(now_ms);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn mode(&self) -> ModeId {
        self.machine.current_mode()
    }

    pub fn threshold_ppm(&self) -> f32 {
        self.ctx.threshold_ppm
    }

    pub fn last_reading(&self) -> Option<GasReading> {
        self.ctx.last_reading
    }

    /// Read-only snapshot for status reporting.
    pub fn snapshot(&self, now_ms: u64) -> ArbiterSnapshot {
        let manual_remaining_ms = match self.machine.current_mode() {
            ModeId::ManualActive => self
                .ctx
                .manual_until_ms
                .map(|until| until.saturating_sub(now_ms)),
            _ => None,
        };
        ArbiterSnapshot {
            mode: self.machine.current_mode(),
            threshold_ppm: self.ctx.threshold_ppm,
            manual_remaining_ms,
            last_reading: self.ctx.last_reading,
        }
    }
}
