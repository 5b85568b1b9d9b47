//! Outbound application events and the status report payload.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other
//! side decide what to do with them — log to serial, publish over MQTT,
//! both.

use serde::Serialize;

use crate::error::CommandError;
use crate::fsm::context::GasReading;
use crate::fsm::ModeId;

use super::commands::Command;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppEvent {
    /// The application service has started (carries initial mode).
    Started(ModeId),

    /// The control mode changed.
    ModeChanged { from: ModeId, to: ModeId },

    /// A new fan target was applied (percent requested, duty it maps to).
    FanTargetChanged { percent: u8, duty: u8 },

    /// A gas reading was accepted into the controller.
    ReadingAccepted(GasReading),

    /// An external command was parsed and applied.
    CommandAccepted(Command),

    /// An external command was rejected; state is unchanged.
    CommandRejected(CommandError),

    /// The automatic threshold changed (new value in ppm).
    ThresholdChanged(f32),

    /// Emergency stop: fan forced to zero, automatic control disarmed.
    EmergencyStop,
}

// ───────────────────────────────────────────────────────────────
// Status report (serialized to JSON on the status topic)
// ───────────────────────────────────────────────────────────────

/// A point-in-time status snapshot, serialized to JSON for the status
/// topic. Field names are part of the deployed payload contract.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub gateway_id: &'static str,
    pub mode: &'static str,
    pub threshold_ppm: f32,
    /// Milliseconds left in the manual window; absent outside manual mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_remaining_ms: Option<u64>,
    /// Absent until the first reading arrives.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor: Option<SensorStatus>,
    pub fan: FanStatus,
    pub uptime_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SensorStatus {
    pub ppm: f32,
    pub ratio: f32,
    pub raw: u16,
    /// Local threshold verdict, re-derived from the configured threshold
    /// rather than trusted from the sensor node.
    pub alert: bool,
    /// Milliseconds since the reading was taken.
    pub age_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct FanStatus {
    pub current_duty: u8,
    pub target_duty: u8,
    pub max_duty: u8,
    pub powered: bool,
    pub transitioning: bool,
}

/// Wire name for a mode, used in the status payload and logs.
pub fn mode_name(mode: ModeId) -> &'static str {
    match mode {
        ModeId::Auto => "auto",
        ModeId::ManualActive => "manual",
        ModeId::ManualIdle => "manual_idle",
    }
}
