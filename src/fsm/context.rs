//! Shared mutable context threaded through every mode handler.
//!
//! `ArbiterContext` is the single struct the mode handlers read from and
//! write to: the most recent gas reading, the active threshold, the
//! manual-window deadline, the caller-supplied clock, and the pending
//! fan-target request produced by the handlers. There is no process-wide
//! mutable state anywhere else.

use serde::Serialize;

use crate::config::SystemConfig;

// ---------------------------------------------------------------------------
// Gas reading (produced by the radio layer, consumed once per arrival)
// ---------------------------------------------------------------------------

/// A point-in-time gas measurement from the remote sensor node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GasReading {
    /// Gas concentration (parts per million). `>= 0` guaranteed upstream.
    pub ppm: f32,
    /// Rs/Ro sensor ratio as computed by the sensor node.
    pub ratio: f32,
    /// Raw ADC value from the MQ sensor (0 – 1023 on the Nano node).
    pub raw: u16,
    /// Monotonic arrival time (ms since boot of this node).
    pub timestamp_ms: u64,
}

// ---------------------------------------------------------------------------
// ArbiterContext
// ---------------------------------------------------------------------------

/// The shared context passed to every mode handler function.
pub struct ArbiterContext {
    /// Caller-supplied monotonic clock, refreshed before every FSM call.
    /// The core never reads a global clock.
    pub now_ms: u64,

    /// Active automatic-mode threshold (ppm).
    pub threshold_ppm: f32,

    /// Most recent reading, retained across mode changes so reversion to
    /// automatic control can re-derive a target without fresh input.
    pub last_reading: Option<GasReading>,

    /// Deadline for the manual window; `Some` only while manually active.
    pub manual_until_ms: Option<u64>,

    /// Duration of the manual window (configuration, not policy).
    pub manual_window_ms: u64,

    /// Fan target request produced by the handlers this call, drained by
    /// the arbiter and forwarded to the actuator.
    pub requested_percent: Option<u8>,
}

impl ArbiterContext {
    /// Create a new context from configuration.
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            now_ms: 0,
            threshold_ppm: config.gas_threshold_ppm,
            last_reading: None,
            manual_until_ms: None,
            manual_window_ms: config.manual_window_ms,
            requested_percent: None,
        }
    }

    /// Milliseconds left in the manual window, if one is running.
    pub fn manual_remaining_ms(&self) -> Option<u64> {
        self.manual_until_ms
            .map(|until| until.saturating_sub(self.now_ms))
    }
}
