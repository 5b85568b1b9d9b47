//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the logger (UART / USB-CDC in production). The MQTT adapter publishes
//! the status payload separately; this sink is the always-on local trace.

use log::{info, warn};

use crate::app::events::{mode_name, AppEvent};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(mode) => {
                info!("START | mode={}", mode_name(*mode));
            }
            AppEvent::ModeChanged { from, to } => {
                info!("MODE  | {} -> {}", mode_name(*from), mode_name(*to));
            }
            AppEvent::FanTargetChanged { percent, duty } => {
                info!("FAN   | target {}% (duty {})", percent, duty);
            }
            AppEvent::ReadingAccepted(r) => {
                info!(
                    "GAS   | ppm={:.1} ratio={:.2} raw={} t={}ms",
                    r.ppm, r.ratio, r.raw, r.timestamp_ms
                );
            }
            AppEvent::CommandAccepted(cmd) => {
                info!("CMD   | accepted {:?}", cmd);
            }
            AppEvent::CommandRejected(e) => {
                warn!("CMD   | rejected: {}", e);
            }
            AppEvent::ThresholdChanged(ppm) => {
                info!("CONF  | threshold={:.1}ppm", ppm);
            }
            AppEvent::EmergencyStop => {
                warn!("STOP  | emergency stop engaged");
            }
        }
    }
}
