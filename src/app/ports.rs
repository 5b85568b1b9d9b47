//! Port traits — the boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters implement these traits; the
//! [`AppService`](super::service::AppService) consumes them via
//! generics, so the domain core never touches WiFi, MQTT, or LoRa
//! directly.

use super::events::AppEvent;

/// The domain emits structured [`AppEvent`]s through this port.
/// Adapters decide where they go (serial log, MQTT, a test buffer).
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

/// A sink that drops everything. Handy for call sites that do not care
/// about events (e.g. bring-up code paths).
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &AppEvent) {}
}
