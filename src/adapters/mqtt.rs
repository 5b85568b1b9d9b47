//! MQTT adapter: command intake and status publishing.
//!
//! Subscribes to the control topic and publishes the JSON status payload
//! on the data topic.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real broker session via an
//!   `esp_idf_svc::mqtt` client attached by `main` with
//!   [`MqttAdapter::attach_client`]; the client's connection callback
//!   reports session state through [`on_connection_event`].
//! - **all other targets**: simulation; the published payloads are
//!   retained so tests can assert on them, and the link can be forced
//!   down with [`MqttAdapter::sim_set_link`].
//!
//! ## Reconnection policy
//!
//! On a lost session the adapter waits an exponential backoff (2 s →
//! 4 s → 8 s … capped at 60 s) before the next attempt; [`poll`] is
//! called every telemetry interval with the loop clock and skips
//! attempts that are not yet due. Publishes while disconnected fail
//! fast rather than queueing — the next telemetry interval resends
//! fresher data anyway.
//!
//! Inbound command payloads never run domain logic in the handler
//! context: [`on_command_payload`] copies the text into the command
//! mailbox and the control loop picks it up on its next pass. The one
//! exception is the dedicated stop verb, which skips the mailbox and
//! goes straight onto the wake-up queue so a full mailbox can never
//! delay it.
//!
//! [`poll`]: MqttAdapter::poll

use log::{info, warn};

use crate::app::events::StatusReport;
use crate::channels::{RawCommand, COMMAND_CHANNEL};
use crate::error::CommsError;
use crate::events::{push_event, Event};

/// Control topic the gateway subscribes to (inbound commands).
pub const TOPIC_COMMANDS: &str = "gas/control";

/// Data topic the gateway publishes status on.
pub const TOPIC_STATUS: &str = "gas/datos";

/// Default broker URL, matching the deployed fleet configuration.
pub const DEFAULT_BROKER_URL: &str = "mqtt://telecomunicaciones.ddns.net:2480";

/// Control-topic verb that triggers an immediate emergency stop,
/// bypassing the command mailbox.
pub const EMERGENCY_STOP_VERB: &str = "parada_emergencia";

const MAX_BACKOFF_SECS: u32 = 60;
const INITIAL_BACKOFF_SECS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MqttState {
    Disconnected,
    Connected,
    Reconnecting { attempt: u32 },
}

// ── Broker session state (fed by the client callback) ─────────

/// Whether the broker session is currently up. Written by the MQTT
/// client's event callback, read by the control loop through the
/// adapter.
#[cfg(target_os = "espidf")]
static LINK_UP: core::sync::atomic::AtomicBool = core::sync::atomic::AtomicBool::new(false);

/// Record a broker session transition reported by the client callback.
#[cfg(target_os = "espidf")]
pub fn on_connection_event(up: bool) {
    use core::sync::atomic::Ordering;
    LINK_UP.store(up, Ordering::Release);
    if up {
        info!("MQTT: broker session up");
    } else {
        warn!("MQTT: broker session lost");
    }
}

// ── Inbound payload handling ──────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
enum InboundAction {
    /// Dedicated stop verb: wake the loop directly, skip the mailbox.
    EmergencyStop,
    /// Ordinary command text, to be queued for the loop.
    Queue(RawCommand),
    /// Oversized payload, dropped.
    Dropped,
}

fn classify_payload(payload: &str) -> InboundAction {
    if payload.trim() == EMERGENCY_STOP_VERB {
        return InboundAction::EmergencyStop;
    }
    match RawCommand::try_from(payload) {
        Ok(cmd) => InboundAction::Queue(cmd),
        Err(()) => InboundAction::Dropped,
    }
}

/// Hand an inbound command payload to the control loop.
///
/// Called from the MQTT event handler. Oversized or overflowing
/// payloads are dropped with a warning; the stop verb is forwarded even
/// when the mailbox is full.
pub fn on_command_payload(payload: &str) {
    match classify_payload(payload) {
        InboundAction::EmergencyStop => {
            warn!("MQTT: emergency stop requested");
            push_event(Event::EmergencyStop);
        }
        InboundAction::Queue(cmd) => {
            if COMMAND_CHANNEL.try_send(cmd).is_err() {
                warn!("MQTT: command mailbox full, dropped");
                return;
            }
            push_event(Event::CommandReceived);
        }
        InboundAction::Dropped => {
            warn!(
                "MQTT: command payload over {} bytes, dropped",
                crate::channels::MAX_COMMAND_LEN
            );
        }
    }
}

// ── Adapter ───────────────────────────────────────────────────

/// MQTT session wrapper with timed reconnect backoff.
pub struct MqttAdapter {
    state: MqttState,
    broker_url: heapless::String<96>,
    backoff_secs: u32,
    /// Earliest loop time at which the next reconnect attempt may run.
    next_attempt_ms: u64,
    #[cfg(target_os = "espidf")]
    client: Option<esp_idf_svc::mqtt::client::EspMqttClient<'static>>,
    /// Simulation: retains published payloads for test assertions.
    #[cfg(not(target_os = "espidf"))]
    sim_published: Vec<(&'static str, String)>,
    /// Simulation: forced transport state.
    #[cfg(not(target_os = "espidf"))]
    sim_link_up: bool,
}

impl MqttAdapter {
    pub fn new(broker_url: &str) -> Result<Self, CommsError> {
        let broker_url =
            heapless::String::try_from(broker_url).map_err(|_| CommsError::BrokerUrlInvalid)?;
        Ok(Self {
            state: MqttState::Disconnected,
            broker_url,
            backoff_secs: INITIAL_BACKOFF_SECS,
            next_attempt_ms: 0,
            #[cfg(target_os = "espidf")]
            client: None,
            #[cfg(not(target_os = "espidf"))]
            sim_published: Vec::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_link_up: true,
        })
    }

    pub fn state(&self) -> MqttState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == MqttState::Connected
    }

    /// Take ownership of the device MQTT client created by `main`.
    #[cfg(target_os = "espidf")]
    pub fn attach_client(&mut self, client: esp_idf_svc::mqtt::client::EspMqttClient<'static>) {
        self.client = Some(client);
    }

    /// Mark the session up if the transport below it is up.
    pub fn connect(&mut self) -> Result<(), CommsError> {
        info!("MQTT: connecting to {}", self.broker_url);
        match self.platform_connect() {
            Ok(()) => {
                self.state = MqttState::Connected;
                self.backoff_secs = INITIAL_BACKOFF_SECS;
                info!("MQTT: connected");
                Ok(())
            }
            Err(e) => {
                warn!("MQTT: connect failed: {}", e);
                self.state = MqttState::Reconnecting { attempt: 0 };
                Err(e)
            }
        }
    }

    /// Drive session supervision. Called once per telemetry interval
    /// with the loop clock; reconnect attempts run only once their
    /// backoff deadline has passed.
    pub fn poll(&mut self, now_ms: u64) {
        match self.state {
            MqttState::Connected => {
                if !self.transport_up() {
                    warn!("MQTT: {}", CommsError::WifiDisconnected);
                    self.state = MqttState::Reconnecting { attempt: 0 };
                    self.next_attempt_ms = now_ms + u64::from(self.backoff_secs) * 1_000;
                }
            }
            MqttState::Disconnected | MqttState::Reconnecting { .. } => {
                if now_ms < self.next_attempt_ms {
                    return;
                }
                let attempt = match self.state {
                    MqttState::Reconnecting { attempt } => attempt + 1,
                    _ => 1,
                };
                info!(
                    "MQTT: reconnect attempt {} (backoff {}s)",
                    attempt, self.backoff_secs
                );
                if self.connect().is_err() {
                    self.state = MqttState::Reconnecting { attempt };
                    self.backoff_secs = (self.backoff_secs * 2).min(MAX_BACKOFF_SECS);
                    self.next_attempt_ms = now_ms + u64::from(self.backoff_secs) * 1_000;
                }
            }
        }
    }

    /// Publish the status payload on the data topic.
    pub fn publish_status(&mut self, report: &StatusReport) -> Result<(), CommsError> {
        if !self.is_connected() {
            return Err(CommsError::MqttPublishFailed);
        }
        let payload =
            serde_json::to_string(report).map_err(|_| CommsError::MqttPublishFailed)?;
        self.platform_publish(TOPIC_STATUS, &payload)
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn transport_up(&self) -> bool {
        use core::sync::atomic::Ordering;
        self.client.is_some() && LINK_UP.load(Ordering::Acquire)
    }

    #[cfg(not(target_os = "espidf"))]
    fn transport_up(&self) -> bool {
        self.sim_link_up
    }

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), CommsError> {
        // The EspMqttClient reconnects on its own; "connect" here means
        // the client is attached and its callback has reported the
        // session up.
        if self.transport_up() {
            Ok(())
        } else {
            Err(CommsError::WifiConnectFailed)
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), CommsError> {
        if self.sim_link_up {
            info!("MQTT(sim): connected to {}", self.broker_url);
            Ok(())
        } else {
            Err(CommsError::WifiConnectFailed)
        }
    }

    #[cfg(target_os = "espidf")]
    fn platform_publish(&mut self, topic: &str, payload: &str) -> Result<(), CommsError> {
        use esp_idf_svc::mqtt::client::QoS;

        let client = self.client.as_mut().ok_or(CommsError::MqttPublishFailed)?;
        client
            .enqueue(topic, QoS::AtMostOnce, false, payload.as_bytes())
            .map_err(|_| CommsError::MqttPublishFailed)?;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_publish(&mut self, topic: &str, payload: &str) -> Result<(), CommsError> {
        self.sim_published.push((TOPIC_STATUS, payload.to_string()));
        info!("MQTT(sim): publish {} -> {}", topic, payload);
        Ok(())
    }

    /// Simulation only: payloads published so far, newest last.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_published(&self) -> &[(&'static str, String)] {
        &self.sim_published
    }

    /// Simulation only: force the transport up or down.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_link(&mut self, up: bool) {
        self.sim_link_up = up;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::events::FanStatus;

    fn report() -> StatusReport {
        StatusReport {
            gateway_id: crate::config::GATEWAY_ID,
            mode: "auto",
            threshold_ppm: 500.0,
            manual_remaining_ms: None,
            sensor: None,
            fan: FanStatus {
                current_duty: 0,
                target_duty: 0,
                max_duty: 255,
                powered: false,
                transitioning: false,
            },
            uptime_ms: 1_000,
        }
    }

    #[test]
    fn publish_before_connect_fails_fast() {
        let mut mqtt = MqttAdapter::new(DEFAULT_BROKER_URL).unwrap();
        assert_eq!(
            mqtt.publish_status(&report()),
            Err(CommsError::MqttPublishFailed)
        );
    }

    #[test]
    fn publish_after_connect_lands_on_status_topic() {
        let mut mqtt = MqttAdapter::new(DEFAULT_BROKER_URL).unwrap();
        mqtt.connect().unwrap();
        mqtt.publish_status(&report()).unwrap();
        let published = mqtt.sim_published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, TOPIC_STATUS);
        assert!(published[0].1.contains("\"gateway_id\":\"esp32-central-88\""));
    }

    #[test]
    fn link_drop_is_detected_and_recovered_after_backoff() {
        let mut mqtt = MqttAdapter::new(DEFAULT_BROKER_URL).unwrap();
        mqtt.connect().unwrap();

        mqtt.sim_set_link(false);
        mqtt.poll(10_000);
        assert!(!mqtt.is_connected());
        assert_eq!(mqtt.state(), MqttState::Reconnecting { attempt: 0 });

        // Link comes back, but the 2 s backoff has not elapsed yet.
        mqtt.sim_set_link(true);
        mqtt.poll(11_000);
        assert!(!mqtt.is_connected());

        mqtt.poll(12_000);
        assert!(mqtt.is_connected());
    }

    #[test]
    fn failed_reconnects_escalate_and_cap_the_backoff() {
        let mut mqtt = MqttAdapter::new(DEFAULT_BROKER_URL).unwrap();
        mqtt.sim_set_link(false);
        assert!(mqtt.connect().is_err());

        // First due attempt fails and schedules the next one 4 s out.
        mqtt.poll(0);
        assert_eq!(mqtt.state(), MqttState::Reconnecting { attempt: 1 });
        mqtt.poll(3_999);
        assert_eq!(mqtt.state(), MqttState::Reconnecting { attempt: 1 });
        mqtt.poll(4_000);
        assert_eq!(mqtt.state(), MqttState::Reconnecting { attempt: 2 });

        // Keep failing far apart; the backoff stops doubling at 60 s.
        let mut now = 4_000;
        for _ in 0..10 {
            now += 120_000;
            mqtt.poll(now);
        }
        mqtt.poll(now + 30_000);
        let before = mqtt.state();
        mqtt.poll(now + 59_000);
        assert_eq!(mqtt.state(), before);

        // A successful attempt resets the backoff to its floor.
        mqtt.sim_set_link(true);
        mqtt.poll(now + 120_000);
        assert!(mqtt.is_connected());
        mqtt.sim_set_link(false);
        mqtt.poll(now + 240_000);
        mqtt.sim_set_link(true);
        mqtt.poll(now + 240_000 + 2_000);
        assert!(mqtt.is_connected());
    }

    #[test]
    fn stop_verb_bypasses_the_command_mailbox() {
        assert_eq!(
            classify_payload("parada_emergencia"),
            InboundAction::EmergencyStop
        );
        assert_eq!(
            classify_payload("  parada_emergencia\n"),
            InboundAction::EmergencyStop
        );
        // Ordinary verbs still queue; oversized text is dropped.
        assert!(matches!(
            classify_payload("extractor_on:70"),
            InboundAction::Queue(_)
        ));
        assert_eq!(
            classify_payload("x".repeat(100).as_str()),
            InboundAction::Dropped
        );
    }

    #[test]
    fn oversized_broker_url_rejected() {
        let long = "m".repeat(200);
        assert!(MqttAdapter::new(&long).is_err());
    }

    #[test]
    fn command_capacity_matches_longest_verb() {
        // The longest legal command must fit the mailbox payload type.
        assert!(RawCommand::try_from("set_umbral:10000.000").is_ok());
        assert!(RawCommand::try_from("x".repeat(100).as_str()).is_err());
    }
}
