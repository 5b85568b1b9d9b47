//! Extractor firmware — main entry point.
//!
//! Hexagonal architecture with a single serialized control loop.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Adapters (outer ring)                   │
//! │                                                          │
//! │  LoRa RX task   MQTT handler    LogEventSink   Esp32Time │
//! │  (PACKET_CHANNEL) (COMMAND_CHANNEL) (EventSink)          │
//! │                                                          │
//! │  ─────────────── Port Trait Boundary ──────────────────  │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │            AppService (pure logic)                 │  │
//! │  │        ControlArbiter · FanActuator                │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! All domain state is touched only from this loop; callbacks hand data
//! over through the lock-free event queue and the mailbox channels.
#![deny(unused_must_use)]

use anyhow::Result;
use log::{error, info, warn};

use extractor::adapters::log_sink::LogEventSink;
use extractor::adapters::mqtt::{MqttAdapter, DEFAULT_BROKER_URL};
use extractor::adapters::radio::decode_gas_frame;
use extractor::adapters::time::Esp32TimeAdapter;
use extractor::app::service::AppService;
use extractor::channels::{COMMAND_CHANNEL, PACKET_CHANNEL};
use extractor::config::{self, SystemConfig};
use extractor::drivers::hw_init;
use extractor::events::{self, push_event, Event};

fn main() -> Result<()> {
    // ── 1. Platform bootstrap ─────────────────────────────────
    #[cfg(target_os = "espidf")]
    {
        esp_idf_svc::sys::link_patches();
        esp_idf_logger::init()?;
    }

    info!(
        "extractor v{} (gateway {})",
        env!("CARGO_PKG_VERSION"),
        config::GATEWAY_ID
    );

    // ── 2. Peripherals ────────────────────────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        // Peripheral init failure is critical — log and halt; the
        // watchdog resets us after timeout.
        error!("HAL init failed: {} — halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }

    // ── 3. Connectivity ───────────────────────────────────────
    #[cfg(target_os = "espidf")]
    let _wifi = wire_wifi()?;

    // ── 4. Adapters ───────────────────────────────────────────
    let config = SystemConfig::default();
    let time = Esp32TimeAdapter::new();
    let mut log_sink = LogEventSink::new();

    let mut mqtt =
        MqttAdapter::new(DEFAULT_BROKER_URL).map_err(|e| anyhow::anyhow!("mqtt: {e}"))?;

    #[cfg(target_os = "espidf")]
    wire_mqtt(&mut mqtt)?;

    if let Err(e) = mqtt.connect() {
        // Not fatal: the loop keeps controlling the fan offline and the
        // backoff in poll() brings the session back.
        warn!("MQTT session not up yet: {}", e);
    }

    // ── 5. Application core ───────────────────────────────────
    let mut app = AppService::new(&config);
    app.start(&mut log_sink);

    info!("system ready, entering control loop");

    // ── 6. Control loop ───────────────────────────────────────
    let ticks_per_telemetry = (u64::from(config.telemetry_interval_secs) * 1_000)
        / u64::from(config.control_loop_interval_ms);
    let mut telemetry_counter: u64 = 0;

    loop {
        #[cfg(target_os = "espidf")]
        esp_idf_hal::delay::FreeRtos::delay_ms(config.control_loop_interval_ms);
        #[cfg(not(target_os = "espidf"))]
        std::thread::sleep(std::time::Duration::from_millis(u64::from(
            config.control_loop_interval_ms,
        )));
        push_event(Event::ControlTick);

        telemetry_counter += 1;
        if telemetry_counter >= ticks_per_telemetry {
            push_event(Event::TelemetryTick);
            telemetry_counter = 0;
        }

        // Inbound radio frames (pushed by the LoRa RX task).
        while let Ok(packet) = PACKET_CHANNEL.try_receive() {
            let now_ms = time.uptime_ms();
            match decode_gas_frame(packet.as_str(), now_ms) {
                Ok(reading) => app.handle_reading(reading, now_ms, &mut log_sink),
                Err(e) => warn!("radio: dropped frame ({})", e),
            }
        }

        events::drain_events(|event| match event {
            Event::EmergencyStop => {
                app.emergency_stop(time.uptime_ms(), &mut log_sink);
            }

            Event::ControlTick => {
                app.tick(time.uptime_ms(), &mut log_sink);
            }

            // Frames are drained from the mailbox above; the event only
            // wakes the loop.
            Event::RadioPacketReceived => {}

            Event::CommandReceived => {
                while let Ok(raw) = COMMAND_CHANNEL.try_receive() {
                    // Rejections are already reported through the sink.
                    let _ = app.handle_command(raw.as_str(), time.uptime_ms(), &mut log_sink);
                }
            }

            Event::TelemetryTick => {
                let report = app.build_status(time.uptime_ms());
                if mqtt.is_connected() {
                    if let Err(e) = mqtt.publish_status(&report) {
                        warn!("telemetry publish failed: {}", e);
                    }
                }
                mqtt.poll(time.uptime_ms());
            }
        });
    }
}

// ── WiFi wiring (device only) ─────────────────────────────────
//
// Station credentials are baked in at build time; when absent the node
// stays offline and keeps controlling the fan from LoRa input alone.

#[cfg(target_os = "espidf")]
fn wire_wifi() -> Result<Option<esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>>>
{
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
    use esp_idf_hal::peripherals::Peripherals;

    let ssid = option_env!("EXTRACTOR_WIFI_SSID").unwrap_or("");
    let pass = option_env!("EXTRACTOR_WIFI_PASS").unwrap_or("");
    if ssid.is_empty() {
        warn!("WiFi: no station credentials baked in, staying offline");
        return Ok(None);
    }

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let mut wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?,
        sysloop,
    )?;
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: ssid
            .try_into()
            .map_err(|_| anyhow::anyhow!("WiFi SSID too long"))?,
        password: pass
            .try_into()
            .map_err(|_| anyhow::anyhow!("WiFi password too long"))?,
        auth_method: if pass.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        },
        ..Default::default()
    }))?;

    wifi.start()?;
    wifi.connect()?;
    wifi.wait_netif_up()?;
    info!("WiFi: station up ({})", ssid);

    Ok(Some(wifi))
}

// ── MQTT wiring (device only) ─────────────────────────────────
//
// The EspMqttClient owns a background task; its callback runs outside
// the control loop, so it only forwards payload text into the command
// mailbox, reports session transitions, and returns. The client handle
// is handed to the adapter so status publishes go through it.

#[cfg(target_os = "espidf")]
fn wire_mqtt(mqtt: &mut MqttAdapter) -> Result<()> {
    use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};

    use extractor::adapters::mqtt::{on_command_payload, on_connection_event, TOPIC_COMMANDS};
    use extractor::error::CommsError;

    let conf = MqttClientConfiguration {
        client_id: Some(config::GATEWAY_ID),
        username: option_env!("EXTRACTOR_MQTT_USER"),
        password: option_env!("EXTRACTOR_MQTT_PASS"),
        ..Default::default()
    };

    let mut client = EspMqttClient::new_cb(DEFAULT_BROKER_URL, &conf, move |event| {
        match event.payload() {
            EventPayload::Connected(_) => on_connection_event(true),
            EventPayload::Disconnected => on_connection_event(false),
            EventPayload::Received { topic, data, .. } => {
                if topic == Some(TOPIC_COMMANDS) {
                    match core::str::from_utf8(data) {
                        Ok(text) => on_command_payload(text),
                        Err(_) => warn!("MQTT: non-UTF8 command payload dropped"),
                    }
                }
            }
            _ => {}
        }
    })?;

    client
        .subscribe(TOPIC_COMMANDS, QoS::AtLeastOnce)
        .map_err(|_| anyhow::anyhow!("{}", CommsError::MqttSubscribeFailed))?;

    mqtt.attach_client(client);
    Ok(())
}
