//! Integration tests: radio frame → AppService → fan, end to end.

use extractor::adapters::radio::decode_gas_frame;
use extractor::app::events::AppEvent;
use extractor::app::ports::EventSink;
use extractor::app::service::AppService;
use extractor::config::SystemConfig;
use extractor::fsm::ModeId;

// ── Mock sink ─────────────────────────────────────────────────

struct RecordingSink {
    events: Vec<AppEvent>,
}

impl RecordingSink {
    fn new() -> Self {
        Self { events: Vec::new() }
    }

    fn count_of(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
    }
}

// ── Helpers ───────────────────────────────────────────────────

fn service() -> AppService {
    AppService::new(&SystemConfig::default())
}

/// Run ticks every 50 ms until the fan stops transitioning.
fn settle(app: &mut AppService, sink: &mut RecordingSink, mut now: u64) -> u64 {
    for _ in 0..200 {
        now += 50;
        app.tick(now, sink);
        if !app.fan().is_transitioning() {
            break;
        }
    }
    now
}

// ── Scenarios ─────────────────────────────────────────────────

#[test]
fn gas_alert_frame_ramps_fan_to_derived_speed() {
    let mut app = service();
    let mut sink = RecordingSink::new();
    app.start(&mut sink);

    let frame = "GAS_DATA|PPM:800.0|Ratio:1.80|Raw:612|Status:ALERTA";
    let reading = decode_gas_frame(frame, 1_000).unwrap();
    app.handle_reading(reading, 1_000, &mut sink);

    // 800 ppm over a 500 threshold → 80% → duty 204 of 255.
    assert_eq!(app.fan().target_speed(), 204);

    let now = settle(&mut app, &mut sink, 1_000);
    assert_eq!(app.fan().current_speed(), 204);
    assert!(app.fan().is_powered());

    // Gas clears: ramp back down to zero.
    let frame = "GAS_DATA|PPM:120.0|Ratio:3.10|Raw:230|Status:NORMAL";
    let reading = decode_gas_frame(frame, now).unwrap();
    app.handle_reading(reading, now, &mut sink);
    assert_eq!(app.fan().target_speed(), 0);

    settle(&mut app, &mut sink, now);
    assert_eq!(app.fan().current_speed(), 0);
    assert!(!app.fan().is_powered());
}

#[test]
fn manual_override_runs_window_then_reverts_to_auto() {
    let mut app = service();
    let mut sink = RecordingSink::new();
    app.start(&mut sink);

    // Standing reading below a future manual window.
    let reading =
        decode_gas_frame("GAS_DATA|PPM:750.0|Ratio:2.00|Raw:580|Status:ALERTA", 0).unwrap();
    app.handle_reading(reading, 0, &mut sink);
    assert_eq!(app.fan().target_speed(), 191); // 75%

    app.handle_command("extractor_on:100", 10_000, &mut sink)
        .unwrap();
    assert_eq!(app.mode(), ModeId::ManualActive);
    assert_eq!(app.fan().target_speed(), 255);

    // Readings received inside the window update state but not the fan.
    let hot = decode_gas_frame("GAS_DATA|PPM:9000|Ratio:0.5|Raw:1020|Status:ALERTA", 20_000)
        .unwrap();
    app.handle_reading(hot, 20_000, &mut sink);
    assert_eq!(app.fan().target_speed(), 255);
    assert_eq!(app.mode(), ModeId::ManualActive);

    // 60 s after the command the window closes and auto re-derives from
    // the stored 9000 ppm reading (saturated at 100%).
    app.tick(70_001, &mut sink);
    assert_eq!(app.mode(), ModeId::Auto);
    assert_eq!(app.fan().target_speed(), 255);
    assert_eq!(
        sink.count_of(|e| matches!(
            e,
            AppEvent::ModeChanged { from: ModeId::ManualActive, to: ModeId::Auto }
        )),
        1
    );
}

#[test]
fn off_command_holds_until_operator_reenables_auto() {
    let mut app = service();
    let mut sink = RecordingSink::new();
    app.start(&mut sink);

    app.handle_command("extractor_off", 0, &mut sink).unwrap();
    assert_eq!(app.mode(), ModeId::ManualIdle);

    // Hours pass with alarming readings; nothing may move.
    for minutes in 1..=120u64 {
        let now = minutes * 60_000;
        let reading =
            decode_gas_frame("GAS_DATA|PPM:4000|Ratio:0.4|Raw:1000|Status:ALERTA", now).unwrap();
        app.handle_reading(reading, now, &mut sink);
        app.tick(now + 25, &mut sink);
    }
    assert_eq!(app.mode(), ModeId::ManualIdle);
    assert_eq!(app.fan().current_speed(), 0);

    // Re-enable: the retained reading drives the fan immediately.
    app.handle_command("modo_auto_on", 7_300_000, &mut sink)
        .unwrap();
    assert_eq!(app.mode(), ModeId::Auto);
    assert_eq!(app.fan().target_speed(), 255);
}

#[test]
fn emergency_stop_overrides_everything_until_reenabled() {
    let mut app = service();
    let mut sink = RecordingSink::new();
    app.start(&mut sink);

    app.handle_command("extractor_on", 0, &mut sink).unwrap();
    let now = settle(&mut app, &mut sink, 0);
    assert!(app.fan().current_speed() > 0);

    app.emergency_stop(now, &mut sink);
    assert_eq!(app.fan().current_speed(), 0);
    assert_eq!(app.mode(), ModeId::ManualIdle);

    // Neither time nor readings restart the fan.
    let reading =
        decode_gas_frame("GAS_DATA|PPM:5000|Ratio:0.3|Raw:1015|Status:ALERTA", now + 10).unwrap();
    app.handle_reading(reading, now + 10, &mut sink);
    app.tick(now + 100_000, &mut sink);
    assert_eq!(app.fan().current_speed(), 0);

    // Operator brings automatic control back.
    app.handle_command("modo_auto_on", now + 100_050, &mut sink)
        .unwrap();
    assert_eq!(app.fan().target_speed(), 255);
}

#[test]
fn rejected_command_is_observable_and_state_preserving() {
    let mut app = service();
    let mut sink = RecordingSink::new();
    app.start(&mut sink);

    app.handle_command("extractor_on:60", 0, &mut sink).unwrap();
    let mode_before = app.mode();
    let target_before = app.fan().target_speed();

    for bad in ["ventilador_on", "extractor_on:muy_alto", "set_umbral:-1", "set_umbral:nan"] {
        assert!(app.handle_command(bad, 100, &mut sink).is_err(), "{bad}");
    }

    assert_eq!(app.mode(), mode_before);
    assert_eq!(app.fan().target_speed(), target_before);
    assert_eq!(sink.count_of(|e| matches!(e, AppEvent::CommandRejected(_))), 4);
}

#[test]
fn status_json_carries_the_full_payload_contract() {
    let mut app = service();
    let mut sink = RecordingSink::new();
    app.start(&mut sink);

    let reading =
        decode_gas_frame("GAS_DATA|PPM:812.5|Ratio:1.80|Raw:612|Status:ALERTA", 5_000).unwrap();
    app.handle_reading(reading, 5_000, &mut sink);
    app.handle_command("extractor_on:90", 6_000, &mut sink)
        .unwrap();

    let report = app.build_status(16_000);
    let json = serde_json::to_string(&report).unwrap();

    assert!(json.contains("\"gateway_id\":\"esp32-central-88\""));
    assert!(json.contains("\"mode\":\"manual\""));
    assert!(json.contains("\"manual_remaining_ms\":50000"));
    assert!(json.contains("\"ppm\":812.5"));
    assert!(json.contains("\"raw\":612"));
    assert!(json.contains("\"alert\":true"));
    assert!(json.contains("\"age_ms\":11000"));
    assert!(json.contains("\"max_duty\":255"));
    assert!(json.contains("\"uptime_ms\":16000"));
}

#[test]
fn garbled_frames_never_reach_the_controller() {
    let mut app = service();
    let mut sink = RecordingSink::new();
    app.start(&mut sink);

    for garbled in [
        "",
        "GAS_DATA|",
        "GAS_DATA|PPM:\u{fffd}\u{fffd}|Ratio:1|Raw:5|Status:X",
        "PING",
        "GAS_DATA|PPM:100",
    ] {
        if let Ok(reading) = decode_gas_frame(garbled, 0) {
            app.handle_reading(reading, 0, &mut sink);
        }
    }
    assert_eq!(sink.count_of(|e| matches!(e, AppEvent::ReadingAccepted(_))), 0);
    assert_eq!(app.fan().target_speed(), 0);
}

#[test]
fn threshold_update_command_rederives_under_live_gas() {
    let mut app = service();
    let mut sink = RecordingSink::new();
    app.start(&mut sink);

    let reading =
        decode_gas_frame("GAS_DATA|PPM:600.0|Ratio:2.2|Raw:540|Status:ALERTA", 0).unwrap();
    app.handle_reading(reading, 0, &mut sink);
    assert_eq!(app.fan().target_speed(), 153); // excess 100 → 60%

    app.handle_command("set_umbral:550", 100, &mut sink).unwrap();
    // excess 50 → 55% → duty 140.
    assert_eq!(app.fan().target_speed(), 140);
    assert_eq!(sink.count_of(|e| matches!(e, AppEvent::ThresholdChanged(_))), 1);

    // Raising the threshold above the reading turns the fan off.
    app.handle_command("set_umbral:700", 200, &mut sink).unwrap();
    assert_eq!(app.fan().target_speed(), 0);
}
