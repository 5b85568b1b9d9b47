//! Loop wake-up event queue.
//!
//! Events are produced by timer callbacks and by the radio/MQTT adapter
//! contexts; they are consumed by the single control loop, which services
//! at most one external input and one timer tick per iteration.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Timer ISR   │────▶│              │     │              │
//! │ MQTT task   │────▶│  Event Queue │────▶│ Control Loop │
//! │ Radio task  │────▶│  (lock-free) │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! Payloads (raw packet text, command text) travel separately through the
//! bounded mailboxes in [`crate::channels`]; this queue only carries the
//! "something happened" discriminant.

use core::sync::atomic::{AtomicU8, Ordering};

/// Maximum number of pending events. Power of 2 for cheap modulo.
const EVENT_QUEUE_CAP: usize = 16;

/// Loop wake-up reasons, ordered by rough priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Event {
    /// Operator requested an immediate emergency stop.
    EmergencyStop = 0,
    /// A gas reading packet arrived over the radio link.
    RadioPacketReceived = 10,
    /// Control loop tick (fan ramp + manual-window expiry poll).
    ControlTick = 20,
    /// Status report timer fired.
    TelemetryTick = 30,
    /// A command arrived on the control topic.
    CommandReceived = 31,
}

// ── Lock-free SPSC ring buffer ────────────────────────────────
//
// Callback contexts write (produce), the control loop reads (consume).
// Atomic head/tail indices; the buffer lives in a static so callbacks
// registered with the ESP-IDF C API can reach it.

static EVENT_HEAD: AtomicU8 = AtomicU8::new(0);
static EVENT_TAIL: AtomicU8 = AtomicU8::new(0);
// SAFETY: EVENT_BUFFER is written only by push_event (single producer
// context per platform wiring) and read only by pop_event (control loop).
// The acquire/release pairs on the indices order the payload accesses.
static mut EVENT_BUFFER: [u8; EVENT_QUEUE_CAP] = [0; EVENT_QUEUE_CAP];

/// Push an event into the queue.
/// Safe to call from ISR/callback context (lock-free).
/// Returns `false` if the queue is full (event dropped).
pub fn push_event(event: Event) -> bool {
    let head = EVENT_HEAD.load(Ordering::Relaxed);
    let tail = EVENT_TAIL.load(Ordering::Acquire);
    let next_head = (head + 1) % EVENT_QUEUE_CAP as u8;

    if next_head == tail {
        return false; // Queue full — drop event.
    }

    // SAFETY: single producer; slot `head` is not visible to the consumer
    // until the Release store below. Raw-pointer access, so no reference
    // to the static mut is ever formed.
    unsafe {
        core::ptr::addr_of_mut!(EVENT_BUFFER)
            .cast::<u8>()
            .add(head as usize)
            .write(event as u8);
    }

    EVENT_HEAD.store(next_head, Ordering::Release);
    true
}

/// Pop the next event. Called from the control loop (single consumer).
pub fn pop_event() -> Option<Event> {
    let tail = EVENT_TAIL.load(Ordering::Relaxed);
    let head = EVENT_HEAD.load(Ordering::Acquire);

    if tail == head {
        return None; // Empty.
    }

    // SAFETY: single consumer; slot `tail` was published by the producer's
    // Release store on EVENT_HEAD.
    let raw = unsafe {
        core::ptr::addr_of!(EVENT_BUFFER)
            .cast::<u8>()
            .add(tail as usize)
            .read()
    };
    EVENT_TAIL.store((tail + 1) % EVENT_QUEUE_CAP as u8, Ordering::Release);

    event_from_u8(raw)
}

/// Drain all pending events into a callback, FIFO order.
pub fn drain_events(mut handler: impl FnMut(Event)) {
    while let Some(event) = pop_event() {
        handler(event);
    }
}

// ── Internal ──────────────────────────────────────────────────

fn event_from_u8(raw: u8) -> Option<Event> {
    match raw {
        0 => Some(Event::EmergencyStop),
        10 => Some(Event::RadioPacketReceived),
        20 => Some(Event::ControlTick),
        30 => Some(Event::TelemetryTick),
        31 => Some(Event::CommandReceived),
        _ => None,
    }
}
