//! Inter-task mailboxes feeding the control loop.
//!
//! `embassy-sync` bounded channels bridge the callback contexts (MQTT
//! handler thread, radio driver task) with the synchronous control loop.
//! Both sides share these statics without heap allocation; payloads are
//! fixed-capacity `heapless` strings so nothing in the callback path
//! allocates either.
//!
//! ```text
//! ┌──────────────┐  raw packet   ┌──────────────┐
//! │  Radio task  │──────────────▶│              │
//! └──────────────┘               │ Control Loop │
//! ┌──────────────┐  raw command  │  (consumer)  │
//! │ MQTT handler │──────────────▶│              │
//! └──────────────┘               └──────────────┘
//! ```
//!
//! The loop drains with `try_receive()` only; producers use `try_send()`
//! and drop on overflow (the link layers are lossy by contract anyway).

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::String;

/// Longest accepted radio packet line
/// (`GAS_DATA|PPM:..|Ratio:..|Raw:..|Status:..`).
pub const MAX_PACKET_LEN: usize = 160;

/// Longest accepted control-topic command (`set_umbral:<value>`).
pub const MAX_COMMAND_LEN: usize = 64;

/// Raw radio packet text, exactly as received off the air.
pub type RawPacket = String<MAX_PACKET_LEN>;

/// Raw command text from the control topic.
pub type RawCommand = String<MAX_COMMAND_LEN>;

/// Channel depth for inbound radio packets.
const PACKET_DEPTH: usize = 4;

/// Channel depth for inbound commands.
const COMMAND_DEPTH: usize = 8;

/// Inbound radio packets: radio task → control loop.
pub static PACKET_CHANNEL: Channel<CriticalSectionRawMutex, RawPacket, PACKET_DEPTH> =
    Channel::new();

/// Inbound commands: MQTT handler → control loop.
pub static COMMAND_CHANNEL: Channel<CriticalSectionRawMutex, RawCommand, COMMAND_DEPTH> =
    Channel::new();
