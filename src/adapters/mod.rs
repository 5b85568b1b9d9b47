//! Driven adapters — implementations of the port traits plus the
//! platform-facing plumbing (radio frame decoding, MQTT, time).

pub mod log_sink;
pub mod mqtt;
pub mod radio;
pub mod time;
