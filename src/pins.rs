//! Pin assignments for the central-node ESP32 board.

#![allow(dead_code)] // Radio pins are wired by the (external) LoRa driver task

/// Extractor fan PWM output.
pub const EXTRACTOR_PWM_GPIO: i32 = 27;

/// Fan PWM carrier frequency (Hz).
pub const EXTRACTOR_PWM_FREQ_HZ: u32 = 25_000;

// ── LoRa transceiver (SX1278) SPI wiring ─────────────────────
pub const LORA_SCK_GPIO: i32 = 18;
pub const LORA_MISO_GPIO: i32 = 19;
pub const LORA_MOSI_GPIO: i32 = 23;
pub const LORA_SS_GPIO: i32 = 5;
pub const LORA_RST_GPIO: i32 = 14;
pub const LORA_DIO0_GPIO: i32 = 26;
