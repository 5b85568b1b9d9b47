#![allow(dead_code)] // Some variants are only constructed in espidf-gated wiring

//! Unified error types for the extractor firmware.
//!
//! Follows embedded practice: small `Copy` enums that every subsystem can
//! convert into a single `Error`, keeping the top-level control loop's
//! error handling uniform. Nothing here allocates.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Error {
    /// An external command was rejected.
    Command(CommandError),
    /// A configuration value was rejected.
    Config(ConfigError),
    /// A communication subsystem failed.
    Comms(CommsError),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(e) => write!(f, "command: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

/// Rejection reasons for external commands. A rejected command never
/// mutates controller state; the caller always sees the reason.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandError {
    /// The command text matched no known verb.
    UnknownCommand,
    /// `extractor_on:<percent>` carried an unparseable percent.
    MalformedPercent,
    /// `set_umbral:<value>` carried an unparseable value.
    MalformedThreshold,
    /// Threshold was non-positive, non-finite, or absurdly large.
    ThresholdOutOfRange(f32),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::MalformedPercent => write!(f, "malformed percent"),
            Self::MalformedThreshold => write!(f, "malformed threshold"),
            Self::ThresholdOutOfRange(v) => write!(f, "threshold out of range: {v}"),
        }
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Rejected configuration values. Prior state is always retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Ramp step must be at least one duty unit per tick.
    RampStepZero,
    /// Ramp interval must be a positive number of milliseconds.
    RampIntervalZero,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RampStepZero => write!(f, "ramp step must be > 0"),
            Self::RampIntervalZero => write!(f, "ramp interval must be > 0 ms"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    WifiConnectFailed,
    WifiDisconnected,
    BrokerUrlInvalid,
    MqttPublishFailed,
    MqttSubscribeFailed,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WifiConnectFailed => write!(f, "WiFi connect failed"),
            Self::WifiDisconnected => write!(f, "WiFi disconnected"),
            Self::BrokerUrlInvalid => write!(f, "broker URL invalid"),
            Self::MqttPublishFailed => write!(f, "MQTT publish failed"),
            Self::MqttSubscribeFailed => write!(f, "MQTT subscribe failed"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
