//! Application core — pure domain logic, zero I/O.
//!
//! Business rules for the gas-extraction controller: command
//! interpretation, automatic/manual arbitration, and fan ramp
//! orchestration. All interaction with the outside world happens
//! through the [`ports`] traits, keeping this layer fully testable
//! without hardware, WiFi, or a broker.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
