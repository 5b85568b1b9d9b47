//! Actuator drivers and peripheral helpers.

pub mod fan;
pub mod hw_init;
