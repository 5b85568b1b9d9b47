//! Control arbitration — pure decision logic, zero I/O.
//!
//! [`arbiter::ControlArbiter`] owns the automatic/manual mode machine and
//! the threshold; [`policy`] holds the threshold-to-speed mapping.

pub mod arbiter;
pub mod policy;
