//! Inbound commands and their wire vocabulary.
//!
//! Commands arrive as plain text on the command topic (and over serial
//! during bring-up). The vocabulary is kept byte-compatible with the
//! deployed gateways:
//!
//! ```text
//! extractor_on            manual extraction at the configured default
//! extractor_on:<percent>  manual extraction at an explicit percent
//! extractor_off           stop the fan, leave automatic control off
//! modo_auto_on            return to automatic control
//! modo_auto_off           disable automatic control
//! set_manual_mode         alias for modo_auto_off (newer gateways)
//! set_umbral:<ppm>        update the automatic threshold
//! ```
//!
//! Parsing rejects anything outside this vocabulary; range validation of
//! the threshold value is the arbiter's job.

use crate::error::CommandError;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Run the fan manually for one manual window. `None` means the
    /// configured default percent.
    TurnOnManual { percent: Option<u8> },

    /// Stop the fan and leave automatic control disabled.
    TurnOffManual,

    /// Re-enable automatic threshold control.
    EnableAuto,

    /// Disable automatic control without touching the fan.
    DisableAuto,

    /// Change the automatic threshold (ppm).
    SetThreshold(f32),
}

/// Parse one command line from the wire.
///
/// Surrounding whitespace is tolerated (brokers and serial consoles add
/// trailing newlines); everything else must match exactly.
pub fn parse(raw: &str) -> Result<Command, CommandError> {
    let raw = raw.trim();

    if let Some(value) = raw.strip_prefix("extractor_on:") {
        let percent: u8 = value
            .trim()
            .parse()
            .map_err(|_| CommandError::MalformedPercent)?;
        return Ok(Command::TurnOnManual {
            percent: Some(percent),
        });
    }

    if let Some(value) = raw.strip_prefix("set_umbral:") {
        let ppm: f32 = value
            .trim()
            .parse()
            .map_err(|_| CommandError::MalformedThreshold)?;
        return Ok(Command::SetThreshold(ppm));
    }

    match raw {
        "extractor_on" => Ok(Command::TurnOnManual { percent: None }),
        "extractor_off" => Ok(Command::TurnOffManual),
        "modo_auto_on" => Ok(Command::EnableAuto),
        "modo_auto_off" | "set_manual_mode" => Ok(Command::DisableAuto),
        _ => Err(CommandError::UnknownCommand),
    }
}
