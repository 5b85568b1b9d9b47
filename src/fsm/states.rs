//! Concrete mode handler functions and table builder.
//!
//! Each mode is defined by plain `fn` pointers — no closures, no dynamic
//! dispatch, no heap. The classic embedded C state-table pattern in safe
//! Rust.
//!
//! ```text
//!          ┌──────[window expired / modo_auto_on]──────┐
//!          ▼                                           │
//!        AUTO ────[extractor_on]────▶ MANUAL_ACTIVE ───┤
//!          │                              │            │
//!    [modo_auto_off]              [extractor_off]      │
//!          ▼                              ▼            │
//!     MANUAL_IDLE ◀───────────────────────┴────────────┘
//!          │
//!          └──[extractor_on]──▶ MANUAL_ACTIVE
//! ```
//!
//! Command-driven edges are forced by the arbiter; the `on_update`
//! handlers only deal with what time and readings can cause on their own:
//! target derivation in `Auto` and window expiry in `ManualActive`.

use log::info;

use super::context::ArbiterContext;
use super::{ModeDescriptor, ModeId};
use crate::control::policy;

// ═══════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════

/// Build the static mode table. Called once at startup.
pub fn build_mode_table() -> [ModeDescriptor; ModeId::COUNT] {
    [
        // Index 0 — Auto
        ModeDescriptor {
            id: ModeId::Auto,
            name: "Auto",
            on_enter: Some(auto_enter),
            on_exit: None,
            on_update: auto_update,
        },
        // Index 1 — ManualActive
        ModeDescriptor {
            id: ModeId::ManualActive,
            name: "ManualActive",
            on_enter: Some(manual_active_enter),
            on_exit: Some(manual_active_exit),
            on_update: manual_active_update,
        },
        // Index 2 — ManualIdle
        ModeDescriptor {
            id: ModeId::ManualIdle,
            name: "ManualIdle",
            on_enter: Some(manual_idle_enter),
            on_exit: None,
            on_update: manual_idle_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════
//  AUTO — threshold-driven control
// ═══════════════════════════════════════════════════════════════

fn auto_enter(ctx: &mut ArbiterContext) {
    // Re-derive the target from whatever reading we last saw, so the fan
    // never silently holds a stale manual speed after reversion.
    if let Some(reading) = ctx.last_reading {
        let target = policy::auto_target_percent(reading.ppm, ctx.threshold_ppm);
        ctx.requested_percent = Some(target);
        info!(
            "AUTO: engaged, last reading {:.1} ppm (threshold {:.1}) -> {}%",
            reading.ppm, ctx.threshold_ppm, target
        );
    } else {
        info!("AUTO: engaged, no reading yet");
    }
}

fn auto_update(ctx: &mut ArbiterContext) -> Option<ModeId> {
    // In automatic mode the fan target is *always* a function of the last
    // reading and the threshold; recomputing every poll keeps that
    // invariant even when only the threshold changed.
    if let Some(reading) = ctx.last_reading {
        ctx.requested_percent = Some(policy::auto_target_percent(reading.ppm, ctx.threshold_ppm));
    }
    None
}

// ═══════════════════════════════════════════════════════════════
//  MANUAL_ACTIVE — operator override with a running window
// ═══════════════════════════════════════════════════════════════

fn manual_active_enter(ctx: &mut ArbiterContext) {
    if let Some(remaining) = ctx.manual_remaining_ms() {
        info!("MANUAL: active for the next {}s", remaining / 1000);
    }
}

fn manual_active_exit(ctx: &mut ArbiterContext) {
    ctx.manual_until_ms = None;
}

fn manual_active_update(ctx: &mut ArbiterContext) -> Option<ModeId> {
    // Poll-based expiry: evaluated on every reading arrival and every
    // control tick. Readings arriving here update `last_reading` (done by
    // the arbiter before this call) but never touch the fan target.
    match ctx.manual_until_ms {
        Some(until) if ctx.now_ms >= until => {
            info!("MANUAL: window expired, reverting to automatic control");
            Some(ModeId::Auto)
        }
        Some(_) => None,
        // Deadline lost (should not happen) — fail toward automatic.
        None => Some(ModeId::Auto),
    }
}

// ═══════════════════════════════════════════════════════════════
//  MANUAL_IDLE — automatic control off, fan left as-is
// ═══════════════════════════════════════════════════════════════

fn manual_idle_enter(_ctx: &mut ArbiterContext) {
    info!("MANUAL: idle, holding current fan request");
}

fn manual_idle_update(_ctx: &mut ArbiterContext) -> Option<ModeId> {
    None
}
