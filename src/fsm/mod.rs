//! Function-pointer mode machine engine.
//!
//! Classic embedded FSM pattern: a fixed-size table of mode descriptors,
//! each row holding plain `fn` pointers — no closures, no dynamic
//! dispatch, no heap.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  ModeTable                                                 │
//! │  ┌──────────────┬───────────┬──────────┬─────────────────┐ │
//! │  │ ModeId       │ on_enter  │ on_exit  │ on_update       │ │
//! │  ├──────────────┼───────────┼──────────┼─────────────────┤ │
//! │  │ Auto         │ fn(ctx)   │ —        │ fn(ctx)->Opt<>  │ │
//! │  │ ManualActive │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Opt<>  │ │
//! │  │ ManualIdle   │ fn(ctx)   │ —        │ fn(ctx)->Opt<>  │ │
//! │  └──────────────┴───────────┴──────────┴─────────────────┘ │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each poll the engine calls `on_update` for the **current** mode. If it
//! returns `Some(next)`, the engine runs `on_exit` for the current mode,
//! then `on_enter` for the next. All handlers receive
//! `&mut ArbiterContext`, which carries the clock, the latest reading,
//! the threshold, and the pending fan-target request.

pub mod context;
pub mod states;

use context::ArbiterContext;
use log::info;

// ---------------------------------------------------------------------------
// Mode identity
// ---------------------------------------------------------------------------

/// Enumeration of the control modes.
/// Must stay in sync with the table built in [`states::build_mode_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ModeId {
    /// Threshold-driven control: every reading derives a fan target.
    Auto = 0,
    /// Operator holds the fan at a requested speed until the window ends.
    ManualActive = 1,
    /// Automatic control disabled; fan target left wherever it was.
    ManualIdle = 2,
}

impl ModeId {
    /// Total number of modes — sizes the table array.
    pub const COUNT: usize = 3;

    /// Convert a `u8` index back to `ModeId`. Panics on out-of-range in
    /// debug builds; returns `ManualIdle` in release (the mode that
    /// commands no actuation).
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Auto,
            1 => Self::ManualActive,
            2 => Self::ManualIdle,
            _ => {
                debug_assert!(false, "invalid mode index: {idx}");
                Self::ManualIdle
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions; run once per transition.
pub type ModeActionFn = fn(&mut ArbiterContext);

/// Signature for the per-poll update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type ModeUpdateFn = fn(&mut ArbiterContext) -> Option<ModeId>;

// ---------------------------------------------------------------------------
// Mode descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single mode.
pub struct ModeDescriptor {
    pub id: ModeId,
    pub name: &'static str,
    pub on_enter: Option<ModeActionFn>,
    pub on_exit: Option<ModeActionFn>,
    pub on_update: ModeUpdateFn,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The mode machine engine. Owns the table; the context is threaded
/// through every handler call by the owner.
pub struct ModeMachine {
    /// Fixed-size table indexed by `ModeId as usize`.
    table: [ModeDescriptor; ModeId::COUNT],
    /// Index of the currently active mode.
    current: usize,
}

impl ModeMachine {
    /// Construct a machine with the given table, starting in `initial`.
    pub fn new(table: [ModeDescriptor; ModeId::COUNT], initial: ModeId) -> Self {
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Run the initial `on_enter` for the starting mode.
    /// Call once after construction, before the first `poll()`.
    pub fn start(&mut self, ctx: &mut ArbiterContext) {
        info!("arbiter starting in mode: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the machine by one poll: run `on_update` for the current
    /// mode and execute the transition it requests, if any.
    pub fn poll(&mut self, ctx: &mut ArbiterContext) {
        let next = (self.table[self.current].on_update)(ctx);
        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    /// Force an immediate transition (used by the command path).
    /// A request for the current mode is a no-op.
    pub fn force_transition(&mut self, next: ModeId, ctx: &mut ArbiterContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    /// The current mode's identity.
    pub fn current_mode(&self) -> ModeId {
        ModeId::from_index(self.current)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: ModeId, ctx: &mut ArbiterContext) {
        let next_idx = next_id as usize;

        info!(
            "mode transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::context::{ArbiterContext, GasReading};
    use super::*;
    use crate::config::SystemConfig;

    fn make_ctx() -> ArbiterContext {
        ArbiterContext::new(&SystemConfig::default())
    }

    fn make_machine() -> ModeMachine {
        ModeMachine::new(states::build_mode_table(), ModeId::Auto)
    }

    fn reading(ppm: f32, at_ms: u64) -> GasReading {
        GasReading {
            ppm,
            ratio: 2.0,
            raw: 512,
            timestamp_ms: at_ms,
        }
    }

    #[test]
    fn starts_in_auto() {
        let machine = make_machine();
        assert_eq!(machine.current_mode(), ModeId::Auto);
    }

    #[test]
    fn auto_update_derives_target_from_reading() {
        let mut machine = make_machine();
        let mut ctx = make_ctx();
        machine.start(&mut ctx);

        ctx.now_ms = 1_000;
        ctx.last_reading = Some(reading(800.0, 1_000));
        machine.poll(&mut ctx);

        // threshold 500, excess 300 → 80%
        assert_eq!(ctx.requested_percent, Some(80));
        assert_eq!(machine.current_mode(), ModeId::Auto);
    }

    #[test]
    fn auto_update_without_reading_requests_nothing() {
        let mut machine = make_machine();
        let mut ctx = make_ctx();
        machine.start(&mut ctx);
        machine.poll(&mut ctx);
        assert_eq!(ctx.requested_percent, None);
    }

    #[test]
    fn manual_active_expires_to_auto_and_rederives() {
        let mut machine = make_machine();
        let mut ctx = make_ctx();
        machine.start(&mut ctx);

        ctx.last_reading = Some(reading(800.0, 0));
        ctx.now_ms = 10;
        ctx.manual_until_ms = Some(10 + ctx.manual_window_ms);
        machine.force_transition(ModeId::ManualActive, &mut ctx);
        ctx.requested_percent = None;

        // Not yet expired — no transition, no request.
        ctx.now_ms = 10 + ctx.manual_window_ms - 1;
        machine.poll(&mut ctx);
        assert_eq!(machine.current_mode(), ModeId::ManualActive);
        assert_eq!(ctx.requested_percent, None);

        // One past the deadline — back to Auto, target re-derived.
        ctx.now_ms = 10 + ctx.manual_window_ms + 1;
        machine.poll(&mut ctx);
        assert_eq!(machine.current_mode(), ModeId::Auto);
        assert_eq!(ctx.requested_percent, Some(80));
        assert_eq!(ctx.manual_until_ms, None, "deadline cleared on exit");
    }

    #[test]
    fn manual_active_expires_exactly_at_deadline() {
        let mut machine = make_machine();
        let mut ctx = make_ctx();
        machine.start(&mut ctx);

        ctx.manual_until_ms = Some(5_000);
        machine.force_transition(ModeId::ManualActive, &mut ctx);

        ctx.now_ms = 5_000;
        machine.poll(&mut ctx);
        assert_eq!(machine.current_mode(), ModeId::Auto);
    }

    #[test]
    fn manual_idle_never_requests_or_transitions() {
        let mut machine = make_machine();
        let mut ctx = make_ctx();
        machine.start(&mut ctx);
        machine.force_transition(ModeId::ManualIdle, &mut ctx);
        ctx.requested_percent = None;

        ctx.last_reading = Some(reading(5_000.0, 0));
        for t in 0..10 {
            ctx.now_ms = t * 60_000;
            machine.poll(&mut ctx);
        }
        assert_eq!(machine.current_mode(), ModeId::ManualIdle);
        assert_eq!(ctx.requested_percent, None);
    }

    #[test]
    fn entering_auto_rederives_immediately() {
        let mut machine = make_machine();
        let mut ctx = make_ctx();
        machine.start(&mut ctx);
        machine.force_transition(ModeId::ManualIdle, &mut ctx);

        ctx.last_reading = Some(reading(1_000.0, 0));
        machine.force_transition(ModeId::Auto, &mut ctx);
        // excess 500 → exactly 100%
        assert_eq!(ctx.requested_percent, Some(100));
    }

    #[test]
    fn force_transition_to_current_mode_is_noop() {
        let mut machine = make_machine();
        let mut ctx = make_ctx();
        machine.start(&mut ctx);
        ctx.requested_percent = None;
        ctx.last_reading = Some(reading(800.0, 0));

        // Already in Auto: no enter handler runs, so no request appears.
        machine.force_transition(ModeId::Auto, &mut ctx);
        assert_eq!(ctx.requested_percent, None);
    }

    #[test]
    fn mode_id_from_index_roundtrip() {
        for i in 0..ModeId::COUNT {
            let id = ModeId::from_index(i);
            assert_eq!(id as usize, i);
        }
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn mode_id_from_invalid_index_returns_manual_idle() {
        assert_eq!(ModeId::from_index(99), ModeId::ManualIdle);
    }
}
