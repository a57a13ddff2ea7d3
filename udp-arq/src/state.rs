//! Sender engine finite-state machine types.
//!
//! ```text
//!  IDLE ──start──▶ SENDING ──file exhausted, window empty, EOT sent──▶ DRAINING
//!                     │                                                   │
//!                     └──────────── peer EOT ──────────▶ DONE ◀── peer EOT┘
//! ```
//!
//! Transitions are driven by [`crate::gbn`] and [`crate::selective_repeat`].

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    /// Created, nothing sent yet.
    #[default]
    Idle,
    /// Reading the input and moving DATA packets through the window.
    Sending,
    /// Every DATA packet is acknowledged and EOT has been sent.
    Draining,
    /// The peer's EOT was observed; the transfer is complete.
    Done,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}
