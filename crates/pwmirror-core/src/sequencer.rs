// ── Prompt sequencer ──
//
// At most one barrier is outstanding per connection. Input is only taken
// while the current connection's sequencer is idle.

use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequencerState {
    #[default]
    Idle,
    AwaitingBarrier(u32),
}

#[derive(Debug, Default)]
pub struct Sequencer {
    state: SequencerState,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == SequencerState::Idle
    }

    /// Record a freshly issued barrier.
    pub fn issue(&mut self, seq: u32) {
        if let SequencerState::AwaitingBarrier(prev) = self.state {
            debug!(prev, seq, "barrier replaced before completion");
        }
        self.state = SequencerState::AwaitingBarrier(seq);
    }

    /// Feed a completion. Returns `true` when it closes the outstanding
    /// barrier and the prompt may be shown.
    pub fn complete(&mut self, seq: u32) -> bool {
        match self.state {
            SequencerState::AwaitingBarrier(expected) if expected == seq => {
                self.state = SequencerState::Idle;
                true
            }
            _ => {
                trace!(seq, state = ?self.state, "ignoring unmatched completion");
                false
            }
        }
    }
}
