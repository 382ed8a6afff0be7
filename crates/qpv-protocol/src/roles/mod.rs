//! Protocol roles.
//!
//! Every role is an explicit state machine. Incoming events are first
//! absorbed into the role's inbox; then the role advances through as many
//! transitions as the inbox allows. Events that arrive early simply wait in
//! the inbox until a state consumes them.

pub mod alice;
pub mod bob;
pub mod charlie;
pub mod dave;
pub mod eve;

pub use alice::Alice;
pub use bob::Bob;
pub use charlie::Charlie;
pub use dave::Dave;
pub use eve::Eve;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::role::TimerId;
use crate::time::approx_le;
use crate::timing::TimingPlan;

pub const ALICE: &str = "Alice";
pub const BOB: &str = "Bob";
pub const CHARLIE: &str = "Charlie";
pub const DAVE: &str = "Dave";
pub const EVE: &str = "Eve";

/// Parameters shared by both verifiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerifierParams {
    /// Basis resolution.
    pub bases: u32,
    /// Answered rounds to collect.
    pub rounds: u64,
    /// Cap on issued rounds.
    pub max_rounds: Option<u64>,
    pub plan: TimingPlan,
    /// Relative tolerance of the timeliness check.
    pub tolerance: f64,
}

impl VerifierParams {
    /// Whether a verifier with these counters must stop.
    pub fn finished(&self, name: &str, answered: u64, issued: u64) -> bool {
        if answered >= self.rounds {
            return true;
        }
        if self.max_rounds.is_some_and(|cap| issued >= cap) {
            warn!(
                node = name,
                answered,
                issued,
                "round cap reached before enough answers"
            );
            return true;
        }
        false
    }

    pub fn on_time(&self, elapsed: f64, expected: f64) -> bool {
        approx_le(elapsed, expected, self.tolerance)
    }
}

/// Timers that have fired but not yet been consumed.
#[derive(Debug, Clone, Default)]
pub(crate) struct FiredTimers(Vec<TimerId>);

impl FiredTimers {
    pub(crate) fn push(&mut self, timer: TimerId) {
        self.0.push(timer);
    }

    /// Consume one firing of `timer`, if any.
    pub(crate) fn take(&mut self, timer: TimerId) -> bool {
        match self.0.iter().position(|t| *t == timer) {
            Some(i) => {
                self.0.remove(i);
                true
            }
            None => false,
        }
    }
}
