//! Per-round outcome logs.

use serde::{Deserialize, Serialize};

use crate::basis::BasisMetadata;

/// Terminal state of one round as seen by a verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundOutcome {
    /// The player answered; `true` if the answer matched the encoded bit.
    Answered(bool),
    /// The player reported that no photon was detected.
    NoPhoton,
    /// The photon was lost during preparation and never left Alice.
    NotSent,
}

impl RoundOutcome {
    pub fn is_correct(&self) -> bool {
        matches!(self, RoundOutcome::Answered(true))
    }
}

/// The basis-related value a verifier contributed to a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BasisValue {
    /// Alice's masked basis (`m0`).
    Metadata(BasisMetadata),
    /// Bob's nonce (`m1`).
    Nonce(u32),
}

/// Append-only results of one verifier.
///
/// The three logs are only ever extended together by [`Results::record`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Results {
    correctness: Vec<RoundOutcome>,
    timeliness: Vec<bool>,
    basis: Vec<BasisValue>,
}

/// Aggregate view of a [`Results`] log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub rounds: usize,
    pub answered: usize,
    pub correct: usize,
    pub on_time: usize,
    pub no_photon: usize,
    pub not_sent: usize,
}

impl ResultSummary {
    /// Fraction of answered rounds that were correct.
    pub fn correct_rate(&self) -> Option<f64> {
        (self.answered > 0).then(|| self.correct as f64 / self.answered as f64)
    }

    /// Fraction of all rounds answered in time.
    pub fn on_time_rate(&self) -> Option<f64> {
        (self.rounds > 0).then(|| self.on_time as f64 / self.rounds as f64)
    }
}

impl Results {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the outcome of a completed round.
    pub fn record(&mut self, outcome: RoundOutcome, on_time: bool, basis: BasisValue) {
        self.correctness.push(outcome);
        self.timeliness.push(on_time);
        self.basis.push(basis);
    }

    pub fn len(&self) -> usize {
        self.correctness.len()
    }

    pub fn is_empty(&self) -> bool {
        self.correctness.is_empty()
    }

    pub fn correctness(&self) -> &[RoundOutcome] {
        &self.correctness
    }

    pub fn timeliness(&self) -> &[bool] {
        &self.timeliness
    }

    pub fn basis_values(&self) -> &[BasisValue] {
        &self.basis
    }

    /// Number of rounds the player answered.
    pub fn answered(&self) -> usize {
        self.correctness
            .iter()
            .filter(|o| matches!(o, RoundOutcome::Answered(_)))
            .count()
    }

    pub fn summary(&self) -> ResultSummary {
        let mut summary = ResultSummary {
            rounds: self.len(),
            on_time: self.timeliness.iter().filter(|t| **t).count(),
            ..ResultSummary::default()
        };
        for outcome in &self.correctness {
            match outcome {
                RoundOutcome::Answered(correct) => {
                    summary.answered += 1;
                    if *correct {
                        summary.correct += 1;
                    }
                }
                RoundOutcome::NoPhoton => summary.no_photon += 1,
                RoundOutcome::NotSent => summary.not_sent += 1,
            }
        }
        summary
    }
}

/// Per-round decisions of a prover or adversary; `None` means it reported no photon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionLog {
    entries: Vec<Option<bool>>,
}

impl DecisionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, decision: Option<bool>) {
        self.entries.push(decision);
    }

    pub fn entries(&self) -> &[Option<bool>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rounds in which no decision was made.
    pub fn abstentions(&self) -> usize {
        self.entries.iter().filter(|e| e.is_none()).count()
    }
}
