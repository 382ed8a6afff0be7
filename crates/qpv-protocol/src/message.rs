//! Wire messages exchanged between roles.

use serde::{Deserialize, Serialize};

use qpv_quantum::QuantumRegister;

use crate::basis::{Basis, BasisMetadata};

/// A classical protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// Alice → Bob: the round's bit and nonce.
    Values {
        /// Bit encoded in the qubit.
        bit: bool,
        /// Nonce masking the basis.
        nonce: u32,
    },
    /// Bob → Alice: Bob is ready for the next round.
    Ready,
    /// Alice → player: masked basis (`m0`) of Alice's `round`.
    Metadata {
        /// Alice's round counter, shared with the photon of that round.
        round: u64,
        metadata: BasisMetadata,
    },
    /// Bob → player: the nonce (`m1`).
    Nonce(u32),
    /// Player → verifier: measured bit.
    Measurement(bool),
    /// Player → verifier: no photon was detected.
    NoPhoton,
    /// Dave → Eve: what Dave learned this round.
    Intercept(Intercept),
}

impl Message {
    /// The reply for a measurement that may have lost its photon.
    pub fn reply(outcome: Option<bool>) -> Self {
        match outcome {
            Some(bit) => Message::Measurement(bit),
            None => Message::NoPhoton,
        }
    }

    /// Short tag for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Values { .. } => "VALUES",
            Message::Ready => "READY",
            Message::Metadata { .. } => "M0",
            Message::Nonce(_) => "M1",
            Message::Measurement(_) => "MEASUREMENT",
            Message::NoPhoton => "NO_PHOTON",
            Message::Intercept(_) => "DATA",
        }
    }
}

/// Dave's report to Eve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Intercept {
    /// The photon had not arrived when the metadata did.
    NoPhoton,
    /// Dave measured the photon in his own basis.
    Measured {
        /// Dave's raw outcome.
        outcome: bool,
        /// The basis Dave measured in.
        basis: Basis,
        /// Alice's masked basis.
        metadata: BasisMetadata,
    },
}

/// Anything that can travel over a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A classical message.
    Classical(Message),
    /// A photon, labelled with the round it was prepared for.
    Quantum {
        round: u64,
        register: QuantumRegister,
    },
}

impl Payload {
    pub fn is_quantum(&self) -> bool {
        matches!(self, Payload::Quantum { .. })
    }
}
