//! `qpv-protocol`: a discrete-event simulator for single-qubit BB84 quantum
//! position verification.
//!
//! Two verifiers, Alice and Bob, challenge a party that claims to sit at the
//! verification position `P_v`. Alice sends a photon prepared in a secret
//! basis and the nonce-masked basis; Bob sends the nonce. Only a party
//! receiving all three at `P_v` can measure correctly and answer both
//! verifiers in time.
//!
//! The crate provides:
//! - a global [`Scheduler`] and a [`Network`] of distance-delayed channels,
//! - explicit state machines for each [`roles`] participant,
//! - ready-made scenarios ([`HonestSetup`], [`FidelityAttack`]),
//! - per-verifier [`Results`] and per-player [`DecisionLog`]s.
//!
//! # Quick start
//!
//! ```rust
//! use qpv_protocol::{HonestSetup, ProtocolConfig, RoundOutcome};
//!
//! let config = ProtocolConfig {
//!     rounds: 3,
//!     seed: Some(11),
//!     ..ProtocolConfig::noiseless()
//! };
//! let report = HonestSetup::at_verification(config).unwrap().run().unwrap();
//! let alice = report.alice().unwrap();
//! assert_eq!(alice.len(), 3);
//! assert!(alice.correctness().iter().all(|o| *o == RoundOutcome::Answered(true)));
//! ```

pub mod attack;
pub mod basis;
pub mod channel;
pub mod config;
pub mod decision;
pub mod error;
pub mod honest;
pub mod message;
pub mod network;
pub mod results;
pub mod role;
pub mod roles;
pub mod scheduler;
pub mod simulation;
pub mod time;
pub mod timing;
pub mod verifiers;

pub use attack::FidelityAttack;
pub use basis::{Basis, BasisMetadata};
pub use channel::{Channel, ChannelKind, DelayModel, Direction};
pub use config::{ConfigError, ProtocolConfig};
pub use decision::{Decision, FidelityStrategy, fidelity, l_fraction};
pub use error::{ProtocolError, ProtocolResult};
pub use honest::HonestSetup;
pub use message::{Intercept, Message, Payload};
pub use network::{ConnectionSpec, Network, NodeId, Port};
pub use results::{BasisValue, DecisionLog, ResultSummary, Results, RoundOutcome};
pub use role::{Action, Role, RoleContext, RoleEvent, RoleReport, TimerId};
pub use scheduler::Scheduler;
pub use simulation::{RunReport, RunStats, Simulation};
pub use time::SimTime;
pub use timing::TimingPlan;
pub use verifiers::{VerifierNodes, VerifierSetup};
