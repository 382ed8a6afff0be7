//! The contract between the simulation driver and the protocol roles.
//!
//! A role is a state machine that reacts to a batch of [`RoleEvent`]s and
//! answers with [`Action`]s collected in a [`RoleContext`]. Roles never touch
//! the scheduler or the network directly.

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use qpv_quantum::QuantumRegister;

use crate::error::ProtocolResult;
use crate::message::{Message, Payload};
use crate::network::Port;
use crate::results::{DecisionLog, Results};
use crate::time::SimTime;

/// Timers a role may set. Each role keeps at most one of each pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerId {
    /// Alice: start preparing the qubit.
    Prepare,
    /// Alice: send the delayed synchronisation message.
    Sync,
    /// Alice: release the qubit.
    QubitSlot,
    /// Alice: release the basis metadata.
    MetadataSlot,
    /// Bob: release the nonce.
    NonceSlot,
    /// Bob: send READY.
    Ready,
    /// Verifiers: begin the next round.
    NextRound,
    /// Charlie: grace period for a late photon.
    Grace,
}

/// Something that happened to a role.
#[derive(Debug, Clone, PartialEq)]
pub enum RoleEvent {
    /// A classical message arrived on `port`.
    Message { port: Port, message: Message },
    /// A photon for `round` arrived on `port`.
    Qubit {
        port: Port,
        round: u64,
        register: QuantumRegister,
    },
    /// A timer fired.
    Timer(TimerId),
    /// The running quantum program finished.
    ProgramDone,
}

/// Something a role wants the driver to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Transmit a payload on an outbound port.
    Send { port: Port, payload: Payload },
    /// Wake the role after `delay_ns`.
    SetTimer { timer: TimerId, delay_ns: f64 },
    /// Occupy the local device for `duration_ns`, then deliver `ProgramDone`.
    RunProgram { duration_ns: f64 },
}

/// Per-dispatch access to the clock, the node's RNG and the action buffer.
pub struct RoleContext<'a> {
    now: SimTime,
    rng: &'a mut StdRng,
    actions: Vec<Action>,
}

impl<'a> RoleContext<'a> {
    pub fn new(now: SimTime, rng: &'a mut StdRng) -> Self {
        Self {
            now,
            rng,
            actions: Vec::new(),
        }
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut *self.rng
    }

    pub fn send(&mut self, port: Port, message: Message) {
        self.actions.push(Action::Send {
            port,
            payload: Payload::Classical(message),
        });
    }

    pub fn send_qubit(&mut self, port: Port, round: u64, register: QuantumRegister) {
        self.actions.push(Action::Send {
            port,
            payload: Payload::Quantum { round, register },
        });
    }

    pub fn set_timer(&mut self, timer: TimerId, delay_ns: f64) {
        self.actions.push(Action::SetTimer {
            timer,
            delay_ns: delay_ns.max(0.0),
        });
    }

    pub fn run_program(&mut self, duration_ns: f64) {
        self.actions.push(Action::RunProgram {
            duration_ns: duration_ns.max(0.0),
        });
    }

    pub fn into_actions(self) -> Vec<Action> {
        self.actions
    }
}

/// What a role accumulated over a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RoleReport {
    /// A verifier's round results.
    Verifier(Results),
    /// A prover's or adversary's decisions.
    Player(DecisionLog),
}

/// A protocol participant driven by the simulation.
pub trait Role: Send {
    /// Node name.
    fn name(&self) -> &str;

    /// Ports that must be bound before the run starts.
    fn required_ports(&self) -> &'static [Port];

    /// Called once at time zero.
    fn start(&mut self, ctx: &mut RoleContext<'_>) -> ProtocolResult<()>;

    /// React to every event delivered to this node at the current instant.
    fn handle(&mut self, events: Vec<RoleEvent>, ctx: &mut RoleContext<'_>)
    -> ProtocolResult<()>;

    fn report(&self) -> RoleReport;
}
