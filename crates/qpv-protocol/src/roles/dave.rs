//! Dave: the adversary on Alice's side.

use tracing::{debug, trace};

use qpv_quantum::{QuantumDevice, QuantumRegister};

use crate::basis::{Basis, BasisMetadata};
use crate::decision::FidelityStrategy;
use crate::error::ProtocolResult;
use crate::message::{Intercept, Message};
use crate::network::Port;
use crate::results::DecisionLog;
use crate::role::{Role, RoleContext, RoleEvent, RoleReport};

use super::DAVE;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DaveState {
    /// Waiting for Alice's `m0`.
    AwaitMetadata,
    /// Measuring the photon in his own basis.
    Measuring {
        basis: Basis,
        metadata: BasisMetadata,
        outcome: Option<bool>,
    },
    /// Intercept sent to Eve; waiting for the nonce she relays.
    AwaitNonce { intercept: Intercept },
}

#[derive(Debug, Default)]
struct Inbox {
    metadata: Option<(u64, BasisMetadata)>,
    nonce: Option<u32>,
    register: Option<(u64, QuantumRegister)>,
    program_done: bool,
}

/// Intercepts the photon, measures it early and answers Alice.
pub struct Dave {
    strategy: FidelityStrategy,
    device: Box<dyn QuantumDevice>,
    state: DaveState,
    inbox: Inbox,
    log: DecisionLog,
}

impl Dave {
    pub fn new(strategy: FidelityStrategy, device: Box<dyn QuantumDevice>) -> Self {
        Self {
            strategy,
            device,
            state: DaveState::AwaitMetadata,
            inbox: Inbox::default(),
            log: DecisionLog::new(),
        }
    }

    pub fn state(&self) -> DaveState {
        self.state
    }

    pub fn log(&self) -> &DecisionLog {
        &self.log
    }

    fn absorb(&mut self, event: RoleEvent) {
        match event {
            RoleEvent::Message {
                port: Port::Alice,
                message: Message::Metadata { round, metadata },
            } => self.inbox.metadata = Some((round, metadata)),
            RoleEvent::Message {
                port: Port::Partner,
                message: Message::Nonce(nonce),
            } => self.inbox.nonce = Some(nonce),
            RoleEvent::Qubit {
                port: Port::QuantumIn,
                round,
                register,
            } => self.inbox.register = Some((round, register)),
            RoleEvent::ProgramDone => self.inbox.program_done = true,
            other => trace!(node = DAVE, event = ?other, "ignored event"),
        }
    }

    /// `m0` is in: measure the photon of the same round, if it has arrived.
    fn intercept(
        &mut self,
        round: u64,
        metadata: BasisMetadata,
        ctx: &mut RoleContext<'_>,
    ) -> ProtocolResult<()> {
        let mut register = match self.inbox.register.take() {
            Some((tag, register)) if tag == round && !register.is_lost() => register,
            _ => {
                debug!(node = DAVE, "no photon before metadata");
                self.forward(Intercept::NoPhoton, ctx);
                return Ok(());
            }
        };
        let m = self.strategy.m;
        let basis = Basis::random(m, ctx.rng());
        let gate = basis.gate(m)?;
        self.device.prepare(&mut register, &gate, true, ctx.rng())?;
        let outcome = self.device.measure(register, ctx.rng())?;
        ctx.run_program(self.device.durations().decode());
        self.inbox.program_done = false;
        self.state = DaveState::Measuring {
            basis,
            metadata,
            outcome,
        };
        Ok(())
    }

    fn forward(&mut self, intercept: Intercept, ctx: &mut RoleContext<'_>) {
        ctx.send(Port::Partner, Message::Intercept(intercept));
        self.state = DaveState::AwaitNonce { intercept };
    }

    fn conclude(
        &mut self,
        intercept: Intercept,
        nonce: u32,
        ctx: &mut RoleContext<'_>,
    ) -> ProtocolResult<()> {
        let decision = match intercept {
            Intercept::NoPhoton => None,
            Intercept::Measured {
                outcome,
                basis,
                metadata,
            } => self.strategy.respond(outcome, basis, metadata, nonce)?,
        };
        ctx.send(Port::Alice, Message::reply(decision));
        self.log.push(decision);
        debug!(node = DAVE, ?decision, "answered Alice");
        self.state = DaveState::AwaitMetadata;
        Ok(())
    }

    fn advance(&mut self, ctx: &mut RoleContext<'_>) -> ProtocolResult<()> {
        loop {
            let progressed = match self.state {
                DaveState::AwaitMetadata => match self.inbox.metadata.take() {
                    Some((round, metadata)) => {
                        self.intercept(round, metadata, ctx)?;
                        true
                    }
                    None => false,
                },
                DaveState::Measuring {
                    basis,
                    metadata,
                    outcome,
                } => {
                    let done = std::mem::take(&mut self.inbox.program_done);
                    if done {
                        let intercept = match outcome {
                            Some(outcome) => Intercept::Measured {
                                outcome,
                                basis,
                                metadata,
                            },
                            None => Intercept::NoPhoton,
                        };
                        self.forward(intercept, ctx);
                    }
                    done
                }
                DaveState::AwaitNonce { intercept } => match self.inbox.nonce.take() {
                    Some(nonce) => {
                        self.conclude(intercept, nonce, ctx)?;
                        true
                    }
                    None => false,
                },
            };
            if !progressed {
                return Ok(());
            }
        }
    }
}

impl Role for Dave {
    fn name(&self) -> &str {
        DAVE
    }

    fn required_ports(&self) -> &'static [Port] {
        &[Port::Alice, Port::Partner, Port::QuantumIn]
    }

    fn start(&mut self, _ctx: &mut RoleContext<'_>) -> ProtocolResult<()> {
        Ok(())
    }

    fn handle(
        &mut self,
        events: Vec<RoleEvent>,
        ctx: &mut RoleContext<'_>,
    ) -> ProtocolResult<()> {
        for event in events {
            self.absorb(event);
        }
        self.advance(ctx)
    }

    fn report(&self) -> RoleReport {
        RoleReport::Player(self.log.clone())
    }
}
