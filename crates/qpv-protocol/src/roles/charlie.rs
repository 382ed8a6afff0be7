//! Charlie: the honest prover at the verification position.

use tracing::{debug, trace};

use qpv_quantum::{QuantumDevice, QuantumRegister};

use crate::basis::BasisMetadata;
use crate::error::ProtocolResult;
use crate::message::Message;
use crate::network::Port;
use crate::results::DecisionLog;
use crate::role::{Role, RoleContext, RoleEvent, RoleReport, TimerId};

use super::{CHARLIE, FiredTimers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharlieState {
    /// Waiting for both halves of the basis.
    AwaitBasis,
    /// Both halves of `round` known; waiting out the grace period.
    Grace {
        round: u64,
        metadata: BasisMetadata,
        nonce: u32,
    },
    /// Device busy measuring; the outcome goes out when it finishes.
    Measuring { outcome: Option<bool> },
}

#[derive(Debug, Default)]
struct Inbox {
    metadata: Option<(u64, BasisMetadata)>,
    nonce: Option<u32>,
    register: Option<(u64, QuantumRegister)>,
    timers: FiredTimers,
    program_done: bool,
}

/// Measures honestly in the basis the verifiers jointly reveal.
pub struct Charlie {
    bases: u32,
    grace_ns: f64,
    device: Box<dyn QuantumDevice>,
    state: CharlieState,
    inbox: Inbox,
    log: DecisionLog,
}

impl Charlie {
    pub fn new(bases: u32, grace_ns: f64, device: Box<dyn QuantumDevice>) -> Self {
        Self {
            bases,
            grace_ns,
            device,
            state: CharlieState::AwaitBasis,
            inbox: Inbox::default(),
            log: DecisionLog::new(),
        }
    }

    pub fn state(&self) -> CharlieState {
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
                port: Port::Bob,
                message: Message::Nonce(nonce),
            } => self.inbox.nonce = Some(nonce),
            RoleEvent::Qubit {
                port: Port::QuantumIn,
                round,
                register,
            } => self.inbox.register = Some((round, register)),
            RoleEvent::Timer(timer) => self.inbox.timers.push(timer),
            RoleEvent::ProgramDone => self.inbox.program_done = true,
            other => trace!(node = CHARLIE, event = ?other, "ignored event"),
        }
    }

    fn reply(&mut self, outcome: Option<bool>, ctx: &mut RoleContext<'_>) {
        let message = Message::reply(outcome);
        ctx.send(Port::Alice, message.clone());
        ctx.send(Port::Bob, message);
        self.log.push(outcome);
        debug!(node = CHARLIE, ?outcome, "reported");
        self.state = CharlieState::AwaitBasis;
    }

    fn measure(
        &mut self,
        round: u64,
        metadata: BasisMetadata,
        nonce: u32,
        ctx: &mut RoleContext<'_>,
    ) -> ProtocolResult<()> {
        let mut register = match self.inbox.register.take() {
            Some((tag, register)) if tag == round && !register.is_lost() => register,
            other => {
                if let Some((tag, _)) = other.filter(|(tag, _)| *tag != round) {
                    debug!(
                        node = CHARLIE,
                        photon_round = tag,
                        round,
                        "discarded photon of another round"
                    );
                }
                debug!(node = CHARLIE, "no photon after grace period");
                self.reply(None, ctx);
                return Ok(());
            }
        };
        let gate = metadata.reveal(nonce, self.bases).gate(self.bases)?;
        self.device.prepare(&mut register, &gate, true, ctx.rng())?;
        let outcome = self.device.measure(register, ctx.rng())?;
        ctx.run_program(self.device.durations().decode());
        self.inbox.program_done = false;
        self.state = CharlieState::Measuring { outcome };
        Ok(())
    }

    fn advance(&mut self, ctx: &mut RoleContext<'_>) -> ProtocolResult<()> {
        loop {
            let progressed = match self.state {
                CharlieState::AwaitBasis => match (self.inbox.metadata, self.inbox.nonce) {
                    (Some((round, metadata)), Some(nonce)) => {
                        self.inbox.metadata = None;
                        self.inbox.nonce = None;
                        ctx.set_timer(TimerId::Grace, self.grace_ns);
                        self.state = CharlieState::Grace {
                            round,
                            metadata,
                            nonce,
                        };
                        true
                    }
                    _ => false,
                },
                CharlieState::Grace {
                    round,
                    metadata,
                    nonce,
                } => {
                    let fired = self.inbox.timers.take(TimerId::Grace);
                    if fired {
                        self.measure(round, metadata, nonce, ctx)?;
                    }
                    fired
                }
                CharlieState::Measuring { outcome } => {
                    let done = std::mem::take(&mut self.inbox.program_done);
                    if done {
                        self.reply(outcome, ctx);
                    }
                    done
                }
            };
            if !progressed {
                return Ok(());
            }
        }
    }
}

impl Role for Charlie {
    fn name(&self) -> &str {
        CHARLIE
    }

    fn required_ports(&self) -> &'static [Port] {
        &[Port::Alice, Port::Bob, Port::QuantumIn]
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::Basis;
    use crate::message::Payload;
    use crate::role::Action;
    use crate::time::SimTime;
    use qpv_quantum::{Processor, ProcessorProfile};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn charlie() -> Charlie {
        Charlie::new(2, 0.001, Box::new(Processor::new(CHARLIE, ProcessorProfile::ideal())))
    }

    fn replies(actions: &[Action]) -> Vec<(Port, Message)> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Send {
                    port,
                    payload: Payload::Classical(m),
                } => Some((*port, m.clone())),
                _ => None,
            })
            .collect()
    }

    fn inputs(round: u64, basis: Basis, nonce: u32) -> Vec<RoleEvent> {
        vec![
            RoleEvent::Message {
                port: Port::Alice,
                message: Message::Metadata {
                    round,
                    metadata: basis.conceal(nonce, 2),
                },
            },
            RoleEvent::Message {
                port: Port::Bob,
                message: Message::Nonce(nonce),
            },
        ]
    }

    /// A photon carrying `bit` in `basis`, as Alice would send it.
    fn photon(round: u64, basis: Basis, bit: bool, rng: &mut StdRng) -> RoleEvent {
        let gate = basis.gate(2).unwrap();
        let mut source = Processor::new("source", ProcessorProfile::ideal());
        let mut register = source.initialize(bit, rng).unwrap();
        source.prepare(&mut register, &gate, false, rng).unwrap();
        RoleEvent::Qubit {
            port: Port::QuantumIn,
            round,
            register,
        }
    }

    fn end_grace(c: &mut Charlie, rng: &mut StdRng) -> Vec<Action> {
        let mut ctx = RoleContext::new(SimTime::from_ns(0.001), rng);
        c.handle(vec![RoleEvent::Timer(TimerId::Grace)], &mut ctx)
            .unwrap();
        ctx.into_actions()
    }

    #[test]
    fn test_inputs_in_either_order_start_the_grace_period() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut c = charlie();
        let metadata = Basis { theta: 1, phi: 1 }.conceal(2, 2);

        let mut ctx = RoleContext::new(SimTime::ZERO, &mut rng);
        c.handle(
            vec![RoleEvent::Message {
                port: Port::Bob,
                message: Message::Nonce(2),
            }],
            &mut ctx,
        )
        .unwrap();
        assert_eq!(c.state(), CharlieState::AwaitBasis);

        c.handle(
            vec![RoleEvent::Message {
                port: Port::Alice,
                message: Message::Metadata { round: 1, metadata },
            }],
            &mut ctx,
        )
        .unwrap();
        assert_eq!(
            c.state(),
            CharlieState::Grace {
                round: 1,
                metadata,
                nonce: 2
            }
        );
    }

    #[test]
    fn test_missing_photon_is_reported_to_both_verifiers() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut c = charlie();
        let mut ctx = RoleContext::new(SimTime::ZERO, &mut rng);
        c.handle(inputs(1, Basis { theta: 0, phi: 0 }, 1), &mut ctx)
            .unwrap();

        assert_eq!(
            replies(&end_grace(&mut c, &mut rng)),
            vec![(Port::Alice, Message::NoPhoton), (Port::Bob, Message::NoPhoton)]
        );
        assert_eq!(c.log().entries(), &[None]);
        assert_eq!(c.state(), CharlieState::AwaitBasis);
    }

    #[test]
    fn test_photon_is_measured_in_revealed_basis() {
        let mut rng = StdRng::seed_from_u64(1);
        let basis = Basis { theta: 1, phi: 2 };
        let mut c = charlie();
        let mut events = vec![photon(1, basis, true, &mut rng)];
        events.extend(inputs(1, basis, 4));
        let mut ctx = RoleContext::new(SimTime::ZERO, &mut rng);
        c.handle(events, &mut ctx).unwrap();

        end_grace(&mut c, &mut rng);
        assert_eq!(
            c.state(),
            CharlieState::Measuring {
                outcome: Some(true)
            }
        );

        let mut ctx = RoleContext::new(SimTime::from_ns(0.001), &mut rng);
        c.handle(vec![RoleEvent::ProgramDone], &mut ctx).unwrap();
        assert_eq!(
            replies(&ctx.into_actions()),
            vec![
                (Port::Alice, Message::Measurement(true)),
                (Port::Bob, Message::Measurement(true))
            ]
        );
        assert_eq!(c.log().entries(), &[Some(true)]);
    }

    #[test]
    fn test_late_photon_is_not_measured_in_the_next_round() {
        let mut rng = StdRng::seed_from_u64(1);
        let basis = Basis { theta: 1, phi: 2 };
        let mut c = charlie();

        // round 1: the photon misses the grace period and lands afterwards
        let mut ctx = RoleContext::new(SimTime::ZERO, &mut rng);
        c.handle(inputs(1, basis, 3), &mut ctx).unwrap();
        end_grace(&mut c, &mut rng);
        let late = photon(1, basis, true, &mut rng);
        let mut ctx = RoleContext::new(SimTime::from_ns(5.0), &mut rng);
        c.handle(vec![late], &mut ctx).unwrap();

        // round 2: its own photon never arrives
        let mut ctx = RoleContext::new(SimTime::from_ns(100.0), &mut rng);
        c.handle(inputs(2, basis, 0), &mut ctx).unwrap();
        assert_eq!(
            replies(&end_grace(&mut c, &mut rng)),
            vec![(Port::Alice, Message::NoPhoton), (Port::Bob, Message::NoPhoton)]
        );
        assert_eq!(c.log().entries(), &[None, None]);
    }
}
