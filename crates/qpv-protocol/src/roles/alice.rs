//! Alice: the verifier that prepares the photon.

use rand::Rng;
use tracing::{debug, info, trace};

use qpv_quantum::{QuantumDevice, QuantumRegister};

use crate::basis::{Basis, BasisMetadata, random_nonce};
use crate::error::ProtocolResult;
use crate::message::Message;
use crate::network::Port;
use crate::results::{BasisValue, Results, RoundOutcome};
use crate::role::{Role, RoleContext, RoleEvent, RoleReport, TimerId};
use crate::time::SimTime;

use super::{ALICE, FiredTimers, VerifierParams};

/// Where Alice is within a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliceState {
    /// Not started.
    Idle,
    /// Waiting for the `Prepare` timer.
    PrepareQubit,
    /// Waiting for Bob's READY and for the preparation program.
    AwaitReadyAndPrepared,
    /// Waiting for the `QubitSlot` timer.
    QubitSlot,
    /// Waiting for the `MetadataSlot` timer.
    MetadataSlot,
    /// Waiting for the player's reply.
    AwaitResult,
    /// Waiting for the `NextRound` timer.
    NextRound,
    /// Enough rounds collected.
    Done,
}

#[derive(Debug, Clone)]
struct Round {
    index: u64,
    bit: bool,
    basis: Basis,
    metadata: BasisMetadata,
    nonce: u32,
    sync_pending: bool,
    register: Option<QuantumRegister>,
    prepared: bool,
    not_sent: bool,
    sent_at: Option<SimTime>,
}

#[derive(Debug, Default)]
struct Inbox {
    ready_at: Option<SimTime>,
    result: Option<Message>,
    timers: FiredTimers,
}

/// The preparing verifier.
pub struct Alice {
    params: VerifierParams,
    device: Box<dyn QuantumDevice>,
    state: AliceState,
    round: Option<Round>,
    inbox: Inbox,
    issued: u64,
    answered: u64,
    results: Results,
}

impl Alice {
    pub fn new(params: VerifierParams, device: Box<dyn QuantumDevice>) -> Self {
        Self {
            params,
            device,
            state: AliceState::Idle,
            round: None,
            inbox: Inbox::default(),
            issued: 0,
            answered: 0,
            results: Results::new(),
        }
    }

    pub fn state(&self) -> AliceState {
        self.state
    }

    pub fn results(&self) -> &Results {
        &self.results
    }

    fn absorb(&mut self, event: RoleEvent, now: SimTime) {
        match event {
            RoleEvent::Message {
                port: Port::Bob,
                message: Message::Ready,
            } => self.inbox.ready_at = Some(now),
            RoleEvent::Message {
                port: Port::Player,
                message: message @ (Message::Measurement(_) | Message::NoPhoton),
            } => self.inbox.result = Some(message),
            RoleEvent::Timer(timer) => self.inbox.timers.push(timer),
            RoleEvent::ProgramDone => {
                if let Some(round) = self.round.as_mut() {
                    round.prepared = true;
                }
            }
            other => trace!(node = ALICE, event = ?other, "ignored event"),
        }
    }

    fn start_round(&mut self, ctx: &mut RoleContext<'_>) -> ProtocolResult<()> {
        let m = self.params.bases;
        let bit: bool = ctx.rng().r#gen();
        let basis = Basis::random(m, ctx.rng());
        let nonce = random_nonce(m, ctx.rng());
        let metadata = basis.conceal(nonce, m);
        self.issued += 1;
        debug!(
            node = ALICE,
            round = self.issued,
            bit,
            theta = basis.theta,
            phi = basis.phi,
            nonce,
            "round started"
        );

        let plan = self.params.plan;
        let sync_pending = plan.preparation_allowance > 0.0;
        if sync_pending {
            ctx.set_timer(TimerId::Sync, plan.preparation_allowance);
        } else {
            ctx.send(Port::Bob, Message::Values { bit, nonce });
        }
        self.round = Some(Round {
            index: self.issued,
            bit,
            basis,
            metadata,
            nonce,
            sync_pending,
            register: None,
            prepared: false,
            not_sent: false,
            sent_at: None,
        });

        if plan.prepare_delay > 0.0 {
            ctx.set_timer(TimerId::Prepare, plan.prepare_delay);
            self.state = AliceState::PrepareQubit;
        } else {
            self.prepare(ctx)?;
        }
        Ok(())
    }

    fn prepare(&mut self, ctx: &mut RoleContext<'_>) -> ProtocolResult<()> {
        let Some(round) = self.round.as_mut() else {
            return Ok(());
        };
        let gate = round.basis.gate(self.params.bases)?;
        let mut register = self.device.initialize(round.bit, ctx.rng())?;
        self.device.prepare(&mut register, &gate, false, ctx.rng())?;
        round.register = Some(register);
        ctx.run_program(self.device.durations().encode(round.bit));
        self.state = AliceState::AwaitReadyAndPrepared;
        Ok(())
    }

    fn release_qubit(&mut self, ctx: &mut RoleContext<'_>) {
        if let Some(round) = self.round.as_mut() {
            match round.register.take() {
                Some(register) if !register.is_lost() => {
                    ctx.send_qubit(Port::QuantumOut, round.index, register);
                }
                _ => {
                    debug!(node = ALICE, round = self.issued, "photon lost during preparation");
                    round.not_sent = true;
                }
            }
        }
        let lag = self.params.plan.metadata_lag;
        if lag > 0.0 {
            ctx.set_timer(TimerId::MetadataSlot, lag);
            self.state = AliceState::MetadataSlot;
        } else {
            self.release_metadata(ctx);
        }
    }

    fn release_metadata(&mut self, ctx: &mut RoleContext<'_>) {
        if let Some(round) = self.round.as_mut() {
            round.sent_at = Some(ctx.now());
            ctx.send(
                Port::Player,
                Message::Metadata {
                    round: round.index,
                    metadata: round.metadata,
                },
            );
        }
        self.state = AliceState::AwaitResult;
    }

    fn record(&mut self, reply: Message, ctx: &mut RoleContext<'_>) -> ProtocolResult<()> {
        let Some(round) = self.round.take() else {
            return Ok(());
        };
        let elapsed = round.sent_at.map_or(0.0, |t| ctx.now() - t);
        let on_time = self.params.on_time(elapsed, self.params.plan.alice_expected());
        let outcome = if round.not_sent {
            RoundOutcome::NotSent
        } else {
            match reply {
                Message::Measurement(value) => RoundOutcome::Answered(value == round.bit),
                _ => RoundOutcome::NoPhoton,
            }
        };
        if matches!(outcome, RoundOutcome::Answered(_)) {
            self.answered += 1;
        }
        self.results
            .record(outcome, on_time, BasisValue::Metadata(round.metadata));
        debug!(
            node = ALICE,
            round = self.issued,
            ?outcome,
            on_time,
            elapsed,
            nonce = round.nonce,
            "round recorded"
        );

        if self.params.finished(ALICE, self.answered, self.issued) {
            info!(
                node = ALICE,
                answered = self.answered,
                issued = self.issued,
                "verification finished"
            );
            self.state = AliceState::Done;
        } else if self.params.plan.alice_settle > 0.0 {
            ctx.set_timer(TimerId::NextRound, self.params.plan.alice_settle);
            self.state = AliceState::NextRound;
        } else {
            self.start_round(ctx)?;
        }
        Ok(())
    }

    /// Run transitions until the inbox no longer allows one.
    fn advance(&mut self, ctx: &mut RoleContext<'_>) -> ProtocolResult<()> {
        loop {
            let mut progressed = false;

            if let Some(round) = self.round.as_mut() {
                if round.sync_pending && self.inbox.timers.take(TimerId::Sync) {
                    round.sync_pending = false;
                    ctx.send(
                        Port::Bob,
                        Message::Values {
                            bit: round.bit,
                            nonce: round.nonce,
                        },
                    );
                    progressed = true;
                }
            }

            match self.state {
                AliceState::Idle | AliceState::Done => {}
                AliceState::PrepareQubit => {
                    if self.inbox.timers.take(TimerId::Prepare) {
                        self.prepare(ctx)?;
                        progressed = true;
                    }
                }
                AliceState::AwaitReadyAndPrepared => {
                    let prepared = self.round.as_ref().is_some_and(|r| r.prepared);
                    if prepared {
                        if let Some(ready_at) = self.inbox.ready_at.take() {
                            let release = ready_at + self.params.plan.qubit_lead;
                            let wait = release - ctx.now();
                            if wait > 0.0 {
                                ctx.set_timer(TimerId::QubitSlot, wait);
                                self.state = AliceState::QubitSlot;
                            } else {
                                self.release_qubit(ctx);
                            }
                            progressed = true;
                        }
                    }
                }
                AliceState::QubitSlot => {
                    if self.inbox.timers.take(TimerId::QubitSlot) {
                        self.release_qubit(ctx);
                        progressed = true;
                    }
                }
                AliceState::MetadataSlot => {
                    if self.inbox.timers.take(TimerId::MetadataSlot) {
                        self.release_metadata(ctx);
                        progressed = true;
                    }
                }
                AliceState::AwaitResult => {
                    if let Some(reply) = self.inbox.result.take() {
                        self.record(reply, ctx)?;
                        progressed = true;
                    }
                }
                AliceState::NextRound => {
                    if self.inbox.timers.take(TimerId::NextRound) {
                        self.start_round(ctx)?;
                        progressed = true;
                    }
                }
            }

            if !progressed {
                return Ok(());
            }
        }
    }
}

impl Role for Alice {
    fn name(&self) -> &str {
        ALICE
    }

    fn required_ports(&self) -> &'static [Port] {
        &[Port::Bob, Port::Player, Port::QuantumOut]
    }

    fn start(&mut self, ctx: &mut RoleContext<'_>) -> ProtocolResult<()> {
        info!(
            node = ALICE,
            rounds = self.params.rounds,
            bases = self.params.bases,
            "starting verification"
        );
        self.start_round(ctx)?;
        self.advance(ctx)
    }

    fn handle(
        &mut self,
        events: Vec<RoleEvent>,
        ctx: &mut RoleContext<'_>,
    ) -> ProtocolResult<()> {
        let now = ctx.now();
        for event in events {
            self.absorb(event, now);
        }
        self.advance(ctx)
    }

    fn report(&self) -> RoleReport {
        RoleReport::Verifier(self.results.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::DelayModel;
    use crate::message::Payload;
    use crate::role::Action;
    use crate::timing::TimingPlan;
    use qpv_quantum::{Absorption, Processor, ProcessorProfile};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn alice(distance_alice: f64, distance_bob: f64, profile: ProcessorProfile) -> Alice {
        let params = VerifierParams {
            bases: 2,
            rounds: 3,
            max_rounds: None,
            plan: TimingPlan::new(
                distance_alice,
                distance_bob,
                DelayModel::classical(),
                DelayModel::quantum(),
                0.0,
                0.021,
                0.001,
            ),
            tolerance: 1e-9,
        };
        Alice::new(params, Box::new(Processor::new(ALICE, profile)))
    }

    fn step(a: &mut Alice, rng: &mut StdRng, ns: f64, events: Vec<RoleEvent>) -> Vec<Action> {
        let mut ctx = RoleContext::new(SimTime::from_ns(ns), rng);
        a.handle(events, &mut ctx).unwrap();
        ctx.into_actions()
    }

    fn ready() -> RoleEvent {
        RoleEvent::Message {
            port: Port::Bob,
            message: Message::Ready,
        }
    }

    fn reply(message: Message) -> RoleEvent {
        RoleEvent::Message {
            port: Port::Player,
            message,
        }
    }

    fn sent_qubit(actions: &[Action]) -> Option<u64> {
        actions.iter().find_map(|a| match a {
            Action::Send {
                port: Port::QuantumOut,
                payload: Payload::Quantum { round, .. },
            } => Some(*round),
            _ => None,
        })
    }

    /// From `PrepareQubit`, run one round up to `AwaitResult`; returns its bit.
    fn run_to_result(a: &mut Alice, rng: &mut StdRng) -> bool {
        step(a, rng, 0.0, vec![RoleEvent::Timer(TimerId::Prepare)]);
        step(a, rng, 10.0, vec![ready(), RoleEvent::ProgramDone]);
        step(a, rng, 20.0, vec![RoleEvent::Timer(TimerId::MetadataSlot)]);
        assert_eq!(a.state(), AliceState::AwaitResult);
        a.round.as_ref().map(|r| r.bit).unwrap()
    }

    fn started(a: &mut Alice, rng: &mut StdRng) -> Vec<Action> {
        let mut ctx = RoleContext::new(SimTime::ZERO, rng);
        a.start(&mut ctx).unwrap();
        ctx.into_actions()
    }

    #[test]
    fn test_start_sends_values_and_defers_preparation() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut a = alice(10.0, 10.0, ProcessorProfile::ideal());
        let actions = started(&mut a, &mut rng);
        assert_eq!(a.state(), AliceState::PrepareQubit);
        assert!(matches!(
            actions.as_slice(),
            [
                Action::Send {
                    port: Port::Bob,
                    payload: Payload::Classical(Message::Values { .. }),
                },
                Action::SetTimer {
                    timer: TimerId::Prepare,
                    ..
                },
            ]
        ));
    }

    #[test]
    fn test_ready_before_preparation_finishes() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut a = alice(10.0, 10.0, ProcessorProfile::ideal());
        started(&mut a, &mut rng);
        step(&mut a, &mut rng, 5.0, vec![RoleEvent::Timer(TimerId::Prepare)]);
        assert_eq!(a.state(), AliceState::AwaitReadyAndPrepared);

        assert!(step(&mut a, &mut rng, 6.0, vec![ready()]).is_empty());
        assert_eq!(a.state(), AliceState::AwaitReadyAndPrepared);

        let actions = step(&mut a, &mut rng, 6.0, vec![RoleEvent::ProgramDone]);
        assert_eq!(sent_qubit(&actions), Some(1));
        assert_eq!(a.state(), AliceState::MetadataSlot);
    }

    #[test]
    fn test_preparation_finishes_before_ready() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut a = alice(10.0, 10.0, ProcessorProfile::ideal());
        started(&mut a, &mut rng);
        step(&mut a, &mut rng, 5.0, vec![RoleEvent::Timer(TimerId::Prepare)]);

        assert!(step(&mut a, &mut rng, 5.0, vec![RoleEvent::ProgramDone]).is_empty());
        assert_eq!(a.state(), AliceState::AwaitReadyAndPrepared);

        let actions = step(&mut a, &mut rng, 8.0, vec![ready()]);
        assert_eq!(sent_qubit(&actions), Some(1));
        assert_eq!(a.state(), AliceState::MetadataSlot);
    }

    #[test]
    fn test_photon_slot_precedes_metadata_slot() {
        // Bob is far away, so the photon waits for its slot after READY
        let mut rng = StdRng::seed_from_u64(4);
        let mut a = alice(2.0, 18.0, ProcessorProfile::ideal());
        started(&mut a, &mut rng);
        step(&mut a, &mut rng, 0.0, vec![RoleEvent::Timer(TimerId::Prepare)]);

        let actions = step(&mut a, &mut rng, 100.0, vec![ready(), RoleEvent::ProgramDone]);
        assert_eq!(a.state(), AliceState::QubitSlot);
        assert!(matches!(
            actions.as_slice(),
            [Action::SetTimer { timer: TimerId::QubitSlot, delay_ns }]
                if (*delay_ns - a.params.plan.qubit_lead).abs() < 1e-6
        ));

        let actions = step(&mut a, &mut rng, 50_100.0, vec![RoleEvent::Timer(TimerId::QubitSlot)]);
        assert_eq!(sent_qubit(&actions), Some(1));
        assert!(matches!(
            actions.last(),
            Some(Action::SetTimer {
                timer: TimerId::MetadataSlot,
                ..
            })
        ));

        let actions = step(
            &mut a,
            &mut rng,
            53_433.0,
            vec![RoleEvent::Timer(TimerId::MetadataSlot)],
        );
        assert!(matches!(
            actions.as_slice(),
            [Action::Send {
                port: Port::Player,
                payload: Payload::Classical(Message::Metadata { round: 1, .. }),
            }]
        ));
        assert_eq!(a.state(), AliceState::AwaitResult);
    }

    #[test]
    fn test_replies_are_recorded_against_the_bit() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut a = alice(10.0, 10.0, ProcessorProfile::ideal());
        started(&mut a, &mut rng);

        let bit = run_to_result(&mut a, &mut rng);
        step(&mut a, &mut rng, 30.0, vec![reply(Message::Measurement(bit))]);
        let bit = run_to_result(&mut a, &mut rng);
        step(&mut a, &mut rng, 30.0, vec![reply(Message::Measurement(!bit))]);
        run_to_result(&mut a, &mut rng);
        step(&mut a, &mut rng, 30.0, vec![reply(Message::NoPhoton)]);

        assert_eq!(
            a.results().correctness(),
            &[
                RoundOutcome::Answered(true),
                RoundOutcome::Answered(false),
                RoundOutcome::NoPhoton
            ]
        );
        assert_eq!(a.results().timeliness(), &[true, true, true]);
        assert!(
            a.results()
                .basis_values()
                .iter()
                .all(|v| matches!(v, BasisValue::Metadata(_)))
        );
        // two answers out of three: a fourth round is under way
        assert_eq!(a.state(), AliceState::PrepareQubit);
    }

    #[test]
    fn test_photon_lost_in_preparation_is_not_sent() {
        let mut rng = StdRng::seed_from_u64(2);
        let profile = ProcessorProfile {
            gate_absorption: Absorption::new(1.0).unwrap(),
            ..ProcessorProfile::ideal()
        };
        let mut a = alice(10.0, 10.0, profile);
        started(&mut a, &mut rng);
        step(&mut a, &mut rng, 0.0, vec![RoleEvent::Timer(TimerId::Prepare)]);
        let actions = step(&mut a, &mut rng, 10.0, vec![ready(), RoleEvent::ProgramDone]);
        assert_eq!(sent_qubit(&actions), None);

        step(&mut a, &mut rng, 20.0, vec![RoleEvent::Timer(TimerId::MetadataSlot)]);
        // a player may well claim a measurement; the round still never counts
        step(&mut a, &mut rng, 30.0, vec![reply(Message::Measurement(true))]);
        assert_eq!(a.results().correctness(), &[RoundOutcome::NotSent]);
    }
}
