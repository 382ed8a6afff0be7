//! Bob: the verifier that relays the nonce.

use tracing::{debug, info, trace};

use crate::error::ProtocolResult;
use crate::message::Message;
use crate::network::Port;
use crate::results::{BasisValue, Results, RoundOutcome};
use crate::role::{Role, RoleContext, RoleEvent, RoleReport, TimerId};
use crate::time::SimTime;

use super::{BOB, FiredTimers, VerifierParams};

/// Where Bob is within a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BobState {
    Idle,
    /// Waiting for the `Ready` timer.
    ReadySlot,
    /// Waiting for Alice's VALUES.
    AwaitValues,
    /// Waiting for the `NonceSlot` timer.
    NonceSlot,
    /// Waiting for the player's reply.
    AwaitResult,
    Done,
}

#[derive(Debug, Clone, Copy)]
struct Round {
    bit: bool,
    nonce: u32,
    sent_at: Option<SimTime>,
}

#[derive(Debug, Default)]
struct Inbox {
    values: Option<(bool, u32)>,
    result: Option<Message>,
    timers: FiredTimers,
}

/// The relaying verifier.
pub struct Bob {
    params: VerifierParams,
    state: BobState,
    round: Option<Round>,
    inbox: Inbox,
    completed: u64,
    answered: u64,
    results: Results,
}

impl Bob {
    pub fn new(params: VerifierParams) -> Self {
        Self {
            params,
            state: BobState::Idle,
            round: None,
            inbox: Inbox::default(),
            completed: 0,
            answered: 0,
            results: Results::new(),
        }
    }

    pub fn state(&self) -> BobState {
        self.state
    }

    pub fn results(&self) -> &Results {
        &self.results
    }

    fn absorb(&mut self, event: RoleEvent) {
        match event {
            RoleEvent::Message {
                port: Port::Alice,
                message: Message::Values { bit, nonce },
            } => self.inbox.values = Some((bit, nonce)),
            RoleEvent::Message {
                port: Port::Player,
                message: message @ (Message::Measurement(_) | Message::NoPhoton),
            } => self.inbox.result = Some(message),
            RoleEvent::Timer(timer) => self.inbox.timers.push(timer),
            other => trace!(node = BOB, event = ?other, "ignored event"),
        }
    }

    /// Send READY after `delay`, or now.
    fn signal_ready(&mut self, delay: f64, ctx: &mut RoleContext<'_>) {
        if delay > 0.0 {
            ctx.set_timer(TimerId::Ready, delay);
            self.state = BobState::ReadySlot;
        } else {
            ctx.send(Port::Alice, Message::Ready);
            self.state = BobState::AwaitValues;
        }
    }

    fn release_nonce(&mut self, ctx: &mut RoleContext<'_>) {
        if let Some(round) = self.round.as_mut() {
            round.sent_at = Some(ctx.now());
            ctx.send(Port::Player, Message::Nonce(round.nonce));
        }
        self.state = BobState::AwaitResult;
    }

    fn record(&mut self, reply: Message, ctx: &mut RoleContext<'_>) {
        let Some(round) = self.round.take() else {
            return;
        };
        let elapsed = round.sent_at.map_or(0.0, |t| ctx.now() - t);
        let on_time = self.params.on_time(elapsed, self.params.plan.bob_expected());
        let outcome = match reply {
            Message::Measurement(value) => RoundOutcome::Answered(value == round.bit),
            _ => RoundOutcome::NoPhoton,
        };
        if matches!(outcome, RoundOutcome::Answered(_)) {
            self.answered += 1;
        }
        self.completed += 1;
        self.results
            .record(outcome, on_time, BasisValue::Nonce(round.nonce));
        debug!(
            node = BOB,
            round = self.completed,
            ?outcome,
            on_time,
            elapsed,
            "round recorded"
        );

        if self.params.finished(BOB, self.answered, self.completed) {
            info!(
                node = BOB,
                answered = self.answered,
                completed = self.completed,
                "verification finished"
            );
            self.state = BobState::Done;
        } else {
            let plan = self.params.plan;
            self.signal_ready(plan.bob_settle + plan.preparation_allowance, ctx);
        }
    }

    fn advance(&mut self, ctx: &mut RoleContext<'_>) {
        loop {
            let progressed = match self.state {
                BobState::Idle | BobState::Done => false,
                BobState::ReadySlot => {
                    let fired = self.inbox.timers.take(TimerId::Ready);
                    if fired {
                        ctx.send(Port::Alice, Message::Ready);
                        self.state = BobState::AwaitValues;
                    }
                    fired
                }
                BobState::AwaitValues => match self.inbox.values.take() {
                    Some((bit, nonce)) => {
                        self.round = Some(Round {
                            bit,
                            nonce,
                            sent_at: None,
                        });
                        let lead = self.params.plan.nonce_lead;
                        if lead > 0.0 {
                            ctx.set_timer(TimerId::NonceSlot, lead);
                            self.state = BobState::NonceSlot;
                        } else {
                            self.release_nonce(ctx);
                        }
                        true
                    }
                    None => false,
                },
                BobState::NonceSlot => {
                    let fired = self.inbox.timers.take(TimerId::NonceSlot);
                    if fired {
                        self.release_nonce(ctx);
                    }
                    fired
                }
                BobState::AwaitResult => match self.inbox.result.take() {
                    Some(reply) => {
                        self.record(reply, ctx);
                        true
                    }
                    None => false,
                },
            };
            if !progressed {
                return;
            }
        }
    }
}

impl Role for Bob {
    fn name(&self) -> &str {
        BOB
    }

    fn required_ports(&self) -> &'static [Port] {
        &[Port::Alice, Port::Player]
    }

    fn start(&mut self, ctx: &mut RoleContext<'_>) -> ProtocolResult<()> {
        self.signal_ready(self.params.plan.preparation_allowance, ctx);
        self.advance(ctx);
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
        self.advance(ctx);
        Ok(())
    }

    fn report(&self) -> RoleReport {
        RoleReport::Verifier(self.results.clone())
    }
}
