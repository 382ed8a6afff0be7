//! The discrete-event driver.
//!
//! Owns the scheduler, the network and the roles. Each popped batch is turned
//! into [`RoleEvent`]s for one node, the role reacts, and the driver turns the
//! returned [`Action`]s back into scheduled events. Given the same seed a run
//! is fully reproducible.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, trace};

use crate::channel::ChannelKind;
use crate::error::{ProtocolError, ProtocolResult};
use crate::message::Payload;
use crate::network::{LegId, Network, NodeId, Port};
use crate::results::{DecisionLog, Results};
use crate::role::{Action, Role, RoleContext, RoleEvent, RoleReport, TimerId};
use crate::roles::{ALICE, BOB};
use crate::scheduler::Scheduler;

const SEED_SPREAD: u64 = 0x9E37_79B9_7F4A_7C15;

/// What the scheduler carries for a node.
#[derive(Debug)]
pub enum SimEvent {
    /// A payload reaching the receiving end of `leg`.
    Deliver {
        leg: LegId,
        port: Port,
        payload: Payload,
    },
    Timer(TimerId),
    ProgramDone,
}

/// Counters collected while running.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub events_processed: u64,
    pub final_time_ns: f64,
    pub messages_sent: u64,
    pub qubits_sent: u64,
    /// Photons that left a sender but were lost on the fibre.
    pub qubits_lost_in_transit: u64,
    pub timers_set: u64,
    pub programs_run: u64,
}

/// Everything a finished run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub seed: u64,
    pub stats: RunStats,
    /// Role reports by node name.
    pub roles: BTreeMap<String, RoleReport>,
}

impl RunReport {
    /// Results of the verifier called `name`.
    pub fn verifier(&self, name: &str) -> Option<&Results> {
        match self.roles.get(name) {
            Some(RoleReport::Verifier(results)) => Some(results),
            _ => None,
        }
    }

    /// Decision log of the player called `name`.
    pub fn decisions(&self, name: &str) -> Option<&DecisionLog> {
        match self.roles.get(name) {
            Some(RoleReport::Player(log)) => Some(log),
            _ => None,
        }
    }

    pub fn alice(&self) -> Option<&Results> {
        self.verifier(ALICE)
    }

    pub fn bob(&self) -> Option<&Results> {
        self.verifier(BOB)
    }
}

struct RoleSlot {
    role: Box<dyn Role>,
    rng: StdRng,
}

/// One protocol run over a fixed network.
pub struct Simulation {
    scheduler: Scheduler<SimEvent>,
    network: Network,
    slots: Vec<Option<RoleSlot>>,
    channel_rng: StdRng,
    seed: u64,
    stats: RunStats,
}

impl Simulation {
    pub fn new(network: Network, seed: u64) -> Self {
        let slots = (0..network.node_count()).map(|_| None).collect();
        Self {
            scheduler: Scheduler::new(),
            network,
            slots,
            channel_rng: StdRng::seed_from_u64(seed),
            seed,
            stats: RunStats::default(),
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Attach `role` to `node`. Each node runs at most one role.
    pub fn add_role(&mut self, node: NodeId, role: Box<dyn Role>) -> ProtocolResult<()> {
        let Some(slot) = self.slots.get_mut(node.0) else {
            return Err(ProtocolError::Node(role.name().to_string()));
        };
        if slot.is_some() {
            return Err(ProtocolError::Node(role.name().to_string()));
        }
        let node_seed = self.seed ^ SEED_SPREAD.wrapping_mul(node.0 as u64 + 1);
        *slot = Some(RoleSlot {
            role,
            rng: StdRng::seed_from_u64(node_seed),
        });
        Ok(())
    }

    /// Validate port bindings, start every role and run until the queue drains.
    pub fn run(mut self) -> ProtocolResult<RunReport> {
        for (i, slot) in self.slots.iter().enumerate() {
            if let Some(slot) = slot {
                self.network
                    .require_ports(NodeId(i), slot.role.required_ports())?;
            }
        }
        info!(
            nodes = self.network.node_count(),
            seed = self.seed,
            "simulation starting"
        );

        for i in 0..self.slots.len() {
            let now = self.scheduler.now();
            let actions = match self.slots[i].as_mut() {
                Some(slot) => {
                    let mut ctx = RoleContext::new(now, &mut slot.rng);
                    slot.role.start(&mut ctx)?;
                    ctx.into_actions()
                }
                None => continue,
            };
            self.apply(NodeId(i), actions)?;
        }

        while let Some(batch) = self.scheduler.pop_batch() {
            let events: Vec<RoleEvent> = batch
                .events
                .into_iter()
                .map(|event| self.receive(event))
                .collect::<ProtocolResult<_>>()?;
            let actions = match self.slots.get_mut(batch.node.0).and_then(Option::as_mut) {
                Some(slot) => {
                    let mut ctx = RoleContext::new(batch.time, &mut slot.rng);
                    slot.role.handle(events, &mut ctx)?;
                    ctx.into_actions()
                }
                None => {
                    trace!(node = batch.node.0, "events for a node without a role");
                    continue;
                }
            };
            self.apply(batch.node, actions)?;
        }

        let scheduler_stats = self.scheduler.stats();
        self.stats.events_processed = scheduler_stats.events_processed;
        self.stats.final_time_ns = scheduler_stats.final_time_ns;
        info!(
            events = self.stats.events_processed,
            final_time_ns = self.stats.final_time_ns,
            qubits_sent = self.stats.qubits_sent,
            qubits_lost = self.stats.qubits_lost_in_transit,
            "simulation finished"
        );

        let roles = self
            .slots
            .iter()
            .flatten()
            .map(|slot| (slot.role.name().to_string(), slot.role.report()))
            .collect();
        Ok(RunReport {
            seed: self.seed,
            stats: self.stats,
            roles,
        })
    }

    /// Turn a scheduled event into what the role sees, applying channel physics.
    fn receive(&mut self, event: SimEvent) -> ProtocolResult<RoleEvent> {
        let event = match event {
            SimEvent::Deliver {
                leg,
                port,
                mut payload,
            } => {
                self.network
                    .channel(leg)
                    .deliver(&mut payload, &mut self.channel_rng)?;
                match payload {
                    Payload::Classical(message) => RoleEvent::Message { port, message },
                    Payload::Quantum { round, register } => {
                        if register.is_lost() {
                            self.stats.qubits_lost_in_transit += 1;
                        }
                        RoleEvent::Qubit {
                            port,
                            round,
                            register,
                        }
                    }
                }
            }
            SimEvent::Timer(timer) => RoleEvent::Timer(timer),
            SimEvent::ProgramDone => RoleEvent::ProgramDone,
        };
        Ok(event)
    }

    fn apply(&mut self, node: NodeId, actions: Vec<Action>) -> ProtocolResult<()> {
        for action in actions {
            match action {
                Action::Send { port, payload } => self.send(node, port, payload)?,
                Action::SetTimer { timer, delay_ns } => {
                    self.scheduler.schedule(delay_ns, node, SimEvent::Timer(timer));
                    self.stats.timers_set += 1;
                }
                Action::RunProgram { duration_ns } => {
                    self.scheduler
                        .schedule(duration_ns, node, SimEvent::ProgramDone);
                    self.stats.programs_run += 1;
                }
            }
        }
        Ok(())
    }

    fn send(&mut self, node: NodeId, port: Port, payload: Payload) -> ProtocolResult<()> {
        let name = || self.network.node(node).name.clone();
        let Some(kind) = self.network.outbound_kind(node, port) else {
            return Err(ProtocolError::UnboundPort { node: name(), port });
        };
        let payload_kind = if payload.is_quantum() {
            ChannelKind::Quantum
        } else {
            ChannelKind::Classical
        };
        if payload_kind != kind {
            return Err(ProtocolError::PayloadMismatch {
                node: name(),
                port,
                payload: payload_kind.name(),
                channel: kind.name(),
            });
        }

        let now = self.scheduler.now();
        let delivery = self.network.transmit(node, port, now)?;
        trace!(
            from = node.0,
            to = delivery.to.0,
            %port,
            kind = %kind,
            at = delivery.at.as_ns(),
            "payload sent"
        );
        match kind {
            ChannelKind::Quantum => self.stats.qubits_sent += 1,
            ChannelKind::Classical => self.stats.messages_sent += 1,
        }
        self.scheduler.schedule_at(
            delivery.at,
            delivery.to,
            SimEvent::Deliver {
                leg: delivery.leg,
                port: delivery.port,
                payload,
            },
        );
        Ok(())
    }
}
