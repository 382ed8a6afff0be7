//! Node registry, port bindings and connection bookkeeping.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use qpv_quantum::FibreModel;

use crate::channel::{Channel, ChannelKind, DelayModel, Direction};
use crate::error::{ProtocolError, ProtocolResult};
use crate::time::SimTime;

/// Index of a node in the [`Network`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Index of a unidirectional channel leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LegId(usize);

/// The fixed set of ports a role may expose.
///
/// Classical ports are named after the peer they lead to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Port {
    /// Classical link towards Alice.
    Alice,
    /// Classical link towards Bob.
    Bob,
    /// Classical link from a verifier towards the prover or adversary.
    Player,
    /// Classical link between the two adversaries.
    Partner,
    /// Incoming photons.
    QuantumIn,
    /// Outgoing photons.
    QuantumOut,
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Port::Alice => "alice",
            Port::Bob => "bob",
            Port::Player => "player",
            Port::Partner => "partner",
            Port::QuantumIn => "qin",
            Port::QuantumOut => "qout",
        };
        f.write_str(name)
    }
}

/// How to build the legs of a connection.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSpec {
    pub kind: ChannelKind,
    pub direction: Direction,
    pub delay: DelayModel,
    pub fibre: FibreModel,
}

impl ConnectionSpec {
    /// A bidirectional classical connection at radio speed.
    pub fn classical() -> Self {
        Self {
            kind: ChannelKind::Classical,
            direction: Direction::Both,
            delay: DelayModel::classical(),
            fibre: FibreModel::ideal(),
        }
    }

    /// A one-way quantum connection at fibre speed.
    pub fn quantum(fibre: FibreModel) -> Self {
        Self {
            kind: ChannelKind::Quantum,
            direction: Direction::AToB,
            delay: DelayModel::quantum(),
            fibre,
        }
    }

    pub fn with_delay(mut self, delay: DelayModel) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    fn channel(&self, length_km: f64) -> Channel {
        match self.kind {
            ChannelKind::Classical => Channel::classical(length_km, self.delay),
            ChannelKind::Quantum => Channel::quantum(length_km, self.delay, self.fibre),
        }
    }
}

/// A named participant at a position on the line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: String,
    /// Position in km.
    pub position: f64,
}

#[derive(Debug, Clone)]
struct Leg {
    channel: Channel,
    to: NodeId,
    to_port: Port,
}

/// Where and when a payload lands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delivery {
    pub leg: LegId,
    pub to: NodeId,
    pub port: Port,
    pub at: SimTime,
}

/// The topology of one run.
#[derive(Debug, Clone, Default)]
pub struct Network {
    nodes: Vec<NodeInfo>,
    legs: Vec<Leg>,
    outbound: FxHashMap<(NodeId, Port), LegId>,
    inbound: FxHashMap<(NodeId, Port), LegId>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node; names must be unique.
    pub fn add_node(&mut self, name: impl Into<String>, position: f64) -> ProtocolResult<NodeId> {
        let name = name.into();
        if self.node_id(&name).is_some() || !position.is_finite() {
            return Err(ProtocolError::Node(name));
        }
        self.nodes.push(NodeInfo { name, position });
        Ok(NodeId(self.nodes.len() - 1))
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name).map(NodeId)
    }

    pub fn node(&self, id: NodeId) -> &NodeInfo {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &NodeInfo)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Distance between two nodes in km.
    pub fn distance(&self, a: NodeId, b: NodeId) -> f64 {
        (self.node(a).position - self.node(b).position).abs()
    }

    /// Connect `a.port_a` with `b.port_b`; the length is the distance between them.
    pub fn connect(
        &mut self,
        a: NodeId,
        port_a: Port,
        b: NodeId,
        port_b: Port,
        spec: ConnectionSpec,
    ) -> ProtocolResult<()> {
        let length = self.distance(a, b);
        if spec.direction.forward() {
            self.add_leg(a, port_a, b, port_b, spec.channel(length))?;
        }
        if spec.direction.backward() {
            self.add_leg(b, port_b, a, port_a, spec.channel(length))?;
        }
        Ok(())
    }

    fn add_leg(
        &mut self,
        from: NodeId,
        from_port: Port,
        to: NodeId,
        to_port: Port,
        channel: Channel,
    ) -> ProtocolResult<()> {
        if self.outbound.contains_key(&(from, from_port)) {
            return Err(self.duplicate(from, from_port));
        }
        if self.inbound.contains_key(&(to, to_port)) {
            return Err(self.duplicate(to, to_port));
        }
        let id = LegId(self.legs.len());
        self.legs.push(Leg {
            channel,
            to,
            to_port,
        });
        self.outbound.insert((from, from_port), id);
        self.inbound.insert((to, to_port), id);
        Ok(())
    }

    fn duplicate(&self, node: NodeId, port: Port) -> ProtocolError {
        ProtocolError::DuplicatePort {
            node: self.node(node).name.clone(),
            port,
        }
    }

    /// Whether any channel end is attached to `node.port`.
    pub fn is_bound(&self, node: NodeId, port: Port) -> bool {
        self.outbound.contains_key(&(node, port)) || self.inbound.contains_key(&(node, port))
    }

    /// Fail unless every listed port of `node` is bound.
    pub fn require_ports(&self, node: NodeId, ports: &[Port]) -> ProtocolResult<()> {
        match ports.iter().find(|p| !self.is_bound(node, **p)) {
            Some(port) => Err(ProtocolError::UnboundPort {
                node: self.node(node).name.clone(),
                port: *port,
            }),
            None => Ok(()),
        }
    }

    /// Kind of the outbound channel of `node.port`, if bound.
    pub fn outbound_kind(&self, node: NodeId, port: Port) -> Option<ChannelKind> {
        self.outbound
            .get(&(node, port))
            .map(|leg| self.legs[leg.0].channel.kind())
    }

    /// Send over the outbound leg of `from.port` at `now`.
    pub fn transmit(&mut self, from: NodeId, port: Port, now: SimTime) -> ProtocolResult<Delivery> {
        let Some(&leg) = self.outbound.get(&(from, port)) else {
            return Err(ProtocolError::UnboundPort {
                node: self.node(from).name.clone(),
                port,
            });
        };
        let entry = &mut self.legs[leg.0];
        let at = entry.channel.transmit(now);
        Ok(Delivery {
            leg,
            to: entry.to,
            port: entry.to_port,
            at,
        })
    }

    pub fn channel(&self, leg: LegId) -> &Channel {
        &self.legs[leg.0].channel
    }

    /// Outbound channel of `node.port`, if bound.
    pub fn channel_from(&self, node: NodeId, port: Port) -> Option<&Channel> {
        self.outbound
            .get(&(node, port))
            .map(|leg| &self.legs[leg.0].channel)
    }
}
