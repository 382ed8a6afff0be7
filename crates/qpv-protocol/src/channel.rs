//! Point-to-point channels with distance-derived propagation delay.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

use qpv_quantum::{FibreModel, QuantumResult};

use crate::message::Payload;
use crate::time::{SimTime, propagation_delay_ns};

/// Radio-wave propagation speed of classical channels, km/s.
pub const CLASSICAL_SPEED_KM_PER_S: f64 = 3e5;
/// Light speed in fibre for quantum channels, km/s.
pub const QUANTUM_SPEED_KM_PER_S: f64 = 2e5;

/// What a channel carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelKind {
    /// Classical messages; never lossy.
    Classical,
    /// Photons; subject to fibre loss and noise.
    Quantum,
}

impl ChannelKind {
    pub fn name(self) -> &'static str {
        match self {
            ChannelKind::Classical => "classical",
            ChannelKind::Quantum => "quantum",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which way traffic flows between the two ends of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// First node to second only.
    AToB,
    /// Second node to first only.
    BToA,
    /// Two independent legs.
    Both,
}

impl Direction {
    pub fn forward(self) -> bool {
        matches!(self, Direction::AToB | Direction::Both)
    }

    pub fn backward(self) -> bool {
        matches!(self, Direction::BToA | Direction::Both)
    }
}

/// Constant-speed delay model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayModel {
    speed_km_per_s: f64,
}

impl DelayModel {
    pub fn new(speed_km_per_s: f64) -> Self {
        Self { speed_km_per_s }
    }

    pub fn classical() -> Self {
        Self::new(CLASSICAL_SPEED_KM_PER_S)
    }

    pub fn quantum() -> Self {
        Self::new(QUANTUM_SPEED_KM_PER_S)
    }

    pub fn speed_km_per_s(&self) -> f64 {
        self.speed_km_per_s
    }

    /// One-way latency over `length_km`, in ns.
    pub fn delay_ns(&self, length_km: f64) -> f64 {
        propagation_delay_ns(length_km, self.speed_km_per_s)
    }
}

/// One unidirectional leg of a connection.
#[derive(Debug, Clone)]
pub struct Channel {
    kind: ChannelKind,
    length_km: f64,
    delay: DelayModel,
    fibre: FibreModel,
    last_delivery: SimTime,
}

impl Channel {
    /// A lossless classical leg.
    pub fn classical(length_km: f64, delay: DelayModel) -> Self {
        Self {
            kind: ChannelKind::Classical,
            length_km,
            delay,
            fibre: FibreModel::ideal(),
            last_delivery: SimTime::ZERO,
        }
    }

    /// A quantum leg with the given fibre physics.
    pub fn quantum(length_km: f64, delay: DelayModel, fibre: FibreModel) -> Self {
        Self {
            kind: ChannelKind::Quantum,
            length_km,
            delay,
            fibre,
            last_delivery: SimTime::ZERO,
        }
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    pub fn length_km(&self) -> f64 {
        self.length_km
    }

    pub fn delay_ns(&self) -> f64 {
        self.delay.delay_ns(self.length_km)
    }

    /// Delivery time of a payload sent at `send_time`.
    ///
    /// Never earlier than the previous delivery on this leg, so the leg is FIFO.
    pub fn transmit(&mut self, send_time: SimTime) -> SimTime {
        let arrival = (send_time + self.delay_ns()).max(self.last_delivery);
        self.last_delivery = arrival;
        arrival
    }

    /// Apply fibre physics to a payload that is being delivered.
    ///
    /// Loss marks the register; only a noise parameter outside the physical
    /// range is an error.
    pub fn deliver(&self, payload: &mut Payload, rng: &mut dyn RngCore) -> QuantumResult<()> {
        if let Payload::Quantum { register, .. } = payload {
            self.fibre.apply(register, self.length_km, rng)?;
        }
        Ok(())
    }
}
