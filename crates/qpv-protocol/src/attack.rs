//! The fidelity attack: Dave and Eve straddle the verification position.

use tracing::info;

use qpv_quantum::Processor;

use crate::config::ProtocolConfig;
use crate::decision::{FidelityStrategy, l_fraction};
use crate::error::{ProtocolError, ProtocolResult};
use crate::network::{Network, Port};
use crate::roles::{DAVE, Dave, EVE, Eve};
use crate::simulation::{RunReport, Simulation};
use crate::verifiers::VerifierSetup;

/// Verifiers plus the adversary pair.
#[derive(Debug, Clone)]
pub struct FidelityAttack {
    verifiers: VerifierSetup,
    dave_position: f64,
    eve_position: f64,
    l_fraction: f64,
}

impl FidelityAttack {
    /// Fails unless `P_A < P_D < P_v < P_E < P_B`.
    ///
    /// The abstention threshold is calibrated to the loss an honest prover
    /// at `P_v` would see.
    pub fn new(config: ProtocolConfig, dave_position: f64, eve_position: f64) -> ProtocolResult<Self> {
        let p = &config.positions;
        let ordered = p.alice < dave_position
            && dave_position < p.verification
            && p.verification < eve_position
            && eve_position < p.bob;
        if !ordered {
            return Err(ProtocolError::PositionOrder {
                constraint: "P_A < P_D < P_v < P_E < P_B",
                detail: format!(
                    "P_A = {}, P_D = {}, P_v = {}, P_E = {}, P_B = {}",
                    p.alice, dave_position, p.verification, eve_position, p.bob
                ),
            });
        }
        let l = l_fraction(
            config.prover_device.absorption,
            config.prover_device.detector_efficiency,
            p.verification - p.alice,
            config.channels.fibre.p_loss_length,
        );
        Ok(Self {
            verifiers: VerifierSetup::new(config)?,
            dave_position,
            eve_position,
            l_fraction: l,
        })
    }

    pub fn l_fraction(&self) -> f64 {
        self.l_fraction
    }

    pub fn verifiers(&self) -> &VerifierSetup {
        &self.verifiers
    }

    pub fn strategy(&self) -> FidelityStrategy {
        FidelityStrategy::new(self.verifiers.config().bases, self.l_fraction)
    }

    pub fn run(&self) -> ProtocolResult<RunReport> {
        let setup = &self.verifiers;
        let config = setup.config();
        let mut network = Network::new();
        let nodes = setup.add_nodes(&mut network)?;
        let dave = network.add_node(DAVE, self.dave_position)?;
        let eve = network.add_node(EVE, self.eve_position)?;
        network.connect(nodes.alice, Port::Player, dave, Port::Alice, setup.classical_link())?;
        network.connect(nodes.bob, Port::Player, eve, Port::Bob, setup.classical_link())?;
        network.connect(dave, Port::Partner, eve, Port::Partner, setup.classical_link())?;
        network.connect(
            nodes.alice,
            Port::QuantumOut,
            dave,
            Port::QuantumIn,
            setup.quantum_link()?,
        )?;

        info!(
            dave = self.dave_position,
            eve = self.eve_position,
            l_fraction = self.l_fraction,
            rounds = config.rounds,
            "fidelity attack run"
        );
        let mut sim = Simulation::new(network, setup.seed());
        setup.add_roles(&mut sim, nodes)?;
        let device = Processor::new(DAVE, config.adversary_device.profile()?);
        sim.add_role(dave, Box::new(Dave::new(self.strategy(), Box::new(device))))?;
        sim.add_role(eve, Box::new(Eve::new(self.strategy())))?;
        sim.run()
    }
}
