//! The honest scenario: Charlie answers from a single position.

use tracing::info;

use qpv_quantum::Processor;

use crate::config::ProtocolConfig;
use crate::error::{ProtocolError, ProtocolResult};
use crate::network::{Network, Port};
use crate::roles::{CHARLIE, Charlie};
use crate::simulation::{RunReport, Simulation};
use crate::verifiers::VerifierSetup;

/// Verifiers plus an honest prover at `prover_position`.
#[derive(Debug, Clone)]
pub struct HonestSetup {
    verifiers: VerifierSetup,
    prover_position: f64,
}

impl HonestSetup {
    /// Fails unless `P_A < P_C < P_B`.
    pub fn new(config: ProtocolConfig, prover_position: f64) -> ProtocolResult<Self> {
        let p = &config.positions;
        if !(p.alice < prover_position && prover_position < p.bob) {
            return Err(ProtocolError::PositionOrder {
                constraint: "P_A < P_C < P_B",
                detail: format!(
                    "P_A = {}, P_C = {}, P_B = {}",
                    p.alice, prover_position, p.bob
                ),
            });
        }
        Ok(Self {
            verifiers: VerifierSetup::new(config)?,
            prover_position,
        })
    }

    /// Charlie exactly at the verification position.
    pub fn at_verification(config: ProtocolConfig) -> ProtocolResult<Self> {
        let position = config.positions.verification;
        Self::new(config, position)
    }

    pub fn verifiers(&self) -> &VerifierSetup {
        &self.verifiers
    }

    pub fn run(&self) -> ProtocolResult<RunReport> {
        let setup = &self.verifiers;
        let config = setup.config();
        let mut network = Network::new();
        let nodes = setup.add_nodes(&mut network)?;
        let charlie = network.add_node(CHARLIE, self.prover_position)?;
        network.connect(nodes.alice, Port::Player, charlie, Port::Alice, setup.classical_link())?;
        network.connect(nodes.bob, Port::Player, charlie, Port::Bob, setup.classical_link())?;
        network.connect(
            nodes.alice,
            Port::QuantumOut,
            charlie,
            Port::QuantumIn,
            setup.quantum_link()?,
        )?;

        info!(
            prover = self.prover_position,
            verification = config.positions.verification,
            rounds = config.rounds,
            "honest run"
        );
        let mut sim = Simulation::new(network, setup.seed());
        setup.add_roles(&mut sim, nodes)?;
        let device = Processor::new(CHARLIE, config.prover_device.profile()?);
        sim.add_role(
            charlie,
            Box::new(Charlie::new(
                config.bases,
                config.timing.grace_period_ns,
                Box::new(device),
            )),
        )?;
        sim.run()
    }
}
