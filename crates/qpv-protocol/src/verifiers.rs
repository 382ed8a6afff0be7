//! Shared construction of the verifier pair.

use qpv_quantum::Processor;

use crate::config::ProtocolConfig;
use crate::error::ProtocolResult;
use crate::network::{ConnectionSpec, Network, NodeId, Port};
use crate::roles::{ALICE, Alice, BOB, Bob, VerifierParams};
use crate::simulation::Simulation;
use crate::timing::TimingPlan;

/// The two verifier nodes of a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifierNodes {
    pub alice: NodeId,
    pub bob: NodeId,
}

/// A validated configuration together with its timing plan and seed.
#[derive(Debug, Clone)]
pub struct VerifierSetup {
    config: ProtocolConfig,
    plan: TimingPlan,
    seed: u64,
}

impl VerifierSetup {
    pub fn new(config: ProtocolConfig) -> ProtocolResult<Self> {
        config.validate()?;
        let p = &config.positions;
        let processing = config.prover_device.durations().decode() + config.timing.grace_period_ns;
        let plan = TimingPlan::new(
            p.verification - p.alice,
            p.bob - p.verification,
            config.channels.classical_delay(),
            config.channels.quantum_delay(),
            config.verifier_device.durations().encode(true),
            processing,
            config.timing.scheduling_margin_ns,
        );
        let seed = config.seed.unwrap_or_else(rand::random);
        Ok(Self { config, plan, seed })
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn plan(&self) -> &TimingPlan {
        &self.plan
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn params(&self) -> VerifierParams {
        VerifierParams {
            bases: self.config.bases,
            rounds: self.config.rounds,
            max_rounds: self.config.max_rounds,
            plan: self.plan,
            tolerance: self.config.timing.tolerance,
        }
    }

    /// A two-way classical link at the configured speed.
    pub fn classical_link(&self) -> ConnectionSpec {
        ConnectionSpec::classical().with_delay(self.config.channels.classical_delay())
    }

    /// A one-way fibre at the configured speed and loss.
    pub fn quantum_link(&self) -> ProtocolResult<ConnectionSpec> {
        let fibre = self.config.channels.fibre.model()?;
        Ok(ConnectionSpec::quantum(fibre).with_delay(self.config.channels.quantum_delay()))
    }

    /// Place Alice and Bob and link them to each other.
    pub fn add_nodes(&self, network: &mut Network) -> ProtocolResult<VerifierNodes> {
        let alice = network.add_node(ALICE, self.config.positions.alice)?;
        let bob = network.add_node(BOB, self.config.positions.bob)?;
        network.connect(alice, Port::Bob, bob, Port::Alice, self.classical_link())?;
        Ok(VerifierNodes { alice, bob })
    }

    pub fn add_roles(&self, sim: &mut Simulation, nodes: VerifierNodes) -> ProtocolResult<()> {
        let device = Processor::new(ALICE, self.config.verifier_device.profile()?);
        sim.add_role(nodes.alice, Box::new(Alice::new(self.params(), Box::new(device))))?;
        sim.add_role(nodes.bob, Box::new(Bob::new(self.params())))?;
        Ok(())
    }
}
