//! Send-time offsets derived from the verifier geometry.
//!
//! Both verifiers compute the same plan. Each round has an epoch `E`: the
//! instant at which Bob's READY reaches Alice, and Alice's VALUES reaches
//! Bob. Relative to `E`:
//!
//! - Alice releases the photon at `E + qubit_lead`,
//! - Alice releases `m0` a further `metadata_lag` later,
//! - Bob releases `m1` at `E + nonce_lead`,
//!
//! so the photon, `m0` and `m1` all reach the verification position at the
//! same instant.

use serde::{Deserialize, Serialize};

use crate::channel::DelayModel;

/// Cached per-run timing constants, all in ns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingPlan {
    /// Classical delay Alice → verification position.
    pub classical_alice: f64,
    /// Quantum delay Alice → verification position.
    pub quantum_alice: f64,
    /// Classical delay Bob → verification position.
    pub classical_bob: f64,
    /// Quantum delay Bob → verification position.
    pub quantum_bob: f64,
    /// Delay from epoch to photon release.
    pub qubit_lead: f64,
    /// Delay from photon release to `m0` release.
    pub metadata_lag: f64,
    /// Delay from VALUES arrival to `m1` release.
    pub nonce_lead: f64,
    /// Hold-back of Alice's VALUES and Bob's READY when preparation is slow.
    pub preparation_allowance: f64,
    /// Delay from round start to the start of Alice's preparation.
    pub prepare_delay: f64,
    /// Wait after Alice's result before her next round.
    pub alice_settle: f64,
    /// Wait after Bob's result before his next READY countdown.
    pub bob_settle: f64,
    /// Time an honest prover needs between the last input and its reply.
    pub processing: f64,
}

impl TimingPlan {
    /// Derive the plan.
    ///
    /// `preparation` is Alice's worst-case encode time and `processing` the
    /// honest prover's decode time including its grace period.
    pub fn new(
        distance_alice_km: f64,
        distance_bob_km: f64,
        classical: DelayModel,
        quantum: DelayModel,
        preparation: f64,
        processing: f64,
        margin: f64,
    ) -> Self {
        let c_a = classical.delay_ns(distance_alice_km);
        let q_a = quantum.delay_ns(distance_alice_km);
        let c_b = classical.delay_ns(distance_bob_km);
        let q_b = quantum.delay_ns(distance_bob_km);
        let verifier_link = c_a + c_b;

        let qubit_lead = (c_b - q_a).max(0.0);
        let preparation_allowance = (preparation - verifier_link + margin).max(0.0);
        let prepare_delay = if preparation_allowance > 0.0 {
            0.0
        } else {
            (verifier_link + qubit_lead - preparation - margin).max(0.0)
        };

        Self {
            classical_alice: c_a,
            quantum_alice: q_a,
            classical_bob: c_b,
            quantum_bob: q_b,
            qubit_lead,
            metadata_lag: (q_a - c_a).max(0.0),
            nonce_lead: (q_a - c_b).max(0.0),
            preparation_allowance,
            prepare_delay,
            alice_settle: (c_b - c_a).max(0.0),
            bob_settle: (c_a - c_b).max(0.0),
            processing,
        }
    }

    /// Worst-case elapsed time Alice accepts between `m0` and the reply.
    pub fn alice_expected(&self) -> f64 {
        2.0 * self.classical_alice + self.processing
    }

    /// Worst-case elapsed time Bob accepts between `m1` and the reply.
    pub fn bob_expected(&self) -> f64 {
        2.0 * self.classical_bob + self.processing
    }

    /// Arrival of the photon at the verification position, relative to the epoch.
    pub fn photon_arrival(&self) -> f64 {
        self.qubit_lead + self.quantum_alice
    }

    /// Arrival of `m0`, relative to the epoch.
    pub fn metadata_arrival(&self) -> f64 {
        self.qubit_lead + self.metadata_lag + self.classical_alice
    }

    /// Arrival of `m1`, relative to the epoch.
    pub fn nonce_arrival(&self) -> f64 {
        self.nonce_lead + self.classical_bob
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(d_a: f64, d_b: f64, preparation: f64) -> TimingPlan {
        TimingPlan::new(
            d_a,
            d_b,
            DelayModel::classical(),
            DelayModel::quantum(),
            preparation,
            0.021,
            0.001,
        )
    }

    fn assert_simultaneous(p: &TimingPlan) {
        let photon = p.photon_arrival();
        assert!((photon - p.metadata_arrival()).abs() < 1e-6, "{p:?}");
        assert!((photon - p.nonce_arrival()).abs() < 1e-6, "{p:?}");
    }

    #[test]
    fn test_symmetric_geometry_arrives_together() {
        let p = plan(10.0, 10.0, 0.0);
        assert_eq!(p.qubit_lead, 0.0);
        assert_eq!(p.alice_settle, 0.0);
        assert_eq!(p.bob_settle, 0.0);
        assert_simultaneous(&p);
    }

    #[test]
    fn test_off_centre_geometry_arrives_together() {
        for (d_a, d_b) in [(2.0, 18.0), (18.0, 2.0), (5.0, 6.0), (0.1, 40.0)] {
            assert_simultaneous(&plan(d_a, d_b, 0.0));
        }
    }

    #[test]
    fn test_slow_preparation_holds_back_signals() {
        let p = plan(0.001, 0.001, 1_000.0);
        assert!(p.preparation_allowance > 0.0);
        assert_eq!(p.prepare_delay, 0.0);
        let link = p.classical_alice + p.classical_bob;
        // preparation finishes before the epoch
        assert!(1_000.0 <= p.preparation_allowance + link);
    }

    #[test]
    fn test_fast_preparation_is_just_in_time() {
        let p = plan(10.0, 10.0, 0.0);
        assert_eq!(p.preparation_allowance, 0.0);
        let link = p.classical_alice + p.classical_bob;
        assert!((p.prepare_delay - (link - 0.001)).abs() < 1e-9);
    }

    #[test]
    fn test_expected_reply_times() {
        let p = plan(10.0, 30.0, 0.0);
        assert!((p.alice_expected() - (2.0 * p.classical_alice + 0.021)).abs() < 1e-12);
        assert!(p.bob_expected() > p.alice_expected());
    }
}
