//! Run configuration.
//!
//! Every field has a default equal to the physical constants of the
//! reference photonic setup, so an empty YAML document is a valid config.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use qpv_quantum::{
    Absorption, DetectorEfficiency, FibreDepolarization, FibreLoss, FibreModel,
    OperationDurations, PhotonGenerator, ProcessorProfile, QuantumResult,
};

use crate::basis::MAX_BASES;
use crate::channel::{CLASSICAL_SPEED_KM_PER_S, DelayModel, QUANTUM_SPEED_KM_PER_S};
use crate::time::DEFAULT_TIME_TOLERANCE;

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// An environment override could not be parsed.
    #[error("invalid value '{value}' for {var}")]
    EnvError { var: &'static str, value: String },
}

/// Positions on the line, in km.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionConfig {
    #[serde(default = "default_alice_position")]
    pub alice: f64,
    #[serde(default = "default_bob_position")]
    pub bob: f64,
    /// The position the prover claims.
    #[serde(default)]
    pub verification: f64,
}

/// Fibre physics of every quantum channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FibreConfig {
    #[serde(default = "default_p_loss_init")]
    pub p_loss_init: f64,
    /// Attenuation in dB/km.
    #[serde(default = "default_p_loss_length")]
    pub p_loss_length: f64,
    /// Fidelity loss accumulated over `reference_length_km`.
    #[serde(default = "default_fibre_fidelity_loss")]
    pub fidelity_loss: f64,
    #[serde(default = "default_reference_length")]
    pub reference_length_km: f64,
}

/// Propagation speeds and fibre physics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default = "default_classical_speed")]
    pub classical_speed_km_per_s: f64,
    #[serde(default = "default_quantum_speed")]
    pub quantum_speed_km_per_s: f64,
    #[serde(default)]
    pub fibre: FibreConfig,
}

/// Error models and operation times of one role's processor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Depolarisation on photon creation; `None` for a perfect source.
    #[serde(default)]
    pub generator_fidelity_loss: Option<f64>,
    /// Beam-splitter absorption on every gate.
    #[serde(default)]
    pub absorption: f64,
    #[serde(default = "default_efficiency")]
    pub detector_efficiency: f64,
    #[serde(default)]
    pub init_time_ns: f64,
    #[serde(default)]
    pub gate_time_ns: f64,
    #[serde(default)]
    pub measure_time_ns: f64,
}

/// Timing knobs of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// How long the prover waits for a late photon once both classical inputs are in.
    #[serde(default = "default_margin")]
    pub grace_period_ns: f64,
    /// Lead by which verifiers prepare and signal ahead of need.
    #[serde(default = "default_margin")]
    pub scheduling_margin_ns: f64,
    /// Relative tolerance of the timeliness comparison.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

/// Complete configuration of a protocol run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Number of answered rounds to collect (`n`).
    #[serde(default = "default_rounds")]
    pub rounds: u64,
    /// Basis resolution (`m`).
    #[serde(default = "default_bases")]
    pub bases: u32,
    #[serde(default)]
    pub positions: PositionConfig,
    #[serde(default)]
    pub channels: ChannelConfig,
    #[serde(default = "DeviceConfig::verifier")]
    pub verifier_device: DeviceConfig,
    #[serde(default = "DeviceConfig::prover")]
    pub prover_device: DeviceConfig,
    #[serde(default = "DeviceConfig::ideal")]
    pub adversary_device: DeviceConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    /// Master seed; drawn from entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Upper bound on issued rounds, for runs that may never get answers.
    #[serde(default)]
    pub max_rounds: Option<u64>,
}

fn default_alice_position() -> f64 {
    -10.0
}

fn default_bob_position() -> f64 {
    10.0
}

fn default_p_loss_init() -> f64 {
    0.2
}

fn default_p_loss_length() -> f64 {
    0.18
}

fn default_fibre_fidelity_loss() -> f64 {
    0.047
}

fn default_reference_length() -> f64 {
    50.0
}

fn default_classical_speed() -> f64 {
    CLASSICAL_SPEED_KM_PER_S
}

fn default_quantum_speed() -> f64 {
    QUANTUM_SPEED_KM_PER_S
}

fn default_efficiency() -> f64 {
    1.0
}

fn default_margin() -> f64 {
    0.001
}

fn default_tolerance() -> f64 {
    DEFAULT_TIME_TOLERANCE
}

fn default_rounds() -> u64 {
    10
}

fn default_bases() -> u32 {
    1
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            alice: default_alice_position(),
            bob: default_bob_position(),
            verification: 0.0,
        }
    }
}

impl Default for FibreConfig {
    fn default() -> Self {
        Self {
            p_loss_init: default_p_loss_init(),
            p_loss_length: default_p_loss_length(),
            fidelity_loss: default_fibre_fidelity_loss(),
            reference_length_km: default_reference_length(),
        }
    }
}

impl FibreConfig {
    /// A perfect fibre.
    pub fn ideal() -> Self {
        Self {
            p_loss_init: 0.0,
            p_loss_length: 0.0,
            fidelity_loss: 0.0,
            reference_length_km: default_reference_length(),
        }
    }

    /// Build the fibre model, validating parameters.
    pub fn model(&self) -> QuantumResult<FibreModel> {
        let noise = if self.fidelity_loss > 0.0 {
            Some(FibreDepolarization::new(
                self.fidelity_loss,
                self.reference_length_km,
            )?)
        } else {
            None
        };
        Ok(FibreModel {
            loss: FibreLoss::new(self.p_loss_init, self.p_loss_length)?,
            noise,
        })
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            classical_speed_km_per_s: default_classical_speed(),
            quantum_speed_km_per_s: default_quantum_speed(),
            fibre: FibreConfig::default(),
        }
    }
}

impl ChannelConfig {
    pub fn classical_delay(&self) -> DelayModel {
        DelayModel::new(self.classical_speed_km_per_s)
    }

    pub fn quantum_delay(&self) -> DelayModel {
        DelayModel::new(self.quantum_speed_km_per_s)
    }
}

impl DeviceConfig {
    /// Lossless, noiseless and instantaneous.
    pub fn ideal() -> Self {
        Self {
            generator_fidelity_loss: None,
            absorption: 0.0,
            detector_efficiency: 1.0,
            init_time_ns: 0.0,
            gate_time_ns: 0.0,
            measure_time_ns: 0.0,
        }
    }

    /// The verifier's photon source.
    pub fn verifier() -> Self {
        Self {
            generator_fidelity_loss: Some(qpv_quantum::processor::VERIFIER_GENERATOR_FIDELITY_LOSS),
            absorption: qpv_quantum::processor::BEAM_SPLITTER_ABSORPTION,
            ..Self::ideal()
        }
    }

    /// The honest prover's detector.
    pub fn prover() -> Self {
        Self {
            absorption: qpv_quantum::processor::BEAM_SPLITTER_ABSORPTION,
            detector_efficiency: qpv_quantum::processor::DETECTOR_EFFICIENCY,
            measure_time_ns: qpv_quantum::processor::MEASURE_TIME_NS,
            ..Self::ideal()
        }
    }

    /// The same timing with every loss and noise source removed.
    pub fn without_loss(&self) -> Self {
        Self {
            generator_fidelity_loss: None,
            absorption: 0.0,
            detector_efficiency: 1.0,
            ..*self
        }
    }

    pub fn durations(&self) -> OperationDurations {
        OperationDurations {
            init: self.init_time_ns,
            gate: self.gate_time_ns,
            measure: self.measure_time_ns,
        }
    }

    /// Build the processor profile, validating parameters.
    pub fn profile(&self) -> QuantumResult<ProcessorProfile> {
        let generator = self
            .generator_fidelity_loss
            .map(PhotonGenerator::new)
            .transpose()?;
        ProcessorProfile {
            generator,
            gate_absorption: Absorption::new(self.absorption)?,
            detector: DetectorEfficiency::new(self.detector_efficiency)?,
            durations: OperationDurations::default(),
        }
        .with_durations(self.durations())
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            grace_period_ns: default_margin(),
            scheduling_margin_ns: default_margin(),
            tolerance: default_tolerance(),
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            rounds: default_rounds(),
            bases: default_bases(),
            positions: PositionConfig::default(),
            channels: ChannelConfig::default(),
            verifier_device: DeviceConfig::verifier(),
            prover_device: DeviceConfig::prover(),
            adversary_device: DeviceConfig::ideal(),
            timing: TimingConfig::default(),
            seed: None,
            max_rounds: None,
        }
    }
}

impl ProtocolConfig {
    /// The default setup with every loss and noise source removed.
    pub fn noiseless() -> Self {
        let base = Self::default();
        Self {
            verifier_device: base.verifier_device.without_loss(),
            prover_device: base.prover_device.without_loss(),
            channels: ChannelConfig {
                fibre: FibreConfig::ideal(),
                ..base.channels
            },
            ..base
        }
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: ProtocolConfig =
            serde_yaml_ng::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_yaml_str(&contents)
    }

    /// Serialise to YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml_ng::to_string(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Apply `QPV_*` environment variables on top of this configuration.
    pub fn apply_env_overrides(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::EnvError { var, value })
        }

        if let Some(v) = lookup("QPV_ROUNDS") {
            self.rounds = parse("QPV_ROUNDS", v)?;
        }
        if let Some(v) = lookup("QPV_BASES") {
            self.bases = parse("QPV_BASES", v)?;
        }
        if let Some(v) = lookup("QPV_SEED") {
            self.seed = Some(parse("QPV_SEED", v)?);
        }
        if let Some(v) = lookup("QPV_MAX_ROUNDS") {
            self.max_rounds = Some(parse("QPV_MAX_ROUNDS", v)?);
        }
        if let Some(v) = lookup("QPV_GRACE_PERIOD_NS") {
            self.timing.grace_period_ns = parse("QPV_GRACE_PERIOD_NS", v)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::ValidationError(msg));

        if self.rounds == 0 {
            return invalid("rounds must be at least 1".into());
        }
        if self.bases == 0 {
            return invalid("bases must be at least 1".into());
        }
        if self.bases > MAX_BASES {
            return invalid(format!("bases must be at most {MAX_BASES}"));
        }
        if self.max_rounds == Some(0) {
            return invalid("max_rounds must be at least 1 when set".into());
        }

        let p = &self.positions;
        if ![p.alice, p.bob, p.verification].iter().all(|x| x.is_finite()) {
            return invalid("positions must be finite".into());
        }
        if !(p.alice < p.verification && p.verification < p.bob) {
            return invalid(format!(
                "positions must satisfy alice < verification < bob, got {} / {} / {}",
                p.alice, p.verification, p.bob
            ));
        }

        let c = &self.channels;
        for (name, speed) in [
            ("classical_speed_km_per_s", c.classical_speed_km_per_s),
            ("quantum_speed_km_per_s", c.quantum_speed_km_per_s),
        ] {
            if !(speed.is_finite() && speed > 0.0) {
                return invalid(format!("{name} must be positive, got {speed}"));
            }
        }
        if c.quantum_speed_km_per_s > c.classical_speed_km_per_s {
            return invalid("quantum channels cannot be faster than classical ones".into());
        }
        c.fibre
            .model()
            .map_err(|e| ConfigError::ValidationError(format!("fibre: {e}")))?;

        for (name, device) in [
            ("verifier_device", &self.verifier_device),
            ("prover_device", &self.prover_device),
            ("adversary_device", &self.adversary_device),
        ] {
            device
                .profile()
                .map_err(|e| ConfigError::ValidationError(format!("{name}: {e}")))?;
        }

        let t = &self.timing;
        for (name, value) in [
            ("grace_period_ns", t.grace_period_ns),
            ("scheduling_margin_ns", t.scheduling_margin_ns),
            ("tolerance", t.tolerance),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return invalid(format!("{name} must be non-negative, got {value}"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ProtocolConfig::default();
        assert_eq!(config.rounds, 10);
        assert_eq!(config.channels.fibre.p_loss_init, 0.2);
        assert_eq!(config.prover_device.detector_efficiency, 0.96);
        assert_eq!(config.timing.grace_period_ns, 0.001);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(ProtocolConfig::default().validate().is_ok());
        assert!(ProtocolConfig::noiseless().validate().is_ok());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = ProtocolConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, ProtocolConfig::default());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "rounds: 3\nbases: 4\npositions:\n  alice: -5.0\n  bob: 15.0\n  verification: 2.0\n";
        let config = ProtocolConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.rounds, 3);
        assert_eq!(config.bases, 4);
        assert_eq!(config.positions.verification, 2.0);
        assert_eq!(config.channels.fibre.p_loss_length, 0.18);
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = ProtocolConfig {
            seed: Some(12),
            max_rounds: Some(40),
            ..ProtocolConfig::noiseless()
        };
        let yaml = config.to_yaml().unwrap();
        assert_eq!(ProtocolConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ProtocolConfig::default();
        config.rounds = 0;
        assert!(config.validate().is_err());

        let mut config = ProtocolConfig::default();
        config.bases = u32::MAX;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(msg)) if msg.contains("bases")
        ));

        let mut config = ProtocolConfig::default();
        config.bases = MAX_BASES;
        assert!(config.validate().is_ok());

        let mut config = ProtocolConfig::default();
        config.positions.verification = 20.0;
        assert!(config.validate().is_err());

        let mut config = ProtocolConfig::default();
        config.prover_device.detector_efficiency = 1.5;
        assert!(config.validate().is_err());

        let mut config = ProtocolConfig::default();
        config.channels.quantum_speed_km_per_s = 4e5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [("QPV_ROUNDS", "25"), ("QPV_SEED", "7")].into();
        let config = ProtocolConfig::default()
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.rounds, 25);
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn test_env_override_parse_error() {
        let err = ProtocolConfig::default()
            .apply_overrides(|k| (k == "QPV_BASES").then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvError { var: "QPV_BASES", .. }));
    }
}
