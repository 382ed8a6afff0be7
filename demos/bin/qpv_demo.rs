//! QPV_BB84 Position Verification Demo
//!
//! Runs either an honest prover or the fidelity attack and prints what the
//! verifiers concluded.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use qpv_protocol::{FidelityAttack, HonestSetup, ProtocolConfig};
use qpv_demos::{print_banner, print_round_table, print_summary, print_verdict};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Scenario {
    /// Charlie answers from a single position
    Honest,
    /// Dave and Eve straddle the verification position
    Attack,
}

#[derive(Parser, Debug)]
#[command(name = "qpv-demo")]
#[command(about = "Simulate QPV_BB84 position verification")]
struct Args {
    /// YAML configuration file (defaults apply when omitted)
    #[arg(short, long, env = "QPV_CONFIG")]
    config: Option<String>,

    /// Scenario to run
    #[arg(short, long, value_enum, default_value = "honest")]
    scenario: Scenario,

    /// Honest prover position in km (verification position when omitted)
    #[arg(long)]
    prover: Option<f64>,

    /// Dave's position in km
    #[arg(long, default_value = "-5.0", allow_hyphen_values = true)]
    dave: f64,

    /// Eve's position in km
    #[arg(long, default_value = "5.0", allow_hyphen_values = true)]
    eve: f64,

    /// Rounds shown in the table before the middle is elided
    #[arg(long, default_value = "20")]
    table: usize,

    /// Emit the run report as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => ProtocolConfig::from_file(path)
            .with_context(|| format!("failed to load configuration from {path}"))?,
        None => ProtocolConfig::default(),
    }
    .apply_env_overrides()
    .context("invalid environment override")?;
    tracing::info!(
        scenario = ?args.scenario,
        rounds = config.rounds,
        bases = config.bases,
        "configuration loaded"
    );

    let report = match args.scenario {
        Scenario::Honest => {
            let position = args.prover.unwrap_or(config.positions.verification);
            HonestSetup::new(config.clone(), position)?.run()?
        }
        Scenario::Attack => FidelityAttack::new(config.clone(), args.dave, args.eve)?.run()?,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let scenario = match args.scenario {
        Scenario::Honest => "honest prover",
        Scenario::Attack => "fidelity attack",
    };
    print_banner(scenario, &config);
    print_round_table(&report, args.table);
    print_summary(&report);
    print_verdict(&report);
    Ok(())
}
