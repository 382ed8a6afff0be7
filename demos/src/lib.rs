//! QPV Demo Suite
//!
//! Console rendering of a finished protocol run: the setup banner, a
//! round-by-round table of both verifiers' logs and the final verdict.

use console::style;

use qpv_protocol::{BasisValue, ProtocolConfig, Results, RoleReport, RoundOutcome, RunReport};

const RULE_WIDTH: usize = 64;

/// One line of the round table, joined from Alice's and Bob's logs.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundRow {
    /// 1-based round number.
    pub round: usize,
    pub alice: Option<(RoundOutcome, bool)>,
    pub bob: Option<(RoundOutcome, bool)>,
    /// Alice's `m0` and Bob's `m1` for the round.
    pub basis: String,
}

/// Short label for a verifier's view of a round.
pub fn outcome_label(outcome: RoundOutcome) -> &'static str {
    match outcome {
        RoundOutcome::Answered(true) => "correct",
        RoundOutcome::Answered(false) => "wrong",
        RoundOutcome::NoPhoton => "no photon",
        RoundOutcome::NotSent => "not sent",
    }
}

fn basis_label(value: &BasisValue) -> String {
    match value {
        BasisValue::Metadata(m) => format!("m0=({},{})", m.theta, m.phi),
        BasisValue::Nonce(r) => format!("m1={r}"),
    }
}

fn entry(results: Option<&Results>, i: usize) -> Option<(RoundOutcome, bool)> {
    let results = results?;
    Some((*results.correctness().get(i)?, *results.timeliness().get(i)?))
}

/// Join the verifier logs round by round.
pub fn round_rows(report: &RunReport) -> Vec<RoundRow> {
    let alice = report.alice();
    let bob = report.bob();
    let rounds = alice
        .map_or(0, Results::len)
        .max(bob.map_or(0, Results::len));

    (0..rounds)
        .map(|i| {
            let basis = [alice, bob]
                .into_iter()
                .filter_map(|r| r.and_then(|r| r.basis_values().get(i)))
                .map(basis_label)
                .collect::<Vec<_>>()
                .join(" ");
            RoundRow {
                round: i + 1,
                alice: entry(alice, i),
                bob: entry(bob, i),
                basis,
            }
        })
        .collect()
}

/// Print the scenario banner with the verifier geometry.
pub fn print_banner(scenario: &str, config: &ProtocolConfig) {
    let rule = style("═".repeat(RULE_WIDTH)).cyan();
    println!();
    println!("{rule}");
    println!(
        "{}",
        style(format!("  QPV_BB84 position verification: {scenario}"))
            .cyan()
            .bold()
    );
    println!("{rule}");
    println!(
        "  Alice {} km | claimed {} km | Bob {} km",
        config.positions.alice, config.positions.verification, config.positions.bob
    );
    println!("  m = {} bases, n = {} answered rounds", config.bases, config.rounds);
    println!();
}

fn styled_cell(cell: Option<(RoundOutcome, bool)>) -> String {
    let Some((outcome, on_time)) = cell else {
        return format!("{:<16}", style("-").dim());
    };
    let label = format!("{:<10}", outcome_label(outcome));
    let label = match outcome {
        RoundOutcome::Answered(true) => style(label).green(),
        RoundOutcome::Answered(false) => style(label).red(),
        _ => style(label).yellow(),
    };
    let timing = if on_time {
        style("ok    ").dim()
    } else {
        style("late  ").red().bold()
    };
    format!("{label}{timing}")
}

/// Print the per-round table, eliding the middle of long runs.
pub fn print_round_table(report: &RunReport, limit: usize) {
    let rows = round_rows(report);
    println!(
        "{}",
        style(format!(
            "{:>5}  {:<16}{:<16}{}",
            "round", "Alice", "Bob", "basis values"
        ))
        .bold()
    );
    println!("{}", style("─".repeat(RULE_WIDTH)).dim());

    let head = limit.div_ceil(2);
    let tail = limit / 2;
    for (i, row) in rows.iter().enumerate() {
        if rows.len() > limit && i >= head && i < rows.len() - tail {
            if i == head {
                let hidden = rows.len() - limit;
                println!("{}", style(format!("{:>5}  ... {hidden} rounds", "")).dim());
            }
            continue;
        }
        println!(
            "{:>5}  {}{}{}",
            row.round,
            styled_cell(row.alice),
            styled_cell(row.bob),
            style(&row.basis).dim()
        );
    }
    println!();
}

fn percent(rate: Option<f64>) -> String {
    rate.map_or_else(|| "n/a".to_string(), |r| format!("{:.1}%", r * 100.0))
}

fn print_verifier(name: &str, results: &Results) {
    let s = results.summary();
    println!(
        "  {:<6}{} answered of {} | {} correct | {} on time | {} no photon | {} not sent",
        style(name).bold(),
        s.answered,
        s.rounds,
        percent(s.correct_rate()),
        percent(s.on_time_rate()),
        s.no_photon,
        s.not_sent
    );
}

/// Print verifier totals, player logs and run statistics.
pub fn print_summary(report: &RunReport) {
    for (name, results) in [("Alice", report.alice()), ("Bob", report.bob())] {
        if let Some(results) = results {
            print_verifier(name, results);
        }
    }
    for (name, role) in &report.roles {
        if let RoleReport::Player(log) = role {
            println!(
                "  {:<6}{} replies, {} abstentions",
                style(name).bold(),
                log.len(),
                log.abstentions()
            );
        }
    }
    println!(
        "{}",
        style(format!(
            "  seed {} | {} events | {:.3} µs simulated | {} photons sent, {} lost in fibre",
            report.seed,
            report.stats.events_processed,
            report.stats.final_time_ns / 1e3,
            report.stats.qubits_sent,
            report.stats.qubits_lost_in_transit
        ))
        .dim()
    );
    println!();
}

/// Whether both verifiers saw every answered round correct and every round in time.
pub fn accepted(report: &RunReport) -> bool {
    [report.alice(), report.bob()].into_iter().all(|results| {
        results.is_some_and(|r| {
            let s = r.summary();
            s.answered > 0 && s.correct == s.answered && s.on_time == s.rounds
        })
    })
}

pub fn print_verdict(report: &RunReport) {
    if accepted(report) {
        println!("{} Verifiers accept the claimed position", style("✓").green().bold());
    } else {
        println!("{} Verifiers reject the claimed position", style("✗").red().bold());
    }
    println!();
}
