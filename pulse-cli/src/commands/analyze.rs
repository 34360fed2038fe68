use anyhow::Result;
use chrono::{DateTime, Utc};
use pulse_learn::{AnalyzeReport, Outcome, Workspace};

use super::print_skipped;

pub fn run(workspace: &Workspace, now: DateTime<Utc>) -> Result<()> {
    match workspace.analyze(now)? {
        Outcome::Done(report) => print_report(&report),
        Outcome::Skipped(reason) => print_skipped("analyze", reason),
    }
    Ok(())
}

fn print_report(report: &AnalyzeReport) {
    println!(
        "analyze: scored {} posts ({} without metrics)",
        report.scored, report.unscored
    );
    println!(
        "  applied {}, already seen {}, rejected {}",
        report.apply.applied, report.apply.already_seen, report.apply.rejected
    );
    match report.state_version {
        Some(version) => println!("  learning state saved (version {version})"),
        None => println!("  learning state unchanged"),
    }
}
