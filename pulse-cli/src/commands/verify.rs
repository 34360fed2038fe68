use anyhow::Result;
use chrono::{DateTime, Utc};
use pulse_learn::{Outcome, Workspace};

use super::print_skipped;

pub fn run(workspace: &Workspace, now: DateTime<Utc>) -> Result<()> {
    match workspace.verify(now)? {
        Outcome::Done(outcome) => {
            println!(
                "verify: {} verified, {} still pending, {} previously verified",
                outcome.verified, outcome.still_pending, outcome.already_verified
            );
            if outcome.verified > 0 {
                let log = workspace.load_hypotheses();
                for learning in log.recent_learnings(outcome.verified) {
                    println!("  {learning}");
                }
            }
        }
        Outcome::Skipped(reason) => print_skipped("verify", reason),
    }
    Ok(())
}
