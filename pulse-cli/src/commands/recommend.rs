use anyhow::Result;
use chrono::{DateTime, Utc};
use pulse_learn::{Outcome, ThompsonSampler, Workspace};

use super::print_skipped;

pub fn run(workspace: &Workspace, now: DateTime<Utc>) -> Result<()> {
    let mut sampler = ThompsonSampler::from_os_rng();
    match workspace.recommend(&mut sampler, now)? {
        Outcome::Done(recommendation) => {
            println!(
                "recommend: wrote {}",
                workspace.recommendation_path().display()
            );
            for arm in &recommendation.best {
                println!(
                    "  {:<12} {:<24} sample {:.3}  mean {:.3}  trials {}",
                    arm.dimension.as_str(),
                    arm.name,
                    arm.sample,
                    arm.mean,
                    arm.trials
                );
            }
        }
        Outcome::Skipped(reason) => print_skipped("recommend", reason),
    }
    Ok(())
}
