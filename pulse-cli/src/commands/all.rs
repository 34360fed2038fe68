use anyhow::Result;
use chrono::{DateTime, Utc};
use pulse_learn::Workspace;

/// analyze, verify, recommend, report; a skipped step does not stop the rest
pub fn run(workspace: &Workspace, now: DateTime<Utc>) -> Result<()> {
    super::analyze::run(workspace, now)?;
    super::verify::run(workspace, now)?;
    super::recommend::run(workspace, now)?;
    println!();
    super::report::run(workspace, now)
}
