use anyhow::Result;
use chrono::{DateTime, Utc};
use pulse_learn::Workspace;

pub fn run(workspace: &Workspace, now: DateTime<Utc>) -> Result<()> {
    println!("Data directory: {}\n", workspace.dir().display());
    print!("{}", workspace.report(now));
    Ok(())
}
