//! Human-readable summary of the learning state

use std::fmt;

use chrono::{DateTime, Utc};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

use crate::hypothesis::HypothesisLog;
use crate::recommend::Recommendation;
use crate::state::LearningState;
use crate::types::Dimension;

/// Arms listed per dimension
pub const TOP_ARMS: usize = 5;

/// Everything a report reads; nothing here is mutated
pub struct ReportInput<'a> {
    pub state: &'a LearningState,
    pub hypotheses: &'a HypothesisLog,
    pub recommendation: Option<&'a Recommendation>,
    pub max_age_days: i64,
    pub learnings_shown: usize,
    pub now: DateTime<Utc>,
}

pub fn render_report(input: &ReportInput<'_>) -> String {
    input.to_string()
}

impl fmt::Display for ReportInput<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = &self.state.global_stats;

        writeln!(f, "Learning state")?;
        writeln!(f, "  Posts analyzed: {}", stats.total_posts_analyzed)?;
        writeln!(f, "  Average reward: {:.2}", stats.avg_reward)?;
        if let Some(best) = &stats.best_post {
            writeln!(f, "  Best post:      {} ({:.2})", best.id, best.reward)?;
        }
        if let Some(worst) = &stats.worst_post {
            writeln!(f, "  Worst post:     {} ({:.2})", worst.id, worst.reward)?;
        }
        match stats.last_updated {
            Some(at) => writeln!(f, "  Last updated:   {}", at.format("%Y-%m-%d %H:%M UTC"))?,
            None => writeln!(f, "  Last updated:   never")?,
        }

        if self.state.is_empty() {
            writeln!(f, "\nNo arms yet. Run `pulse analyze` once posts have metrics.")?;
        } else {
            writeln!(f, "\n{}", arms_table(self.state))?;
        }

        let log = self.hypotheses;
        let pending = log.pending();
        writeln!(
            f,
            "\nHypotheses: {} verified, {} pending",
            log.entries.len() - pending,
            pending
        )?;

        write!(f, "Recommendation: ")?;
        match self.recommendation {
            Some(rec) if rec.is_stale(self.now, self.max_age_days) => {
                writeln!(
                    f,
                    "stale ({} days old, ignored by consumers)",
                    rec.age(self.now).num_days()
                )?;
            }
            Some(rec) => {
                writeln!(
                    f,
                    "fresh (generated {})",
                    rec.generated_at.format("%Y-%m-%d %H:%M UTC")
                )?;
                for arm in &rec.best {
                    writeln!(f, "  {:<12} {}", arm.dimension.as_str(), arm.name)?;
                }
            }
            None => writeln!(f, "none")?,
        }

        let learnings = log.recent_learnings(self.learnings_shown);
        if !learnings.is_empty() {
            writeln!(f, "\nRecent learnings")?;
            for learning in learnings {
                writeln!(f, "  - {learning}")?;
            }
        }
        Ok(())
    }
}

fn arms_table(state: &LearningState) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Dimension").fg(Color::Cyan),
        Cell::new("Arm").fg(Color::Cyan),
        Cell::new("Mean").fg(Color::Cyan),
        Cell::new("Trials").fg(Color::Cyan),
    ]);

    for &dimension in Dimension::all() {
        let mut arms: Vec<_> = state.arms(dimension).iter().collect();
        arms.sort_by(|a, b| b.1.mean.total_cmp(&a.1.mean));
        for (key, params) in arms.into_iter().take(TOP_ARMS) {
            table.add_row(vec![
                Cell::new(dimension.as_str()),
                Cell::new(key.as_str()),
                Cell::new(format!("{:.3}", params.mean)),
                Cell::new(params.trials),
            ]);
        }
    }
    table
}
