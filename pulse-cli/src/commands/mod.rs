pub mod all;
pub mod analyze;
pub mod recommend;
pub mod report;
pub mod verify;

use pulse_learn::SkipReason;

/// Diagnostic for a run whose precondition was unmet
pub(crate) fn print_skipped(verb: &str, reason: SkipReason) {
    println!("{verb}: skipped ({reason})");
}
