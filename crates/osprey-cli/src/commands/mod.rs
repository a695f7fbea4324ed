pub mod click;
pub mod input;
pub mod open;
pub mod profile;
pub mod snapshot;
pub mod wait;

use crate::orchestrator::CommandReport;
use anyhow::Result;
use osprey_browser::{ElementMatch, Outcome};
use osprey_core::TimeoutPolicy;

/// Prints the diff and the final status line for one mutating command.
///
/// A readiness timeout is soft by default: the command still counts as OK,
/// annotated so the caller knows the snapshot may be premature. Under the
/// strict policy it becomes a failure instead.
pub(crate) fn print_report(
    action: &str,
    subject: &str,
    report: &CommandReport,
    policy: TimeoutPolicy,
) -> Result<()> {
    let diff_text = report.diff.render();
    if !diff_text.is_empty() {
        println!("{}", diff_text);
    }

    match report.outcome {
        Outcome::Converged { ticks, .. } => {
            println!(
                "OK: {} {} (mode={}, converged after {} ticks)",
                action, subject, report.mode, ticks
            );
        }
        Outcome::TimedOut { .. } => {
            if policy == TimeoutPolicy::Fail {
                anyhow::bail!("{} {}: page did not converge", action, subject);
            }
            println!(
                "OK: {} {} (mode={}, proceeded without convergence)",
                action, subject, report.mode
            );
        }
    }
    Ok(())
}

/// Prints the numbered candidate list for an ambiguous reference.
pub(crate) fn print_candidates(reference: &str, candidates: &[ElementMatch]) {
    println!("Multiple matches for '{}':", reference);
    for (i, candidate) in candidates.iter().enumerate() {
        println!("  [{}] {}", i, candidate.describe());
    }
}
