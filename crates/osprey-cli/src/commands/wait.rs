use crate::orchestrator::Orchestrator;
use anyhow::Result;
use osprey_browser::Outcome;
use osprey_core::{AutomationConfig, TimeoutPolicy};
use std::time::Duration;

pub async fn execute(
    selector: Option<&str>,
    gone: bool,
    timeout: Option<Duration>,
    port: u16,
    config: AutomationConfig,
) -> Result<()> {
    let policy = config.on_timeout;
    let selector_window = timeout.unwrap_or(config.selector_timeout);
    let converge_window = timeout.unwrap_or(config.post_action_timeout);
    let mut orchestrator = Orchestrator::connect(port, config).await?;

    match selector {
        Some(selector) => {
            // The caller named a condition; a timeout here is a hard failure.
            let ticks = orchestrator
                .wait_for_selector(selector, gone, selector_window)
                .await?;
            println!(
                "OK: wait {} ({} after {} ticks)",
                selector,
                if gone { "gone" } else { "present" },
                ticks
            );
        }
        None => match orchestrator.wait_converged(converge_window).await? {
            Outcome::Converged { ticks, .. } => {
                println!("OK: wait (converged after {} ticks)", ticks);
            }
            Outcome::TimedOut { .. } => {
                if policy == TimeoutPolicy::Fail {
                    anyhow::bail!("wait: page did not converge");
                }
                println!("OK: wait (proceeded without convergence)");
            }
        },
    }
    Ok(())
}
