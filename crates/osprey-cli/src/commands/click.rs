use crate::commands::{print_candidates, print_report};
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use osprey_browser::Error;
use osprey_core::AutomationConfig;

pub async fn execute(
    reference: &str,
    index: Option<usize>,
    within: Option<&str>,
    port: u16,
    config: AutomationConfig,
) -> Result<()> {
    let policy = config.on_timeout;
    let mut orchestrator = Orchestrator::connect(port, config).await?;

    match orchestrator.click(reference, index, within).await {
        Ok(report) => print_report("click", reference, &report, policy),
        Err(Error::Ambiguous {
            reference,
            candidates,
        }) => {
            print_candidates(&reference, &candidates);
            anyhow::bail!(
                "reference '{}' is ambiguous; retry with --index N",
                reference
            );
        }
        Err(err) => Err(err.into()),
    }
}
