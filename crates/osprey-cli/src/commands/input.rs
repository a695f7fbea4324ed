use crate::commands::{print_candidates, print_report};
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use osprey_browser::Error;
use osprey_core::AutomationConfig;

pub async fn execute(
    reference: &str,
    value: &str,
    index: Option<usize>,
    port: u16,
    config: AutomationConfig,
) -> Result<()> {
    let policy = config.on_timeout;
    let mut orchestrator = Orchestrator::connect(port, config).await?;

    match orchestrator.input(reference, value, index).await {
        Ok(report) => print_report("input", reference, &report, policy),
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
