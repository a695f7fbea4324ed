use crate::commands::print_report;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use osprey_core::AutomationConfig;

pub async fn execute(url: &str, port: u16, config: AutomationConfig) -> Result<()> {
    let policy = config.on_timeout;
    let mut orchestrator = Orchestrator::connect(port, config).await?;

    let report = orchestrator.open(url).await?;
    print_report("open", url, &report, policy)
}
