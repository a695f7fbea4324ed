use crate::orchestrator::Orchestrator;
use anyhow::Result;
use osprey_core::AutomationConfig;

pub async fn execute(full: bool, port: u16, config: AutomationConfig) -> Result<()> {
    let mut orchestrator = Orchestrator::connect(port, config).await?;

    let (mode, text) = orchestrator.snapshot(full).await?;
    if !text.is_empty() {
        println!("{}", text);
    }
    println!(
        "OK: snapshot (mode={}, {})",
        mode,
        if full { "full" } else { "diff" }
    );
    Ok(())
}
