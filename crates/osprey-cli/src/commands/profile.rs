//! Profile lease commands.
//!
//! A lease maps a named credential profile to a deterministic debugging port
//! and keeps two sessions from sharing one profile's cookies and storage.
//! Acquiring only reserves the port; launching the browser against it is the
//! caller's job, so `acquire` prints a ready-to-run launch hint.

use anyhow::Result;
use clap::Subcommand;
use osprey_browser::cdp;
use osprey_core::{AutomationConfig, LeaseManager};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Lease a profile and print its debugging port
    Acquire {
        /// Profile name, e.g. github-alice
        name: String,

        /// Override the lease registry file location
        #[arg(long)]
        registry: Option<PathBuf>,
    },

    /// Release a profile lease (idempotent)
    Release {
        /// Profile name
        name: String,

        /// Override the lease registry file location
        #[arg(long)]
        registry: Option<PathBuf>,
    },

    /// List registered leases and their liveness
    List {
        /// Override the lease registry file location
        #[arg(long)]
        registry: Option<PathBuf>,
    },
}

pub async fn execute(action: ProfileAction, config: &AutomationConfig) -> Result<()> {
    match action {
        ProfileAction::Acquire { name, registry } => acquire(&name, registry, config),
        ProfileAction::Release { name, registry } => release(&name, registry, config),
        ProfileAction::List { registry } => list(registry, config).await,
    }
}

fn manager(registry: Option<PathBuf>, config: &AutomationConfig) -> Result<LeaseManager> {
    let path = match registry {
        Some(path) => path,
        None => LeaseManager::default_registry_path()?,
    };
    Ok(LeaseManager::new(path, config.port_range))
}

fn acquire(name: &str, registry: Option<PathBuf>, config: &AutomationConfig) -> Result<()> {
    let lease = manager(registry, config)?.acquire(name)?;

    println!(
        "Launch hint: google-chrome --remote-debugging-port={} --user-data-dir=~/.osprey/profiles/{}",
        lease.port, name
    );
    println!("OK: profile {} leased on port {}", name, lease.port);
    Ok(())
}

fn release(name: &str, registry: Option<PathBuf>, config: &AutomationConfig) -> Result<()> {
    manager(registry, config)?.release(name)?;
    println!("OK: profile {} released", name);
    Ok(())
}

async fn list(registry: Option<PathBuf>, config: &AutomationConfig) -> Result<()> {
    let statuses = manager(registry, config)?.list()?;
    let now = epoch_now();

    for status in &statuses {
        // A listening port is not proof of a leased browser; ask the
        // debugging endpoint itself to tell squatters apart.
        let state = if !status.live {
            "stale"
        } else if cdp::probe_endpoint(status.lease.port).await {
            "live"
        } else {
            "live, no devtools"
        };
        println!(
            "{:<24} port {}  pid {}  held {}s  [{}]",
            status.lease.profile,
            status.lease.port,
            status.lease.owner_pid,
            status.lease.held_secs(now),
            state
        );
    }
    println!("OK: {} lease(s)", statuses.len());
    Ok(())
}

fn epoch_now() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
