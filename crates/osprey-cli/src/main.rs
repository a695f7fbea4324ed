use anyhow::Result;
use clap::{Parser, Subcommand};
use std::time::Duration;

mod commands;
mod orchestrator;

use osprey_core::{AutomationConfig, LeaseManager, TimeoutPolicy};

#[derive(Parser)]
#[command(name = "osprey")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Drive an externally-running browser over its remote debugging protocol",
    long_about = "Osprey attaches to a running browser's debugging endpoint, resolves \
                  human-readable element references, waits for pages to reach a stable \
                  state, and records comparable text snapshots for diffing across \
                  interactions. Profile leases let independent sessions share one \
                  machine without clobbering each other's saved credentials."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Debugging port of the browser to attach to (defaults to 9222)
    #[arg(short, long, global = true, conflicts_with = "profile")]
    port: Option<u16>,

    /// Attach via the named profile's live lease instead of a port
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Override the post-action convergence window in milliseconds
    #[arg(long, global = true)]
    action_timeout_ms: Option<u64>,

    /// Fail a command when the page never converges, instead of proceeding
    #[arg(long, global = true)]
    strict_readiness: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Navigate to a URL and snapshot the result
    Open {
        /// URL to open
        url: String,
    },

    /// Click the element a reference resolves to
    Click {
        /// Element reference: test id, accessible name, visible text, or CSS selector
        reference: String,

        /// Candidate index when a previous attempt reported ambiguity
        #[arg(long)]
        index: Option<usize>,

        /// Restrict matching to this container selector
        #[arg(long)]
        within: Option<String>,
    },

    /// Type a value into the element a reference resolves to
    Input {
        /// Element reference for the field
        reference: String,

        /// Value to set
        value: String,

        /// Candidate index when a previous attempt reported ambiguity
        #[arg(long)]
        index: Option<usize>,
    },

    /// Wait for page convergence, or for a specific selector
    Wait {
        /// CSS selector to wait for; omit to wait for composite convergence
        selector: Option<String>,

        /// Wait for the selector to disappear instead of appear
        #[arg(long)]
        gone: bool,

        /// Override the wait window in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Capture a canonical text snapshot and diff it against the previous one
    Snapshot {
        /// Print the full capture instead of the diff
        #[arg(long)]
        full: bool,
    },

    /// Manage profile leases
    Profile {
        #[command(subcommand)]
        action: commands::profile::ProfileAction,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("{}: {:#}", failure_prefix(&err), err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli);

    let command = match cli.command {
        Commands::Profile { action } => {
            return commands::profile::execute(action, &config).await;
        }
        command => command,
    };

    let port = attach_port(cli.port, cli.profile.as_deref(), &config)?;
    match command {
        Commands::Open { url } => commands::open::execute(&url, port, config).await,
        Commands::Click {
            reference,
            index,
            within,
        } => commands::click::execute(&reference, index, within.as_deref(), port, config).await,
        Commands::Input {
            reference,
            value,
            index,
        } => commands::input::execute(&reference, &value, index, port, config).await,
        Commands::Wait {
            selector,
            gone,
            timeout_ms,
        } => {
            commands::wait::execute(
                selector.as_deref(),
                gone,
                timeout_ms.map(Duration::from_millis),
                port,
                config,
            )
            .await
        }
        Commands::Snapshot { full } => commands::snapshot::execute(full, port, config).await,
        Commands::Profile { .. } => unreachable!("handled above"),
    }
}

/// Port to attach to: explicit `--port`, the named profile's live lease, or
/// the conventional default.
fn attach_port(port: Option<u16>, profile: Option<&str>, config: &AutomationConfig) -> Result<u16> {
    if let Some(port) = port {
        return Ok(port);
    }
    let Some(name) = profile else {
        return Ok(9222);
    };

    let manager = LeaseManager::new(LeaseManager::default_registry_path()?, config.port_range);
    let status = manager.list()?.into_iter().find(|s| s.lease.profile == *name);
    match status {
        Some(status) if status.live => {
            tracing::debug!(profile = name, port = status.lease.port, "attaching via lease");
            Ok(status.lease.port)
        }
        Some(status) => anyhow::bail!(
            "profile '{}' holds a stale lease on port {}; relaunch the browser or re-acquire",
            name,
            status.lease.port
        ),
        None => anyhow::bail!(
            "no lease for profile '{}'; run 'osprey profile acquire {}' and launch the browser",
            name,
            name
        ),
    }
}

fn build_config(cli: &Cli) -> AutomationConfig {
    let mut config = AutomationConfig::default();
    if let Some(ms) = cli.action_timeout_ms {
        config.post_action_timeout = Duration::from_millis(ms);
    }
    if cli.strict_readiness {
        config.on_timeout = TimeoutPolicy::Fail;
    }
    config
}

/// Domain failures print as FAIL, environmental/unexpected ones as ERROR.
fn failure_prefix(err: &anyhow::Error) -> &'static str {
    use osprey_browser::Error as BrowserError;
    use osprey_core::Error as CoreError;

    if let Some(browser_err) = err.downcast_ref::<BrowserError>() {
        return match browser_err {
            BrowserError::NotFound { .. }
            | BrowserError::Ambiguous { .. }
            | BrowserError::SelectorTimeout { .. }
            | BrowserError::NavigationTimeout { .. } => "FAIL",
            _ => "ERROR",
        };
    }
    if let Some(core_err) = err.downcast_ref::<CoreError>() {
        return match core_err {
            CoreError::ProfileBusy { .. } | CoreError::PortExhausted { .. } => "FAIL",
            _ => "ERROR",
        };
    }
    // Messages raised by the commands themselves are domain failures.
    "FAIL"
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("osprey_cli=debug,osprey_core=debug,osprey_browser=debug")
    } else {
        EnvFilter::new("osprey_cli=info,osprey_core=info,osprey_browser=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}
