//! Profile lease manager.
//!
//! Maps a named credential profile to a deterministic debugging port and
//! enforces one live lease per profile across independent processes. The
//! shared state is a flat registry file; access is optimistic check-then-act.
//! Liveness is verified immediately before writing, which leaves a narrow
//! race window between verification and write. The usage pattern is
//! interactive agents, not high-frequency contention, so that window is an
//! accepted tradeoff rather than something a blocking lock hides.

mod registry;

pub use registry::{Lease, Registry};

use crate::{Error, Result};
use std::collections::HashSet;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::PathBuf;
use std::time::Duration;

const PORT_PROBE_TIMEOUT: Duration = Duration::from_millis(250);

/// A registry entry together with its verified liveness.
#[derive(Debug, Clone)]
pub struct LeaseStatus {
    pub lease: Lease,
    pub live: bool,
}

/// Allocates and reclaims profile leases against one registry file.
pub struct LeaseManager {
    registry: Registry,
    port_range: (u16, u16),
}

impl LeaseManager {
    pub fn new(registry_path: PathBuf, port_range: (u16, u16)) -> Self {
        Self {
            registry: Registry::new(registry_path),
            port_range,
        }
    }

    /// Default registry location, `~/.osprey/leases`.
    pub fn default_registry_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| {
            Error::Registry("Could not determine home directory".to_string())
        })?;
        Ok(home.join(".osprey").join("leases"))
    }

    /// Deterministic candidate port for `profile`.
    ///
    /// Stable across runs and processes so independent sessions agree on
    /// where a profile's browser should be listening.
    pub fn preferred_port(&self, profile: &str) -> u16 {
        let (lo, hi) = self.port_range;
        let span = (hi - lo) as u64 + 1;
        lo + (fnv1a(profile) % span) as u16
    }

    /// Claims `profile`, reclaiming a stale prior lease if one is found.
    ///
    /// Fails with [`Error::ProfileBusy`] when a live lease exists; callers
    /// are never queued, because serializing access to shared server-side
    /// state (a cart, an inbox) would not make concurrent use safe. The fix
    /// for contention is a distinct profile per consumer.
    pub fn acquire(&self, profile: &str) -> Result<Lease> {
        let mut leases = self.registry.load()?;

        if let Some(pos) = leases.iter().position(|l| l.profile == profile) {
            let existing = &leases[pos];
            if lease_is_live(existing) {
                return Err(Error::ProfileBusy {
                    profile: profile.to_string(),
                    port: existing.port,
                    owner_pid: existing.owner_pid,
                    held_secs: existing.held_secs(chrono::Utc::now().timestamp()),
                });
            }
            tracing::info!(
                profile,
                port = existing.port,
                pid = existing.owner_pid,
                "reclaiming stale lease"
            );
            leases.remove(pos);
        }

        let port = self.find_free_port(profile, &leases)?;
        let lease = Lease {
            profile: profile.to_string(),
            port,
            owner_pid: std::process::id(),
            started_at: chrono::Utc::now().timestamp(),
        };
        leases.push(lease.clone());
        self.registry.save(&leases)?;

        tracing::debug!(profile, port, "lease acquired");
        Ok(lease)
    }

    /// Drops the entry for `profile`; idempotent.
    pub fn release(&self, profile: &str) -> Result<()> {
        let mut leases = self.registry.load()?;
        let before = leases.len();
        leases.retain(|l| l.profile != profile);

        if leases.len() != before {
            tracing::debug!(profile, "lease released");
        }
        self.registry.save(&leases)
    }

    /// All registered leases with their current liveness.
    pub fn list(&self) -> Result<Vec<LeaseStatus>> {
        Ok(self
            .registry
            .load()?
            .into_iter()
            .map(|lease| {
                let live = lease_is_live(&lease);
                LeaseStatus { lease, live }
            })
            .collect())
    }

    /// First port at or above the preferred one that is neither registered
    /// nor already listening. The range end is a hard stop.
    fn find_free_port(&self, profile: &str, leases: &[Lease]) -> Result<u16> {
        let (lo, hi) = self.port_range;
        let taken: HashSet<u16> = leases.iter().map(|l| l.port).collect();

        for port in self.preferred_port(profile)..=hi {
            if !taken.contains(&port) && port_is_free(port) {
                return Ok(port);
            }
        }
        Err(Error::PortExhausted {
            range_start: lo,
            range_end: hi,
        })
    }
}

/// A lease is live only when the owner process exists AND its port accepts
/// connections; either check failing marks it stale.
fn lease_is_live(lease: &Lease) -> bool {
    process_alive(lease.owner_pid) && port_is_listening(lease.port)
}

fn process_alive(pid: u32) -> bool {
    #[cfg(target_os = "linux")]
    {
        std::path::Path::new(&format!("/proc/{}", pid)).exists()
    }

    #[cfg(all(unix, not(target_os = "linux")))]
    {
        use std::process::Command;
        Command::new("kill")
            .args(["-0", &pid.to_string()])
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    #[cfg(windows)]
    {
        // No cheap pid probe here; the port check carries the verdict.
        let _ = pid;
        true
    }
}

fn port_is_listening(port: u16) -> bool {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    TcpStream::connect_timeout(&addr, PORT_PROBE_TIMEOUT).is_ok()
}

fn port_is_free(port: u16) -> bool {
    TcpListener::bind(("127.0.0.1", port)).is_ok()
}

fn fnv1a(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in s.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}
