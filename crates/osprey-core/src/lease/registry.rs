//! Flat-file lease registry.
//!
//! One line per active lease, colon-separated:
//! `profileName:port:pid:startEpochSeconds`. Profile names therefore must not
//! contain `:`. The file is rewritten whole on every mutation; unparseable
//! lines are logged and dropped at the next rewrite.

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// An exclusive claim on a named profile's debugging port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub profile: String,
    pub port: u16,
    pub owner_pid: u32,
    /// Epoch seconds at acquisition time.
    pub started_at: i64,
}

impl Lease {
    /// How long this lease has been held as of `now` (epoch seconds).
    pub fn held_secs(&self, now: i64) -> u64 {
        (now - self.started_at).max(0) as u64
    }

    fn to_line(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.profile, self.port, self.owner_pid, self.started_at
        )
    }

    fn parse_line(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() != 4 {
            return Err(Error::Registry(format!(
                "expected 4 colon-separated fields, got {}: '{}'",
                fields.len(),
                line
            )));
        }

        let port = fields[1]
            .parse::<u16>()
            .map_err(|_| Error::Registry(format!("bad port in '{}'", line)))?;
        let owner_pid = fields[2]
            .parse::<u32>()
            .map_err(|_| Error::Registry(format!("bad pid in '{}'", line)))?;
        let started_at = fields[3]
            .parse::<i64>()
            .map_err(|_| Error::Registry(format!("bad start time in '{}'", line)))?;

        Ok(Self {
            profile: fields[0].to_string(),
            port,
            owner_pid,
            started_at,
        })
    }
}

/// Reads and rewrites the registry file.
pub struct Registry {
    path: PathBuf,
}

impl Registry {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All parseable leases; a missing file is an empty registry.
    pub fn load(&self) -> Result<Vec<Lease>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut leases = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match Lease::parse_line(line) {
                Ok(lease) => leases.push(lease),
                Err(err) => {
                    tracing::warn!(%err, "skipping malformed registry line");
                }
            }
        }
        Ok(leases)
    }

    /// Rewrites the registry to exactly `leases`.
    pub fn save(&self, leases: &[Lease]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut content = String::new();
        for lease in leases {
            content.push_str(&lease.to_line());
            content.push('\n');
        }
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_line_round_trip() {
        let lease = Lease {
            profile: "github-alice".to_string(),
            port: 9231,
            owner_pid: 4242,
            started_at: 1700000000,
        };

        let parsed = Lease::parse_line(&lease.to_line()).unwrap();
        assert_eq!(parsed, lease);
    }

    #[test]
    fn test_malformed_line_is_rejected() {
        assert!(Lease::parse_line("github-alice:not-a-port:1:2").is_err());
        assert!(Lease::parse_line("too:few").is_err());
    }

    #[test]
    fn test_missing_file_is_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(dir.path().join("leases"));

        assert!(registry.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(dir.path().join("leases"));

        let leases = vec![
            Lease {
                profile: "a".to_string(),
                port: 9222,
                owner_pid: 1,
                started_at: 10,
            },
            Lease {
                profile: "b".to_string(),
                port: 9223,
                owner_pid: 2,
                started_at: 20,
            },
        ];
        registry.save(&leases).unwrap();

        assert_eq!(registry.load().unwrap(), leases);
    }

    #[test]
    fn test_load_skips_bad_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leases");
        std::fs::write(&path, "good:9222:1:10\ngarbage line\n").unwrap();

        let registry = Registry::new(path);
        let leases = registry.load().unwrap();

        assert_eq!(leases.len(), 1);
        assert_eq!(leases[0].profile, "good");
    }
}
