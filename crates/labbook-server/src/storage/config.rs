//! Storage probe configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default root directory for filesystem-backed repositories.
pub const DEFAULT_STORAGE_ROOT: &str = "./repositories";

/// Default per-repository reconciliation timeout in seconds.
pub const DEFAULT_SYNC_TIMEOUT_SECS: u64 = 30;

/// Default number of repositories reconciled concurrently.
pub const DEFAULT_SYNC_CONCURRENCY: usize = 4;

/// Which presence-probe backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// Repositories are directories under a shared root
    #[default]
    Filesystem,
    /// Repositories answer HTTP HEAD requests
    Http,
}

impl std::str::FromStr for ProbeKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "filesystem" | "fs" | "local" => Ok(ProbeKind::Filesystem),
            "http" => Ok(ProbeKind::Http),
            _ => Err(anyhow::anyhow!("Invalid storage probe kind: {}", s)),
        }
    }
}

/// Configuration for repository presence checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub kind: ProbeKind,

    /// Root directory holding one subdirectory per repository (filesystem probe)
    pub root_dir: PathBuf,

    /// Base URL prefixed to `<repository>/<relative_path>`; when unset the
    /// HTTP probe addresses each repository by its hostname
    pub base_url: Option<String>,

    /// Per-repository timeout for one reconciliation pass
    pub timeout_secs: u64,

    /// How many repositories are checked concurrently
    pub concurrency: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: ProbeKind::Filesystem,
            root_dir: PathBuf::from(DEFAULT_STORAGE_ROOT),
            base_url: None,
            timeout_secs: DEFAULT_SYNC_TIMEOUT_SECS,
            concurrency: DEFAULT_SYNC_CONCURRENCY,
        }
    }
}

impl StorageConfig {
    /// Load configuration from environment variables
    ///
    /// - `STORAGE_PROBE`: filesystem (default) or http
    /// - `STORAGE_ROOT`: root directory for the filesystem probe
    /// - `STORAGE_BASE_URL`: base URL for the HTTP probe
    /// - `SYNC_TIMEOUT`: per-repository timeout in seconds
    /// - `SYNC_CONCURRENCY`: repositories checked in parallel
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Ok(kind) = std::env::var("STORAGE_PROBE") {
            config.kind = kind.parse()?;
        }
        if let Ok(root) = std::env::var("STORAGE_ROOT") {
            config.root_dir = PathBuf::from(root);
        }
        if let Ok(url) = std::env::var("STORAGE_BASE_URL") {
            config.base_url = Some(url.trim_end_matches('/').to_string());
        }
        if let Ok(timeout) = std::env::var("SYNC_TIMEOUT") {
            config.timeout_secs = timeout
                .parse()
                .map_err(|_| anyhow::anyhow!("SYNC_TIMEOUT must be a number of seconds"))?;
        }
        if let Ok(concurrency) = std::env::var("SYNC_CONCURRENCY") {
            config.concurrency = concurrency
                .parse()
                .map_err(|_| anyhow::anyhow!("SYNC_CONCURRENCY must be a positive integer"))?;
        }

        if config.concurrency == 0 {
            anyhow::bail!("SYNC_CONCURRENCY must be greater than 0");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_kind_from_str() {
        assert_eq!("filesystem".parse::<ProbeKind>().unwrap(), ProbeKind::Filesystem);
        assert_eq!("fs".parse::<ProbeKind>().unwrap(), ProbeKind::Filesystem);
        assert_eq!("HTTP".parse::<ProbeKind>().unwrap(), ProbeKind::Http);
        assert!("s3".parse::<ProbeKind>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = StorageConfig::default();
        assert_eq!(config.kind, ProbeKind::Filesystem);
        assert_eq!(config.timeout_secs, DEFAULT_SYNC_TIMEOUT_SECS);
        assert_eq!(config.concurrency, DEFAULT_SYNC_CONCURRENCY);
    }
}
