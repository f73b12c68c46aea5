//! Repository presence checks
//!
//! The sync reconciler never moves bytes; it only asks each data repository
//! whether a file is physically present. That question is abstracted behind
//! [`RepositoryProbe`] so reconciliation logic stays independent of how a
//! repository is reachable (shared filesystem mount or HTTP endpoint).

pub mod config;

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

pub use config::{ProbeKind, StorageConfig};

/// The repository identity a probe needs to address it
#[derive(Debug, Clone)]
pub struct RepositoryTarget {
    pub id: Uuid,
    pub name: String,
    pub hostname: Option<String>,
}

/// Errors from a presence check
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("IO error probing repository: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error probing repository: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Repository '{0}' has no hostname configured for HTTP probing")]
    Unconfigured(String),

    #[error("Repository returned unexpected status {0}")]
    UnexpectedStatus(u16),
}

/// Presence oracle for a single (repository, relative path) pair
///
/// `Ok(false)` means "verifiably absent right now", which reconciliation
/// treats as transient; only errors count as repository failures.
#[async_trait]
pub trait RepositoryProbe: Send + Sync {
    async fn exists(
        &self,
        repository: &RepositoryTarget,
        relative_path: &str,
    ) -> Result<bool, ProbeError>;
}

/// Build the probe selected by configuration
pub fn init(config: &StorageConfig) -> anyhow::Result<Arc<dyn RepositoryProbe>> {
    let probe: Arc<dyn RepositoryProbe> = match config.kind {
        ProbeKind::Filesystem => Arc::new(FilesystemProbe::new(config.root_dir.clone())),
        ProbeKind::Http => Arc::new(HttpProbe::new(
            config.base_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )?),
    };

    tracing::info!(kind = ?config.kind, "Storage probe initialized");
    Ok(probe)
}

/// Probe that expects each repository to be a directory under a shared root
#[derive(Debug, Clone)]
pub struct FilesystemProbe {
    root: PathBuf,
}

impl FilesystemProbe {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn file_path(&self, repository: &RepositoryTarget, relative_path: &str) -> PathBuf {
        self.root.join(&repository.name).join(relative_path)
    }
}

#[async_trait]
impl RepositoryProbe for FilesystemProbe {
    async fn exists(
        &self,
        repository: &RepositoryTarget,
        relative_path: &str,
    ) -> Result<bool, ProbeError> {
        let path = self.file_path(repository, relative_path);
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ProbeError::Io(e)),
        }
    }
}

/// Probe that issues HEAD requests against each repository
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl HttpProbe {
    pub fn new(base_url: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn url_for(
        &self,
        repository: &RepositoryTarget,
        relative_path: &str,
    ) -> Result<String, ProbeError> {
        match (&self.base_url, &repository.hostname) {
            (Some(base), _) => Ok(format!("{}/{}/{}", base, repository.name, relative_path)),
            (None, Some(hostname)) => Ok(format!("http://{}/{}", hostname, relative_path)),
            (None, None) => Err(ProbeError::Unconfigured(repository.name.clone())),
        }
    }
}

#[async_trait]
impl RepositoryProbe for HttpProbe {
    async fn exists(
        &self,
        repository: &RepositoryTarget,
        relative_path: &str,
    ) -> Result<bool, ProbeError> {
        let url = self.url_for(repository, relative_path)?;
        let response = self.client.head(&url).send().await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            status => Err(ProbeError::UnexpectedStatus(status.as_u16())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(name: &str, hostname: Option<&str>) -> RepositoryTarget {
        RepositoryTarget {
            id: Uuid::new_v4(),
            name: name.to_string(),
            hostname: hostname.map(|s| s.to_string()),
        }
    }

    #[tokio::test]
    async fn test_filesystem_probe_found_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let repo_dir = dir.path().join("archive-01/mouse1/2021-03-04/002/alf");
        std::fs::create_dir_all(&repo_dir).unwrap();
        std::fs::write(repo_dir.join("spikes.npy"), b"data").unwrap();

        let probe = FilesystemProbe::new(dir.path().to_path_buf());
        let repo = target("archive-01", None);

        let present = probe
            .exists(&repo, "mouse1/2021-03-04/002/alf/spikes.npy")
            .await
            .unwrap();
        assert!(present);

        let absent = probe
            .exists(&repo, "mouse1/2021-03-04/002/alf/clusters.npy")
            .await
            .unwrap();
        assert!(!absent);
    }

    #[tokio::test]
    async fn test_filesystem_probe_directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("archive-01/mouse1")).unwrap();

        let probe = FilesystemProbe::new(dir.path().to_path_buf());
        let repo = target("archive-01", None);

        let present = probe.exists(&repo, "mouse1").await.unwrap();
        assert!(!present);
    }

    #[tokio::test]
    async fn test_http_probe_statuses() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/archive-01/mouse1/2021-03-04/002/spikes.npy"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/archive-01/mouse1/2021-03-04/002/clusters.npy"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/archive-01/mouse1/2021-03-04/002/broken.npy"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let probe = HttpProbe::new(Some(server.uri()), Duration::from_secs(5)).unwrap();
        let repo = target("archive-01", None);

        assert!(probe
            .exists(&repo, "mouse1/2021-03-04/002/spikes.npy")
            .await
            .unwrap());
        assert!(!probe
            .exists(&repo, "mouse1/2021-03-04/002/clusters.npy")
            .await
            .unwrap());
        assert!(matches!(
            probe.exists(&repo, "mouse1/2021-03-04/002/broken.npy").await,
            Err(ProbeError::UnexpectedStatus(503))
        ));
    }

    #[test]
    fn test_http_probe_requires_hostname_without_base_url() {
        let probe = HttpProbe::new(None, Duration::from_secs(5)).unwrap();
        let repo = target("archive-01", None);
        assert!(matches!(
            probe.url_for(&repo, "a/b"),
            Err(ProbeError::Unconfigured(_))
        ));

        let repo = target("archive-01", Some("nas.example.org"));
        assert_eq!(
            probe.url_for(&repo, "a/b").unwrap(),
            "http://nas.example.org/a/b"
        );
    }
}
