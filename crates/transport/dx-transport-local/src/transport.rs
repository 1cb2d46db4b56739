use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dx_error::{Result, TransportError};
use dx_traits::{DownloadOutcome, RemoteEntry, Transport};
use dx_types::Subset;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Reads dataset files from a local directory.
#[derive(Debug)]
pub struct LocalTransport {
    base: PathBuf,
    closed: AtomicBool,
}

impl LocalTransport {
    /// Open a mirror rooted at `base`, which must be an existing directory.
    pub async fn connect(base: impl Into<PathBuf>) -> Result<Self> {
        let base = base.into();
        let metadata = tokio::fs::metadata(&base).await.map_err(|e| {
            TransportError::Connection(format!("cannot open mirror {}: {e}", base.display()))
        })?;
        if !metadata.is_dir() {
            return Err(TransportError::Connection(format!(
                "mirror {} is not a directory",
                base.display()
            ))
            .into());
        }

        info!(base = %base.display(), "Connected to local mirror");
        Ok(Self {
            base,
            closed: AtomicBool::new(false),
        })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Connection("transport is closed".to_string()).into());
        }
        Ok(())
    }

    /// Every regular file in the mirror, sorted by name.
    async fn entries(&self) -> Result<Vec<RemoteEntry>> {
        let mut dir = tokio::fs::read_dir(&self.base)
            .await
            .map_err(|e| TransportError::Io(format!("cannot list {}: {e}", self.base.display())))?;

        let mut entries = Vec::new();
        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?
        {
            let metadata = item
                .metadata()
                .await
                .map_err(|e| TransportError::Io(e.to_string()))?;
            if !metadata.is_file() {
                continue;
            }
            entries.push(RemoteEntry {
                name: item.file_name().to_string_lossy().into_owned(),
                size_bytes: metadata.len(),
                modified_at: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn list(&self, subset: &Subset) -> Result<Vec<RemoteEntry>> {
        self.ensure_open()?;
        let prefixes = subset.prefixes()?;
        let entries = self.entries().await?;

        let selected: Vec<RemoteEntry> = prefixes
            .iter()
            .flat_map(|prefix| {
                entries
                    .iter()
                    .filter(move |entry| entry.name.starts_with(prefix.as_str()))
                    .cloned()
            })
            .collect();

        debug!(
            prefixes = prefixes.len(),
            available = entries.len(),
            selected = selected.len(),
            "Listed mirror"
        );
        Ok(selected)
    }

    async fn get(&self, file: &str, destination: &Path) -> Result<DownloadOutcome> {
        self.ensure_open()?;

        if tokio::fs::try_exists(destination).await.unwrap_or(false) {
            return Ok(DownloadOutcome::AlreadyPresent);
        }

        let source = self.base.join(file);
        if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
            return Err(TransportError::NotFound(file.to_string()).into());
        }

        // Copy under a temporary name so an interrupted copy is never taken
        // for a finished download.
        let partial = partial_path(destination);
        let bytes = match tokio::fs::copy(&source, &partial).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(TransportError::Io(format!("cannot copy {file}: {e}")).into());
            }
        };
        tokio::fs::rename(&partial, destination)
            .await
            .map_err(|e| TransportError::Io(format!("cannot move {file} into place: {e}")))?;

        debug!(file = file, bytes, "Copied from mirror");
        Ok(DownloadOutcome::Fetched { bytes })
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}
