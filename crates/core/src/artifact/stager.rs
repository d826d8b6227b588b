//! Streams an inbound document to disk.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::error::StagingError;
use super::layout::RunArtifacts;

/// Byte stream of an inbound document.
pub type DocumentStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// An inbound document plus the metadata forwarded alongside it.
pub struct Document {
    pub stream: DocumentStream,
    pub content_disposition: Option<String>,
}

impl Document {
    pub fn new<S>(stream: S, content_disposition: Option<String>) -> Self
    where
        S: Stream<Item = std::io::Result<Bytes>> + Send + 'static,
    {
        Self {
            stream: Box::pin(stream),
            content_disposition,
        }
    }

    /// A document whose bytes are already in memory.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self::new(futures::stream::once(async move { Ok(bytes) }), None)
    }

    pub fn with_content_disposition(mut self, value: impl Into<String>) -> Self {
        self.content_disposition = Some(value.into());
        self
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("content_disposition", &self.content_disposition)
            .finish_non_exhaustive()
    }
}

/// A document fully written to its run directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedArtifact {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Writes documents into run directories.
#[derive(Debug, Clone)]
pub struct ArtifactStager {
    max_bytes: u64,
}

impl ArtifactStager {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    /// Streams `document` to `artifacts.staged`.
    ///
    /// Bytes go to a `.partial` file that is flushed and synced before being
    /// renamed into place, so the staged path never holds a truncated
    /// document. On failure the partial file is removed.
    pub async fn stage(
        &self,
        artifacts: &RunArtifacts,
        document: DocumentStream,
    ) -> Result<StagedArtifact, StagingError> {
        tokio::fs::create_dir_all(&artifacts.run_dir)
            .await
            .map_err(|source| StagingError::Io {
                path: artifacts.run_dir.clone(),
                source,
            })?;

        let partial = artifacts.partial_path();
        let written = match self.write_partial(&partial, document).await {
            Ok(n) => n,
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };

        if let Err(source) = tokio::fs::rename(&partial, &artifacts.staged).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(StagingError::Io {
                path: artifacts.staged.clone(),
                source,
            });
        }

        debug!(
            run_id = %artifacts.run_id,
            path = %artifacts.staged.display(),
            size_bytes = written,
            "Staged document"
        );

        Ok(StagedArtifact {
            path: artifacts.staged.clone(),
            size_bytes: written,
        })
    }

    async fn write_partial(
        &self,
        path: &Path,
        mut document: DocumentStream,
    ) -> Result<u64, StagingError> {
        let io_err = |source| StagingError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut file = File::create(path).await.map_err(io_err)?;
        let mut written: u64 = 0;

        while let Some(chunk) = document.next().await {
            let chunk = chunk.map_err(StagingError::Stream)?;
            written += chunk.len() as u64;
            if written > self.max_bytes {
                return Err(StagingError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            file.write_all(&chunk).await.map_err(io_err)?;
        }

        file.flush().await.map_err(io_err)?;
        file.sync_all().await.map_err(io_err)?;
        Ok(written)
    }
}
