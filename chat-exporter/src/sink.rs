use crate::{ExportError, Transcript};
use std::path::{Path, PathBuf};
use tracing::info;

/// Where a finished transcript is handed off
#[async_trait::async_trait]
pub trait TranscriptSink: Send + Sync {
    /// Deliver the document under `file_name`, returning where it ended up
    async fn deliver(
        &self,
        file_name: &str,
        transcript: &Transcript,
    ) -> Result<PathBuf, ExportError>;
}

/// Writes transcripts as files into a directory
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait::async_trait]
impl TranscriptSink for FileSink {
    async fn deliver(
        &self,
        file_name: &str,
        transcript: &Transcript,
    ) -> Result<PathBuf, ExportError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(file_name);
        tokio::fs::write(&path, transcript.as_str()).await?;
        info!(path = %path.display(), bytes = transcript.as_str().len(), "Transcript written");
        Ok(path)
    }
}
