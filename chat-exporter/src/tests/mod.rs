mod synchronizer_tests;
mod transcript_tests;

use crate::status::{StatusObserver, StatusUpdate};
use crate::{ExportError, Transcript, TranscriptSink};
use std::path::PathBuf;
use std::sync::Mutex;

// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()))
        .with_target(true)
        .with_test_writer()
        .try_init();
}

/// Keeps every status update for later assertions
#[derive(Default)]
pub struct RecordingObserver {
    updates: Mutex<Vec<StatusUpdate>>,
    teardowns: Mutex<usize>,
}

impl RecordingObserver {
    pub fn updates(&self) -> Vec<StatusUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.updates().into_iter().map(|u| u.message).collect()
    }

    pub fn teardowns(&self) -> usize {
        *self.teardowns.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl StatusObserver for RecordingObserver {
    async fn on_status(&self, update: StatusUpdate) {
        self.updates.lock().unwrap().push(update);
    }

    async fn on_teardown(&self) {
        *self.teardowns.lock().unwrap() += 1;
    }
}

/// Collects delivered transcripts instead of writing files
#[derive(Default)]
pub struct MemorySink {
    delivered: Mutex<Vec<(String, String)>>,
}

impl MemorySink {
    pub fn delivered(&self) -> Vec<(String, String)> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl TranscriptSink for MemorySink {
    async fn deliver(
        &self,
        file_name: &str,
        transcript: &Transcript,
    ) -> Result<PathBuf, ExportError> {
        self.delivered
            .lock()
            .unwrap()
            .push((file_name.to_string(), transcript.to_string()));
        Ok(PathBuf::from(file_name))
    }
}
