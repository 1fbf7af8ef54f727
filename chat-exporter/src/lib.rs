//! Chat transcript export through UI side channels
//!
//! The host chat UI keeps human message text behind its edit mode and
//! assistant text behind its copy action. This crate drives both channels,
//! synchronizes the two independently filled sequences, and assembles them
//! into one Markdown transcript.
//!
//! A session runs as a fixed sequence of phases (see [`session`]). The page is
//! reached only through the capability traits in [`platforms`], so the same
//! engine runs against a live browser tab or an in-memory scripted page.

use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::sleep;
use tracing::{info, instrument, warn};

pub mod clipboard;
pub mod config;
pub mod copy_trigger;
pub mod errors;
pub mod extension_bridge;
pub mod extractor;
pub mod message;
pub mod platforms;
pub mod session;
pub mod sink;
pub mod status;
pub mod synchronizer;
#[cfg(test)]
mod tests;
pub mod transcript;

pub use clipboard::{CaptureLog, ClipboardInterceptor, InterceptGuard};
pub use config::ExporterConfig;
pub use copy_trigger::{CopyReport, CopyTrigger};
pub use errors::ExportError;
pub use extractor::HumanMessageExtractor;
pub use message::{Message, Role};
pub use platforms::{ChatPage, ElementHandle};
pub use session::{ExportSession, SessionReport, SessionState};
pub use sink::{FileSink, TranscriptSink};
pub use status::{StatusObserver, StatusTone, StatusUpdate};
pub use synchronizer::SyncOutcome;
pub use transcript::Transcript;

/// Pages that currently have a session running, keyed by page instance
static ACTIVE_PAGES: Lazy<Mutex<HashSet<usize>>> = Lazy::new(|| Mutex::new(HashSet::new()));

fn active_pages() -> MutexGuard<'static, HashSet<usize>> {
    ACTIVE_PAGES.lock().unwrap_or_else(|e| e.into_inner())
}

/// The main entry point for exporting a conversation.
///
/// Holds the page adapter and configuration. At most one session runs per
/// page instance, across every exporter sharing that `Arc`.
pub struct Exporter<P: ChatPage + ?Sized + 'static = dyn ChatPage> {
    page: Arc<P>,
    config: ExporterConfig,
}

impl<P: ChatPage + ?Sized + 'static> Exporter<P> {
    pub fn new(page: Arc<P>, config: ExporterConfig) -> Self {
        Self { page, config }
    }

    pub fn config(&self) -> &ExporterConfig {
        &self.config
    }

    pub fn page(&self) -> &Arc<P> {
        &self.page
    }

    /// Whether a session currently holds the page
    pub fn is_busy(&self) -> bool {
        active_pages().contains(&self.page_key())
    }

    fn page_key(&self) -> usize {
        Arc::as_ptr(&self.page) as *const () as usize
    }

    /// Run one export session to teardown.
    ///
    /// Returns [`ExportError::SessionActive`] if another session on the same
    /// page has not torn down yet, before any status is reported. Every other
    /// outcome, including structural failures, is carried in the returned
    /// report.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use chat_exporter::platforms::scripted::ScriptedPage;
    /// use chat_exporter::status::TracingObserver;
    /// use chat_exporter::{Exporter, ExporterConfig, FileSink};
    ///
    /// # async fn example() -> Result<(), chat_exporter::ExportError> {
    /// let page = Arc::new(ScriptedPage::builder().human("hello").build());
    /// let exporter = Exporter::new(page, ExporterConfig::default());
    /// let report = exporter
    ///     .export(Arc::new(TracingObserver), Arc::new(FileSink::new("out")))
    ///     .await?;
    /// println!("{:?}", report.path);
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip_all)]
    pub async fn export(
        &self,
        observer: Arc<dyn StatusObserver>,
        sink: Arc<dyn TranscriptSink>,
    ) -> Result<SessionReport, ExportError> {
        let key = self.page_key();
        if !active_pages().insert(key) {
            warn!("Rejected export start: a session is already active on this page");
            return Err(ExportError::SessionActive);
        }
        let _lease = SessionLease(key);

        info!("Starting export session");
        sleep(self.config.delays.start()).await;

        let session = ExportSession::new(self.page.clone(), self.config.clone(), observer, sink);
        Ok(session.run().await)
    }
}

impl<P: ChatPage + ?Sized + 'static> Clone for Exporter<P> {
    fn clone(&self) -> Self {
        Self {
            page: self.page.clone(),
            config: self.config.clone(),
        }
    }
}

/// Frees the page when a session ends, however it ends
struct SessionLease(usize);

impl Drop for SessionLease {
    fn drop(&mut self) {
        active_pages().remove(&self.0);
    }
}
