//! Session controller: one export run as an explicit state machine.
//!
//! ```text
//! Idle -> Extracting -> Copying -> Waiting -> Completed -> TornDown
//!              |            |          |
//!              +------------+----------+----> Failed ----> TornDown
//! ```

use crate::clipboard::{CaptureLog, ClipboardInterceptor, InterceptGuard};
use crate::config::ExporterConfig;
use crate::copy_trigger::{CopyReport, CopyTrigger};
use crate::extractor::HumanMessageExtractor;
use crate::platforms::ChatPage;
use crate::sink::TranscriptSink;
use crate::status::{StatusObserver, StatusUpdate};
use crate::synchronizer::{self, SyncOutcome};
use crate::transcript::{self, Transcript};
use crate::{ExportError, Message};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Extracting,
    Copying,
    Waiting,
    Completed,
    Failed,
    TornDown,
}

impl SessionState {
    pub fn can_advance_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Extracting)
                | (Extracting, Copying)
                | (Extracting, Failed)
                | (Copying, Waiting)
                | (Copying, Failed)
                | (Waiting, Completed)
                | (Waiting, Failed)
                | (Completed, TornDown)
                | (Failed, TornDown)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == SessionState::TornDown
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Extracting => "extracting",
            SessionState::Copying => "copying",
            SessionState::Waiting => "waiting",
            SessionState::Completed => "completed",
            SessionState::Failed => "failed",
            SessionState::TornDown => "torn_down",
        };
        f.write_str(name)
    }
}

/// Everything a finished session produced
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// `Completed` or `Failed`
    pub outcome: SessionState,
    pub human_messages: Vec<Message>,
    pub assistant_messages: Vec<Message>,
    pub copy: Option<CopyReport>,
    pub sync: Option<SyncOutcome>,
    pub transcript: Option<Transcript>,
    pub file_name: Option<String>,
    pub path: Option<PathBuf>,
    pub error: Option<String>,
}

impl SessionReport {
    fn new() -> Self {
        Self {
            outcome: SessionState::Idle,
            human_messages: Vec::new(),
            assistant_messages: Vec::new(),
            copy: None,
            sync: None,
            transcript: None,
            file_name: None,
            path: None,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == SessionState::Completed
    }

    /// Whether every copy activation was matched by a capture
    pub fn is_sync_complete(&self) -> bool {
        self.sync.map(|s| s.is_complete()).unwrap_or(false)
    }
}

pub struct ExportSession<P: ChatPage + ?Sized + 'static> {
    page: Arc<P>,
    config: ExporterConfig,
    observer: Arc<dyn StatusObserver>,
    sink: Arc<dyn TranscriptSink>,
    state_tx: watch::Sender<SessionState>,
    report: SessionReport,
}

impl<P: ChatPage + ?Sized + 'static> ExportSession<P> {
    pub fn new(
        page: Arc<P>,
        config: ExporterConfig,
        observer: Arc<dyn StatusObserver>,
        sink: Arc<dyn TranscriptSink>,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        Self {
            page,
            config,
            observer,
            sink,
            state_tx,
            report: SessionReport::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// Follow state changes from outside the session
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    fn advance(&mut self, next: SessionState) -> Result<(), ExportError> {
        let current = self.state();
        if !current.can_advance_to(next) {
            return Err(ExportError::InvalidTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }
        debug!(from = %current, to = %next, "Session transition");
        self.state_tx.send_replace(next);
        Ok(())
    }

    async fn notify(&self, update: StatusUpdate) {
        self.observer.on_status(update).await;
    }

    /// Run the session to teardown and report what it produced.
    #[instrument(skip(self), name = "export_session")]
    pub async fn run(mut self) -> SessionReport {
        let log = Arc::new(CaptureLog::new(self.config.capture.min_length));
        let (human_tx, human_rx) = watch::channel(0usize);
        let progress = self.spawn_progress(human_rx, log.subscribe());

        let mut guard = None;
        let result = self.drive(&log, &mut guard, &human_tx).await;
        log.deactivate();
        progress.abort();

        match result {
            Ok(()) => {
                let file = self.report.file_name.clone().unwrap_or_default();
                self.report.outcome = SessionState::Completed;
                self.notify(StatusUpdate::success(
                    SessionState::Completed,
                    format!("✅ Downloaded: {file}"),
                ))
                .await;
                info!("🎉 Export complete!");
            }
            Err(e) => {
                if let Err(transition) = self.advance(SessionState::Failed) {
                    warn!("{}", transition);
                }
                self.report.outcome = SessionState::Failed;
                let message = match e {
                    ExportError::EmptyResult => "No messages captured!".to_string(),
                    ref other => format!("Error: {other}"),
                };
                error!("Export failed: {}", e);
                self.report.error = Some(e.to_string());
                self.notify(StatusUpdate::failure(SessionState::Failed, message))
                    .await;
            }
        }

        self.teardown(guard).await;
        self.report
    }

    async fn drive(
        &mut self,
        log: &Arc<CaptureLog>,
        guard: &mut Option<InterceptGuard<P>>,
        human_tx: &watch::Sender<usize>,
    ) -> Result<(), ExportError> {
        self.advance(SessionState::Extracting)?;
        *guard = Some(
            ClipboardInterceptor::install(
                self.page.clone(),
                log.clone(),
                self.config.capture.forward_to_clipboard,
            )
            .await?,
        );

        self.notify(StatusUpdate::progress(
            SessionState::Extracting,
            "Extracting human messages...",
        ))
        .await;
        let page = self.page.clone();
        let human = HumanMessageExtractor::new(&*page, &self.config.delays)
            .extract_all(|_| {
                human_tx.send_modify(|count| *count += 1);
            })
            .await?;
        self.report.human_messages = human;

        self.advance(SessionState::Copying)?;
        self.notify(StatusUpdate::progress(
            SessionState::Copying,
            "Copying Claude responses...",
        ))
        .await;
        let copy = CopyTrigger::new(&*page, self.config.delays.copy())
            .trigger_all()
            .await?;
        self.report.copy = Some(copy);

        self.advance(SessionState::Waiting)?;
        let sync = synchronizer::wait_until(
            log,
            copy.found,
            self.config.sync.max_wait(),
            self.config.sync.poll_interval(),
        )
        .await;
        self.report.sync = Some(sync);

        log.deactivate();
        self.report.assistant_messages = log.snapshot();
        if self.report.human_messages.is_empty() && self.report.assistant_messages.is_empty() {
            return Err(ExportError::EmptyResult);
        }

        let style = &self.config.style;
        let transcript = transcript::assemble(
            &self.report.human_messages,
            &self.report.assistant_messages,
            style,
        );

        let title = match page.conversation_title().await {
            Ok(title) => title,
            Err(e) => {
                warn!("Could not read conversation title: {}", e);
                None
            }
        };
        let file_name = transcript::file_name(title.as_deref(), style);
        let path = self.sink.deliver(&file_name, &transcript).await?;

        self.report.transcript = Some(transcript);
        self.report.file_name = Some(file_name);
        self.report.path = Some(path);
        self.advance(SessionState::Completed)?;
        Ok(())
    }

    async fn teardown(&mut self, guard: Option<InterceptGuard<P>>) {
        sleep(self.config.delays.teardown()).await;
        if let Some(guard) = guard {
            if let Err(e) = guard.release().await {
                warn!("Failed to restore clipboard capability: {}", e);
            }
        }
        self.observer.on_teardown().await;
        if let Err(e) = self.advance(SessionState::TornDown) {
            warn!("{}", e);
        }
    }

    fn spawn_progress(
        &self,
        mut human_rx: watch::Receiver<usize>,
        mut capture_rx: watch::Receiver<usize>,
    ) -> JoinHandle<()> {
        let observer = self.observer.clone();
        let state_rx = self.state_tx.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = human_rx.changed() => if changed.is_err() { break },
                    changed = capture_rx.changed() => if changed.is_err() { break },
                }
                let human = *human_rx.borrow_and_update();
                let captured = *capture_rx.borrow_and_update();
                let state = *state_rx.borrow();
                observer
                    .on_status(StatusUpdate::progress(
                        state,
                        format!("Human: {human} | Claude: {captured}"),
                    ))
                    .await;
            }
        })
    }
}
