use std::sync::{Arc, Mutex};
use std::time::Duration;

use chat_exporter::platforms::scripted::ScriptedPage;
use chat_exporter::status::TracingObserver;
use chat_exporter::{
    ChatPage, ExportError, Exporter, ExporterConfig, FileSink, SessionState, StatusObserver,
    StatusUpdate,
};

const ANSWER_ONE: &str = "Ownership means each value has a single owner at a time.";
const ANSWER_TWO: &str = "Borrowing lets you reference a value without taking ownership.";

fn conversation() -> ScriptedPage {
    ScriptedPage::builder()
        .title("Rust ownership basics")
        .human("What is ownership?")
        .human("And borrowing?")
        .response(ANSWER_ONE)
        .response(ANSWER_TWO)
        .write_latency(Duration::from_millis(40))
        .build()
}

#[tokio::test(start_paused = true)]
async fn test_export_writes_markdown_file() {
    let dir = tempfile::tempdir().unwrap();
    let page: Arc<dyn ChatPage> = Arc::new(conversation());
    let exporter = Exporter::new(page, ExporterConfig::default());

    let report = exporter
        .export(Arc::new(TracingObserver), Arc::new(FileSink::new(dir.path())))
        .await
        .unwrap();

    assert_eq!(report.outcome, SessionState::Completed);
    let path = report.path.expect("completed sessions have a path");
    assert_eq!(path, dir.path().join("rust_ownership_basics.md"));

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.starts_with("# Conversation with Claude\n\n## Human:\n\nWhat is ownership?"));
    let human_two = written.find("And borrowing?").unwrap();
    let answer_one = written.find(ANSWER_ONE).unwrap();
    let answer_two = written.find(ANSWER_TWO).unwrap();
    assert!(answer_one < human_two && human_two < answer_two);
    assert!(!exporter.is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_start_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let exporter = Exporter::new(Arc::new(conversation()), ExporterConfig::default());
    let second = exporter.clone();

    let observer = Arc::new(TracingObserver);
    let sink = Arc::new(FileSink::new(dir.path()));
    let (first, rejected) = tokio::join!(
        exporter.export(observer.clone(), sink.clone()),
        second.export(observer.clone(), sink.clone()),
    );

    assert!(first.unwrap().is_success());
    assert!(matches!(rejected, Err(ExportError::SessionActive)));

    // Once torn down, the exporter accepts a new session
    let again = exporter.export(observer, sink).await.unwrap();
    assert!(again.is_success());
    assert_eq!(exporter.page().hooks_installed(), 2);
    assert_eq!(exporter.page().hooks_removed(), 2);
}

/// Counts status traffic so a rejected start can be shown to stay silent
#[derive(Default)]
struct CountingObserver {
    updates: Mutex<usize>,
    teardowns: Mutex<usize>,
}

#[async_trait::async_trait]
impl StatusObserver for CountingObserver {
    async fn on_status(&self, _update: StatusUpdate) {
        *self.updates.lock().unwrap() += 1;
    }

    async fn on_teardown(&self) {
        *self.teardowns.lock().unwrap() += 1;
    }
}

#[tokio::test(start_paused = true)]
async fn test_separate_exporters_on_one_page_are_exclusive() {
    let dir = tempfile::tempdir().unwrap();
    let page = Arc::new(conversation());
    let first = Exporter::new(page.clone(), ExporterConfig::default());
    let shared: Arc<dyn ChatPage> = page.clone();
    let second = Exporter::new(shared, ExporterConfig::default());

    let sink = Arc::new(FileSink::new(dir.path()));
    let silent = Arc::new(CountingObserver::default());
    let (done, rejected) = tokio::join!(
        first.export(Arc::new(TracingObserver), sink.clone()),
        second.export(silent.clone(), sink.clone()),
    );

    assert!(done.unwrap().is_success());
    assert!(matches!(rejected, Err(ExportError::SessionActive)));
    assert_eq!(*silent.updates.lock().unwrap(), 0);
    assert_eq!(*silent.teardowns.lock().unwrap(), 0);
    assert_eq!(page.hooks_installed(), 1);
    assert!(!first.is_busy() && !second.is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_untitled_conversation_uses_fallback_name() {
    let dir = tempfile::tempdir().unwrap();
    let page = ScriptedPage::builder()
        .title("New conversation")
        .human("hello there")
        .response(ANSWER_ONE)
        .build();
    let exporter = Exporter::new(Arc::new(page), ExporterConfig::default());

    let report = exporter
        .export(Arc::new(TracingObserver), Arc::new(FileSink::new(dir.path())))
        .await
        .unwrap();

    assert_eq!(report.file_name.as_deref(), Some("claude_conversation.md"));
    assert!(dir.path().join("claude_conversation.md").exists());
}

#[tokio::test(start_paused = true)]
async fn test_failed_session_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let page = ScriptedPage::builder().human("no answers yet").build();
    let exporter = Exporter::new(Arc::new(page), ExporterConfig::default());

    let report = exporter
        .export(Arc::new(TracingObserver), Arc::new(FileSink::new(dir.path())))
        .await
        .unwrap();

    assert_eq!(report.outcome, SessionState::Failed);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    assert!(!exporter.page().is_hooked());
}
