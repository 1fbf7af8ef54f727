use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chat_exporter::extension_bridge::PageBridge;
use chat_exporter::platforms::browser::BrowserPage;
use chat_exporter::platforms::{ClipboardHost, ClipboardSink, CopyTarget, MessageSource};
use chat_exporter::config::Selectors;
use chat_exporter::ElementHandle;

mod common;
use common::fake_extension;

/// Page-side state the fake extension answers from
#[derive(Default)]
struct FakeTab {
    queued: VecDeque<String>,
    leftover: Vec<String>,
}

fn answer(tab: &Mutex<FakeTab>, code: &str) -> String {
    let mut tab = tab.lock().unwrap();
    if code.contains("clip.writeText = function") {
        "\"installed\"".to_string()
    } else if code.contains("state.writes.splice(0) : []") {
        let batch: Vec<String> = tab.queued.pop_front().into_iter().collect();
        serde_json::to_string(&batch).unwrap()
    } else if code.contains("navigator.clipboard.writeText = state.original") {
        serde_json::to_string(&std::mem::take(&mut tab.leftover)).unwrap()
    } else if code.contains("action-bar-copy") {
        "[5,6]".to_string()
    } else if code.contains("offsetParent") {
        "false".to_string()
    } else if code.contains("chat-title-button") {
        "\"Rust notes\"".to_string()
    } else {
        "true".to_string()
    }
}

async fn connect(tab: Arc<Mutex<FakeTab>>) -> BrowserPage {
    let bridge = PageBridge::bind("127.0.0.1:0").await.unwrap();
    fake_extension(&bridge, move |id, code| {
        serde_json::json!({ "id": id, "ok": true, "result": answer(&tab, code) }).to_string()
    })
    .await;
    BrowserPage::new(bridge, Selectors::default()).with_eval_timeout(Duration::from_secs(3))
}

#[derive(Default)]
struct Collected(Mutex<Vec<String>>);

impl ClipboardSink for Collected {
    fn write_text(&self, text: &str) {
        self.0.lock().unwrap().push(text.to_string());
    }
}

#[tokio::test]
async fn test_handles_and_title_come_from_page_replies() {
    let page = connect(Arc::new(Mutex::new(FakeTab::default()))).await;

    let controls = page.copy_controls().await.unwrap();
    assert_eq!(controls, vec![ElementHandle::new(5), ElementHandle::new(6)]);
    assert!(!page.is_rendered(&controls[0]).await.unwrap());
    assert_eq!(
        page.conversation_title().await.unwrap().as_deref(),
        Some("Rust notes")
    );
}

#[tokio::test]
async fn test_clipboard_pump_drains_queued_writes_in_order() {
    let tab = Arc::new(Mutex::new(FakeTab::default()));
    {
        let mut tab = tab.lock().unwrap();
        tab.queued.push_back("first write".to_string());
        tab.queued.push_back("second write".to_string());
        tab.leftover.push("written just before unhook".to_string());
    }
    let page = connect(tab).await;
    let sink = Arc::new(Collected::default());

    page.hook_clipboard(sink.clone(), false).await.unwrap();
    for _ in 0..100 {
        if sink.0.lock().unwrap().len() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    page.unhook_clipboard().await.unwrap();

    assert_eq!(
        *sink.0.lock().unwrap(),
        vec![
            "first write".to_string(),
            "second write".to_string(),
            "written just before unhook".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_second_hook_is_rejected() {
    let page = connect(Arc::new(Mutex::new(FakeTab::default()))).await;
    let sink = Arc::new(Collected::default());

    page.hook_clipboard(sink.clone(), false).await.unwrap();
    assert!(page.hook_clipboard(sink.clone(), false).await.is_err());
    page.unhook_clipboard().await.unwrap();
    page.unhook_clipboard().await.unwrap();
}
