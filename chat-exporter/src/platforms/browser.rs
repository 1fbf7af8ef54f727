//! Live browser tab reached through the extension bridge.

use crate::config::Selectors;
use crate::extension_bridge::PageBridge;
use crate::platforms::{
    ClipboardHost, ClipboardSink, CopyTarget, EditSurface, ElementHandle, MessageSource,
};
use crate::ExportError;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub mod overlay;
pub mod scripts;

pub use overlay::PageOverlay;

const DEFAULT_EVAL_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_DRAIN_INTERVAL: Duration = Duration::from_millis(25);

/// Background task moving queued page writes into the sink
struct ClipboardPump {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
    sink: Arc<dyn ClipboardSink>,
}

pub struct BrowserPage {
    bridge: Arc<PageBridge>,
    selectors: Selectors,
    eval_timeout: Duration,
    drain_interval: Duration,
    pump: Mutex<Option<ClipboardPump>>,
}

impl BrowserPage {
    pub fn new(bridge: Arc<PageBridge>, selectors: Selectors) -> Self {
        Self {
            bridge,
            selectors,
            eval_timeout: DEFAULT_EVAL_TIMEOUT,
            drain_interval: DEFAULT_DRAIN_INTERVAL,
            pump: Mutex::new(None),
        }
    }

    pub fn with_eval_timeout(mut self, timeout: Duration) -> Self {
        self.eval_timeout = timeout;
        self
    }

    pub fn bridge(&self) -> &Arc<PageBridge> {
        &self.bridge
    }

    async fn eval_json<T: DeserializeOwned>(&self, script: &str) -> Result<T, ExportError> {
        eval_json(&self.bridge, script, self.eval_timeout).await
    }

    async fn eval_unit(&self, script: &str) -> Result<(), ExportError> {
        let _: serde_json::Value = self.eval_json(script).await?;
        Ok(())
    }

    async fn tag_all(&self, selector: &str) -> Result<Vec<ElementHandle>, ExportError> {
        let ids: Vec<u64> = self.eval_json(&scripts::tag_all(selector)).await?;
        Ok(ids.into_iter().map(ElementHandle::new).collect())
    }
}

async fn eval_json<T: DeserializeOwned>(
    bridge: &PageBridge,
    script: &str,
    timeout: Duration,
) -> Result<T, ExportError> {
    let raw = bridge.eval(script, timeout).await?;
    serde_json::from_str(&raw).map_err(|e| {
        ExportError::ScriptError(format!(
            "unexpected reply {:?}: {e}",
            raw.chars().take(120).collect::<String>()
        ))
    })
}

#[async_trait::async_trait]
impl MessageSource for BrowserPage {
    async fn human_messages(&self) -> Result<Vec<ElementHandle>, ExportError> {
        self.tag_all(&self.selectors.user_message).await
    }

    async fn conversation_title(&self) -> Result<Option<String>, ExportError> {
        self.eval_json(&scripts::read_title(&self.selectors.conversation_title))
            .await
    }
}

#[async_trait::async_trait]
impl EditSurface for BrowserPage {
    async fn pointer_enter(&self, message: &ElementHandle) -> Result<(), ExportError> {
        self.eval_unit(&scripts::dispatch_pointer(message, "mouseenter"))
            .await
    }

    async fn pointer_leave(&self, message: &ElementHandle) -> Result<(), ExportError> {
        self.eval_unit(&scripts::dispatch_pointer(message, "mouseleave"))
            .await
    }

    async fn edit_control(
        &self,
        message: &ElementHandle,
    ) -> Result<Option<ElementHandle>, ExportError> {
        let id: Option<u64> = self
            .eval_json(&scripts::find_edit_control(
                message,
                &self.selectors.message_group,
                &self.selectors.edit_button,
            ))
            .await?;
        Ok(id.map(ElementHandle::new))
    }

    async fn begin_edit(&self, control: &ElementHandle) -> Result<(), ExportError> {
        self.eval_unit(&scripts::click(control)).await
    }

    async fn editable_text(&self) -> Result<Option<String>, ExportError> {
        self.eval_json(&scripts::read_textarea(&self.selectors.edit_textarea))
            .await
    }

    async fn cancel_edit(&self) -> Result<(), ExportError> {
        self.eval_unit(&scripts::press_escape()).await
    }
}

#[async_trait::async_trait]
impl CopyTarget for BrowserPage {
    async fn copy_controls(&self) -> Result<Vec<ElementHandle>, ExportError> {
        self.tag_all(&self.selectors.copy_button).await
    }

    async fn is_rendered(&self, control: &ElementHandle) -> Result<bool, ExportError> {
        self.eval_json(&scripts::is_rendered(control)).await
    }

    async fn scroll_into_view(&self, control: &ElementHandle) -> Result<(), ExportError> {
        self.eval_unit(&scripts::scroll_into_view(control)).await
    }

    async fn activate_copy(&self, control: &ElementHandle) -> Result<(), ExportError> {
        self.eval_unit(&scripts::click(control)).await
    }
}

#[async_trait::async_trait]
impl ClipboardHost for BrowserPage {
    async fn hook_clipboard(
        &self,
        sink: Arc<dyn ClipboardSink>,
        forward: bool,
    ) -> Result<(), ExportError> {
        let mut pump = self.pump.lock().await;
        if pump.is_some() {
            return Err(ExportError::SessionActive);
        }

        let status: String = self
            .eval_json(&scripts::install_clipboard_hook(forward))
            .await?;
        if status != "installed" {
            warn!(status = %status, "Clipboard hook was already present in the page");
        }

        let (stop, mut stopped) = watch::channel(false);
        let bridge = self.bridge.clone();
        let task_sink = sink.clone();
        let interval = self.drain_interval;
        let timeout = self.eval_timeout;
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stopped.changed() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
                match eval_json::<Vec<String>>(&bridge, &scripts::drain_clipboard(), timeout).await
                {
                    Ok(writes) => {
                        for text in writes {
                            task_sink.write_text(&text);
                        }
                    }
                    Err(e) => debug!("Clipboard drain failed: {}", e),
                }
            }
        });

        *pump = Some(ClipboardPump { stop, task, sink });
        info!(forward, "Clipboard hook installed in page");
        Ok(())
    }

    async fn unhook_clipboard(&self) -> Result<(), ExportError> {
        let Some(pump) = self.pump.lock().await.take() else {
            return Ok(());
        };
        let _ = pump.stop.send(true);
        if let Err(e) = pump.task.await {
            warn!("Clipboard pump ended abnormally: {}", e);
        }

        // Writes queued since the last drain still belong to this session
        let leftover: Vec<String> = self.eval_json(&scripts::restore_clipboard()).await?;
        for text in leftover {
            pump.sink.write_text(&text);
        }
        info!("Clipboard hook removed from page");
        Ok(())
    }
}
