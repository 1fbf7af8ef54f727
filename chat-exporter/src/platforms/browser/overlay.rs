use super::scripts;
use crate::extension_bridge::PageBridge;
use crate::status::{StatusObserver, StatusTone, StatusUpdate};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Fixed-position status box shown in the page during a session
pub struct PageOverlay {
    bridge: Arc<PageBridge>,
    timeout: Duration,
}

impl PageOverlay {
    pub fn new(bridge: Arc<PageBridge>) -> Self {
        Self {
            bridge,
            timeout: Duration::from_secs(2),
        }
    }

    fn background(tone: StatusTone) -> &'static str {
        match tone {
            StatusTone::Progress => "#2196F3",
            StatusTone::Success => "#4CAF50",
            StatusTone::Failure => "#f44336",
        }
    }
}

#[async_trait::async_trait]
impl StatusObserver for PageOverlay {
    async fn on_status(&self, update: StatusUpdate) {
        let script = scripts::show_overlay(&update.message, Self::background(update.tone));
        if let Err(e) = self.bridge.eval(&script, self.timeout).await {
            debug!("Status overlay update failed: {}", e);
        }
    }

    async fn on_teardown(&self) {
        if let Err(e) = self.bridge.eval(&scripts::remove_overlay(), self.timeout).await {
            debug!("Status overlay removal failed: {}", e);
        }
    }
}
