use crate::platforms::{CopyTarget, ElementHandle};
use crate::ExportError;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// Outcome of one pass over the copy controls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyReport {
    /// Controls matched on the page
    pub found: usize,
    /// Controls that were activated without error
    pub activated: usize,
    /// Controls skipped because they were not rendered
    pub skipped: usize,
    /// Controls whose activation failed
    pub failed: usize,
}

/// Fires every copy control so the host writes each response to the clipboard
pub struct CopyTrigger<'a, P: ?Sized> {
    page: &'a P,
    gap: Duration,
}

impl<'a, P> CopyTrigger<'a, P>
where
    P: CopyTarget + ?Sized,
{
    pub fn new(page: &'a P, gap: Duration) -> Self {
        Self { page, gap }
    }

    /// Activate all copy controls in document order, pausing between
    /// activations but not after the last one.
    ///
    /// Finding no controls at all is structural and returns
    /// [`ExportError::NoCopyControls`]. Per-control failures are logged and
    /// counted.
    #[instrument(level = "debug", skip(self))]
    pub async fn trigger_all(&self) -> Result<CopyReport, ExportError> {
        let controls = self.page.copy_controls().await?;
        if controls.is_empty() {
            return Err(ExportError::NoCopyControls);
        }

        info!("🚀 Clicking {} copy buttons...", controls.len());
        let mut report = CopyReport {
            found: controls.len(),
            ..CopyReport::default()
        };

        for (i, control) in controls.iter().enumerate() {
            match self.activate(control).await {
                Ok(true) => {
                    report.activated += 1;
                    debug!("🖱️ Clicked copy button {}/{}", i + 1, controls.len());
                }
                Ok(false) => {
                    report.skipped += 1;
                    debug!("Copy button {} is not rendered, skipping", i + 1);
                }
                Err(e) => {
                    report.failed += 1;
                    warn!("Failed to click button {}: {}", i + 1, e);
                }
            }

            if i + 1 < controls.len() {
                sleep(self.gap).await;
            }
        }

        Ok(report)
    }

    async fn activate(&self, control: &ElementHandle) -> Result<bool, ExportError> {
        if !self.page.is_rendered(control).await? {
            return Ok(false);
        }
        self.page.scroll_into_view(control).await?;
        self.page.activate_copy(control).await?;
        Ok(true)
    }
}
