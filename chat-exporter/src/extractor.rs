//! Recovers human message text through the host's edit mode.
//!
//! The host does not render raw human text in readable form, but its edit
//! surface does. Each message is hovered to reveal the edit affordance, opened
//! for editing, read, and closed again.

use crate::config::Delays;
use crate::platforms::{ElementHandle, EditSurface, MessageSource};
use crate::{ExportError, Message};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

pub struct HumanMessageExtractor<'a, P: ?Sized> {
    page: &'a P,
    hover_delay: Duration,
    edit_delay: Duration,
}

impl<'a, P> HumanMessageExtractor<'a, P>
where
    P: MessageSource + EditSurface + ?Sized,
{
    pub fn new(page: &'a P, delays: &Delays) -> Self {
        Self {
            page,
            hover_delay: delays.hover(),
            edit_delay: delays.edit(),
        }
    }

    /// Extract every human message in document order.
    ///
    /// Items without an edit affordance, or whose surface reads empty, are
    /// omitted. Only a failure to enumerate the messages is returned as an
    /// error.
    #[instrument(level = "debug", skip(self, on_recovered))]
    pub async fn extract_all<F>(&self, mut on_recovered: F) -> Result<Vec<Message>, ExportError>
    where
        F: FnMut(&Message) + Send,
    {
        let elements = self.page.human_messages().await?;
        if elements.is_empty() {
            warn!("No human messages matched on the page");
        }
        info!("🔄 Extracting {} human messages...", elements.len());

        let mut recovered = Vec::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            match self.extract_one(element, index).await {
                Ok(Some(content)) => {
                    let message = Message::human(content, index);
                    on_recovered(&message);
                    recovered.push(message);
                }
                Ok(None) => {
                    warn!(index, "Human message {} read back empty", index + 1);
                }
                Err(e) => {
                    warn!(index, error = %e, "Failed to extract message {}", index + 1);
                }
            }
        }

        info!(
            "✅ Extracted {}/{} human messages",
            recovered.len(),
            elements.len()
        );
        Ok(recovered)
    }

    async fn extract_one(
        &self,
        element: &ElementHandle,
        index: usize,
    ) -> Result<Option<String>, ExportError> {
        let result = self.read_via_edit(element, index).await;

        // Hover state must not stick, whatever happened above
        if let Err(e) = self.page.pointer_leave(element).await {
            debug!(index, error = %e, "pointer leave failed");
        }

        result
    }

    async fn read_via_edit(
        &self,
        element: &ElementHandle,
        index: usize,
    ) -> Result<Option<String>, ExportError> {
        self.page.pointer_enter(element).await?;
        sleep(self.hover_delay).await;

        let control = self
            .page
            .edit_control(element)
            .await?
            .ok_or_else(|| ExportError::ElementNotFound(format!("edit control for {element}")))?;

        debug!(index, "📝 Extracting message {} via edit", index + 1);
        self.page.begin_edit(&control).await?;
        sleep(self.edit_delay).await;

        let text = self.page.editable_text().await;

        // Leave edit mode even when the read failed
        let cancelled = self.page.cancel_edit().await;
        sleep(self.hover_delay).await;

        if let Err(e) = cancelled {
            warn!(index, error = %e, "Could not leave edit mode for message {}", index + 1);
        }

        Ok(text?.filter(|t| !t.is_empty()))
    }
}
