//! In-memory chat page with scripted behavior.
//!
//! Mirrors the host's observable behavior closely enough to drive the whole
//! engine deterministically: edit affordances only appear while a message is
//! hovered, and copy activations write to the clipboard after a configurable
//! latency, the way the real host writes asynchronously.

use crate::platforms::{
    ClipboardHost, ClipboardSink, CopyTarget, EditSurface, ElementHandle, MessageSource,
};
use crate::ExportError;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const EDIT_CONTROL_BASE: u64 = 1_000;
const COPY_CONTROL_BASE: u64 = 2_000;

/// Interactions observed by the page, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    PointerEnter(usize),
    PointerLeave(usize),
    EditOpened(usize),
    EditCancelled,
    CopyActivated(usize),
    ClipboardHooked { forward: bool },
    ClipboardUnhooked,
}

#[derive(Debug, Clone)]
struct ScriptedHuman {
    /// `None` when the message has no edit affordance
    text: Option<String>,
}

#[derive(Debug, Clone)]
struct ScriptedResponse {
    text: String,
    rendered: bool,
    fails: bool,
}

#[derive(Default)]
struct PageState {
    hovered: Option<usize>,
    editing: Option<usize>,
    hook: Option<(Arc<dyn ClipboardSink>, bool)>,
    system_clipboard: Vec<String>,
    events: Vec<PageEvent>,
    hooks_installed: usize,
    hooks_removed: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedPageBuilder {
    humans: Vec<ScriptedHuman>,
    responses: Vec<ScriptedResponse>,
    title: Option<String>,
    write_latency: Duration,
    broken_source: bool,
}

impl ScriptedPageBuilder {
    /// A human message recoverable through edit mode
    pub fn human(mut self, text: impl Into<String>) -> Self {
        self.humans.push(ScriptedHuman {
            text: Some(text.into()),
        });
        self
    }

    /// A human message that never shows an edit affordance
    pub fn human_without_edit(mut self) -> Self {
        self.humans.push(ScriptedHuman { text: None });
        self
    }

    /// An assistant response behind a rendered copy control
    pub fn response(mut self, text: impl Into<String>) -> Self {
        self.responses.push(ScriptedResponse {
            text: text.into(),
            rendered: true,
            fails: false,
        });
        self
    }

    /// A copy control that is matched but not part of the layout
    pub fn hidden_response(mut self, text: impl Into<String>) -> Self {
        self.responses.push(ScriptedResponse {
            text: text.into(),
            rendered: false,
            fails: false,
        });
        self
    }

    /// A copy control whose activation throws
    pub fn failing_response(mut self, text: impl Into<String>) -> Self {
        self.responses.push(ScriptedResponse {
            text: text.into(),
            rendered: true,
            fails: true,
        });
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Delay between a copy activation and the host's clipboard write
    pub fn write_latency(mut self, latency: Duration) -> Self {
        self.write_latency = latency;
        self
    }

    /// Make message enumeration fail outright
    pub fn broken_message_source(mut self) -> Self {
        self.broken_source = true;
        self
    }

    pub fn build(self) -> ScriptedPage {
        ScriptedPage {
            humans: self.humans,
            responses: self.responses,
            title: self.title,
            write_latency: self.write_latency,
            broken_source: self.broken_source,
            state: Arc::new(Mutex::new(PageState::default())),
        }
    }
}

pub struct ScriptedPage {
    humans: Vec<ScriptedHuman>,
    responses: Vec<ScriptedResponse>,
    title: Option<String>,
    write_latency: Duration,
    broken_source: bool,
    state: Arc<Mutex<PageState>>,
}

impl ScriptedPage {
    pub fn builder() -> ScriptedPageBuilder {
        ScriptedPageBuilder::default()
    }

    pub fn events(&self) -> Vec<PageEvent> {
        self.lock().events.clone()
    }

    /// Text that reached the real clipboard
    pub fn system_clipboard(&self) -> Vec<String> {
        self.lock().system_clipboard.clone()
    }

    pub fn is_hooked(&self) -> bool {
        self.lock().hook.is_some()
    }

    pub fn hooks_installed(&self) -> usize {
        self.lock().hooks_installed
    }

    pub fn hooks_removed(&self) -> usize {
        self.lock().hooks_removed
    }

    /// Perform a host clipboard write right now
    pub fn write_clipboard(&self, text: &str) {
        deliver_write(&self.state, text);
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn human_index(&self, handle: &ElementHandle) -> Result<usize, ExportError> {
        let index = handle.id() as usize;
        if index < self.humans.len() {
            Ok(index)
        } else {
            Err(ExportError::ElementNotFound(format!("human message {handle}")))
        }
    }

    fn control_index(
        &self,
        handle: &ElementHandle,
        base: u64,
        len: usize,
    ) -> Result<usize, ExportError> {
        handle
            .id()
            .checked_sub(base)
            .map(|i| i as usize)
            .filter(|i| *i < len)
            .ok_or_else(|| ExportError::ElementNotFound(format!("control {handle}")))
    }
}

fn deliver_write(state: &Mutex<PageState>, text: &str) {
    let hook = {
        let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());
        let state = &mut *guard;
        match &state.hook {
            Some((sink, forward)) => {
                if *forward {
                    state.system_clipboard.push(text.to_string());
                }
                Some(sink.clone())
            }
            None => {
                state.system_clipboard.push(text.to_string());
                None
            }
        }
    };
    if let Some(sink) = hook {
        sink.write_text(text);
    }
}

#[async_trait::async_trait]
impl MessageSource for ScriptedPage {
    async fn human_messages(&self) -> Result<Vec<ElementHandle>, ExportError> {
        if self.broken_source {
            return Err(ExportError::PlatformError(
                "message container is not attached".into(),
            ));
        }
        Ok((0..self.humans.len() as u64).map(ElementHandle::new).collect())
    }

    async fn conversation_title(&self) -> Result<Option<String>, ExportError> {
        Ok(self.title.clone())
    }
}

#[async_trait::async_trait]
impl EditSurface for ScriptedPage {
    async fn pointer_enter(&self, message: &ElementHandle) -> Result<(), ExportError> {
        let index = self.human_index(message)?;
        let mut state = self.lock();
        state.hovered = Some(index);
        state.events.push(PageEvent::PointerEnter(index));
        Ok(())
    }

    async fn pointer_leave(&self, message: &ElementHandle) -> Result<(), ExportError> {
        let index = self.human_index(message)?;
        let mut state = self.lock();
        if state.hovered == Some(index) {
            state.hovered = None;
        }
        state.events.push(PageEvent::PointerLeave(index));
        Ok(())
    }

    async fn edit_control(
        &self,
        message: &ElementHandle,
    ) -> Result<Option<ElementHandle>, ExportError> {
        let index = self.human_index(message)?;
        let hovered = self.lock().hovered == Some(index);
        let editable = self.humans[index].text.is_some();
        Ok((hovered && editable).then(|| ElementHandle::new(EDIT_CONTROL_BASE + index as u64)))
    }

    async fn begin_edit(&self, control: &ElementHandle) -> Result<(), ExportError> {
        let index = self.control_index(control, EDIT_CONTROL_BASE, self.humans.len())?;
        let mut state = self.lock();
        state.editing = Some(index);
        state.events.push(PageEvent::EditOpened(index));
        Ok(())
    }

    async fn editable_text(&self) -> Result<Option<String>, ExportError> {
        let editing = self.lock().editing;
        Ok(editing.and_then(|i| self.humans[i].text.clone()))
    }

    async fn cancel_edit(&self) -> Result<(), ExportError> {
        let mut state = self.lock();
        state.editing = None;
        state.events.push(PageEvent::EditCancelled);
        Ok(())
    }
}

#[async_trait::async_trait]
impl CopyTarget for ScriptedPage {
    async fn copy_controls(&self) -> Result<Vec<ElementHandle>, ExportError> {
        Ok((0..self.responses.len() as u64)
            .map(|i| ElementHandle::new(COPY_CONTROL_BASE + i))
            .collect())
    }

    async fn is_rendered(&self, control: &ElementHandle) -> Result<bool, ExportError> {
        let index = self.control_index(control, COPY_CONTROL_BASE, self.responses.len())?;
        Ok(self.responses[index].rendered)
    }

    async fn scroll_into_view(&self, control: &ElementHandle) -> Result<(), ExportError> {
        self.control_index(control, COPY_CONTROL_BASE, self.responses.len())?;
        Ok(())
    }

    async fn activate_copy(&self, control: &ElementHandle) -> Result<(), ExportError> {
        let index = self.control_index(control, COPY_CONTROL_BASE, self.responses.len())?;
        let response = &self.responses[index];
        if response.fails {
            return Err(ExportError::PlatformError(format!(
                "copy button {} threw on click",
                index + 1
            )));
        }
        self.lock().events.push(PageEvent::CopyActivated(index));

        if self.write_latency.is_zero() {
            deliver_write(&self.state, &response.text);
        } else {
            let state = self.state.clone();
            let text = response.text.clone();
            let latency = self.write_latency;
            tokio::spawn(async move {
                tokio::time::sleep(latency).await;
                deliver_write(&state, &text);
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ClipboardHost for ScriptedPage {
    async fn hook_clipboard(
        &self,
        sink: Arc<dyn ClipboardSink>,
        forward: bool,
    ) -> Result<(), ExportError> {
        let mut state = self.lock();
        if state.hook.is_some() {
            return Err(ExportError::SessionActive);
        }
        state.hook = Some((sink, forward));
        state.hooks_installed += 1;
        state.events.push(PageEvent::ClipboardHooked { forward });
        Ok(())
    }

    async fn unhook_clipboard(&self) -> Result<(), ExportError> {
        let mut state = self.lock();
        if state.hook.take().is_some() {
            state.hooks_removed += 1;
            state.events.push(PageEvent::ClipboardUnhooked);
        }
        Ok(())
    }
}
