//! Capability providers for the host chat UI.
//!
//! The engine never touches the page directly. It drives these traits, which a
//! platform adapter implements: [`browser::BrowserPage`] talks to a live tab
//! through the extension bridge, [`scripted::ScriptedPage`] is an in-memory
//! page for deterministic runs.

use crate::ExportError;
use std::fmt;
use std::sync::Arc;

pub mod browser;
pub mod scripted;

/// Opaque reference to an element owned by the host page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(u64);

impl ElementHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Enumerates the human-role messages and the conversation title
#[async_trait::async_trait]
pub trait MessageSource: Send + Sync {
    /// Human message elements in document order
    async fn human_messages(&self) -> Result<Vec<ElementHandle>, ExportError>;

    /// Raw title text, `None` when the title element is absent
    async fn conversation_title(&self) -> Result<Option<String>, ExportError>;
}

/// Hover and edit-mode side channel used to read human message text
#[async_trait::async_trait]
pub trait EditSurface: Send + Sync {
    async fn pointer_enter(&self, message: &ElementHandle) -> Result<(), ExportError>;

    async fn pointer_leave(&self, message: &ElementHandle) -> Result<(), ExportError>;

    /// Edit affordance inside the message's enclosing turn group, if rendered
    async fn edit_control(
        &self,
        message: &ElementHandle,
    ) -> Result<Option<ElementHandle>, ExportError>;

    async fn begin_edit(&self, control: &ElementHandle) -> Result<(), ExportError>;

    /// Current content of the editable surface, verbatim
    async fn editable_text(&self) -> Result<Option<String>, ExportError>;

    /// Leave edit mode without saving
    async fn cancel_edit(&self) -> Result<(), ExportError>;
}

/// Per-response copy actions
#[async_trait::async_trait]
pub trait CopyTarget: Send + Sync {
    async fn copy_controls(&self) -> Result<Vec<ElementHandle>, ExportError>;

    /// Whether the control takes part in layout (not hidden or detached)
    async fn is_rendered(&self, control: &ElementHandle) -> Result<bool, ExportError>;

    async fn scroll_into_view(&self, control: &ElementHandle) -> Result<(), ExportError>;

    async fn activate_copy(&self, control: &ElementHandle) -> Result<(), ExportError>;
}

/// Receives every text write the host makes while the hook is installed
pub trait ClipboardSink: Send + Sync {
    fn write_text(&self, text: &str);
}

/// The shared clipboard write capability
#[async_trait::async_trait]
pub trait ClipboardHost: Send + Sync {
    /// Substitute the host's write capability with one that reports to `sink`.
    /// With `forward` set the original capability still receives the text.
    async fn hook_clipboard(
        &self,
        sink: Arc<dyn ClipboardSink>,
        forward: bool,
    ) -> Result<(), ExportError>;

    /// Reinstate the original write capability
    async fn unhook_clipboard(&self) -> Result<(), ExportError>;
}

/// Everything the export engine needs from a page
pub trait ChatPage: MessageSource + EditSurface + CopyTarget + ClipboardHost {}

impl<T> ChatPage for T where T: MessageSource + EditSurface + CopyTarget + ClipboardHost {}
