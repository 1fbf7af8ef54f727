//! Selector, timing and output configuration for an export session.
//!
//! Everything here is plain data. The host UI owns the structure these
//! selectors point at, so they are kept in one place and can be swapped
//! from a JSON file when the host changes.

use crate::ExportError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// CSS selectors for the host elements the engine depends on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    /// One element per human-authored message
    pub user_message: String,
    /// Enclosing turn group, searched for the edit affordance
    pub message_group: String,
    /// Per-response copy action
    pub copy_button: String,
    /// Edit affordance revealed on hover
    pub edit_button: String,
    /// Editable surface populated after entering edit mode
    pub edit_textarea: String,
    pub conversation_title: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            user_message: r#"[data-testid="user-message"]"#.to_string(),
            message_group: ".group".to_string(),
            copy_button: r#"button[data-testid="action-bar-copy"]"#.to_string(),
            edit_button: r#"button[aria-label="Edit"]"#.to_string(),
            edit_textarea: "textarea".to_string(),
            conversation_title: r#"[data-testid="chat-title-button"] .truncate, button[data-testid="chat-title-button"] div.truncate"#.to_string(),
        }
    }
}

/// Fixed waits, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Delays {
    /// Time for hover-revealed UI to render, also used after cancelling an edit
    pub hover_ms: u64,
    /// Time for the edit surface to populate
    pub edit_ms: u64,
    /// Gap between consecutive copy activations
    pub copy_ms: u64,
    /// Pause between the start trigger and the first extraction step
    pub start_ms: u64,
    /// Time a finished session stays up before teardown
    pub teardown_ms: u64,
}

impl Default for Delays {
    fn default() -> Self {
        Self {
            hover_ms: 50,
            edit_ms: 150,
            copy_ms: 100,
            start_ms: 1000,
            teardown_ms: 3000,
        }
    }
}

impl Delays {
    pub fn hover(&self) -> Duration {
        Duration::from_millis(self.hover_ms)
    }

    pub fn edit(&self) -> Duration {
        Duration::from_millis(self.edit_ms)
    }

    pub fn copy(&self) -> Duration {
        Duration::from_millis(self.copy_ms)
    }

    pub fn start(&self) -> Duration {
        Duration::from_millis(self.start_ms)
    }

    pub fn teardown(&self) -> Duration {
        Duration::from_millis(self.teardown_ms)
    }

    /// All waits set to zero, handy when driving an in-memory page.
    pub fn none() -> Self {
        Self {
            hover_ms: 0,
            edit_ms: 0,
            copy_ms: 0,
            start_ms: 0,
            teardown_ms: 0,
        }
    }
}

/// Bounds of the synchronization window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub max_wait_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_wait_ms: 2000,
            poll_interval_ms: 100,
        }
    }
}

impl SyncSettings {
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Writes must be strictly longer than this (UTF-16 units) to be captured
    pub min_length: usize,
    /// Also pass intercepted writes through to the real clipboard
    pub forward_to_clipboard: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            min_length: 20,
            forward_to_clipboard: false,
        }
    }
}

/// Headings and file naming of the produced document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptStyle {
    pub title: String,
    pub human_label: String,
    pub assistant_label: String,
    pub fallback_file_stem: String,
    /// Titles that carry no information about the conversation
    pub placeholder_titles: Vec<String>,
    /// Substring marking an untitled conversation
    pub untitled_marker: String,
}

impl Default for TranscriptStyle {
    fn default() -> Self {
        Self {
            title: "Conversation with Claude".to_string(),
            human_label: "Human".to_string(),
            assistant_label: "Claude".to_string(),
            fallback_file_stem: "claude_conversation".to_string(),
            placeholder_titles: vec!["Claude".to_string()],
            untitled_marker: "New conversation".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    pub selectors: Selectors,
    pub delays: Delays,
    pub sync: SyncSettings,
    pub capture: CaptureSettings,
    pub style: TranscriptStyle,
}

impl ExporterConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ExportError> {
        let config: ExporterConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    pub fn to_json_pretty(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ExportError> {
        if self.sync.poll_interval_ms == 0 {
            return Err(ExportError::InvalidConfig(
                "sync.poll_interval_ms must be greater than zero".into(),
            ));
        }
        if self.sync.poll_interval_ms > self.sync.max_wait_ms {
            return Err(ExportError::InvalidConfig(format!(
                "sync.poll_interval_ms ({}) exceeds sync.max_wait_ms ({})",
                self.sync.poll_interval_ms, self.sync.max_wait_ms
            )));
        }

        let s = &self.selectors;
        let named = [
            ("user_message", &s.user_message),
            ("message_group", &s.message_group),
            ("copy_button", &s.copy_button),
            ("edit_button", &s.edit_button),
            ("edit_textarea", &s.edit_textarea),
            ("conversation_title", &s.conversation_title),
        ];
        if let Some((name, _)) = named.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ExportError::InvalidConfig(format!(
                "selectors.{name} must not be empty"
            )));
        }
        Ok(())
    }
}
