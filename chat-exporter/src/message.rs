use serde::{Deserialize, Serialize};
use std::fmt;

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Human => write!(f, "human"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One recovered turn.
///
/// `index` is the position within its own role's recovery order. It is not a
/// pairing key across roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub index: usize,
    /// Milliseconds since the interceptor was installed, for captured writes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_at_ms: Option<u64>,
}

impl Message {
    pub fn human(content: impl Into<String>, index: usize) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
            index,
            captured_at_ms: None,
        }
    }

    pub fn assistant(content: impl Into<String>, index: usize) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            index,
            captured_at_ms: None,
        }
    }

    pub fn with_capture_time(mut self, ms: u64) -> Self {
        self.captured_at_ms = Some(ms);
        self
    }
}
