use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("No copy controls found on the page")]
    NoCopyControls,

    #[error("No messages captured")]
    EmptyResult,

    #[error("An export session is already active")]
    SessionActive,

    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Platform-specific error: {0}")]
    PlatformError(String),

    #[error("Extension bridge unavailable: {0}")]
    BridgeUnavailable(String),

    #[error("Page script failed: {0}")]
    ScriptError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ExportError {
    /// Structural failures abort the session; everything else is absorbed
    /// per item by the component that hit it.
    pub fn is_structural(&self) -> bool {
        matches!(self, ExportError::NoCopyControls | ExportError::EmptyResult)
    }
}
