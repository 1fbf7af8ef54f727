//! Status reporting to whoever is watching a session.

use crate::session::SessionState;
use std::sync::Arc;
use tracing::{error, info};

/// Color cue of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Progress,
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub state: SessionState,
    pub tone: StatusTone,
    pub message: String,
}

impl StatusUpdate {
    pub fn progress(state: SessionState, message: impl Into<String>) -> Self {
        Self {
            state,
            tone: StatusTone::Progress,
            message: message.into(),
        }
    }

    pub fn success(state: SessionState, message: impl Into<String>) -> Self {
        Self {
            state,
            tone: StatusTone::Success,
            message: message.into(),
        }
    }

    pub fn failure(state: SessionState, message: impl Into<String>) -> Self {
        Self {
            state,
            tone: StatusTone::Failure,
            message: message.into(),
        }
    }
}

/// External observer of session progress
#[async_trait::async_trait]
pub trait StatusObserver: Send + Sync {
    async fn on_status(&self, update: StatusUpdate);

    /// Remove any transient UI the observer created
    async fn on_teardown(&self) {}
}

/// Logs every update through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

#[async_trait::async_trait]
impl StatusObserver for TracingObserver {
    async fn on_status(&self, update: StatusUpdate) {
        match update.tone {
            StatusTone::Failure => error!(state = %update.state, "{}", update.message),
            _ => info!(state = %update.state, "{}", update.message),
        }
    }
}

/// Fans updates out to several observers in order
#[derive(Default, Clone)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn StatusObserver>>,
}

impl CompositeObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn StatusObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}

#[async_trait::async_trait]
impl StatusObserver for CompositeObserver {
    async fn on_status(&self, update: StatusUpdate) {
        for observer in &self.observers {
            observer.on_status(update.clone()).await;
        }
    }

    async fn on_teardown(&self) {
        for observer in &self.observers {
            observer.on_teardown().await;
        }
    }
}
