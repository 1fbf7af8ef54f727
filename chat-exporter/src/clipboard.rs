//! Clipboard interception for assistant responses.
//!
//! Assistant text is only reachable through the host's own copy action, which
//! writes into the shared clipboard capability. For the lifetime of a session
//! that capability is swapped for a hook reporting into a [`CaptureLog`].
//! [`InterceptGuard`] owns the swap and puts the original back exactly once.

use crate::platforms::{ClipboardHost, ClipboardSink};
use crate::{ExportError, Message};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Ordered record of qualifying clipboard writes
pub struct CaptureLog {
    captures: Mutex<Vec<Message>>,
    active: AtomicBool,
    min_length: usize,
    started: Instant,
    count_tx: watch::Sender<usize>,
}

impl CaptureLog {
    pub fn new(min_length: usize) -> Self {
        let (count_tx, _) = watch::channel(0);
        Self {
            captures: Mutex::new(Vec::new()),
            active: AtomicBool::new(true),
            min_length,
            started: Instant::now(),
            count_tx,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Stop accepting writes. Nothing is appended afterwards.
    pub fn deactivate(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            debug!(captured = self.len(), "Capture log deactivated");
        }
    }

    /// Copy of everything captured so far, in call order
    pub fn snapshot(&self) -> Vec<Message> {
        self.lock().clone()
    }

    /// Watch the number of captures as it grows
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.count_tx.subscribe()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Message>> {
        // A panic while holding the lock leaves a valid Vec behind
        self.captures.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ClipboardSink for CaptureLog {
    fn write_text(&self, text: &str) {
        if !self.is_active() {
            debug!("Ignoring clipboard write after capture ended");
            return;
        }

        let units = text.encode_utf16().count();
        if units <= self.min_length {
            debug!(units, "Ignoring short clipboard write");
            return;
        }

        let mut captures = self.lock();
        // Re-check under the lock so a concurrent deactivate wins
        if !self.is_active() {
            return;
        }
        let elapsed = self.started.elapsed().as_millis() as u64;
        let message = Message::assistant(text, captures.len()).with_capture_time(elapsed);
        captures.push(message);
        let count = captures.len();
        drop(captures);

        info!("📋 Captured assistant response {}", count);
        self.count_tx.send_replace(count);
    }
}

pub struct ClipboardInterceptor;

impl ClipboardInterceptor {
    /// Hook the host's clipboard so qualifying writes land in `log`.
    pub async fn install<H>(
        host: Arc<H>,
        log: Arc<CaptureLog>,
        forward: bool,
    ) -> Result<InterceptGuard<H>, ExportError>
    where
        H: ClipboardHost + ?Sized + 'static,
    {
        let sink: Arc<dyn ClipboardSink> = log.clone();
        host.hook_clipboard(sink, forward).await?;
        debug!(forward, "Clipboard interceptor installed");
        Ok(InterceptGuard {
            host,
            log,
            released: AtomicBool::new(false),
        })
    }
}

/// Scoped ownership of the clipboard hook.
///
/// Call [`InterceptGuard::release`] on every exit path. A guard dropped
/// without release schedules the restore on the current runtime.
pub struct InterceptGuard<H: ClipboardHost + ?Sized + 'static> {
    host: Arc<H>,
    log: Arc<CaptureLog>,
    released: AtomicBool,
}

impl<H: ClipboardHost + ?Sized + 'static> InterceptGuard<H> {
    pub fn log(&self) -> &Arc<CaptureLog> {
        &self.log
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Stop capturing and reinstate the original capability.
    pub async fn release(self) -> Result<(), ExportError> {
        self.restore().await
    }

    async fn restore(&self) -> Result<(), ExportError> {
        if self.released.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.log.deactivate();
        self.host.unhook_clipboard().await?;
        debug!("Clipboard capability restored");
        Ok(())
    }
}

impl<H: ClipboardHost + ?Sized + 'static> Drop for InterceptGuard<H> {
    fn drop(&mut self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        self.log.deactivate();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let host = self.host.clone();
                handle.spawn(async move {
                    if let Err(e) = host.unhook_clipboard().await {
                        warn!("Failed to restore clipboard after drop: {}", e);
                    }
                });
            }
            Err(_) => warn!("Clipboard guard dropped outside a runtime; hook left installed"),
        }
    }
}
