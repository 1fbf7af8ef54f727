use crate::clipboard::CaptureLog;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// How a synchronization window ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    pub expected: usize,
    pub captured: usize,
    /// Accumulated poll time when the wait returned
    pub elapsed: Duration,
}

impl SyncOutcome {
    pub fn is_complete(&self) -> bool {
        self.captured >= self.expected
    }
}

/// Bounded polling wait on the number of captured responses.
///
/// Checks the log, then sleeps one `poll_interval`, until the count reaches
/// `expected` or the accumulated sleep reaches `max_wait`. Never fails; the
/// caller reads the outcome to tell a complete window from a partial one.
pub async fn wait_until(
    log: &CaptureLog,
    expected: usize,
    max_wait: Duration,
    poll_interval: Duration,
) -> SyncOutcome {
    let step = poll_interval.max(Duration::from_millis(1));
    let mut elapsed = Duration::ZERO;

    while elapsed < max_wait {
        let captured = log.len();
        if captured >= expected {
            info!(
                "✅ All {} responses captured in {}ms",
                expected,
                elapsed.as_millis()
            );
            return SyncOutcome {
                expected,
                captured,
                elapsed,
            };
        }
        // The last nap is cut short so the window closes exactly at max_wait
        let nap = step.min(max_wait - elapsed);
        sleep(nap).await;
        elapsed += nap;
    }

    let captured = log.len();
    if captured < expected {
        warn!(
            "⚠️ Timeout: only captured {}/{} responses",
            captured, expected
        );
    }
    SyncOutcome {
        expected,
        captured,
        elapsed,
    }
}
