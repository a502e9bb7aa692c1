use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;

use crate::api::classify::{Connectivity, NetworkStatus};
use crate::api::error::ApiError;
use crate::api::pipeline::{ApiRequest, Middleware, Next};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// At most one slow-response notice per window.
const NOTIFY_WINDOW: Duration = Duration::from_secs(5 * 60);
/// A timer that fired this far off schedule means the machine was asleep.
const MAX_DRIFT: Duration = Duration::from_secs(1);

type Callback = Box<dyn Fn() + Send + Sync>;

/// Tells the user when Bungie.net is responding slowly.
pub struct SlowResponseNotifier {
    last_fired: Mutex<Option<Instant>>,
    network: NetworkStatus,
    callback: Callback,
}

impl SlowResponseNotifier {
    pub fn new(network: NetworkStatus) -> Self {
        Self::with_callback(
            network,
            Box::new(|| {
                tracing::warn!("Bungie.net is responding slowly; requests are timing out")
            }),
        )
    }

    pub fn with_callback(network: NetworkStatus, callback: Callback) -> Self {
        Self {
            last_fired: Mutex::new(None),
            network,
            callback,
        }
    }

    /// Called when a request started at `started` hit its `timeout`.
    /// Returns whether the notice was shown.
    pub fn notify(&self, started: Instant, timeout: Duration) -> bool {
        if self.network.connectivity() == Connectivity::Offline {
            return false;
        }

        let now = Instant::now();
        let expected = started + timeout;
        let drift = if now > expected {
            now - expected
        } else {
            expected - now
        };
        if drift > MAX_DRIFT {
            tracing::debug!(drift_ms = drift.as_millis() as u64, "Timeout fired off schedule, not notifying");
            return false;
        }

        {
            let mut last = match self.last_fired.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(prev) = *last {
                if now.duration_since(prev) < NOTIFY_WINDOW {
                    return false;
                }
            }
            *last = Some(now);
        }

        (self.callback)();
        true
    }
}

/// Abandons requests that take longer than the configured timeout.
pub struct TimeoutStage {
    timeout: Duration,
    notifier: Arc<SlowResponseNotifier>,
}

impl TimeoutStage {
    pub fn new(timeout: Duration, notifier: Arc<SlowResponseNotifier>) -> Self {
        Self { timeout, notifier }
    }
}

#[async_trait]
impl Middleware for TimeoutStage {
    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<Value, ApiError> {
        let url = request.url.clone();
        let started = Instant::now();
        match tokio::time::timeout(self.timeout, next.run(request)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(url = %url, timeout_ms = self.timeout.as_millis() as u64, "Request timed out");
                self.notifier.notify(started, self.timeout);
                Err(ApiError::Timeout {
                    url,
                    timeout: self.timeout,
                })
            }
        }
    }
}
