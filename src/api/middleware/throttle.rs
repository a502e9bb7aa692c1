use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::api::error::ApiError;
use crate::api::pipeline::{ApiRequest, Middleware, Next};

const BASE_WAIT: Duration = Duration::from_millis(500);
const MAX_WAIT: Duration = Duration::from_secs(5 * 60);

/// Backs off after the platform reports throttling.
///
/// Every throttle error bumps a counter; while it is non-zero each request
/// first waits `500ms * 2^count` (capped at five minutes). A success halves
/// the counter.
#[derive(Debug, Default)]
pub struct ThrottleStage {
    times_throttled: AtomicU32,
}

impl ThrottleStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn times_throttled(&self) -> u32 {
        self.times_throttled.load(Ordering::SeqCst)
    }

    pub fn wait_time(times_throttled: u32) -> Duration {
        let factor = 1u32.checked_shl(times_throttled).unwrap_or(u32::MAX);
        BASE_WAIT.saturating_mul(factor).min(MAX_WAIT)
    }
}

#[async_trait]
impl Middleware for ThrottleStage {
    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<Value, ApiError> {
        let times = self.times_throttled();
        if times > 0 {
            let wait = Self::wait_time(times);
            tracing::info!(
                times_throttled = times,
                wait_ms = wait.as_millis() as u64,
                url = %request.url,
                "Throttled, waiting before calling"
            );
            tokio::time::sleep(wait).await;
        }

        let result = next.run(request).await;
        match &result {
            Ok(_) => {
                if times > 0 {
                    let _ = self.times_throttled.fetch_update(
                        Ordering::SeqCst,
                        Ordering::SeqCst,
                        |n| Some(n / 2),
                    );
                }
            }
            Err(e) => {
                if e.platform_code().map_or(false, |code| code.is_throttle()) {
                    self.times_throttled.fetch_add(1, Ordering::SeqCst);
                }
            }
        }
        result
    }
}
