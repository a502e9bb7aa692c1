use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};
use serde_json::Value;

use crate::api::error::ApiError;
use crate::api::pipeline::{ApiRequest, Middleware, Next};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Item actions share a one-request-per-100ms budget.
pub const ITEM_ACTIONS_PATH: &str = "/Platform/Destiny2/Actions/Items/";
pub const ITEM_ACTIONS_PERIOD: Duration = Duration::from_millis(100);

struct Rule {
    fragment: String,
    limiter: Arc<DirectRateLimiter>,
}

/// Spaces out calls whose URL contains a configured fragment.
///
/// The first matching rule wins; unmatched requests pass straight through.
#[derive(Default)]
pub struct RateLimitStage {
    rules: Vec<Rule>,
}

impl RateLimitStage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits the platform applies per application.
    pub fn platform_defaults() -> Self {
        Self::new().rule(ITEM_ACTIONS_PATH, ITEM_ACTIONS_PERIOD)
    }

    /// Allow one request per `period` for URLs containing `fragment`.
    /// A zero period means no limit.
    pub fn rule(mut self, fragment: &str, period: Duration) -> Self {
        match Quota::with_period(period) {
            Some(quota) => self.rules.push(Rule {
                fragment: fragment.to_string(),
                limiter: Arc::new(RateLimiter::direct(quota)),
            }),
            None => tracing::debug!(fragment, "Ignoring rate limit with zero period"),
        }
        self
    }

    fn limiter_for(&self, url: &str) -> Option<&DirectRateLimiter> {
        self.rules
            .iter()
            .find(|rule| url.contains(&rule.fragment))
            .map(|rule| rule.limiter.as_ref())
    }
}

#[async_trait]
impl Middleware for RateLimitStage {
    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<Value, ApiError> {
        if let Some(limiter) = self.limiter_for(&request.url) {
            if limiter.check().is_err() {
                tracing::debug!(url = %request.url, "Rate limited, waiting for budget");
                limiter.until_ready().await;
            }
        }
        next.run(request).await
    }
}
