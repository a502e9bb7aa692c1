//! Pipeline stages wrapped around the platform transport
//!
//! Standard order, outermost first: trace, adaptive throttle, timeout,
//! per-endpoint rate limit. None of them alter a result; they only add
//! delay or telemetry.

mod rate_limit;
mod throttle;
mod timeout;
mod trace;

pub use rate_limit::RateLimitStage;
pub use throttle::ThrottleStage;
pub use timeout::{SlowResponseNotifier, TimeoutStage, DEFAULT_TIMEOUT};
pub use trace::TraceStage;
