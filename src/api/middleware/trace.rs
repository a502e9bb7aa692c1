use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::pipeline::{ApiRequest, Middleware, Next};

/// Opens a span per request and records how it went.
pub struct TraceStage;

#[async_trait]
impl Middleware for TraceStage {
    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<Value, ApiError> {
        let request_id = Uuid::new_v4();
        let span = tracing::debug_span!(
            "platform_request",
            %request_id,
            method = %request.method,
            url = %request.url,
        );

        async move {
            let started = Instant::now();
            let result = next.run(request).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &result {
                Ok(_) => tracing::debug!(elapsed_ms, "platform request succeeded"),
                Err(e) => tracing::debug!(elapsed_ms, error = %e, "platform request failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}
