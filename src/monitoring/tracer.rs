/*!
 * Lifecycle Tracing
 * Structured tracing for virtual machine transitions using the tracing crate
 *
 * Features:
 * - Per-operation trace IDs for correlating start and completion events
 * - JSON-formatted logs when `SIGIL_TRACE_JSON` is set
 * - Session ID carried on every lifecycle span
 * - Slow transitions reported at warn level
 */

use crate::core::limits::ENV_TRACE_JSON;
use std::time::Instant;
use tracing::{debug, span, warn, Level, Span};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Transitions slower than this are reported at warn level
const SLOW_TRANSITION_MS: u128 = 100;

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - SIGIL_TRACE_JSON: Enable JSON output (default: false)
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(ENV_TRACE_JSON)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_names(true)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        debug!(json = use_json, "structured tracing initialized");
    }
}

/// Span covering one lifecycle transition
pub struct LifecycleSpan {
    span: Span,
    start: Instant,
    operation: &'static str,
    trace_id: Uuid,
}

impl LifecycleSpan {
    pub fn new(operation: &'static str, session: Uuid) -> Self {
        let trace_id = Uuid::new_v4();

        let span = span!(
            Level::DEBUG,
            "lifecycle",
            trace_id = %trace_id,
            session = %session,
            operation = operation,
            duration_us = tracing::field::Empty,
            result = tracing::field::Empty,
            error = tracing::field::Empty,
        );

        span.in_scope(|| debug!(operation, "transition started"));

        Self {
            span,
            start: Instant::now(),
            operation,
            trace_id,
        }
    }

    pub fn trace_id(&self) -> Uuid {
        self.trace_id
    }

    pub fn record_result(&self, success: bool) {
        self.span.record("result", if success { "success" } else { "error" });
    }

    pub fn record_error(&self, error: &str) {
        self.span.record("error", error);
        self.span.record("result", "error");
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for LifecycleSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        self.span.record("duration_us", duration.as_micros() as u64);
        let _entered = self.span.enter();

        if duration.as_millis() > SLOW_TRANSITION_MS {
            warn!(
                trace_id = %self.trace_id,
                operation = self.operation,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow lifecycle transition"
            );
        } else {
            debug!(
                trace_id = %self.trace_id,
                operation = self.operation,
                duration_us = duration.as_micros() as u64,
                "transition completed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_test_tracing() {
        let _ = tracing_subscriber::registry()
            .with(EnvFilter::new("debug"))
            .with(tracing_subscriber::fmt::layer().compact().with_test_writer())
            .try_init();
    }

    #[test]
    fn test_lifecycle_span() {
        init_test_tracing();

        let session = Uuid::new_v4();
        let span = LifecycleSpan::new("initialize", session);
        assert_ne!(span.trace_id(), session);
        span.record_result(true);
    }

    #[test]
    fn test_init_tracing_twice() {
        init_tracing();
        init_tracing();
    }
}
