//! Telemetry
//!
//! Observability components for session operations.
//!
//! This module provides:
//!
//! - **Logging**: Structured logging with context, forwarded to `tracing`
//! - **Metrics**: Counters for authorization, exchange, refresh and errors

pub mod logging;
pub mod metrics;

// Logging
pub use logging::{
    create_in_memory_logger, create_tracing_logger, no_op_logger, InMemoryLogger, LogEntry,
    LogLevel, Logger, NoOpLogger, SessionLogContext, TracingLogger,
};

// Metrics
pub use metrics::{
    create_in_memory_metrics, no_op_metrics, InMemoryMetrics, MetricEntry, MetricLabels,
    NoOpMetrics, SessionMetricNames, SessionMetrics,
};
