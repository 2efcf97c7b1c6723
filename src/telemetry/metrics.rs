//! Metrics
//!
//! Session lifecycle metrics collection interfaces and implementations.

use std::collections::HashMap;
use std::sync::Mutex;

/// Metric labels.
pub type MetricLabels = HashMap<String, String>;

/// Metric names.
pub struct SessionMetricNames;

impl SessionMetricNames {
    pub const AUTHORIZATION_REQUESTS: &'static str = "session_authorization_requests_total";
    pub const TOKEN_REQUESTS: &'static str = "session_token_requests_total";
    pub const TOKEN_REFRESHES: &'static str = "session_token_refreshes_total";
    pub const ERRORS: &'static str = "session_errors_total";
}

/// Session metrics interface.
pub trait SessionMetrics: Send + Sync {
    /// Record authorization request.
    fn record_authorization_request(&self, session: &str);

    /// Record token request.
    fn record_token_request(&self, session: &str, grant_type: &str);

    /// Record token refresh outcome.
    fn record_token_refresh(&self, session: &str, success: bool);

    /// Record error.
    fn record_error(&self, session: &str, error_code: &str);
}

/// No-op metrics implementation.
pub struct NoOpMetrics;

impl SessionMetrics for NoOpMetrics {
    fn record_authorization_request(&self, _session: &str) {}
    fn record_token_request(&self, _session: &str, _grant_type: &str) {}
    fn record_token_refresh(&self, _session: &str, _success: bool) {}
    fn record_error(&self, _session: &str, _error_code: &str) {}
}

/// No-op metrics singleton.
pub fn no_op_metrics() -> NoOpMetrics {
    NoOpMetrics
}

/// Metric entry for in-memory storage.
#[derive(Debug, Clone)]
pub struct MetricEntry {
    pub name: String,
    pub value: f64,
    pub labels: MetricLabels,
    pub timestamp: u64,
}

/// In-memory metrics for testing.
#[derive(Default)]
pub struct InMemoryMetrics {
    entries: Mutex<Vec<MetricEntry>>,
}

impl InMemoryMetrics {
    /// Create new in-memory metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded entries.
    pub fn get_entries(&self) -> Vec<MetricEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Get entries by name.
    pub fn get_entries_by_name(&self, name: &str) -> Vec<MetricEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.name == name)
            .cloned()
            .collect()
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    fn record(&self, name: &str, labels: &[(&str, &str)]) {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        let labels = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        self.entries.lock().unwrap().push(MetricEntry {
            name: name.to_string(),
            value: 1.0,
            labels,
            timestamp: now,
        });
    }
}

impl SessionMetrics for InMemoryMetrics {
    fn record_authorization_request(&self, session: &str) {
        self.record(
            SessionMetricNames::AUTHORIZATION_REQUESTS,
            &[("session", session)],
        );
    }

    fn record_token_request(&self, session: &str, grant_type: &str) {
        self.record(
            SessionMetricNames::TOKEN_REQUESTS,
            &[("session", session), ("grant_type", grant_type)],
        );
    }

    fn record_token_refresh(&self, session: &str, success: bool) {
        let success = success.to_string();
        self.record(
            SessionMetricNames::TOKEN_REFRESHES,
            &[("session", session), ("success", &success)],
        );
    }

    fn record_error(&self, session: &str, error_code: &str) {
        self.record(
            SessionMetricNames::ERRORS,
            &[("session", session), ("error_code", error_code)],
        );
    }
}

/// Create in-memory metrics for testing.
pub fn create_in_memory_metrics() -> InMemoryMetrics {
    InMemoryMetrics::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_op_metrics() {
        let metrics = no_op_metrics();
        metrics.record_authorization_request("github");
        metrics.record_token_request("github", "authorization_code");
        metrics.record_error("github", "SESSION_EXPIRED");
    }

    #[test]
    fn test_in_memory_metrics() {
        let metrics = InMemoryMetrics::new();

        metrics.record_authorization_request("github");
        metrics.record_token_request("github", "refresh_token");
        metrics.record_token_refresh("github", false);

        assert_eq!(metrics.get_entries().len(), 3);

        let refreshes = metrics.get_entries_by_name(SessionMetricNames::TOKEN_REFRESHES);
        assert_eq!(refreshes.len(), 1);
        assert_eq!(refreshes[0].labels.get("success"), Some(&"false".to_string()));

        let requests = metrics.get_entries_by_name(SessionMetricNames::TOKEN_REQUESTS);
        assert_eq!(
            requests[0].labels.get("grant_type"),
            Some(&"refresh_token".to_string())
        );
    }

    #[test]
    fn test_clear_entries() {
        let metrics = create_in_memory_metrics();
        metrics.record_error("github", "SESSION_NETWORK");

        assert!(!metrics.get_entries().is_empty());
        metrics.clear();
        assert!(metrics.get_entries().is_empty());
    }
}
