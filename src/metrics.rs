use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing::{info, warn};

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder once. Later calls are no-ops.
pub fn init_metrics() {
    if HANDLE.get().is_some() {
        return;
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if HANDLE.set(handle).is_ok() {
                info!("Prometheus recorder installed");
            }
        }
        Err(e) => warn!("Prometheus recorder install failed (possibly already installed): {}", e),
    }
}

/// Current metrics in Prometheus text format, if a recorder is installed.
pub fn render() -> Option<String> {
    HANDLE.get().map(|h| h.render())
}

pub mod scrape {
    /// Known triggers keep their own series; anything else shares `other`.
    pub fn trigger_label(triggered_by: &str) -> &'static str {
        match triggered_by {
            "cli" => "cli",
            "dashboard" => "dashboard",
            "scheduler" => "scheduler",
            _ => "other",
        }
    }

    pub fn run_started(triggered_by: &str) {
        ::metrics::counter!("afriscan_runs_total", "triggered_by" => trigger_label(triggered_by))
            .increment(1);
    }

    pub fn listing_normalized(source_id: &str) {
        ::metrics::counter!("afriscan_listings_normalized_total", "source" => source_id.to_string())
            .increment(1);
    }

    pub fn flag_recorded(flag: &str) {
        ::metrics::counter!("afriscan_listing_flags_total", "flag" => flag.to_string()).increment(1);
    }

    pub fn source_failed(source_id: &str) {
        ::metrics::counter!("afriscan_source_errors_total", "source" => source_id.to_string())
            .increment(1);
    }

    pub fn run_duration(secs: f64) {
        ::metrics::histogram!("afriscan_run_duration_seconds").record(secs);
    }
}

#[cfg(test)]
mod tests {
    use super::scrape::trigger_label;

    #[test]
    fn test_trigger_label_is_bounded() {
        assert_eq!(trigger_label("cli"), "cli");
        assert_eq!(trigger_label("dashboard"), "dashboard");
        assert_eq!(trigger_label("scheduler"), "scheduler");
        assert_eq!(trigger_label("run-8f3a2c"), "other");
        assert_eq!(trigger_label(""), "other");
        assert_eq!(trigger_label("CLI"), "other");
    }
}
