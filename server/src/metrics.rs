use prometheus::{
    histogram_opts, opts, Histogram, HistogramTimer, IntCounter, IntCounterVec, Registry,
};

use crate::Error;

#[derive(Clone)]
pub struct Metrics {
    pub requests: IntCounterVec,
    pub failures: IntCounterVec,
    pub vmi_list_failures: IntCounter,
    pub enrich_duration: Histogram,
}

impl Default for Metrics {
    fn default() -> Self {
        let requests = IntCounterVec::new(
            opts!("virtlens_http_requests_total", "requests served, by resource"),
            &["resource"],
        )
        .unwrap();
        let failures = IntCounterVec::new(
            opts!(
                "virtlens_http_request_errors_total",
                "failed requests, by resource and error"
            ),
            &["resource", "error"],
        )
        .unwrap();
        let vmi_list_failures = IntCounter::new(
            "virtlens_vmi_list_failures_total",
            "virtual machine instance listings that failed, degrading enrichment",
        )
        .unwrap();
        let enrich_duration = Histogram::with_opts(histogram_opts!(
            "virtlens_enrich_duration_seconds",
            "time spent enriching pod network status annotations",
            vec![0.001, 0.01, 0.1, 1., 10.]
        ))
        .unwrap();

        Metrics {
            requests,
            failures,
            vmi_list_failures,
            enrich_duration,
        }
    }
}

impl Metrics {
    /// Register API metrics to start tracking them.
    pub fn register(self, registry: &Registry) -> Result<Self, prometheus::Error> {
        registry.register(Box::new(self.requests.clone()))?;
        registry.register(Box::new(self.failures.clone()))?;
        registry.register(Box::new(self.vmi_list_failures.clone()))?;
        registry.register(Box::new(self.enrich_duration.clone()))?;
        Ok(self)
    }

    pub fn count_request(&self, resource: &str) {
        self.requests.with_label_values(&[resource]).inc();
    }

    pub fn request_failure(&self, resource: &str, error: &Error) {
        self.failures
            .with_label_values(&[resource, error.metric_label()])
            .inc();
    }

    pub fn measure_enrich(&self) -> HistogramTimer {
        self.enrich_duration.start_timer()
    }
}
