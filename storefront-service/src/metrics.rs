use anyhow::Result;
use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct StorefrontMetrics {
    registry: Registry,
    login_attempts: IntCounterVec,
    registrations: IntCounter,
    catalog_changes: IntCounterVec,
}

impl StorefrontMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let login_attempts = IntCounterVec::new(
            Opts::new(
                "storefront_login_attempts_total",
                "Count of login attempts grouped by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(login_attempts.clone()))?;

        let registrations = IntCounter::new(
            "storefront_registrations_total",
            "Count of accounts created",
        )?;
        registry.register(Box::new(registrations.clone()))?;

        let catalog_changes = IntCounterVec::new(
            Opts::new(
                "storefront_catalog_changes_total",
                "Catalog writes grouped by action",
            ),
            &["action"],
        )?;
        registry.register(Box::new(catalog_changes.clone()))?;

        Ok(Self {
            registry,
            login_attempts,
            registrations,
            catalog_changes,
        })
    }

    pub fn login_attempt(&self, outcome: &str) {
        self.login_attempts.with_label_values(&[outcome]).inc();
    }

    pub fn registration(&self) {
        self.registrations.inc();
    }

    pub fn catalog_change(&self, action: &str) {
        self.catalog_changes.with_label_values(&[action]).inc();
    }

    /// Service metrics followed by the shared HTTP error counters.
    pub fn render(&self) -> Result<Response> {
        let encoder = TextEncoder::new();
        let mut metric_families = self.registry.gather();
        metric_families.extend(common_http_errors::registry().gather());
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        let response = Response::builder()
            .status(StatusCode::OK)
            .header(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            )
            .body(Body::from(buffer))?;
        Ok(response)
    }
}
