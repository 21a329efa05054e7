// Private module declaration
mod server;

use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
};

// Re-export for public API
pub use server::configure;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - HTTP traffic (requests by method/status, latency)
// - Order flow (placements, status transitions, order value)
// - Discounts applied by scope
// - Authentication outcomes
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Central metrics registry for the entire application
pub struct Metrics {
    registry: Registry,

    // HTTP Metrics
    pub http_requests_total: IntCounterVec,
    pub http_request_duration: HistogramVec,

    // Order Metrics
    pub orders_placed_total: IntCounter,
    pub order_transitions_total: IntCounterVec,
    pub order_value_cents: Histogram,

    // Pricing Metrics
    pub discounts_applied_total: IntCounterVec,

    // Auth Metrics
    pub auth_attempts_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        // HTTP Metrics
        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests handled"),
            &["method", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration = HistogramVec::new(
            HistogramOpts::new("http_request_duration_seconds", "HTTP request latency")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["method"],
        )?;
        registry.register(Box::new(http_request_duration.clone()))?;

        // Order Metrics
        let orders_placed_total = IntCounter::new("orders_placed_total", "Total orders placed")?;
        registry.register(Box::new(orders_placed_total.clone()))?;

        let order_transitions_total = IntCounterVec::new(
            Opts::new("order_transitions_total", "Order status transitions"),
            &["from", "to"],
        )?;
        registry.register(Box::new(order_transitions_total.clone()))?;

        let order_value_cents = Histogram::with_opts(
            HistogramOpts::new("order_value_cents", "Order total in cents, delivery fee included")
                .buckets(vec![500.0, 1000.0, 2000.0, 3500.0, 5000.0, 7500.0, 10000.0, 20000.0]),
        )?;
        registry.register(Box::new(order_value_cents.clone()))?;

        // Pricing Metrics
        let discounts_applied_total = IntCounterVec::new(
            Opts::new("discounts_applied_total", "Discounted order lines by discount scope"),
            &["scope"],
        )?;
        registry.register(Box::new(discounts_applied_total.clone()))?;

        // Auth Metrics
        let auth_attempts_total = IntCounterVec::new(
            Opts::new("auth_attempts_total", "Login attempts by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(auth_attempts_total.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration,
            orders_placed_total,
            order_transitions_total,
            order_value_cents,
            discounts_applied_total,
            auth_attempts_total,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Helper to record a finished HTTP request
    pub fn record_http_request(&self, method: &str, status: u16, duration_secs: f64) {
        self.http_requests_total
            .with_label_values(&[method, &status.to_string()])
            .inc();
        self.http_request_duration.with_label_values(&[method]).observe(duration_secs);
    }

    /// Helper to record a placed order and the discount scopes on its lines
    pub fn record_order_placed<'a>(&self, total_cents: i64, discount_scopes: impl IntoIterator<Item = &'a str>) {
        self.orders_placed_total.inc();
        self.order_value_cents.observe(total_cents as f64);
        for scope in discount_scopes {
            self.discounts_applied_total.with_label_values(&[scope]).inc();
        }
    }

    /// Helper to record an order status transition
    pub fn record_order_transition(&self, from: &str, to: &str) {
        self.order_transitions_total.with_label_values(&[from, to]).inc();
    }

    /// Helper to record a login attempt
    pub fn record_auth_attempt(&self, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.auth_attempts_total.with_label_values(&[outcome]).inc();
    }
}
