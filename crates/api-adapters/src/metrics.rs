//! Prometheus metrics served at `GET /metrics`.

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct HttpLabels {
    pub method: String,
    pub status: String,
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum BookingOutcome {
    Created,
    Conflict,
    Cancelled,
    Completed,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct BookingLabels {
    pub outcome: BookingOutcome,
}

pub struct Metrics {
    registry: Registry,
    http_requests: Family<HttpLabels, Counter>,
    bookings: Family<BookingLabels, Counter>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("courtside");
        let http_requests = Family::<HttpLabels, Counter>::default();
        let bookings = Family::<BookingLabels, Counter>::default();
        registry.register("http_requests", "HTTP requests served, by method and status", http_requests.clone());
        registry.register("bookings", "Booking transitions, by outcome", bookings.clone());
        Self { registry, http_requests, bookings }
    }

    pub fn record_http(&self, method: &str, status: u16) {
        self.http_requests
            .get_or_create(&HttpLabels { method: method.to_string(), status: status.to_string() })
            .inc();
    }

    pub fn record_booking(&self, outcome: BookingOutcome, n: u64) {
        if n > 0 {
            self.bookings.get_or_create(&BookingLabels { outcome }).inc_by(n);
        }
    }

    /// OpenMetrics text exposition of every registered metric.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Err(e) = encode(&mut out, &self.registry) {
            tracing::error!(error = %e, "metrics encoding failed");
        }
        out
    }
}

#[cfg(feature = "web-axum")]
pub use self::layer::track;

#[cfg(feature = "web-axum")]
mod layer {
    use std::sync::Arc;

    use axum::extract::{Request, State};
    use axum::middleware::Next;
    use axum::response::Response;

    use super::Metrics;

    /// Counts every response by method and status.
    pub async fn track(State(metrics): State<Arc<Metrics>>, req: Request, next: Next) -> Response {
        let method = req.method().clone();
        let response = next.run(req).await;
        metrics.record_http(method.as_str(), response.status().as_u16());
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_the_exposition() {
        let metrics = Metrics::new();
        metrics.record_http("GET", 200);
        metrics.record_http("GET", 200);
        metrics.record_booking(BookingOutcome::Created, 1);
        metrics.record_booking(BookingOutcome::Completed, 3);
        metrics.record_booking(BookingOutcome::Cancelled, 0);

        let text = metrics.render();
        assert!(text.contains(r#"courtside_http_requests_total{method="GET",status="200"} 2"#));
        assert!(text.contains(r#"courtside_bookings_total{outcome="Created"} 1"#));
        assert!(text.contains(r#"courtside_bookings_total{outcome="Completed"} 3"#));
        assert!(!text.contains(r#"outcome="Cancelled""#));
        assert!(text.ends_with("# EOF\n"));
    }
}
