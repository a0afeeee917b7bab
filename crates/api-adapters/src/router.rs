//! Router assembly: every route plus the shared middleware stack.

use std::path::PathBuf;
use std::time::Duration;

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Request};
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, auth, availability, bookings, courts, health, reviews, uploads, venues};
use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub request_timeout: Duration,
    /// Empty allows any origin
    pub cors_origins: Vec<String>,
    /// Body limit of the upload routes
    pub max_upload_bytes: usize,
    /// Serve local media from this directory when set
    pub media_dir: Option<PathBuf>,
    pub media_prefix: String,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            cors_origins: Vec::new(),
            max_upload_bytes: 10 * 5 * 1024 * 1024,
            media_dir: None,
            media_prefix: "/media".into(),
        }
    }
}

fn cors(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| HeaderValue::from_str(o).ok()).collect();
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any).max_age(Duration::from_secs(3600));
    if allowed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(allowed))
    }
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Accounts
        .route("/auth/users", post(auth::sync_user))
        .route("/auth/me", get(auth::me).put(auth::update_me))
        // Venues
        .route("/venues", post(venues::create))
        .route("/venues/approved", get(venues::list_approved))
        .route("/venues/my", get(venues::list_mine))
        .route("/venues/{id}", get(venues::get).put(venues::update).delete(venues::deactivate))
        .route("/venues/{id}/active", put(venues::set_active))
        .route("/venues/{id}/courts", get(courts::list).post(courts::create))
        .route("/venues/{id}/unavailability", get(availability::list).post(availability::create))
        // Courts
        .route("/courts/{id}", put(courts::update).delete(courts::deactivate))
        .route("/courts/{id}/active", put(courts::set_active))
        .route("/courts/{id}/availability", get(courts::availability))
        .route("/unavailability/{id}", delete(availability::remove))
        // Bookings
        .route("/bookings", post(bookings::create))
        .route("/bookings/my", get(bookings::list_mine))
        .route("/bookings/owner", get(bookings::list_for_owner))
        .route("/bookings/owner/stats", get(bookings::owner_stats))
        .route("/bookings/owner/charts", get(bookings::owner_charts))
        .route("/bookings/{id}", get(bookings::get))
        .route("/bookings/{id}/cancel", post(bookings::cancel))
        // Reviews
        .route("/reviews", get(reviews::list_mine).post(reviews::create))
        .route("/reviews/{id}", put(reviews::update).delete(reviews::delete))
        .route("/reviews/venue/{id}", get(reviews::list_for_venue))
        .route("/reviews/can-review/{id}", get(reviews::can_review))
        // Admin
        .route("/admin/stats", get(admin::stats))
        .route("/admin/venues/pending", get(admin::pending_venues))
        .route("/admin/venues/{id}/approve", put(admin::approve_venue))
        .route("/admin/venues/{id}/reject", put(admin::reject_venue))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{id}/role", put(admin::change_role))
        .route("/admin/users/{id}/status", put(admin::set_status))
        .route("/upload/image/{id}", delete(uploads::delete))
}

fn upload_routes(max_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload/image", post(uploads::upload_one))
        .route("/upload/images", post(uploads::upload_many))
        .layer(DefaultBodyLimit::max(max_bytes))
}

/// Builds the application router.
pub fn router(state: AppState, opts: RouterOptions) -> Router {
    let mut app = Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics))
        .merge(api_routes())
        .merge(upload_routes(opts.max_upload_bytes));

    if let Some(dir) = &opts.media_dir {
        app = app.nest_service(&opts.media_prefix, ServeDir::new(dir));
    }

    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
            let request_id = req
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!("http", method = %req.method(), uri = %req.uri(), request_id = %request_id)
        }))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(cors(&opts.cors_origins))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(opts.request_timeout));

    app.layer(axum::middleware::from_fn_with_state(state.metrics.clone(), metrics::track))
        .layer(middleware)
        .with_state(state)
}
