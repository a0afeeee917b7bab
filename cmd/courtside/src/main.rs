//! # Courtside Binary
//!
//! Assembles the application from configuration: store, media, identity
//! verifier, services and router. Runs the booking completion sweep next to
//! the HTTP server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use api_adapters::metrics::BookingOutcome;
use api_adapters::{AppState, Metrics, RouterOptions};
use configs::{LogFormat, ServerSettings, Settings, StoreKind};
use domains::{MediaStorage, SystemClock};
use services::media::MAX_IMAGES_PER_REQUEST;
use services::retry::RetryPolicy;
use services::{BookingService, MediaSettings, Ports, ServiceSettings, Services};
use storage_adapters::MemoryStore;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[cfg(feature = "auth-jwt")]
use auth_adapters::{JwtConfig, JwtIdentityVerifier};

fn init_tracing(server: &ServerSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&server.log_filter));
    let registry = tracing_subscriber::registry().with(filter);
    match server.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json().with_current_span(true)).init(),
        LogFormat::Compact => registry.with(tracing_subscriber::fmt::layer().compact().with_target(false)).init(),
    }
}

fn memory_ports(media: Arc<dyn MediaStorage>) -> Ports {
    let store = MemoryStore::new();
    Ports {
        users: store.users,
        venues: store.venues,
        courts: store.courts,
        bookings: store.bookings,
        reviews: store.reviews,
        unavailability: store.unavailability,
        media,
        images: store.images,
        clock: Arc::new(SystemClock),
    }
}

#[cfg(feature = "db-postgres")]
async fn postgres_ports(settings: &Settings, media: Arc<dyn MediaStorage>) -> anyhow::Result<Ports> {
    use secrecy::ExposeSecret;
    use storage_adapters::postgres::PgStore;

    let url = settings.database.url.as_ref().context("database.url is not set")?;
    let store = PgStore::connect(url.expose_secret(), settings.database.max_connections, settings.database.acquire_timeout())
        .await
        .context("connecting to postgres")?;
    if settings.database.migrate {
        store.migrate().await.context("running migrations")?;
    }
    Ok(Ports {
        users: Arc::new(store.users()),
        venues: Arc::new(store.venues()),
        courts: Arc::new(store.courts()),
        bookings: Arc::new(store.bookings()),
        reviews: Arc::new(store.reviews()),
        unavailability: Arc::new(store.unavailability()),
        media,
        images: Arc::new(store.images()),
        clock: Arc::new(SystemClock),
    })
}

#[cfg(not(feature = "db-postgres"))]
async fn postgres_ports(_settings: &Settings, _media: Arc<dyn MediaStorage>) -> anyhow::Result<Ports> {
    anyhow::bail!("store = \"postgres\" requires the db-postgres feature")
}

#[cfg(feature = "media-local")]
fn media_storage(settings: &Settings) -> (Arc<dyn MediaStorage>, Option<PathBuf>) {
    let root = PathBuf::from(&settings.media.root);
    let storage = storage_adapters::media_local::LocalMediaStorage::new(root.clone(), settings.media.url_prefix.clone());
    (Arc::new(storage), Some(root))
}

#[cfg(not(feature = "media-local"))]
fn media_storage(settings: &Settings) -> (Arc<dyn MediaStorage>, Option<PathBuf>) {
    tracing::warn!("media-local disabled, uploads are kept in memory");
    (Arc::new(storage_adapters::MemoryMediaStorage::new(settings.media.url_prefix.clone())), None)
}

#[cfg(feature = "auth-jwt")]
fn identity_verifier(settings: &Settings) -> anyhow::Result<Arc<dyn domains::IdentityVerifier>> {
    let secret = settings.auth.jwt_secret.clone().context("auth.jwt_secret is not set")?;
    Ok(Arc::new(JwtIdentityVerifier::new(JwtConfig {
        secret,
        issuer: settings.auth.issuer.clone(),
        audience: settings.auth.audience.clone(),
        leeway_secs: settings.auth.leeway_secs,
    })))
}

#[cfg(not(feature = "auth-jwt"))]
fn identity_verifier(_settings: &Settings) -> anyhow::Result<Arc<dyn domains::IdentityVerifier>> {
    anyhow::bail!("no identity verifier compiled in, enable the auth-jwt feature")
}

fn spawn_completion_sweep(bookings: BookingService, metrics: Arc<Metrics>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match bookings.complete_elapsed().await {
                Ok(completed) => metrics.record_booking(BookingOutcome::Completed, completed),
                Err(e) => tracing::warn!(error = %e, "completion sweep failed"),
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested, draining connections");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading configuration")?;
    init_tracing(&settings.server);
    tracing::info!(environment = %settings.environment, store = ?settings.store, "starting courtside");

    let (media, media_dir) = media_storage(&settings);
    let ports = match settings.store {
        StoreKind::Memory => memory_ports(media),
        StoreKind::Postgres => postgres_ports(&settings, media).await?,
    };

    let service_settings = ServiceSettings {
        commission_percent: settings.booking.commission_percent,
        media: MediaSettings {
            max_bytes: settings.media.max_bytes,
            retry: RetryPolicy {
                max_retries: settings.media.max_retries,
                attempt_timeout: settings.media.timeout(),
                ..RetryPolicy::default()
            },
        },
    };
    let services = Services::new(ports, service_settings);
    let metrics = Arc::new(Metrics::new());

    let sweep = spawn_completion_sweep(services.bookings.clone(), metrics.clone(), settings.booking.sweep_interval());

    let state = AppState::new(services, identity_verifier(&settings)?, metrics)
        .with_verify_timeout(settings.auth.verify_timeout());
    let options = RouterOptions {
        request_timeout: settings.server.request_timeout(),
        cors_origins: settings.server.cors_origins.clone(),
        max_upload_bytes: settings.media.max_bytes * MAX_IMAGES_PER_REQUEST + 64 * 1024,
        media_dir,
        media_prefix: settings.media.url_prefix.clone(),
    };
    let app = api_adapters::router(state, options);

    let addr = settings.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await.context("serving http")?;

    sweep.abort();
    tracing::info!("stopped");
    Ok(())
}
