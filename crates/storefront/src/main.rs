//! Sunville Bakery storefront API.
//!
//! Serves the JSON API on port 3000 (configurable).
//!
//! # Architecture
//!
//! - Axum web framework, JSON in and out
//! - Stripe for the catalog, prices and hosted checkout
//! - Resend for order and contact notification emails
//! - Small JSON files under the data directory for the gallery list and the
//!   maintenance flag
//! - In-process fixed-window rate limiter, swept every five minutes

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;
use std::time::Duration;

use sentry::integrations::tracing as sentry_tracing;
use sunville_storefront::config::StorefrontConfig;
use sunville_storefront::services::{ResendClient, StripeClient};
use sunville_storefront::state::AppState;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired rate-limit records are dropped.
const LIMITER_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sunville_storefront=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let payments = StripeClient::new(&config.stripe).expect("Failed to create Stripe client");
    let mailer = ResendClient::new(&config.email).expect("Failed to create Resend client");

    let state = AppState::new(config.clone(), Arc::new(payments), Arc::new(mailer))
        .expect("Failed to initialize application state");

    spawn_limiter_sweep(&state);

    let app = sunville_storefront::app(state);

    let addr = config.socket_addr();
    tracing::info!("storefront listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Periodically drop expired rate-limit records.
fn spawn_limiter_sweep(state: &AppState) {
    let limiter = Arc::clone(state.limiter());
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(LIMITER_SWEEP_INTERVAL);
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = limiter.sweep();
            if removed > 0 {
                tracing::debug!(removed, "Swept expired rate-limit records");
            }
        }
    });
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
