//! Ticketbooth HTTP server.

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use ticketbooth_auth::TokenSigner;
use ticketbooth_core::environment::{Clock, SystemClock};
use ticketbooth_core::gateway::PaymentGateway;
use ticketbooth_core::services::{BookingPolicy, Repositories, Services};
use ticketbooth_postgres::{PoolSettings, PostgresStore};
use ticketbooth_server::config::{Config, GatewayKind};
use ticketbooth_server::payment_gateway::{MockPaymentGateway, PayPalGateway};
use ticketbooth_server::{AppState, bootstrap, build_router, metrics, notifier};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "info,ticketbooth=debug,sqlx=warn,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine
    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting Ticketbooth");

    let config = Config::from_env().context("loading configuration")?;
    config.validate().context("validating configuration")?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        gateway = ?config.payment.gateway,
        "Configuration loaded"
    );

    metrics::install(&config.metrics)?;

    let pool = PoolSettings {
        max_connections: config.database.max_connections,
        min_connections: config.database.min_connections,
        acquire_timeout: config.database.connect_timeout,
        idle_timeout: config.database.idle_timeout,
    };
    let store = Arc::new(
        PostgresStore::connect_with(&config.database.url, &pool)
            .await
            .context("connecting to the database")?,
    );
    if config.database.run_migrations {
        store.migrate().await.context("running migrations")?;
    }
    info!("Database ready");

    let gateway: Arc<dyn PaymentGateway> = match config.payment.gateway {
        GatewayKind::PayPal => Arc::new(PayPalGateway::from_config(&config.payment, &config.server.frontend_url)?),
        GatewayKind::Mock => {
            warn!("Using the mock payment gateway; every payment is approved");
            MockPaymentGateway::shared(&config.server.frontend_url)
        }
    };
    let notifier = notifier::from_config(&config.email)?;
    let ttl = chrono::Duration::from_std(config.auth.token_ttl).context("AUTH_TOKEN_TTL out of range")?;
    let signer = TokenSigner::new(config.auth.token_secret.clone(), ttl)?;
    let pending_ttl =
        chrono::Duration::from_std(config.booking.pending_ttl).context("BOOKING_PENDING_TTL out of range")?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let services = Services::new(
        Repositories::from_store(store.clone()),
        gateway,
        notifier,
        clock.clone(),
        signer,
        BookingPolicy {
            pending_ttl,
            reserved_admin_email: config.admin.email.clone(),
        },
    );

    let admin = bootstrap::ensure_admin(&services.accounts, &config.admin)
        .await
        .context("ensuring the administrator account")?;
    if config.seed.sample_events {
        match &admin {
            Some(admin) => {
                bootstrap::seed_sample_events(store.as_ref(), admin, clock.now())
                    .await
                    .context("seeding sample events")?;
            }
            None => warn!("SEED_SAMPLE_EVENTS is set but no administrator is configured; skipping"),
        }
    }

    tokio::spawn(services.sweeper.clone().run(config.booking.sweep_interval));

    let app = build_router(AppState::new(services, store), &config.server.cors_allowed_origins);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout))
        .await?;

    info!("Server stopped");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Resolves on Ctrl+C or SIGTERM. In-flight requests then get
/// `grace` to finish before the process exits regardless.
async fn shutdown_signal(grace: Duration) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C"),
        () = terminate => info!("Received SIGTERM"),
    }

    info!(grace_secs = grace.as_secs(), "Shutting down");
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!("Graceful shutdown timed out; exiting");
        std::process::exit(1);
    });
}
