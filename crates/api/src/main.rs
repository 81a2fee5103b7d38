//! API server entry point.

use api::config::{Config, LogFormat};
use api::AppState;
use store::{InventoryStore, OrderStore, PostgresInventoryStore, PostgresOrderStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn serve<I, O>(config: &Config, inventory: I, orders: O)
where
    I: InventoryStore + 'static,
    O: OrderStore + 'static,
{
    let metrics_handle =
        api::routes::metrics::recorder_handle().expect("failed to install Prometheus recorder");
    let state = AppState::new(inventory, orders, config.saga());
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, store_timeout = ?config.store_timeout, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

#[tokio::main]
async fn main() {
    // 1. Load config and initialize tracing
    let config = Config::from_env();
    init_tracing(&config);

    // 2. Build the store handles and serve
    match config.database_url.as_deref() {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to database");
            store::run_migrations(&pool)
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL stores");

            serve(
                &config,
                PostgresInventoryStore::new(pool.clone()),
                PostgresOrderStore::new(pool),
            )
            .await;
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory stores");
            serve(
                &config,
                store::InMemoryInventoryStore::new(),
                store::InMemoryOrderStore::new(),
            )
            .await;
        }
    }

    tracing::info!("server shut down gracefully");
}
