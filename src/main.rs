use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use user_api::{config::Config, db, middleware::rate_limit, routes, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 0. Load .env if there is one. Missing file is fine.
    dotenvy::dotenv().ok();

    // 1. Sentry, only if SENTRY_DSN is set. The guard must live as long as main.
    let _guard = sentry::init((
        std::env::var("SENTRY_DSN").ok(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            traces_sample_rate: 1.0,
            ..Default::default()
        },
    ));

    // 2. rustls needs a crypto provider before the first TLS connection (Postgres).
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    // 3. Logging. RUST_LOG wins; otherwise debug for us and tower_http.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "user_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Starting user API...");

    // 4. Connect the store. If this fails we exit without ever binding the port.
    let store = match db::connect(&config).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, "unable to start the server");
            return Err(e);
        }
    };
    tracing::info!("Credential store connected");

    // 5. State and routes
    let state = AppState::new(Arc::clone(&store), &config);
    let login_limit = config
        .login_burst
        .map(rate_limit::create_login_config)
        .transpose()?;
    let app = routes::create_routes(state, login_limit);

    // 6. Serve on all interfaces until Ctrl-C / SIGTERM, then close the store.
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    tracing::info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
