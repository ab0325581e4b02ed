use std::sync::Arc;
use std::time::Duration;

use autoswap_engine::{ AppError, Config, Result };
use axum::{ Router, routing::{ get, post, put } };
use tower_http::cors::CorsLayer;
use tracing_subscriber::{ layer::SubscriberExt, util::SubscriberInitExt };

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber
        ::registry()
        .with(
            tracing_subscriber::EnvFilter
                ::try_from_default_env()
                .unwrap_or_else(|_| "autoswap_engine=debug,tower_http=debug".into())
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| AppError::Config(e.to_string()))?;

    tracing::info!(
        "Starting autoswap-engine with {} RPC endpoint(s)",
        config.solana_rpc_urls.len()
    );

    // Storage backend: JSON file when configured, in-memory otherwise
    let storage = autoswap_engine::storage::open_store(config.storage_path.clone()).await?;

    // Chain access
    let provider: Arc<dyn autoswap_engine::providers::ChainProvider> = Arc::new(
        autoswap_engine::providers::SolanaProvider::new(&config.solana_rpc_urls)?
    );
    tracing::info!("Solana provider initialized");

    // DEX aggregators
    let aggregators: Vec<Arc<dyn autoswap_engine::dex::DexAggregator>> = vec![
        Arc::new(autoswap_engine::dex::jupiter::JupiterAggregator::new(&config.jupiter_api_url)),
        Arc::new(autoswap_engine::dex::raydium::RaydiumAggregator::new(&config.raydium_api_url))
    ];
    let quoter = Arc::new(autoswap_engine::dex::RouteQuoter::new(aggregators));

    // Core services
    let rules = Arc::new(autoswap_engine::rules::RuleStore::new(storage.clone()));
    let limits = Arc::new(autoswap_engine::limits::LimitTracker::new(storage.clone()));
    let history = Arc::new(
        autoswap_engine::notify::HistoryStore::new(storage.clone(), config.history_limit)
    );
    let notifier = Arc::new(autoswap_engine::notify::Notifier::default());

    let executor = Arc::new(
        autoswap_engine::executor::SwapExecutor::new(
            provider.clone(),
            config.retry.clone(),
            autoswap_engine::executor::ExecutionTimeouts {
                sign: Duration::from_secs(config.sign_timeout_secs),
                submit: Duration::from_secs(config.submit_timeout_secs),
                confirm: Duration::from_secs(config.confirm_timeout_secs),
            },
            config.autoswap_authority.clone()
        )
    );

    let orchestrator = Arc::new(
        autoswap_engine::orchestrator::Orchestrator::new(
            rules.clone(),
            limits.clone(),
            provider.clone(),
            quoter,
            executor,
            history.clone(),
            notifier,
            Duration::from_secs(config.poll_interval_secs)
        )
    );

    // Create app state
    let app_state = autoswap_engine::api::AppState::new(
        rules,
        history,
        limits,
        orchestrator,
        provider
    );

    // Build application router
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/config/{wallet}", get(autoswap_engine::api::config::get_config))
        .route("/api/config/{wallet}", put(autoswap_engine::api::config::put_config))
        .route("/api/history/{wallet}", get(autoswap_engine::api::history::get_history))
        .route("/api/spend/{wallet}/{mint}", get(autoswap_engine::api::history::get_spend))
        .route("/api/autoswap/activate", post(autoswap_engine::api::autoswap::activate))
        .route(
            "/api/autoswap/{wallet}/deactivate",
            post(autoswap_engine::api::autoswap::deactivate)
        )
        .route("/api/autoswap/{wallet}/status", get(autoswap_engine::api::autoswap::status))
        .with_state(app_state)
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("{}:{}", config.server_host, config.server_port);
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener
        ::bind(&addr).await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    axum::serve(listener, app).await.map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
