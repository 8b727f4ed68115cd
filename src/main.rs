use copydesk::{api, config::Config, db::init_db, ProfileSource, Repository, RestProfileSource};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;

    let pool = match init_db(&config.database_path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let repo = Arc::new(Repository::new(pool));
    let profiles: Option<Arc<dyn ProfileSource>> = config.profiles_api.as_ref().map(|directory| {
        Arc::new(RestProfileSource::from_config(directory)) as Arc<dyn ProfileSource>
    });
    if profiles.is_none() {
        tracing::warn!("PROFILES_API_URL not set; user refresh is disabled");
    }

    tracing::info!(
        wallet_policy = ?config.wallet_policy,
        agent_commission_pct = %config.agent_commission_pct,
        "Split settings loaded"
    );

    let app = api::create_router(api::AppState::new(repo, config, profiles));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
