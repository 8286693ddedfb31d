use std::net::SocketAddr;
use std::time::Duration;

use placement_quiz::{
    config::{get_config, init_config, LogFormat},
    routes, AppState,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    if config.coding_judge_url.is_none() {
        tracing::warn!("CODING_JUDGE_URL is not set; coding answers will be stored unjudged");
    }

    let app_state = AppState::new(config)?;

    {
        let sessions = app_state.session_service.clone();
        let retention = chrono::Duration::minutes(config.result_retention_minutes);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(60)).await;
                sessions.purge_finished(retention).await;
            }
        });
    }

    let app = routes::create_router(app_state);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
