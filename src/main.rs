use coursechat::{app, AppState, Backend, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("coursechat=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    let app_state = AppState {
        gateway: Backend::connect(&config).await?,
    };

    let app = app(app_state, &config)?;
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
