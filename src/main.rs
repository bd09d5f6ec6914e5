use tracing_subscriber::EnvFilter;

use splunk_mcp::config::SplunkConfig;
use splunk_mcp::mcp::stdio;
use splunk_mcp::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mode = std::env::args().nth(1).unwrap_or_else(|| "sse".to_string());
    if mode != "sse" && mode != "stdio" {
        eprintln!("Usage: splunk-mcp [sse|stdio]");
        std::process::exit(2);
    }

    let config = SplunkConfig::from_env();
    init_tracing(&mode, config.debug);

    let state = AppState::new(config);

    match mode.as_str() {
        "stdio" => stdio::run(state).await,
        _ => serve_sse(state).await,
    }
}

/// Default level comes from DEBUG unless RUST_LOG overrides it. In stdio
/// mode logs go to stderr — stdout carries the protocol.
fn init_tracing(mode: &str, debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into());
    let json = std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json");

    match (mode, json) {
        ("stdio", true) => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .json()
            .init(),
        ("stdio", false) => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init(),
        (_, true) => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init(),
        (_, false) => tracing_subscriber::fmt().with_env_filter(env_filter).init(),
    }
}

async fn serve_sse(state: AppState) -> anyhow::Result<()> {
    let port = state.config.mcp_port;
    let app = splunk_mcp::create_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("splunk-mcp listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {},
            _ = sigterm.recv() => {},
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
