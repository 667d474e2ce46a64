use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use echoscribe::session::SessionStore;
use echoscribe::transcribe::TranscriberRegistry;
use echoscribe::{create_router, AppState, Config};

#[derive(Parser)]
#[command(name = "echoscribe", about = "Live transcription backend")]
struct Args {
    /// Config file path (without extension)
    #[arg(long, default_value = "config/echoscribe")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("EchoScribe v{}", env!("CARGO_PKG_VERSION"));

    std::fs::create_dir_all(&cfg.audio.temp_dir)?;

    let registry = TranscriberRegistry::with_defaults();
    let transcriber = registry.resolve(&cfg.transcriber.model, &cfg.transcriber)?;
    info!("Transcriber ready: {}", cfg.transcriber.model);

    let store = Arc::new(SessionStore::new(cfg.audio.clone(), transcriber));
    let app = create_router(AppState::new(store));

    let addr = format!("{}:{}", cfg.server.bind, cfg.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
