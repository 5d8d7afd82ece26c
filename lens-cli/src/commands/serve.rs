use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use tracing::info;

use lens_core::history::LocalHistoryService;

use super::GlobalArgs;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on (default: server.bind from config)
    #[arg(long)]
    pub bind: Option<String>,
}

pub async fn run(args: ServeArgs, globals: &GlobalArgs) -> anyhow::Result<()> {
    if globals.guest {
        anyhow::bail!("Guest history is session-only and cannot be served");
    }

    let config = globals.load_config()?;
    let addr: SocketAddr = match &args.bind {
        Some(bind) => bind
            .parse()
            .with_context(|| format!("Invalid bind address: {bind}"))?,
        None => config.bind_addr().context("Invalid server config")?,
    };

    let store = globals.open_store(&config)?;
    let service = Arc::new(LocalHistoryService::new(Arc::new(store)));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Cannot bind {addr}"))?;
    if !globals.quiet {
        println!("Serving history on http://{}", listener.local_addr()?);
    }

    lens_server::serve(listener, service, shutdown_signal())
        .await
        .context("History server stopped unexpectedly")?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
