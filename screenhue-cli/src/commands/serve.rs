//! Serve command - stream colors over HTTP

use anyhow::Result;
use clap::Args;
use screenhue_core::config::Lifecycle;
use tokio::signal;
use tracing::error;

use super::{SamplingArgs, build_hub, print_sampling};
use crate::config_file::ConfigFile;
use crate::server;

/// Arguments for the serve command
#[derive(Args)]
pub struct ServeArgs {
    #[command(flatten)]
    sampling: SamplingArgs,

    /// Address to listen on
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Keep sampling even while nobody is connected
    #[arg(long)]
    continuous: bool,
}

/// Run the sampler behind the HTTP server until interrupted
pub async fn serve(args: ServeArgs, mut config: ConfigFile) -> Result<()> {
    args.sampling.apply(&mut config)?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.continuous {
        config.sampling.lifecycle = Lifecycle::Continuous;
    }
    let addr = config.server.addr()?;

    println!("Screenhue - Color Stream\n");
    print_sampling(&config);

    let hub = build_hub(&config).await?;
    if config.sampling.lifecycle == Lifecycle::Continuous {
        hub.start()?;
    }

    println!("Capture area: {}", hub.bounds());
    println!("Stream:       http://{}/screen-colors", addr);
    println!("Viewer:       http://{}/", addr);
    println!("Status:       http://{}/status", addr);
    println!();
    println!("Press Ctrl+C to stop...\n");

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        println!("\nReceived interrupt signal...");
    };
    server::run(hub.clone(), addr, shutdown).await?;

    println!("Session: {}", hub.snapshot());
    println!("Server stopped.");

    Ok(())
}
