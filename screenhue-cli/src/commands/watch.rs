//! Watch command - print colors as they are sampled

use anyhow::Result;
use clap::Args;
use screenhue_core::event::ColorEvent;
use std::fmt::Write as _;
use tokio::signal;
use tracing::info;

use super::{SamplingArgs, build_hub};
use crate::config_file::ConfigFile;

/// Arguments for the watch command
#[derive(Args)]
pub struct WatchArgs {
    #[command(flatten)]
    sampling: SamplingArgs,

    /// Stop after this many events
    #[arg(short = 'n', long)]
    count: Option<u64>,

    /// Print each event as a JSON line
    #[arg(long)]
    json: bool,
}

/// Subscribe locally and print events until interrupted
pub async fn watch(args: WatchArgs, mut config: ConfigFile) -> Result<()> {
    args.sampling.apply(&mut config)?;

    let hub = build_hub(&config).await?;
    let mut subscription = hub.subscribe()?;
    let mut received = 0u64;

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => break,
            event = subscription.next() => {
                let Some(event) = event else { break };
                if args.json {
                    println!("{}", event.to_json());
                } else {
                    println!("{}", format_event(&event));
                }

                received += 1;
                if args.count == Some(received) {
                    break;
                }
            }
        }
    }

    subscription.unsubscribe();
    hub.shutdown();
    info!("Watched {} events: {}", received, hub.snapshot());

    Ok(())
}

/// One human-readable line per event
fn format_event(event: &ColorEvent) -> String {
    let mut line = format!(
        "{}  {}",
        event.time().format("%H:%M:%S%.3f"),
        event.color().hex_triplet()
    );
    for (algorithm, color) in event.algorithm_results() {
        let _ = write!(line, "  {}={}", algorithm, color.hex_triplet());
    }
    line
}
