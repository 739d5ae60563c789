//! Sample command - capture a single color

use anyhow::{Context, Result};
use clap::Args;
use screenhue_core::metrics::create_metrics;
use screenhue_core::pipeline::SamplePipeline;
use std::sync::Arc;

use super::{SamplingArgs, build_capturer};
use crate::config_file::ConfigFile;

/// Arguments for the sample command
#[derive(Args)]
pub struct SampleArgs {
    #[command(flatten)]
    sampling: SamplingArgs,

    /// Print the event as JSON
    #[arg(long)]
    json: bool,
}

/// Take one sample and print it
pub async fn sample(args: SampleArgs, mut config: ConfigFile) -> Result<()> {
    args.sampling.apply(&mut config)?;

    let capturer = build_capturer(&config).await?;
    let pipeline = Arc::new(
        SamplePipeline::new(capturer, &config.sampling, create_metrics())
            .context("Invalid sampling configuration")?,
    );
    let event = pipeline.sample_async().await.context("Sampling failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&event)?);
        return Ok(());
    }

    println!("Color:  {}  ({})", event.color().hex_triplet(), event.primary());
    println!("Area:   {}", pipeline.bounds());
    println!("Time:   {}", event.time().to_rfc3339());
    println!();
    for (algorithm, color) in event.algorithm_results() {
        println!(
            "  {:<14} {}  rgb({}, {}, {})",
            algorithm.name(),
            color.hex_triplet(),
            color.red,
            color.green,
            color.blue
        );
    }

    Ok(())
}
