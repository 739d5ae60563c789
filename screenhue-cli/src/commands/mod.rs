//! CLI command implementations

mod bench;
mod config;
mod sample;
mod serve;
mod watch;

pub use bench::{BenchArgs, bench};
pub use config::{ConfigArgs, config};
pub use sample::{SampleArgs, sample};
pub use serve::{ServeArgs, serve};
pub use watch::{WatchArgs, watch};

use anyhow::{Context, Result};
use clap::Args;
use screenhue_core::capture::ScreenCapturer;
use screenhue_core::hub::BroadcastHub;
use screenhue_core::reduce::Algorithm;
use std::time::Duration;

use crate::config_file::{CaptureBackend, ConfigFile};

/// Sampling options shared by every command that captures
#[derive(Args, Debug, Clone, Default)]
pub struct SamplingArgs {
    /// Target samples per second (overrides --interval-ms)
    #[arg(short, long)]
    rate: Option<u32>,

    /// Milliseconds between samples
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Sample every Nth pixel in both directions
    #[arg(short, long)]
    density: Option<u32>,

    /// Algorithm whose result is reported as the color (avgRgb, squaredAvgRgb, averageHue)
    #[arg(short, long)]
    primary: Option<Algorithm>,

    /// Comma-separated algorithms to compute
    #[arg(short, long, value_delimiter = ',')]
    algorithms: Vec<Algorithm>,

    /// Use a generated test pattern instead of a screenshot program
    #[arg(long)]
    synthetic: bool,

    /// Screenshot program to run (must write PNG or PPM to stdout)
    #[arg(long, conflicts_with = "synthetic")]
    program: Option<String>,
}

impl SamplingArgs {
    /// Override file settings with whatever was given on the command line
    pub fn apply(&self, config: &mut ConfigFile) -> Result<()> {
        let sampling = &mut config.sampling;
        if let Some(interval_ms) = self.interval_ms {
            sampling.interval_ms = interval_ms;
        }
        if let Some(rate) = self.rate {
            *sampling = sampling.clone().with_rate(rate).context("Invalid --rate")?;
        }
        if let Some(density) = self.density {
            sampling.pixel_density = density;
        }
        if let Some(primary) = self.primary {
            sampling.primary = primary;
        }
        if !self.algorithms.is_empty() {
            sampling.algorithms = self.algorithms.clone();
        }

        if self.synthetic {
            config.capture.backend = CaptureBackend::Synthetic;
        }
        if let Some(ref program) = self.program {
            config.capture.backend = CaptureBackend::Command;
            config.capture.program = program.clone();
        }

        Ok(())
    }
}

/// Build the configured capturer off the async runtime
///
/// The command backend takes a screenshot to learn the screen size.
pub async fn build_capturer(config: &ConfigFile) -> Result<Box<dyn ScreenCapturer>> {
    let capture = config.capture.clone();
    tokio::task::spawn_blocking(move || capture.build())
        .await
        .context("Capture setup task failed")?
}

/// Build a hub for the configured capturer and sampling settings
pub async fn build_hub(config: &ConfigFile) -> Result<BroadcastHub> {
    let capturer = build_capturer(config).await?;
    BroadcastHub::new(capturer, &config.sampling).context("Invalid sampling configuration")
}

/// Print the effective sampling settings
pub fn print_sampling(config: &ConfigFile) {
    let sampling = &config.sampling;
    let algorithms: Vec<&str> = sampling.algorithms.iter().map(Algorithm::name).collect();

    println!("Configuration:");
    println!("  Capture:     {}", describe_capture(config));
    println!(
        "  Interval:    {} ms (~{:.1}/s)",
        sampling.interval_ms,
        rate_of(sampling.interval())
    );
    println!("  Density:     every {} px", sampling.pixel_density);
    println!("  Algorithms:  {}", algorithms.join(", "));
    println!("  Primary:     {}", sampling.primary);
    println!("  Lifecycle:   {}", sampling.lifecycle);
    println!();
}

fn describe_capture(config: &ConfigFile) -> String {
    let capture = &config.capture;
    match capture.backend {
        CaptureBackend::Command => {
            let mut line = capture.program.clone();
            for arg in &capture.args {
                line.push(' ');
                line.push_str(arg);
            }
            line
        }
        CaptureBackend::Synthetic => match capture.bounds() {
            Some(bounds) => format!("synthetic {}", bounds),
            None => "synthetic".to_string(),
        },
    }
}

fn rate_of(interval: Duration) -> f64 {
    if interval.is_zero() {
        0.0
    } else {
        1.0 / interval.as_secs_f64()
    }
}
