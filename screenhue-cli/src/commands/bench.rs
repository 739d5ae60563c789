//! Bench command - time capture and each reduction algorithm

use anyhow::{Context, Result, bail};
use clap::Args;
use screenhue_core::capture::ScreenCapturer;
use screenhue_core::reduce::{Algorithm, ColorReducer};
use screenhue_core::types::{Color, ScreenBounds};
use std::time::{Duration, Instant};

use super::{SamplingArgs, build_capturer};
use crate::config_file::ConfigFile;

/// Arguments for the bench command
#[derive(Args)]
pub struct BenchArgs {
    #[command(flatten)]
    sampling: SamplingArgs,

    /// Number of frames to capture
    #[arg(short = 'n', long, default_value = "10")]
    iterations: u32,
}

/// Timings for one algorithm
#[derive(Debug, Clone)]
struct AlgorithmTiming {
    algorithm: Algorithm,
    total: Duration,
    last: Color,
}

/// Result of a benchmark run
#[derive(Debug, Clone)]
struct BenchReport {
    iterations: u32,
    bounds: ScreenBounds,
    sampled_pixels: u64,
    capture_total: Duration,
    algorithms: Vec<AlgorithmTiming>,
}

impl BenchReport {
    fn average(&self, total: Duration) -> f64 {
        total.as_secs_f64() * 1000.0 / self.iterations.max(1) as f64
    }
}

/// Capture `iterations` frames and time every enabled algorithm on each
fn run_bench(
    capturer: &mut dyn ScreenCapturer,
    reducer: &ColorReducer,
    iterations: u32,
) -> Result<BenchReport> {
    if iterations == 0 {
        bail!("Iterations must be at least 1");
    }

    let bounds = capturer.bounds();
    let mut algorithms: Vec<AlgorithmTiming> = reducer
        .algorithms()
        .iter()
        .map(|&algorithm| AlgorithmTiming {
            algorithm,
            total: Duration::ZERO,
            last: Color::new(0, 0, 0),
        })
        .collect();
    let mut capture_total = Duration::ZERO;

    for i in 0..iterations {
        let started = Instant::now();
        let frame = capturer
            .capture()
            .with_context(|| format!("Capture {} of {} failed", i + 1, iterations))?;
        capture_total += started.elapsed();

        for timing in &mut algorithms {
            let started = Instant::now();
            timing.last = reducer.reduce_one(timing.algorithm, &frame)?;
            timing.total += started.elapsed();
        }
    }

    Ok(BenchReport {
        iterations,
        bounds,
        sampled_pixels: reducer.sampled_pixel_count(bounds.width, bounds.height),
        capture_total,
        algorithms,
    })
}

/// Run the benchmark and print average timings
pub async fn bench(args: BenchArgs, mut config: ConfigFile) -> Result<()> {
    args.sampling.apply(&mut config)?;
    let reducer = config
        .sampling
        .reducer()
        .context("Invalid sampling configuration")?;

    println!("Screenhue - Benchmark\n");

    let mut capturer = build_capturer(&config).await?;
    let iterations = args.iterations;
    let report = tokio::task::spawn_blocking(move || {
        run_bench(capturer.as_mut(), &reducer, iterations)
    })
    .await
    .context("Benchmark task failed")??;

    println!(
        "{} frames of {} ({} sampled pixels at density {})",
        report.iterations,
        report.bounds,
        report.sampled_pixels,
        config.sampling.pixel_density
    );
    println!();
    println!(
        "  {:<14} {:>10}",
        "capture",
        format!("{:.2} ms", report.average(report.capture_total))
    );
    for timing in &report.algorithms {
        println!(
            "  {:<14} {:>10}   last {}",
            timing.algorithm.name(),
            format!("{:.2} ms", report.average(timing.total)),
            timing.last.hex_triplet()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use screenhue_core::capture::SyntheticCapturer;

    #[test]
    fn test_run_bench_times_enabled_algorithms() {
        let mut capturer = SyntheticCapturer::new(ScreenBounds::new(40, 20)).unwrap();
        let reducer =
            ColorReducer::new(4, [Algorithm::AverageRgb, Algorithm::AverageHue]).unwrap();

        let report = run_bench(&mut capturer, &reducer, 3).unwrap();

        assert_eq!(report.iterations, 3);
        assert_eq!(report.bounds, ScreenBounds::new(40, 20));
        assert_eq!(report.sampled_pixels, 50);
        let names: Vec<_> = report.algorithms.iter().map(|t| t.algorithm).collect();
        assert_eq!(names, vec![Algorithm::AverageRgb, Algorithm::AverageHue]);
        assert_eq!(capturer.captures(), 3);
    }

    #[test]
    fn test_run_bench_rejects_zero_iterations() {
        let mut capturer = SyntheticCapturer::new(ScreenBounds::new(4, 4)).unwrap();
        assert!(run_bench(&mut capturer, &ColorReducer::default(), 0).is_err());
    }
}
