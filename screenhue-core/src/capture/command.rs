//! Capture through an external screenshot program
//!
//! Runs a command that writes one image of the whole screen to stdout
//! (`grim -t ppm -` on wlroots compositors, `import -window root ppm:-` on
//! X11) and decodes it. The screen size is probed once at construction and
//! every later capture is cropped to it.
//!
//! A program that runs past its deadline is killed and the capture fails,
//! so a wedged screenshot tool never stalls the sampler.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{info, trace, warn};

use super::ScreenCapturer;
use crate::error::{Result, ResultExt, ScreenhueError};
use crate::types::{Frame, ScreenBounds};

/// Default screenshot program
pub const DEFAULT_PROGRAM: &str = "grim";

/// Default arguments: PPM to stdout, cheapest format to encode and decode
pub const DEFAULT_ARGS: [&str; 3] = ["-t", "ppm", "-"];

/// How long one screenshot may take before the program is killed
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Screen capturer backed by an external command
#[derive(Debug)]
pub struct CommandCapturer {
    program: String,
    args: Vec<String>,
    bounds: ScreenBounds,
    timeout: Duration,
}

impl CommandCapturer {
    /// Create a capturer, probing the screen size with one capture
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Result<Self> {
        Self::with_timeout(program, args, DEFAULT_TIMEOUT)
    }

    /// Like [`new`](Self::new), killing any run that exceeds `timeout`
    pub fn with_timeout(
        program: impl Into<String>,
        args: Vec<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let program = program.into();
        let image = run_screenshot(&program, &args, timeout)
            .context(format!("Probing screen size with '{}'", program))?;
        let bounds = ScreenBounds::new(image.width(), image.height());
        if bounds.area() == 0 {
            return Err(ScreenhueError::capture(format!(
                "'{}' produced an empty screenshot",
                program
            )));
        }

        let capturer = Self {
            program,
            args,
            bounds,
            timeout,
        };
        info!("Screen capture via '{}' at {}", capturer.command_line(), bounds);
        Ok(capturer)
    }

    /// Create a capturer with known bounds, skipping the probe
    pub fn with_bounds(program: impl Into<String>, args: Vec<String>, bounds: ScreenBounds) -> Self {
        Self {
            program: program.into(),
            args,
            bounds,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Builder: set the per-screenshot deadline
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full command line, for display
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl ScreenCapturer for CommandCapturer {
    fn name(&self) -> &str {
        &self.program
    }

    fn bounds(&self) -> ScreenBounds {
        self.bounds
    }

    fn capture(&mut self) -> Result<Frame> {
        let image = run_screenshot(&self.program, &self.args, self.timeout)?;
        trace!("Decoded {}x{} screenshot", image.width(), image.height());
        Frame::from_rgb_image(&image, self.bounds)
    }
}

fn run_screenshot(program: &str, args: &[String], timeout: Duration) -> Result<image::RgbImage> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(ScreenhueError::from)
        .context(format!("Failed to run '{}'", program))?;

    // Drain both pipes while waiting on the child.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let Some(status) = wait_with_deadline(&mut child, timeout)? else {
        // Readers are left to finish once the pipes close.
        return Err(ScreenhueError::capture(format!(
            "'{}' did not finish within {}ms and was killed",
            program,
            timeout.as_millis()
        )));
    };

    let stdout = collect(stdout).context(format!("Reading output of '{}'", program))?;
    if !status.success() {
        let stderr = collect(stderr).unwrap_or_default();
        let stderr = String::from_utf8_lossy(&stderr);
        return Err(ScreenhueError::capture(format!(
            "'{}' exited with {}: {}",
            program,
            status,
            stderr.trim()
        )));
    }

    Ok(image::load_from_memory(&stdout)?.to_rgb8())
}

/// Poll the child until it exits, killing it once `timeout` has passed
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            if let Err(e) = child.kill() {
                warn!("Failed to kill screenshot process {}: {}", child.id(), e);
            }
            child.wait()?;
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<std::io::Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn collect(reader: JoinHandle<std::io::Result<Vec<u8>>>) -> Result<Vec<u8>> {
    let bytes = reader
        .join()
        .map_err(|_| ScreenhueError::capture("Pipe reader panicked"))??;
    Ok(bytes)
}
