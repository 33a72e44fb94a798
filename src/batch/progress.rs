//! Progress reporting for batch runs.
//!
//! A [`ProgressObserver`] is told when a batch starts, after each item, and
//! when the batch finishes or aborts. Rendering lives entirely in the
//! observer; the runner only counts.

use std::io::{self, Write};
use std::str::FromStr;
use std::time::Instant;

use super::runner::BatchResult;
use crate::error::BatchError;

/// Width of the console bar in characters.
const BAR_WIDTH: usize = 30;

/// Receives batch lifecycle events.
pub trait ProgressObserver: Send {
    fn on_start(&mut self, label: &str, total: usize);

    /// Called once per attempted item, whatever its outcome.
    fn on_tick(&mut self);

    fn on_finish(&mut self, result: &BatchResult);

    fn on_abort(&mut self, error: &BatchError);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentProgress;

impl ProgressObserver for SilentProgress {
    fn on_start(&mut self, _label: &str, _total: usize) {}
    fn on_tick(&mut self) {}
    fn on_finish(&mut self, _result: &BatchResult) {}
    fn on_abort(&mut self, _error: &BatchError) {}
}

/// Emits structured log lines at every tenth of the batch.
#[derive(Debug)]
pub struct TracingProgress {
    label: String,
    total: usize,
    done: usize,
    started: Instant,
}

impl Default for TracingProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl TracingProgress {
    pub fn new() -> Self {
        Self {
            label: String::new(),
            total: 0,
            done: 0,
            started: Instant::now(),
        }
    }

    fn step(&self) -> usize {
        (self.total / 10).max(1)
    }
}

impl ProgressObserver for TracingProgress {
    fn on_start(&mut self, label: &str, total: usize) {
        self.label = label.to_string();
        self.total = total;
        self.done = 0;
        self.started = Instant::now();
        tracing::info!(batch = %self.label, total = total, "Batch started");
    }

    fn on_tick(&mut self) {
        self.done += 1;
        if self.done % self.step() == 0 || self.done == self.total {
            let pct = if self.total > 0 {
                (self.done as f64 / self.total as f64 * 100.0).min(100.0)
            } else {
                100.0
            };
            tracing::info!(
                batch = %self.label,
                done = self.done,
                total = self.total,
                progress_pct = format!("{:.1}%", pct),
                elapsed_secs = self.started.elapsed().as_secs(),
                "Batch progress"
            );
        }
    }

    fn on_finish(&mut self, result: &BatchResult) {
        tracing::info!(
            batch = %self.label,
            attempted = result.attempted,
            succeeded = result.succeeded,
            skipped = result.skipped,
            failures = result.failures.len(),
            elapsed_secs = self.started.elapsed().as_secs(),
            "Batch finished"
        );
    }

    fn on_abort(&mut self, error: &BatchError) {
        tracing::warn!(batch = %self.label, done = self.done, error = %error, "Batch aborted");
    }
}

/// Redraws a single-line progress bar on a terminal stream.
pub struct ConsoleProgress<W: Write + Send> {
    out: W,
    label: String,
    total: usize,
    done: usize,
}

impl ConsoleProgress<io::Stderr> {
    /// A bar drawn on standard error, leaving stdout for results.
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write + Send> ConsoleProgress<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            label: String::new(),
            total: 0,
            done: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render_line(&self) -> String {
        let filled = if self.total > 0 {
            (self.done.min(self.total) * BAR_WIDTH) / self.total
        } else {
            BAR_WIDTH
        };
        format!(
            "\r{} [{}{}] {}/{}",
            self.label,
            "=".repeat(filled),
            " ".repeat(BAR_WIDTH - filled),
            self.done,
            self.total
        )
    }

    // Terminal write errors are not worth failing a batch over.
    fn draw(&mut self) {
        let line = self.render_line();
        let _ = self.out.write_all(line.as_bytes());
        let _ = self.out.flush();
    }
}

impl<W: Write + Send> ProgressObserver for ConsoleProgress<W> {
    fn on_start(&mut self, label: &str, total: usize) {
        self.label = label.to_string();
        self.total = total;
        self.done = 0;
        self.draw();
    }

    fn on_tick(&mut self) {
        self.done += 1;
        self.draw();
    }

    fn on_finish(&mut self, _result: &BatchResult) {
        let _ = writeln!(self.out);
    }

    fn on_abort(&mut self, _error: &BatchError) {
        let _ = writeln!(self.out, " aborted");
    }
}

/// Which observer the CLI installs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProgressStyle {
    /// Terminal bar on stderr.
    #[default]
    Bar,
    /// Periodic tracing events.
    Log,
    None,
}

impl ProgressStyle {
    pub fn observer(self) -> Box<dyn ProgressObserver> {
        match self {
            ProgressStyle::Bar => Box::new(ConsoleProgress::stderr()),
            ProgressStyle::Log => Box::new(TracingProgress::new()),
            ProgressStyle::None => Box::new(SilentProgress),
        }
    }
}

impl FromStr for ProgressStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bar" => Ok(ProgressStyle::Bar),
            "log" => Ok(ProgressStyle::Log),
            "none" | "off" => Ok(ProgressStyle::None),
            other => Err(format!(
                "unknown progress style '{}': expected bar, log or none",
                other
            )),
        }
    }
}
