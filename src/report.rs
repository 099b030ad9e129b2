//! # Reporting of sweep results
//!
//! A [`Reporter`] is told about a sweep once before it starts and once at the end of each SNR
//! point. The [`Terminal`] reporter prints a results table to standard output and can also keep
//! a transient status line on standard error, refreshed from the monitor counters by a
//! background thread while frames run.

use std::io::Write;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use itertools::Itertools;

use crate::pipeline::TaskStatsRow;
use crate::{MonitorHandle, MonitorSnapshot, SnrReport, SweepInfo};

/// Width of the transient status line, used to erase it
const STATUS_WIDTH: usize = 80;

/// Receiver of sweep progress
pub trait Reporter {
    /// Called once, before the first SNR point.
    fn legend(&mut self, info: &SweepInfo);

    /// Called at the end of each SNR point, including an interrupted one.
    fn final_report(&mut self, report: &SnrReport);
}

/// Returns the header of the results table.
#[must_use]
pub fn legend_text(info: &SweepInfo) -> String {
    let rule = format!("# {}", "-".repeat(94));
    [
        format!(
            "# Eb/N0 from {} dB to {} dB (excluded) by {} dB, code rate {:.4}, {} bit(s) per \
             symbol",
            info.range.ebn0_min,
            info.range.ebn0_max,
            info.range.ebn0_step,
            info.code_rate,
            info.bits_per_symbol
        ),
        format!(
            "# {} information bits per frame, stop after {} frame errors or {} frames (0: no \
             limit)",
            info.n_info_bits_per_frame, info.max_frame_errors, info.max_frames
        ),
        rule.clone(),
        format!(
            "# {:>6} | {:>6} | {:>7} | {:>9} | {:>8} | {:>7} | {:>9} | {:>9} | {:>7} | {:>7}",
            "Eb/N0", "Es/N0", "sigma", "FRA", "BE", "FE", "BER", "FER", "MB/s", "ET(s)"
        ),
        rule,
    ]
    .join("\n")
}

/// Returns the results table row of one SNR point.
#[must_use]
pub fn report_line(report: &SnrReport) -> String {
    let counters = &report.counters;
    format!(
        "  {:>6.2} | {:>6.2} | {:>7.4} | {:>9} | {:>8} | {:>7} | {:>9.2e} | {:>9.2e} | {:>7.2} | \
         {:>7.2}{}",
        report.noise.ebn0_db,
        report.noise.esn0_db,
        report.noise.sigma,
        counters.n_frames,
        counters.n_bit_errors,
        counters.n_frame_errors,
        report.ber,
        report.fer,
        report.throughput_mbps,
        report.elapsed.as_secs_f64(),
        if report.aborted { " *" } else { "" }
    )
}

/// Returns the transient status line for given counters.
fn status_text(snapshot: &MonitorSnapshot) -> String {
    format!(
        "  FRA = {} BE = {} FE = {} BER = {:.2e} FER = {:.2e}",
        snapshot.n_frames,
        snapshot.n_bit_errors,
        snapshot.n_frame_errors,
        snapshot.ber(),
        snapshot.fer()
    )
}

/// Background thread refreshing the status line
#[derive(Debug)]
struct Progress {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl Progress {
    fn spawn(monitor: MonitorHandle, period: Duration) -> Self {
        let (stop, stopped) = mpsc::channel();
        let handle = thread::spawn(move || loop {
            match stopped.recv_timeout(period) {
                Err(RecvTimeoutError::Timeout) => {
                    let mut stderr = std::io::stderr().lock();
                    // The status line is best effort
                    let _ = write!(stderr, "\r{:<STATUS_WIDTH$}", status_text(&monitor.snapshot()));
                    let _ = stderr.flush();
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });
        Self { stop, handle }
    }

    fn join(self) {
        let _ = self.stop.send(());
        if self.handle.join().is_err() {
            tracing::warn!("progress thread panicked");
        }
    }
}

/// Reporter printing a results table to standard output
#[derive(Debug, Default)]
pub struct Terminal {
    progress: Option<Progress>,
}

impl Terminal {
    /// Returns reporter without status line.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns reporter whose status line shows the counters of `monitor` every `period`.
    #[must_use]
    pub fn with_progress(monitor: MonitorHandle, period: Duration) -> Self {
        Self {
            progress: Some(Progress::spawn(monitor, period)),
        }
    }

    fn erase_status(&self) {
        if self.progress.is_some() {
            eprint!("\r{:STATUS_WIDTH$}\r", "");
        }
    }
}

impl Reporter for Terminal {
    fn legend(&mut self, info: &SweepInfo) {
        println!("{}", legend_text(info));
    }

    fn final_report(&mut self, report: &SnrReport) {
        self.erase_status();
        println!("{}", report_line(report));
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if let Some(progress) = self.progress.take() {
            progress.join();
            eprint!("\r{:STATUS_WIDTH$}\r", "");
        }
    }
}

/// Returns table of task statistics, slowest task first.
#[must_use]
pub fn task_stats_text(rows: &[TaskStatsRow]) -> String {
    let header = format!(
        "# {:<32} | {:>10} | {:>10} | {:>10} | {:>10} | {:>10}",
        "Task", "Calls", "Total(ms)", "Avg(us)", "Min(us)", "Max(us)"
    );
    let lines = rows
        .iter()
        .sorted_by(|a, b| b.stats.total.cmp(&a.stats.total))
        .map(|row| {
            format!(
                "  {:<32} | {:>10} | {:>10.3} | {:>10.3} | {:>10.3} | {:>10.3}",
                format!("{}::{}", row.module, row.task),
                row.stats.n_calls,
                row.stats.total.as_secs_f64() * 1e3,
                row.stats.average().as_secs_f64() * 1e6,
                row.stats.min.as_secs_f64() * 1e6,
                row.stats.max.as_secs_f64() * 1e6
            )
        });
    std::iter::once(header).chain(lines).join("\n")
}

/// Prints table of task statistics to standard output.
pub fn print_task_stats(rows: &[TaskStatsRow]) {
    println!("{}", task_stats_text(rows));
}
