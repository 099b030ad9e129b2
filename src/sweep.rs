//! Driver of the Eb/N0 sweep
//!
//! For each Eb/N0 point, the driver derives the noise parameters, hands them to every module,
//! runs frames until the monitor's stopping rule holds, and reports the point. An interrupt ends
//! the current point (which is still reported) and the whole sweep.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::{Error, Interrupt, MonitorHandle, MonitorSnapshot, Noise, Pipeline, Reporter};

/// Largest number of points in a sweep
const MAX_POINTS: u32 = 10_000;

/// Eb/N0 values `min, min + step, ...` strictly below `max`, all in dB
#[derive(Clone, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub struct SweepRange {
    /// First Eb/N0 (dB)
    pub ebn0_min: f64,
    /// Upper bound (dB, excluded)
    pub ebn0_max: f64,
    /// Eb/N0 step (dB)
    pub ebn0_step: f64,
}

impl SweepRange {
    /// Returns sweep range with given bounds and step.
    ///
    /// # Errors
    ///
    /// Returns an error if a bound is not finite, if the step is not a positive finite number, or
    /// if the range holds more than 10000 points.
    ///
    /// # Examples
    ///
    /// ```
    /// use fecsim::SweepRange;
    ///
    /// assert_eq!(SweepRange::new(0.0, 2.1, 0.1)?.points().len(), 21);
    /// assert!(SweepRange::new(1.0, 1.0, 0.1)?.points().is_empty());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(ebn0_min: f64, ebn0_max: f64, ebn0_step: f64) -> Result<Self, Error> {
        if !ebn0_min.is_finite() || !ebn0_max.is_finite() {
            return Err(Error::InvalidInput(format!(
                "Eb/N0 bounds must be finite (found {ebn0_min} and {ebn0_max})"
            )));
        }
        if !(ebn0_step.is_finite() && ebn0_step > 0.0) {
            return Err(Error::InvalidInput(format!(
                "Eb/N0 step must be positive (found {ebn0_step})"
            )));
        }
        if (ebn0_max - ebn0_min) / ebn0_step > f64::from(MAX_POINTS) {
            return Err(Error::InvalidInput(format!(
                "Eb/N0 range from {ebn0_min} dB to {ebn0_max} dB by {ebn0_step} dB has more than \
                 {MAX_POINTS} points"
            )));
        }
        Ok(Self {
            ebn0_min,
            ebn0_max,
            ebn0_step,
        })
    }

    /// Returns the Eb/N0 values of the sweep, in ascending order.
    ///
    /// Each value is computed as `min + i * step` rather than by accumulation, and values within
    /// a millionth of a step below `max` count as reaching it.
    #[must_use]
    pub fn points(&self) -> Vec<f64> {
        let limit = self.ebn0_max - 1e-6 * self.ebn0_step;
        (0 .. MAX_POINTS)
            .map(|i| self.ebn0_min + f64::from(i) * self.ebn0_step)
            .take_while(|&ebn0| ebn0 < limit)
            .collect()
    }
}

/// Static description of a sweep, handed to reporters before it starts
#[derive(Clone, PartialEq, Debug, Copy, Serialize)]
pub struct SweepInfo {
    /// Eb/N0 range
    pub range: SweepRange,
    /// Ratio of information bits to transmitted bits
    pub code_rate: f64,
    /// Number of bits per modulation symbol
    pub bits_per_symbol: u32,
    /// Number of information bits checked per frame
    pub n_info_bits_per_frame: usize,
    /// Frame-error target (`0` if disabled)
    pub max_frame_errors: u64,
    /// Frame limit (`0` if disabled)
    pub max_frames: u64,
}

/// Results for one Eb/N0 point
#[derive(Clone, PartialEq, Debug, Copy, Serialize)]
pub struct SnrReport {
    /// Noise parameters of the point
    pub noise: Noise,
    /// Monitor counters at the end of the point
    pub counters: MonitorSnapshot,
    /// Bit error rate
    pub ber: f64,
    /// Frame error rate
    pub fer: f64,
    /// Simulation time of the point
    pub elapsed: Duration,
    /// Information throughput (Mb/s)
    pub throughput_mbps: f64,
    /// `true` if the point was cut short by an interrupt
    pub aborted: bool,
}

impl SnrReport {
    /// Returns report for given noise parameters and final counters.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(noise: Noise, counters: MonitorSnapshot, elapsed: Duration, aborted: bool) -> Self {
        let n_bits = (counters.n_frames * counters.n_bits_per_frame) as f64;
        let secs = elapsed.as_secs_f64();
        Self {
            noise,
            counters,
            ber: counters.ber(),
            fer: counters.fer(),
            elapsed,
            throughput_mbps: if secs > 0.0 { n_bits / secs * 1e-6 } else { 0.0 },
            aborted,
        }
    }
}

/// Eb/N0 sweep over a compiled pipeline
#[derive(Clone, PartialEq, Debug, Copy)]
pub struct Sweep {
    range: SweepRange,
    code_rate: f64,
    bits_per_symbol: u32,
}

impl Sweep {
    /// Returns sweep over given range, for a chain of given code rate and modulation order.
    ///
    /// # Errors
    ///
    /// Returns an error if `code_rate` is not in `(0, 1]` or `bits_per_symbol` is `0`.
    pub fn new(range: SweepRange, code_rate: f64, bits_per_symbol: u32) -> Result<Self, Error> {
        // Rejects the same values as the noise computation, before the sweep starts
        Noise::from_ebn0(range.ebn0_min, code_rate, bits_per_symbol)?;
        Ok(Self {
            range,
            code_rate,
            bits_per_symbol,
        })
    }

    /// Returns the Eb/N0 range.
    #[must_use]
    pub fn range(&self) -> SweepRange {
        self.range
    }

    /// Runs the sweep.
    ///
    /// The interrupt is armed when the sweep starts. For each point, all modules are reset and
    /// given the point's noise parameters, frames run while the monitor's stopping rule does not
    /// hold and no interrupt is pending, and the point is passed to `reporter`. A pending
    /// interrupt stops the sweep after its point is reported.
    ///
    /// # Returns
    ///
    /// - `reports`: Reports of the points run, in ascending Eb/N0 order. The last one is marked
    ///   as aborted if the sweep was interrupted.
    ///
    /// # Errors
    ///
    /// Returns an error if a frame fails to execute, or if a frame runs without the monitor
    /// counting it.
    pub fn run(
        &self,
        pipeline: &mut Pipeline,
        monitor: &MonitorHandle,
        interrupt: &Interrupt,
        reporter: &mut dyn Reporter,
    ) -> Result<Vec<SnrReport>, Error> {
        interrupt.arm();
        reporter.legend(&SweepInfo {
            range: self.range,
            code_rate: self.code_rate,
            bits_per_symbol: self.bits_per_symbol,
            n_info_bits_per_frame: monitor.n_bits_per_frame(),
            max_frame_errors: monitor.max_frame_errors(),
            max_frames: monitor.max_frames(),
        });
        let mut reports = Vec::new();
        for ebn0_db in self.range.points() {
            let noise = Noise::from_ebn0(ebn0_db, self.code_rate, self.bits_per_symbol)?;
            pipeline.reset();
            pipeline.set_noise(&noise);
            tracing::info!(
                "starting Eb/N0 = {ebn0_db:.2} dB (Es/N0 = {:.2} dB, sigma = {:.4})",
                noise.esn0_db,
                noise.sigma
            );
            let timer = Instant::now();
            while !monitor.limit_achieved() && !interrupt.is_set() {
                let n_frames = monitor.n_frames();
                pipeline.execute_frame()?;
                if monitor.n_frames() == n_frames {
                    return Err(Error::InvalidInput(
                        "A frame ran without reaching the monitor (its check_errors task is not \
                         in the pipeline)"
                            .to_string(),
                    ));
                }
            }
            let aborted = interrupt.is_set();
            let report = SnrReport::new(noise, monitor.snapshot(), timer.elapsed(), aborted);
            tracing::info!(
                "finished Eb/N0 = {ebn0_db:.2} dB after {} frames",
                report.counters.n_frames
            );
            reporter.final_report(&report);
            reports.push(report);
            if aborted {
                tracing::warn!("sweep interrupted at Eb/N0 = {ebn0_db:.2} dB");
                break;
            }
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests_of_sweep_range {
    use float_eq::assert_float_eq;

    use super::*;

    #[test]
    fn test_new() {
        assert!(SweepRange::new(0.0, 1.0, 0.0).is_err());
        assert!(SweepRange::new(0.0, 1.0, -0.1).is_err());
        assert!(SweepRange::new(0.0, f64::INFINITY, 0.1).is_err());
        assert!(SweepRange::new(f64::NAN, 1.0, 0.1).is_err());
        assert!(SweepRange::new(0.0, 1.0, f64::NAN).is_err());
        assert!(SweepRange::new(2.0, 1.0, 0.5).is_ok());
        assert!(SweepRange::new(0.0, 1e9, 1e-3).is_err());
        assert!(SweepRange::new(1e17, 1e17 + 1e6, 1.0).is_err());
        assert!(SweepRange::new(0.0, 10_001.0, 1.0).is_err());
        assert_eq!(SweepRange::new(0.0, 10_000.0, 1.0).unwrap().points().len(), 10_000);
    }

    #[test]
    fn test_points() {
        let points = SweepRange::new(0.0, 2.1, 0.1).unwrap().points();
        assert_eq!(points.len(), 21);
        assert_float_eq!(points[0], 0.0, abs <= 1e-12);
        assert_float_eq!(points[20], 2.0, abs <= 1e-9);
        assert_eq!(SweepRange::new(1.0, 1.0, 0.1).unwrap().points().len(), 0);
        assert_eq!(SweepRange::new(2.0, 1.0, 0.1).unwrap().points().len(), 0);
        assert_eq!(SweepRange::new(-1.0, 1.0, 0.5).unwrap().points(), [-1.0, -0.5, 0.0, 0.5]);
        assert_eq!(SweepRange::new(0.0, 0.05, 1.0).unwrap().points(), [0.0]);
    }
}

#[cfg(test)]
mod tests_of_sweep {
    use super::*;
    use crate::socket::{ElementType, SocketSpec};
    use crate::task::{TaskIo, TaskSpec};
    use crate::{BferMonitor, Bit, Graph, Module, Stage, SweepInfo};

    /// Stage emitting a reference frame and a decoded frame with errors below a noise threshold
    struct Flaky {
        sigma: f64,
        frame: u64,
        interrupt_after: Option<(u64, Interrupt)>,
    }

    impl Stage for Flaky {
        fn tasks(&self) -> Vec<TaskSpec> {
            vec![TaskSpec::new(
                "emit",
                vec![
                    SocketSpec::output("U", ElementType::Bit, 4),
                    SocketSpec::output("V", ElementType::Bit, 4),
                ],
            )]
        }

        fn execute(&mut self, _task: usize, io: &TaskIo<'_>) -> Result<(), Error> {
            self.frame += 1;
            io.bits_mut(0)?.fill(Bit::Zero);
            // Every other frame is wrong at high noise, every fourth one at low noise
            let period = if self.sigma > 0.8 { 2 } else { 4 };
            let wrong = self.frame % period == 0;
            io.bits_mut(1)?.fill(if wrong { Bit::One } else { Bit::Zero });
            if let Some((after, interrupt)) = &self.interrupt_after {
                if self.frame == *after {
                    interrupt.trigger();
                }
            }
            Ok(())
        }

        fn set_noise(&mut self, noise: &Noise) {
            self.sigma = noise.sigma;
        }

        fn reset(&mut self) {
            self.frame = 0;
        }
    }

    #[derive(Default)]
    struct Recorder {
        legends: usize,
        reports: Vec<SnrReport>,
    }

    impl Reporter for Recorder {
        fn legend(&mut self, _info: &SweepInfo) {
            self.legends += 1;
        }

        fn final_report(&mut self, report: &SnrReport) {
            self.reports.push(*report);
        }
    }

    fn flaky_pipeline(interrupt_after: Option<(u64, Interrupt)>) -> (Pipeline, MonitorHandle) {
        let monitor = BferMonitor::new(4, 5, 1000).unwrap();
        let handle = monitor.handle();
        let mut graph = Graph::new();
        let src = graph
            .add(Module::new(
                "src",
                Flaky {
                    sigma: 0.0,
                    frame: 0,
                    interrupt_after,
                },
            ))
            .unwrap();
        let mnt = graph.add(Module::new("mnt", monitor)).unwrap();
        for name in ["U", "V"] {
            graph
                .bind(
                    graph.socket(src, "emit", name).unwrap(),
                    graph.socket(mnt, "check_errors", name).unwrap(),
                )
                .unwrap();
        }
        (graph.compile_topological().unwrap(), handle)
    }

    #[test]
    fn test_run() {
        let (mut pipeline, monitor) = flaky_pipeline(None);
        let sweep = Sweep::new(SweepRange::new(-4.0, 10.0, 10.0).unwrap(), 0.5, 1).unwrap();
        let mut recorder = Recorder::default();
        let interrupt = Interrupt::new();
        let reports = sweep
            .run(&mut pipeline, &monitor, &interrupt, &mut recorder)
            .unwrap();
        assert_eq!(recorder.legends, 1);
        assert_eq!(reports, recorder.reports);
        assert_eq!(reports.len(), 2);
        // sigma > 0.8 at -4 dB: 5 frame errors after 10 frames
        assert!(reports[0].noise.sigma > 0.8);
        assert_eq!(reports[0].counters.n_frames, 10);
        assert_eq!(reports[0].counters.n_frame_errors, 5);
        // sigma < 0.8 at 6 dB: 5 frame errors after 20 frames
        assert!(reports[1].noise.sigma < 0.8);
        assert_eq!(reports[1].counters.n_frames, 20);
        assert_eq!(reports[1].counters.n_bit_errors, 20);
        assert!(reports.iter().all(|r| !r.aborted));
        assert!(interrupt.is_armed());
    }

    #[test]
    fn test_run_empty_range() {
        let (mut pipeline, monitor) = flaky_pipeline(None);
        let sweep = Sweep::new(SweepRange::new(1.0, 1.0, 0.1).unwrap(), 0.5, 1).unwrap();
        let mut recorder = Recorder::default();
        let reports = sweep
            .run(&mut pipeline, &monitor, &Interrupt::new(), &mut recorder)
            .unwrap();
        assert!(reports.is_empty());
        assert!(recorder.reports.is_empty());
        assert_eq!(monitor.snapshot().n_frames, 0);
    }

    #[test]
    fn test_run_interrupted() {
        let interrupt = Interrupt::new();
        let (mut pipeline, monitor) = flaky_pipeline(Some((3, interrupt.clone())));
        let sweep = Sweep::new(SweepRange::new(-4.0, 6.0, 1.0).unwrap(), 0.5, 1).unwrap();
        let mut recorder = Recorder::default();
        let reports = sweep
            .run(&mut pipeline, &monitor, &interrupt, &mut recorder)
            .unwrap();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].aborted);
        assert_eq!(reports[0].counters.n_frames, 3);
        assert_eq!(recorder.reports.len(), 1);
    }

    #[test]
    fn test_run_fails_if_monitor_not_scheduled() {
        let monitor = BferMonitor::new(4, 5, 1000).unwrap();
        let handle = monitor.handle();
        let mut graph = Graph::new();
        let src = graph
            .add(Module::new(
                "src",
                Flaky {
                    sigma: 0.0,
                    frame: 0,
                    interrupt_after: None,
                },
            ))
            .unwrap();
        let mnt = graph.add(Module::new("mnt", monitor)).unwrap();
        for name in ["U", "V"] {
            graph
                .bind(
                    graph.socket(src, "emit", name).unwrap(),
                    graph.socket(mnt, "check_errors", name).unwrap(),
                )
                .unwrap();
        }
        let emit = graph.task(src, "emit").unwrap();
        let mut pipeline = graph.compile(vec![emit]).unwrap();
        let sweep = Sweep::new(SweepRange::new(0.0, 1.0, 1.0).unwrap(), 0.5, 1).unwrap();
        let result = sweep.run(
            &mut pipeline,
            &handle,
            &Interrupt::new(),
            &mut Recorder::default(),
        );
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(handle.n_frames(), 0);
    }

    #[test]
    fn test_new() {
        let range = SweepRange::new(0.0, 1.0, 0.5).unwrap();
        assert!(Sweep::new(range, 0.0, 1).is_err());
        assert!(Sweep::new(range, 0.5, 0).is_err());
        assert_eq!(Sweep::new(range, 0.5, 2).unwrap().range(), range);
    }
}
