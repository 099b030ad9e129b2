//! Bit/frame error monitor with a frame-error stopping rule

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::socket::{ElementType, SocketSpec};
use crate::task::{TaskIo, TaskSpec};
use crate::{utils, Error, Stage};

/// Index of the reference bits socket of the `check_errors` task
pub const U: usize = 0;
/// Index of the decoded bits socket of the `check_errors` task
pub const V: usize = 1;

/// State of the stopping rule
#[derive(Clone, Eq, PartialEq, Debug, Copy)]
pub enum MonitorState {
    /// More frames are needed
    Running,
    /// The frame-error target or the frame limit was reached
    LimitReached,
}

/// Counters shared between the monitor and its readers
#[derive(Debug, Default)]
struct Counters {
    n_frames: AtomicU64,
    n_bit_errors: AtomicU64,
    n_frame_errors: AtomicU64,
}

/// Point-in-time copy of the monitor counters
#[derive(Clone, Eq, PartialEq, Debug, Copy, Default, Serialize)]
pub struct MonitorSnapshot {
    /// Number of frames checked
    pub n_frames: u64,
    /// Number of erroneous bits
    pub n_bit_errors: u64,
    /// Number of frames with at least one erroneous bit
    pub n_frame_errors: u64,
    /// Number of bits checked per frame
    pub n_bits_per_frame: u64,
}

impl MonitorSnapshot {
    /// Returns bit error rate (zero if no frame was checked).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ber(&self) -> f64 {
        let n_bits = self.n_frames * self.n_bits_per_frame;
        if n_bits == 0 {
            0.0
        } else {
            self.n_bit_errors as f64 / n_bits as f64
        }
    }

    /// Returns frame error rate (zero if no frame was checked).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fer(&self) -> f64 {
        if self.n_frames == 0 {
            0.0
        } else {
            self.n_frame_errors as f64 / self.n_frames as f64
        }
    }
}

/// Read access to the monitor counters and stopping rule, usable from other threads
#[derive(Clone, Debug)]
pub struct MonitorHandle {
    counters: Arc<Counters>,
    n_bits_per_frame: usize,
    max_frame_errors: u64,
    max_frames: u64,
}

impl MonitorHandle {
    /// Returns current state of the stopping rule.
    #[must_use]
    pub fn state(&self) -> MonitorState {
        let n_frame_errors = self.counters.n_frame_errors.load(Ordering::Relaxed);
        let n_frames = self.counters.n_frames.load(Ordering::Relaxed);
        if (self.max_frame_errors > 0 && n_frame_errors >= self.max_frame_errors)
            || (self.max_frames > 0 && n_frames >= self.max_frames)
        {
            MonitorState::LimitReached
        } else {
            MonitorState::Running
        }
    }

    /// Returns `true` once the stopping rule holds.
    #[must_use]
    pub fn limit_achieved(&self) -> bool {
        self.state() == MonitorState::LimitReached
    }

    /// Returns a copy of the counters. Values read during a frame may be mutually inconsistent.
    #[must_use]
    pub fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            n_frames: self.counters.n_frames.load(Ordering::Relaxed),
            n_bit_errors: self.counters.n_bit_errors.load(Ordering::Relaxed),
            n_frame_errors: self.counters.n_frame_errors.load(Ordering::Relaxed),
            n_bits_per_frame: self.n_bits_per_frame as u64,
        }
    }

    /// Returns number of frames checked so far.
    #[must_use]
    pub fn n_frames(&self) -> u64 {
        self.counters.n_frames.load(Ordering::Relaxed)
    }

    /// Zeroes all counters, which returns the stopping rule to [`MonitorState::Running`].
    pub fn reset(&self) {
        self.counters.n_frames.store(0, Ordering::Relaxed);
        self.counters.n_bit_errors.store(0, Ordering::Relaxed);
        self.counters.n_frame_errors.store(0, Ordering::Relaxed);
    }

    /// Returns number of bits checked per frame.
    #[must_use]
    pub fn n_bits_per_frame(&self) -> usize {
        self.n_bits_per_frame
    }

    /// Returns frame-error target (`0` if disabled).
    #[must_use]
    pub fn max_frame_errors(&self) -> u64 {
        self.max_frame_errors
    }

    /// Returns frame limit (`0` if disabled).
    #[must_use]
    pub fn max_frames(&self) -> u64 {
        self.max_frames
    }
}

/// Stage comparing decoded bits with reference bits, with one task `check_errors` (`U`, `V`)
#[derive(Debug)]
pub struct BferMonitor {
    handle: MonitorHandle,
}

impl BferMonitor {
    /// Returns monitor for frames of `n_bits_per_frame` bits.
    ///
    /// # Parameters
    ///
    /// - `n_bits_per_frame`: Number of bits compared per frame.
    ///
    /// - `max_frame_errors`: Number of frame errors after which the stopping rule holds (`0` to
    ///   disable).
    ///
    /// - `max_frames`: Number of frames after which the stopping rule holds (`0` to disable).
    ///
    /// # Errors
    ///
    /// Returns an error if `n_bits_per_frame` is `0`, or if both limits are disabled.
    ///
    /// # Examples
    ///
    /// ```
    /// use fecsim::{BferMonitor, MonitorState};
    ///
    /// let monitor = BferMonitor::new(32, 100, 0)?;
    /// assert_eq!(monitor.handle().state(), MonitorState::Running);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(n_bits_per_frame: usize, max_frame_errors: u64, max_frames: u64) -> Result<Self, Error> {
        if n_bits_per_frame == 0 {
            return Err(Error::InvalidInput(
                "Monitor must check at least one bit per frame".to_string(),
            ));
        }
        if max_frame_errors == 0 && max_frames == 0 {
            return Err(Error::InvalidInput(
                "Either the frame-error target or the frame limit must be positive".to_string(),
            ));
        }
        Ok(Self {
            handle: MonitorHandle {
                counters: Arc::new(Counters::default()),
                n_bits_per_frame,
                max_frame_errors,
                max_frames,
            },
        })
    }

    /// Returns a handle sharing the counters of this monitor.
    #[must_use]
    pub fn handle(&self) -> MonitorHandle {
        self.handle.clone()
    }
}

impl Stage for BferMonitor {
    fn tasks(&self) -> Vec<TaskSpec> {
        let k = self.handle.n_bits_per_frame;
        vec![TaskSpec::new(
            "check_errors",
            vec![
                SocketSpec::input("U", ElementType::Bit, k),
                SocketSpec::input("V", ElementType::Bit, k),
            ],
        )]
    }

    fn execute(&mut self, _task: usize, io: &TaskIo<'_>) -> Result<(), Error> {
        let n_errors = utils::error_count(&*io.bits(V)?, &*io.bits(U)?) as u64;
        let counters = &self.handle.counters;
        if n_errors > 0 {
            counters.n_bit_errors.fetch_add(n_errors, Ordering::Relaxed);
            counters.n_frame_errors.fetch_add(1, Ordering::Relaxed);
        }
        counters.n_frames.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn reset(&mut self) {
        self.handle.reset();
    }
}

#[cfg(test)]
mod tests_of_monitor {
    use float_eq::assert_float_eq;

    use super::*;
    use crate::{Bit, Graph, Module, Pipeline, TaskRef};

    /// Stage emitting fixed reference and decoded frames, one pair per execution
    struct Frames {
        frames: Vec<(Vec<Bit>, Vec<Bit>)>,
        next: usize,
    }

    impl Stage for Frames {
        fn tasks(&self) -> Vec<TaskSpec> {
            let k = self.frames[0].0.len();
            vec![TaskSpec::new(
                "emit",
                vec![
                    SocketSpec::output("U", ElementType::Bit, k),
                    SocketSpec::output("V", ElementType::Bit, k),
                ],
            )]
        }

        fn execute(&mut self, _task: usize, io: &TaskIo<'_>) -> Result<(), Error> {
            let (u, v) = &self.frames[self.next % self.frames.len()];
            io.bits_mut(0)?.copy_from_slice(u);
            io.bits_mut(1)?.copy_from_slice(v);
            self.next += 1;
            Ok(())
        }
    }

    fn monitored(frames: Vec<(Vec<Bit>, Vec<Bit>)>, fe: u64, max: u64) -> (Pipeline, MonitorHandle) {
        let monitor = BferMonitor::new(frames[0].0.len(), fe, max).unwrap();
        let handle = monitor.handle();
        let mut graph = Graph::new();
        let src = graph
            .add(Module::new("src", Frames { frames, next: 0 }))
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
        let sequence = vec![
            TaskRef { module: src, task: 0 },
            TaskRef { module: mnt, task: 0 },
        ];
        (graph.compile(sequence).unwrap(), handle)
    }

    #[test]
    fn test_new() {
        assert!(BferMonitor::new(0, 10, 0).is_err());
        assert!(BferMonitor::new(8, 0, 0).is_err());
        assert!(BferMonitor::new(8, 0, 10).is_ok());
    }

    #[test]
    fn test_limit_reached_on_exact_frame() {
        use Bit::{One, Zero};
        // Every third frame has one bit error
        let good = (vec![Zero, One], vec![Zero, One]);
        let bad = (vec![Zero, One], vec![One, One]);
        let (mut pipeline, handle) = monitored(vec![good.clone(), good, bad], 3, 0);
        let mut frames_run = 0;
        while !handle.limit_achieved() {
            pipeline.execute_frame().unwrap();
            frames_run += 1;
            let snapshot = handle.snapshot();
            if frames_run < 9 {
                assert!(snapshot.n_frame_errors < 3);
                assert_eq!(handle.state(), MonitorState::Running);
            }
        }
        assert_eq!(frames_run, 9);
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.n_frames, 9);
        assert_eq!(snapshot.n_frame_errors, 3);
        assert_eq!(snapshot.n_bit_errors, 3);
        assert_float_eq!(snapshot.fer(), 1.0 / 3.0, abs <= 1e-12);
        assert_float_eq!(snapshot.ber(), 1.0 / 6.0, abs <= 1e-12);
    }

    #[test]
    fn test_frame_limit() {
        let frame = (vec![Bit::One; 4], vec![Bit::One; 4]);
        let (mut pipeline, handle) = monitored(vec![frame], 10, 5);
        while !handle.limit_achieved() {
            pipeline.execute_frame().unwrap();
        }
        assert_eq!(handle.snapshot().n_frames, 5);
        assert_eq!(handle.snapshot().n_frame_errors, 0);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let frame = (vec![Bit::One; 4], vec![Bit::Zero; 4]);
        let (mut pipeline, handle) = monitored(vec![frame], 1, 0);
        // Reset before any frame
        pipeline.reset();
        assert_eq!(handle.snapshot(), MonitorSnapshot {
            n_bits_per_frame: 4,
            ..MonitorSnapshot::default()
        });
        pipeline.execute_frame().unwrap();
        assert_eq!(handle.state(), MonitorState::LimitReached);
        for _ in 0 .. 2 {
            pipeline.reset();
            assert_eq!(handle.state(), MonitorState::Running);
            assert_eq!(handle.snapshot().n_frames, 0);
            assert_eq!(handle.snapshot().n_bit_errors, 0);
            assert_eq!(handle.snapshot().n_frame_errors, 0);
        }
    }

    #[test]
    fn test_snapshot_rates_empty() {
        let snapshot = MonitorSnapshot::default();
        assert_float_eq!(snapshot.ber(), 0.0, abs <= 0.0);
        assert_float_eq!(snapshot.fer(), 0.0, abs <= 0.0);
    }
}
