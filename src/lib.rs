//! This crate implements a dataflow engine for simulating the bit error rate (BER) and frame error
//! rate (FER) of digital communication chains. Processing stages are wrapped in modules exposing
//! tasks with typed, sized sockets; output sockets are bound to input sockets to form a graph,
//! which is compiled into a pipeline executing each task once per frame. An Eb/N0 sweep drives the
//! pipeline, running frames at each point until enough frame errors have been observed.
//!
//! The crate also provides the Gaussian-approximation frozen-bit generator of polar codes, and a
//! few stages (source, CRC, polar and repetition codecs, puncturer, BPSK modem, AWGN channel,
//! error monitor) from which the standard simulation chain of the [`chain`] module is built.
//!
//! # Examples
//!
//! ```
//! use fecsim::{BferMonitor, Graph, Interrupt, Module, Source, Sweep, SweepRange, Terminal};
//!
//! let monitor = BferMonitor::new(16, 10, 100)?;
//! let handle = monitor.handle();
//! let mut graph = Graph::new();
//! let src = graph.add(Module::new("src", Source::new(16, 0)))?;
//! let mnt = graph.add(Module::new("mnt", monitor))?;
//! graph.bind(graph.socket(src, "generate", "U_K")?, graph.socket(mnt, "check_errors", "U")?)?;
//! graph.bind(graph.socket(src, "generate", "U_K")?, graph.socket(mnt, "check_errors", "V")?)?;
//! let mut pipeline = graph.compile_topological()?;
//! let sweep = Sweep::new(SweepRange::new(0.0, 1.0, 0.5)?, 1.0, 1)?;
//! let reports = sweep.run(&mut pipeline, &handle, &Interrupt::new(), &mut Terminal::new())?;
//! assert_eq!(reports.len(), 2);
//! assert_eq!(reports[0].counters.n_frames, 100);
//! assert_eq!(reports[0].counters.n_frame_errors, 0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(
    clippy::complexity,
    clippy::pedantic,
    clippy::perf,
    clippy::style,
    clippy::suspicious,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_allocation,
    unused_import_braces,
    unused_qualifications
)]

pub mod chain;
mod channel;
mod codec;
mod common;
mod crc;
pub mod frozen;
pub mod graph;
mod interleaver;
mod interrupt;
mod modem;
mod module;
mod monitor;
mod noise;
pub mod pipeline;
mod puncturer;
pub mod report;
pub mod socket;
mod source;
mod sweep;
pub mod task;
pub mod utils;

pub use channel::AwgnChannel;
pub use codec::{polar_transform, PolarCodec, RepetitionCodec};
pub use common::{Bit, Error};
pub use crc::Crc;
pub use frozen::{frozen_bits, FrozenBits, FrozenBitsGenerator};
pub use graph::{Binding, Graph, ModuleId, SocketRef, TaskRef};
pub use interleaver::Interleaver;
pub use interrupt::Interrupt;
pub use modem::BpskModem;
pub use module::{Module, Stage};
pub use monitor::{BferMonitor, MonitorHandle, MonitorSnapshot, MonitorState};
pub use noise::{ebn0_to_esn0, esn0_to_sigma, Noise};
pub use pipeline::Pipeline;
pub use puncturer::Puncturer;
pub use report::{Reporter, Terminal};
pub use source::Source;
pub use sweep::{SnrReport, Sweep, SweepInfo, SweepRange};
