//! # Bit/frame error rate simulation of a coded BPSK-AWGN link
//!
//! The standard chain is built from a [`SimParams`] set:
//!
//! ```text
//! src::generate -> crc::build -> cdc::encode -> pct::puncture -> mdm::modulate -> chn::add_noise
//!   -> mdm::demodulate -> pct::depuncture -> cdc::decode_siho -> crc::extract -> mnt::check_errors
//! ```
//!
//! with the reference input of the monitor bound directly to the source. Results of a sweep can
//! be saved to a JSON file together with the parameters that produced them.

use std::fs::File;
use std::io::BufWriter;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::TaskStatsRow;
use crate::report::{self, Terminal};
use crate::task::TaskMode;
use crate::{
    AwgnChannel, BferMonitor, BpskModem, Crc, Error, Graph, Interrupt, Module, MonitorHandle,
    Pipeline, PolarCodec, Puncturer, RepetitionCodec, Reporter, SnrReport, Source, Sweep,
    SweepRange,
};

/// Enumeration of channel codes
#[derive(Clone, Eq, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub enum CodeType {
    /// Polar code with successive-cancellation decoding
    Polar,
    /// Interleaved repetition code
    Repetition,
}

/// Parameters of a simulation
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct SimParams {
    /// Number of information bits per frame
    pub num_info_bits: usize,
    /// Channel code
    pub code_type: CodeType,
    /// Codeword length (before puncturing)
    pub code_length: usize,
    /// CRC generator polynomial, leading term omitted
    pub crc_poly: u64,
    /// CRC width (`0` for no CRC)
    pub crc_width: usize,
    /// Puncturing pattern of `0` (drop) and `1` (keep) characters
    pub puncture_pattern: String,
    /// First Eb/N0 (dB)
    pub ebn0_min_db: f64,
    /// Upper Eb/N0 bound (dB, excluded)
    pub ebn0_max_db: f64,
    /// Eb/N0 step (dB)
    pub ebn0_step_db: f64,
    /// Number of frame errors after which an SNR point ends (`0` for no target)
    pub max_frame_errors: u64,
    /// Number of frames after which an SNR point ends (`0` for no limit)
    pub max_frames: u64,
    /// Seed of the source (the channel and the interleaver use the next two seeds)
    pub seed: u64,
    /// Skip socket shape checks around task executions
    pub fast: bool,
    /// Collect and print task timing statistics
    pub stats: bool,
    /// Log socket contents of every task (at most this many elements, `0` to disable)
    pub debug_limit: usize,
    /// Period of the status line refresh in milliseconds (`0` to disable)
    pub progress_ms: u64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            num_info_bits: 32,
            code_type: CodeType::Polar,
            code_length: 128,
            crc_poly: 0x07,
            crc_width: 8,
            puncture_pattern: "1".to_string(),
            ebn0_min_db: 0.0,
            ebn0_max_db: 4.0,
            ebn0_step_db: 1.0,
            max_frame_errors: 100,
            max_frames: 0,
            seed: 0,
            fast: false,
            stats: false,
            debug_limit: 0,
            progress_ms: 0,
        }
    }
}

impl SimParams {
    /// Returns number of bits at the encoder input.
    #[must_use]
    pub fn num_encoded_bits(&self) -> usize {
        self.num_info_bits + self.crc_width
    }
}

/// Checks validity of simulation parameters.
///
/// # Errors
///
/// Returns an error if a parameter is invalid on its own or inconsistent with the others,
/// including a puncturing pattern leaving fewer transmitted bits than information bits.
#[allow(clippy::cast_precision_loss)]
pub fn check_sim_params(params: &SimParams) -> Result<(), Error> {
    if params.num_info_bits == 0 {
        return Err(Error::InvalidInput(
            "Number of information bits cannot be zero".to_string(),
        ));
    }
    if params.max_frame_errors == 0 && params.max_frames == 0 {
        return Err(Error::InvalidInput(
            "Either the frame-error target or the maximum number of frames must be positive"
                .to_string(),
        ));
    }
    SweepRange::new(params.ebn0_min_db, params.ebn0_max_db, params.ebn0_step_db)?;
    Crc::new(params.num_info_bits, params.crc_poly, params.crc_width)?;
    let k = params.num_encoded_bits();
    let n = params.code_length;
    match params.code_type {
        CodeType::Polar => {
            PolarCodec::new(k, n)?;
        }
        CodeType::Repetition => {
            if n == 0 || n % k != 0 {
                return Err(Error::InvalidInput(format!(
                    "Repetition codeword length ({n}) must be a positive multiple of the number \
                     of encoded bits ({k})"
                )));
            }
        }
    }
    let pattern = Puncturer::parse_pattern(&params.puncture_pattern)?;
    let n_p = Puncturer::new(n, &pattern)?.n_punctured();
    let code_rate = params.num_info_bits as f64 / n_p as f64;
    if code_rate > 1.0 {
        return Err(Error::InvalidInput(format!(
            "Puncturing pattern {} leaves {n_p} transmitted bits for {} information bits (code \
             rate {code_rate:.4} > 1)",
            params.puncture_pattern, params.num_info_bits
        )));
    }
    Ok(())
}

/// Bound and compiled standard chain
#[derive(Debug)]
pub struct Chain {
    /// Pipeline running one frame through the chain
    pub pipeline: Pipeline,
    /// Counters of the monitor
    pub monitor: MonitorHandle,
    /// Ratio of information bits to transmitted bits
    pub code_rate: f64,
}

/// Returns the standard chain for given parameters, with interleavers initialized and task
/// modes set.
///
/// # Errors
///
/// Returns an error if the parameters are invalid.
#[allow(clippy::cast_precision_loss)]
pub fn build_chain(params: &SimParams) -> Result<Chain, Error> {
    check_sim_params(params)?;
    let k = params.num_info_bits;
    let n = params.code_length;
    let crc = Crc::new(k, params.crc_poly, params.crc_width)?;
    let puncturer = Puncturer::new(n, &Puncturer::parse_pattern(&params.puncture_pattern)?)?;
    let n_p = puncturer.n_punctured();
    let monitor = BferMonitor::new(k, params.max_frame_errors, params.max_frames)?;
    let handle = monitor.handle();

    let mut graph = Graph::new();
    let src = graph.add(Module::new("src", Source::new(k, params.seed)))?;
    let crc = graph.add(Module::new("crc", crc))?;
    let cdc = match params.code_type {
        CodeType::Polar => {
            graph.add(Module::new("cdc", PolarCodec::new(params.num_encoded_bits(), n)?))?
        }
        CodeType::Repetition => {
            let k_enc = params.num_encoded_bits();
            let codec = RepetitionCodec::new(k_enc, n / k_enc, params.seed.wrapping_add(2))?;
            graph.add(Module::new("cdc", codec))?
        }
    };
    let pct = graph.add(Module::new("pct", puncturer))?;
    let mdm = graph.add(Module::new("mdm", BpskModem::new(n_p)))?;
    let chn = graph.add(Module::new("chn", AwgnChannel::new(n_p, params.seed.wrapping_add(1))))?;
    let mnt = graph.add(Module::new("mnt", monitor))?;

    let edges = [
        ((src, "generate", "U_K"), (crc, "build", "U_K1")),
        ((crc, "build", "U_K2"), (cdc, "encode", "U_K")),
        ((cdc, "encode", "X_N"), (pct, "puncture", "X_N1")),
        ((pct, "puncture", "X_N2"), (mdm, "modulate", "X_N1")),
        ((mdm, "modulate", "X_N2"), (chn, "add_noise", "X_N")),
        ((chn, "add_noise", "Y_N"), (mdm, "demodulate", "Y_N1")),
        ((mdm, "demodulate", "Y_N2"), (pct, "depuncture", "Y_N1")),
        ((pct, "depuncture", "Y_N2"), (cdc, "decode_siho", "Y_N")),
        ((cdc, "decode_siho", "V_K"), (crc, "extract", "V_K1")),
        ((crc, "extract", "V_K2"), (mnt, "check_errors", "V")),
        ((src, "generate", "U_K"), (mnt, "check_errors", "U")),
    ];
    for ((pm, pt, ps), (cm, ct, cs)) in edges {
        graph.bind(graph.socket(pm, pt, ps)?, graph.socket(cm, ct, cs)?)?;
    }

    let mut pipeline = graph.compile_topological()?;
    let n_interleavers = pipeline.init_interleavers()?;
    tracing::debug!(
        "built chain {} with {n_interleavers} interleaver(s)",
        pipeline.sequence_names().join(" -> ")
    );
    let mode = if params.fast {
        TaskMode::Fast
    } else {
        TaskMode::Checked
    };
    pipeline.configure_tasks(|task| {
        task.set_mode(mode);
        task.set_stats(params.stats);
        task.set_debug(params.debug_limit > 0, params.debug_limit);
    });
    Ok(Chain {
        pipeline,
        monitor: handle,
        code_rate: k as f64 / n_p as f64,
    })
}

/// Simulation parameters and results, as saved to JSON
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct SimResults {
    /// Parameters of the simulation
    pub params: SimParams,
    /// Code rate used for the noise computation
    pub code_rate: f64,
    /// Results of each SNR point run
    pub reports: Vec<SnrReport>,
    /// Task timing statistics (empty unless enabled)
    pub task_stats: Vec<TaskStatsRow>,
}

/// Runs an Eb/N0 sweep over the standard chain, with results passed to `reporter`.
///
/// # Errors
///
/// Returns an error if the parameters are invalid or a frame fails to execute.
pub fn simulate(
    params: &SimParams,
    interrupt: &Interrupt,
    reporter: &mut dyn Reporter,
) -> Result<SimResults, Error> {
    let mut chain = build_chain(params)?;
    sweep_chain(params, &mut chain, interrupt, reporter)
}

fn sweep_chain(
    params: &SimParams,
    chain: &mut Chain,
    interrupt: &Interrupt,
    reporter: &mut dyn Reporter,
) -> Result<SimResults, Error> {
    let range = SweepRange::new(params.ebn0_min_db, params.ebn0_max_db, params.ebn0_step_db)?;
    let sweep = Sweep::new(range, chain.code_rate, 1)?;
    let reports = sweep.run(&mut chain.pipeline, &chain.monitor, interrupt, reporter)?;
    Ok(SimResults {
        params: params.clone(),
        code_rate: chain.code_rate,
        reports,
        task_stats: chain.pipeline.task_stats(),
    })
}

/// Runs an Eb/N0 sweep over the standard chain, printing results to the terminal and saving
/// them to a JSON file.
///
/// # Parameters
///
/// - `params`: Simulation parameters.
///
/// - `interrupt`: Token through which the sweep can be cut short.
///
/// - `json_filename`: Name of the JSON file to which the results are saved, if any.
///
/// # Errors
///
/// Returns an error if the parameters are invalid, a frame fails to execute, or the results
/// cannot be saved.
pub fn run_bfer_sims(
    params: &SimParams,
    interrupt: &Interrupt,
    json_filename: Option<&str>,
) -> Result<SimResults, Error> {
    let mut chain = build_chain(params)?;
    let mut terminal = if params.progress_ms > 0 {
        Terminal::with_progress(
            chain.monitor.clone(),
            Duration::from_millis(params.progress_ms),
        )
    } else {
        Terminal::new()
    };
    let results = sweep_chain(params, &mut chain, interrupt, &mut terminal)?;
    drop(terminal);
    if params.stats {
        report::print_task_stats(&results.task_stats);
    }
    if let Some(filename) = json_filename {
        save_results(&results, filename)?;
    }
    Ok(results)
}

/// Saves simulation results to a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn save_results(results: &SimResults, json_filename: &str) -> Result<(), Error> {
    let writer = BufWriter::new(File::create(json_filename)?);
    serde_json::to_writer_pretty(writer, results)?;
    tracing::info!("saved results to {json_filename}");
    Ok(())
}

#[cfg(test)]
mod tests_of_chain {
    use super::*;
    use crate::SweepInfo;

    #[derive(Default)]
    struct Quiet;

    impl Reporter for Quiet {
        fn legend(&mut self, _info: &SweepInfo) {}

        fn final_report(&mut self, _report: &SnrReport) {}
    }

    fn polar_params() -> SimParams {
        SimParams {
            num_info_bits: 16,
            code_length: 32,
            ..SimParams::default()
        }
    }

    fn repetition_params() -> SimParams {
        SimParams {
            num_info_bits: 8,
            code_type: CodeType::Repetition,
            code_length: 24,
            crc_width: 0,
            crc_poly: 0,
            puncture_pattern: "110".to_string(),
            ..SimParams::default()
        }
    }

    #[test]
    fn test_check_sim_params() {
        assert!(check_sim_params(&SimParams::default()).is_ok());
        assert!(check_sim_params(&repetition_params()).is_ok());
        let invalid = [
            SimParams {
                num_info_bits: 0,
                ..SimParams::default()
            },
            SimParams {
                max_frame_errors: 0,
                max_frames: 0,
                ..SimParams::default()
            },
            SimParams {
                ebn0_step_db: 0.0,
                ..SimParams::default()
            },
            SimParams {
                crc_poly: 0x1ff,
                ..SimParams::default()
            },
            SimParams {
                code_length: 96,
                ..SimParams::default()
            },
            SimParams {
                num_info_bits: 128,
                ..SimParams::default()
            },
            SimParams {
                puncture_pattern: "00".to_string(),
                ..SimParams::default()
            },
            SimParams {
                puncture_pattern: "1a".to_string(),
                ..SimParams::default()
            },
            SimParams {
                code_length: 20,
                ..repetition_params()
            },
            SimParams {
                puncture_pattern: "00001".to_string(),
                ..SimParams::default()
            },
        ];
        for params in invalid {
            assert!(check_sim_params(&params).is_err(), "{params:?}");
            assert!(build_chain(&params).is_err(), "{params:?}");
        }
        // Rate exactly 1 is accepted
        let params = SimParams {
            num_info_bits: 8,
            code_type: CodeType::Repetition,
            code_length: 16,
            crc_width: 0,
            crc_poly: 0,
            puncture_pattern: "10".to_string(),
            ..SimParams::default()
        };
        assert!(check_sim_params(&params).is_ok());
        assert!((build_chain(&params).unwrap().code_rate - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_build_chain() {
        let chain = build_chain(&polar_params()).unwrap();
        assert_eq!(
            chain.pipeline.sequence_names(),
            [
                "src::generate",
                "crc::build",
                "cdc::encode",
                "pct::puncture",
                "mdm::modulate",
                "chn::add_noise",
                "mdm::demodulate",
                "pct::depuncture",
                "cdc::decode_siho",
                "crc::extract",
                "mnt::check_errors",
            ]
        );
        assert_eq!(chain.pipeline.bindings().len(), 11);
        assert!((chain.code_rate - 0.5).abs() < 1e-12);
        let chain = build_chain(&repetition_params()).unwrap();
        assert!((chain.code_rate - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_simulate_polar() {
        let params = SimParams {
            ebn0_min_db: -5.0,
            ebn0_max_db: 16.0,
            ebn0_step_db: 20.0,
            max_frame_errors: 10,
            max_frames: 300,
            ..polar_params()
        };
        let results = simulate(&params, &Interrupt::new(), &mut Quiet).unwrap();
        assert_eq!(results.reports.len(), 2);
        // Hopeless channel: the frame-error target ends the point
        let low = &results.reports[0];
        assert_eq!(low.counters.n_frame_errors, 10);
        assert!(low.counters.n_frames < 300);
        // Clean channel: the frame limit ends the point
        let high = &results.reports[1];
        assert_eq!(high.counters.n_frames, 300);
        assert!(high.fer < 0.03);
        assert!(results.task_stats.is_empty());
    }

    #[test]
    fn test_simulate_repetition_with_stats() {
        let params = SimParams {
            ebn0_min_db: 10.0,
            ebn0_max_db: 10.5,
            max_frames: 200,
            fast: true,
            stats: true,
            puncture_pattern: "1".to_string(),
            ..repetition_params()
        };
        let results = simulate(&params, &Interrupt::new(), &mut Quiet).unwrap();
        assert_eq!(results.reports.len(), 1);
        assert_eq!(results.reports[0].counters.n_frames, 200);
        assert!(results.reports[0].fer < 0.05);
        assert_eq!(results.task_stats.len(), 11);
        assert!(results.task_stats.iter().all(|row| row.stats.n_calls == 200));
    }

    #[test]
    fn test_same_seed_same_results() {
        let params = SimParams {
            ebn0_min_db: 1.0,
            ebn0_max_db: 1.5,
            max_frames: 100,
            max_frame_errors: 0,
            ..polar_params()
        };
        let first = simulate(&params, &Interrupt::new(), &mut Quiet).unwrap();
        let second = simulate(&params, &Interrupt::new(), &mut Quiet).unwrap();
        assert_eq!(first.reports[0].counters, second.reports[0].counters);
    }

    #[test]
    fn test_run_bfer_sims_saves_json() {
        let params = SimParams {
            ebn0_min_db: 2.0,
            ebn0_max_db: 2.5,
            max_frames: 20,
            ..polar_params()
        };
        let path =
            std::env::temp_dir().join(format!("fecsim_results_{}.json", std::process::id()));
        let filename = path.to_str().unwrap();
        let results = run_bfer_sims(&params, &Interrupt::new(), Some(filename)).unwrap();
        let saved: serde_json::Value =
            serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(saved["params"]["num_info_bits"], 16);
        assert_eq!(saved["reports"].as_array().unwrap().len(), 1);
        assert_eq!(
            saved["reports"][0]["counters"]["n_frames"],
            results.reports[0].counters.n_frames
        );
    }
}
