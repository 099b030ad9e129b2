//! This program simulates the BER-versus-Eb/N0 and FER-versus-Eb/N0 performance of a polar or
//! repetition code, with optional CRC and puncturing, over a BPSK-AWGN channel. Simulation
//! parameters are specified on the command line; results are printed as a table and can also be
//! saved to a JSON file. Pressing Ctrl+C ends the sweep after the current frame, and the
//! interrupted point is still reported. Pressing it again, or outside the sweep, exits at once.
//!
//! Build the executable with `cargo build --release` and then run `./target/release/fecsim -h`
//! for help on the command-line interface. Set `RUST_LOG` (for instance `RUST_LOG=info`) to see
//! log messages on standard error.

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

use anyhow::Result;
use clap::{crate_name, crate_version, value_parser, Arg, ArgAction, ArgMatches, Command};
use fecsim::chain::{self, CodeType, SimParams};
use fecsim::Interrupt;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Exit status of the process when Ctrl+C is not handled by a running sweep
const SIGINT_EXIT_CODE: i32 = 130;

/// Main function
fn main() -> Result<()> {
    let timer = Instant::now();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let matches = command_line_parser().get_matches();
    let params = sim_params(&matches);
    chain::check_sim_params(&params)?;
    let interrupt = Interrupt::new();
    let handler = interrupt.clone();
    ctrlc::set_handler(move || {
        if forward_ctrl_c(&handler) {
            eprintln!("\nInterrupted, finishing current frame");
        } else {
            std::process::exit(SIGINT_EXIT_CODE);
        }
    })?;
    let json_filename = json_filename_from_matches(&matches);
    let result = chain::run_bfer_sims(&params, &interrupt, json_filename.as_deref());
    interrupt.disarm();
    result?;
    eprintln!("Elapsed time: {:.3?}", timer.elapsed());
    Ok(())
}

/// Passes Ctrl+C on to a running sweep.
///
/// Returns `false` if no sweep is running or an earlier request is still pending, in which case
/// the process must exit.
fn forward_ctrl_c(interrupt: &Interrupt) -> bool {
    !interrupt.is_set() && interrupt.trigger()
}

/// Returns command line parser.
fn command_line_parser() -> Command {
    Command::new(crate_name!())
        .version(crate_version!())
        .about("Evaluates the BER/FER performance of a coded BPSK-AWGN link")
        .arg(num_info_bits())
        .arg(code_type())
        .arg(code_length())
        .arg(crc_poly())
        .arg(crc_width())
        .arg(puncture_pattern())
        .arg(ebn0_min_db())
        .arg(ebn0_max_db())
        .arg(ebn0_step_db())
        .arg(max_frame_errors())
        .arg(max_frames())
        .arg(seed())
        .arg(fast())
        .arg(stats())
        .arg(debug_limit())
        .arg(progress_ms())
        .arg(json_filename())
}

/// Returns argument for number of information bits per frame.
fn num_info_bits() -> Arg {
    Arg::new("num_info_bits")
        .short('K')
        .value_parser(value_parser!(usize))
        .default_value("32")
        .help("Number of information bits per frame")
}

/// Returns argument for code type.
fn code_type() -> Arg {
    Arg::new("code_type")
        .short('c')
        .value_parser(["polar", "repetition"])
        .default_value("polar")
        .help("Channel code")
}

/// Returns argument for codeword length.
fn code_length() -> Arg {
    Arg::new("code_length")
        .short('N')
        .value_parser(value_parser!(usize))
        .default_value("128")
        .help("Codeword length before puncturing")
}

/// Returns argument for CRC polynomial.
fn crc_poly() -> Arg {
    Arg::new("crc_poly")
        .long("crc-poly")
        .value_parser(value_parser!(u64))
        .default_value("7")
        .help("CRC generator polynomial without its leading term")
}

/// Returns argument for CRC width.
fn crc_width() -> Arg {
    Arg::new("crc_width")
        .long("crc-width")
        .value_parser(value_parser!(usize))
        .default_value("8")
        .help("CRC width (0 for no CRC)")
}

/// Returns argument for puncturing pattern.
fn puncture_pattern() -> Arg {
    Arg::new("puncture_pattern")
        .short('P')
        .default_value("1")
        .help("Periodic puncturing pattern of 0 (drop) and 1 (keep)")
}

/// Returns argument for first Eb/N0 (dB).
fn ebn0_min_db() -> Arg {
    Arg::new("ebn0_min_db")
        .short('m')
        .value_parser(value_parser!(f64))
        .allow_negative_numbers(true)
        .default_value("0.0")
        .help("First Eb/N0 (dB)")
}

/// Returns argument for upper Eb/N0 bound (dB).
fn ebn0_max_db() -> Arg {
    Arg::new("ebn0_max_db")
        .short('M')
        .value_parser(value_parser!(f64))
        .allow_negative_numbers(true)
        .default_value("4.0")
        .help("Upper Eb/N0 bound (dB, excluded)")
}

/// Returns argument for Eb/N0 step (dB).
fn ebn0_step_db() -> Arg {
    Arg::new("ebn0_step_db")
        .short('s')
        .value_parser(value_parser!(f64))
        .allow_negative_numbers(true)
        .default_value("1.0")
        .help("Eb/N0 step (dB)")
}

/// Returns argument for frame-error target.
fn max_frame_errors() -> Arg {
    Arg::new("max_frame_errors")
        .short('e')
        .value_parser(value_parser!(u64))
        .default_value("100")
        .help("Number of frame errors after which an Eb/N0 point ends (0 for no target)")
}

/// Returns argument for maximum number of frames.
fn max_frames() -> Arg {
    Arg::new("max_frames")
        .short('n')
        .value_parser(value_parser!(u64))
        .default_value("0")
        .help("Number of frames after which an Eb/N0 point ends (0 for no limit)")
}

/// Returns argument for seed.
fn seed() -> Arg {
    Arg::new("seed")
        .short('S')
        .value_parser(value_parser!(u64))
        .default_value("0")
        .help("Seed of the random number generators")
}

/// Returns argument for fast mode.
fn fast() -> Arg {
    Arg::new("fast")
        .long("fast")
        .action(ArgAction::SetTrue)
        .help("Skip socket checks around task executions")
}

/// Returns argument for task statistics.
fn stats() -> Arg {
    Arg::new("stats")
        .long("stats")
        .action(ArgAction::SetTrue)
        .help("Print task timing statistics")
}

/// Returns argument for debug limit.
fn debug_limit() -> Arg {
    Arg::new("debug_limit")
        .short('d')
        .value_parser(value_parser!(usize))
        .default_value("0")
        .help("Log up to this many elements of each socket at trace level (0 to disable)")
}

/// Returns argument for status line period.
fn progress_ms() -> Arg {
    Arg::new("progress_ms")
        .short('p')
        .value_parser(value_parser!(u64))
        .default_value("0")
        .help("Refresh period of the status line in milliseconds (0 to disable)")
}

/// Returns argument for name of JSON file to which results must be saved.
fn json_filename() -> Arg {
    Arg::new("json_filename")
        .short('f')
        .help("Name of JSON file to which results must be saved")
}

/// Returns simulation parameters based on command-line arguments.
fn sim_params(matches: &ArgMatches) -> SimParams {
    // OK to unwrap: All command-line arguments read here have default values, so an error cannot
    // occur in any of the lookups below.
    SimParams {
        num_info_bits: *matches.get_one("num_info_bits").unwrap(),
        code_type: code_type_from_matches(matches),
        code_length: *matches.get_one("code_length").unwrap(),
        crc_poly: *matches.get_one("crc_poly").unwrap(),
        crc_width: *matches.get_one("crc_width").unwrap(),
        puncture_pattern: matches
            .get_one::<String>("puncture_pattern")
            .unwrap()
            .to_string(),
        ebn0_min_db: *matches.get_one("ebn0_min_db").unwrap(),
        ebn0_max_db: *matches.get_one("ebn0_max_db").unwrap(),
        ebn0_step_db: *matches.get_one("ebn0_step_db").unwrap(),
        max_frame_errors: *matches.get_one("max_frame_errors").unwrap(),
        max_frames: *matches.get_one("max_frames").unwrap(),
        seed: *matches.get_one("seed").unwrap(),
        fast: matches.get_flag("fast"),
        stats: matches.get_flag("stats"),
        debug_limit: *matches.get_one("debug_limit").unwrap(),
        progress_ms: *matches.get_one("progress_ms").unwrap(),
    }
}

/// Returns channel code.
fn code_type_from_matches(matches: &ArgMatches) -> CodeType {
    match matches.get_one::<String>("code_type").unwrap().as_str() {
        "repetition" => CodeType::Repetition,
        _ => CodeType::Polar,
    }
}

/// Returns name of JSON file to which simulation results must be saved, if any.
fn json_filename_from_matches(matches: &ArgMatches) -> Option<String> {
    matches.get_one::<String>("json_filename").cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command_line_for_test() -> Vec<&'static str> {
        vec![
            crate_name!(),
            "-K",
            "40",
            "-c",
            "repetition",
            "-N",
            "144",
            "--crc-poly",
            "1",
            "--crc-width",
            "8",
            "-P",
            "110",
            "-m",
            "-1.0",
            "-M",
            "2.0",
            "-s",
            "0.5",
            "-e",
            "50",
            "-n",
            "1000",
            "-S",
            "7",
            "--stats",
            "-f",
            "results.json",
        ]
    }

    #[test]
    fn test_command_line_parser() {
        assert!(command_line_parser()
            .try_get_matches_from(command_line_for_test())
            .is_ok());
        assert!(command_line_parser()
            .try_get_matches_from([crate_name!(), "-c", "turbo"])
            .is_err());
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_sim_params() {
        let matches = command_line_parser().get_matches_from(command_line_for_test());
        let params = sim_params(&matches);
        assert_eq!(params.num_info_bits, 40);
        assert_eq!(params.code_type, CodeType::Repetition);
        assert_eq!(params.code_length, 144);
        assert_eq!(params.crc_poly, 1);
        assert_eq!(params.crc_width, 8);
        assert_eq!(params.puncture_pattern, "110");
        assert_eq!(params.ebn0_min_db, -1.0);
        assert_eq!(params.ebn0_max_db, 2.0);
        assert_eq!(params.ebn0_step_db, 0.5);
        assert_eq!(params.max_frame_errors, 50);
        assert_eq!(params.max_frames, 1000);
        assert_eq!(params.seed, 7);
        assert!(!params.fast);
        assert!(params.stats);
        assert_eq!(params.debug_limit, 0);
        assert!(chain::check_sim_params(&params).is_ok());
        assert_eq!(
            json_filename_from_matches(&matches).as_deref(),
            Some("results.json")
        );
    }

    #[test]
    fn test_forward_ctrl_c() {
        let interrupt = Interrupt::new();
        // Outside a sweep
        assert!(!forward_ctrl_c(&interrupt));
        interrupt.arm();
        assert!(forward_ctrl_c(&interrupt));
        assert!(interrupt.is_set());
        // Second press while the first is pending
        assert!(!forward_ctrl_c(&interrupt));
        interrupt.disarm();
        assert!(!forward_ctrl_c(&interrupt));
    }

    #[test]
    fn test_defaults() {
        let matches = command_line_parser().get_matches_from([crate_name!()]);
        assert_eq!(sim_params(&matches), SimParams::default());
        assert_eq!(json_filename_from_matches(&matches), None);
    }
}
