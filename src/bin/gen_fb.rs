//! This program prints the frozen-bit positions of a polar code at one or more Eb/N0 values, one
//! line per Eb/N0 with `1` at frozen positions and `0` at information positions. The code rate
//! used to derive the noise level is `K / N`. Frozen-bit sets are computed in parallel and can
//! also be saved to a JSON file.

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

use std::fs::File;
use std::io::BufWriter;

use anyhow::Result;
use clap::{value_parser, Arg, ArgMatches, Command};
use fecsim::{FrozenBits, FrozenBitsGenerator, Noise};
use itertools::Itertools;
use rayon::prelude::*;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Frozen-bit set for one Eb/N0
#[derive(Clone, PartialEq, Debug, Serialize)]
struct FrozenBitsAtSnr {
    noise: Noise,
    frozen_bits: FrozenBits,
}

/// Main function
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let matches = command_line_parser().get_matches();
    // OK to unwrap: All these arguments have default values.
    let k: usize = *matches.get_one("num_info_bits").unwrap();
    let n: usize = *matches.get_one("code_length").unwrap();
    let all_ebn0_db = all_ebn0_db_from_matches(&matches);
    let all_sets = frozen_bits_at_all_snr(k, n, &all_ebn0_db)?;
    for set in &all_sets {
        println!(
            "{:>6.2} : {}",
            set.noise.ebn0_db,
            set.frozen_bits
                .frozen
                .iter()
                .map(|&f| u8::from(f))
                .join(" ")
        );
    }
    if let Some(json_filename) = matches.get_one::<String>("json_filename") {
        let writer = BufWriter::new(File::create(json_filename)?);
        serde_json::to_writer_pretty(writer, &all_sets)?;
    }
    Ok(())
}

/// Returns frozen-bit sets of a polar code at all given Eb/N0 values.
#[allow(clippy::cast_precision_loss)]
fn frozen_bits_at_all_snr(
    k: usize,
    n: usize,
    all_ebn0_db: &[f64],
) -> Result<Vec<FrozenBitsAtSnr>, fecsim::Error> {
    let generator = FrozenBitsGenerator::new(k, n)?;
    let code_rate = k as f64 / n as f64;
    all_ebn0_db
        .par_iter()
        .map(|&ebn0_db| -> Result<FrozenBitsAtSnr, fecsim::Error> {
            let noise = Noise::from_ebn0(ebn0_db, code_rate, 1)?;
            let mut generator = generator;
            generator.set_noise(&noise);
            Ok(FrozenBitsAtSnr {
                noise,
                frozen_bits: generator.generate()?,
            })
        })
        .collect()
}

/// Returns command line parser.
fn command_line_parser() -> Command {
    Command::new("gen_fb")
        .version(clap::crate_version!())
        .about("Prints frozen-bit positions of a polar code (Gaussian approximation)")
        .arg(
            Arg::new("num_info_bits")
                .short('K')
                .value_parser(value_parser!(usize))
                .default_value("4")
                .help("Number of information bits"),
        )
        .arg(
            Arg::new("code_length")
                .short('N')
                .value_parser(value_parser!(usize))
                .default_value("8")
                .help("Codeword length (power of two)"),
        )
        .arg(
            Arg::new("first_ebn0_db")
                .short('r')
                .value_parser(value_parser!(f64))
                .allow_negative_numbers(true)
                .default_value("2.0")
                .help("First Eb/N0 (dB)"),
        )
        .arg(
            Arg::new("ebn0_step_db")
                .short('p')
                .value_parser(value_parser!(f64))
                .allow_negative_numbers(true)
                .default_value("1.0")
                .help("Eb/N0 step (dB)"),
        )
        .arg(
            Arg::new("num_ebn0")
                .short('s')
                .value_parser(value_parser!(u32))
                .default_value("1")
                .help("Number of Eb/N0 values"),
        )
        .arg(
            Arg::new("json_filename")
                .short('f')
                .help("Name of JSON file to which frozen-bit sets must be saved"),
        )
}

/// Returns all Eb/N0 (dB) values.
fn all_ebn0_db_from_matches(matches: &ArgMatches) -> Vec<f64> {
    let first_ebn0_db: f64 = *matches.get_one("first_ebn0_db").unwrap();
    let ebn0_step_db: f64 = *matches.get_one("ebn0_step_db").unwrap();
    let num_ebn0: u32 = *matches.get_one("num_ebn0").unwrap();
    (0 .. num_ebn0)
        .map(|n| first_ebn0_db + ebn0_step_db * f64::from(n))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_all_ebn0_db() {
        let matches =
            command_line_parser().get_matches_from(["gen_fb", "-r", "-1.0", "-p", "0.5", "-s", "4"]);
        assert_eq!(all_ebn0_db_from_matches(&matches), [-1.0, -0.5, 0.0, 0.5]);
        let matches = command_line_parser().get_matches_from(["gen_fb"]);
        assert_eq!(all_ebn0_db_from_matches(&matches), [2.0]);
    }

    #[test]
    fn test_frozen_bits_at_all_snr() {
        let all_sets = frozen_bits_at_all_snr(4, 8, &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(all_sets.len(), 3);
        for (set, ebn0_db) in all_sets.iter().zip([1.0, 2.0, 3.0]) {
            assert!((set.noise.ebn0_db - ebn0_db).abs() < 1e-12);
            assert_eq!(set.frozen_bits.frozen.iter().filter(|&&f| f).count(), 4);
            assert_eq!(
                set.frozen_bits,
                fecsim::frozen_bits(8, 4, set.noise.sigma).unwrap()
            );
        }
        assert!(frozen_bits_at_all_snr(4, 6, &[1.0]).is_err());
        assert!(frozen_bits_at_all_snr(8, 8, &[1.0]).is_err());
    }
}
