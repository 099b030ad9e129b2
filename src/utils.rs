//! # Bit-level helpers shared by the stages
//!
//! The [`random_bits`] function fills a buffer with random bits; the [`add_awgn`] function adds
//! white Gaussian noise to real samples; the [`bpsk_slicer`] function slices LLR values to bits;
//! and the [`error_count`] function returns the number of errors in a sequence with respect to a
//! reference sequence.
//!
//! # Examples
//!
//! ```
//! use rand::{rngs::StdRng, SeedableRng};
//! use fecsim::{utils, Bit};
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let mut bits = vec![Bit::Zero; 40];
//! utils::random_bits(&mut bits, &mut rng);
//! let llrs: Vec<f64> = bits.iter().map(|b| 1.0 - 2.0 * f64::from(b.value())).collect();
//! assert_eq!(utils::error_count(&utils::bpsk_slicer(&llrs), &bits), 0);
//! ```

use rand::Rng;
use rand_distr::StandardNormal;

use crate::Bit;

/// Fills a buffer with independent equiprobable bits.
pub fn random_bits(bits: &mut [Bit], rng: &mut impl Rng) {
    for bit in bits {
        *bit = if rng.random_bool(0.5) { Bit::One } else { Bit::Zero };
    }
}

/// Writes `input[i] + sigma * n[i]` to `output[i]`, with `n[i]` drawn from the standard normal
/// distribution. Extra elements of the longer slice are left alone.
pub fn add_awgn(input: &[f64], sigma: f64, output: &mut [f64], rng: &mut impl Rng) {
    for (y, &x) in output.iter_mut().zip(input) {
        *y = x + sigma * rng.sample::<f64, _>(StandardNormal);
    }
}

/// Returns BPSK slicer output.
///
/// # Parameters
///
/// - `syms`: Symbols or LLR values to be sliced. Nonnegative values are mapped to `Zero`, and
///   negative values to `One`.
///
/// # Returns
///
/// - `bits_hat`: Bits obtained by slicing the given values.
#[must_use]
pub fn bpsk_slicer(syms: &[f64]) -> Vec<Bit> {
    syms.iter()
        .map(|&x| if x >= 0.0 { Bit::Zero } else { Bit::One })
        .collect()
}

/// Returns number of positions in which a sequence differs from a reference sequence.
///
/// If the sequences are of different lengths, the longer one is effectively truncated to the
/// length of the shorter one.
pub fn error_count<T: PartialEq>(seq: &[T], ref_seq: &[T]) -> usize {
    ref_seq
        .iter()
        .zip(seq.iter())
        .filter(|&(x, y)| x != y)
        .count()
}

#[cfg(test)]
mod tests_of_utils {
    use float_eq::assert_float_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use Bit::{One, Zero};

    #[test]
    fn test_random_bits() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut bits = Vec::new();
        random_bits(&mut bits, &mut rng);
        assert!(bits.is_empty());
        let num_bits = 10000;
        let mut bits = vec![Zero; num_bits];
        random_bits(&mut bits, &mut rng);
        let num_ones = bits.iter().filter(|&b| *b == One).count();
        assert!(num_ones > 9 * num_bits / 20 && num_ones < 11 * num_bits / 20);
        // Same seed, same bits
        let mut again = vec![Zero; num_bits];
        let mut first = vec![Zero; num_bits];
        random_bits(&mut again, &mut StdRng::seed_from_u64(3));
        random_bits(&mut first, &mut StdRng::seed_from_u64(3));
        assert_eq!(again, first);
    }

    #[test]
    #[allow(clippy::cast_precision_loss)]
    fn test_add_awgn() {
        let mut rng = StdRng::seed_from_u64(1);
        let num_samples = 20000;
        let input = vec![1.0; num_samples];
        let mut output = vec![0.0; num_samples];
        add_awgn(&input, 0.5, &mut output, &mut rng);
        let mean = output.iter().sum::<f64>() / num_samples as f64;
        let var = output.iter().map(|y| (y - mean) * (y - mean)).sum::<f64>() / num_samples as f64;
        assert_float_eq!(mean, 1.0, abs <= 0.02);
        assert_float_eq!(var, 0.25, abs <= 0.02);
        // Zero noise is the identity
        add_awgn(&input, 0.0, &mut output, &mut rng);
        assert_eq!(output, input);
    }

    #[test]
    fn test_bpsk_slicer() {
        assert!(bpsk_slicer(&[]).is_empty());
        assert_eq!(bpsk_slicer(&[0.0, 0.01, -0.01]), [Zero, Zero, One]);
    }

    #[test]
    fn test_error_count() {
        assert_eq!(error_count(&[], &[One, Zero]), 0);
        assert_eq!(error_count(&[One, Zero], &[]), 0);
        let ref_seq = [One, Zero, Zero, One, One, One, Zero, Zero];
        let seq = [One, One, Zero, Zero, One, One, Zero, Zero, Zero, One];
        assert_eq!(error_count(&seq, &ref_seq), 2);
        assert_eq!(error_count(&ref_seq, &seq), 2);
    }
}
