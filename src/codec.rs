//! # Channel codecs
//!
//! Both codecs expose tasks `encode` (`U_K` -> `X_N`) and `decode_siho` (`Y_N` -> `V_K`), the
//! decoder taking LLR values (positive values favouring `Zero`) and returning hard decisions on
//! the information bits.
//!
//! - [`PolarCodec`]: polar code whose frozen-bit set is recomputed for every noise level, with a
//!   successive-cancellation decoder.
//! - [`RepetitionCodec`]: repetition code followed by a random interleaver.

use crate::frozen::FrozenBitsGenerator;
use crate::socket::{ElementType, SocketSpec};
use crate::task::{TaskIo, TaskSpec};
use crate::{utils, Bit, Error, Interleaver, Noise, Stage};

/// Task index of `encode`
const ENCODE: usize = 0;

fn codec_tasks(k: usize, n: usize) -> Vec<TaskSpec> {
    vec![
        TaskSpec::new(
            "encode",
            vec![
                SocketSpec::input("U_K", ElementType::Bit, k),
                SocketSpec::output("X_N", ElementType::Bit, n),
            ],
        ),
        TaskSpec::new(
            "decode_siho",
            vec![
                SocketSpec::input("Y_N", ElementType::F64, n),
                SocketSpec::output("V_K", ElementType::Bit, k),
            ],
        ),
    ]
}

/// Computes `x = u F^{⊗m}` in place, with `F = [1 0; 1 1]` and `x.len() = 2^m`.
pub fn polar_transform(x: &mut [Bit]) {
    let n = x.len();
    let mut half = 1;
    while half < n {
        for block in x.chunks_mut(2 * half) {
            let (left, right) = block.split_at_mut(half);
            for (l, &r) in left.iter_mut().zip(right.iter()) {
                *l ^= r;
            }
        }
        half *= 2;
    }
}

/// Successive-cancellation decoding of a polar code.
///
/// Writes the decisions on all `N` bits of `u` to `u_hat` (frozen bits decided as `Zero`) and
/// returns the re-encoded codeword.
fn sc_decode(llrs: &[f64], frozen: &[bool], u_hat: &mut [Bit]) -> Vec<Bit> {
    let n = llrs.len();
    if n == 1 {
        u_hat[0] = if frozen[0] || llrs[0] >= 0.0 {
            Bit::Zero
        } else {
            Bit::One
        };
        return vec![u_hat[0]];
    }
    let half = n / 2;
    let (y1, y2) = llrs.split_at(half);
    let upper: Vec<f64> = y1
        .iter()
        .zip(y2)
        .map(|(&a, &b)| a.signum() * b.signum() * a.abs().min(b.abs()))
        .collect();
    let x1 = sc_decode(&upper, &frozen[.. half], &mut u_hat[.. half]);
    let lower: Vec<f64> = y1
        .iter()
        .zip(y2)
        .zip(&x1)
        .map(|((&a, &b), &s)| if s == Bit::Zero { b + a } else { b - a })
        .collect();
    let x2 = sc_decode(&lower, &frozen[half ..], &mut u_hat[half ..]);
    x1.iter().zip(&x2).map(|(&a, &b)| a ^ b).chain(x2.iter().copied()).collect()
}

/// Polar codec with frozen bits chosen by Gaussian-approximation density evolution
#[derive(Debug)]
pub struct PolarCodec {
    k: usize,
    n: usize,
    generator: FrozenBitsGenerator,
    /// Information positions for the current noise level, `None` until noise is set
    info_positions: Option<Vec<usize>>,
    frozen: Vec<bool>,
}

impl PolarCodec {
    /// Returns polar codec of dimension `k` and length `n`.
    ///
    /// # Errors
    ///
    /// Returns an error if `n` is not a power of two or `k` is not in `[1, n)`.
    pub fn new(k: usize, n: usize) -> Result<Self, Error> {
        Ok(Self {
            k,
            n,
            generator: FrozenBitsGenerator::new(k, n)?,
            info_positions: None,
            frozen: Vec::new(),
        })
    }

    /// Returns code dimension.
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Returns code length.
    #[must_use]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Returns `true` at frozen positions, for the last noise level set.
    #[must_use]
    pub fn frozen(&self) -> &[bool] {
        &self.frozen
    }

    fn encode(&self, info: &[Bit], info_positions: &[usize], x: &mut [Bit]) {
        x.fill(Bit::Zero);
        for (&pos, &bit) in info_positions.iter().zip(info) {
            x[pos] = bit;
        }
        polar_transform(x);
    }

    fn decode(&self, llrs: &[f64], info_positions: &[usize], v: &mut [Bit]) {
        let mut u_hat = vec![Bit::Zero; self.n];
        sc_decode(llrs, &self.frozen, &mut u_hat);
        for (bit, &pos) in v.iter_mut().zip(info_positions) {
            *bit = u_hat[pos];
        }
    }
}

impl Stage for PolarCodec {
    fn tasks(&self) -> Vec<TaskSpec> {
        codec_tasks(self.k, self.n)
    }

    fn execute(&mut self, task: usize, io: &TaskIo<'_>) -> Result<(), Error> {
        let info_positions = self.info_positions.as_deref().ok_or_else(|| {
            Error::NoiseNotSet(format!("polar codec ({}, {})", self.n, self.k))
        })?;
        if task == ENCODE {
            self.encode(&io.bits(0)?, info_positions, &mut io.bits_mut(1)?);
        } else {
            self.decode(&io.f64s(0)?, info_positions, &mut io.bits_mut(1)?);
        }
        Ok(())
    }

    fn set_noise(&mut self, noise: &Noise) {
        self.generator.set_noise(noise);
        match self.generator.generate() {
            Ok(fb) => {
                self.info_positions = Some(fb.info_positions());
                self.frozen = fb.frozen;
            }
            Err(err) => {
                tracing::warn!("cannot compute frozen bits: {err}");
                self.info_positions = None;
            }
        }
    }
}

/// Repetition codec, whose codeword is interleaved
#[derive(Debug)]
pub struct RepetitionCodec {
    k: usize,
    repetitions: usize,
    interleaver: Interleaver,
    /// Scratch buffer holding non-interleaved codewords or LLR values
    bits: Vec<Bit>,
    llrs: Vec<f64>,
}

impl RepetitionCodec {
    /// Returns codec repeating each of `k` bits `repetitions` times, with an interleaver seeded
    /// with `seed`.
    ///
    /// # Errors
    ///
    /// Returns an error if `k` or `repetitions` is `0`.
    ///
    /// # Examples
    ///
    /// ```
    /// use fecsim::{Module, RepetitionCodec};
    ///
    /// let codec = RepetitionCodec::new(16, 3, 0)?;
    /// assert_eq!(codec.n(), 48);
    /// assert!(Module::new("cdc", codec).has_interleaver());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(k: usize, repetitions: usize, seed: u64) -> Result<Self, Error> {
        if k == 0 || repetitions == 0 {
            return Err(Error::InvalidInput(format!(
                "Repetition code needs positive dimension and repetitions (found {k} and \
                 {repetitions})"
            )));
        }
        Ok(Self {
            k,
            repetitions,
            interleaver: Interleaver::new(k * repetitions, seed)?,
            bits: Vec::with_capacity(k * repetitions),
            llrs: Vec::with_capacity(k * repetitions),
        })
    }

    /// Returns code dimension.
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Returns code length.
    #[must_use]
    pub fn n(&self) -> usize {
        self.k * self.repetitions
    }
}

impl Stage for RepetitionCodec {
    fn tasks(&self) -> Vec<TaskSpec> {
        codec_tasks(self.k, self.n())
    }

    fn execute(&mut self, task: usize, io: &TaskIo<'_>) -> Result<(), Error> {
        if task == ENCODE {
            let info = io.bits(0)?;
            self.bits.clear();
            for &bit in info.iter() {
                self.bits.extend(std::iter::repeat(bit).take(self.repetitions));
            }
            let mut coded = Vec::with_capacity(self.n());
            self.interleaver.interleave(&self.bits, &mut coded)?;
            io.bits_mut(1)?.copy_from_slice(&coded);
        } else {
            self.interleaver.deinterleave(&*io.f64s(0)?, &mut self.llrs)?;
            let sums: Vec<f64> = self
                .llrs
                .chunks(self.repetitions)
                .map(|chunk| chunk.iter().sum())
                .collect();
            io.bits_mut(1)?.copy_from_slice(&utils::bpsk_slicer(&sums));
        }
        Ok(())
    }

    fn has_interleaver(&self) -> bool {
        true
    }

    fn init_interleaver(&mut self) -> Result<(), Error> {
        self.interleaver.init();
        Ok(())
    }
}
