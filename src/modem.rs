//! BPSK modulation and soft demodulation

use crate::socket::{ElementType, SocketSpec};
use crate::task::{TaskIo, TaskSpec};
use crate::{Bit, Error, Noise, Stage};

/// Task index of `modulate`
const MODULATE: usize = 0;

/// Stage with tasks `modulate` (`X_N1` bits -> `X_N2` symbols) and `demodulate` (`Y_N1` samples
/// -> `Y_N2` LLR values)
///
/// `Zero` maps to `+1.0` and `One` to `-1.0`; the LLR of a sample `y` is `2 y / sigma^2`, which
/// needs the noise level of the current SNR point.
#[derive(Clone, PartialEq, Debug, Copy)]
pub struct BpskModem {
    n: usize,
    sigma: Option<f64>,
}

impl BpskModem {
    /// Returns modem for frames of `n` bits.
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self { n, sigma: None }
    }
}

impl Stage for BpskModem {
    fn tasks(&self) -> Vec<TaskSpec> {
        vec![
            TaskSpec::new(
                "modulate",
                vec![
                    SocketSpec::input("X_N1", ElementType::Bit, self.n),
                    SocketSpec::output("X_N2", ElementType::F64, self.n),
                ],
            ),
            TaskSpec::new(
                "demodulate",
                vec![
                    SocketSpec::input("Y_N1", ElementType::F64, self.n),
                    SocketSpec::output("Y_N2", ElementType::F64, self.n),
                ],
            ),
        ]
    }

    fn execute(&mut self, task: usize, io: &TaskIo<'_>) -> Result<(), Error> {
        if task == MODULATE {
            let bits = io.bits(0)?;
            for (sym, &bit) in io.f64s_mut(1)?.iter_mut().zip(bits.iter()) {
                *sym = match bit {
                    Bit::Zero => 1.0,
                    Bit::One => -1.0,
                };
            }
        } else {
            let sigma = self
                .sigma
                .ok_or_else(|| Error::NoiseNotSet("BPSK demodulator".to_string()))?;
            let scale = 2.0 / (sigma * sigma);
            let samples = io.f64s(0)?;
            for (llr, &y) in io.f64s_mut(1)?.iter_mut().zip(samples.iter()) {
                *llr = scale * y;
            }
        }
        Ok(())
    }

    fn set_noise(&mut self, noise: &Noise) {
        self.sigma = Some(noise.sigma);
    }
}
