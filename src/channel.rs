//! Additive white Gaussian noise channel

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::socket::{ElementType, SocketSpec};
use crate::task::{TaskIo, TaskSpec};
use crate::{utils, Error, Noise, Stage};

/// Stage adding real Gaussian noise of the current standard deviation, with one task
/// `add_noise` (`X_N` -> `Y_N`)
#[derive(Debug)]
pub struct AwgnChannel {
    n: usize,
    sigma: Option<f64>,
    rng: StdRng,
}

impl AwgnChannel {
    /// Returns channel for frames of `n` samples, seeded with `seed`.
    #[must_use]
    pub fn new(n: usize, seed: u64) -> Self {
        Self {
            n,
            sigma: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Stage for AwgnChannel {
    fn tasks(&self) -> Vec<TaskSpec> {
        vec![TaskSpec::new(
            "add_noise",
            vec![
                SocketSpec::input("X_N", ElementType::F64, self.n),
                SocketSpec::output("Y_N", ElementType::F64, self.n),
            ],
        )]
    }

    fn execute(&mut self, _task: usize, io: &TaskIo<'_>) -> Result<(), Error> {
        let sigma = self
            .sigma
            .ok_or_else(|| Error::NoiseNotSet("AWGN channel".to_string()))?;
        utils::add_awgn(&io.f64s(0)?, sigma, &mut io.f64s_mut(1)?, &mut self.rng);
        Ok(())
    }

    fn set_noise(&mut self, noise: &Noise) {
        self.sigma = Some(noise.sigma);
    }
}
