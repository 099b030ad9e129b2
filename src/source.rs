//! Random information source

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::socket::{ElementType, SocketSpec};
use crate::task::{TaskIo, TaskSpec};
use crate::{utils, Error, Stage};

/// Stage generating `K` random information bits per frame, with one task `generate` (`U_K`)
#[derive(Debug)]
pub struct Source {
    k: usize,
    rng: StdRng,
}

impl Source {
    /// Returns source of `k` bits per frame, seeded with `seed`.
    #[must_use]
    pub fn new(k: usize, seed: u64) -> Self {
        Self {
            k,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Stage for Source {
    fn tasks(&self) -> Vec<TaskSpec> {
        vec![TaskSpec::new(
            "generate",
            vec![SocketSpec::output("U_K", ElementType::Bit, self.k)],
        )]
    }

    fn execute(&mut self, _task: usize, io: &TaskIo<'_>) -> Result<(), Error> {
        utils::random_bits(&mut io.bits_mut(0)?, &mut self.rng);
        Ok(())
    }
}
