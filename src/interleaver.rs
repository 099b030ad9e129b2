//! Seeded random interleaver with an explicit initialization step

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::Error;

/// Random interleaver for sequences of a given length
///
/// The permutation is drawn by [`Interleaver::init`] from a generator seeded with the seed given
/// at construction, so that two interleavers with the same length and seed agree. Interleaving
/// before initialization is an error.
#[derive(Eq, PartialEq, Debug)]
pub struct Interleaver {
    length: usize,
    seed: u64,
    /// Input index for each output index, empty until initialized
    in_index_given_out_index: Vec<usize>,
    /// Output index for each input index, empty until initialized
    out_index_given_in_index: Vec<usize>,
}

impl Interleaver {
    /// Returns uninitialized interleaver.
    ///
    /// # Errors
    ///
    /// Returns an error if `length` is `0`.
    ///
    /// # Examples
    ///
    /// ```
    /// use fecsim::Interleaver;
    ///
    /// let mut interleaver = Interleaver::new(8, 42)?;
    /// assert!(!interleaver.is_initialized());
    /// interleaver.init();
    /// let input = ['a', 'b', 'c', 'd', 'e', 'f', 'g', 'h'];
    /// let mut output = Vec::new();
    /// let mut back = Vec::new();
    /// interleaver.interleave(&input, &mut output)?;
    /// interleaver.deinterleave(&output, &mut back)?;
    /// assert_eq!(back, input);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(length: usize, seed: u64) -> Result<Self, Error> {
        if length == 0 {
            return Err(Error::InvalidInput(
                "Length of interleaver must be a positive integer".to_string(),
            ));
        }
        Ok(Self {
            length,
            seed,
            in_index_given_out_index: Vec::new(),
            out_index_given_in_index: Vec::new(),
        })
    }

    /// Draws the permutation. Calling it again redraws the same permutation.
    pub fn init(&mut self) {
        let mut perm: Vec<usize> = (0 .. self.length).collect();
        perm.shuffle(&mut StdRng::seed_from_u64(self.seed));
        let mut inverse = vec![0; self.length];
        for (out_index, &in_index) in perm.iter().enumerate() {
            inverse[in_index] = out_index;
        }
        self.in_index_given_out_index = perm;
        self.out_index_given_in_index = inverse;
    }

    /// Returns `true` once [`Interleaver::init`] has been called.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        !self.in_index_given_out_index.is_empty()
    }

    /// Returns length of input/output sequence.
    #[must_use]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns `false`: interleavers have positive length.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Generates interleaver output given its input.
    ///
    /// # Parameters
    ///
    /// - `input`: Interleaver input.
    ///
    /// - `output`: Buffer for interleaver output (any pre-existing contents will be cleared).
    ///
    /// # Errors
    ///
    /// Returns an error if the interleaver is not initialized or `input.len()` is not equal to
    /// the interleaver length.
    pub fn interleave<T: Copy>(&self, input: &[T], output: &mut Vec<T>) -> Result<(), Error> {
        self.check_ready(input.len(), "input")?;
        output.clear();
        output.extend(self.in_index_given_out_index.iter().map(|&i| input[i]));
        Ok(())
    }

    /// Generates interleaver input given its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the interleaver is not initialized or `output.len()` is not equal to
    /// the interleaver length.
    pub fn deinterleave<T: Copy>(&self, output: &[T], input: &mut Vec<T>) -> Result<(), Error> {
        self.check_ready(output.len(), "output")?;
        input.clear();
        input.extend(self.out_index_given_in_index.iter().map(|&o| output[o]));
        Ok(())
    }

    fn check_ready(&self, len: usize, what: &str) -> Result<(), Error> {
        if !self.is_initialized() {
            return Err(Error::InvalidInput(
                "Interleaver used before initialization".to_string(),
            ));
        }
        if len != self.length {
            return Err(Error::InvalidInput(format!(
                "Invalid interleaver {what} length (expected {}, found {len})",
                self.length
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests_of_interleaver {
    use super::*;

    #[test]
    fn test_new() {
        assert!(Interleaver::new(0, 0).is_err());
        let interleaver = Interleaver::new(8, 0).unwrap();
        assert_eq!(interleaver.len(), 8);
        assert!(!interleaver.is_initialized());
    }

    #[test]
    fn test_init() {
        let mut interleaver = Interleaver::new(64, 5).unwrap();
        interleaver.init();
        assert!(interleaver.is_initialized());
        let mut sorted = interleaver.in_index_given_out_index.clone();
        sorted.sort_unstable();
        assert!(sorted.into_iter().eq(0 .. 64));
        for (o, &i) in interleaver.in_index_given_out_index.iter().enumerate() {
            assert_eq!(interleaver.out_index_given_in_index[i], o);
        }
        // Same seed, same permutation, also on re-initialization
        let first = interleaver.in_index_given_out_index.clone();
        interleaver.init();
        assert_eq!(interleaver.in_index_given_out_index, first);
        let mut other = Interleaver::new(64, 5).unwrap();
        other.init();
        assert_eq!(other, interleaver);
    }

    #[test]
    fn test_interleave_requires_init() {
        let interleaver = Interleaver::new(4, 0).unwrap();
        let mut output = Vec::new();
        assert!(interleaver.interleave(&[1, 2, 3, 4], &mut output).is_err());
        assert!(interleaver.deinterleave(&[1, 2, 3, 4], &mut output).is_err());
    }

    #[test]
    fn test_interleave_and_deinterleave() {
        let mut interleaver = Interleaver::new(8, 11).unwrap();
        interleaver.init();
        let mut output = Vec::new();
        assert!(interleaver.interleave(&['a'; 7], &mut output).is_err());
        let input = ['a', 'b', 'c', 'd', 'e', 'f', 'g', 'h'];
        interleaver.interleave(&input, &mut output).unwrap();
        for (o, &i) in interleaver.in_index_given_out_index.iter().enumerate() {
            assert_eq!(output[o], input[i]);
        }
        let mut back = vec!['z'; 3];
        interleaver.deinterleave(&output, &mut back).unwrap();
        assert_eq!(back, input);
    }
}
