//! Periodic puncturing of codewords

use crate::socket::{ElementType, SocketSpec};
use crate::task::{TaskIo, TaskSpec};
use crate::{Error, Stage};

/// Task index of `puncture`
const PUNCTURE: usize = 0;

/// Stage dropping codeword bits according to a periodic pattern, with tasks `puncture`
/// (`X_N1` -> `X_N2`) and `depuncture` (`Y_N1` -> `Y_N2`)
///
/// Codeword bit `i` is transmitted if `pattern[i % pattern.len()]` is `true`. Depuncturing puts
/// an LLR of `0.0` at each dropped position.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Puncturer {
    n: usize,
    kept: Vec<usize>,
}

impl Puncturer {
    /// Returns puncturer for codewords of `n` bits.
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` is empty or if no codeword bit would be transmitted.
    ///
    /// # Examples
    ///
    /// ```
    /// use fecsim::Puncturer;
    ///
    /// let puncturer = Puncturer::new(12, &Puncturer::parse_pattern("110")?)?;
    /// assert_eq!(puncturer.n_punctured(), 8);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(n: usize, pattern: &[bool]) -> Result<Self, Error> {
        if pattern.is_empty() {
            return Err(Error::InvalidInput(
                "Puncturing pattern cannot be empty".to_string(),
            ));
        }
        let kept: Vec<usize> = (0 .. n).filter(|i| pattern[i % pattern.len()]).collect();
        if kept.is_empty() {
            return Err(Error::InvalidInput(format!(
                "Puncturing pattern {pattern:?} drops all {n} codeword bits"
            )));
        }
        Ok(Self { n, kept })
    }

    /// Returns puncturing pattern written as a string of `0` (drop) and `1` (keep) characters.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is empty or contains other characters.
    pub fn parse_pattern(pattern: &str) -> Result<Vec<bool>, Error> {
        if pattern.is_empty() {
            return Err(Error::InvalidInput(
                "Puncturing pattern cannot be empty".to_string(),
            ));
        }
        pattern
            .chars()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                _ => Err(Error::InvalidInput(format!(
                    "Invalid character {c:?} in puncturing pattern {pattern:?}"
                ))),
            })
            .collect()
    }

    /// Returns number of codeword bits.
    #[must_use]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Returns number of transmitted bits.
    #[must_use]
    pub fn n_punctured(&self) -> usize {
        self.kept.len()
    }
}

impl Stage for Puncturer {
    fn tasks(&self) -> Vec<TaskSpec> {
        let (n, n_p) = (self.n, self.n_punctured());
        vec![
            TaskSpec::new(
                "puncture",
                vec![
                    SocketSpec::input("X_N1", ElementType::Bit, n),
                    SocketSpec::output("X_N2", ElementType::Bit, n_p),
                ],
            ),
            TaskSpec::new(
                "depuncture",
                vec![
                    SocketSpec::input("Y_N1", ElementType::F64, n_p),
                    SocketSpec::output("Y_N2", ElementType::F64, n),
                ],
            ),
        ]
    }

    fn execute(&mut self, task: usize, io: &TaskIo<'_>) -> Result<(), Error> {
        if task == PUNCTURE {
            let x = io.bits(0)?;
            for (out, &i) in io.bits_mut(1)?.iter_mut().zip(&self.kept) {
                *out = x[i];
            }
        } else {
            let y = io.f64s(0)?;
            let mut out = io.f64s_mut(1)?;
            out.fill(0.0);
            for (&llr, &i) in y.iter().zip(&self.kept) {
                out[i] = llr;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests_of_puncturer {
    use super::*;

    #[test]
    fn test_new() {
        assert!(Puncturer::new(8, &[]).is_err());
        assert!(Puncturer::new(8, &[false, false]).is_err());
        let puncturer = Puncturer::new(7, &[true, true, false]).unwrap();
        assert_eq!(puncturer.kept, [0, 1, 3, 4, 6]);
        assert_eq!(puncturer.n(), 7);
        assert_eq!(puncturer.n_punctured(), 5);
        assert_eq!(Puncturer::new(4, &[true]).unwrap().n_punctured(), 4);
    }

    #[test]
    fn test_parse_pattern() {
        assert!(Puncturer::parse_pattern("").is_err());
        assert!(Puncturer::parse_pattern("10x").is_err());
        assert_eq!(Puncturer::parse_pattern("1101").unwrap(), [true, true, false, true]);
    }
}
