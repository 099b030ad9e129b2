//! Cyclic redundancy check appended to information frames

use crate::socket::{ElementType, SocketSpec};
use crate::task::{TaskIo, TaskSpec};
use crate::{Bit, Error, Stage};

/// Task index of `build`
const BUILD: usize = 0;

/// Stage appending and stripping CRC bits, with tasks `build` (`U_K1` -> `U_K2`) and `extract`
/// (`V_K1` -> `V_K2`)
///
/// The CRC is the remainder of the MSB-first polynomial division of the information bits,
/// shifted left by the CRC width, by the generator polynomial. A width of `0` leaves frames
/// unchanged.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Crc {
    k: usize,
    width: usize,
    /// Generator polynomial without its leading term, MSB first
    poly: Vec<Bit>,
}

impl Crc {
    /// Returns CRC stage for frames of `k` information bits.
    ///
    /// # Parameters
    ///
    /// - `k`: Number of information bits per frame.
    ///
    /// - `poly`: Generator polynomial in normal notation, with its leading term omitted (for
    ///   instance `0x07` for CRC-8 `x^8 + x^2 + x + 1`).
    ///
    /// - `width`: Degree of the generator polynomial (at most 64).
    ///
    /// # Errors
    ///
    /// Returns an error if `width` is larger than 64 or `poly` does not fit in `width` bits.
    ///
    /// # Examples
    ///
    /// ```
    /// use fecsim::Crc;
    ///
    /// let crc = Crc::new(32, 0x07, 8)?;
    /// assert_eq!(crc.size(), 40);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(k: usize, poly: u64, width: usize) -> Result<Self, Error> {
        if width > 64 || (width < 64 && poly >> width != 0) {
            return Err(Error::InvalidInput(format!(
                "CRC polynomial {poly:#x} does not fit in {width} bits"
            )));
        }
        let poly = (0 .. width)
            .rev()
            .map(|i| if (poly >> i) & 1 == 1 { Bit::One } else { Bit::Zero })
            .collect();
        Ok(Self { k, width, poly })
    }

    /// Returns number of CRC bits.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns number of bits of a frame with its CRC.
    #[must_use]
    pub fn size(&self) -> usize {
        self.k + self.width
    }

    /// Returns CRC bits of given information bits.
    #[must_use]
    pub fn checksum(&self, bits: &[Bit]) -> Vec<Bit> {
        let mut reg = vec![Bit::Zero; self.width];
        for &bit in bits {
            let Some(feedback) = reg.first().map(|&msb| msb ^ bit) else {
                break;
            };
            reg.rotate_left(1);
            if let Some(last) = reg.last_mut() {
                *last = Bit::Zero;
            }
            if feedback == Bit::One {
                for (r, &p) in reg.iter_mut().zip(&self.poly) {
                    *r ^= p;
                }
            }
        }
        reg
    }

    /// Returns `true` if the trailing CRC bits of `frame` match its leading information bits.
    #[must_use]
    pub fn check(&self, frame: &[Bit]) -> bool {
        frame.len() == self.size() && self.checksum(&frame[.. self.k]) == frame[self.k ..]
    }
}

impl Stage for Crc {
    fn tasks(&self) -> Vec<TaskSpec> {
        vec![
            TaskSpec::new(
                "build",
                vec![
                    SocketSpec::input("U_K1", ElementType::Bit, self.k),
                    SocketSpec::output("U_K2", ElementType::Bit, self.size()),
                ],
            ),
            TaskSpec::new(
                "extract",
                vec![
                    SocketSpec::input("V_K1", ElementType::Bit, self.size()),
                    SocketSpec::output("V_K2", ElementType::Bit, self.k),
                ],
            ),
        ]
    }

    fn execute(&mut self, task: usize, io: &TaskIo<'_>) -> Result<(), Error> {
        let input = io.bits(0)?;
        let mut output = io.bits_mut(1)?;
        if task == BUILD {
            output[.. self.k].copy_from_slice(&input);
            output[self.k ..].copy_from_slice(&self.checksum(&input));
        } else {
            output.copy_from_slice(&input[.. self.k]);
        }
        Ok(())
    }
}
