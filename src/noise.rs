//! Noise parameters of one SNR point

use serde::{Deserialize, Serialize};

use crate::Error;

/// Noise parameter set shared by all noise-dependent modules for one SNR point
#[derive(Clone, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub struct Noise {
    /// Standard deviation of the real-valued Gaussian noise
    pub sigma: f64,
    /// Ratio (dB) of energy per information bit to noise power spectral density
    pub ebn0_db: f64,
    /// Ratio (dB) of energy per symbol to noise power spectral density
    pub esn0_db: f64,
}

impl Noise {
    /// Returns noise parameter set with given values.
    #[must_use]
    pub fn new(sigma: f64, ebn0_db: f64, esn0_db: f64) -> Self {
        Self {
            sigma,
            ebn0_db,
            esn0_db,
        }
    }

    /// Returns noise parameter set for given Eb/N0.
    ///
    /// # Parameters
    ///
    /// - `ebn0_db`: Ratio (dB) of energy per information bit to noise power spectral density.
    ///
    /// - `code_rate`: Ratio of information bits to transmitted bits. Must be in `(0, 1]`.
    ///
    /// - `bits_per_symbol`: Number of bits carried by one modulation symbol. Must be positive.
    ///
    /// # Errors
    ///
    /// Returns an error if `code_rate` or `bits_per_symbol` is invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// use fecsim::Noise;
    ///
    /// let noise = Noise::from_ebn0(0.0, 0.5, 1)?;
    /// assert!((noise.esn0_db + 3.0103).abs() < 1e-4);
    /// assert!((noise.sigma - 1.0).abs() < 1e-6);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_ebn0(ebn0_db: f64, code_rate: f64, bits_per_symbol: u32) -> Result<Self, Error> {
        if !(code_rate > 0.0 && code_rate <= 1.0) {
            return Err(Error::InvalidInput(format!(
                "Code rate must be in (0, 1] (found {code_rate})"
            )));
        }
        if bits_per_symbol == 0 {
            return Err(Error::InvalidInput(
                "Number of bits per symbol must be positive".to_string(),
            ));
        }
        let esn0_db = ebn0_to_esn0(ebn0_db, code_rate, bits_per_symbol);
        Ok(Self::new(esn0_to_sigma(esn0_db), ebn0_db, esn0_db))
    }
}

/// Returns Es/N0 (dB) corresponding to given Eb/N0 (dB).
#[must_use]
pub fn ebn0_to_esn0(ebn0_db: f64, code_rate: f64, bits_per_symbol: u32) -> f64 {
    ebn0_db + 10.0 * (code_rate * f64::from(bits_per_symbol)).log10()
}

/// Returns noise standard deviation for unit-energy symbols at given Es/N0 (dB).
#[must_use]
pub fn esn0_to_sigma(esn0_db: f64) -> f64 {
    (0.5 / 10f64.powf(0.1 * esn0_db)).sqrt()
}
