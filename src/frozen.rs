//! # Frozen-bit positions of polar codes
//!
//! The reliability of each of the `N` bit-channels of a polar code over a BPSK-AWGN channel is
//! estimated by density evolution under the Gaussian approximation: every bit-channel LLR is
//! modelled as a consistent Gaussian with mean `z`, the channel itself having mean `2 / sigma^2`.
//! Each polarization step turns a pair of bit-channels of mean `z` into a worse one of mean
//! `phi_inv(1 - (1 - phi(z))^2)` and a better one of mean `2 z`. The `N - K` least reliable
//! bit-channels are frozen.
//!
//! Bit-channel `i` is the one carrying `u[i]` in `x = u F^{⊗m}`, the most significant bit of `i`
//! selecting the branch taken at the first polarization step.
//!
//! # Examples
//!
//! ```
//! use fecsim::frozen_bits;
//!
//! let fb = frozen_bits(8, 4, 0.8)?;
//! assert_eq!(fb.frozen, [true, true, true, false, true, false, false, false]);
//! assert_eq!(fb.info_positions(), [3, 5, 6, 7]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::f64::consts::{LN_2, PI};

use serde::Serialize;

use crate::{Error, Noise};

const ALPHA: f64 = -0.4527;
const BETA: f64 = 0.0218;
const GAMMA: f64 = 0.86;
/// Boundary between the two branches of `phi`
const X_SPLIT: f64 = 10.0;
/// Mean below which the worse-channel update leaves Chung's approximation
const Z_SMALL: f64 = 0.5;

/// Returns Chung's approximation of the mean-to-error-function map of a consistent Gaussian LLR.
fn phi(x: f64) -> f64 {
    if x <= 0.0 {
        1.0
    } else if x <= X_SPLIT {
        (ALPHA * x.powf(GAMMA) + BETA).exp()
    } else {
        (PI / x).sqrt() * (-x / 4.0).exp() * (1.0 - 10.0 / (7.0 * x))
    }
}

/// Returns `x` such that `phi(x) = y`, for `0 < y <= 1`.
fn phi_inv(y: f64) -> f64 {
    if y >= phi(X_SPLIT) {
        ((BETA - y.ln()) / -ALPHA).powf(1.0 / GAMMA)
    } else {
        let mut lo = X_SPLIT;
        let mut hi = 2.0 * X_SPLIT;
        while phi(hi) > y {
            hi *= 2.0;
        }
        for _ in 0 .. 100 {
            let mid = 0.5 * (lo + hi);
            if phi(mid) > y {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        0.5 * (lo + hi)
    }
}

/// Returns mean of the worse bit-channel obtained from two bit-channels of mean `z`, using
/// Chung's approximation.
fn chung_worse_mean(z: f64) -> f64 {
    let p = phi(z);
    if p == 0.0 {
        z - 4.0 * LN_2
    } else {
        phi_inv(p * (2.0 - p)).min(z)
    }
}

/// Returns mean of the worse bit-channel obtained from two bit-channels of mean `z`.
///
/// Chung's approximation exceeds 1 below `z = 0.0294`, which would floor every deep worse
/// bit-channel at the same mean. Below [`Z_SMALL`] the update follows the small-mean asymptote
/// instead, quadratic in `z`, scaled to meet Chung's branch at `Z_SMALL`. The map stays
/// continuous and strictly increasing.
fn worse_mean(z: f64) -> f64 {
    if z < Z_SMALL {
        let r = z / Z_SMALL;
        chung_worse_mean(Z_SMALL) * r * r
    } else {
        chung_worse_mean(z)
    }
}

/// Returns LLR means of the `n` bit-channels of a polar code, for `n` a power of two.
fn bit_channel_means(n: usize, sigma: f64) -> Vec<f64> {
    let mut z = vec![2.0 / (sigma * sigma); n];
    let mut stride = n;
    while stride > 1 {
        let half = stride / 2;
        for base in (0 .. n).step_by(stride) {
            let parent = z[base];
            z[base] = worse_mean(parent);
            z[base + half] = 2.0 * parent;
        }
        stride = half;
    }
    z
}

/// Frozen-bit set of a polar code
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct FrozenBits {
    /// Code length
    pub n: usize,
    /// Code dimension
    pub k: usize,
    /// Noise standard deviation the set was computed for
    pub sigma: f64,
    /// Bit-channel indices from least to most reliable
    pub ranking: Vec<usize>,
    /// `true` at frozen positions
    pub frozen: Vec<bool>,
}

impl FrozenBits {
    /// Returns frozen positions, in ascending order.
    #[must_use]
    pub fn frozen_positions(&self) -> Vec<usize> {
        (0 .. self.n).filter(|&i| self.frozen[i]).collect()
    }

    /// Returns information positions, in ascending order.
    #[must_use]
    pub fn info_positions(&self) -> Vec<usize> {
        (0 .. self.n).filter(|&i| !self.frozen[i]).collect()
    }
}

/// Returns frozen-bit set of a polar code of length `n` and dimension `k` at noise level
/// `sigma`.
///
/// # Errors
///
/// Returns an error if `n` is not a power of two, if `k` is not in `[1, n)`, or if `sigma` is
/// not a positive finite number.
pub fn frozen_bits(n: usize, k: usize, sigma: f64) -> Result<FrozenBits, Error> {
    check_code_size(n, k)?;
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(Error::InvalidInput(format!(
            "Noise standard deviation must be positive (found {sigma})"
        )));
    }
    let means = bit_channel_means(n, sigma);
    let mut ranking: Vec<usize> = (0 .. n).collect();
    ranking.sort_by(|&a, &b| means[a].total_cmp(&means[b]).then(a.cmp(&b)));
    let mut frozen = vec![false; n];
    for &i in &ranking[.. n - k] {
        frozen[i] = true;
    }
    Ok(FrozenBits {
        n,
        k,
        sigma,
        ranking,
        frozen,
    })
}

fn check_code_size(n: usize, k: usize) -> Result<(), Error> {
    if !n.is_power_of_two() {
        return Err(Error::InvalidInput(format!(
            "Polar code length must be a power of two (found {n})"
        )));
    }
    if k == 0 || k >= n {
        return Err(Error::InvalidInput(format!(
            "Polar code dimension must be in [1, {n}) (found {k})"
        )));
    }
    Ok(())
}

/// Frozen-bit generator for a fixed code size, tracking the current noise level
#[derive(Clone, PartialEq, Debug, Copy)]
pub struct FrozenBitsGenerator {
    n: usize,
    k: usize,
    sigma: Option<f64>,
}

impl FrozenBitsGenerator {
    /// Returns generator for a polar code of dimension `k` and length `n`.
    ///
    /// # Errors
    ///
    /// Returns an error if `n` is not a power of two or `k` is not in `[1, n)`.
    pub fn new(k: usize, n: usize) -> Result<Self, Error> {
        check_code_size(n, k)?;
        Ok(Self { n, k, sigma: None })
    }

    /// Sets the noise level the next frozen-bit set is computed for.
    pub fn set_noise(&mut self, noise: &Noise) {
        self.sigma = Some(noise.sigma);
    }

    /// Returns frozen-bit set at the current noise level.
    ///
    /// # Errors
    ///
    /// Returns an error if no noise level was set, or if it is not a positive finite number.
    pub fn generate(&self) -> Result<FrozenBits, Error> {
        let sigma = self.sigma.ok_or_else(|| {
            Error::NoiseNotSet(format!("frozen-bit generator ({}, {})", self.n, self.k))
        })?;
        frozen_bits(self.n, self.k, sigma)
    }
}
