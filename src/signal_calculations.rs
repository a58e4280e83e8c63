//! Radio signal and timing calculations.
//!
//! Contains helpers for:
//! - Log-distance path loss with optional log-normal shadowing
//! - Frame part durations from bit counts and bitrate
//! - Effective communication distance estimation given a simple link budget
//! - Power unit conversions (dBm, mW, W, dB ratios)
//!
//! Units:
//! - Power: dBm, mW, W (conversions provided)
//! - Time: seconds (f64) for mathematical expressions, `SimTime` for the API
//! - Distance: meters

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::Deserialize;

use crate::types::{SignalPart, SimTime};

/// Parameters defining the radio channel propagation model.
///
/// Constants for the log-distance path loss model with log-normal shadowing.
/// They determine how received power decays over distance and how much random
/// variation is applied per link.
#[derive(Debug, Deserialize, Clone)]
pub struct PathLossParameters {
    /// Path loss exponent (n).
    ///
    /// - n = 2.0: Free space
    /// - n = 2.7 to 3.5: Urban areas
    /// - n = 3.0 to 5.0: Indoor obstructed environments
    pub path_loss_exponent: f64,

    /// Standard deviation for log-normal shadowing (σ) in dB. 0.0 disables shadowing.
    #[serde(default)]
    pub shadowing_sigma: f64,

    /// Path loss at the reference distance d₀ (1 meter) in dB.
    pub path_loss_at_reference_distance: f64,
}

/// Bit-level layout of a frame on air.
///
/// Defaults follow the IEEE 802.15.4 O-QPSK PHY at 2.4 GHz: 250 kbit/s, a
/// 5 byte synchronization header and a 1 byte PHY header.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct PhyParameters {
    #[serde(default = "default_bitrate")]
    pub bitrate: f64,
    #[serde(default = "default_preamble_bits")]
    pub preamble_bits: u32,
    #[serde(default = "default_header_bits")]
    pub header_bits: u32,
}

fn default_bitrate() -> f64 {
    250_000.0
}

fn default_preamble_bits() -> u32 {
    40
}

fn default_header_bits() -> u32 {
    8
}

impl Default for PhyParameters {
    fn default() -> Self {
        Self {
            bitrate: default_bitrate(),
            preamble_bits: default_preamble_bits(),
            header_bits: default_header_bits(),
        }
    }
}

impl PhyParameters {
    /// Number of bits carried by `part` for a frame with `payload_bytes` of data.
    pub fn part_bits(&self, part: SignalPart, payload_bytes: usize) -> u64 {
        let data_bits = payload_bytes as u64 * 8;
        match part {
            SignalPart::Whole => self.preamble_bits as u64 + self.header_bits as u64 + data_bits,
            SignalPart::Preamble => self.preamble_bits as u64,
            SignalPart::Header => self.header_bits as u64,
            SignalPart::Data => data_bits,
        }
    }

    /// Airtime of a frame with `payload_bytes` of data, as the sum of its part
    /// durations. `None` when it doesn't fit in `SimTime`.
    pub fn checked_frame_duration(&self, payload_bytes: usize) -> Option<SimTime> {
        [SignalPart::Preamble, SignalPart::Header, SignalPart::Data]
            .into_iter()
            .try_fold(SimTime::ZERO, |total, part| {
                let duration = SimTime::try_from_secs_f64(self.part_bits(part, payload_bytes) as f64 / self.bitrate)?;
                total.checked_add(duration)
            })
    }
}

/// Duration on air of `bits` at `bitrate` bit/s.
pub fn part_duration(bits: u64, bitrate: f64) -> SimTime {
    SimTime::from_secs_f64(bits as f64 / bitrate)
}

/// Calculate the path loss (in dB) at a given distance using a log-distance
/// path loss model with log-normal shadowing.
///
/// # Formula
///
/// ```text
/// PL(d) = PL(d₀) + 10 × n × log₁₀(d/d₀) + X_σ
/// where d₀ = 1 meter (reference distance)
/// ```
///
/// - For distances < 1.0 meter, returns the reference path loss without further attenuation
/// - Each call samples a new shadowing value from `rng`, so repeated calls with the
///   same distance yield different results unless σ is zero
pub fn calculate_path_loss<R: Rng + ?Sized>(distance: f64, params: &PathLossParameters, rng: &mut R) -> f64 {
    if distance < 1.0 {
        return params.path_loss_at_reference_distance;
    }
    let path_loss = params.path_loss_at_reference_distance + 10.0 * params.path_loss_exponent * distance.log10();
    let shadowing = if params.shadowing_sigma > 0.0 {
        match Normal::new(0.0_f64, params.shadowing_sigma) {
            Ok(normal) => normal.sample(rng),
            Err(_) => 0.0,
        }
    } else {
        0.0
    };
    path_loss + shadowing
}

/// Estimate a deterministic "effective distance" at which the received power
/// drops to `sensitivity_dbm`, without sampling shadowing.
///
/// Solves `P_tx - (PL0 + 10n log10 d) = sensitivity` for d. Returns 0.0 when
/// the link budget is already negative at the reference distance.
pub fn calculate_effective_distance(tx_power_dbm: f64, sensitivity_dbm: f64, params: &PathLossParameters) -> f64 {
    let numerator = tx_power_dbm - sensitivity_dbm - params.path_loss_at_reference_distance;
    let denom = 10.0 * params.path_loss_exponent;
    if numerator <= 0.0 {
        return 0.0;
    }
    10.0_f64.powf(numerator / denom)
}

/// Received power (in dBm) at a given distance: `P_tx(dBm) - PL(dB)`.
///
/// Because `calculate_path_loss` includes a random shadowing term, the
/// returned value is a stochastic sample.
pub fn calculate_rssi<R: Rng + ?Sized>(distance: f64, tx_power_dbm: f64, params: &PathLossParameters, rng: &mut R) -> f64 {
    tx_power_dbm - calculate_path_loss(distance, params, rng)
}

/// Convert power from dBm to milliwatts: `P(mW) = 10^(P(dBm) / 10)`.
///
/// ```text
/// 0 dBm   → 1 mW
/// 10 dBm  → 10 mW
/// -10 dBm → 0.1 mW
/// ```
pub fn dbm_to_mw(dbm: f64) -> f64 {
    10f64.powf(dbm / 10.0)
}

/// Convert power from milliwatts to dBm: `P(dBm) = 10 × log₁₀(P(mW))`.
///
/// For `mw <= 0` this returns NaN or -∞.
pub fn mw_to_dbm(mw: f64) -> f64 {
    10.0 * mw.log10()
}

pub fn dbm_to_w(dbm: f64) -> f64 {
    dbm_to_mw(dbm) / 1000.0
}

pub fn w_to_dbm(w: f64) -> f64 {
    mw_to_dbm(w * 1000.0)
}

/// Convert a dB ratio to a linear power ratio.
pub fn db_to_ratio(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}

pub fn ratio_to_db(ratio: f64) -> f64 {
    10.0 * ratio.log10()
}
