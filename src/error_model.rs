//! Error rate models: SNIR to packet, bit and symbol error rates.
//!
//! Receivers hold an optional `ErrorModel`. Without one the channel is treated
//! as error free past the SNIR threshold.
//!
//! Two implementations:
//! - `FixedErrorModel`: constant rates regardless of SNIR, for calibration runs
//! - `Ieee802154ErrorModel`: the O-QPSK DSSS bit error curve of IEEE 802.15.4
//!   at 2.4 GHz, turned into packet and symbol error rates by bit count

use serde::Deserialize;

use crate::signal_calculations::PhyParameters;
use crate::snir::Snir;
use crate::types::SignalPart;

pub trait ErrorModel: Send + Sync {
    fn compute_packet_error_rate(&self, snir: &Snir<'_>, part: SignalPart) -> f64;
    fn compute_bit_error_rate(&self, snir: &Snir<'_>, part: SignalPart) -> f64;
    fn compute_symbol_error_rate(&self, snir: &Snir<'_>, part: SignalPart) -> f64;
}

/// Constant error rates.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FixedErrorModel {
    pub packet_error_rate: f64,
    #[serde(default)]
    pub bit_error_rate: f64,
    #[serde(default)]
    pub symbol_error_rate: f64,
}

impl FixedErrorModel {
    pub fn new(packet_error_rate: f64, bit_error_rate: f64, symbol_error_rate: f64) -> Self {
        Self {
            packet_error_rate: packet_error_rate.clamp(0.0, 1.0),
            bit_error_rate: bit_error_rate.clamp(0.0, 1.0),
            symbol_error_rate: symbol_error_rate.clamp(0.0, 1.0),
        }
    }
}

impl ErrorModel for FixedErrorModel {
    fn compute_packet_error_rate(&self, _snir: &Snir<'_>, _part: SignalPart) -> f64 {
        self.packet_error_rate
    }

    fn compute_bit_error_rate(&self, _snir: &Snir<'_>, _part: SignalPart) -> f64 {
        self.bit_error_rate
    }

    fn compute_symbol_error_rate(&self, _snir: &Snir<'_>, _part: SignalPart) -> f64 {
        self.symbol_error_rate
    }
}

/// Bits per O-QPSK symbol in the 2.4 GHz 802.15.4 PHY.
const BITS_PER_SYMBOL: i32 = 4;

/// IEEE 802.15.4 O-QPSK error model evaluated at the worst case SNIR of the part.
#[derive(Debug, Clone, Default)]
pub struct Ieee802154ErrorModel {
    phy: PhyParameters,
}

impl Ieee802154ErrorModel {
    pub fn new(phy: PhyParameters) -> Self {
        Self { phy }
    }

    /// Bit error rate at linear SNIR `sinr`:
    ///
    /// ```text
    /// BER = 8/15 × 1/16 × Σ_{k=2}^{16} (-1)^k × C(16, k) × exp(20 × SINR × (1/k − 1))
    /// ```
    ///
    /// The alternating sum loses precision at high SINR, so the result is clamped to [0, 0.5].
    pub fn bit_error_rate(sinr: f64) -> f64 {
        if sinr.is_infinite() {
            return 0.0;
        }
        let mut binomial = 16.0_f64; // C(16, 1)
        let mut sum = 0.0;
        for k in 2..=16 {
            binomial = binomial * (16 - k + 1) as f64 / k as f64;
            let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
            sum += sign * binomial * (20.0 * sinr * (1.0 / k as f64 - 1.0)).exp();
        }
        (8.0 / 15.0 * 1.0 / 16.0 * sum).clamp(0.0, 0.5)
    }

    fn part_bits(&self, snir: &Snir<'_>, part: SignalPart) -> u64 {
        self.phy.part_bits(part, snir.reception().payload_bytes)
    }
}

impl ErrorModel for Ieee802154ErrorModel {
    fn compute_packet_error_rate(&self, snir: &Snir<'_>, part: SignalPart) -> f64 {
        let ber = self.compute_bit_error_rate(snir, part);
        if ber == 0.0 {
            return 0.0;
        }
        let bits = self.part_bits(snir, part);
        let per = 1.0 - (1.0 - ber).powf(bits as f64);
        per.clamp(0.0, 1.0)
    }

    fn compute_bit_error_rate(&self, snir: &Snir<'_>, part: SignalPart) -> f64 {
        Self::bit_error_rate(snir.compute_min(part))
    }

    fn compute_symbol_error_rate(&self, snir: &Snir<'_>, part: SignalPart) -> f64 {
        let ber = self.compute_bit_error_rate(snir, part);
        (1.0 - (1.0 - ber).powi(BITS_PER_SYMBOL)).clamp(0.0, 1.0)
    }
}
