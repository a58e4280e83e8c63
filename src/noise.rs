//! Noise objects and the background noise source.
//!
//! `Noise` is the power timeline seen on one band during one listening
//! window. `IsotropicBackgroundNoise` produces the ambient part of it: a flat
//! power level over the whole window, replaced by a jamming level when the
//! window's center frequency is one of the configured jamming targets.
//!
//! The background noise source binds a bandwidth to each center frequency the
//! first time that frequency is listened to. Every later listening on the same
//! center frequency must use the same bandwidth, otherwise the scenario is
//! misconfigured and `PhyError::BandwidthMismatch` is returned.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::PhyError;
use crate::power_timeline::PowerTimeline;
use crate::receiver::BandListening;
use crate::signal_calculations::dbm_to_w;
use crate::types::{Band, SimTime};

/// Power on a band over a time window.
#[derive(Debug, Clone)]
pub struct Noise {
    pub start: SimTime,
    pub end: SimTime,
    pub band: Band,
    pub timeline: PowerTimeline,
}

impl Noise {
    pub fn new(start: SimTime, end: SimTime, band: Band, timeline: PowerTimeline) -> Self {
        Self { start, end, band, timeline }
    }

    pub fn compute_max_power(&self, start: SimTime, end: SimTime) -> f64 {
        self.timeline.compute_max_power(start, end)
    }

    pub fn compute_min_power(&self, start: SimTime, end: SimTime) -> f64 {
        self.timeline.compute_min_power(start, end)
    }

    /// Maximum power over the noise's own window.
    pub fn compute_peak_power(&self) -> f64 {
        self.timeline.compute_max_power(self.start, self.end)
    }
}

/// Ambient noise capability consumed by the analog model.
pub trait BackgroundNoise: Send + Sync {
    fn compute_noise(&self, listening: &BandListening) -> Result<Noise, PhyError>;
}

/// Spatially uniform scalar background noise with optional jamming.
#[derive(Debug)]
pub struct IsotropicBackgroundNoise {
    /// Ambient power (W).
    power: f64,
    /// Jamming target center frequencies (Hz).
    jamming_frequencies: Vec<f64>,
    /// Jamming power (W).
    jamming_power: f64,
    /// Center frequency bits -> bandwidth bound on first use.
    bandwidths: Mutex<HashMap<u64, f64>>,
}

impl IsotropicBackgroundNoise {
    pub fn new(power_dbm: f64) -> Self {
        Self {
            power: dbm_to_w(power_dbm),
            jamming_frequencies: Vec::new(),
            jamming_power: 0.0,
            bandwidths: Mutex::new(HashMap::new()),
        }
    }

    /// Configure jamming from a whitespace separated list of MHz values and a power in dBm.
    pub fn with_jamming(mut self, frequencies_mhz: &str, jamming_power_dbm: f64) -> Result<Self, PhyError> {
        self.jamming_frequencies = parse_jamming_frequencies(frequencies_mhz)?;
        self.jamming_power = dbm_to_w(jamming_power_dbm);
        if self.jamming_frequencies.is_empty() {
            log::warn!("Jamming power {} dBm configured without any jamming frequency", jamming_power_dbm);
        } else if self.jamming_power < self.power {
            log::warn!("Jamming power {} dBm is below the ambient noise power, jammed bands get quieter", jamming_power_dbm);
        }
        Ok(self)
    }

    /// Ambient power in W.
    pub fn power(&self) -> f64 {
        self.power
    }

    pub fn jamming_frequencies(&self) -> &[f64] {
        &self.jamming_frequencies
    }

    /// Bind `band`'s bandwidth on first use, or check it against the bound value.
    fn bind_bandwidth(&self, band: &Band) -> Result<(), PhyError> {
        let mut bandwidths = self.bandwidths.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let bound = *bandwidths.entry(band.center_frequency.to_bits()).or_insert(band.bandwidth);
        if bound != band.bandwidth {
            log::error!(
                "Background noise bandwidth {} Hz doesn't match listening bandwidth {} Hz at {} Hz",
                bound,
                band.bandwidth,
                band.center_frequency
            );
            return Err(PhyError::BandwidthMismatch {
                center_frequency: band.center_frequency,
                bound,
                requested: band.bandwidth,
            });
        }
        Ok(())
    }

    /// Effective ambient power on `center_frequency`: jamming replaces ambient power on targeted bands.
    fn effective_power(&self, center_frequency: f64) -> f64 {
        if self.jamming_frequencies.iter().any(|&f| f == center_frequency) {
            self.jamming_power
        } else {
            self.power
        }
    }
}

impl BackgroundNoise for IsotropicBackgroundNoise {
    fn compute_noise(&self, listening: &BandListening) -> Result<Noise, PhyError> {
        self.bind_bandwidth(&listening.band)?;
        let power = self.effective_power(listening.band.center_frequency);
        log::trace!(
            "Background noise on {} during {}..{}: {:e} W",
            listening.band,
            listening.start,
            listening.end,
            power
        );
        let timeline = PowerTimeline::pulse(listening.start, listening.end, power);
        Ok(Noise::new(listening.start, listening.end, listening.band, timeline))
    }
}

/// Parse a whitespace separated list of MHz values into Hz.
///
/// An empty string means no jamming.
pub fn parse_jamming_frequencies(frequencies_mhz: &str) -> Result<Vec<f64>, PhyError> {
    frequencies_mhz
        .split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .ok()
                .filter(|mhz| mhz.is_finite())
                .map(|mhz| mhz * 1e6)
                .ok_or_else(|| PhyError::InvalidJammingFrequency(token.to_string()))
        })
        .collect()
}
