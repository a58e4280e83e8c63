//! Scalar analog model: received power and aggregate noise.
//!
//! The analog model is the only place where power timelines of different
//! origins are combined:
//! 1. Received power of a transmission at a receiver, from the log-distance
//!    path loss model (optionally with log-normal shadowing)
//! 2. Noise over a listening window, as the superposition of the background
//!    noise source and every interfering reception on the same band
//!
//! Bands are either identical or disjoint in the scalar model. An interfering
//! reception whose band partially overlaps the listening band cannot be
//! expressed as a scalar power and is rejected as a configuration error.

use rand::Rng;

use crate::error::PhyError;
use crate::noise::{BackgroundNoise, Noise};
use crate::power_timeline::PowerTimeline;
use crate::receiver::BandListening;
use crate::reception::{Interference, Reception, Transmission};
use crate::signal_calculations::{PathLossParameters, calculate_rssi, dbm_to_w};
use crate::snir::Snir;

pub struct ScalarAnalogModel {
    path_loss: PathLossParameters,
    background_noise: Option<Box<dyn BackgroundNoise>>,
}

impl ScalarAnalogModel {
    pub fn new(path_loss: PathLossParameters) -> Self {
        Self {
            path_loss,
            background_noise: None,
        }
    }

    pub fn with_background_noise(mut self, background_noise: Box<dyn BackgroundNoise>) -> Self {
        self.background_noise = Some(background_noise);
        self
    }

    pub fn path_loss(&self) -> &PathLossParameters {
        &self.path_loss
    }

    /// Arrival of `transmission` at a receiver `distance` meters away.
    pub fn compute_reception<R: Rng + ?Sized>(&self, transmission: &Transmission, receiver_id: u32, distance: f64, rng: &mut R) -> Reception {
        let rssi_dbm = calculate_rssi(distance, transmission.power_dbm, &self.path_loss, rng);
        log::trace!(
            "Transmission {} from {} reaches {} at {:.2} m with {:.2} dBm",
            transmission.id,
            transmission.transmitter_id,
            receiver_id,
            distance,
            rssi_dbm
        );
        Reception::new(transmission, receiver_id, dbm_to_w(rssi_dbm))
    }

    /// Aggregate noise on the listening band: background noise plus all interfering receptions.
    ///
    /// The returned noise is owned by the caller and scoped to this one query.
    pub fn compute_noise(&self, listening: &BandListening, interference: &Interference<'_>) -> Result<Noise, PhyError> {
        let mut timeline = match &self.background_noise {
            Some(background_noise) => background_noise.compute_noise(listening)?.timeline,
            None => PowerTimeline::new(),
        };
        for reception in &interference.interfering_receptions {
            if reception.band == listening.band {
                timeline.merge_from(reception.power_timeline());
            } else if !reception.band.is_disjoint(&listening.band) {
                log::error!(
                    "Interfering reception {} on {} partially overlaps listening band {}",
                    reception.transmission_id,
                    reception.band,
                    listening.band
                );
                return Err(PhyError::PartialBandOverlap {
                    listening_center: listening.band.center_frequency,
                    listening_bandwidth: listening.band.bandwidth,
                    interfering_center: reception.band.center_frequency,
                    interfering_bandwidth: reception.band.bandwidth,
                });
            }
        }
        Ok(Noise::new(listening.start, listening.end, listening.band, timeline))
    }

    pub fn compute_snir<'a>(&self, reception: &'a Reception, noise: Noise) -> Snir<'a> {
        Snir::new(reception, noise)
    }
}
