//! Fatal configuration errors raised by the reception core.
//!
//! Negative reception verdicts are not errors; they are returned as
//! [`crate::receiver::ReceptionVerdict`] variants. Everything in here means the
//! scenario itself is misconfigured and the run should stop.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PhyError {
    /// A band was already bound to a different bandwidth earlier in the run.
    #[error("Background noise bandwidth {bound} Hz doesn't match listening bandwidth {requested} Hz at {center_frequency} Hz")]
    BandwidthMismatch { center_frequency: f64, bound: f64, requested: f64 },

    /// The scalar model only handles identical or disjoint bands.
    #[error(
        "Interfering band {interfering_center} Hz/{interfering_bandwidth} Hz partially overlaps listening band {listening_center} Hz/{listening_bandwidth} Hz"
    )]
    PartialBandOverlap {
        listening_center: f64,
        listening_bandwidth: f64,
        interfering_center: f64,
        interfering_bandwidth: f64,
    },

    #[error("Invalid jamming frequency: {0}")]
    InvalidJammingFrequency(String),

    /// A transmission would end past the largest representable simulation time.
    #[error("Transmission from {sender} starting at {start_time} s ends beyond the simulated time range")]
    TimeOutOfRange { sender: u32, start_time: f64 },
}
