//! Transmissions, their arrivals at receivers, and interference sets.
//!
//! A `Transmission` is what the sender put on air. A `Reception` is the same
//! signal as seen by one receiver: same timing, same band, with the received
//! power computed by the analog model. Power is constant over the reception
//! (scalar model), but every query goes through the reception's power
//! timeline so callers never depend on that.

use crate::power_timeline::PowerTimeline;
use crate::signal_calculations::{PhyParameters, part_duration};
use crate::types::{Band, SignalPart, SimTime};

#[derive(Debug, Clone)]
pub struct Transmission {
    pub id: u64,
    pub transmitter_id: u32,
    pub band: Band,
    /// Transmit power in dBm.
    pub power_dbm: f64,
    pub payload_bytes: usize,
    pub start: SimTime,
    pub preamble_duration: SimTime,
    pub header_duration: SimTime,
    pub data_duration: SimTime,
}

impl Transmission {
    /// Build a transmission whose part durations follow `phy`.
    pub fn new(
        id: u64,
        transmitter_id: u32,
        band: Band,
        power_dbm: f64,
        payload_bytes: usize,
        start: SimTime,
        phy: &PhyParameters,
    ) -> Self {
        Self {
            id,
            transmitter_id,
            band,
            power_dbm,
            payload_bytes,
            start,
            preamble_duration: part_duration(phy.part_bits(SignalPart::Preamble, payload_bytes), phy.bitrate),
            header_duration: part_duration(phy.part_bits(SignalPart::Header, payload_bytes), phy.bitrate),
            data_duration: part_duration(phy.part_bits(SignalPart::Data, payload_bytes), phy.bitrate),
        }
    }

    pub fn end(&self) -> SimTime {
        self.start + self.preamble_duration + self.header_duration + self.data_duration
    }

    pub fn duration(&self) -> SimTime {
        self.end() - self.start
    }
}

/// A transmission as it arrives at one receiver.
#[derive(Debug, Clone)]
pub struct Reception {
    pub transmission_id: u64,
    pub transmitter_id: u32,
    pub receiver_id: u32,
    pub band: Band,
    pub payload_bytes: usize,
    /// Received power (W) over the whole reception.
    pub power: f64,
    start: SimTime,
    preamble_end: SimTime,
    header_end: SimTime,
    end: SimTime,
    timeline: PowerTimeline,
}

impl Reception {
    /// Arrival of `transmission` at `receiver_id` with constant received power `power` (W).
    ///
    /// Propagation delay is not modeled; the reception shares the transmission's timing.
    pub fn new(transmission: &Transmission, receiver_id: u32, power: f64) -> Self {
        let start = transmission.start;
        let preamble_end = start + transmission.preamble_duration;
        let header_end = preamble_end + transmission.header_duration;
        let end = header_end + transmission.data_duration;
        Self {
            transmission_id: transmission.id,
            transmitter_id: transmission.transmitter_id,
            receiver_id,
            band: transmission.band,
            payload_bytes: transmission.payload_bytes,
            power,
            start,
            preamble_end,
            header_end,
            end,
            timeline: PowerTimeline::pulse(start, end, power),
        }
    }

    pub fn start_time(&self, part: SignalPart) -> SimTime {
        match part {
            SignalPart::Whole | SignalPart::Preamble => self.start,
            SignalPart::Header => self.preamble_end,
            SignalPart::Data => self.header_end,
        }
    }

    pub fn end_time(&self, part: SignalPart) -> SimTime {
        match part {
            SignalPart::Preamble => self.preamble_end,
            SignalPart::Header => self.header_end,
            SignalPart::Whole | SignalPart::Data => self.end,
        }
    }

    /// Received power contribution of this reception as a timeline.
    pub fn power_timeline(&self) -> &PowerTimeline {
        &self.timeline
    }

    pub fn compute_min_power(&self, start: SimTime, end: SimTime) -> f64 {
        self.timeline.compute_min_power(start, end)
    }

    pub fn compute_max_power(&self, start: SimTime, end: SimTime) -> f64 {
        self.timeline.compute_max_power(start, end)
    }

    /// True when this reception is on air at some point in `[start, end)`.
    pub fn overlaps(&self, start: SimTime, end: SimTime) -> bool {
        self.start < end && self.end > start
    }
}

/// Concurrent receptions, other than the one under evaluation, that overlap a window.
#[derive(Debug, Clone, Default)]
pub struct Interference<'a> {
    pub interfering_receptions: Vec<&'a Reception>,
}

impl<'a> Interference<'a> {
    pub fn none() -> Self {
        Self::default()
    }

    /// Select from `candidates` the receptions at the same receiver that overlap
    /// `reception` in time, excluding `reception` itself.
    pub fn for_reception(reception: &Reception, candidates: &'a [Reception]) -> Self {
        let start = reception.start_time(SignalPart::Whole);
        let end = reception.end_time(SignalPart::Whole);
        let interfering_receptions = candidates
            .iter()
            .filter(|other| other.receiver_id == reception.receiver_id)
            .filter(|other| other.transmission_id != reception.transmission_id)
            .filter(|other| other.overlaps(start, end))
            .collect();
        Self { interfering_receptions }
    }

    /// Every reception at `receiver_id` on air at some point in `[start, end)`.
    ///
    /// Used for channel sensing, where any activity counts, including the
    /// reception the receiver is about to decode.
    pub fn active_during(receiver_id: u32, start: SimTime, end: SimTime, candidates: &'a [Reception]) -> Self {
        let interfering_receptions = candidates
            .iter()
            .filter(|other| other.receiver_id == receiver_id && other.overlaps(start, end))
            .collect();
        Self { interfering_receptions }
    }

    pub fn len(&self) -> usize {
        self.interfering_receptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfering_receptions.is_empty()
    }
}
