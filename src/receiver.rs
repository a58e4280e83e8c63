//! Receiver decisions and the reception decision pipeline.
//!
//! For every (receiver, reception) pair the pipeline runs three stages in
//! order and stops at the first negative verdict:
//!
//! 1. **Listening**: maximum channel power over the listening window (background
//!    noise plus every active reception) must reach the energy detection level.
//! 2. **Reception possible**: the reception must be on the receiver's band and
//!    its own minimum power over the decision part must reach the sensitivity.
//!    Interference plays no part here.
//! 3. **Reception successful**: the worst case SNIR over the decision part must
//!    exceed the SNIR threshold, then the error model (if any) decides. Packet
//!    error rates of exactly 0.0 and 1.0 are decided without a random draw; any
//!    other rate consumes exactly one uniform draw.
//!
//! Successful receptions get an error rate record for the whole signal.
//!
//! Nothing here is cached between calls: every noise timeline is built for one
//! query and dropped with it.

use std::fmt;

use rand::{Rng, RngCore};

use crate::analog_model::ScalarAnalogModel;
use crate::error::PhyError;
use crate::error_model::ErrorModel;
use crate::reception::{Interference, Reception};
use crate::signal_calculations::{db_to_ratio, dbm_to_w, ratio_to_db, w_to_dbm};
use crate::snir::Snir;
use crate::types::{Band, SignalPart, SimTime};

/// Time and frequency window a receiver listens on.
#[derive(Debug, Clone, PartialEq)]
pub struct BandListening {
    pub receiver_id: u32,
    pub start: SimTime,
    pub end: SimTime,
    pub band: Band,
}

impl BandListening {
    pub fn new(receiver_id: u32, start: SimTime, end: SimTime, band: Band) -> Self {
        Self {
            receiver_id,
            start,
            end,
            band,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListeningDecision {
    pub listening: BandListening,
    /// Maximum channel power (W) seen during the window.
    pub max_power: f64,
    pub is_listening_possible: bool,
}

/// Error rates of a delivered packet over the whole signal.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ErrorRateInd {
    pub packet_error_rate: f64,
    pub bit_error_rate: f64,
    pub symbol_error_rate: f64,
}

/// A packet delivered to the receiver together with its quality metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceptionResult {
    pub transmission_id: u64,
    pub transmitter_id: u32,
    pub receiver_id: u32,
    pub payload_bytes: usize,
    /// Received power in dBm.
    pub rssi_dbm: f64,
    /// Worst case SNIR over the whole signal in dB.
    pub min_snir_db: f64,
    /// Best case SNIR over the whole signal in dB.
    pub max_snir_db: f64,
    pub error_rate: ErrorRateInd,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReceptionVerdict {
    ListeningImpossible,
    ReceptionImpossible,
    ReceptionFailed,
    ReceptionSucceeded(ReceptionResult),
}

impl ReceptionVerdict {
    pub fn is_success(&self) -> bool {
        matches!(self, ReceptionVerdict::ReceptionSucceeded(_))
    }
}

impl fmt::Display for ReceptionVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReceptionVerdict::ListeningImpossible => write!(f, "listening impossible"),
            ReceptionVerdict::ReceptionImpossible => write!(f, "reception impossible"),
            ReceptionVerdict::ReceptionFailed => write!(f, "reception failed"),
            ReceptionVerdict::ReceptionSucceeded(_) => write!(f, "reception succeeded"),
        }
    }
}

/// Source of the uniform [0, 1) draw used by the success decision.
pub trait UniformSource {
    fn next_uniform(&mut self) -> f64;
}

impl<R: RngCore> UniformSource for R {
    fn next_uniform(&mut self) -> f64 {
        self.r#gen::<f64>()
    }
}

/// Decision capabilities of a receiver family.
pub trait Receiver {
    fn id(&self) -> u32;

    fn band(&self) -> Band;

    fn create_listening(&self, start: SimTime, end: SimTime) -> BandListening {
        BandListening::new(self.id(), start, end, self.band())
    }

    fn compute_listening_decision(
        &self,
        listening: &BandListening,
        interference: &Interference<'_>,
        analog_model: &ScalarAnalogModel,
    ) -> Result<ListeningDecision, PhyError>;

    fn compute_is_reception_possible(&self, listening: &BandListening, reception: &Reception, part: SignalPart) -> bool;

    fn compute_is_reception_successful(
        &self,
        listening: &BandListening,
        reception: &Reception,
        part: SignalPart,
        interference: &Interference<'_>,
        snir: &Snir<'_>,
        uniform: &mut dyn UniformSource,
    ) -> bool;

    fn compute_reception_result(
        &self,
        listening: &BandListening,
        reception: &Reception,
        interference: &Interference<'_>,
        snir: &Snir<'_>,
    ) -> ReceptionResult;
}

/// Narrowband receiver with flat (scalar) power thresholds.
pub struct FlatReceiver {
    id: u32,
    band: Band,
    /// Energy detection level (W).
    energy_detection: f64,
    /// Sensitivity (W).
    sensitivity: f64,
    /// SNIR threshold (linear).
    snir_threshold: f64,
    error_model: Option<Box<dyn ErrorModel>>,
}

impl FlatReceiver {
    pub fn new(id: u32, band: Band, energy_detection_dbm: f64, sensitivity_dbm: f64, snir_threshold_db: f64) -> Self {
        Self {
            id,
            band,
            energy_detection: dbm_to_w(energy_detection_dbm),
            sensitivity: dbm_to_w(sensitivity_dbm),
            snir_threshold: db_to_ratio(snir_threshold_db),
            error_model: None,
        }
    }

    pub fn with_error_model(mut self, error_model: Box<dyn ErrorModel>) -> Self {
        self.error_model = Some(error_model);
        self
    }

    pub fn energy_detection(&self) -> f64 {
        self.energy_detection
    }

    pub fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    pub fn has_error_model(&self) -> bool {
        self.error_model.is_some()
    }

    /// SNIR pre-verdict: worst case SNIR over `part` above the threshold.
    fn is_snir_sufficient(&self, snir: &Snir<'_>, part: SignalPart) -> bool {
        let min_snir = snir.compute_min(part);
        let sufficient = min_snir > self.snir_threshold;
        log::debug!(
            "[{}] Computing whether SNIR is sufficient: minimum SNIR = {:.2} dB, threshold = {:.2} dB -> {}",
            self.id,
            ratio_to_db(min_snir),
            ratio_to_db(self.snir_threshold),
            if sufficient { "sufficient" } else { "insufficient" }
        );
        sufficient
    }
}

impl Receiver for FlatReceiver {
    fn id(&self) -> u32 {
        self.id
    }

    fn band(&self) -> Band {
        self.band
    }

    fn compute_listening_decision(
        &self,
        listening: &BandListening,
        interference: &Interference<'_>,
        analog_model: &ScalarAnalogModel,
    ) -> Result<ListeningDecision, PhyError> {
        let noise = analog_model.compute_noise(listening, interference)?;
        let max_power = noise.compute_peak_power();
        let is_listening_possible = max_power >= self.energy_detection;
        log::debug!(
            "[{}] Computing whether listening is possible: maximum power = {:.2} dBm, energy detection = {:.2} dBm -> listening is {}",
            self.id,
            w_to_dbm(max_power),
            w_to_dbm(self.energy_detection),
            if is_listening_possible { "possible" } else { "impossible" }
        );
        Ok(ListeningDecision {
            listening: listening.clone(),
            max_power,
            is_listening_possible,
        })
    }

    fn compute_is_reception_possible(&self, listening: &BandListening, reception: &Reception, part: SignalPart) -> bool {
        if reception.band != listening.band {
            log::debug!(
                "[{}] Reception {} on {} doesn't match listening band {} -> reception is impossible",
                self.id,
                reception.transmission_id,
                reception.band,
                listening.band
            );
            return false;
        }
        let min_reception_power = reception.compute_min_power(reception.start_time(part), reception.end_time(part));
        let is_reception_possible = min_reception_power >= self.sensitivity;
        log::debug!(
            "[{}] Computing whether reception is possible: minimum reception power = {:.2} dBm, sensitivity = {:.2} dBm -> reception is {}",
            self.id,
            w_to_dbm(min_reception_power),
            w_to_dbm(self.sensitivity),
            if is_reception_possible { "possible" } else { "impossible" }
        );
        is_reception_possible
    }

    fn compute_is_reception_successful(
        &self,
        _listening: &BandListening,
        _reception: &Reception,
        part: SignalPart,
        _interference: &Interference<'_>,
        snir: &Snir<'_>,
        uniform: &mut dyn UniformSource,
    ) -> bool {
        if !self.is_snir_sufficient(snir, part) {
            return false;
        }
        let Some(error_model) = &self.error_model else {
            return true;
        };
        let packet_error_rate = error_model.compute_packet_error_rate(snir, part);
        if packet_error_rate == 0.0 {
            true
        } else if packet_error_rate == 1.0 {
            false
        } else {
            uniform.next_uniform() > packet_error_rate
        }
    }

    fn compute_reception_result(
        &self,
        _listening: &BandListening,
        reception: &Reception,
        _interference: &Interference<'_>,
        snir: &Snir<'_>,
    ) -> ReceptionResult {
        let error_rate = match &self.error_model {
            Some(error_model) => ErrorRateInd {
                packet_error_rate: error_model.compute_packet_error_rate(snir, SignalPart::Whole),
                bit_error_rate: error_model.compute_bit_error_rate(snir, SignalPart::Whole),
                symbol_error_rate: error_model.compute_symbol_error_rate(snir, SignalPart::Whole),
            },
            None => ErrorRateInd::default(),
        };
        ReceptionResult {
            transmission_id: reception.transmission_id,
            transmitter_id: reception.transmitter_id,
            receiver_id: self.id,
            payload_bytes: reception.payload_bytes,
            rssi_dbm: w_to_dbm(reception.power),
            min_snir_db: ratio_to_db(snir.compute_min(SignalPart::Whole)),
            max_snir_db: ratio_to_db(snir.compute_max(SignalPart::Whole)),
            error_rate,
        }
    }
}

/// Run the three decision stages for `reception` at `receiver`.
///
/// `active_receptions` holds every reception currently known at the receiver,
/// possibly including `reception` itself; all of them must be final before
/// the call. A negative verdict at one stage is final and later stages are not
/// evaluated. Errors are fatal configuration errors only.
pub fn compute_reception_verdict<R: Receiver + ?Sized>(
    receiver: &R,
    analog_model: &ScalarAnalogModel,
    reception: &Reception,
    active_receptions: &[Reception],
    part: SignalPart,
    uniform: &mut dyn UniformSource,
) -> Result<ReceptionVerdict, PhyError> {
    let listening = receiver.create_listening(reception.start_time(SignalPart::Whole), reception.end_time(SignalPart::Whole));

    let channel_activity = Interference::active_during(receiver.id(), listening.start, listening.end, active_receptions);
    let listening_decision = receiver.compute_listening_decision(&listening, &channel_activity, analog_model)?;
    if !listening_decision.is_listening_possible {
        return Ok(ReceptionVerdict::ListeningImpossible);
    }

    if !receiver.compute_is_reception_possible(&listening, reception, part) {
        return Ok(ReceptionVerdict::ReceptionImpossible);
    }

    let interference = Interference::for_reception(reception, active_receptions);
    let noise = analog_model.compute_noise(&listening, &interference)?;
    let snir = analog_model.compute_snir(reception, noise);
    if !receiver.compute_is_reception_successful(&listening, reception, part, &interference, &snir, uniform) {
        log::debug!(
            "[{}] Reception {} from {} failed with {} interferers",
            receiver.id(),
            reception.transmission_id,
            reception.transmitter_id,
            interference.len()
        );
        return Ok(ReceptionVerdict::ReceptionFailed);
    }

    Ok(ReceptionVerdict::ReceptionSucceeded(receiver.compute_reception_result(
        &listening,
        reception,
        &interference,
        &snir,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_model::FixedErrorModel;
    use crate::noise::IsotropicBackgroundNoise;
    use crate::power_timeline::PowerTimeline;
    use crate::reception::Transmission;
    use crate::signal_calculations::{PathLossParameters, PhyParameters};

    const RECEIVER_ID: u32 = 7;

    fn band() -> Band {
        Band::new(2_405e6, 2e6)
    }

    fn analog_model(background_dbm: f64) -> ScalarAnalogModel {
        ScalarAnalogModel::new(PathLossParameters {
            path_loss_exponent: 2.0,
            shadowing_sigma: 0.0,
            path_loss_at_reference_distance: 40.0,
        })
        .with_background_noise(Box::new(IsotropicBackgroundNoise::new(background_dbm)))
    }

    fn reception_at(id: u64, start_us: i64, power_dbm: f64) -> Reception {
        let tx = Transmission::new(id, id as u32, band(), 0.0, 20, SimTime::from_micros(start_us), &PhyParameters::default());
        Reception::new(&tx, RECEIVER_ID, dbm_to_w(power_dbm))
    }

    fn receiver(energy_detection_dbm: f64, sensitivity_dbm: f64) -> FlatReceiver {
        FlatReceiver::new(RECEIVER_ID, band(), energy_detection_dbm, sensitivity_dbm, 4.0)
    }

    struct CountingDraw {
        value: f64,
        calls: u32,
    }

    impl UniformSource for CountingDraw {
        fn next_uniform(&mut self) -> f64 {
            self.calls += 1;
            self.value
        }
    }

    fn draw(value: f64) -> CountingDraw {
        CountingDraw { value, calls: 0 }
    }

    fn snir_for<'a>(reception: &'a Reception, noise_dbm: f64) -> Snir<'a> {
        let start = reception.start_time(SignalPart::Whole);
        let end = reception.end_time(SignalPart::Whole);
        Snir::new(
            reception,
            crate::noise::Noise::new(start, end, band(), PowerTimeline::pulse(start, end, dbm_to_w(noise_dbm))),
        )
    }

    #[test]
    fn listening_requires_energy_above_detection_level() {
        let model = analog_model(-110.0);
        let r = reception_at(1, 0, -70.0);
        let active = [r.clone()];
        let listening = receiver(-90.0, -95.0).create_listening(r.start_time(SignalPart::Whole), r.end_time(SignalPart::Whole));
        let interference = Interference::active_during(RECEIVER_ID, listening.start, listening.end, &active);

        let decision = receiver(-90.0, -95.0).compute_listening_decision(&listening, &interference, &model).unwrap();
        assert!(decision.is_listening_possible);

        let quiet = receiver(-90.0, -95.0).compute_listening_decision(&listening, &Interference::none(), &model).unwrap();
        assert!(!quiet.is_listening_possible);
        assert_eq!(quiet.max_power, dbm_to_w(-110.0));
    }

    #[test]
    fn lowering_energy_detection_only_enables_listening() {
        let model = analog_model(-100.0);
        let r = reception_at(1, 0, -85.0);
        let active = [r.clone()];
        let mut previous = false;
        for detection_dbm in [-60.0, -70.0, -80.0, -84.0, -85.0, -90.0, -120.0] {
            let rx = receiver(detection_dbm, -95.0);
            let listening = rx.create_listening(r.start_time(SignalPart::Whole), r.end_time(SignalPart::Whole));
            let interference = Interference::active_during(RECEIVER_ID, listening.start, listening.end, &active);
            let possible = rx.compute_listening_decision(&listening, &interference, &model).unwrap().is_listening_possible;
            assert!(possible || !previous, "listening flipped back to impossible at {detection_dbm} dBm");
            previous = possible;
        }
        assert!(previous);
    }

    #[test]
    fn reception_possible_compares_min_power_with_sensitivity() {
        let r = reception_at(1, 0, -85.0);
        let rx = receiver(-100.0, -90.0);
        let listening = rx.create_listening(SimTime::ZERO, r.end_time(SignalPart::Whole));
        assert!(rx.compute_is_reception_possible(&listening, &r, SignalPart::Whole));
        let deaf = receiver(-100.0, -80.0);
        assert!(!deaf.compute_is_reception_possible(&listening, &r, SignalPart::Whole));
    }

    #[test]
    fn reception_on_another_band_is_impossible() {
        let tx = Transmission::new(1, 1, Band::new(2_410e6, 2e6), 0.0, 20, SimTime::ZERO, &PhyParameters::default());
        let r = Reception::new(&tx, RECEIVER_ID, dbm_to_w(-40.0));
        let rx = receiver(-100.0, -90.0);
        let listening = rx.create_listening(SimTime::ZERO, r.end_time(SignalPart::Whole));
        assert!(!rx.compute_is_reception_possible(&listening, &r, SignalPart::Whole));
    }

    #[test]
    fn success_without_error_model_only_needs_snir() {
        let r = reception_at(1, 0, -80.0);
        let rx = receiver(-100.0, -95.0);
        let listening = rx.create_listening(SimTime::ZERO, r.end_time(SignalPart::Whole));
        let mut uniform = draw(0.0);
        // 10 dB above the 4 dB threshold
        assert!(rx.compute_is_reception_successful(&listening, &r, SignalPart::Whole, &Interference::none(), &snir_for(&r, -90.0), &mut uniform));
        // 2 dB, below the threshold
        assert!(!rx.compute_is_reception_successful(&listening, &r, SignalPart::Whole, &Interference::none(), &snir_for(&r, -82.0), &mut uniform));
        assert_eq!(uniform.calls, 0);
    }

    #[test]
    fn boundary_error_rates_never_draw() {
        let r = reception_at(1, 0, -60.0);
        let snir = snir_for(&r, -100.0);
        let listening = BandListening::new(RECEIVER_ID, SimTime::ZERO, r.end_time(SignalPart::Whole), band());

        let certain = receiver(-100.0, -95.0).with_error_model(Box::new(FixedErrorModel::new(0.0, 0.0, 0.0)));
        let hopeless = receiver(-100.0, -95.0).with_error_model(Box::new(FixedErrorModel::new(1.0, 0.5, 1.0)));
        // Draw values chosen to contradict the expected outcome if they were used
        let mut low = draw(0.0);
        let mut high = draw(0.999);
        assert!(certain.compute_is_reception_successful(&listening, &r, SignalPart::Whole, &Interference::none(), &snir, &mut low));
        assert!(!hopeless.compute_is_reception_successful(&listening, &r, SignalPart::Whole, &Interference::none(), &snir, &mut high));
        assert_eq!(low.calls, 0);
        assert_eq!(high.calls, 0);
    }

    #[test]
    fn intermediate_error_rate_consumes_one_draw() {
        let r = reception_at(1, 0, -60.0);
        let snir = snir_for(&r, -100.0);
        let listening = BandListening::new(RECEIVER_ID, SimTime::ZERO, r.end_time(SignalPart::Whole), band());
        let rx = receiver(-100.0, -95.0).with_error_model(Box::new(FixedErrorModel::new(0.3, 0.01, 0.04)));

        let mut pass = draw(0.5);
        assert!(rx.compute_is_reception_successful(&listening, &r, SignalPart::Whole, &Interference::none(), &snir, &mut pass));
        assert_eq!(pass.calls, 1);

        let mut fail = draw(0.2);
        assert!(!rx.compute_is_reception_successful(&listening, &r, SignalPart::Whole, &Interference::none(), &snir, &mut fail));
        assert_eq!(fail.calls, 1);

        // Failure probability equals the error rate: a draw equal to it fails
        let mut edge = draw(0.3);
        assert!(!rx.compute_is_reception_successful(&listening, &r, SignalPart::Whole, &Interference::none(), &snir, &mut edge));
    }

    #[test]
    fn reception_result_carries_error_rates_or_zeros() {
        let r = reception_at(1, 0, -60.0);
        let snir = snir_for(&r, -100.0);
        let listening = BandListening::new(RECEIVER_ID, SimTime::ZERO, r.end_time(SignalPart::Whole), band());

        let plain = receiver(-100.0, -95.0).compute_reception_result(&listening, &r, &Interference::none(), &snir);
        assert_eq!(plain.error_rate, ErrorRateInd::default());
        assert!((plain.rssi_dbm + 60.0).abs() < 1e-9);
        assert!((plain.min_snir_db - 40.0).abs() < 1e-9);
        assert!((plain.max_snir_db - 40.0).abs() < 1e-9);

        let modeled = receiver(-100.0, -95.0)
            .with_error_model(Box::new(FixedErrorModel::new(0.3, 0.01, 0.04)))
            .compute_reception_result(&listening, &r, &Interference::none(), &snir);
        assert_eq!(
            modeled.error_rate,
            ErrorRateInd {
                packet_error_rate: 0.3,
                bit_error_rate: 0.01,
                symbol_error_rate: 0.04
            }
        );
        assert_eq!(modeled.transmission_id, 1);
        assert_eq!(modeled.receiver_id, RECEIVER_ID);
    }

    #[test]
    fn pipeline_rejects_on_silent_channel() {
        let model = analog_model(-110.0);
        let r = reception_at(1, 0, -92.0);
        let rx = receiver(-85.0, -95.0);
        let verdict = compute_reception_verdict(&rx, &model, &r, &[r.clone()], SignalPart::Whole, &mut draw(0.5)).unwrap();
        assert_eq!(verdict, ReceptionVerdict::ListeningImpossible);
    }

    #[test]
    fn pipeline_fails_under_strong_interference() {
        let model = analog_model(-110.0);
        let wanted = reception_at(1, 0, -70.0);
        let jammer = reception_at(2, 100, -68.0);
        let active = vec![wanted.clone(), jammer];
        let rx = receiver(-90.0, -95.0);
        let verdict = compute_reception_verdict(&rx, &model, &wanted, &active, SignalPart::Whole, &mut draw(0.5)).unwrap();
        assert_eq!(verdict, ReceptionVerdict::ReceptionFailed);

        let alone = compute_reception_verdict(&rx, &model, &wanted, &active[..1], SignalPart::Whole, &mut draw(0.5)).unwrap();
        assert!(alone.is_success());
    }

    #[test]
    fn pipeline_surfaces_bandwidth_mismatch() {
        let model = analog_model(-110.0);
        let r = reception_at(1, 0, -70.0);
        let narrow = receiver(-90.0, -95.0);
        assert!(compute_reception_verdict(&narrow, &model, &r, &[r.clone()], SignalPart::Whole, &mut draw(0.5)).is_ok());
        let wide = FlatReceiver::new(RECEIVER_ID, Band::new(2_405e6, 5e6), -90.0, -95.0, 4.0);
        let err = compute_reception_verdict(&wide, &model, &r, &[r.clone()], SignalPart::Whole, &mut draw(0.5)).unwrap_err();
        assert!(matches!(err, PhyError::BandwidthMismatch { .. }));
    }
}
