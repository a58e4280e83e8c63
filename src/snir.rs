//! Signal to noise and interference ratio of one reception.
//!
//! Worst case SNIR over a signal part is the reception's minimum power over
//! the part divided by the noise's maximum power over the same part; best case
//! is maximum over minimum. Zero noise gives an infinite ratio.

use crate::noise::Noise;
use crate::reception::Reception;
use crate::types::SignalPart;

#[derive(Debug, Clone)]
pub struct Snir<'a> {
    reception: &'a Reception,
    noise: Noise,
}

impl<'a> Snir<'a> {
    pub fn new(reception: &'a Reception, noise: Noise) -> Self {
        Self { reception, noise }
    }

    pub fn reception(&self) -> &'a Reception {
        self.reception
    }

    pub fn noise(&self) -> &Noise {
        &self.noise
    }

    /// Worst case linear SNIR over `part`.
    pub fn compute_min(&self, part: SignalPart) -> f64 {
        let start = self.reception.start_time(part);
        let end = self.reception.end_time(part);
        ratio(self.reception.compute_min_power(start, end), self.noise.compute_max_power(start, end))
    }

    /// Best case linear SNIR over `part`.
    pub fn compute_max(&self, part: SignalPart) -> f64 {
        let start = self.reception.start_time(part);
        let end = self.reception.end_time(part);
        ratio(self.reception.compute_max_power(start, end), self.noise.compute_min_power(start, end))
    }
}

fn ratio(signal: f64, noise: f64) -> f64 {
    if noise <= 0.0 { f64::INFINITY } else { signal / noise }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::power_timeline::PowerTimeline;
    use crate::reception::Transmission;
    use crate::signal_calculations::PhyParameters;
    use crate::types::{Band, SimTime};

    fn reception() -> Reception {
        let tx = Transmission::new(1, 1, Band::new(2_405e6, 2e6), 0.0, 10, SimTime::ZERO, &PhyParameters::default());
        Reception::new(&tx, 2, 1e-9)
    }

    #[test]
    fn min_and_max_snir_follow_noise_extremes() {
        let r = reception();
        let end = r.end_time(SignalPart::Whole);
        // 1e-11 W throughout, plus a 1e-10 W burst inside the data part only
        let mut timeline = PowerTimeline::pulse(SimTime::ZERO, end, 1e-11);
        timeline.merge_from(&PowerTimeline::pulse(SimTime::from_micros(300), SimTime::from_micros(400), 9e-11));
        let snir = Snir::new(&r, Noise::new(SimTime::ZERO, end, r.band, timeline));

        assert!((snir.compute_max(SignalPart::Whole) - 100.0).abs() < 1e-9);
        assert!((snir.compute_min(SignalPart::Whole) - 10.0).abs() < 1e-9);
        assert!((snir.compute_min(SignalPart::Preamble) - 100.0).abs() < 1e-9);
        assert!((snir.compute_min(SignalPart::Data) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn zero_noise_is_infinite_snir() {
        let r = reception();
        let end = r.end_time(SignalPart::Whole);
        let snir = Snir::new(&r, Noise::new(SimTime::ZERO, end, r.band, PowerTimeline::new()));
        assert!(snir.compute_min(SignalPart::Whole).is_infinite());
    }
}
