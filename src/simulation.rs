//! Scene driver: runs the reception pipeline over every transmission of a scene.
//!
//! High-level flow:
//! 1) Turn the scene's transmission list into `Transmission`s ordered by start time.
//! 2) Distribute each transmission to every other node as a `Reception`, with the
//!    received power from the analog model.
//! 3) Per receiver (in node id order), evaluate every reception in start order
//!    against all receptions known at that receiver, and count the verdicts.
//!
//! All receptions are known before the first decision, so interference sets are
//! complete when queried. A single seeded RNG drives shadowing and reception
//! draws in a fixed order, which makes runs with the same seed identical.

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::BTreeMap;

use crate::analog_model::ScalarAnalogModel;
use crate::config::RadioConfig;
use crate::error::PhyError;
use crate::reception::{Reception, Transmission};
use crate::receiver::{ReceptionResult, ReceptionVerdict, Receiver, compute_reception_verdict};
use crate::scene::Scene;
use crate::signal_calculations::calculate_effective_distance;
use crate::types::{SignalPart, SimTime};

/// Outcome counters and delivered packets of one run.
#[derive(Debug, Default, Clone)]
pub struct SimulationReport {
    pub total_transmissions: u64,
    /// Number of (receiver, transmission) pairs evaluated.
    pub total_receptions: u64,
    pub listening_impossible: u64,
    pub reception_impossible: u64,
    pub reception_failed: u64,
    pub received: Vec<ReceptionResult>,
    /// Nodes with no other node within deterministic link range in either direction.
    pub isolated_nodes: Vec<u32>,
}

impl SimulationReport {
    pub fn received_count(&self) -> u64 {
        self.received.len() as u64
    }

    /// Share of evaluated receptions that were delivered.
    pub fn reception_ratio(&self) -> f64 {
        if self.total_receptions == 0 {
            return 0.0;
        }
        self.received_count() as f64 / self.total_receptions as f64
    }

    fn record(&mut self, verdict: ReceptionVerdict) {
        self.total_receptions += 1;
        match verdict {
            ReceptionVerdict::ListeningImpossible => self.listening_impossible += 1,
            ReceptionVerdict::ReceptionImpossible => self.reception_impossible += 1,
            ReceptionVerdict::ReceptionFailed => self.reception_failed += 1,
            ReceptionVerdict::ReceptionSucceeded(result) => self.received.push(result),
        }
    }
}

/// Build the transmissions of `scene`, ordered by start time, with ids in that order.
///
/// Fails when a transmission would end past `SimTime::MAX` with the configured PHY.
fn build_transmissions(scene: &Scene, config: &RadioConfig) -> Result<Vec<Transmission>, PhyError> {
    let mut ordered: Vec<_> = scene.transmissions.iter().collect();
    ordered.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    let mut transmissions = Vec::with_capacity(ordered.len());
    for (id, t) in ordered.into_iter().enumerate() {
        let Some(sender) = scene.node(t.sender) else {
            continue;
        };
        let start = SimTime::try_from_secs_f64(t.start_time)
            .filter(|start| config.phy.checked_frame_duration(t.payload_bytes).and_then(|d| start.checked_add(d)).is_some());
        let Some(start) = start else {
            log::error!("Transmission from {} at {} s doesn't fit in the simulated time range", t.sender, t.start_time);
            return Err(PhyError::TimeOutOfRange {
                sender: t.sender,
                start_time: t.start_time,
            });
        };
        transmissions.push(Transmission::new(
            id as u64,
            t.sender,
            scene.transmission_band(t),
            sender.radio_strength,
            t.payload_bytes,
            start,
            &config.phy,
        ));
    }
    Ok(transmissions)
}

/// Nodes that can neither reach nor hear any other node, ignoring shadowing.
///
/// A link exists when the distance is within the sender's effective range at
/// `sensitivity_dbm`.
pub fn find_isolated_nodes(scene: &Scene, sensitivity_dbm: f64) -> Vec<u32> {
    let ranges: Vec<f64> = scene
        .nodes
        .iter()
        .map(|node| calculate_effective_distance(node.radio_strength, sensitivity_dbm, &scene.path_loss_parameters))
        .collect();
    scene
        .nodes
        .iter()
        .enumerate()
        .filter(|&(i, node)| {
            !scene.nodes.iter().enumerate().any(|(j, other)| {
                if i == j {
                    return false;
                }
                let distance = node.position.distance(&other.position);
                distance <= ranges[i] || distance <= ranges[j]
            })
        })
        .map(|(_, node)| node.node_id)
        .collect()
}

/// Arrival of every transmission at every node other than its sender.
fn distribute_transmissions(
    scene: &Scene,
    transmissions: &[Transmission],
    analog_model: &ScalarAnalogModel,
    rng: &mut StdRng,
) -> BTreeMap<u32, Vec<Reception>> {
    let mut receptions: BTreeMap<u32, Vec<Reception>> = scene.nodes.iter().map(|node| (node.node_id, Vec::new())).collect();
    for transmission in transmissions {
        let Some(sender) = scene.node(transmission.transmitter_id) else {
            continue;
        };
        for target in scene.nodes.iter().filter(|node| node.node_id != sender.node_id) {
            let distance = sender.position.distance(&target.position);
            let reception = analog_model.compute_reception(transmission, target.node_id, distance, rng);
            if let Some(list) = receptions.get_mut(&target.node_id) {
                list.push(reception);
            }
        }
    }
    receptions
}

/// Run every transmission of `scene` through the reception pipeline at every other node.
///
/// Returns the first fatal configuration error, if any.
pub fn run_scene(scene: &Scene, config: &RadioConfig) -> Result<SimulationReport, PhyError> {
    let mut rng = StdRng::seed_from_u64(scene.seed);
    let mut analog_model = ScalarAnalogModel::new(scene.path_loss_parameters.clone());
    if let Some(background_noise) = config.build_background_noise()? {
        analog_model = analog_model.with_background_noise(Box::new(background_noise));
    }
    let band = scene.band.to_band();
    let part: SignalPart = config.receiver.decision_part;

    let transmissions = build_transmissions(scene, config)?;
    log::info!("Running {} transmissions across {} nodes on {}", transmissions.len(), scene.nodes.len(), band);
    let isolated_nodes = find_isolated_nodes(scene, config.receiver.sensitivity_dbm);
    for node_id in &isolated_nodes {
        log::warn!("[{}] No other node within link range, its transmissions can only be lost", node_id);
    }

    let receptions = distribute_transmissions(scene, &transmissions, &analog_model, &mut rng);

    let mut report = SimulationReport {
        total_transmissions: transmissions.len() as u64,
        isolated_nodes,
        ..Default::default()
    };
    for (&node_id, node_receptions) in &receptions {
        let receiver = config.build_receiver(node_id, band);
        for reception in node_receptions {
            let verdict = compute_reception_verdict(&receiver, &analog_model, reception, node_receptions, part, &mut rng)?;
            log::debug!(
                "[{}] Transmission {} from {} at {}: {}",
                receiver.id(),
                reception.transmission_id,
                reception.transmitter_id,
                reception.start_time(SignalPart::Whole),
                verdict
            );
            report.record(verdict);
        }
    }

    log::info!(
        "Evaluated {} receptions: {} received, {} failed, {} impossible, {} not listened",
        report.total_receptions,
        report.received_count(),
        report.reception_failed,
        report.reception_impossible,
        report.listening_impossible
    );
    Ok(report)
}
