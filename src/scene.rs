//! Scene loading, parsing, and validation logic.
//!
//! A scene is a JSON file describing a static layout of nodes, the shared
//! radio band, the propagation parameters and the list of transmissions to
//! evaluate. Mobility and traffic generation are outside this crate: the scene
//! already holds the final positions and the exact transmission start times.

use anyhow::Context;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use thiserror::Error;

use crate::signal_calculations::{PathLossParameters, PhyParameters};
use crate::types::{Band, SimTime};

/// Largest PSDU of the 802.15.4 PHY, in bytes.
pub const MAX_PAYLOAD_BYTES: usize = 127;

/// Error type for scene loading failures.
#[derive(Debug, Error)]
pub enum SceneLoadError {
    #[error("Failed to read file: {0}")]
    FileRead(String),
    #[error("Failed to parse JSON: {0}")]
    Parse(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Root structure representing the entire scene.
#[derive(Debug, Deserialize, Clone)]
pub struct Scene {
    /// Path loss model parameters for the physical layer.
    pub path_loss_parameters: PathLossParameters,
    /// Default band for every node and transmission.
    pub band: BandConfig,
    pub nodes: Vec<Node>,
    pub transmissions: Vec<TransmissionConfig>,
    /// Seed for shadowing and reception draws. Same seed, same run.
    #[serde(default)]
    pub seed: u64,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct BandConfig {
    pub center_frequency_mhz: f64,
    pub bandwidth_mhz: f64,
}

impl BandConfig {
    pub fn to_band(self) -> Band {
        Band::new(self.center_frequency_mhz * 1e6, self.bandwidth_mhz * 1e6)
    }
}

/// Node with fixed position and transmit power.
#[derive(Debug, Deserialize, Clone)]
pub struct Node {
    pub node_id: u32,
    pub position: Point,
    /// Transmit power in dBm.
    pub radio_strength: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TransmissionConfig {
    pub sender: u32,
    /// Start time in seconds.
    pub start_time: f64,
    pub payload_bytes: usize,
    /// Overrides the scene band's center frequency for this transmission.
    #[serde(default)]
    pub center_frequency_mhz: Option<f64>,
}

/// Simple 2D point in meters.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Squared Euclidean distance (avoids a sqrt when only comparing).
    pub fn distance2(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn distance(&self, other: &Point) -> f64 {
        self.distance2(other).sqrt()
    }
}

impl Scene {
    pub fn node(&self, node_id: u32) -> Option<&Node> {
        self.nodes.iter().find(|node| node.node_id == node_id)
    }

    /// Band of `transmission`, applying its center frequency override.
    pub fn transmission_band(&self, transmission: &TransmissionConfig) -> Band {
        let mut band = self.band;
        if let Some(center_frequency_mhz) = transmission.center_frequency_mhz {
            band.center_frequency_mhz = center_frequency_mhz;
        }
        band.to_band()
    }
}

/// Load and parse a scene from a file.
pub fn load_scene(path: &str) -> Result<Scene, SceneLoadError> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path))
        .map_err(|e| SceneLoadError::FileRead(e.to_string()))?;
    parse_scene(&data)
}

/// Parse and validate a scene from JSON text.
pub fn parse_scene(data: &str) -> Result<Scene, SceneLoadError> {
    let scene: Scene = serde_json::from_str(data)
        .context("Invalid JSON format")
        .map_err(|e| SceneLoadError::Parse(format!("{:#}", e)))?;
    validate_scene(&scene).map_err(SceneLoadError::Validation)?;
    Ok(scene)
}

/// Validate scene configuration to reject malformed inputs.
///
/// Checks for:
/// - Empty or excessive node count, duplicate node IDs
/// - Non-finite positions and unrealistic transmit powers
/// - Invalid path loss parameters and band
/// - Transmissions from unknown senders, negative start times, oversized payloads
/// - Start times too late for a maximum size frame at the default PHY rate to end in range
pub fn validate_scene(scene: &Scene) -> Result<(), String> {
    const MAX_NODES: usize = 10000;
    const MIN_RADIO_STRENGTH: f64 = -50.0;
    const MAX_RADIO_STRENGTH: f64 = 50.0;

    if scene.nodes.is_empty() {
        return Err("Scene must contain at least one node".to_string());
    }
    if scene.nodes.len() > MAX_NODES {
        return Err(format!("Node count {} exceeds maximum of {}", scene.nodes.len(), MAX_NODES));
    }

    let longest_frame = PhyParameters::default()
        .checked_frame_duration(MAX_PAYLOAD_BYTES)
        .ok_or_else(|| "Default PHY frame duration out of range".to_string())?;

    let mut node_ids = HashSet::new();
    for node in &scene.nodes {
        if !node_ids.insert(node.node_id) {
            return Err(format!("Duplicate node_id found: {}", node.node_id));
        }
        if !node.position.x.is_finite() || !node.position.y.is_finite() {
            return Err(format!("Node {} has a non-finite position", node.node_id));
        }
        if node.radio_strength < MIN_RADIO_STRENGTH || node.radio_strength > MAX_RADIO_STRENGTH {
            return Err(format!(
                "Node {} radio_strength {} dBm outside realistic range ({} to {} dBm)",
                node.node_id, node.radio_strength, MIN_RADIO_STRENGTH, MAX_RADIO_STRENGTH
            ));
        }
    }

    if scene.path_loss_parameters.path_loss_exponent <= 0.0 {
        return Err("Invalid path_loss_exponent, must be positive".to_string());
    }
    if scene.path_loss_parameters.shadowing_sigma < 0.0 {
        return Err("Invalid shadowing_sigma, must be non-negative".to_string());
    }

    if scene.band.center_frequency_mhz <= 0.0 || scene.band.bandwidth_mhz <= 0.0 {
        return Err("Invalid band, center frequency and bandwidth must be positive".to_string());
    }

    for (idx, transmission) in scene.transmissions.iter().enumerate() {
        if !node_ids.contains(&transmission.sender) {
            return Err(format!("Transmission {} has unknown sender {}", idx, transmission.sender));
        }
        if !transmission.start_time.is_finite() || transmission.start_time < 0.0 {
            return Err(format!("Transmission {} has invalid start_time {}", idx, transmission.start_time));
        }
        let ends_in_range = SimTime::try_from_secs_f64(transmission.start_time).and_then(|start| start.checked_add(longest_frame));
        if ends_in_range.is_none() {
            return Err(format!(
                "Transmission {} start_time {} s is beyond the simulated time range ({:.0} s)",
                idx,
                transmission.start_time,
                SimTime::MAX.as_secs_f64()
            ));
        }
        if transmission.payload_bytes > MAX_PAYLOAD_BYTES {
            return Err(format!(
                "Transmission {} payload of {} bytes exceeds maximum of {}",
                idx, transmission.payload_bytes, MAX_PAYLOAD_BYTES
            ));
        }
        if matches!(transmission.center_frequency_mhz, Some(f) if f <= 0.0) {
            return Err(format!("Transmission {} has a non-positive center frequency", idx));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"{
        "path_loss_parameters": { "path_loss_exponent": 2.0, "path_loss_at_reference_distance": 40.0 },
        "band": { "center_frequency_mhz": 2405.0, "bandwidth_mhz": 2.0 },
        "nodes": [
            { "node_id": 1, "position": { "x": 0.0, "y": 0.0 }, "radio_strength": 0.0 },
            { "node_id": 2, "position": { "x": 30.0, "y": 40.0 }, "radio_strength": 0.0 }
        ],
        "transmissions": [
            { "sender": 1, "start_time": 0.0, "payload_bytes": 20 },
            { "sender": 2, "start_time": 0.01, "payload_bytes": 20, "center_frequency_mhz": 2410.0 }
        ],
        "seed": 42
    }"#;

    #[test]
    fn parses_and_validates_scene() {
        let scene = parse_scene(SCENE).unwrap();
        assert_eq!(scene.nodes.len(), 2);
        assert_eq!(scene.seed, 42);
        assert_eq!(scene.path_loss_parameters.shadowing_sigma, 0.0);
        assert_eq!(scene.transmission_band(&scene.transmissions[0]), Band::new(2405e6, 2e6));
        assert_eq!(scene.transmission_band(&scene.transmissions[1]), Band::new(2410e6, 2e6));
        let a = scene.node(1).unwrap().position;
        let b = scene.node(2).unwrap().position;
        assert_eq!(a.distance(&b), 50.0);
    }

    #[test]
    fn rejects_unknown_sender() {
        let mut scene = parse_scene(SCENE).unwrap();
        scene.transmissions[0].sender = 9;
        assert!(validate_scene(&scene).unwrap_err().contains("unknown sender 9"));
    }

    #[test]
    fn rejects_duplicate_nodes_and_oversized_payloads() {
        let mut scene = parse_scene(SCENE).unwrap();
        scene.nodes[1].node_id = 1;
        assert!(validate_scene(&scene).unwrap_err().contains("Duplicate node_id"));

        let mut scene = parse_scene(SCENE).unwrap();
        scene.transmissions[1].payload_bytes = 200;
        assert!(validate_scene(&scene).is_err());
    }

    #[test]
    fn rejects_start_time_beyond_time_range() {
        let late = SCENE.replace(r#""start_time": 0.01"#, r#""start_time": 1.0e7"#);
        let err = parse_scene(&late).unwrap_err();
        assert!(matches!(err, SceneLoadError::Validation(ref msg) if msg.contains("beyond the simulated time range")));

        // Just inside the range is still accepted
        let mut scene = parse_scene(SCENE).unwrap();
        scene.transmissions[1].start_time = 9.0e6;
        assert!(validate_scene(&scene).is_ok());
    }

    #[test]
    fn reports_parse_errors() {
        let err = parse_scene("{ not json").unwrap_err();
        assert!(matches!(err, SceneLoadError::Parse(_)));
    }
}
