//! Radio configuration loading.
//!
//! The radio configuration is a TOML file, by convention `radio.toml` next to
//! the scene file. Example:
//!
//! ```toml
//! [receiver]
//! energy-detection-dbm = -90.0
//! sensitivity-dbm = -85.0
//! snir-threshold-db = 4.0
//! decision-part = "whole"
//!
//! [receiver.error-model]
//! type = "ieee802154"
//!
//! [background-noise]
//! power-dbm = -110.0
//! jamming-frequencies = "2405 2410"
//! jamming-power-dbm = -60.0
//! ```

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::PhyError;
use crate::error_model::{ErrorModel, FixedErrorModel, Ieee802154ErrorModel};
use crate::noise::IsotropicBackgroundNoise;
use crate::receiver::FlatReceiver;
use crate::signal_calculations::PhyParameters;
use crate::types::{Band, SignalPart};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RadioConfig {
    pub receiver: ReceiverConfig,
    #[serde(default)]
    pub background_noise: Option<BackgroundNoiseConfig>,
    #[serde(default)]
    pub phy: PhyParameters,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReceiverConfig {
    pub energy_detection_dbm: f64,
    pub sensitivity_dbm: f64,
    #[serde(default = "default_snir_threshold_db")]
    pub snir_threshold_db: f64,
    /// Signal part the possibility and success decisions are made on.
    #[serde(default)]
    pub decision_part: SignalPart,
    /// Absent means an error free channel past the SNIR threshold.
    #[serde(default)]
    pub error_model: Option<ErrorModelConfig>,
}

fn default_snir_threshold_db() -> f64 {
    3.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ErrorModelConfig {
    Ieee802154,
    Fixed(FixedErrorModel),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BackgroundNoiseConfig {
    pub power_dbm: f64,
    /// Whitespace separated MHz list.
    #[serde(default)]
    pub jamming_frequencies: String,
    #[serde(default)]
    pub jamming_power_dbm: f64,
}

impl RadioConfig {
    /// Load configuration from a TOML file.
    pub fn load(config_path: &Path) -> anyhow::Result<Self> {
        let content =
            std::fs::read_to_string(config_path).with_context(|| format!("Failed to read radio config file: {}", config_path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse radio config file: {}", config_path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: RadioConfig = toml::from_str(content)?;
        anyhow::ensure!(
            config.phy.bitrate.is_finite() && config.phy.bitrate > 0.0,
            "Invalid phy bitrate {}, must be positive",
            config.phy.bitrate
        );
        Ok(config)
    }

    /// Derive the config path from a scene file path.
    ///
    /// Replaces the scene filename with "radio.toml" in the same directory.
    pub fn config_path_from_scene(scene_path: &str) -> PathBuf {
        let scene = Path::new(scene_path);
        scene.parent().unwrap_or(Path::new(".")).join("radio.toml")
    }

    /// Build one receiver for node `id` listening on `band`.
    pub fn build_receiver(&self, id: u32, band: Band) -> FlatReceiver {
        let receiver = FlatReceiver::new(
            id,
            band,
            self.receiver.energy_detection_dbm,
            self.receiver.sensitivity_dbm,
            self.receiver.snir_threshold_db,
        );
        match self.build_error_model() {
            Some(error_model) => receiver.with_error_model(error_model),
            None => receiver,
        }
    }

    fn build_error_model(&self) -> Option<Box<dyn ErrorModel>> {
        match self.receiver.error_model.as_ref()? {
            ErrorModelConfig::Ieee802154 => Some(Box::new(Ieee802154ErrorModel::new(self.phy.clone()))),
            ErrorModelConfig::Fixed(fixed) => Some(Box::new(FixedErrorModel::new(
                fixed.packet_error_rate,
                fixed.bit_error_rate,
                fixed.symbol_error_rate,
            ))),
        }
    }

    /// Build the background noise source, if one is configured.
    pub fn build_background_noise(&self) -> Result<Option<IsotropicBackgroundNoise>, PhyError> {
        let Some(config) = &self.background_noise else {
            return Ok(None);
        };
        let noise = IsotropicBackgroundNoise::new(config.power_dbm);
        if config.jamming_frequencies.trim().is_empty() {
            return Ok(Some(noise));
        }
        noise.with_jamming(&config.jamming_frequencies, config.jamming_power_dbm).map(Some)
    }
}
