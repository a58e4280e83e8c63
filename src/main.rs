use anyhow::Context;
use env_logger::Builder;
use log::{LevelFilter, info, warn};
use std::path::PathBuf;

use flat_receiver_sim::config::RadioConfig;
use flat_receiver_sim::scene::load_scene;
use flat_receiver_sim::simulation::run_scene;

fn usage() -> String {
    "Usage: reception_sim <scene.json> [radio.toml]".to_string()
}

fn main() -> anyhow::Result<()> {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(Some("flat_receiver_sim"), LevelFilter::Debug)
        .parse_default_env()
        .init();

    let mut args = std::env::args().skip(1);
    let scene_path = args.next().with_context(usage)?;
    let config_path = args.next().map(PathBuf::from).unwrap_or_else(|| RadioConfig::config_path_from_scene(&scene_path));

    info!("Starting up");
    let scene = load_scene(&scene_path).with_context(|| format!("Failed to load scene: {}", scene_path))?;
    info!("Loaded scene {} with {} nodes and {} transmissions", scene_path, scene.nodes.len(), scene.transmissions.len());

    let config = RadioConfig::load(&config_path)?;
    info!("Loaded radio config from {}", config_path.display());

    let report = run_scene(&scene, &config).context("Simulation aborted")?;

    for result in &report.received {
        info!(
            "Node {} received transmission {} from {}: RSSI {:.1} dBm, SNIR {:.1}..{:.1} dB, PER {:.3e}, BER {:.3e}, SER {:.3e}",
            result.receiver_id,
            result.transmission_id,
            result.transmitter_id,
            result.rssi_dbm,
            result.min_snir_db,
            result.max_snir_db,
            result.error_rate.packet_error_rate,
            result.error_rate.bit_error_rate,
            result.error_rate.symbol_error_rate
        );
    }
    if !report.isolated_nodes.is_empty() {
        warn!("Isolated nodes: {:?}", report.isolated_nodes);
    }
    if report.total_receptions > 0 && report.received.is_empty() {
        warn!("No transmission was received by any node");
    }
    if let Some(noise) = &config.background_noise {
        info!("Background noise {:.1} dBm, jamming on [{}]", noise.power_dbm, noise.jamming_frequencies.trim());
    }
    info!(
        "Transmissions: {}, receptions evaluated: {}, received: {} ({:.1}%), failed: {}, impossible: {}, not listened: {}",
        report.total_transmissions,
        report.total_receptions,
        report.received_count(),
        report.reception_ratio() * 100.0,
        report.reception_failed,
        report.reception_impossible,
        report.listening_impossible
    );
    Ok(())
}
