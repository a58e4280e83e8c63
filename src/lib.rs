//! Flat receiver reception simulation.
//!
//! Decides, for every transmission arriving at a receiver, whether the
//! receiver could listen, whether reception was possible, and whether it
//! succeeded, using scalar (flat) power thresholds:
//! - `power_timeline`: step function of power over time with min/max queries
//! - `noise`: isotropic background noise with optional jamming
//! - `analog_model`: received power and per-query noise aggregation
//! - `snir` / `error_model`: SNIR and its mapping to error rates
//! - `receiver`: the three-stage decision pipeline
//! - `scene` / `config` / `simulation`: file driven runs over a static node layout

pub mod analog_model;
pub mod config;
pub mod error;
pub mod error_model;
pub mod noise;
pub mod power_timeline;
pub mod reception;
pub mod receiver;
pub mod scene;
pub mod signal_calculations;
pub mod simulation;
pub mod snir;
pub mod types;

pub use error::PhyError;
pub use receiver::{FlatReceiver, Receiver, ReceptionResult, ReceptionVerdict, compute_reception_verdict};
pub use simulation::{SimulationReport, run_scene};
pub use types::{Band, SignalPart, SimTime};
