// polaris_core/src/lib.rs

//! Initialization and adaptation manager for a position filter that fuses a
//! bearing-angle pair and a range into a Cartesian position seed.

pub mod config;
pub mod error;
pub mod estimation;
pub mod frames;
pub mod handlers;
pub mod initializer;
pub mod lifecycle;
pub mod manager;
pub mod messages;
pub mod params;
pub mod prelude;
pub mod process_noise;
pub mod seed;
pub mod types;
