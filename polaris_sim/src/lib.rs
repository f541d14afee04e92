// polaris_sim/src/lib.rs

//! Headless scenario runner for the spherical position initializer.

pub mod cli;
pub mod error;
pub mod logging;
pub mod prng;
pub mod reference_core;
pub mod runner;
pub mod scenario;
pub mod sensors;
