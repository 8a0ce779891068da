pub mod config;
pub mod error;
pub mod imaging;
pub mod size;
pub mod synth;
pub mod telemetry;
