pub mod app;

use std::sync::Arc;

use aigen_backend::config::AppConfig;
use aigen_backend::synth::ImageSynthesizer;
use eframe::{self, egui};

pub use app::{AigenApp, Session, Studio};

pub const WINDOW_TITLE: &str = "AI Image Generator";

/// Launches the egui application with default window options.
pub fn run_frontend(
    synth: Arc<dyn ImageSynthesizer>,
    config: AppConfig,
) -> Result<(), eframe::Error> {
    run_frontend_with_options(synth, config, default_native_options())
}

/// Launches the egui app with caller-provided options.
pub fn run_frontend_with_options(
    synth: Arc<dyn ImageSynthesizer>,
    config: AppConfig,
    options: eframe::NativeOptions,
) -> Result<(), eframe::Error> {
    eframe::run_native(
        WINDOW_TITLE,
        options,
        Box::new(move |cc| Ok(Box::new(AigenApp::new(cc, synth, &config)))),
    )
}

fn default_native_options() -> eframe::NativeOptions {
    eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([1000.0, 700.0])
            .with_maximized(true),
        ..Default::default()
    }
}
