use std::sync::Arc;

use aigen_backend::config::AppConfig;
use aigen_backend::synth::{self, ImageSynthesizer};
use aigen_backend::telemetry;
use anyhow::{anyhow, Context, Result};
use tracing::{error, info};

fn main() -> Result<()> {
    telemetry::init_tracing();
    info!("AI Image Generator starting");

    let (config, synth) = match load_model() {
        Ok(loaded) => loaded,
        Err(err) => {
            error!(error = ?err, "failed to load model");
            let _ = rfd::MessageDialog::new()
                .set_level(rfd::MessageLevel::Error)
                .set_title("Error")
                .set_description(format!("Failed to load model: {err:#}"))
                .set_buttons(rfd::MessageButtons::Ok)
                .show();
            std::process::exit(1);
        }
    };

    aigen_frontend::run_frontend(synth, config).map_err(|err| anyhow!(err.to_string()))
}

fn load_model() -> Result<(AppConfig, Arc<dyn ImageSynthesizer>)> {
    let config = AppConfig::load().context("load configuration")?;
    let synth = synth::connect(&config)
        .with_context(|| format!("connect to {} at {}", config.backend, config.api_url))?;
    Ok((config, synth))
}
