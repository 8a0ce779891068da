//! The text-to-image service the application delegates all sampling to.
//!
//! A prompt and an output size go in, a bitmap comes out. Everything about
//! how the image is produced stays behind the [`ImageSynthesizer`] trait.

mod comfyui;
#[cfg(test)]
mod test_server;
mod webui;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;
use reqwest::blocking::{Client, Response};
use tracing::info;

use crate::config::{AppConfig, BackendKind};
use crate::error::SynthesisError;
use crate::size::ImageSize;

pub use comfyui::ComfyUiClient;
pub use webui::WebUiClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub size: ImageSize,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, size: ImageSize) -> Self {
        Self {
            prompt: prompt.into(),
            size,
        }
    }
}

/// Shared flag a running generation checks to stop early.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once [`cancel`](Self::cancel) has been called.
    pub fn check(&self) -> Result<(), SynthesisError> {
        if self.is_cancelled() {
            Err(SynthesisError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A black-box image synthesis service.
///
/// Implementations block the calling thread; callers are expected to run
/// [`synthesize`](ImageSynthesizer::synthesize) off the UI thread.
pub trait ImageSynthesizer: Send + Sync {
    fn name(&self) -> &str;

    /// One-time readiness check performed at startup.
    fn warm_up(&self) -> Result<(), SynthesisError>;

    /// Produces one image for `request`.
    ///
    /// Once `cancel` trips, the adapter stops the work it submitted (and only
    /// that work) on the service and returns [`SynthesisError::Cancelled`].
    fn synthesize(
        &self,
        request: &GenerationRequest,
        cancel: &CancelToken,
    ) -> Result<DynamicImage, SynthesisError>;
}

/// Builds the adapter selected by `config.backend` and warms it up.
pub fn connect(config: &AppConfig) -> Result<Arc<dyn ImageSynthesizer>, SynthesisError> {
    let synth: Arc<dyn ImageSynthesizer> = match config.backend {
        BackendKind::ComfyUi => Arc::new(ComfyUiClient::new(config)?),
        BackendKind::WebUi => Arc::new(WebUiClient::new(config)?),
    };
    info!(
        backend = synth.name(),
        url = %config.api_url,
        model = %config.model_name,
        "loading model service"
    );
    synth.warm_up()?;
    info!(backend = synth.name(), "model service ready");
    Ok(synth)
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client, SynthesisError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

pub(crate) fn ensure_success(response: Response) -> Result<Response, SynthesisError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .unwrap_or_else(|_| "Unable to read body".to_string());
    Err(SynthesisError::Rejected {
        status: status.as_u16(),
        body,
    })
}

pub(crate) fn decode_image(bytes: &[u8]) -> Result<DynamicImage, SynthesisError> {
    image::load_from_memory(bytes).map_err(|err| SynthesisError::Decode(err.to_string()))
}
