use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::DynamicImage;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use super::{decode_image, ensure_success, http_client, CancelToken, GenerationRequest, ImageSynthesizer};
use crate::config::AppConfig;
use crate::error::SynthesisError;

/// Client for the Stable Diffusion WebUI `sdapi` endpoints.
pub struct WebUiClient {
    api_url: String,
    config: AppConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct Txt2ImgPayload<'a> {
    prompt: &'a str,
    negative_prompt: &'a str,
    width: u32,
    height: u32,
    steps: u32,
    cfg_scale: f32,
    sampler_name: &'a str,
    seed: i64,
    batch_size: u32,
    n_iter: u32,
    override_settings: serde_json::Value,
    /// Lets `/internal/progress` report on this request specifically.
    force_task_id: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct TaskProgress {
    #[serde(default)]
    active: bool,
    #[serde(default)]
    queued: bool,
}

#[derive(Debug, Deserialize)]
struct Txt2ImgResponse {
    #[serde(default)]
    images: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SdModel {
    title: String,
    model_name: String,
}

impl WebUiClient {
    pub fn new(config: &AppConfig) -> Result<Self, SynthesisError> {
        let api_url = crate::config::sanitize_base_url(&config.api_url)
            .map_err(|err| SynthesisError::InvalidUrl(format!("{err:#}")))?;
        Ok(Self {
            api_url,
            config: config.clone(),
            client: http_client(config.request_timeout())?,
        })
    }

    fn payload<'a>(
        &'a self,
        request: &'a GenerationRequest,
        task_id: &'a str,
    ) -> Txt2ImgPayload<'a> {
        Txt2ImgPayload {
            prompt: &request.prompt,
            negative_prompt: &self.config.negative_prompt,
            width: request.size.width,
            height: request.size.height,
            steps: self.config.steps,
            cfg_scale: self.config.cfg_scale,
            sampler_name: &self.config.sampler,
            seed: -1,
            batch_size: 1,
            n_iter: 1,
            override_settings: json!({ "sd_model_checkpoint": self.config.model_name }),
            force_task_id: task_id,
        }
    }

    fn task_progress(&self, task_id: &str) -> Result<TaskProgress, SynthesisError> {
        let url = format!("{}/internal/progress", self.api_url);
        let body = json!({ "id_task": task_id, "id_live_preview": -1, "live_preview": false });
        Ok(ensure_success(self.client.post(&url).json(&body).send()?)?.json()?)
    }

    /// Interrupts the service if `task_id` is the task it is sampling right
    /// now. Returns `true` once no further action is needed.
    fn stop_task(&self, task_id: &str) -> Result<bool, SynthesisError> {
        let progress = self.task_progress(task_id)?;
        if progress.active {
            let url = format!("{}/sdapi/v1/interrupt", self.api_url);
            ensure_success(self.client.post(&url).send()?)?;
            info!(task_id, "interrupted cancelled WebUI task");
            return Ok(true);
        }
        if progress.queued {
            debug!(task_id, "cancelled task still queued; waiting for it to start");
            return Ok(false);
        }
        Ok(true)
    }
}

impl ImageSynthesizer for WebUiClient {
    fn name(&self) -> &str {
        "Stable Diffusion WebUI"
    }

    fn warm_up(&self) -> Result<(), SynthesisError> {
        let url = format!("{}/sdapi/v1/sd-models", self.api_url);
        let models: Vec<SdModel> = ensure_success(self.client.get(&url).send()?)?.json()?;
        if models.is_empty() {
            warn!("WebUI reports no installed checkpoints");
            return Err(SynthesisError::Failed("no checkpoints installed".to_string()));
        }
        if !has_checkpoint(&models, &self.config.model_name) {
            let titles: Vec<&str> = models.iter().map(|m| m.title.as_str()).collect();
            return Err(SynthesisError::Failed(format!(
                "checkpoint {:?} is not installed (available: {})",
                self.config.model_name,
                titles.join(", ")
            )));
        }
        Ok(())
    }

    fn synthesize(
        &self,
        request: &GenerationRequest,
        cancel: &CancelToken,
    ) -> Result<DynamicImage, SynthesisError> {
        cancel.check()?;
        let url = format!("{}/sdapi/v1/txt2img", self.api_url);
        let task_id = format!("task({})", uuid::Uuid::new_v4().simple());
        info!(size = %request.size, task_id = %task_id, "submitting txt2img request");

        // txt2img blocks until sampling ends, so it runs on its own thread
        // while this one watches the cancel token.
        let pending = self.client.post(&url).json(&self.payload(request, &task_id));
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let result = pending
                .send()
                .map_err(SynthesisError::from)
                .and_then(ensure_success)
                .and_then(|response| Ok(response.json::<Txt2ImgResponse>()?));
            let _ = tx.send(result);
        });

        let mut stopped = false;
        let body = loop {
            match rx.recv_timeout(self.config.poll_interval()) {
                Ok(result) => break result?,
                Err(RecvTimeoutError::Timeout) => {
                    if cancel.is_cancelled() && !stopped {
                        stopped = self.stop_task(&task_id).unwrap_or_else(|err| {
                            warn!(task_id = %task_id, "failed to stop cancelled task: {err}");
                            true
                        });
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(SynthesisError::Failed(
                        "txt2img request ended without a response".to_string(),
                    ));
                }
            }
        };
        cancel.check()?;
        let encoded = body.images.first().ok_or(SynthesisError::MissingOutput)?;
        decode_image(&decode_base64_image(encoded)?)
    }
}

/// Matches either the exact file name or the `name [hash]` title form.
fn has_checkpoint(models: &[SdModel], wanted: &str) -> bool {
    let stem = wanted.rsplit_once('.').map_or(wanted, |(stem, _)| stem);
    models.iter().any(|model| {
        model.title == wanted
            || model.model_name == wanted
            || model.title.starts_with(&format!("{wanted} "))
            || model.model_name == stem
    })
}

/// Accepts raw base64 as well as a `data:image/...;base64,` URI.
fn decode_base64_image(encoded: &str) -> Result<Vec<u8>, SynthesisError> {
    let raw = match encoded.split_once(',') {
        Some((header, data)) if header.starts_with("data:") => data,
        _ => encoded,
    };
    STANDARD
        .decode(raw.trim())
        .map_err(|err| SynthesisError::Decode(err.to_string()))
}
