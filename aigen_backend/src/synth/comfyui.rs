use std::collections::HashMap;
use std::thread;

use image::DynamicImage;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{decode_image, ensure_success, http_client, CancelToken, GenerationRequest, ImageSynthesizer};
use crate::config::AppConfig;
use crate::error::SynthesisError;

/// Node id of the SaveImage node in the submitted workflow.
const SAVE_NODE: &str = "9";

/// Talks to a ComfyUI server through its prompt queue.
pub struct ComfyUiClient {
    api_url: String,
    config: AppConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct PromptResponse {
    prompt_id: String,
}

#[derive(Debug, Deserialize)]
struct QueueState {
    /// Entries are `[number, prompt_id, prompt, extra_data, outputs]`.
    #[serde(default)]
    queue_running: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct PromptHistory {
    #[serde(default)]
    outputs: HashMap<String, NodeOutput>,
    #[serde(default)]
    status: Option<PromptStatus>,
}

#[derive(Debug, Deserialize)]
struct PromptStatus {
    #[serde(default)]
    status_str: Option<String>,
    #[serde(default)]
    completed: bool,
}

#[derive(Debug, Deserialize)]
struct NodeOutput {
    images: Option<Vec<ImageOutput>>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
struct ImageOutput {
    filename: String,
    #[serde(default)]
    subfolder: String,
    #[serde(rename = "type")]
    output_type: String,
}

impl ComfyUiClient {
    pub fn new(config: &AppConfig) -> Result<Self, SynthesisError> {
        let api_url = crate::config::sanitize_base_url(&config.api_url)
            .map_err(|err| SynthesisError::InvalidUrl(format!("{err:#}")))?;
        Ok(Self {
            api_url,
            config: config.clone(),
            client: http_client(config.request_timeout())?,
        })
    }

    fn build_workflow(&self, request: &GenerationRequest, seed: i64) -> Value {
        let vae_input = if self.config.vae_name.is_some() {
            json!(["10", 0])
        } else {
            json!(["4", 2])
        };

        let mut workflow = json!({
            "3": {
                "inputs": {
                    "seed": seed,
                    "steps": self.config.steps,
                    "cfg": self.config.cfg_scale,
                    "sampler_name": self.config.sampler,
                    "scheduler": self.config.scheduler,
                    "denoise": 1.0,
                    "model": ["4", 0],
                    "positive": ["6", 0],
                    "negative": ["7", 0],
                    "latent_image": ["5", 0]
                },
                "class_type": "KSampler"
            },
            "4": {
                "inputs": {
                    "ckpt_name": self.config.model_name
                },
                "class_type": "CheckpointLoaderSimple"
            },
            "5": {
                "inputs": {
                    "width": request.size.width,
                    "height": request.size.height,
                    "batch_size": 1
                },
                "class_type": "EmptyLatentImage"
            },
            "6": {
                "inputs": {
                    "text": request.prompt,
                    "clip": ["4", 1]
                },
                "class_type": "CLIPTextEncode"
            },
            "7": {
                "inputs": {
                    "text": self.config.negative_prompt,
                    "clip": ["4", 1]
                },
                "class_type": "CLIPTextEncode"
            },
            "8": {
                "inputs": {
                    "samples": ["3", 0],
                    "vae": vae_input
                },
                "class_type": "VAEDecode"
            },
            SAVE_NODE: {
                "inputs": {
                    "filename_prefix": "aigen",
                    "images": ["8", 0]
                },
                "class_type": "SaveImage"
            }
        });

        if let Some(vae_name) = &self.config.vae_name {
            workflow["10"] = json!({
                "inputs": {
                    "vae_name": vae_name
                },
                "class_type": "VAELoader"
            });
        }

        workflow
    }

    fn submit(&self, workflow: Value) -> Result<String, SynthesisError> {
        let url = format!("{}/prompt", self.api_url);
        let body = json!({
            "prompt": workflow,
            "client_id": uuid::Uuid::new_v4().to_string()
        });
        let response = ensure_success(self.client.post(&url).json(&body).send()?)?;
        let submitted: PromptResponse = response.json()?;
        info!(prompt_id = %submitted.prompt_id, "submitted prompt to ComfyUI");
        Ok(submitted.prompt_id)
    }

    fn poll_until_complete(
        &self,
        prompt_id: &str,
        cancel: &CancelToken,
    ) -> Result<ImageOutput, SynthesisError> {
        let url = format!("{}/history/{}", self.api_url, prompt_id);
        let attempts = self.config.max_poll_attempts;

        for attempt in 1..=attempts {
            thread::sleep(self.config.poll_interval());
            if cancel.is_cancelled() {
                self.abandon(prompt_id);
                return Err(SynthesisError::Cancelled);
            }

            let response = self.client.get(&url).send()?;
            if !response.status().is_success() {
                debug!(status = %response.status(), "history not ready");
                continue;
            }

            let history: HashMap<String, PromptHistory> = response.json()?;
            if let Some(image) = finished_output(&history, prompt_id)? {
                info!(filename = %image.filename, "image generation complete");
                return Ok(image);
            }

            if attempt % 10 == 0 {
                info!("still waiting for image generation... ({attempt}/{attempts})");
            }
        }

        Err(SynthesisError::Timeout(attempts))
    }

    /// Drops `prompt_id` from the queue and stops it if it is the prompt
    /// currently executing. Other clients' prompts are left alone.
    fn abandon(&self, prompt_id: &str) {
        if let Err(err) = self.try_abandon(prompt_id) {
            warn!(prompt_id = %prompt_id, "failed to withdraw cancelled prompt: {err}");
        }
    }

    fn try_abandon(&self, prompt_id: &str) -> Result<(), SynthesisError> {
        let queue_url = format!("{}/queue", self.api_url);
        let body = json!({ "delete": [prompt_id] });
        ensure_success(self.client.post(&queue_url).json(&body).send()?)?;
        info!(prompt_id = %prompt_id, "removed cancelled prompt from the queue");

        let queue: QueueState = ensure_success(self.client.get(&queue_url).send()?)?.json()?;
        if is_running(&queue, prompt_id) {
            let url = format!("{}/interrupt", self.api_url);
            let body = json!({ "prompt_id": prompt_id });
            ensure_success(self.client.post(&url).json(&body).send()?)?;
            info!(prompt_id = %prompt_id, "interrupted cancelled prompt");
        }
        Ok(())
    }

    fn download_image(&self, image: &ImageOutput) -> Result<Vec<u8>, SynthesisError> {
        let url = format!("{}/view", self.api_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("filename", image.filename.as_str()),
                ("subfolder", image.subfolder.as_str()),
                ("type", image.output_type.as_str()),
            ])
            .send()?;
        let bytes = ensure_success(response)?.bytes()?;
        Ok(bytes.to_vec())
    }
}

impl ImageSynthesizer for ComfyUiClient {
    fn name(&self) -> &str {
        "ComfyUI"
    }

    fn warm_up(&self) -> Result<(), SynthesisError> {
        let url = format!("{}/system_stats", self.api_url);
        ensure_success(self.client.get(&url).send()?)?;

        let url = format!("{}/object_info/CheckpointLoaderSimple", self.api_url);
        let info: Value = ensure_success(self.client.get(&url).send()?)?.json()?;
        match checkpoint_names(&info) {
            Some(names) if names.iter().any(|name| name == &self.config.model_name) => Ok(()),
            Some(names) => Err(SynthesisError::Failed(format!(
                "checkpoint {:?} is not installed (available: {})",
                self.config.model_name,
                names.join(", ")
            ))),
            None => {
                warn!("could not read checkpoint list from ComfyUI; skipping model check");
                Ok(())
            }
        }
    }

    fn synthesize(
        &self,
        request: &GenerationRequest,
        cancel: &CancelToken,
    ) -> Result<DynamicImage, SynthesisError> {
        cancel.check()?;
        let seed = rand::random::<u32>() as i64;
        let prompt_id = self.submit(self.build_workflow(request, seed))?;
        let output = self.poll_until_complete(&prompt_id, cancel)?;
        cancel.check()?;
        let bytes = self.download_image(&output)?;
        decode_image(&bytes)
    }
}

/// Returns the SaveImage output once the prompt has finished, `None` while it
/// is still queued or running.
fn finished_output(
    history: &HashMap<String, PromptHistory>,
    prompt_id: &str,
) -> Result<Option<ImageOutput>, SynthesisError> {
    let Some(entry) = history.get(prompt_id) else {
        return Ok(None);
    };

    if let Some(status) = &entry.status {
        if status.status_str.as_deref() == Some("error") {
            return Err(SynthesisError::Failed(format!(
                "ComfyUI failed to execute prompt {prompt_id}"
            )));
        }
    }

    let image = entry
        .outputs
        .get(SAVE_NODE)
        .and_then(|node| node.images.as_ref())
        .and_then(|images| images.first())
        .cloned();

    match image {
        Some(image) => Ok(Some(image)),
        None if entry.status.as_ref().is_some_and(|s| s.completed) => {
            Err(SynthesisError::MissingOutput)
        }
        None => Ok(None),
    }
}

fn is_running(queue: &QueueState, prompt_id: &str) -> bool {
    queue
        .queue_running
        .iter()
        .any(|entry| entry.get(1).and_then(Value::as_str) == Some(prompt_id))
}

/// Extracts the checkpoint names from `/object_info/CheckpointLoaderSimple`.
fn checkpoint_names(info: &Value) -> Option<Vec<String>> {
    let names = info
        .get("CheckpointLoaderSimple")?
        .get("input")?
        .get("required")?
        .get("ckpt_name")?
        .get(0)?
        .as_array()?;
    Some(
        names
            .iter()
            .filter_map(|name| name.as_str().map(str::to_string))
            .collect(),
    )
}
