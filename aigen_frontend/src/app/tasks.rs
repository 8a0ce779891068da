use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;

use aigen_backend::synth::{CancelToken, GenerationRequest, ImageSynthesizer};
use eframe::egui;
use log::{error, info};

use super::messages::AppMessage;
use super::state::{GeneratedImage, Stage};

/// Everything a worker needs to run one generation.
pub struct GenerationTask {
    pub job: u64,
    pub request: GenerationRequest,
    pub synth: Arc<dyn ImageSynthesizer>,
    pub cancel: CancelToken,
    pub display_max: u32,
    pub tx: Sender<AppMessage>,
    pub repaint: Option<egui::Context>,
}

impl GenerationTask {
    fn send(&self, message: AppMessage) {
        if self.tx.send(message).is_err() {
            error!("failed to send message for generation {}", self.job);
        }
        if let Some(ctx) = &self.repaint {
            ctx.request_repaint();
        }
    }
}

pub fn generate_image(task: GenerationTask) {
    thread::spawn(move || {
        let job = task.job;
        info!(
            "generation {job}: {} at {} via {}",
            task.request.prompt,
            task.request.size,
            task.synth.name()
        );
        task.send(AppMessage::Progress {
            job,
            stage: Stage::Processing,
        });

        let result = match task.synth.synthesize(&task.request, &task.cancel) {
            Ok(image) => {
                task.send(AppMessage::Progress {
                    job,
                    stage: Stage::Preparing,
                });
                Ok(GeneratedImage::new(image, task.display_max))
            }
            Err(err) if err.is_cancelled() => {
                info!("generation {job} stopped after cancel");
                Err(err.to_string())
            }
            Err(err) => Err(err.to_string()),
        };

        task.send(AppMessage::GenerationFinished { job, result });
    });
}
