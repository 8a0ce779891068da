use log::{info, warn};

use super::state::{GeneratedImage, Stage};
use super::studio::Studio;

/// Sent from worker threads back to the UI thread.
pub enum AppMessage {
    Progress {
        job: u64,
        stage: Stage,
    },
    GenerationFinished {
        job: u64,
        result: Result<GeneratedImage, String>,
    },
}

pub(crate) fn process_message(studio: &mut Studio, message: AppMessage) {
    match message {
        AppMessage::Progress { job, stage } => {
            studio.session_mut().apply_stage(job, stage);
        }
        AppMessage::GenerationFinished { job, result } => {
            let outcome = match &result {
                Ok(_) => None,
                Err(err) => Some(err.clone()),
            };
            if studio.session_mut().finish(job, result) {
                studio.release_cancel_token();
                match outcome {
                    None => info!("generation {job} finished"),
                    Some(err) => warn!("generation {job} failed: {err}"),
                }
            } else {
                info!("discarding result of abandoned generation {job}");
            }
        }
    }
}
