use std::path::Path;

use aigen_backend::size::ImageSize;
use aigen_backend::synth::GenerationRequest;

use super::state::{GeneratedImage, Notice, Phase, Stage, READY_STATUS};

/// Everything the window shows, independent of egui.
///
/// Holds at most one generated image. Results and progress are tagged with a
/// job id and anything not belonging to the active job is dropped.
#[derive(Debug, Clone)]
pub struct Session {
    pub prompt: String,
    pub size: ImageSize,
    image: Option<GeneratedImage>,
    image_revision: u64,
    status: String,
    progress: f32,
    phase: Phase,
    notice: Option<Notice>,
    notice_serial: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(ImageSize::default())
    }
}

impl Session {
    pub fn new(size: ImageSize) -> Self {
        Self {
            prompt: String::new(),
            size,
            image: None,
            image_revision: 0,
            status: READY_STATUS.to_string(),
            progress: 0.0,
            phase: Phase::Idle,
            notice: None,
            notice_serial: 0,
        }
    }

    pub fn image(&self) -> Option<&GeneratedImage> {
        self.image.as_ref()
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    /// Bumped whenever the held image is replaced or dropped.
    pub fn image_revision(&self) -> u64 {
        self.image_revision
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn is_generating(&self) -> bool {
        matches!(self.phase, Phase::Generating { .. })
    }

    pub fn active_job(&self) -> Option<u64> {
        match self.phase {
            Phase::Generating { job } => Some(job),
            Phase::Idle => None,
        }
    }

    pub fn can_generate(&self) -> bool {
        !self.is_generating()
    }

    pub fn can_save(&self) -> bool {
        self.image.is_some()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Changes every time a new notice is raised, even one identical to the
    /// previous notice.
    pub fn notice_serial(&self) -> u64 {
        self.notice_serial
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    fn raise(&mut self, notice: Notice) {
        self.notice = Some(notice);
        self.notice_serial += 1;
    }

    pub fn set_status(&mut self, message: impl Into<String>, progress: Option<f32>) {
        self.status = message.into();
        if let Some(value) = progress {
            self.progress = value.clamp(0.0, 1.0);
        }
    }

    /// Validates the prompt and enters the generating phase for `job`.
    ///
    /// Returns `None`, leaving a warning notice, when the prompt is blank or a
    /// generation is already running.
    pub fn begin(&mut self, job: u64) -> Option<GenerationRequest> {
        if self.is_generating() {
            return None;
        }
        let prompt = self.prompt.trim();
        if prompt.is_empty() {
            self.raise(Notice::warning("Input Error", "Please enter a prompt!"));
            return None;
        }
        let request = GenerationRequest::new(prompt, self.size);
        self.phase = Phase::Generating { job };
        let stage = Stage::Submitting;
        self.set_status(stage.status(), Some(stage.progress()));
        Some(request)
    }

    pub fn apply_stage(&mut self, job: u64, stage: Stage) -> bool {
        if self.active_job() != Some(job) {
            return false;
        }
        self.set_status(stage.status(), Some(stage.progress()));
        true
    }

    /// Applies the outcome of `job`. Returns `false` for stale jobs.
    pub fn finish(&mut self, job: u64, result: Result<GeneratedImage, String>) -> bool {
        if self.active_job() != Some(job) {
            return false;
        }
        self.phase = Phase::Idle;
        match result {
            Ok(image) => {
                self.replace_image(Some(image));
                self.set_status("Image generated successfully!", Some(1.0));
            }
            Err(err) => {
                self.raise(Notice::error(format!("Error generating image: {err}")));
                self.set_status("Error generating image", Some(0.0));
            }
        }
        true
    }

    /// Leaves the generating phase, returning the job that was abandoned.
    pub fn cancel(&mut self) -> Option<u64> {
        let job = self.active_job()?;
        self.phase = Phase::Idle;
        self.set_status("Generation cancelled", Some(0.0));
        Some(job)
    }

    /// Resets prompt, image and save state. Callers cancel any running job
    /// first.
    pub fn clear(&mut self) {
        self.prompt.clear();
        self.replace_image(None);
        self.set_status(READY_STATUS, Some(0.0));
    }

    pub fn record_saved(&mut self, path: &Path) {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.set_status(format!("Image saved to {name}"), None);
        self.raise(Notice::info("Success", "Image saved successfully!"));
    }

    pub fn record_save_failed(&mut self, err: &anyhow::Error) {
        self.raise(Notice::error(format!("Failed to save image: {err:#}")));
    }

    fn replace_image(&mut self, image: Option<GeneratedImage>) {
        self.image = image;
        self.image_revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::state::NoticeLevel;
    use image::DynamicImage;
    use pretty_assertions::assert_eq;

    fn image(side: u32) -> GeneratedImage {
        GeneratedImage::new(DynamicImage::new_rgba8(side, side), 1200)
    }

    #[test]
    fn blank_prompt_is_rejected_with_warning() {
        let mut session = Session::default();
        session.prompt = " \n\t ".into();
        assert_eq!(session.begin(1), None);
        assert!(!session.is_generating());
        let notice = session.notice().expect("warning");
        assert_eq!(notice.level, NoticeLevel::Warning);
        assert_eq!(notice.title, "Input Error");
        assert_eq!(notice.message, "Please enter a prompt!");
    }

    #[test]
    fn begin_trims_prompt_and_uses_selected_size() {
        let mut session = Session::new(ImageSize::square(512));
        session.prompt = "  a castle on a hill \n".into();
        let request = session.begin(7).expect("request");
        assert_eq!(request, GenerationRequest::new("a castle on a hill", ImageSize::square(512)));
        assert_eq!(session.active_job(), Some(7));
        assert_eq!(session.status(), "Generating image...");
        assert_eq!(session.progress(), 0.2);
        assert!(!session.can_generate());
        assert_eq!(session.begin(8), None);
    }

    #[test]
    fn stale_results_are_ignored() {
        let mut session = Session::default();
        session.prompt = "tree".into();
        session.begin(2).unwrap();
        assert!(!session.apply_stage(1, Stage::Preparing));
        assert!(!session.finish(1, Ok(image(16))));
        assert!(!session.has_image());
        assert!(session.apply_stage(2, Stage::Processing));
        assert_eq!(session.status(), "Processing prompt...");
        assert_eq!(session.progress(), 0.4);
    }

    #[test]
    fn failure_keeps_previous_image() {
        let mut session = Session::default();
        session.prompt = "tree".into();
        session.begin(1).unwrap();
        session.finish(1, Ok(image(16)));
        let revision = session.image_revision();

        session.begin(2).unwrap();
        session.finish(2, Err("out of memory".into()));
        assert!(session.can_save());
        assert_eq!(session.image_revision(), revision);
        assert_eq!(session.progress(), 0.0);
        assert_eq!(session.status(), "Error generating image");
        assert_eq!(
            session.notice().map(|n| n.message.as_str()),
            Some("Error generating image: out of memory")
        );
    }

    #[test]
    fn cancel_returns_to_idle_and_drops_late_result() {
        let mut session = Session::default();
        session.prompt = "tree".into();
        session.begin(3).unwrap();
        assert_eq!(session.cancel(), Some(3));
        assert_eq!(session.status(), "Generation cancelled");
        assert!(!session.finish(3, Ok(image(16))));
        assert!(!session.has_image());
        assert_eq!(session.cancel(), None);
    }

    #[test]
    fn clear_resets_everything() {
        let mut session = Session::default();
        session.prompt = "tree".into();
        session.begin(1).unwrap();
        session.finish(1, Ok(image(16)));
        session.clear();
        assert!(session.prompt.is_empty());
        assert!(!session.has_image());
        assert!(!session.can_save());
        assert_eq!(session.status(), READY_STATUS);
        assert_eq!(session.progress(), 0.0);
    }

    #[test]
    fn every_raised_notice_gets_a_new_serial() {
        let mut session = Session::default();
        session.begin(1);
        let first = session.notice_serial();
        session.dismiss_notice();
        session.begin(2);
        assert!(session.notice_serial() > first);
        assert_eq!(session.notice().map(|n| n.title.as_str()), Some("Input Error"));
    }

    #[test]
    fn saved_status_uses_file_name() {
        let mut session = Session::default();
        session.record_saved(Path::new("/home/me/pictures/fox.png"));
        assert_eq!(session.status(), "Image saved to fox.png");
        assert_eq!(session.notice().map(|n| n.level), Some(NoticeLevel::Info));
    }
}
