use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use aigen_backend::config::AppConfig;
use aigen_backend::imaging;
use aigen_backend::synth::{CancelToken, ImageSynthesizer};
use eframe::egui;
use log::{error, info};

use super::messages::{process_message, AppMessage};
use super::session::Session;
use super::tasks::{self, GenerationTask};

/// Drives a [`Session`]: hands generations to worker threads, applies their
/// messages, and performs save/clear/cancel.
pub struct Studio {
    session: Session,
    synth: Arc<dyn ImageSynthesizer>,
    tx: Sender<AppMessage>,
    rx: Receiver<AppMessage>,
    cancel: Option<CancelToken>,
    next_job: u64,
    display_max: u32,
    repaint: Option<egui::Context>,
}

impl Studio {
    pub fn new(synth: Arc<dyn ImageSynthesizer>, config: &AppConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            session: Session::new(config.default_size),
            synth,
            tx,
            rx,
            cancel: None,
            next_job: 1,
            display_max: config.display_max,
            repaint: None,
        }
    }

    /// Workers request a repaint on this context after every message.
    pub fn set_repaint_context(&mut self, ctx: egui::Context) {
        self.repaint = Some(ctx);
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn synthesizer_name(&self) -> &str {
        self.synth.name()
    }

    /// Starts a generation for the current prompt and size. Returns `false`
    /// when nothing was started (blank prompt or a job already running).
    pub fn generate(&mut self) -> bool {
        let job = self.next_job;
        let Some(request) = self.session.begin(job) else {
            return false;
        };
        self.next_job += 1;

        let cancel = CancelToken::new();
        self.cancel = Some(cancel.clone());
        tasks::generate_image(GenerationTask {
            job,
            request,
            synth: self.synth.clone(),
            cancel,
            display_max: self.display_max,
            tx: self.tx.clone(),
            repaint: self.repaint.clone(),
        });
        true
    }

    /// Abandons the running generation, if any. The worker's adapter stops
    /// the job on the service once it sees the tripped token.
    pub fn cancel(&mut self) {
        let Some(job) = self.session.cancel() else {
            return;
        };
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        info!("cancelled generation {job}");
    }

    pub fn clear(&mut self) {
        self.cancel();
        self.session.clear();
    }

    /// Writes the held image to `path`. Does nothing when no image is held.
    pub fn save_to(&mut self, path: &Path) {
        let Some(image) = self.session.image() else {
            return;
        };
        match imaging::save_image(image.full(), path) {
            Ok(written) => {
                info!("saved image to {}", written.display());
                self.session.record_saved(&written);
            }
            Err(err) => {
                error!("failed to save image: {err:#}");
                self.session.record_save_failed(&err);
            }
        }
    }

    /// Applies every message the workers have sent so far.
    pub fn poll(&mut self) {
        while let Ok(message) = self.rx.try_recv() {
            process_message(self, message);
        }
    }

    /// Blocks until the running generation finishes or `timeout` elapses.
    /// Returns whether the session is idle. Intended for headless callers.
    pub fn block_until_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.session.is_generating() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(message) => process_message(self, message),
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.poll();
        !self.session.is_generating()
    }

    pub(crate) fn release_cancel_token(&mut self) {
        self.cancel = None;
    }
}
