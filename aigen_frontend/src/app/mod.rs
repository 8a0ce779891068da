use std::sync::Arc;
use std::time::Duration;

use aigen_backend::config::AppConfig;
use aigen_backend::synth::ImageSynthesizer;
use eframe::egui::{self, Context, TextureHandle};

mod messages;
mod session;
mod state;
mod studio;
mod tasks;
mod ui;

pub use messages::AppMessage;
pub use session::Session;
pub use state::{
    GeneratedImage, LoadedImage, Notice, NoticeLevel, Phase, Stage, PLACEHOLDER_TEXT,
    READY_STATUS,
};
pub use studio::Studio;

pub struct AigenApp {
    studio: Studio,
    texture: Option<TextureHandle>,
    texture_revision: u64,
    /// Serial of the notice drawn during the previous frame.
    notice_on_screen: Option<u64>,
}

impl AigenApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        synth: Arc<dyn ImageSynthesizer>,
        config: &AppConfig,
    ) -> Self {
        ui::apply_theme(&cc.egui_ctx);
        let mut studio = Studio::new(synth, config);
        studio.set_repaint_context(cc.egui_ctx.clone());
        Self::with_studio(studio)
    }

    fn with_studio(studio: Studio) -> Self {
        Self {
            studio,
            texture: None,
            texture_revision: 0,
            notice_on_screen: None,
        }
    }

    /// Uploads the session's display image when it changed since last frame.
    fn sync_texture(&mut self, ctx: &Context) {
        let session = self.studio.session();
        if session.image_revision() == self.texture_revision {
            return;
        }
        self.texture_revision = session.image_revision();
        self.texture = session.image().map(|image| {
            let display = image.display();
            let color = egui::ColorImage::from_rgba_unmultiplied(display.size, &display.pixels);
            ctx.load_texture("generated-image", color, egui::TextureOptions::LINEAR)
        });
    }

    fn save_with_dialog(&mut self) {
        if !self.studio.session().can_save() {
            return;
        }
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG files", &["png"])
            .add_filter("JPEG files", &["jpg", "jpeg"])
            .add_filter("All files", &["*"])
            .set_file_name(aigen_backend::imaging::DEFAULT_FILE_NAME)
            .save_file()
        {
            self.studio.save_to(&path);
        }
    }
}

impl eframe::App for AigenApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.studio.poll();
        self.sync_texture(ctx);

        self.render_sidebar(ctx);
        self.render_status_bar(ctx);
        self.render_canvas(ctx);
        self.render_notice(ctx);

        if self.studio.session().is_generating() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}
