use eframe::egui::{self, Color32, Context, RichText};

use super::super::state::PLACEHOLDER_TEXT;
use super::super::AigenApp;

impl AigenApp {
    pub(crate) fn render_canvas(&mut self, ctx: &Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(texture) = &self.texture else {
                ui.centered_and_justified(|ui| {
                    if self.studio.session().is_generating() {
                        ui.add(egui::Spinner::new().size(48.0));
                    } else {
                        ui.label(
                            RichText::new(PLACEHOLDER_TEXT)
                                .size(14.0)
                                .color(Color32::from_gray(160)),
                        );
                    }
                });
                return;
            };

            // The display copy is already bounded; shrink further to the pane.
            let avail = ui.available_size();
            let mut size = texture.size_vec2();
            let scale = (avail.x / size.x).min(avail.y / size.y).min(1.0);
            size *= scale;

            ui.vertical_centered(|ui| {
                ui.add_space(((avail.y - size.y) / 2.0).max(0.0));
                ui.add(egui::Image::from_texture(texture).fit_to_exact_size(size));
            });
        });
    }
}
