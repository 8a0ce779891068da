use eframe::egui::{self, Context, RichText};

use super::super::AigenApp;

impl AigenApp {
    pub(crate) fn render_status_bar(&mut self, ctx: &Context) {
        let session = self.studio.session();
        egui::TopBottomPanel::bottom("status_bar")
            .show_separator_line(false)
            .show(ctx, |ui| {
                ui.add_space(5.0);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(RichText::new(session.status()).size(12.0));
                    if session.is_generating() {
                        ui.add(egui::Spinner::new());
                    }
                    ui.with_layout(egui::Layout::left_to_right(egui::Align::Center), |ui| {
                        ui.label(
                            RichText::new(format!("Model: {}", self.studio.synthesizer_name()))
                                .size(12.0)
                                .weak(),
                        );
                    });
                });
                ui.add_space(5.0);
                ui.add(egui::ProgressBar::new(session.progress()));
                ui.add_space(20.0);
            });
    }
}
