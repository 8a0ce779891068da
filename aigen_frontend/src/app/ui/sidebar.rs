use aigen_backend::size::ImageSize;
use eframe::egui::{self, Color32, Context, RichText, Stroke};

use super::super::AigenApp;
use super::ACCENT;

const SIDEBAR_WIDTH: f32 = 240.0;
const BUTTON_HEIGHT: f32 = 40.0;

enum SidebarAction {
    Generate,
    Cancel,
    Save,
    Clear,
}

impl AigenApp {
    pub(crate) fn render_sidebar(&mut self, ctx: &Context) {
        let mut action = None;
        let interactive = self.studio.session().notice().is_none();
        let generating = self.studio.session().is_generating();
        let can_save = self.studio.session().can_save();

        egui::SidePanel::left("sidebar")
            .exact_width(SIDEBAR_WIDTH)
            .resizable(false)
            .show(ctx, |ui| {
                ui.add_enabled_ui(interactive, |ui| {
                    ui.add_space(40.0);
                    ui.vertical_centered(|ui| {
                        ui.label(RichText::new(crate::WINDOW_TITLE).size(20.0).strong());
                    });
                    ui.add_space(20.0);

                    let session = self.studio.session_mut();
                    ui.group(|ui| {
                        ui.label(RichText::new("Enter your prompt:").size(14.0));
                        ui.add_enabled(
                            !generating,
                            egui::TextEdit::multiline(&mut session.prompt)
                                .desired_rows(14)
                                .desired_width(f32::INFINITY)
                                .hint_text("Describe the image you want..."),
                        );
                    });

                    ui.add_space(20.0);
                    ui.label(RichText::new("Image Size:").size(14.0));
                    ui.add_enabled_ui(!generating, |ui| {
                        egui::ComboBox::from_id_salt("image_size")
                            .width(ui.available_width())
                            .selected_text(session.size.to_string())
                            .show_ui(ui, |ui| {
                                for preset in ImageSize::PRESETS {
                                    ui.selectable_value(&mut session.size, preset, preset.to_string());
                                }
                            })
                            .response
                            .on_hover_text("Select the output image size");
                    });

                    ui.with_layout(egui::Layout::bottom_up(egui::Align::Center), |ui| {
                        ui.add_space(20.0);
                        let width = ui.available_width();

                        let clear = egui::Button::new(RichText::new("Clear").size(14.0))
                            .fill(Color32::TRANSPARENT)
                            .stroke(Stroke::new(2.0, Color32::from_gray(90)))
                            .min_size(egui::vec2(width, BUTTON_HEIGHT));
                        if ui
                            .add(clear)
                            .on_hover_text("Clear the current image and prompt")
                            .clicked()
                        {
                            action = Some(SidebarAction::Clear);
                        }
                        ui.add_space(5.0);

                        let save = egui::Button::new(RichText::new("Save Image").size(14.0))
                            .min_size(egui::vec2(width, BUTTON_HEIGHT));
                        if ui
                            .add_enabled(can_save, save)
                            .on_hover_text("Save the generated image")
                            .clicked()
                        {
                            action = Some(SidebarAction::Save);
                        }
                        ui.add_space(5.0);

                        if generating {
                            let cancel = egui::Button::new(RichText::new("Cancel").size(14.0))
                                .min_size(egui::vec2(width, BUTTON_HEIGHT));
                            if ui
                                .add(cancel)
                                .on_hover_text("Stop the running generation")
                                .clicked()
                            {
                                action = Some(SidebarAction::Cancel);
                            }
                            ui.add_space(5.0);
                        }

                        let generate = egui::Button::new(
                            RichText::new("Generate").size(14.0).strong().color(Color32::WHITE),
                        )
                        .fill(ACCENT)
                        .min_size(egui::vec2(width, BUTTON_HEIGHT));
                        if ui
                            .add_enabled(!generating, generate)
                            .on_hover_text("Generate a new image based on the prompt")
                            .clicked()
                        {
                            action = Some(SidebarAction::Generate);
                        }
                    });
                });
            });

        match action {
            Some(SidebarAction::Generate) => {
                self.studio.generate();
            }
            Some(SidebarAction::Cancel) => self.studio.cancel(),
            Some(SidebarAction::Save) => self.save_with_dialog(),
            Some(SidebarAction::Clear) => self.studio.clear(),
            None => {}
        }
    }
}
