use eframe::egui::{self, Align2, Color32, Context};

use super::super::state::NoticeLevel;
use super::super::AigenApp;

impl AigenApp {
    /// Shows the pending notice, if any, until the user presses OK.
    pub(crate) fn render_notice(&mut self, ctx: &Context) {
        let session = self.studio.session();
        let Some(notice) = session.notice().cloned() else {
            self.notice_on_screen = None;
            return;
        };
        let serial = session.notice_serial();
        // A key press in the frame that raised the notice activated the
        // button that raised it.
        let keys_apply = self.notice_on_screen == Some(serial);

        let mut dismissed = false;
        let color = match notice.level {
            NoticeLevel::Info => Color32::LIGHT_GREEN,
            NoticeLevel::Warning => Color32::from_rgb(246, 196, 69),
            NoticeLevel::Error => Color32::LIGHT_RED,
        };

        egui::Window::new(notice.title.as_str())
            .id(egui::Id::new("notice"))
            .collapsible(false)
            .resizable(false)
            .default_width(360.0)
            .anchor(Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.colored_label(color, &notice.message);
                ui.add_space(12.0);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("OK").clicked() {
                        dismissed = true;
                    }
                });
            });

        if keys_apply
            && ctx.input(|i| i.key_pressed(egui::Key::Enter) || i.key_pressed(egui::Key::Escape))
        {
            dismissed = true;
        }

        if dismissed {
            self.studio.session_mut().dismiss_notice();
            self.notice_on_screen = None;
        } else {
            self.notice_on_screen = Some(serial);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use aigen_backend::config::AppConfig;
    use aigen_backend::error::SynthesisError;
    use aigen_backend::synth::{CancelToken, GenerationRequest, ImageSynthesizer};
    use eframe::egui::{self, Event, Key, Modifiers, RawInput};
    use image::DynamicImage;

    use crate::app::{AigenApp, Studio};

    struct Offline;

    impl ImageSynthesizer for Offline {
        fn name(&self) -> &str {
            "offline"
        }

        fn warm_up(&self) -> Result<(), SynthesisError> {
            Ok(())
        }

        fn synthesize(
            &self,
            _request: &GenerationRequest,
            _cancel: &CancelToken,
        ) -> Result<DynamicImage, SynthesisError> {
            Err(SynthesisError::Failed("offline".into()))
        }
    }

    fn press(key: Key) -> RawInput {
        RawInput {
            events: vec![Event::Key {
                key,
                physical_key: None,
                pressed: true,
                repeat: false,
                modifiers: Modifiers::NONE,
            }],
            ..RawInput::default()
        }
    }

    fn app() -> AigenApp {
        AigenApp::with_studio(Studio::new(Arc::new(Offline), &AppConfig::default()))
    }

    #[test]
    fn key_that_raised_a_notice_does_not_dismiss_it() {
        let ctx = egui::Context::default();
        let mut app = app();

        // Generate activated with Enter while the prompt is empty.
        let _ = ctx.run(press(Key::Enter), |ctx| {
            assert!(!app.studio.generate());
            app.render_notice(ctx);
        });
        let notice = app.studio.session().notice().expect("warning stays up");
        assert_eq!(notice.message, "Please enter a prompt!");

        let _ = ctx.run(press(Key::Enter), |ctx| app.render_notice(ctx));
        assert!(app.studio.session().notice().is_none());
    }

    #[test]
    fn escape_dismisses_a_notice_already_on_screen() {
        let ctx = egui::Context::default();
        let mut app = app();
        app.studio.generate();

        let _ = ctx.run(RawInput::default(), |ctx| app.render_notice(ctx));
        assert!(app.studio.session().notice().is_some());

        let _ = ctx.run(press(Key::Escape), |ctx| app.render_notice(ctx));
        assert!(app.studio.session().notice().is_none());
    }

    #[test]
    fn replacement_notice_survives_the_frame_it_appears_in() {
        let ctx = egui::Context::default();
        let mut app = app();
        app.studio.generate();
        let _ = ctx.run(RawInput::default(), |ctx| app.render_notice(ctx));

        let _ = ctx.run(press(Key::Enter), |ctx| {
            app.studio.session_mut().dismiss_notice();
            app.studio.generate();
            app.render_notice(ctx);
        });
        assert!(app.studio.session().notice().is_some());
    }
}
