mod canvas;
mod dialogs;
mod sidebar;
mod status;

use eframe::egui::{self, Color32, Context, Rounding};

pub(crate) const ACCENT: Color32 = Color32::from_rgb(31, 83, 141);

/// Dark theme with the blue accent used for primary buttons.
pub(crate) fn apply_theme(ctx: &Context) {
    let mut visuals = egui::Visuals::dark();
    visuals.selection.bg_fill = ACCENT;
    visuals.widgets.active.rounding = Rounding::same(6.0);
    visuals.widgets.inactive.rounding = Rounding::same(6.0);
    visuals.widgets.hovered.rounding = Rounding::same(6.0);
    ctx.set_visuals(visuals);
}
