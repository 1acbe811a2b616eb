use egui::{Color32, Context, Rounding, Stroke, Visuals};

/// Set up the dark drawing-room theme used by default.
pub fn setup_custom_theme(ctx: &Context) {
    let mut visuals = Visuals::dark();

    visuals.panel_fill = Color32::from_rgb(22, 24, 28);
    visuals.window_fill = Color32::from_rgb(27, 29, 34);

    visuals.widgets.active.bg_fill = Color32::from_rgb(48, 52, 62);
    visuals.widgets.active.fg_stroke = Stroke::new(1.0, Color32::from_rgb(214, 216, 224));

    visuals.widgets.inactive.bg_fill = Color32::from_rgb(38, 41, 49);
    visuals.widgets.inactive.fg_stroke = Stroke::new(1.0, Color32::from_rgb(176, 180, 190));

    // Selection picks up the measurement-stroke blue so the active tool and
    // drawn runs read as one accent.
    visuals.selection.bg_fill = Color32::from_rgb(21, 82, 128);
    visuals.selection.stroke = Stroke::new(1.0, Color32::from_rgb(42, 163, 255));

    visuals.hyperlink_color = Color32::from_rgb(90, 170, 255);

    let rounding = Rounding::same(4.0);
    visuals.window_rounding = rounding;
    visuals.menu_rounding = rounding;

    ctx.set_visuals(visuals);
}
