use egui::{
    Align2, Color32, Context, FontId, Pos2, Rect, Response, Sense, Shape, Stroke, TextureHandle,
    TextureOptions, Ui, Vec2,
};
use image::RgbaImage;

use crate::geometry::{point_polyline_distance, Point};
use crate::pdf::RenderedPage;
use crate::session::{MarkupRef, Mode, Session};

pub const MIN_ZOOM: f32 = 0.25;
pub const MAX_ZOOM: f32 = 6.0;

/// Horizontal margin subtracted from the panel width when fitting a page.
const FIT_MARGIN: f32 = 20.0;

const RUN_STROKE: Color32 = Color32::from_rgb(0x2a, 0xa3, 0xff);
const CALIBRATION_FILL: Color32 = Color32::from_rgb(0xff, 0xd3, 0x5a);
const FALLBACK_FILL: Color32 = Color32::from_rgb(0xff, 0x4b, 0x4b);
const RING: Color32 = Color32::from_rgba_premultiplied(255, 255, 255, 166);
const LABEL: Color32 = Color32::from_rgba_premultiplied(255, 255, 255, 230);

const COUNT_RADIUS: f32 = 7.0;
const CALIBRATION_RADIUS: f32 = 6.0;
const RUN_WIDTH: f32 = 3.0;

/// Pointer slop for grabbing a markup, in overlay pixels.
const COUNT_HIT_RADIUS: f64 = 10.0;
const RUN_HIT_RADIUS: f64 = 6.0;

/// The central page view: the rendered page texture with the markup overlay
/// painted over it each frame, plus all pointer interaction with it.
///
/// Markup coordinates are overlay pixels relative to the page raster's top
/// left corner at the zoom they were placed. Re-rendering the page rebuilds
/// the overlay from the store, so removal and page switches need no
/// per-shape teardown.
pub struct PageViewer {
    zoom: f32,
    viewport_width: f32,
    raster: Option<RgbaImage>,
    texture: Option<TextureHandle>,
    needs_render: bool,
    renderer_available: bool,
    drag_target: Option<MarkupRef>,
    context_target: Option<MarkupRef>,
}

impl PageViewer {
    pub fn new(renderer_available: bool) -> Self {
        Self {
            zoom: 1.0,
            viewport_width: 900.0,
            raster: None,
            texture: None,
            needs_render: false,
            renderer_available,
            drag_target: None,
            context_target: None,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom * 1.25);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom / 1.25);
    }

    /// Back to the width-fitted view.
    pub fn zoom_fit(&mut self) {
        self.set_zoom(1.0);
        self.needs_render = true;
    }

    fn set_zoom(&mut self, zoom: f32) {
        let clamped = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if (clamped - self.zoom).abs() > f32::EPSILON {
            self.zoom = clamped;
            self.needs_render = true;
        }
    }

    /// Pixel width the next render should target: the width-fitted page
    /// size scaled by the zoom factor.
    pub fn target_width(&self) -> u32 {
        ((self.viewport_width - FIT_MARGIN).max(1.0) * self.zoom)
            .round()
            .max(1.0) as u32
    }

    pub fn needs_render(&self) -> bool {
        self.needs_render
    }

    pub fn request_render(&mut self) {
        self.needs_render = true;
    }

    /// Drop a render request that cannot be satisfied, so a failing page
    /// does not retry every frame.
    pub fn clear_render_request(&mut self) {
        self.needs_render = false;
    }

    /// Fresh document: reset the view to a width-fitted first page.
    pub fn reset_for_document(&mut self) {
        self.zoom = 1.0;
        self.raster = None;
        self.texture = None;
        self.drag_target = None;
        self.context_target = None;
        self.needs_render = true;
    }

    /// Install a freshly rendered page raster and upload its texture.
    pub fn set_page(&mut self, ctx: &Context, rendered: RenderedPage) {
        let size = [rendered.width as usize, rendered.height as usize];
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, rendered.image.as_raw());
        self.texture = Some(ctx.load_texture("takeoff_page", color_image, TextureOptions::default()));
        self.raster = Some(rendered.image);
        self.needs_render = false;
    }

    /// The raster currently on screen, for PNG flattening.
    pub fn raster(&self) -> Option<&RgbaImage> {
        self.raster.as_ref()
    }

    pub fn show(&mut self, ui: &mut Ui, session: &mut Session) {
        self.viewport_width = ui.available_width();

        let Some(texture) = self.texture.clone() else {
            self.show_welcome(ui);
            return;
        };

        egui::ScrollArea::both()
            .auto_shrink([false; 2])
            .id_source("page_view")
            .show(ui, |ui| {
                let size = texture.size_vec2();
                let (response, painter) = ui.allocate_painter(size, Sense::click_and_drag());
                let origin = response.rect.min;

                painter.image(
                    texture.id(),
                    response.rect,
                    Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                    Color32::WHITE,
                );
                self.paint_overlay(&painter, origin, session);
                self.handle_input(response, origin, session, ui);
            });
    }

    fn show_welcome(&self, ui: &mut Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(100.0);
            ui.heading("PDF Takeoff");
            ui.add_space(20.0);
            ui.label("Open a PDF drawing (File \u{25b8} Open PDF\u{2026}) to start counting and measuring.");
            if !self.renderer_available {
                ui.add_space(10.0);
                ui.label(
                    egui::RichText::new("\u{26a0} PDF rendering unavailable")
                        .color(Color32::YELLOW)
                        .strong(),
                );
                ui.label(
                    egui::RichText::new("The pdfium system library could not be loaded.").small(),
                );
            }
            ui.add_space(100.0);
        });
    }

    fn paint_overlay(&self, painter: &egui::Painter, origin: Pos2, session: &Session) {
        let to_screen =
            |p: &Point| Pos2::new(origin.x + p.x as f32, origin.y + p.y as f32);

        if let Some(markups) = session.project.page(session.current_page()) {
            for run in &markups.runs {
                let points: Vec<Pos2> = run.points.iter().map(to_screen).collect();
                if points.len() >= 2 {
                    painter.add(Shape::line(points, Stroke::new(RUN_WIDTH, RUN_STROKE)));
                }
                if let Some(last) = run.points.last() {
                    let label = format!(
                        "{} \u{2022} {}",
                        run.name,
                        crate::summary::format_len(run.real_len, session.units)
                    );
                    painter.text(
                        to_screen(last) + Vec2::new(8.0, 6.0),
                        Align2::LEFT_TOP,
                        label,
                        FontId::proportional(12.0),
                        LABEL,
                    );
                }
            }
            for mark in &markups.counts {
                let center = to_screen(&mark.pos);
                let fill = session
                    .project
                    .symbol(&mark.symbol)
                    .map(|s| Color32::from_rgb(s.color[0], s.color[1], s.color[2]))
                    .unwrap_or(FALLBACK_FILL);
                painter.circle_filled(center, COUNT_RADIUS, fill);
                painter.circle_stroke(center, COUNT_RADIUS, Stroke::new(1.0, RING));
                painter.text(
                    center + Vec2::new(10.0, -8.0),
                    Align2::LEFT_TOP,
                    &mark.symbol,
                    FontId::proportional(12.0),
                    LABEL,
                );
            }
        }

        match session.mode() {
            Mode::Line { draft: Some(draft) } => {
                let points: Vec<Pos2> = draft.vertices.iter().map(to_screen).collect();
                if points.len() >= 2 {
                    painter.add(Shape::line(points, Stroke::new(RUN_WIDTH, RUN_STROKE)));
                }
            }
            Mode::Scale { pending } => {
                for point in pending {
                    let center = to_screen(point);
                    painter.circle_filled(center, CALIBRATION_RADIUS, CALIBRATION_FILL);
                    painter.circle_stroke(center, CALIBRATION_RADIUS, Stroke::new(1.0, RING));
                }
            }
            _ => {}
        }
    }

    fn handle_input(&mut self, response: Response, origin: Pos2, session: &mut Session, ui: &Ui) {
        if response.hovered() {
            let delta = ui.input(|i| i.zoom_delta());
            if delta != 1.0 {
                let step = if delta < 1.0 { 0.9 } else { 1.1 };
                self.set_zoom(self.zoom * step);
            }
        }

        let pointer = response
            .interact_pointer_pos()
            .map(|pos| Point::new((pos.x - origin.x) as f64, (pos.y - origin.y) as f64));

        if response.clicked() {
            if let Some(pos) = pointer {
                session.primary_click(pos);
            }
        }
        if response.double_clicked() {
            session.double_click();
        }

        if response.drag_started() {
            self.drag_target = pointer.and_then(|pos| hit_test(session, pos));
        }
        if response.dragged() {
            if let Some(target) = self.drag_target {
                let delta = response.drag_delta();
                session.translate_markup(target, delta.x as f64, delta.y as f64);
            }
        }
        if response.drag_released() {
            self.drag_target = None;
        }

        if response.secondary_clicked() {
            self.context_target = pointer.and_then(|pos| hit_test(session, pos));
        }
        let _ = response.context_menu(|ui| {
            match self.context_target {
                Some(target) => {
                    if ui.button("Remove").clicked() {
                        session.remove_markup(target);
                        self.context_target = None;
                        ui.close_menu();
                    }
                }
                None => {
                    ui.label("No markup here");
                }
            }
        });
    }
}

/// Topmost markup under the pointer: count dots first, then run polylines,
/// later placements winning ties.
fn hit_test(session: &Session, pos: Point) -> Option<MarkupRef> {
    let markups = session.project.page(session.current_page())?;
    for (index, mark) in markups.counts.iter().enumerate().rev() {
        if mark.pos.distance(&pos) <= COUNT_HIT_RADIUS {
            return Some(MarkupRef::Count(index));
        }
    }
    for (index, run) in markups.runs.iter().enumerate().rev() {
        if let Some(distance) = point_polyline_distance(pos, &run.points) {
            if distance <= RUN_HIT_RADIUS {
                return Some(MarkupRef::Run(index));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{LinearRun, Units};

    fn session_with_markups() -> Session {
        let mut session = Session::new(Units::Feet);
        session.document_loaded(1);
        session.project.add_count(0, "DUP", Point::new(100.0, 100.0));
        session.project.add_run(
            0,
            LinearRun::measured(
                "EMT",
                vec![Point::new(0.0, 50.0), Point::new(200.0, 50.0)],
                1.0,
            ),
        );
        session
    }

    #[test]
    fn test_hit_test_prefers_count_dots() {
        let session = session_with_markups();
        assert_eq!(
            hit_test(&session, Point::new(102.0, 98.0)),
            Some(MarkupRef::Count(0))
        );
        assert_eq!(
            hit_test(&session, Point::new(100.0, 52.0)),
            Some(MarkupRef::Run(0))
        );
        assert_eq!(hit_test(&session, Point::new(400.0, 400.0)), None);
    }

    #[test]
    fn test_hit_test_picks_topmost_of_stacked_dots() {
        let mut session = session_with_markups();
        session.project.add_count(0, "SW", Point::new(101.0, 101.0));
        assert_eq!(
            hit_test(&session, Point::new(100.0, 100.0)),
            Some(MarkupRef::Count(1))
        );
    }

    #[test]
    fn test_zoom_clamps_and_requests_render() {
        let mut viewer = PageViewer::new(true);
        for _ in 0..40 {
            viewer.zoom_in();
        }
        assert_eq!(viewer.zoom(), MAX_ZOOM);
        for _ in 0..80 {
            viewer.zoom_out();
        }
        assert_eq!(viewer.zoom(), MIN_ZOOM);
        assert!(viewer.needs_render());
    }

    #[test]
    fn test_target_width_tracks_zoom() {
        let mut viewer = PageViewer::new(true);
        viewer.viewport_width = 1020.0;
        assert_eq!(viewer.target_width(), 1000);
        viewer.zoom_in();
        assert_eq!(viewer.target_width(), 1250);
    }
}
