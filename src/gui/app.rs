use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use eframe::{egui, CreationContext};
use egui::{Color32, Context, Key, RichText, Rounding, Sense, Ui, Vec2, ViewportCommand};
use egui_extras::{Column, TableBuilder};
use egui_modal::Modal;
use rfd::FileDialog;

use super::theme;
use super::viewer::PageViewer;
use crate::export;
use crate::geometry::Point;
use crate::pdf::{DocumentHandle, PdfRenderer};
use crate::project::Units;
use crate::session::{InputRequest, LineDraft, Mode, Session, Tool};
use crate::summary::{self, format_len, Totals};

const TOAST_DURATION: Duration = Duration::from_millis(2400);

/// The main application state.
pub struct TakeoffApp {
    session: Session,
    // The document handle carries an erased borrow of the renderer's pdfium
    // binding; it must be declared first so it drops first.
    document: Option<DocumentHandle>,
    renderer: PdfRenderer,
    viewer: PageViewer,

    file_status: Option<String>,
    toast: Option<(String, Instant)>,

    active_prompt: Option<InputRequest>,
    prompt_text: String,
    symbol_key: String,
    symbol_label: String,
    add_symbol_requested: bool,
    clear_page_requested: bool,

    recent_files: Vec<PathBuf>,
    theme: Theme,
}

#[derive(PartialEq, Clone, Copy)]
pub enum Theme {
    Light,
    Dark,
}

impl TakeoffApp {
    pub fn new(cc: &CreationContext, pdf: Option<PathBuf>, units: Units) -> Self {
        theme::setup_custom_theme(&cc.egui_ctx);

        let recent_files = load_recent_files().unwrap_or_default();
        let renderer = PdfRenderer::new();
        let viewer = PageViewer::new(renderer.available());

        let mut app = Self {
            session: Session::new(units),
            document: None,
            renderer,
            viewer,
            file_status: None,
            toast: None,
            active_prompt: None,
            prompt_text: String::new(),
            symbol_key: String::new(),
            symbol_label: String::new(),
            add_symbol_requested: false,
            clear_page_requested: false,
            recent_files,
            theme: Theme::Dark,
        };

        if let Some(path) = pdf {
            app.load_pdf(&path);
        }
        app
    }

    fn load_pdf(&mut self, path: &Path) {
        match self.renderer.load_document(path) {
            Ok(handle) => {
                let pages = handle.page_count();
                let size_kb = std::fs::metadata(path)
                    .map(|m| (m.len() as f64 / 1024.0).round() as u64)
                    .unwrap_or(0);
                self.file_status = Some(format!(
                    "{} ({} KB)",
                    path.file_name().unwrap_or_default().to_string_lossy(),
                    size_kb
                ));
                log::info!("loaded {} ({} pages)", path.display(), pages);

                self.document = Some(handle);
                self.session.document_loaded(pages);
                if self.session.tool() == Tool::Idle {
                    self.session.set_tool(Tool::Count);
                }
                self.session.notify(format!("Loaded PDF ({} pages)", pages));
                self.viewer.reset_for_document();
                add_to_recent_files(&mut self.recent_files, path.to_path_buf());
            }
            Err(err) => {
                log::error!("failed to load {}: {}", path.display(), err);
                self.session.notify(format!("PDF load failed: {}", err));
            }
        }
    }

    fn menu_bar(&mut self, ui: &mut Ui, ctx: &Context) {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("Open PDF...").clicked() {
                    if let Some(path) = open_file_dialog() {
                        self.load_pdf(&path);
                    }
                    ui.close_menu();
                }

                ui.menu_button("Recent Files", |ui| {
                    let recent = self.recent_files.clone();
                    for path in &recent {
                        let name = path.file_name().unwrap_or_default().to_string_lossy();
                        if ui.button(name.to_string()).clicked() {
                            self.load_pdf(path);
                            ui.close_menu();
                        }
                    }
                    if recent.is_empty() {
                        ui.label("No recent files");
                    }
                });

                ui.separator();
                if ui.button("Exit").clicked() {
                    ctx.send_viewport_cmd(ViewportCommand::Close);
                }
            });

            ui.menu_button("View", |ui| {
                if ui.radio_value(&mut self.theme, Theme::Light, "Light Theme").clicked() {
                    apply_theme(ctx, self.theme);
                    ui.close_menu();
                }
                if ui.radio_value(&mut self.theme, Theme::Dark, "Dark Theme").clicked() {
                    apply_theme(ctx, self.theme);
                    ui.close_menu();
                }
            });
        });
    }

    fn toolbar(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            if ui.button("\u{1f4c2} Open PDF...").clicked() {
                if let Some(path) = open_file_dialog() {
                    self.load_pdf(&path);
                }
            }

            ui.separator();

            let page = self.session.current_page();
            let pages = self.session.page_count();
            if ui
                .add_enabled(page > 0, egui::Button::new("\u{25c0} Prev"))
                .clicked()
                && self.session.prev_page()
            {
                self.viewer.request_render();
            }
            if pages == 0 {
                ui.label("Page - / -");
            } else {
                ui.label(format!("Page {} / {}", page + 1, pages));
            }
            if ui
                .add_enabled(
                    pages > 0 && page + 1 < pages,
                    egui::Button::new("Next \u{25b6}"),
                )
                .clicked()
                && self.session.next_page()
            {
                self.viewer.request_render();
            }
            if pages > 1 {
                ui.label(RichText::new("(\u{2190}/\u{2192})").weak().small());
            }

            ui.separator();

            if ui.button("\u{1f50d}-").clicked() {
                self.viewer.zoom_out();
            }
            ui.label(format!("{:.0}%", self.viewer.zoom() * 100.0));
            if ui.button("\u{1f50d}+").clicked() {
                self.viewer.zoom_in();
            }
            if ui.button("Fit").clicked() {
                self.viewer.zoom_fit();
            }

            ui.separator();

            egui::ComboBox::from_id_source("units_combo")
                .selected_text(self.session.units.to_string())
                .width(52.0)
                .show_ui(ui, |ui| {
                    for unit in Units::ALL {
                        ui.selectable_value(&mut self.session.units, unit, unit.as_str());
                    }
                });

            ui.separator();

            let tool = self.session.tool();
            if ui.selectable_label(tool == Tool::Count, "Count").clicked() {
                self.session.set_tool(Tool::Count);
            }
            if ui.selectable_label(tool == Tool::Line, "Linear").clicked() {
                self.session.set_tool(Tool::Line);
            }
            if ui.selectable_label(tool == Tool::Scale, "Set Scale").clicked() {
                self.session.set_tool(Tool::Scale);
                self.session.notify("Click two points on a known dimension");
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(format!("Scale: {}", self.session.scale_label()));
            });
        });
    }

    fn status_bar(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            ui.label(self.session.mode().status_label());
            ui.separator();
            match self.session.active_symbol() {
                Some(key) => ui.label(format!("Item: {}", key)),
                None => ui.label("Item: none"),
            };
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if let Some(status) = &self.file_status {
                    let label = ui.label(RichText::new(status).weak());
                    if let Some(document) = &self.document {
                        label.on_hover_text(document.title());
                    }
                }
            });
        });
    }

    fn side_panel(&mut self, ui: &mut Ui) {
        ui.vertical_centered(|ui| {
            ui.heading("PDF Takeoff");
        });
        ui.separator();

        ui.horizontal(|ui| {
            ui.strong("Count items");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.small_button("+ Add").clicked() {
                    self.add_symbol_requested = true;
                }
            });
        });

        let page = self.session.current_page();
        let badges = summary::page_counts(&self.session.project, page);
        let symbols = self.session.project.symbols.clone();
        for symbol in &symbols {
            ui.horizontal(|ui| {
                let (rect, _) = ui.allocate_exact_size(Vec2::splat(12.0), Sense::hover());
                ui.painter().rect_filled(
                    rect,
                    Rounding::same(4.0),
                    Color32::from_rgb(symbol.color[0], symbol.color[1], symbol.color[2]),
                );
                let selected = self.session.active_symbol() == Some(symbol.key.as_str());
                let text = format!("{}  {}", symbol.key, symbol.label);
                if ui.selectable_label(selected, text).clicked() {
                    self.session.select_symbol(&symbol.key);
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let badge = badges.get(&symbol.key).copied().unwrap_or(0);
                    ui.label(RichText::new(badge.to_string()).weak());
                });
            });
        }

        ui.separator();
        ui.strong("Totals (all pages)");
        let totals = Totals::collect(&self.session.project);
        if totals.counts.is_empty() {
            ui.label(RichText::new("No counts yet").weak());
        } else {
            ui.push_id("totals_table", |ui| {
                TableBuilder::new(ui)
                    .striped(true)
                    .column(Column::remainder())
                    .column(Column::auto())
                    .header(18.0, |mut header| {
                        header.col(|ui| {
                            ui.strong("Item");
                        });
                        header.col(|ui| {
                            ui.strong("Qty");
                        });
                    })
                    .body(|mut body| {
                        for (key, qty) in &totals.counts {
                            body.row(18.0, |mut row| {
                                row.col(|ui| {
                                    ui.label(key);
                                });
                                row.col(|ui| {
                                    ui.label(qty.to_string());
                                });
                            });
                        }
                    });
            });
        }

        ui.separator();
        ui.strong("Linear (all pages)");
        if totals.runs.is_empty() {
            ui.label(RichText::new("No linear yet").weak());
        } else {
            let units = self.session.units;
            ui.push_id("linear_table", |ui| {
                TableBuilder::new(ui)
                    .striped(true)
                    .column(Column::remainder())
                    .column(Column::auto())
                    .body(|mut body| {
                        for run in &totals.runs {
                            body.row(18.0, |mut row| {
                                row.col(|ui| {
                                    ui.label(format!("{} (p{})", run.name, run.page + 1));
                                });
                                row.col(|ui| {
                                    ui.label(format_len(run.real_len, units));
                                });
                            });
                        }
                    });
            });
        }

        ui.separator();
        if ui.button("Export CSV").clicked() {
            self.export_csv();
        }
        let can_export_png = self.session.has_document() && self.viewer.raster().is_some();
        if ui
            .add_enabled(can_export_png, egui::Button::new("Export Marked PNG"))
            .clicked()
        {
            self.export_png();
        }
        if ui
            .add_enabled(self.session.has_document(), egui::Button::new("Clear Page"))
            .clicked()
        {
            self.clear_page_requested = true;
        }
    }

    fn export_csv(&mut self) {
        let Some(path) = FileDialog::new()
            .set_file_name(export::csv_filename())
            .add_filter("CSV Files", &["csv"])
            .save_file()
        else {
            return;
        };
        let csv = summary::build_csv(&self.session.project, self.session.units);
        match export::write_csv(&path, &csv) {
            Ok(()) => self.session.notify("CSV exported"),
            Err(err) => {
                log::error!("CSV export failed: {:#}", err);
                self.session.notify("CSV export failed");
            }
        }
    }

    fn export_png(&mut self) {
        let Some(path) = FileDialog::new()
            .set_file_name(export::png_filename(self.session.current_page()))
            .add_filter("PNG Image", &["png"])
            .save_file()
        else {
            return;
        };
        let Some(image) = self.flatten_current() else {
            return;
        };
        match export::write_png(&path, &image) {
            Ok(()) => self.session.notify("Marked PNG exported"),
            Err(err) => {
                log::error!("PNG export failed: {:#}", err);
                self.session.notify("PNG export failed");
            }
        }
    }

    fn flatten_current(&self) -> Option<image::RgbaImage> {
        let raster = self.viewer.raster()?;
        let page = self.session.current_page();
        let (draft, calibration): (Option<&LineDraft>, &[Point]) = match self.session.mode() {
            Mode::Line { draft } => (draft.as_ref(), &[]),
            Mode::Scale { pending } => (None, pending.as_slice()),
            _ => (None, &[]),
        };
        Some(export::flatten_page(
            raster,
            self.session.project.page(page),
            &self.session.project.symbols,
            draft,
            calibration,
        ))
    }

    /// Render the session's pending prompt as a modal.
    fn show_prompt(&mut self, ctx: &Context) {
        let Some(request) = self.session.pending_input().cloned() else {
            self.active_prompt = None;
            return;
        };

        let modal = Modal::new(ctx, "session_prompt");
        if self.active_prompt.as_ref() != Some(&request) {
            self.active_prompt = Some(request.clone());
            self.prompt_text = request.initial_text();
            modal.open();
        }

        modal.show(|ui| {
            modal.title(ui, request.title());
            modal.frame(ui, |ui| {
                ui.label(request.prompt(self.session.units));
                let edit = ui.text_edit_singleline(&mut self.prompt_text);
                if edit.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter)) {
                    let reply = std::mem::take(&mut self.prompt_text);
                    self.session.submit_input(&reply);
                    self.active_prompt = None;
                    modal.close();
                }
            });
            modal.buttons(ui, |ui| {
                if modal.button(ui, "Cancel").clicked() {
                    self.session.cancel_input();
                    self.active_prompt = None;
                }
                if modal.suggested_button(ui, "OK").clicked() {
                    let reply = std::mem::take(&mut self.prompt_text);
                    self.session.submit_input(&reply);
                    self.active_prompt = None;
                }
            });
        });

        // Dismissed some other way (escape, programmatic close): treat as
        // cancel so canvas clicks are not blocked forever.
        if self.active_prompt.is_some() && !modal.is_open() {
            self.session.cancel_input();
            self.active_prompt = None;
        }
    }

    fn show_confirm_clear(&mut self, ctx: &Context) {
        let modal = Modal::new(ctx, "confirm_clear");
        if self.clear_page_requested {
            self.clear_page_requested = false;
            modal.open();
        }
        modal.show(|ui| {
            modal.title(ui, "Clear page");
            modal.frame(ui, |ui| {
                ui.label("Clear ALL markups on this page?");
            });
            modal.buttons(ui, |ui| {
                let _ = modal.button(ui, "Cancel");
                if modal.caution_button(ui, "Clear").clicked() {
                    self.session.clear_current_page();
                }
            });
        });
    }

    fn show_add_symbol(&mut self, ctx: &Context) {
        let modal = Modal::new(ctx, "add_symbol");
        if self.add_symbol_requested {
            self.add_symbol_requested = false;
            self.symbol_key.clear();
            self.symbol_label.clear();
            modal.open();
        }
        modal.show(|ui| {
            modal.title(ui, "Add count item");
            modal.frame(ui, |ui| {
                ui.label("Key (short, e.g. SW3)");
                ui.text_edit_singleline(&mut self.symbol_key);
                ui.label("Label");
                ui.text_edit_singleline(&mut self.symbol_label);
            });
            modal.buttons(ui, |ui| {
                let _ = modal.button(ui, "Cancel");
                if modal.suggested_button(ui, "Add").clicked() {
                    let key = self.symbol_key.clone();
                    let label = self.symbol_label.clone();
                    self.session.add_symbol(&key, &label);
                }
            });
        });
    }

    fn handle_keys(&mut self, ctx: &Context) {
        if !self.session.has_document() || ctx.wants_keyboard_input() {
            return;
        }
        let (left, right, home, end) = ctx.input(|i| {
            (
                i.key_pressed(Key::ArrowLeft),
                i.key_pressed(Key::ArrowRight),
                i.key_pressed(Key::Home),
                i.key_pressed(Key::End),
            )
        });
        let changed = if left {
            self.session.prev_page()
        } else if right {
            self.session.next_page()
        } else if home {
            self.session.first_page()
        } else if end {
            self.session.last_page()
        } else {
            false
        };
        if changed {
            self.viewer.request_render();
        }
    }

    fn render_if_needed(&mut self, ctx: &Context) {
        if !self.viewer.needs_render() {
            return;
        }
        let Some(document) = &self.document else {
            self.viewer.clear_render_request();
            return;
        };
        let page = self.session.current_page();
        match document.render_page(page, self.viewer.target_width()) {
            Ok(rendered) => {
                self.viewer.set_page(ctx, rendered);
                ctx.request_repaint();
            }
            Err(err) => {
                self.viewer.clear_render_request();
                log::error!("page {} render failed: {}", page + 1, err);
                self.session.notify(format!("Page render failed: {}", err));
            }
        }
    }

    fn pump_notices(&mut self) {
        for notice in self.session.take_notices() {
            self.toast = Some((notice, Instant::now()));
        }
        if let Some((_, since)) = &self.toast {
            if since.elapsed() >= TOAST_DURATION {
                self.toast = None;
            }
        }
    }

    fn show_toast(&self, ctx: &Context) {
        let Some((message, since)) = &self.toast else {
            return;
        };
        egui::Area::new(egui::Id::new("takeoff_toast"))
            .anchor(egui::Align2::CENTER_BOTTOM, Vec2::new(0.0, -24.0))
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.label(message);
                });
            });
        ctx.request_repaint_after(TOAST_DURATION.saturating_sub(since.elapsed()));
    }
}

impl eframe::App for TakeoffApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.handle_keys(ctx);

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            self.menu_bar(ui, ctx);
        });
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.toolbar(ui);
        });
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            self.status_bar(ui);
        });
        egui::SidePanel::left("takeoff_panel")
            .resizable(true)
            .default_width(260.0)
            .width_range(220.0..=380.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .id_source("takeoff_panel_scroll")
                    .show(ui, |ui| {
                        self.side_panel(ui);
                    });
            });
        egui::CentralPanel::default().show(ctx, |ui| {
            self.viewer.show(ui, &mut self.session);
        });

        self.show_prompt(ctx);
        self.show_confirm_clear(ctx);
        self.show_add_symbol(ctx);

        self.render_if_needed(ctx);
        self.pump_notices();
        self.show_toast(ctx);
    }
}

/// Apply the selected theme
fn apply_theme(ctx: &Context, theme: Theme) {
    match theme {
        Theme::Light => {
            ctx.set_visuals(egui::Visuals::light());
        }
        Theme::Dark => {
            theme::setup_custom_theme(ctx);
        }
    }
}

/// Open a file dialog and return the selected file path
fn open_file_dialog() -> Option<PathBuf> {
    FileDialog::new()
        .add_filter("PDF Files", &["pdf"])
        .pick_file()
}

/// Load recent files from storage
fn load_recent_files() -> Result<Vec<PathBuf>> {
    let config_dir = match dirs::config_dir() {
        Some(dir) => dir.join("pdftakeoff"),
        None => return Ok(Vec::new()),
    };

    let recent_files_path = config_dir.join("recent_files.txt");
    if !recent_files_path.exists() {
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(recent_files_path)?;
    Ok(content
        .lines()
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}

/// Save recent files to storage
fn save_recent_files(recent_files: &[PathBuf]) -> Result<()> {
    let config_dir = match dirs::config_dir() {
        Some(dir) => dir.join("pdftakeoff"),
        None => return Ok(()),
    };

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    let content: String = recent_files
        .iter()
        .map(|path| path.to_string_lossy().to_string())
        .collect::<Vec<String>>()
        .join("\n");

    std::fs::write(config_dir.join("recent_files.txt"), content)?;
    Ok(())
}

/// Add a file to the front of the recent files list, dropping duplicates.
fn add_to_recent_files(recent_files: &mut Vec<PathBuf>, path: PathBuf) {
    recent_files.retain(|p| p != &path);
    recent_files.insert(0, path);
    if recent_files.len() > 10 {
        recent_files.truncate(10);
    }
    save_recent_files(recent_files).ok();
}
