//! Interaction state for one run of the app: the active tool, the draft
//! measurement, pending calibration clicks, and the notice queue.
//!
//! The session never talks to the windowing layer. Pointer gestures come in
//! as plain overlay coordinates, prompts go out as [`InputRequest`] values
//! that the shell renders however it likes, and user-visible notices queue
//! up until the shell drains them.

use crate::geometry::Point;
use crate::project::{LinearRun, Project, Units};
use crate::summary::round6;

/// Tool selected in the toolbar. Selecting a tool resets that tool's
/// working state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Idle,
    Count,
    Line,
    Scale,
}

/// An unfinished measurement polyline.
#[derive(Debug, Clone, PartialEq)]
pub struct LineDraft {
    pub name: String,
    pub vertices: Vec<Point>,
}

/// Current interaction mode, including per-tool working state.
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Idle,
    Count,
    Line { draft: Option<LineDraft> },
    Scale { pending: Vec<Point> },
}

impl Mode {
    pub fn tool(&self) -> Tool {
        match self {
            Mode::Idle => Tool::Idle,
            Mode::Count => Tool::Count,
            Mode::Line { .. } => Tool::Line,
            Mode::Scale { .. } => Tool::Scale,
        }
    }

    pub fn status_label(&self) -> &'static str {
        match self {
            Mode::Idle => "Mode: Idle",
            Mode::Count => "Mode: Count (click to place)",
            Mode::Line { .. } => "Mode: Linear (click points, double-click to finish)",
            Mode::Scale { .. } => "Mode: Set Scale (click two points)",
        }
    }
}

/// A question the session needs answered before it can continue. The shell
/// shows it as a modal and calls back with `submit_input` or `cancel_input`.
#[derive(Debug, Clone, PartialEq)]
pub enum InputRequest {
    /// Name for a measurement about to start at `start`.
    LineName { default: String, start: Point },
    /// Real-world distance between the two calibration clicks.
    ScaleDistance { pixel_distance: f64 },
}

impl InputRequest {
    pub fn title(&self) -> &'static str {
        match self {
            InputRequest::LineName { .. } => "Line name",
            InputRequest::ScaleDistance { .. } => "Set scale",
        }
    }

    pub fn prompt(&self, units: Units) -> String {
        match self {
            InputRequest::LineName { .. } => {
                "Line name (ex: 3/4 EMT, 1 EMT, FMC whip)".to_string()
            }
            InputRequest::ScaleDistance { .. } => format!(
                "Enter REAL distance between points (in {}). Example: 3 for 3 ft",
                units
            ),
        }
    }

    /// Text the input field starts out with.
    pub fn initial_text(&self) -> String {
        match self {
            InputRequest::LineName { default, .. } => default.clone(),
            InputRequest::ScaleDistance { .. } => "3".to_string(),
        }
    }
}

/// Identifies one markup on the current page for removal or dragging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupRef {
    Count(usize),
    Run(usize),
}

/// All interaction state for the running app.
pub struct Session {
    pub project: Project,
    pub units: Units,
    mode: Mode,
    active_symbol: Option<String>,
    scale_factor: Option<f64>,
    current_page: u16,
    page_count: u16,
    pending_input: Option<InputRequest>,
    notices: Vec<String>,
    last_line_name: String,
}

impl Session {
    pub fn new(units: Units) -> Self {
        Self {
            project: Project::new(),
            units,
            mode: Mode::Idle,
            active_symbol: None,
            scale_factor: None,
            current_page: 0,
            page_count: 0,
            pending_input: None,
            notices: Vec::new(),
            last_line_name: "3/4 EMT".to_string(),
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn tool(&self) -> Tool {
        self.mode.tool()
    }

    pub fn active_symbol(&self) -> Option<&str> {
        self.active_symbol.as_deref()
    }

    pub fn scale_factor(&self) -> Option<f64> {
        self.scale_factor
    }

    pub fn current_page(&self) -> u16 {
        self.current_page
    }

    pub fn page_count(&self) -> u16 {
        self.page_count
    }

    pub fn has_document(&self) -> bool {
        self.page_count > 0
    }

    pub fn pending_input(&self) -> Option<&InputRequest> {
        self.pending_input.as_ref()
    }

    /// Toolbar label for the calibration state.
    pub fn scale_label(&self) -> String {
        match self.scale_factor {
            Some(factor) => format!("1 px = {} {}", round6(factor), self.units),
            None => "Not set".to_string(),
        }
    }

    /// Queue a user-visible notice for the shell's toast.
    pub fn notify(&mut self, message: impl Into<String>) {
        self.notices.push(message.into());
    }

    /// Drain queued notices, oldest first.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    /// Switch tools, abandoning any draft or pending calibration clicks.
    pub fn set_tool(&mut self, tool: Tool) {
        log::debug!("tool -> {:?}", tool);
        self.mode = match tool {
            Tool::Idle => Mode::Idle,
            Tool::Count => Mode::Count,
            Tool::Line => Mode::Line { draft: None },
            Tool::Scale => Mode::Scale { pending: Vec::new() },
        };
    }

    /// A primary click on the page overlay. Ignored while a prompt is open
    /// or no document is loaded.
    pub fn primary_click(&mut self, pos: Point) {
        if self.pending_input.is_some() || !self.has_document() {
            return;
        }
        match self.mode {
            Mode::Idle => {}
            Mode::Count => self.count_click(pos),
            Mode::Line { .. } => self.line_click(pos),
            Mode::Scale { .. } => self.scale_click(pos),
        }
    }

    /// A double click finishes the draft measurement, if it has at least
    /// two vertices. Anything shorter is left alone.
    pub fn double_click(&mut self) {
        if self.pending_input.is_some() {
            return;
        }
        let Mode::Line { draft } = &mut self.mode else {
            return;
        };
        let long_enough = matches!(draft, Some(d) if d.vertices.len() >= 2);
        if !long_enough {
            return;
        }
        let Some(factor) = self.scale_factor else {
            return;
        };
        let Some(d) = draft.take() else { return };
        let run = LinearRun::measured(d.name.clone(), d.vertices, factor);
        self.last_line_name = d.name;
        self.project.add_run(self.current_page, run);
        self.notify("Linear saved (right-click / long-press to remove)");
    }

    fn count_click(&mut self, pos: Point) {
        match self.active_symbol.clone() {
            Some(key) => self.project.add_count(self.current_page, &key, pos),
            None => self.notify("Pick a count item first"),
        }
    }

    fn line_click(&mut self, pos: Point) {
        if self.scale_factor.is_none() {
            self.notify("Set scale first (Set Scale)");
            return;
        }
        if let Mode::Line { draft } = &mut self.mode {
            match draft {
                Some(d) => d.vertices.push(pos),
                None => {
                    self.pending_input = Some(InputRequest::LineName {
                        default: self.last_line_name.clone(),
                        start: pos,
                    });
                }
            }
        }
    }

    fn scale_click(&mut self, pos: Point) {
        if let Mode::Scale { pending } = &mut self.mode {
            pending.push(pos);
            if pending.len() == 2 {
                let pixel_distance = pending[0].distance(&pending[1]);
                self.pending_input = Some(InputRequest::ScaleDistance { pixel_distance });
            }
        }
    }

    /// Answer the pending prompt.
    pub fn submit_input(&mut self, reply: &str) {
        let Some(request) = self.pending_input.take() else {
            return;
        };
        match request {
            InputRequest::LineName { default, start } => {
                let trimmed = reply.trim();
                let name = if trimmed.is_empty() {
                    default
                } else {
                    trimmed.to_string()
                };
                self.last_line_name = name.clone();
                if let Mode::Line { draft } = &mut self.mode {
                    *draft = Some(LineDraft {
                        name,
                        vertices: vec![start],
                    });
                }
            }
            InputRequest::ScaleDistance { pixel_distance } => {
                let real: Option<f64> = reply.trim().parse().ok();
                match real {
                    Some(r) if r.is_finite() && r > 0.0 && pixel_distance > 0.0 => {
                        let factor = r / pixel_distance;
                        self.scale_factor = Some(factor);
                        let label = format!("Scale set: 1 px = {} {}", round6(factor), self.units);
                        self.notify(label);
                    }
                    _ => self.notify("Scale not set (invalid input)"),
                }
                if let Mode::Scale { pending } = &mut self.mode {
                    pending.clear();
                }
            }
        }
    }

    /// Dismiss the pending prompt. A dismissed name prompt abandons the
    /// buffered click; a dismissed scale prompt discards both calibration
    /// points and leaves the factor as it was.
    pub fn cancel_input(&mut self) {
        let Some(request) = self.pending_input.take() else {
            return;
        };
        if matches!(request, InputRequest::ScaleDistance { .. }) {
            self.notify("Scale not set (invalid input)");
            if let Mode::Scale { pending } = &mut self.mode {
                pending.clear();
            }
        }
    }

    /// Record a freshly loaded document. Markups and calibration survive;
    /// the view goes back to the first page.
    pub fn document_loaded(&mut self, page_count: u16) {
        self.page_count = page_count;
        self.current_page = 0;
        self.pending_input = None;
        self.drop_working_state();
    }

    /// Jump to a page (clamped). Returns true when the page changed.
    pub fn go_to_page(&mut self, page: u16) -> bool {
        if self.page_count == 0 {
            return false;
        }
        let clamped = page.min(self.page_count - 1);
        if clamped == self.current_page {
            return false;
        }
        self.current_page = clamped;
        self.drop_working_state();
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.current_page.saturating_add(1))
    }

    pub fn prev_page(&mut self) -> bool {
        self.go_to_page(self.current_page.saturating_sub(1))
    }

    pub fn first_page(&mut self) -> bool {
        self.go_to_page(0)
    }

    pub fn last_page(&mut self) -> bool {
        match self.page_count {
            0 => false,
            n => self.go_to_page(n - 1),
        }
    }

    /// Wipe the current page's markups. The shell is expected to confirm
    /// with the user before calling this.
    pub fn clear_current_page(&mut self) {
        self.project.clear_page(self.current_page);
        self.drop_working_state();
        self.notify("Page cleared");
    }

    pub fn remove_markup(&mut self, target: MarkupRef) {
        let removed = match target {
            MarkupRef::Count(index) => self
                .project
                .remove_count(self.current_page, index)
                .is_some(),
            MarkupRef::Run(index) => self.project.remove_run(self.current_page, index).is_some(),
        };
        if removed {
            self.notify("Removed markup");
        }
    }

    pub fn translate_markup(&mut self, target: MarkupRef, dx: f64, dy: f64) {
        match target {
            MarkupRef::Count(index) => {
                self.project.translate_count(self.current_page, index, dx, dy)
            }
            MarkupRef::Run(index) => self.project.translate_run(self.current_page, index, dx, dy),
        }
    }

    /// Add a legend symbol. Keys are trimmed and uppercased; an empty key is
    /// ignored, a blank label falls back to the key.
    pub fn add_symbol(&mut self, key: &str, label: &str) {
        let key = key.trim().to_uppercase();
        if key.is_empty() {
            return;
        }
        let label = label.trim();
        let label = if label.is_empty() { key.clone() } else { label.to_string() };
        if self.project.add_symbol(&key, &label) {
            self.notify(format!("Added symbol: {}", key));
        } else {
            self.notify("That key already exists");
        }
    }

    /// Make a legend symbol the active one and switch to count mode.
    pub fn select_symbol(&mut self, key: &str) {
        if self.project.symbol(key).is_none() {
            return;
        }
        self.active_symbol = Some(key.to_string());
        self.set_tool(Tool::Count);
        self.notify(format!("Selected: {}", key));
    }

    fn drop_working_state(&mut self) {
        match &mut self.mode {
            Mode::Line { draft } => *draft = None,
            Mode::Scale { pending } => pending.clear(),
            _ => {}
        }
    }
}
