//! The takeoff project: symbol legend plus per-page markup storage.
//!
//! Everything lives in memory for the life of the process. Markups are keyed
//! by 0-based page index and survive document switches; only an explicit
//! page clear discards them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::geometry::{polyline_length, Point};

/// Display colors cycled through when new symbols are created.
pub const SYMBOL_PALETTE: [[u8; 3]; 8] = [
    [0xff, 0x4b, 0x4b],
    [0x2a, 0xa3, 0xff],
    [0x44, 0xf0, 0xa6],
    [0xff, 0xd3, 0x5a],
    [0xb3, 0x88, 0xff],
    [0xff, 0x7a, 0xd9],
    [0x7f, 0xf3, 0xff],
    [0xff, 0x9f, 0x43],
];

/// A count category: short unique key, human label, display color.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub key: String,
    pub label: String,
    pub color: [u8; 3],
}

impl Symbol {
    pub fn new(key: impl Into<String>, label: impl Into<String>, color: [u8; 3]) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            color,
        }
    }
}

/// A placed count marker referencing a symbol key.
#[derive(Debug, Clone, PartialEq)]
pub struct CountMark {
    pub symbol: String,
    pub pos: Point,
}

/// A finished measurement polyline with its name and lengths.
///
/// Lengths are frozen at finalization time: `real_len` was computed with the
/// scale factor in effect when the run was completed.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRun {
    pub name: String,
    pub points: Vec<Point>,
    pub pixel_len: f64,
    pub real_len: f64,
}

impl LinearRun {
    /// Build a run from its vertices, measuring it with the given scale
    /// factor (real units per pixel).
    pub fn measured(name: impl Into<String>, points: Vec<Point>, scale_factor: f64) -> Self {
        let pixel_len = polyline_length(&points);
        Self {
            name: name.into(),
            points,
            pixel_len,
            real_len: pixel_len * scale_factor,
        }
    }

    /// Offset every vertex by (dx, dy). Lengths are unaffected.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        for p in &mut self.points {
            *p = p.translated(dx, dy);
        }
    }
}

/// The markups placed on one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMarkups {
    pub counts: Vec<CountMark>,
    pub runs: Vec<LinearRun>,
}

impl PageMarkups {
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty() && self.runs.is_empty()
    }
}

/// The in-memory project: the symbol legend and every page's markups.
#[derive(Debug, Clone)]
pub struct Project {
    pub symbols: Vec<Symbol>,
    pages: BTreeMap<u16, PageMarkups>,
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}

impl Project {
    /// A project seeded with the stock electrical legend.
    pub fn new() -> Self {
        Self {
            symbols: vec![
                Symbol::new("DUP", "Duplex Recept", SYMBOL_PALETTE[0]),
                Symbol::new("GFCI", "GFCI", SYMBOL_PALETTE[1]),
                Symbol::new("SW", "Switch", SYMBOL_PALETTE[2]),
                Symbol::new("LT", "Light Fixture", SYMBOL_PALETTE[3]),
            ],
            pages: BTreeMap::new(),
        }
    }

    /// A project with no symbols and no markups.
    pub fn empty() -> Self {
        Self {
            symbols: Vec::new(),
            pages: BTreeMap::new(),
        }
    }

    /// The markup set for a page, created empty on first access.
    pub fn ensure_page(&mut self, page: u16) -> &mut PageMarkups {
        self.pages.entry(page).or_default()
    }

    /// The markup set for a page, if it has ever been touched.
    pub fn page(&self, page: u16) -> Option<&PageMarkups> {
        self.pages.get(&page)
    }

    /// All touched pages in ascending page order.
    pub fn pages(&self) -> impl Iterator<Item = (u16, &PageMarkups)> {
        self.pages.iter().map(|(page, markups)| (*page, markups))
    }

    /// Append a count mark. The symbol key is stored as given; unknown keys
    /// are accepted (the legend is advisory for display only).
    pub fn add_count(&mut self, page: u16, symbol: &str, pos: Point) {
        self.ensure_page(page).counts.push(CountMark {
            symbol: symbol.to_string(),
            pos,
        });
    }

    /// Append a finished run.
    pub fn add_run(&mut self, page: u16, run: LinearRun) {
        self.ensure_page(page).runs.push(run);
    }

    /// Remove the count mark at `index`, returning it if it existed.
    pub fn remove_count(&mut self, page: u16, index: usize) -> Option<CountMark> {
        let markups = self.pages.get_mut(&page)?;
        if index < markups.counts.len() {
            Some(markups.counts.remove(index))
        } else {
            None
        }
    }

    /// Remove the run at `index`, returning it if it existed.
    pub fn remove_run(&mut self, page: u16, index: usize) -> Option<LinearRun> {
        let markups = self.pages.get_mut(&page)?;
        if index < markups.runs.len() {
            Some(markups.runs.remove(index))
        } else {
            None
        }
    }

    /// Replace a page's markups with an empty set. Idempotent.
    pub fn clear_page(&mut self, page: u16) {
        self.pages.insert(page, PageMarkups::default());
    }

    /// Look up a symbol by key.
    pub fn symbol(&self, key: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.key == key)
    }

    /// Add a symbol with the next palette color. Returns false (and leaves
    /// the legend untouched) when the key is already taken.
    pub fn add_symbol(&mut self, key: &str, label: &str) -> bool {
        if self.symbols.iter().any(|s| s.key == key) {
            return false;
        }
        let color = SYMBOL_PALETTE[self.symbols.len() % SYMBOL_PALETTE.len()];
        self.symbols.push(Symbol::new(key, label, color));
        true
    }

    /// Move a count mark by (dx, dy) in overlay pixels.
    pub fn translate_count(&mut self, page: u16, index: usize, dx: f64, dy: f64) {
        if let Some(mark) = self
            .pages
            .get_mut(&page)
            .and_then(|m| m.counts.get_mut(index))
        {
            mark.pos = mark.pos.translated(dx, dy);
        }
    }

    /// Move a whole run rigidly by (dx, dy) in overlay pixels.
    pub fn translate_run(&mut self, page: u16, index: usize, dx: f64, dy: f64) {
        if let Some(run) = self
            .pages
            .get_mut(&page)
            .and_then(|m| m.runs.get_mut(index))
        {
            run.translate(dx, dy);
        }
    }
}

/// Display-only length unit. Changing it never rewrites stored values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Units {
    #[default]
    Feet,
    Inches,
    Meters,
    Millimeters,
}

impl Units {
    pub const ALL: [Units; 4] = [Units::Feet, Units::Inches, Units::Meters, Units::Millimeters];

    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Feet => "ft",
            Units::Inches => "in",
            Units::Meters => "m",
            Units::Millimeters => "mm",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ft" | "feet" => Ok(Units::Feet),
            "in" | "inches" => Ok(Units::Inches),
            "m" | "meters" => Ok(Units::Meters),
            "mm" | "millimeters" => Ok(Units::Millimeters),
            other => Err(format!(
                "unknown units '{}' (expected ft, in, m or mm)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_page_is_lazy() {
        let mut project = Project::empty();
        assert!(project.page(3).is_none());

        project.ensure_page(3);
        assert!(project.page(3).is_some());
        assert!(project.page(3).unwrap().is_empty());
    }

    #[test]
    fn test_add_count_accepts_unknown_keys() {
        let mut project = Project::empty();
        project.add_count(0, "NOPE", Point::new(1.0, 2.0));
        assert_eq!(project.page(0).unwrap().counts.len(), 1);
        assert_eq!(project.page(0).unwrap().counts[0].symbol, "NOPE");
    }

    #[test]
    fn test_measured_run_lengths() {
        let run = LinearRun::measured(
            "EMT",
            vec![Point::new(0.0, 0.0), Point::new(3.0, 4.0)],
            2.0,
        );
        assert_eq!(run.pixel_len, 5.0);
        assert_eq!(run.real_len, 10.0);
    }

    #[test]
    fn test_remove_affects_only_target() {
        let mut project = Project::new();
        project.add_count(0, "DUP", Point::new(1.0, 1.0));
        project.add_count(0, "GFCI", Point::new(2.0, 2.0));
        project.add_count(1, "DUP", Point::new(3.0, 3.0));
        project.add_run(
            0,
            LinearRun::measured("A", vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)], 1.0),
        );

        let removed = project.remove_count(0, 0).unwrap();
        assert_eq!(removed.symbol, "DUP");
        assert_eq!(project.page(0).unwrap().counts.len(), 1);
        assert_eq!(project.page(0).unwrap().counts[0].symbol, "GFCI");
        assert_eq!(project.page(0).unwrap().runs.len(), 1);
        assert_eq!(project.page(1).unwrap().counts.len(), 1);

        assert!(project.remove_count(0, 5).is_none());
        assert!(project.remove_run(9, 0).is_none());
    }

    #[test]
    fn test_clear_page_idempotent() {
        let mut project = Project::new();
        project.add_count(2, "SW", Point::new(1.0, 1.0));
        project.add_run(
            2,
            LinearRun::measured("B", vec![Point::new(0.0, 0.0), Point::new(4.0, 0.0)], 1.0),
        );

        project.clear_page(2);
        let once = project.page(2).unwrap().clone();
        project.clear_page(2);
        let twice = project.page(2).unwrap().clone();

        assert!(once.is_empty());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_duplicate_symbol_rejected() {
        let mut project = Project::new();
        let before = project.symbols.clone();

        assert!(!project.add_symbol("DUP", "Another duplex"));
        assert_eq!(project.symbols, before);

        assert!(project.add_symbol("EXIT", "Exit sign"));
        assert_eq!(project.symbols.len(), before.len() + 1);
    }

    #[test]
    fn test_translate_run_moves_rigidly() {
        let mut project = Project::empty();
        project.add_run(
            0,
            LinearRun::measured("C", vec![Point::new(0.0, 0.0), Point::new(3.0, 4.0)], 2.0),
        );
        project.translate_run(0, 0, 10.0, -5.0);

        let run = &project.page(0).unwrap().runs[0];
        assert_eq!(run.points[0], Point::new(10.0, -5.0));
        assert_eq!(run.points[1], Point::new(13.0, -1.0));
        assert_eq!(run.pixel_len, 5.0);
        assert_eq!(run.real_len, 10.0);
    }

    #[test]
    fn test_units_parse_and_display() {
        assert_eq!("ft".parse::<Units>().unwrap(), Units::Feet);
        assert_eq!("Meters".parse::<Units>().unwrap(), Units::Meters);
        assert_eq!(Units::Millimeters.to_string(), "mm");
        assert!("furlongs".parse::<Units>().is_err());
    }
}
