//! Cross-page rollups for the side panel and the CSV serialization.

use std::collections::BTreeMap;

use crate::project::{Project, Units};

pub const CSV_HEADER: &str = "Type,Item,Qty/Length,Units,Page,Notes";

/// Round to two decimals, matching how lengths appear in the UI and CSV.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Six-decimal rounding used for the scale-factor readout.
pub fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Length label like `12.34 ft`. Whole values print without decimals.
pub fn format_len(value: f64, units: Units) -> String {
    if value.is_nan() {
        return "—".to_string();
    }
    format!("{} {}", round2(value), units)
}

/// One run in the cross-page linear list.
#[derive(Debug, Clone, PartialEq)]
pub struct RunEntry {
    /// 0-based page index; display and CSV add one.
    pub page: u16,
    pub name: String,
    pub real_len: f64,
}

/// Aggregates shown in the side panel.
#[derive(Debug, Clone, Default)]
pub struct Totals {
    /// (symbol key, quantity) across every page, sorted by key.
    pub counts: Vec<(String, usize)>,
    /// Every run, pages ascending, insertion order within a page.
    pub runs: Vec<RunEntry>,
}

impl Totals {
    pub fn collect(project: &Project) -> Self {
        let mut tally: BTreeMap<String, usize> = BTreeMap::new();
        let mut runs = Vec::new();
        for (page, markups) in project.pages() {
            for mark in &markups.counts {
                *tally.entry(mark.symbol.clone()).or_default() += 1;
            }
            for run in &markups.runs {
                runs.push(RunEntry {
                    page,
                    name: run.name.clone(),
                    real_len: run.real_len,
                });
            }
        }
        Self {
            counts: tally.into_iter().collect(),
            runs,
        }
    }
}

/// Per-symbol quantities on one page, for the legend badges.
pub fn page_counts(project: &Project, page: u16) -> BTreeMap<String, usize> {
    let mut tally = BTreeMap::new();
    if let Some(markups) = project.page(page) {
        for mark in &markups.counts {
            *tally.entry(mark.symbol.clone()).or_default() += 1;
        }
    }
    tally
}

/// Every CSV row below the header: count totals per (page, key) with keys
/// sorted within a page, then runs in insertion order. Pages ascend in both
/// passes and are written 1-based.
pub fn csv_rows(project: &Project, units: Units) -> Vec<String> {
    let mut rows = Vec::new();
    for (page, markups) in project.pages() {
        let mut tally: BTreeMap<&str, usize> = BTreeMap::new();
        for mark in &markups.counts {
            *tally.entry(mark.symbol.as_str()).or_default() += 1;
        }
        for (key, qty) in tally {
            rows.push(format!("COUNT,{},{},ea,{},", key, qty, page + 1));
        }
    }
    for (page, markups) in project.pages() {
        for run in &markups.runs {
            rows.push(format!(
                "LINE,{},{},{},{},",
                run.name,
                round2(run.real_len),
                units,
                page + 1
            ));
        }
    }
    rows
}

/// The full CSV document. Fields are joined with bare commas and rows with
/// a single newline; values are not quoted.
pub fn build_csv(project: &Project, units: Units) -> String {
    let mut out = String::from(CSV_HEADER);
    for row in csv_rows(project, units) {
        out.push('\n');
        out.push_str(&row);
    }
    out
}
