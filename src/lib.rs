//! PDF takeoff library: count and linear markups over rendered PDF pages,
//! with scale calibration and CSV/PNG export.

pub mod export;
pub mod geometry;
pub mod gui;
pub mod pdf;
pub mod project;
pub mod session;
pub mod summary;
