mod app;
mod theme;
mod viewer;

pub use app::TakeoffApp;
