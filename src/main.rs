use std::path::PathBuf;

use clap::Parser;
use eframe::egui;

use pdftakeoff::gui::TakeoffApp;
use pdftakeoff::project::Units;

#[derive(Parser)]
#[command(author, version, about = "Count and measure markups over rendered PDF plans")]
struct Cli {
    /// PDF to open on startup
    pdf: Option<PathBuf>,

    /// Units reported for measured lengths (ft, in, m, mm)
    #[arg(short, long, default_value = "ft")]
    units: Units,
}

fn main() -> Result<(), eframe::Error> {
    env_logger::init();

    let cli = Cli::parse();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("PDF Takeoff"),
        ..Default::default()
    };

    eframe::run_native(
        "PDF Takeoff",
        options,
        Box::new(move |cc| Box::new(TakeoffApp::new(cc, cli.pdf, cli.units))),
    )
}
