// Integration tests for the export pipeline: a session-driven takeoff
// serialized to CSV on disk and flattened to a marked PNG.

use image::{Rgba, RgbaImage};

use pdftakeoff::export;
use pdftakeoff::geometry::Point;
use pdftakeoff::project::{Project, Units};
use pdftakeoff::session::{Session, Tool};
use pdftakeoff::summary;

// Calibrate 100 px to 25 ft, count two duplex and one switch on the first
// page, then measure a 200 px feeder on the second.
fn worked_takeoff() -> Session {
    let mut session = Session::new(Units::Feet);
    session.document_loaded(2);

    session.set_tool(Tool::Scale);
    session.primary_click(Point::new(0.0, 0.0));
    session.primary_click(Point::new(100.0, 0.0));
    session.submit_input("25");

    session.select_symbol("DUP");
    session.primary_click(Point::new(10.0, 10.0));
    session.primary_click(Point::new(20.0, 20.0));
    session.select_symbol("SW");
    session.primary_click(Point::new(30.0, 30.0));

    session.next_page();
    session.set_tool(Tool::Line);
    session.primary_click(Point::new(0.0, 0.0));
    session.submit_input("Feeder");
    session.primary_click(Point::new(200.0, 0.0));
    session.double_click();

    session.take_notices();
    session
}

#[test]
fn test_takeoff_csv_written_end_to_end() {
    let session = worked_takeoff();
    let csv = summary::build_csv(&session.project, session.units);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(export::csv_filename());
    export::write_csv(&path, &csv).unwrap();

    let body = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        body,
        "Type,Item,Qty/Length,Units,Page,Notes\n\
         COUNT,DUP,2,ea,1,\n\
         COUNT,SW,1,ea,1,\n\
         LINE,Feeder,50,ft,2,"
    );
}

#[test]
fn test_csv_respects_selected_units() {
    let mut session = worked_takeoff();
    session.units = Units::Meters;

    let csv = summary::build_csv(&session.project, session.units);
    assert!(csv.ends_with("LINE,Feeder,50,m,2,"));
}

#[test]
fn test_marked_png_round_trips_through_disk() {
    let session = worked_takeoff();
    let raster = RgbaImage::from_pixel(250, 60, Rgba([0xff, 0xff, 0xff, 0xff]));

    // Page 2 holds the feeder run along y = 0.
    let flattened = export::flatten_page(
        &raster,
        session.project.page(1),
        &session.project.symbols,
        None,
        &[],
    );
    assert_eq!(flattened.dimensions(), raster.dimensions());
    assert_eq!(flattened.get_pixel(100, 0), &Rgba([0x2a, 0xa3, 0xff, 0xff]));

    let dir = tempfile::tempdir().unwrap();
    let path = dir
        .path()
        .join(export::png_filename(session.current_page()));
    export::write_png(&path, &flattened).unwrap();

    let read_back = image::open(&path).unwrap().to_rgba8();
    assert_eq!(read_back.dimensions(), flattened.dimensions());
    assert_eq!(read_back.get_pixel(100, 0), flattened.get_pixel(100, 0));
}

#[test]
fn test_flatten_falls_back_to_red_for_unknown_symbols() {
    let mut project = Project::new();
    project.add_count(0, "MYSTERY", Point::new(15.0, 15.0));
    let raster = RgbaImage::from_pixel(30, 30, Rgba([0xff, 0xff, 0xff, 0xff]));

    let out = export::flatten_page(&raster, project.page(0), &project.symbols, None, &[]);

    assert_eq!(out.get_pixel(15, 15), &Rgba([0xff, 0x4b, 0x4b, 0xff]));
}

#[test]
fn test_png_filename_matches_current_page() {
    let session = worked_takeoff();
    assert_eq!(session.current_page(), 1);
    assert_eq!(
        export::png_filename(session.current_page()),
        "takeoff_marked_page2.png"
    );
}
