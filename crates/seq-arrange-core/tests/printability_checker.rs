use seq_arrange_core::checker::{check_points_outside_polygons, check_polygon_line_intersections};
use seq_arrange_core::geometry::{Point, Polygon};
use seq_arrange_core::model::{ObjectToPrint, ScheduledObject, ScheduledPlate};
use seq_arrange_core::preprocess::{presets, SLICER_SCALE_FACTOR};
use seq_arrange_core::prelude::*;
use seq_arrange_core::rational::Rational;

fn mm(v: i64) -> i64 {
    v * SLICER_SCALE_FACTOR
}

fn footprint(width_mm: i64, depth_mm: i64) -> Polygon {
    Polygon::new(vec![
        Point::new(0, 0),
        Point::new(mm(width_mm), 0),
        Point::new(mm(width_mm), mm(depth_mm)),
        Point::new(0, mm(depth_mm)),
    ])
}

fn boxy_object(id: i32, width_mm: i64, depth_mm: i64, height_mm: i64) -> ObjectToPrint {
    let outline = footprint(width_mm, depth_mm);
    let mut pgns_at_height = vec![(presets::NOZZLE_LEVEL, outline.clone())];
    for level in [
        presets::EXTRUDER_LEVEL,
        presets::HOSE_LEVEL,
        presets::GANTRY_LEVEL,
    ] {
        if mm(height_mm) > level {
            pgns_at_height.push((level, outline.clone()));
        }
    }
    ObjectToPrint {
        id,
        glued_to_next: false,
        total_height: mm(height_mm),
        pgns_at_height,
    }
}

fn plate(entries: &[(i32, i64, i64)]) -> ScheduledPlate {
    ScheduledPlate {
        scheduled_objects: entries
            .iter()
            .map(|&(id, x, y)| ScheduledObject::new(id, x, y))
            .collect(),
    }
}

#[test]
fn short_objects_far_apart_are_printable() {
    let printer = presets::printer_geometry_mk3s();
    let cfg = SolverConfiguration::from_printer_geometry(&printer);
    let objects = vec![boxy_object(1, 50, 50, 10), boxy_object(2, 50, 50, 10)];

    let plates = vec![plate(&[(1, 0, 0), (2, mm(150), 0)])];
    assert!(check_scheduled_objects_for_sequential_printability(
        &cfg, &printer, &objects, &plates
    ));
}

#[test]
fn overlapping_footprints_are_not_printable() {
    let printer = presets::printer_geometry_mk3s();
    let cfg = SolverConfiguration::from_printer_geometry(&printer);
    let objects = vec![boxy_object(1, 50, 50, 10), boxy_object(2, 50, 50, 10)];

    let plates = vec![plate(&[(1, 0, 0), (2, mm(20), mm(20))])];
    assert!(!check_scheduled_objects_for_sequential_printability(
        &cfg, &printer, &objects, &plates
    ));
}

/// Footprints stay apart, but the earlier object sits inside the later
/// object's gantry-level band, which spans the whole bed width.
#[test]
fn gantry_band_blocks_horizontally_separated_tall_objects() {
    let printer = presets::printer_geometry_mk3s();
    let cfg = SolverConfiguration::from_printer_geometry(&printer);
    let objects = vec![boxy_object(1, 50, 50, 30), boxy_object(2, 50, 50, 30)];

    // Same y, generous x separation: a naive 2D packer would accept this.
    let plates = vec![plate(&[(1, 0, 0), (2, mm(150), 0)])];
    assert!(!check_scheduled_objects_for_sequential_printability(
        &cfg, &printer, &objects, &plates
    ));
}

#[test]
fn separate_plates_resolve_the_gantry_band() {
    let printer = presets::printer_geometry_mk3s();
    let cfg = SolverConfiguration::from_printer_geometry(&printer);
    let objects = vec![boxy_object(1, 50, 50, 30), boxy_object(2, 50, 50, 30)];

    let plates = vec![plate(&[(1, 0, 0)]), plate(&[(2, mm(150), 0)])];
    assert!(check_scheduled_objects_for_sequential_printability(
        &cfg, &printer, &objects, &plates
    ));
}

#[test]
fn unknown_scheduled_id_is_not_printable() {
    let printer = presets::printer_geometry_mk3s();
    let cfg = SolverConfiguration::from_printer_geometry(&printer);
    let objects = vec![boxy_object(1, 50, 50, 10)];

    let plates = vec![plate(&[(77, 0, 0)])];
    assert!(!check_scheduled_objects_for_sequential_printability(
        &cfg, &printer, &objects, &plates
    ));
}

// Direct exercises of the two pair tests, in solver units.

fn square(side: i64) -> Polygon {
    Polygon::new(vec![
        Point::new(0, 0),
        Point::new(side, 0),
        Point::new(side, side),
        Point::new(0, side),
    ])
}

#[test]
fn point_pass_detects_vertex_inside_zone() {
    let polygons = vec![square(100), square(100)];
    // Each object's only zone is its own footprint inflated by 10 on each side.
    let zone = Polygon::new(vec![
        Point::new(-10, -10),
        Point::new(110, -10),
        Point::new(110, 110),
        Point::new(-10, 110),
    ]);
    let unreachable = vec![vec![zone.clone()], vec![zone]];

    let values_t = vec![Rational::from(32), Rational::from(160)];
    let apart_x = vec![Rational::from(0), Rational::from(200)];
    let near_x = vec![Rational::from(0), Rational::from(105)];
    let values_y = vec![Rational::from(0), Rational::from(0)];

    assert!(check_points_outside_polygons(
        &apart_x, &values_y, &values_t, &polygons, &unreachable
    ));
    assert!(!check_points_outside_polygons(
        &near_x, &values_y, &values_t, &polygons, &unreachable
    ));
}

#[test]
fn line_pass_detects_crossing_edges() {
    let polygons = vec![square(100), square(100)];
    // A cross-shaped zone wider than the later object.
    let zone = Polygon::new(vec![
        Point::new(-150, 40),
        Point::new(250, 40),
        Point::new(250, 60),
        Point::new(-150, 60),
    ]);
    let unreachable = vec![vec![zone.clone()], vec![zone]];

    let values_t = vec![Rational::from(32), Rational::from(160)];
    let values_y = vec![Rational::from(0), Rational::from(0)];
    // The earlier footprint at x=0 crosses the later object's bar zone.
    let values_x = vec![Rational::from(0), Rational::from(120)];

    assert!(!check_polygon_line_intersections(
        &values_x, &values_y, &values_t, &polygons, &unreachable
    ));

    // Vertically separated placements clear the bar.
    let clear_y = vec![Rational::from(200), Rational::from(0)];
    assert!(check_polygon_line_intersections(
        &values_x, &clear_y, &values_t, &polygons, &unreachable
    ));
}
