use tracing::{debug, warn};

use crate::config::SolverConfiguration;
use crate::geometry::{lines_intersect_open, Polygon, EPSILON};
use crate::model::{ObjectToPrint, PrinterGeometry, ScheduledPlate};
use crate::preprocess::{prepare_object, scale_down_coordinate};
use crate::rational::Rational;
use crate::solver::GROUND_PRESENCE_TIME;

fn point_outside_translated_polygon(
    px: f64,
    py: f64,
    polygon: &Polygon,
    offset_x: f64,
    offset_y: f64,
) -> bool {
    if polygon.points.len() < 3 {
        return true;
    }
    for edge in polygon.lines() {
        if edge.is_degenerate() {
            continue;
        }
        let (nx, ny) = edge.outward_normal();
        let dot = nx as f64 * (px - (offset_x + edge.a.x as f64))
            + ny as f64 * (py - (offset_y + edge.a.y as f64));
        if dot > -EPSILON {
            return true;
        }
    }
    false
}

/// Vertex test of one plate assignment: for every temporally ordered pair,
/// the earlier object's footprint vertices stay outside every unreachable
/// zone of the later object, and the zone vertices stay outside the
/// footprint.
pub fn check_points_outside_polygons(
    values_x: &[Rational],
    values_y: &[Rational],
    values_t: &[Rational],
    polygons: &[Polygon],
    unreachable_polygons: &[Vec<Polygon>],
) -> bool {
    let count = polygons.len();
    for a in 0..count {
        for b in 0..count {
            if a == b || values_t[a].as_f64() >= values_t[b].as_f64() {
                continue;
            }
            let ax = values_x[a].as_f64();
            let ay = values_y[a].as_f64();
            let bx = values_x[b].as_f64();
            let by = values_y[b].as_f64();
            for zone in &unreachable_polygons[b] {
                for vertex in &polygons[a].points {
                    if !point_outside_translated_polygon(
                        ax + vertex.x as f64,
                        ay + vertex.y as f64,
                        zone,
                        bx,
                        by,
                    ) {
                        debug!(earlier = a, later = b, "footprint vertex inside unreachable zone");
                        return false;
                    }
                }
                for vertex in &zone.points {
                    if !point_outside_translated_polygon(
                        bx + vertex.x as f64,
                        by + vertex.y as f64,
                        &polygons[a],
                        ax,
                        ay,
                    ) {
                        debug!(earlier = a, later = b, "unreachable zone vertex inside footprint");
                        return false;
                    }
                }
            }
        }
    }
    true
}

/// Edge test of one plate assignment: no footprint edge of an earlier object
/// may cross an unreachable zone edge of a later object. Uses the open
/// intersection predicate so collinear touching edges pass.
pub fn check_polygon_line_intersections(
    values_x: &[Rational],
    values_y: &[Rational],
    values_t: &[Rational],
    polygons: &[Polygon],
    unreachable_polygons: &[Vec<Polygon>],
) -> bool {
    let count = polygons.len();
    for a in 0..count {
        for b in 0..count {
            if a == b || values_t[a].as_f64() >= values_t[b].as_f64() {
                continue;
            }
            let ax = values_x[a].as_f64();
            let ay = values_y[a].as_f64();
            let bx = values_x[b].as_f64();
            let by = values_y[b].as_f64();
            for zone in &unreachable_polygons[b] {
                for footprint_edge in polygons[a].lines() {
                    let (ux, uy) = footprint_edge.direction();
                    for zone_edge in zone.lines() {
                        let (vx, vy) = zone_edge.direction();
                        if lines_intersect_open(
                            ax + footprint_edge.a.x as f64,
                            ay + footprint_edge.a.y as f64,
                            ux as f64,
                            uy as f64,
                            bx + zone_edge.a.x as f64,
                            by + zone_edge.a.y as f64,
                            vx as f64,
                            vy as f64,
                        ) {
                            debug!(earlier = a, later = b, "footprint edge crosses unreachable zone");
                            return false;
                        }
                    }
                }
            }
        }
    }
    true
}

/// Independent verification of a proposed arrangement: true iff every plate
/// passes both the vertex and the edge test for every ordered object pair.
/// Never fails; undecipherable input counts as not printable.
pub fn check_scheduled_objects_for_sequential_printability(
    solver_configuration: &SolverConfiguration,
    printer_geometry: &PrinterGeometry,
    objects_to_print: &[ObjectToPrint],
    scheduled_plates: &[ScheduledPlate],
) -> bool {
    // The checker sees the polygons as delivered, without decimation.
    let mut prepared = Vec::with_capacity(objects_to_print.len());
    for object in objects_to_print {
        match prepare_object(solver_configuration, printer_geometry, object, false) {
            Ok(p) => prepared.push(p),
            Err(error) => {
                warn!(%error, "object preparation failed during printability check");
                return false;
            }
        }
    }

    for plate in scheduled_plates {
        let mut plate_polygons = Vec::new();
        let mut plate_unreachable = Vec::new();
        let mut values_x = Vec::new();
        let mut values_y = Vec::new();
        let mut values_t = Vec::new();

        let mut time = GROUND_PRESENCE_TIME;
        for scheduled in &plate.scheduled_objects {
            let Some(p) = prepared.iter().find(|p| p.id == scheduled.id) else {
                warn!(id = scheduled.id, "scheduled object missing from the input set");
                return false;
            };
            plate_polygons.push(p.footprint.clone());
            plate_unreachable.push(p.unreachable.clone());
            values_x.push(scale_down_coordinate(scheduled.x));
            values_y.push(scale_down_coordinate(scheduled.y));
            time += 2
                * solver_configuration.temporal_spread
                * solver_configuration.object_group_size as i64;
            values_t.push(Rational::from(time));
        }

        if !check_points_outside_polygons(
            &values_x,
            &values_y,
            &values_t,
            &plate_polygons,
            &plate_unreachable,
        ) {
            return false;
        }
        if !check_polygon_line_intersections(
            &values_x,
            &values_y,
            &values_t,
            &plate_polygons,
            &plate_unreachable,
        ) {
            return false;
        }
    }
    true
}
