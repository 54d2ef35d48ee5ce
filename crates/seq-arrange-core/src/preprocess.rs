use tracing::debug;

use crate::config::{DecimationPrecision, SolverConfiguration};
use crate::error::{Result, SeqArrangeError};
use crate::geometry::{convex_hull, Point, Polygon};
use crate::model::{ObjectToPrint, PrinterGeometry};
use crate::rational::Rational;

/// Slicer coordinates: one millimetre in scaled units.
pub const SLICER_SCALE_FACTOR: i64 = 100_000;
/// Divisor taking slicer coordinates into solver coordinates.
pub const SOLVER_SCALE_FACTOR: i64 = 50_000;

/// One object reduced to what the solver needs: a bed-level footprint and the
/// unreachable zones induced by the printer slices, both in solver units.
#[derive(Debug, Clone)]
pub struct PreparedObject {
    pub id: i32,
    pub glued_to_next: bool,
    pub footprint: Polygon,
    pub unreachable: Vec<Polygon>,
}

pub fn scale_down_coordinate(value: i64) -> Rational {
    Rational::new(value, SOLVER_SCALE_FACTOR)
}

pub fn scale_down_polygon(polygon: &Polygon) -> Polygon {
    Polygon::new(
        polygon
            .points
            .iter()
            .map(|p| Point::new(p.x / SOLVER_SCALE_FACTOR, p.y / SOLVER_SCALE_FACTOR))
            .collect(),
    )
}

pub fn scale_up_polygon(polygon: &Polygon) -> Polygon {
    Polygon::new(
        polygon
            .points
            .iter()
            .map(|p| Point::new(p.x * SOLVER_SCALE_FACTOR, p.y * SOLVER_SCALE_FACTOR))
            .collect(),
    )
}

/// Converts a solver-space position back to slicer coordinates.
pub fn scale_up_position(x: &Rational, y: &Rational) -> (i64, i64) {
    ((*x * SOLVER_SCALE_FACTOR).as_i64(), (*y * SOLVER_SCALE_FACTOR).as_i64())
}

fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = (b.x - a.x) as f64;
    let dy = (b.y - a.y) as f64;
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        let ex = (p.x - a.x) as f64;
        let ey = (p.y - a.y) as f64;
        return (ex * ex + ey * ey).sqrt();
    }
    ((p.x - a.x) as f64 * dy - (p.y - a.y) as f64 * dx).abs() / len
}

fn douglas_peucker(points: &[Point], tolerance: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;

    let mut stack = vec![(0usize, points.len() - 1)];
    while let Some((first, last)) = stack.pop() {
        if last <= first + 1 {
            continue;
        }
        let mut max_dist = 0.0;
        let mut max_index = first;
        for i in first + 1..last {
            let d = perpendicular_distance(points[i], points[first], points[last]);
            if d > max_dist {
                max_dist = d;
                max_index = i;
            }
        }
        if max_dist > tolerance {
            keep[max_index] = true;
            stack.push((first, max_index));
            stack.push((max_index, last));
        }
    }
    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Simplifies a polygon to a few vertices and normalises it to
/// counter-clockwise orientation. The ring is closed through its first point
/// for the simplification, mirroring how slicers decimate contours.
pub fn decimate_polygon_for_solver(
    solver_configuration: &SolverConfiguration,
    polygon: &Polygon,
) -> Polygon {
    let tolerance = solver_configuration.decimation_precision.tolerance();

    let mut decimated = if tolerance > 0.0 && polygon.points.len() > 3 {
        let mut ring = polygon.points.clone();
        ring.push(polygon.points[0]);
        let mut simplified = douglas_peucker(&ring, tolerance);
        simplified.pop();
        if simplified.len() < 3 {
            polygon.clone()
        } else {
            Polygon::new(simplified)
        }
    } else {
        polygon.clone()
    };
    decimated.make_counter_clockwise();
    decimated
}

/// A polygon fits the bed when its axis-aligned bounding box does.
pub fn check_polygon_size(
    solver_configuration: &SolverConfiguration,
    polygon: &Polygon,
) -> bool {
    let bb = polygon.bounding_box();
    bb.size_x() <= solver_configuration.maximum_x_bounding_box_size * SLICER_SCALE_FACTOR
        && bb.size_y() <= solver_configuration.maximum_y_bounding_box_size * SLICER_SCALE_FACTOR
}

/// Unreachable zone of a convex slice: positions of the extruder reference
/// point at which the slice outline reaches into the object. Minkowski
/// expansion of two convex outlines, taken as the hull of pairwise
/// differences.
fn convex_unreachable_zone(object_polygon: &Polygon, slice_polygon: &Polygon) -> Polygon {
    let mut sums = Vec::with_capacity(object_polygon.points.len() * slice_polygon.points.len());
    for a in &object_polygon.points {
        for s in &slice_polygon.points {
            sums.push(Point::new(a.x - s.x, a.y - s.y));
        }
    }
    convex_hull(&sums)
}

/// Unreachable zone of a box slice: the slice is an infinite bar, so only the
/// bounding boxes matter. Extends the slice box by the object box along both
/// principal axes.
fn box_unreachable_zone(object_polygon: &Polygon, slice_polygon: &Polygon) -> Polygon {
    let ob = object_polygon.bounding_box();
    let sb = slice_polygon.bounding_box();
    let min = Point::new(ob.min.x - sb.max.x, ob.min.y - sb.max.y);
    let max = Point::new(ob.max.x - sb.min.x, ob.max.y - sb.min.y);
    Polygon::new(vec![
        Point::new(min.x, min.y),
        Point::new(max.x, min.y),
        Point::new(max.x, max.y),
        Point::new(min.x, max.y),
    ])
}

/// Builds the ordered unreachable zone list for one object from per-height
/// object outlines and the matching slice outlines. Convex levels first, box
/// levels after, both in ascending height order; output is scaled down to
/// solver units.
pub fn prepare_unreachable_zone_polygons(
    convex_level_polygons: &[(Polygon, Vec<Polygon>)],
    box_level_polygons: &[(Polygon, Vec<Polygon>)],
) -> Vec<Polygon> {
    let mut zones = Vec::new();
    for (object_polygon, slices) in convex_level_polygons {
        if object_polygon.points.len() < 3 {
            continue;
        }
        for slice in slices {
            if slice.is_empty() {
                continue;
            }
            zones.push(scale_down_polygon(&convex_unreachable_zone(
                object_polygon,
                slice,
            )));
        }
    }
    for (object_polygon, slices) in box_level_polygons {
        if object_polygon.points.len() < 3 {
            continue;
        }
        for slice in slices {
            if slice.is_empty() {
                continue;
            }
            zones.push(scale_down_polygon(&box_unreachable_zone(
                object_polygon,
                slice,
            )));
        }
    }
    zones
}

/// Reduces one object against a printer geometry: decimation, bed-size
/// check, footprint extraction and unreachable zone construction.
pub fn prepare_object(
    solver_configuration: &SolverConfiguration,
    printer_geometry: &PrinterGeometry,
    object: &ObjectToPrint,
    apply_decimation: bool,
) -> Result<PreparedObject> {
    let mut convex_levels: Vec<(i64, Polygon)> = Vec::new();
    let mut box_levels: Vec<(i64, Polygon)> = Vec::new();

    for (height, polygon) in &object.pgns_at_height {
        if polygon.is_empty() {
            continue;
        }
        let mut decimated = if apply_decimation
            && solver_configuration.decimation_precision != DecimationPrecision::Undefined
        {
            decimate_polygon_for_solver(solver_configuration, polygon)
        } else {
            polygon.clone()
        };
        decimated.make_counter_clockwise();

        if !check_polygon_size(solver_configuration, &decimated) {
            return Err(SeqArrangeError::ObjectTooLarge { id: object.id });
        }

        if printer_geometry.convex_heights.contains(height) {
            convex_levels.push((*height, decimated));
        } else if printer_geometry.box_heights.contains(height) {
            box_levels.push((*height, decimated));
        } else {
            return Err(SeqArrangeError::UnsupportedPolygonHeight {
                id: object.id,
                height: *height,
            });
        }
    }
    convex_levels.sort_by_key(|(h, _)| *h);
    box_levels.sort_by_key(|(h, _)| *h);

    let footprint_slicer = convex_levels
        .first()
        .map(|(_, p)| p.clone())
        .ok_or_else(|| {
            SeqArrangeError::InvalidInput(format!(
                "object {} has no bed-level polygon at a convex height",
                object.id
            ))
        })?;

    let empty = Vec::new();
    let convex_pairs: Vec<(Polygon, Vec<Polygon>)> = convex_levels
        .into_iter()
        .map(|(h, p)| {
            let slices = printer_geometry.extruder_slices.get(&h).unwrap_or(&empty);
            (p, slices.clone())
        })
        .collect();
    let box_pairs: Vec<(Polygon, Vec<Polygon>)> = box_levels
        .into_iter()
        .map(|(h, p)| {
            let slices = printer_geometry.extruder_slices.get(&h).unwrap_or(&empty);
            (p, slices.clone())
        })
        .collect();

    let unreachable = prepare_unreachable_zone_polygons(&convex_pairs, &box_pairs);
    debug!(
        object = object.id,
        zones = unreachable.len(),
        "prepared object for the sequential solver"
    );

    Ok(PreparedObject {
        id: object.id,
        glued_to_next: object.glued_to_next,
        footprint: scale_down_polygon(&footprint_slicer),
        unreachable,
    })
}

/// Variant of [`prepare_object`] for callers that carry the slice outlines
/// as positional level tables instead of a full printer geometry: the k-th
/// height entry of an object pairs with the k-th convex level first, then
/// with the box levels.
pub fn prepare_object_with_zone_tables(
    solver_configuration: &SolverConfiguration,
    object: &ObjectToPrint,
    convex_zone_levels: &[Vec<Polygon>],
    box_zone_levels: &[Vec<Polygon>],
    apply_decimation: bool,
) -> Result<PreparedObject> {
    let mut convex_pairs: Vec<(Polygon, Vec<Polygon>)> = Vec::new();
    let mut box_pairs: Vec<(Polygon, Vec<Polygon>)> = Vec::new();

    for (level, (_, polygon)) in object.pgns_at_height.iter().enumerate() {
        if polygon.is_empty() {
            continue;
        }
        let mut decimated = if apply_decimation
            && solver_configuration.decimation_precision != DecimationPrecision::Undefined
        {
            decimate_polygon_for_solver(solver_configuration, polygon)
        } else {
            polygon.clone()
        };
        decimated.make_counter_clockwise();

        if !check_polygon_size(solver_configuration, &decimated) {
            return Err(SeqArrangeError::ObjectTooLarge { id: object.id });
        }

        if level < convex_zone_levels.len() {
            convex_pairs.push((decimated, convex_zone_levels[level].clone()));
        } else if level - convex_zone_levels.len() < box_zone_levels.len() {
            box_pairs.push((decimated, box_zone_levels[level - convex_zone_levels.len()].clone()));
        } else {
            return Err(SeqArrangeError::UnsupportedPolygonHeight {
                id: object.id,
                height: object.pgns_at_height[level].0,
            });
        }
    }

    let footprint_slicer = convex_pairs.first().map(|(p, _)| p.clone()).ok_or_else(|| {
        SeqArrangeError::InvalidInput(format!(
            "object {} has no bed-level polygon at a convex height",
            object.id
        ))
    })?;

    let unreachable = prepare_unreachable_zone_polygons(&convex_pairs, &box_pairs);

    Ok(PreparedObject {
        id: object.id,
        glued_to_next: object.glued_to_next,
        footprint: scale_down_polygon(&footprint_slicer),
        unreachable,
    })
}

/// Named printer tables. The engine never depends on the specific numbers;
/// the tables exist so the CLI and tests can run without a geometry file.
pub mod presets {
    use super::SLICER_SCALE_FACTOR;
    use crate::geometry::{Point, Polygon};
    use crate::model::PrinterGeometry;

    /// Slice heights in slicer units: nozzle tip, extruder body at 2 mm,
    /// filament hose at 18 mm, gantry beam at 26 mm.
    pub const NOZZLE_LEVEL: i64 = 0;
    pub const EXTRUDER_LEVEL: i64 = 2 * SLICER_SCALE_FACTOR;
    pub const HOSE_LEVEL: i64 = 18 * SLICER_SCALE_FACTOR;
    pub const GANTRY_LEVEL: i64 = 26 * SLICER_SCALE_FACTOR;

    fn rect(min_x: i64, min_y: i64, max_x: i64, max_y: i64) -> Polygon {
        Polygon::new(vec![
            Point::new(min_x, min_y),
            Point::new(max_x, min_y),
            Point::new(max_x, max_y),
            Point::new(min_x, max_y),
        ])
    }

    fn cartesian_geometry(x_size_mm: i64, y_size_mm: i64) -> PrinterGeometry {
        let x_size = x_size_mm * SLICER_SCALE_FACTOR;
        let y_size = y_size_mm * SLICER_SCALE_FACTOR;
        let mut geometry = PrinterGeometry {
            x_size,
            y_size,
            ..Default::default()
        };
        geometry.convex_heights.insert(NOZZLE_LEVEL);
        geometry.convex_heights.insert(EXTRUDER_LEVEL);
        geometry.box_heights.insert(HOSE_LEVEL);
        geometry.box_heights.insert(GANTRY_LEVEL);

        let s = SLICER_SCALE_FACTOR;
        // Nozzle tip.
        geometry
            .extruder_slices
            .insert(NOZZLE_LEVEL, vec![rect(-s, -s, s, s)]);
        // Extruder body, reaching behind the nozzle.
        geometry.extruder_slices.insert(
            EXTRUDER_LEVEL,
            vec![rect(-20 * s, -12 * s, 20 * s, 45 * s)],
        );
        // Filament hose, a bar across the whole gantry.
        geometry
            .extruder_slices
            .insert(HOSE_LEVEL, vec![rect(-x_size, -s, x_size, 13 * s)]);
        // Gantry beam.
        geometry
            .extruder_slices
            .insert(GANTRY_LEVEL, vec![rect(-x_size, -4 * s, x_size, 4 * s)]);
        geometry
    }

    pub fn printer_geometry_mk3s() -> PrinterGeometry {
        cartesian_geometry(250, 210)
    }

    pub fn printer_geometry_mk4() -> PrinterGeometry {
        cartesian_geometry(250, 210)
    }

    pub fn printer_geometry_xl() -> PrinterGeometry {
        cartesian_geometry(360, 360)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;

    fn rect(min_x: i64, min_y: i64, max_x: i64, max_y: i64) -> Polygon {
        Polygon::new(vec![
            Point::new(min_x, min_y),
            Point::new(max_x, min_y),
            Point::new(max_x, max_y),
            Point::new(min_x, max_y),
        ])
    }

    #[test]
    fn scale_round_trip_is_exact() {
        let polygon = rect(0, 0, 5_000_000, 4_000_000);
        let up = scale_up_polygon(&scale_down_polygon(&polygon));
        assert_eq!(up, polygon);
    }

    #[test]
    fn decimation_respects_tolerance() {
        // A square with one nearly-collinear extra vertex on an edge.
        let polygon = Polygon::new(vec![
            Point::new(0, 0),
            Point::new(5_000_000, 10_000),
            Point::new(10_000_000, 0),
            Point::new(10_000_000, 10_000_000),
            Point::new(0, 10_000_000),
        ]);
        let cfg = SolverConfiguration {
            decimation_precision: DecimationPrecision::High,
            ..Default::default()
        };
        let decimated = decimate_polygon_for_solver(&cfg, &polygon);
        assert_eq!(decimated.points.len(), 4);
        assert!(decimated.is_counter_clockwise());
    }

    #[test]
    fn size_check_against_bed() {
        let cfg = SolverConfiguration::default();
        assert!(check_polygon_size(&cfg, &rect(0, 0, 5_000_000, 5_000_000)));
        // 300 mm exceeds the 250 mm bed.
        assert!(!check_polygon_size(&cfg, &rect(0, 0, 30_000_000, 5_000_000)));
    }

    #[test]
    fn convex_zone_translates_with_object() {
        let object = rect(0, 0, 4_000_000, 4_000_000);
        let slice = rect(-100_000, -100_000, 100_000, 100_000);
        let zone = convex_unreachable_zone(&object, &slice);
        let shifted_zone = convex_unreachable_zone(&object.translated(700_000, -300_000), &slice);
        assert_eq!(zone.translated(700_000, -300_000), shifted_zone);
    }

    #[test]
    fn box_zone_spans_slice_and_object() {
        let object = rect(0, 0, 4_000_000, 4_000_000);
        let slice = rect(-25_000_000, -1_000_000, 25_000_000, 1_000_000);
        let zone = box_unreachable_zone(&object, &slice);
        assert_eq!(
            zone.bounding_box(),
            BoundingBox {
                min: Point::new(-25_000_000, -1_000_000),
                max: Point::new(29_000_000, 5_000_000),
            }
        );
    }

    #[test]
    fn prepare_object_rejects_unknown_height() {
        let cfg = SolverConfiguration::default();
        let geometry = presets::printer_geometry_mk3s();
        let object = ObjectToPrint {
            id: 7,
            glued_to_next: false,
            total_height: 20_000_000,
            pgns_at_height: vec![(123_456, rect(0, 0, 1_000_000, 1_000_000))],
        };
        match prepare_object(&cfg, &geometry, &object, true) {
            Err(SeqArrangeError::UnsupportedPolygonHeight { id, height }) => {
                assert_eq!(id, 7);
                assert_eq!(height, 123_456);
            }
            other => panic!("expected UnsupportedPolygonHeight, got {other:?}"),
        }
    }

    #[test]
    fn prepare_object_builds_zone_per_slice() {
        let cfg = SolverConfiguration::default();
        let geometry = presets::printer_geometry_mk3s();
        let footprint = rect(0, 0, 5_000_000, 5_000_000);
        let object = ObjectToPrint {
            id: 1,
            glued_to_next: false,
            total_height: 30_000_000,
            pgns_at_height: vec![
                (presets::NOZZLE_LEVEL, footprint.clone()),
                (presets::EXTRUDER_LEVEL, footprint.clone()),
                (presets::HOSE_LEVEL, footprint.clone()),
                (presets::GANTRY_LEVEL, footprint),
            ],
        };
        let prepared = prepare_object(&cfg, &geometry, &object, true).unwrap();
        assert_eq!(prepared.unreachable.len(), 4);
        assert_eq!(prepared.footprint.bounding_box().size_x(), 100);
    }
}
