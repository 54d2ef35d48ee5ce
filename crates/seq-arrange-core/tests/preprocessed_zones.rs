use seq_arrange_core::geometry::{Point, Polygon};
use seq_arrange_core::model::ObjectToPrint;
use seq_arrange_core::preprocess::{presets, SLICER_SCALE_FACTOR};
use seq_arrange_core::prelude::*;

fn mm(v: i64) -> i64 {
    v * SLICER_SCALE_FACTOR
}

fn rect(min_x: i64, min_y: i64, max_x: i64, max_y: i64) -> Polygon {
    Polygon::new(vec![
        Point::new(min_x, min_y),
        Point::new(max_x, min_y),
        Point::new(max_x, max_y),
        Point::new(min_x, max_y),
    ])
}

/// Callers carrying slice outlines positionally: the k-th height entry of an
/// object pairs with the k-th convex level, then with the box levels.
#[test]
fn positional_zone_tables_schedule_like_a_geometry() {
    let printer = presets::printer_geometry_mk3s();
    let cfg = SolverConfiguration::from_printer_geometry(&printer);

    let convex_zone_levels: Vec<Vec<Polygon>> = vec![
        printer.extruder_slices[&presets::NOZZLE_LEVEL].clone(),
        printer.extruder_slices[&presets::EXTRUDER_LEVEL].clone(),
    ];
    let box_zone_levels: Vec<Vec<Polygon>> = vec![
        printer.extruder_slices[&presets::HOSE_LEVEL].clone(),
        printer.extruder_slices[&presets::GANTRY_LEVEL].clone(),
    ];

    let outline = rect(0, 0, mm(50), mm(40));
    let objects: Vec<ObjectToPrint> = (0..2)
        .map(|i| ObjectToPrint {
            id: i,
            glued_to_next: false,
            total_height: mm(10),
            // Short object: entries for the two convex levels only.
            pgns_at_height: vec![
                (presets::NOZZLE_LEVEL, outline.clone()),
                (presets::EXTRUDER_LEVEL, outline.clone()),
            ],
        })
        .collect();

    let plates = schedule_objects_with_preprocessed_zones(
        &cfg,
        &objects,
        &convex_zone_levels,
        &box_zone_levels,
    )
    .unwrap();

    assert_eq!(plates.len(), 1);
    assert_eq!(plates[0].scheduled_objects.len(), 2);
    assert!(check_scheduled_objects_for_sequential_printability(
        &cfg, &printer, &objects, &plates
    ));
}
