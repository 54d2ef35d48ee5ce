use std::cmp::Ordering;

use tracing::{info, instrument};

use crate::config::SolverConfiguration;
use crate::error::{Result, SeqArrangeError};
use crate::geometry::Polygon;
use crate::model::{ObjectToPrint, PrinterGeometry, ScheduledObject, ScheduledPlate};
use crate::preprocess::{
    prepare_object, prepare_object_with_zone_tables, scale_up_position, PreparedObject,
};
use crate::rational::Rational;
use crate::solver::scheduler::optimize_subglobal_sequential_polygon_nonoverlapping;

/// Upper end of the progress range reported to callers.
pub const PROGRESS_RANGE: i32 = 1 << 30;

/// All-in-one entry point: preprocess the objects against the printer
/// geometry, then fill plates until every object is scheduled.
pub fn schedule_objects_for_sequential_print(
    solver_configuration: &SolverConfiguration,
    printer_geometry: &PrinterGeometry,
    objects_to_print: &[ObjectToPrint],
) -> Result<Vec<ScheduledPlate>> {
    schedule_objects_for_sequential_print_with_progress(
        solver_configuration,
        printer_geometry,
        objects_to_print,
        |_| {},
    )
}

/// Like [`schedule_objects_for_sequential_print`], reporting progress in
/// `[0, PROGRESS_RANGE]` roughly proportional to the share of objects
/// decided so far.
#[instrument(skip_all)]
pub fn schedule_objects_for_sequential_print_with_progress(
    solver_configuration: &SolverConfiguration,
    printer_geometry: &PrinterGeometry,
    objects_to_print: &[ObjectToPrint],
    progress: impl FnMut(i32),
) -> Result<Vec<ScheduledPlate>> {
    solver_configuration.validate()?;
    let mut prepared = Vec::with_capacity(objects_to_print.len());
    for object in objects_to_print {
        prepared.push(prepare_object(
            solver_configuration,
            printer_geometry,
            object,
            true,
        )?);
    }
    schedule_prepared(solver_configuration, prepared, progress)
}

/// Entry point for callers that already carry the extruder slice outlines as
/// positional level tables instead of a full printer geometry.
pub fn schedule_objects_with_preprocessed_zones(
    solver_configuration: &SolverConfiguration,
    objects_to_print: &[ObjectToPrint],
    convex_zone_levels: &[Vec<Polygon>],
    box_zone_levels: &[Vec<Polygon>],
) -> Result<Vec<ScheduledPlate>> {
    solver_configuration.validate()?;
    let mut prepared = Vec::with_capacity(objects_to_print.len());
    for object in objects_to_print {
        prepared.push(prepare_object_with_zone_tables(
            solver_configuration,
            object,
            convex_zone_levels,
            box_zone_levels,
            true,
        )?);
    }
    schedule_prepared(solver_configuration, prepared, |_| {})
}

fn schedule_prepared(
    solver_configuration: &SolverConfiguration,
    prepared: Vec<PreparedObject>,
    mut progress: impl FnMut(i32),
) -> Result<Vec<ScheduledPlate>> {
    let total = prepared.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let mut scheduled_plates: Vec<ScheduledPlate> = Vec::new();
    let mut working = prepared;
    let mut objects_done = 0usize;

    loop {
        let count = working.len();
        let polygons: Vec<Polygon> = working.iter().map(|p| p.footprint.clone()).collect();
        let unreachable: Vec<Vec<Polygon>> =
            working.iter().map(|p| p.unreachable.clone()).collect();
        let mut lepox_to_next: Vec<bool> = working.iter().map(|p| p.glued_to_next).collect();
        // The last object of the working set has no successor to glue to.
        if let Some(last) = lepox_to_next.last_mut() {
            *last = false;
        }
        let undecided: Vec<usize> = (0..count).collect();

        let mut values_x: Vec<Rational> = Vec::new();
        let mut values_y: Vec<Rational> = Vec::new();
        let mut values_t: Vec<Rational> = Vec::new();
        let mut decided: Vec<usize> = Vec::new();
        let mut remaining: Vec<usize> = Vec::new();

        let optimized = optimize_subglobal_sequential_polygon_nonoverlapping(
            solver_configuration,
            &mut values_x,
            &mut values_y,
            &mut values_t,
            &polygons,
            &unreachable,
            &lepox_to_next,
            &undecided,
            &mut decided,
            &mut remaining,
            |placed| {
                objects_done += placed;
                progress(((objects_done as i64 * PROGRESS_RANGE as i64) / total as i64) as i32);
            },
        );
        if !optimized {
            return Err(SeqArrangeError::SchedulingFailure);
        }

        let mut print_order = decided.clone();
        print_order.sort_by(|&a, &b| {
            values_t[a]
                .as_f64()
                .partial_cmp(&values_t[b].as_f64())
                .unwrap_or(Ordering::Equal)
        });

        let mut plate = ScheduledPlate::default();
        for index in print_order {
            let (x, y) = scale_up_position(&values_x[index], &values_y[index]);
            plate
                .scheduled_objects
                .push(ScheduledObject::new(working[index].id, x, y));
        }
        info!(
            plate = scheduled_plates.len(),
            objects = plate.scheduled_objects.len(),
            remaining = remaining.len(),
            "plate scheduled"
        );
        scheduled_plates.push(plate);

        if remaining.is_empty() {
            break;
        }
        let next_working: Vec<PreparedObject> =
            remaining.iter().map(|&i| working[i].clone()).collect();
        working = next_working;
    }

    progress(PROGRESS_RANGE);
    Ok(scheduled_plates)
}
