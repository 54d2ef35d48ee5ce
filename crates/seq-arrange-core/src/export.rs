//! Reference tool I/O: the line-oriented exported-objects format, the JSON
//! printer-geometry file and the arrangement writer. The engine itself never
//! touches the filesystem; these helpers exist for the CLI and for tests.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, SeqArrangeError};
use crate::geometry::{Point, Polygon};
use crate::model::{ObjectToPrint, PrinterGeometry, ScheduledPlate};

fn parse_value<T: std::str::FromStr>(line: &str, key: &str) -> Result<T> {
    line.strip_prefix(key)
        .map(str::trim)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| SeqArrangeError::Parse(format!("malformed record: {line}")))
}

/// Reads the line-oriented object export: `OBJECT_ID n` opens a new object,
/// followed by `TOTAL_HEIGHT`, optional `GLUED_TO_NEXT`, and repeated
/// `POLYGON_AT_HEIGHT h` blocks carrying `POINT x y` lines.
pub fn load_exported_objects(path: &Path) -> Result<Vec<ObjectToPrint>> {
    let reader = BufReader::new(File::open(path)?);
    let mut objects: Vec<ObjectToPrint> = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("OBJECT_ID") {
            objects.push(ObjectToPrint {
                id: parse_value(line, "OBJECT_ID")?,
                ..Default::default()
            });
            continue;
        }
        let Some(object) = objects.last_mut() else {
            return Err(SeqArrangeError::Parse(format!(
                "record before any OBJECT_ID: {line}"
            )));
        };
        if line.starts_with("TOTAL_HEIGHT") {
            object.total_height = parse_value(line, "TOTAL_HEIGHT")?;
        } else if line.starts_with("GLUED_TO_NEXT") {
            let flag: i32 = parse_value(line, "GLUED_TO_NEXT")?;
            object.glued_to_next = flag != 0;
        } else if line.starts_with("POLYGON_AT_HEIGHT") {
            let height = parse_value(line, "POLYGON_AT_HEIGHT")?;
            object.pgns_at_height.push((height, Polygon::default()));
        } else if line.starts_with("POINT") {
            let rest = line.strip_prefix("POINT").unwrap_or_default();
            let mut parts = rest.split_whitespace();
            let x: i64 = parts
                .next()
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| SeqArrangeError::Parse(format!("malformed point: {line}")))?;
            let y: i64 = parts
                .next()
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| SeqArrangeError::Parse(format!("malformed point: {line}")))?;
            let Some((_, polygon)) = object.pgns_at_height.last_mut() else {
                return Err(SeqArrangeError::Parse(format!(
                    "POINT before any POLYGON_AT_HEIGHT: {line}"
                )));
            };
            polygon.points.push(Point::new(x, y));
        }
    }
    Ok(objects)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SliceShape {
    Convex,
    Box,
}

#[derive(Debug, Deserialize)]
struct SliceRecord {
    height: i64,
    #[serde(rename = "type")]
    shape: SliceShape,
    polygons: Vec<Vec<[i64; 2]>>,
}

#[derive(Debug, Deserialize)]
struct PrinterGeometryFile {
    x_size: i64,
    y_size: i64,
    slices: Vec<SliceRecord>,
}

/// Reads a printer geometry description from JSON: bed extents plus one
/// record per extruder slice with its height, shape class and outlines.
pub fn load_printer_geometry(path: &Path) -> Result<PrinterGeometry> {
    let reader = BufReader::new(File::open(path)?);
    let file: PrinterGeometryFile = serde_json::from_reader(reader)
        .map_err(|e| SeqArrangeError::Parse(format!("printer geometry: {e}")))?;

    let mut geometry = PrinterGeometry {
        x_size: file.x_size,
        y_size: file.y_size,
        ..Default::default()
    };
    for slice in file.slices {
        match slice.shape {
            SliceShape::Convex => geometry.convex_heights.insert(slice.height),
            SliceShape::Box => geometry.box_heights.insert(slice.height),
        };
        let polygons = slice
            .polygons
            .into_iter()
            .map(|points| {
                Polygon::new(points.into_iter().map(|[x, y]| Point::new(x, y)).collect())
            })
            .collect();
        geometry.extruder_slices.insert(slice.height, polygons);
    }
    Ok(geometry)
}

/// Writes one plate as `id x y` lines, in print order.
pub fn save_arrangement(path: &Path, plate: &ScheduledPlate) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for object in &plate.scheduled_objects {
        writeln!(writer, "{} {} {}", object.id, object.x, object.y)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exported_objects() {
        let dir = std::env::temp_dir().join("seq-arrange-export-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("objects.txt");
        std::fs::write(
            &path,
            "OBJECT_ID 42\nTOTAL_HEIGHT 20000000\nGLUED_TO_NEXT 1\n\
             POLYGON_AT_HEIGHT 0\nPOINT 0 0\nPOINT 5000000 0\nPOINT 5000000 5000000\n\
             OBJECT_ID 43\nTOTAL_HEIGHT 1000000\nPOLYGON_AT_HEIGHT 0\nPOINT 1 2\n",
        )
        .unwrap();

        let objects = load_exported_objects(&path).unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].id, 42);
        assert!(objects[0].glued_to_next);
        assert_eq!(objects[0].pgns_at_height[0].1.points.len(), 3);
        assert_eq!(objects[1].id, 43);
        assert!(!objects[1].glued_to_next);
        assert_eq!(objects[1].pgns_at_height[0].1.points[0], Point::new(1, 2));
    }

    #[test]
    fn parses_printer_geometry_json() {
        let dir = std::env::temp_dir().join("seq-arrange-geometry-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("printer.json");
        std::fs::write(
            &path,
            r#"{
                "x_size": 25000000,
                "y_size": 21000000,
                "slices": [
                    { "height": 0, "type": "convex",
                      "polygons": [[[-100000, -100000], [100000, -100000], [100000, 100000], [-100000, 100000]]] },
                    { "height": 26000000, "type": "box",
                      "polygons": [[[-25000000, -4000000], [25000000, -4000000], [25000000, 4000000], [-25000000, 4000000]]] }
                ]
            }"#,
        )
        .unwrap();

        let geometry = load_printer_geometry(&path).unwrap();
        assert_eq!(geometry.x_size, 25_000_000);
        assert!(geometry.convex_heights.contains(&0));
        assert!(geometry.box_heights.contains(&26_000_000));
        assert_eq!(geometry.extruder_slices[&0].len(), 1);
    }
}
