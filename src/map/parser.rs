//! Map file parser
//!
//! One record per line: `type xmin ymin zmin xmax ymax zmax r g b`.
//! `#` starts a comment that runs to the end of the line. The first `boundary` record defines the
//! navigable volume, every `block` record is an obstacle.

use super::{Aabb, Block, MapError, VoxelMap};
use nalgebra::Point3;
use tracing::warn;

const COLUMNS: usize = 10;

enum RecordKind {
    Boundary,
    Block,
}

/// Parse the text of a map file
pub fn parse_map(text: &str) -> Result<VoxelMap, MapError> {
    let mut boundary: Option<Block> = None;
    let mut blocks = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let content = raw.split_once('#').map_or(raw, |(data, _)| data);
        let trimmed = content.trim();
        if trimmed.is_empty() {
            continue;
        }

        let (kind, block) = parse_record(trimmed, line)?;
        match kind {
            RecordKind::Block => blocks.push(block),
            RecordKind::Boundary => {
                if boundary.is_some() {
                    warn!(line, "Ignoring extra boundary record");
                } else {
                    boundary = Some(block);
                }
            }
        }
    }

    let boundary = boundary.ok_or(MapError::MissingBoundary)?;
    Ok(VoxelMap::new(boundary, blocks))
}

fn parse_record(record: &str, line: usize) -> Result<(RecordKind, Block), MapError> {
    let fields: Vec<&str> = record.split_whitespace().collect();
    if fields.len() != COLUMNS {
        return Err(MapError::Parse {
            line,
            message: format!("expected {} columns, found {}", COLUMNS, fields.len()),
        });
    }

    let kind = match fields[0] {
        "boundary" => RecordKind::Boundary,
        "block" => RecordKind::Block,
        other => {
            return Err(MapError::Parse {
                line,
                message: format!("unknown record type '{}'", other),
            })
        }
    };

    let mut values = [0.0_f64; COLUMNS - 1];
    for (slot, field) in values.iter_mut().zip(&fields[1..]) {
        let value = field.parse::<f64>().map_err(|_| MapError::Parse {
            line,
            message: format!("invalid number '{}'", field),
        })?;
        // `inf` and `nan` parse as f64 but describe no box
        if !value.is_finite() {
            return Err(MapError::Parse {
                line,
                message: format!("non-finite number '{}'", field),
            });
        }
        *slot = value;
    }

    let min = [values[0], values[1], values[2]];
    let max = [values[3], values[4], values[5]];
    if min.iter().zip(&max).any(|(lo, hi)| lo > hi) {
        return Err(MapError::InvertedBox { line, min, max });
    }

    let bounds = Aabb::new(Point3::from(min), Point3::from(max));
    let color = [values[6], values[7], values[8]];
    Ok((kind, Block::new(bounds, color)))
}
