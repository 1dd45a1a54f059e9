//! Voxel map for navigation
//!
//! A map is an outer boundary box plus a list of axis-aligned obstacle
//! blocks, each with a display color. Maps are read once from a text file
//! and then queried for occupancy by the planners and the move validator.

mod parser;

pub use parser::parse_map;

use crate::common::types::{Position, Rgb};
use nalgebra::{Point3, Vector3};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// Sample spacing used when a segment check is given an unusable resolution
pub const DEFAULT_SEGMENT_RESOLUTION: f64 = 0.05;

/// Errors raised while loading a map
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// The map file could not be read.
    #[error("failed to read map file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be parsed.
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    /// A record has a minimum corner above its maximum corner.
    #[error("line {line}: box minimum {min:?} exceeds maximum {max:?}")]
    InvertedBox {
        line: usize,
        min: [f64; 3],
        max: [f64; 3],
    },

    /// No boundary record was found.
    #[error("map has no boundary record")]
    MissingBoundary,
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    /// Create a box from its minimum and maximum corners
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Aabb { min, max }
    }

    /// Inclusive containment: points on the faces are inside
    pub fn contains(&self, p: &Position) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Strict containment: points on the faces are outside
    pub fn contains_strictly(&self, p: &Position) -> bool {
        p.x > self.min.x
            && p.x < self.max.x
            && p.y > self.min.y
            && p.y < self.max.y
            && p.z > self.min.z
            && p.z < self.max.z
    }

    /// Edge lengths along each axis
    pub fn extent(&self) -> Vector3<f64> {
        self.max - self.min
    }

    pub fn center(&self) -> Point3<f64> {
        Point3::from((self.min.coords + self.max.coords) * 0.5)
    }
}

/// An axis-aligned box with a display color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    pub bounds: Aabb,
    pub color: Rgb,
}

impl Block {
    pub fn new(bounds: Aabb, color: Rgb) -> Self {
        Block { bounds, color }
    }

    /// Color channels scaled to 0-1
    pub fn normalized_color(&self) -> [f64; 3] {
        [
            self.color[0] / 255.0,
            self.color[1] / 255.0,
            self.color[2] / 255.0,
        ]
    }
}

/// Boundary plus obstacle blocks
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelMap {
    pub boundary: Block,
    pub blocks: Vec<Block>,
}

impl VoxelMap {
    /// Create a map from an already-built boundary and block list
    pub fn new(boundary: Block, blocks: Vec<Block>) -> Self {
        VoxelMap { boundary, blocks }
    }

    /// Load a map from a whitespace-delimited text file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MapError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let map = parse_map(&text)?;
        debug!(
            path = %path.display(),
            blocks = map.blocks.len(),
            "Loaded map"
        );
        Ok(map)
    }

    /// The boundary box
    pub fn bounds(&self) -> &Aabb {
        &self.boundary.bounds
    }

    /// Check if a point lies inside the boundary, faces included
    pub fn in_bounds(&self, p: &Position) -> bool {
        self.boundary.bounds.contains(p)
    }

    /// Index of the first block whose interior contains the point
    pub fn colliding_block(&self, p: &Position) -> Option<usize> {
        self.blocks
            .iter()
            .position(|block| block.bounds.contains_strictly(p))
    }

    /// Check if a point is inside the boundary and outside every block
    pub fn is_free(&self, p: &Position) -> bool {
        self.in_bounds(p) && self.colliding_block(p).is_none()
    }

    /// Check if a straight segment is free, sampled at most `resolution` apart
    ///
    /// A resolution that is not a positive finite number falls back to
    /// [`DEFAULT_SEGMENT_RESOLUTION`].
    pub fn segment_is_free(&self, a: &Position, b: &Position, resolution: f64) -> bool {
        let resolution = if resolution.is_finite() && resolution > 0.0 {
            resolution
        } else {
            warn!(resolution, "Unusable segment resolution, using the default");
            DEFAULT_SEGMENT_RESOLUTION
        };
        let delta = b - a;
        let steps = (delta.norm() / resolution).ceil() as usize;

        for i in 0..=steps {
            let t = if steps > 0 { i as f64 / steps as f64 } else { 0.0 };
            if !self.is_free(&(a + delta * t)) {
                return false;
            }
        }

        // The loop above only reaches `b` exactly when steps > 0
        steps > 0 || self.is_free(b)
    }
}

impl FromStr for VoxelMap {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_map(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_cube() -> VoxelMap {
        let boundary = Block::new(
            Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 10.0, 10.0)),
            [120.0, 120.0, 120.0],
        );
        let cube = Block::new(
            Aabb::new(Point3::new(4.0, 4.0, 4.0), Point3::new(6.0, 6.0, 6.0)),
            [255.0, 0.0, 0.0],
        );
        VoxelMap::new(boundary, vec![cube])
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let map = single_cube();
        assert!(map.in_bounds(&Point3::new(0.0, 0.0, 0.0)));
        assert!(map.in_bounds(&Point3::new(10.0, 10.0, 10.0)));
        assert!(!map.in_bounds(&Point3::new(10.001, 5.0, 5.0)));
        assert!(!map.in_bounds(&Point3::new(5.0, -0.1, 5.0)));
    }

    #[test]
    fn test_block_collision_is_strict() {
        let map = single_cube();
        assert_eq!(map.colliding_block(&Point3::new(5.0, 5.0, 5.0)), Some(0));
        // Touching a face is allowed
        assert_eq!(map.colliding_block(&Point3::new(4.0, 5.0, 5.0)), None);
        assert_eq!(map.colliding_block(&Point3::new(6.0, 6.0, 6.0)), None);
        assert!(map.is_free(&Point3::new(4.0, 5.0, 5.0)));
        assert!(!map.is_free(&Point3::new(4.5, 4.5, 4.5)));
    }

    #[test]
    fn test_segment_through_block_is_blocked() {
        let map = single_cube();
        let a = Point3::new(3.0, 5.0, 5.0);
        let b = Point3::new(7.0, 5.0, 5.0);
        assert!(!map.segment_is_free(&a, &b, 0.1));

        let c = Point3::new(3.0, 3.0, 3.0);
        let d = Point3::new(3.0, 9.0, 3.0);
        assert!(map.segment_is_free(&c, &d, 0.1));
    }

    #[test]
    fn test_unusable_resolution_still_samples_interior() {
        let map = single_cube();
        // Both endpoints are free, only the middle crosses the block
        let a = Point3::new(3.0, 5.0, 5.0);
        let b = Point3::new(7.0, 5.0, 5.0);
        for resolution in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(!map.segment_is_free(&a, &b, resolution), "{resolution}");
        }
    }

    #[test]
    fn test_degenerate_segment_checks_endpoint() {
        let map = single_cube();
        let p = Point3::new(5.0, 5.0, 5.0);
        assert!(!map.segment_is_free(&p, &p, 0.1));
        let q = Point3::new(1.0, 1.0, 1.0);
        assert!(map.segment_is_free(&q, &q, 0.1));
    }

    #[test]
    fn test_normalized_color() {
        let map = single_cube();
        assert_eq!(map.blocks[0].normalized_color(), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_aabb_center_and_extent() {
        let map = single_cube();
        let block = map.blocks[0].bounds;
        assert_eq!(block.center(), Point3::new(5.0, 5.0, 5.0));
        assert_eq!(block.extent(), Vector3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn test_load_missing_file() {
        let err = VoxelMap::load("does/not/exist.txt").unwrap_err();
        assert!(matches!(err, MapError::Io { .. }));
        assert!(err.to_string().contains("exist.txt"));
    }
}
