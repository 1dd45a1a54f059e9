//! Scene construction and viewers
//!
//! The map is turned into a [`Scene`]: a quad mesh for the obstacle blocks,
//! start and goal markers, and axis limits taken from the boundary. A
//! [`Viewer`] draws the scene once and is then told about every accepted
//! robot move.

#[cfg(feature = "visualization")]
pub mod rerun_viewer;

#[cfg(feature = "visualization")]
pub use rerun_viewer::RerunViewer;

use crate::common::types::Position;
use crate::map::{Aabb, VoxelMap};
use nalgebra::{Point3, Vector3};

/// Face opacity used for obstacle blocks
pub const BLOCK_ALPHA: f64 = 0.25;

/// Marker size for the start and goal positions
pub const MARKER_SIZE: f64 = 7.0;

const RED: [f64; 3] = [1.0, 0.0, 0.0];
const GREEN: [f64; 3] = [0.0, 1.0, 0.0];
const BLACK: [f64; 3] = [0.0, 0.0, 0.0];

/// Unit cube corners
const CUBE_VERTICES: [[f64; 3]; 8] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [1.0, 1.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 0.0, 1.0],
    [1.0, 1.0, 1.0],
    [0.0, 1.0, 1.0],
];

/// Unit cube faces as quads over [`CUBE_VERTICES`]
const CUBE_FACES: [[usize; 4]; 6] = [
    [0, 1, 5, 4],
    [1, 2, 6, 5],
    [2, 3, 7, 6],
    [3, 0, 4, 7],
    [0, 1, 2, 3],
    [4, 5, 6, 7],
];

/// Errors raised by a viewer back end
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("viewer backend error: {0}")]
    Backend(String),
}

/// Quad mesh of every obstacle block
#[derive(Debug, Clone, PartialEq)]
pub struct BlockMesh {
    /// Eight vertices per block.
    pub vertices: Vec<Point3<f64>>,
    /// Six quads per block, indexing into `vertices`.
    pub faces: Vec<[usize; 4]>,
    /// One 0-1 RGB color per face.
    pub face_colors: Vec<[f64; 3]>,
    pub alpha: f64,
    pub edge_color: [f64; 3],
}

impl BlockMesh {
    /// Build the mesh for the blocks of a map
    pub fn from_map(map: &VoxelMap) -> Self {
        let n = map.blocks.len();
        let mut vertices = Vec::with_capacity(8 * n);
        let mut faces = Vec::with_capacity(6 * n);
        let mut face_colors = Vec::with_capacity(6 * n);

        for (k, block) in map.blocks.iter().enumerate() {
            let extent = block.bounds.extent();
            let origin = block.bounds.min;
            for corner in CUBE_VERTICES.iter() {
                let unit = Vector3::from(*corner);
                vertices.push(origin + unit.component_mul(&extent));
            }

            let color = block.normalized_color();
            for face in CUBE_FACES.iter() {
                faces.push(face.map(|v| v + 8 * k));
                face_colors.push(color);
            }
        }

        BlockMesh {
            vertices,
            faces,
            face_colors,
            alpha: BLOCK_ALPHA,
            edge_color: BLACK,
        }
    }

    /// Corner positions of one face
    pub fn face_vertices(&self, face: usize) -> [Point3<f64>; 4] {
        self.faces[face].map(|v| self.vertices[v])
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

/// A point marker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub position: Position,
    pub color: [f64; 3],
    pub edge_color: [f64; 3],
    pub size: f64,
}

impl Marker {
    fn new(position: Position, color: [f64; 3]) -> Self {
        Marker {
            position,
            color,
            edge_color: BLACK,
            size: MARKER_SIZE,
        }
    }
}

/// Everything needed to draw a map with its start and goal
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub blocks: BlockMesh,
    pub start: Marker,
    pub goal: Marker,
    /// Axis limits, taken from the boundary.
    pub limits: Aabb,
    pub boundary_color: [f64; 3],
    pub axis_labels: [&'static str; 3],
}

impl Scene {
    pub fn new(map: &VoxelMap, start: &Position, goal: &Position) -> Self {
        Scene {
            blocks: BlockMesh::from_map(map),
            start: Marker::new(*start, RED),
            goal: Marker::new(*goal, GREEN),
            limits: *map.bounds(),
            boundary_color: map.boundary.normalized_color(),
            axis_labels: ["X", "Y", "Z"],
        }
    }
}

/// Trait for drawing back ends
pub trait Viewer {
    /// Draw the static scene
    fn draw_scene(&mut self, scene: &Scene) -> Result<(), ViewerError>;

    /// Move the robot marker to a new position
    fn update_robot(&mut self, position: &Position) -> Result<(), ViewerError>;

    /// Get the name of this viewer
    fn name(&self) -> &str;
}

/// Viewer that draws nothing
#[derive(Debug, Default)]
pub struct NullViewer;

impl Viewer for NullViewer {
    fn draw_scene(&mut self, _scene: &Scene) -> Result<(), ViewerError> {
        Ok(())
    }

    fn update_robot(&mut self, _position: &Position) -> Result<(), ViewerError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "NullViewer"
    }
}

/// Viewer that keeps the scene and every robot update in memory
#[derive(Debug, Default)]
pub struct TrajectoryRecorder {
    scene: Option<Scene>,
    positions: Vec<Position>,
}

impl TrajectoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    /// Robot positions in the order they were drawn
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }
}

impl Viewer for TrajectoryRecorder {
    fn draw_scene(&mut self, scene: &Scene) -> Result<(), ViewerError> {
        self.scene = Some(scene.clone());
        self.positions.clear();
        Ok(())
    }

    fn update_robot(&mut self, position: &Position) -> Result<(), ViewerError> {
        self.positions.push(*position);
        Ok(())
    }

    fn name(&self) -> &str {
        "TrajectoryRecorder"
    }
}
