//! Interactive 3-D viewer backed by Rerun
//!
//! Enable with the `visualization` feature flag.

use super::{Scene, Viewer, ViewerError};
use crate::common::types::Position;
use rerun::{RecordingStream, RecordingStreamBuilder};

fn to_f32(p: &Position) -> [f32; 3] {
    [p.x as f32, p.y as f32, p.z as f32]
}

fn to_rgba(color: [f64; 3], alpha: f64) -> [u8; 4] {
    [
        (color[0] * 255.0).round() as u8,
        (color[1] * 255.0).round() as u8,
        (color[2] * 255.0).round() as u8,
        (alpha * 255.0).round() as u8,
    ]
}

fn backend<E: std::fmt::Display>(err: E) -> ViewerError {
    ViewerError::Backend(err.to_string())
}

/// Rerun-based viewer for harness runs
pub struct RerunViewer {
    rec: RecordingStream,
    trail: Vec<[f32; 3]>,
    step: i64,
}

impl RerunViewer {
    /// Create a viewer that spawns the Rerun window
    pub fn spawn(app_id: &str) -> Result<Self, ViewerError> {
        let rec = RecordingStreamBuilder::new(app_id).spawn().map_err(backend)?;
        Self::from_stream(rec)
    }

    /// Create a viewer that writes a `.rrd` recording to a file
    pub fn save(app_id: &str, path: &str) -> Result<Self, ViewerError> {
        let rec = RecordingStreamBuilder::new(app_id).save(path).map_err(backend)?;
        Self::from_stream(rec)
    }

    fn from_stream(rec: RecordingStream) -> Result<Self, ViewerError> {
        rec.log_static("world", &rerun::ViewCoordinates::RIGHT_HAND_Z_UP())
            .map_err(backend)?;
        Ok(RerunViewer {
            rec,
            trail: Vec::new(),
            step: 0,
        })
    }
}

impl Viewer for RerunViewer {
    fn draw_scene(&mut self, scene: &Scene) -> Result<(), ViewerError> {
        let limits = &scene.limits;
        let extent = limits.extent();
        self.rec
            .log_static(
                "world/boundary",
                &rerun::Boxes3D::from_mins_and_sizes(
                    [to_f32(&limits.min)],
                    [[extent.x as f32, extent.y as f32, extent.z as f32]],
                )
                .with_colors([to_rgba(scene.boundary_color, 1.0)]),
            )
            .map_err(backend)?;

        if !scene.blocks.is_empty() {
            // Each block owns eight consecutive vertices and six consecutive faces
            let count = scene.blocks.vertices.len() / 8;
            let mut mins = Vec::with_capacity(count);
            let mut sizes = Vec::with_capacity(count);
            let mut colors = Vec::with_capacity(count);
            for k in 0..count {
                let min = scene.blocks.vertices[8 * k];
                let max = scene.blocks.vertices[8 * k + 6];
                mins.push(to_f32(&min));
                sizes.push(to_f32(&Position::from(max - min)));
                colors.push(to_rgba(scene.blocks.face_colors[6 * k], scene.blocks.alpha));
            }
            self.rec
                .log_static(
                    "world/blocks",
                    &rerun::Boxes3D::from_mins_and_sizes(mins, sizes).with_colors(colors),
                )
                .map_err(backend)?;
        }

        for (path, marker) in [("world/start", &scene.start), ("world/goal", &scene.goal)] {
            self.rec
                .log_static(
                    path,
                    &rerun::Points3D::new([to_f32(&marker.position)])
                        .with_colors([to_rgba(marker.color, 1.0)])
                        .with_radii([0.15]),
                )
                .map_err(backend)?;
        }

        self.trail.clear();
        self.trail.push(to_f32(&scene.start.position));
        self.step = 0;
        Ok(())
    }

    fn update_robot(&mut self, position: &Position) -> Result<(), ViewerError> {
        self.step += 1;
        self.rec.set_time_sequence("step", self.step);
        self.trail.push(to_f32(position));

        self.rec
            .log(
                "world/robot",
                &rerun::Points3D::new([to_f32(position)])
                    .with_colors([[255, 0, 0, 255]])
                    .with_radii([0.15]),
            )
            .map_err(backend)?;
        self.rec
            .log(
                "world/trail",
                &rerun::LineStrips3D::new([self.trail.clone()]).with_colors([[255, 200, 0, 255]]),
            )
            .map_err(backend)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "RerunViewer"
    }
}
