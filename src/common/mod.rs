//! Common utilities and types for the voxel navigation harness

/// Common types used across the codebase
pub mod types {
    use nalgebra::Point3;

    /// A robot position in world coordinates
    pub type Position = Point3<f64>;

    /// A display color with channels in the 0-255 range used by map files
    pub type Rgb = [f64; 3];

    /// Build a position from a `[x, y, z]` triple
    pub fn position(xyz: [f64; 3]) -> Position {
        Point3::new(xyz[0], xyz[1], xyz[2])
    }
}
