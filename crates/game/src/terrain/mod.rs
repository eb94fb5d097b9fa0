mod heightfield;

use glam::Vec3;

pub use heightfield::HeightField;

#[derive(Debug, thiserror::Error)]
pub enum TerrainError {
    #[error("height field needs at least 2x2 samples, got {width}x{depth}")]
    Dimensions { width: usize, depth: usize },
    #[error("expected {expected} height samples, got {actual}")]
    SampleCount { expected: usize, actual: usize },
    #[error("cell size must be positive and finite, got {0}")]
    CellSize(f32),
    #[error("failed to load heightmap: {0}")]
    Image(#[from] image::ImageError),
}

/// Ground under a world (x, z) position.
///
/// A zero normal means there is no ground there; the height is then
/// meaningless and must not be snapped to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightSample {
    pub height: f32,
    pub normal: Vec3,
}

impl HeightSample {
    pub const NONE: Self = Self {
        height: 0.0,
        normal: Vec3::ZERO,
    };

    pub fn has_ground(&self) -> bool {
        self.normal != Vec3::ZERO
    }

    pub fn ground_height(&self) -> Option<f32> {
        self.has_ground().then_some(self.height)
    }
}

pub trait TerrainQuery {
    fn get_height_and_normal(&self, x: f32, z: f32) -> HeightSample;
}

impl<T: TerrainQuery + ?Sized> TerrainQuery for &T {
    fn get_height_and_normal(&self, x: f32, z: f32) -> HeightSample {
        (**self).get_height_and_normal(x, z)
    }
}
