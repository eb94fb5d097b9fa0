use std::path::Path;

use glam::{Vec2, Vec3};

use super::{HeightSample, TerrainError, TerrainQuery};

/// Regular grid of sampled elevations. Vertex `(ix, iz)` sits at world
/// `(ix * cell_size, iz * cell_size)`; each cell is split into two triangles
/// along its `(1,0)-(0,1)` diagonal.
#[derive(Debug, Clone)]
pub struct HeightField {
    width: usize,
    depth: usize,
    cell_size: f32,
    heights: Vec<f32>,
}

impl HeightField {
    pub fn from_heights(
        width: usize,
        depth: usize,
        cell_size: f32,
        heights: Vec<f32>,
    ) -> Result<Self, TerrainError> {
        if width < 2 || depth < 2 {
            return Err(TerrainError::Dimensions { width, depth });
        }
        if heights.len() != width * depth {
            return Err(TerrainError::SampleCount {
                expected: width * depth,
                actual: heights.len(),
            });
        }
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(TerrainError::CellSize(cell_size));
        }

        Ok(Self {
            width,
            depth,
            cell_size,
            heights,
        })
    }

    pub fn flat(width: usize, depth: usize, cell_size: f32, height: f32) -> Result<Self, TerrainError> {
        Self::from_heights(width, depth, cell_size, vec![height; width * depth])
    }

    /// Deterministic procedural terrain used when no heightmap is supplied.
    pub fn rolling_hills(
        width: usize,
        depth: usize,
        cell_size: f32,
        amplitude: f32,
    ) -> Result<Self, TerrainError> {
        let mut heights = Vec::with_capacity(width * depth);
        for iz in 0..depth {
            for ix in 0..width {
                let x = ix as f32 * 0.11;
                let z = iz as f32 * 0.07;
                let h = (x.sin() * z.cos() + 0.5 * (0.5 * x + 0.8 * z).sin() + 1.5) / 3.0;
                heights.push(amplitude * h);
            }
        }
        Self::from_heights(width, depth, cell_size, heights)
    }

    /// Loads a grayscale heightmap: `height = max_height * luma / 255`.
    pub fn from_image(
        path: impl AsRef<Path>,
        cell_size: f32,
        max_height: f32,
    ) -> Result<Self, TerrainError> {
        let image = image::open(path.as_ref())?.to_luma8();
        let (width, depth) = (image.width() as usize, image.height() as usize);

        let heights = image
            .pixels()
            .map(|p| max_height * p.0[0] as f32 / 255.0)
            .collect();

        log::info!(
            "loaded heightmap {} ({}x{})",
            path.as_ref().display(),
            width,
            depth
        );

        Self::from_heights(width, depth, cell_size, heights)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// World-space extent along x and z.
    pub fn extent(&self) -> Vec2 {
        Vec2::new(
            (self.width - 1) as f32 * self.cell_size,
            (self.depth - 1) as f32 * self.cell_size,
        )
    }

    pub fn center(&self) -> Vec2 {
        self.extent() * 0.5
    }

    fn sample(&self, ix: usize, iz: usize) -> f32 {
        self.heights[iz * self.width + ix]
    }

    pub fn query(&self, x: f32, z: f32) -> HeightSample {
        let gx = x / self.cell_size;
        let gz = z / self.cell_size;

        let max_x = (self.width - 1) as f32;
        let max_z = (self.depth - 1) as f32;
        if !(gx >= 0.0 && gz >= 0.0 && gx <= max_x && gz <= max_z) {
            return HeightSample::NONE;
        }

        // the far edge belongs to the last cell
        let cx = (gx.floor() as usize).min(self.width - 2);
        let cz = (gz.floor() as usize).min(self.depth - 2);
        let x_frac = gx - cx as f32;
        let z_frac = gz - cz as f32;

        let h00 = self.sample(cx, cz);
        let h10 = self.sample(cx + 1, cz);
        let h01 = self.sample(cx, cz + 1);
        let h11 = self.sample(cx + 1, cz + 1);

        let local = Vec2::new(x_frac, z_frac);
        let (p1, p2, p3) = if x_frac <= 1.0 - z_frac {
            (
                Vec3::new(0.0, h00, 0.0),
                Vec3::new(1.0, h10, 0.0),
                Vec3::new(0.0, h01, 1.0),
            )
        } else {
            (
                Vec3::new(1.0, h10, 0.0),
                Vec3::new(1.0, h11, 1.0),
                Vec3::new(0.0, h01, 1.0),
            )
        };

        let height = barycentric(p1, p2, p3, local);

        let scale = Vec3::new(self.cell_size, 1.0, self.cell_size);
        let edge_a = (p2 - p1) * scale;
        let edge_b = (p3 - p1) * scale;
        let mut normal = edge_a.cross(edge_b).normalize_or_zero();
        if normal.y < 0.0 {
            normal = -normal;
        }

        HeightSample { height, normal }
    }
}

impl TerrainQuery for HeightField {
    fn get_height_and_normal(&self, x: f32, z: f32) -> HeightSample {
        self.query(x, z)
    }
}

/// Height at `pos` (x, z) inside the triangle `p1 p2 p3`.
fn barycentric(p1: Vec3, p2: Vec3, p3: Vec3, pos: Vec2) -> f32 {
    let det = (p2.z - p3.z) * (p1.x - p3.x) + (p3.x - p2.x) * (p1.z - p3.z);
    let l1 = ((p2.z - p3.z) * (pos.x - p3.x) + (p3.x - p2.x) * (pos.y - p3.z)) / det;
    let l2 = ((p3.z - p1.z) * (pos.x - p3.x) + (p1.x - p3.x) * (pos.y - p3.z)) / det;
    let l3 = 1.0 - l1 - l2;
    l1 * p1.y + l2 * p2.y + l3 * p3.y
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn grid(width: usize, depth: usize, cell_size: f32, f: impl Fn(usize, usize) -> f32) -> HeightField {
        let mut heights = Vec::new();
        for iz in 0..depth {
            for ix in 0..width {
                heights.push(f(ix, iz));
            }
        }
        HeightField::from_heights(width, depth, cell_size, heights).unwrap()
    }

    #[test]
    fn test_flat_field() {
        let field = HeightField::flat(4, 4, 2.0, 3.5).unwrap();
        let sample = field.query(2.7, 4.1);

        assert!((sample.height - 3.5).abs() < EPS);
        assert!((sample.normal - Vec3::Y).length() < EPS);
        assert_eq!(sample.ground_height(), Some(sample.height));
    }

    #[test]
    fn test_out_of_bounds_has_no_ground() {
        let field = HeightField::flat(4, 4, 1.0, 5.0).unwrap();

        for (x, z) in [(-0.01, 1.0), (1.0, -0.01), (3.01, 1.0), (1.0, 3.5), (f32::NAN, 1.0)] {
            let sample = field.query(x, z);
            assert_eq!(sample, HeightSample::NONE, "({x}, {z})");
            assert!(!sample.has_ground());
            assert_eq!(sample.ground_height(), None);
        }

        assert!(field.query(3.0, 3.0).has_ground());
    }

    #[test]
    fn test_vertices_reproduce_samples() {
        let field = grid(5, 4, 2.0, |ix, iz| (ix * 3 + iz * 7) as f32 % 5.0);

        for iz in 0..4 {
            for ix in 0..5 {
                let h = field.query(ix as f32 * 2.0, iz as f32 * 2.0).height;
                assert!((h - field.sample(ix, iz)).abs() < EPS, "vertex ({ix}, {iz})");
            }
        }
    }

    #[test]
    fn test_plane_is_exact() {
        // y = 0.5x - 0.25z
        let field = grid(6, 6, 1.5, |ix, iz| 0.5 * ix as f32 * 1.5 - 0.25 * iz as f32 * 1.5);
        let expected_normal = Vec3::new(-0.5, 1.0, 0.25).normalize();

        for (x, z) in [(0.3, 0.2), (1.4, 1.4), (4.9, 2.2), (7.5, 7.5)] {
            let sample = field.query(x, z);
            assert!((sample.height - (0.5 * x - 0.25 * z)).abs() < EPS, "({x}, {z})");
            assert!((sample.normal - expected_normal).length() < EPS, "({x}, {z})");
        }
    }

    #[test]
    fn test_triangle_choice_within_cell() {
        // only the far corner is raised, so the lower-left triangle stays flat
        let field = grid(2, 2, 1.0, |ix, iz| if ix == 1 && iz == 1 { 4.0 } else { 0.0 });

        let lower = field.query(0.2, 0.3);
        assert!(lower.height.abs() < EPS);
        assert!((lower.normal - Vec3::Y).length() < EPS);

        let upper = field.query(0.8, 0.9);
        assert!((upper.height - 4.0 * 0.7).abs() < EPS);
        assert!(upper.normal.y > 0.0);
        assert!((upper.normal.length() - 1.0).abs() < EPS);
    }

    #[test]
    fn test_continuous_across_diagonal_and_cell_edges() {
        let field = grid(4, 4, 1.0, |ix, iz| ((ix * 13 + iz * 29) % 7) as f32);
        let nudge = 1e-4;

        // along the diagonal of cell (1, 1)
        for t in [0.1f32, 0.35, 0.5, 0.8] {
            let (x, z) = (1.0 + t, 2.0 - t);
            let below = field.query(x - nudge, z - nudge).height;
            let above = field.query(x + nudge, z + nudge).height;
            assert!((below - above).abs() < 5e-3, "diagonal t={t}");
        }

        // across the shared edge x = 2 between cells (1, z) and (2, z)
        for z in [0.25f32, 1.5, 2.75] {
            let left = field.query(2.0 - nudge, z).height;
            let right = field.query(2.0 + nudge, z).height;
            assert!((left - right).abs() < 5e-3, "edge z={z}");
        }

        // across the shared edge z = 1
        for x in [0.4f32, 1.6, 2.9] {
            let near = field.query(x, 1.0 - nudge).height;
            let far = field.query(x, 1.0 + nudge).height;
            assert!((near - far).abs() < 5e-3, "edge x={x}");
        }
    }

    #[test]
    fn test_rejects_bad_dimensions() {
        assert!(matches!(
            HeightField::from_heights(1, 4, 1.0, vec![0.0; 4]),
            Err(TerrainError::Dimensions { .. })
        ));
        assert!(matches!(
            HeightField::from_heights(3, 3, 1.0, vec![0.0; 8]),
            Err(TerrainError::SampleCount { expected: 9, actual: 8 })
        ));
        assert!(matches!(
            HeightField::from_heights(2, 2, 0.0, vec![0.0; 4]),
            Err(TerrainError::CellSize(_))
        ));
    }

    #[test]
    fn test_rolling_hills_is_deterministic() {
        let a = HeightField::rolling_hills(32, 32, 1.0, 8.0).unwrap();
        let b = HeightField::rolling_hills(32, 32, 1.0, 8.0).unwrap();

        assert_eq!(a.heights, b.heights);
        assert!(a.heights.iter().all(|h| (-1e-4..=8.0001).contains(h)));
        assert_eq!(a.center(), Vec2::splat(15.5));
    }
}
