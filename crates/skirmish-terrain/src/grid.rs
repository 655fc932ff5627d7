//! TerrainGrid: raster battlefield with heights and terrain masks.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use skirmish_core::constants::BATTLEFIELD_SIZE;

use crate::ground::GroundMap;

const FOREST_BIT: u8 = 0b01;
const IMPASSABLE_BIT: u8 = 0b10;

/// Errors raised while building a terrain raster.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TerrainError {
    #[error("terrain resolution must be at least 1")]
    ZeroResolution,
    #[error("terrain extent must be positive, got {0}")]
    NonPositiveExtent(f32),
    #[error("expected {expected} height samples, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Square raster covering the battlefield. Row 0 is the southern edge.
#[derive(Debug, Clone)]
pub struct TerrainGrid {
    /// Side length covered by the grid (meters).
    extent: f32,
    /// Cells per side.
    resolution: usize,
    /// Cell-centered elevations (meters), row-major.
    heights: Vec<f32>,
    /// Packed terrain flags per cell.
    flags: Vec<u8>,
}

impl TerrainGrid {
    /// Level grid with no forest or impassable cells.
    pub fn new(extent: f32, resolution: usize) -> Result<Self, TerrainError> {
        Self::from_heights(extent, resolution, vec![0.0; resolution * resolution])
    }

    /// Grid from pre-loaded elevations.
    pub fn from_heights(
        extent: f32,
        resolution: usize,
        heights: Vec<f32>,
    ) -> Result<Self, TerrainError> {
        if resolution == 0 {
            return Err(TerrainError::ZeroResolution);
        }
        if !(extent > 0.0) {
            return Err(TerrainError::NonPositiveExtent(extent));
        }
        let expected = resolution * resolution;
        if heights.len() != expected {
            return Err(TerrainError::LengthMismatch {
                expected,
                actual: heights.len(),
            });
        }

        Ok(Self {
            extent,
            resolution,
            heights,
            flags: vec![0; expected],
        })
    }

    pub fn extent(&self) -> f32 {
        self.extent
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    fn cell_size(&self) -> f32 {
        self.extent / self.resolution as f32
    }

    /// Cell containing `position`, or None outside the grid.
    fn cell_of(&self, position: Vec2) -> Option<(usize, usize)> {
        if position.x < 0.0
            || position.y < 0.0
            || position.x >= self.extent
            || position.y >= self.extent
        {
            return None;
        }
        let size = self.cell_size();
        let col = ((position.x / size) as usize).min(self.resolution - 1);
        let row = ((position.y / size) as usize).min(self.resolution - 1);
        Some((row, col))
    }

    fn cell_center(&self, row: usize, col: usize) -> Vec2 {
        let size = self.cell_size();
        Vec2::new((col as f32 + 0.5) * size, (row as f32 + 0.5) * size)
    }

    fn flag(&self, position: Vec2, bit: u8) -> bool {
        self.cell_of(position)
            .map(|(row, col)| self.flags[row * self.resolution + col] & bit != 0)
            .unwrap_or(false)
    }

    /// Apply `f` to every cell whose center lies within `radius` of `center`.
    fn for_cells_within(&mut self, center: Vec2, radius: f32, mut f: impl FnMut(&mut Self, usize, f32)) {
        for row in 0..self.resolution {
            for col in 0..self.resolution {
                let distance = self.cell_center(row, col).distance(center);
                if distance <= radius {
                    f(self, row * self.resolution + col, distance);
                }
            }
        }
    }

    /// Mark a circular area as forest.
    pub fn paint_forest(&mut self, center: Vec2, radius: f32) {
        self.for_cells_within(center, radius, |grid, index, _| grid.flags[index] |= FOREST_BIT);
    }

    /// Mark a circular area as impassable (water, cliffs).
    pub fn paint_impassable(&mut self, center: Vec2, radius: f32) {
        self.for_cells_within(center, radius, |grid, index, _| {
            grid.flags[index] |= IMPASSABLE_BIT
        });
    }

    /// Add a smooth cosine-shaped hill.
    pub fn raise_hill(&mut self, center: Vec2, radius: f32, height: f32) {
        if radius <= 0.0 {
            return;
        }
        self.for_cells_within(center, radius, |grid, index, distance| {
            let t = distance / radius;
            grid.heights[index] += height * 0.5 * (1.0 + (t * std::f32::consts::PI).cos());
        });
    }

    /// Raw elevation at integer grid coordinates (clamped to the grid).
    fn raw_height(&self, row: usize, col: usize) -> f32 {
        let row = row.min(self.resolution - 1);
        let col = col.min(self.resolution - 1);
        self.heights[row * self.resolution + col]
    }

    /// Bilinear interpolation between cell centers.
    fn bilinear(&self, x: f32, y: f32) -> f32 {
        let size = self.cell_size();
        let max = (self.resolution - 1) as f32;
        let fx = (x / size - 0.5).clamp(0.0, max);
        let fy = (y / size - 0.5).clamp(0.0, max);

        let c0 = fx.floor() as usize;
        let r0 = fy.floor() as usize;
        let tx = fx - c0 as f32;
        let ty = fy - r0 as f32;

        let h00 = self.raw_height(r0, c0);
        let h01 = self.raw_height(r0, c0 + 1);
        let h10 = self.raw_height(r0 + 1, c0);
        let h11 = self.raw_height(r0 + 1, c0 + 1);

        let south = h00 + (h01 - h00) * tx;
        let north = h10 + (h11 - h10) * tx;
        south + (north - south) * ty
    }
}

impl GroundMap for TerrainGrid {
    fn is_impassable(&self, position: Vec2) -> bool {
        self.flag(position, IMPASSABLE_BIT)
    }

    fn is_forest(&self, position: Vec2) -> bool {
        self.flag(position, FOREST_BIT)
    }

    fn calculate_height(&self, x: f32, y: f32) -> f32 {
        self.bilinear(x, y)
    }
}

/// A circular terrain feature in a scenario description.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainFeature {
    pub center: Vec2,
    pub radius: f32,
    /// Only used by hills (meters).
    #[serde(default)]
    pub height: f32,
}

/// Declarative terrain, as written in scenario files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainDescription {
    #[serde(default = "default_resolution")]
    pub resolution: usize,
    #[serde(default)]
    pub hills: Vec<TerrainFeature>,
    #[serde(default)]
    pub forests: Vec<TerrainFeature>,
    #[serde(default)]
    pub impassable: Vec<TerrainFeature>,
}

fn default_resolution() -> usize {
    128
}

impl Default for TerrainDescription {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            hills: Vec::new(),
            forests: Vec::new(),
            impassable: Vec::new(),
        }
    }
}

impl TerrainDescription {
    /// Rasterize onto a battlefield-sized grid.
    pub fn build(&self) -> Result<TerrainGrid, TerrainError> {
        let mut grid = TerrainGrid::new(BATTLEFIELD_SIZE, self.resolution)?;
        for hill in &self.hills {
            grid.raise_hill(hill.center, hill.radius, hill.height);
        }
        for forest in &self.forests {
            grid.paint_forest(forest.center, forest.radius);
        }
        for area in &self.impassable {
            grid.paint_impassable(area.center, area.radius);
        }
        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_dimensions() {
        assert_eq!(
            TerrainGrid::new(100.0, 0).unwrap_err(),
            TerrainError::ZeroResolution
        );
        assert_eq!(
            TerrainGrid::new(0.0, 4).unwrap_err(),
            TerrainError::NonPositiveExtent(0.0)
        );
        assert_eq!(
            TerrainGrid::from_heights(100.0, 4, vec![0.0; 15]).unwrap_err(),
            TerrainError::LengthMismatch {
                expected: 16,
                actual: 15
            }
        );
    }

    #[test]
    fn test_bilinear_height() {
        // 2x2 grid over 100 m: cell centers at 25 and 75.
        let grid = TerrainGrid::from_heights(100.0, 2, vec![0.0, 10.0, 0.0, 10.0]).unwrap();
        assert!((grid.calculate_height(25.0, 25.0) - 0.0).abs() < 1e-4);
        assert!((grid.calculate_height(75.0, 25.0) - 10.0).abs() < 1e-4);
        assert!((grid.calculate_height(50.0, 50.0) - 5.0).abs() < 1e-4);
        // Clamped outside the outermost centers
        assert!((grid.calculate_height(0.0, 0.0) - 0.0).abs() < 1e-4);
        assert!((grid.calculate_height(100.0, 0.0) - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_painted_flags() {
        let mut grid = TerrainGrid::new(100.0, 10).unwrap();
        grid.paint_forest(Vec2::new(25.0, 25.0), 10.0);
        grid.paint_impassable(Vec2::new(75.0, 75.0), 10.0);

        assert!(grid.is_forest(Vec2::new(25.0, 25.0)));
        assert!(!grid.is_forest(Vec2::new(75.0, 75.0)));
        assert!(grid.is_impassable(Vec2::new(75.0, 75.0)));
        assert!(!grid.is_impassable(Vec2::new(25.0, 25.0)));
        // Outside the raster nothing is flagged
        assert!(!grid.is_impassable(Vec2::new(-10.0, 75.0)));
    }

    #[test]
    fn test_hill_peaks_at_center() {
        let mut grid = TerrainGrid::new(100.0, 50).unwrap();
        grid.raise_hill(Vec2::new(51.0, 51.0), 20.0, 12.0);
        let peak = grid.calculate_height(51.0, 51.0);
        let flank = grid.calculate_height(61.0, 51.0);
        let outside = grid.calculate_height(90.0, 90.0);
        assert!(peak > 11.0, "peak was {peak}");
        assert!(flank > 0.0 && flank < peak);
        assert_eq!(outside, 0.0);
    }

    #[test]
    fn test_description_build() {
        let description: TerrainDescription = serde_json::from_str(
            r#"{ "forests": [{ "center": [200.0, 200.0], "radius": 30.0 }] }"#,
        )
        .unwrap();
        let grid = description.build().unwrap();
        assert_eq!(grid.resolution(), 128);
        assert!(grid.is_forest(Vec2::new(200.0, 200.0)));
        assert!(!grid.is_forest(Vec2::new(600.0, 600.0)));
    }
}
