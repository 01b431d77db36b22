// Spatial hash grid for collision candidate lookup.
//
// Instead of testing every pair of siblings each relaxation pass, bodies are
// bucketed by the grid cells their bounding boxes cover. A query returns every
// body sharing a cell with the query box.

use std::collections::HashMap;

/// Axis-aligned bounding box.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Box around a circle.
    pub fn around(x: f64, y: f64, r: f64) -> Self {
        Self {
            min_x: x - r,
            min_y: y - r,
            max_x: x + r,
            max_y: y + r,
        }
    }

    fn is_finite(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
    }
}

/// A spatial hash grid over body indices.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    /// Side length of each cell.
    cell_size: f64,
    /// Cell coordinates -> indices of bodies whose box touches that cell.
    cells: HashMap<(i64, i64), Vec<usize>>,
}

impl SpatialGrid {
    /// Cell size should be roughly the diameter of the largest body.
    pub fn new(cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 { cell_size } else { 1.0 };
        Self {
            cell_size,
            cells: HashMap::new(),
        }
    }

    fn cell_range(&self, bounds: &Bounds) -> Vec<(i64, i64)> {
        if !bounds.is_finite() {
            return Vec::new();
        }
        let min_x = (bounds.min_x / self.cell_size).floor() as i64;
        let max_x = (bounds.max_x / self.cell_size).floor() as i64;
        let min_y = (bounds.min_y / self.cell_size).floor() as i64;
        let max_y = (bounds.max_y / self.cell_size).floor() as i64;

        let mut cells = Vec::new();
        for cx in min_x..=max_x {
            for cy in min_y..=max_y {
                cells.push((cx, cy));
            }
        }
        cells
    }

    pub fn insert(&mut self, id: usize, bounds: Bounds) {
        for cell in self.cell_range(&bounds) {
            self.cells.entry(cell).or_default().push(id);
        }
    }

    /// Ids that might overlap `bounds`, ascending and without duplicates.
    /// May include false positives; callers do the exact test.
    pub fn query(&self, bounds: &Bounds) -> Vec<usize> {
        let mut result: Vec<usize> = self
            .cell_range(bounds)
            .iter()
            .filter_map(|cell| self.cells.get(cell))
            .flatten()
            .copied()
            .collect();
        result.sort_unstable();
        result.dedup();
        result
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }
}
