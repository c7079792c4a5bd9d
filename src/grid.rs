use glam::DVec2;

use crate::{element::FH, math};

/// Uniform grid over the bounding rectangle of the mesh. Each cell remembers
/// the last triangle rasterized over its center. The cache only seeds point
/// location and may point to triangles that no longer exist.
#[derive(Debug, Clone)]
pub(crate) struct TiledMap {
    origin: DVec2,
    tile_size: f64,
    cols: usize,
    rows: usize,
    cells: Vec<Option<FH>>,
}

/// Upper bound on the number of cells. Larger worlds get coarser tiles.
const MAX_CELLS: f64 = (1u32 << 22) as f64;

impl TiledMap {
    pub fn new(min: DVec2, max: DVec2, tile_size: f64) -> Self {
        let mut tile_size = if tile_size > 0. { tile_size } else { 1. };
        let size = (max - min).max(DVec2::ZERO);
        let counts = |tile_size: f64| {
            (
                (size.x / tile_size).ceil().max(1.),
                (size.y / tile_size).ceil().max(1.),
            )
        };
        let (mut cols, mut rows) = counts(tile_size);
        while cols * rows > MAX_CELLS {
            tile_size *= 2.;
            (cols, rows) = counts(tile_size);
        }
        let (cols, rows) = (cols as usize, rows as usize);
        TiledMap {
            origin: min,
            tile_size,
            cols,
            rows,
            cells: vec![None; cols * rows],
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(None);
    }

    fn center(&self, col: usize, row: usize) -> DVec2 {
        self.origin + DVec2::new(col as f64 + 0.5, row as f64 + 0.5) * self.tile_size
    }

    /// Range of cells whose centers fall within `[lo, hi]` along one axis.
    fn span(&self, lo: f64, hi: f64, origin: f64, count: usize) -> Option<(usize, usize)> {
        let first = ((lo - origin) / self.tile_size - 0.5).ceil().max(0.);
        let last = ((hi - origin) / self.tile_size - 0.5).floor();
        if last < first || first >= count as f64 {
            return None;
        }
        Some((first as usize, (last as usize).min(count - 1)))
    }

    /// Calls `f` with the index of every cell whose center lies inside the
    /// triangle.
    fn for_each_covered(&self, tri: [DVec2; 3], mut f: impl FnMut(usize)) {
        let lo = tri[0].min(tri[1]).min(tri[2]);
        let hi = tri[0].max(tri[1]).max(tri[2]);
        let (Some((c0, c1)), Some((r0, r1))) = (
            self.span(lo.x, hi.x, self.origin.x, self.cols),
            self.span(lo.y, hi.y, self.origin.y, self.rows),
        ) else {
            return;
        };
        for row in r0..=r1 {
            for col in c0..=c1 {
                if math::point_in_triangle(self.center(col, row), tri[0], tri[1], tri[2], 0.) {
                    f(row * self.cols + col);
                }
            }
        }
    }

    pub fn rasterize(&mut self, f: FH, tri: [DVec2; 3]) {
        let mut covered = Vec::new();
        self.for_each_covered(tri, |i| covered.push(i));
        for i in covered {
            self.cells[i] = Some(f);
        }
    }

    /// Clear the cells covered by the triangle that still point to it.
    pub fn unrasterize(&mut self, f: FH, tri: [DVec2; 3]) {
        let mut covered = Vec::new();
        self.for_each_covered(tri, |i| covered.push(i));
        for i in covered {
            if self.cells[i] == Some(f) {
                self.cells[i] = None;
            }
        }
    }

    /// Cached triangle for the cell containing `p`.
    pub fn lookup(&self, p: DVec2) -> Option<FH> {
        let rel = (p - self.origin) / self.tile_size;
        if !(rel.x >= 0. && rel.y >= 0.) {
            return None;
        }
        let (col, row) = (rel.x as usize, rel.y as usize);
        if col > self.cols || row > self.rows {
            return None;
        }
        self.cells[row.min(self.rows - 1) * self.cols + col.min(self.cols - 1)]
    }
}

#[cfg(test)]
mod test {
    use glam::DVec2;

    use super::TiledMap;
    use crate::element::FH;

    #[test]
    fn t_rasterize_square() {
        let mut grid = TiledMap::new(DVec2::ZERO, DVec2::new(4., 4.), 1.);
        assert_eq!((grid.cols, grid.rows), (4, 4));
        let f0: FH = 0.into();
        let f1: FH = 1.into();
        let lower = [DVec2::new(0., 0.), DVec2::new(4., 0.), DVec2::new(0., 4.)];
        let upper = [DVec2::new(4., 0.), DVec2::new(4., 4.), DVec2::new(0., 4.)];
        grid.rasterize(f0, lower);
        grid.rasterize(f1, upper);
        assert_eq!(grid.lookup(DVec2::new(0.5, 0.5)), Some(f0));
        assert_eq!(grid.lookup(DVec2::new(3.5, 3.5)), Some(f1));
        // Centers on the diagonal belong to the last rasterized triangle.
        assert_eq!(grid.lookup(DVec2::new(1.5, 2.5)), Some(f1));
        assert_eq!(grid.lookup(DVec2::new(-1., 2.)), None);
        assert_eq!(grid.lookup(DVec2::new(2., 9.)), None);
        grid.unrasterize(f0, lower);
        assert_eq!(grid.lookup(DVec2::new(0.5, 0.5)), None);
        assert_eq!(grid.lookup(DVec2::new(1.5, 2.5)), Some(f1));
        grid.clear();
        assert_eq!(grid.lookup(DVec2::new(3.5, 3.5)), None);
    }

    #[test]
    fn t_small_triangle_covers_nothing() {
        let mut grid = TiledMap::new(DVec2::ZERO, DVec2::new(4., 4.), 1.);
        let tri = [DVec2::new(0.1, 0.1), DVec2::new(0.3, 0.1), DVec2::new(0.1, 0.3)];
        grid.rasterize(7.into(), tri);
        assert_eq!(grid.lookup(DVec2::new(0.2, 0.2)), None);
    }

    #[test]
    fn t_huge_world_gets_coarse_tiles() {
        let mut grid = TiledMap::new(DVec2::ZERO, DVec2::splat(1e20), 1.);
        assert!((grid.cells.len() as f64) <= super::MAX_CELLS);
        assert!(grid.tile_size > 1.);
        let tri = [DVec2::ZERO, DVec2::new(1e20, 0.), DVec2::new(0., 1e20)];
        grid.rasterize(3.into(), tri);
        assert_eq!(grid.lookup(DVec2::splat(1e18)), Some(3.into()));
        // A long thin world is capped too.
        let grid = TiledMap::new(DVec2::ZERO, DVec2::new(1e15, 1.), 0.5);
        assert!((grid.cells.len() as f64) <= super::MAX_CELLS);
        assert_eq!(grid.rows, 1);
    }
}
