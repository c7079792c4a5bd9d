use glam::DVec2;
use log::warn;

use crate::{
    element::{FH, Location},
    error::Error,
    math,
    navmesh::NavMesh,
};

impl NavMesh {
    /// Find where `p` lies in the triangulation.
    ///
    /// The walk starts from the triangle cached by the tile grid for the cell
    /// containing `p`, and repeatedly steps across an edge that has `p` on its
    /// outer side. Points outside the triangulated region produce
    /// [`Error::NoContainingTriangle`].
    pub fn locate(&self, p: DVec2) -> Result<Location, Error> {
        if !p.is_finite() || !self.in_bounds(p) {
            return Err(Error::NoContainingTriangle(p));
        }
        let seed = self
            .grid
            .lookup(p)
            .filter(|f| self.topol.is_valid_face(*f))
            .or_else(|| self.topol.any_face())
            .ok_or(Error::NoContainingTriangle(p))?;
        match self.walk(seed, p)? {
            Some(f) => Ok(self.classify(f, p)),
            None => {
                warn!(
                    "Point location for {} did not converge within {} steps, scanning all triangles",
                    p, self.config.max_locate_steps
                );
                let eps = self.config.epsilon;
                self.topol
                    .faces()
                    .find(|f| {
                        let [a, b, c] = self.topol.face_points(*f);
                        math::point_in_triangle(p, a, b, c, eps)
                    })
                    .map(|f| self.classify(f, p))
                    .ok_or(Error::NoContainingTriangle(p))
            }
        }
    }

    /// Walk from `seed` towards `p`. Returns `None` if the step budget ran out.
    fn walk(&self, seed: FH, p: DVec2) -> Result<Option<FH>, Error> {
        let eps = self.config.epsilon;
        let mut f = seed;
        'walk: for step in 0..self.config.max_locate_steps {
            let hs = self.topol.face_halfedges(f);
            // Rotating the first edge tested keeps the walk from cycling.
            for i in 0..3 {
                let h = hs[(i + step) % 3];
                let (a, b) = self.topol.halfedge_points(h);
                if math::signed_distance(a, b, p) < -eps {
                    match self.topol.halfedge_face(h.pair()) {
                        Some(nf) => {
                            f = nf;
                            continue 'walk;
                        }
                        None => return Err(Error::NoContainingTriangle(p)),
                    }
                }
            }
            return Ok(Some(f));
        }
        Ok(None)
    }

    /// Classify `p`, known to be inside or on the triangle `f`.
    fn classify(&self, f: FH, p: DVec2) -> Location {
        let eps = self.config.epsilon;
        let hs = self.topol.face_halfedges(f);
        for h in hs {
            let v = self.topol.to_vertex(h);
            if self.topol.point(v).distance(p) <= eps {
                return Location::Vertex(v);
            }
        }
        for h in hs {
            let (a, b) = self.topol.halfedge_points(h);
            if math::signed_distance(a, b, p).abs() <= eps {
                return Location::Edge(h);
            }
        }
        Location::Face(f)
    }
}
