use glam::DVec2;
use log::{trace, warn};

use crate::{
    element::{FH, HH, Location, VH},
    error::Error,
    math,
    navmesh::NavMesh,
};

impl NavMesh {
    /// Insert a vertex at `p`, splitting the triangle or edge it lands on.
    /// Returns the vertex at `p` and whether it was created.
    pub(crate) fn insert_vertex(&mut self, p: DVec2) -> Result<(VH, bool), Error> {
        match self.locate(p)? {
            Location::Vertex(v) => Ok((v, false)),
            Location::Edge(h) => Ok((self.split_edge(h, p)?, true)),
            Location::Face(f) => Ok((self.split_face(f, p)?, true)),
        }
    }

    /// Connect a new vertex at `p` to the three corners of `f`.
    fn split_face(&mut self, f: FH, p: DVec2) -> Result<VH, Error> {
        trace!("Splitting {} at {}", f, p);
        let [a, b, c] = self.topol.face_vertices(f);
        self.destroy_triangle(f);
        let v = self.topol.add_vertex(p)?;
        let mut outer = Vec::with_capacity(3);
        for (x, y) in [(a, b), (b, c), (c, a)] {
            let nf = self.create_triangle(x, y, v)?;
            outer.push(self.topol.face_halfedge(nf));
        }
        self.legalize(outer)?;
        Ok(v)
    }

    /// Split the edge of `h` at `p`, and every triangle adjacent to it.
    fn split_edge(&mut self, h: HH, p: DVec2) -> Result<VH, Error> {
        trace!("Splitting {} at {}", h.edge(), p);
        let e = h.edge();
        let constrained = self.topol.is_constrained(e);
        let a = self.topol.from_vertex(h);
        let b = self.topol.to_vertex(h);
        let c = self.opposite_vertex(h);
        let d = self.opposite_vertex(h.pair());
        for side in [h, h.pair()] {
            if let Some(f) = self.topol.halfedge_face(side) {
                self.destroy_triangle(f);
            }
        }
        self.topol.remove_edge(e)?;
        let v = self.topol.add_vertex(p)?;
        let mut outer = Vec::with_capacity(4);
        if let Some(c) = c {
            self.create_triangle(a, v, c)?;
            self.create_triangle(v, b, c)?;
            outer.extend([self.halfedge(c, a)?, self.halfedge(b, c)?]);
        }
        if let Some(d) = d {
            self.create_triangle(b, v, d)?;
            self.create_triangle(v, a, d)?;
            outer.extend([self.halfedge(d, b)?, self.halfedge(a, d)?]);
        }
        if constrained {
            for (x, y) in [(a, v), (v, b)] {
                let sub = self.halfedge(x, y)?;
                self.topol.set_constrained(sub.edge(), true);
            }
        }
        self.legalize(outer)?;
        Ok(v)
    }

    /// Corner of the triangle of `h` that is not on `h`.
    pub(crate) fn opposite_vertex(&self, h: HH) -> Option<VH> {
        self.topol
            .halfedge_face(h)
            .map(|_| self.topol.to_vertex(self.topol.next_halfedge(h)))
    }

    pub(crate) fn halfedge(&self, from: VH, to: VH) -> Result<HH, Error> {
        self.topol
            .find_halfedge(from, to)
            .ok_or(Error::InvalidTopology(format!(
                "No halfedge from {} to {}",
                from, to
            )))
    }

    /// Flip edges until the triangles around the given halfedges are locally
    /// Delaunay. Constrained and boundary edges are never flipped. When the
    /// work stack outgrows its cap, the remaining edges are left as they are.
    pub(crate) fn legalize(&mut self, mut stack: Vec<HH>) -> Result<(), Error> {
        let eps = self.config.epsilon;
        let cap = self.config.max_flip_stack;
        while let Some(h) = stack.pop() {
            if !self.topol.is_valid_halfedge(h) || self.topol.is_constrained(h.edge()) {
                continue;
            }
            let (Some(f), Some(g)) = (
                self.topol.halfedge_face(h),
                self.topol.halfedge_face(h.pair()),
            ) else {
                continue;
            };
            // h runs a -> b in (a, b, c), its pair runs b -> a in (b, a, d).
            let a = self.topol.from_vertex(h);
            let b = self.topol.to_vertex(h);
            let c = self.topol.to_vertex(self.topol.next_halfedge(h));
            let d = self.topol.to_vertex(self.topol.next_halfedge(h.pair()));
            let [pa, pb, pc, pd] = [a, b, c, d].map(|v| self.topol.point(v));
            if !math::in_circumcircle(pa, pb, pc, pd, eps)
                || math::orient2d(pa, pd, pc) <= 0.
                || math::orient2d(pd, pb, pc) <= 0.
            {
                continue;
            }
            self.flip(h, [f, g], [a, b, c, d])?;
            if stack.len() + 4 > cap {
                warn!(
                    "Edge flip stack exceeded {} entries, leaving the remaining edges as they are",
                    cap
                );
                return Ok(());
            }
            for (x, y) in [(a, d), (d, b), (b, c), (c, a)] {
                if let Some(nh) = self.topol.find_halfedge(x, y) {
                    stack.push(nh);
                }
            }
        }
        Ok(())
    }

    /// Replace the edge of `h` with the other diagonal of its two triangles.
    fn flip(&mut self, h: HH, faces: [FH; 2], [a, b, c, d]: [VH; 4]) -> Result<(), Error> {
        for f in faces {
            self.destroy_triangle(f);
        }
        self.topol.remove_edge(h.edge())?;
        self.create_triangle(a, d, c)?;
        self.create_triangle(d, b, c)?;
        Ok(())
    }
}
