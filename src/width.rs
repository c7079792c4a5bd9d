use glam::DVec2;

use crate::{
    element::{FH, HH},
    math,
    navmesh::NavMesh,
};

impl NavMesh {
    /// Width of the channel through `f` between the two edges meeting at the
    /// destination of its `i`th halfedge. The value is cached on the face.
    pub(crate) fn corner_width(&self, f: FH, i: usize) -> f64 {
        let face = self.topol.face(f);
        if let Some(w) = face.widths[i].get() {
            return w;
        }
        let w = self.compute_width(f, i);
        face.widths[i].set(Some(w));
        w
    }

    /// Width of `f` at the vertex shared by two of its halfedges.
    pub(crate) fn width_between(&self, f: FH, h1: HH, h2: HH) -> f64 {
        let hs = self.topol.face_halfedges(f);
        match (0..3).find(|i| {
            let (a, b) = (hs[*i], hs[(i + 1) % 3]);
            (a == h1 && b == h2) || (a == h2 && b == h1)
        }) {
            Some(i) => self.corner_width(f, i),
            None => 0.,
        }
    }

    fn compute_width(&self, f: FH, i: usize) -> f64 {
        let hs = self.topol.face_halfedges(f);
        // The corner c sits between a -> c and c -> b. The opposite edge runs
        // b -> a.
        let (h_in, opp) = (hs[i], hs[(i + 2) % 3]);
        let a = self.topol.point(self.topol.from_vertex(h_in));
        let c = self.topol.point(self.topol.to_vertex(h_in));
        let b = self.topol.point(self.topol.to_vertex(self.topol.next_halfedge(h_in)));
        let d = c.distance(a).min(c.distance(b));
        if math::is_obtuse(c, a, b) || math::is_obtuse(c, b, a) {
            return d;
        }
        if self.topol.is_constrained(opp.edge()) {
            return math::point_segment_distance(c, a, b);
        }
        self.search_width(c, opp, d)
    }

    /// Look for the nearest constrained edge visible from `c` through the
    /// edge of `h`, crossing into the triangle on the other side of `h`.
    fn search_width(&self, c: DVec2, h: HH, mut d: f64) -> f64 {
        let mut stack = vec![h];
        let mut budget = 3 * self.topol.num_faces();
        while let Some(h) = stack.pop() {
            if budget == 0 {
                break;
            }
            budget -= 1;
            let (u, v) = self.topol.halfedge_points(h);
            if math::is_obtuse(c, u, v) || math::is_obtuse(c, v, u) {
                continue;
            }
            let dist = math::point_segment_distance(c, u, v);
            if dist > d {
                continue;
            }
            let opp = h.pair();
            if self.topol.is_constrained(h.edge()) || self.topol.is_boundary_halfedge(opp) {
                d = dist;
                continue;
            }
            let n1 = self.topol.next_halfedge(opp);
            stack.push(self.topol.next_halfedge(n1));
            stack.push(n1);
        }
        d
    }
}

#[cfg(test)]
mod test {
    use glam::DVec2;

    use crate::{
        element::HH, iterator, macros::assert_float_eq, navmesh::test::square,
        shape::test::rect, Location,
    };

    #[test]
    fn t_width_open_square() {
        let mesh = square(10.);
        // Every corner either has a right angle next to it, or sees the far
        // boundary through the unconstrained diagonal.
        for f in mesh.triangles() {
            for corner in 0..3 {
                assert_float_eq!(mesh.clearance(f, corner), 10.);
            }
        }
    }

    #[test]
    fn t_width_narrow_gap() {
        let mut mesh = square(10.);
        // Two obstacles leaving a gap one unit wide around x = 5.
        mesh.add_obstacle(&rect(1., 4., 4.5, 6.))
            .expect("Unable to add obstacle");
        mesh.add_obstacle(&rect(5.5, 4., 9., 6.))
            .expect("Unable to add obstacle");
        let gap = mesh
            .triangles()
            .filter(|f| mesh.is_walkable(*f))
            .filter(|f| {
                let [a, b, c] = mesh.triangle_points(*f);
                let center = (a + b + c) / 3.;
                center.x > 4.5 && center.x < 5.5 && center.y > 4. && center.y < 6.
            })
            .collect::<Vec<_>>();
        assert_eq!(gap.len(), 2);
        for f in gap {
            // Passing through the triangle means entering and leaving through
            // its two unconstrained edges.
            let open: Vec<HH> = iterator::fh_iter(&mesh.topol, f)
                .filter(|h| !mesh.is_constrained(h.edge()))
                .collect();
            assert_eq!(open.len(), 2);
            assert_float_eq!(mesh.width_between(f, open[0], open[1]), 1.);
        }
        // The open space above the obstacles is wide.
        let top = match mesh.locate(DVec2::new(5., 8.5)).expect("Cannot locate") {
            Location::Face(f) => f,
            other => panic!("Expected a face, found {:?}", other),
        };
        assert!((0..3).map(|c| mesh.clearance(top, c)).fold(0., f64::max) > 1.);
    }
}
