use glam::DVec2;
use log::trace;

use crate::{
    element::{EH, HH, VH},
    error::Error,
    math,
    navmesh::NavMesh,
};

impl NavMesh {
    /// Insert both endpoints and a chain of constrained edges between them.
    pub(crate) fn insert_segment(&mut self, a: DVec2, b: DVec2) -> Result<(VH, VH), Error> {
        trace!("Inserting constraint from {} to {}", a, b);
        let (src, _) = self.insert_vertex(a)?;
        let (dest, _) = self.insert_vertex(b)?;
        self.constrain_between(src, dest)?;
        Ok((src, dest))
    }

    /// Make sure the straight line between two existing vertices is covered by
    /// constrained edges. Vertices lying on the line split it into several
    /// edges.
    pub(crate) fn constrain_between(&mut self, mut src: VH, dest: VH) -> Result<(), Error> {
        let eps = self.config.epsilon;
        let pd = self.topol.point(dest);
        for _ in 0..self.config.max_constraint_iterations {
            if src == dest {
                return Ok(());
            }
            if let Some(h) = self.topol.find_halfedge(src, dest) {
                self.topol.set_constrained(h.edge(), true);
                return Ok(());
            }
            let ps = self.topol.point(src);
            // An existing edge running along the segment.
            let dist = ps.distance(pd);
            if let Some(h) = self.topol.outgoing(src).iter().copied().find(|h| {
                let w = self.topol.point(self.topol.to_vertex(*h));
                math::signed_distance(ps, pd, w).abs() <= eps
                    && (w - ps).dot(pd - ps) > 0.
                    && ps.distance(w) < dist
            }) {
                self.topol.set_constrained(h.edge(), true);
                src = self.topol.to_vertex(h);
                continue;
            }
            src = self.cut_through(src, dest)?;
        }
        Err(Error::IterationLimitExceeded(
            self.config.max_constraint_iterations,
        ))
    }

    /// Remove the triangles crossed by the segment from `src` towards `dest`,
    /// and retriangulate the two sides of the segment. The segment ends at
    /// `dest` or at the first vertex lying on it, which is returned.
    fn cut_through(&mut self, src: VH, dest: VH) -> Result<VH, Error> {
        let eps = self.config.epsilon;
        let ps = self.topol.point(src);
        let pd = self.topol.point(dest);
        let side = |p: DVec2| math::signed_distance(ps, pd, p);
        // The triangle (src, w, x) around src with w on the right and x on the
        // left of the segment.
        let first = self
            .topol
            .outgoing(src)
            .iter()
            .copied()
            .find(|h| {
                self.topol.halfedge_face(*h).is_some() && {
                    let w = self.topol.point(self.topol.to_vertex(*h));
                    let x = self
                        .topol
                        .point(self.topol.to_vertex(self.topol.next_halfedge(*h)));
                    side(w) < -eps && side(x) > eps
                }
            })
            .ok_or(Error::InvalidTopology(format!(
                "No triangle around {} faces {}",
                src, dest
            )))?;
        let mut crossing: HH = self.topol.next_halfedge(first);
        let mut faces = Vec::new();
        faces.extend(self.topol.halfedge_face(first));
        let mut left = vec![self.topol.to_vertex(crossing)];
        let mut right = vec![self.topol.from_vertex(crossing)];
        let end = loop {
            // `crossing` runs from the right side to the left side.
            if self.topol.is_constrained(crossing.edge()) {
                return Err(Error::CrossedConstraint(crossing.edge()));
            }
            let opp = crossing.pair();
            let f = self
                .topol
                .halfedge_face(opp)
                .ok_or(Error::MissingFace(opp))?;
            faces.push(f);
            let y = self.topol.to_vertex(self.topol.next_halfedge(opp));
            if y == dest {
                break dest;
            }
            let dy = side(self.topol.point(y));
            if dy.abs() <= eps {
                break y;
            }
            if dy > 0. {
                left.push(y);
                crossing = self.topol.next_halfedge(opp);
            } else {
                right.push(y);
                crossing = self.topol.prev_halfedge(opp);
            }
        };
        trace!(
            "Constraint from {} to {} crosses {} triangles",
            src,
            end,
            faces.len()
        );
        let mut stale: Vec<EH> = Vec::with_capacity(faces.len() * 3);
        for f in faces {
            stale.extend(self.destroy_triangle(f).map(|h| h.edge()));
        }
        self.triangulate_pseudo_polygon(src, end, &left)?;
        right.reverse();
        self.triangulate_pseudo_polygon(end, src, &right)?;
        let h = self.halfedge(src, end)?;
        self.topol.set_constrained(h.edge(), true);
        self.topol.remove_orphan_edges(&stale)?;
        Ok(end)
    }

    /// Triangulate the polygon bounded by the edge `a -> b` and the chain of
    /// vertices to its left, ordered from `a` towards `b`. Every triangle is
    /// chosen so that no other chain vertex is inside its circumcircle.
    fn triangulate_pseudo_polygon(&mut self, a: VH, b: VH, chain: &[VH]) -> Result<(), Error> {
        let eps = self.config.epsilon;
        let mut stack = vec![(a, b, 0usize, chain.len())];
        while let Some((a, b, lo, hi)) = stack.pop() {
            if lo >= hi {
                continue;
            }
            let (pa, pb) = (self.topol.point(a), self.topol.point(b));
            let mut ci = lo;
            for i in (lo + 1)..hi {
                let pc = self.topol.point(chain[ci]);
                if math::in_circumcircle(pa, pb, pc, self.topol.point(chain[i]), eps) {
                    ci = i;
                }
            }
            let c = chain[ci];
            self.create_triangle(a, b, c)?;
            stack.push((a, c, lo, ci));
            stack.push((c, b, ci + 1, hi));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use glam::DVec2;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use crate::{check, error::Error, navmesh::test::square, NavMesh, NavMeshConfig};

    #[test]
    fn t_constrain_diagonal() {
        let mut mesh = square(10.);
        let before: Vec<_> = mesh
            .edges()
            .filter(|e| mesh.is_constrained(*e))
            .map(|e| mesh.edge_points(e))
            .collect();
        mesh.insert_constraint(DVec2::new(0., 0.), DVec2::new(10., 10.))
            .expect("Unable to insert constraint");
        assert_eq!(mesh.num_triangles(), 2);
        assert_eq!(mesh.num_vertices(), 4);
        let a = mesh.vertex_at(DVec2::ZERO).expect("Missing corner");
        let b = mesh.vertex_at(DVec2::splat(10.)).expect("Missing corner");
        let diag = mesh.find_edge(a, b).expect("Missing diagonal");
        assert!(mesh.is_constrained(diag));
        // Both triangles share the diagonal.
        for f in mesh.triangles() {
            let vs = mesh.triangle_vertices(f);
            assert!(vs.contains(&a) && vs.contains(&b));
        }
        // The boundary is untouched.
        let after: Vec<_> = mesh
            .edges()
            .filter(|e| mesh.is_constrained(*e) && *e != diag)
            .map(|e| mesh.edge_points(e))
            .collect();
        assert_eq!(after.len(), before.len());
        for (p, q) in before {
            assert!(after.contains(&(p, q)) || after.contains(&(q, p)));
        }
        mesh.check().expect("Mesh is invalid");
    }

    #[test]
    fn t_constrain_through_points() {
        let mut mesh = square(20.);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            let p = DVec2::new(rng.gen_range(0.5..19.5), rng.gen_range(0.5..19.5));
            mesh.insert_point(p).expect("Unable to insert point");
        }
        // A vertex lying exactly on the segment splits it.
        mesh.insert_point(DVec2::new(10., 7.))
            .expect("Unable to insert point");
        mesh.insert_constraint(DVec2::new(2., 7.), DVec2::new(18., 7.))
            .expect("Unable to insert constraint");
        let mid = mesh.vertex_at(DVec2::new(10., 7.)).expect("Missing vertex");
        let mut length = 0.;
        for e in mesh.edges().filter(|e| mesh.is_constrained(*e)) {
            let (p, q) = mesh.edge_points(e);
            if p.y == 7. && q.y == 7. {
                length += p.distance(q);
            }
        }
        assert!((length - 16.).abs() < 1e-9);
        assert!(
            mesh.edges()
                .filter(|e| mesh.is_constrained(*e))
                .any(|e| {
                    let (a, b) = mesh.edge_vertices(e);
                    a == mid || b == mid
                })
        );
        mesh.check().expect("Mesh is invalid");
        check::check_delaunay(&mesh).expect("Mesh is not Delaunay");
    }

    #[test]
    fn t_constrain_along_existing_edges() {
        let mut mesh = square(10.);
        mesh.insert_point(DVec2::new(4., 0.))
            .expect("Unable to insert point");
        let n = mesh.num_edges();
        // Overlaps the bottom boundary, which is already constrained.
        mesh.insert_constraint(DVec2::new(0., 0.), DVec2::new(10., 0.))
            .expect("Unable to insert constraint");
        assert_eq!(mesh.num_edges(), n);
        mesh.check().expect("Mesh is invalid");
    }

    #[test]
    fn t_crossed_constraint() {
        let mut mesh = square(10.);
        mesh.insert_constraint(DVec2::new(1., 1.), DVec2::new(9., 9.))
            .expect("Unable to insert constraint");
        assert!(matches!(
            mesh.insert_constraint(DVec2::new(1., 9.), DVec2::new(9., 1.)),
            Err(Error::CrossedConstraint(_))
        ));
    }

    #[test]
    fn t_iteration_limit() {
        let mut mesh = NavMesh::with_config(
            DVec2::ZERO,
            DVec2::splat(10.),
            NavMeshConfig::default().with_max_constraint_iterations(1),
        )
        .expect("Unable to create mesh");
        for x in 1..9 {
            mesh.insert_point(DVec2::new(x as f64, 5.))
                .expect("Unable to insert point");
        }
        mesh.insert_point(DVec2::new(5., 2.))
            .expect("Unable to insert point");
        mesh.insert_point(DVec2::new(5., 8.))
            .expect("Unable to insert point");
        assert!(matches!(
            mesh.insert_constraint(DVec2::new(0.5, 5.), DVec2::new(9.5, 5.)),
            Err(Error::IterationLimitExceeded(1))
        ));
    }

    #[test]
    fn t_constrain_random_segments() {
        let mut mesh = square(50.);
        let mut rng = StdRng::seed_from_u64(77);
        for _ in 0..200 {
            let p = DVec2::new(rng.gen_range(0.0..50.0), rng.gen_range(0.0..50.0));
            mesh.insert_point(p).expect("Unable to insert point");
        }
        // Parallel horizontal segments never cross each other.
        for i in 1..10 {
            let y = i as f64 * 5. + 0.37;
            let x0 = rng.gen_range(1.0..20.0);
            let x1 = rng.gen_range(30.0..49.0);
            mesh.insert_constraint(DVec2::new(x0, y), DVec2::new(x1, y))
                .expect("Unable to insert constraint");
        }
        mesh.check().expect("Mesh is invalid");
        check::check_delaunay(&mesh).expect("Mesh is not Delaunay");
    }
}
