use glam::DVec2;
use log::trace;

use crate::{
    element::{FH, HH, Handle, Location},
    error::Error,
    funnel,
    heap::FaceHeap,
    iterator,
    math,
    navmesh::NavMesh,
};

impl NavMesh {
    /// Walkable triangles touching the location.
    fn walkable_faces(&self, loc: Location) -> Vec<FH> {
        let faces: Vec<FH> = match loc {
            Location::Face(f) => vec![f],
            Location::Edge(h) => [h, h.pair()]
                .iter()
                .filter_map(|h| self.topol.halfedge_face(*h))
                .collect(),
            Location::Vertex(v) => iterator::vf_iter(&self.topol, v).collect(),
        };
        faces
            .into_iter()
            .filter(|f| !self.topol.is_blocked(*f))
            .collect()
    }

    /// Find a path for a circular agent of the given radius. The path starts
    /// at `start`, ends at `goal`, and never comes closer than `radius` to a
    /// corner it bends around.
    ///
    /// Points outside the mesh are errors. If either point is not walkable or
    /// no corridor is wide enough, [`Error::NoPathFound`] is returned.
    pub fn find_path(&self, start: DVec2, goal: DVec2, radius: f64) -> Result<Vec<DVec2>, Error> {
        let radius = radius.max(0.);
        let starts = self.walkable_faces(self.locate(start)?);
        let goals = self.walkable_faces(self.locate(goal)?);
        if starts.is_empty() || goals.is_empty() {
            return Err(Error::NoPathFound);
        }
        if let Some(f) = starts.iter().find(|f| goals.contains(f)) {
            trace!("Start and goal share {}", f);
            return Ok(funnel::smooth(start, goal, &[], radius));
        }
        let portals = self.search_corridor(&starts, &goals, start, goal, radius)?;
        let points: Vec<(DVec2, DVec2)> = portals
            .iter()
            .map(|h| {
                // Walking out of the triangle across h, its destination is on
                // the left.
                (
                    self.topol.point(self.topol.to_vertex(*h)),
                    self.topol.point(self.topol.from_vertex(*h)),
                )
            })
            .collect();
        Ok(funnel::smooth(start, goal, &points, radius))
    }

    /// A* over the triangles. Returns the halfedges crossed from a start
    /// triangle to a goal triangle, each seen from the triangle it leaves.
    fn search_corridor(
        &self,
        start_faces: &[FH],
        goal_faces: &[FH],
        start: DVec2,
        goal: DVec2,
        radius: f64,
    ) -> Result<Vec<HH>, Error> {
        let diameter = 2. * radius;
        let slots = self.topol.face_slots();
        let mut heap = FaceHeap::new(slots);
        let mut cost = vec![f64::INFINITY; slots];
        let mut came_from: Vec<Option<HH>> = vec![None; slots];
        let mut entry = vec![start; slots];
        for f in start_faces {
            cost[f.index() as usize] = 0.;
            heap.push_or_update(*f, start.distance(goal));
        }
        while let Some((f, _)) = heap.pop() {
            let fi = f.index() as usize;
            if goal_faces.contains(&f) {
                let mut portals = Vec::new();
                let mut cur = f;
                while let Some(h) = came_from[cur.index() as usize] {
                    portals.push(h);
                    cur = self
                        .topol
                        .halfedge_face(h)
                        .ok_or(Error::MissingFace(h))?;
                }
                portals.reverse();
                trace!("Found a corridor of {} triangles", portals.len() + 1);
                return Ok(portals);
            }
            trace!("Expanding {} at cost {}", f, cost[fi]);
            let arrived_through = came_from[fi].map(|h| h.pair());
            for h in iterator::fh_iter(&self.topol, f) {
                if Some(h) == arrived_through || self.topol.is_constrained(h.edge()) {
                    continue;
                }
                let Some(nf) = self.topol.halfedge_face(h.pair()) else {
                    continue;
                };
                if self.topol.is_blocked(nf) || heap.is_closed(nf) {
                    continue;
                }
                let (left, right) = (
                    self.topol.point(self.topol.to_vertex(h)),
                    self.topol.point(self.topol.from_vertex(h)),
                );
                if left.distance(right) < diameter {
                    continue;
                }
                // The corridor through f, from the portal we came in through to
                // this one, must be wide enough.
                if let Some(inward) = arrived_through {
                    if self.width_between(f, inward, h) < diameter {
                        continue;
                    }
                }
                // There must be a way onwards from the portal, unless the
                // neighbour is where we are going.
                if !goal_faces.contains(&nf) {
                    let hp = h.pair();
                    let hs = self.topol.face_halfedges(nf);
                    let k = hs.iter().position(|x| *x == hp).unwrap_or(0);
                    // Corners of nf at the two ends of the portal.
                    let widest = self
                        .corner_width(nf, k)
                        .max(self.corner_width(nf, (k + 2) % 3));
                    if widest < diameter {
                        continue;
                    }
                }
                let mid = (left + right) * 0.5;
                let g = cost[fi] + entry[fi].distance(mid);
                let nfi = nf.index() as usize;
                if g < cost[nfi] {
                    cost[nfi] = g;
                    came_from[nfi] = Some(h);
                    entry[nfi] = mid;
                    heap.push_or_update(nf, g + math::point_segment_distance(goal, left, right));
                }
            }
        }
        Err(Error::NoPathFound)
    }

    /// Check if a circular agent of the given radius can stand at `p`.
    pub fn is_valid_position(&self, p: DVec2, radius: f64) -> bool {
        let Ok(loc) = self.locate(p) else {
            return false;
        };
        let seeds = self.walkable_faces(loc);
        if seeds.is_empty() {
            return false;
        }
        let radius = radius.max(0.);
        if radius == 0. {
            return true;
        }
        // Flood the triangles within reach of the agent, looking for a wall.
        let mut visited = vec![false; self.topol.face_slots()];
        let mut stack = seeds;
        while let Some(f) = stack.pop() {
            if std::mem::replace(&mut visited[f.index() as usize], true) {
                continue;
            }
            for h in iterator::fh_iter(&self.topol, f) {
                let (a, b) = self.topol.halfedge_points(h);
                let dist = math::point_segment_distance(p, a, b);
                if dist >= radius {
                    continue;
                }
                if self.topol.is_constrained(h.edge()) {
                    return false;
                }
                if let Some(nf) = self.topol.halfedge_face(h.pair()) {
                    if self.topol.is_blocked(nf) {
                        return false;
                    }
                    stack.push(nf);
                }
            }
        }
        true
    }

    /// The nearest position to `p` where a circular agent of the given
    /// radius can stand, searched on rings of growing radius around `p`.
    pub fn nearest_valid_position(&self, p: DVec2, radius: f64) -> Option<DVec2> {
        if self.is_valid_position(p, radius) {
            return Some(p);
        }
        let step = self.config.nearest_search_step;
        for ring in 1..=self.config.nearest_search_rings {
            let dist = ring as f64 * step;
            let samples = 8 * ring;
            let found = (0..samples)
                .map(|i| {
                    let angle = std::f64::consts::TAU * i as f64 / samples as f64;
                    p + DVec2::new(angle.cos(), angle.sin()) * dist
                })
                .filter(|q| self.in_bounds(*q) && self.is_valid_position(*q, radius))
                .min_by(|a, b| a.distance(p).total_cmp(&b.distance(p)));
            if found.is_some() {
                return found;
            }
        }
        None
    }
}

#[cfg(test)]
mod test {
    use glam::DVec2;

    use crate::{error::Error, math, navmesh::test::square, shape::test::rect, NavMesh};

    fn length(path: &[DVec2]) -> f64 {
        path.windows(2).map(|w| w[0].distance(w[1])).sum()
    }

    /// Check that no segment of the path passes through a blocked triangle.
    fn assert_clear(mesh: &NavMesh, path: &[DVec2]) {
        for w in path.windows(2) {
            for k in 0..=20 {
                let q = w[0].lerp(w[1], k as f64 / 20.);
                for f in mesh.triangles().filter(|f| !mesh.is_walkable(*f)) {
                    let [a, b, c] = mesh.triangle_points(f);
                    let strictly_inside = math::orient2d(a, b, q) > 1e-9
                        && math::orient2d(b, c, q) > 1e-9
                        && math::orient2d(c, a, q) > 1e-9;
                    assert!(!strictly_inside, "{} is inside an obstacle", q);
                }
            }
        }
    }

    fn obstacle_course() -> NavMesh {
        let mut mesh = square(10.);
        mesh.add_obstacle(&rect(4., 4., 6., 6.))
            .expect("Unable to add obstacle");
        mesh
    }

    #[test]
    fn t_path_around_obstacle() {
        let mesh = obstacle_course();
        let (start, goal) = (DVec2::new(1., 1.), DVec2::new(9., 9.));
        let path = mesh.find_path(start, goal, 0.4).expect("No path found");
        assert_eq!(path.first(), Some(&start));
        assert_eq!(path.last(), Some(&goal));
        assert!(path.len() > 2);
        assert!(length(&path) > start.distance(goal));
        assert_clear(&mesh, &path);
        // Bending around the obstacle keeps clear of its corners.
        for p in &path[1..path.len() - 1] {
            let nearest = rect(4., 4., 6., 6.)
                .iter()
                .map(|c| c.distance(*p))
                .fold(f64::INFINITY, f64::min);
            assert!(nearest > 0.4 - 1e-6);
        }
    }

    #[test]
    fn t_path_too_wide() {
        let mesh = obstacle_course();
        assert!(matches!(
            mesh.find_path(DVec2::new(1., 1.), DVec2::new(9., 9.), 5.),
            Err(Error::NoPathFound)
        ));
    }

    #[test]
    fn t_path_radius_monotonic() {
        let mut mesh = square(20.);
        mesh.add_obstacle(&rect(2., 8., 9.5, 12.))
            .expect("Unable to add obstacle");
        mesh.add_obstacle(&rect(10.5, 8., 18., 12.))
            .expect("Unable to add obstacle");
        let (start, goal) = (DVec2::new(10., 2.), DVec2::new(10., 18.));
        let mut last_ok = true;
        for r in [0., 0.1, 0.3, 0.45, 0.6, 1.5, 3.] {
            let ok = mesh.find_path(start, goal, r).is_ok();
            // Once a radius fails, every larger radius fails too.
            assert!(last_ok || !ok, "Radius {} succeeded after a failure", r);
            last_ok = ok;
        }
        // Straight through the one unit gap.
        let path = mesh.find_path(start, goal, 0.45).expect("No path found");
        assert_eq!(path.len(), 2);
        // Around the obstacles, since the gap is too narrow.
        let path = mesh.find_path(start, goal, 0.6).expect("No path found");
        assert!(length(&path) > 16.);
        assert_clear(&mesh, &path);
        assert!(mesh.find_path(start, goal, 3.).is_err());
    }

    #[test]
    fn t_path_same_triangle_and_blocked() {
        let mesh = obstacle_course();
        let path = mesh
            .find_path(DVec2::new(0.5, 0.2), DVec2::new(0.6, 0.3), 0.1)
            .expect("No path found");
        assert_eq!(path, vec![DVec2::new(0.5, 0.2), DVec2::new(0.6, 0.3)]);
        assert!(matches!(
            mesh.find_path(DVec2::new(1., 1.), DVec2::new(5., 5.), 0.),
            Err(Error::NoPathFound)
        ));
        assert!(matches!(
            mesh.find_path(DVec2::new(1., 1.), DVec2::new(15., 5.), 0.),
            Err(Error::NoContainingTriangle(_))
        ));
    }

    #[test]
    fn t_path_from_wall() {
        let mut mesh = square(10.);
        mesh.add_border_set(&[DVec2::new(2., 5.), DVec2::new(5., 5.)], false)
            .expect("Unable to add border set");
        // Standing on the wall, either side is one step away.
        let start = DVec2::new(3.5, 5.);
        for goal in [DVec2::new(3.5, 2.), DVec2::new(3.5, 8.)] {
            let path = mesh.find_path(start, goal, 0.1).expect("No path found");
            assert_eq!(path.first(), Some(&start));
            assert_eq!(path.last(), Some(&goal));
            assert!(length(&path) < 3. + 1e-6);
        }
    }

    #[test]
    fn t_valid_positions() {
        let mesh = obstacle_course();
        assert!(mesh.is_valid_position(DVec2::new(2., 2.), 0.5));
        assert!(!mesh.is_valid_position(DVec2::new(5., 5.), 0.));
        assert!(!mesh.is_valid_position(DVec2::new(3.8, 5.), 0.5));
        assert!(mesh.is_valid_position(DVec2::new(3.4, 5.), 0.5));
        // Too close to the outer boundary.
        assert!(!mesh.is_valid_position(DVec2::new(0.2, 5.), 0.5));
        assert!(!mesh.is_valid_position(DVec2::new(-1., 5.), 0.));
    }

    #[test]
    fn t_nearest_valid_position() {
        let mesh = obstacle_course();
        let p = DVec2::new(2., 2.);
        assert_eq!(mesh.nearest_valid_position(p, 0.5), Some(p));
        let q = mesh
            .nearest_valid_position(DVec2::new(5., 4.2), 0.5)
            .expect("No valid position");
        assert!(mesh.is_valid_position(q, 0.5));
        assert!(q.distance(DVec2::new(5., 4.2)) <= 1.5);
        // Nothing fits an agent wider than the world.
        assert_eq!(mesh.nearest_valid_position(p, 6.), None);
    }
}
