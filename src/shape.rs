use std::collections::HashSet;

use glam::DVec2;
use log::{debug, trace};

use crate::{
    earclip,
    element::{EH, FH, HH, Handle, VH},
    error::Error,
    iterator,
    math::{self, Intersection},
    navmesh::NavMesh,
};

/// A polygon carved into the mesh, stored as the loop of vertices given by
/// the caller. The edges between consecutive vertices may have been split by
/// later insertions, so the bounding halfedges are derived on demand.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Shape {
    pub(crate) vertices: Vec<VH>,
    pub(crate) closed: bool,
}

impl Shape {
    /// Consecutive pairs of vertices, including the closing pair of a closed
    /// shape.
    pub fn segments(&self) -> impl Iterator<Item = (VH, VH)> + use<'_> {
        let n = self.vertices.len();
        let count = if self.closed { n } else { n.saturating_sub(1) };
        (0..count).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }
}

/// Snapshot of an obstacle.
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub id: u32,
    /// Corners of the obstacle in counter-clockwise order.
    pub polygon: Vec<DVec2>,
}

/// Snapshot of a border set.
#[derive(Debug, Clone, PartialEq)]
pub struct BorderSet {
    pub id: u32,
    pub points: Vec<DVec2>,
    pub closed: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ShapeKind {
    Obstacle,
    BorderSet,
}

/// Same points, in any rotation and either direction for closed shapes.
fn same_polygon(a: &[DVec2], b: &[DVec2], closed: bool) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let n = a.len();
    if !closed {
        return a == b || a.iter().eq(b.iter().rev());
    }
    (0..n).any(|shift| {
        (0..n).all(|i| a[i] == b[(i + shift) % n]) || (0..n).all(|i| a[i] == b[(shift + n - i) % n])
    })
}

impl NavMesh {
    /// Clean up and validate a polygon provided by the caller.
    fn validate_shape(
        &self,
        points: &[DVec2],
        kind: ShapeKind,
        closed: bool,
    ) -> Result<Vec<DVec2>, Error> {
        let eps = self.config.epsilon;
        if points.iter().any(|p| !p.is_finite()) {
            return Err(Error::InvalidShape("The shape has non-finite coordinates"));
        }
        if !points.iter().all(|p| self.in_bounds(*p)) {
            return Err(Error::InvalidShape("The shape is not inside the bounds of the mesh"));
        }
        let mut poly: Vec<DVec2> = points.to_vec();
        poly.dedup_by(|a, b| a.distance(*b) <= eps);
        if closed && poly.len() > 1 && poly[0].distance(poly[poly.len() - 1]) <= eps {
            poly.pop();
        }
        let min = match kind {
            ShapeKind::Obstacle => 3,
            ShapeKind::BorderSet => 2,
        };
        if poly.len() < min {
            return Err(Error::InvalidShape("The shape doesn't have enough distinct points"));
        }
        let n = poly.len();
        let nseg = if closed { n } else { n - 1 };
        for i in 0..nseg {
            let (a, b) = (poly[i], poly[(i + 1) % n]);
            for j in (i + 1)..nseg {
                let (c, d) = (poly[j], poly[(j + 1) % n]);
                let adjacent = j == i + 1 || (closed && i == 0 && j == n - 1);
                match math::segment_intersection(a, b, c, d, eps) {
                    Intersection::None | Intersection::Parallel => {}
                    Intersection::FullyOverlaps => {
                        return Err(Error::InvalidShape("The shape overlaps itself"));
                    }
                    Intersection::Cross { .. } if adjacent => {}
                    Intersection::Cross { .. } => {
                        return Err(Error::InvalidShape("The shape intersects itself"));
                    }
                }
            }
        }
        if kind == ShapeKind::Obstacle {
            let area = math::signed_area(&poly);
            if area.abs() <= eps {
                return Err(Error::InvalidShape("The obstacle has no area"));
            }
            if area < 0. {
                poly.reverse();
            }
        }
        Ok(poly)
    }

    fn shape_points(&self, shape: &Shape) -> Vec<DVec2> {
        shape.vertices.iter().map(|v| self.topol.point(*v)).collect()
    }

    fn find_same_shape(&self, poly: &[DVec2], kind: ShapeKind, closed: bool) -> Option<u32> {
        let shapes = match kind {
            ShapeKind::Obstacle => &self.obstacles,
            ShapeKind::BorderSet => &self.border_sets,
        };
        shapes
            .iter()
            .find(|(_, s)| s.closed == closed && same_polygon(&self.shape_points(s), poly, closed))
            .map(|(id, _)| *id)
    }

    /// A constrained edge that one of the segments would cross at a point
    /// inside both of them. Touching at an endpoint is fine, since the vertex
    /// then splits the other segment.
    fn crossed_constraint(&self, poly: &[DVec2], closed: bool) -> Option<EH> {
        let eps = self.config.epsilon;
        let straddles = |a: DVec2, b: DVec2, p: DVec2, q: DVec2| {
            let (sp, sq) = (math::signed_distance(a, b, p), math::signed_distance(a, b, q));
            (sp > eps && sq < -eps) || (sp < -eps && sq > eps)
        };
        let walls: Vec<(EH, DVec2, DVec2)> = self
            .topol
            .edges()
            .filter(|e| self.topol.is_constrained(*e))
            .map(|e| {
                let (p, q) = self.topol.halfedge_points(e.halfedges().0);
                (e, p, q)
            })
            .collect();
        let n = poly.len();
        let nseg = if closed { n } else { n - 1 };
        (0..nseg).find_map(|i| {
            let (a, b) = (poly[i], poly[(i + 1) % n]);
            walls
                .iter()
                .find(|(_, p, q)| straddles(a, b, *p, *q) && straddles(*p, *q, a, b))
                .map(|(e, _, _)| *e)
        })
    }

    /// Insert the vertices and constrained edges of a validated polygon.
    /// Nothing is touched if the polygon crosses an existing constraint.
    fn carve(&mut self, poly: &[DVec2], closed: bool) -> Result<Shape, Error> {
        if let Some(e) = self.crossed_constraint(poly, closed) {
            return Err(Error::CrossedConstraint(e));
        }
        let mut vertices = Vec::with_capacity(poly.len());
        for p in poly {
            let (v, _) = self.insert_vertex(*p)?;
            vertices.push(v);
        }
        let shape = Shape { vertices, closed };
        for (a, b) in shape.segments() {
            self.constrain_between(a, b)?;
        }
        Ok(shape)
    }

    /// Carve a closed polygon into the mesh. The triangles inside it become
    /// non-walkable. Adding a polygon with the same corners as an existing
    /// obstacle returns the existing id.
    pub fn add_obstacle(&mut self, polygon: &[DVec2]) -> Result<u32, Error> {
        let poly = self.validate_shape(polygon, ShapeKind::Obstacle, true)?;
        if let Some(id) = self.find_same_shape(&poly, ShapeKind::Obstacle, true) {
            debug!("Obstacle {} already covers this polygon", id);
            return Ok(id);
        }
        let shape = match self.carve(&poly, true) {
            Ok(shape) => shape,
            Err(e) => {
                self.finish_mutation()?;
                return Err(e);
            }
        };
        let id = self.next_obstacle;
        self.next_obstacle += 1;
        debug!("Added obstacle {} with {} corners", id, poly.len());
        self.obstacles.insert(id, shape);
        self.finish_mutation()?;
        Ok(id)
    }

    /// Carve a chain of constrained edges into the mesh, closing it into a
    /// loop if `closed` is true. Border sets don't affect walkability.
    pub fn add_border_set(&mut self, points: &[DVec2], closed: bool) -> Result<u32, Error> {
        let poly = self.validate_shape(points, ShapeKind::BorderSet, closed)?;
        if let Some(id) = self.find_same_shape(&poly, ShapeKind::BorderSet, closed) {
            debug!("Border set {} already covers these points", id);
            return Ok(id);
        }
        let shape = match self.carve(&poly, closed) {
            Ok(shape) => shape,
            Err(e) => {
                self.finish_mutation()?;
                return Err(e);
            }
        };
        let id = self.next_border_set;
        self.next_border_set += 1;
        debug!("Added border set {} with {} points", id, poly.len());
        self.border_sets.insert(id, shape);
        self.finish_mutation()?;
        Ok(id)
    }

    /// Remove an obstacle. Its boundary edges are released unless another
    /// shape or the mesh boundary runs along them, and corners nothing else
    /// uses are dissolved.
    pub fn remove_obstacle(&mut self, id: u32) -> Result<(), Error> {
        let shape = self
            .obstacles
            .remove(&id)
            .ok_or(Error::ObstacleNotFound(id))?;
        debug!("Removing obstacle {}", id);
        self.uncarve(&shape)?;
        self.finish_mutation()
    }

    pub fn remove_border_set(&mut self, id: u32) -> Result<(), Error> {
        let shape = self
            .border_sets
            .remove(&id)
            .ok_or(Error::BorderSetNotFound(id))?;
        debug!("Removing border set {}", id);
        self.uncarve(&shape)?;
        self.finish_mutation()
    }

    pub fn obstacle(&self, id: u32) -> Option<Obstacle> {
        self.obstacles.get(&id).map(|s| Obstacle {
            id,
            polygon: self.shape_points(s),
        })
    }

    pub fn border_set(&self, id: u32) -> Option<BorderSet> {
        self.border_sets.get(&id).map(|s| BorderSet {
            id,
            points: self.shape_points(s),
            closed: s.closed,
        })
    }

    pub fn obstacles(&self) -> impl Iterator<Item = Obstacle> + use<'_> {
        self.obstacles.iter().map(|(id, s)| Obstacle {
            id: *id,
            polygon: self.shape_points(s),
        })
    }

    pub fn border_sets(&self) -> impl Iterator<Item = BorderSet> + use<'_> {
        self.border_sets.iter().map(|(id, s)| BorderSet {
            id: *id,
            points: self.shape_points(s),
            closed: s.closed,
        })
    }

    /// The halfedges running from `a` to `b` along a straight line.
    fn straight_path(&self, a: VH, b: VH, out: &mut Vec<HH>) -> Result<(), Error> {
        let eps = self.config.epsilon;
        let (pa, pb) = (self.topol.point(a), self.topol.point(b));
        let mut cur = a;
        let mut remaining = pa.distance(pb);
        while cur != b {
            let next = self
                .topol
                .outgoing(cur)
                .iter()
                .copied()
                .find(|h| {
                    let w = self.topol.point(self.topol.to_vertex(*h));
                    math::signed_distance(pa, pb, w).abs() <= eps
                        && w.distance(pb) < remaining
                })
                .ok_or(Error::InvalidTopology(format!(
                    "The edges from {} to {} are missing",
                    a, b
                )))?;
            cur = self.topol.to_vertex(next);
            remaining = self.topol.point(cur).distance(pb);
            out.push(next);
        }
        Ok(())
    }

    /// Bounding halfedges of the shape in order. For obstacles, the interior
    /// is to the left of every halfedge.
    pub(crate) fn shape_path(&self, shape: &Shape) -> Result<Vec<HH>, Error> {
        let mut path = Vec::new();
        for (a, b) in shape.segments() {
            self.straight_path(a, b, &mut path)?;
        }
        Ok(path)
    }

    /// Recompute the walkable flag of every triangle, by flooding the inside
    /// of each obstacle from its boundary.
    pub(crate) fn refresh_walkability(&mut self) -> Result<(), Error> {
        let faces: Vec<FH> = self.topol.faces().collect();
        for f in &faces {
            self.topol.set_blocked(*f, false);
        }
        let mut blocked = vec![false; self.topol.face_slots()];
        for shape in self.obstacles.values() {
            let path = self.shape_path(shape)?;
            let boundary: HashSet<EH> = path.iter().map(|h| h.edge()).collect();
            let mut stack: Vec<FH> = path
                .iter()
                .filter_map(|h| self.topol.halfedge_face(*h))
                .collect();
            let mut visited = vec![false; self.topol.face_slots()];
            while let Some(f) = stack.pop() {
                if std::mem::replace(&mut visited[f.index() as usize], true) {
                    continue;
                }
                blocked[f.index() as usize] = true;
                for h in iterator::fh_iter(&self.topol, f) {
                    if boundary.contains(&h.edge()) {
                        continue;
                    }
                    if let Some(nf) = self.topol.halfedge_face(h.pair()) {
                        if !visited[nf.index() as usize] {
                            stack.push(nf);
                        }
                    }
                }
            }
        }
        for f in faces {
            if blocked[f.index() as usize] {
                self.topol.set_blocked(f, true);
            }
        }
        Ok(())
    }

    /// Triangles enclosed by an obstacle.
    pub fn obstacle_triangles(&self, id: u32) -> Result<Vec<FH>, Error> {
        let shape = self.obstacles.get(&id).ok_or(Error::ObstacleNotFound(id))?;
        let path = self.shape_path(shape)?;
        let boundary: HashSet<EH> = path.iter().map(|h| h.edge()).collect();
        let mut visited = vec![false; self.topol.face_slots()];
        let mut stack: Vec<FH> = path
            .iter()
            .filter_map(|h| self.topol.halfedge_face(*h))
            .collect();
        let mut out = Vec::new();
        while let Some(f) = stack.pop() {
            if std::mem::replace(&mut visited[f.index() as usize], true) {
                continue;
            }
            out.push(f);
            for h in iterator::fh_iter(&self.topol, f) {
                if !boundary.contains(&h.edge()) {
                    stack.extend(self.topol.halfedge_face(h.pair()));
                }
            }
        }
        Ok(out)
    }

    /// Edges that must stay constrained regardless of which shapes exist.
    fn shape_edges(&self) -> Result<HashSet<EH>, Error> {
        let mut edges = HashSet::new();
        for shape in self.obstacles.values().chain(self.border_sets.values()) {
            edges.extend(self.shape_path(shape)?.into_iter().map(|h| h.edge()));
        }
        Ok(edges)
    }

    /// Release the constraints of a shape that was already removed from the
    /// registry, and dissolve the vertices nothing else needs.
    fn uncarve(&mut self, shape: &Shape) -> Result<(), Error> {
        let path = self.shape_path(shape)?;
        let keep = self.shape_edges()?;
        let mut released = Vec::new();
        for h in &path {
            let e = h.edge();
            if !keep.contains(&e) && !self.topol.is_boundary_edge(e) {
                self.topol.set_constrained(e, false);
                released.push(*h);
            }
        }
        // Vertices shared with other shapes stay, so the released edges
        // between them must be made Delaunay here.
        self.legalize(released)?;
        let used: HashSet<VH> = self
            .obstacles
            .values()
            .chain(self.border_sets.values())
            .flat_map(|s| s.vertices.iter().copied())
            .collect();
        let mut candidates = shape.vertices.clone();
        candidates.sort();
        candidates.dedup();
        for v in candidates {
            if !used.contains(&v) {
                self.dissolve_vertex(v)?;
            }
        }
        Ok(())
    }

    /// Remove an interior vertex that is not on any constrained edge, and
    /// fill the hole by ear clipping. Returns false if the vertex must stay.
    pub(crate) fn dissolve_vertex(&mut self, v: VH) -> Result<bool, Error> {
        if !self.topol.is_valid_vertex(v)
            || self.is_border_vertex(v)
            || iterator::ve_iter(&self.topol, v).any(|e| self.topol.is_constrained(e))
        {
            return Ok(false);
        }
        let Some(ring) = self.topol.vertex_ring(v) else {
            return Ok(false);
        };
        trace!("Dissolving {} with {} neighbours", v, ring.len());
        let points: Vec<DVec2> = ring.iter().map(|u| self.topol.point(*u)).collect();
        let tris = earclip::ear_clip(&points)?;
        let spokes: Vec<EH> = iterator::ve_iter(&self.topol, v).collect();
        let faces: Vec<FH> = iterator::vf_iter(&self.topol, v).collect();
        for f in faces {
            self.destroy_triangle(f);
        }
        self.topol.remove_orphan_edges(&spokes)?;
        self.topol.remove_vertex(v)?;
        let mut fresh = Vec::with_capacity(tris.len() * 3);
        for [a, b, c] in tris {
            let f = self.create_triangle(ring[a], ring[b], ring[c])?;
            fresh.extend(iterator::fh_iter(&self.topol, f));
        }
        self.legalize(fresh)?;
        Ok(true)
    }
}
