use std::{cmp::Ordering, collections::BTreeMap};

use glam::DVec2;

use crate::{
    element::{Edge, Face, Halfedge, Handle, Vertex, EH, FH, HH, VH},
    error::Error,
    iterator,
    status::Status,
};

/// Lexicographic (x, then y) ordering of vertex positions.
#[derive(Copy, Clone, Debug)]
pub(crate) struct PointKey(DVec2);

impl PointKey {
    pub fn new(pos: DVec2) -> Self {
        // Adding zero folds negative zero into positive zero.
        PointKey(DVec2::new(pos.x + 0., pos.y + 0.))
    }
}

impl PartialEq for PointKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PointKey {}

impl PartialOrd for PointKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PointKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .x
            .total_cmp(&other.0.x)
            .then(self.0.y.total_cmp(&other.0.y))
    }
}

/// Arena backed halfedge store. Deleted slots are kept on free lists and
/// recycled by later insertions.
#[derive(Default, Clone)]
pub(crate) struct Topology {
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) faces: Vec<Face>,
    pub(crate) free_vertices: Vec<u32>,
    pub(crate) free_edges: Vec<u32>,
    pub(crate) free_faces: Vec<u32>,
    pub(crate) positions: BTreeMap<PointKey, VH>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.edges.clear();
        self.faces.clear();
        self.free_vertices.clear();
        self.free_edges.clear();
        self.free_faces.clear();
        self.positions.clear();
    }

    pub(crate) fn vertex(&self, v: VH) -> &Vertex {
        &self.vertices[v.index() as usize]
    }

    fn vertex_mut(&mut self, v: VH) -> &mut Vertex {
        &mut self.vertices[v.index() as usize]
    }

    pub(crate) fn halfedge(&self, h: HH) -> &Halfedge {
        &self.edges[(h.index() >> 1) as usize].halfedges[(h.index() & 1) as usize]
    }

    fn halfedge_mut(&mut self, h: HH) -> &mut Halfedge {
        &mut self.edges[(h.index() >> 1) as usize].halfedges[(h.index() & 1) as usize]
    }

    pub(crate) fn edge(&self, e: EH) -> &Edge {
        &self.edges[e.index() as usize]
    }

    pub(crate) fn face(&self, f: FH) -> &Face {
        &self.faces[f.index() as usize]
    }

    fn face_mut(&mut self, f: FH) -> &mut Face {
        &mut self.faces[f.index() as usize]
    }

    /// Number of vertex slots, including deleted ones.
    pub fn vertex_slots(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_slots(&self) -> usize {
        self.edges.len()
    }

    pub fn face_slots(&self) -> usize {
        self.faces.len()
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len() - self.free_vertices.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len() - self.free_edges.len()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len() - self.free_faces.len()
    }

    pub fn is_valid_vertex(&self, v: VH) -> bool {
        (v.index() as usize) < self.vertices.len() && !self.vertex(v).status.deleted()
    }

    pub fn is_valid_edge(&self, e: EH) -> bool {
        (e.index() as usize) < self.edges.len() && !self.edge(e).status.deleted()
    }

    pub fn is_valid_halfedge(&self, h: HH) -> bool {
        self.is_valid_edge(h.edge())
    }

    pub fn is_valid_face(&self, f: FH) -> bool {
        (f.index() as usize) < self.faces.len() && !self.face(f).status.deleted()
    }

    pub fn vertices(&self) -> impl Iterator<Item = VH> + use<'_> {
        (0..(self.vertices.len() as u32))
            .map(VH::from)
            .filter(|v| !self.vertex(*v).status.deleted())
    }

    pub fn edges(&self) -> impl Iterator<Item = EH> + use<'_> {
        (0..(self.edges.len() as u32))
            .map(EH::from)
            .filter(|e| !self.edge(*e).status.deleted())
    }

    pub fn halfedges(&self) -> impl Iterator<Item = HH> + use<'_> {
        self.edges().flat_map(|e| {
            let (h, oh) = e.halfedges();
            [h, oh]
        })
    }

    pub fn faces(&self) -> impl Iterator<Item = FH> + use<'_> {
        (0..(self.faces.len() as u32))
            .map(FH::from)
            .filter(|f| !self.face(*f).status.deleted())
    }

    pub fn point(&self, v: VH) -> DVec2 {
        self.vertex(v).pos
    }

    pub fn vertex_at(&self, pos: DVec2) -> Option<VH> {
        self.positions.get(&PointKey::new(pos)).copied()
    }

    pub fn outgoing(&self, v: VH) -> &[HH] {
        &self.vertex(v).outgoing
    }

    pub fn to_vertex(&self, h: HH) -> VH {
        self.halfedge(h).vertex
    }

    pub fn from_vertex(&self, h: HH) -> VH {
        self.halfedge(h.pair()).vertex
    }

    pub fn next_halfedge(&self, h: HH) -> HH {
        self.halfedge(h).next
    }

    /// Only meaningful for halfedges bounding a triangle.
    pub fn prev_halfedge(&self, h: HH) -> HH {
        self.next_halfedge(self.next_halfedge(h))
    }

    pub fn halfedge_face(&self, h: HH) -> Option<FH> {
        self.halfedge(h).face
    }

    pub fn face_halfedge(&self, f: FH) -> HH {
        self.face(f).halfedge
    }

    pub fn is_boundary_halfedge(&self, h: HH) -> bool {
        self.halfedge(h).face.is_none()
    }

    pub fn is_boundary_edge(&self, e: EH) -> bool {
        let (h, oh) = e.halfedges();
        self.is_boundary_halfedge(h) || self.is_boundary_halfedge(oh)
    }

    pub fn is_constrained(&self, e: EH) -> bool {
        self.edge(e).status.constrained()
    }

    pub fn set_constrained(&mut self, e: EH, flag: bool) {
        self.edges[e.index() as usize].status.set_constrained(flag);
    }

    pub fn is_blocked(&self, f: FH) -> bool {
        self.face(f).status.blocked()
    }

    pub fn set_blocked(&mut self, f: FH, flag: bool) {
        self.face_mut(f).status.set_blocked(flag);
    }

    pub fn face_halfedges(&self, f: FH) -> [HH; 3] {
        let h0 = self.face_halfedge(f);
        let h1 = self.next_halfedge(h0);
        [h0, h1, self.next_halfedge(h1)]
    }

    /// Vertices of the triangle, in counter-clockwise order. The first vertex
    /// is the source of the face's representative halfedge.
    pub fn face_vertices(&self, f: FH) -> [VH; 3] {
        let [h0, h1, h2] = self.face_halfedges(f);
        [self.to_vertex(h2), self.to_vertex(h0), self.to_vertex(h1)]
    }

    pub fn face_points(&self, f: FH) -> [DVec2; 3] {
        self.face_vertices(f).map(|v| self.point(v))
    }

    pub fn halfedge_points(&self, h: HH) -> (DVec2, DVec2) {
        (
            self.point(self.from_vertex(h)),
            self.point(self.to_vertex(h)),
        )
    }

    /// Any live face, used to seed walks when nothing better is known.
    pub fn any_face(&self) -> Option<FH> {
        self.faces().next()
    }

    pub fn find_halfedge(&self, from: VH, to: VH) -> Option<HH> {
        self.outgoing(from)
            .iter()
            .copied()
            .find(|h| self.to_vertex(*h) == to)
    }

    pub fn add_vertex(&mut self, pos: DVec2) -> Result<VH, Error> {
        let key = PointKey::new(pos);
        if self.positions.contains_key(&key) {
            return Err(Error::DuplicateVertex(pos));
        }
        let vertex = Vertex {
            pos,
            outgoing: Vec::new(),
            status: Status::default(),
        };
        let v: VH = match self.free_vertices.pop() {
            Some(vi) => {
                self.vertices[vi as usize] = vertex;
                vi.into()
            }
            None => {
                self.vertices.push(vertex);
                ((self.vertices.len() - 1) as u32).into()
            }
        };
        self.positions.insert(key, v);
        Ok(v)
    }

    /// Delete an isolated vertex.
    pub fn remove_vertex(&mut self, v: VH) -> Result<(), Error> {
        if !self.outgoing(v).is_empty() {
            return Err(Error::VertexNotRemovable(v));
        }
        let pos = self.point(v);
        self.positions.remove(&PointKey::new(pos));
        self.vertex_mut(v).status.set_deleted(true);
        self.free_vertices.push(v.index());
        Ok(())
    }

    /// Create a new edge between the vertices, returning the halfedge going
    /// from `from` to `to`.
    pub fn add_edge(&mut self, from: VH, to: VH) -> HH {
        let ei = match self.free_edges.pop() {
            Some(ei) => ei,
            None => {
                self.edges.push(Edge {
                    halfedges: [Halfedge {
                        face: None,
                        vertex: to,
                        next: 0.into(),
                    }; 2],
                    status: Status::default(),
                });
                (self.edges.len() - 1) as u32
            }
        };
        let e: EH = ei.into();
        let (h, oh) = e.halfedges();
        self.edges[ei as usize] = Edge {
            halfedges: [
                Halfedge {
                    face: None,
                    vertex: to,
                    next: h,
                },
                Halfedge {
                    face: None,
                    vertex: from,
                    next: oh,
                },
            ],
            status: Status::default(),
        };
        self.vertex_mut(from).outgoing.push(h);
        self.vertex_mut(to).outgoing.push(oh);
        h
    }

    /// Delete an edge. Neither of its halfedges may bound a face.
    pub fn remove_edge(&mut self, e: EH) -> Result<(), Error> {
        if !self.is_valid_edge(e) {
            return Err(Error::InvalidTopology(format!("{} is already deleted", e)));
        }
        let (h, oh) = e.halfedges();
        if !self.is_boundary_halfedge(h) || !self.is_boundary_halfedge(oh) {
            return Err(Error::EdgeInUse(e));
        }
        for h in [h, oh] {
            let from = self.from_vertex(h);
            let outgoing = &mut self.vertex_mut(from).outgoing;
            if let Some(pos) = outgoing.iter().position(|o| *o == h) {
                outgoing.swap_remove(pos);
            }
        }
        self.edges[e.index() as usize].status = {
            let mut status = Status::default();
            status.set_deleted(true);
            status
        };
        self.free_edges.push(e.index());
        Ok(())
    }

    /// Create a face bounded by the given loop of three halfedges.
    pub fn add_face(&mut self, loop_halfedges: [HH; 3]) -> Result<FH, Error> {
        for (i, h) in loop_halfedges.iter().enumerate() {
            if !self.is_boundary_halfedge(*h) {
                return Err(Error::HalfedgeNotFree(*h));
            }
            let next = loop_halfedges[(i + 1) % 3];
            if self.to_vertex(*h) != self.from_vertex(next) {
                return Err(Error::InvalidTopology(format!(
                    "{} and {} don't form a loop",
                    h, next
                )));
            }
        }
        let face = Face::new(loop_halfedges[0]);
        let f: FH = match self.free_faces.pop() {
            Some(fi) => {
                self.faces[fi as usize] = face;
                fi.into()
            }
            None => {
                self.faces.push(face);
                ((self.faces.len() - 1) as u32).into()
            }
        };
        for i in 0..3 {
            let h = loop_halfedges[i];
            let he = self.halfedge_mut(h);
            he.face = Some(f);
            he.next = loop_halfedges[(i + 1) % 3];
        }
        Ok(f)
    }

    /// Delete a face, leaving its halfedges free. Returns the halfedges that
    /// bounded it.
    pub fn remove_face(&mut self, f: FH) -> [HH; 3] {
        let hs = self.face_halfedges(f);
        for h in hs {
            let he = self.halfedge_mut(h);
            he.face = None;
            he.next = h;
        }
        let face = self.face_mut(f);
        face.status = Status::default();
        face.status.set_deleted(true);
        face.invalidate_widths();
        self.free_faces.push(f.index());
        hs
    }

    fn find_or_add_edge(&mut self, from: VH, to: VH) -> HH {
        match self.find_halfedge(from, to) {
            Some(h) => h,
            None => self.add_edge(from, to),
        }
    }

    /// Create the triangle `(a, b, c)`, which must wind counter-clockwise.
    /// Missing edges are created. If the three halfedges already bound a
    /// common face, that face is returned instead.
    pub fn make_triangle(&mut self, a: VH, b: VH, c: VH) -> Result<FH, Error> {
        let hs = [
            self.find_or_add_edge(a, b),
            self.find_or_add_edge(b, c),
            self.find_or_add_edge(c, a),
        ];
        if let [Some(f0), Some(f1), Some(f2)] = hs.map(|h| self.halfedge_face(h)) {
            if f0 == f1 && f1 == f2 {
                return Ok(f0);
            }
        }
        self.add_face(hs)
    }

    /// Delete every edge in `candidates` that no longer bounds any face.
    pub fn remove_orphan_edges(&mut self, candidates: &[EH]) -> Result<(), Error> {
        for e in candidates {
            if self.is_valid_edge(*e) {
                let (h, oh) = e.halfedges();
                if self.is_boundary_halfedge(h) && self.is_boundary_halfedge(oh) {
                    self.remove_edge(*e)?;
                }
            }
        }
        Ok(())
    }

    /// Neighbours of an interior vertex in counter-clockwise order. Returns
    /// `None` if the vertex is on the boundary of the triangulation.
    pub fn vertex_ring(&self, v: VH) -> Option<Vec<VH>> {
        let valence = self.outgoing(v).len();
        let ring: Vec<VH> = iterator::voh_ccw_iter(self, v)
            .take(valence + 1)
            .map(|h| self.to_vertex(h))
            .collect();
        if ring.len() == valence
            && valence >= 3
            && self
                .outgoing(v)
                .iter()
                .all(|h| !self.is_boundary_halfedge(*h) && !self.is_boundary_halfedge(h.pair()))
        {
            Some(ring)
        } else {
            None
        }
    }

    /// All faces reachable from `seed` by crossing edges, i.e. the connected
    /// component of the triangulation containing `seed`.
    pub fn connected_faces(&self, seed: FH) -> Vec<FH> {
        let mut visited = vec![false; self.faces.len()];
        let mut out = Vec::new();
        let mut stack = vec![seed];
        visited[seed.index() as usize] = true;
        while let Some(f) = stack.pop() {
            out.push(f);
            for nf in iterator::ff_iter(self, f) {
                if !std::mem::replace(&mut visited[nf.index() as usize], true) {
                    stack.push(nf);
                }
            }
        }
        out
    }
}

#[cfg(test)]
pub(crate) mod test {
    use glam::DVec2;

    use super::Topology;
    use crate::{
        element::{Handle, VH},
        error::Error,
    };

    /// A unit square split into four triangles around its center.
    /// ```text
    ///   3-----------2
    ///   | \       / |
    ///   |   \   /   |
    ///   |     4     |
    ///   |   /   \   |
    ///   | /       \ |
    ///   0-----------1
    /// ```
    pub(crate) fn fan() -> Topology {
        let mut topol = Topology::new();
        let verts: Vec<VH> = [(0., 0.), (1., 0.), (1., 1.), (0., 1.), (0.5, 0.5)]
            .iter()
            .map(|(x, y)| {
                topol
                    .add_vertex(DVec2::new(*x, *y))
                    .expect("Unable to add vertex")
            })
            .collect();
        for i in 0..4 {
            topol
                .make_triangle(verts[i], verts[(i + 1) % 4], verts[4])
                .expect("Unable to add triangle");
        }
        topol
    }

    #[test]
    fn t_fan_counts() {
        let topol = fan();
        assert_eq!(topol.num_vertices(), 5);
        assert_eq!(topol.num_edges(), 8);
        assert_eq!(topol.num_faces(), 4);
        assert_eq!(
            topol
                .edges()
                .filter(|e| topol.is_boundary_edge(*e))
                .count(),
            4
        );
        for h in topol.halfedges() {
            assert_eq!(h.pair().pair(), h);
            if let Some(f) = topol.halfedge_face(h) {
                let n = topol.next_halfedge(h);
                assert_eq!(topol.halfedge_face(n), Some(f));
                assert_eq!(topol.next_halfedge(topol.next_halfedge(n)), h);
                assert_eq!(topol.to_vertex(h), topol.from_vertex(n));
            }
        }
    }

    #[test]
    fn t_duplicate_vertex() {
        let mut topol = fan();
        assert!(matches!(
            topol.add_vertex(DVec2::new(0.5, 0.5)),
            Err(Error::DuplicateVertex(_))
        ));
        // Negative zero is the same position.
        assert!(matches!(
            topol.add_vertex(DVec2::new(-0., 0.)),
            Err(Error::DuplicateVertex(_))
        ));
    }

    #[test]
    fn t_make_triangle_idempotent() {
        let mut topol = fan();
        let f = topol
            .make_triangle(0.into(), 1.into(), 4.into())
            .expect("Unable to find triangle");
        assert_eq!(topol.num_faces(), 4);
        assert_eq!(f.index(), 0);
        // Rotated vertex order names the same face.
        let f2 = topol
            .make_triangle(4.into(), 0.into(), 1.into())
            .expect("Unable to find triangle");
        assert_eq!(f, f2);
    }

    #[test]
    fn t_vertex_ring() {
        let topol = fan();
        let ring = topol.vertex_ring(4.into()).expect("Center is interior");
        assert_eq!(ring.len(), 4);
        // Counter-clockwise: each consecutive pair forms a face with the center.
        for i in 0..4 {
            let (a, b) = (ring[i], ring[(i + 1) % 4]);
            let h = topol.find_halfedge(a, b).expect("Cannot find halfedge");
            let f = topol.halfedge_face(h).expect("Missing face");
            assert!(topol.face_vertices(f).contains(&4.into()));
        }
        assert!(topol.vertex_ring(0.into()).is_none());
    }

    #[test]
    fn t_remove_and_recycle() {
        let mut topol = fan();
        let f = topol
            .halfedge_face(
                topol
                    .find_halfedge(0.into(), 1.into())
                    .expect("Cannot find halfedge"),
            )
            .expect("Missing face");
        let hs = topol.remove_face(f);
        assert_eq!(topol.num_faces(), 3);
        // The boundary edge now has no face at all.
        let e = hs[0].edge();
        assert!(topol.is_boundary_halfedge(hs[0]) && topol.is_boundary_halfedge(hs[0].pair()));
        topol
            .remove_orphan_edges(&hs.map(|h| h.edge()))
            .expect("Unable to remove edges");
        assert!(!topol.is_valid_edge(e));
        assert_eq!(topol.num_edges(), 7);
        // Slots are recycled.
        let f2 = topol
            .make_triangle(0.into(), 1.into(), 4.into())
            .expect("Unable to add triangle");
        assert_eq!(f2, f);
        assert_eq!(topol.num_edges(), 8);
        assert_eq!(topol.edge_slots(), 8);
    }

    #[test]
    fn t_remove_edge_in_use() {
        let mut topol = fan();
        let h = topol
            .find_halfedge(0.into(), 4.into())
            .expect("Cannot find halfedge");
        assert!(matches!(
            topol.remove_edge(h.edge()),
            Err(Error::EdgeInUse(_))
        ));
    }

    #[test]
    fn t_connected_faces() {
        let topol = fan();
        let seed = topol.any_face().expect("Mesh has faces");
        assert_eq!(topol.connected_faces(seed).len(), 4);
    }
}
