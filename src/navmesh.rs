use std::collections::BTreeMap;

use glam::DVec2;
use log::debug;

use crate::{
    config::NavMeshConfig,
    element::{EH, FH, HH, VH},
    error::Error,
    grid::TiledMap,
    iterator,
    shape::Shape,
    topol::Topology,
};

/// A constrained Delaunay triangulation of a rectangular world, with
/// obstacles and border sets carved into it, that answers path queries for
/// circular agents.
///
/// Every operation runs to completion before returning. The mesh has no
/// internal synchronization; wrap it in a lock to share it between threads.
#[derive(Clone)]
pub struct NavMesh {
    pub(crate) topol: Topology,
    pub(crate) grid: TiledMap,
    pub(crate) config: NavMeshConfig,
    pub(crate) min: DVec2,
    pub(crate) max: DVec2,
    /// Corners of the bounding rectangle, counter-clockwise from `min`.
    pub(crate) border: [VH; 4],
    pub(crate) obstacles: BTreeMap<u32, Shape>,
    pub(crate) border_sets: BTreeMap<u32, Shape>,
    pub(crate) next_obstacle: u32,
    pub(crate) next_border_set: u32,
}

impl NavMesh {
    /// Create a mesh covering the rectangle from `min` to `max`, with the
    /// default configuration.
    pub fn new(min: DVec2, max: DVec2) -> Result<Self, Error> {
        Self::with_config(min, max, NavMeshConfig::default())
    }

    pub fn with_config(min: DVec2, max: DVec2, config: NavMeshConfig) -> Result<Self, Error> {
        if !(min.is_finite() && max.is_finite() && min.x < max.x && min.y < max.y) {
            return Err(Error::InvalidShape("The bounds must enclose a non-empty area"));
        }
        let mut mesh = NavMesh {
            topol: Topology::new(),
            grid: TiledMap::new(min, max, config.tile_size),
            config,
            min,
            max,
            border: [0.into(); 4],
            obstacles: BTreeMap::new(),
            border_sets: BTreeMap::new(),
            next_obstacle: 0,
            next_border_set: 0,
        };
        mesh.build_border()?;
        Ok(mesh)
    }

    fn build_border(&mut self) -> Result<(), Error> {
        let (min, max) = (self.min, self.max);
        let corners = [min, DVec2::new(max.x, min.y), max, DVec2::new(min.x, max.y)];
        for (i, p) in corners.into_iter().enumerate() {
            self.border[i] = self.topol.add_vertex(p)?;
        }
        let [v0, v1, v2, v3] = self.border;
        self.create_triangle(v0, v1, v3)?;
        self.create_triangle(v1, v2, v3)?;
        for i in 0..4 {
            let h = self
                .topol
                .find_halfedge(self.border[i], self.border[(i + 1) % 4])
                .ok_or(Error::InvalidTopology("Missing border edge".to_string()))?;
            self.topol.set_constrained(h.edge(), true);
        }
        Ok(())
    }

    /// Remove everything except the bounding rectangle, and reset all ids.
    pub fn clear(&mut self) -> Result<(), Error> {
        debug!("Clearing navigation mesh");
        self.topol.clear();
        self.grid.clear();
        self.obstacles.clear();
        self.border_sets.clear();
        self.next_obstacle = 0;
        self.next_border_set = 0;
        self.build_border()
    }

    pub fn config(&self) -> &NavMeshConfig {
        &self.config
    }

    /// Lower and upper corners of the bounding rectangle.
    pub fn bounds(&self) -> (DVec2, DVec2) {
        (self.min, self.max)
    }

    pub(crate) fn in_bounds(&self, p: DVec2) -> bool {
        let eps = self.config.epsilon;
        p.x >= self.min.x - eps
            && p.y >= self.min.y - eps
            && p.x <= self.max.x + eps
            && p.y <= self.max.y + eps
    }

    pub(crate) fn is_border_vertex(&self, v: VH) -> bool {
        self.border.contains(&v)
    }

    /// Create a triangle and register it with the tile grid.
    pub(crate) fn create_triangle(&mut self, a: VH, b: VH, c: VH) -> Result<FH, Error> {
        let f = self.topol.make_triangle(a, b, c)?;
        self.grid.rasterize(f, self.topol.face_points(f));
        Ok(f)
    }

    /// Delete a triangle and drop it from the tile grid. Returns the
    /// halfedges that bounded it.
    pub(crate) fn destroy_triangle(&mut self, f: FH) -> [HH; 3] {
        self.grid.unrasterize(f, self.topol.face_points(f));
        self.topol.remove_face(f)
    }

    /// Bring derived state up to date after a public mutation.
    pub(crate) fn finish_mutation(&mut self) -> Result<(), Error> {
        self.refresh_walkability()?;
        for f in self.topol.faces() {
            self.topol.face(f).invalidate_widths();
        }
        Ok(())
    }

    pub fn num_vertices(&self) -> usize {
        self.topol.num_vertices()
    }

    pub fn num_edges(&self) -> usize {
        self.topol.num_edges()
    }

    pub fn num_triangles(&self) -> usize {
        self.topol.num_faces()
    }

    pub fn vertices(&self) -> impl Iterator<Item = VH> + use<'_> {
        self.topol.vertices()
    }

    pub fn edges(&self) -> impl Iterator<Item = EH> + use<'_> {
        self.topol.edges()
    }

    pub fn triangles(&self) -> impl Iterator<Item = FH> + use<'_> {
        self.topol.faces()
    }

    pub fn point(&self, v: VH) -> DVec2 {
        self.topol.point(v)
    }

    /// The vertex at exactly this position, if any.
    pub fn vertex_at(&self, p: DVec2) -> Option<VH> {
        self.topol.vertex_at(p)
    }

    pub fn edge_vertices(&self, e: EH) -> (VH, VH) {
        let (h, _) = e.halfedges();
        (self.topol.from_vertex(h), self.topol.to_vertex(h))
    }

    pub fn edge_points(&self, e: EH) -> (DVec2, DVec2) {
        let (a, b) = self.edge_vertices(e);
        (self.topol.point(a), self.topol.point(b))
    }

    /// The edge between two vertices, if they are connected.
    pub fn find_edge(&self, a: VH, b: VH) -> Option<EH> {
        self.topol.find_halfedge(a, b).map(|h| h.edge())
    }

    /// Corners of the triangle in counter-clockwise order.
    pub fn triangle_vertices(&self, f: FH) -> [VH; 3] {
        self.topol.face_vertices(f)
    }

    pub fn triangle_points(&self, f: FH) -> [DVec2; 3] {
        self.topol.face_points(f)
    }

    /// Triangles sharing an edge with `f`.
    pub fn triangle_neighbors(&self, f: FH) -> impl Iterator<Item = FH> + use<'_> {
        iterator::ff_iter(&self.topol, f)
    }

    pub fn is_constrained(&self, e: EH) -> bool {
        self.topol.is_constrained(e)
    }

    pub fn is_boundary(&self, e: EH) -> bool {
        self.topol.is_boundary_edge(e)
    }

    pub fn is_walkable(&self, f: FH) -> bool {
        !self.topol.is_blocked(f)
    }

    pub fn is_valid_triangle(&self, f: FH) -> bool {
        self.topol.is_valid_face(f)
    }

    /// Clearance width of the triangle at its `corner`th vertex, in the order
    /// of [`Self::triangle_vertices`].
    pub fn clearance(&self, f: FH, corner: usize) -> f64 {
        // Corner i of `face_vertices` is the destination of halfedge i + 2.
        self.corner_width(f, (corner + 2) % 3)
    }

    /// Insert a point into the triangulation. Returns the vertex at that
    /// position, and whether it was newly created.
    pub fn insert_point(&mut self, p: DVec2) -> Result<(VH, bool), Error> {
        let out = self.insert_vertex(p)?;
        if out.1 {
            self.finish_mutation()?;
        }
        Ok(out)
    }

    /// Insert a constrained segment between two points. The segment is split
    /// at every vertex lying on it. The segment doesn't belong to any shape,
    /// so it stays until a removed shape releases the edges it shares with it.
    pub fn insert_constraint(&mut self, a: DVec2, b: DVec2) -> Result<(), Error> {
        self.insert_segment(a, b)?;
        self.finish_mutation()
    }

    /// Check every invariant of the mesh.
    pub fn check(&self) -> Result<(), Error> {
        crate::check::check_topology(&self.topol)?;
        crate::check::check_mesh(self)
    }
}
