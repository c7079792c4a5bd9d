/*!
Binary persistence of a navigation mesh.

All values are little-endian. After a short header, every section starts with
the high-water mark of the arena it describes and the number of records that
follow. Records carry their arena slot as id, so a mesh comes back with the
same ids, and the free slots are implied by the ids that are missing.

```text
header       magic "TNAV", u32 version, f64 min.x, min.y, max.x, max.y
border       u32 count (4), then (u32 vertex, f64 x, f64 y)
vertices     u32 slots, u32 count, then (u32 id, f64 x, f64 y)
halfedges    u32 slots, u32 count, then (u32 id, u32 dest, u32 next, u32 pair, u8 constrained)
triangles    u32 slots, u32 count, then (u32 id, u32 halfedge, u8 walkable)
obstacles    u32 next id, u32 count, then (u32 id, u32 n, n * u32 vertex, u32 m, m * u32 halfedge)
border sets  same as obstacles, with a u8 closed flag after the id
```
*/

use std::{
    collections::BTreeMap,
    io::{self, Read, Write},
};

use glam::DVec2;
use log::debug;

use crate::{
    check,
    config::NavMeshConfig,
    element::{Edge, Face, Halfedge, Handle, Vertex, EH, FH, HH, VH},
    error::Error,
    grid::TiledMap,
    navmesh::NavMesh,
    shape::Shape,
    status::Status,
    topol::{PointKey, Topology},
};

const MAGIC: &[u8; 4] = b"TNAV";
const VERSION: u32 = 1;
/// Largest arena a file may ask for.
const MAX_SLOTS: u32 = 1 << 26;

fn corrupt(msg: impl Into<String>) -> Error {
    Error::CorruptData(msg.into())
}

fn write_u8(w: &mut impl Write, val: u8) -> Result<(), Error> {
    w.write_all(&[val])?;
    Ok(())
}

fn write_u32(w: &mut impl Write, val: u32) -> Result<(), Error> {
    w.write_all(&val.to_le_bytes())?;
    Ok(())
}

fn write_f64(w: &mut impl Write, val: f64) -> Result<(), Error> {
    w.write_all(&val.to_le_bytes())?;
    Ok(())
}

fn write_point(w: &mut impl Write, p: DVec2) -> Result<(), Error> {
    write_f64(w, p.x)?;
    write_f64(w, p.y)
}

fn write_len(w: &mut impl Write, len: usize) -> Result<(), Error> {
    let len = u32::try_from(len).map_err(|_| corrupt("Too many records"))?;
    write_u32(w, len)
}

fn read_bytes<const N: usize>(r: &mut impl Read) -> Result<[u8; N], Error> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => corrupt("Unexpected end of data"),
        _ => Error::Io(e),
    })?;
    Ok(buf)
}

fn read_u8(r: &mut impl Read) -> Result<u8, Error> {
    Ok(read_bytes::<1>(r)?[0])
}

fn read_u32(r: &mut impl Read) -> Result<u32, Error> {
    Ok(u32::from_le_bytes(read_bytes(r)?))
}

fn read_f64(r: &mut impl Read) -> Result<f64, Error> {
    Ok(f64::from_le_bytes(read_bytes(r)?))
}

fn read_point(r: &mut impl Read) -> Result<DVec2, Error> {
    let x = read_f64(r)?;
    let y = read_f64(r)?;
    let p = DVec2::new(x, y);
    if !p.is_finite() {
        return Err(corrupt("Non-finite coordinate"));
    }
    Ok(p)
}

fn read_flag(r: &mut impl Read) -> Result<bool, Error> {
    match read_u8(r)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(corrupt(format!("Invalid flag {}", other))),
    }
}

/// Reads the slot count and record count that start every arena section.
fn read_section_header(r: &mut impl Read) -> Result<(u32, u32), Error> {
    let slots = read_u32(r)?;
    let count = read_u32(r)?;
    if slots > MAX_SLOTS || count > slots {
        return Err(corrupt(format!(
            "Section claims {} records in {} slots",
            count, slots
        )));
    }
    Ok((slots, count))
}

fn deleted_status() -> Status {
    let mut status = Status::default();
    status.set_deleted(true);
    status
}

fn write_shape(w: &mut impl Write, mesh: &NavMesh, shape: &Shape) -> Result<(), Error> {
    write_len(w, shape.vertices.len())?;
    for v in &shape.vertices {
        write_u32(w, v.index())?;
    }
    let path = mesh.shape_path(shape)?;
    write_len(w, path.len())?;
    for h in path {
        write_u32(w, h.index())?;
    }
    Ok(())
}

/// Shape as read from the file, checked against the topology once it is
/// complete.
struct ShapeRecord {
    id: u32,
    shape: Shape,
    path: Vec<HH>,
}

fn read_shape(
    r: &mut impl Read,
    topol: &Topology,
    id: u32,
    closed: bool,
) -> Result<ShapeRecord, Error> {
    let nverts = read_u32(r)?;
    if nverts > MAX_SLOTS {
        return Err(corrupt(format!("Shape {} is too large", id)));
    }
    let mut vertices = Vec::with_capacity(nverts as usize);
    for _ in 0..nverts {
        let v: VH = read_u32(r)?.into();
        if !topol.is_valid_vertex(v) {
            return Err(corrupt(format!("Shape {} references missing {}", id, v)));
        }
        vertices.push(v);
    }
    let nhalfedges = read_u32(r)?;
    if nhalfedges > MAX_SLOTS {
        return Err(corrupt(format!("Shape {} is too large", id)));
    }
    let mut path = Vec::with_capacity(nhalfedges as usize);
    for _ in 0..nhalfedges {
        path.push(HH::from(read_u32(r)?));
    }
    Ok(ShapeRecord {
        id,
        shape: Shape { vertices, closed },
        path,
    })
}

impl NavMesh {
    /// Write the mesh, including its obstacles and border sets.
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        debug!(
            "Saving navigation mesh with {} vertices and {} triangles",
            self.num_vertices(),
            self.num_triangles()
        );
        let topol = &self.topol;
        let w = writer;
        w.write_all(MAGIC)?;
        write_u32(w, VERSION)?;
        write_point(w, self.min)?;
        write_point(w, self.max)?;
        // Border markers.
        write_len(w, self.border.len())?;
        for v in self.border {
            write_u32(w, v.index())?;
            write_point(w, topol.point(v))?;
        }
        // Vertices.
        write_len(w, topol.vertex_slots())?;
        write_len(w, topol.num_vertices())?;
        for v in topol.vertices() {
            write_u32(w, v.index())?;
            write_point(w, topol.point(v))?;
        }
        // Halfedges.
        write_len(w, topol.edge_slots() * 2)?;
        write_len(w, topol.num_edges() * 2)?;
        for h in topol.halfedges() {
            write_u32(w, h.index())?;
            write_u32(w, topol.to_vertex(h).index())?;
            write_u32(w, topol.next_halfedge(h).index())?;
            write_u32(w, h.pair().index())?;
            write_u8(w, topol.is_constrained(h.edge()) as u8)?;
        }
        // Triangles.
        write_len(w, topol.face_slots())?;
        write_len(w, topol.num_faces())?;
        for f in topol.faces() {
            write_u32(w, f.index())?;
            write_u32(w, topol.face_halfedge(f).index())?;
            write_u8(w, !topol.is_blocked(f) as u8)?;
        }
        // Shapes.
        write_u32(w, self.next_obstacle)?;
        write_len(w, self.obstacles.len())?;
        for (id, shape) in &self.obstacles {
            write_u32(w, *id)?;
            write_shape(w, self, shape)?;
        }
        write_u32(w, self.next_border_set)?;
        write_len(w, self.border_sets.len())?;
        for (id, shape) in &self.border_sets {
            write_u32(w, *id)?;
            write_u8(w, shape.closed as u8)?;
            write_shape(w, self, shape)?;
        }
        Ok(())
    }

    /// Read a mesh written by [`Self::save`], with the default configuration.
    pub fn load<R: Read>(reader: &mut R) -> Result<Self, Error> {
        Self::load_with_config(reader, NavMeshConfig::default())
    }

    pub fn load_with_config<R: Read>(reader: &mut R, config: NavMeshConfig) -> Result<Self, Error> {
        let r = reader;
        if &read_bytes::<4>(r)? != MAGIC {
            return Err(corrupt("Not a navigation mesh"));
        }
        let version = read_u32(r)?;
        if version != VERSION {
            return Err(corrupt(format!("Unsupported version {}", version)));
        }
        let min = read_point(r)?;
        let max = read_point(r)?;
        if !(min.x < max.x && min.y < max.y) {
            return Err(corrupt("Empty bounds"));
        }
        // Border markers.
        if read_u32(r)? != 4 {
            return Err(corrupt("Expected four border markers"));
        }
        let mut border = [VH::from(0); 4];
        let mut corners = [DVec2::ZERO; 4];
        for i in 0..4 {
            border[i] = read_u32(r)?.into();
            corners[i] = read_point(r)?;
        }
        if corners != [min, DVec2::new(max.x, min.y), max, DVec2::new(min.x, max.y)] {
            return Err(corrupt("Border markers don't match the bounds"));
        }
        let mut topol = Topology::new();
        read_vertices(r, &mut topol)?;
        read_halfedges(r, &mut topol)?;
        read_triangles(r, &mut topol)?;
        for (v, p) in border.iter().zip(corners) {
            if !topol.is_valid_vertex(*v) || topol.point(*v) != p {
                return Err(corrupt(format!("Border marker {} is not at its corner", v)));
            }
        }
        // Shapes.
        let next_obstacle = read_u32(r)?;
        let count = read_u32(r)?;
        let mut records = Vec::new();
        for _ in 0..count {
            let id = read_u32(r)?;
            records.push((true, read_shape(r, &topol, id, true)?));
        }
        let next_border_set = read_u32(r)?;
        let count = read_u32(r)?;
        for _ in 0..count {
            let id = read_u32(r)?;
            let closed = read_flag(r)?;
            records.push((false, read_shape(r, &topol, id, closed)?));
        }
        let mut mesh = NavMesh {
            topol,
            grid: TiledMap::new(min, max, config.tile_size),
            config,
            min,
            max,
            border,
            obstacles: BTreeMap::new(),
            border_sets: BTreeMap::new(),
            next_obstacle,
            next_border_set,
        };
        for (is_obstacle, rec) in records {
            let (map, next) = if is_obstacle {
                (&mut mesh.obstacles, next_obstacle)
            } else {
                (&mut mesh.border_sets, next_border_set)
            };
            if rec.id >= next || map.insert(rec.id, rec.shape.clone()).is_some() {
                return Err(corrupt(format!("Invalid shape id {}", rec.id)));
            }
            let path = mesh
                .shape_path(&rec.shape)
                .map_err(|e| corrupt(format!("Shape {}: {}", rec.id, e)))?;
            if path != rec.path {
                return Err(corrupt(format!(
                    "Shape {} doesn't match its edges",
                    rec.id
                )));
            }
        }
        let faces: Vec<FH> = mesh.topol.faces().collect();
        for f in faces {
            mesh.grid.rasterize(f, mesh.topol.face_points(f));
        }
        check::check_topology(&mesh.topol)
            .and_then(|_| check::check_mesh(&mesh))
            .map_err(|e| corrupt(e.to_string()))?;
        debug!(
            "Loaded navigation mesh with {} vertices and {} triangles",
            mesh.num_vertices(),
            mesh.num_triangles()
        );
        Ok(mesh)
    }
}

fn read_vertices(r: &mut impl Read, topol: &mut Topology) -> Result<(), Error> {
    let (slots, count) = read_section_header(r)?;
    topol.vertices = (0..slots)
        .map(|_| Vertex {
            pos: DVec2::ZERO,
            outgoing: Vec::new(),
            status: deleted_status(),
        })
        .collect();
    for _ in 0..count {
        let v: VH = read_u32(r)?.into();
        let pos = read_point(r)?;
        if v.index() >= slots || !topol.vertices[v.index() as usize].status.deleted() {
            return Err(corrupt(format!("Invalid vertex id {}", v)));
        }
        if topol.positions.insert(PointKey::new(pos), v).is_some() {
            return Err(corrupt(format!("Duplicate vertex at {}", pos)));
        }
        let vertex = &mut topol.vertices[v.index() as usize];
        vertex.pos = pos;
        vertex.status = Status::default();
    }
    topol.free_vertices = (0..slots)
        .rev()
        .filter(|i| topol.vertices[*i as usize].status.deleted())
        .collect();
    Ok(())
}

fn read_halfedges(r: &mut impl Read, topol: &mut Topology) -> Result<(), Error> {
    let (slots, count) = read_section_header(r)?;
    if slots % 2 != 0 || count % 2 != 0 {
        return Err(corrupt("Halfedges must come in pairs"));
    }
    topol.edges = (0..(slots / 2))
        .map(|ei| {
            let (h, oh) = EH::from(ei).halfedges();
            Edge {
                halfedges: [
                    Halfedge {
                        face: None,
                        vertex: 0.into(),
                        next: h,
                    },
                    Halfedge {
                        face: None,
                        vertex: 0.into(),
                        next: oh,
                    },
                ],
                status: deleted_status(),
            }
        })
        .collect();
    let mut seen = vec![false; slots as usize];
    let mut constrained = vec![None; (slots / 2) as usize];
    for _ in 0..count {
        let h: HH = read_u32(r)?.into();
        let dest: VH = read_u32(r)?.into();
        let next: HH = read_u32(r)?.into();
        let pair: HH = read_u32(r)?.into();
        let flag = read_flag(r)?;
        if h.index() >= slots || std::mem::replace(&mut seen[h.index() as usize], true) {
            return Err(corrupt(format!("Invalid halfedge id {}", h)));
        }
        if pair != h.pair() {
            return Err(corrupt(format!("{} is not paired with {}", h, pair)));
        }
        if next.index() >= slots {
            return Err(corrupt(format!("{} links to missing {}", h, next)));
        }
        if !topol.is_valid_vertex(dest) {
            return Err(corrupt(format!("{} points to missing {}", h, dest)));
        }
        // Both halfedges of an edge carry the same flag.
        let ei = h.edge().index() as usize;
        if *constrained[ei].get_or_insert(flag) != flag {
            return Err(corrupt(format!("Inconsistent constraint on {}", h.edge())));
        }
        let he = &mut topol.edges[ei].halfedges[(h.index() & 1) as usize];
        he.vertex = dest;
        he.next = next;
    }
    for (ei, flag) in constrained.iter().enumerate() {
        let e = EH::from(ei as u32);
        let (h, oh) = e.halfedges();
        match (seen[h.index() as usize], seen[oh.index() as usize]) {
            (true, true) => {
                let mut status = Status::default();
                status.set_constrained(flag.unwrap_or(false));
                topol.edges[ei].status = status;
            }
            (false, false) => {}
            _ => return Err(corrupt(format!("{} is missing a halfedge", e))),
        }
    }
    for e in topol.edges().collect::<Vec<_>>() {
        let (h, oh) = e.halfedges();
        for h in [h, oh] {
            let from = topol.from_vertex(h);
            topol.vertices[from.index() as usize].outgoing.push(h);
        }
    }
    topol.free_edges = (0..(slots / 2))
        .rev()
        .filter(|i| topol.edges[*i as usize].status.deleted())
        .collect();
    Ok(())
}

fn read_triangles(r: &mut impl Read, topol: &mut Topology) -> Result<(), Error> {
    let (slots, count) = read_section_header(r)?;
    topol.faces = (0..slots)
        .map(|_| {
            let mut face = Face::new(0.into());
            face.status = deleted_status();
            face
        })
        .collect();
    for _ in 0..count {
        let f: FH = read_u32(r)?.into();
        let h: HH = read_u32(r)?.into();
        let walkable = read_flag(r)?;
        if f.index() >= slots || !topol.faces[f.index() as usize].status.deleted() {
            return Err(corrupt(format!("Invalid triangle id {}", f)));
        }
        if !topol.is_valid_halfedge(h) {
            return Err(corrupt(format!("{} starts at missing {}", f, h)));
        }
        let mut face = Face::new(h);
        face.status.set_blocked(!walkable);
        topol.faces[f.index() as usize] = face;
        // Claim the halfedges of the loop.
        let mut cur = h;
        for _ in 0..3 {
            if !topol.is_valid_halfedge(cur) {
                return Err(corrupt(format!("{} links to missing {}", f, cur)));
            }
            let he = &mut topol.edges[(cur.index() >> 1) as usize].halfedges
                [(cur.index() & 1) as usize];
            if he.face.replace(f).is_some() {
                return Err(corrupt(format!("{} is shared by two triangles", cur)));
            }
            cur = he.next;
        }
        if cur != h {
            return Err(corrupt(format!("{} is not a triangle", f)));
        }
    }
    topol.free_faces = (0..slots)
        .rev()
        .filter(|i| topol.faces[*i as usize].status.deleted())
        .collect();
    Ok(())
}
