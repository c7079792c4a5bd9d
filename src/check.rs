use crate::{
    element::{Handle, HH},
    error::Error,
    iterator, math,
    navmesh::NavMesh,
    topol::{PointKey, Topology},
};

fn check_vertices(topol: &Topology, hvisited: &mut [bool]) -> Result<(), Error> {
    hvisited.fill(false);
    for v in topol.vertices() {
        for h in topol.outgoing(v) {
            if !topol.is_valid_halfedge(*h) {
                return Err(Error::InvalidTopology(format!(
                    "{} has deleted outgoing halfedge {}",
                    v, h
                )));
            }
            // Outgoing halfedge must point back to this vertex.
            if topol.from_vertex(*h) != v {
                return Err(Error::InvalidTopology(format!(
                    "{} does not start at {}",
                    h, v
                )));
            }
            if std::mem::replace(&mut hvisited[h.index() as usize], true) {
                return Err(Error::InvalidTopology(format!(
                    "{} is listed twice around {}",
                    h, v
                )));
            }
        }
        if topol.positions.get(&PointKey::new(topol.point(v))) != Some(&v) {
            return Err(Error::InvalidTopology(format!("{} is not indexed", v)));
        }
    }
    if topol.positions.len() != topol.num_vertices() {
        return Err(Error::InvalidTopology(
            "Position index is out of sync".to_string(),
        ));
    }
    Ok(())
}

fn check_halfedges(topol: &Topology, hvisited: &[bool]) -> Result<(), Error> {
    for h in topol.halfedges() {
        // Every live halfedge must be in the outgoing list of its source.
        if !hvisited[h.index() as usize] {
            return Err(Error::InvalidTopology(format!(
                "{} is missing from its source",
                h
            )));
        }
        let (from, to) = (topol.from_vertex(h), topol.to_vertex(h));
        if from == to {
            return Err(Error::InvalidTopology(format!("{} is degenerate", h)));
        }
        if !topol.is_valid_vertex(from) || !topol.is_valid_vertex(to) {
            return Err(Error::InvalidTopology(format!(
                "{} is attached to a deleted vertex",
                h
            )));
        }
        match topol.halfedge_face(h) {
            None => {
                if topol.next_halfedge(h) != h {
                    return Err(Error::InvalidTopology(format!(
                        "Free halfedge {} is linked",
                        h
                    )));
                }
            }
            Some(f) => {
                if !topol.is_valid_face(f) {
                    return Err(Error::InvalidTopology(format!(
                        "{} bounds deleted face {}",
                        h, f
                    )));
                }
                let next = topol.next_halfedge(h);
                if topol.halfedge_face(next) != Some(f) || topol.from_vertex(next) != to {
                    return Err(Error::InvalidTopology(format!("Broken loop at {}", h)));
                }
                if topol.next_halfedge(topol.next_halfedge(next)) != h {
                    return Err(Error::InvalidTopology(format!(
                        "{} is not in a triangle",
                        h
                    )));
                }
            }
        }
    }
    Ok(())
}

fn check_faces(topol: &Topology) -> Result<(), Error> {
    for f in topol.faces() {
        let h = topol.face_halfedge(f);
        if !topol.is_valid_halfedge(h) || topol.halfedge_face(h) != Some(f) {
            return Err(Error::InvalidTopology(format!(
                "{} is not linked to its halfedge {}",
                f, h
            )));
        }
    }
    Ok(())
}

/// Check the connectivity of the halfedge store.
pub(crate) fn check_topology(topol: &Topology) -> Result<(), Error> {
    let mut hvisited = vec![false; topol.edge_slots() * 2].into_boxed_slice();
    check_vertices(topol, &mut hvisited)?;
    check_halfedges(topol, &hvisited)?;
    check_faces(topol)?;
    Ok(())
}

/// Check the geometric invariants of the mesh on top of its connectivity.
pub(crate) fn check_mesh(mesh: &NavMesh) -> Result<(), Error> {
    let topol = &mesh.topol;
    for f in topol.faces() {
        let [a, b, c] = topol.face_points(f);
        if math::orient2d(a, b, c) <= 0. {
            return Err(Error::InvalidFace(f));
        }
    }
    if let Some(seed) = topol.any_face() {
        if topol.connected_faces(seed).len() != topol.num_faces() {
            return Err(Error::InvalidTopology(
                "The triangulation is not connected".to_string(),
            ));
        }
    }
    for e in topol.edges() {
        if topol.is_boundary_edge(e) && !topol.is_constrained(e) {
            return Err(Error::InvalidTopology(format!(
                "Boundary edge {} is not constrained",
                e
            )));
        }
        let (h, oh) = e.halfedges();
        if topol.is_boundary_halfedge(h) && topol.is_boundary_halfedge(oh) {
            return Err(Error::InvalidTopology(format!("{} bounds no face", e)));
        }
    }
    for v in topol.vertices() {
        if !mesh.in_bounds(topol.point(v)) {
            return Err(Error::InvalidTopology(format!("{} is out of bounds", v)));
        }
        if topol.outgoing(v).is_empty() {
            return Err(Error::InvalidTopology(format!("{} is isolated", v)));
        }
    }
    // Rotating around an interior vertex must visit all of its halfedges.
    for v in topol.vertices() {
        let valence = topol.outgoing(v).len();
        let interior = topol
            .outgoing(v)
            .iter()
            .all(|h| !topol.is_boundary_edge(h.edge()));
        if interior && iterator::voh_ccw_iter(topol, v).take(valence + 1).count() != valence {
            return Err(Error::InvalidTopology(format!(
                "Faces around {} are not connected",
                v
            )));
        }
    }
    for (id, shape) in mesh.obstacles.iter().chain(mesh.border_sets.iter()) {
        for (a, b) in shape.segments() {
            if !topol.is_valid_vertex(a) || !topol.is_valid_vertex(b) {
                return Err(Error::InvalidTopology(format!(
                    "Shape {} references a deleted vertex",
                    id
                )));
            }
        }
    }
    Ok(())
}

/// Check that every unconstrained interior edge is locally Delaunay.
pub(crate) fn check_delaunay(mesh: &NavMesh) -> Result<(), Error> {
    let topol = &mesh.topol;
    let eps = mesh.config.epsilon;
    for e in topol.edges().filter(|e| !topol.is_constrained(*e)) {
        let (h, oh) = e.halfedges();
        let opposite = |h: HH| {
            topol
                .halfedge_face(h)
                .map(|_| topol.point(topol.to_vertex(topol.next_halfedge(h))))
        };
        let (Some(c), Some(d)) = (opposite(h), opposite(oh)) else {
            continue;
        };
        let (a, b) = topol.halfedge_points(h);
        if math::in_circumcircle(a, b, c, d, eps) {
            return Err(Error::InvalidTopology(format!("{} is not Delaunay", e)));
        }
    }
    Ok(())
}
