use crate::{
    element::{EH, FH, HH, VH},
    topol::Topology,
};

/// Rotates counter-clockwise around the source vertex of `hstart`. The
/// rotation stops early when it runs into a halfedge without a face.
struct OutgoingHalfedgeIter<'a> {
    topol: &'a Topology,
    hstart: HH,
    hcurrent: Option<HH>,
}

impl<'a> Iterator for OutgoingHalfedgeIter<'a> {
    type Item = HH;

    fn next(&mut self) -> Option<Self::Item> {
        match self.hcurrent {
            Some(current) => {
                self.hcurrent = match self.topol.halfedge_face(current) {
                    Some(_) => {
                        let next = self.topol.prev_halfedge(current).pair();
                        if next == self.hstart { None } else { Some(next) }
                    }
                    None => None,
                };
                Some(current)
            }
            None => None,
        }
    }
}

struct FaceHalfedgeIter<'a> {
    topol: &'a Topology,
    hstart: HH,
    hcurrent: Option<HH>,
}

impl<'a> Iterator for FaceHalfedgeIter<'a> {
    type Item = HH;

    fn next(&mut self) -> Option<Self::Item> {
        match self.hcurrent {
            Some(current) => {
                let next = self.topol.next_halfedge(current);
                self.hcurrent = if next == self.hstart {
                    None
                } else {
                    Some(next)
                };
                Some(current)
            }
            None => None,
        }
    }
}

/// Outgoing halfedges of `v` in counter-clockwise order, starting from an
/// arbitrary one.
pub(crate) fn voh_ccw_iter(topol: &Topology, v: VH) -> impl Iterator<Item = HH> + use<'_> {
    topol
        .outgoing(v)
        .first()
        .into_iter()
        .flat_map(move |h| voh_ccw_iter_from(topol, *h))
}

/// Outgoing halfedges in counter-clockwise order, starting from `h`.
pub(crate) fn voh_ccw_iter_from(topol: &Topology, h: HH) -> impl Iterator<Item = HH> + use<'_> {
    OutgoingHalfedgeIter {
        topol,
        hstart: h,
        hcurrent: Some(h),
    }
}

/// All edges incident on `v`, in no particular order.
pub(crate) fn ve_iter(topol: &Topology, v: VH) -> impl Iterator<Item = EH> + use<'_> {
    topol.outgoing(v).iter().map(|h| h.edge())
}

/// All faces incident on `v`, in no particular order.
pub(crate) fn vf_iter(topol: &Topology, v: VH) -> impl Iterator<Item = FH> + use<'_> {
    topol
        .outgoing(v)
        .iter()
        .filter_map(|h| topol.halfedge_face(*h))
}

pub(crate) fn fh_iter(topol: &Topology, f: FH) -> impl Iterator<Item = HH> + use<'_> {
    let h = topol.face_halfedge(f);
    FaceHalfedgeIter {
        topol,
        hstart: h,
        hcurrent: Some(h),
    }
}

/// Faces sharing an edge with `f`.
pub(crate) fn ff_iter(topol: &Topology, f: FH) -> impl Iterator<Item = FH> + use<'_> {
    fh_iter(topol, f).filter_map(|h| topol.halfedge_face(h.pair()))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{element::Handle, topol::test::fan};

    #[test]
    fn t_fan_face_iterators() {
        let topol = fan();
        for f in topol.faces() {
            assert_eq!(fh_iter(&topol, f).count(), 3);
            let verts: Vec<_> = fh_iter(&topol, f).map(|h| topol.to_vertex(h)).collect();
            assert!(verts.contains(&4.into()));
            // Every face of the fan has two neighbours.
            assert_eq!(ff_iter(&topol, f).count(), 2);
        }
    }

    #[test]
    fn t_vertex_rotation() {
        let topol = fan();
        let ccw: Vec<_> = voh_ccw_iter(&topol, 4.into())
            .map(|h| topol.to_vertex(h).index())
            .collect();
        assert_eq!(ccw.len(), 4);
        // Starting anywhere else visits the same vertices, rotated.
        let start = topol.outgoing(4.into())[2];
        let from: Vec<_> = voh_ccw_iter_from(&topol, start)
            .map(|h| topol.to_vertex(h).index())
            .collect();
        let shift = ccw
            .iter()
            .position(|v| *v == from[0])
            .expect("Missing vertex");
        let mut rotated = ccw.clone();
        rotated.rotate_left(shift);
        assert_eq!(from, rotated);
        assert_eq!(vf_iter(&topol, 4.into()).count(), 4);
        assert_eq!(ve_iter(&topol, 0.into()).count(), 3);
    }

    #[test]
    fn t_boundary_rotation_stops() {
        let topol = fan();
        // Corner 0 has two faces; the rotation starting from the halfedge
        // along the bottom boundary sees all three outgoing halfedges.
        let h = topol
            .find_halfedge(0.into(), 1.into())
            .expect("Cannot find halfedge");
        let verts: Vec<_> = voh_ccw_iter_from(&topol, h)
            .map(|h| topol.to_vertex(h).index())
            .collect();
        assert_eq!(verts, vec![1, 4, 3]);
    }
}
