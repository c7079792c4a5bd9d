use std::{
    cell::Cell,
    fmt::{Debug, Display},
};

use glam::DVec2;

use crate::status::Status;

/**
 * All elements of the mesh implement this trait. They are identified by their
 * index into the arena that owns them.
 */
pub trait Handle: Copy {
    /**
     * The index of the element.
     */
    fn index(&self) -> u32;
}

macro_rules! handle {
    ($name:ident, $label:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name {
            idx: u32,
        }

        impl Handle for $name {
            fn index(&self) -> u32 {
                self.idx
            }
        }

        impl From<u32> for $name {
            fn from(idx: u32) -> Self {
                $name { idx }
            }
        }

        impl From<&u32> for $name {
            fn from(idx: &u32) -> Self {
                $name { idx: *idx }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", $label, self.idx)
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", $label, self.idx)
            }
        }
    };
}

handle!(VH, "VH", "Vertex handle.");
handle!(HH, "HH", "Halfedge handle.");
handle!(EH, "EH", "Edge handle.");
handle!(FH, "FH", "Face (triangle) handle.");

impl HH {
    /// The oppositely oriented twin of this halfedge.
    ///
    /// Both halfedges of an edge live in the same slot, so this never needs a
    /// lookup.
    pub fn pair(self) -> HH {
        (self.idx ^ 1).into()
    }

    pub fn edge(self) -> EH {
        (self.idx >> 1).into()
    }
}

impl EH {
    pub fn halfedges(self) -> (HH, HH) {
        let hi = self.idx << 1;
        (hi.into(), (hi | 1).into())
    }
}

/// Where a point lies relative to the triangulation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Location {
    /// Coincident with an existing vertex.
    Vertex(VH),
    /// On the given halfedge, strictly between its endpoints. The halfedge is
    /// the one bounding the triangle the walk ended in.
    Edge(HH),
    /// Strictly inside the triangle.
    Face(FH),
}

#[derive(Debug, Clone)]
pub(crate) struct Vertex {
    pub(crate) pos: DVec2,
    /// All outgoing halfedges, unordered.
    pub(crate) outgoing: Vec<HH>,
    pub(crate) status: Status,
}

#[derive(Debug, Copy, Clone)]
pub(crate) struct Halfedge {
    pub(crate) face: Option<FH>,
    /// Destination vertex.
    pub(crate) vertex: VH,
    /// Next halfedge around `face`. Points to itself when there is no face.
    pub(crate) next: HH,
}

#[derive(Debug, Copy, Clone)]
pub(crate) struct Edge {
    pub(crate) halfedges: [Halfedge; 2],
    pub(crate) status: Status,
}

#[derive(Debug, Clone)]
pub(crate) struct Face {
    pub(crate) halfedge: HH,
    pub(crate) status: Status,
    /// Clearance width through this triangle between the two edges adjacent
    /// to each corner, in the order of `halfedge`'s destination, then the
    /// destination of `next`, then the destination of `next.next`.
    pub(crate) widths: [Cell<Option<f64>>; 3],
}

impl Face {
    pub(crate) fn new(halfedge: HH) -> Self {
        Face {
            halfedge,
            status: Status::default(),
            widths: Default::default(),
        }
    }

    pub(crate) fn invalidate_widths(&self) {
        for w in &self.widths {
            w.set(None);
        }
    }
}
