use std::path::PathBuf;

use glam::DVec2;

use crate::element::{EH, FH, HH, VH};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Preconditions.
    #[error("a vertex already exists at ({}, {})", .0.x, .0.y)]
    DuplicateVertex(DVec2),
    #[error("no triangle contains the point ({}, {})", .0.x, .0.y)]
    NoContainingTriangle(DVec2),
    #[error("invalid shape: {0}")]
    InvalidShape(&'static str),
    #[error("no obstacle with id {0}")]
    ObstacleNotFound(u32),
    #[error("no border set with id {0}")]
    BorderSetNotFound(u32),
    // Topology.
    #[error("constraint crosses the constrained edge {0}")]
    CrossedConstraint(EH),
    #[error("iteration limit of {0} exceeded")]
    IterationLimitExceeded(usize),
    #[error("halfedge {0} is not bounded by a triangle")]
    MissingFace(HH),
    #[error("halfedge {0} already has a face")]
    HalfedgeNotFree(HH),
    #[error("edge {0} still bounds a face")]
    EdgeInUse(EH),
    #[error("face {0} is not a triangle")]
    InvalidFace(FH),
    #[error("vertex {0} cannot be removed")]
    VertexNotRemovable(VH),
    #[error("no ear found while clipping a polygon of {0} vertices")]
    EarClippingFailed(usize),
    #[error("invalid topology: {0}")]
    InvalidTopology(String),
    // Queries.
    #[error("no path found")]
    NoPathFound,
    // Persistence.
    #[error("corrupt navmesh data: {0}")]
    CorruptData(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid obj file {0}")]
    InvalidObjFile(PathBuf),
    #[error("failed to load obj file: {0}")]
    ObjLoadFailed(String),
}
