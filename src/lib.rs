/*!
A navigation mesh for circular agents, built as a constrained Delaunay
triangulation of a rectangular world.

# Overview

+ The triangulation is stored in a halfedge data structure. Vertices, edges
  and triangles live in arenas and are referred to by small integer handles
  ([`VH`], [`EH`], [`FH`] and [`HH`] for halfedges) that stay stable until the
  element is deleted.

+ A [`NavMesh`] starts out as its bounding rectangle split into two
  triangles. Obstacles (closed polygons the agents can't enter) and border sets
  (open or closed polylines the agents can't cross) are carved into it as
  constrained edges. Points and free standing constraints can be inserted
  directly. Every edit keeps the triangulation Delaunay everywhere except
  across constrained edges.

+ Point location walks the triangulation starting from a triangle cached in a
  uniform grid over the world.

+ [`NavMesh::find_path`] runs A* over the triangles, skipping any corridor too
  narrow for the agent, then pulls the resulting chain of portals taut with a
  funnel that keeps the agent's radius away from every corner.

+ Meshes can be saved to and loaded from a compact binary format, and
  obstacles can be imported from OBJ files with the `obj` feature.

```
use glam::DVec2;
use trinav::NavMesh;

let mut mesh = NavMesh::new(DVec2::ZERO, DVec2::splat(10.)).unwrap();
mesh.add_obstacle(&[
    DVec2::new(4., 4.),
    DVec2::new(6., 4.),
    DVec2::new(6., 6.),
    DVec2::new(4., 6.),
])
.unwrap();
let path = mesh
    .find_path(DVec2::new(1., 1.), DVec2::new(9., 9.), 0.4)
    .unwrap();
assert!(path.len() > 2);
```
*/

mod check;
mod config;
mod constrain;
pub mod earclip;
mod element;
mod error;
pub mod funnel;
mod grid;
mod heap;
mod insert;
mod io;
mod iterator;
mod locate;
mod macros;
pub mod math;
mod navmesh;
#[cfg(feature = "obj")]
mod obj;
mod path;
mod shape;
mod status;
mod topol;
mod width;

pub use config::NavMeshConfig;
pub use element::{Handle, Location, EH, FH, HH, VH};
pub use error::Error;
pub use navmesh::NavMesh;
pub use shape::{BorderSet, Obstacle};
