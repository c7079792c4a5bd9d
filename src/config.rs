/*!
Tunables for a [`NavMesh`](crate::NavMesh).
*/

/// Configuration of a navigation mesh.
///
/// The defaults work for worlds measured in units of roughly one meter with
/// coordinates up to a few thousand.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NavMeshConfig {
    /// Edge length of a cell of the point location grid.
    pub tile_size: f64,
    /// Distance below which a point is considered to lie on a line, or to
    /// coincide with another point.
    pub epsilon: f64,
    /// Number of steps a constrained edge insertion may take before it gives
    /// up with [`Error::IterationLimitExceeded`](crate::Error::IterationLimitExceeded).
    pub max_constraint_iterations: usize,
    /// Depth of the edge flip work stack. When exceeded, the remaining edges
    /// are left as they are.
    pub max_flip_stack: usize,
    /// Number of triangles a point location walk may visit before falling
    /// back to a linear scan.
    pub max_locate_steps: usize,
    /// Radial step used when searching for the nearest valid position.
    pub nearest_search_step: f64,
    /// Number of rings sampled when searching for the nearest valid position.
    pub nearest_search_rings: usize,
}

impl Default for NavMeshConfig {
    fn default() -> Self {
        NavMeshConfig {
            tile_size: 1.0,
            epsilon: 1e-9,
            max_constraint_iterations: 4096,
            max_flip_stack: 4096,
            max_locate_steps: 4096,
            nearest_search_step: 0.25,
            nearest_search_rings: 64,
        }
    }
}

impl NavMeshConfig {
    pub fn with_tile_size(mut self, tile_size: f64) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_max_constraint_iterations(mut self, n: usize) -> Self {
        self.max_constraint_iterations = n;
        self
    }

    pub fn with_max_flip_stack(mut self, n: usize) -> Self {
        self.max_flip_stack = n;
        self
    }

    pub fn with_max_locate_steps(mut self, n: usize) -> Self {
        self.max_locate_steps = n;
        self
    }

    pub fn with_nearest_search(mut self, step: f64, rings: usize) -> Self {
        self.nearest_search_step = step;
        self.nearest_search_rings = rings;
        self
    }
}
