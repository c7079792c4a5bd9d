use std::path::Path;

use glam::DVec2;
use log::debug;

use crate::{error::Error, math, navmesh::NavMesh};

impl NavMesh {
    /// Add every face of an OBJ file as an obstacle. Vertices are projected
    /// onto the ground plane by dropping their height (y) coordinate. Faces
    /// that collapse to a line under the projection, such as vertical walls,
    /// are skipped. Returns the ids of the obstacles.
    pub fn load_obstacles_obj(&mut self, path: &Path) -> Result<Vec<u32>, Error> {
        if !path.is_file() {
            return Err(Error::InvalidObjFile(path.to_path_buf()));
        }
        let options = tobj::LoadOptions::default();
        let (models, _) =
            tobj::load_obj(path, &options).map_err(|e| Error::ObjLoadFailed(format!("{}", e)))?;
        let mut ids = Vec::new();
        let mut polygon = Vec::new();
        for model in models {
            let mesh = model.mesh;
            if mesh.positions.len() % 3 != 0 {
                return Err(Error::ObjLoadFailed(format!(
                    "{} has {} coordinates",
                    model.name,
                    mesh.positions.len()
                )));
            }
            let points: Vec<DVec2> = mesh
                .positions
                .chunks(3)
                .map(|xyz| DVec2::new(xyz[0], xyz[2]))
                .collect();
            // Without arities, every face is a triangle.
            let arities: Vec<usize> = if mesh.face_arities.is_empty() {
                vec![3; mesh.indices.len() / 3]
            } else {
                mesh.face_arities.iter().map(|n| *n as usize).collect()
            };
            let mut start = 0usize;
            for size in arities {
                let indices = mesh
                    .indices
                    .get(start..(start + size))
                    .ok_or_else(|| Error::ObjLoadFailed(format!("{} is truncated", model.name)))?;
                start += size;
                polygon.clear();
                for i in indices {
                    let p = points.get(*i as usize).ok_or_else(|| {
                        Error::ObjLoadFailed(format!("{} has no vertex {}", model.name, i))
                    })?;
                    polygon.push(*p);
                }
                if math::signed_area(&polygon).abs() <= self.config.epsilon {
                    continue;
                }
                ids.push(self.add_obstacle(&polygon)?);
            }
        }
        debug!("Loaded {} obstacles from {}", ids.len(), path.display());
        Ok(ids)
    }
}

#[cfg(test)]
mod test {
    use std::{fs, path::PathBuf};

    use glam::DVec2;

    use crate::{error::Error, navmesh::test::square};

    fn write_obj(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("trinav_{}_{}.obj", name, std::process::id()));
        fs::write(&path, contents).expect("Unable to write obj file");
        path
    }

    #[test]
    fn t_load_obstacles_obj() {
        // A box standing on the ground, a flat quad and a vertical wall.
        let path = write_obj(
            "boxes",
            "o quad
v 1 0 1
v 3 0 1
v 3 0 3
v 1 0 3
f 1 2 3 4
o wall
v 6 0 6
v 8 0 6
v 8 2 6
f 5 6 7
o tri
v 5 1 1
v 8 1 1
v 6 1 3
f 8 9 10
",
        );
        let mut mesh = square(10.);
        let ids = mesh.load_obstacles_obj(&path).expect("Unable to load obj");
        fs::remove_file(&path).expect("Unable to remove obj file");
        assert_eq!(ids.len(), 2);
        assert!(!mesh.is_valid_position(DVec2::new(2., 2.), 0.));
        assert!(!mesh.is_valid_position(DVec2::new(6., 1.5), 0.));
        assert!(mesh.is_valid_position(DVec2::new(7., 7.), 0.));
        mesh.check().expect("Invalid mesh");
    }

    #[test]
    fn t_load_missing_obj() {
        let mut mesh = square(10.);
        assert!(matches!(
            mesh.load_obstacles_obj(&PathBuf::from("/nonexistent/trinav.obj")),
            Err(Error::InvalidObjFile(_))
        ));
    }
}
