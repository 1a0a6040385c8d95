use std::fmt;
use std::path::Path;

use crate::engine::loaders::{obj_format, ply_format, tri_format};
use crate::engine::utils::math::{Vector2, Vector3};

// ================================================================================================
// ERRORS
// ================================================================================================

#[derive(Debug)]
pub enum MeshError {
    UnknownExtension(String),
    Io(std::io::Error),
    Parse(String),
    IndexOutOfRange { triangle: usize, index: u32, vertex_count: usize },
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshError::UnknownExtension(ext) => write!(f, "Unknown mesh file extension: '{}'", ext),
            MeshError::Io(err) => write!(f, "IO error: {}", err),
            MeshError::Parse(msg) => write!(f, "Malformed mesh file: {}", msg),
            MeshError::IndexOutOfRange { triangle, index, vertex_count } => write!(
                f,
                "Triangle {} references vertex {} but the mesh has {} vertices",
                triangle, index, vertex_count
            ),
        }
    }
}

impl std::error::Error for MeshError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MeshError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MeshError {
    fn from(err: std::io::Error) -> Self {
        MeshError::Io(err)
    }
}

// ================================================================================================
// MESH
// ================================================================================================

/// Axis aligned bounding box.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Aabb {
    pub min: Vector3,
    pub max: Vector3,
}

impl Aabb {
    pub fn center(&self) -> Vector3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vector3 {
        self.max - self.min
    }
}

/// Supported mesh file formats, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Obj,
    Ply,
    Tri,
}

impl MeshFormat {
    pub fn from_path(path: &Path) -> Result<Self, MeshError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "obj" => Ok(MeshFormat::Obj),
            "ply" => Ok(MeshFormat::Ply),
            "tri" => Ok(MeshFormat::Tri),
            _ => Err(MeshError::UnknownExtension(ext)),
        }
    }
}

/// CPU side triangle mesh. Per-vertex arrays are either empty or as long as `vertex`.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertex: Vec<Vector3>,
    pub normal: Vec<Vector3>,
    pub tex_coord: Vec<Vector2>,
    pub vertex_color: Vec<Vector3>,
    pub tangent: Vec<Vector3>,
    pub triangle: Vec<[u32; 3]>,
    vertex_connectivity: Vec<Vec<usize>>,
    bbox: Aabb,
    bbox_is_computed: bool,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_from_file(path: impl AsRef<Path>) -> Result<Self, MeshError> {
        let mut mesh = Self::new();
        mesh.load(path)?;
        Ok(mesh)
    }

    /// Loads an OBJ, PLY or TRI file. On error the mesh is left empty.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), MeshError> {
        let path = path.as_ref();
        self.clear();
        let result = MeshFormat::from_path(path).and_then(|format| {
            match format {
                MeshFormat::Obj => obj_format::read(path, self)?,
                MeshFormat::Ply => ply_format::read(path, self)?,
                MeshFormat::Tri => tri_format::read(path, self)?,
            }
            self.validate()
        });
        match result {
            Ok(()) => {
                log::info!(
                    "Loaded mesh {} ({} vertices, {} triangles)",
                    path.display(),
                    self.vertex_count(),
                    self.triangle_count()
                );
                Ok(())
            }
            Err(err) => {
                self.clear();
                Err(err)
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), MeshError> {
        let path = path.as_ref();
        match MeshFormat::from_path(path)? {
            MeshFormat::Obj => obj_format::write(path, self),
            MeshFormat::Ply => ply_format::write(path, self),
            MeshFormat::Tri => tri_format::write(path, self),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertex.is_empty()
    }

    /// Checks that every triangle index and every per-vertex array fits the vertex list.
    pub fn validate(&self) -> Result<(), MeshError> {
        let n = self.vertex.len();
        for (t, tri) in self.triangle.iter().enumerate() {
            if let Some(&index) = tri.iter().find(|&&i| i as usize >= n) {
                return Err(MeshError::IndexOutOfRange { triangle: t, index, vertex_count: n });
            }
        }
        let sizes = [
            ("normal", self.normal.len()),
            ("tex_coord", self.tex_coord.len()),
            ("vertex_color", self.vertex_color.len()),
            ("tangent", self.tangent.len()),
        ];
        for (name, len) in sizes {
            if len != 0 && len != n {
                return Err(MeshError::Parse(format!("{} has {} entries for {} vertices", name, len, n)));
            }
        }
        Ok(())
    }

    /// For each vertex, the ids of the triangles using it.
    pub fn build_connectivity(&mut self) {
        let mut connectivity = vec![Vec::new(); self.vertex.len()];
        for (t, tri) in self.triangle.iter().enumerate() {
            for &v in tri {
                if let Some(list) = connectivity.get_mut(v as usize) {
                    if !list.contains(&t) {
                        list.push(t);
                    }
                }
            }
        }
        self.vertex_connectivity = connectivity;
    }

    pub fn vertex_connectivity(&self) -> &[Vec<usize>] {
        &self.vertex_connectivity
    }

    /// Unit normal of triangle `t`; NaN when the triangle is degenerate.
    pub fn face_normal(&self, t: usize) -> Vector3 {
        let [a, b, c] = self.triangle[t].map(|i| self.vertex[i as usize]);
        (b - a).cross(&(c - a)).normalized()
    }

    /// Averages the normals of the faces around each vertex.
    pub fn compute_vertex_normal(&mut self) {
        if self.vertex_connectivity.len() != self.vertex.len() {
            self.build_connectivity();
        }
        let face_normals: Vec<Vector3> = (0..self.triangle.len()).map(|t| self.face_normal(t)).collect();
        self.normal = self
            .vertex_connectivity
            .iter()
            .map(|faces| {
                faces
                    .iter()
                    .map(|&t| face_normals[t])
                    .filter(|n| !n.has_nan())
                    .fold(Vector3::zero(), |acc, n| acc + n)
                    .normalized()
            })
            .collect();
    }

    pub fn compute_bounding_box(&mut self) -> Aabb {
        self.bbox = match self.vertex.first() {
            Some(first) => self.vertex.iter().fold(Aabb { min: *first, max: *first }, |bb, v| Aabb {
                min: bb.min.min(v),
                max: bb.max.max(v),
            }),
            None => Aabb::default(),
        };
        self.bbox_is_computed = true;
        self.bbox
    }

    /// The cached box, if `compute_bounding_box` has run.
    pub fn bounding_box(&self) -> Option<Aabb> {
        self.bbox_is_computed.then_some(self.bbox)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

    pub(crate) fn scratch_dir(tag: &str) -> PathBuf {
        let n = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!("oglkit-{}-{}-{}", tag, std::process::id(), n));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    pub(crate) const CUBE_OBJ: &str = "\
# unit cube
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
v 0 0 1
v 1 0 1
v 1 1 1
v 0 1 1
f 1 4 3 2
f 5 6 7 8
f 1 2 6 5
f 2 3 7 6
f 3 4 8 7
f 4 1 5 8
";

    pub(crate) fn cube() -> Mesh {
        let dir = scratch_dir("cube");
        let path = dir.join("cube.obj");
        std::fs::write(&path, CUBE_OBJ).unwrap();
        Mesh::new_from_file(&path).unwrap()
    }

    #[test]
    fn cube_obj_has_8_vertices_and_12_triangles() {
        let mesh = cube();
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.triangle_count(), 12);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn out_of_range_index_fails_and_clears() {
        let dir = scratch_dir("bad-index");
        let path = dir.join("bad.tri");
        std::fs::write(&path, "3 1\n0 0 0\n1 0 0\n0 1 0\n0 1 7\n").unwrap();
        let mut mesh = cube();
        let err = mesh.load(&path).unwrap_err();
        assert!(matches!(err, MeshError::IndexOutOfRange { index: 7, .. }));
        assert!(mesh.is_empty());
        assert_eq!(mesh.triangle_count(), 0);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let mut mesh = Mesh::new();
        let err = mesh.load("model.stl").unwrap_err();
        assert!(matches!(err, MeshError::UnknownExtension(ref e) if e == "stl"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = scratch_dir("missing");
        let err = Mesh::new_from_file(dir.join("nope.obj")).unwrap_err();
        assert!(matches!(err, MeshError::Io(_)));
    }

    #[test]
    fn ply_round_trip_keeps_geometry() {
        let mut mesh = cube();
        mesh.compute_vertex_normal();
        let dir = scratch_dir("ply");
        let path = dir.join("cube.ply");
        mesh.save(&path).unwrap();

        let loaded = Mesh::new_from_file(&path).unwrap();
        assert_eq!(loaded.vertex_count(), mesh.vertex_count());
        assert_eq!(loaded.triangle_count(), mesh.triangle_count());
        assert_eq!(loaded.vertex, mesh.vertex);
        assert_eq!(loaded.normal, mesh.normal);
        assert_eq!(loaded.triangle, mesh.triangle);
    }

    #[test]
    fn connectivity_lists_incident_triangles() {
        let mut mesh = cube();
        mesh.build_connectivity();
        let conn = mesh.vertex_connectivity();
        assert_eq!(conn.len(), 8);
        for (v, faces) in conn.iter().enumerate() {
            assert!(!faces.is_empty());
            for &t in faces {
                assert!(mesh.triangle[t].contains(&(v as u32)));
            }
        }
    }

    #[test]
    fn vertex_normals_point_away_from_cube_center() {
        let mut mesh = cube();
        mesh.compute_vertex_normal();
        let center = Vector3::splat(0.5);
        for (v, n) in mesh.vertex.iter().zip(mesh.normal.iter()) {
            assert!(approx_unit(n));
            assert!((*v - center).dot(n) > 0.0);
        }
    }

    fn approx_unit(n: &Vector3) -> bool {
        (n.length() - 1.0).abs() < 1e-4
    }

    #[test]
    fn bounding_box_is_recomputed() {
        let mut mesh = cube();
        assert!(mesh.bounding_box().is_none());
        let bb = mesh.compute_bounding_box();
        assert_eq!(bb.min, Vector3::zero());
        assert_eq!(bb.max, Vector3::splat(1.0));
        mesh.vertex.push(Vector3::new(-2.0, 0.5, 3.0));
        let bb = mesh.compute_bounding_box();
        assert_eq!(bb.min, Vector3::new(-2.0, 0.0, 0.0));
        assert_eq!(bb.max, Vector3::new(1.0, 1.0, 3.0));
        assert_eq!(mesh.bounding_box(), Some(bb));
    }
}
