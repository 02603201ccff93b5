//! Indexed triangle mesh produced by iso-surface extraction

use crate::{Point3f, Vector3f};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A triangle mesh with vertices, faces and optional per-vertex attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
    pub normals: Option<Vec<Vector3f>>,
    pub gradients: Option<Vec<Vector3f>>,
    pub scalars: Option<Vec<f32>>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            normals: None,
            gradients: None,
            scalars: None,
        }
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            faces,
            ..Self::new()
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Unit normal of every face, following the winding order
    ///
    /// Contouring through samples that equal the contour value can collapse a
    /// triangle to a point or a segment; such faces get a zero normal.
    pub fn calculate_face_normals(&self) -> Vec<Vector3f> {
        self.faces
            .iter()
            .map(|&[a, b, c]| {
                let origin = self.vertices[a];
                (self.vertices[b] - origin)
                    .cross(&(self.vertices[c] - origin))
                    .try_normalize(0.0)
                    .unwrap_or_else(Vector3f::zeros)
            })
            .collect()
    }

    /// Set vertex normals
    pub fn set_normals(&mut self, normals: Vec<Vector3f>) {
        if normals.len() == self.vertices.len() {
            self.normals = Some(normals);
        }
    }

    /// Set vertex gradients
    pub fn set_gradients(&mut self, gradients: Vec<Vector3f>) {
        if gradients.len() == self.vertices.len() {
            self.gradients = Some(gradients);
        }
    }

    /// Set vertex scalars
    pub fn set_scalars(&mut self, scalars: Vec<f32>) {
        if scalars.len() == self.vertices.len() {
            self.scalars = Some(scalars);
        }
    }

    /// Faces in variable-length cell form: `[3, i0, i1, i2, 3, ...]`
    pub fn to_cell_array(&self) -> Vec<usize> {
        let mut cells = Vec::with_capacity(self.faces.len() * 4);
        for face in &self.faces {
            cells.push(3);
            cells.extend_from_slice(face);
        }
        cells
    }

    /// Number of faces incident to every undirected edge
    pub fn edge_face_counts(&self) -> HashMap<(usize, usize), usize> {
        let mut counts = HashMap::with_capacity(self.faces.len() * 3 / 2);
        for face in &self.faces {
            for n in 0..3 {
                let a = face[n];
                let b = face[(n + 1) % 3];
                *counts.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Euler characteristic `V - E + F`; 2 for a closed genus-0 surface
    pub fn euler_characteristic(&self) -> i64 {
        let edges = self.edge_face_counts().len() as i64;
        self.vertices.len() as i64 - edges + self.faces.len() as i64
    }

    /// Append another mesh, offsetting its face indices
    ///
    /// Optional attributes survive only when both meshes carry them.
    pub fn append(&mut self, other: TriangleMesh) {
        let offset = self.vertices.len();
        let was_empty = self.vertices.is_empty();

        fn merge<T>(dst: &mut Option<Vec<T>>, src: Option<Vec<T>>, was_empty: bool) {
            *dst = match (dst.take(), src) {
                (Some(mut a), Some(b)) => {
                    a.extend(b);
                    Some(a)
                }
                (None, Some(b)) if was_empty => Some(b),
                _ => None,
            };
        }
        merge(&mut self.normals, other.normals, was_empty);
        merge(&mut self.gradients, other.gradients, was_empty);
        merge(&mut self.scalars, other.scalars, was_empty);

        self.vertices.extend(other.vertices);
        self.faces.extend(
            other
                .faces
                .into_iter()
                .map(|[a, b, c]| [a + offset, b + offset, c + offset]),
        );
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}
