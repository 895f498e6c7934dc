//! Polygon mesh representation on the host side of the translator.
//!
//! Topology follows USD's layout (`faceVertexCounts` + `faceVertexIndices`),
//! while attribute sets keep the host's face-relative storage (see
//! [`UvSet`] and [`ColourSet`]).

use meshpack_math::{flatten, Vec3};
use thiserror::Error;

use crate::colour_set::ColourSet;
use crate::packing::convert_float_vec3_array_to_double_vec3_array;
use crate::uv_set::UvSet;

/// Errors found while validating mesh topology.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("Face {face} has negative vertex count {count}")]
    NegativeCount { face: usize, count: i32 },

    #[error("Face vertex counts sum to {expected} but {actual} face vertex indices were given")]
    IndexCountMismatch { expected: usize, actual: usize },

    #[error("Face vertex index {index} at corner {corner} is out of range for {point_count} points")]
    IndexOutOfRange {
        corner: usize,
        index: i32,
        point_count: usize,
    },
}

/// Face/vertex connectivity of a polygon mesh.
///
/// A "corner" is one entry of `face_vertex_indices`, i.e. one vertex of one
/// face. Per-corner data is what USD calls faceVarying.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshTopology {
    face_vertex_counts: Vec<i32>,
    face_vertex_indices: Vec<i32>,
    point_count: usize,
}

impl MeshTopology {
    /// Create validated topology.
    pub fn new(
        face_vertex_counts: Vec<i32>,
        face_vertex_indices: Vec<i32>,
        point_count: usize,
    ) -> Result<Self, TopologyError> {
        let mut expected = 0usize;
        for (face, &count) in face_vertex_counts.iter().enumerate() {
            if count < 0 {
                return Err(TopologyError::NegativeCount { face, count });
            }
            expected += count as usize;
        }

        if expected != face_vertex_indices.len() {
            return Err(TopologyError::IndexCountMismatch {
                expected,
                actual: face_vertex_indices.len(),
            });
        }

        for (corner, &index) in face_vertex_indices.iter().enumerate() {
            if index < 0 || index as usize >= point_count {
                return Err(TopologyError::IndexOutOfRange {
                    corner,
                    index,
                    point_count,
                });
            }
        }

        Ok(Self {
            face_vertex_counts,
            face_vertex_indices,
            point_count,
        })
    }

    pub fn face_vertex_counts(&self) -> &[i32] {
        &self.face_vertex_counts
    }

    pub fn face_vertex_indices(&self) -> &[i32] {
        &self.face_vertex_indices
    }

    pub fn point_count(&self) -> usize {
        self.point_count
    }

    pub fn face_count(&self) -> usize {
        self.face_vertex_counts.len()
    }

    pub fn corner_count(&self) -> usize {
        self.face_vertex_indices.len()
    }

    /// Offset of each face's first corner in `face_vertex_indices`.
    pub fn face_offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.face_count());
        let mut offset = 0usize;
        for &count in &self.face_vertex_counts {
            offsets.push(offset);
            offset += count as usize;
        }
        offsets
    }

    /// The face each corner belongs to.
    pub fn corner_face_ids(&self) -> Vec<usize> {
        let mut ids = Vec::with_capacity(self.corner_count());
        for (face, &count) in self.face_vertex_counts.iter().enumerate() {
            ids.extend(std::iter::repeat(face).take(count as usize));
        }
        ids
    }

    /// Fan-triangulate the polygons and return point indices.
    ///
    /// Faces with fewer than 3 vertices are skipped.
    pub fn triangulate(&self) -> Vec<u32> {
        let mut indices = Vec::new();
        let mut offset = 0usize;

        for &count in &self.face_vertex_counts {
            let count = count as usize;
            if count >= 3 {
                // (0,1,2), (0,2,3), ... (0,n-2,n-1)
                for i in 1..(count - 1) {
                    indices.push(self.face_vertex_indices[offset] as u32);
                    indices.push(self.face_vertex_indices[offset + i] as u32);
                    indices.push(self.face_vertex_indices[offset + i + 1] as u32);
                }
            }
            offset += count;
        }

        indices
    }
}

/// A polygon mesh as the host application holds it.
#[derive(Clone, Debug, Default)]
pub struct PolyMesh {
    /// Mesh name (becomes the USD prim name)
    pub name: String,

    /// Point positions
    pub points: Vec<Vec3>,

    /// Face/vertex connectivity
    pub topology: MeshTopology,

    /// Per-corner normals (optional)
    pub normals: Option<Vec<Vec3>>,

    /// UV sets, the first one is the default set
    pub uv_sets: Vec<UvSet>,

    /// Colour sets
    pub colour_sets: Vec<ColourSet>,
}

impl PolyMesh {
    /// Create a mesh with no attribute sets.
    pub fn new(name: impl Into<String>, points: Vec<Vec3>, topology: MeshTopology) -> Self {
        Self {
            name: name.into(),
            points,
            topology,
            ..Default::default()
        }
    }

    /// Points promoted to double precision, flat `[x, y, z, ...]`.
    ///
    /// Hosts typically store points as doubles.
    pub fn points_f64(&self) -> Vec<f64> {
        let mut output = vec![0.0f64; self.points.len() * 3];
        convert_float_vec3_array_to_double_vec3_array(
            flatten(&self.points),
            &mut output,
            self.points.len(),
        );
        output
    }

    /// Find a UV set by name.
    pub fn uv_set(&self, name: &str) -> Option<&UvSet> {
        self.uv_sets.iter().find(|set| set.name == name)
    }

    /// Find a colour set by name.
    pub fn colour_set(&self, name: &str) -> Option<&ColourSet> {
        self.colour_sets.iter().find(|set| set.name == name)
    }

    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }
}

/// Unit cube with 8 shared points and 6 quads, matching a DCC `polyCube`.
#[cfg(test)]
pub(crate) fn test_cube() -> PolyMesh {
    let points = vec![
        Vec3::new(-0.5, -0.5, 0.5),
        Vec3::new(0.5, -0.5, 0.5),
        Vec3::new(-0.5, 0.5, 0.5),
        Vec3::new(0.5, 0.5, 0.5),
        Vec3::new(-0.5, 0.5, -0.5),
        Vec3::new(0.5, 0.5, -0.5),
        Vec3::new(-0.5, -0.5, -0.5),
        Vec3::new(0.5, -0.5, -0.5),
    ];
    let topology = MeshTopology::new(
        vec![4; 6],
        vec![
            0, 1, 3, 2, 2, 3, 5, 4, 4, 5, 7, 6, 6, 7, 1, 0, 1, 7, 5, 3, 6, 0, 2, 4,
        ],
        points.len(),
    )
    .unwrap();
    PolyMesh::new("pCube1", points, topology)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_counts() {
        let mesh = test_cube();
        assert_eq!(mesh.topology.face_count(), 6);
        assert_eq!(mesh.topology.corner_count(), 24);
        assert_eq!(mesh.topology.point_count(), 8);
        assert_eq!(mesh.topology.face_offsets(), vec![0, 4, 8, 12, 16, 20]);

        let face_ids = mesh.topology.corner_face_ids();
        assert_eq!(face_ids.len(), 24);
        assert_eq!(&face_ids[..5], &[0, 0, 0, 0, 1]);
        assert_eq!(face_ids[23], 5);
    }

    #[test]
    fn test_topology_rejects_negative_count() {
        let err = MeshTopology::new(vec![3, -1], vec![0, 1, 2], 3).unwrap_err();
        assert_eq!(err, TopologyError::NegativeCount { face: 1, count: -1 });
    }

    #[test]
    fn test_topology_rejects_count_mismatch() {
        let err = MeshTopology::new(vec![4], vec![0, 1, 2], 4).unwrap_err();
        assert_eq!(
            err,
            TopologyError::IndexCountMismatch {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn test_topology_rejects_out_of_range_index() {
        let err = MeshTopology::new(vec![3], vec![0, 1, 3], 3).unwrap_err();
        assert!(matches!(err, TopologyError::IndexOutOfRange { corner: 2, .. }));
    }

    #[test]
    fn test_triangulate_quad() {
        let topology = MeshTopology::new(vec![4], vec![0, 1, 2, 3], 4).unwrap();
        // Quad (0,1,2,3) -> triangles (0,1,2) and (0,2,3)
        assert_eq!(topology.triangulate(), vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_triangulate_skips_degenerate_faces() {
        let topology = MeshTopology::new(vec![2, 3], vec![0, 1, 0, 1, 2], 3).unwrap();
        assert_eq!(topology.triangulate(), vec![0, 1, 2]);
    }

    #[test]
    fn test_points_f64() {
        let mesh = test_cube();
        let doubles = mesh.points_f64();
        assert_eq!(doubles.len(), 24);
        assert_eq!(&doubles[..3], &[-0.5, -0.5, 0.5]);
        assert_eq!(&doubles[21..], &[0.5, -0.5, -0.5]);
    }
}
