//! USD primvars: attribute data bound to mesh topology through an
//! interpolation mode and an optional index array.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mesh::MeshTopology;

/// Errors raised when primvar data does not fit the mesh it is bound to.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrimvarError {
    #[error("Unknown interpolation token: {0}")]
    UnknownInterpolation(String),

    #[error("Primvar '{name}' ({interpolation}) needs {expected} elements, found {actual}")]
    ElementCountMismatch {
        name: String,
        interpolation: Interpolation,
        expected: usize,
        actual: usize,
    },

    #[error("Primvar '{name}' index {index} at element {element} is out of range for {len} values")]
    IndexOutOfRange {
        name: String,
        element: usize,
        index: i32,
        len: usize,
    },
}

/// How primvar values map onto mesh topology.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Interpolation {
    /// One value for the whole mesh
    Constant,

    /// One value per face
    Uniform,

    /// One value per point
    Vertex,

    /// One value per face corner
    FaceVarying,
}

impl Interpolation {
    /// USD token spelling.
    pub fn as_token(&self) -> &'static str {
        match self {
            Interpolation::Constant => "constant",
            Interpolation::Uniform => "uniform",
            Interpolation::Vertex => "vertex",
            Interpolation::FaceVarying => "faceVarying",
        }
    }

    /// Number of elements this interpolation needs on `topology`.
    pub fn element_count(&self, topology: &MeshTopology) -> usize {
        match self {
            Interpolation::Constant => 1,
            Interpolation::Uniform => topology.face_count(),
            Interpolation::Vertex => topology.point_count(),
            Interpolation::FaceVarying => topology.corner_count(),
        }
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

impl FromStr for Interpolation {
    type Err = PrimvarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "constant" => Ok(Interpolation::Constant),
            "uniform" => Ok(Interpolation::Uniform),
            // "varying" interpolates like vertex on polygon meshes
            "vertex" | "varying" => Ok(Interpolation::Vertex),
            "faceVarying" => Ok(Interpolation::FaceVarying),
            other => Err(PrimvarError::UnknownInterpolation(other.to_string())),
        }
    }
}

/// A named, optionally indexed primvar.
///
/// When `indices` is present, the interpolation's elements are the indices
/// and `values` is the table they point into. Otherwise each value is one
/// element.
#[derive(Clone, Debug, PartialEq)]
pub struct Primvar<T> {
    pub name: String,
    pub interpolation: Interpolation,
    pub values: Vec<T>,
    pub indices: Option<Vec<i32>>,
}

impl<T: Copy> Primvar<T> {
    /// Create an unindexed primvar.
    pub fn new(name: impl Into<String>, interpolation: Interpolation, values: Vec<T>) -> Self {
        Self {
            name: name.into(),
            interpolation,
            values,
            indices: None,
        }
    }

    /// Create an indexed primvar.
    pub fn indexed(
        name: impl Into<String>,
        interpolation: Interpolation,
        values: Vec<T>,
        indices: Vec<i32>,
    ) -> Self {
        Self {
            name: name.into(),
            interpolation,
            values,
            indices: Some(indices),
        }
    }

    pub fn is_indexed(&self) -> bool {
        self.indices.is_some()
    }

    /// Number of elements the interpolation requires on `topology`.
    pub fn expected_len(&self, topology: &MeshTopology) -> usize {
        self.interpolation.element_count(topology)
    }

    /// Number of elements actually stored (indices if indexed, else values).
    pub fn element_len(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len(),
            None => self.values.len(),
        }
    }

    /// Check element count and index range against `topology`.
    pub fn validate(&self, topology: &MeshTopology) -> Result<(), PrimvarError> {
        let expected = self.expected_len(topology);
        let actual = self.element_len();
        if expected != actual {
            return Err(PrimvarError::ElementCountMismatch {
                name: self.name.clone(),
                interpolation: self.interpolation,
                expected,
                actual,
            });
        }

        if let Some(indices) = &self.indices {
            for (element, &index) in indices.iter().enumerate() {
                if index < 0 || index as usize >= self.values.len() {
                    return Err(PrimvarError::IndexOutOfRange {
                        name: self.name.clone(),
                        element,
                        index,
                        len: self.values.len(),
                    });
                }
            }
        }

        Ok(())
    }

    /// For each face corner, the position in `values` that supplies it.
    pub fn element_index_per_corner(
        &self,
        topology: &MeshTopology,
    ) -> Result<Vec<i32>, PrimvarError> {
        self.validate(topology)?;

        let element_of = |element: usize| -> i32 {
            match &self.indices {
                Some(indices) => indices[element],
                None => element as i32,
            }
        };

        let per_corner = match self.interpolation {
            Interpolation::Constant => vec![element_of(0); topology.corner_count()],
            Interpolation::Uniform => topology
                .corner_face_ids()
                .into_iter()
                .map(element_of)
                .collect(),
            Interpolation::Vertex => topology
                .face_vertex_indices()
                .iter()
                .map(|&point| element_of(point as usize))
                .collect(),
            Interpolation::FaceVarying => (0..topology.corner_count()).map(element_of).collect(),
        };

        Ok(per_corner)
    }

    /// Flatten to one value per face corner.
    pub fn expand_face_varying(&self, topology: &MeshTopology) -> Result<Vec<T>, PrimvarError> {
        let per_corner = self.element_index_per_corner(topology)?;
        Ok(per_corner
            .into_iter()
            .map(|index| self.values[index as usize])
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshpack_math::Vec2;

    fn two_quads() -> MeshTopology {
        // 6 points, two quads sharing the edge 1-4
        MeshTopology::new(vec![4, 4], vec![0, 1, 4, 3, 1, 2, 5, 4], 6).unwrap()
    }

    #[test]
    fn test_interpolation_tokens() {
        for interpolation in [
            Interpolation::Constant,
            Interpolation::Uniform,
            Interpolation::Vertex,
            Interpolation::FaceVarying,
        ] {
            let parsed: Interpolation = interpolation.as_token().parse().unwrap();
            assert_eq!(parsed, interpolation);
        }
        assert_eq!(Interpolation::FaceVarying.to_string(), "faceVarying");
        assert_eq!("varying".parse::<Interpolation>().unwrap(), Interpolation::Vertex);
        assert!("perCorner".parse::<Interpolation>().is_err());
    }

    #[test]
    fn test_interpolation_serde_uses_tokens() {
        let json = serde_json::to_string(&Interpolation::FaceVarying).unwrap();
        assert_eq!(json, "\"faceVarying\"");
        let parsed: Interpolation = serde_json::from_str("\"uniform\"").unwrap();
        assert_eq!(parsed, Interpolation::Uniform);
    }

    #[test]
    fn test_expected_len() {
        let topology = two_quads();
        assert_eq!(Interpolation::Constant.element_count(&topology), 1);
        assert_eq!(Interpolation::Uniform.element_count(&topology), 2);
        assert_eq!(Interpolation::Vertex.element_count(&topology), 6);
        assert_eq!(Interpolation::FaceVarying.element_count(&topology), 8);
    }

    #[test]
    fn test_validate_count_mismatch() {
        let topology = two_quads();
        let primvar = Primvar::new("st", Interpolation::Uniform, vec![Vec2::ZERO; 3]);
        let err = primvar.validate(&topology).unwrap_err();
        assert!(matches!(
            err,
            PrimvarError::ElementCountMismatch {
                expected: 2,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_validate_index_out_of_range() {
        let topology = two_quads();
        let primvar = Primvar::indexed("st", Interpolation::Uniform, vec![Vec2::ZERO], vec![0, 1]);
        let err = primvar.validate(&topology).unwrap_err();
        assert!(matches!(
            err,
            PrimvarError::IndexOutOfRange {
                element: 1,
                index: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_expand_constant() {
        let topology = two_quads();
        let primvar = Primvar::new("st", Interpolation::Constant, vec![Vec2::new(0.5, 0.5)]);
        let expanded = primvar.expand_face_varying(&topology).unwrap();
        assert_eq!(expanded, vec![Vec2::new(0.5, 0.5); 8]);
    }

    #[test]
    fn test_expand_uniform() {
        let topology = two_quads();
        let primvar = Primvar::new("st", Interpolation::Uniform, vec![Vec2::X, Vec2::Y]);
        let expanded = primvar.expand_face_varying(&topology).unwrap();
        assert_eq!(&expanded[..4], &[Vec2::X; 4]);
        assert_eq!(&expanded[4..], &[Vec2::Y; 4]);
    }

    #[test]
    fn test_expand_vertex() {
        let topology = two_quads();
        let values: Vec<f32> = (0..6).map(|i| i as f32).collect();
        let primvar = Primvar::new("weight", Interpolation::Vertex, values);
        let expanded = primvar.expand_face_varying(&topology).unwrap();
        assert_eq!(expanded, vec![0.0, 1.0, 4.0, 3.0, 1.0, 2.0, 5.0, 4.0]);
    }

    #[test]
    fn test_element_index_per_corner_indexed_face_varying() {
        let topology = two_quads();
        let indices = vec![0, 1, 2, 3, 1, 0, 3, 2];
        let primvar = Primvar::indexed(
            "st",
            Interpolation::FaceVarying,
            vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y],
            indices.clone(),
        );
        assert_eq!(primvar.element_index_per_corner(&topology).unwrap(), indices);
    }
}
