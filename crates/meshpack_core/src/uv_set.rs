//! Host-side UV sets and their conversion to and from USD texCoord primvars.
//!
//! A host stores a UV set as a table of unique coordinates (separate U and V
//! arrays) plus, per face, how many corners have UVs (`uv_counts`) and which
//! table entry each of those corners uses (`uv_ids`). A face with a zero
//! count has no UVs at all, which makes the set "sparse".

use meshpack_math::{flatten, flatten_mut, Vec2};
use thiserror::Error;

use crate::compaction::{compact, CompactionLevel};
use crate::mesh::MeshTopology;
use crate::packing::{
    generate_incrementing_indices, interleave_indexed_uv_data, is_uv_set_data_sparse, unzip_uvs,
    zip_uvs,
};
use crate::primvar::{Interpolation, Primvar, PrimvarError};

/// Host name of the default UV set.
pub const DEFAULT_UV_SET: &str = "map1";

/// USD primvar name of the default UV set.
pub const DEFAULT_UV_PRIMVAR: &str = "st";

/// Errors from UV and colour sets that do not match their mesh.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttributeSetError {
    #[error("Set '{name}': {u} U values but {v} V values")]
    ChannelLengthMismatch { name: String, u: usize, v: usize },

    #[error("Set '{name}': {actual} per-face counts for {expected} faces")]
    FaceCountMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Set '{name}': face {face} has {count} assigned corners, expected 0 or {expected}")]
    PartialFace {
        name: String,
        face: usize,
        count: i32,
        expected: i32,
    },

    #[error("Set '{name}': {actual} ids for {expected} assigned corners")]
    IdCountMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Set '{name}': id {id} at corner {corner} is out of range for {len} values")]
    IdOutOfRange {
        name: String,
        corner: usize,
        id: i32,
        len: usize,
    },

    #[error(transparent)]
    Primvar(#[from] PrimvarError),
}

/// A UV set in host layout.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UvSet {
    pub name: String,
    pub u: Vec<f32>,
    pub v: Vec<f32>,

    /// Assigned corners per face: 0 or the face's vertex count
    pub uv_counts: Vec<i32>,

    /// Table entry for each assigned corner, faces in order
    pub uv_ids: Vec<i32>,
}

impl UvSet {
    /// Create a fully assigned UV set from per-corner ids.
    pub fn new(
        name: impl Into<String>,
        u: Vec<f32>,
        v: Vec<f32>,
        topology: &MeshTopology,
        uv_ids: Vec<i32>,
    ) -> Self {
        Self {
            name: name.into(),
            u,
            v,
            uv_counts: topology.face_vertex_counts().to_vec(),
            uv_ids,
        }
    }

    /// Number of entries in the UV table.
    pub fn len(&self) -> usize {
        self.u.len()
    }

    pub fn is_empty(&self) -> bool {
        self.u.is_empty()
    }

    /// True if at least one face has no UVs.
    pub fn is_sparse(&self) -> bool {
        is_uv_set_data_sparse(&self.uv_counts)
    }

    /// The USD primvar name for this set.
    pub fn primvar_name(&self) -> &str {
        if self.name == DEFAULT_UV_SET {
            DEFAULT_UV_PRIMVAR
        } else {
            &self.name
        }
    }

    /// Check the set against `topology`.
    pub fn validate(&self, topology: &MeshTopology) -> Result<(), AttributeSetError> {
        if self.u.len() != self.v.len() {
            return Err(AttributeSetError::ChannelLengthMismatch {
                name: self.name.clone(),
                u: self.u.len(),
                v: self.v.len(),
            });
        }

        if self.uv_counts.len() != topology.face_count() {
            return Err(AttributeSetError::FaceCountMismatch {
                name: self.name.clone(),
                expected: topology.face_count(),
                actual: self.uv_counts.len(),
            });
        }

        let mut assigned = 0usize;
        for (face, (&count, &expected)) in self
            .uv_counts
            .iter()
            .zip(topology.face_vertex_counts())
            .enumerate()
        {
            if count != 0 && count != expected {
                return Err(AttributeSetError::PartialFace {
                    name: self.name.clone(),
                    face,
                    count,
                    expected,
                });
            }
            assigned += count as usize;
        }

        if self.uv_ids.len() != assigned {
            return Err(AttributeSetError::IdCountMismatch {
                name: self.name.clone(),
                expected: assigned,
                actual: self.uv_ids.len(),
            });
        }

        for (corner, &id) in self.uv_ids.iter().enumerate() {
            if id < 0 || id as usize >= self.u.len() {
                return Err(AttributeSetError::IdOutOfRange {
                    name: self.name.clone(),
                    corner,
                    id,
                    len: self.u.len(),
                });
            }
        }

        Ok(())
    }

    /// The UV table as interleaved coordinates.
    pub fn table(&self) -> Vec<Vec2> {
        let count = self.u.len().min(self.v.len());
        let mut table = vec![Vec2::ZERO; count];
        zip_uvs(&self.u, &self.v, flatten_mut(&mut table), count);
        table
    }

    /// One coordinate per face corner. Only valid for non-sparse sets.
    pub fn corner_values(&self, topology: &MeshTopology) -> Result<Vec<Vec2>, AttributeSetError> {
        self.validate(topology)?;
        let count = self.uv_ids.len();
        let mut corners = vec![Vec2::ZERO; count];
        interleave_indexed_uv_data(flatten_mut(&mut corners), &self.u, &self.v, &self.uv_ids, count);
        Ok(corners)
    }

    /// Export as a texCoord primvar.
    ///
    /// Sparse sets are not compacted: every corner of an unassigned face
    /// points at a trailing `(0, 0)` entry of an indexed faceVarying primvar.
    pub fn to_primvar(
        &self,
        topology: &MeshTopology,
        level: CompactionLevel,
        tolerance: f32,
    ) -> Result<Primvar<Vec2>, AttributeSetError> {
        if self.is_sparse() {
            return self.sparse_primvar(topology);
        }

        let corners = self.corner_values(topology)?;
        Ok(compact(self.primvar_name(), &corners, topology, level, tolerance)?)
    }

    fn sparse_primvar(&self, topology: &MeshTopology) -> Result<Primvar<Vec2>, AttributeSetError> {
        self.validate(topology)?;
        log::warn!(
            "UV set '{}' is sparse, exporting uncompacted faceVarying data",
            self.name
        );

        let mut values = self.table();
        let unassigned = values.len() as i32;
        values.push(Vec2::ZERO);

        let mut indices = Vec::with_capacity(topology.corner_count());
        let mut ids = self.uv_ids.iter();
        for (&count, &face_size) in self.uv_counts.iter().zip(topology.face_vertex_counts()) {
            if count == 0 {
                indices.extend(std::iter::repeat(unassigned).take(face_size as usize));
            } else {
                indices.extend(ids.by_ref().take(count as usize));
            }
        }

        Ok(Primvar::indexed(
            self.primvar_name(),
            Interpolation::FaceVarying,
            values,
            indices,
        ))
    }

    /// Import from a texCoord primvar of any interpolation.
    pub fn from_primvar(
        primvar: &Primvar<Vec2>,
        topology: &MeshTopology,
    ) -> Result<Self, AttributeSetError> {
        let name = if primvar.name == DEFAULT_UV_PRIMVAR {
            DEFAULT_UV_SET.to_string()
        } else {
            primvar.name.clone()
        };

        let uv_ids = match (primvar.interpolation, &primvar.indices) {
            (Interpolation::FaceVarying, None) => {
                primvar.validate(topology)?;
                let mut ids = Vec::new();
                generate_incrementing_indices(&mut ids, topology.corner_count());
                ids
            }
            _ => primvar.element_index_per_corner(topology)?,
        };

        let count = primvar.values.len();
        let mut u = vec![0.0f32; count];
        let mut v = vec![0.0f32; count];
        unzip_uvs(flatten(&primvar.values), &mut u, &mut v, count);

        log::debug!(
            "Imported UV set '{}' ({}, {} coordinates)",
            name,
            primvar.interpolation,
            count
        );

        Ok(Self::new(name, u, v, topology, uv_ids))
    }
}
