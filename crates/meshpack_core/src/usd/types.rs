//! USD prim types for the subset of USDA this crate reads and writes.

use meshpack_math::{Vec2, Vec3, Vec4};

use crate::mesh::{MeshTopology, TopologyError};
use crate::primvar::{Interpolation, Primvar};
use crate::usd::light_filter::LightFilter;

/// A parsed USD prim.
#[derive(Clone, Debug, PartialEq)]
pub enum UsdPrim {
    /// A polygon mesh with primvars
    Mesh(MeshPrim),

    /// A light filter
    LightFilter(LightFilter),

    /// Any other prim type (type name kept for diagnostics)
    Unknown(String),
}

/// Typed primvar payloads a mesh can carry.
#[derive(Clone, Debug, PartialEq)]
pub enum PrimvarData {
    /// `texCoord2f[]` (also read from `float2[]`)
    TexCoord2f(Primvar<Vec2>),

    /// `color3f[]`
    Color3f(Primvar<Vec3>),

    /// `color4f[]`
    Color4f(Primvar<Vec4>),
}

impl PrimvarData {
    pub fn name(&self) -> &str {
        match self {
            PrimvarData::TexCoord2f(p) => &p.name,
            PrimvarData::Color3f(p) => &p.name,
            PrimvarData::Color4f(p) => &p.name,
        }
    }

    pub fn interpolation(&self) -> Interpolation {
        match self {
            PrimvarData::TexCoord2f(p) => p.interpolation,
            PrimvarData::Color3f(p) => p.interpolation,
            PrimvarData::Color4f(p) => p.interpolation,
        }
    }

    pub fn indices(&self) -> Option<&[i32]> {
        match self {
            PrimvarData::TexCoord2f(p) => p.indices.as_deref(),
            PrimvarData::Color3f(p) => p.indices.as_deref(),
            PrimvarData::Color4f(p) => p.indices.as_deref(),
        }
    }

    /// Number of entries in the value table.
    pub fn value_count(&self) -> usize {
        match self {
            PrimvarData::TexCoord2f(p) => p.values.len(),
            PrimvarData::Color3f(p) => p.values.len(),
            PrimvarData::Color4f(p) => p.values.len(),
        }
    }

    /// USDA value type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            PrimvarData::TexCoord2f(_) => "texCoord2f[]",
            PrimvarData::Color3f(_) => "color3f[]",
            PrimvarData::Color4f(_) => "color4f[]",
        }
    }
}

/// A USD Mesh prim.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshPrim {
    /// Prim path (e.g. "/pCube1")
    pub path: String,

    /// Prim name (last component of path)
    pub name: String,

    /// Point positions
    pub points: Vec<Vec3>,

    /// Number of vertices per face
    pub face_vertex_counts: Vec<i32>,

    /// Point index of every face corner
    pub face_vertex_indices: Vec<i32>,

    /// Normals, written as `primvars:normals`
    pub normals: Option<Primvar<Vec3>>,

    /// Texture coordinate and colour primvars
    pub primvars: Vec<PrimvarData>,
}

impl MeshPrim {
    /// Validated topology of this mesh.
    pub fn topology(&self) -> Result<MeshTopology, TopologyError> {
        MeshTopology::new(
            self.face_vertex_counts.clone(),
            self.face_vertex_indices.clone(),
            self.points.len(),
        )
    }

    /// Find a primvar by name.
    pub fn primvar(&self, name: &str) -> Option<&PrimvarData> {
        self.primvars.iter().find(|p| p.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primvar_lookup() {
        let mesh = MeshPrim {
            primvars: vec![
                PrimvarData::TexCoord2f(Primvar::new("st", Interpolation::Constant, vec![Vec2::ZERO])),
                PrimvarData::Color4f(Primvar::new("test", Interpolation::Constant, vec![Vec4::ONE])),
            ],
            ..Default::default()
        };

        let colour = mesh.primvar("test").unwrap();
        assert_eq!(colour.type_name(), "color4f[]");
        assert_eq!(colour.value_count(), 1);
        assert!(colour.indices().is_none());
        assert!(mesh.primvar("displayColor").is_none());
    }

    #[test]
    fn test_topology_from_prim() {
        let mesh = MeshPrim {
            points: vec![Vec3::ZERO; 3],
            face_vertex_counts: vec![3],
            face_vertex_indices: vec![0, 1, 2],
            ..Default::default()
        };
        let topology = mesh.topology().unwrap();
        assert_eq!(topology.corner_count(), 3);

        let broken = MeshPrim {
            face_vertex_indices: vec![0, 1, 5],
            ..mesh
        };
        assert!(broken.topology().is_err());
    }
}
