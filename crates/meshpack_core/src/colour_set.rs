//! Host-side colour sets and their conversion to and from USD colour primvars.

use meshpack_math::{flatten, flatten_mut, Vec3, Vec4};

use crate::compaction::{compact, CompactionLevel};
use crate::mesh::MeshTopology;
use crate::packing::convert_3d_array_to_4d_array;
use crate::primvar::{Primvar, PrimvarError};
use crate::uv_set::AttributeSetError;

/// Colour written for corners that have no colour assigned.
pub const UNASSIGNED_COLOUR: Vec4 = Vec4::ZERO;

/// An RGBA colour set: a colour table plus one table index per face corner.
///
/// A corner id of -1 means no colour is assigned to that corner.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColourSet {
    pub name: String,
    pub colours: Vec<Vec4>,
    pub colour_ids: Vec<i32>,
}

impl ColourSet {
    pub fn new(name: impl Into<String>, colours: Vec<Vec4>, colour_ids: Vec<i32>) -> Self {
        Self {
            name: name.into(),
            colours,
            colour_ids,
        }
    }

    /// Colour set where corner `i` uses `colours[i]`.
    pub fn per_corner(name: impl Into<String>, colours: Vec<Vec4>) -> Self {
        let colour_ids = (0..colours.len() as i32).collect();
        Self::new(name, colours, colour_ids)
    }

    /// True if some corner has no colour.
    pub fn is_sparse(&self) -> bool {
        self.colour_ids.iter().any(|&id| id < 0)
    }

    /// One colour per face corner, unassigned corners get [`UNASSIGNED_COLOUR`].
    pub fn corner_values(&self, topology: &MeshTopology) -> Result<Vec<Vec4>, AttributeSetError> {
        if self.colour_ids.len() != topology.corner_count() {
            return Err(AttributeSetError::IdCountMismatch {
                name: self.name.clone(),
                expected: topology.corner_count(),
                actual: self.colour_ids.len(),
            });
        }

        self.colour_ids
            .iter()
            .enumerate()
            .map(|(corner, &id)| {
                if id < 0 {
                    return Ok(UNASSIGNED_COLOUR);
                }
                self.colours
                    .get(id as usize)
                    .copied()
                    .ok_or_else(|| AttributeSetError::IdOutOfRange {
                        name: self.name.clone(),
                        corner,
                        id,
                        len: self.colours.len(),
                    })
            })
            .collect()
    }

    /// Export as a `color4f[]` primvar.
    pub fn to_primvar(
        &self,
        topology: &MeshTopology,
        level: CompactionLevel,
        tolerance: f32,
    ) -> Result<Primvar<Vec4>, AttributeSetError> {
        if self.is_sparse() {
            log::warn!(
                "Colour set '{}' has unassigned corners, writing them as {:?}",
                self.name,
                UNASSIGNED_COLOUR
            );
        }
        let corners = self.corner_values(topology)?;
        Ok(compact(&self.name, &corners, topology, level, tolerance)?)
    }

    /// Import from a `color4f[]` primvar.
    pub fn from_primvar(
        primvar: &Primvar<Vec4>,
        topology: &MeshTopology,
    ) -> Result<Self, PrimvarError> {
        let colour_ids = primvar.element_index_per_corner(topology)?;
        log::debug!(
            "Imported colour set '{}' ({}, {} colours)",
            primvar.name,
            primvar.interpolation,
            primvar.values.len()
        );
        Ok(Self::new(primvar.name.clone(), primvar.values.clone(), colour_ids))
    }

    /// Import from a `color3f[]` primvar, with alpha set to 1.
    pub fn from_rgb_primvar(
        primvar: &Primvar<Vec3>,
        topology: &MeshTopology,
    ) -> Result<Self, PrimvarError> {
        let count = primvar.values.len();
        let mut rgba = vec![Vec4::ZERO; count];
        convert_3d_array_to_4d_array(flatten(&primvar.values), flatten_mut(&mut rgba), count);

        let widened = Primvar {
            name: primvar.name.clone(),
            interpolation: primvar.interpolation,
            values: rgba,
            indices: primvar.indices.clone(),
        };
        Self::from_primvar(&widened, topology)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::test_cube;
    use crate::primvar::Interpolation;
    use meshpack_math::DEFAULT_TOLERANCE;

    #[test]
    fn test_constant_colour_export() {
        let topology = test_cube().topology;
        let set = ColourSet::per_corner("test", vec![Vec4::new(0.3, 0.4, 0.5, 1.0); 24]);

        let primvar = set
            .to_primvar(&topology, CompactionLevel::Full, DEFAULT_TOLERANCE)
            .unwrap();

        assert_eq!(primvar.interpolation, Interpolation::Constant);
        assert_eq!(primvar.values.len(), 1);
        let colour = primvar.values[0];
        assert!((colour.x - 0.3).abs() < 1e-5);
        assert!((colour.y - 0.4).abs() < 1e-5);
        assert!((colour.z - 0.5).abs() < 1e-5);
        assert!((colour.w - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_vertex_colour_export() {
        let topology = test_cube().topology;
        let colours: Vec<Vec4> = topology
            .face_vertex_indices()
            .iter()
            .map(|&point| Vec4::new(0.3 * point as f32, 0.4, 0.5, 1.0))
            .collect();
        let set = ColourSet::per_corner("test", colours);

        let primvar = set
            .to_primvar(&topology, CompactionLevel::Full, DEFAULT_TOLERANCE)
            .unwrap();

        assert_eq!(primvar.interpolation, Interpolation::Vertex);
        assert_eq!(primvar.values.len(), 8);
        for (i, colour) in primvar.values.iter().enumerate() {
            assert!((colour.x - 0.3 * i as f32).abs() < 1e-5);
            assert!((colour.w - 1.0).abs() < 1e-5);
        }

        // Re-import and export again keeps vertex interpolation
        let imported = ColourSet::from_primvar(&primvar, &topology).unwrap();
        let again = imported
            .to_primvar(&topology, CompactionLevel::Full, DEFAULT_TOLERANCE)
            .unwrap();
        assert_eq!(again, primvar);
    }

    #[test]
    fn test_face_varying_colour_export() {
        let topology = test_cube().topology;
        let colours: Vec<Vec4> = (0..24)
            .map(|corner| Vec4::new(corner as f32 / 24.0, 0.0, 0.0, 1.0))
            .collect();
        let set = ColourSet::per_corner("test", colours.clone());

        let primvar = set
            .to_primvar(&topology, CompactionLevel::Full, DEFAULT_TOLERANCE)
            .unwrap();

        assert_eq!(primvar.interpolation, Interpolation::FaceVarying);
        assert_eq!(primvar.expand_face_varying(&topology).unwrap(), colours);
    }

    #[test]
    fn test_unassigned_corners() {
        let topology = test_cube().topology;
        let mut ids = vec![0; 24];
        ids[3] = -1;
        let set = ColourSet::new("test", vec![Vec4::ONE], ids);
        assert!(set.is_sparse());

        let corners = set.corner_values(&topology).unwrap();
        assert_eq!(corners[3], UNASSIGNED_COLOUR);
        assert_eq!(corners[4], Vec4::ONE);
    }

    #[test]
    fn test_import_rgb_widens_alpha() {
        let topology = test_cube().topology;
        let primvar = Primvar::new(
            "displayColor",
            Interpolation::Uniform,
            (0..6).map(|face| Vec3::new(face as f32, 0.5, 0.25)).collect(),
        );

        let set = ColourSet::from_rgb_primvar(&primvar, &topology).unwrap();

        assert_eq!(set.colours.len(), 6);
        assert_eq!(set.colours[2], Vec4::new(2.0, 0.5, 0.25, 1.0));
        assert_eq!(&set.colour_ids[..5], &[0, 0, 0, 0, 1]);
    }

    #[test]
    fn test_corner_count_mismatch() {
        let topology = test_cube().topology;
        let set = ColourSet::per_corner("test", vec![Vec4::ONE; 4]);
        assert!(matches!(
            set.corner_values(&topology),
            Err(AttributeSetError::IdCountMismatch { expected: 24, actual: 4, .. })
        ));
    }
}
