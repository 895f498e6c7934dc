//! Interpolation classification for exported primvars.
//!
//! Hosts hand out attribute data per face corner. Before writing it to USD
//! the exporter looks for the cheapest interpolation that still reproduces
//! every corner: a single constant value, one value per face, or one value
//! per point. Anything else stays faceVarying, optionally de-duplicated into
//! an indexed primvar.

use std::collections::HashMap;

use bytemuck::Pod;
use meshpack_math::{flatten, ApproxEq};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mesh::MeshTopology;
use crate::primvar::{Interpolation, Primvar, PrimvarError};

/// How hard the exporter tries to shrink primvar data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum CompactionLevel {
    /// Write one value per corner
    None = 0,

    /// De-duplicate faceVarying values into an indexed primvar
    Basic = 1,

    /// Basic, plus constant and uniform detection
    Medium = 2,

    /// Medium, plus per-vertex detection
    #[default]
    Full = 3,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid compaction level {0} (expected 0-3)")]
pub struct InvalidCompactionLevel(pub u32);

impl TryFrom<u32> for CompactionLevel {
    type Error = InvalidCompactionLevel;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CompactionLevel::None),
            1 => Ok(CompactionLevel::Basic),
            2 => Ok(CompactionLevel::Medium),
            3 => Ok(CompactionLevel::Full),
            other => Err(InvalidCompactionLevel(other)),
        }
    }
}

impl From<CompactionLevel> for u32 {
    fn from(level: CompactionLevel) -> Self {
        level as u32
    }
}

/// Attribute element types the compactor understands (scalars and glam vectors).
pub trait AttributeValue: ApproxEq + Pod + Default {}

impl<T: ApproxEq + Pod + Default> AttributeValue for T {}

/// Bit pattern used to de-duplicate values. Up to 4 components; `-0.0`
/// and `0.0` share a key.
fn dedup_key<T: AttributeValue>(value: &T) -> [u32; 4] {
    let components = flatten(std::slice::from_ref(value));
    debug_assert!(components.len() <= 4);
    let mut key = [0u32; 4];
    for (slot, component) in key.iter_mut().zip(components) {
        *slot = if *component == 0.0 { 0 } else { component.to_bits() };
    }
    key
}

fn is_constant<T: AttributeValue>(values: &[T], eps: f32) -> bool {
    match values.split_first() {
        Some((first, rest)) => rest.iter().all(|value| value.approx_eq(first, eps)),
        None => false,
    }
}

/// One value per face, or `None` if some face has differing corners.
fn uniform_values<T: AttributeValue>(
    values: &[T],
    topology: &MeshTopology,
    eps: f32,
) -> Option<Vec<T>> {
    let counts = topology.face_vertex_counts();
    let mut per_face = Vec::with_capacity(counts.len());
    for (&offset, &count) in topology.face_offsets().iter().zip(counts) {
        let corners = &values[offset..offset + count as usize];
        match corners.split_first() {
            Some((first, rest)) => {
                if !rest.iter().all(|value| value.approx_eq(first, eps)) {
                    return None;
                }
                per_face.push(*first);
            }
            None => per_face.push(T::default()),
        }
    }
    Some(per_face)
}

/// One value per point, or `None` if some point has differing corners.
///
/// Points no face references get `T::default()`.
fn vertex_values<T: AttributeValue>(
    values: &[T],
    topology: &MeshTopology,
    eps: f32,
) -> Option<Vec<T>> {
    let mut per_point: Vec<Option<T>> = vec![None; topology.point_count()];
    for (value, &point) in values.iter().zip(topology.face_vertex_indices()) {
        let slot = &mut per_point[point as usize];
        match slot {
            Some(existing) => {
                if !existing.approx_eq(value, eps) {
                    return None;
                }
            }
            None => *slot = Some(*value),
        }
    }
    Some(per_point.into_iter().map(Option::unwrap_or_default).collect())
}

/// Collapse identical values, returning the unique table and per-corner indices.
pub fn deduplicate<T: AttributeValue>(values: &[T]) -> (Vec<T>, Vec<i32>) {
    let mut unique = Vec::new();
    let mut indices = Vec::with_capacity(values.len());
    let mut lookup: HashMap<[u32; 4], i32> = HashMap::new();

    for value in values {
        let index = *lookup.entry(dedup_key(value)).or_insert_with(|| {
            unique.push(*value);
            (unique.len() - 1) as i32
        });
        indices.push(index);
    }

    (unique, indices)
}

/// Decide which interpolation per-corner `values` compact to.
///
/// Checks run constant, uniform, vertex; the first that holds wins.
pub fn classify_interpolation<T: AttributeValue>(
    values: &[T],
    topology: &MeshTopology,
    level: CompactionLevel,
    eps: f32,
) -> Interpolation {
    if values.len() != topology.corner_count() || values.is_empty() {
        return Interpolation::FaceVarying;
    }

    if level >= CompactionLevel::Medium {
        if is_constant(values, eps) {
            return Interpolation::Constant;
        }
        if uniform_values(values, topology, eps).is_some() {
            return Interpolation::Uniform;
        }
    }

    if level >= CompactionLevel::Full && vertex_values(values, topology, eps).is_some() {
        return Interpolation::Vertex;
    }

    Interpolation::FaceVarying
}

/// Compact per-corner `values` into the smallest equivalent primvar.
pub fn compact<T: AttributeValue>(
    name: &str,
    values: &[T],
    topology: &MeshTopology,
    level: CompactionLevel,
    eps: f32,
) -> Result<Primvar<T>, PrimvarError> {
    if values.len() != topology.corner_count() {
        return Err(PrimvarError::ElementCountMismatch {
            name: name.to_string(),
            interpolation: Interpolation::FaceVarying,
            expected: topology.corner_count(),
            actual: values.len(),
        });
    }

    if values.is_empty() {
        return Ok(Primvar::new(name, Interpolation::FaceVarying, Vec::new()));
    }

    if level >= CompactionLevel::Medium {
        if is_constant(values, eps) {
            log::debug!("Primvar '{}' compacted to constant", name);
            return Ok(Primvar::new(name, Interpolation::Constant, vec![values[0]]));
        }
        if let Some(per_face) = uniform_values(values, topology, eps) {
            log::debug!("Primvar '{}' compacted to uniform ({} faces)", name, per_face.len());
            return Ok(Primvar::new(name, Interpolation::Uniform, per_face));
        }
    }

    if level >= CompactionLevel::Full {
        if let Some(per_point) = vertex_values(values, topology, eps) {
            log::debug!("Primvar '{}' compacted to vertex ({} points)", name, per_point.len());
            return Ok(Primvar::new(name, Interpolation::Vertex, per_point));
        }
    }

    if level == CompactionLevel::None {
        return Ok(Primvar::new(name, Interpolation::FaceVarying, values.to_vec()));
    }

    let (unique, indices) = deduplicate(values);
    log::debug!(
        "Primvar '{}' stays faceVarying: {} corners, {} unique values",
        name,
        indices.len(),
        unique.len()
    );
    Ok(Primvar::indexed(name, Interpolation::FaceVarying, unique, indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::test_cube;
    use meshpack_math::{Vec2, Vec4, DEFAULT_TOLERANCE};

    #[test]
    fn test_compaction_level_conversions() {
        assert_eq!(CompactionLevel::try_from(2).unwrap(), CompactionLevel::Medium);
        assert_eq!(CompactionLevel::try_from(4), Err(InvalidCompactionLevel(4)));
        assert_eq!(u32::from(CompactionLevel::Full), 3);
        assert_eq!(CompactionLevel::default(), CompactionLevel::Full);
    }

    #[test]
    fn test_compact_constant() {
        let topology = test_cube().topology;
        let values = vec![Vec2::new(0.5, 0.5); 24];

        let primvar = compact("st", &values, &topology, CompactionLevel::Full, DEFAULT_TOLERANCE).unwrap();

        assert_eq!(primvar.interpolation, Interpolation::Constant);
        assert_eq!(primvar.values, vec![Vec2::new(0.5, 0.5)]);
        assert!(!primvar.is_indexed());
    }

    #[test]
    fn test_compact_constant_within_tolerance() {
        let topology = test_cube().topology;
        let mut values = vec![Vec4::new(0.3, 0.4, 0.5, 1.0); 24];
        values[7].x += 1e-6;

        let interpolation = classify_interpolation(&values, &topology, CompactionLevel::Full, DEFAULT_TOLERANCE);
        assert_eq!(interpolation, Interpolation::Constant);
    }

    #[test]
    fn test_compact_uniform() {
        let topology = test_cube().topology;
        let values: Vec<Vec2> = topology
            .corner_face_ids()
            .into_iter()
            .map(|face| Vec2::splat(0.1 * face as f32 + 0.1))
            .collect();

        let primvar = compact("st", &values, &topology, CompactionLevel::Full, DEFAULT_TOLERANCE).unwrap();

        assert_eq!(primvar.interpolation, Interpolation::Uniform);
        assert_eq!(primvar.values.len(), 6);
        for (face, value) in primvar.values.iter().enumerate() {
            let expected = 0.1 * face as f32 + 0.1;
            assert!((value.x - expected).abs() < 1e-5);
            assert!((value.y - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn test_compact_vertex() {
        let topology = test_cube().topology;
        // Planar projection along X: uv = (y + 0.5, z + 0.5) per point
        let mesh = test_cube();
        let values: Vec<Vec2> = topology
            .face_vertex_indices()
            .iter()
            .map(|&p| {
                let point = mesh.points[p as usize];
                Vec2::new(point.y + 0.5, point.z + 0.5)
            })
            .collect();

        let primvar = compact("st", &values, &topology, CompactionLevel::Full, DEFAULT_TOLERANCE).unwrap();

        assert_eq!(primvar.interpolation, Interpolation::Vertex);
        assert_eq!(primvar.values.len(), 8);
        assert_eq!(primvar.values[0], Vec2::new(0.0, 1.0));
        assert_eq!(primvar.values[4], Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_compact_face_varying_deduplicates() {
        let topology = test_cube().topology;
        let quad = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0)];
        let values: Vec<Vec2> = (0..6).flat_map(|_| quad).collect();

        let primvar = compact("st", &values, &topology, CompactionLevel::Full, DEFAULT_TOLERANCE).unwrap();

        assert_eq!(primvar.interpolation, Interpolation::FaceVarying);
        assert_eq!(primvar.values, quad.to_vec());
        let indices = primvar.indices.as_ref().unwrap();
        assert_eq!(indices.len(), 24);
        assert_eq!(&indices[..8], &[0, 1, 2, 3, 0, 1, 2, 3]);
        assert_eq!(primvar.expand_face_varying(&topology).unwrap(), values);
    }

    #[test]
    fn test_compaction_level_limits_detection() {
        let topology = test_cube().topology;
        let values = vec![Vec2::new(0.5, 0.5); 24];

        let basic = compact("st", &values, &topology, CompactionLevel::Basic, DEFAULT_TOLERANCE).unwrap();
        assert_eq!(basic.interpolation, Interpolation::FaceVarying);
        assert_eq!(basic.values.len(), 1);
        assert_eq!(basic.indices.as_ref().unwrap(), &vec![0; 24]);

        let none = compact("st", &values, &topology, CompactionLevel::None, DEFAULT_TOLERANCE).unwrap();
        assert_eq!(none.interpolation, Interpolation::FaceVarying);
        assert_eq!(none.values.len(), 24);
        assert!(!none.is_indexed());
    }

    #[test]
    fn test_medium_skips_vertex_detection() {
        let mesh = test_cube();
        let values: Vec<f32> = mesh
            .topology
            .face_vertex_indices()
            .iter()
            .map(|&p| p as f32)
            .collect();

        assert_eq!(
            classify_interpolation(&values, &mesh.topology, CompactionLevel::Full, DEFAULT_TOLERANCE),
            Interpolation::Vertex
        );
        assert_eq!(
            classify_interpolation(&values, &mesh.topology, CompactionLevel::Medium, DEFAULT_TOLERANCE),
            Interpolation::FaceVarying
        );
    }

    #[test]
    fn test_compact_rejects_wrong_length() {
        let topology = test_cube().topology;
        let err = compact("st", &[Vec2::ZERO; 3], &topology, CompactionLevel::Full, DEFAULT_TOLERANCE).unwrap_err();
        assert!(matches!(err, PrimvarError::ElementCountMismatch { expected: 24, actual: 3, .. }));
    }

    #[test]
    fn test_compact_empty_topology() {
        let topology = MeshTopology::new(Vec::new(), Vec::new(), 0).unwrap();
        let values: Vec<Vec2> = Vec::new();

        assert_eq!(
            classify_interpolation(&values, &topology, CompactionLevel::Full, DEFAULT_TOLERANCE),
            Interpolation::FaceVarying
        );
        let primvar = compact("st", &values, &topology, CompactionLevel::Full, DEFAULT_TOLERANCE).unwrap();
        assert_eq!(primvar.interpolation, Interpolation::FaceVarying);
        assert!(primvar.values.is_empty());
        assert!(!primvar.is_indexed());
    }

    #[test]
    fn test_compact_vertex_unreferenced_point() {
        // Point 3 belongs to no face
        let topology = MeshTopology::new(vec![3], vec![0, 1, 2], 4).unwrap();
        let values = vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)];

        let primvar = compact("st", &values, &topology, CompactionLevel::Full, DEFAULT_TOLERANCE).unwrap();

        assert_eq!(primvar.interpolation, Interpolation::Vertex);
        assert_eq!(primvar.values.len(), 4);
        assert_eq!(&primvar.values[..3], values.as_slice());
        assert_eq!(primvar.values[3], Vec2::default());
    }

    #[test]
    fn test_deduplicate_signed_zero() {
        let (unique, indices) = deduplicate(&[Vec2::new(0.0, 1.0), Vec2::new(-0.0, 1.0)]);
        assert_eq!(unique.len(), 1);
        assert_eq!(indices, vec![0, 0]);
    }
}
