//! Mesh translation between host meshes and USD mesh prims.
//!
//! Export turns a [`PolyMesh`] into a [`MeshPrim`], compacting every
//! attribute set according to the [`ExportOptions`]. Import goes the other
//! way and expands primvars back into host-style sets. Exporting an imported
//! mesh reproduces the same primvars, except vertex values of points that no
//! face uses, which come back as zero.

use std::path::Path;

use thiserror::Error;

use crate::colour_set::ColourSet;
use crate::compaction::compact;
use crate::mesh::{PolyMesh, TopologyError};
use crate::options::{ExportOptions, OptionsError};
use crate::primvar::PrimvarError;
use crate::usd::{
    parse_usda, write_usda, write_usda_file, LightFilter, MeshPrim, ParseError, PrimvarData,
    UsdPrim,
};
use crate::uv_set::{AttributeSetError, UvSet, DEFAULT_UV_SET};

/// Errors that can occur while translating meshes.
#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid options: {0}")]
    Options(#[from] OptionsError),

    #[error("Invalid topology: {0}")]
    Topology(#[from] TopologyError),

    #[error("Invalid primvar: {0}")]
    Primvar(#[from] PrimvarError),

    #[error("Invalid attribute set: {0}")]
    AttributeSet(#[from] AttributeSetError),

    #[error("Mesh '{mesh}' has {actual} points but its topology expects {expected}")]
    PointCountMismatch {
        mesh: String,
        expected: usize,
        actual: usize,
    },

    #[error("No meshes or light filters found")]
    NothingToImport,
}

/// Result type for translation operations.
pub type TranslateResult<T> = Result<T, TranslateError>;

/// Everything imported from one USDA layer.
#[derive(Clone, Debug, Default)]
pub struct ImportedLayer {
    pub meshes: Vec<PolyMesh>,
    pub light_filters: Vec<LightFilter>,
}

/// Converts meshes to and from USD.
#[derive(Clone, Debug, Default)]
pub struct MeshTranslator {
    options: ExportOptions,
}

impl MeshTranslator {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    /// Create a translator from a `Key=Value;` option string.
    pub fn from_option_string(options: &str) -> TranslateResult<Self> {
        Ok(Self::new(ExportOptions::parse(options)?))
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Convert a host mesh into a USD mesh prim.
    pub fn export_mesh(&self, mesh: &PolyMesh) -> TranslateResult<MeshPrim> {
        let topology = &mesh.topology;
        if mesh.points.len() != topology.point_count() {
            return Err(TranslateError::PointCountMismatch {
                mesh: mesh.name.clone(),
                expected: topology.point_count(),
                actual: mesh.points.len(),
            });
        }

        let level = self.options.compaction_level;
        let tolerance = self.options.tolerance;

        let mut prim = MeshPrim {
            path: format!("/{}", mesh.name),
            name: mesh.name.clone(),
            points: mesh.points.clone(),
            face_vertex_counts: topology.face_vertex_counts().to_vec(),
            face_vertex_indices: topology.face_vertex_indices().to_vec(),
            normals: None,
            primvars: Vec::new(),
        };

        if self.options.mesh_normals {
            if let Some(normals) = &mesh.normals {
                prim.normals = Some(compact("normals", normals, topology, level, tolerance)?);
            }
        }

        if self.options.mesh_uvs {
            for uv_set in &mesh.uv_sets {
                let primvar = uv_set.to_primvar(topology, level, tolerance)?;
                prim.primvars.push(PrimvarData::TexCoord2f(primvar));
            }
        }

        if self.options.mesh_colours {
            for colour_set in &mesh.colour_sets {
                let primvar = colour_set.to_primvar(topology, level, tolerance)?;
                prim.primvars.push(PrimvarData::Color4f(primvar));
            }
        }

        log::info!(
            "Exported mesh '{}' ({} points, {} faces, {} primvars)",
            mesh.name,
            mesh.points.len(),
            topology.face_count(),
            prim.primvars.len()
        );

        Ok(prim)
    }

    /// Convert a USD mesh prim into a host mesh.
    pub fn import_mesh(&self, prim: &MeshPrim) -> TranslateResult<PolyMesh> {
        let topology = prim.topology()?;
        let mut mesh = PolyMesh::new(prim.name.clone(), prim.points.clone(), topology);

        if let Some(normals) = &prim.normals {
            mesh.normals = Some(normals.expand_face_varying(&mesh.topology)?);
        }

        for primvar in &prim.primvars {
            match primvar {
                PrimvarData::TexCoord2f(p) => {
                    mesh.uv_sets.push(UvSet::from_primvar(p, &mesh.topology)?);
                }
                PrimvarData::Color4f(p) => {
                    mesh.colour_sets.push(ColourSet::from_primvar(p, &mesh.topology)?);
                }
                PrimvarData::Color3f(p) => {
                    mesh.colour_sets.push(ColourSet::from_rgb_primvar(p, &mesh.topology)?);
                }
            }
        }

        // The default UV set comes first on the host
        if let Some(pos) = mesh.uv_sets.iter().position(|s| s.name == DEFAULT_UV_SET) {
            let default_set = mesh.uv_sets.remove(pos);
            mesh.uv_sets.insert(0, default_set);
        }

        log::info!(
            "Imported mesh '{}' ({} UV sets, {} colour sets)",
            mesh.name,
            mesh.uv_sets.len(),
            mesh.colour_sets.len()
        );

        Ok(mesh)
    }

    /// Exported prims for a layer: meshes first, then light filters.
    fn layer_prims(
        &self,
        meshes: &[PolyMesh],
        light_filters: &[LightFilter],
    ) -> TranslateResult<Vec<UsdPrim>> {
        let mut prims = Vec::with_capacity(meshes.len() + light_filters.len());

        if self.options.meshes {
            for mesh in meshes {
                prims.push(UsdPrim::Mesh(self.export_mesh(mesh)?));
            }
        } else if !meshes.is_empty() {
            log::info!("Mesh export disabled, skipping {} meshes", meshes.len());
        }

        prims.extend(light_filters.iter().cloned().map(UsdPrim::LightFilter));
        Ok(prims)
    }

    /// Render meshes and light filters as USDA text.
    pub fn export_usda_string(
        &self,
        meshes: &[PolyMesh],
        light_filters: &[LightFilter],
    ) -> TranslateResult<String> {
        Ok(write_usda(&self.layer_prims(meshes, light_filters)?))
    }

    /// Write meshes and light filters to a USDA file.
    pub fn export_usda<P: AsRef<Path>>(
        &self,
        path: P,
        meshes: &[PolyMesh],
        light_filters: &[LightFilter],
    ) -> TranslateResult<()> {
        let prims = self.layer_prims(meshes, light_filters)?;
        write_usda_file(path, &prims)?;
        Ok(())
    }

    /// Import every mesh and light filter from USDA text.
    pub fn import_usda_from_string(&self, content: &str) -> TranslateResult<ImportedLayer> {
        let mut layer = ImportedLayer::default();

        for prim in parse_usda(content)? {
            match prim {
                UsdPrim::Mesh(mesh) => layer.meshes.push(self.import_mesh(&mesh)?),
                UsdPrim::LightFilter(filter) => layer.light_filters.push(filter),
                UsdPrim::Unknown(type_name) => {
                    log::debug!("Skipping prim of type '{}'", type_name);
                }
            }
        }

        if layer.meshes.is_empty() && layer.light_filters.is_empty() {
            return Err(TranslateError::NothingToImport);
        }

        Ok(layer)
    }

    /// Import every mesh and light filter from a USDA file.
    pub fn import_usda<P: AsRef<Path>>(&self, path: P) -> TranslateResult<ImportedLayer> {
        let content = std::fs::read_to_string(path.as_ref())?;
        self.import_usda_from_string(&content)
    }
}
