//! Export options.
//!
//! Options arrive either as a translator option string
//! (`"Meshes=1;Mesh_Normals=1;Compaction_Level=3;"`) or from a serialized
//! config (JSON, TOML, ...) through serde.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compaction::CompactionLevel;
use meshpack_math::DEFAULT_TOLERANCE;

/// Errors from parsing an option string.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptionsError {
    #[error("Malformed option '{0}' (expected Key=Value)")]
    Malformed(String),

    #[error("Invalid value '{value}' for option {key}")]
    InvalidValue { key: String, value: String },
}

/// Controls what the mesh exporter writes and how it compacts primvars.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Export meshes at all
    pub meshes: bool,

    /// Write normals
    pub mesh_normals: bool,

    /// Write UV sets
    pub mesh_uvs: bool,

    /// Write colour sets
    pub mesh_colours: bool,

    /// Primvar compaction
    pub compaction_level: CompactionLevel,

    /// Component tolerance used when comparing values for compaction
    pub tolerance: f32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            meshes: true,
            mesh_normals: true,
            mesh_uvs: true,
            mesh_colours: true,
            compaction_level: CompactionLevel::default(),
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl ExportOptions {
    /// Parse a `Key=Value;Key=Value;` option string on top of the defaults.
    ///
    /// Keys this exporter does not use (animation ranges, transform merging,
    /// ...) are skipped.
    pub fn parse(options: &str) -> Result<Self, OptionsError> {
        let mut result = Self::default();

        for pair in options.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| OptionsError::Malformed(pair.to_string()))?;
            let key = key.trim();
            let value = value.trim();

            match key {
                "Meshes" => result.meshes = parse_flag(key, value)?,
                "Mesh_Normals" => result.mesh_normals = parse_flag(key, value)?,
                "Mesh_UVs" => result.mesh_uvs = parse_flag(key, value)?,
                "Mesh_Colours" | "Mesh_Colors" => result.mesh_colours = parse_flag(key, value)?,
                "Compaction_Level" => {
                    result.compaction_level = value
                        .parse::<u32>()
                        .ok()
                        .and_then(|level| CompactionLevel::try_from(level).ok())
                        .ok_or_else(|| invalid(key, value))?;
                }
                "Tolerance" => {
                    result.tolerance = value
                        .parse::<f32>()
                        .ok()
                        .filter(|t| t.is_finite() && *t >= 0.0)
                        .ok_or_else(|| invalid(key, value))?;
                }
                _ => log::debug!("Ignoring export option {}={}", key, value),
            }
        }

        Ok(result)
    }
}

fn invalid(key: &str, value: &str) -> OptionsError {
    OptionsError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, OptionsError> {
    match value {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}
