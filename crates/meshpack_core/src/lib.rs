//! Meshpack Core - mesh attribute packing and USD primvar translation.
//!
//! This crate provides:
//!
//! - **Packing utilities**: interleaving, widening and index generation over
//!   flat attribute buffers (`packing`)
//! - **Primvars**: interpolation modes, indexed primvars and compaction of
//!   per-corner data to the cheapest interpolation (`primvar`, `compaction`)
//! - **Host attribute sets**: face-relative UV and colour sets (`uv_set`,
//!   `colour_set`) and the mesh translator built on them (`translator`)
//! - **USD support**: USDA reading/writing of meshes and light filters (`usd`)
//!
//! # Example
//!
//! ```ignore
//! use meshpack_core::{ExportOptions, MeshTranslator};
//!
//! let options = ExportOptions::parse("Meshes=1;Compaction_Level=3;")?;
//! let translator = MeshTranslator::new(options);
//! translator.export_usda("/tmp/cube.usda", &[mesh], &[])?;
//! ```

pub mod colour_set;
pub mod compaction;
pub mod mesh;
pub mod options;
pub mod packing;
pub mod primvar;
pub mod translator;
pub mod usd;
pub mod uv_set;

// Re-export commonly used types
pub use colour_set::ColourSet;
pub use compaction::CompactionLevel;
pub use mesh::{MeshTopology, PolyMesh};
pub use options::ExportOptions;
pub use primvar::{Interpolation, Primvar};
pub use translator::{ImportedLayer, MeshTranslator, TranslateError};
pub use uv_set::UvSet;
