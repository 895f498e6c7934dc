//! USD (Universal Scene Description) text support.
//!
//! Reads and writes the USDA subset the mesh translator needs:
//!
//! - `Mesh` prims with points, topology, normals and primvars
//!   (`texCoord2f[]`, `color3f[]`, `color4f[]`, with interpolation and indices)
//! - `LightFilter` prims with their `filterLink` collection
//!
//! ## Not Supported
//!
//! - Binary `.usdc` format
//! - Composition (references, payloads, variants, sublayers)
//! - Time samples
//!
//! # Example
//!
//! ```ignore
//! use meshpack_core::usd::{parse_usda, write_usda};
//!
//! let prims = parse_usda(&std::fs::read_to_string("cube.usda")?)?;
//! let text = write_usda(&prims);
//! ```

mod light_filter;
mod parser;
mod types;
mod writer;

pub use light_filter::*;
pub use parser::*;
pub use types::*;
pub use writer::*;
