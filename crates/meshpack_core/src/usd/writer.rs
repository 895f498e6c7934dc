//! USDA (ASCII) writer.
//!
//! Produces `#usda 1.0` layers the parser in this module can read back.
//! Floats use Rust's shortest round-trip formatting, so values survive a
//! write/read cycle bit for bit.

use std::fmt::Display;
use std::path::Path;

use meshpack_math::{Vec2, Vec3, Vec4};

use crate::primvar::Primvar;
use crate::usd::light_filter::LightFilter;
use crate::usd::types::{MeshPrim, PrimvarData, UsdPrim};

/// Values that render as a parenthesised USDA tuple.
trait UsdaTuple {
    fn write_tuple(&self, out: &mut String);
}

fn push_components(out: &mut String, components: &[f32]) {
    out.push('(');
    for (i, c) in components.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&c.to_string());
    }
    out.push(')');
}

impl UsdaTuple for Vec2 {
    fn write_tuple(&self, out: &mut String) {
        push_components(out, &self.to_array());
    }
}

impl UsdaTuple for Vec3 {
    fn write_tuple(&self, out: &mut String) {
        push_components(out, &self.to_array());
    }
}

impl UsdaTuple for Vec4 {
    fn write_tuple(&self, out: &mut String) {
        push_components(out, &self.to_array());
    }
}

fn tuple_array<T: UsdaTuple>(values: &[T]) -> String {
    let mut out = String::from("[");
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        value.write_tuple(&mut out);
    }
    out.push(']');
    out
}

fn scalar_array<T: Display>(values: &[T]) -> String {
    let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", items.join(", "))
}

/// USDA text writer.
pub struct UsdaWriter {
    output: String,
    indent: usize,
}

impl Default for UsdaWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl UsdaWriter {
    pub fn new() -> Self {
        Self {
            output: String::new(),
            indent: 0,
        }
    }

    /// Render a full layer containing `prims` at the root.
    pub fn write_layer(mut self, prims: &[UsdPrim]) -> String {
        self.write_line("#usda 1.0");
        self.write_line("");

        for prim in prims {
            match prim {
                UsdPrim::Mesh(mesh) => self.write_mesh(mesh),
                UsdPrim::LightFilter(filter) => self.write_light_filter(filter),
                UsdPrim::Unknown(type_name) => {
                    log::warn!("Skipping unknown prim type '{}' on write", type_name);
                }
            }
        }

        self.output
    }

    fn write_mesh(&mut self, mesh: &MeshPrim) {
        self.write_line(&format!("def Mesh \"{}\"", mesh.name));
        self.write_line("{");
        self.indent += 1;

        self.write_line(&format!(
            "int[] faceVertexCounts = {}",
            scalar_array(&mesh.face_vertex_counts)
        ));
        self.write_line(&format!(
            "int[] faceVertexIndices = {}",
            scalar_array(&mesh.face_vertex_indices)
        ));
        self.write_line(&format!("point3f[] points = {}", tuple_array(&mesh.points)));

        if let Some(normals) = &mesh.normals {
            self.write_primvar("normal3f[]", normals);
        }

        for primvar in &mesh.primvars {
            match primvar {
                PrimvarData::TexCoord2f(p) => self.write_primvar(primvar.type_name(), p),
                PrimvarData::Color3f(p) => self.write_primvar(primvar.type_name(), p),
                PrimvarData::Color4f(p) => self.write_primvar(primvar.type_name(), p),
            }
        }

        self.write_line("uniform token subdivisionScheme = \"none\"");

        self.indent -= 1;
        self.write_line("}");
        self.write_line("");
    }

    fn write_primvar<T: UsdaTuple>(&mut self, type_name: &str, primvar: &Primvar<T>) {
        self.write_line(&format!(
            "{} primvars:{} = {} (",
            type_name,
            primvar.name,
            tuple_array(&primvar.values)
        ));
        self.indent += 1;
        self.write_line(&format!(
            "interpolation = \"{}\"",
            primvar.interpolation.as_token()
        ));
        self.indent -= 1;
        self.write_line(")");

        if let Some(indices) = &primvar.indices {
            self.write_line(&format!(
                "int[] primvars:{}:indices = {}",
                primvar.name,
                scalar_array(indices)
            ));
        }
    }

    fn write_light_filter(&mut self, filter: &LightFilter) {
        let collection = filter.filter_link_collection_api();

        self.write_line(&format!(
            "def {} \"{}\" (",
            LightFilter::TYPE_NAME,
            filter.name
        ));
        self.indent += 1;
        self.write_line(&format!(
            "prepend apiSchemas = [\"{}\"]",
            collection.api_schema_token()
        ));
        self.indent -= 1;
        self.write_line(")");
        self.write_line("{");
        self.indent += 1;

        self.write_line(&format!(
            "uniform token {} = \"{}\"",
            collection.expansion_rule_attr_name(),
            collection.expansion_rule
        ));
        self.write_line(&format!(
            "uniform bool {} = {}",
            collection.include_root_attr_name(),
            u8::from(collection.include_root)
        ));
        for (rel_name, targets) in [
            (collection.includes_rel_name(), &collection.includes),
            (collection.excludes_rel_name(), &collection.excludes),
        ] {
            if targets.is_empty() {
                continue;
            }
            let targets: Vec<String> = targets.iter().map(|t| format!("<{}>", t)).collect();
            self.write_line(&format!("rel {} = [{}]", rel_name, targets.join(", ")));
        }

        self.indent -= 1;
        self.write_line("}");
        self.write_line("");
    }

    fn write_line(&mut self, line: &str) {
        if !line.is_empty() {
            for _ in 0..self.indent {
                self.output.push_str("    ");
            }
        }
        self.output.push_str(line);
        self.output.push('\n');
    }
}

/// Render prims as USDA text.
pub fn write_usda(prims: &[UsdPrim]) -> String {
    UsdaWriter::new().write_layer(prims)
}

/// Write prims to a USDA file.
pub fn write_usda_file<P: AsRef<Path>>(path: P, prims: &[UsdPrim]) -> std::io::Result<()> {
    let path = path.as_ref();
    std::fs::write(path, write_usda(prims))?;
    log::info!("Wrote {} prims to {}", prims.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primvar::Interpolation;
    use crate::usd::light_filter::ExpansionRule;

    #[test]
    fn test_write_mesh_primvars() {
        let mesh = MeshPrim {
            path: "/tri".to_string(),
            name: "tri".to_string(),
            points: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            face_vertex_counts: vec![3],
            face_vertex_indices: vec![0, 1, 2],
            normals: None,
            primvars: vec![PrimvarData::TexCoord2f(Primvar::indexed(
                "st",
                Interpolation::FaceVarying,
                vec![Vec2::new(0.5, 0.25), Vec2::ONE],
                vec![0, 1, 0],
            ))],
        };

        let text = write_usda(&[UsdPrim::Mesh(mesh)]);

        assert!(text.starts_with("#usda 1.0\n"));
        assert!(text.contains("def Mesh \"tri\""));
        assert!(text.contains("    point3f[] points = [(0, 0, 0), (1, 0, 0), (0, 1, 0)]"));
        assert!(text.contains("texCoord2f[] primvars:st = [(0.5, 0.25), (1, 1)] ("));
        assert!(text.contains("        interpolation = \"faceVarying\""));
        assert!(text.contains("int[] primvars:st:indices = [0, 1, 0]"));
    }

    #[test]
    fn test_write_light_filter() {
        let mut filter = LightFilter::define("/Barn");
        let collection = filter.filter_link_collection_api_mut();
        collection.include_root = true;
        collection.expansion_rule = ExpansionRule::ExplicitOnly;
        collection.includes.push("/pCube1".to_string());

        let text = write_usda(&[UsdPrim::LightFilter(filter)]);

        assert!(text.contains("def LightFilter \"Barn\" ("));
        assert!(text.contains("prepend apiSchemas = [\"CollectionAPI:filterLink\"]"));
        assert!(text.contains("uniform token collection:filterLink:expansionRule = \"explicitOnly\""));
        assert!(text.contains("uniform bool collection:filterLink:includeRoot = 1"));
        assert!(text.contains("rel collection:filterLink:includes = [</pCube1>]"));
        assert!(!text.contains("excludes"));
    }
}
