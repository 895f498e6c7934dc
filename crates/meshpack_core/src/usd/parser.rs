//! USDA (ASCII) file parser.
//!
//! Line-based parsing of the USDA subset the writer produces, plus the
//! common variations found in files from other tools.
//!
//! # Supported Syntax
//!
//! - `def Mesh "Name" { ... }`, `def LightFilter "Name" (...) { ... }`
//! - any other `def` (e.g. `Xform`) as a container for nested prims
//! - `point3f[] points`, `int[] faceVertexCounts`, `int[] faceVertexIndices`
//! - `normal3f[] normals` and `normal3f[] primvars:normals`
//! - `texCoord2f[]` / `float2[]` / `color3f[]` / `color4f[] primvars:<name>`
//!   with `( interpolation = "..." )` metadata, a separate
//!   `primvars:<name>:interpolation` attribute, and `primvars:<name>:indices`
//! - `collection:<name>:includeRoot`, `:expansionRule`, `rel ...:includes`,
//!   `rel ...:excludes`

use std::collections::{HashMap, VecDeque};

use meshpack_math::{Vec2, Vec3, Vec4};
use thiserror::Error;

use super::light_filter::{ExpansionRule, LightFilter};
use super::types::*;
use crate::primvar::{Interpolation, Primvar, PrimvarError};

/// Errors that can occur during USDA parsing.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid number format: {0}")]
    InvalidNumber(String),

    #[error("Unclosed block starting at line {0}")]
    UnclosedBlock(usize),

    #[error("Primvar error: {0}")]
    Primvar(#[from] PrimvarError),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// A primvar as it accumulates while reading a mesh block.
#[derive(Default)]
struct RawPrimvar {
    type_name: String,
    values: Vec<Vec<f32>>,
    interpolation: Option<Interpolation>,
    indices: Option<Vec<i32>>,
    line: usize,
}

/// Left-hand side of an attribute line: `[uniform|custom] type name`.
struct Declaration<'a> {
    type_name: &'a str,
    name: &'a str,
    value: &'a str,
}

fn split_declaration(line: &str) -> Option<Declaration<'_>> {
    let (lhs, value) = line.split_once('=')?;
    let mut words: Vec<&str> = lhs
        .split_whitespace()
        .filter(|w| !matches!(*w, "uniform" | "custom" | "varying"))
        .collect();
    let name = words.pop()?;
    let type_name = words.pop().unwrap_or("");
    Some(Declaration {
        type_name,
        name,
        value: value.trim(),
    })
}

fn parse_number(text: &str) -> ParseResult<f32> {
    let text = text.trim();
    text.parse::<f32>()
        .map_err(|_| ParseError::InvalidNumber(text.to_string()))
}

fn parse_quoted(text: &str) -> &str {
    text.trim().trim_matches('"')
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

/// Pull `interpolation = "..."` out of attribute metadata.
fn interpolation_from_metadata(metadata: &str) -> ParseResult<Option<Interpolation>> {
    let Some(pos) = metadata.find("interpolation") else {
        return Ok(None);
    };
    let rest = &metadata[pos..];
    let Some(start) = rest.find('"') else {
        return Ok(None);
    };
    let token = rest[start + 1..].split('"').next().unwrap_or("");
    Ok(Some(token.parse()?))
}

fn typed_primvar<T>(
    name: String,
    entry: RawPrimvar,
    fallback: Interpolation,
    convert: fn(&[f32]) -> T,
) -> Primvar<T> {
    Primvar {
        name,
        interpolation: entry.interpolation.unwrap_or(fallback),
        values: entry.values.iter().map(|v| convert(v)).collect(),
        indices: entry.indices,
    }
}

/// USDA file parser.
pub struct UsdaParser {
    lines: VecDeque<(usize, String)>,
    current_line: usize,
}

impl UsdaParser {
    /// Create a new parser from file contents.
    pub fn new(content: &str) -> Self {
        let lines: VecDeque<_> = content
            .lines()
            .enumerate()
            .map(|(i, s)| (i + 1, s.to_string()))
            .collect();

        Self {
            lines,
            current_line: 0,
        }
    }

    /// Parse the USDA content and return all prims, nested ones flattened
    /// in file order.
    pub fn parse(&mut self) -> ParseResult<Vec<UsdPrim>> {
        let mut prims = Vec::new();

        // Skip header (comments and file-level metadata in parentheses)
        let mut in_header_metadata = false;
        while let Some((_, line)) = self.lines.front() {
            let trimmed = line.trim();
            if in_header_metadata {
                if trimmed.ends_with(')') {
                    in_header_metadata = false;
                }
                self.lines.pop_front();
            } else if trimmed.starts_with('#') || trimmed.is_empty() {
                self.lines.pop_front();
            } else if trimmed.starts_with('(') {
                in_header_metadata = !trimmed.ends_with(')');
                self.lines.pop_front();
            } else {
                break;
            }
        }

        while let Some((line_num, line)) = self.next_line() {
            let trimmed = line.trim();
            if trimmed.starts_with("def ") || trimmed.starts_with("over ") {
                self.parse_def(trimmed, "", line_num, &mut prims)?;
            } else {
                log::debug!("Skipping top-level line {}: {}", line_num, trimmed);
            }
        }

        Ok(prims)
    }

    /// Next non-empty, non-comment line.
    fn next_line(&mut self) -> Option<(usize, String)> {
        while let Some((num, line)) = self.lines.pop_front() {
            let trimmed = line.trim();
            if !trimmed.is_empty() && !trimmed.starts_with('#') {
                self.current_line = num;
                return Some((num, line));
            }
        }
        None
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::Parse {
            line: self.current_line,
            message: message.into(),
        }
    }

    /// Parse a `def Type "Name"` block, pushing it and its descendants.
    fn parse_def(
        &mut self,
        line: &str,
        parent_path: &str,
        start_line: usize,
        out: &mut Vec<UsdPrim>,
    ) -> ParseResult<()> {
        let rest = line
            .strip_prefix("def ")
            .or_else(|| line.strip_prefix("over "))
            .unwrap_or(line);

        // A type name is absent for typeless defs: def "Name"
        let prim_type = match rest.split_whitespace().next() {
            Some(word) if !word.starts_with('"') => word,
            _ => "",
        };

        let name = rest
            .split('"')
            .nth(1)
            .ok_or_else(|| self.error(format!("Expected quoted prim name in: {}", line)))?
            .to_string();
        let path = format!("{}/{}", parent_path, name);

        // Prim metadata: inline `( ... )`, or a block opened on this or the next line
        let after_name = rest.splitn(3, '"').nth(2).unwrap_or("");
        if after_name.contains('(') && !after_name.contains(')') {
            self.skip_metadata(start_line)?;
        } else if !after_name.contains('(') {
            if let Some((_, next)) = self.lines.front() {
                if next.trim().starts_with('(') {
                    let single_line = next.trim().ends_with(')');
                    self.lines.pop_front();
                    if !single_line {
                        self.skip_metadata(start_line)?;
                    }
                }
            }
        }

        if !after_name.contains('{') {
            self.expect_opening_brace(start_line)?;
        }

        match prim_type {
            "Mesh" => {
                let mesh = self.parse_mesh_content(&path, &name, start_line, out)?;
                out.push(UsdPrim::Mesh(mesh));
            }
            LightFilter::TYPE_NAME => {
                let filter = self.parse_light_filter_content(&path, start_line, out)?;
                out.push(UsdPrim::LightFilter(filter));
            }
            other => {
                out.push(UsdPrim::Unknown(other.to_string()));
                self.parse_container_content(&path, start_line, out)?;
            }
        }

        Ok(())
    }

    /// Consume lines up to and including the closing `)` of a metadata block.
    fn skip_metadata(&mut self, start_line: usize) -> ParseResult<()> {
        let mut depth = 1i32;
        while let Some((_, line)) = self.next_line() {
            depth += line.matches('(').count() as i32;
            depth -= line.matches(')').count() as i32;
            if depth <= 0 {
                return Ok(());
            }
        }
        Err(ParseError::UnclosedBlock(start_line))
    }

    fn expect_opening_brace(&mut self, start_line: usize) -> ParseResult<()> {
        match self.next_line() {
            Some((_, line)) if line.trim().starts_with('{') => Ok(()),
            Some((_, line)) => Err(self.error(format!("Expected '{{', found: {}", line.trim()))),
            None => Err(ParseError::UnclosedBlock(start_line)),
        }
    }

    /// Skip a nested `{ ... }` block whose opening brace was already read.
    fn skip_block(&mut self, start_line: usize) -> ParseResult<()> {
        let mut depth = 1i32;
        while let Some((_, line)) = self.next_line() {
            depth += line.matches('{').count() as i32;
            depth -= line.matches('}').count() as i32;
            if depth <= 0 {
                return Ok(());
            }
        }
        Err(ParseError::UnclosedBlock(start_line))
    }

    /// Handle lines common to every prim body. Returns true when the line
    /// was consumed (nested def, nested block).
    fn handle_structural_line(
        &mut self,
        trimmed: &str,
        line_num: usize,
        path: &str,
        out: &mut Vec<UsdPrim>,
    ) -> ParseResult<bool> {
        if trimmed.starts_with("def ") || trimmed.starts_with("over ") {
            self.parse_def(trimmed, path, line_num, out)?;
            return Ok(true);
        }
        if trimmed.ends_with('{') {
            // dictionaries, variant sets, ...
            self.skip_block(line_num)?;
            return Ok(true);
        }
        Ok(false)
    }

    fn parse_container_content(
        &mut self,
        path: &str,
        start_line: usize,
        out: &mut Vec<UsdPrim>,
    ) -> ParseResult<()> {
        while let Some((line_num, line)) = self.next_line() {
            let trimmed = line.trim();
            if trimmed == "}" {
                return Ok(());
            }
            self.handle_structural_line(trimmed, line_num, path, out)?;
        }
        Err(ParseError::UnclosedBlock(start_line))
    }

    /// Parse the body of a Mesh prim.
    fn parse_mesh_content(
        &mut self,
        path: &str,
        name: &str,
        start_line: usize,
        out: &mut Vec<UsdPrim>,
    ) -> ParseResult<MeshPrim> {
        let mut mesh = MeshPrim {
            path: path.to_string(),
            name: name.to_string(),
            ..Default::default()
        };
        let mut raw: HashMap<String, RawPrimvar> = HashMap::new();
        let mut order: Vec<String> = Vec::new();

        loop {
            let Some((line_num, line)) = self.next_line() else {
                return Err(ParseError::UnclosedBlock(start_line));
            };
            let trimmed = line.trim();

            if trimmed == "}" {
                break;
            }
            if self.handle_structural_line(trimmed, line_num, path, out)? {
                continue;
            }

            let Some(decl) = split_declaration(trimmed) else {
                continue;
            };

            match decl.name {
                "points" => {
                    let (values, _) = self.read_array(decl.value)?;
                    mesh.points = self.parse_tuples::<3>(&values)?.into_iter().map(Vec3::from_array).collect();
                }
                "faceVertexCounts" => {
                    let (values, _) = self.read_array(decl.value)?;
                    mesh.face_vertex_counts = self.parse_ints(&values)?;
                }
                "faceVertexIndices" => {
                    let (values, _) = self.read_array(decl.value)?;
                    mesh.face_vertex_indices = self.parse_ints(&values)?;
                }
                "normals" => {
                    let (values, metadata) = self.read_array(decl.value)?;
                    let entry = Self::raw_entry(&mut raw, &mut order, "normals", line_num);
                    entry.type_name = decl.type_name.to_string();
                    entry.values = self.parse_tuples::<3>(&values)?.into_iter().map(|t| t.to_vec()).collect();
                    if let Some(interpolation) = interpolation_from_metadata(&metadata)? {
                        entry.interpolation = Some(interpolation);
                    }
                }
                attr => {
                    let Some(primvar_name) = attr.strip_prefix("primvars:") else {
                        log::debug!("Ignoring mesh attribute '{}' at line {}", attr, line_num);
                        self.skip_value(decl.value)?;
                        continue;
                    };

                    if let Some(base) = primvar_name.strip_suffix(":indices") {
                        let (values, _) = self.read_array(decl.value)?;
                        let indices = self.parse_ints(&values)?;
                        Self::raw_entry(&mut raw, &mut order, base, line_num).indices = Some(indices);
                    } else if let Some(base) = primvar_name.strip_suffix(":interpolation") {
                        let interpolation = parse_quoted(decl.value).parse()?;
                        Self::raw_entry(&mut raw, &mut order, base, line_num).interpolation =
                            Some(interpolation);
                    } else {
                        let width = match decl.type_name {
                            "texCoord2f[]" | "float2[]" => 2,
                            "color3f[]" | "normal3f[]" => 3,
                            "color4f[]" => 4,
                            other => {
                                log::debug!("Ignoring primvar '{}' of type {}", primvar_name, other);
                                self.skip_value(decl.value)?;
                                continue;
                            }
                        };
                        let (values, metadata) = self.read_array(decl.value)?;
                        let tuples = self.parse_tuple_values(&values, width)?;
                        let interpolation = interpolation_from_metadata(&metadata)?;

                        let entry = Self::raw_entry(&mut raw, &mut order, primvar_name, line_num);
                        entry.type_name = decl.type_name.to_string();
                        entry.values = tuples;
                        if interpolation.is_some() {
                            entry.interpolation = interpolation;
                        }
                    }
                }
            }
        }

        for name in order {
            let Some(entry) = raw.remove(&name) else {
                continue;
            };
            self.current_line = entry.line;
            self.finish_primvar(&mut mesh, name, entry)?;
        }

        Ok(mesh)
    }

    fn raw_entry<'a>(
        raw: &'a mut HashMap<String, RawPrimvar>,
        order: &mut Vec<String>,
        name: &str,
        line: usize,
    ) -> &'a mut RawPrimvar {
        if !raw.contains_key(name) {
            order.push(name.to_string());
        }
        raw.entry(name.to_string()).or_insert_with(|| RawPrimvar {
            line,
            ..Default::default()
        })
    }

    /// Turn an accumulated primvar into typed mesh data.
    fn finish_primvar(&self, mesh: &mut MeshPrim, name: String, entry: RawPrimvar) -> ParseResult<()> {
        if entry.type_name.is_empty() {
            // indices or interpolation without values
            return Err(self.error(format!("Primvar '{}' has no values", name)));
        }

        match entry.type_name.as_str() {
            "normal3f[]" => {
                // Normals fall back to vertex, other primvars to constant
                mesh.normals = Some(typed_primvar(name, entry, Interpolation::Vertex, Vec3::from_slice));
            }
            "texCoord2f[]" | "float2[]" => {
                mesh.primvars.push(PrimvarData::TexCoord2f(typed_primvar(
                    name,
                    entry,
                    Interpolation::Constant,
                    Vec2::from_slice,
                )));
            }
            "color3f[]" => {
                mesh.primvars.push(PrimvarData::Color3f(typed_primvar(
                    name,
                    entry,
                    Interpolation::Constant,
                    Vec3::from_slice,
                )));
            }
            "color4f[]" => {
                mesh.primvars.push(PrimvarData::Color4f(typed_primvar(
                    name,
                    entry,
                    Interpolation::Constant,
                    Vec4::from_slice,
                )));
            }
            other => {
                return Err(self.error(format!("Unsupported primvar type {} for '{}'", other, name)));
            }
        }

        Ok(())
    }

    /// Parse the body of a LightFilter prim.
    fn parse_light_filter_content(
        &mut self,
        path: &str,
        start_line: usize,
        out: &mut Vec<UsdPrim>,
    ) -> ParseResult<LightFilter> {
        let mut filter = LightFilter::define(path);

        loop {
            let Some((line_num, line)) = self.next_line() else {
                return Err(ParseError::UnclosedBlock(start_line));
            };
            let trimmed = line.trim();

            if trimmed == "}" {
                break;
            }
            if self.handle_structural_line(trimmed, line_num, path, out)? {
                continue;
            }

            let (is_rel, declaration) = match trimmed.strip_prefix("rel ") {
                Some(rest) => (true, rest),
                None => (false, trimmed),
            };
            let Some(decl) = split_declaration(declaration) else {
                continue;
            };

            let collection = filter.filter_link_collection_api_mut();
            if is_rel {
                let targets = self.read_targets(decl.value)?;
                if decl.name == collection.includes_rel_name() {
                    collection.includes = targets;
                } else if decl.name == collection.excludes_rel_name() {
                    collection.excludes = targets;
                }
            } else if decl.name == collection.include_root_attr_name() {
                collection.include_root = parse_bool(decl.value)
                    .ok_or_else(|| self.error(format!("Invalid bool: {}", decl.value)))?;
            } else if decl.name == collection.expansion_rule_attr_name() {
                collection.expansion_rule = parse_quoted(decl.value)
                    .parse::<ExpansionRule>()
                    .map_err(|message| self.error(message))?;
            } else {
                log::debug!("Ignoring light filter attribute '{}' at line {}", decl.name, line_num);
            }
        }

        Ok(filter)
    }

    /// Read an array value starting at `first`, pulling more lines until the
    /// closing `]`, plus any trailing `( ... )` metadata.
    ///
    /// Returns the text between the brackets and the metadata text.
    fn read_array(&mut self, first: &str) -> ParseResult<(String, String)> {
        if !first.trim_start().starts_with('[') {
            return Err(self.error(format!("Expected array value, found: {}", first)));
        }

        let start_line = self.current_line;
        let mut content = first.to_string();

        while !content.contains(']') {
            match self.lines.pop_front() {
                Some((num, line)) => {
                    self.current_line = num;
                    content.push(' ');
                    content.push_str(line.trim());
                }
                None => return Err(ParseError::UnclosedBlock(start_line)),
            }
        }

        let open = content.find('[').unwrap_or(0);
        let close = content.find(']').unwrap_or(content.len());
        let values = content[open + 1..close].to_string();

        let mut metadata = content[close + 1..].trim().to_string();
        if metadata.starts_with('(') && !metadata.contains(')') {
            while let Some((num, line)) = self.lines.pop_front() {
                self.current_line = num;
                metadata.push(' ');
                metadata.push_str(line.trim());
                if line.contains(')') {
                    break;
                }
            }
        }

        Ok((values, metadata))
    }

    /// Consume a value that is not used, including continuation lines.
    fn skip_value(&mut self, first: &str) -> ParseResult<()> {
        if first.trim_start().starts_with('[') {
            self.read_array(first)?;
        } else if first.trim_end().ends_with('(') {
            self.skip_metadata(self.current_line)?;
        }
        Ok(())
    }

    /// Read relationship targets: `</a>` or `[</a>, </b>]`.
    fn read_targets(&mut self, first: &str) -> ParseResult<Vec<String>> {
        let text = if first.trim_start().starts_with('[') {
            self.read_array(first)?.0
        } else {
            first.to_string()
        };

        Ok(text
            .split('<')
            .skip(1)
            .filter_map(|s| s.split('>').next())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn parse_ints(&self, text: &str) -> ParseResult<Vec<i32>> {
        text.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<i32>().map_err(|_| ParseError::InvalidNumber(s.to_string())))
            .collect()
    }

    /// Parse `(a, b, ...), (c, d, ...)` where every tuple has `width` components.
    fn parse_tuple_values(&self, text: &str, width: usize) -> ParseResult<Vec<Vec<f32>>> {
        let mut result = Vec::new();
        for chunk in text.split('(').skip(1) {
            let inner = chunk
                .split(')')
                .next()
                .ok_or_else(|| self.error("Unclosed tuple"))?;
            let components = inner
                .split(',')
                .map(parse_number)
                .collect::<ParseResult<Vec<f32>>>()?;
            if components.len() != width {
                return Err(self.error(format!(
                    "Expected {} components, got {}",
                    width,
                    components.len()
                )));
            }
            result.push(components);
        }
        Ok(result)
    }

    fn parse_tuples<const N: usize>(&self, text: &str) -> ParseResult<Vec<[f32; N]>> {
        Ok(self
            .parse_tuple_values(text, N)?
            .into_iter()
            .map(|tuple| {
                let mut array = [0.0f32; N];
                array.copy_from_slice(&tuple);
                array
            })
            .collect())
    }
}

/// Parse a USDA string and return its prims.
pub fn parse_usda(content: &str) -> ParseResult<Vec<UsdPrim>> {
    let mut parser = UsdaParser::new(content);
    parser.parse()
}
