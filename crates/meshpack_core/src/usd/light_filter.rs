//! `LightFilter` prim schema.
//!
//! A light filter is an xformable prim that modifies the light of the lights
//! linked to it. Which geometry it applies to is described by the
//! `filterLink` collection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Attribute names declared by `LightFilter` itself.
const LOCAL_ATTRIBUTE_NAMES: &[&str] = &[
    "collection:filterLink:includeRoot",
    "collection:filterLink:expansionRule",
];

/// `Xformable` attributes (including those it inherits from `Imageable`),
/// followed by the local ones.
const ALL_ATTRIBUTE_NAMES: &[&str] = &[
    "visibility",
    "purpose",
    "xformOpOrder",
    "collection:filterLink:includeRoot",
    "collection:filterLink:expansionRule",
];

/// How a collection's include paths expand to prims and properties.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExpansionRule {
    /// Only the listed paths
    ExplicitOnly,

    /// Listed paths and all their descendant prims
    #[default]
    ExpandPrims,

    /// Descendant prims and their properties
    ExpandPrimsAndProperties,
}

impl ExpansionRule {
    pub fn as_token(&self) -> &'static str {
        match self {
            ExpansionRule::ExplicitOnly => "explicitOnly",
            ExpansionRule::ExpandPrims => "expandPrims",
            ExpansionRule::ExpandPrimsAndProperties => "expandPrimsAndProperties",
        }
    }
}

impl fmt::Display for ExpansionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

impl FromStr for ExpansionRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "explicitOnly" => Ok(ExpansionRule::ExplicitOnly),
            "expandPrims" => Ok(ExpansionRule::ExpandPrims),
            "expandPrimsAndProperties" => Ok(ExpansionRule::ExpandPrimsAndProperties),
            other => Err(format!("Unknown expansion rule: {}", other)),
        }
    }
}

/// A named collection applied to a prim (`CollectionAPI:<name>`).
#[derive(Clone, Debug, PartialEq)]
pub struct CollectionApi {
    pub name: String,

    /// Whether the owning prim itself is part of the collection
    pub include_root: bool,

    pub expansion_rule: ExpansionRule,

    /// Included prim paths
    pub includes: Vec<String>,

    /// Excluded prim paths
    pub excludes: Vec<String>,
}

impl CollectionApi {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            include_root: false,
            expansion_rule: ExpansionRule::default(),
            includes: Vec::new(),
            excludes: Vec::new(),
        }
    }

    /// Namespaced property name, `collection:<name>:<base_name>`.
    pub fn property_name(&self, base_name: &str) -> String {
        format!("collection:{}:{}", self.name, base_name)
    }

    pub fn include_root_attr_name(&self) -> String {
        self.property_name("includeRoot")
    }

    pub fn expansion_rule_attr_name(&self) -> String {
        self.property_name("expansionRule")
    }

    pub fn includes_rel_name(&self) -> String {
        self.property_name("includes")
    }

    pub fn excludes_rel_name(&self) -> String {
        self.property_name("excludes")
    }

    /// Applied API schema token, e.g. `CollectionAPI:filterLink`.
    pub fn api_schema_token(&self) -> String {
        format!("CollectionAPI:{}", self.name)
    }

    /// Whether `path` is directly included and not excluded.
    ///
    /// With an expanding rule, descendants of an included path count too.
    pub fn includes_path(&self, path: &str) -> bool {
        let matches = |root: &String| match self.expansion_rule {
            ExpansionRule::ExplicitOnly => root == path,
            _ => root == path || is_descendant(path, root),
        };
        self.includes.iter().any(matches) && !self.excludes.iter().any(matches)
    }
}

fn is_descendant(path: &str, root: &str) -> bool {
    if root == "/" {
        return path.starts_with('/') && path != "/";
    }
    path.strip_prefix(root)
        .is_some_and(|rest| rest.starts_with('/'))
}

/// A `LightFilter` prim.
#[derive(Clone, Debug, PartialEq)]
pub struct LightFilter {
    /// Prim path
    pub path: String,

    /// Prim name
    pub name: String,

    filter_link: CollectionApi,
}

impl LightFilter {
    /// USD prim type name.
    pub const TYPE_NAME: &'static str = "LightFilter";

    /// Schema this type derives from.
    pub const BASE_TYPE_NAME: &'static str = "Xformable";

    /// Name of the collection selecting the geometry this filter affects.
    pub const FILTER_LINK: &'static str = "filterLink";

    /// Define a light filter at `path`.
    pub fn define(path: &str) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        Self {
            path: path.to_string(),
            name,
            filter_link: CollectionApi::new(Self::FILTER_LINK),
        }
    }

    /// Light filters are concrete, typed prims.
    pub fn is_typed_schema() -> bool {
        true
    }

    /// Attribute names this schema declares, optionally with inherited ones.
    pub fn schema_attribute_names(include_inherited: bool) -> &'static [&'static str] {
        if include_inherited {
            ALL_ATTRIBUTE_NAMES
        } else {
            LOCAL_ATTRIBUTE_NAMES
        }
    }

    /// The `filterLink` collection of this filter.
    pub fn filter_link_collection_api(&self) -> &CollectionApi {
        &self.filter_link
    }

    pub fn filter_link_collection_api_mut(&mut self) -> &mut CollectionApi {
        &mut self.filter_link
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_attribute_names() {
        let local = LightFilter::schema_attribute_names(false);
        assert_eq!(
            local,
            &["collection:filterLink:includeRoot", "collection:filterLink:expansionRule"]
        );

        let all = LightFilter::schema_attribute_names(true);
        assert_eq!(all.len(), 5);
        assert_eq!(&all[..3], &["visibility", "purpose", "xformOpOrder"]);
        assert!(all.ends_with(local));

        assert!(LightFilter::is_typed_schema());
        assert_eq!(LightFilter::BASE_TYPE_NAME, "Xformable");
    }

    #[test]
    fn test_filter_link_collection() {
        let filter = LightFilter::define("/World/Filters/Barn");
        assert_eq!(filter.name, "Barn");

        let collection = filter.filter_link_collection_api();
        assert_eq!(collection.name, "filterLink");
        assert_eq!(collection.include_root_attr_name(), "collection:filterLink:includeRoot");
        assert_eq!(collection.expansion_rule_attr_name(), "collection:filterLink:expansionRule");
        assert_eq!(collection.api_schema_token(), "CollectionAPI:filterLink");

        // Collection attribute names line up with the schema's local attributes
        let local = LightFilter::schema_attribute_names(false);
        assert!(local.contains(&collection.include_root_attr_name().as_str()));
        assert!(local.contains(&collection.expansion_rule_attr_name().as_str()));
    }

    #[test]
    fn test_expansion_rule_tokens() {
        assert_eq!(ExpansionRule::default(), ExpansionRule::ExpandPrims);
        for rule in [
            ExpansionRule::ExplicitOnly,
            ExpansionRule::ExpandPrims,
            ExpansionRule::ExpandPrimsAndProperties,
        ] {
            assert_eq!(rule.as_token().parse::<ExpansionRule>().unwrap(), rule);
        }
        assert!("everything".parse::<ExpansionRule>().is_err());
    }

    #[test]
    fn test_collection_membership() {
        let mut filter = LightFilter::define("/Filter");
        let collection = filter.filter_link_collection_api_mut();
        collection.includes.push("/World".to_string());
        collection.excludes.push("/World/Hidden".to_string());

        let collection = filter.filter_link_collection_api();
        assert!(collection.includes_path("/World"));
        assert!(collection.includes_path("/World/pCube1"));
        assert!(!collection.includes_path("/World/Hidden/pSphere1"));
        assert!(!collection.includes_path("/Worldly"));

        filter.filter_link_collection_api_mut().expansion_rule = ExpansionRule::ExplicitOnly;
        assert!(!filter.filter_link_collection_api().includes_path("/World/pCube1"));
    }
}
