use serde::Serialize;
use std::fmt;

/// Column used to look up a route parameter.
///
/// `Default` is a sentinel: it stands for whatever key the bound model
/// declares and must be resolved through [`LookupKey::resolve`] before a query
/// is built, including inside custom finders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupKey {
    Default,
    Column(String),
}

impl LookupKey {
    pub fn resolve<'a>(&'a self, default_key: &'a str) -> &'a str {
        match self {
            LookupKey::Default => default_key,
            LookupKey::Column(column) => column,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, LookupKey::Default)
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupKey::Default => f.write_str("$default"),
            LookupKey::Column(column) => f.write_str(column),
        }
    }
}

/// One dynamic segment of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteParamDescriptor {
    /// camelCase identifier, used when matching relationship names
    pub name: String,
    /// Segment name as written, which is also the name the router captures under
    pub raw_name: String,
    /// The whole token, annotations included, e.g. `:>comment(code)`
    pub original_literal: String,
    pub scoped: bool,
    pub lookup_key: LookupKey,
    /// Name of the parameter this one is scoped to, set only for scoped
    /// parameters. The parser records the previous token; aligning with a
    /// handler's slots moves it to the nearest preceding model parameter.
    pub parent_name: Option<String>,
}

/// A route pattern with its parameters extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedRoute {
    /// Pattern as declared, annotations included
    pub pattern: String,
    /// Pattern with annotations stripped, in the router's `:name` syntax
    pub router_path: String,
    pub params: Vec<RouteParamDescriptor>,
}
