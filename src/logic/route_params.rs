use std::collections::HashSet;

use crate::error::{BindResult, BindingError};
use crate::logic::inflect::camel_case;
use crate::model::{LookupKey, ParsedRoute, RouteParamDescriptor};

const PARAM_PREFIX: char = ':';
const SCOPE_MARKER: char = '>';

fn malformed(token: &str, reason: &str) -> BindingError {
    BindingError::MalformedParam {
        token: token.to_string(),
        reason: reason.to_string(),
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Parse one route parameter token.
///
/// Accepted forms are `:name`, `:name(key)`, `:>name` and `:>name(key)`.
/// The returned descriptor has no parent; that is filled in by [`parse_route`]
/// which knows the neighbouring parameters.
pub fn parse_param_token(token: &str) -> BindResult<RouteParamDescriptor> {
    let body = token
        .strip_prefix(PARAM_PREFIX)
        .ok_or_else(|| malformed(token, "parameters start with ':'"))?;

    let (scoped, body) = match body.strip_prefix(SCOPE_MARKER) {
        Some(rest) => (true, rest),
        None => (false, body),
    };

    let (raw_name, lookup_key) = match body.find('(') {
        Some(open) => {
            let key = body[open + 1..]
                .strip_suffix(')')
                .ok_or_else(|| malformed(token, "lookup key is missing its closing ')'"))?;
            if key.is_empty() {
                return Err(malformed(token, "lookup key is empty"));
            }
            if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(malformed(token, "lookup key must be a column name"));
            }
            (&body[..open], LookupKey::Column(key.to_string()))
        }
        None => (body, LookupKey::Default),
    };

    if raw_name.is_empty() {
        return Err(malformed(token, "parameter name is empty"));
    }
    if !raw_name.chars().all(is_name_char) {
        return Err(malformed(token, "parameter name contains invalid characters"));
    }

    Ok(RouteParamDescriptor {
        name: camel_case(raw_name),
        raw_name: raw_name.to_string(),
        original_literal: token.to_string(),
        scoped,
        lookup_key,
        parent_name: None,
    })
}

/// Parse every parameter of a route pattern.
///
/// Fails when a token is malformed, when a parameter name repeats, or when
/// the first parameter is scoped, since it has nothing to be scoped to.
pub fn parse_route(pattern: &str) -> BindResult<ParsedRoute> {
    let mut params: Vec<RouteParamDescriptor> = Vec::new();
    let mut seen = HashSet::new();
    let mut router_segments = Vec::new();

    for segment in pattern.split('/') {
        if !segment.starts_with(PARAM_PREFIX) {
            router_segments.push(segment.to_string());
            continue;
        }

        let mut param = parse_param_token(segment)?;

        if !seen.insert(param.raw_name.clone()) {
            return Err(BindingError::DuplicateParam {
                route: pattern.to_string(),
                name: param.raw_name,
            });
        }

        // Provisional until the handler's slots are known
        if param.scoped {
            let parent = params.last().ok_or_else(|| BindingError::InvalidScope {
                param: param.original_literal.clone(),
            })?;
            param.parent_name = Some(parent.name.clone());
        }

        router_segments.push(format!("{}{}", PARAM_PREFIX, param.raw_name));
        params.push(param);
    }

    Ok(ParsedRoute {
        pattern: pattern.to_string(),
        router_path: router_segments.join("/"),
        params,
    })
}
