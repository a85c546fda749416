//! Just enough English inflection to line up route parameter names with
//! relationship names, e.g. `:>comment` with a `comments` relationship.

use heck::ToLowerCamelCase;

pub fn camel_case(name: &str) -> String {
    name.to_lower_camel_case()
}

pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }

    let lower = word.to_ascii_lowercase();
    if let Some(stem) = lower.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{}ies", &word[..word.len() - 1]);
        }
    }
    if ["s", "x", "z", "ch", "sh"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
    {
        return format!("{}es", word);
    }
    format!("{}s", word)
}

pub fn singularize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    // status, virus, analysis, address
    if ["us", "is", "ss"].iter().any(|suffix| lower.ends_with(suffix)) {
        return word.to_string();
    }
    if lower.ends_with("ies") && word.len() > 3 {
        return format!("{}y", &word[..word.len() - 3]);
    }
    if ["ses", "xes", "zes", "ches", "shes"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
    {
        return word[..word.len() - 2].to_string();
    }
    if lower.ends_with('s') && !lower.ends_with("ss") && word.len() > 1 {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

/// Relationship names a camelCase parameter name may refer to: the name as
/// written, then its singular and plural forms, without repeats.
pub fn relation_candidates(name: &str) -> Vec<String> {
    let singular = singularize(name);
    let plural = pluralize(&singular);

    let mut candidates = vec![name.to_string()];
    for form in [singular, plural] {
        if !candidates.contains(&form) {
            candidates.push(form);
        }
    }
    candidates
}
