//! Translation of framework-native route paths into OpenAPI path templates.
//!
//! Django `path()` and Flask routes use angle brackets (`<int:id>`, `<slug>`), while
//! `re_path()`/`url()` use regex named groups (`(?P<id>\d+)`). Both become `{id}`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static CONVERTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<(?:int|str|slug|uuid|path|float|string):([^>]+)>").unwrap()
});
static ANGLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(?:[^:>]+:)?([^>]+)>").unwrap());
static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^}/]+)\}").unwrap());
static SLASHES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/{2,}").unwrap());

/// A path parameter in an emitted operation. Always `in: path`, required, string-typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathParameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    pub required: bool,
    pub schema: ParameterSchema,
}

/// Schema of a path parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
}

impl PathParameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: "path".to_string(),
            required: true,
            schema: ParameterSchema {
                schema_type: "string".to_string(),
            },
        }
    }
}

/// Converts a native path into an OpenAPI path and its ordered parameter list.
///
/// The result always starts with exactly one `/`; an empty path maps to `/`.
///
/// ```
/// use openapi_from_python::path_translator::translate_path;
///
/// let (path, params) = translate_path("<int:id>/<slug:tag>/");
/// assert_eq!(path, "/{id}/{tag}/");
/// assert_eq!(params.len(), 2);
/// ```
pub fn translate_path(raw: &str) -> (String, Vec<PathParameter>) {
    let without_anchors: String = raw.chars().filter(|c| *c != '^' && *c != '$').collect();
    let openapi = replace_named_groups(&without_anchors);
    let openapi = CONVERTER_RE.replace_all(&openapi, "{$1}");
    let openapi = ANGLE_RE.replace_all(&openapi, "{$1}");
    let openapi = SLASHES_RE.replace_all(&openapi, "/");
    let openapi = format!("/{}", openapi.trim_start_matches('/'));

    (openapi.clone(), extract_parameters(&openapi))
}

/// Collects `{name}` placeholders left to right, keeping the first of any repeated name.
pub fn extract_parameters(openapi_path: &str) -> Vec<PathParameter> {
    let mut parameters: Vec<PathParameter> = Vec::new();
    for capture in PLACEHOLDER_RE.captures_iter(openapi_path) {
        let name = &capture[1];
        if !parameters.iter().any(|p| p.name == name) {
            parameters.push(PathParameter::new(name));
        }
    }
    parameters
}

/// Replaces `(?P<name>pattern)` groups with `{name}`, matching parentheses so that
/// groups nested inside the pattern are consumed with it. A backslash-escaped character
/// outside a group is unescaped (`\.` becomes `.`).
fn replace_named_groups(path: &str) -> String {
    let chars: Vec<char> = path.chars().collect();
    let mut out = String::with_capacity(path.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '\\' && i + 1 < chars.len() {
            out.push(chars[i + 1]);
            i += 2;
            continue;
        }

        if starts_named_group(&chars, i) {
            let name_start = i + 4;
            if let Some(name_len) = chars[name_start..].iter().position(|c| *c == '>') {
                let name: String = chars[name_start..name_start + name_len].iter().collect();
                let mut depth = 1;
                let mut j = name_start + name_len + 1;
                while j < chars.len() && depth > 0 {
                    match chars[j] {
                        '\\' => j += 1,
                        '(' => depth += 1,
                        ')' => depth -= 1,
                        _ => {}
                    }
                    j += 1;
                }
                out.push('{');
                out.push_str(&name);
                out.push('}');
                i = j;
                continue;
            }
        }

        out.push(chars[i]);
        i += 1;
    }

    out
}

fn starts_named_group(chars: &[char], i: usize) -> bool {
    chars.len() > i + 3
        && chars[i] == '('
        && chars[i + 1] == '?'
        && chars[i + 2] == 'P'
        && chars[i + 3] == '<'
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(params: &[PathParameter]) -> Vec<&str> {
        params.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_converters_are_stripped() {
        let (path, params) = translate_path("<int:id>/<slug:tag>/");
        assert_eq!(path, "/{id}/{tag}/");
        assert_eq!(names(&params), vec!["id", "tag"]);
    }

    #[test]
    fn test_bare_angle_brackets() {
        let (path, params) = translate_path("users/<username>/posts/<post_id>");
        assert_eq!(path, "/users/{username}/posts/{post_id}");
        assert_eq!(names(&params), vec!["username", "post_id"]);
    }

    #[test]
    fn test_custom_converter() {
        let (path, params) = translate_path("archive/<yyyy:year>/");
        assert_eq!(path, "/archive/{year}/");
        assert_eq!(names(&params), vec!["year"]);
    }

    #[test]
    fn test_regex_named_groups() {
        let (path, params) = translate_path(r"^articles/(?P<year>[0-9]{4})/(?P<slug>[\w-]+)/$");
        assert_eq!(path, "/articles/{year}/{slug}/");
        assert_eq!(names(&params), vec!["year", "slug"]);
    }

    #[test]
    fn test_nested_regex_group() {
        let (path, params) = translate_path(r"^files/(?P<kind>(img|doc))/$");
        assert_eq!(path, "/files/{kind}/");
        assert_eq!(names(&params), vec!["kind"]);
    }

    #[test]
    fn test_concatenated_prefixes_are_normalised() {
        let (path, _) = translate_path("^api/^v1/users/");
        assert_eq!(path, "/api/v1/users/");

        let (path, _) = translate_path("api//users/");
        assert_eq!(path, "/api/users/");
    }

    #[test]
    fn test_empty_and_root() {
        assert_eq!(translate_path("").0, "/");
        assert_eq!(translate_path("/").0, "/");
        assert!(translate_path("").1.is_empty());
    }

    #[test]
    fn test_exactly_one_leading_slash() {
        assert_eq!(translate_path("///tasks/").0, "/tasks/");
    }

    #[test]
    fn test_existing_openapi_placeholders_are_kept() {
        let (path, params) = translate_path("tasks/{id}/");
        assert_eq!(path, "/tasks/{id}/");
        assert_eq!(names(&params), vec!["id"]);
    }

    #[test]
    fn test_repeated_parameter_names_are_unique() {
        let (_, params) = translate_path("<id>/copy/<int:id>/");
        assert_eq!(names(&params), vec!["id"]);
    }

    #[test]
    fn test_escaped_dot_in_regex() {
        let (path, _) = translate_path(r"^robots\.txt$");
        assert_eq!(path, "/robots.txt");
    }

    #[test]
    fn test_parameters_are_plain_strings() {
        let (_, params) = translate_path("<uuid:key>");
        assert_eq!(params[0], PathParameter::new("key"));
        assert_eq!(params[0].schema.schema_type, "string");
        assert!(params[0].required);
        assert_eq!(params[0].location, "path");
    }
}
