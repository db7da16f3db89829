//! Naming heuristics: pluralization, resource segments and operation ids.
//!
//! These are approximations of English and of REST conventions. They are allowed to be
//! wrong for irregular words that are not listed, but always produce a syntactically
//! valid URL segment or identifier.

use once_cell::sync::Lazy;
use regex::Regex;

static CAMEL_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(.)([A-Z][a-z]+)").unwrap());
static CAMEL_BOUNDARY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").unwrap());
static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^}]+\}").unwrap());
static NON_IDENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9_]").unwrap());
static UNDERSCORES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").unwrap());

/// Upper bound on generated operation ids.
pub const MAX_OPERATION_ID_LEN: usize = 64;

const IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("child", "children"),
    ("foot", "feet"),
    ("tooth", "teeth"),
    ("goose", "geese"),
    ("mouse", "mice"),
    ("ox", "oxen"),
    ("leaf", "leaves"),
    ("life", "lives"),
    ("knife", "knives"),
    ("wife", "wives"),
    ("elf", "elves"),
    ("loaf", "loaves"),
    ("potato", "potatoes"),
    ("tomato", "tomatoes"),
    ("cactus", "cacti"),
    ("focus", "foci"),
    ("fungus", "fungi"),
    ("nucleus", "nuclei"),
    ("syllabus", "syllabi"),
    ("analysis", "analyses"),
    ("diagnosis", "diagnoses"),
    ("basis", "bases"),
    ("crisis", "crises"),
    ("thesis", "theses"),
    ("datum", "data"),
    ("medium", "media"),
    ("criterion", "criteria"),
    ("index", "indices"),
    ("matrix", "matrices"),
    ("vertex", "vertices"),
    ("alumnus", "alumni"),
    ("series", "series"),
    ("species", "species"),
    ("deer", "deer"),
    ("fish", "fish"),
    ("sheep", "sheep"),
    ("moose", "moose"),
    ("aircraft", "aircraft"),
];

/// Words ending in consonant + `o` that just take `s`.
const O_EXCEPTIONS: &[&str] = &["photo", "piano", "halo", "studio", "video", "radio", "solo"];

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

/// Second-to-last character, if any.
fn penultimate(word: &str) -> Option<char> {
    word.chars().rev().nth(1)
}

/// Pluralizes a lowercase English word.
///
/// The irregular table is checked first, then suffix rules in a fixed priority order.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }

    let word = word.to_lowercase();

    if let Some((_, plural)) = IRREGULAR_PLURALS.iter().find(|(singular, _)| *singular == word) {
        return plural.to_string();
    }

    let stem = |n: usize| &word[..word.len() - n];
    // Three-letter words (bus, gas, son) never take the classical endings.
    let classical = word.len() > 3;

    if classical && word.ends_with("is") {
        return format!("{}es", stem(2));
    }
    if classical && word.ends_with("on") {
        return format!("{}a", stem(2));
    }
    if classical && word.ends_with("us") {
        return format!("{}i", stem(2));
    }
    if word.ends_with('f') {
        return format!("{}ves", stem(1));
    }
    if word.ends_with("fe") {
        return format!("{}ves", stem(2));
    }
    if word.ends_with('y') && penultimate(&word).is_some_and(|c| !is_vowel(c)) {
        return format!("{}ies", stem(1));
    }
    if word.ends_with('o') && penultimate(&word).is_some_and(|c| !is_vowel(c)) {
        if O_EXCEPTIONS.contains(&word.as_str()) {
            return format!("{}s", word);
        }
        return format!("{}es", word);
    }
    if word.ends_with("ex") || word.ends_with("ix") {
        return format!("{}ices", stem(2));
    }
    if ["s", "ss", "sh", "ch", "x", "z"]
        .iter()
        .any(|suffix| word.ends_with(suffix))
    {
        return format!("{}es", word);
    }

    format!("{}s", word)
}

/// Converts a model or class name into a plural, hyphenated URL segment.
///
/// `UserProfile` becomes `user-profiles`.
pub fn model_name_to_endpoint(model_name: &str) -> String {
    let kebab = CAMEL_WORD_RE.replace_all(model_name, "$1-$2");
    let kebab = CAMEL_BOUNDARY_RE.replace_all(&kebab, "$1-$2").to_lowercase();
    pluralize(&kebab)
}

/// Converts `CamelCase` to `snake_case` at lowercase/digit → uppercase boundaries.
pub fn snake_case(name: &str) -> String {
    CAMEL_BOUNDARY_RE.replace_all(name, "${1}_${2}").to_lowercase()
}

/// Builds a descriptive operation id such as `get_user_profile_api_user_profiles`.
///
/// View suffixes (`ViewSet`, `View`, `APIView`) are dropped and path parameters are
/// removed. Ids longer than [`MAX_OPERATION_ID_LEN`] are shortened by replacing the path
/// part with its first segment and a short hash, then truncated if still too long.
pub fn generate_operation_id(method: &str, path: &str, view_name: Option<&str>) -> String {
    let view = view_name
        .map(|v| v.split(['.', '(']).next().unwrap_or(v))
        .unwrap_or("");
    let mut view_class = view;
    for suffix in ["ViewSet", "View", "APIView"] {
        if let Some(stripped) = view_class.strip_suffix(suffix) {
            view_class = stripped;
            break;
        }
    }
    let view_class = snake_case(view_class);

    let clean_path = PLACEHOLDER_RE.replace_all(path, "");
    let clean_parts: Vec<String> = clean_path
        .trim_matches('/')
        .split('/')
        .filter_map(|part| {
            let part = snake_case(part);
            let part = NON_IDENT_RE.replace_all(&part, "_");
            let part = UNDERSCORES_RE.replace_all(&part, "_");
            let part = part.trim_matches('_');
            (!part.is_empty()).then(|| part.to_string())
        })
        .collect();
    let path_str = clean_parts.join("_");

    let method = method.to_lowercase();
    let join = |parts: &[&str]| {
        parts
            .iter()
            .filter(|p| !p.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("_")
    };

    let mut operation_id = join(&[method.as_str(), view_class.as_str(), path_str.as_str()]);
    if operation_id.starts_with(|c: char| c.is_ascii_digit()) {
        operation_id = format!("op_{}", operation_id);
    }

    if operation_id.len() > MAX_OPERATION_ID_LEN {
        let hash = blake3::hash(path_str.as_bytes()).to_hex();
        let short_hash = &hash.as_str()[..8];
        let first_segment = clean_parts.first().map(String::as_str).unwrap_or("");
        let short_id = join(&[method.as_str(), view_class.as_str(), first_segment, short_hash]);

        operation_id = if short_id.len() <= MAX_OPERATION_ID_LEN {
            short_id
        } else {
            operation_id.chars().take(MAX_OPERATION_ID_LEN).collect()
        };
    }

    operation_id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize_table() {
        assert_eq!(pluralize("person"), "people");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("bus"), "buses");
        assert_eq!(pluralize("city"), "cities");
        assert_eq!(pluralize("photo"), "photos");
        assert_eq!(pluralize("index"), "indices");
    }

    #[test]
    fn test_pluralize_suffix_rules() {
        assert_eq!(pluralize("task"), "tasks");
        assert_eq!(pluralize("hero"), "heroes");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("church"), "churches");
        assert_eq!(pluralize("wolf"), "wolves");
        assert_eq!(pluralize("appendix"), "appendices");
        assert_eq!(pluralize("phenomenon"), "phenomena");
        assert_eq!(pluralize("radius"), "radii");
        assert_eq!(pluralize("axis"), "axes");
        assert_eq!(pluralize("son"), "sons");
    }

    #[test]
    fn test_pluralize_heuristics_may_be_wrong() {
        // `-us` wins over the sibilant rule, so `bonus` becomes `boni`.
        assert_eq!(pluralize("bonus"), "boni");
        // `-on` wins too: `person` is only right because of the table.
        assert_eq!(pluralize("lesson"), "lessa");
    }

    #[test]
    fn test_pluralize_lowercases_and_handles_empty() {
        assert_eq!(pluralize("Person"), "people");
        assert_eq!(pluralize(""), "");
        assert_eq!(pluralize("y"), "ys");
    }

    #[test]
    fn test_model_name_to_endpoint() {
        assert_eq!(model_name_to_endpoint("UserProfile"), "user-profiles");
        assert_eq!(model_name_to_endpoint("Task"), "tasks");
        assert_eq!(model_name_to_endpoint("Category"), "categories");
        assert_eq!(model_name_to_endpoint("HTTPRequestLog"), "http-request-logs");
        assert_eq!(model_name_to_endpoint("Oauth2Token"), "oauth2-tokens");
    }

    #[test]
    fn test_generate_operation_id() {
        assert_eq!(
            generate_operation_id("GET", "/api/user-profiles/{id}/", Some("UserProfileViewSet")),
            "get_user_profile_api_user_profiles"
        );
        assert_eq!(
            generate_operation_id("post", "/tasks/", None),
            "post_tasks"
        );
        assert_eq!(
            generate_operation_id("", "/2fa/verify/", None),
            "op_2fa_verify"
        );
    }

    #[test]
    fn test_generate_operation_id_is_bounded() {
        let long_path = "/api/v1/organisations/{org}/projects/{project}/environments/{env}/deployments/history/";
        let id = generate_operation_id("get", long_path, Some("DeploymentHistoryView"));

        assert!(id.len() <= MAX_OPERATION_ID_LEN, "{} is too long", id);
        assert!(id.starts_with("get_deployment_history_api_"));
    }

    #[test]
    fn test_generate_operation_id_truncates_as_last_resort() {
        let view = "A".repeat(40) + "b" + &"C".repeat(40);
        let id = generate_operation_id("get", "/x/", Some(&view));
        assert_eq!(id.len(), MAX_OPERATION_ID_LEN);
    }
}
