//! Serialization of OpenAPI documents to JSON or YAML.

use crate::openapi_builder::OpenApiDocument;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::Path;

/// Serializes an OpenAPI document to YAML format.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_yaml(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to YAML");
    serde_yaml::to_string(doc).context("Failed to serialize OpenAPI document to YAML")
}

/// Serializes an OpenAPI document to JSON with two-space indentation.
///
/// Key order follows the document structure and sorted path keys, so identical input
/// always yields identical bytes.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_json(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to JSON");
    serde_json::to_string_pretty(doc).context("Failed to serialize OpenAPI document to JSON")
}

/// Writes string content to a file, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the file or its directories cannot be created or written to.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{HttpMethod, RouteInfo};
    use crate::openapi_builder::OpenApiBuilder;
    use tempfile::TempDir;

    fn document() -> OpenApiDocument {
        let mut builder = OpenApiBuilder::new()
            .with_info("Test API".to_string(), "1.0.0".to_string(), None)
            .with_base_path("/base");
        builder.add_route(
            &RouteInfo::new("users/<int:id>/", HttpMethod::Get, "user_detail", "GET users/<int:id>/"),
            None,
        );
        builder.build(None)
    }

    #[test]
    fn test_serialize_json() {
        let json = serialize_json(&document()).unwrap();

        assert!(json.contains("\n  \"info\""));
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["openapi"], "3.0.2");
        assert_eq!(parsed["servers"][0]["url"], "/base");
        let op = &parsed["paths"]["/users/{id}/"]["get"];
        assert_eq!(op["operationId"], "user_detail");
        assert_eq!(op["parameters"][0]["in"], "path");
        assert_eq!(op["parameters"][0]["required"], true);
        assert_eq!(op["parameters"][0]["schema"]["type"], "string");
    }

    #[test]
    fn test_serialize_yaml() {
        let yaml = serialize_yaml(&document()).unwrap();

        assert!(yaml.contains("openapi: 3.0.2"));
        assert!(yaml.contains("/users/{id}/:"));
        assert!(yaml.contains("operationId: user_detail"));

        let parsed: OpenApiDocument = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.info.title, "Test API");
        assert_eq!(parsed.operation_count(), 1);
    }

    #[test]
    fn test_json_output_is_stable() {
        assert_eq!(
            serialize_json(&document()).unwrap(),
            serialize_json(&document()).unwrap()
        );
    }

    #[test]
    fn test_write_to_file_creates_directories_and_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("out").join("nested").join("openapi.json");

        write_to_file("first", &file_path).unwrap();
        write_to_file("second", &file_path).unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "second");
    }
}
