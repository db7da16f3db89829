use crate::cli::Framework;
use crate::parser::ParsedFile;
use crate::syntax::collect_imports;
use log::debug;
use std::collections::BTreeSet;

/// Framework detector for identifying which Python web framework a project uses.
///
/// Detection looks at module-level imports only: anything under `django` or
/// `rest_framework` means Django, anything under `flask` means Flask.
pub struct FrameworkDetector;

/// Result of framework detection.
pub struct DetectionResult {
    /// Detected frameworks, Django before Flask
    pub frameworks: Vec<Framework>,
}

impl DetectionResult {
    /// The framework, if exactly one was detected.
    pub fn single(&self) -> Option<Framework> {
        match self.frameworks.as_slice() {
            [framework] => Some(*framework),
            _ => None,
        }
    }
}

fn framework_of(module: &str) -> Option<Framework> {
    let top = module.split('.').next().unwrap_or(module);
    match top {
        "django" | "rest_framework" => Some(Framework::Django),
        "flask" => Some(Framework::Flask),
        _ => None,
    }
}

impl FrameworkDetector {
    /// Detects the web frameworks imported by the provided parsed files.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use openapi_from_python::detector::FrameworkDetector;
    /// use openapi_from_python::parser::AstParser;
    /// use std::path::Path;
    ///
    /// let parsed = AstParser::parse_file(Path::new("project/urls.py")).unwrap();
    /// let result = FrameworkDetector::detect(&[parsed]);
    /// println!("Detected {} framework(s)", result.frameworks.len());
    /// ```
    pub fn detect(parsed_files: &[ParsedFile]) -> DetectionResult {
        debug!("Detecting frameworks in {} files", parsed_files.len());

        let detected: BTreeSet<Framework> = parsed_files
            .iter()
            .flat_map(|parsed| collect_imports(&parsed.body).into_values())
            .filter(|import| import.level == 0)
            .filter_map(|import| framework_of(&import.module))
            .collect();

        let frameworks: Vec<Framework> = detected.into_iter().collect();
        debug!("Detected frameworks: {:?}", frameworks);

        DetectionResult { frameworks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::AstParser;
    use std::path::Path;

    fn parse(code: &str) -> ParsedFile {
        AstParser::parse_source(code, Path::new("test.py")).unwrap()
    }

    #[test]
    fn test_detect_django() {
        let parsed = parse("from django.urls import path, include\n\nurlpatterns = []\n");
        let result = FrameworkDetector::detect(&[parsed]);
        assert_eq!(result.single(), Some(Framework::Django));
    }

    #[test]
    fn test_detect_rest_framework_router() {
        let parsed = parse("from rest_framework import routers\nrouter = routers.DefaultRouter()\n");
        let result = FrameworkDetector::detect(&[parsed]);
        assert_eq!(result.frameworks, vec![Framework::Django]);
    }

    #[test]
    fn test_detect_flask_plain_import() {
        let parsed = parse("import flask\n\napp = flask.Flask(__name__)\n");
        let result = FrameworkDetector::detect(&[parsed]);
        assert_eq!(result.single(), Some(Framework::Flask));
    }

    #[test]
    fn test_detect_mixed_frameworks() {
        let files = vec![
            parse("from flask import Flask\n"),
            parse("from django.http import JsonResponse\n"),
            parse("from flask import Blueprint\n"),
        ];
        let result = FrameworkDetector::detect(&files);

        assert_eq!(result.frameworks, vec![Framework::Django, Framework::Flask]);
        assert_eq!(result.single(), None);
    }

    #[test]
    fn test_relative_and_unrelated_imports_are_ignored() {
        let files = vec![
            parse("from .flask import helpers\nimport os\nimport djangoish\n"),
            parse(""),
        ];
        let result = FrameworkDetector::detect(&files);
        assert!(result.frameworks.is_empty());
    }
}
