//! Project-wide index of ViewSet classes and data models.
//!
//! Routers may register ViewSets defined anywhere in the project, and schema inference
//! needs every model, so the whole tree is scanned once up front. Files that mention
//! neither a ViewSet nor a model are not parsed.

use crate::extractor::models::ModelInfo;
use crate::extractor::viewset::ViewSetInfo;
use crate::parser::AstParser;
use crate::scanner::FileScanner;
use anyhow::Result;
use log::{debug, warn};
use rustpython_parser::ast;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// ViewSets and models found in a project.
#[derive(Debug, Default)]
pub struct ProjectCatalog {
    pub viewsets: HashMap<String, ViewSetInfo>,
    pub models: BTreeMap<String, ModelInfo>,
}

impl ProjectCatalog {
    /// Scans `root` and indexes every ViewSet and model class.
    ///
    /// Unreadable or unparsable files are skipped with a warning. When two classes share
    /// a name, the one in the path that sorts first wins.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` cannot be scanned at all.
    pub fn build(root: &Path) -> Result<Self> {
        let scan = FileScanner::new(root.to_path_buf()).scan()?;
        let mut catalog = Self::default();
        for path in &scan.python_files {
            catalog.index_file(path);
        }
        debug!(
            "Catalog: {} viewsets, {} models",
            catalog.viewsets.len(),
            catalog.models.len()
        );
        Ok(catalog)
    }

    fn index_file(&mut self, path: &Path) {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                return;
            }
        };
        if !source.contains("ViewSet") && !source.contains("Model") {
            return;
        }

        match AstParser::parse_source(&source, path) {
            Ok(parsed) => self.index_body(&parsed.body),
            Err(e) => warn!("{}", e),
        }
    }

    /// Adds the classes defined at the top level of `body`.
    pub fn index_body(&mut self, body: &[ast::Stmt]) {
        for stmt in body {
            let ast::Stmt::ClassDef(class_def) = stmt else {
                continue;
            };
            if let Some(info) = ViewSetInfo::from_class(class_def) {
                self.viewsets.entry(info.name.clone()).or_insert(info);
            } else if let Some(model) = ModelInfo::from_class(class_def) {
                self.models.entry(model.name.clone()).or_insert(model);
            }
        }
    }

    /// The model a ViewSet serves: its `queryset` model, its name minus `ViewSet`, or its
    /// serializer name minus `Serializer`, whichever names a known model first.
    pub fn viewset_model(&self, viewset: &ViewSetInfo) -> Option<&str> {
        let from_name = viewset.name.strip_suffix("ViewSet");
        let from_serializer = viewset
            .serializer_class
            .as_deref()
            .and_then(|s| s.strip_suffix("Serializer"));

        [viewset.queryset_model.as_deref(), from_name, from_serializer]
            .into_iter()
            .flatten()
            .find_map(|candidate| {
                self.models
                    .get_key_value(candidate)
                    .map(|(name, _)| name.as_str())
            })
    }
}
