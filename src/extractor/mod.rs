//! Route extraction module for parsing Python web framework route definitions.
//!
//! This module provides a unified interface for extracting route information from different
//! web frameworks. Each framework has its own extractor implementation that knows how to
//! read one parsed file and report what it declares: its own routes, the other modules it
//! includes and the resource routers it registers. Following those references across files
//! is the job of the [`walker`](crate::walker).
//!
//! # Supported Frameworks
//!
//! - **Django**: See [`django::DjangoExtractor`]
//! - **Flask**: See [`flask::FlaskExtractor`]
//!
//! # Example
//!
//! ```no_run
//! use openapi_from_python::extractor::{RouteExtractor, Scope, django::DjangoExtractor};
//! use openapi_from_python::parser::AstParser;
//! use std::path::Path;
//!
//! let parsed = AstParser::parse_file(Path::new("project/urls.py")).unwrap();
//! let file_routes = DjangoExtractor.extract_file(&parsed, Scope::default());
//! println!("Found {} routes", file_routes.routes.len());
//! ```

pub mod django;
pub mod flask;
pub mod models;
pub mod viewset;

use crate::parser::ParsedFile;
use crate::path_translator::PathParameter;
use crate::syntax::ImportedName;
use std::collections::HashMap;
use std::fmt;
use viewset::ViewSetInfo;

/// Trait for extracting route information from a parsed Python file.
///
/// Implementations analyze the AST of a single file for a specific web framework. They
/// never touch the file system: includes are reported as [`IncludeReference`]s and left to
/// the caller to resolve.
pub trait RouteExtractor {
    /// Extracts everything routing-related that `parsed` declares.
    ///
    /// # Arguments
    ///
    /// * `parsed` - The parsed source file
    /// * `scope` - Which part of the file the including module asked for
    fn extract_file(&self, parsed: &ParsedFile, scope: Scope<'_>) -> FileRoutes;
}

/// The part of a file an include refers to. The default is the whole file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scope<'a> {
    /// When set, only routes belonging to this one router object (e.g. a Flask blueprint
    /// imported by name) are reported
    pub symbol: Option<&'a str>,
    /// Replaces that object's own url prefix
    pub url_prefix: Option<&'a str>,
}

impl<'a> Scope<'a> {
    pub fn symbol(symbol: &'a str) -> Self {
        Self {
            symbol: Some(symbol),
            url_prefix: None,
        }
    }
}

/// Complete information about a single API endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteInfo {
    /// The URL path, framework-native until the final translation step
    pub path: String,
    /// The HTTP method for this route
    pub method: HttpMethod,
    /// Operation id as declared or derived from the handler
    pub operation_id: String,
    /// Human-readable description
    pub description: String,
    /// Parameters of the full path, filled in by the walker once every prefix is known
    pub parameters: Vec<PathParameter>,
    /// Simple name of the view function or class, if known
    pub handler: Option<String>,
}

impl RouteInfo {
    /// Create a new RouteInfo with no parameters and no handler
    pub fn new(
        path: impl Into<String>,
        method: HttpMethod,
        operation_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            method,
            operation_id: operation_id.into(),
            description: description.into(),
            parameters: Vec::new(),
            handler: None,
        }
    }

    pub fn with_handler(mut self, handler: Option<String>) -> Self {
        self.handler = handler;
        self
    }

    /// Returns a copy of this route with `prefix` prepended to its path.
    pub fn prefixed(&self, prefix: &str) -> Self {
        Self {
            path: format!("{}{}", prefix, self.path),
            ..self.clone()
        }
    }
}

/// HTTP methods supported by route extractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpMethod {
    /// Parses a verb case-insensitively. Unknown verbs return `None`.
    pub fn parse(verb: &str) -> Option<Self> {
        match verb.to_ascii_lowercase().as_str() {
            "get" => Some(HttpMethod::Get),
            "post" => Some(HttpMethod::Post),
            "put" => Some(HttpMethod::Put),
            "delete" => Some(HttpMethod::Delete),
            "patch" => Some(HttpMethod::Patch),
            "options" => Some(HttpMethod::Options),
            "head" => Some(HttpMethod::Head),
            _ => None,
        }
    }

    /// Lowercase verb as used for OpenAPI path item keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
        }
    }

    /// Parses every recognised verb of `verbs`, dropping unknown ones and duplicates.
    pub fn parse_all<S: AsRef<str>>(verbs: &[S]) -> Vec<Self> {
        let mut methods = Vec::new();
        for verb in verbs {
            if let Some(method) = Self::parse(verb.as_ref()) {
                if !methods.contains(&method) {
                    methods.push(method);
                }
            }
        }
        methods
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// A reference from one routing file to another module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeReference {
    /// Dotted module path (`app.urls`)
    pub module: String,
    /// Leading dots of a relative import, 0 for absolute
    pub level: u32,
    /// Raw path prefix to prepend to everything the target declares
    pub prefix: String,
    /// Restricts the target to the routes of this one variable
    pub symbol: Option<String>,
    /// Replaces the url prefix the symbol declares for itself
    pub override_prefix: Option<String>,
}

impl IncludeReference {
    pub fn new(module: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            level: 0,
            prefix: prefix.into(),
            symbol: None,
            override_prefix: None,
        }
    }

    /// Builds a reference to wherever `imported` came from.
    pub fn from_import(imported: &ImportedName, prefix: impl Into<String>) -> Self {
        Self {
            module: imported.module.clone(),
            level: imported.level,
            prefix: prefix.into(),
            symbol: imported.symbol.clone(),
            override_prefix: None,
        }
    }

    /// The [`Scope`] the target file is read with.
    pub fn scope(&self) -> Scope<'_> {
        Scope {
            symbol: self.symbol.as_deref(),
            url_prefix: self.override_prefix.as_deref(),
        }
    }
}

/// `router.register(prefix, ViewSet, basename=...)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterRegistration {
    pub path_prefix: String,
    pub resource_class_name: String,
    pub base_name: Option<String>,
}

/// A registration paired with one prefix its router is mounted under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountedRegistration {
    pub mount: String,
    pub registration: RouterRegistration,
}

/// A routed view that was imported from another module.
///
/// Its verbs may be declared there (`@api_view`), so the route recorded for it is a plain
/// `GET` until the walker has looked the function up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedView {
    /// Index of its `GET` route in [`FileRoutes::routes`]
    pub route: usize,
    /// Path as written in the pattern
    pub raw_path: String,
    pub module: String,
    pub level: u32,
    pub function: String,
}

/// Everything a single file contributes to the route table.
#[derive(Debug, Default)]
pub struct FileRoutes {
    /// Routes declared directly in the file, in source order
    pub routes: Vec<RouteInfo>,
    /// Other modules whose routes are spliced in under a prefix
    pub includes: Vec<IncludeReference>,
    /// Router registrations with their mount prefixes
    pub registrations: Vec<MountedRegistration>,
    /// ViewSet-like classes defined in the file
    pub viewsets: HashMap<String, ViewSetInfo>,
    /// Names bound by import statements
    pub imports: HashMap<String, ImportedName>,
    /// Routes whose view lives in an imported module
    pub imported_views: Vec<ImportedView>,
    /// Variable name of the application object, if one is created
    pub app_name: Option<String>,
}
