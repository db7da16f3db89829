//! openapi-from-python - OpenAPI documents from Django and Flask projects, statically.
//!
//! Python sources are parsed, never executed. Starting from a root URL configuration
//! (Django) or application file (Flask), the include graph is walked file by file and
//! every route found is collected into an OpenAPI 3.0 document.
//!
//! # Supported Frameworks
//!
//! - **Django**: `urlpatterns` with `path`/`re_path`/`url`, `include(...)`, class-based
//!   views, `@api_view` functions and REST framework routers with ViewSets
//! - **Flask**: `@app.route` and method shortcut decorators, `add_url_rule` and blueprints
//!
//! # Architecture
//!
//! 1. [`scanner`] - Recursively scans project directories for Python files
//! 2. [`parser`] and [`syntax`] - Parse files and classify routing-relevant statements
//! 3. [`detector`] - Detects the framework from imports
//! 4. [`extractor`] - Per-file route extraction for each framework
//! 5. [`resolver`] and [`walker`] - Follow includes across files, once per file
//! 6. [`catalog`] and [`schema_generator`] - Project-wide ViewSets and models
//! 7. [`path_translator`] and [`naming`] - Path syntax, pluralization and operation ids
//! 8. [`openapi_builder`] - Deduplicates routes and assembles the document
//! 9. [`serializer`] - Writes JSON or YAML
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_python::{
//!     catalog::ProjectCatalog,
//!     extractor::django::DjangoExtractor,
//!     openapi_builder::OpenApiBuilder,
//!     resolver::ModuleResolver,
//!     serializer::serialize_json,
//!     walker::Walker,
//! };
//! use std::path::Path;
//!
//! let root = Path::new("./mysite");
//! let entry = root.join("mysite/urls.py");
//!
//! let catalog = ProjectCatalog::build(root).unwrap();
//! let resolver = ModuleResolver::new(root, &entry, &[]);
//! let mut walker = Walker::new(Box::new(DjangoExtractor), resolver, &catalog);
//! let routes = walker.walk(&entry, "");
//!
//! let mut builder = OpenApiBuilder::new();
//! for route in &routes {
//!     builder.add_route(route, None);
//! }
//! println!("{}", serialize_json(&builder.build(None)).unwrap());
//! ```
//!
//! For command-line usage, see the [`cli`] module.

pub mod catalog;
pub mod cli;
pub mod detector;
pub mod error;
pub mod extractor;
pub mod naming;
pub mod openapi_builder;
pub mod parser;
pub mod path_translator;
pub mod resolver;
pub mod scanner;
pub mod schema_generator;
pub mod serializer;
pub mod syntax;
pub mod walker;
