use crate::error::{Error, Result};
use log::{debug, warn};
use rustpython_parser::{ast, parse, Mode};
use std::fs;
use std::path::{Path, PathBuf};

/// AST parser for Python source files.
///
/// The `AstParser` uses `rustpython-parser` to turn Python source into a statement list
/// which the framework visitors then walk. Nothing is imported or executed.
///
/// # Example
///
/// ```no_run
/// use openapi_from_python::parser::AstParser;
/// use std::path::Path;
///
/// let parsed = AstParser::parse_file(Path::new("project/urls.py")).unwrap();
/// println!("Parsed {} top-level statements", parsed.body.len());
/// ```
pub struct AstParser;

/// A successfully parsed Python file.
#[derive(Debug)]
pub struct ParsedFile {
    /// Path to the source file
    pub path: PathBuf,
    /// Top-level statements of the module
    pub body: Vec<ast::Stmt>,
}

impl AstParser {
    /// Reads and parses a single Python source file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IoError`] if the file cannot be read and [`Error::ParseError`]
    /// if it is not valid Python.
    pub fn parse_file(path: &Path) -> Result<ParsedFile> {
        debug!("Parsing file: {}", path.display());

        let content = fs::read_to_string(path).map_err(|source| Error::IoError {
            file: path.to_path_buf(),
            source,
        })?;

        Self::parse_source(&content, path)
    }

    /// Parses Python source text that nominally lives at `path`.
    pub fn parse_source(source: &str, path: &Path) -> Result<ParsedFile> {
        let module = parse(source, Mode::Module, &path.to_string_lossy()).map_err(|e| {
            Error::ParseError {
                file: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;

        let body = match module {
            ast::Mod::Module(module) => module.body,
            _ => Vec::new(),
        };

        debug!(
            "Successfully parsed {} ({} statements)",
            path.display(),
            body.len()
        );

        Ok(ParsedFile {
            path: path.to_path_buf(),
            body,
        })
    }

    /// Parses multiple files, continuing past failures.
    ///
    /// Failures are logged as warnings and returned alongside the successes so that a
    /// project with one broken module still yields partial documentation.
    pub fn parse_files(paths: &[PathBuf]) -> Vec<Result<ParsedFile>> {
        debug!("Parsing {} files", paths.len());

        let results: Vec<Result<ParsedFile>> = paths
            .iter()
            .map(|path| match Self::parse_file(path) {
                Ok(parsed) => Ok(parsed),
                Err(e) => {
                    warn!("{}", e);
                    Err(e)
                }
            })
            .collect();

        let success_count = results.iter().filter(|r| r.is_ok()).count();
        debug!(
            "Parsing complete: {} succeeded, {} failed",
            success_count,
            results.len() - success_count
        );

        results
    }
}
