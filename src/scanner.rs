use anyhow::Result;
use log::warn;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory names that never contain project source.
const SKIPPED_DIRS: [&str; 6] = [
    "__pycache__",
    "node_modules",
    "venv",
    "env",
    "site-packages",
    "migrations",
];

/// File scanner for traversing Python project directories.
///
/// The `FileScanner` recursively walks a project directory to find Python source files.
/// Hidden directories (those starting with `.`, which covers `.venv` and `.git`), byte-code
/// caches, virtual environments, `node_modules` and Django migrations are skipped.
///
/// # Example
///
/// ```no_run
/// use openapi_from_python::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./my-project"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} Python files", result.python_files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
}

/// Result of a directory scan.
pub struct ScanResult {
    /// Discovered `.py` files, sorted
    pub python_files: Vec<PathBuf>,
    /// Warning messages for paths that could not be accessed
    pub warnings: Vec<String>,
}

impl ScanResult {
    /// Files whose name is exactly `file_name`, e.g. every `models.py`.
    pub fn named<'a>(&'a self, file_name: &'a str) -> impl Iterator<Item = &'a PathBuf> + 'a {
        self.python_files
            .iter()
            .filter(move |p| p.file_name().and_then(|n| n.to_str()) == Some(file_name))
    }
}

impl FileScanner {
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    fn is_skipped(root: &Path, entry: &walkdir::DirEntry) -> bool {
        if entry.path() == root || !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref())
    }

    /// Scans the directory tree and collects all `.py` files.
    ///
    /// Inaccessible entries are logged and recorded as warnings; scanning continues.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory does not exist.
    pub fn scan(&self) -> Result<ScanResult> {
        if !self.root_path.is_dir() {
            anyhow::bail!("{} is not a directory", self.root_path.display());
        }

        let mut python_files = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .into_iter()
            .filter_entry(|e| !Self::is_skipped(&self.root_path, e))
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if entry.file_type().is_file()
                        && path.extension().and_then(|s| s.to_str()) == Some("py")
                    {
                        python_files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        python_files.sort();

        Ok(ScanResult {
            python_files,
            warnings,
        })
    }
}
