//! Resolution of dotted Python module references to files on disk.
//!
//! Resolution is pure path arithmetic plus existence checks: nothing is imported and
//! no `sys.path` is consulted beyond the directories configured here.

use crate::error::Error;
use crate::extractor::IncludeReference;
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// Resolves module references relative to a project.
#[derive(Debug, Clone)]
pub struct ModuleResolver {
    project_root: PathBuf,
    search_paths: Vec<PathBuf>,
}

impl ModuleResolver {
    /// Creates a resolver for `project_root`.
    ///
    /// The search path is the project root, its parent, `<root>/apps`, the directory of
    /// the entry file and then `extra_paths`, without duplicates.
    pub fn new(project_root: &Path, entry_file: &Path, extra_paths: &[PathBuf]) -> Self {
        let mut search_paths: Vec<PathBuf> = Vec::new();
        let mut add = |dir: PathBuf| {
            if !search_paths.contains(&dir) {
                search_paths.push(dir);
            }
        };

        add(project_root.to_path_buf());
        if let Some(parent) = project_root.parent() {
            add(parent.to_path_buf());
        }
        add(project_root.join("apps"));
        if let Some(entry_dir) = entry_file.parent() {
            add(entry_dir.to_path_buf());
        }
        for extra in extra_paths {
            add(extra.clone());
        }

        debug!("Module search path: {:?}", search_paths);

        Self {
            project_root: project_root.to_path_buf(),
            search_paths,
        }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Resolves the target of an include made from `from`, logging a warning on failure.
    pub fn resolve(&self, include: &IncludeReference, from: &Path) -> Option<PathBuf> {
        let resolved = self.resolve_module(&include.module, include.level, from);
        if resolved.is_none() {
            let err = Error::UnresolvedModule {
                module: format!("{}{}", ".".repeat(include.level as usize), include.module),
                from: from.to_path_buf(),
            };
            warn!("{}", err);
        }
        resolved
    }

    /// Resolves `module` (with `level` leading dots) imported from the file `from`.
    pub fn resolve_module(&self, module: &str, level: u32, from: &Path) -> Option<PathBuf> {
        if level > 0 {
            let mut base = from.parent()?.to_path_buf();
            for _ in 1..level {
                base = base.parent()?.to_path_buf();
            }
            if let Some(found) = module_file(&base, module) {
                debug!("Resolved relative module {} to {}", module, found.display());
                return Some(found);
            }
        }

        if module.is_empty() {
            return None;
        }

        if let Some(found) = module_file(&self.project_root, module) {
            return Some(found);
        }

        if let Some(found) = self.app_layout_guess(module) {
            return Some(found);
        }

        self.search_paths
            .iter()
            .find_map(|dir| module_file(dir, module))
    }

    /// Common Django layouts where `module` names an app rather than its `urls` module.
    fn app_layout_guess(&self, module: &str) -> Option<PathBuf> {
        let as_path: PathBuf = module.split('.').collect();
        let first = module.split('.').next().unwrap_or(module);
        let last = module.rsplit('.').next().unwrap_or(module);

        let candidates = [
            self.project_root.join(&as_path).join("urls.py"),
            self.project_root.join(first).join(last).join("urls.py"),
            self.project_root.join("apps").join(&as_path).join("urls.py"),
        ];

        candidates
            .into_iter()
            .chain(
                self.search_paths
                    .iter()
                    .map(|dir| dir.join(&as_path).join("urls.py")),
            )
            .find(|candidate| candidate.is_file())
    }
}

/// `<base>/a/b.py` or `<base>/a/b/__init__.py` for module `a.b`.
fn module_file(base: &Path, module: &str) -> Option<PathBuf> {
    let mut path = base.to_path_buf();
    let segments: Vec<&str> = module.split('.').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        let init = path.join("__init__.py");
        return init.is_file().then_some(init);
    }
    for segment in &segments {
        path.push(segment);
    }

    let file = path.with_extension("py");
    if file.is_file() {
        return Some(file);
    }
    let init = path.join("__init__.py");
    init.is_file().then_some(init)
}
