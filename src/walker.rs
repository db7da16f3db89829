//! Recursive walk over routing files.
//!
//! Starting at the entry file, every include is resolved and walked with the combined
//! prefix, and every router registration is expanded into concrete routes. The result
//! is one flat route list in framework-native path syntax.

use crate::catalog::ProjectCatalog;
use crate::extractor::django::{api_view_methods, expand_verbs};
use crate::extractor::viewset::{action_method, is_detail_action, ViewSetInfo};
use crate::extractor::{
    FileRoutes, HttpMethod, ImportedView, MountedRegistration, RouteExtractor, RouteInfo, Scope,
};
use crate::parser::{AstParser, ParsedFile};
use crate::path_translator::translate_path;
use crate::resolver::ModuleResolver;
use log::{debug, info, warn};
use rustpython_parser::ast;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Walks a tree of routing files, visiting each file (or file and symbol) at most once.
pub struct Walker<'a> {
    extractor: Box<dyn RouteExtractor>,
    resolver: ModuleResolver,
    catalog: &'a ProjectCatalog,
    visited: HashSet<(PathBuf, Option<String>)>,
    app_name: Option<String>,
}

impl<'a> Walker<'a> {
    pub fn new(
        extractor: Box<dyn RouteExtractor>,
        resolver: ModuleResolver,
        catalog: &'a ProjectCatalog,
    ) -> Self {
        Self {
            extractor,
            resolver,
            catalog,
            visited: HashSet::new(),
            app_name: None,
        }
    }

    /// Name of the first application object seen during the walk.
    pub fn app_name(&self) -> Option<&str> {
        self.app_name.as_deref()
    }

    /// Number of distinct files (or file/symbol pairs) processed so far.
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Collects every route reachable from `file`, with `prefix` prepended and path
    /// parameters filled in.
    ///
    /// Files that were already visited, do not exist or fail to parse contribute nothing.
    pub fn walk(&mut self, file: &Path, prefix: &str) -> Vec<RouteInfo> {
        let mut routes = self.walk_file(file, prefix, Scope::default());
        for route in &mut routes {
            route.parameters = translate_path(&route.path).1;
        }
        routes
    }

    fn walk_file(&mut self, file: &Path, prefix: &str, scope: Scope<'_>) -> Vec<RouteInfo> {
        let canonical = match file.canonicalize() {
            Ok(path) => path,
            Err(e) => {
                warn!("Skipping {}: {}", file.display(), e);
                return Vec::new();
            }
        };

        if !self
            .visited
            .insert((canonical.clone(), scope.symbol.map(str::to_string)))
        {
            debug!("Already visited {}, skipping", canonical.display());
            return Vec::new();
        }

        let parsed = match AstParser::parse_file(&canonical) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("{}", e);
                return Vec::new();
            }
        };

        info!("Scanning {}", canonical.display());
        let mut file_routes = self.extractor.extract_file(&parsed, scope);
        if self.app_name.is_none() {
            self.app_name = file_routes.app_name.clone();
        }

        let own = std::mem::take(&mut file_routes.routes);
        let mut routes: Vec<RouteInfo> = self
            .resolve_imported_views(own, &file_routes.imported_views, &canonical)
            .iter()
            .map(|route| route.prefixed(prefix))
            .collect();

        for include in &file_routes.includes {
            let Some(target) = self.resolver.resolve(include, &canonical) else {
                continue;
            };
            let nested_prefix = format!("{}{}", prefix, include.prefix);
            debug!(
                "Following include {} -> {} (prefix {:?})",
                include.module,
                target.display(),
                nested_prefix
            );
            routes.extend(self.walk_file(&target, &nested_prefix, include.scope()));
        }

        for mounted in &file_routes.registrations {
            routes.extend(self.expand_registration(mounted, prefix, &file_routes, &canonical));
        }

        routes
    }

    /// Replaces the `GET` route of every imported view with one route per verb its
    /// `@api_view` decorator declares in the module it comes from.
    fn resolve_imported_views(
        &self,
        routes: Vec<RouteInfo>,
        views: &[ImportedView],
        from: &Path,
    ) -> Vec<RouteInfo> {
        if views.is_empty() {
            return routes;
        }

        let mut modules: HashMap<PathBuf, Option<ParsedFile>> = HashMap::new();
        let mut resolved = Vec::with_capacity(routes.len());
        for (index, route) in routes.into_iter().enumerate() {
            let view = views.iter().find(|view| view.route == index);
            let methods = view.and_then(|view| self.imported_api_view(view, from, &mut modules));
            match (view, methods) {
                (Some(view), Some(methods)) => {
                    debug!(
                        "@api_view {}.{} -> {:?}",
                        view.module, view.function, methods
                    );
                    resolved.extend(expand_verbs(&route, &view.raw_path, &methods));
                }
                _ => resolved.push(route),
            }
        }
        resolved
    }

    fn imported_api_view(
        &self,
        view: &ImportedView,
        from: &Path,
        modules: &mut HashMap<PathBuf, Option<ParsedFile>>,
    ) -> Option<Vec<HttpMethod>> {
        let module = self.resolver.resolve_module(&view.module, view.level, from)?;
        let parsed = modules
            .entry(module)
            .or_insert_with_key(|path| match AstParser::parse_file(path) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    warn!("{}", e);
                    None
                }
            });
        api_view_methods(&parsed.as_ref()?.body, &view.function)
    }

    /// Expands one router registration into its standard and extra action routes.
    fn expand_registration(
        &self,
        mounted: &MountedRegistration,
        prefix: &str,
        file_routes: &FileRoutes,
        from: &Path,
    ) -> Vec<RouteInfo> {
        let registration = &mounted.registration;
        let class_name = registration.resource_class_name.as_str();
        let viewset = self.find_viewset(class_name, file_routes, from);
        if viewset.is_none() {
            debug!("ViewSet {} not found, assuming list and retrieve", class_name);
        }

        let actions = viewset
            .as_ref()
            .map(ViewSetInfo::actions)
            .unwrap_or_else(|| vec!["list", "retrieve"]);

        let collection = format!(
            "{}{}{}/",
            prefix,
            mounted.mount,
            registration.path_prefix.trim_end_matches('/')
        );
        let detail = format!("{}{{id}}/", collection);
        let description = |action: &str| format!("{} {}", action, registration.path_prefix);
        let handler = Some(class_name.to_string());

        let mut routes = Vec::new();
        for action in actions {
            let Some(method) = action_method(action) else {
                continue;
            };
            let path = if is_detail_action(action) {
                &detail
            } else {
                &collection
            };
            routes.push(
                RouteInfo::new(
                    path.as_str(),
                    method,
                    format!("{}_{}", class_name, action),
                    description(action),
                )
                .with_handler(handler.clone()),
            );
        }

        for extra in viewset.iter().flat_map(|v| &v.extra_actions) {
            let base = if extra.detail { &detail } else { &collection };
            let path = format!("{}{}/", base, extra.url_path);
            for method in &extra.methods {
                routes.push(
                    RouteInfo::new(
                        path.as_str(),
                        *method,
                        format!("{}_{}", class_name, extra.name),
                        description(&extra.name),
                    )
                    .with_handler(handler.clone()),
                );
            }
        }

        routes
    }

    /// Looks a ViewSet up in the current file, then in the module it was imported from,
    /// then in the project catalog.
    fn find_viewset(
        &self,
        name: &str,
        file_routes: &FileRoutes,
        from: &Path,
    ) -> Option<ViewSetInfo> {
        if let Some(info) = file_routes.viewsets.get(name) {
            return Some(info.clone());
        }

        if let Some(imported) = file_routes.imports.get(name) {
            let class_name = imported.symbol.as_deref().unwrap_or(name);
            if let Some(info) = self
                .resolver
                .resolve_module(&imported.module, imported.level, from)
                .and_then(|module| viewset_in_file(&module, class_name))
            {
                return Some(info);
            }
        }

        self.catalog.viewsets.get(name).cloned()
    }
}

fn viewset_in_file(path: &Path, class_name: &str) -> Option<ViewSetInfo> {
    let parsed = match AstParser::parse_file(path) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("{}", e);
            return None;
        }
    };
    parsed.body.iter().find_map(|stmt| match stmt {
        ast::Stmt::ClassDef(class_def) if class_def.name.as_str() == class_name => {
            ViewSetInfo::from_class(class_def)
        }
        _ => None,
    })
}
