use crate::extractor::viewset::ViewSetInfo;
use crate::extractor::{
    FileRoutes, HttpMethod, ImportedView, IncludeReference, MountedRegistration, RouteExtractor,
    RouteInfo, RouterRegistration, Scope,
};
use crate::parser::ParsedFile;
use crate::syntax::{
    self, collect_imports, collect_nodes, keyword, method_call, name_id, simple_name,
    string_literal, ImportedName, Node,
};
use log::debug;
use rustpython_parser::ast;
use std::collections::HashMap;

const PATTERNS_VAR: &str = "urlpatterns";

/// Django URL configuration extractor.
///
/// Reads `urlpatterns` declarations, `include()` references, Django REST Framework
/// routers and `@api_view` function views from a single `urls.py`-style module.
pub struct DjangoExtractor;

impl RouteExtractor for DjangoExtractor {
    fn extract_file(&self, parsed: &ParsedFile, _scope: Scope<'_>) -> FileRoutes {
        let mut visitor = UrlConfVisitor::new(collect_imports(&parsed.body));
        visitor.visit(&parsed.body);
        visitor.finish()
    }
}

/// State of one router variable within a file.
#[derive(Debug)]
struct RouterState {
    name: String,
    declared: bool,
    mounts: Vec<String>,
    registrations: Vec<RouterRegistration>,
}

/// Collects router declarations, registrations and mount points for one file.
///
/// `router.register(...)` and `include(router.urls)` may appear in either order, so the
/// pairing only happens in [`flush`](Self::flush) once the whole file has been seen.
#[derive(Debug, Default)]
pub struct RouterAccumulator {
    routers: Vec<RouterState>,
}

impl RouterAccumulator {
    fn state(&mut self, name: &str) -> &mut RouterState {
        if let Some(index) = self.routers.iter().position(|r| r.name == name) {
            return &mut self.routers[index];
        }
        self.routers.push(RouterState {
            name: name.to_string(),
            declared: false,
            mounts: Vec::new(),
            registrations: Vec::new(),
        });
        let last = self.routers.len() - 1;
        &mut self.routers[last]
    }

    /// Records `name = SomeRouter()`.
    pub fn declare(&mut self, name: &str) {
        self.state(name).declared = true;
    }

    pub fn is_router(&self, name: &str) -> bool {
        self.routers.iter().any(|r| r.name == name && r.declared)
    }

    pub fn register(&mut self, router: &str, registration: RouterRegistration) {
        self.state(router).registrations.push(registration);
    }

    /// Records that `router.urls` is served under `prefix`.
    pub fn mount(&mut self, router: &str, prefix: &str) {
        self.state(router).mounts.push(prefix.to_string());
    }

    /// Pairs every registration with every mount of its router.
    ///
    /// A router that was never mounted is treated as mounted once at `""`.
    pub fn flush(self) -> Vec<MountedRegistration> {
        let mut mounted = Vec::new();
        for router in self.routers {
            let mounts = if router.mounts.is_empty() {
                vec![String::new()]
            } else {
                router.mounts
            };
            for mount in &mounts {
                for registration in &router.registrations {
                    mounted.push(MountedRegistration {
                        mount: mount.clone(),
                        registration: registration.clone(),
                    });
                }
            }
        }
        mounted
    }
}

/// Visitor over the routing nodes of one URL configuration module.
struct UrlConfVisitor<'a> {
    routes: Vec<RouteInfo>,
    includes: Vec<IncludeReference>,
    routers: RouterAccumulator,
    /// Verbs declared with `@api_view`, by function name
    api_view_methods: HashMap<&'a str, Vec<HttpMethod>>,
    /// Pattern lists assigned to names other than `urlpatterns`
    local_lists: HashMap<&'a str, &'a ast::Expr>,
    viewsets: HashMap<String, ViewSetInfo>,
    imports: HashMap<String, ImportedName>,
    imported_views: Vec<ImportedView>,
}

impl<'a> UrlConfVisitor<'a> {
    fn new(imports: HashMap<String, ImportedName>) -> Self {
        Self {
            routes: Vec::new(),
            includes: Vec::new(),
            routers: RouterAccumulator::default(),
            api_view_methods: HashMap::new(),
            local_lists: HashMap::new(),
            viewsets: HashMap::new(),
            imports,
            imported_views: Vec::new(),
        }
    }

    fn visit(&mut self, body: &'a [ast::Stmt]) {
        let nodes = collect_nodes(body);

        // Decorators and classes first, so that a pattern may reference a view that is
        // defined further down the file.
        for node in &nodes {
            match node {
                Node::FunctionDef(func) => self.collect_api_view(func.name, func.decorators),
                Node::ClassDef(class_def) => {
                    if let Some(info) = ViewSetInfo::from_class(class_def) {
                        self.viewsets.insert(info.name.clone(), info);
                    }
                }
                _ => {}
            }
        }

        for node in nodes {
            match node {
                Node::Assign { targets, value } => self.visit_assign(targets, value),
                Node::AugAssign { target, value } => {
                    if name_id(target) == Some(PATTERNS_VAR) {
                        self.consume_patterns(value, "");
                    }
                }
                Node::Call(call) => self.visit_call(call),
                Node::ClassDef(_) | Node::FunctionDef(_) => {}
            }
        }
    }

    fn finish(self) -> FileRoutes {
        FileRoutes {
            routes: self.routes,
            includes: self.includes,
            registrations: self.routers.flush(),
            viewsets: self.viewsets,
            imports: self.imports,
            imported_views: self.imported_views,
            app_name: None,
        }
    }

    fn collect_api_view(&mut self, name: &'a str, decorators: &'a [ast::Expr]) {
        if let Some(methods) = api_view_verbs(decorators) {
            debug!("@api_view {} -> {:?}", name, methods);
            self.api_view_methods.insert(name, methods);
        }
    }

    fn visit_assign(&mut self, targets: &'a [ast::Expr], value: &'a ast::Expr) {
        let Some(target) = targets.first().and_then(name_id) else {
            return;
        };

        if target == PATTERNS_VAR {
            self.consume_patterns(value, "");
            return;
        }

        match value {
            ast::Expr::Call(call)
                if simple_name(&call.func).is_some_and(|callee| callee.ends_with("Router")) =>
            {
                self.routers.declare(target);
            }
            ast::Expr::List(_) | ast::Expr::Tuple(_) | ast::Expr::BinOp(_) => {
                self.local_lists.insert(target, value);
            }
            _ => {}
        }
    }

    fn visit_call(&mut self, call: &'a ast::ExprCall) {
        let Some((receiver, method)) = method_call(call) else {
            return;
        };

        match method {
            "extend" | "append" if receiver == PATTERNS_VAR => {
                if let Some(arg) = call.args.first() {
                    self.consume_patterns(arg, "");
                }
            }
            "register" if self.routers.is_router(receiver) => {
                if let Some(registration) = parse_registration(call) {
                    debug!(
                        "Router {} registers {} -> {}",
                        receiver, registration.path_prefix, registration.resource_class_name
                    );
                    self.routers.register(receiver, registration);
                }
            }
            _ => {}
        }
    }

    /// Consumes a pattern collection (list, tuple, concatenation, name or single call)
    /// with every path relative to `prefix`.
    fn consume_patterns(&mut self, expr: &'a ast::Expr, prefix: &str) {
        match expr {
            ast::Expr::List(list) => {
                for elt in &list.elts {
                    self.consume_patterns(elt, prefix);
                }
            }
            ast::Expr::Tuple(tuple) => {
                for elt in &tuple.elts {
                    self.consume_patterns(elt, prefix);
                }
            }
            ast::Expr::BinOp(bin_op) if matches!(bin_op.op, ast::Operator::Add) => {
                self.consume_patterns(&bin_op.left, prefix);
                self.consume_patterns(&bin_op.right, prefix);
            }
            ast::Expr::Attribute(attr) if attr.attr.as_str() == "urls" => {
                self.mount_urls(attr, prefix);
            }
            ast::Expr::Name(name) => {
                if let Some(list) = self.local_lists.get(name.id.as_str()).copied() {
                    self.consume_patterns(list, prefix);
                }
            }
            ast::Expr::Call(call) => {
                if matches!(simple_name(&call.func), Some("path" | "re_path" | "url")) {
                    self.handle_route(call, prefix);
                }
            }
            _ => debug!("Skipping dynamic url pattern expression"),
        }
    }

    fn handle_route(&mut self, call: &'a ast::ExprCall, prefix: &str) {
        let Some(raw) = call.args.first().and_then(string_literal) else {
            debug!("Skipping route with a non-literal path");
            return;
        };
        let view = call.args.get(1).or_else(|| keyword(call, "view"));

        if let Some(ast::Expr::Call(view_call)) = view {
            if simple_name(&view_call.func) == Some("include") {
                self.handle_include(view_call, &format!("{}{}", prefix, raw));
                return;
            }
        }

        let handler = view.and_then(view_handler);
        let methods = self.route_methods(call, view, handler.as_deref());

        let base_id = handler
            .clone()
            .or_else(|| keyword(call, "name").and_then(string_literal).map(str::to_string))
            .unwrap_or_else(|| format!("op_{}", self.routes.len()));
        let route = RouteInfo::new(format!("{}{}", prefix, raw), HttpMethod::Get, base_id, "")
            .with_handler(handler);

        let methods = match methods {
            Some(methods) => methods,
            None => {
                if let Some(imported) = view.and_then(|v| self.imported_view(v, raw)) {
                    self.imported_views.push(imported);
                }
                vec![HttpMethod::Get]
            }
        };
        self.routes.extend(expand_verbs(&route, raw, &methods));
    }

    /// Where a view referenced as `module.func` or `func` was imported from.
    fn imported_view(&self, view: &ast::Expr, raw: &str) -> Option<ImportedView> {
        let (imported, module, function) = match view {
            ast::Expr::Attribute(attr) => {
                let local = name_id(&attr.value)?;
                let imported = self.imports.get(local)?;
                (imported, imported.module_path(local), attr.attr.to_string())
            }
            ast::Expr::Name(name) => {
                let imported = self.imports.get(name.id.as_str())?;
                let function = imported.symbol.clone()?;
                (imported, imported.module.clone(), function)
            }
            _ => return None,
        };

        Some(ImportedView {
            route: self.routes.len(),
            raw_path: raw.to_string(),
            module,
            level: imported.level,
            function,
        })
    }

    /// Resolves a route's verbs, most specific source first. `None` when nothing in this
    /// file declares them.
    fn route_methods(
        &self,
        call: &ast::ExprCall,
        view: Option<&ast::Expr>,
        handler: Option<&str>,
    ) -> Option<Vec<HttpMethod>> {
        if let Some(methods) = handler.and_then(|h| self.api_view_methods.get(h)) {
            return Some(methods.clone());
        }

        if let Some(ast::Expr::Call(as_view)) = view {
            if simple_name(&as_view.func) == Some("as_view") {
                if let Some(names) = keyword(as_view, "http_method_names") {
                    let methods = HttpMethod::parse_all(&syntax::string_list(names));
                    if !methods.is_empty() {
                        return Some(methods);
                    }
                }
                if let Some(ast::Expr::Dict(mapping)) = as_view.args.first() {
                    let verbs: Vec<&str> = mapping
                        .keys
                        .iter()
                        .flatten()
                        .filter_map(string_literal)
                        .collect();
                    let methods = HttpMethod::parse_all(&verbs);
                    if !methods.is_empty() {
                        return Some(methods);
                    }
                }
            }
        }

        keyword(call, "methods")
            .map(|m| HttpMethod::parse_all(&syntax::string_list(m)))
            .filter(|methods| !methods.is_empty())
    }

    /// `x.urls`: a router mount when `x` is a router of this file, else the `urls` module
    /// of an imported package.
    fn mount_urls(&mut self, attr: &ast::ExprAttribute, prefix: &str) {
        let Some(name) = name_id(&attr.value) else {
            debug!("Skipping urls of a dynamic expression");
            return;
        };

        // Routers may be declared after the patterns that mount them.
        if !self.routers.is_router(name) {
            if let Some(imported) = self.imports.get(name) {
                let module = format!("{}.urls", imported.module_path(name));
                self.includes.push(IncludeReference {
                    level: imported.level,
                    ..IncludeReference::new(module, prefix)
                });
                return;
            }
        }
        self.routers.mount(name, prefix);
    }

    fn handle_include(&mut self, include: &'a ast::ExprCall, prefix: &str) {
        let Some(target) = include.args.first() else {
            return;
        };

        match target {
            ast::Expr::Tuple(tuple) => {
                if let Some(module) = tuple.elts.first().and_then(string_literal) {
                    self.includes.push(IncludeReference::new(module, prefix));
                }
            }
            ast::Expr::Attribute(attr) if attr.attr.as_str() == "urls" => {
                self.mount_urls(attr, prefix);
            }
            ast::Expr::Name(name) if self.local_lists.contains_key(name.id.as_str()) => {
                self.consume_patterns(target, prefix);
            }
            ast::Expr::Name(name) => {
                if let Some(imported) = self.imports.get(name.id.as_str()) {
                    self.includes.push(IncludeReference {
                        level: imported.level,
                        ..IncludeReference::new(imported.module_path(name.id.as_str()), prefix)
                    });
                } else {
                    debug!("Skipping include of unknown name {}", name.id);
                }
            }
            other => match string_literal(other) {
                Some(module) => self.includes.push(IncludeReference::new(module, prefix)),
                None => debug!("Skipping dynamic include"),
            },
        }
    }
}

/// One route per verb, built from a `GET` route carrying the base operation id.
///
/// Non-`GET` verbs get a `_<verb>` suffix on the id, and every route is described as
/// `"GET, POST <raw path>"`.
pub fn expand_verbs(route: &RouteInfo, raw_path: &str, methods: &[HttpMethod]) -> Vec<RouteInfo> {
    let verbs: Vec<String> = methods.iter().map(HttpMethod::to_string).collect();
    let description = format!("{} {}", verbs.join(", "), raw_path);

    methods
        .iter()
        .map(|&method| {
            let operation_id = if method == HttpMethod::Get {
                route.operation_id.clone()
            } else {
                format!("{}_{}", route.operation_id, method.as_str())
            };
            RouteInfo {
                method,
                operation_id,
                description: description.clone(),
                ..route.clone()
            }
        })
        .collect()
}

/// Verbs that `@api_view` declares for `function` in `body`, if it is decorated.
pub fn api_view_methods(body: &[ast::Stmt], function: &str) -> Option<Vec<HttpMethod>> {
    collect_nodes(body).into_iter().find_map(|node| match node {
        Node::FunctionDef(func) if func.name == function => api_view_verbs(func.decorators),
        _ => None,
    })
}

fn api_view_verbs(decorators: &[ast::Expr]) -> Option<Vec<HttpMethod>> {
    decorators.iter().find_map(|decorator| {
        let ast::Expr::Call(call) = decorator else {
            return None;
        };
        if simple_name(&call.func) != Some("api_view") {
            return None;
        }
        let verbs = call
            .args
            .first()
            .or_else(|| keyword(call, "http_method_names"))
            .map(syntax::string_list)
            .unwrap_or_default();
        let methods = HttpMethod::parse_all(&verbs);
        Some(if methods.is_empty() {
            vec![HttpMethod::Get]
        } else {
            methods
        })
    })
}

/// Simple name of the view a route points at; `View.as_view()` yields `View`.
fn view_handler(view: &ast::Expr) -> Option<String> {
    match view {
        ast::Expr::Call(call) => match call.func.as_ref() {
            ast::Expr::Attribute(attr) if attr.attr.as_str() == "as_view" => {
                simple_name(&attr.value).map(str::to_string)
            }
            _ => None,
        },
        other => simple_name(other).map(str::to_string),
    }
}

fn parse_registration(call: &ast::ExprCall) -> Option<RouterRegistration> {
    let path_prefix = call.args.first().and_then(string_literal)?;
    let resource_class_name = call
        .args
        .get(1)
        .or_else(|| keyword(call, "viewset"))
        .and_then(simple_name)?;
    let base_name = keyword(call, "basename")
        .or_else(|| keyword(call, "base_name"))
        .or_else(|| call.args.get(2))
        .and_then(string_literal)
        .map(str::to_string);

    Some(RouterRegistration {
        path_prefix: path_prefix.to_string(),
        resource_class_name: resource_class_name.to_string(),
        base_name,
    })
}
