use crate::extractor::{
    FileRoutes, HttpMethod, IncludeReference, RouteExtractor, RouteInfo, Scope,
};
use crate::parser::ParsedFile;
use crate::syntax::{
    self, collect_imports, collect_nodes, docstring, keyword, method_call, name_id, simple_name,
    string_literal, FunctionNode, ImportedName, Node,
};
use log::debug;
use rustpython_parser::ast;
use std::collections::HashMap;

const SHORTCUT_METHODS: [&str; 5] = ["get", "post", "put", "delete", "patch"];

/// Flask route extractor.
///
/// Understands `@app.route`, the `@app.get`-style shortcuts, `add_url_rule` and
/// blueprints, including blueprints registered from another module.
pub struct FlaskExtractor;

impl RouteExtractor for FlaskExtractor {
    fn extract_file(&self, parsed: &ParsedFile, scope: Scope<'_>) -> FileRoutes {
        let mut visitor = FlaskVisitor::new(collect_imports(&parsed.body));
        visitor.visit(&parsed.body);
        visitor.finish(scope)
    }
}

#[derive(Debug)]
struct Blueprint {
    name: String,
    url_prefix: String,
    routes: Vec<RouteInfo>,
    /// Prefixes this blueprint is registered under in the same file
    registrations: Vec<String>,
}

struct FlaskVisitor {
    apps: Vec<String>,
    blueprints: Vec<Blueprint>,
    routes: Vec<RouteInfo>,
    includes: Vec<IncludeReference>,
    imports: HashMap<String, ImportedName>,
}

impl FlaskVisitor {
    fn new(imports: HashMap<String, ImportedName>) -> Self {
        Self {
            apps: Vec::new(),
            blueprints: Vec::new(),
            routes: Vec::new(),
            includes: Vec::new(),
            imports,
        }
    }

    fn blueprint_mut(&mut self, name: &str) -> Option<&mut Blueprint> {
        self.blueprints.iter_mut().find(|bp| bp.name == name)
    }

    fn visit(&mut self, body: &[ast::Stmt]) {
        let nodes = collect_nodes(body);

        // Application and blueprint objects first; factories often create them after the
        // view functions are defined.
        for node in &nodes {
            if let Node::Assign { targets, value } = node {
                self.declare_object(targets, value);
            }
        }

        for node in nodes {
            match node {
                Node::FunctionDef(func) => self.visit_function(&func),
                Node::Call(call) => self.visit_call(call),
                _ => {}
            }
        }
    }

    fn declare_object(&mut self, targets: &[ast::Expr], value: &ast::Expr) {
        let Some(target) = targets.first().and_then(name_id) else {
            return;
        };
        let ast::Expr::Call(call) = value else {
            return;
        };

        match simple_name(&call.func) {
            Some("Flask") => {
                debug!("Found Flask application {}", target);
                self.apps.push(target.to_string());
            }
            Some("Blueprint") => {
                let url_prefix = keyword(call, "url_prefix")
                    .and_then(string_literal)
                    .unwrap_or("")
                    .to_string();
                debug!("Found blueprint {} (url_prefix {:?})", target, url_prefix);
                self.blueprints.push(Blueprint {
                    name: target.to_string(),
                    url_prefix,
                    routes: Vec::new(),
                    registrations: Vec::new(),
                });
            }
            _ => {}
        }
    }

    fn visit_function(&mut self, func: &FunctionNode<'_>) {
        for decorator in func.decorators {
            let ast::Expr::Call(call) = decorator else {
                continue;
            };
            let Some((receiver, method)) = method_call(call) else {
                continue;
            };

            let methods = match method {
                "route" => route_methods(call),
                shortcut if SHORTCUT_METHODS.contains(&shortcut) => {
                    HttpMethod::parse(shortcut).into_iter().collect()
                }
                _ => continue,
            };
            let Some(path) = call.args.first().and_then(string_literal) else {
                debug!("Skipping route on {} with a non-literal path", func.name);
                continue;
            };

            let operation_id = keyword(call, "endpoint")
                .and_then(string_literal)
                .unwrap_or(func.name);
            let summary = docstring(func.body);
            self.add_routes(receiver, path, &methods, operation_id, summary, func.name);
        }
    }

    fn visit_call(&mut self, call: &ast::ExprCall) {
        let Some((receiver, method)) = method_call(call) else {
            return;
        };

        match method {
            "add_url_rule" => {
                let Some(path) = call.args.first().and_then(string_literal) else {
                    return;
                };
                let endpoint = call
                    .args
                    .get(1)
                    .or_else(|| keyword(call, "endpoint"))
                    .and_then(string_literal);
                let view_func = call
                    .args
                    .get(2)
                    .or_else(|| keyword(call, "view_func"))
                    .and_then(view_func_name);
                let Some(operation_id) = endpoint.or(view_func) else {
                    debug!("Skipping add_url_rule({:?}) without endpoint or view", path);
                    return;
                };
                let handler = view_func.unwrap_or(operation_id);
                let methods = route_methods(call);
                self.add_routes(receiver, path, &methods, operation_id, None, handler);
            }
            "register_blueprint" => self.register_blueprint(call),
            _ => {}
        }
    }

    fn add_routes(
        &mut self,
        receiver: &str,
        path: &str,
        methods: &[HttpMethod],
        operation_id: &str,
        summary: Option<String>,
        handler: &str,
    ) {
        let routes: Vec<RouteInfo> = methods
            .iter()
            .map(|method| {
                let description = summary
                    .clone()
                    .unwrap_or_else(|| format!("Endpoint for {} {}", method, path));
                RouteInfo::new(path, *method, operation_id, description)
                    .with_handler(Some(handler.to_string()))
            })
            .collect();

        if self.apps.iter().any(|app| app == receiver) {
            self.routes.extend(routes);
        } else if let Some(blueprint) = self.blueprint_mut(receiver) {
            blueprint.routes.extend(routes);
        } else {
            debug!("Skipping route on unknown object {}", receiver);
        }
    }

    fn register_blueprint(&mut self, call: &ast::ExprCall) {
        let Some(target) = call.args.first().or_else(|| keyword(call, "blueprint")) else {
            return;
        };
        let override_prefix = keyword(call, "url_prefix")
            .and_then(string_literal)
            .map(str::to_string);

        if let Some(name) = name_id(target) {
            if let Some(blueprint) = self.blueprint_mut(name) {
                let prefix = override_prefix.unwrap_or_else(|| blueprint.url_prefix.clone());
                blueprint.registrations.push(prefix);
                return;
            }
            if let Some(imported) = self.imports.get(name) {
                self.includes.push(IncludeReference {
                    override_prefix,
                    ..IncludeReference::from_import(imported, "")
                });
                return;
            }
        }

        // `views.bp` where `views` is an imported module
        if let ast::Expr::Attribute(attr) = target {
            if let Some(local) = name_id(&attr.value) {
                if let Some(imported) = self.imports.get(local) {
                    self.includes.push(IncludeReference {
                        module: imported.module_path(local),
                        level: imported.level,
                        prefix: String::new(),
                        symbol: Some(attr.attr.to_string()),
                        override_prefix,
                    });
                    return;
                }
            }
        }

        debug!("Skipping registration of an unresolvable blueprint");
    }

    fn finish(self, scope: Scope<'_>) -> FileRoutes {
        let app_name = self.apps.first().cloned();

        if let Some(symbol) = scope.symbol {
            if let Some(blueprint) = self.blueprints.iter().find(|bp| bp.name == symbol) {
                let url_prefix = scope.url_prefix.unwrap_or(blueprint.url_prefix.as_str());
                return FileRoutes {
                    routes: prefixed(&blueprint.routes, url_prefix),
                    imports: self.imports,
                    app_name,
                    ..FileRoutes::default()
                };
            }
        }

        let mut routes = self.routes;
        for blueprint in &self.blueprints {
            if blueprint.registrations.is_empty() {
                routes.extend(prefixed(&blueprint.routes, &blueprint.url_prefix));
            }
            for prefix in &blueprint.registrations {
                routes.extend(prefixed(&blueprint.routes, prefix));
            }
        }

        FileRoutes {
            routes,
            includes: self.includes,
            imports: self.imports,
            app_name,
            ..FileRoutes::default()
        }
    }
}

fn prefixed(routes: &[RouteInfo], prefix: &str) -> Vec<RouteInfo> {
    routes.iter().map(|route| route.prefixed(prefix)).collect()
}

/// `methods=[...]` of a route call, defaulting to `GET`.
fn route_methods(call: &ast::ExprCall) -> Vec<HttpMethod> {
    let methods = keyword(call, "methods")
        .map(|m| HttpMethod::parse_all(&syntax::string_list(m)))
        .unwrap_or_default();
    if methods.is_empty() {
        vec![HttpMethod::Get]
    } else {
        methods
    }
}

/// `view`, `views.view` and `View.as_view("name")` all name a view.
fn view_func_name(expr: &ast::Expr) -> Option<&str> {
    match expr {
        ast::Expr::Call(call) => match call.func.as_ref() {
            ast::Expr::Attribute(attr) if attr.attr.as_str() == "as_view" => {
                simple_name(&attr.value)
            }
            _ => None,
        },
        other => simple_name(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::AstParser;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn extract(code: &str, scope: Scope<'_>) -> FileRoutes {
        let parsed = AstParser::parse_source(code, Path::new("app.py")).unwrap();
        FlaskExtractor.extract_file(&parsed, scope)
    }

    fn summary(file: &FileRoutes) -> Vec<(String, &'static str, String)> {
        file.routes
            .iter()
            .map(|r| (r.path.clone(), r.method.as_str(), r.operation_id.clone()))
            .collect()
    }

    fn row(path: &str, method: &'static str, op: &str) -> (String, &'static str, String) {
        (path.to_string(), method, op.to_string())
    }

    #[test]
    fn test_app_routes() {
        let file = extract(
            r#"
from flask import Flask

app = Flask(__name__)

@app.route("/users/<int:user_id>", methods=["GET", "DELETE"])
def user(user_id):
    """Fetch or remove a user.

    Longer text.
    """

@app.post("/users", endpoint="create_user")
def create():
    pass

@cache.get("/not-a-route")
def cached():
    pass
"#,
            Scope::default(),
        );

        assert_eq!(file.app_name.as_deref(), Some("app"));
        assert_eq!(
            summary(&file),
            vec![
                row("/users/<int:user_id>", "get", "user"),
                row("/users/<int:user_id>", "delete", "user"),
                row("/users", "post", "create_user"),
            ]
        );
        assert_eq!(file.routes[0].description, "Fetch or remove a user.");
        assert_eq!(file.routes[2].description, "Endpoint for POST /users");
        assert_eq!(file.routes[2].handler.as_deref(), Some("create"));
    }

    #[test]
    fn test_app_factory() {
        let file = extract(
            r#"
def create_app():
    @application.route("/ping")
    def ping():
        return "pong"

    application = Flask(__name__)
    return application
"#,
            Scope::default(),
        );
        assert_eq!(file.app_name.as_deref(), Some("application"));
        assert_eq!(summary(&file), vec![row("/ping", "get", "ping")]);
    }

    #[test]
    fn test_add_url_rule() {
        let file = extract(
            r#"
app = Flask(__name__)
app.add_url_rule("/", "index", index)
app.add_url_rule("/items/<id>", view_func=ItemView.as_view("item"), methods=["PUT"])
"#,
            Scope::default(),
        );
        assert_eq!(
            summary(&file),
            vec![row("/", "get", "index"), row("/items/<id>", "put", "ItemView")]
        );
    }

    #[test]
    fn test_local_blueprint_prefixes() {
        let file = extract(
            r#"
app = Flask(__name__)
api = Blueprint("api", __name__, url_prefix="/api")
admin = Blueprint("admin", __name__, url_prefix="/admin")
loose = Blueprint("loose", __name__, url_prefix="/loose")

@api.route("/tasks")
def tasks():
    pass

@admin.get("/stats")
def stats():
    pass

@loose.get("/x")
def x():
    pass

app.register_blueprint(api)
app.register_blueprint(admin, url_prefix="/backoffice")
"#,
            Scope::default(),
        );

        assert_eq!(
            summary(&file),
            vec![
                row("/api/tasks", "get", "tasks"),
                row("/backoffice/stats", "get", "stats"),
                row("/loose/x", "get", "x"),
            ]
        );
    }

    #[test]
    fn test_imported_blueprints_become_includes() {
        let file = extract(
            r#"
from flask import Flask
from .auth import bp as auth_bp
import reports

app = Flask(__name__)
app.register_blueprint(auth_bp, url_prefix="/auth")
app.register_blueprint(reports.blueprint)
"#,
            Scope::default(),
        );

        assert_eq!(
            file.includes,
            vec![
                IncludeReference {
                    module: "auth".to_string(),
                    level: 1,
                    prefix: String::new(),
                    symbol: Some("bp".to_string()),
                    override_prefix: Some("/auth".to_string()),
                },
                IncludeReference {
                    module: "reports".to_string(),
                    level: 0,
                    prefix: String::new(),
                    symbol: Some("blueprint".to_string()),
                    override_prefix: None,
                },
            ]
        );
    }

    #[test]
    fn test_symbol_restricts_to_one_blueprint() {
        let code = r#"
bp = Blueprint("auth", __name__, url_prefix="/v1")
other = Blueprint("other", __name__)

@bp.route("/login", methods=["POST"])
def login():
    pass

@other.route("/elsewhere")
def elsewhere():
    pass
"#;
        let file = extract(code, Scope::symbol("bp"));
        assert_eq!(summary(&file), vec![row("/v1/login", "post", "login")]);

        let file = extract(code, Scope::default());
        assert_eq!(file.routes.len(), 2);
    }

    #[test]
    fn test_registration_prefix_replaces_blueprint_prefix() {
        let code = r#"
bp = Blueprint("auth", __name__, url_prefix="/v1")

@bp.post("/login")
def login():
    pass
"#;
        let scope = Scope {
            symbol: Some("bp"),
            url_prefix: Some("/auth"),
        };
        assert_eq!(
            summary(&extract(code, scope)),
            vec![row("/auth/login", "post", "login")]
        );

        let scope = Scope {
            symbol: Some("bp"),
            url_prefix: Some(""),
        };
        assert_eq!(summary(&extract(code, scope)), vec![row("/login", "post", "login")]);
    }
}
