//! Resource-class (Django REST Framework ViewSet) analysis.
//!
//! A ViewSet is a class whose actions are dispatched by a router rather than declared
//! route by route. The set of actions is inferred from the base classes and, for the
//! bare `ViewSet`/`GenericViewSet` bases, from the action methods the class defines.

use super::HttpMethod;
use crate::syntax::{self, bool_literal, docstring, keyword, simple_name, string_literal};
use rustpython_parser::ast;

/// Router-dispatched actions in the order their routes are emitted.
pub const STANDARD_ACTIONS: [&str; 6] = [
    "list",
    "create",
    "retrieve",
    "update",
    "partial_update",
    "destroy",
];

/// HTTP method a standard action is served under.
pub fn action_method(action: &str) -> Option<HttpMethod> {
    match action {
        "list" | "retrieve" => Some(HttpMethod::Get),
        "create" => Some(HttpMethod::Post),
        "update" => Some(HttpMethod::Put),
        "partial_update" => Some(HttpMethod::Patch),
        "destroy" => Some(HttpMethod::Delete),
        _ => None,
    }
}

/// Whether a standard action addresses a single resource (`{id}/`).
pub fn is_detail_action(action: &str) -> bool {
    matches!(action, "retrieve" | "update" | "partial_update" | "destroy")
}

/// Actions contributed by a base class, or `None` if the base says nothing about actions.
fn base_actions(base: &str) -> Option<&'static [&'static str]> {
    match base {
        "ModelViewSet" => Some(&STANDARD_ACTIONS),
        "ReadOnlyModelViewSet" => Some(&["list", "retrieve"]),
        "ListModelMixin" => Some(&["list"]),
        "CreateModelMixin" => Some(&["create"]),
        "RetrieveModelMixin" => Some(&["retrieve"]),
        "UpdateModelMixin" => Some(&["update", "partial_update"]),
        "DestroyModelMixin" => Some(&["destroy"]),
        _ => None,
    }
}

/// A method decorated with `@action`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraAction {
    pub name: String,
    /// `true` for single-resource actions served under `{id}/`
    pub detail: bool,
    pub methods: Vec<HttpMethod>,
    pub url_path: String,
}

/// Metadata of a ViewSet-like class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSetInfo {
    pub name: String,
    /// Simple names of the base classes
    pub bases: Vec<String>,
    /// Standard action methods defined in the class body
    pub defined_actions: Vec<String>,
    pub extra_actions: Vec<ExtraAction>,
    /// `Model` from `queryset = Model.objects...`
    pub queryset_model: Option<String>,
    pub serializer_class: Option<String>,
    pub description: Option<String>,
}

impl ViewSetInfo {
    /// Analyses a class definition, returning `None` unless one of its bases is a ViewSet.
    pub fn from_class(class_def: &ast::StmtClassDef) -> Option<Self> {
        let bases: Vec<String> = class_def
            .bases
            .iter()
            .filter_map(simple_name)
            .map(str::to_string)
            .collect();
        if !bases.iter().any(|base| base.contains("ViewSet")) {
            return None;
        }

        let mut info = ViewSetInfo {
            name: class_def.name.to_string(),
            bases,
            defined_actions: Vec::new(),
            extra_actions: Vec::new(),
            queryset_model: None,
            serializer_class: None,
            description: docstring(&class_def.body),
        };

        for stmt in &class_def.body {
            match stmt {
                ast::Stmt::Assign(assign) => {
                    let Some(target) = assign.targets.first().and_then(syntax::name_id) else {
                        continue;
                    };
                    match target {
                        "queryset" => info.queryset_model = queryset_model(&assign.value),
                        "serializer_class" => {
                            info.serializer_class = simple_name(&assign.value).map(str::to_string)
                        }
                        _ => {}
                    }
                }
                ast::Stmt::FunctionDef(func) => {
                    info.add_method(func.name.as_str(), &func.decorator_list)
                }
                ast::Stmt::AsyncFunctionDef(func) => {
                    info.add_method(func.name.as_str(), &func.decorator_list)
                }
                _ => {}
            }
        }

        Some(info)
    }

    fn add_method(&mut self, name: &str, decorators: &[ast::Expr]) {
        if STANDARD_ACTIONS.contains(&name) {
            self.defined_actions.push(name.to_string());
        }

        for decorator in decorators {
            let ast::Expr::Call(call) = decorator else {
                continue;
            };
            if simple_name(&call.func) != Some("action") {
                continue;
            }

            let detail = keyword(call, "detail")
                .and_then(bool_literal)
                .unwrap_or(false);
            let mut methods = keyword(call, "methods")
                .map(|m| HttpMethod::parse_all(&syntax::string_list(m)))
                .unwrap_or_default();
            if methods.is_empty() {
                methods.push(HttpMethod::Get);
            }
            let url_path = keyword(call, "url_path")
                .and_then(string_literal)
                .unwrap_or(name)
                .trim_matches('/')
                .to_string();

            self.extra_actions.push(ExtraAction {
                name: name.to_string(),
                detail,
                methods,
                url_path,
            });
        }
    }

    /// Standard actions this ViewSet serves, in [`STANDARD_ACTIONS`] order.
    ///
    /// Falls back to `list` and `retrieve` when nothing can be inferred.
    pub fn actions(&self) -> Vec<&'static str> {
        let mut enabled: Vec<&str> = Vec::new();
        for base in &self.bases {
            if let Some(actions) = base_actions(base) {
                enabled.extend(actions.iter().copied());
            } else if base == "ViewSet" || base == "GenericViewSet" {
                enabled.extend(self.defined_actions.iter().map(String::as_str));
            }
        }

        let actions: Vec<&'static str> = STANDARD_ACTIONS
            .iter()
            .copied()
            .filter(|action| enabled.contains(action))
            .collect();

        if actions.is_empty() {
            vec!["list", "retrieve"]
        } else {
            actions
        }
    }
}

/// Finds `Model` in `Model.objects.all()`, `Model.objects.filter(...).order_by(...)` etc.
fn queryset_model(expr: &ast::Expr) -> Option<String> {
    match expr {
        ast::Expr::Call(call) => queryset_model(&call.func),
        ast::Expr::Attribute(attr) if attr.attr.as_str() == "objects" => {
            simple_name(&attr.value).map(str::to_string)
        }
        ast::Expr::Attribute(attr) => queryset_model(&attr.value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::AstParser;
    use std::path::Path;

    fn viewset(code: &str) -> Option<ViewSetInfo> {
        let parsed = AstParser::parse_source(code, Path::new("views.py")).unwrap();
        parsed.body.iter().find_map(|stmt| match stmt {
            ast::Stmt::ClassDef(class_def) => ViewSetInfo::from_class(class_def),
            _ => None,
        })
    }

    #[test]
    fn test_model_viewset_has_full_crud() {
        let info = viewset(
            r#"
class TaskViewSet(viewsets.ModelViewSet):
    """Tasks of the current user."""
    queryset = Task.objects.all().order_by("-created")
    serializer_class = TaskSerializer
"#,
        )
        .unwrap();

        assert_eq!(info.actions(), STANDARD_ACTIONS.to_vec());
        assert_eq!(info.queryset_model.as_deref(), Some("Task"));
        assert_eq!(info.serializer_class.as_deref(), Some("TaskSerializer"));
        assert_eq!(info.description.as_deref(), Some("Tasks of the current user."));
    }

    #[test]
    fn test_read_only_viewset() {
        let info = viewset("class A(ReadOnlyModelViewSet):\n    pass\n").unwrap();
        assert_eq!(info.actions(), vec!["list", "retrieve"]);
    }

    #[test]
    fn test_mixins_contribute_actions() {
        let info = viewset(
            r#"
class A(mixins.CreateModelMixin, mixins.DestroyModelMixin, viewsets.GenericViewSet):
    pass
"#,
        )
        .unwrap();
        assert_eq!(info.actions(), vec!["create", "destroy"]);
    }

    #[test]
    fn test_plain_viewset_uses_defined_methods() {
        let info = viewset(
            r#"
class A(viewsets.ViewSet):
    def list(self, request):
        pass

    def partial_update(self, request, pk=None):
        pass

    def helper(self):
        pass
"#,
        )
        .unwrap();
        assert_eq!(info.actions(), vec!["list", "partial_update"]);
    }

    #[test]
    fn test_empty_viewset_falls_back_to_list_and_retrieve() {
        let info = viewset("class A(viewsets.ViewSet):\n    pass\n").unwrap();
        assert_eq!(info.actions(), vec!["list", "retrieve"]);
    }

    #[test]
    fn test_extra_actions() {
        let info = viewset(
            r#"
class A(viewsets.ModelViewSet):
    @action(detail=True, methods=["post", "put"], url_path="mark-done")
    def complete(self, request, pk=None):
        pass

    @action(detail=False)
    def recent(self, request):
        pass
"#,
        )
        .unwrap();

        assert_eq!(
            info.extra_actions,
            vec![
                ExtraAction {
                    name: "complete".to_string(),
                    detail: true,
                    methods: vec![HttpMethod::Post, HttpMethod::Put],
                    url_path: "mark-done".to_string(),
                },
                ExtraAction {
                    name: "recent".to_string(),
                    detail: false,
                    methods: vec![HttpMethod::Get],
                    url_path: "recent".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_non_viewset_class_is_ignored() {
        assert!(viewset("class TaskSerializer(serializers.ModelSerializer):\n    pass\n").is_none());
    }

    #[test]
    fn test_action_table() {
        assert_eq!(action_method("partial_update"), Some(HttpMethod::Patch));
        assert_eq!(action_method("destroy"), Some(HttpMethod::Delete));
        assert_eq!(action_method("frobnicate"), None);
        assert!(is_detail_action("retrieve"));
        assert!(!is_detail_action("list"));
    }
}
