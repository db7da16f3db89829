// Routes that only exist once several files are read together
use openapi_from_python::catalog::ProjectCatalog;
use openapi_from_python::extractor::django::DjangoExtractor;
use openapi_from_python::extractor::flask::FlaskExtractor;
use openapi_from_python::extractor::{RouteExtractor, RouteInfo};
use openapi_from_python::openapi_builder::OpenApiBuilder;
use openapi_from_python::resolver::ModuleResolver;
use openapi_from_python::walker::Walker;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn walk(
    extractor: Box<dyn RouteExtractor>,
    root: &Path,
    entry: &str,
    search_paths: &[PathBuf],
) -> Vec<RouteInfo> {
    let catalog = ProjectCatalog::build(root).unwrap();
    let entry = root.join(entry);
    let resolver = ModuleResolver::new(root, &entry, search_paths);
    let mut walker = Walker::new(extractor, resolver, &catalog);
    walker.walk(&entry, "")
}

/// `(openapi path, method, operation id)` after assembly, in document order.
fn operations(routes: &[RouteInfo]) -> Vec<(String, String, String)> {
    let mut builder = OpenApiBuilder::new();
    for route in routes {
        builder.add_route(route, None);
    }
    let doc = builder.build(None);

    let mut rows = Vec::new();
    for (path, item) in &doc.paths {
        let methods = [
            ("get", &item.get),
            ("post", &item.post),
            ("put", &item.put),
            ("delete", &item.delete),
            ("patch", &item.patch),
        ];
        for (method, op) in methods {
            if let Some(op) = op {
                rows.push((path.clone(), method.to_string(), op.operation_id.clone()));
            }
        }
    }
    rows
}

fn row(path: &str, method: &str, op: &str) -> (String, String, String) {
    (path.to_string(), method.to_string(), op.to_string())
}

#[test]
fn test_relative_viewset_import_with_extra_actions() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(
        root,
        "project/urls.py",
        r#"
from django.urls import include, path

urlpatterns = [path("api/v2/", include("todo.urls"))]
"#,
    );
    write(
        root,
        "todo/urls.py",
        r#"
from rest_framework import routers

from .api import ItemViewSet

router = routers.SimpleRouter()
router.register("items", ItemViewSet)

urlpatterns = router.urls
"#,
    );
    write(
        root,
        "todo/api.py",
        r#"
from rest_framework import mixins, viewsets
from rest_framework.decorators import action


class ItemViewSet(mixins.ListModelMixin, mixins.CreateModelMixin, viewsets.GenericViewSet):
    @action(detail=True, methods=["post"], url_path="mark-done")
    def mark_done(self, request, pk=None):
        pass

    @action(detail=False)
    def recent(self, request):
        pass
"#,
    );

    let routes = walk(Box::new(DjangoExtractor), root, "project/urls.py", &[]);

    assert_eq!(
        operations(&routes),
        vec![
            row("/api/v2/items/", "get", "ItemViewSet_list"),
            row("/api/v2/items/", "post", "ItemViewSet_create"),
            row("/api/v2/items/recent/", "get", "ItemViewSet_recent"),
            row("/api/v2/items/{id}/mark-done/", "post", "ItemViewSet_mark_done"),
        ]
    );
}

#[test]
fn test_include_of_imported_urls_module() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(
        root,
        "urls.py",
        r#"
from django.urls import include, path
from shop import urls as shop_urls

urlpatterns = [path("shop/", include(shop_urls))]
"#,
    );
    write(
        root,
        "shop/urls.py",
        r#"
from django.urls import path
from . import views

urlpatterns = [
    path("cart/<uuid:cart_id>/", views.CartView.as_view({"get": "retrieve", "delete": "destroy"})),
]
"#,
    );

    let routes = walk(Box::new(DjangoExtractor), root, "urls.py", &[]);

    assert_eq!(
        operations(&routes),
        vec![
            row("/shop/cart/{cart_id}/", "get", "CartView"),
            row("/shop/cart/{cart_id}/", "delete", "CartView_delete"),
        ]
    );
}

#[test]
fn test_search_path_resolves_modules_outside_the_project() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("proj");
    let vendor = temp_dir.path().join("vendor");
    write(
        &root,
        "urls.py",
        r#"
from django.urls import include, path

urlpatterns = [path("plugins/", include("plugins.urls"))]
"#,
    );
    write(
        &vendor,
        "plugins/urls.py",
        r#"
from django.urls import path

urlpatterns = [path("ping/", views.ping)]
"#,
    );

    let without = walk(Box::new(DjangoExtractor), &root, "urls.py", &[]);
    assert!(without.is_empty());

    let with = walk(Box::new(DjangoExtractor), &root, "urls.py", &[vendor]);
    assert_eq!(operations(&with), vec![row("/plugins/ping/", "get", "ping")]);
}

#[test]
fn test_flask_blueprints_from_module_attribute() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(
        root,
        "service/__init__.py",
        r#"
from flask import Flask

from . import views

app = Flask(__name__)
app.register_blueprint(views.bp)
app.register_blueprint(views.admin, url_prefix="/admin")
"#,
    );
    write(
        root,
        "service/views.py",
        r#"
from flask import Blueprint

bp = Blueprint("public", __name__, url_prefix="/public")
admin = Blueprint("admin", __name__)


@bp.route("/pages/<slug>")
def page(slug):
    pass


@admin.delete("/pages/<slug>")
def remove_page(slug):
    pass
"#,
    );

    let routes = walk(Box::new(FlaskExtractor), root, "service/__init__.py", &[]);

    assert_eq!(
        operations(&routes),
        vec![
            row("/admin/pages/{slug}", "delete", "remove_page"),
            row("/public/pages/{slug}", "get", "page"),
        ]
    );
}

#[test]
fn test_registration_prefix_replaces_imported_blueprint_prefix() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(
        root,
        "app.py",
        r#"
from flask import Flask

from auth import bp

app = Flask(__name__)
app.register_blueprint(bp, url_prefix="/auth")
"#,
    );
    write(
        root,
        "auth.py",
        r#"
from flask import Blueprint

bp = Blueprint("auth", __name__, url_prefix="/v1")


@bp.post("/login")
def login():
    pass
"#,
    );

    let routes = walk(Box::new(FlaskExtractor), root, "app.py", &[]);

    assert_eq!(operations(&routes), vec![row("/auth/login", "post", "login")]);
}

#[test]
fn test_include_of_imported_module_urls_attribute() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(
        root,
        "urls.py",
        r#"
import blog.urls
from django.urls import include, path

urlpatterns = [path("blog/", include(blog.urls))]
"#,
    );
    write(
        root,
        "blog/urls.py",
        r#"
from django.urls import path

from . import views

urlpatterns = [path("posts/", views.post_list)]
"#,
    );

    let routes = walk(Box::new(DjangoExtractor), root, "urls.py", &[]);

    assert_eq!(operations(&routes), vec![row("/blog/posts/", "get", "post_list")]);
}

#[test]
fn test_api_view_verbs_declared_in_views_module() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(
        root,
        "urls.py",
        r#"
from django.urls import include, path

urlpatterns = [path("api/", include("api.urls"))]
"#,
    );
    write(
        root,
        "api/urls.py",
        r#"
from django.urls import path

from . import views

urlpatterns = [path("tasks/", views.task_list)]
"#,
    );
    write(
        root,
        "api/views.py",
        r#"
from rest_framework.decorators import api_view


@api_view(["GET", "POST"])
def task_list(request):
    pass
"#,
    );

    let routes = walk(Box::new(DjangoExtractor), root, "urls.py", &[]);

    assert_eq!(
        operations(&routes),
        vec![
            row("/api/tasks/", "get", "task_list"),
            row("/api/tasks/", "post", "task_list_post"),
        ]
    );
}
