//! Django data-model analysis.
//!
//! Only classes deriving from `Model`/`models.Model` are considered, and only fields
//! declared as `name = models.SomeField(...)` in the class body.

use crate::syntax::{bool_literal, docstring, keyword, name_id, simple_name, string_literal};
use rustpython_parser::ast;
use std::collections::HashMap;

const RELATIONSHIP_FIELDS: [&str; 3] = ["ForeignKey", "OneToOneField", "ManyToManyField"];

/// OpenAPI type for a Django field class.
pub fn field_type(kind: &str) -> &'static str {
    match kind {
        "BooleanField" | "NullBooleanField" => "boolean",
        "IntegerField" | "BigIntegerField" | "SmallIntegerField" | "PositiveIntegerField"
        | "PositiveSmallIntegerField" | "PositiveBigIntegerField" | "AutoField"
        | "BigAutoField" | "SmallAutoField" | "ForeignKey" | "OneToOneField" => "integer",
        "FloatField" | "DecimalField" => "number",
        "JSONField" => "object",
        "ManyToManyField" => "array",
        _ => "string",
    }
}

/// OpenAPI format for a Django field class, if it has one.
pub fn field_format(kind: &str) -> Option<&'static str> {
    match kind {
        "DateField" => Some("date"),
        "DateTimeField" => Some("date-time"),
        "EmailField" => Some("email"),
        "URLField" => Some("uri"),
        "UUIDField" => Some("uuid"),
        "TimeField" => Some("time"),
        "DecimalField" => Some("decimal"),
        "IPAddressField" | "GenericIPAddressField" => Some("ipv4"),
        _ => None,
    }
}

/// A single model field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: String,
    /// Django field class, e.g. `CharField`
    pub kind: String,
    pub openapi_type: &'static str,
    pub format: Option<&'static str>,
    pub related_model: Option<String>,
    pub max_length: Option<u64>,
    pub nullable: bool,
    pub blank: bool,
    /// Stored values of `choices=`
    pub choices: Vec<String>,
    pub help_text: Option<String>,
}

impl FieldInfo {
    pub fn is_relationship(&self) -> bool {
        RELATIONSHIP_FIELDS.contains(&self.kind.as_str())
    }

    /// Whether a client must supply this field.
    pub fn is_required(&self) -> bool {
        !self.nullable && !self.blank && self.name != "id"
    }
}

/// A Django model class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: String,
    /// Fields in declaration order
    pub fields: Vec<FieldInfo>,
    pub description: Option<String>,
}

impl ModelInfo {
    /// Analyses a class definition, returning `None` unless it derives from `Model`.
    pub fn from_class(class_def: &ast::StmtClassDef) -> Option<Self> {
        let is_model = class_def
            .bases
            .iter()
            .any(|base| simple_name(base) == Some("Model"));
        if !is_model {
            return None;
        }

        let name = class_def.name.to_string();
        let mut literals: HashMap<&str, &ast::Expr> = HashMap::new();
        let mut fields = Vec::new();

        for stmt in &class_def.body {
            let ast::Stmt::Assign(assign) = stmt else {
                continue;
            };
            let Some(target) = assign.targets.first().and_then(name_id) else {
                continue;
            };

            match assign.value.as_ref() {
                ast::Expr::Call(call) => {
                    if let Some(field) = parse_field(target, call, &name, &literals) {
                        fields.push(field);
                    }
                }
                value => {
                    literals.insert(target, value);
                }
            }
        }

        Some(ModelInfo {
            name,
            fields,
            description: docstring(&class_def.body),
        })
    }

    /// Relationship fields of this model.
    pub fn relationships(&self) -> impl Iterator<Item = &FieldInfo> {
        self.fields.iter().filter(|f| f.is_relationship())
    }
}

fn parse_field(
    name: &str,
    call: &ast::ExprCall,
    model_name: &str,
    literals: &HashMap<&str, &ast::Expr>,
) -> Option<FieldInfo> {
    let kind = simple_name(&call.func)?;
    if !kind.ends_with("Field") && !RELATIONSHIP_FIELDS.contains(&kind) {
        return None;
    }

    let related_model = if RELATIONSHIP_FIELDS.contains(&kind) {
        call.args
            .first()
            .or_else(|| keyword(call, "to"))
            .and_then(|target| related_model(target, model_name))
    } else {
        None
    };

    let choices = keyword(call, "choices")
        .map(|expr| match expr {
            ast::Expr::Name(n) => literals
                .get(n.id.as_str())
                .map(|value| choice_values(value))
                .unwrap_or_default(),
            other => choice_values(other),
        })
        .unwrap_or_default();

    Some(FieldInfo {
        name: name.to_string(),
        kind: kind.to_string(),
        openapi_type: field_type(kind),
        format: field_format(kind),
        related_model,
        max_length: keyword(call, "max_length").and_then(int_literal),
        nullable: keyword(call, "null").and_then(bool_literal).unwrap_or(false),
        blank: keyword(call, "blank").and_then(bool_literal).unwrap_or(false),
        choices,
        help_text: keyword(call, "help_text")
            .and_then(string_literal)
            .map(str::to_string),
    })
}

/// `Author`, `"Author"`, `"library.Author"` and `"self"` all name a model.
fn related_model(expr: &ast::Expr, model_name: &str) -> Option<String> {
    if let Some(text) = string_literal(expr) {
        if text == "self" {
            return Some(model_name.to_string());
        }
        return text.rsplit('.').next().map(str::to_string);
    }
    simple_name(expr).map(str::to_string)
}

/// Stored values of a `[(value, label), ...]` literal.
fn choice_values(expr: &ast::Expr) -> Vec<String> {
    let elts = match expr {
        ast::Expr::List(list) => &list.elts,
        ast::Expr::Tuple(tuple) => &tuple.elts,
        _ => return Vec::new(),
    };
    elts.iter()
        .filter_map(|pair| match pair {
            ast::Expr::Tuple(tuple) => tuple.elts.first().and_then(string_literal),
            ast::Expr::List(list) => list.elts.first().and_then(string_literal),
            _ => None,
        })
        .map(str::to_string)
        .collect()
}

fn int_literal(expr: &ast::Expr) -> Option<u64> {
    match expr {
        ast::Expr::Constant(constant) => match &constant.value {
            ast::Constant::Int(value) => value.to_string().parse().ok(),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::AstParser;
    use std::path::Path;

    fn models(code: &str) -> Vec<ModelInfo> {
        let parsed = AstParser::parse_source(code, Path::new("models.py")).unwrap();
        parsed
            .body
            .iter()
            .filter_map(|stmt| match stmt {
                ast::Stmt::ClassDef(class_def) => ModelInfo::from_class(class_def),
                _ => None,
            })
            .collect()
    }

    const TASK_MODELS: &str = r#"
from django.db import models


class Project(models.Model):
    name = models.CharField(max_length=200)


class Task(models.Model):
    """A unit of work."""

    STATUS_CHOICES = [
        ("todo", "To do"),
        ("done", "Done"),
    ]

    title = models.CharField(max_length=100, help_text="Short title")
    notes = models.TextField(blank=True)
    status = models.CharField(max_length=10, choices=STATUS_CHOICES)
    due = models.DateTimeField(null=True)
    project = models.ForeignKey(Project, on_delete=models.CASCADE)
    parent = models.ForeignKey("self", null=True, on_delete=models.SET_NULL)
    tags = models.ManyToManyField("labels.Tag")
    objects = TaskManager()

    def __str__(self):
        return self.title


class TaskSerializer(serializers.ModelSerializer):
    pass
"#;

    #[test]
    fn test_only_model_classes_are_collected() {
        let found = models(TASK_MODELS);
        let names: Vec<_> = found.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Project", "Task"]);
    }

    #[test]
    fn test_field_details() {
        let task = models(TASK_MODELS).remove(1);
        assert_eq!(task.description.as_deref(), Some("A unit of work."));

        let names: Vec<_> = task.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["title", "notes", "status", "due", "project", "parent", "tags"]
        );

        let title = &task.fields[0];
        assert_eq!(title.openapi_type, "string");
        assert_eq!(title.max_length, Some(100));
        assert_eq!(title.help_text.as_deref(), Some("Short title"));
        assert!(title.is_required());

        assert!(!task.fields[1].is_required());
        assert_eq!(task.fields[2].choices, vec!["todo", "done"]);

        let due = &task.fields[3];
        assert_eq!(due.format, Some("date-time"));
        assert!(due.nullable);
    }

    #[test]
    fn test_relationships() {
        let task = models(TASK_MODELS).remove(1);
        let related: Vec<_> = task
            .relationships()
            .map(|f| (f.name.as_str(), f.related_model.as_deref(), f.openapi_type))
            .collect();

        assert_eq!(
            related,
            vec![
                ("project", Some("Project"), "integer"),
                ("parent", Some("Task"), "integer"),
                ("tags", Some("Tag"), "array"),
            ]
        );
    }

    #[test]
    fn test_type_and_format_maps() {
        assert_eq!(field_type("BooleanField"), "boolean");
        assert_eq!(field_type("PositiveIntegerField"), "integer");
        assert_eq!(field_type("DecimalField"), "number");
        assert_eq!(field_type("JSONField"), "object");
        assert_eq!(field_type("SomethingCustomField"), "string");
        assert_eq!(field_format("URLField"), Some("uri"));
        assert_eq!(field_format("GenericIPAddressField"), Some("ipv4"));
        assert_eq!(field_format("CharField"), None);
    }
}
