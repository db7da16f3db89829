use crate::catalog::ProjectCatalog;
use crate::extractor::models::{FieldInfo, ModelInfo};
use crate::extractor::RouteInfo;
use crate::naming::model_name_to_endpoint;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static VERSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^v\d+").unwrap());

/// Schema generator - converts Django models to OpenAPI schemas
pub struct SchemaGenerator<'a> {
    catalog: &'a ProjectCatalog,
}

/// OpenAPI Schema definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// The type of the schema (string, integer, object, array, etc.)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    /// Properties for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, Schema>>,
    /// Required field names for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Enum values for fields with choices
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    /// Reference to another schema
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Format for primitive types (e.g. "date-time", "email")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Schema {
    pub fn typed(schema_type: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            ..Self::default()
        }
    }

    /// `{"$ref": "#/components/schemas/<name>"}`
    pub fn reference(name: &str) -> Self {
        Self {
            reference: Some(format!("#/components/schemas/{}", name)),
            ..Self::default()
        }
    }

    pub fn array_of(items: Schema) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::typed("array")
        }
    }
}

impl<'a> SchemaGenerator<'a> {
    pub fn new(catalog: &'a ProjectCatalog) -> Self {
        debug!(
            "Initializing SchemaGenerator with {} models",
            catalog.models.len()
        );
        Self { catalog }
    }

    pub fn catalog(&self) -> &'a ProjectCatalog {
        self.catalog
    }

    /// Component schemas for every known model, keyed by model name.
    pub fn schemas(&self) -> BTreeMap<String, Schema> {
        self.catalog
            .models
            .values()
            .map(|model| (model.name.clone(), self.model_schema(model)))
            .collect()
    }

    /// Object schema of a model.
    ///
    /// Relationship fields whose target is a known model become references (arrays of
    /// references for many-to-many); everything else uses the field type mapping.
    pub fn model_schema(&self, model: &ModelInfo) -> Schema {
        let mut properties = BTreeMap::new();
        let mut required = Vec::new();

        for field in &model.fields {
            properties.insert(field.name.clone(), self.field_schema(field));
            if field.is_required() {
                required.push(field.name.clone());
            }
        }

        Schema {
            properties: Some(properties),
            required: (!required.is_empty()).then_some(required),
            description: model.description.clone(),
            ..Schema::typed("object")
        }
    }

    fn field_schema(&self, field: &FieldInfo) -> Schema {
        if let Some(related) = field
            .related_model
            .as_deref()
            .filter(|name| self.catalog.models.contains_key(*name))
        {
            return if field.kind == "ManyToManyField" {
                Schema::array_of(Schema::reference(related))
            } else {
                Schema::reference(related)
            };
        }

        let mut schema = Schema::typed(field.openapi_type);
        schema.format = field.format.map(str::to_string);
        schema.max_length = field.max_length;
        schema.nullable = field.nullable.then_some(true);
        schema.description = field.help_text.clone();
        if !field.choices.is_empty() {
            schema.enum_values = Some(field.choices.clone());
        }
        if field.openapi_type == "array" {
            schema.items = Some(Box::new(Schema::typed("integer")));
        }
        schema
    }

    /// Guesses which model a route operates on.
    ///
    /// Tried in order: a path segment naming a model (ignoring version segments and a
    /// plural `s`), the view name minus `ViewSet`/`View`, and the `queryset` model of a
    /// known ViewSet.
    pub fn infer_model(&self, route: &RouteInfo, openapi_path: &str) -> Option<&'a str> {
        let catalog: &'a ProjectCatalog = self.catalog;
        let models = &catalog.models;
        let find = |candidate: &str| {
            models
                .keys()
                .find(|name| name.eq_ignore_ascii_case(candidate))
                .map(String::as_str)
        };

        for segment in openapi_path.split('/') {
            if segment.is_empty() || segment.starts_with('{') {
                continue;
            }
            let segment = VERSION_RE.replace(segment, "");
            if let Some(model) = find(segment.trim_end_matches('s')) {
                return Some(model);
            }
            if let Some(model) = models
                .keys()
                .find(|name| model_name_to_endpoint(name) == segment)
            {
                return Some(model.as_str());
            }
        }

        let handler = route.handler.as_deref()?;
        let stripped = handler.replace("ViewSet", "").replace("View", "");
        if let Some(model) = find(&stripped) {
            return Some(model);
        }

        catalog
            .viewsets
            .get(handler)
            .and_then(|viewset| catalog.viewset_model(viewset))
    }
}
