use crate::extractor::{HttpMethod, RouteInfo};
use crate::naming::{generate_operation_id, model_name_to_endpoint};
use crate::path_translator::{translate_path, PathParameter};
use crate::schema_generator::{Schema, SchemaGenerator};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

pub const OPENAPI_VERSION: &str = "3.0.2";
const SUCCESS_DESCRIPTION: &str = "Successful response";
const JSON: &str = "application/json";

/// OpenAPI document builder
pub struct OpenApiBuilder {
    /// OpenAPI info section
    info: Info,
    servers: Vec<Server>,
    /// Paths collection (URL path -> PathItem), sorted for stable output
    paths: BTreeMap<String, PathItem>,
    /// Operation ids handed out so far
    operation_ids: HashSet<String>,
    duplicates: usize,
}

/// OpenAPI Info object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Info {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI Server object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    pub description: String,
}

/// OpenAPI PathItem object - represents all operations for a single path
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
}

impl PathItem {
    /// The operation slot for `method`.
    pub fn operation_mut(&mut self, method: HttpMethod) -> &mut Option<Operation> {
        match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Patch => &mut self.patch,
            HttpMethod::Options => &mut self.options,
            HttpMethod::Head => &mut self.head,
        }
    }

    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
        }
    }

    /// Operations in path-item key order.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        [
            &self.get,
            &self.post,
            &self.put,
            &self.delete,
            &self.patch,
            &self.options,
            &self.head,
        ]
        .into_iter()
        .flatten()
    }
}

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(rename = "operationId")]
    pub operation_id: String,
    pub description: String,
    /// Path parameters, omitted when there are none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<PathParameter>>,
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: BTreeMap<String, Response>,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestBody {
    pub required: bool,
    pub content: BTreeMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaType {
    pub schema: Schema,
}

/// OpenAPI Response object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<BTreeMap<String, MediaType>>,
}

/// OpenAPI Components object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Components {
    pub schemas: BTreeMap<String, Schema>,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenApiDocument {
    pub openapi: String,
    pub info: Info,
    pub servers: Vec<Server>,
    pub paths: BTreeMap<String, PathItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
}

impl OpenApiDocument {
    /// Total number of operations across all paths.
    pub fn operation_count(&self) -> usize {
        self.paths.values().map(|item| item.operations().count()).sum()
    }
}

fn json_content(schema: Schema) -> BTreeMap<String, MediaType> {
    BTreeMap::from([(JSON.to_string(), MediaType { schema })])
}

impl OpenApiBuilder {
    /// Create a new OpenApiBuilder with default info and base path `/`
    pub fn new() -> Self {
        debug!("Initializing OpenApiBuilder");
        Self {
            info: Info {
                title: "API".to_string(),
                version: "1.0.0".to_string(),
                description: None,
            },
            servers: vec![Server {
                url: "/".to_string(),
                description: "API with base path".to_string(),
            }],
            paths: BTreeMap::new(),
            operation_ids: HashSet::new(),
            duplicates: 0,
        }
    }

    /// Set custom info for the API
    pub fn with_info(mut self, title: String, version: String, description: Option<String>) -> Self {
        self.info = Info {
            title,
            version,
            description,
        };
        self
    }

    /// Sets the single `servers` entry.
    pub fn with_base_path(mut self, base_path: &str) -> Self {
        self.servers = vec![Server {
            url: base_path.to_string(),
            description: "API with base path".to_string(),
        }];
        self
    }

    /// Number of routes dropped because their path and method were already present.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Adds a route, translating its path to OpenAPI syntax.
    ///
    /// The first route for a given path and method wins; later ones are dropped and
    /// `false` is returned. With a schema generator, routes whose model can be inferred
    /// get JSON request and response bodies.
    pub fn add_route(&mut self, route: &RouteInfo, schema_gen: Option<&SchemaGenerator>) -> bool {
        let (openapi_path, parameters) = translate_path(&route.path);
        let model = schema_gen.and_then(|generator| generator.infer_model(route, &openapi_path));
        self.add_operation(route, openapi_path, parameters, model, None)
    }

    fn add_operation(
        &mut self,
        route: &RouteInfo,
        openapi_path: String,
        parameters: Vec<PathParameter>,
        model: Option<&str>,
        summary: Option<String>,
    ) -> bool {
        let exists = self
            .paths
            .get(&openapi_path)
            .is_some_and(|item| item.operation(route.method).is_some());
        if exists {
            debug!(
                "Dropping duplicate {} {} ({})",
                route.method, openapi_path, route.operation_id
            );
            self.duplicates += 1;
            return false;
        }

        debug!("Adding route: {} {}", route.method, openapi_path);
        let operation_id = self.unique_operation_id(route, &openapi_path);

        let mut response = Response {
            description: SUCCESS_DESCRIPTION.to_string(),
            content: None,
        };
        let mut request_body = None;

        if let Some(model) = model {
            let method = route.method;
            if matches!(method, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch) {
                request_body = Some(RequestBody {
                    required: true,
                    content: json_content(Schema::reference(model)),
                });
            }
            if matches!(
                method,
                HttpMethod::Get | HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch
            ) {
                let single = parameters.iter().any(|p| p.name == "id" || p.name == "pk");
                let schema = if method == HttpMethod::Get && !single {
                    Schema::array_of(Schema::reference(model))
                } else {
                    Schema::reference(model)
                };
                response.content = Some(json_content(schema));
            }
        }

        let operation = Operation {
            summary,
            operation_id,
            description: route.description.clone(),
            parameters: (!parameters.is_empty()).then_some(parameters),
            request_body,
            responses: BTreeMap::from([("200".to_string(), response)]),
        };

        *self
            .paths
            .entry(openapi_path)
            .or_default()
            .operation_mut(route.method) = Some(operation);
        true
    }

    /// The route's own id if free, else a generated descriptive id, else a numbered one.
    fn unique_operation_id(&mut self, route: &RouteInfo, openapi_path: &str) -> String {
        let mut candidate = route.operation_id.clone();
        if self.operation_ids.contains(&candidate) {
            candidate =
                generate_operation_id(route.method.as_str(), openapi_path, route.handler.as_deref());
        }
        if self.operation_ids.contains(&candidate) {
            let base = candidate.clone();
            let mut n = 2;
            while self.operation_ids.contains(&candidate) {
                candidate = format!("{}_{}", base, n);
                n += 1;
            }
        }
        self.operation_ids.insert(candidate.clone());
        candidate
    }

    /// Adds CRUD operations under `/api/<endpoint>/` for every catalogued ViewSet whose
    /// model is known and whose endpoint has no path yet.
    pub fn add_synthetic_endpoints(&mut self, schema_gen: &SchemaGenerator) {
        let catalog = schema_gen.catalog();
        let mut viewsets: Vec<_> = catalog.viewsets.values().collect();
        viewsets.sort_by(|a, b| a.name.cmp(&b.name));

        for viewset in viewsets {
            let Some(model) = catalog.viewset_model(viewset) else {
                continue;
            };
            let endpoint = model_name_to_endpoint(model);
            let base = format!("/api/{}", endpoint);
            if self.paths.keys().any(|path| path.starts_with(&base)) {
                continue;
            }
            debug!("Adding synthetic endpoints for {} at {}/", model, base);

            let lower = model.to_lowercase();
            let collection = format!("{}/", base);
            let detail = format!("{}/{{id}}/", base);
            let operations = [
                (HttpMethod::Get, &collection, format!("list_{}s", lower), format!("List {} objects", model)),
                (HttpMethod::Post, &collection, format!("create_{}", lower), format!("Create {} object", model)),
                (HttpMethod::Get, &detail, format!("get_{}", lower), format!("Retrieve {} object", model)),
                (HttpMethod::Put, &detail, format!("update_{}", lower), format!("Update {} object", model)),
                (HttpMethod::Delete, &detail, format!("delete_{}", lower), format!("Delete {} object", model)),
            ];

            for (method, path, operation_id, summary) in operations {
                let route = RouteInfo::new(path.as_str(), method, operation_id, summary.clone())
                    .with_handler(Some(viewset.name.clone()));
                let (openapi_path, parameters) = translate_path(path);
                self.add_operation(&route, openapi_path, parameters, Some(model), Some(summary));
            }
        }
    }

    /// Build the final OpenAPI document
    pub fn build(self, schema_gen: Option<&SchemaGenerator>) -> OpenApiDocument {
        debug!("Building final OpenAPI document");

        let components = schema_gen
            .map(|generator| generator.schemas())
            .filter(|schemas| !schemas.is_empty())
            .map(|schemas| Components { schemas });

        OpenApiDocument {
            openapi: OPENAPI_VERSION.to_string(),
            info: self.info,
            servers: self.servers,
            paths: self.paths,
            components,
        }
    }
}

impl Default for OpenApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}
