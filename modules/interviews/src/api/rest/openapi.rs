//! OpenAPI document assembled from the operations registered in `routes`.
//!
//! Schemas come from `utoipa::ToSchema`; paths are described with a small
//! builder so the route table and its documentation stay side by side.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};
use utoipa::openapi::{schema::Schema, RefOr};
use utoipa::{PartialSchema, ToSchema};

use crate::api::rest::error::{Problem, APPLICATION_PROBLEM_JSON};

type SchemaCollection = Vec<(String, RefOr<Schema>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamLocation {
    Path,
    Query,
}

#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub location: ParamLocation,
    pub required: bool,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct BodySpec {
    pub content_type: &'static str,
    pub schema_name: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct ResponseSpec {
    pub status: u16,
    pub content_type: Option<&'static str>,
    pub schema_name: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct OperationSpec {
    pub method: &'static str,
    pub path: String,
    pub operation_id: String,
    pub summary: String,
    pub tag: String,
    pub params: Vec<ParamSpec>,
    pub request_body: Option<BodySpec>,
    pub responses: Vec<ResponseSpec>,
}

/// Registry of operations and component schemas.
#[derive(Default)]
pub struct ApiCatalog {
    operations: Vec<OperationSpec>,
    schemas: BTreeMap<String, RefOr<Schema>>,
}

impl ApiCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` and everything it references; returns the component name.
    pub fn ensure_schema<T: ToSchema + PartialSchema + 'static>(&mut self) -> String {
        let root_name = T::name().to_string();
        let mut collected: SchemaCollection =
            vec![(root_name.clone(), <T as PartialSchema>::schema())];
        T::schemas(&mut collected);
        for (name, schema) in collected {
            self.schemas.entry(name).or_insert(schema);
        }
        root_name
    }

    pub fn operation(&mut self, method: &'static str, path: &str) -> OperationDraft<'_> {
        OperationDraft {
            spec: OperationSpec {
                method,
                path: path.to_string(),
                operation_id: format!(
                    "{}:{}",
                    method.to_lowercase(),
                    path.replace(['/', '{', '}'], "_")
                ),
                summary: String::new(),
                tag: "interviews".to_string(),
                params: Vec::new(),
                request_body: None,
                responses: Vec::new(),
            },
            catalog: self,
        }
    }

    pub fn operations(&self) -> &[OperationSpec] {
        &self.operations
    }

    /// Render the OpenAPI 3.1 document.
    pub fn build_openapi(&self, title: &str, version: &str) -> Value {
        let mut paths: BTreeMap<String, Map<String, Value>> = BTreeMap::new();
        for spec in &self.operations {
            let mut op = Map::new();
            op.insert("operationId".into(), json!(spec.operation_id));
            if !spec.summary.is_empty() {
                op.insert("summary".into(), json!(spec.summary));
            }
            op.insert("tags".into(), json!([spec.tag]));

            if !spec.params.is_empty() {
                let params: Vec<Value> = spec
                    .params
                    .iter()
                    .map(|p| {
                        json!({
                            "name": p.name,
                            "in": match p.location {
                                ParamLocation::Path => "path",
                                ParamLocation::Query => "query",
                            },
                            // path params are always required in OpenAPI
                            "required": p.required || p.location == ParamLocation::Path,
                            "description": p.description,
                            "schema": { "type": "string" },
                        })
                    })
                    .collect();
                op.insert("parameters".into(), Value::Array(params));
            }

            if let Some(body) = &spec.request_body {
                op.insert(
                    "requestBody".into(),
                    json!({
                        "description": body.description,
                        "required": true,
                        "content": self.content(body.content_type, body.schema_name.as_deref()),
                    }),
                );
            }

            let mut responses = Map::new();
            for r in &spec.responses {
                let mut obj = Map::new();
                obj.insert("description".into(), json!(r.description));
                if let Some(ct) = r.content_type {
                    obj.insert("content".into(), self.content(ct, r.schema_name.as_deref()));
                }
                responses.insert(r.status.to_string(), Value::Object(obj));
            }
            op.insert("responses".into(), Value::Object(responses));

            paths
                .entry(spec.path.clone())
                .or_default()
                .insert(spec.method.to_lowercase(), Value::Object(op));
        }

        let schemas: Map<String, Value> = self
            .schemas
            .iter()
            .map(|(name, schema)| {
                (
                    name.clone(),
                    serde_json::to_value(schema).unwrap_or_else(|_| json!({})),
                )
            })
            .collect();

        json!({
            "openapi": "3.1.0",
            "info": { "title": title, "version": version },
            "paths": paths,
            "components": { "schemas": schemas },
        })
    }

    fn content(&self, content_type: &str, schema_name: Option<&str>) -> Value {
        let schema = match schema_name {
            Some(name) if self.schemas.contains_key(name) => {
                json!({ "$ref": format!("#/components/schemas/{name}") })
            }
            _ => match content_type {
                "application/json" => json!({ "type": "object" }),
                "text/event-stream" => json!({ "type": "string" }),
                _ => json!({ "type": "string", "format": "binary" }),
            },
        };
        json!({ content_type: { "schema": schema } })
    }
}

/// Builder for a single operation; `register` stores it in the catalog.
pub struct OperationDraft<'a> {
    spec: OperationSpec,
    catalog: &'a mut ApiCatalog,
}

impl OperationDraft<'_> {
    pub fn operation_id(mut self, id: &str) -> Self {
        self.spec.operation_id = id.to_string();
        self
    }

    pub fn summary(mut self, summary: &str) -> Self {
        self.spec.summary = summary.to_string();
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.spec.tag = tag.to_string();
        self
    }

    pub fn path_param(mut self, name: &str, description: &str) -> Self {
        self.spec.params.push(ParamSpec {
            name: name.to_string(),
            location: ParamLocation::Path,
            required: true,
            description: description.to_string(),
        });
        self
    }

    pub fn query_param(mut self, name: &str, description: &str) -> Self {
        self.spec.params.push(ParamSpec {
            name: name.to_string(),
            location: ParamLocation::Query,
            required: false,
            description: description.to_string(),
        });
        self
    }

    pub fn json_request<T: ToSchema + PartialSchema + 'static>(mut self, description: &str) -> Self {
        let name = self.catalog.ensure_schema::<T>();
        self.spec.request_body = Some(BodySpec {
            content_type: "application/json",
            schema_name: Some(name),
            description: description.to_string(),
        });
        self
    }

    pub fn binary_request(mut self, content_type: &'static str, description: &str) -> Self {
        self.spec.request_body = Some(BodySpec {
            content_type,
            schema_name: None,
            description: description.to_string(),
        });
        self
    }

    pub fn json_response<T: ToSchema + PartialSchema + 'static>(
        mut self,
        status: u16,
        description: &str,
    ) -> Self {
        let name = self.catalog.ensure_schema::<T>();
        self.spec.responses.push(ResponseSpec {
            status,
            content_type: Some("application/json"),
            schema_name: Some(name),
            description: description.to_string(),
        });
        self
    }

    pub fn empty_response(mut self, status: u16, description: &str) -> Self {
        self.spec.responses.push(ResponseSpec {
            status,
            content_type: None,
            schema_name: None,
            description: description.to_string(),
        });
        self
    }

    pub fn sse_json<T: ToSchema + PartialSchema + 'static>(mut self, description: &str) -> Self {
        let name = self.catalog.ensure_schema::<T>();
        self.spec.responses.push(ResponseSpec {
            status: 200,
            content_type: Some("text/event-stream"),
            schema_name: Some(name),
            description: description.to_string(),
        });
        self
    }

    pub fn problem_response(mut self, status: u16, description: &str) -> Self {
        let name = self.catalog.ensure_schema::<Problem>();
        self.spec.responses.push(ResponseSpec {
            status,
            content_type: Some(APPLICATION_PROBLEM_JSON),
            schema_name: Some(name),
            description: description.to_string(),
        });
        self
    }

    pub fn register(self) {
        self.catalog.operations.push(self.spec);
    }
}
