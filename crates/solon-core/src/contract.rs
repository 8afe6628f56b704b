//! Contract types and loading.
//!
//! A contract is the declared API surface of a service: a set of
//! [`Operation`]s, each identified by a stable id and carrying its method,
//! [`PathPattern`], parameter types, body schemas and authorization scopes.
//!
//! [`ContractRegistry`] compiles a contract document (JSON or TOML) into
//! immutable, shareable operations. Any structural problem in the document is
//! reported as [`SolonError::SchemaCompile`] and is fatal at startup.
//!
//! # Example
//!
//! ```
//! use solon_core::contract::ContractRegistry;
//!
//! let registry = ContractRegistry::from_json_str(r#"{
//!     "name": "users",
//!     "version": "1.0.0",
//!     "operations": [
//!         {
//!             "id": "getUser",
//!             "method": "GET",
//!             "path": "/users/{userId}",
//!             "parameters": [{"name": "userId", "in": "path", "type": "integer"}]
//!         }
//!     ]
//! }"#).unwrap();
//!
//! let op = registry.get("getUser").unwrap();
//! assert_eq!(op.path().as_str(), "/users/{userId}");
//! ```

use crate::error::{SolonError, SolonResult};
use crate::schema::{ParamType, Schema};
use http::Method;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

const PLACEHOLDER_NAME: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

/// Key for the response schema used when no status-specific schema exists.
pub const DEFAULT_RESPONSE: &str = "default";

/// One segment of a [`PathPattern`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Must equal the request segment exactly.
    Literal(String),
    /// Matches any single non-empty segment and binds it to the name.
    Param(String),
}

impl PathSegment {
    /// Returns `true` for placeholder segments.
    #[must_use]
    pub const fn is_param(&self) -> bool {
        matches!(self, Self::Param(_))
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(lit) => f.write_str(lit),
            Self::Param(name) => write!(f, "{{{name}}}"),
        }
    }
}

/// A parsed path pattern such as `/users/{userId}/orders`.
///
/// Patterns start with `/`, contain no empty segments, and use `{name}` as a
/// whole segment for placeholders. `/` alone is the root pattern with no
/// segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathPattern {
    segments: Vec<PathSegment>,
}

impl PathPattern {
    /// The root pattern `/`.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parses a pattern.
    ///
    /// ```
    /// use solon_core::contract::PathPattern;
    ///
    /// assert!(PathPattern::parse("/users/{userId}").is_ok());
    /// assert!(PathPattern::parse("/users/{}").is_err());
    /// assert!(PathPattern::parse("/users/").is_err());
    /// ```
    pub fn parse(raw: &str) -> SolonResult<Self> {
        let Some(rest) = raw.strip_prefix('/') else {
            return Err(SolonError::schema_compile(format!(
                "path pattern '{raw}' must start with '/'"
            )));
        };
        if rest.is_empty() {
            return Ok(Self::root());
        }

        let name_re = Regex::new(PLACEHOLDER_NAME)
            .map_err(|e| SolonError::schema_compile(e.to_string()))?;
        let mut segments = Vec::new();

        for segment in rest.split('/') {
            if segment.is_empty() {
                return Err(SolonError::schema_compile(format!(
                    "path pattern '{raw}' contains an empty segment"
                )));
            }

            if let Some(inner) = segment.strip_prefix('{') {
                let name = inner.strip_suffix('}').ok_or_else(|| {
                    SolonError::schema_compile(format!(
                        "unbalanced '{{' in segment '{segment}' of '{raw}'"
                    ))
                })?;
                if !name_re.is_match(name) {
                    return Err(SolonError::schema_compile(format!(
                        "invalid placeholder name '{name}' in '{raw}'"
                    )));
                }
                if segments
                    .iter()
                    .any(|s| matches!(s, PathSegment::Param(existing) if existing == name))
                {
                    return Err(SolonError::schema_compile(format!(
                        "placeholder '{name}' appears twice in '{raw}'"
                    )));
                }
                segments.push(PathSegment::Param(name.to_string()));
            } else if segment.contains(['{', '}']) {
                return Err(SolonError::schema_compile(format!(
                    "placeholder must span a whole segment: '{segment}' in '{raw}'"
                )));
            } else {
                segments.push(PathSegment::Literal(segment.to_string()));
            }
        }

        Ok(Self { segments })
    }

    /// Parses a router prefix. Trailing slashes are ignored and an empty prefix is the root.
    pub fn parse_prefix(raw: &str) -> SolonResult<Self> {
        let trimmed = raw.trim_end_matches('/');
        if trimmed.is_empty() {
            Ok(Self::root())
        } else {
            Self::parse(trimmed)
        }
    }

    /// Returns the parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns the placeholder names in order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            PathSegment::Param(name) => Some(name.as_str()),
            PathSegment::Literal(_) => None,
        })
    }

    /// Returns this pattern with `prefix` prepended.
    #[must_use]
    pub fn prefixed(&self, prefix: &Self) -> Self {
        let mut segments = prefix.segments.clone();
        segments.extend(self.segments.iter().cloned());
        Self { segments }
    }

    /// Returns the canonical text form, e.g. `/users/{userId}`.
    #[must_use]
    pub fn as_str(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

/// Where a parameter is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamLocation {
    /// A path placeholder.
    Path,
    /// A query string entry.
    Query,
}

impl ParamLocation {
    /// Prefix used in field-qualified error locations.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
        }
    }
}

/// A typed path or query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Where the parameter is carried.
    #[serde(rename = "in")]
    pub location: ParamLocation,
    /// Declared type.
    #[serde(rename = "type", default)]
    pub param_type: ParamType,
    /// Whether the parameter must be present. Path parameters always are.
    #[serde(default)]
    pub required: bool,
}

/// An operation defined in a contract.
///
/// Operations are immutable once compiled; routers share them behind `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    id: String,
    method: Method,
    path: PathPattern,
    summary: Option<String>,
    parameters: Vec<Parameter>,
    request: Option<Schema>,
    responses: IndexMap<String, Schema>,
    scopes: Vec<String>,
    tags: Vec<String>,
}

impl Operation {
    /// Creates a new operation builder.
    ///
    /// ```
    /// use solon_core::contract::Operation;
    /// use solon_core::schema::ParamType;
    /// use http::Method;
    ///
    /// let op = Operation::builder("getUser")
    ///     .method(Method::GET)
    ///     .path("/users/{userId}")
    ///     .path_param("userId", ParamType::Integer)
    ///     .scope("users:read")
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(op.id(), "getUser");
    /// ```
    #[must_use]
    pub fn builder(id: impl Into<String>) -> OperationBuilder {
        OperationBuilder::new(id)
    }

    /// Returns the operation ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the path pattern.
    #[must_use]
    pub const fn path(&self) -> &PathPattern {
        &self.path
    }

    /// Returns the summary, if any.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Returns the declared parameters.
    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Returns the declared type of a path placeholder, defaulting to string.
    #[must_use]
    pub fn path_param_type(&self, name: &str) -> ParamType {
        self.parameters
            .iter()
            .find(|p| p.location == ParamLocation::Path && p.name == name)
            .map_or(ParamType::String, |p| p.param_type)
    }

    /// Returns the declared query parameters.
    pub fn query_params(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters
            .iter()
            .filter(|p| p.location == ParamLocation::Query)
    }

    /// Returns the request body schema, if any.
    #[must_use]
    pub const fn request_schema(&self) -> Option<&Schema> {
        self.request.as_ref()
    }

    /// Returns the response schema for `status`, falling back to `default`.
    #[must_use]
    pub fn response_schema(&self, status: u16) -> Option<&Schema> {
        self.responses
            .get(status.to_string().as_str())
            .or_else(|| self.responses.get(DEFAULT_RESPONSE))
    }

    /// Returns all response schemas keyed by status or `default`.
    #[must_use]
    pub const fn responses(&self) -> &IndexMap<String, Schema> {
        &self.responses
    }

    /// Returns the authorization scopes the caller must hold.
    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Returns `true` if the operation declares any required scope.
    #[must_use]
    pub fn requires_identity(&self) -> bool {
        !self.scopes.is_empty()
    }

    /// Returns the operation tags.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Returns a copy mounted under `prefix` and carrying the extra `tags`.
    #[must_use]
    pub fn mounted(&self, prefix: &PathPattern, tags: &[String]) -> Self {
        let mut op = self.clone();
        op.path = self.path.prefixed(prefix);
        for tag in tags {
            if !op.tags.contains(tag) {
                op.tags.push(tag.clone());
            }
        }
        op
    }

    fn validate(&self) -> SolonResult<()> {
        for param in self.parameters.iter().filter(|p| p.location == ParamLocation::Path) {
            if !self.path.param_names().any(|name| name == param.name) {
                return Err(SolonError::schema_compile(format!(
                    "operation '{}': path parameter '{}' has no placeholder in '{}'",
                    self.id, param.name, self.path
                )));
            }
        }

        let mut seen = Vec::new();
        for param in &self.parameters {
            let key = (param.location, param.name.as_str());
            if seen.contains(&key) {
                return Err(SolonError::schema_compile(format!(
                    "operation '{}': parameter '{}' declared twice",
                    self.id, param.name
                )));
            }
            seen.push(key);
        }

        if let Some(schema) = &self.request {
            schema
                .check("request")
                .map_err(|e| SolonError::schema_compile(format!("operation '{}': {e}", self.id)))?;
        }

        for (key, schema) in &self.responses {
            let valid_key = key == DEFAULT_RESPONSE
                || key
                    .parse::<u16>()
                    .is_ok_and(|status| (100..=599).contains(&status));
            if !valid_key {
                return Err(SolonError::schema_compile(format!(
                    "operation '{}': invalid response key '{key}'",
                    self.id
                )));
            }
            schema.check(&format!("responses.{key}")).map_err(|e| {
                SolonError::schema_compile(format!("operation '{}': {e}", self.id))
            })?;
        }

        Ok(())
    }
}

/// Builder for creating [`Operation`] instances.
#[derive(Debug)]
pub struct OperationBuilder {
    id: String,
    method: Method,
    path: String,
    summary: Option<String>,
    parameters: Vec<Parameter>,
    request: Option<Schema>,
    responses: IndexMap<String, Schema>,
    scopes: Vec<String>,
    tags: Vec<String>,
}

impl OperationBuilder {
    /// Creates a new operation builder for `GET /`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            method: Method::GET,
            path: "/".to_string(),
            summary: None,
            parameters: Vec::new(),
            request: None,
            responses: IndexMap::new(),
            scopes: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the path pattern.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the summary.
    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Declares the type of a path placeholder.
    #[must_use]
    pub fn path_param(mut self, name: impl Into<String>, param_type: ParamType) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            location: ParamLocation::Path,
            param_type,
            required: true,
        });
        self
    }

    /// Declares a query parameter.
    #[must_use]
    pub fn query_param(
        mut self,
        name: impl Into<String>,
        param_type: ParamType,
        required: bool,
    ) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            location: ParamLocation::Query,
            param_type,
            required,
        });
        self
    }

    /// Sets the request body schema.
    #[must_use]
    pub fn request(mut self, schema: Schema) -> Self {
        self.request = Some(schema);
        self
    }

    /// Sets the response schema for a status code.
    #[must_use]
    pub fn response(mut self, status: u16, schema: Schema) -> Self {
        self.responses.insert(status.to_string(), schema);
        self
    }

    /// Sets the fallback response schema.
    #[must_use]
    pub fn default_response(mut self, schema: Schema) -> Self {
        self.responses.insert(DEFAULT_RESPONSE.to_string(), schema);
        self
    }

    /// Adds a required authorization scope.
    #[must_use]
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.push(scope.into());
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    /// Builds and checks the operation.
    pub fn build(self) -> SolonResult<Operation> {
        let path = PathPattern::parse(&self.path).map_err(|e| match e {
            SolonError::SchemaCompile { message } => {
                SolonError::schema_compile(format!("operation '{}': {message}", self.id))
            }
            other => other,
        })?;

        let mut parameters = self.parameters;
        for param in &mut parameters {
            if param.location == ParamLocation::Path {
                param.required = true;
            }
        }

        let operation = Operation {
            id: self.id,
            method: self.method,
            path,
            summary: self.summary,
            parameters,
            request: self.request,
            responses: self.responses,
            scopes: self.scopes,
            tags: self.tags,
        };
        operation.validate()?;
        Ok(operation)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ContractDocument {
    name: String,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    operations: Vec<OperationDocument>,
}

fn default_version() -> String {
    "0.0.0".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OperationDocument {
    id: String,
    method: String,
    path: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    parameters: Vec<Parameter>,
    #[serde(default)]
    request: Option<Schema>,
    #[serde(default)]
    responses: IndexMap<String, Schema>,
    #[serde(default)]
    scopes: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
}

impl OperationDocument {
    fn compile(self) -> SolonResult<Operation> {
        let method = parse_method(&self.method).ok_or_else(|| {
            SolonError::schema_compile(format!(
                "operation '{}': unsupported method '{}'",
                self.id, self.method
            ))
        })?;

        let mut builder = Operation::builder(self.id).method(method).path(self.path);
        builder.summary = self.summary;
        builder.parameters = self.parameters;
        builder.request = self.request;
        builder.responses = self.responses;
        builder.scopes = self.scopes;
        for tag in self.tags {
            builder = builder.tag(tag);
        }
        builder.build()
    }
}

fn parse_method(raw: &str) -> Option<Method> {
    match raw.to_ascii_uppercase().as_str() {
        "GET" => Some(Method::GET),
        "POST" => Some(Method::POST),
        "PUT" => Some(Method::PUT),
        "PATCH" => Some(Method::PATCH),
        "DELETE" => Some(Method::DELETE),
        "HEAD" => Some(Method::HEAD),
        "OPTIONS" => Some(Method::OPTIONS),
        _ => None,
    }
}

/// Compiled, indexed operations of one contract.
#[derive(Debug, Clone, Default)]
pub struct ContractRegistry {
    name: String,
    version: String,
    operations: IndexMap<String, Arc<Operation>>,
}

impl ContractRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            operations: IndexMap::new(),
        }
    }

    /// Adds an operation, rejecting duplicate ids.
    pub fn insert(&mut self, operation: Operation) -> SolonResult<()> {
        if self.operations.contains_key(operation.id()) {
            return Err(SolonError::DuplicateOperationId {
                operation_id: operation.id().to_string(),
            });
        }
        debug!(operation_id = %operation.id(), method = %operation.method(), path = %operation.path(), "Registered contract operation");
        self.operations
            .insert(operation.id().to_string(), Arc::new(operation));
        Ok(())
    }

    /// Builds a registry from already constructed operations.
    pub fn from_operations(
        name: impl Into<String>,
        operations: impl IntoIterator<Item = Operation>,
    ) -> SolonResult<Self> {
        let mut registry = Self::new(name, default_version());
        for operation in operations {
            registry.insert(operation)?;
        }
        Ok(registry)
    }

    /// Compiles a JSON contract document.
    pub fn from_json_str(json: &str) -> SolonResult<Self> {
        let doc: ContractDocument = serde_json::from_str(json)
            .map_err(|e| SolonError::schema_compile(format!("invalid contract JSON: {e}")))?;
        Self::compile(doc)
    }

    /// Compiles a TOML contract document.
    pub fn from_toml_str(toml: &str) -> SolonResult<Self> {
        let doc: ContractDocument = toml::from_str(toml)
            .map_err(|e| SolonError::schema_compile(format!("invalid contract TOML: {e}")))?;
        Self::compile(doc)
    }

    /// Loads and compiles a contract file, choosing the format by extension.
    pub async fn from_file(path: impl AsRef<Path>) -> SolonResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            SolonError::schema_compile(format!(
                "failed to read contract {}: {e}",
                path.display()
            ))
        })?;

        let registry = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content)?,
            Some("toml") => Self::from_toml_str(&content)?,
            other => {
                return Err(SolonError::schema_compile(format!(
                    "unsupported contract format {:?} for {}",
                    other.unwrap_or(""),
                    path.display()
                )))
            }
        };

        info!(
            path = %path.display(),
            contract = %registry.name,
            version = %registry.version,
            operations = registry.len(),
            "Loaded contract"
        );
        Ok(registry)
    }

    fn compile(doc: ContractDocument) -> SolonResult<Self> {
        let mut registry = Self::new(doc.name, doc.version);
        for op in doc.operations {
            registry.insert(op.compile()?)?;
        }
        Ok(registry)
    }

    /// Returns the contract name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the contract version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Looks up an operation by id.
    #[must_use]
    pub fn get(&self, operation_id: &str) -> Option<&Arc<Operation>> {
        self.operations.get(operation_id)
    }

    /// Returns all operations in declaration order.
    pub fn operations(&self) -> impl Iterator<Item = &Arc<Operation>> {
        self.operations.values()
    }

    /// Returns the number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns `true` if the registry has no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const USERS_JSON: &str = r#"{
        "name": "users",
        "version": "1.2.0",
        "operations": [
            {
                "id": "getUser",
                "method": "get",
                "path": "/users/{userId}",
                "parameters": [
                    {"name": "userId", "in": "path", "type": "integer"},
                    {"name": "verbose", "in": "query", "type": "boolean"}
                ],
                "responses": {
                    "200": {"type": "object", "properties": {"id": {"type": "integer"}}, "required": ["id"]},
                    "default": {"type": "any"}
                },
                "scopes": ["users:read"],
                "tags": ["users"]
            },
            {
                "id": "createUser",
                "method": "POST",
                "path": "/users",
                "request": {
                    "type": "object",
                    "properties": {"name": {"type": "string"}},
                    "required": ["name"]
                }
            }
        ]
    }"#;

    #[test]
    fn test_parse_patterns() {
        let pattern = PathPattern::parse("/users/{userId}/orders").unwrap();
        assert_eq!(
            pattern.segments(),
            &[
                PathSegment::Literal("users".into()),
                PathSegment::Param("userId".into()),
                PathSegment::Literal("orders".into()),
            ]
        );
        assert_eq!(pattern.to_string(), "/users/{userId}/orders");
        assert_eq!(pattern.param_names().collect::<Vec<_>>(), vec!["userId"]);
        assert!(PathPattern::parse("/").unwrap().segments().is_empty());
    }

    #[test]
    fn test_malformed_patterns() {
        for raw in [
            "users",
            "/users/",
            "/users//x",
            "/users/{id",
            "/users/{}",
            "/users/{1id}",
            "/users/pre{id}",
            "/a/{id}/b/{id}",
        ] {
            assert!(
                matches!(PathPattern::parse(raw), Err(SolonError::SchemaCompile { .. })),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_prefix() {
        let prefix = PathPattern::parse_prefix("/api/v1/").unwrap();
        let pattern = PathPattern::parse("/users/{id}").unwrap();
        assert_eq!(pattern.prefixed(&prefix).to_string(), "/api/v1/users/{id}");
        assert_eq!(
            PathPattern::root().prefixed(&prefix).to_string(),
            "/api/v1"
        );
        assert_eq!(PathPattern::parse_prefix("").unwrap(), PathPattern::root());
    }

    #[test]
    fn test_load_json_contract() {
        let registry = ContractRegistry::from_json_str(USERS_JSON).unwrap();
        assert_eq!(registry.name(), "users");
        assert_eq!(registry.version(), "1.2.0");
        assert_eq!(registry.len(), 2);

        let op = registry.get("getUser").unwrap();
        assert_eq!(op.method(), &Method::GET);
        assert_eq!(op.path_param_type("userId"), ParamType::Integer);
        assert_eq!(op.query_params().count(), 1);
        assert!(op.requires_identity());
        assert!(op.response_schema(200).is_some());
        assert_eq!(op.response_schema(404), op.responses().get(DEFAULT_RESPONSE));

        let create = registry.get("createUser").unwrap();
        assert!(create.request_schema().is_some());
        assert!(!create.requires_identity());
        assert!(create.response_schema(201).is_none());
    }

    #[test]
    fn test_load_toml_contract() {
        let toml = r#"
            name = "orders"

            [[operations]]
            id = "listOrders"
            method = "GET"
            path = "/orders"
            tags = ["orders"]

            [[operations.parameters]]
            name = "limit"
            in = "query"
            type = "integer"
            required = true
        "#;

        let registry = ContractRegistry::from_toml_str(toml).unwrap();
        let op = registry.get("listOrders").unwrap();
        let limit = op.query_params().next().unwrap();
        assert_eq!(limit.param_type, ParamType::Integer);
        assert!(limit.required);
        assert_eq!(registry.version(), "0.0.0");
    }

    #[test]
    fn test_invalid_documents_fail_to_compile() {
        let cases = [
            r#"{"name": "x", "operations": [{"id": "a", "method": "BREW", "path": "/"}]}"#,
            r#"{"name": "x", "operations": [{"id": "a", "method": "GET", "path": "/{id"}]}"#,
            r#"{"name": "x", "operations": [{"id": "a", "method": "GET", "path": "/", "responses": {"ok": {"type": "any"}}}]}"#,
            r#"{"name": "x", "operations": [{"id": "a", "method": "GET", "path": "/", "parameters": [{"name": "id", "in": "path"}]}]}"#,
            r#"{"name": "x", "operations": [{"id": "a", "method": "GET", "path": "/", "request": {"type": "uuid"}}]}"#,
            r#"{"name": "x", "operations": [{"id": "a", "method": "GET", "path": "/", "colour": "red"}]}"#,
            r#"not json"#,
        ];

        for doc in cases {
            assert!(
                matches!(
                    ContractRegistry::from_json_str(doc),
                    Err(SolonError::SchemaCompile { .. })
                ),
                "{doc} should fail"
            );
        }
    }

    #[test]
    fn test_duplicate_ids_in_document() {
        let doc = r#"{"name": "x", "operations": [
            {"id": "a", "method": "GET", "path": "/a"},
            {"id": "a", "method": "GET", "path": "/b"}
        ]}"#;
        assert!(matches!(
            ContractRegistry::from_json_str(doc),
            Err(SolonError::DuplicateOperationId { operation_id }) if operation_id == "a"
        ));
    }

    #[test]
    fn test_undeclared_placeholder_defaults_to_string() {
        let op = Operation::builder("getThing")
            .path("/things/{thingId}")
            .build()
            .unwrap();
        assert_eq!(op.path_param_type("thingId"), ParamType::String);
    }

    #[test]
    fn test_mounted_operation() {
        let op = Operation::builder("listUsers")
            .path("/users")
            .tag("users")
            .build()
            .unwrap();
        let prefix = PathPattern::parse_prefix("/admin").unwrap();
        let mounted = op.mounted(&prefix, &["admin".to_string(), "users".to_string()]);

        assert_eq!(mounted.path().to_string(), "/admin/users");
        assert_eq!(mounted.tags(), &["users", "admin"]);
        assert_eq!(op.path().to_string(), "/users");
    }

    #[tokio::test]
    async fn test_from_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(USERS_JSON.as_bytes()).unwrap();

        let registry = ContractRegistry::from_file(file.path()).await.unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_from_file_errors() {
        assert!(matches!(
            ContractRegistry::from_file("/nonexistent/contract.json").await,
            Err(SolonError::SchemaCompile { .. })
        ));

        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        assert!(matches!(
            ContractRegistry::from_file(file.path()).await,
            Err(SolonError::SchemaCompile { .. })
        ));
    }
}
