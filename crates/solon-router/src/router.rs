//! High-level router API.
//!
//! This module provides the main [`Router`] struct which is the primary
//! interface for registering contract operations and resolving requests.

use std::sync::Arc;

use http::Method;
use indexmap::IndexMap;
use solon_core::{ContractRegistry, Operation, PathPattern, SolonError, SolonResult};
use tracing::debug;

use crate::method_router::MethodRouter;
use crate::node::Node;
use crate::RouteMatch;

/// A radix tree router over contract operations.
///
/// Registration rejects any pattern that could match the same concrete path
/// as an already registered pattern, unless both patterns are identical, in
/// which case their methods are merged. As a result every request path
/// resolves to at most one pattern and the result never depends on
/// registration order.
///
/// # Example
///
/// ```rust
/// use solon_router::Router;
/// use solon_core::Operation;
/// use http::Method;
///
/// let mut router = Router::new();
/// router.register(Operation::builder("listUsers").path("/users").build()?)?;
/// router.register(Operation::builder("getUser").path("/users/{userId}").build()?)?;
///
/// let m = router.resolve(&Method::GET, "/users/42")?;
/// assert_eq!(m.operation_id(), "getUser");
/// assert_eq!(m.params.get("userId"), Some("42"));
/// # Ok::<(), solon_core::SolonError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Router {
    /// Root node of the radix tree
    root: Node,
    /// Registered operations by id, in registration order
    operations: IndexMap<String, Arc<Operation>>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Creates a new empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::root(),
            operations: IndexMap::new(),
        }
    }

    /// Builds a router holding every operation of a contract.
    pub fn from_registry(registry: &ContractRegistry) -> SolonResult<Self> {
        let mut router = Self::new();
        for operation in registry.operations() {
            router.register(Arc::clone(operation))?;
        }
        Ok(router)
    }

    /// Registers an operation.
    ///
    /// # Errors
    ///
    /// - [`SolonError::DuplicateOperationId`] if the id is already registered
    /// - [`SolonError::RouteConflict`] if the pattern overlaps a different
    ///   registered pattern, or the identical pattern already has the method
    /// - [`SolonError::SchemaCompile`] for methods the router cannot hold
    pub fn register(&mut self, operation: impl Into<Arc<Operation>>) -> SolonResult<()> {
        let operation = operation.into();

        if self.operations.contains_key(operation.id()) {
            return Err(SolonError::DuplicateOperationId {
                operation_id: operation.id().to_string(),
            });
        }
        if !MethodRouter::supports(operation.method()) {
            return Err(SolonError::schema_compile(format!(
                "operation '{}': unsupported method {}",
                operation.id(),
                operation.method()
            )));
        }

        if let Some(endpoint) = self.root.find_overlap(operation.path().segments()) {
            let same_pattern = endpoint.pattern == *operation.path();
            let taken = endpoint.methods.get_operation(operation.method());
            if !same_pattern || taken.is_some() {
                let existing_operation = taken
                    .or_else(|| {
                        endpoint
                            .methods
                            .allowed()
                            .first()
                            .and_then(|m| endpoint.methods.get_operation(m))
                    })
                    .map(|existing| existing.id().to_string())
                    .unwrap_or_default();
                return Err(SolonError::RouteConflict {
                    method: operation.method().to_string(),
                    path: operation.path().to_string(),
                    existing: endpoint.pattern.to_string(),
                    existing_operation,
                });
            }
        }

        let pattern = operation.path().clone();
        let endpoint = self.root.endpoint_mut(&pattern);
        if let Err(existing) = endpoint.methods.insert(Arc::clone(&operation)) {
            // Unreachable after the checks above, kept as a hard failure.
            return Err(SolonError::RouteConflict {
                method: operation.method().to_string(),
                path: pattern.to_string(),
                existing: pattern.to_string(),
                existing_operation: existing.id().to_string(),
            });
        }

        debug!(
            operation_id = %operation.id(),
            method = %operation.method(),
            path = %pattern,
            "Registered route"
        );
        self.operations
            .insert(operation.id().to_string(), operation);
        Ok(())
    }

    /// Returns a router with every pattern mounted under `prefix`.
    pub fn prefix(self, prefix: &str) -> SolonResult<Self> {
        let prefix = PathPattern::parse_prefix(prefix)?;
        self.rebuild(&prefix, &[])
    }

    /// Returns a router with `tag` added to every operation.
    pub fn tag(self, tag: &str) -> SolonResult<Self> {
        self.rebuild(&PathPattern::root(), &[tag.to_string()])
    }

    fn rebuild(self, prefix: &PathPattern, tags: &[String]) -> SolonResult<Self> {
        let mut router = Self::new();
        for operation in self.operations.values() {
            router.register(operation.mounted(prefix, tags))?;
        }
        Ok(router)
    }

    /// Adds every operation of `other` to this router.
    ///
    /// Fails on the first duplicate id or conflicting route; operations
    /// registered before the failure stay registered.
    pub fn merge(&mut self, other: Self) -> SolonResult<()> {
        for operation in other.operations.into_values() {
            self.register(operation)?;
        }
        Ok(())
    }

    /// Mounts `sub` under `prefix`, adding `tags` to each of its operations.
    pub fn compose(&mut self, prefix: &str, tags: &[&str], sub: Self) -> SolonResult<()> {
        let prefix = PathPattern::parse_prefix(prefix)?;
        let tags: Vec<String> = tags.iter().map(|t| (*t).to_string()).collect();
        for operation in sub.operations.values() {
            self.register(operation.mounted(&prefix, &tags))?;
        }
        Ok(())
    }

    /// Resolves a request to an operation and its bound path parameters.
    ///
    /// # Errors
    ///
    /// - [`SolonError::RouteNotFound`] if no pattern matches the path
    /// - [`SolonError::MethodNotAllowed`] if the pattern has no operation for
    ///   the method; the error lists the allowed methods
    pub fn resolve(&self, method: &Method, path: &str) -> SolonResult<RouteMatch<'_>> {
        let Some((endpoint, params)) = self.root.match_path(path) else {
            return Err(SolonError::route_not_found(method.as_str(), path));
        };

        match endpoint.methods.get_operation(method) {
            Some(operation) => Ok(RouteMatch::new(operation, params)),
            None => Err(SolonError::method_not_allowed(
                method.as_str(),
                path,
                endpoint
                    .methods
                    .allowed()
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            )),
        }
    }

    /// Returns the methods registered for the pattern matching `path`.
    #[must_use]
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        self.root
            .match_path(path)
            .map(|(endpoint, _)| endpoint.methods.allowed())
            .unwrap_or_default()
    }

    /// Returns a registered operation by id.
    #[must_use]
    pub fn operation(&self, operation_id: &str) -> Option<&Arc<Operation>> {
        self.operations.get(operation_id)
    }

    /// Returns all registered operations in registration order.
    pub fn operations(&self) -> impl Iterator<Item = &Arc<Operation>> {
        self.operations.values()
    }

    /// Returns all registered operation ids in registration order.
    pub fn operation_ids(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    /// Returns the number of registered operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns `true` if no operations are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
