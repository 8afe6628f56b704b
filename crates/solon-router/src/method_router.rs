//! HTTP method-based routing.
//!
//! [`MethodRouter`] maps HTTP methods to the operations registered under a
//! single path pattern.

use http::Method;
use solon_core::Operation;
use std::sync::Arc;

/// Maps HTTP methods to operations for a single route.
///
/// # Example
///
/// ```rust
/// use solon_router::MethodRouter;
/// use solon_core::Operation;
/// use http::Method;
/// use std::sync::Arc;
///
/// let list = Arc::new(Operation::builder("listUsers").path("/users").build().unwrap());
/// let mut router = MethodRouter::new();
/// assert!(router.insert(Arc::clone(&list)).is_ok());
///
/// assert_eq!(router.get_operation(&Method::GET).map(|op| op.id()), Some("listUsers"));
/// assert!(router.get_operation(&Method::DELETE).is_none());
/// assert_eq!(router.allowed(), vec![Method::GET]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MethodRouter {
    get: Option<Arc<Operation>>,
    post: Option<Arc<Operation>>,
    put: Option<Arc<Operation>>,
    delete: Option<Arc<Operation>>,
    patch: Option<Arc<Operation>>,
    head: Option<Arc<Operation>>,
    options: Option<Arc<Operation>>,
    trace: Option<Arc<Operation>>,
    connect: Option<Arc<Operation>>,
}

impl MethodRouter {
    /// Creates a new empty method router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, method: &Method) -> Option<&Option<Arc<Operation>>> {
        match *method {
            Method::GET => Some(&self.get),
            Method::POST => Some(&self.post),
            Method::PUT => Some(&self.put),
            Method::DELETE => Some(&self.delete),
            Method::PATCH => Some(&self.patch),
            Method::HEAD => Some(&self.head),
            Method::OPTIONS => Some(&self.options),
            Method::TRACE => Some(&self.trace),
            Method::CONNECT => Some(&self.connect),
            _ => None,
        }
    }

    fn slot_mut(&mut self, method: &Method) -> Option<&mut Option<Arc<Operation>>> {
        match *method {
            Method::GET => Some(&mut self.get),
            Method::POST => Some(&mut self.post),
            Method::PUT => Some(&mut self.put),
            Method::DELETE => Some(&mut self.delete),
            Method::PATCH => Some(&mut self.patch),
            Method::HEAD => Some(&mut self.head),
            Method::OPTIONS => Some(&mut self.options),
            Method::TRACE => Some(&mut self.trace),
            Method::CONNECT => Some(&mut self.connect),
            _ => None,
        }
    }

    /// Returns `true` if `method` is one this router can hold.
    #[must_use]
    pub fn supports(method: &Method) -> bool {
        Self::default().slot(method).is_some()
    }

    /// Registers an operation under its own method.
    ///
    /// Returns the already registered operation if the method is taken, or
    /// the rejected operation itself if its method is not supported.
    pub fn insert(&mut self, operation: Arc<Operation>) -> Result<(), Arc<Operation>> {
        let Some(slot) = self.slot_mut(operation.method()) else {
            return Err(operation);
        };
        if let Some(existing) = slot.as_ref() {
            return Err(Arc::clone(existing));
        }
        *slot = Some(operation);
        Ok(())
    }

    /// Returns the operation registered for a method.
    #[must_use]
    pub fn get_operation(&self, method: &Method) -> Option<&Arc<Operation>> {
        self.slot(method).and_then(Option::as_ref)
    }

    /// Returns the methods with a registered operation, in a stable order.
    #[must_use]
    pub fn allowed(&self) -> Vec<Method> {
        [
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::HEAD,
            Method::OPTIONS,
            Method::TRACE,
            Method::CONNECT,
        ]
        .into_iter()
        .filter(|m| self.get_operation(m).is_some())
        .collect()
    }

    /// Returns `true` if no method is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allowed().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(id: &str, method: Method) -> Arc<Operation> {
        Arc::new(
            Operation::builder(id)
                .method(method)
                .path("/users")
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_insert_and_get() {
        let mut router = MethodRouter::new();
        router.insert(op("listUsers", Method::GET)).unwrap();
        router.insert(op("createUser", Method::POST)).unwrap();

        assert_eq!(router.get_operation(&Method::GET).unwrap().id(), "listUsers");
        assert_eq!(router.get_operation(&Method::POST).unwrap().id(), "createUser");
        assert!(router.get_operation(&Method::PUT).is_none());
        assert_eq!(router.allowed(), vec![Method::GET, Method::POST]);
    }

    #[test]
    fn test_duplicate_method_returns_existing() {
        let mut router = MethodRouter::new();
        router.insert(op("listUsers", Method::GET)).unwrap();

        let existing = router.insert(op("searchUsers", Method::GET)).unwrap_err();
        assert_eq!(existing.id(), "listUsers");
    }

    #[test]
    fn test_extension_method_is_rejected() {
        let purge = Method::from_bytes(b"PURGE").unwrap();
        assert!(!MethodRouter::supports(&purge));

        let mut router = MethodRouter::new();
        let rejected = router.insert(op("purge", purge)).unwrap_err();
        assert_eq!(rejected.id(), "purge");
        assert!(router.is_empty());
    }
}
