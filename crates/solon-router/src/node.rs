//! Radix tree node implementation.
//!
//! Each node represents one path segment. Nodes at the end of a registered
//! pattern hold an [`Endpoint`]. Placeholder nodes are keyed by name, so
//! `/users/{id}` and `/users/{userId}` would be distinct children; the
//! overlap check performed before every insertion keeps such pairs out of
//! the tree, which guarantees that any concrete path reaches at most one
//! endpoint.

use crate::method_router::MethodRouter;
use crate::params::Params;
use solon_core::{PathPattern, PathSegment};

/// Type of path segment in the radix tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Literal segment (e.g., "users")
    Static,
    /// Named placeholder (e.g., "{userId}")
    Param(String),
}

/// The routes registered under one path pattern.
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// The pattern as registered.
    pub pattern: PathPattern,
    /// Operations by method.
    pub methods: MethodRouter,
}

/// A node in the radix tree.
#[derive(Debug, Clone)]
pub struct Node {
    /// The path segment this node represents
    pub segment: String,

    /// The kind of segment
    pub kind: SegmentKind,

    /// Routes ending at this node
    pub endpoint: Option<Endpoint>,

    /// Static children, sorted by segment for binary search
    pub static_children: Vec<Node>,

    /// Placeholder children
    pub param_children: Vec<Node>,
}

impl Node {
    /// Creates a new static node.
    #[must_use]
    pub fn new_static(segment: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            kind: SegmentKind::Static,
            endpoint: None,
            static_children: Vec::new(),
            param_children: Vec::new(),
        }
    }

    /// Creates a new parameter node.
    #[must_use]
    pub fn new_param(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            segment: format!("{{{name}}}"),
            kind: SegmentKind::Param(name),
            endpoint: None,
            static_children: Vec::new(),
            param_children: Vec::new(),
        }
    }

    /// Creates a root node for the tree.
    #[must_use]
    pub fn root() -> Self {
        Self::new_static("")
    }

    /// Finds an endpoint whose pattern can match some concrete path that
    /// `segments` can also match.
    ///
    /// A literal overlaps the identical literal and any placeholder; a
    /// placeholder overlaps everything.
    #[must_use]
    pub fn find_overlap(&self, segments: &[PathSegment]) -> Option<&Endpoint> {
        let Some((first, rest)) = segments.split_first() else {
            return self.endpoint.as_ref();
        };

        match first {
            PathSegment::Literal(lit) => self
                .find_static_child(lit)
                .and_then(|child| child.find_overlap(rest))
                .or_else(|| {
                    self.param_children
                        .iter()
                        .find_map(|child| child.find_overlap(rest))
                }),
            PathSegment::Param(_) => self
                .static_children
                .iter()
                .chain(&self.param_children)
                .find_map(|child| child.find_overlap(rest)),
        }
    }

    /// Returns the endpoint for `segments`, creating nodes as needed.
    pub fn endpoint_mut(&mut self, pattern: &PathPattern) -> &mut Endpoint {
        let mut node = self;
        for segment in pattern.segments() {
            node = node.child_mut(segment);
        }
        node.endpoint.get_or_insert_with(|| Endpoint {
            pattern: pattern.clone(),
            methods: MethodRouter::new(),
        })
    }

    fn child_mut(&mut self, segment: &PathSegment) -> &mut Node {
        match segment {
            PathSegment::Literal(lit) => {
                let idx = match self
                    .static_children
                    .binary_search_by(|c| c.segment.as_str().cmp(lit))
                {
                    Ok(idx) => idx,
                    Err(idx) => {
                        // Keep sorted for binary search
                        self.static_children.insert(idx, Node::new_static(lit));
                        idx
                    }
                };
                &mut self.static_children[idx]
            }
            PathSegment::Param(name) => {
                let idx = match self
                    .param_children
                    .iter()
                    .position(|c| c.kind == SegmentKind::Param(name.clone()))
                {
                    Some(idx) => idx,
                    None => {
                        self.param_children.push(Node::new_param(name));
                        self.param_children.len() - 1
                    }
                };
                &mut self.param_children[idx]
            }
        }
    }

    /// Matches a request path against the tree.
    ///
    /// The path must start with `/`. Empty segments, including the one
    /// produced by a trailing slash, never match.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<(&Endpoint, Params)> {
        let rest = path.strip_prefix('/')?;
        let segments: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split('/').collect()
        };

        let mut params = Params::new();
        let endpoint = self.match_segments(&segments, &mut params)?;
        Some((endpoint, params))
    }

    fn match_segments<'a>(&'a self, segments: &[&str], params: &mut Params) -> Option<&'a Endpoint> {
        let Some((&segment, remaining)) = segments.split_first() else {
            return self.endpoint.as_ref();
        };

        if segment.is_empty() {
            return None;
        }

        if let Some(child) = self.find_static_child(segment) {
            if let Some(found) = child.match_segments(remaining, params) {
                return Some(found);
            }
        }

        for child in &self.param_children {
            if let SegmentKind::Param(name) = &child.kind {
                params.push(name.as_str(), segment);
                if let Some(found) = child.match_segments(remaining, params) {
                    return Some(found);
                }
                params.pop();
            }
        }

        None
    }

    /// Finds a static child by segment using binary search.
    fn find_static_child(&self, segment: &str) -> Option<&Node> {
        self.static_children
            .binary_search_by(|c| c.segment.as_str().cmp(segment))
            .ok()
            .map(|i| &self.static_children[i])
    }
}
