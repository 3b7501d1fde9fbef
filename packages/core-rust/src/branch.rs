//! Keyed dispatcher: selects a handler by the value of a request property.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::FlowError;
use crate::key::{Inspect, Key};
use crate::stage::{IntoStage, Stage, Step};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Handler table for one property: match key -> handler, in declaration order.
pub struct Routes<T> {
    handlers: Vec<(Key, Stage<T>)>,
}

impl<T: 'static> Routes<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Route requests whose property canonicalizes to `key` to `handler`.
    #[must_use]
    pub fn when(mut self, key: impl Into<Key>, handler: impl IntoStage<T>) -> Self {
        self.handlers.push((key.into(), handler.into_stage()));
        self
    }
}

impl<T: 'static> Default for Routes<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Branch configuration: property name -> handler table.
///
/// Properties are examined in the order they are first declared.
pub struct BranchConfig<T> {
    properties: Vec<(String, Routes<T>)>,
}

impl<T: 'static> BranchConfig<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            properties: Vec::new(),
        }
    }

    /// Declare the handler table for `property`. Re-declaring a property
    /// replaces its table but keeps its original position.
    #[must_use]
    pub fn on(mut self, property: impl Into<String>, routes: Routes<T>) -> Self {
        let property = property.into();
        match self.properties.iter_mut().find(|(name, _)| *name == property) {
            Some((_, existing)) => *existing = routes,
            None => self.properties.push((property, routes)),
        }
        self
    }
}

impl<T: 'static> Default for BranchConfig<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Branch
// ---------------------------------------------------------------------------

struct Route<T> {
    property: String,
    handlers: HashMap<Key, Stage<T>>,
}

/// A dispatcher built from a [`BranchConfig`].
///
/// Calling it walks the configured properties in declaration order, reads
/// each from the request, and invokes the first handler whose key matches
/// with the entire request. When nothing matches the call fails with
/// [`FlowError::RouteNotFound`].
pub struct Branch<T> {
    routes: Arc<[Route<T>]>,
}

/// Build a dispatcher from `config`.
pub fn branch<T>(config: BranchConfig<T>) -> Branch<T>
where
    T: Inspect + Send + 'static,
{
    Branch::new(config)
}

impl<T> Branch<T>
where
    T: Inspect + Send + 'static,
{
    /// Canonicalize every table. Keys that collide within one table keep
    /// the later handler.
    #[must_use]
    pub fn new(config: BranchConfig<T>) -> Self {
        let routes = config
            .properties
            .into_iter()
            .map(|(property, table)| {
                let mut handlers = HashMap::with_capacity(table.handlers.len());
                for (key, handler) in table.handlers {
                    if handlers.contains_key(&key) {
                        tracing::warn!(
                            property = %property,
                            key = %key,
                            "duplicate route key, later handler replaces earlier"
                        );
                    }
                    handlers.insert(key, handler);
                }
                Route { property, handlers }
            })
            .collect();
        Self { routes }
    }

    /// Configured property names in declaration order.
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|route| route.property.as_str())
    }

    /// The handler `request` would be dispatched to, without invoking it.
    #[must_use]
    pub fn resolve(&self, request: &T) -> Option<&Stage<T>> {
        self.routes.iter().find_map(|route| {
            let key = request.property_key(&route.property)?;
            let handler = route.handlers.get(&key)?;
            tracing::trace!(property = %route.property, key = %key, "route matched");
            Some(handler)
        })
    }

    pub fn call(&self, request: T) -> Step<T> {
        match self.resolve(&request) {
            Some(handler) => handler.apply(request),
            None => Step::err(FlowError::RouteNotFound {
                attempted: self.properties().map(str::to_owned).collect(),
            }),
        }
    }
}

impl<T> Clone for Branch<T> {
    fn clone(&self) -> Self {
        Self {
            routes: Arc::clone(&self.routes),
        }
    }
}

impl<T> fmt::Debug for Branch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for route in self.routes.iter() {
            let mut keys: Vec<&str> = route.handlers.keys().map(Key::as_str).collect();
            keys.sort_unstable();
            map.entry(&route.property, &keys);
        }
        map.finish()
    }
}

impl<T> IntoStage<T> for Branch<T>
where
    T: Inspect + Send + 'static,
{
    fn into_stage(self) -> Stage<T> {
        Stage::new(move |request| self.call(request))
    }
}

impl<T> From<Branch<T>> for Stage<T>
where
    T: Inspect + Send + 'static,
{
    fn from(branch: Branch<T>) -> Self {
        branch.into_stage()
    }
}
