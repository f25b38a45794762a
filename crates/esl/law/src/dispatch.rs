//! Type-dispatch table
//!
//! Double dispatch over the open set of property kinds: the registry and the
//! kernel only ever see [`Property`] values, and the behaviour for a given
//! (kind, context) pair is looked up here at the boundary. New kinds get
//! behaviour by registering a handler, never by editing existing code.
//!
//! Registering a handler for a pair that already has one replaces it and
//! hands the previous handler back to the caller.

use esl_types::{Context, DispatchConfig, EslError, EslResult, PropertyTypeId};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::property::Property;

/// Context-specific processing for one property kind.
///
/// `A` is the argument bundle the kernel passes for the step, `R` the
/// handler's result. Any `Fn(&Property, &A) -> EslResult<R>` closure is a
/// handler.
pub trait PropertyHandler<A, R>: Send + Sync {
    fn handle(&self, property: &Property, args: &A) -> EslResult<R>;
}

impl<A, R, F> PropertyHandler<A, R> for F
where
    F: Fn(&Property, &A) -> EslResult<R> + Send + Sync,
{
    fn handle(&self, property: &Property, args: &A) -> EslResult<R> {
        self(property, args)
    }
}

/// Shared reference to a registered handler
pub type HandlerRef<A, R> = Arc<dyn PropertyHandler<A, R>>;

/// Outcome of a registration
pub enum Registration<A, R> {
    /// No handler existed for the pair
    Fresh,
    /// The given handler was displaced
    Replaced(HandlerRef<A, R>),
}

impl<A, R> Registration<A, R> {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Registration::Fresh)
    }

    pub fn previous(self) -> Option<HandlerRef<A, R>> {
        match self {
            Registration::Fresh => None,
            Registration::Replaced(handler) => Some(handler),
        }
    }
}

impl<A, R> std::fmt::Debug for Registration<A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Registration::Fresh => f.write_str("Fresh"),
            Registration::Replaced(_) => f.write_str("Replaced(..)"),
        }
    }
}

/// Maps (kind tag, context) to a handler.
///
/// Read-mostly: handlers are registered at setup time and looked up every
/// step. Lookups share a read lock; the handler itself runs after the lock
/// is released, so a handler may register further handlers.
pub struct DispatchTable<A, R> {
    handlers: RwLock<HashMap<PropertyTypeId, HashMap<Context, HandlerRef<A, R>>>>,
    tolerated: RwLock<HashSet<Context>>,
}

impl<A, R> Default for DispatchTable<A, R> {
    fn default() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            tolerated: RwLock::new(HashSet::new()),
        }
    }
}

impl<A, R> DispatchTable<A, R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &DispatchConfig) -> Self {
        let table = Self::new();
        for context in &config.tolerated_contexts {
            table.tolerate(context.clone());
        }
        table
    }

    /// Associate `handler` with (`type_id`, `context`), replacing any
    /// handler already registered for the pair.
    pub fn register<H>(&self, type_id: PropertyTypeId, context: Context, handler: H) -> Registration<A, R>
    where
        H: PropertyHandler<A, R> + 'static,
    {
        self.register_shared(type_id, context, Arc::new(handler))
    }

    /// Closure form of [`register`](Self::register)
    pub fn register_fn<F>(&self, type_id: PropertyTypeId, context: Context, f: F) -> Registration<A, R>
    where
        F: Fn(&Property, &A) -> EslResult<R> + Send + Sync + 'static,
    {
        self.register_shared(type_id, context, Arc::new(f))
    }

    /// Register an already shared handler, e.g. one handler for many kinds
    pub fn register_shared(
        &self,
        type_id: PropertyTypeId,
        context: Context,
        handler: HandlerRef<A, R>,
    ) -> Registration<A, R> {
        let previous = self
            .handlers
            .write()
            .entry(type_id)
            .or_default()
            .insert(context.clone(), handler);

        match previous {
            Some(previous) => {
                warn!(type_id = %type_id, context = %context, "Handler replaced");
                Registration::Replaced(previous)
            }
            None => {
                info!(type_id = %type_id, context = %context, "Handler registered");
                Registration::Fresh
            }
        }
    }

    pub fn unregister(&self, type_id: PropertyTypeId, context: &Context) -> Option<HandlerRef<A, R>> {
        let mut handlers = self.handlers.write();
        let by_context = handlers.get_mut(&type_id)?;
        let removed = by_context.remove(context);
        if by_context.is_empty() {
            handlers.remove(&type_id);
        }
        removed
    }

    pub fn handler(&self, type_id: PropertyTypeId, context: &Context) -> Option<HandlerRef<A, R>> {
        self.handlers
            .read()
            .get(&type_id)
            .and_then(|by_context| by_context.get(context))
            .cloned()
    }

    /// Invoke the handler for (`property.type_id()`, `context`).
    ///
    /// Fails with `UnhandledPropertyType` if no handler is registered;
    /// otherwise returns exactly what the handler returns.
    pub fn dispatch(&self, property: &Property, context: &Context, args: &A) -> EslResult<R> {
        let Some(handler) = self.handler(property.type_id(), context) else {
            return Err(EslError::UnhandledPropertyType {
                type_id: property.type_id(),
                context: context.clone(),
            });
        };
        debug!(type_id = %property.type_id(), property = %property.id(), context = %context, "Dispatching");
        handler.handle(property, args)
    }

    /// Like [`dispatch`](Self::dispatch), but an unhandled pair in a
    /// tolerated context yields `Ok(None)` instead of an error.
    pub fn dispatch_lenient(
        &self,
        property: &Property,
        context: &Context,
        args: &A,
    ) -> EslResult<Option<R>> {
        match self.dispatch(property, context, args) {
            Ok(result) => Ok(Some(result)),
            Err(EslError::UnhandledPropertyType { .. }) if self.is_tolerated(context) => {
                debug!(type_id = %property.type_id(), context = %context, "Unhandled property skipped");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Allow lenient dispatch to skip unhandled kinds in `context`
    pub fn tolerate(&self, context: Context) {
        self.tolerated.write().insert(context);
    }

    pub fn is_tolerated(&self, context: &Context) -> bool {
        self.tolerated.read().contains(context)
    }

    pub fn is_registered(&self, type_id: PropertyTypeId, context: &Context) -> bool {
        self.handler(type_id, context).is_some()
    }

    /// Contexts with a handler for `type_id`, sorted
    pub fn contexts_for(&self, type_id: PropertyTypeId) -> Vec<Context> {
        let mut contexts: Vec<_> = self
            .handlers
            .read()
            .get(&type_id)
            .map(|by_context| by_context.keys().cloned().collect())
            .unwrap_or_default();
        contexts.sort();
        contexts
    }

    /// Number of registered (kind, context) pairs
    pub fn len(&self) -> usize {
        self.handlers.read().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
