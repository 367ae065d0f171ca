//! Scopes and the registry of host-supplied strategies.
//!
//! A strategy is registered for an exact type at one [`ScopeKey`]. The
//! resolver consults keys in the order of the context's scope chain, so a
//! strategy for one parameter of one operation shadows a strategy for the
//! whole declaring type, which shadows one for the namespace, which shadows a
//! default.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::strategy::Strategy;
use crate::types::TypeDescriptor;

/// The four visibility levels a strategy can be registered at, most
/// specific first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Local,
    DeclaringType,
    Namespace,
    Default,
}

/// A scope together with the identity it is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopeKey {
    /// One parameter of one operation
    Local { operation: String, parameter: usize },
    /// Every use inside the declaring type
    DeclaringType(TypeDescriptor),
    /// Every use inside a namespace
    Namespace(String),
    /// Everywhere
    Default,
}

impl ScopeKey {
    pub fn local(operation: impl Into<String>, parameter: usize) -> Self {
        ScopeKey::Local {
            operation: operation.into(),
            parameter,
        }
    }

    pub fn declaring_type(ty: impl Into<TypeDescriptor>) -> Self {
        ScopeKey::DeclaringType(ty.into())
    }

    pub fn namespace(name: impl Into<String>) -> Self {
        ScopeKey::Namespace(name.into())
    }

    pub fn scope(&self) -> Scope {
        match self {
            ScopeKey::Local { .. } => Scope::Local,
            ScopeKey::DeclaringType(_) => Scope::DeclaringType,
            ScopeKey::Namespace(_) => Scope::Namespace,
            ScopeKey::Default => Scope::Default,
        }
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKey::Local {
                operation,
                parameter,
            } => write!(f, "local:{}#{}", operation, parameter),
            ScopeKey::DeclaringType(ty) => write!(f, "type:{}", ty),
            ScopeKey::Namespace(name) => write!(f, "namespace:{}", name),
            ScopeKey::Default => f.write_str("default"),
        }
    }
}

/// Runtime discovery of registered strategies.
///
/// Implemented by [`StrategyCatalog`] and by any closure with the same
/// signature, so hosts can plug in their own discovery.
pub trait StrategyLookup {
    /// The strategy registered for exactly `ty` at `scope`, if any
    fn lookup(&self, scope: &ScopeKey, ty: &TypeDescriptor) -> Option<Rc<dyn Strategy>>;
}

impl<F> StrategyLookup for F
where
    F: Fn(&ScopeKey, &TypeDescriptor) -> Option<Rc<dyn Strategy>>,
{
    fn lookup(&self, scope: &ScopeKey, ty: &TypeDescriptor) -> Option<Rc<dyn Strategy>> {
        self(scope, ty)
    }
}

type StrategyFactory = Box<dyn Fn(&TypeDescriptor) -> Rc<dyn Strategy>>;

/// A statically populated table of strategy factories.
#[derive(Default)]
pub struct StrategyCatalog {
    entries: HashMap<(ScopeKey, TypeDescriptor), StrategyFactory>,
}

impl StrategyCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory building the strategy on every lookup; replaces
    /// any earlier registration for the same scope and type
    pub fn register<F>(&mut self, scope: ScopeKey, ty: impl Into<TypeDescriptor>, make: F)
    where
        F: Fn(&TypeDescriptor) -> Rc<dyn Strategy> + 'static,
    {
        self.entries.insert((scope, ty.into()), Box::new(make));
    }

    /// Register a shared strategy instance for its target type
    pub fn register_strategy<S>(&mut self, scope: ScopeKey, strategy: S)
    where
        S: Strategy + 'static,
    {
        let ty = strategy.target().clone();
        let shared: Rc<dyn Strategy> = Rc::new(strategy);
        self.register(scope, ty, move |_| Rc::clone(&shared));
    }

    /// Builder form of [`StrategyCatalog::register_strategy`]
    pub fn with_strategy<S>(mut self, scope: ScopeKey, strategy: S) -> Self
    where
        S: Strategy + 'static,
    {
        self.register_strategy(scope, strategy);
        self
    }

    pub fn contains(&self, scope: &ScopeKey, ty: &TypeDescriptor) -> bool {
        self.entries.contains_key(&(scope.clone(), ty.clone()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StrategyLookup for StrategyCatalog {
    fn lookup(&self, scope: &ScopeKey, ty: &TypeDescriptor) -> Option<Rc<dyn Strategy>> {
        self.entries
            .get(&(scope.clone(), ty.clone()))
            .map(|make| make(ty))
    }
}

impl fmt::Debug for StrategyCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyCatalog")
            .field("entries", &self.entries.len())
            .finish()
    }
}
