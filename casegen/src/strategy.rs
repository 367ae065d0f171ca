//! Strategies: per-type producers of candidate values.
//!
//! Every strategy yields four tiers of values in a fixed order: local,
//! type-scoped, namespace-scoped and default. Built-in strategies only have a
//! default tier, computed from the shape of their type; host strategies
//! usually add explicit values in front of it.

use std::fmt;

use tracing::trace;

use crate::array::ArraySequence;
use crate::combinators::concat;
use crate::config::SamplingConfig;
use crate::context::ResolutionContext;
use crate::metadata::UnitMetadata;
use crate::resolver::Resolver;
use crate::sequence::{BoxedSequence, ValueSequence, empty, from_vec};
use crate::types::{PrimitiveKind, TypeDescriptor};
use crate::value::{Value, boundary_values};

/// Produces the candidate values for one type.
pub trait Strategy {
    /// The type this strategy produces values for
    fn target(&self) -> &TypeDescriptor;

    /// Values specific to a single operation parameter
    fn local_values(&self) -> BoxedSequence<Value> {
        empty().boxed()
    }

    /// Values specific to the declaring type
    fn type_values(&self) -> BoxedSequence<Value> {
        empty().boxed()
    }

    /// Values specific to the namespace
    fn namespace_values(&self) -> BoxedSequence<Value> {
        empty().boxed()
    }

    /// Values derived from the type itself
    fn default_values(&self, resolver: &Resolver, ctx: &mut ResolutionContext) -> BoxedSequence<Value>;

    /// Sampling for this strategy; `None` falls back to the configuration
    fn sampling(&self) -> Option<SamplingConfig> {
        None
    }

    /// All four tiers in order, before sampling
    fn union(&self, resolver: &Resolver, ctx: &mut ResolutionContext) -> BoxedSequence<Value> {
        concat(vec![
            self.local_values(),
            self.type_values(),
            self.namespace_values(),
            self.default_values(resolver, ctx),
        ])
        .boxed()
    }

    /// All four tiers in order, sampled if configured
    fn values(&self, resolver: &Resolver, ctx: &mut ResolutionContext) -> BoxedSequence<Value> {
        let sampling = self.sampling().or(resolver.config().sampling);
        sample(self.union(resolver, ctx), sampling)
    }
}

/// Apply `sampling` unless it is absent or keeps everything
pub fn sample<T: 'static>(
    values: BoxedSequence<T>,
    sampling: Option<SamplingConfig>,
) -> BoxedSequence<T> {
    match sampling {
        Some(sampling) if !sampling.is_identity() => values.sampled(sampling).boxed(),
        _ => values,
    }
}

/// The strategy used for a type nobody registered one for.
#[derive(Debug, Clone, PartialEq)]
pub enum BuiltinStrategy {
    /// Boundary constants followed by literals found in code
    Primitive {
        ty: TypeDescriptor,
        kind: PrimitiveKind,
    },
    /// Null followed by the values of the boxed primitive kind
    Boxed {
        ty: TypeDescriptor,
        kind: PrimitiveKind,
    },
    /// Every declared constant
    Enum {
        ty: TypeDescriptor,
        constants: Vec<String>,
    },
    /// Null, the empty array, then arrays up to a maximum length
    Array {
        ty: TypeDescriptor,
        max_length: Option<usize>,
    },
    /// Null followed by structural instantiations
    Structured { ty: TypeDescriptor },
}

impl BuiltinStrategy {
    /// Pick the built-in strategy matching the shape of `ty`
    pub fn for_type(ty: &TypeDescriptor, metadata: &UnitMetadata) -> Self {
        let ty = ty.clone();
        if ty.is_array() {
            return BuiltinStrategy::Array {
                ty,
                max_length: None,
            };
        }
        if let Some(kind) = ty.primitive_kind() {
            return BuiltinStrategy::Primitive { ty, kind };
        }
        if let Some(kind) = metadata.hierarchy().unboxed_kind(&ty) {
            return BuiltinStrategy::Boxed { ty, kind };
        }
        match metadata.type_info(&ty).filter(|info| info.is_enum()) {
            Some(info) => BuiltinStrategy::Enum {
                constants: info.enum_constants.clone(),
                ty,
            },
            None => BuiltinStrategy::Structured { ty },
        }
    }

    /// Override the maximum array length; ignored for non-array types
    pub fn with_max_array_length(self, max_length: Option<usize>) -> Self {
        match self {
            BuiltinStrategy::Array { ty, .. } if max_length.is_some() => {
                BuiltinStrategy::Array { ty, max_length }
            }
            other => other,
        }
    }

    fn primitive_values(ty: &TypeDescriptor, kind: PrimitiveKind, ctx: &ResolutionContext) -> Vec<Value> {
        let mut values = boundary_values(kind);
        for text in ctx.literal_texts(ty) {
            match Value::parse_literal(kind, &text) {
                Some(value) if !values.contains(&value) => values.push(value),
                Some(_) => {}
                None => trace!(ty = %ty, literal = %text, "skipping unparsable literal"),
            }
        }
        values
    }

    fn array_values(
        ty: &TypeDescriptor,
        max_length: Option<usize>,
        resolver: &Resolver,
        ctx: &ResolutionContext,
    ) -> BoxedSequence<Value> {
        let Some(component) = ty.component() else {
            return empty().boxed();
        };
        let max_length = max_length.unwrap_or(if ctx.structural_fallback() {
            resolver.config().max_array_length
        } else {
            0
        });
        let elements = resolver.factory(&component, &ctx.nested());
        ArraySequence::new(elements, max_length)
            .map(move |array| match array {
                None => Value::Null,
                Some(elements) => Value::Array {
                    component: component.clone(),
                    elements,
                },
            })
            .boxed()
    }
}

impl Strategy for BuiltinStrategy {
    fn target(&self) -> &TypeDescriptor {
        match self {
            BuiltinStrategy::Primitive { ty, .. }
            | BuiltinStrategy::Boxed { ty, .. }
            | BuiltinStrategy::Enum { ty, .. }
            | BuiltinStrategy::Array { ty, .. }
            | BuiltinStrategy::Structured { ty } => ty,
        }
    }

    fn default_values(&self, resolver: &Resolver, ctx: &mut ResolutionContext) -> BoxedSequence<Value> {
        match self {
            BuiltinStrategy::Primitive { ty, kind } => {
                from_vec(Self::primitive_values(ty, *kind, ctx)).boxed()
            }
            BuiltinStrategy::Boxed { kind, .. } => {
                let primitive = TypeDescriptor::parse(kind.name());
                let mut values = vec![Value::Null];
                values.extend(
                    Self::primitive_values(&primitive, *kind, ctx)
                        .into_iter()
                        .filter(|value| !value.is_null()),
                );
                from_vec(values).boxed()
            }
            BuiltinStrategy::Enum { ty, constants } => from_vec(
                constants
                    .iter()
                    .map(|constant| Value::Enum {
                        ty: ty.clone(),
                        constant: constant.clone(),
                    })
                    .collect(),
            )
            .boxed(),
            BuiltinStrategy::Array { ty, max_length } => {
                Self::array_values(ty, *max_length, resolver, ctx)
            }
            BuiltinStrategy::Structured { ty } => resolver.structural_candidates(ty, ctx),
        }
    }
}

/// A host-registered strategy with explicit values for each scope tier.
///
/// Its default tier is the built-in strategy of the target type unless
/// disabled with [`CustomStrategy::without_defaults`].
#[derive(Clone)]
pub struct CustomStrategy {
    ty: TypeDescriptor,
    local: Vec<Value>,
    type_scoped: Vec<Value>,
    namespace_scoped: Vec<Value>,
    sampling: Option<SamplingConfig>,
    max_array_length: Option<usize>,
    use_defaults: bool,
}

impl CustomStrategy {
    pub fn new(ty: impl Into<TypeDescriptor>) -> Self {
        Self {
            ty: ty.into(),
            local: Vec::new(),
            type_scoped: Vec::new(),
            namespace_scoped: Vec::new(),
            sampling: None,
            max_array_length: None,
            use_defaults: true,
        }
    }

    pub fn with_local_values(mut self, values: Vec<Value>) -> Self {
        self.local = values;
        self
    }

    pub fn with_type_values(mut self, values: Vec<Value>) -> Self {
        self.type_scoped = values;
        self
    }

    pub fn with_namespace_values(mut self, values: Vec<Value>) -> Self {
        self.namespace_scoped = values;
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = Some(sampling);
        self
    }

    /// Longest synthesized array when the target is an array type
    pub fn with_max_array_length(mut self, max_length: usize) -> Self {
        self.max_array_length = Some(max_length);
        self
    }

    /// Only yield the explicit values
    pub fn without_defaults(mut self) -> Self {
        self.use_defaults = false;
        self
    }
}

impl Strategy for CustomStrategy {
    fn target(&self) -> &TypeDescriptor {
        &self.ty
    }

    fn local_values(&self) -> BoxedSequence<Value> {
        from_vec(self.local.clone()).boxed()
    }

    fn type_values(&self) -> BoxedSequence<Value> {
        from_vec(self.type_scoped.clone()).boxed()
    }

    fn namespace_values(&self) -> BoxedSequence<Value> {
        from_vec(self.namespace_scoped.clone()).boxed()
    }

    fn default_values(&self, resolver: &Resolver, ctx: &mut ResolutionContext) -> BoxedSequence<Value> {
        if !self.use_defaults {
            return empty().boxed();
        }
        BuiltinStrategy::for_type(&self.ty, resolver.metadata())
            .with_max_array_length(self.max_array_length)
            .default_values(resolver, ctx)
    }

    fn sampling(&self) -> Option<SamplingConfig> {
        self.sampling
    }
}

impl fmt::Debug for CustomStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomStrategy")
            .field("ty", &self.ty)
            .field("local", &self.local.len())
            .field("type_scoped", &self.type_scoped.len())
            .field("namespace_scoped", &self.namespace_scoped.len())
            .field("sampling", &self.sampling)
            .field("use_defaults", &self.use_defaults)
            .finish()
    }
}
