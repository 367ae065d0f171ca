//! Scoped resolution of types to value sequences.
//!
//! The resolver walks the context's scope chain looking for a registered
//! strategy; the first hit wins outright. Without one, the built-in strategy
//! for the type's shape is used, and structured types fall back to building
//! instances from their constructors.

use std::rc::Rc;

use tracing::debug;

use crate::catalog::{ScopeKey, StrategyLookup};
use crate::combinators::concat;
use crate::config::{ConfigError, GenerationConfig};
use crate::context::ResolutionContext;
use crate::error::Diagnostic;
use crate::instantiator::{Argument, Instantiator};
use crate::metadata::{TypeInfo, UnitMetadata};
use crate::sequence::{self, BoxedSequence, SequenceFactory, ValueSequence, empty, once};
use crate::strategy::{BuiltinStrategy, Strategy, sample};
use crate::types::TypeDescriptor;
use crate::value::Value;

struct ResolverInner {
    lookup: Box<dyn StrategyLookup>,
    metadata: UnitMetadata,
    config: GenerationConfig,
}

/// Resolves types to candidate value sequences for one unit under test.
///
/// Cheap to clone; clones share the catalog, metadata and configuration.
#[derive(Clone)]
pub struct Resolver {
    inner: Rc<ResolverInner>,
}

impl Resolver {
    pub fn new(
        mut metadata: UnitMetadata,
        lookup: impl StrategyLookup + 'static,
        config: GenerationConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        metadata.link_types();
        Ok(Self {
            inner: Rc::new(ResolverInner {
                lookup: Box::new(lookup),
                metadata,
                config,
            }),
        })
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.inner.config
    }

    pub fn metadata(&self) -> &UnitMetadata {
        &self.inner.metadata
    }

    /// The first strategy registered for exactly `ty` along `chain`
    pub fn find_strategy(
        &self,
        ty: &TypeDescriptor,
        chain: &[ScopeKey],
    ) -> Option<(ScopeKey, Rc<dyn Strategy>)> {
        chain.iter().find_map(|key| {
            self.inner
                .lookup
                .lookup(key, ty)
                .map(|strategy| (key.clone(), strategy))
        })
    }

    /// Resolve `ty` to its candidate values.
    ///
    /// Never fails: a type with no possible values resolves to an empty
    /// sequence and a [`Diagnostic::NoCoverage`] is recorded.
    pub fn resolve(&self, ty: &TypeDescriptor, ctx: &mut ResolutionContext) -> BoxedSequence<Value> {
        let strategy = self.strategy_for(ty, ctx);
        let values = strategy.values(self, ctx);
        Self::check_coverage(ty, values, ctx)
    }

    /// Resolve `ty` keeping only the values accepted by `keep`.
    ///
    /// Sampling applies to the filtered values, so the first accepted value
    /// is always kept.
    pub fn resolve_where<P>(
        &self,
        ty: &TypeDescriptor,
        ctx: &mut ResolutionContext,
        keep: P,
    ) -> BoxedSequence<Value>
    where
        P: Fn(&Value) -> bool + 'static,
    {
        let strategy = self.strategy_for(ty, ctx);
        let sampling = strategy.sampling().or(self.config().sampling);
        let values = sample(strategy.union(self, ctx).filter(keep).boxed(), sampling);
        Self::check_coverage(ty, values, ctx)
    }

    /// A factory re-resolving `ty` from scratch in a snapshot of `ctx`.
    ///
    /// The snapshot carries the cycle guard as it is now, so sequences
    /// derived later cannot expand types that were in progress here.
    pub fn factory(&self, ty: &TypeDescriptor, ctx: &ResolutionContext) -> SequenceFactory<Value> {
        let resolver = self.clone();
        let ty = ty.clone();
        let snapshot = ctx.fork();
        sequence::factory(move || resolver.resolve(&ty, &mut snapshot.fork()))
    }

    /// Like [`Resolver::factory`], re-resolving through [`Resolver::resolve_where`]
    pub fn factory_where<P>(
        &self,
        ty: &TypeDescriptor,
        ctx: &ResolutionContext,
        keep: P,
    ) -> SequenceFactory<Value>
    where
        P: Fn(&Value) -> bool + Clone + 'static,
    {
        let resolver = self.clone();
        let ty = ty.clone();
        let snapshot = ctx.fork();
        sequence::factory(move || resolver.resolve_where(&ty, &mut snapshot.fork(), keep.clone()))
    }

    fn strategy_for(&self, ty: &TypeDescriptor, ctx: &ResolutionContext) -> Rc<dyn Strategy> {
        match self.find_strategy(ty, ctx.scope_chain()) {
            Some((key, strategy)) => {
                debug!(ty = %ty, scope = %key, "using registered strategy");
                strategy
            }
            None => Rc::new(BuiltinStrategy::for_type(ty, self.metadata())),
        }
    }

    fn check_coverage(
        ty: &TypeDescriptor,
        values: BoxedSequence<Value>,
        ctx: &mut ResolutionContext,
    ) -> BoxedSequence<Value> {
        if !values.has_element() {
            debug!(ty = %ty, "no candidate values");
            ctx.report(Diagnostic::NoCoverage { ty: ty.clone() });
        }
        values
    }

    /// Values for one constructor argument, resolved in a nested context
    pub fn argument(&self, ty: &TypeDescriptor, ctx: &mut ResolutionContext) -> Argument {
        let mut nested = ctx.nested();
        let values = self.resolve(ty, &mut nested);
        let factory = self.factory(ty, &nested);
        ctx.absorb(nested);
        Argument::Generated {
            ty: ty.clone(),
            values,
            factory,
        }
    }

    /// Default values of a structured type: null, then candidates for the
    /// type itself and each of its known subtypes.
    ///
    /// A type already being expanded further up yields only null. A type
    /// with no usable candidates yields nothing at all.
    pub fn structural_candidates(
        &self,
        ty: &TypeDescriptor,
        ctx: &mut ResolutionContext,
    ) -> BoxedSequence<Value> {
        let data_types = self.data_types(ty, ctx);
        let expanded = ctx.expand(ty, |ctx| {
            let mut parts = Vec::new();
            for data_type in &data_types {
                let candidates = if data_type == ty {
                    self.instantiations(data_type, ctx)
                } else {
                    self.subtype_candidates(data_type, ctx)
                };
                parts.extend(candidates.filter(|part| part.has_element()));
            }
            parts
        });
        let Some(mut parts) = expanded else {
            debug!(ty = %ty, "recursive occurrence truncated to null");
            ctx.report(Diagnostic::CycleTruncated { ty: ty.clone() });
            return once(Value::Null).boxed();
        };
        if parts.is_empty() {
            return empty().boxed();
        }
        parts.insert(0, once(Value::Null).boxed());
        concat(parts).boxed()
    }

    /// The type itself, its known subtypes, and referenced types assignable
    /// to it, without duplicates
    fn data_types(&self, ty: &TypeDescriptor, ctx: &ResolutionContext) -> Vec<TypeDescriptor> {
        let mut types = vec![ty.clone()];
        if self.config().use_subtypes {
            if let Some(info) = self.metadata().type_info(ty) {
                types.extend(info.subtypes.iter().cloned());
            }
            let hierarchy = self.metadata().hierarchy();
            types.extend(
                ctx.type_references()
                    .into_iter()
                    .filter(|reference| hierarchy.is_assignable(ty, reference)),
            );
        }
        let mut unique: Vec<TypeDescriptor> = Vec::with_capacity(types.len());
        for candidate in types {
            if !unique.contains(&candidate) {
                unique.push(candidate);
            }
        }
        unique
    }

    /// Values of a subtype: its registered strategy without nulls, or else
    /// its structural instantiations
    fn subtype_candidates(
        &self,
        subtype: &TypeDescriptor,
        ctx: &mut ResolutionContext,
    ) -> Option<BoxedSequence<Value>> {
        if let Some((key, strategy)) = self.find_strategy(subtype, ctx.scope_chain()) {
            debug!(ty = %subtype, scope = %key, "using registered strategy for subtype");
            let sampling = strategy.sampling().or(self.config().sampling);
            let values = strategy
                .union(self, ctx)
                .filter(|value| !value.is_null())
                .boxed();
            return Some(sample(values, sampling));
        }
        match ctx.expand(subtype, |ctx| self.instantiations(subtype, ctx)) {
            Some(candidates) => candidates,
            None => {
                ctx.report(Diagnostic::CycleTruncated {
                    ty: subtype.clone(),
                });
                None
            }
        }
    }

    /// Instances built through each accessible constructor of `ty`; the
    /// caller has marked `ty` in progress
    fn instantiations(
        &self,
        ty: &TypeDescriptor,
        ctx: &mut ResolutionContext,
    ) -> Option<BoxedSequence<Value>> {
        let info = self.metadata().type_info(ty)?;
        if !info.is_instantiable() {
            debug!(ty = %ty, "not instantiable");
            return None;
        }
        Some(concat(self.constructor_candidates(info, ctx)).boxed())
    }

    fn constructor_candidates(
        &self,
        info: &TypeInfo,
        ctx: &mut ResolutionContext,
    ) -> Vec<BoxedSequence<Value>> {
        let fallback = ctx.structural_fallback();
        let mut parts = Vec::new();
        for constructor in &info.constructors {
            if !fallback && constructor.arity() > 0 {
                continue;
            }
            let arguments = constructor
                .parameters
                .iter()
                .map(|parameter| self.argument(parameter, ctx))
                .collect();
            match Instantiator::new(info, arguments, self.metadata().hierarchy()) {
                Ok(instantiator) => parts.push(instantiator.into_sequence().boxed()),
                Err(error) => {
                    debug!(ty = %info.ty, %error, "dropping constructor candidate");
                    ctx.report(Diagnostic::from(&error));
                }
            }
        }
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StrategyCatalog;
    use crate::metadata::{ConstructorSignature, LiteralTable};
    use crate::strategy::CustomStrategy;
    use crate::types::PrimitiveKind;

    fn ty(name: &str) -> TypeDescriptor {
        TypeDescriptor::parse(name)
    }

    fn drain(seq: BoxedSequence<Value>) -> Vec<Value> {
        seq.into_values().collect()
    }

    fn node_metadata() -> UnitMetadata {
        UnitMetadata::new("graph.Graph").with_type(
            TypeInfo::new("graph.Node")
                .with_constructor(ConstructorSignature::new(&["graph.Node"])),
        )
    }

    #[test]
    fn test_registered_strategy_wins_by_chain_order() {
        let catalog = StrategyCatalog::new()
            .with_strategy(
                ScopeKey::Default,
                CustomStrategy::new("int")
                    .with_local_values(vec![Value::Int(1)])
                    .without_defaults(),
            )
            .with_strategy(
                ScopeKey::namespace("shapes"),
                CustomStrategy::new("int")
                    .with_local_values(vec![Value::Int(2)])
                    .without_defaults(),
            );
        let resolver = Resolver::new(UnitMetadata::new("shapes.Canvas"), catalog, GenerationConfig::default())
            .expect("valid config");

        let mut in_shapes = ResolutionContext::for_type(&ty("shapes.Canvas"));
        assert_eq!(drain(resolver.resolve(&ty("int"), &mut in_shapes)), vec![Value::Int(2)]);

        let mut elsewhere = ResolutionContext::for_type(&ty("other.Thing"));
        assert_eq!(drain(resolver.resolve(&ty("int"), &mut elsewhere)), vec![Value::Int(1)]);
    }

    #[test]
    fn test_self_reference_terminates_with_null() {
        let resolver = Resolver::new(node_metadata(), StrategyCatalog::new(), GenerationConfig::default())
            .expect("valid config");
        let node = ty("graph.Node");
        let mut ctx = ResolutionContext::for_type(&ty("graph.Graph"));
        let values = drain(resolver.resolve(&node, &mut ctx));

        assert_eq!(values.len(), 2);
        assert!(values[0].is_null());
        assert_eq!(values[1].to_string(), "new Node(null)");
        assert!(ctx.guard().is_empty());
        assert!(
            ctx.diagnostics()
                .contains(&Diagnostic::CycleTruncated { ty: node })
        );
    }

    #[test]
    fn test_recursion_through_supertype_terminates() {
        let metadata = UnitMetadata::new("shapes.Canvas")
            .with_type(TypeInfo::abstract_type("shapes.Shape").with_subtype("shapes.Group"))
            .with_type(
                TypeInfo::new("shapes.Group")
                    .with_constructor(ConstructorSignature::new(&["shapes.Shape"])),
            );
        let resolver = Resolver::new(metadata, StrategyCatalog::new(), GenerationConfig::default())
            .expect("valid config");
        let mut ctx = ResolutionContext::for_type(&ty("shapes.Canvas"));
        let rendered: Vec<String> = drain(resolver.resolve(&ty("shapes.Shape"), &mut ctx))
            .iter()
            .map(Value::to_string)
            .collect();
        assert_eq!(rendered, vec!["null", "new Group(null)"]);
        assert!(ctx.guard().is_empty());
    }

    #[test]
    fn test_factory_rederives_identical_sequences() {
        let resolver = Resolver::new(node_metadata(), StrategyCatalog::new(), GenerationConfig::default())
            .expect("valid config");
        let ctx = ResolutionContext::for_type(&ty("graph.Graph"));
        let make = resolver.factory(&ty("graph.Node"), &ctx);
        assert_eq!(drain(make()), drain(make()));
    }

    #[test]
    fn test_abstract_type_without_subtypes_has_no_coverage() {
        let metadata = UnitMetadata::new("shapes.Canvas")
            .with_type(TypeInfo::abstract_type("shapes.Shape"));
        let resolver = Resolver::new(metadata, StrategyCatalog::new(), GenerationConfig::default())
            .expect("valid config");
        let shape = ty("shapes.Shape");
        let mut ctx = ResolutionContext::for_type(&ty("shapes.Canvas"));

        assert!(!resolver.resolve(&shape, &mut ctx).has_element());
        assert_eq!(ctx.diagnostics(), &[Diagnostic::NoCoverage { ty: shape }]);
    }

    #[test]
    fn test_subtypes_and_type_references() {
        let metadata = UnitMetadata::new("shapes.Canvas")
            .with_type(TypeInfo::abstract_type("shapes.Shape").with_subtype("shapes.Square"))
            .with_type(TypeInfo::new("shapes.Square").with_constructor(ConstructorSignature::new(&[])))
            .with_type(
                TypeInfo::new("shapes.Circle")
                    .with_supertype("shapes.Shape")
                    .with_constructor(ConstructorSignature::new(&[])),
            );
        let resolver = Resolver::new(metadata, StrategyCatalog::new(), GenerationConfig::default())
            .expect("valid config");
        let mut ctx = ResolutionContext::for_type(&ty("shapes.Canvas"))
            .with_type_literals(LiteralTable::new().with_type_reference("shapes.Circle"));

        let rendered: Vec<String> = drain(resolver.resolve(&ty("shapes.Shape"), &mut ctx))
            .iter()
            .map(Value::to_string)
            .collect();
        assert_eq!(rendered, vec!["null", "new Square()", "new Circle()"]);

        let without_subtypes = Resolver::new(
            resolver.metadata().clone(),
            StrategyCatalog::new(),
            GenerationConfig::default().with_subtypes(false),
        )
        .expect("valid config");
        let mut ctx = ResolutionContext::for_type(&ty("shapes.Canvas"));
        assert!(!without_subtypes.resolve(&ty("shapes.Shape"), &mut ctx).has_element());
    }

    #[test]
    fn test_without_fallback_only_nullary_constructors() {
        let metadata = UnitMetadata::new("Canvas").with_type(
            TypeInfo::new("Point")
                .with_constructor(ConstructorSignature::new(&["int", "int"]))
                .with_constructor(ConstructorSignature::new(&[])),
        );
        let resolver = Resolver::new(metadata, StrategyCatalog::new(), GenerationConfig::default())
            .expect("valid config");

        let mut with_fallback = ResolutionContext::for_type(&ty("Canvas"));
        // null + 9 two-int points + the nullary point
        assert_eq!(drain(resolver.resolve(&ty("Point"), &mut with_fallback)).len(), 11);

        let mut without = ResolutionContext::for_type(&ty("Canvas")).with_structural_fallback(false);
        let rendered: Vec<String> = drain(resolver.resolve(&ty("Point"), &mut without))
            .iter()
            .map(Value::to_string)
            .collect();
        assert_eq!(rendered, vec!["null", "new Point()"]);
    }

    #[test]
    fn test_ambiguous_constructor_is_dropped_and_reported() {
        let metadata = UnitMetadata::new("Canvas")
            .with_wrapper(PrimitiveKind::Int, "Integer")
            .with_type(
                TypeInfo::new("Amb")
                    .with_constructor(ConstructorSignature::new(&["int"]))
                    .with_constructor(ConstructorSignature::new(&["Integer"])),
            );
        let resolver = Resolver::new(metadata, StrategyCatalog::new(), GenerationConfig::default())
            .expect("valid config");
        let mut ctx = ResolutionContext::for_type(&ty("Canvas"));

        assert!(!resolver.resolve(&ty("Amb"), &mut ctx).has_element());
        assert!(ctx.diagnostics().contains(&Diagnostic::AmbiguousConstructor {
            ty: ty("Amb"),
            count: 2
        }));
        assert!(ctx.diagnostics().contains(&Diagnostic::NoCoverage { ty: ty("Amb") }));
    }
}
