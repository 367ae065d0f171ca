//! Candidate tuples for the operations of a unit under test.
//!
//! For each operation the engine resolves one value sequence per parameter
//! slot, plus a receiver sequence for instance methods, and combines them in
//! a lazy Cartesian product.

use tracing::debug;

use crate::catalog::StrategyLookup;
use crate::config::GenerationConfig;
use crate::context::ResolutionContext;
use crate::error::{Diagnostic, EmptyStateError, GenerationError};
use crate::metadata::{LiteralTable, OperationInfo, ParameterSlot, UnitMetadata};
use crate::product::CartesianProduct;
use crate::resolver::Resolver;
use crate::sequence::{BoxedSequence, SequenceFactory, SequenceIter, ValueSequence};
use crate::types::TypeDescriptor;
use crate::value::Value;

/// What one position of a candidate tuple stands for.
#[derive(Debug, Clone, PartialEq)]
pub enum TuplePosition {
    /// The instance the operation is invoked on
    Receiver(TypeDescriptor),
    Parameter(ParameterSlot),
}

/// Maps positions of the flat tuple back to the receiver and parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TupleLayout {
    positions: Vec<TuplePosition>,
}

impl TupleLayout {
    pub fn positions(&self) -> &[TuplePosition] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn has_receiver(&self) -> bool {
        matches!(self.positions.first(), Some(TuplePosition::Receiver(_)))
    }
}

/// One invocation to test: an optional receiver and an argument per
/// parameter slot.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateTuple {
    pub receiver: Option<Value>,
    pub arguments: Vec<Value>,
}

/// The lazy sequence of candidate tuples of one operation.
pub struct CandidateSequence {
    product: CartesianProduct<Value>,
    has_receiver: bool,
}

impl ValueSequence for CandidateSequence {
    type Item = CandidateTuple;

    fn has_element(&self) -> bool {
        self.product.has_element()
    }

    fn element(&self) -> Result<CandidateTuple, EmptyStateError> {
        let mut values = self.product.element()?;
        let receiver = if self.has_receiver && !values.is_empty() {
            Some(values.remove(0))
        } else {
            None
        };
        Ok(CandidateTuple {
            receiver,
            arguments: values,
        })
    }

    fn advance(&mut self) {
        self.product.advance()
    }
}

/// Everything generated for one operation.
pub struct OperationTuples {
    /// Id of the operation
    pub operation: String,
    pub layout: TupleLayout,
    /// Non-fatal conditions found while resolving the first sequences
    pub diagnostics: Vec<Diagnostic>,
    pub tuples: CandidateSequence,
    no_coverage: bool,
}

impl OperationTuples {
    /// Whether resolution found no values for some position, so no tuple
    /// was ever available. Unaffected by consuming `tuples`.
    pub fn has_no_coverage(&self) -> bool {
        self.no_coverage
    }
}

impl IntoIterator for OperationTuples {
    type Item = CandidateTuple;
    type IntoIter = SequenceIter<CandidateSequence>;

    fn into_iter(self) -> Self::IntoIter {
        self.tuples.into_values()
    }
}

/// Generates candidate tuples for the operations of one unit under test.
#[derive(Clone)]
pub struct TupleEngine {
    resolver: Resolver,
}

impl TupleEngine {
    pub fn new(
        metadata: UnitMetadata,
        lookup: impl StrategyLookup + 'static,
        config: GenerationConfig,
    ) -> Result<Self, GenerationError> {
        Ok(Self {
            resolver: Resolver::new(metadata, lookup, config)?,
        })
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Candidate tuples for one operation
    pub fn tuples(&self, operation: &OperationInfo) -> Result<OperationTuples, GenerationError> {
        validate_slots(operation)?;
        let declaring = self.resolver.metadata().declaring.clone();
        let fallback = self.resolver.config().structural_fallback;
        let type_literals = self.declaring_literals();
        let operation_literals = self.enabled_literals(&operation.literals, &operation.spec_literals);

        let mut positions = Vec::with_capacity(operation.parameters.len() + 1);
        let mut dimensions = Vec::with_capacity(positions.capacity());
        let mut factories = Vec::with_capacity(positions.capacity());
        let mut diagnostics = Vec::new();

        let has_receiver = operation.kind.needs_receiver();
        if has_receiver {
            let mut ctx = ResolutionContext::for_type(&declaring)
                .with_structural_fallback(fallback)
                .with_type_literals(type_literals.clone());
            let (values, factory) = self.receiver_dimension(&declaring, &mut ctx);
            positions.push(TuplePosition::Receiver(declaring.clone()));
            dimensions.push(values);
            factories.push(factory);
            diagnostics.extend(ctx.take_diagnostics());
        }

        for slot in &operation.parameters {
            let mut ctx = ResolutionContext::for_parameter(&declaring, &operation.id, slot.ordinal)
                .with_structural_fallback(fallback)
                .with_operation_literals(operation_literals.clone())
                .with_type_literals(type_literals.clone());
            dimensions.push(self.resolver.resolve(&slot.ty, &mut ctx));
            factories.push(self.resolver.factory(&slot.ty, &ctx));
            positions.push(TuplePosition::Parameter(slot.clone()));
            diagnostics.extend(ctx.take_diagnostics());
        }

        let tuples = CandidateSequence {
            product: CartesianProduct::with_initial(dimensions, factories),
            has_receiver,
        };
        let no_coverage = !tuples.has_element();
        debug!(
            operation = %operation.id,
            positions = positions.len(),
            diagnostics = diagnostics.len(),
            empty = no_coverage,
            "prepared candidate tuples"
        );
        Ok(OperationTuples {
            operation: operation.id.clone(),
            layout: TupleLayout { positions },
            diagnostics,
            tuples,
            no_coverage,
        })
    }

    /// Candidate tuples for the operation with the given id
    pub fn tuples_for(&self, id: &str) -> Result<OperationTuples, GenerationError> {
        let operation = self
            .resolver
            .metadata()
            .operation(id)
            .ok_or_else(|| GenerationError::UnknownOperation(id.to_string()))?;
        self.tuples(operation)
    }

    /// Candidate tuples for every operation, in declaration order
    pub fn all_tuples(&self) -> Result<Vec<OperationTuples>, GenerationError> {
        self.resolver
            .metadata()
            .operations
            .iter()
            .map(|operation| self.tuples(operation))
            .collect()
    }

    /// Receivers are never null
    fn receiver_dimension(
        &self,
        declaring: &TypeDescriptor,
        ctx: &mut ResolutionContext,
    ) -> (BoxedSequence<Value>, SequenceFactory<Value>) {
        let non_null = |value: &Value| !value.is_null();
        let values = self.resolver.resolve_where(declaring, ctx, non_null);
        let factory = self.resolver.factory_where(declaring, ctx, non_null);
        (values, factory)
    }

    fn enabled_literals(&self, code: &LiteralTable, spec: &LiteralTable) -> LiteralTable {
        let config = self.resolver.config();
        let mut literals = LiteralTable::new();
        if config.use_literals {
            literals.merge(code);
        }
        if config.use_spec_literals {
            literals.merge(spec);
        }
        literals
    }

    fn declaring_literals(&self) -> LiteralTable {
        match self.resolver.metadata().declaring_info() {
            Some(info) => self.enabled_literals(&info.literals, &info.spec_literals),
            None => LiteralTable::new(),
        }
    }
}

fn validate_slots(operation: &OperationInfo) -> Result<(), GenerationError> {
    for (index, slot) in operation.parameters.iter().enumerate() {
        if slot.ordinal != index {
            return Err(GenerationError::malformed_slots(
                &operation.id,
                format!("slot {} has ordinal {}", index, slot.ordinal),
            ));
        }
        if slot.operation != operation.id {
            return Err(GenerationError::malformed_slots(
                &operation.id,
                format!("slot {} belongs to {}", index, slot.operation),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ScopeKey, StrategyCatalog};
    use crate::metadata::{ConstructorSignature, TypeInfo};
    use crate::strategy::CustomStrategy;

    fn counter_metadata() -> UnitMetadata {
        UnitMetadata::new("Counter")
            .with_type(TypeInfo::new("Counter").with_constructor(ConstructorSignature::new(&[])))
            .with_operation(OperationInfo::method("add", &["boolean"]))
            .with_operation(OperationInfo::static_method("parse", &["boolean", "boolean"]))
            .with_operation(OperationInfo::constructor("Counter", &[]))
    }

    fn engine(metadata: UnitMetadata) -> TupleEngine {
        TupleEngine::new(metadata, StrategyCatalog::new(), GenerationConfig::default())
            .expect("valid config")
    }

    #[test]
    fn test_method_gets_non_null_receiver() {
        let tuples = engine(counter_metadata())
            .tuples_for("add(boolean)")
            .expect("known operation");
        assert!(tuples.layout.has_receiver());
        assert_eq!(tuples.layout.len(), 2);

        let all: Vec<CandidateTuple> = tuples.into_iter().collect();
        assert_eq!(all.len(), 2);
        for tuple in &all {
            let receiver = tuple.receiver.as_ref().expect("receiver present");
            assert_eq!(receiver.to_string(), "new Counter()");
        }
        assert_eq!(all[0].arguments, vec![Value::Boolean(false)]);
    }

    #[test]
    fn test_static_and_constructor_operations_have_no_receiver() {
        let engine = engine(counter_metadata());
        let parse = engine.tuples_for("parse(boolean,boolean)").expect("known operation");
        assert!(!parse.layout.has_receiver());
        let all: Vec<CandidateTuple> = parse.into_iter().collect();
        assert_eq!(all.len(), 4);
        assert!(all.iter().all(|tuple| tuple.receiver.is_none()));

        let constructor = engine.tuples_for("Counter()").expect("known operation");
        assert!(constructor.layout.is_empty());
        assert_eq!(constructor.into_iter().count(), 1);
    }

    #[test]
    fn test_unknown_operation() {
        let result = engine(counter_metadata()).tuples_for("missing()");
        assert!(matches!(result, Err(GenerationError::UnknownOperation(id)) if id == "missing()"));
    }

    #[test]
    fn test_malformed_slots_are_rejected() {
        let mut op = OperationInfo::static_method("f", &["int", "int"]);
        op.parameters[1].ordinal = 3;
        let result = engine(counter_metadata()).tuples(&op);
        assert!(matches!(result, Err(GenerationError::MalformedSlots { .. })));

        let mut foreign = OperationInfo::static_method("g", &["int"]);
        foreign.parameters[0].operation = "h(int)".to_string();
        assert!(engine(counter_metadata()).tuples(&foreign).is_err());
    }

    #[test]
    fn test_all_tuples_in_declaration_order() {
        let all = engine(counter_metadata()).all_tuples().expect("valid metadata");
        let ids: Vec<&str> = all.iter().map(|tuples| tuples.operation.as_str()).collect();
        assert_eq!(ids, vec!["add(boolean)", "parse(boolean,boolean)", "Counter()"]);
    }

    #[test]
    fn test_literal_flags() {
        let metadata = UnitMetadata::new("Counter")
            .with_type(TypeInfo::new("Counter").with_literals(LiteralTable::new().with("int", "10")))
            .with_operation(
                OperationInfo::static_method("step", &["int"])
                    .with_literals(LiteralTable::new().with("int", "7"))
                    .with_spec_literals(LiteralTable::new().with("int", "99")),
            );

        let with_all = TupleEngine::new(metadata.clone(), StrategyCatalog::new(), GenerationConfig::default())
            .expect("valid config");
        let values: Vec<Value> = with_all
            .tuples_for("step(int)")
            .expect("known operation")
            .into_iter()
            .map(|tuple| tuple.arguments[0].clone())
            .collect();
        assert_eq!(&values[3..], &[Value::Int(7), Value::Int(99), Value::Int(10)]);

        let code_only = TupleEngine::new(
            metadata,
            StrategyCatalog::new(),
            GenerationConfig::default()
                .with_spec_literals(false)
                .with_literals(true),
        )
        .expect("valid config");
        let count = code_only
            .tuples_for("step(int)")
            .expect("known operation")
            .into_iter()
            .count();
        assert_eq!(count, 5);
    }

    #[test]
    fn test_sampling_keeps_a_receiver() {
        for seed in 0..20 {
            let config = GenerationConfig::default()
                .with_sampling(0.1, seed)
                .expect("valid sampling");
            let engine = TupleEngine::new(counter_metadata(), StrategyCatalog::new(), config)
                .expect("valid config");
            let tuples = engine.tuples_for("add(boolean)").expect("known operation");
            assert!(!tuples.has_no_coverage(), "seed {} lost coverage", seed);

            let all: Vec<CandidateTuple> = tuples.into_iter().collect();
            assert!(!all.is_empty(), "seed {} produced no tuples", seed);
            for tuple in &all {
                let receiver = tuple.receiver.as_ref().expect("receiver present");
                assert_eq!(receiver.to_string(), "new Counter()");
            }
        }
    }

    #[test]
    fn test_null_only_receiver_reports_no_coverage() {
        let catalog = StrategyCatalog::new().with_strategy(
            ScopeKey::Default,
            CustomStrategy::new("Counter")
                .with_type_values(vec![Value::Null])
                .without_defaults(),
        );
        let engine = TupleEngine::new(counter_metadata(), catalog, GenerationConfig::default())
            .expect("valid config");
        let tuples = engine.tuples_for("add(boolean)").expect("known operation");
        assert!(tuples.has_no_coverage());
        assert!(tuples.diagnostics.contains(&Diagnostic::NoCoverage {
            ty: TypeDescriptor::parse("Counter"),
        }));
        assert_eq!(tuples.into_iter().count(), 0);
    }

    #[test]
    fn test_coverage_survives_consumption() {
        let mut parse = engine(counter_metadata())
            .tuples_for("parse(boolean,boolean)")
            .expect("known operation");
        while parse.tuples.has_element() {
            parse.tuples.advance();
        }
        assert!(!parse.has_no_coverage());
    }
}
