//! Building structured candidates from constructor signatures.
//!
//! Given argument sequences for one constructor shape, the instantiator picks
//! the single constructor that accepts them, checks that it actually works on
//! the first argument tuple, and then enumerates one instance per tuple.

use std::fmt;

use tracing::trace;

use crate::error::{ConstructionFailure, EmptyStateError, InstantiationError};
use crate::metadata::{ConstructFn, TypeHierarchy, TypeInfo};
use crate::product::CartesianProduct;
use crate::sequence::{BoxedSequence, SequenceFactory, ValueSequence, once, repeat_vec};
use crate::types::TypeDescriptor;
use crate::value::{Instance, Value};

/// One constructor argument position.
pub enum Argument {
    /// A single fixed value
    Concrete(Value),
    /// Values of a declared type, with a factory to restart them
    Generated {
        ty: TypeDescriptor,
        values: BoxedSequence<Value>,
        factory: SequenceFactory<Value>,
    },
}

impl Argument {
    /// A generated argument whose first sequence comes from the factory
    pub fn generated(ty: impl Into<TypeDescriptor>, factory: SequenceFactory<Value>) -> Self {
        Argument::Generated {
            ty: ty.into(),
            values: factory(),
            factory,
        }
    }

    /// The static type used for constructor matching; `None` for null
    pub fn argument_type(&self) -> Option<TypeDescriptor> {
        match self {
            Argument::Concrete(value) => value.type_descriptor(),
            Argument::Generated { ty, .. } => Some(ty.clone()),
        }
    }

    fn fits(&self, parameter: &TypeDescriptor, hierarchy: &TypeHierarchy) -> bool {
        match self.argument_type() {
            Some(ty) => hierarchy.is_assignable(parameter, &ty),
            None => parameter.is_nullable(),
        }
    }

    fn into_dimension(self) -> (BoxedSequence<Value>, SequenceFactory<Value>) {
        match self {
            Argument::Concrete(value) => (once(value.clone()).boxed(), repeat_vec(vec![value])),
            Argument::Generated {
                values, factory, ..
            } => (values, factory),
        }
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Concrete(value) => f.debug_tuple("Concrete").field(value).finish(),
            Argument::Generated { ty, .. } => {
                f.debug_struct("Generated").field("ty", ty).finish_non_exhaustive()
            }
        }
    }
}

fn describe(arguments: &[Argument]) -> String {
    arguments
        .iter()
        .map(|argument| match argument.argument_type() {
            Some(ty) => ty.to_string(),
            None => "null".to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Builds one value for an argument tuple, through the host hook if present
#[derive(Clone)]
struct Builder {
    ty: TypeDescriptor,
    constructor: usize,
    construct: Option<ConstructFn>,
}

impl Builder {
    fn build(&self, arguments: &[Value]) -> Result<Value, ConstructionFailure> {
        match &self.construct {
            Some(construct) => construct(arguments),
            None => Ok(Value::Object(Instance {
                ty: self.ty.clone(),
                constructor: self.constructor,
                arguments: arguments.to_vec(),
            })),
        }
    }
}

/// A constructor choice validated against its first argument tuple.
pub struct Instantiator {
    builder: Builder,
    product: CartesianProduct<Value>,
    first: Value,
}

impl Instantiator {
    /// Match `arguments` against the constructors of `target`.
    ///
    /// Exactly one constructor must accept them. The chosen one is invoked
    /// once on the first argument tuple so an unusable constructor is caught
    /// here rather than during enumeration.
    pub fn new(
        target: &TypeInfo,
        arguments: Vec<Argument>,
        hierarchy: &TypeHierarchy,
    ) -> Result<Self, InstantiationError> {
        let matching: Vec<usize> = target
            .constructors
            .iter()
            .enumerate()
            .filter(|(_, constructor)| {
                constructor.arity() == arguments.len()
                    && constructor
                        .parameters
                        .iter()
                        .zip(&arguments)
                        .all(|(parameter, argument)| argument.fits(parameter, hierarchy))
            })
            .map(|(index, _)| index)
            .collect();

        let constructor = match matching.as_slice() {
            [only] => *only,
            [] => {
                return Err(InstantiationError::NoMatchingConstructor {
                    ty: target.ty.clone(),
                    arguments: describe(&arguments),
                });
            }
            several => {
                return Err(InstantiationError::AmbiguousConstructor {
                    ty: target.ty.clone(),
                    count: several.len(),
                    arguments: describe(&arguments),
                });
            }
        };

        let builder = Builder {
            ty: target.ty.clone(),
            constructor,
            construct: target.constructors[constructor].construct_hook().cloned(),
        };
        let (dimensions, factories): (Vec<_>, Vec<_>) =
            arguments.into_iter().map(Argument::into_dimension).unzip();
        let product = CartesianProduct::with_initial(dimensions, factories);

        let tuple = product
            .element()
            .map_err(|EmptyStateError| InstantiationError::NoArguments {
                ty: target.ty.clone(),
                constructor,
            })?;
        let first = builder
            .build(&tuple)
            .map_err(|failure| InstantiationError::ConstructionFailed {
                ty: target.ty.clone(),
                constructor,
                failure,
            })?;

        Ok(Self {
            builder,
            product,
            first,
        })
    }

    /// Index of the chosen constructor
    pub fn constructor(&self) -> usize {
        self.builder.constructor
    }

    /// Enumerate one instance per argument tuple
    pub fn into_sequence(self) -> InstantiationSequence {
        InstantiationSequence {
            builder: self.builder,
            product: self.product,
            current: Some(self.first),
        }
    }
}

/// Instances of one constructor over the product of its argument values.
///
/// Tuples the constructor rejects are skipped.
pub struct InstantiationSequence {
    builder: Builder,
    product: CartesianProduct<Value>,
    current: Option<Value>,
}

impl ValueSequence for InstantiationSequence {
    type Item = Value;

    fn has_element(&self) -> bool {
        self.current.is_some()
    }

    fn element(&self) -> Result<Value, EmptyStateError> {
        self.current.clone().ok_or(EmptyStateError)
    }

    fn advance(&mut self) {
        if self.current.take().is_none() {
            return;
        }
        loop {
            self.product.advance();
            let Ok(tuple) = self.product.element() else {
                return;
            };
            match self.builder.build(&tuple) {
                Ok(value) => {
                    self.current = Some(value);
                    return;
                }
                Err(failure) => trace!(ty = %self.builder.ty, %failure, "skipping rejected tuple"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ConstructorSignature;
    use crate::types::PrimitiveKind;

    fn ty(name: &str) -> TypeDescriptor {
        TypeDescriptor::parse(name)
    }

    fn ints(values: Vec<i32>) -> Argument {
        Argument::generated("int", repeat_vec(values.into_iter().map(Value::Int).collect()))
    }

    fn boxing() -> TypeHierarchy {
        let mut hierarchy = TypeHierarchy::new();
        hierarchy.add_wrapper(PrimitiveKind::Int, &ty("Integer"));
        hierarchy
    }

    #[test]
    fn test_single_match_enumerates_product() {
        let point = TypeInfo::new("Point").with_constructor(ConstructorSignature::new(&["int", "int"]));
        let instantiator = Instantiator::new(&point, vec![ints(vec![1, 2]), ints(vec![3])], &TypeHierarchy::new())
            .expect("one constructor matches");
        assert_eq!(instantiator.constructor(), 0);
        let rendered: Vec<String> = instantiator
            .into_sequence()
            .into_values()
            .map(|value| value.to_string())
            .collect();
        assert_eq!(rendered, vec!["new Point(1, 3)", "new Point(2, 3)"]);
    }

    #[test]
    fn test_boxing_makes_overloads_ambiguous() {
        let amb = TypeInfo::new("Amb")
            .with_constructor(ConstructorSignature::new(&["int"]))
            .with_constructor(ConstructorSignature::new(&["Integer"]));
        let result = Instantiator::new(&amb, vec![ints(vec![1])], &boxing());
        assert!(matches!(
            result,
            Err(InstantiationError::AmbiguousConstructor { count: 2, .. })
        ));

        // without the wrapper registered only the exact overload matches
        let exact = Instantiator::new(&amb, vec![ints(vec![1])], &TypeHierarchy::new())
            .expect("exact match");
        assert_eq!(exact.constructor(), 0);
    }

    #[test]
    fn test_null_matches_only_nullable_parameters() {
        let holder = TypeInfo::new("Holder")
            .with_constructor(ConstructorSignature::new(&["int"]))
            .with_constructor(ConstructorSignature::new(&["String"]));
        let chosen = Instantiator::new(&holder, vec![Argument::Concrete(Value::Null)], &TypeHierarchy::new())
            .expect("only String accepts null");
        assert_eq!(chosen.constructor(), 1);

        let none = Instantiator::new(&holder, vec![Argument::Concrete(Value::Long(1))], &TypeHierarchy::new());
        assert!(matches!(
            none,
            Err(InstantiationError::NoMatchingConstructor { .. })
        ));
    }

    #[test]
    fn test_eager_validation_rejects_unusable_constructor() {
        let strict = TypeInfo::new("Strict").with_constructor(
            ConstructorSignature::new(&["int"])
                .with_construct(|_| Err(ConstructionFailure::new("always rejects"))),
        );
        let result = Instantiator::new(&strict, vec![ints(vec![1, 2])], &TypeHierarchy::new());
        assert!(matches!(
            result,
            Err(InstantiationError::ConstructionFailed { constructor: 0, .. })
        ));
    }

    #[test]
    fn test_rejected_tuples_are_skipped() {
        let positive = TypeInfo::new("Positive").with_constructor(
            ConstructorSignature::new(&["int"]).with_construct(|args| match args {
                [Value::Int(n)] if *n > 0 => Ok(Value::Int(*n)),
                _ => Err(ConstructionFailure::new("not positive")),
            }),
        );
        let values: Vec<Value> = Instantiator::new(&positive, vec![ints(vec![1, -1, 0, 5])], &TypeHierarchy::new())
            .expect("first tuple is valid")
            .into_sequence()
            .into_values()
            .collect();
        assert_eq!(values, vec![Value::Int(1), Value::Int(5)]);
    }

    #[test]
    fn test_empty_argument_is_reported() {
        let point = TypeInfo::new("Point").with_constructor(ConstructorSignature::new(&["int"]));
        let result = Instantiator::new(&point, vec![ints(vec![])], &TypeHierarchy::new());
        assert!(matches!(
            result,
            Err(InstantiationError::NoArguments { constructor: 0, .. })
        ));
    }

    #[test]
    fn test_nullary_constructor_yields_one_instance() {
        let unit = TypeInfo::new("Unit").with_constructor(ConstructorSignature::new(&[]));
        let values: Vec<Value> = Instantiator::new(&unit, Vec::new(), &TypeHierarchy::new())
            .expect("nullary constructor")
            .into_sequence()
            .into_values()
            .collect();
        assert_eq!(values.len(), 1);
    }
}
