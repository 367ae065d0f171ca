//! # casegen - Combinatorial Test-Input Generation
//!
//! casegen decides which argument tuples to try when exercising the
//! operations of a unit under test. Per-type strategies are resolved through
//! a chain of scopes, structured types without a strategy are built from
//! their constructors (with a cycle guard stopping recursive types), and the
//! per-parameter sequences are combined lazily in an odometer-ordered
//! Cartesian product.
//!
//! ## Quick Start
//!
//! ```rust
//! use casegen::{GenerationConfig, OperationInfo, StrategyCatalog, TupleEngine, UnitMetadata};
//!
//! let metadata = UnitMetadata::new("demo.Switch")
//!     .with_operation(OperationInfo::static_method("toggle", &["boolean", "boolean"]));
//! let engine = TupleEngine::new(metadata, StrategyCatalog::new(), GenerationConfig::default())
//!     .expect("default config is valid");
//!
//! let tuples = engine.tuples_for("toggle(boolean,boolean)").expect("operation exists");
//! assert_eq!(tuples.into_iter().count(), 4);
//! ```

pub mod array;
pub mod catalog;
pub mod combinators;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod guard;
pub mod instantiator;
pub mod metadata;
pub mod product;
pub mod resolver;
pub mod sequence;
pub mod strategy;
pub mod types;
pub mod value;

// Re-export the main public API
pub use array::ArraySequence;
pub use catalog::{Scope, ScopeKey, StrategyCatalog, StrategyLookup};
pub use combinators::{Concat, Filtered, Mapped, Sampled, concat};
pub use config::{ConfigError, DEFAULT_MAX_ARRAY_LENGTH, GenerationConfig, SamplingConfig};
pub use context::ResolutionContext;
pub use engine::{
    CandidateSequence, CandidateTuple, OperationTuples, TupleEngine, TupleLayout, TuplePosition,
};
pub use error::{
    ConstructionFailure, Diagnostic, EmptyStateError, GenerationError, InstantiationError,
};
pub use guard::CycleGuard;
pub use instantiator::{Argument, InstantiationSequence, Instantiator};
pub use metadata::{
    ConstructFn, ConstructorSignature, LiteralTable, OperationInfo, OperationKind, ParameterSlot,
    TypeHierarchy, TypeInfo, UnitMetadata,
};
pub use product::CartesianProduct;
pub use resolver::Resolver;
pub use sequence::{
    BoxedSequence, SequenceFactory, ValueSequence, empty, factory, from_iter, from_vec, once,
    repeat_vec,
};
pub use strategy::{BuiltinStrategy, CustomStrategy, Strategy};
pub use types::{PrimitiveKind, TypeDescriptor};
pub use value::{Instance, Value, boundary_values};
