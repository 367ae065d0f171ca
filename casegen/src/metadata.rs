//! The metadata contract consumed from source analysis.
//!
//! Everything here is plain data populated once per unit under test. The only
//! behavior is the [`TypeHierarchy`] assignability check used when matching
//! constructor overloads.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ConstructionFailure;
use crate::types::{PrimitiveKind, TypeDescriptor};
use crate::value::Value;

/// What an operation is, which decides whether it needs a receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OperationKind {
    Constructor,
    Method,
    StaticMethod,
}

impl OperationKind {
    pub fn needs_receiver(self) -> bool {
        matches!(self, OperationKind::Method)
    }
}

/// One declared parameter of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParameterSlot {
    /// Id of the owning operation
    pub operation: String,
    pub ty: TypeDescriptor,
    pub ordinal: usize,
    pub name: String,
}

/// Literal constants found in code or specifications, partitioned by the
/// name of their type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LiteralTable {
    values: BTreeMap<String, BTreeSet<String>>,
    /// Types named by type literals (e.g. `Circle.class`)
    type_references: BTreeSet<String>,
}

impl LiteralTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a literal of the given type
    pub fn insert(&mut self, ty: &TypeDescriptor, literal: impl Into<String>) {
        self.values
            .entry(ty.qualified_name().to_string())
            .or_default()
            .insert(literal.into());
    }

    /// Record a literal reference to a type
    pub fn insert_type_reference(&mut self, ty: &TypeDescriptor) {
        self.type_references.insert(ty.to_string());
    }

    /// Builder form of [`LiteralTable::insert`]
    pub fn with(mut self, ty: &str, literal: impl Into<String>) -> Self {
        self.insert(&TypeDescriptor::parse(ty), literal);
        self
    }

    /// Builder form of [`LiteralTable::insert_type_reference`]
    pub fn with_type_reference(mut self, ty: &str) -> Self {
        self.insert_type_reference(&TypeDescriptor::parse(ty));
        self
    }

    /// Literal texts recorded for a non-array type, in sorted order
    pub fn literals_for(&self, ty: &TypeDescriptor) -> impl Iterator<Item = &str> {
        self.values
            .get(ty.qualified_name())
            .filter(|_| !ty.is_array())
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    pub fn type_references(&self) -> impl Iterator<Item = TypeDescriptor> + '_ {
        self.type_references.iter().map(|name| TypeDescriptor::parse(name))
    }

    /// Fold another table into this one
    pub fn merge(&mut self, other: &LiteralTable) {
        for (ty, literals) in &other.values {
            self.values
                .entry(ty.clone())
                .or_default()
                .extend(literals.iter().cloned());
        }
        self.type_references
            .extend(other.type_references.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.type_references.is_empty()
    }
}

/// A testable operation of the unit under test.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OperationInfo {
    /// Unique id, typically the name plus signature
    pub id: String,
    pub name: String,
    pub kind: OperationKind,
    pub parameters: Vec<ParameterSlot>,
    /// Literals found in the operation body
    #[cfg_attr(feature = "serde", serde(default))]
    pub literals: LiteralTable,
    /// Literals found in the operation's specification
    #[cfg_attr(feature = "serde", serde(default))]
    pub spec_literals: LiteralTable,
}

impl OperationInfo {
    /// Create an operation with parameters of the given types, named
    /// `p0, p1, ...` and numbered in order. The id is the name followed by
    /// the parameter types.
    pub fn new(name: &str, kind: OperationKind, parameter_types: &[&str]) -> Self {
        let id = format!("{}({})", name, parameter_types.join(","));
        let parameters = parameter_types
            .iter()
            .enumerate()
            .map(|(ordinal, ty)| ParameterSlot {
                operation: id.clone(),
                ty: TypeDescriptor::parse(ty),
                ordinal,
                name: format!("p{}", ordinal),
            })
            .collect();
        Self {
            id,
            name: name.to_string(),
            kind,
            parameters,
            literals: LiteralTable::new(),
            spec_literals: LiteralTable::new(),
        }
    }

    pub fn constructor(name: &str, parameter_types: &[&str]) -> Self {
        Self::new(name, OperationKind::Constructor, parameter_types)
    }

    pub fn method(name: &str, parameter_types: &[&str]) -> Self {
        Self::new(name, OperationKind::Method, parameter_types)
    }

    pub fn static_method(name: &str, parameter_types: &[&str]) -> Self {
        Self::new(name, OperationKind::StaticMethod, parameter_types)
    }

    pub fn with_literals(mut self, literals: LiteralTable) -> Self {
        self.literals = literals;
        self
    }

    pub fn with_spec_literals(mut self, literals: LiteralTable) -> Self {
        self.spec_literals = literals;
        self
    }
}

/// Host hook that performs (or validates) a constructor call.
pub type ConstructFn = Rc<dyn Fn(&[Value]) -> Result<Value, ConstructionFailure>>;

/// A captured constructor signature.
#[derive(Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConstructorSignature {
    pub parameters: Vec<TypeDescriptor>,
    #[cfg_attr(feature = "serde", serde(skip))]
    construct: Option<ConstructFn>,
}

impl ConstructorSignature {
    pub fn new(parameter_types: &[&str]) -> Self {
        Self {
            parameters: parameter_types
                .iter()
                .map(|ty| TypeDescriptor::parse(ty))
                .collect(),
            construct: None,
        }
    }

    /// Attach a hook invoked for every construction with these arguments
    pub fn with_construct<F>(mut self, construct: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, ConstructionFailure> + 'static,
    {
        self.construct = Some(Rc::new(construct));
        self
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub fn construct_hook(&self) -> Option<&ConstructFn> {
        self.construct.as_ref()
    }
}

impl fmt::Debug for ConstructorSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorSignature")
            .field("parameters", &self.parameters)
            .field("construct", &self.construct.as_ref().map(|_| "<hook>"))
            .finish()
    }
}

impl PartialEq for ConstructorSignature {
    fn eq(&self, other: &Self) -> bool {
        self.parameters == other.parameters
    }
}

/// Everything source analysis knows about one type.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TypeInfo {
    pub ty: TypeDescriptor,
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_abstract: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub enum_constants: Vec<String>,
    /// Accessible constructors, in declaration order
    #[cfg_attr(feature = "serde", serde(default))]
    pub constructors: Vec<ConstructorSignature>,
    /// Known concrete subtypes
    #[cfg_attr(feature = "serde", serde(default))]
    pub subtypes: Vec<TypeDescriptor>,
    /// Direct supertypes
    #[cfg_attr(feature = "serde", serde(default))]
    pub supertypes: Vec<TypeDescriptor>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub literals: LiteralTable,
    #[cfg_attr(feature = "serde", serde(default))]
    pub spec_literals: LiteralTable,
}

impl TypeInfo {
    pub fn new(ty: &str) -> Self {
        Self {
            ty: TypeDescriptor::parse(ty),
            is_abstract: false,
            enum_constants: Vec::new(),
            constructors: Vec::new(),
            subtypes: Vec::new(),
            supertypes: Vec::new(),
            literals: LiteralTable::new(),
            spec_literals: LiteralTable::new(),
        }
    }

    pub fn abstract_type(ty: &str) -> Self {
        Self {
            is_abstract: true,
            ..Self::new(ty)
        }
    }

    pub fn enumeration(ty: &str, constants: &[&str]) -> Self {
        Self {
            enum_constants: constants.iter().map(|c| c.to_string()).collect(),
            ..Self::new(ty)
        }
    }

    pub fn with_constructor(mut self, constructor: ConstructorSignature) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn with_subtype(mut self, subtype: &str) -> Self {
        self.subtypes.push(TypeDescriptor::parse(subtype));
        self
    }

    pub fn with_supertype(mut self, supertype: &str) -> Self {
        self.supertypes.push(TypeDescriptor::parse(supertype));
        self
    }

    pub fn with_literals(mut self, literals: LiteralTable) -> Self {
        self.literals = literals;
        self
    }

    pub fn with_spec_literals(mut self, literals: LiteralTable) -> Self {
        self.spec_literals = literals;
        self
    }

    pub fn is_enum(&self) -> bool {
        !self.enum_constants.is_empty()
    }

    /// Concrete types with at least one constructor can be instantiated
    pub fn is_instantiable(&self) -> bool {
        !self.is_abstract && !self.constructors.is_empty()
    }
}

/// Supertype edges and primitive wrapper types, for assignability checks.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TypeHierarchy {
    supertypes: HashMap<TypeDescriptor, Vec<TypeDescriptor>>,
    wrappers: HashMap<PrimitiveKind, TypeDescriptor>,
}

impl TypeHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `sub` is directly assignable to `sup`
    pub fn add_supertype(&mut self, sub: &TypeDescriptor, sup: &TypeDescriptor) {
        let entry = self.supertypes.entry(sub.clone()).or_default();
        if !entry.contains(sup) {
            entry.push(sup.clone());
        }
    }

    /// Record the edges declared by one type
    pub fn link(&mut self, info: &TypeInfo) {
        for sup in &info.supertypes {
            self.add_supertype(&info.ty, sup);
        }
        for sub in &info.subtypes {
            self.add_supertype(sub, &info.ty);
        }
    }

    /// Register the boxed form of a primitive kind; values convert both ways
    pub fn add_wrapper(&mut self, kind: PrimitiveKind, wrapper: &TypeDescriptor) {
        self.wrappers.insert(kind, wrapper.clone());
    }

    pub fn wrapper(&self, kind: PrimitiveKind) -> Option<&TypeDescriptor> {
        self.wrappers.get(&kind)
    }

    /// The primitive kind boxed by `ty`, if it is a registered wrapper
    pub fn unboxed_kind(&self, ty: &TypeDescriptor) -> Option<PrimitiveKind> {
        self.wrappers
            .iter()
            .find(|(_, wrapper)| *wrapper == ty)
            .map(|(kind, _)| *kind)
    }

    fn boxes(&self, primitive: &TypeDescriptor, other: &TypeDescriptor) -> bool {
        primitive
            .primitive_kind()
            .filter(|kind| !kind.is_nullable())
            .and_then(|kind| self.wrappers.get(&kind))
            .is_some_and(|wrapper| wrapper == other)
    }

    /// Can a value of type `from` be passed where `to` is declared?
    pub fn is_assignable(&self, to: &TypeDescriptor, from: &TypeDescriptor) -> bool {
        if to == from || self.boxes(to, from) || self.boxes(from, to) {
            return true;
        }
        if to.dimensions() != from.dimensions() {
            return false;
        }
        if to.is_array() {
            let (to_base, from_base) = (to.base(), from.base());
            // arrays are covariant in structured components only
            return !to_base.is_primitive()
                && !from_base.is_primitive()
                && self.is_subtype(&to_base, &from_base);
        }
        self.is_subtype(to, from)
    }

    fn is_subtype(&self, to: &TypeDescriptor, from: &TypeDescriptor) -> bool {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([from.clone()]);
        while let Some(current) = queue.pop_front() {
            if &current == to {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(parents) = self.supertypes.get(&current) {
                queue.extend(parents.iter().cloned());
            }
        }
        false
    }
}

/// All metadata for one unit under test.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UnitMetadata {
    pub declaring: TypeDescriptor,
    #[cfg_attr(feature = "serde", serde(default))]
    pub operations: Vec<OperationInfo>,
    #[cfg_attr(feature = "serde", serde(default))]
    types: Vec<TypeInfo>,
    #[cfg_attr(feature = "serde", serde(default))]
    hierarchy: TypeHierarchy,
}

impl UnitMetadata {
    pub fn new(declaring: &str) -> Self {
        Self {
            declaring: TypeDescriptor::parse(declaring),
            operations: Vec::new(),
            types: Vec::new(),
            hierarchy: TypeHierarchy::new(),
        }
    }

    /// Add (or replace) a type, recording its subtype and supertype edges
    pub fn with_type(mut self, info: TypeInfo) -> Self {
        self.add_type(info);
        self
    }

    pub fn add_type(&mut self, info: TypeInfo) {
        self.hierarchy.link(&info);
        match self.types.iter_mut().find(|existing| existing.ty == info.ty) {
            Some(existing) => *existing = info,
            None => self.types.push(info),
        }
    }

    /// Record the subtype edges of every known type; needed after
    /// deserializing, where types bypass [`UnitMetadata::add_type`]
    pub fn link_types(&mut self) {
        for info in &self.types {
            self.hierarchy.link(info);
        }
    }

    pub fn with_operation(mut self, operation: OperationInfo) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn with_wrapper(mut self, kind: PrimitiveKind, wrapper: &str) -> Self {
        self.hierarchy
            .add_wrapper(kind, &TypeDescriptor::parse(wrapper));
        self
    }

    pub fn type_info(&self, ty: &TypeDescriptor) -> Option<&TypeInfo> {
        self.types.iter().find(|info| &info.ty == ty)
    }

    /// Metadata of the declaring type, if source analysis supplied it
    pub fn declaring_info(&self) -> Option<&TypeInfo> {
        self.type_info(&self.declaring)
    }

    pub fn operation(&self, id: &str) -> Option<&OperationInfo> {
        self.operations.iter().find(|op| op.id == id)
    }

    pub fn hierarchy(&self) -> &TypeHierarchy {
        &self.hierarchy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(name: &str) -> TypeDescriptor {
        TypeDescriptor::parse(name)
    }

    #[test]
    fn test_operation_builder_numbers_slots() {
        let op = OperationInfo::method("resize", &["int", "shapes.Shape"]);
        assert_eq!(op.id, "resize(int,shapes.Shape)");
        assert_eq!(op.parameters.len(), 2);
        assert_eq!(op.parameters[1].ordinal, 1);
        assert_eq!(op.parameters[1].ty, ty("shapes.Shape"));
        assert_eq!(op.parameters[1].operation, op.id);
        assert!(op.kind.needs_receiver());
        assert!(!OperationKind::StaticMethod.needs_receiver());
    }

    #[test]
    fn test_literal_table_partitions_by_type() {
        let mut table = LiteralTable::new()
            .with("int", "42")
            .with("int", "7")
            .with("String", "\"x\"");
        let ints: Vec<_> = table.literals_for(&ty("int")).collect();
        assert_eq!(ints, vec!["42", "7"]);
        assert_eq!(table.literals_for(&ty("int[]")).count(), 0);
        assert_eq!(table.literals_for(&ty("long")).count(), 0);

        table.merge(&LiteralTable::new().with("int", "42").with("int", "9"));
        assert_eq!(table.literals_for(&ty("int")).count(), 3);
    }

    #[test]
    fn test_hierarchy_subtypes_are_transitive() {
        let metadata = UnitMetadata::new("shapes.Canvas")
            .with_type(TypeInfo::abstract_type("shapes.Shape").with_subtype("shapes.Ellipse"))
            .with_type(TypeInfo::new("shapes.Circle").with_supertype("shapes.Ellipse"));
        let hierarchy = metadata.hierarchy();

        assert!(hierarchy.is_assignable(&ty("shapes.Shape"), &ty("shapes.Circle")));
        assert!(!hierarchy.is_assignable(&ty("shapes.Circle"), &ty("shapes.Shape")));
        assert!(hierarchy.is_assignable(&ty("shapes.Shape[]"), &ty("shapes.Circle[]")));
        assert!(!hierarchy.is_assignable(&ty("shapes.Shape[]"), &ty("shapes.Circle")));
    }

    #[test]
    fn test_hierarchy_boxing_goes_both_ways() {
        let metadata = UnitMetadata::new("Counter").with_wrapper(PrimitiveKind::Int, "Integer");
        let hierarchy = metadata.hierarchy();

        assert!(hierarchy.is_assignable(&ty("int"), &ty("Integer")));
        assert!(hierarchy.is_assignable(&ty("Integer"), &ty("int")));
        assert!(!hierarchy.is_assignable(&ty("long"), &ty("Integer")));
        assert!(!hierarchy.is_assignable(&ty("int[]"), &ty("Integer[]")));
        assert_eq!(hierarchy.unboxed_kind(&ty("Integer")), Some(PrimitiveKind::Int));
        assert_eq!(hierarchy.unboxed_kind(&ty("Long")), None);
    }

    #[test]
    fn test_add_type_replaces_existing() {
        let mut metadata = UnitMetadata::new("Node");
        metadata.add_type(TypeInfo::new("Node"));
        metadata.add_type(
            TypeInfo::new("Node").with_constructor(ConstructorSignature::new(&["Node"])),
        );
        let info = metadata.type_info(&ty("Node")).expect("Node registered");
        assert_eq!(info.constructors.len(), 1);
        assert!(info.is_instantiable());
        assert!(metadata.declaring_info().is_some());
    }

    #[test]
    fn test_construct_hook_is_kept() {
        let ctor = ConstructorSignature::new(&["int"])
            .with_construct(|_| Err(ConstructionFailure::new("always fails")));
        assert_eq!(ctor.arity(), 1);
        let hook = ctor.construct_hook().expect("hook attached");
        assert!(hook(&[Value::Int(1)]).is_err());
    }
}
