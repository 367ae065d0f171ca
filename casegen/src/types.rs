//! Type descriptors for the unit under test.

use std::fmt;
use std::hash::{Hash, Hasher};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The value-like kinds that get boundary constants instead of structural
/// instantiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
    String,
}

impl PrimitiveKind {
    /// Recognize a primitive kind from a qualified type name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "boolean" => Some(PrimitiveKind::Boolean),
            "byte" => Some(PrimitiveKind::Byte),
            "short" => Some(PrimitiveKind::Short),
            "char" => Some(PrimitiveKind::Char),
            "int" => Some(PrimitiveKind::Int),
            "long" => Some(PrimitiveKind::Long),
            "float" => Some(PrimitiveKind::Float),
            "double" => Some(PrimitiveKind::Double),
            "String" | "java.lang.String" => Some(PrimitiveKind::String),
            _ => None,
        }
    }

    /// Canonical name of the kind
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::String => "String",
        }
    }

    /// Only strings may be null among the primitive kinds
    pub fn is_nullable(self) -> bool {
        matches!(self, PrimitiveKind::String)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifies a data type: qualified base name plus array dimensionality.
///
/// Equality and hashing ignore any generic component, so `List<String>` and
/// `List` describe the same type.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "String", into = "String"))]
pub struct TypeDescriptor {
    name: String,
    dimensions: usize,
    generic: String,
}

impl TypeDescriptor {
    /// Parse a type name such as `int`, `pkg.Node`, `String[][]` or
    /// `java.util.List<String>`.
    pub fn parse(text: &str) -> Self {
        let mut base = text.trim();
        let mut dimensions = 0;
        while let Some(stripped) = base.strip_suffix("[]") {
            base = stripped.trim_end();
            dimensions += 1;
        }
        let (name, generic) = match base.find('<') {
            Some(start) => (&base[..start], &base[start..]),
            None => (base, ""),
        };
        Self {
            name: name.to_string(),
            dimensions,
            generic: generic.to_string(),
        }
    }

    /// An array type with `dimensions` dimensions over the given base name
    pub fn array(name: &str, dimensions: usize) -> Self {
        Self::parse(name).with_dimensions(dimensions)
    }

    fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// The array type one dimension deeper
    pub fn array_of(&self) -> Self {
        self.clone().with_dimensions(self.dimensions + 1)
    }

    /// The component type of an array, or `None` for non-arrays
    pub fn component(&self) -> Option<Self> {
        (self.dimensions > 0).then(|| self.clone().with_dimensions(self.dimensions - 1))
    }

    /// The innermost element type of an array (the type itself otherwise)
    pub fn base(&self) -> Self {
        self.clone().with_dimensions(0)
    }

    /// Fully qualified base name without array brackets or generics
    pub fn qualified_name(&self) -> &str {
        &self.name
    }

    /// The generic component, e.g. `<String>`, or an empty string
    pub fn generic_component(&self) -> &str {
        &self.generic
    }

    /// Unqualified base name
    pub fn short_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Enclosing namespace, empty for types outside any namespace
    pub fn namespace(&self) -> &str {
        match self.name.rfind('.') {
            Some(dot) => &self.name[..dot],
            None => "",
        }
    }

    /// Number of array dimensions (0 for non-arrays)
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn is_array(&self) -> bool {
        self.dimensions > 0
    }

    /// The primitive kind, for non-array primitive and string types
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        if self.dimensions == 0 {
            PrimitiveKind::from_name(&self.name)
        } else {
            None
        }
    }

    /// Primitive (or string) as opposed to structured
    pub fn is_primitive(&self) -> bool {
        self.primitive_kind().is_some()
    }

    /// Whether null is a legal value of this type
    pub fn is_nullable(&self) -> bool {
        self.primitive_kind().is_none_or(PrimitiveKind::is_nullable)
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.dimensions == other.dimensions
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.dimensions.hash(state);
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.generic)?;
        for _ in 0..self.dimensions {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

impl From<&str> for TypeDescriptor {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

impl From<String> for TypeDescriptor {
    fn from(text: String) -> Self {
        Self::parse(&text)
    }
}

impl From<TypeDescriptor> for String {
    fn from(ty: TypeDescriptor) -> Self {
        ty.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_parse_plain_and_array_types() {
        let node = TypeDescriptor::parse("graph.Node");
        assert_eq!(node.qualified_name(), "graph.Node");
        assert_eq!(node.short_name(), "Node");
        assert_eq!(node.namespace(), "graph");
        assert_eq!(node.dimensions(), 0);
        assert!(!node.is_primitive());

        let grid = TypeDescriptor::parse("int[][]");
        assert_eq!(grid.qualified_name(), "int");
        assert_eq!(grid.dimensions(), 2);
        assert!(grid.is_array());
        assert_eq!(grid.primitive_kind(), None);
        assert_eq!(grid.component(), Some(TypeDescriptor::parse("int[]")));
        assert_eq!(grid.base(), TypeDescriptor::parse("int"));
        assert_eq!(grid.to_string(), "int[][]");
    }

    #[test]
    fn test_generic_component_is_ignored_for_equality() {
        let raw = TypeDescriptor::parse("java.util.List");
        let generic = TypeDescriptor::parse("java.util.List<String>");
        assert_eq!(raw, generic);
        assert_eq!(generic.generic_component(), "<String>");

        let mut set = HashSet::new();
        set.insert(raw);
        assert!(set.contains(&generic));
    }

    #[test]
    fn test_dimensions_participate_in_equality() {
        assert_ne!(TypeDescriptor::parse("Node"), TypeDescriptor::parse("Node[]"));
        assert_eq!(
            TypeDescriptor::parse("Node").array_of(),
            TypeDescriptor::array("Node", 1)
        );
    }

    #[test]
    fn test_primitive_kinds_and_nullability() {
        assert_eq!(
            TypeDescriptor::parse("int").primitive_kind(),
            Some(PrimitiveKind::Int)
        );
        assert_eq!(
            TypeDescriptor::parse("java.lang.String").primitive_kind(),
            Some(PrimitiveKind::String)
        );
        assert!(!TypeDescriptor::parse("double").is_nullable());
        assert!(TypeDescriptor::parse("String").is_nullable());
        assert!(TypeDescriptor::parse("int[]").is_nullable());
        assert!(TypeDescriptor::parse("Node").is_nullable());
    }

    #[test]
    fn test_unqualified_type_has_empty_namespace() {
        let ty = TypeDescriptor::parse("Widget");
        assert_eq!(ty.namespace(), "");
        assert_eq!(ty.short_name(), "Widget");
    }
}
