//! Candidate values produced by strategies.

use std::fmt;

use num_traits::{Bounded, Float, Zero};

use crate::types::{PrimitiveKind, TypeDescriptor};

/// A structured candidate built by invoking a constructor.
///
/// This is a construction recipe: the downstream code emitter renders it as
/// a constructor call with the recorded arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub ty: TypeDescriptor,
    /// Index into the type's constructor list
    pub constructor: usize,
    pub arguments: Vec<Value>,
}

/// One generated candidate value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Char(char),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Array {
        component: TypeDescriptor,
        elements: Vec<Value>,
    },
    Enum {
        ty: TypeDescriptor,
        constant: String,
    },
    Object(Instance),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The runtime type of the value; `None` for null
    pub fn type_descriptor(&self) -> Option<TypeDescriptor> {
        let kind = match self {
            Value::Null => return None,
            Value::Boolean(_) => PrimitiveKind::Boolean,
            Value::Byte(_) => PrimitiveKind::Byte,
            Value::Short(_) => PrimitiveKind::Short,
            Value::Char(_) => PrimitiveKind::Char,
            Value::Int(_) => PrimitiveKind::Int,
            Value::Long(_) => PrimitiveKind::Long,
            Value::Float(_) => PrimitiveKind::Float,
            Value::Double(_) => PrimitiveKind::Double,
            Value::Str(_) => PrimitiveKind::String,
            Value::Array { component, .. } => return Some(component.array_of()),
            Value::Enum { ty, .. } => return Some(ty.clone()),
            Value::Object(instance) => return Some(instance.ty.clone()),
        };
        Some(TypeDescriptor::parse(kind.name()))
    }

    /// Parse a literal constant found by source analysis.
    ///
    /// Accepts the usual source spellings: `42`, `42L`, `1.5f`, `'c'`,
    /// `"text"`. Returns `None` when the text is not a literal of `kind`.
    pub fn parse_literal(kind: PrimitiveKind, text: &str) -> Option<Value> {
        let text = text.trim();
        match kind {
            PrimitiveKind::Boolean => text.parse().ok().map(Value::Boolean),
            PrimitiveKind::Byte => text.parse().ok().map(Value::Byte),
            PrimitiveKind::Short => text.parse().ok().map(Value::Short),
            PrimitiveKind::Int => text.parse().ok().map(Value::Int),
            PrimitiveKind::Long => text
                .trim_end_matches(['l', 'L'])
                .parse()
                .ok()
                .map(Value::Long),
            PrimitiveKind::Float => text
                .trim_end_matches(['f', 'F'])
                .parse()
                .ok()
                .map(Value::Float),
            PrimitiveKind::Double => text
                .trim_end_matches(['d', 'D'])
                .parse()
                .ok()
                .map(Value::Double),
            PrimitiveKind::Char => {
                let inner = strip_quotes(text, '\'');
                let mut chars = inner.chars();
                match (chars.next(), chars.next()) {
                    // chars are 16-bit code units in the unit under test
                    (Some(c), None) if u32::from(c) <= MAX_CHAR => Some(Value::Char(c)),
                    _ => None,
                }
            }
            PrimitiveKind::String => Some(Value::Str(strip_quotes(text, '"').to_string())),
        }
    }
}

fn strip_quotes(text: &str, quote: char) -> &str {
    text.strip_prefix(quote)
        .and_then(|rest| rest.strip_suffix(quote))
        .unwrap_or(text)
}

fn integral<T: Bounded + Zero + Copy>(wrap: fn(T) -> Value) -> Vec<Value> {
    vec![
        wrap(T::min_value()),
        wrap(T::zero()),
        wrap(T::max_value()),
    ]
}

fn floating<T: Float>(wrap: fn(T) -> Value) -> Vec<Value> {
    vec![wrap(-T::one()), wrap(T::zero()), wrap(T::one())]
}

/// Largest `char` the unit under test can represent
const MAX_CHAR: u32 = 0xFFFF;

/// Boundary constants tried for every primitive kind.
pub fn boundary_values(kind: PrimitiveKind) -> Vec<Value> {
    match kind {
        PrimitiveKind::Boolean => vec![Value::Boolean(false), Value::Boolean(true)],
        PrimitiveKind::Byte => integral(Value::Byte),
        PrimitiveKind::Short => integral(Value::Short),
        PrimitiveKind::Int => integral(Value::Int),
        PrimitiveKind::Long => integral(Value::Long),
        PrimitiveKind::Float => floating(Value::Float),
        PrimitiveKind::Double => floating(Value::Double),
        PrimitiveKind::Char => vec![Value::Char('\0'), Value::Char('a'), Value::Char('\u{FFFF}')],
        PrimitiveKind::String => vec![Value::Null, Value::Str(String::new())],
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Byte(n) => write!(f, "{}", n),
            Value::Short(n) => write!(f, "{}", n),
            Value::Char(c) => write!(f, "{:?}", c),
            Value::Int(n) => write!(f, "{}", n),
            Value::Long(n) => write!(f, "{}L", n),
            Value::Float(x) => write!(f, "{:?}f", x),
            Value::Double(x) => write!(f, "{:?}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Array { component, elements } => {
                write!(f, "{}[]{{", component)?;
                write_list(f, elements)?;
                f.write_str("}")
            }
            Value::Enum { ty, constant } => write!(f, "{}.{}", ty.short_name(), constant),
            Value::Object(instance) => {
                write!(f, "new {}(", instance.ty.short_name())?;
                write_list(f, &instance.arguments)?;
                f.write_str(")")
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, values: &[Value]) -> fmt::Result {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integral_boundaries() {
        assert_eq!(
            boundary_values(PrimitiveKind::Int),
            vec![Value::Int(i32::MIN), Value::Int(0), Value::Int(i32::MAX)]
        );
        assert_eq!(
            boundary_values(PrimitiveKind::Byte),
            vec![Value::Byte(-128), Value::Byte(0), Value::Byte(127)]
        );
    }

    #[test]
    fn test_floating_boundaries() {
        assert_eq!(
            boundary_values(PrimitiveKind::Float),
            vec![Value::Float(-1.0), Value::Float(0.0), Value::Float(1.0)]
        );
    }

    #[test]
    fn test_string_boundaries_include_null() {
        assert_eq!(
            boundary_values(PrimitiveKind::String),
            vec![Value::Null, Value::Str(String::new())]
        );
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(
            Value::parse_literal(PrimitiveKind::Int, "42"),
            Some(Value::Int(42))
        );
        assert_eq!(
            Value::parse_literal(PrimitiveKind::Long, "-7L"),
            Some(Value::Long(-7))
        );
        assert_eq!(
            Value::parse_literal(PrimitiveKind::Float, "1.5f"),
            Some(Value::Float(1.5))
        );
        assert_eq!(
            Value::parse_literal(PrimitiveKind::Char, "'x'"),
            Some(Value::Char('x'))
        );
        assert_eq!(
            Value::parse_literal(PrimitiveKind::String, "\"hello\""),
            Some(Value::Str("hello".to_string()))
        );
        assert_eq!(Value::parse_literal(PrimitiveKind::Int, "forty"), None);
        assert_eq!(Value::parse_literal(PrimitiveKind::Byte, "300"), None);
        assert_eq!(Value::parse_literal(PrimitiveKind::Char, "'xy'"), None);
        assert_eq!(Value::parse_literal(PrimitiveKind::Char, "'\u{1F600}'"), None);
    }

    #[test]
    fn test_char_boundaries_fit_sixteen_bits() {
        let chars = boundary_values(PrimitiveKind::Char);
        assert_eq!(chars.last(), Some(&Value::Char('\u{FFFF}')));
        for value in &chars {
            match value {
                Value::Char(c) => assert!(u32::from(*c) <= MAX_CHAR),
                other => panic!("unexpected boundary {:?}", other),
            }
        }
    }

    #[test]
    fn test_runtime_types() {
        assert_eq!(Value::Null.type_descriptor(), None);
        assert_eq!(
            Value::Int(1).type_descriptor(),
            Some(TypeDescriptor::parse("int"))
        );
        let array = Value::Array {
            component: TypeDescriptor::parse("int"),
            elements: vec![Value::Int(1)],
        };
        assert_eq!(
            array.type_descriptor(),
            Some(TypeDescriptor::parse("int[]"))
        );
    }

    #[test]
    fn test_display() {
        let node = Value::Object(Instance {
            ty: TypeDescriptor::parse("graph.Node"),
            constructor: 0,
            arguments: vec![Value::Null, Value::Int(3)],
        });
        assert_eq!(node.to_string(), "new Node(null, 3)");

        let array = Value::Array {
            component: TypeDescriptor::parse("int"),
            elements: vec![Value::Int(1), Value::Int(2)],
        };
        assert_eq!(array.to_string(), "int[]{1, 2}");
    }
}
