//! Static types of AXX values.

use std::fmt;

/// Types known to the semantic analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Integer,
    Float,
    Boolean,
    String,
    Character,
    /// Result of calling a procedure; has no values.
    Void,
    /// Opaque type registered by the embedder; only compatible with itself.
    Named(std::string::String),
    Array {
        element: Box<Type>,
        low: i64,
        len: usize,
    },
}

impl Type {
    /// Resolve a primitive type name. Names are case-insensitive.
    pub fn primitive(name: &str) -> Option<Type> {
        match name.to_ascii_lowercase().as_str() {
            "integer" => Some(Type::Integer),
            "float" => Some(Type::Float),
            "boolean" => Some(Type::Boolean),
            "string" => Some(Type::String),
            "character" => Some(Type::Character),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Integer | Type::Float)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array { .. })
    }

    /// Whether a value of type `source` may be stored where `self` is
    /// expected. Integers widen to floats; everything else must match.
    pub fn accepts(&self, source: &Type) -> bool {
        self == source || (*self == Type::Float && *source == Type::Integer)
    }

    /// Result type of an arithmetic operator applied to two numeric types.
    pub fn arithmetic(left: &Type, right: &Type) -> Option<Type> {
        match (left, right) {
            (Type::Integer, Type::Integer) => Some(Type::Integer),
            (l, r) if l.is_numeric() && r.is_numeric() => Some(Type::Float),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Integer => f.write_str("Integer"),
            Type::Float => f.write_str("Float"),
            Type::Boolean => f.write_str("Boolean"),
            Type::String => f.write_str("String"),
            Type::Character => f.write_str("Character"),
            Type::Void => f.write_str("no value"),
            Type::Named(name) => f.write_str(name),
            Type::Array { element, low, len } => {
                let high = i128::from(*low) + *len as i128 - 1;
                write!(f, "array({low}..{high}) of {element}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_names_ignore_case() {
        assert_eq!(Type::primitive("integer"), Some(Type::Integer));
        assert_eq!(Type::primitive("BOOLEAN"), Some(Type::Boolean));
        assert_eq!(Type::primitive("Matrix"), None);
    }

    #[test]
    fn integers_widen_to_floats_only() {
        assert!(Type::Float.accepts(&Type::Integer));
        assert!(!Type::Integer.accepts(&Type::Float));
        assert!(!Type::String.accepts(&Type::Character));
        assert!(Type::Named("Handle".into()).accepts(&Type::Named("Handle".into())));
    }

    #[test]
    fn arithmetic_promotes_to_float() {
        assert_eq!(
            Type::arithmetic(&Type::Integer, &Type::Integer),
            Some(Type::Integer)
        );
        assert_eq!(
            Type::arithmetic(&Type::Integer, &Type::Float),
            Some(Type::Float)
        );
        assert_eq!(Type::arithmetic(&Type::Boolean, &Type::Integer), None);
    }

    #[test]
    fn displays_array_bounds() {
        let ty = Type::Array {
            element: Box::new(Type::Integer),
            low: 1,
            len: 10,
        };
        assert_eq!(ty.to_string(), "array(1..10) of Integer");

        let wide = Type::Array {
            element: Box::new(Type::Float),
            low: i64::MAX,
            len: 2,
        };
        assert_eq!(
            wide.to_string(),
            format!("array({}..{}) of Float", i64::MAX, i128::from(i64::MAX) + 1)
        );
    }
}
