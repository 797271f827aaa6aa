//! Type and method descriptor parsing.
//!
//! Descriptors use the JVM notation: `I` (int), `J` (long), `F` (float), `D` (double),
//! `Z` (boolean), `B` (byte), `C` (char), `S` (short), `V` (void), `Lname;` for object
//! types and `[T` for arrays. Method descriptors list parameter types in parentheses
//! followed by the return type, e.g. `(II)Lkotlin/ranges/IntRange;`.

use std::fmt;

use crate::{assembly::LocalKind, Result};

/// A value type named by a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// `V`, only valid as a return type
    Void,
    /// `Z`
    Boolean,
    /// `B`
    Byte,
    /// `C`
    Char,
    /// `S`
    Short,
    /// `I`
    Int,
    /// `J`
    Long,
    /// `F`
    Float,
    /// `D`
    Double,
    /// `Lname;` with the internal name, e.g. `java/util/Iterator`
    Object(String),
    /// `[T`
    Array(Box<Type>),
}

impl Type {
    /// Creates an object type from an internal name.
    #[must_use]
    pub fn object(internal_name: &str) -> Self {
        Type::Object(internal_name.to_string())
    }

    /// Parses a single field descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the descriptor is not exactly one type.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let (ty, rest) = parse_one(descriptor)?;
        if !rest.is_empty() {
            return Err(malformed_error!(
                "Trailing characters '{}' in descriptor '{}'",
                rest,
                descriptor
            ));
        }
        Ok(ty)
    }

    /// Returns the local/stack category of this type, `None` for void.
    #[must_use]
    pub fn local_kind(&self) -> Option<LocalKind> {
        match self {
            Type::Void => None,
            Type::Boolean | Type::Byte | Type::Char | Type::Short | Type::Int => {
                Some(LocalKind::Int)
            }
            Type::Long => Some(LocalKind::Long),
            Type::Float => Some(LocalKind::Float),
            Type::Double => Some(LocalKind::Double),
            Type::Object(_) | Type::Array(_) => Some(LocalKind::Reference),
        }
    }

    /// Returns the internal name of an object type.
    #[must_use]
    pub fn internal_name(&self) -> Option<&str> {
        match self {
            Type::Object(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => f.write_str("V"),
            Type::Boolean => f.write_str("Z"),
            Type::Byte => f.write_str("B"),
            Type::Char => f.write_str("C"),
            Type::Short => f.write_str("S"),
            Type::Int => f.write_str("I"),
            Type::Long => f.write_str("J"),
            Type::Float => f.write_str("F"),
            Type::Double => f.write_str("D"),
            Type::Object(name) => write!(f, "L{name};"),
            Type::Array(element) => write!(f, "[{element}"),
        }
    }
}

/// A parsed method descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    /// Parameter types, in declaration order
    pub params: Vec<Type>,
    /// Return type, [`Type::Void`] for procedures
    pub ret: Type,
}

impl MethodDescriptor {
    /// Parses a method descriptor such as `(IJ)Ljava/lang/Object;`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the descriptor is not well formed.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let Some(mut rest) = descriptor.strip_prefix('(') else {
            return Err(malformed_error!(
                "Method descriptor '{}' does not start with '('",
                descriptor
            ));
        };

        let mut params = Vec::new();
        loop {
            if let Some(after) = rest.strip_prefix(')') {
                rest = after;
                break;
            }
            if rest.is_empty() {
                return Err(malformed_error!(
                    "Unterminated parameter list in '{}'",
                    descriptor
                ));
            }
            let (param, after) = parse_one(rest)?;
            if param == Type::Void {
                return Err(malformed_error!("Void parameter in '{}'", descriptor));
            }
            params.push(param);
            rest = after;
        }

        let ret = Type::parse(rest)?;
        Ok(MethodDescriptor { params, ret })
    }
}

fn parse_one(input: &str) -> Result<(Type, &str)> {
    let mut chars = input.chars();
    let Some(tag) = chars.next() else {
        return Err(crate::Error::Empty);
    };
    let rest = chars.as_str();

    let ty = match tag {
        'V' => Type::Void,
        'Z' => Type::Boolean,
        'B' => Type::Byte,
        'C' => Type::Char,
        'S' => Type::Short,
        'I' => Type::Int,
        'J' => Type::Long,
        'F' => Type::Float,
        'D' => Type::Double,
        'L' => {
            let Some(end) = rest.find(';') else {
                return Err(malformed_error!("Unterminated object type in '{}'", input));
            };
            if end == 0 {
                return Err(malformed_error!("Empty object type name in '{}'", input));
            }
            return Ok((Type::Object(rest[..end].to_string()), &rest[end + 1..]));
        }
        '[' => {
            let (element, after) = parse_one(rest)?;
            if element == Type::Void {
                return Err(malformed_error!("Array of void in '{}'", input));
            }
            return Ok((Type::Array(Box::new(element)), after));
        }
        other => {
            return Err(malformed_error!(
                "Unknown type tag '{}' in descriptor '{}'",
                other,
                input
            ))
        }
    };
    Ok((ty, rest))
}
