//! Optimizer configuration and the range-type convention table.
//!
//! The range unboxing pass is driven entirely by data: which types count as ranges,
//! which boxed type and accessor the generic loop uses to unwrap each element kind,
//! and which specialized iterator type yields the unboxed element. All of it lives
//! in [`RangeConvention`]; [`OptimizerConfig`] bundles the convention with the pass
//! switches.
//!
//! # Examples
//!
//! ```rust
//! use rangeopt::config::{ElementKind, RangeConvention};
//!
//! let convention = RangeConvention::default();
//! assert_eq!(convention.range_element_kind("kotlin/ranges/IntRange"), Some(ElementKind::Int));
//! assert_eq!(convention.range_element_kind("kotlin/ranges/CharProgression"), Some(ElementKind::Char));
//! assert_eq!(convention.range_element_kind("kotlin/ranges/ClosedRange"), None);
//! assert_eq!(convention.range_element_kind("java/util/List"), None);
//! ```

use std::str::FromStr;

use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::{
    analysis::DEFAULT_ITERATION_LIMIT,
    assembly::{LocalKind, Type},
};

/// The primitive element kind of a range or progression type.
///
/// The string form is the base name used by range types, so `IntRange` and
/// `IntProgression` both map to [`ElementKind::Int`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter,
)]
pub enum ElementKind {
    /// 8-bit signed
    Byte,
    /// 16-bit signed
    Short,
    /// 32-bit signed
    Int,
    /// 64-bit signed
    Long,
    /// 32-bit unsigned
    UInt,
    /// 64-bit unsigned
    ULong,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// 16-bit character
    Char,
}

impl ElementKind {
    /// Returns the primitive type an element of this kind is represented as.
    #[must_use]
    pub fn primitive(self) -> Type {
        match self {
            ElementKind::Byte => Type::Byte,
            ElementKind::Short => Type::Short,
            ElementKind::Int | ElementKind::UInt => Type::Int,
            ElementKind::Long | ElementKind::ULong => Type::Long,
            ElementKind::Float => Type::Float,
            ElementKind::Double => Type::Double,
            ElementKind::Char => Type::Char,
        }
    }

    /// Returns the single-character primitive descriptor, e.g. `I` or `J`.
    #[must_use]
    pub fn descriptor(self) -> String {
        self.primitive().to_string()
    }

    /// Returns the local slot category of an unboxed element.
    #[must_use]
    pub fn local_kind(self) -> LocalKind {
        match self {
            ElementKind::Long | ElementKind::ULong => LocalKind::Long,
            ElementKind::Float => LocalKind::Float,
            ElementKind::Double => LocalKind::Double,
            _ => LocalKind::Int,
        }
    }
}

/// A primitive-specialized iterator type and its unboxed `next` method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecializedIterator {
    /// Internal name, e.g. `kotlin/collections/IntIterator`
    pub type_name: String,
    /// Method returning the next unboxed element, e.g. `nextInt`
    pub next_method: String,
}

/// How the generic loop shape unwraps one element kind, and how to avoid it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionEntry {
    /// The element kind this entry describes
    pub kind: ElementKind,
    /// Type the boxed element is cast to before unwrapping
    pub boxed_type: String,
    /// Virtual method on `boxed_type` that yields the primitive
    pub accessor: String,
    /// Iterator to use instead, `None` if the kind has no specialized iterator
    pub iterator: Option<SpecializedIterator>,
}

impl ConventionEntry {
    /// Descriptor of the specialized `next` method, e.g. `()I`.
    #[must_use]
    pub fn next_descriptor(&self) -> String {
        format!("(){}", self.kind.descriptor())
    }
}

/// The convention table that identifies range types and their unboxing shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeConvention {
    /// Package prefix every range type lives in, e.g. `kotlin/ranges/`
    pub range_package: String,
    /// Type-name suffixes that follow the element kind, e.g. `Range`
    pub range_suffixes: Vec<String>,
    /// Name of the method that obtains an iterator from an iterable
    pub iterator_method: String,
    /// Name of the generic, boxing `next` method
    pub next_method: String,
    /// One entry per supported element kind
    pub entries: Vec<ConventionEntry>,
}

impl RangeConvention {
    /// The Kotlin standard library convention.
    ///
    /// Signed integral kinds, floating kinds, and `Char` have specialized iterators in
    /// `kotlin/collections/`. The unsigned kinds are recognized as ranges but have no
    /// specialized iterator, so their loops are matched and then left alone.
    #[must_use]
    pub fn kotlin() -> Self {
        let entries = ElementKind::iter()
            .map(|kind| match kind {
                ElementKind::UInt | ElementKind::ULong => ConventionEntry {
                    kind,
                    boxed_type: format!("kotlin/{kind}"),
                    accessor: "unbox-impl".to_string(),
                    iterator: None,
                },
                ElementKind::Char => ConventionEntry {
                    kind,
                    boxed_type: "java/lang/Character".to_string(),
                    accessor: "charValue".to_string(),
                    iterator: Some(SpecializedIterator {
                        type_name: "kotlin/collections/CharIterator".to_string(),
                        next_method: "nextChar".to_string(),
                    }),
                },
                _ => ConventionEntry {
                    kind,
                    boxed_type: "java/lang/Number".to_string(),
                    accessor: format!("{}Value", kind.to_string().to_lowercase()),
                    iterator: Some(SpecializedIterator {
                        type_name: format!("kotlin/collections/{kind}Iterator"),
                        next_method: format!("next{kind}"),
                    }),
                },
            })
            .collect();

        RangeConvention {
            range_package: "kotlin/ranges/".to_string(),
            range_suffixes: vec!["Range".to_string(), "Progression".to_string()],
            iterator_method: "iterator".to_string(),
            next_method: "next".to_string(),
            entries,
        }
    }

    /// Returns the entry for `kind`.
    #[must_use]
    pub fn entry(&self, kind: ElementKind) -> Option<&ConventionEntry> {
        self.entries.iter().find(|entry| entry.kind == kind)
    }

    /// Returns the element kind of a range type, `None` if `type_name` is not one.
    ///
    /// A range type is `<range_package><Kind><suffix>` where `Kind` has an entry in
    /// the table.
    #[must_use]
    pub fn range_element_kind(&self, type_name: &str) -> Option<ElementKind> {
        let simple = type_name.strip_prefix(self.range_package.as_str())?;
        if simple.contains('/') {
            return None;
        }
        self.range_suffixes.iter().find_map(|suffix| {
            let base = simple.strip_suffix(suffix.as_str())?;
            let kind = ElementKind::from_str(base).ok()?;
            self.entry(kind).map(|entry| entry.kind)
        })
    }

    /// Returns `true` if `type_name` is a range type.
    #[must_use]
    pub fn is_range_type(&self, type_name: &str) -> bool {
        self.range_element_kind(type_name).is_some()
    }
}

impl Default for RangeConvention {
    fn default() -> Self {
        Self::kotlin()
    }
}

/// Settings of the optimizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizerConfig {
    /// Range types and their unboxing shape
    pub convention: RangeConvention,
    /// Master switch for the range unboxing pass
    pub enabled: bool,
    /// Re-analyze each rewritten body and roll back if it no longer verifies
    pub verify_after_rewrite: bool,
    /// Upper bound on analyzer worklist iterations per method
    pub max_analysis_iterations: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            convention: RangeConvention::default(),
            enabled: true,
            verify_after_rewrite: false,
            max_analysis_iterations: DEFAULT_ITERATION_LIMIT,
        }
    }
}

impl OptimizerConfig {
    /// Default settings with post-rewrite verification switched on.
    #[must_use]
    pub fn verifying() -> Self {
        OptimizerConfig {
            verify_after_rewrite: true,
            ..Self::default()
        }
    }

    /// Settings with the pass switched off.
    #[must_use]
    pub fn disabled() -> Self {
        OptimizerConfig {
            enabled: false,
            ..Self::default()
        }
    }
}
