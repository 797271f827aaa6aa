//! Range-iterator provenance tracking.
//!
//! [`ProvenanceInterpreter`] refines the baseline analysis with one extra fact: a
//! value that is an iterator obtained from a range type remembers the range's
//! element kind. The fact survives copies through locals and the stack, and
//! survives casts of a value that is already known to come from a range, so a frame
//! before a `next()` call tells whether the receiver is a range iterator and of
//! which kind.
//!
//! Everything else is delegated to [`BasicInterpreter`]. The tag is lowered to the
//! generic iterator value before delegation, so verification of tagged values is
//! exactly that of the baseline.
//!
//! Three operations differ from the baseline:
//!
//! - **calls**: a dynamic `iterator()` call whose receiver is a range type produces
//!   [`ProvenanceValue::RangeIterator`]
//! - **casts**: a cast of a tagged value, or of a range-typed value, returns the
//!   input unchanged
//! - **merge**: two tags of the same kind stay tagged; any other combination falls
//!   back to the baseline join of the lowered values

use std::fmt;

use crate::{
    analysis::{BasicInterpreter, BasicValue, InterpretResult, Interpreter},
    assembly::{Instruction, Type},
    config::{ElementKind, RangeConvention},
};

/// Abstract value of the provenance analysis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProvenanceValue {
    /// A baseline value without provenance
    Basic(BasicValue),
    /// An iterator produced from a range of the given element kind
    RangeIterator(ElementKind),
}

impl ProvenanceValue {
    /// Returns the element kind if this is a range iterator.
    #[must_use]
    pub fn range_iterator_kind(&self) -> Option<ElementKind> {
        match self {
            ProvenanceValue::RangeIterator(kind) => Some(*kind),
            ProvenanceValue::Basic(_) => None,
        }
    }

    /// Returns the baseline view of this value.
    ///
    /// A range iterator lowers to the generic iterator reference.
    #[must_use]
    pub fn lower(&self) -> BasicValue {
        match self {
            ProvenanceValue::Basic(value) => value.clone(),
            ProvenanceValue::RangeIterator(_) => BasicValue::generic_iterator(),
        }
    }
}

impl From<BasicValue> for ProvenanceValue {
    fn from(value: BasicValue) -> Self {
        ProvenanceValue::Basic(value)
    }
}

impl fmt::Display for ProvenanceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvenanceValue::Basic(value) => write!(f, "{value}"),
            ProvenanceValue::RangeIterator(kind) => write!(f, "<{kind}RangeIterator>"),
        }
    }
}

/// Interpreter tagging iterators that come from range types.
#[derive(Debug, Clone, Copy)]
pub struct ProvenanceInterpreter<'a> {
    basic: BasicInterpreter,
    convention: &'a RangeConvention,
}

impl<'a> ProvenanceInterpreter<'a> {
    /// Creates an interpreter recognizing the range types of `convention`.
    #[must_use]
    pub fn new(convention: &'a RangeConvention) -> Self {
        ProvenanceInterpreter {
            basic: BasicInterpreter::new(),
            convention,
        }
    }

    /// Returns the convention table in use.
    #[must_use]
    pub fn convention(&self) -> &'a RangeConvention {
        self.convention
    }

    fn range_kind_of(&self, value: &ProvenanceValue) -> Option<ElementKind> {
        match value {
            ProvenanceValue::Basic(basic) => self
                .convention
                .range_element_kind(basic.type_name()?),
            ProvenanceValue::RangeIterator(_) => None,
        }
    }

    fn lower_all(values: &[ProvenanceValue]) -> Vec<BasicValue> {
        values.iter().map(ProvenanceValue::lower).collect()
    }
}

impl Interpreter for ProvenanceInterpreter<'_> {
    type Value = ProvenanceValue;

    fn new_value(&self, ty: Option<&Type>) -> ProvenanceValue {
        self.basic.new_value(ty).into()
    }

    fn new_operation(&self, instruction: &Instruction) -> InterpretResult<ProvenanceValue> {
        self.basic.new_operation(instruction).map(Into::into)
    }

    fn copy_operation(
        &self,
        instruction: &Instruction,
        value: &ProvenanceValue,
    ) -> InterpretResult<ProvenanceValue> {
        // copies are the identity once verified, so tags ride along
        self.basic.copy_operation(instruction, &value.lower())?;
        Ok(value.clone())
    }

    fn unary_operation(
        &self,
        instruction: &Instruction,
        value: &ProvenanceValue,
    ) -> InterpretResult<Option<ProvenanceValue>> {
        if let Instruction::CheckCast(_) = instruction {
            if value.range_iterator_kind().is_some() || self.range_kind_of(value).is_some() {
                return Ok(Some(value.clone()));
            }
        }
        Ok(self
            .basic
            .unary_operation(instruction, &value.lower())?
            .map(Into::into))
    }

    fn binary_operation(
        &self,
        instruction: &Instruction,
        left: &ProvenanceValue,
        right: &ProvenanceValue,
    ) -> InterpretResult<Option<ProvenanceValue>> {
        Ok(self
            .basic
            .binary_operation(instruction, &left.lower(), &right.lower())?
            .map(Into::into))
    }

    fn nary_operation(
        &self,
        instruction: &Instruction,
        values: &[ProvenanceValue],
    ) -> InterpretResult<Option<ProvenanceValue>> {
        let lowered = Self::lower_all(values);
        let result = self.basic.nary_operation(instruction, &lowered)?;

        if instruction.is_dynamic_call_named(&self.convention.iterator_method) {
            if let Some(kind) = values.first().and_then(|receiver| self.range_kind_of(receiver)) {
                return Ok(Some(ProvenanceValue::RangeIterator(kind)));
            }
        }
        Ok(result.map(Into::into))
    }

    fn merge(&self, a: &ProvenanceValue, b: &ProvenanceValue) -> ProvenanceValue {
        match (a, b) {
            (ProvenanceValue::RangeIterator(x), ProvenanceValue::RangeIterator(y)) if x == y => {
                a.clone()
            }
            (ProvenanceValue::Basic(x), ProvenanceValue::Basic(y)) => {
                self.basic.merge(x, y).into()
            }
            _ => self.basic.merge(&a.lower(), &b.lower()).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::Analyzer,
        assembly::{InstructionAssembler, InvokeKind, LocalKind},
    };

    fn range(name: &str) -> ProvenanceValue {
        BasicValue::Reference(Type::object(name)).into()
    }

    fn iterator_call(owner: &str) -> Instruction {
        Instruction::invoke(
            InvokeKind::Virtual,
            owner,
            "iterator",
            "()Ljava/util/Iterator;",
        )
    }

    #[test]
    fn test_iterator_of_range_is_tagged() {
        let convention = RangeConvention::default();
        let interpreter = ProvenanceInterpreter::new(&convention);
        let result = interpreter
            .nary_operation(
                &iterator_call("kotlin/ranges/IntRange"),
                &[range("kotlin/ranges/IntRange")],
            )
            .unwrap();
        assert_eq!(result, Some(ProvenanceValue::RangeIterator(ElementKind::Int)));
    }

    #[test]
    fn test_iterator_of_other_type_is_not_tagged() {
        let convention = RangeConvention::default();
        let interpreter = ProvenanceInterpreter::new(&convention);
        let result = interpreter
            .nary_operation(&iterator_call("java/util/List"), &[range("java/util/List")])
            .unwrap();
        assert_eq!(result, Some(BasicValue::generic_iterator().into()));
    }

    #[test]
    fn test_static_iterator_call_is_not_tagged() {
        let convention = RangeConvention::default();
        let interpreter = ProvenanceInterpreter::new(&convention);
        let call = Instruction::invoke(
            InvokeKind::Static,
            "Helpers",
            "iterator",
            "(Lkotlin/ranges/IntRange;)Ljava/util/Iterator;",
        );
        let result = interpreter
            .nary_operation(&call, &[range("kotlin/ranges/IntRange")])
            .unwrap();
        assert_eq!(result, Some(BasicValue::generic_iterator().into()));
    }

    #[test]
    fn test_cast_is_transparent_for_tags_and_ranges() {
        let convention = RangeConvention::default();
        let interpreter = ProvenanceInterpreter::new(&convention);
        let cast = Instruction::CheckCast("java/lang/Iterable".to_string());

        let tagged = ProvenanceValue::RangeIterator(ElementKind::Long);
        assert_eq!(
            interpreter.unary_operation(&cast, &tagged).unwrap(),
            Some(tagged.clone())
        );

        let int_range = range("kotlin/ranges/IntRange");
        assert_eq!(
            interpreter.unary_operation(&cast, &int_range).unwrap(),
            Some(int_range.clone())
        );

        let other = range("java/lang/Object");
        assert_eq!(
            interpreter.unary_operation(&cast, &other).unwrap(),
            Some(range("java/lang/Iterable"))
        );
    }

    #[test]
    fn test_merge_rules() {
        let convention = RangeConvention::default();
        let interpreter = ProvenanceInterpreter::new(&convention);
        let int_iter = ProvenanceValue::RangeIterator(ElementKind::Int);
        let long_iter = ProvenanceValue::RangeIterator(ElementKind::Long);
        let generic: ProvenanceValue = BasicValue::generic_iterator().into();

        assert_eq!(interpreter.merge(&int_iter, &int_iter), int_iter);
        assert_eq!(interpreter.merge(&int_iter, &long_iter), generic);
        assert_eq!(interpreter.merge(&int_iter, &generic), generic);
        assert_eq!(
            interpreter.merge(&int_iter, &BasicValue::Int.into()),
            BasicValue::Uninitialized.into()
        );
        assert_eq!(
            interpreter.merge(&BasicValue::Null.into(), &generic),
            generic
        );
    }

    #[test]
    fn test_tag_flows_through_locals() {
        let convention = RangeConvention::default();
        let mut asm = InstructionAssembler::new_static("f", "(Lkotlin/ranges/IntRange;)V");
        asm.aload(0)
            .invokevirtual("kotlin/ranges/IntRange", "iterator", "()Ljava/util/Iterator;")
            .astore(1)
            .aload(1)
            .pop()
            .return_void();
        let body = asm.finish().unwrap();

        let results = Analyzer::new(ProvenanceInterpreter::new(&convention))
            .analyze("Owner", &body)
            .unwrap();
        let tagged = ProvenanceValue::RangeIterator(ElementKind::Int);
        assert_eq!(results.frame(2).unwrap().top(), Some(&tagged));
        assert_eq!(results.frame(3).unwrap().local(1).unwrap(), &tagged);
        assert_eq!(results.frame(4).unwrap().top(), Some(&tagged));
    }

    #[test]
    fn test_tag_verified_like_generic_iterator() {
        let convention = RangeConvention::default();
        let interpreter = ProvenanceInterpreter::new(&convention);
        let store_int = Instruction::Store {
            kind: LocalKind::Int,
            slot: 0,
        };
        assert!(interpreter
            .copy_operation(&store_int, &ProvenanceValue::RangeIterator(ElementKind::Int))
            .is_err());
    }
}
