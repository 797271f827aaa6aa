//! Stack bytecode instruction representation.
//!
//! This module defines the instruction set the optimizer works on. It is a compact,
//! JVM-flavoured stack machine: values live on an operand stack or in numbered local
//! slots, calls are symbolic (`owner`, `name`, `descriptor`), and control flow targets
//! are [`Label`] pseudo-instructions embedded in the stream.
//!
//! # Key Components
//!
//! - [`Instruction`] - A single instruction of a method body
//! - [`LocalKind`] - The value category moved by loads, stores and returns
//! - [`Constant`] - Immediate operands of constant-push instructions
//! - [`InvokeKind`] - Dispatch flavour of a call
//! - [`Condition`] / [`Comparison`] - Branch conditions
//!
//! # Slots
//!
//! Every value occupies exactly one local or stack slot, including `long` and
//! `double` values.
//!
//! # Display
//!
//! Instructions render as a single line of disassembly, e.g.
//! `invokeinterface java/util/Iterator.next()Ljava/lang/Object;`.

use std::fmt;

use strum::{Display, EnumIter};

/// A branch target inside a method body.
///
/// Labels are positional markers: a [`Instruction::Label`] carrying the same value
/// marks the target position in the instruction stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// The category of value moved by a load, store or return instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum LocalKind {
    /// 32-bit integer category (`int`, `short`, `byte`, `char`, `boolean`)
    #[strum(serialize = "i")]
    Int,
    /// 64-bit integer
    #[strum(serialize = "l")]
    Long,
    /// 32-bit float
    #[strum(serialize = "f")]
    Float,
    /// 64-bit float
    #[strum(serialize = "d")]
    Double,
    /// Object reference or null
    #[strum(serialize = "a")]
    Reference,
}

impl LocalKind {
    /// Returns `true` for the numeric (non-reference) categories.
    #[must_use]
    pub const fn is_primitive(self) -> bool {
        !matches!(self, LocalKind::Reference)
    }
}

/// Immediate operand of a [`Instruction::Const`].
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// The null reference
    Null,
    /// A 32-bit integer
    Int(i32),
    /// A 64-bit integer
    Long(i64),
    /// A 32-bit float
    Float(f32),
    /// A 64-bit float
    Double(f64),
    /// A string literal
    String(String),
}

/// Arithmetic operation of a [`Instruction::Arith`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ArithOp {
    /// Addition
    #[strum(serialize = "add")]
    Add,
    /// Subtraction
    #[strum(serialize = "sub")]
    Sub,
    /// Multiplication
    #[strum(serialize = "mul")]
    Mul,
}

/// Dispatch flavour of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum InvokeKind {
    /// Static call, no receiver
    #[strum(serialize = "invokestatic")]
    Static,
    /// Virtual call on a class receiver
    #[strum(serialize = "invokevirtual")]
    Virtual,
    /// Interface call
    #[strum(serialize = "invokeinterface")]
    Interface,
    /// Non-virtual call (constructors, private and super methods)
    #[strum(serialize = "invokespecial")]
    Special,
}

impl InvokeKind {
    /// Returns `true` if the call consumes a receiver from the stack.
    #[must_use]
    pub const fn has_receiver(self) -> bool {
        !matches!(self, InvokeKind::Static)
    }

    /// Returns `true` for dynamically dispatched calls (virtual or interface).
    #[must_use]
    pub const fn is_dynamic(self) -> bool {
        matches!(self, InvokeKind::Virtual | InvokeKind::Interface)
    }
}

/// Relational operator of a conditional branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Comparison {
    /// `==`
    #[strum(serialize = "eq")]
    Eq,
    /// `!=`
    #[strum(serialize = "ne")]
    Ne,
    /// `<`
    #[strum(serialize = "lt")]
    Lt,
    /// `>=`
    #[strum(serialize = "ge")]
    Ge,
    /// `>`
    #[strum(serialize = "gt")]
    Gt,
    /// `<=`
    #[strum(serialize = "le")]
    Le,
}

impl Comparison {
    /// Evaluates the comparison on two integers.
    #[must_use]
    pub fn holds(self, left: i32, right: i32) -> bool {
        match self {
            Comparison::Eq => left == right,
            Comparison::Ne => left != right,
            Comparison::Lt => left < right,
            Comparison::Ge => left >= right,
            Comparison::Gt => left > right,
            Comparison::Le => left <= right,
        }
    }
}

/// Condition of a [`Instruction::Jump`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    /// Unconditional jump, consumes nothing
    Always,
    /// Compares one int against zero
    Zero(Comparison),
    /// Compares two ints
    IntCompare(Comparison),
    /// Branches if the reference is null
    Null,
    /// Branches if the reference is not null
    NonNull,
}

impl Condition {
    /// Number of operands the condition pops from the stack.
    #[must_use]
    pub const fn operand_count(self) -> usize {
        match self {
            Condition::Always => 0,
            Condition::Zero(_) | Condition::Null | Condition::NonNull => 1,
            Condition::IntCompare(_) => 2,
        }
    }
}

/// A single instruction of a method body.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Does nothing
    Nop,
    /// Position marker for branch targets
    Label(Label),
    /// Pushes a constant
    Const(Constant),
    /// Pushes the value of a local slot
    Load {
        /// Expected category of the local
        kind: LocalKind,
        /// Local slot index
        slot: u16,
    },
    /// Pops the stack top into a local slot
    Store {
        /// Category of the stored value
        kind: LocalKind,
        /// Local slot index
        slot: u16,
    },
    /// Adds a constant to an int local in place
    Increment {
        /// Local slot index
        slot: u16,
        /// Signed amount added to the local
        delta: i32,
    },
    /// Pops two numbers, pushes the result
    Arith {
        /// The operation
        op: ArithOp,
        /// Operand and result category
        kind: LocalKind,
    },
    /// Discards the stack top
    Pop,
    /// Duplicates the stack top
    Dup,
    /// Calls a method
    Invoke {
        /// Dispatch flavour
        kind: InvokeKind,
        /// Internal name of the declaring type
        owner: String,
        /// Method name
        name: String,
        /// Method descriptor, e.g. `()Ljava/util/Iterator;`
        descriptor: String,
    },
    /// Narrows the reference on the stack top to the named type
    CheckCast(String),
    /// Transfers control to `target` if `condition` holds
    Jump {
        /// Branch condition
        condition: Condition,
        /// Branch target
        target: Label,
    },
    /// Returns from the method, with a value of the given category if present
    Return(Option<LocalKind>),
}

impl Instruction {
    /// Creates a call instruction.
    #[must_use]
    pub fn invoke(kind: InvokeKind, owner: &str, name: &str, descriptor: &str) -> Self {
        Instruction::Invoke {
            kind,
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        }
    }

    /// Returns `true` if control never falls through to the next instruction.
    #[must_use]
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instruction::Return(_)
                | Instruction::Jump {
                    condition: Condition::Always,
                    ..
                }
        )
    }

    /// Returns the branch target of a jump.
    #[must_use]
    pub fn branch_target(&self) -> Option<Label> {
        match self {
            Instruction::Jump { target, .. } => Some(*target),
            _ => None,
        }
    }

    /// Returns `true` for a dynamically dispatched call named `name`.
    #[must_use]
    pub fn is_dynamic_call_named(&self, name: &str) -> bool {
        matches!(self, Instruction::Invoke { kind, name: n, .. } if kind.is_dynamic() && n == name)
    }

    /// Returns `(kind, slot)` if this is a store instruction.
    #[must_use]
    pub fn as_store(&self) -> Option<(LocalKind, u16)> {
        match self {
            Instruction::Store { kind, slot } => Some((*kind, *slot)),
            _ => None,
        }
    }

    /// Returns `(kind, slot)` if this is a load instruction.
    #[must_use]
    pub fn as_load(&self) -> Option<(LocalKind, u16)> {
        match self {
            Instruction::Load { kind, slot } => Some((*kind, *slot)),
            _ => None,
        }
    }

    /// Returns the target type name if this is a cast.
    #[must_use]
    pub fn as_cast(&self) -> Option<&str> {
        match self {
            Instruction::CheckCast(type_name) => Some(type_name),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Nop => f.write_str("nop"),
            Instruction::Label(label) => write!(f, "{label}:"),
            Instruction::Const(constant) => match constant {
                Constant::Null => f.write_str("aconst_null"),
                Constant::Int(v) => write!(f, "ldc {v}"),
                Constant::Long(v) => write!(f, "ldc {v}L"),
                Constant::Float(v) => write!(f, "ldc {v}F"),
                Constant::Double(v) => write!(f, "ldc {v}D"),
                Constant::String(v) => write!(f, "ldc {v:?}"),
            },
            Instruction::Load { kind, slot } => write!(f, "{kind}load {slot}"),
            Instruction::Store { kind, slot } => write!(f, "{kind}store {slot}"),
            Instruction::Increment { slot, delta } => write!(f, "iinc {slot} {delta}"),
            Instruction::Arith { op, kind } => write!(f, "{kind}{op}"),
            Instruction::Pop => f.write_str("pop"),
            Instruction::Dup => f.write_str("dup"),
            Instruction::Invoke {
                kind,
                owner,
                name,
                descriptor,
            } => write!(f, "{kind} {owner}.{name}{descriptor}"),
            Instruction::CheckCast(type_name) => write!(f, "checkcast {type_name}"),
            Instruction::Jump { condition, target } => match condition {
                Condition::Always => write!(f, "goto {target}"),
                Condition::Zero(cmp) => write!(f, "if{cmp} {target}"),
                Condition::IntCompare(cmp) => write!(f, "if_icmp{cmp} {target}"),
                Condition::Null => write!(f, "ifnull {target}"),
                Condition::NonNull => write!(f, "ifnonnull {target}"),
            },
            Instruction::Return(None) => f.write_str("return"),
            Instruction::Return(Some(kind)) => write!(f, "{kind}return"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_disassembly() {
        let next = Instruction::invoke(
            InvokeKind::Interface,
            "java/util/Iterator",
            "next",
            "()Ljava/lang/Object;",
        );
        assert_eq!(
            next.to_string(),
            "invokeinterface java/util/Iterator.next()Ljava/lang/Object;"
        );
        assert_eq!(
            Instruction::Store {
                kind: LocalKind::Reference,
                slot: 3
            }
            .to_string(),
            "astore 3"
        );
        assert_eq!(
            Instruction::Jump {
                condition: Condition::IntCompare(Comparison::Ge),
                target: Label(2)
            }
            .to_string(),
            "if_icmpge L2"
        );
        assert_eq!(Instruction::Return(Some(LocalKind::Long)).to_string(), "lreturn");
    }

    #[test]
    fn test_terminators() {
        assert!(Instruction::Return(None).is_terminator());
        assert!(Instruction::Jump {
            condition: Condition::Always,
            target: Label(0)
        }
        .is_terminator());
        assert!(!Instruction::Jump {
            condition: Condition::Null,
            target: Label(0)
        }
        .is_terminator());
        assert!(!Instruction::Nop.is_terminator());
    }

    #[test]
    fn test_dynamic_call_named() {
        let call = Instruction::invoke(InvokeKind::Virtual, "kotlin/ranges/IntRange", "iterator", "()Ljava/util/Iterator;");
        assert!(call.is_dynamic_call_named("iterator"));
        assert!(!call.is_dynamic_call_named("next"));

        let stat = Instruction::invoke(InvokeKind::Static, "Foo", "iterator", "()V");
        assert!(!stat.is_dynamic_call_named("iterator"));
    }
}
