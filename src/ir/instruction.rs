use super::value::{Constant, Value};
use std::fmt;

/// Handle into a function's block table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

/// Handle into a module's function table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub u32);

/// Index of an instruction within its block's straight-line sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstIndex(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntPredicate {
    Eq,
    Ne,
    Sgt,
    Sge,
    Slt,
    Sle,
    Ugt,
    Uge,
    Ult,
    Ule,
}

impl IntPredicate {
    /// Predicate obtained by swapping the operand order: `a P b` == `b P.swapped() a`.
    pub fn swapped(self) -> IntPredicate {
        use IntPredicate::*;
        match self {
            Eq => Eq,
            Ne => Ne,
            Sgt => Slt,
            Slt => Sgt,
            Sge => Sle,
            Sle => Sge,
            Ugt => Ult,
            Ult => Ugt,
            Uge => Ule,
            Ule => Uge,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    SDiv,
    UDiv,
}

/// One instruction in a basic block. `result` is `None` for instructions
/// that do not produce a value (`Store`, `Br`, `Ret`, and calls to
/// void-returning functions).
#[derive(Debug, Clone)]
pub struct Instruction {
    pub result: Option<Value>,
    pub kind: InstKind,
}

#[derive(Debug, Clone)]
pub enum InstKind {
    /// Reserves stack storage for a function-local variable, named by its
    /// produced pointer value.
    Alloca { name: String },
    /// `store value -> pointer`.
    Store { pointer: Value, value: Operand },
    /// `result = load pointer`.
    Load { pointer: Value },
    /// `result = trunc value to bit_width`.
    Trunc { value: Value, bit_width: u32 },
    /// `result = lhs <predicate> rhs`.
    ICmp { predicate: IntPredicate, lhs: Value, rhs: Operand },
    /// `result = lhs <op> rhs`.
    Arith { op: ArithOp, lhs: Value, rhs: Operand },
    /// `result = gep pointer` — address computation from `pointer`;
    /// opaque beyond "dereferences `pointer`".
    Gep { pointer: Value },
    /// `result = call callee(args)`. `callee = None` models an indirect
    /// or external/opaque call.
    Call { callee: Option<FunctionId>, args: Vec<Value> },
    /// `br condition ? then_block : else_block`, or an unconditional `br target`.
    Br { condition: Option<Value>, then_block: BlockId, else_block: Option<BlockId> },
    /// `ret value?`.
    Ret { value: Option<Operand> },
    /// Anything not modeled above; treated as opaque by every resolver rule.
    Other,
}

/// Either a concrete SSA value or an inline constant — used for the RHS of
/// stores/compares/arithmetic where the source IR may have already folded
/// a constant in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Value(Value),
    Constant(Constant),
}

impl Operand {
    pub fn as_constant(&self) -> Option<Constant> {
        match self {
            Operand::Constant(c) => Some(*c),
            Operand::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<Value> {
        match self {
            Operand::Value(v) => Some(*v),
            Operand::Constant(_) => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Value(v) => write!(f, "{v}"),
            Operand::Constant(c) => write!(f, "{c}"),
        }
    }
}

impl Instruction {
    pub fn is_call(&self) -> bool {
        matches!(self.kind, InstKind::Call { .. })
    }

    /// The called function, if this is a call to a known (non-opaque) callee.
    pub fn call_target(&self) -> Option<FunctionId> {
        match &self.kind {
            InstKind::Call { callee, .. } => *callee,
            _ => None,
        }
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self.kind, InstKind::Br { .. } | InstKind::Ret { .. })
    }
}
