//! The query algebra: a symbolic predicate propagated backward through the
//! interprocedural CFG, and the two per-node primitives — `substitute`
//! (rewrite without deciding) and `resolve` (decide outright) — that the
//! infeasible-path detector and the demand-driven def-use engine are both
//! built from.

mod algebra;
mod resolve;
mod substitute;

pub use algebra::{CallStack, Query, QueryOperator, QueryResolution};
pub use resolve::{resolve, ResolveOutcome};
pub use substitute::{substitute, SubstituteOutcome};

use crate::ir::IntPredicate;

/// Maps an `ICmp` predicate to the corresponding [`QueryOperator`], used
/// when an `ICmp`'s non-constant operand becomes a query's new `lhs`.
pub(crate) fn predicate_to_operator(p: IntPredicate) -> QueryOperator {
    match p {
        IntPredicate::Eq => QueryOperator::AreEqual,
        IntPredicate::Ne => QueryOperator::AreNotEqual,
        IntPredicate::Sgt => QueryOperator::Sgt,
        IntPredicate::Sge => QueryOperator::Sge,
        IntPredicate::Slt => QueryOperator::Slt,
        IntPredicate::Sle => QueryOperator::Sle,
        IntPredicate::Ugt => QueryOperator::Ugt,
        IntPredicate::Uge => QueryOperator::Uge,
        IntPredicate::Ult => QueryOperator::Ult,
        IntPredicate::Ule => QueryOperator::Ule,
    }
}
