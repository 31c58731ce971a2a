use std::fmt;

use smallvec::SmallVec;

use crate::ir::{ArithOp, Constant, Value};
use crate::node::NodeId;

/// The operators a [`Query`] can carry. Declaration order matters: it fixes
/// the derived [`Ord`] used to keep `startSet`/`presentSet`/`endSet`
/// iteration deterministic (see `DESIGN.md`'s note on `Query::operator<`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueryOperator {
    IsTrue,
    AreEqual,
    AreNotEqual,
    Sgt,
    Ugt,
    Sge,
    Uge,
    Slt,
    Ult,
    Sle,
    Ule,
}

impl QueryOperator {
    /// The operator obtained by reversing the comparison's operand order
    /// (`a OP b` becomes `b OP.reversed() a`), used when a constant found
    /// on the left of an `ICmp` must move to the right.
    pub fn reversed(self) -> QueryOperator {
        use QueryOperator::*;
        match self {
            IsTrue => IsTrue,
            AreEqual => AreEqual,
            AreNotEqual => AreNotEqual,
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

    pub fn evaluate(self, lhs: &Constant, rhs: &Constant) -> bool {
        match self {
            QueryOperator::IsTrue => !lhs.is_zero(),
            QueryOperator::AreEqual => lhs == rhs,
            QueryOperator::AreNotEqual => lhs != rhs,
            QueryOperator::Sgt => lhs.sgt(rhs),
            QueryOperator::Ugt => lhs.ugt(rhs),
            QueryOperator::Sge => lhs.sge(rhs),
            QueryOperator::Uge => lhs.uge(rhs),
            QueryOperator::Slt => lhs.slt(rhs),
            QueryOperator::Ult => lhs.ult(rhs),
            QueryOperator::Sle => lhs.sle(rhs),
            QueryOperator::Ule => lhs.ule(rhs),
        }
    }
}

/// The outcome of resolving a [`Query`] at some node. Ordered so that
/// sets of `(Query, QueryResolution, CallStack)` triples (e.g. the demand-
/// driven def-use engine's IPP, see `crate::defuse`) can live in a
/// `BTreeSet` with deterministic iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryResolution {
    True,
    False,
    Undefined,
}

impl fmt::Display for QueryResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryResolution::True => write!(f, "T"),
            QueryResolution::False => write!(f, "F"),
            QueryResolution::Undefined => write!(f, "U"),
        }
    }
}

/// A symbolic predicate propagated backward through the CFG: "does `lhs
/// op rhs` hold here?". `rhs = None` is only meaningful with
/// [`QueryOperator::IsTrue`] (asking whether `lhs` itself is truthy).
///
/// Field declaration order is load-bearing: it fixes the derived
/// [`PartialOrd`]/[`Ord`] to match the reference implementation's manual
/// `operator<` (`lhs`, then `op`, then `rhs`, then the summary-node flag,
/// then the pending-operations stack), keeping set iteration deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Query {
    pub lhs: Value,
    pub op: QueryOperator,
    pub rhs: Option<Constant>,
    /// Marks a query produced inside a callee, to be answered by resuming
    /// at the caller's summary rather than continuing past the entry node.
    pub is_summary_node_query: bool,
    /// Arithmetic folded along the way from the original use site to the
    /// current node, applied to a found constant before the final compare.
    pub pending_ops: SmallVec<[(ArithOp, Constant); 4]>,
}

impl Query {
    pub fn new(lhs: Value, op: QueryOperator, rhs: Option<Constant>) -> Self {
        Query { lhs, op, rhs, is_summary_node_query: false, pending_ops: SmallVec::new() }
    }

    pub fn is_true(lhs: Value) -> Self {
        Query::new(lhs, QueryOperator::IsTrue, None)
    }

    pub fn with_lhs(&self, lhs: Value) -> Self {
        Query { lhs, ..self.clone() }
    }

    pub fn as_summary_node_query(&self) -> Self {
        Query { is_summary_node_query: true, ..self.clone() }
    }

    /// Apply this query's pending arithmetic to a constant found at a
    /// definition site, then evaluate against `rhs` (or truthiness, for
    /// `IsTrue`). Per `SPEC_FULL.md` §4.1's constant-resolution rule:
    /// `IsTrue` resolves `True` iff the folded constant is nonzero, `False`
    /// otherwise; the comparison operators resolve `True` when the
    /// comparison holds and `False` otherwise. [`QueryResolution::True`]
    /// means the query's literal proposition holds at this point.
    pub fn resolve_against_constant(&self, found: &Constant) -> QueryResolution {
        let mut value = *found;
        for (op, operand) in &self.pending_ops {
            value = match op {
                ArithOp::Add => value.add(operand),
                ArithOp::Sub => value.sub(operand),
                ArithOp::Mul => value.mul(operand),
                ArithOp::SDiv => match value.sdiv(operand) {
                    Some(v) => v,
                    None => return QueryResolution::Undefined,
                },
                ArithOp::UDiv => match value.udiv(operand) {
                    Some(v) => v,
                    None => return QueryResolution::Undefined,
                },
            };
        }
        let holds = match self.rhs {
            Some(rhs) => self.op.evaluate(&value, &rhs),
            None => self.op.evaluate(&value, &value.with_same_width_zero()),
        };
        if holds {
            QueryResolution::True
        } else {
            QueryResolution::False
        }
    }
}

impl Constant {
    fn with_same_width_zero(&self) -> Constant {
        Constant::new(self.bit_width(), 0)
    }
}

/// Ordered sequence of call-site nodes describing the dynamic calling
/// context under which a resolution was observed. The empty stack is a
/// context-independent ("true for every caller") result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallStack(pub SmallVec<[NodeId; 4]>);

impl CallStack {
    pub fn empty() -> Self {
        CallStack(SmallVec::new())
    }

    pub fn pushed(&self, site: NodeId) -> Self {
        let mut s = self.clone();
        s.0.push(site);
        s
    }

    pub fn popped(&self) -> Option<(NodeId, CallStack)> {
        if self.0.is_empty() {
            return None;
        }
        let mut s = self.clone();
        let top = s.0.pop().unwrap();
        Some((top, s))
    }

    pub fn top(&self) -> Option<NodeId> {
        self.0.last().copied()
    }

    /// `true` if `self` is a suffix of `query_context` — i.e. a stored
    /// result observed under `self` still applies when asking under the
    /// more specific `query_context`. Implements the "stack-suffix
    /// filtering" DESIGN.md marks as the intended final interprocedural
    /// behavior.
    pub fn is_suffix_of(&self, query_context: &CallStack) -> bool {
        if self.0.len() > query_context.0.len() {
            return false;
        }
        let offset = query_context.0.len() - self.0.len();
        self.0.as_slice() == &query_context.0[offset..]
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CallStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, n) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", n.0)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::LocalId;

    fn v(n: u32) -> Value {
        Value::Local(LocalId(n))
    }

    #[test]
    fn query_ordering_is_lexicographic_by_field() {
        let a = Query::new(v(0), QueryOperator::IsTrue, None);
        let b = Query::new(v(1), QueryOperator::IsTrue, None);
        assert!(a < b, "lhs compared first");

        let c = Query::new(v(0), QueryOperator::AreEqual, None);
        assert!(a < c, "op compared second, IsTrue < AreEqual by declaration order");
    }

    #[test]
    fn suffix_filtering() {
        let outer = CallStack::empty().pushed(NodeId(1));
        let inner = outer.pushed(NodeId(2));
        assert!(outer.is_suffix_of(&inner));
        assert!(!inner.is_suffix_of(&outer));
        assert!(outer.is_suffix_of(&outer));
    }

    #[test]
    fn is_true_query_resolves_on_nonzero() {
        let q = Query::is_true(v(0));
        assert_eq!(q.resolve_against_constant(&Constant::new(32, 1)), QueryResolution::True);
        assert_eq!(q.resolve_against_constant(&Constant::new(32, 0)), QueryResolution::False);
    }

    #[test]
    fn equality_query_resolves_when_comparison_holds() {
        let q = Query::new(v(0), QueryOperator::AreEqual, Some(Constant::new(32, 5)));
        assert_eq!(q.resolve_against_constant(&Constant::new(32, 5)), QueryResolution::True);
        assert_eq!(q.resolve_against_constant(&Constant::new(32, 6)), QueryResolution::False);
    }
}
