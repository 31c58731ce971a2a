use crate::ir::{Constant, InstKind, Module, Value};
use crate::node::{NodeArena, NodeId};

use super::algebra::{Query, QueryOperator, QueryResolution};

/// Outcome of walking one node's instructions looking for a definitive
/// answer to a query (`SPEC_FULL.md` §4.1's `resolve`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// `query` is the fully rewritten form at the moment of resolution —
    /// e.g. a query seeded as `IsTrue(cmp_result)` arrives here as the
    /// plain comparison (`x == 0`) it was rewritten into while walking
    /// past the defining `ICmp`/`Load`/`Store` chain. Callers that report
    /// results to a user want this form, not the original seed.
    Resolved { query: Query, resolution: QueryResolution },
    /// The walk reached a call to a known function without resolving;
    /// the (possibly rewritten, marked as a summary-node query) query
    /// must be answered by looking into the callee — see `interproc.rs`.
    EntersCallee { callee: crate::ir::FunctionId, query: Query },
    /// The walk exhausted this node's instructions without resolving.
    /// Carries the query as rewritten along the way, ready to be handed
    /// to this node's predecessors by `substitute`.
    Unresolved { rewritten: Query },
}

/// The terminal outcome of walking exactly one node's instructions,
/// shared by `resolve` and `substitute`: both rewrite `lhs` identically as
/// they walk past loads/truncs/returns, they differ only in what they do
/// once the node's instructions are exhausted.
enum WalkEnd {
    Resolved(QueryResolution),
    EntersCallee { callee: crate::ir::FunctionId, query: Query },
    Exhausted,
}

fn walk(arena: &NodeArena, module: &Module, node: NodeId, q: &mut Query) -> WalkEnd {
    if arena.is_entry_of_function(node) {
        if let Value::Global(g) = q.lhs {
            if let Some(init) = module.global(g).initializer {
                return WalkEnd::Resolved(q.resolve_against_constant(&init));
            }
        }
    }

    for inst in arena.instructions_rev(node, module) {
        match &inst.kind {
            InstKind::Store { pointer, value } if *pointer == q.lhs => {
                return match value.as_constant() {
                    Some(c) => WalkEnd::Resolved(q.resolve_against_constant(&c)),
                    None => WalkEnd::Exhausted,
                };
            }
            InstKind::Load { pointer } if inst.result == Some(q.lhs) => {
                q.lhs = *pointer;
            }
            InstKind::Gep { pointer } if *pointer == q.lhs && q.op == QueryOperator::IsTrue => {
                return WalkEnd::Resolved(QueryResolution::False);
            }
            InstKind::Call { callee: None, .. } => {
                if let Value::Global(_) = q.lhs {
                    return WalkEnd::Resolved(QueryResolution::Undefined);
                }
            }
            InstKind::Call { callee: Some(f), .. } if inst.result == Some(q.lhs) => {
                return WalkEnd::EntersCallee {
                    callee: *f,
                    query: q.with_lhs(Value::Return).as_summary_node_query(),
                };
            }
            InstKind::Call { callee: Some(f), .. } => {
                if let Value::Global(_) = q.lhs {
                    return WalkEnd::EntersCallee { callee: *f, query: q.as_summary_node_query() };
                }
            }
            InstKind::Ret { value: Some(v) } if q.lhs == Value::Return => match v.as_constant() {
                Some(c) => return WalkEnd::Resolved(q.resolve_against_constant(&c)),
                None => q.lhs = v.as_value().expect("non-constant operand must be a value"),
            },
            InstKind::Trunc { value, bit_width } if inst.result == Some(q.lhs) && q.op == QueryOperator::IsTrue => {
                if *bit_width != 1 {
                    return WalkEnd::Resolved(QueryResolution::Undefined);
                }
                q.lhs = *value;
            }
            InstKind::ICmp { predicate, lhs, rhs } if inst.result == Some(q.lhs) && q.op == QueryOperator::IsTrue => {
                match rhs.as_constant() {
                    Some(c) => {
                        q.lhs = *lhs;
                        q.rhs = Some(c);
                        q.op = super::predicate_to_operator(*predicate);
                    }
                    None => return WalkEnd::Resolved(QueryResolution::Undefined),
                }
            }
            InstKind::Arith { op, lhs, rhs } if inst.result == Some(q.lhs) => match rhs.as_constant() {
                Some(c) => {
                    q.pending_ops.push((*op, c));
                    q.lhs = *lhs;
                }
                None => return WalkEnd::Resolved(QueryResolution::Undefined),
            },
            _ => {}
        }
    }

    if let Some(resolution) = dominating_branch_resolution(arena, module, node, q) {
        return WalkEnd::Resolved(resolution);
    }

    if arena.is_entry_of_function(node) {
        return WalkEnd::Resolved(QueryResolution::Undefined);
    }

    WalkEnd::Exhausted
}

/// The negation of a [`QueryOperator`]'s comparison (`not(a op b)`), as
/// opposed to [`QueryOperator::reversed`] (swapping operand sides).
/// `IsTrue` has no representable negation in this algebra (there is no
/// "is false" operator), so it is left out.
fn negated(op: QueryOperator) -> Option<QueryOperator> {
    use QueryOperator::*;
    Some(match op {
        IsTrue => return None,
        AreEqual => AreNotEqual,
        AreNotEqual => AreEqual,
        Sgt => Sle,
        Sle => Sgt,
        Sge => Slt,
        Slt => Sge,
        Ugt => Ule,
        Ule => Ugt,
        Uge => Ult,
        Ult => Uge,
    })
}

/// The inclusive `[lo, hi]` range of values satisfying `lhs op c`, in
/// whichever domain (signed or unsigned) `op` belongs to. `None` for
/// operators with no contiguous-interval shape (`AreNotEqual`, `IsTrue`).
fn interval(op: QueryOperator, c: &Constant) -> Option<(i128, i128)> {
    let w = c.bit_width();
    // Shift amounts clamped below 127/128 so a 128-bit-wide constant's
    // true bound (which would itself need more than 127 bits to hold as a
    // positive `i128`) doesn't overflow; this only narrows precision at
    // that one extreme width, not at the 32/64-bit widths this crate
    // actually exercises.
    let (smin, smax) = (-(1i128 << (w - 1).min(126)), (1i128 << (w - 1).min(126)) - 1);
    let (umin, umax) = (0i128, (1i128 << w.min(127)) - 1);
    match op {
        QueryOperator::AreEqual => Some((c.signed_value(), c.signed_value())),
        QueryOperator::Sgt => Some((c.signed_value().saturating_add(1), smax)),
        QueryOperator::Sge => Some((c.signed_value(), smax)),
        QueryOperator::Slt => Some((smin, c.signed_value().saturating_sub(1))),
        QueryOperator::Sle => Some((smin, c.signed_value())),
        QueryOperator::Ugt => Some((c.unsigned_value().saturating_add(1), umax)),
        QueryOperator::Uge => Some((c.unsigned_value(), umax)),
        QueryOperator::Ult => Some((umin, c.unsigned_value().saturating_sub(1))),
        QueryOperator::Ule => Some((umin, c.unsigned_value())),
        QueryOperator::AreNotEqual | QueryOperator::IsTrue => None,
    }
}

/// Whether `lhs op1 c1` and `lhs op2 c2` can never both hold for the same
/// `lhs`. Handles the interval-shaped operators directly; `AreNotEqual` is
/// only handled against an equality on the same constant, which is the one
/// case that is unconditionally decidable without knowing the type's full
/// value range.
fn mutually_exclusive(op1: QueryOperator, c1: &Constant, op2: QueryOperator, c2: &Constant) -> bool {
    match (op1, op2) {
        (QueryOperator::AreNotEqual, QueryOperator::AreEqual) | (QueryOperator::AreEqual, QueryOperator::AreNotEqual) => {
            c1 == c2
        }
        _ => match (interval(op1, c1), interval(op2, c2)) {
            (Some((lo1, hi1)), Some((lo2, hi2))) => hi1 < lo2 || hi2 < lo1,
            _ => false,
        },
    }
}

/// Finds the `ICmp` in `p`'s own instructions that defines `condition`,
/// giving the direct comparison it stands for, then keeps walking `p`
/// backward chasing `Load`s the same way the main walk does — so the
/// comparison's `lhs` ends up normalized down to the same pointer/value a
/// query would be rewritten to by the time it reaches `p`'s end, making it
/// comparable to `q.lhs`. `None` if `condition` was not locally computed by
/// a foldable comparison (e.g. it is itself a stored boolean) — the
/// dominating-branch rule only fires on the cases it can reason about
/// precisely.
fn branch_comparison(arena: &NodeArena, module: &Module, p: NodeId, condition: Value) -> Option<(Value, QueryOperator, Constant)> {
    let mut found: Option<(Value, QueryOperator, Constant)> = None;
    for inst in arena.instructions_rev(p, module) {
        match &found {
            None if inst.result == Some(condition) => {
                let InstKind::ICmp { predicate, lhs, rhs } = &inst.kind else { return None };
                let c = rhs.as_constant()?;
                found = Some((*lhs, super::predicate_to_operator(*predicate), c));
            }
            Some((lhs, _, _)) => {
                if let InstKind::Load { pointer } = &inst.kind {
                    if inst.result == Some(*lhs) {
                        found.as_mut().unwrap().0 = *pointer;
                    }
                }
            }
            None => {}
        }
    }
    found
}

/// `SPEC_FULL.md` §4.1's last `resolve` rule: a node with exactly one
/// predecessor ending in a conditional branch whose guard is inconsistent
/// with the current query refutes it (`False`) — e.g. `if (x > 0) { .. }
/// if (x < 0) { .. }` with `x` unchanged between: inside the first
/// branch's true successor, `x < 0` is refuted by the dominating `x > 0`.
/// Only fires for plain, non-rewritten queries (`pending_ops` empty):
/// folding arithmetic through the dominating comparison as well would
/// need the comparison re-derived relative to the same base value, which
/// this rule does not attempt.
fn dominating_branch_resolution(arena: &NodeArena, module: &Module, node: NodeId, q: &Query) -> Option<QueryResolution> {
    if !q.pending_ops.is_empty() {
        return None;
    }
    let current_rhs = q.rhs?;
    let preds = arena.predecessors(node);
    let [p] = preds else { return None };
    let p = *p;

    let p_function = arena.function_of(p);
    let p_block = arena.block_of(p);
    let terminator = module.function(p_function).block(p_block).terminator()?;
    let InstKind::Br { condition: Some(condition), then_block, else_block: Some(else_block) } = &terminator.kind else {
        return None;
    };
    let is_true_edge = node == arena.block_first(p_function, *then_block);
    if !is_true_edge && node != arena.block_first(p_function, *else_block) {
        return None;
    }

    let (guard_lhs, guard_op, guard_rhs) = branch_comparison(arena, module, p, *condition)?;
    let guard_op = if is_true_edge { guard_op } else { negated(guard_op)? };

    if guard_lhs != q.lhs {
        return None;
    }
    if mutually_exclusive(guard_op, &guard_rhs, q.op, &current_rhs) {
        Some(QueryResolution::False)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FunctionBuilder, IntPredicate};

    /// `if (x > 0) { .. } if (x < 0) { .. }` with `x` unchanged between:
    /// along the first branch's true edge, `x < 0` is refuted outright.
    #[test]
    fn dominating_branch_refutes_correlated_condition() {
        let mut module = Module::new();
        let fid = module.create_function("f");
        let (first_true, x);
        {
            let f = module.function_mut(fid);
            let mut b = FunctionBuilder::new(f);
            x = b.alloca("x");
            let loaded = b.load(x);
            let gt = b.icmp(IntPredicate::Sgt, loaded, Constant::new(32, 0));
            first_true = b.create_block("first_true");
            let first_false = b.create_block("first_false");
            b.br(gt, first_true, first_false);

            b.switch_to_block(first_true);
            let loaded2 = b.load(x);
            let lt = b.icmp(IntPredicate::Slt, loaded2, Constant::new(32, 0));
            let second_true = b.create_block("second_true");
            let second_false = b.create_block("second_false");
            b.br(lt, second_true, second_false);
            b.switch_to_block(second_true);
            b.ret(None::<Constant>);
            b.switch_to_block(second_false);
            b.ret(None::<Constant>);

            b.switch_to_block(first_false);
            b.ret(None::<Constant>);
        }

        let arena = NodeArena::build(&module);
        let second_branch = arena.block_tail(fid, first_true);
        let q0 = Query::is_true(arena_cond(&module, fid, first_true));
        let outcome = resolve(&arena, &module, second_branch, &q0);
        assert_eq!(
            outcome,
            ResolveOutcome::Resolved {
                query: Query::new(x, QueryOperator::Slt, Some(Constant::new(32, 0))),
                resolution: QueryResolution::False
            }
        );
    }

    fn arena_cond(module: &Module, fid: crate::ir::FunctionId, block: crate::ir::BlockId) -> Value {
        match &module.function(fid).block(block).terminator().unwrap().kind {
            InstKind::Br { condition: Some(c), .. } => *c,
            _ => panic!("expected a conditional branch"),
        }
    }
}

/// Walk `node`'s instructions in reverse, trying to resolve `query`
/// outright. Mirrors `InterproceduralInfeasiblePathDetector.h`'s `resolve`.
pub fn resolve(arena: &NodeArena, module: &Module, node: NodeId, query: &Query) -> ResolveOutcome {
    let mut q = query.clone();
    match walk(arena, module, node, &mut q) {
        WalkEnd::Resolved(r) => ResolveOutcome::Resolved { query: q, resolution: r },
        WalkEnd::EntersCallee { callee, query } => ResolveOutcome::EntersCallee { callee, query },
        WalkEnd::Exhausted => ResolveOutcome::Unresolved { rewritten: q },
    }
}
