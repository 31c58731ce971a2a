use crate::ir::Module;
use crate::node::{NodeArena, NodeId};

use super::algebra::Query;
use super::resolve::{resolve, ResolveOutcome};

/// Outcome of rewriting `query` across one node without deciding its
/// truth value (`SPEC_FULL.md` §4.1's `substitute`). Only meaningful to
/// call once `resolve` on the same `(node, query)` has reported
/// [`ResolveOutcome::Unresolved`] or [`ResolveOutcome::EntersCallee`] —
/// both operations share the same underlying instruction walk, so this
/// simply asks for the walk's rewritten state instead of its verdict.
#[derive(Debug, Clone)]
pub enum SubstituteOutcome {
    /// The rewritten query, to be pushed to `node`'s ordinary predecessors.
    Rewritten(Query),
    /// The walk reached a call whose effect on `query` can only be
    /// determined by looking into the callee.
    EntersCallee { callee: crate::ir::FunctionId, query: Query },
}

pub fn substitute(arena: &NodeArena, module: &Module, node: NodeId, query: &Query) -> SubstituteOutcome {
    match resolve(arena, module, node, query) {
        ResolveOutcome::Unresolved { rewritten } => SubstituteOutcome::Rewritten(rewritten),
        ResolveOutcome::EntersCallee { callee, query } => SubstituteOutcome::EntersCallee { callee, query },
        ResolveOutcome::Resolved { .. } => {
            // Callers only reach for `substitute` after `resolve` failed;
            // resolving here too just means nothing is left to carry
            // backward, so behave as a no-op rewrite.
            SubstituteOutcome::Rewritten(query.clone())
        }
    }
}
