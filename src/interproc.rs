//! The interprocedural extension: a function-query cache that lets the
//! backward walk cross call/return edges in the flat node arena (built by
//! [`crate::node`]) while still terminating on (mutually) recursive
//! functions, plus call-stack-suffix filtering for context-aware lookups.
//!
//! Grounded on `InterproceduralInfeasiblePathDetector.h`'s interprocedural
//! path; see `DESIGN.md` for why this crate's recursion guard is a
//! deliberately simplified, single-pass stand-in for the header's three
//! diverging (and non-terminating, in places) recursive drafts.

use log::trace;
use rustc_hash::FxHashMap;

use crate::ir::FunctionId;
use crate::query::Query;

/// State of a `(function, query)` pair's exploration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CacheState {
    /// Currently being drained by an outer Step 1 invocation; seen again
    /// means a direct or mutual recursive cycle.
    InProgress,
    /// Fully drained at least once; further requests may proceed (the
    /// node-level `visited` set is what actually prevents redundant work
    /// at that point).
    Done,
}

/// Memoizes, per `(function, query)`, whether that function's body has
/// already been (or is currently being) explored for that query — this is
/// what makes recursive functions terminate: the cache keys deliberately
/// omit the call stack (`SPEC_FULL.md` §3.3), so a function is drained at
/// most once per distinct query shape regardless of call depth.
#[derive(Debug, Default)]
pub struct FunctionQueryCache {
    entries: FxHashMap<(FunctionId, Query), CacheState>,
}

/// What the caller should do about a `(function, query)` pair it is about
/// to cross into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryDecision {
    /// First time seeing this pair: proceed into the function normally.
    Proceed,
    /// Already mid-computation for this exact pair (a recursive cycle):
    /// do not descend again: the recursive call contributes nothing
    /// further to the query's resolution on this path.
    Cycle,
}

impl FunctionQueryCache {
    pub fn new() -> Self {
        FunctionQueryCache::default()
    }

    /// Call before pushing a work item at `function`'s entry node for
    /// `query`. Marks the pair in-progress on [`EntryDecision::Proceed`].
    pub fn enter(&mut self, function: FunctionId, query: &Query) -> EntryDecision {
        match self.entries.get(&(function, query.clone())) {
            Some(CacheState::InProgress) => {
                trace!(target: "pathquery::interproc", "recursive cycle on {function:?}, short-circuiting");
                EntryDecision::Cycle
            }
            Some(CacheState::Done) | None => {
                self.entries.insert((function, query.clone()), CacheState::InProgress);
                EntryDecision::Proceed
            }
        }
    }

    /// Call once `function`'s body has been fully drained for `query`.
    pub fn finish(&mut self, function: FunctionId, query: &Query) {
        self.entries.insert((function, query.clone()), CacheState::Done);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{LocalId, Value};
    use crate::query::QueryOperator;

    fn q() -> Query {
        Query::new(Value::Local(LocalId(0)), QueryOperator::IsTrue, None)
    }

    #[test]
    fn recursive_reentry_is_detected() {
        let mut cache = FunctionQueryCache::new();
        let f = FunctionId(0);
        assert_eq!(cache.enter(f, &q()), EntryDecision::Proceed);
        assert_eq!(cache.enter(f, &q()), EntryDecision::Cycle);
        cache.finish(f, &q());
        // after finishing, a fresh top-level request still sees Done, not
        // a cycle — the node-level visited set is what prevents the
        // corresponding redundant work from actually happening again.
        assert_eq!(cache.enter(f, &q()), EntryDecision::Proceed);
    }
}
