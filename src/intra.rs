//! The infeasible-path detector: the three-pass backward query-propagation
//! algorithm (`SPEC_FULL.md` §4.2), extended to cross call/return edges
//! using the flat interprocedural node arena and the function-query cache
//! (`SPEC_FULL.md` §4.3). Grounded on
//! `InterproceduralInfeasiblePathDetector.h`'s `detectPaths`/`executeStepOne`.

use std::collections::VecDeque;

use log::{debug, trace};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::interproc::{EntryDecision, FunctionQueryCache};
use crate::ir::{InstKind, Module};
use crate::node::{NodeArena, NodeId};
use crate::query::{resolve, CallStack, Query, QueryResolution, ResolveOutcome};

/// A directed edge in the interprocedural CFG, or a virtual call/return
/// stitch recorded when a query crossed into a callee to learn a call's
/// return value or whether a global survived the call.
pub type Edge = (NodeId, NodeId);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeEntry {
    pub query: Query,
    pub resolution: QueryResolution,
    pub call_stack: CallStack,
}

/// The three edge classifications produced by the detector, keyed by
/// edge. See `SPEC_FULL.md` §3.2 for the invariants these must satisfy.
#[derive(Debug, Default, Clone)]
pub struct InfeasiblePathResult {
    start: FxHashMap<Edge, Vec<EdgeEntry>>,
    present: FxHashMap<Edge, Vec<EdgeEntry>>,
    end: FxHashMap<Edge, Vec<EdgeEntry>>,
}

impl InfeasiblePathResult {
    fn push(set: &mut FxHashMap<Edge, Vec<EdgeEntry>>, edge: Edge, entry: EdgeEntry) {
        let v = set.entry(edge).or_default();
        if !v.contains(&entry) {
            v.push(entry);
        }
    }

    pub fn start_set(&self, edge: Edge) -> &[EdgeEntry] {
        self.start.get(&edge).map(Vec::as_slice).unwrap_or(&[])
    }
    pub fn present_set(&self, edge: Edge) -> &[EdgeEntry] {
        self.present.get(&edge).map(Vec::as_slice).unwrap_or(&[])
    }
    pub fn end_set(&self, edge: Edge) -> &[EdgeEntry] {
        self.end.get(&edge).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Entries in `startSet[edge]` whose call stack is a suffix of
    /// `context` — context-aware lookup per `SPEC_FULL.md` §4.3.
    pub fn start_set_in_context<'a>(&'a self, edge: Edge, context: &CallStack) -> Vec<&'a EdgeEntry> {
        self.start_set(edge).iter().filter(|e| e.call_stack.is_suffix_of(context)).collect()
    }

    /// `true` if `edge` is known infeasible under `context` for any query.
    pub fn is_infeasible(&self, edge: Edge, context: &CallStack) -> bool {
        !self.start_set_in_context(edge, context).is_empty()
    }

    /// Unions `other`'s entries into `self`, edge by edge. The driver uses
    /// this to combine the per-branch results computed across a whole
    /// function (or module) into the single structure the def-use engine
    /// consults (`SPEC_FULL.md` §4.5 — the detector is memoised per block,
    /// but the def-use engine needs every block's contribution at once).
    pub fn merge(&mut self, other: &InfeasiblePathResult) {
        for (set, other_set) in [
            (&mut self.start, &other.start),
            (&mut self.present, &other.present),
            (&mut self.end, &other.end),
        ] {
            for (&edge, entries) in other_set {
                for entry in entries {
                    InfeasiblePathResult::push(set, edge, entry.clone());
                }
            }
        }
    }
}

/// A single resolved query at a node, before edge classification.
type ResolutionSet = FxHashSet<(QueryResolution, CallStack)>;

struct Detector<'a> {
    arena: &'a NodeArena,
    module: &'a Module,
    cache: &'a mut FunctionQueryCache,
    /// Every query considered at a node, used for dedup and as the set
    /// Step 2/3 iterate over.
    visited: FxHashMap<NodeId, FxHashSet<Query>>,
    /// Accumulated resolutions per `(node, query)`, grown monotonically.
    resolutions: FxHashMap<(NodeId, Query), ResolutionSet>,
    /// For `(node, query)` pairs that fell through to ordinary
    /// predecessors, the query as rewritten by `substitute` at that node.
    substituted_at: FxHashMap<(NodeId, Query), Query>,
    /// For `(node, query)` pairs that crossed into a callee, the virtual
    /// `(exit node, entered query)` edges used in place of ordinary
    /// predecessors.
    translated_preds: FxHashMap<(NodeId, Query), Vec<(NodeId, Query)>>,
}

impl<'a> Detector<'a> {
    fn step_one(&mut self, branch_node: NodeId, q0: &Query, max_call_stack_depth: usize) {
        let mut worklist: VecDeque<(NodeId, Query, CallStack)> = VecDeque::new();
        worklist.push_back((branch_node, q0.clone(), CallStack::empty()));

        while let Some((n, q, cs)) = worklist.pop_front() {
            let already = self.visited.entry(n).or_default().contains(&q);
            if already {
                continue;
            }
            self.visited.get_mut(&n).unwrap().insert(q.clone());
            trace!(target: "pathquery::intra", "step1 pop node={n:?} cs={cs}");

            match resolve(self.arena, self.module, n, &q) {
                ResolveOutcome::Resolved { resolution: r, .. } => {
                    self.resolutions.entry((n, q.clone())).or_default().insert((r, cs.clone()));
                }
                ResolveOutcome::EntersCallee { callee, query: entered } => {
                    if cs.0.len() >= max_call_stack_depth {
                        self.resolutions
                            .entry((n, q.clone()))
                            .or_default()
                            .insert((QueryResolution::Undefined, cs.clone()));
                        continue;
                    }
                    match self.cache.enter(callee, &entered) {
                        EntryDecision::Cycle => {
                            self.resolutions
                                .entry((n, q.clone()))
                                .or_default()
                                .insert((QueryResolution::Undefined, cs.clone()));
                        }
                        EntryDecision::Proceed => {
                            // Deliberately never `finish()`d within a single
                            // detection run (see `interproc.rs`): this cache
                            // is constructed fresh per run, so leaving the
                            // pair `InProgress` for the run's whole duration
                            // is exactly the guard a recursive cycle needs —
                            // calling `finish()` here would let a second,
                            // still-in-flight recursive call back in as if
                            // it were a fresh top-level request.
                            let exits = self.arena.function_exits(callee).to_vec();
                            let entry = self.translated_preds.entry((n, q.clone())).or_default();
                            for exit in exits {
                                entry.push((exit, entered.clone()));
                                worklist.push_back((exit, entered.clone(), cs.pushed(n)));
                            }
                        }
                    }
                }
                ResolveOutcome::Unresolved { rewritten } => {
                    self.substituted_at.insert((n, q.clone()), rewritten.clone());
                    for &p in self.arena.predecessors(n) {
                        worklist.push_back((p, rewritten.clone(), cs.clone()));
                    }
                }
            }
        }
    }

    /// The effective predecessor set for `(n, q)`: the virtual
    /// call/return stitch if this pair crossed into a callee, otherwise
    /// `n`'s ordinary arena predecessors paired with the rewritten query.
    fn effective_predecessors(&self, n: NodeId, q: &Query) -> Vec<(NodeId, Query, bool)> {
        if let Some(v) = self.translated_preds.get(&(n, q.clone())) {
            return v.iter().map(|(p, eq)| (*p, eq.clone(), true)).collect();
        }
        if let Some(rewritten) = self.substituted_at.get(&(n, q.clone())) {
            return self
                .arena
                .predecessors(n)
                .iter()
                .map(|&p| (p, rewritten.clone(), false))
                .collect();
        }
        Vec::new()
    }

    fn step_two(&mut self) {
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        let mut queued: FxHashSet<NodeId> = FxHashSet::default();
        let seeded_nodes: FxHashSet<NodeId> = self.resolutions.keys().map(|(n, _)| *n).collect();
        for n in seeded_nodes {
            for &s in self.arena.successors(n) {
                if queued.insert(s) {
                    queue.push_back(s);
                }
            }
        }

        while let Some(n) = queue.pop_front() {
            queued.remove(&n);
            let queries: Vec<Query> = match self.visited.get(&n) {
                Some(s) => s.iter().cloned().collect(),
                None => continue,
            };
            for q in queries {
                let preds = self.effective_predecessors(n, &q);
                if preds.is_empty() {
                    continue;
                }
                let mut incoming: Vec<(QueryResolution, CallStack)> = Vec::new();
                for (p, pq, is_call_return) in &preds {
                    if let Some(set) = self.resolutions.get(&(*p, pq.clone())) {
                        for (r, cs) in set {
                            let attributed_cs = if *is_call_return {
                                cs.popped().map(|(_, rest)| rest).unwrap_or_else(|| cs.clone())
                            } else {
                                cs.clone()
                            };
                            incoming.push((*r, attributed_cs));
                        }
                    }
                }
                let entry = self.resolutions.entry((n, q.clone())).or_default();
                let before = entry.len();
                for item in incoming {
                    entry.insert(item);
                }
                if entry.len() != before {
                    for &s in self.arena.successors(n) {
                        if queued.insert(s) {
                            queue.push_back(s);
                        }
                    }
                }
            }
        }
    }

    fn step_three(&self, branch_node: NodeId, q0: &Query, true_node: NodeId, false_node: NodeId) -> InfeasiblePathResult {
        let mut result = InfeasiblePathResult::default();

        for ((n, q), res_set) in &self.resolutions {
            for (p, pq, is_call_return) in self.effective_predecessors(*n, q) {
                let pred_resolutions = self.resolutions.get(&(p, pq.clone()));
                let Some(pred_resolutions) = pred_resolutions else { continue };
                let pred_kinds: FxHashSet<QueryResolution> = pred_resolutions.iter().map(|(r, _)| *r).collect();
                let n_kinds: FxHashSet<QueryResolution> = res_set.iter().map(|(r, _)| *r).collect();

                for (r, cs) in pred_resolutions {
                    let attributed_cs = if is_call_return {
                        cs.popped().map(|(_, rest)| rest).unwrap_or_else(|| cs.clone())
                    } else {
                        cs.clone()
                    };
                    let entry = EdgeEntry { query: pq.clone(), resolution: *r, call_stack: attributed_cs.clone() };
                    InfeasiblePathResult::push(&mut result.present, (p, *n), entry.clone());
                    if pred_kinds.len() == 1 && n_kinds.len() > 1 {
                        InfeasiblePathResult::push(&mut result.start, (p, *n), entry);
                    }
                }
            }
        }

        // The branch's own two destination edges get the terminating
        // resolutions of q0. A `True` resolution of q0 says the condition's
        // literal proposition holds here, so the *true*-destination is the
        // one actually taken and the *false*-destination is the edge this
        // entry marks infeasible. Symmetrically, a `False` resolution
        // marks the *true*-destination infeasible.
        if let Some(set) = self.resolutions.get(&(branch_node, q0.clone())) {
            for (r, cs) in set {
                let dest = match r {
                    QueryResolution::True => Some(false_node),
                    QueryResolution::False => Some(true_node),
                    QueryResolution::Undefined => None,
                };
                if let Some(dest) = dest {
                    let entry = EdgeEntry { query: q0.clone(), resolution: *r, call_stack: cs.clone() };
                    let edge = (branch_node, dest);
                    InfeasiblePathResult::push(&mut result.end, edge, entry.clone());
                    InfeasiblePathResult::push(&mut result.present, edge, entry.clone());
                    InfeasiblePathResult::push(&mut result.start, edge, entry);
                }
            }
        }

        result
    }
}

/// Detect infeasible paths for the two-way conditional branch terminating
/// `branch_node`'s block. `branch_node` must be the tail node of a block
/// whose terminator is a conditional `Br`.
pub fn detect_infeasible_paths(
    arena: &NodeArena,
    module: &Module,
    cache: &mut FunctionQueryCache,
    branch_node: NodeId,
    max_call_stack_depth: usize,
) -> InfeasiblePathResult {
    let function = arena.function_of(branch_node);
    let block = arena.block_of(branch_node);
    let terminator = module
        .function(function)
        .block(block)
        .terminator()
        .expect("branch_node's block must have a terminator");

    let (condition, then_block, else_block) = match &terminator.kind {
        InstKind::Br { condition: Some(c), then_block, else_block: Some(e) } => (*c, *then_block, *e),
        _ => panic!("detect_infeasible_paths requires a two-way conditional branch"),
    };

    let true_node = arena.block_first(function, then_block);
    let false_node = arena.block_first(function, else_block);
    let q0 = Query::is_true(condition);

    debug!(target: "pathquery::intra", "detecting infeasible paths for {function:?}/{block:?}");

    let mut detector = Detector {
        arena,
        module,
        cache,
        visited: FxHashMap::default(),
        resolutions: FxHashMap::default(),
        substituted_at: FxHashMap::default(),
        translated_preds: FxHashMap::default(),
    };

    detector.step_one(branch_node, &q0, max_call_stack_depth);
    detector.step_two();
    detector.step_three(branch_node, &q0, true_node, false_node)
}
