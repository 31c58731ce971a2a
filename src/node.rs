//! The interprocedural control-flow graph: basic blocks split around call
//! sites into a single arena of nodes addressed by integer handle.
//!
//! Grounded on `Node.h` from the reference implementation for the overall
//! shape (a node is `(basic block, program point)`; a block with `k` calls
//! splits into `k+1` nodes; callee entry/exit nodes stitch call sites to
//! callees), but built as a flat, eagerly-computed arena rather than a tree
//! of raw-pointer-linked, lazily-populated, per-path node objects — see
//! `DESIGN.md` for why the reference's per-path reconstruction (and its
//! `addFunctionExitBlocksToPredecessors` bug, which silently drops the
//! `parentNode` tag it just built) is not replicated.

use log::debug;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::ir::{BlockId, FunctionId, Instruction, Module};

/// Handle into the [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

/// Small inline vector: most nodes have one or two neighbors (the common
/// case is a single fallthrough or a two-way branch); only call/entry/exit
/// nodes ever need more.
pub type NodeSet = SmallVec<[NodeId; 4]>;

/// A node's data: the `(function, block)` it belongs to, the inclusive
/// instruction-index range it owns (forward order; resolvers walk it
/// `end` down to `start`), and its place in the interprocedural graph.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub function: FunctionId,
    pub block: BlockId,
    pub start: usize,
    pub end: usize,
    /// This node's owned range ends on a `Call` instruction rather than
    /// the block's tail (terminator).
    pub ends_on_call: bool,
    pub is_entry_of_function: bool,
    pub is_exit_of_function: bool,
    pub successors: NodeSet,
    pub predecessors: NodeSet,
    /// The call node immediately before this one in the same block, if
    /// this node is the continuation of a call split (`None` for a
    /// block's first node). Lets a demand-driven walk that bypasses a
    /// transparent callee (`crate::defuse`) find its way back to the
    /// caller's own local predecessors without rescanning the block.
    pub preceding_call: Option<NodeId>,
}

/// Centralized owner of every node in the interprocedural CFG for a
/// [`Module`]. Built once per analysis run and shared by reference for its
/// whole lifetime (see `SPEC_FULL.md` §5 — exactly one owner per run).
pub struct NodeArena {
    nodes: Vec<NodeData>,
    /// Entry node (first program point of the entry block) per function.
    function_entry: FxHashMap<FunctionId, NodeId>,
    /// Every tail node with no successors, per function (its exit set).
    function_exits: FxHashMap<FunctionId, NodeSet>,
    /// First node of each block, and the block's tail node.
    block_first: FxHashMap<(FunctionId, BlockId), NodeId>,
    block_tail: FxHashMap<(FunctionId, BlockId), NodeId>,
    /// The node owning each `(function, block, instruction index)`, used
    /// to locate the node a given load/store instruction belongs to.
    instruction_node: FxHashMap<(FunctionId, BlockId, usize), NodeId>,
}

impl NodeArena {
    pub fn build(module: &Module) -> Self {
        let mut nodes: Vec<NodeData> = Vec::new();
        let mut block_nodes: FxHashMap<(FunctionId, BlockId), Vec<NodeId>> = FxHashMap::default();
        let mut function_entry = FxHashMap::default();
        let mut function_exits: FxHashMap<FunctionId, NodeSet> = FxHashMap::default();
        let mut block_first = FxHashMap::default();
        let mut block_tail = FxHashMap::default();
        let mut instruction_node = FxHashMap::default();

        // Pass 1: materialize nodes for every (function, block) split around calls.
        for (fid, f) in module.functions() {
            for (bid, b) in f.blocks() {
                let mut segment_start = 0usize;
                let mut ids: Vec<NodeId> = Vec::new();
                for (idx, inst) in b.instructions.iter().enumerate() {
                    if inst.is_call() {
                        let preceding_call =
                            ids.last().copied().filter(|&pid| nodes[pid.0 as usize].ends_on_call);
                        let id = NodeId(nodes.len() as u32);
                        nodes.push(NodeData {
                            function: fid,
                            block: bid,
                            start: segment_start,
                            end: idx,
                            ends_on_call: true,
                            is_entry_of_function: false,
                            is_exit_of_function: false,
                            successors: NodeSet::new(),
                            predecessors: NodeSet::new(),
                            preceding_call,
                        });
                        for i in segment_start..=idx {
                            instruction_node.insert((fid, bid, i), id);
                        }
                        ids.push(id);
                        segment_start = idx + 1;
                    }
                }
                // Tail node: covers the remainder through the terminator.
                let tail_end = b.instructions.len().saturating_sub(1);
                let preceding_call =
                    ids.last().copied().filter(|&pid| nodes[pid.0 as usize].ends_on_call);
                let tail_id = NodeId(nodes.len() as u32);
                let is_exit = f.successors(bid).is_empty();
                nodes.push(NodeData {
                    function: fid,
                    block: bid,
                    start: segment_start,
                    end: tail_end,
                    ends_on_call: false,
                    is_entry_of_function: false,
                    is_exit_of_function: is_exit,
                    successors: NodeSet::new(),
                    predecessors: NodeSet::new(),
                    preceding_call,
                });
                for i in segment_start..=tail_end {
                    instruction_node.insert((fid, bid, i), tail_id);
                }
                ids.push(tail_id);

                block_first.insert((fid, bid), ids[0]);
                block_tail.insert((fid, bid), tail_id);
                if is_exit {
                    function_exits.entry(fid).or_default().push(tail_id);
                }
                block_nodes.insert((fid, bid), ids);
            }
            let entry_node = block_first[&(fid, f.entry)];
            nodes[entry_node.0 as usize].is_entry_of_function = true;
            function_entry.insert(fid, entry_node);
        }

        // Pass 2: wire up successors/predecessors.
        for (fid, f) in module.functions() {
            for (bid, _b) in f.blocks() {
                let ids = &block_nodes[&(fid, bid)];
                // Intra-block chain: call_i -> callee entry; continuation's
                // predecessors become the callee's exit nodes instead of
                // call_i directly.
                for w in 0..ids.len() {
                    let this_id = ids[w];
                    let ends_on_call = nodes[this_id.0 as usize].ends_on_call;
                    if ends_on_call {
                        let call_idx = nodes[this_id.0 as usize].end;
                        let callee = f.block(bid).instructions[call_idx]
                            .call_target()
                            .expect("ends_on_call implies a resolvable callee");
                        let callee_entry = function_entry[&callee];
                        nodes[this_id.0 as usize].successors.push(callee_entry);
                        nodes[callee_entry.0 as usize].predecessors.push(this_id);

                        let continuation = ids[w + 1];
                        for &exit in function_exits.get(&callee).into_iter().flatten() {
                            nodes[exit.0 as usize].successors.push(continuation);
                            nodes[continuation.0 as usize].predecessors.push(exit);
                        }
                    }
                }
                // Inter-block edges attach at the block's first node
                // (successor side) and tail node (predecessor side).
                let tail = block_tail[&(fid, bid)];
                for succ_block in f.successors(bid) {
                    let succ_first = block_first[&(fid, succ_block)];
                    nodes[tail.0 as usize].successors.push(succ_first);
                    nodes[succ_first.0 as usize].predecessors.push(tail);
                }
            }
        }

        // Pass 3: entry node predecessors = every call site targeting this function.
        for (_caller_id, caller) in module.functions() {
            for (block, idx) in caller.call_sites() {
                if let Some(callee) = caller.block(block).instructions[idx].call_target() {
                    let call_node = {
                        let ids = &block_nodes[&(caller.id, block)];
                        *ids.iter()
                            .find(|n| nodes[n.0 as usize].end == idx && nodes[n.0 as usize].ends_on_call)
                            .expect("call instruction must have a corresponding call node")
                    };
                    let entry = function_entry[&callee];
                    // already wired as successor/predecessor in pass 2 via
                    // the `ends_on_call` branch for the caller's own block,
                    // this pass only matters when the caller block wiring
                    // above iterated a different function's blocks; kept
                    // as an explicit assertion-style no-op pass for clarity
                    // and to make cross-function entry wiring independent
                    // of block iteration order.
                    debug_assert!(nodes[entry.0 as usize].predecessors.contains(&call_node));
                }
            }
        }

        debug!(target: "pathquery::node", "built node arena: {} nodes across {} functions", nodes.len(), module.functions().count());

        NodeArena { nodes, function_entry, function_exits, block_first, block_tail, instruction_node }
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0 as usize]
    }

    pub fn successors(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0 as usize].successors
    }

    pub fn predecessors(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0 as usize].predecessors
    }

    pub fn function_entry(&self, f: FunctionId) -> NodeId {
        self.function_entry[&f]
    }

    pub fn function_exits(&self, f: FunctionId) -> &[NodeId] {
        self.function_exits.get(&f).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn block_first(&self, f: FunctionId, b: BlockId) -> NodeId {
        self.block_first[&(f, b)]
    }

    pub fn block_tail(&self, f: FunctionId, b: BlockId) -> NodeId {
        self.block_tail[&(f, b)]
    }

    /// This node's reversed instruction slice, for `substitute`/`resolve` to walk.
    pub fn instructions_rev<'m>(&self, id: NodeId, module: &'m Module) -> Vec<&'m Instruction> {
        let n = &self.nodes[id.0 as usize];
        let block = module.function(n.function).block(n.block);
        block.instructions[n.start..=n.end].iter().rev().collect()
    }

    pub fn is_entry_of_function(&self, id: NodeId) -> bool {
        self.nodes[id.0 as usize].is_entry_of_function
    }

    pub fn is_exit_of_function(&self, id: NodeId) -> bool {
        self.nodes[id.0 as usize].is_exit_of_function
    }

    pub fn function_of(&self, id: NodeId) -> FunctionId {
        self.nodes[id.0 as usize].function
    }

    pub fn block_of(&self, id: NodeId) -> BlockId {
        self.nodes[id.0 as usize].block
    }

    /// If this node's owned range ends on a call, the called function.
    pub fn call_target(&self, id: NodeId, module: &Module) -> Option<FunctionId> {
        let n = &self.nodes[id.0 as usize];
        if !n.ends_on_call {
            return None;
        }
        module.function(n.function).block(n.block).instructions[n.end].call_target()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The node owning instruction `idx` of `(function, block)`.
    pub fn node_containing(&self, function: FunctionId, block: BlockId, idx: usize) -> NodeId {
        self.instruction_node[&(function, block, idx)]
    }
}
