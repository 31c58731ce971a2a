use std::collections::HashMap;

use rustc_hash::FxHashMap;

use super::block::BasicBlock;
use super::instruction::{BlockId, FunctionId, InstKind, Instruction};
use super::value::LocalId;

/// A function: an arena of basic blocks plus a designated entry block.
/// Predecessors are derived lazily from successors (every block's
/// terminator names its successors explicitly); CFG edges are derived from
/// the IR rather than maintained as a separately-mutated side table.
#[derive(Debug, Clone)]
pub struct Function {
    pub id: FunctionId,
    pub name: String,
    pub entry: BlockId,
    blocks: FxHashMap<BlockId, BasicBlock>,
    block_order: Vec<BlockId>,
    next_local: u32,
    next_block: u32,
    /// Names of locals introduced by `Alloca`; used for def-use locality
    /// (a variable alloca'd here never has its demand-driven walk cross
    /// into a different function).
    pub(crate) local_names: FxHashMap<LocalId, String>,
}

impl Function {
    pub fn new(id: FunctionId, name: impl Into<String>) -> Self {
        let mut f = Function {
            id,
            name: name.into(),
            entry: BlockId(0),
            blocks: FxHashMap::default(),
            block_order: Vec::new(),
            next_local: 0,
            next_block: 0,
            local_names: FxHashMap::default(),
        };
        let entry = f.create_block("entry");
        f.entry = entry;
        f
    }

    pub fn create_block(&mut self, name: impl Into<String>) -> BlockId {
        let id = BlockId(self.next_block);
        self.next_block += 1;
        self.blocks.insert(id, BasicBlock::new(name));
        self.block_order.push(id);
        id
    }

    pub fn fresh_local(&mut self) -> LocalId {
        let id = LocalId(self.next_local);
        self.next_local += 1;
        id
    }

    pub fn register_local_name(&mut self, id: LocalId, name: impl Into<String>) {
        self.local_names.insert(id, name.into());
    }

    pub fn is_local_alloca(&self, id: LocalId) -> bool {
        self.local_names.contains_key(&id)
    }

    pub fn local_name(&self, id: LocalId) -> Option<&str> {
        self.local_names.get(&id).map(String::as_str)
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        self.blocks.get(&id).expect("block id not present in function")
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        self.blocks.get_mut(&id).expect("block id not present in function")
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &BasicBlock)> {
        self.block_order.iter().map(move |id| (*id, &self.blocks[id]))
    }

    /// Blocks targeted directly by `block`'s terminator.
    pub fn successors(&self, block: BlockId) -> Vec<BlockId> {
        match self.block(block).terminator().map(|i| &i.kind) {
            Some(InstKind::Br { then_block, else_block, .. }) => {
                let mut v = vec![*then_block];
                if let Some(e) = else_block {
                    v.push(*e);
                }
                v
            }
            _ => Vec::new(),
        }
    }

    /// Blocks whose terminator targets `block`. Computed on demand; callers
    /// that need this repeatedly should cache via [`Function::predecessor_map`].
    pub fn predecessors(&self, block: BlockId) -> Vec<BlockId> {
        self.block_order
            .iter()
            .copied()
            .filter(|b| self.successors(*b).contains(&block))
            .collect()
    }

    pub fn predecessor_map(&self) -> HashMap<BlockId, Vec<BlockId>> {
        let mut map: HashMap<BlockId, Vec<BlockId>> = HashMap::new();
        for &b in &self.block_order {
            for s in self.successors(b) {
                map.entry(s).or_default().push(b);
            }
        }
        map
    }

    /// Blocks with no successors (a `Ret` terminator) — the function's exit set.
    pub fn exit_blocks(&self) -> Vec<BlockId> {
        self.block_order
            .iter()
            .copied()
            .filter(|b| self.successors(*b).is_empty())
            .collect()
    }

    /// All call instructions in the function, in block order, paired with
    /// their containing block.
    pub fn call_sites(&self) -> Vec<(BlockId, usize)> {
        let mut out = Vec::new();
        for &b in &self.block_order {
            for (idx, inst) in self.block(b).instructions.iter().enumerate() {
                if inst.is_call() {
                    out.push((b, idx));
                }
            }
        }
        out
    }
}

/// The terminator's `Instruction` carries the taken edge for conditional
/// branches at a specific instruction, reused by the node model.
pub(crate) fn branch_targets(inst: &Instruction) -> Option<(BlockId, Option<BlockId>)> {
    match &inst.kind {
        InstKind::Br { then_block, else_block, .. } => Some((*then_block, *else_block)),
        _ => None,
    }
}
