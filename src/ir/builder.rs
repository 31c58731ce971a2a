use super::function::Function;
use super::instruction::{ArithOp, BlockId, FunctionId, InstKind, Instruction, IntPredicate};
use super::value::{Constant, LocalId, Value};

/// Sequentially appends instructions into a function's blocks. Mirrors the
/// `OpBuilder` convention used in `hir-analysis/src/analyses/spills/tests.rs`:
/// a thin, stateful helper meant for fixtures, not a general-purpose IR
/// construction API.
pub struct FunctionBuilder<'f> {
    function: &'f mut Function,
    current: BlockId,
}

impl<'f> FunctionBuilder<'f> {
    pub fn new(function: &'f mut Function) -> Self {
        let entry = function.entry;
        FunctionBuilder { function, current: entry }
    }

    pub fn at(function: &'f mut Function, block: BlockId) -> Self {
        FunctionBuilder { function, current: block }
    }

    pub fn create_block(&mut self, name: impl Into<String>) -> BlockId {
        self.function.create_block(name)
    }

    pub fn switch_to_block(&mut self, block: BlockId) {
        self.current = block;
    }

    pub fn current_block(&self) -> BlockId {
        self.current
    }

    fn push(&mut self, result: Option<Value>, kind: InstKind) {
        self.function.block_mut(self.current).push(Instruction { result, kind });
    }

    /// Introduces a function-local named variable, returning the pointer
    /// value used by subsequent `store`/`load` calls.
    pub fn alloca(&mut self, name: impl Into<String>) -> Value {
        let id = self.function.fresh_local();
        let name = name.into();
        self.function.register_local_name(id, name.clone());
        self.push(Some(Value::Local(id)), InstKind::Alloca { name });
        Value::Local(id)
    }

    pub fn store(&mut self, pointer: Value, value: impl Into<super::instruction::Operand>) {
        self.push(None, InstKind::Store { pointer, value: value.into() });
    }

    pub fn load(&mut self, pointer: Value) -> Value {
        let id = self.function.fresh_local();
        self.push(Some(Value::Local(id)), InstKind::Load { pointer });
        Value::Local(id)
    }

    pub fn trunc(&mut self, value: Value, bit_width: u32) -> Value {
        let id = self.function.fresh_local();
        self.push(Some(Value::Local(id)), InstKind::Trunc { value, bit_width });
        Value::Local(id)
    }

    pub fn icmp(
        &mut self,
        predicate: IntPredicate,
        lhs: Value,
        rhs: impl Into<super::instruction::Operand>,
    ) -> Value {
        let id = self.function.fresh_local();
        self.push(Some(Value::Local(id)), InstKind::ICmp { predicate, lhs, rhs: rhs.into() });
        Value::Local(id)
    }

    pub fn arith(
        &mut self,
        op: ArithOp,
        lhs: Value,
        rhs: impl Into<super::instruction::Operand>,
    ) -> Value {
        let id = self.function.fresh_local();
        self.push(Some(Value::Local(id)), InstKind::Arith { op, lhs, rhs: rhs.into() });
        Value::Local(id)
    }

    pub fn gep(&mut self, pointer: Value) -> Value {
        let id = self.function.fresh_local();
        self.push(Some(Value::Local(id)), InstKind::Gep { pointer });
        Value::Local(id)
    }

    /// A call to a known, in-module function.
    pub fn call(&mut self, callee: FunctionId, args: Vec<Value>) -> Value {
        let id = self.function.fresh_local();
        self.push(Some(Value::Local(id)), InstKind::Call { callee: Some(callee), args });
        Value::Local(id)
    }

    /// A call to an opaque/external function — may clobber any global.
    pub fn call_external(&mut self, args: Vec<Value>) -> Value {
        let id = self.function.fresh_local();
        self.push(Some(Value::Local(id)), InstKind::Call { callee: None, args });
        Value::Local(id)
    }

    pub fn br(&mut self, condition: Value, then_block: BlockId, else_block: BlockId) {
        self.push(None, InstKind::Br { condition: Some(condition), then_block, else_block: Some(else_block) });
    }

    pub fn jump(&mut self, target: BlockId) {
        self.push(None, InstKind::Br { condition: None, then_block: target, else_block: None });
    }

    pub fn ret(&mut self, value: Option<impl Into<super::instruction::Operand>>) {
        self.push(None, InstKind::Ret { value: value.map(Into::into) });
    }
}

impl From<Value> for super::instruction::Operand {
    fn from(v: Value) -> Self {
        super::instruction::Operand::Value(v)
    }
}

impl From<Constant> for super::instruction::Operand {
    fn from(c: Constant) -> Self {
        super::instruction::Operand::Constant(c)
    }
}

impl From<LocalId> for Value {
    fn from(id: LocalId) -> Self {
        Value::Local(id)
    }
}
