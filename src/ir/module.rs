use rustc_hash::FxHashMap;

use super::function::Function;
use super::instruction::FunctionId;
use super::value::{Constant, GlobalId};

/// A module-scoped variable. `initializer` holds its constant value when
/// statically known (e.g. a top-level `static` with a literal initializer);
/// `None` means the initial value is unknown to this analysis.
#[derive(Debug, Clone)]
pub struct Global {
    pub name: String,
    pub initializer: Option<Constant>,
}

/// A program: a set of functions plus a set of module-scoped globals.
#[derive(Debug, Clone, Default)]
pub struct Module {
    functions: FxHashMap<FunctionId, Function>,
    function_order: Vec<FunctionId>,
    globals: FxHashMap<GlobalId, Global>,
    next_function: u32,
    next_global: u32,
    pub main: Option<FunctionId>,
}

impl Module {
    pub fn new() -> Self {
        Module::default()
    }

    pub fn create_function(&mut self, name: impl Into<String>) -> FunctionId {
        let id = FunctionId(self.next_function);
        self.next_function += 1;
        let name = name.into();
        if name == "main" {
            self.main = Some(id);
        }
        self.functions.insert(id, Function::new(id, name));
        self.function_order.push(id);
        id
    }

    pub fn create_global(&mut self, name: impl Into<String>, initializer: Option<Constant>) -> GlobalId {
        let id = GlobalId(self.next_global);
        self.next_global += 1;
        self.globals.insert(id, Global { name: name.into(), initializer });
        id
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        self.functions.get(&id).expect("function id not present in module")
    }

    pub fn function_mut(&mut self, id: FunctionId) -> &mut Function {
        self.functions.get_mut(&id).expect("function id not present in module")
    }

    pub fn functions(&self) -> impl Iterator<Item = (FunctionId, &Function)> {
        self.function_order.iter().map(move |id| (*id, &self.functions[id]))
    }

    pub fn global(&self, id: GlobalId) -> &Global {
        self.globals.get(&id).expect("global id not present in module")
    }

    /// Every call site in the module that targets `callee`, as
    /// `(caller function, block, instruction index)`.
    pub fn callers_of(&self, callee: FunctionId) -> Vec<(FunctionId, super::instruction::BlockId, usize)> {
        let mut out = Vec::new();
        for (fid, f) in self.functions() {
            for (block, idx) in f.call_sites() {
                if f.block(block).instructions[idx].call_target() == Some(callee) {
                    out.push((fid, block, idx));
                }
            }
        }
        out
    }
}
