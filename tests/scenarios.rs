//! End-to-end scenario tests, one per numbered scenario in the base
//! specification's testable-properties section. These exercise the public
//! `Driver` API the way a host crate would, rather than the per-module
//! internals `src/*.rs`'s own `#[cfg(test)]` modules already cover.

use pathquery::config::AnalysisConfig;
use pathquery::driver::Driver;
use pathquery::ir::{Constant, FunctionBuilder, IntPredicate, Module};

fn init_logging() {
    let _ = env_logger::Builder::from_env("PATHQUERY_LOG").is_test(true).try_init();
}

/// Scenario 1: `x = 5; if (x == 0) goto T else goto F`. The true edge is
/// the one proven infeasible; the false edge is not.
#[test]
fn trivially_infeasible_branch() {
    init_logging();
    let mut module = Module::new();
    let fid = module.create_function("f");
    let (branch_block, t, f_block) = {
        let f = module.function_mut(fid);
        let mut b = FunctionBuilder::new(f);
        let x = b.alloca("x");
        b.store(x, Constant::new(32, 5));
        let t = b.create_block("t");
        let f_block = b.create_block("f");
        let loaded = b.load(x);
        let cond = b.icmp(IntPredicate::Eq, loaded, Constant::new(32, 0));
        b.br(cond, t, f_block);
        let branch_block = b.current_block();
        b.switch_to_block(t);
        b.ret(None::<Constant>);
        b.switch_to_block(f_block);
        b.ret(None::<Constant>);
        (branch_block, t, f_block)
    };

    let driver = Driver::new(&module, AnalysisConfig::default());
    let paths = driver.detect_infeasible_paths(fid).unwrap();

    let branch_node = driver.arena().block_tail(fid, branch_block);
    let true_node = driver.arena().block_first(fid, t);
    let false_node = driver.arena().block_first(fid, f_block);

    assert!(paths.is_infeasible((branch_node, true_node), &pathquery::query::CallStack::empty()));
    assert!(!paths.is_infeasible((branch_node, false_node), &pathquery::query::CallStack::empty()));
}

/// Scenario 2: `if (x > 0) { if (x < 0) { .. } }` with `x` unchanged
/// between the two branches. The outer `x > 0` dominates the inner branch,
/// so the inner true edge (`x < 0`) is infeasible and the inner false edge
/// is not.
#[test]
fn correlated_branches_prune_inner_true_edge() {
    init_logging();
    let mut module = Module::new();
    let fid = module.create_function("f");
    let (inner_branch_block, inner_true, inner_false) = {
        let f = module.function_mut(fid);
        let mut b = FunctionBuilder::new(f);
        let x = b.alloca("x");
        let loaded = b.load(x);
        let gt = b.icmp(IntPredicate::Sgt, loaded, Constant::new(32, 0));
        let outer_true = b.create_block("outer_true");
        let outer_false = b.create_block("outer_false");
        b.br(gt, outer_true, outer_false);

        b.switch_to_block(outer_true);
        let loaded2 = b.load(x);
        let lt = b.icmp(IntPredicate::Slt, loaded2, Constant::new(32, 0));
        let inner_true = b.create_block("inner_true");
        let inner_false = b.create_block("inner_false");
        b.br(lt, inner_true, inner_false);
        let inner_branch_block = b.current_block();

        b.switch_to_block(inner_true);
        b.ret(None::<Constant>);
        b.switch_to_block(inner_false);
        b.ret(None::<Constant>);

        b.switch_to_block(outer_false);
        b.ret(None::<Constant>);
        (inner_branch_block, inner_true, inner_false)
    };

    let driver = Driver::new(&module, AnalysisConfig::default());
    let paths = driver.detect_infeasible_paths(fid).unwrap();

    let inner_branch_node = driver.arena().block_tail(fid, inner_branch_block);
    let inner_true_node = driver.arena().block_first(fid, inner_true);
    let inner_false_node = driver.arena().block_first(fid, inner_false);

    assert!(paths.is_infeasible((inner_branch_node, inner_true_node), &pathquery::query::CallStack::empty()));
    assert!(!paths.is_infeasible((inner_branch_node, inner_false_node), &pathquery::query::CallStack::empty()));
}

/// Scenario 3: `store 1 -> a; load a -> t; use(t)`. Locality: the def/use
/// pair is found without any interprocedural walk.
#[test]
fn load_store_locality() {
    init_logging();
    let mut module = Module::new();
    let fid = module.create_function("f");
    {
        let f = module.function_mut(fid);
        let mut b = FunctionBuilder::new(f);
        let a = b.alloca("a");
        b.store(a, Constant::new(32, 1));
        let t = b.load(a);
        b.ret(Some(t));
    }

    let driver = Driver::new(&module, AnalysisConfig::default());
    let (_paths, uses) = driver.analyze(fid).unwrap();

    let entry = driver.arena().function_entry(fid);
    let a_uses = uses.get("a").unwrap();
    assert_eq!(a_uses.len(), 1);
    assert!(a_uses.contains(&(pathquery::defuse::Block(entry), pathquery::defuse::Block(entry))));
}

/// Scenario 4: `main: store 7 -> g; call f(); load g -> t`, where `f` does
/// nothing to `g`. The store reaches the load across the (transparent)
/// call.
#[test]
fn interprocedural_reaching() {
    init_logging();
    let mut module = Module::new();
    let g = module.create_global("g", None);
    let callee = module.create_function("f");
    {
        let fb = module.function_mut(callee);
        let mut b = FunctionBuilder::new(fb);
        b.ret(None::<Constant>);
    }
    let caller = module.create_function("main");
    let entry_block = module.function(caller).entry;
    {
        let fb = module.function_mut(caller);
        let mut b = FunctionBuilder::new(fb);
        b.store(pathquery::ir::Value::Global(g), Constant::new(32, 7));
        b.call(callee, vec![]);
        let t = b.load(pathquery::ir::Value::Global(g));
        b.ret(Some(t));
    }

    let driver = Driver::new(&module, AnalysisConfig::default());
    let (_paths, uses) = driver.analyze(caller).unwrap();

    let def_node = pathquery::defuse::Block(driver.arena().function_entry(caller));
    let use_node = pathquery::defuse::Block(driver.arena().block_tail(caller, entry_block));
    assert!(uses.get("g").unwrap().contains(&(def_node, use_node)));
}

/// Scenario 5: `if (c) { store 1 -> v } else { store 2 -> v } load v`.
/// Both stores are found when nothing upstream prunes either branch.
#[test]
fn both_branch_stores_reach_the_join_load() {
    init_logging();
    let mut module = Module::new();
    let fid = module.create_function("f");
    let (t, e) = {
        let fb = module.function_mut(fid);
        let mut b = FunctionBuilder::new(fb);
        let c = b.alloca("c");
        let v = b.alloca("v");
        let t = b.create_block("t");
        let e = b.create_block("e");
        let join = b.create_block("join");
        let loaded_c = b.load(c);
        b.br(loaded_c, t, e);

        b.switch_to_block(t);
        b.store(v, Constant::new(32, 1));
        b.jump(join);

        b.switch_to_block(e);
        b.store(v, Constant::new(32, 2));
        b.jump(join);

        b.switch_to_block(join);
        let loaded_v = b.load(v);
        b.ret(Some(loaded_v));
        (t, e)
    };

    let driver = Driver::new(&module, AnalysisConfig::default());
    let (_paths, uses) = driver.analyze(fid).unwrap();

    let v_uses = uses.get("v").unwrap();
    let true_store_node = driver.arena().block_first(fid, t);
    let false_store_node = driver.arena().block_first(fid, e);
    assert!(v_uses.iter().any(|(d, _)| d.0 == true_store_node));
    assert!(v_uses.iter().any(|(d, _)| d.0 == false_store_node));
}

/// Scenario 5, pruning half: `store 1 -> c; if (c) { store 1 -> v } else
/// { store 2 -> v } load v`. Forcing `c` true before the branch makes the
/// false edge infeasible, so the false-branch store must not reach the
/// join load.
#[test]
fn forced_condition_prunes_the_false_branch_store() {
    init_logging();
    let mut module = Module::new();
    let fid = module.create_function("f");
    let (t, e) = {
        let fb = module.function_mut(fid);
        let mut b = FunctionBuilder::new(fb);
        let c = b.alloca("c");
        let v = b.alloca("v");
        b.store(c, Constant::new(32, 1));
        let t = b.create_block("t");
        let e = b.create_block("e");
        let join = b.create_block("join");
        let loaded_c = b.load(c);
        b.br(loaded_c, t, e);

        b.switch_to_block(t);
        b.store(v, Constant::new(32, 1));
        b.jump(join);

        b.switch_to_block(e);
        b.store(v, Constant::new(32, 2));
        b.jump(join);

        b.switch_to_block(join);
        let loaded_v = b.load(v);
        b.ret(Some(loaded_v));
        (t, e)
    };

    let driver = Driver::new(&module, AnalysisConfig::default());
    let (_paths, uses) = driver.analyze(fid).unwrap();

    let v_uses = uses.get("v").unwrap();
    let true_store_node = driver.arena().block_first(fid, t);
    let false_store_node = driver.arena().block_first(fid, e);
    assert!(v_uses.iter().any(|(d, _)| d.0 == true_store_node));
    assert!(!v_uses.iter().any(|(d, _)| d.0 == false_store_node));
}

/// Scenario 6: `f(n) { if (n) { store n -> g; f(n-1) } }`. Recursion must
/// terminate within a bounded call-stack depth, and every store inside `f`
/// is visible to a use outside `f`.
#[test]
fn recursive_function_terminates() {
    init_logging();
    let mut module = Module::new();
    let g = module.create_global("g", None);
    let fid = module.create_function("f");
    {
        let fb = module.function_mut(fid);
        let mut b = FunctionBuilder::new(fb);
        let n = b.alloca("n");
        let then_block = b.create_block("then");
        let exit_block = b.create_block("exit");
        let loaded_n = b.load(n);
        b.br(loaded_n, then_block, exit_block);

        b.switch_to_block(then_block);
        b.store(pathquery::ir::Value::Global(g), loaded_n);
        b.call(fid, vec![]);
        b.jump(exit_block);

        b.switch_to_block(exit_block);
        b.ret(None::<Constant>);
    }

    let caller = module.create_function("main");
    let entry_block = module.function(caller).entry;
    {
        let fb = module.function_mut(caller);
        let mut b = FunctionBuilder::new(fb);
        b.call(fid, vec![]);
        let t = b.load(pathquery::ir::Value::Global(g));
        b.ret(Some(t));
    }

    let driver = Driver::new(&module, AnalysisConfig::default().with_max_call_stack_depth(8));
    let (_paths, uses) = driver.analyze(caller).unwrap();

    let use_node = pathquery::defuse::Block(driver.arena().block_tail(caller, entry_block));
    let g_uses = uses.get("g").unwrap();
    assert!(!g_uses.is_empty());
    assert!(g_uses.iter().all(|(_, u)| *u == use_node));
}
