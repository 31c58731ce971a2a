//! Error type surfaced by the driver for malformed IR. Grounded on
//! `0xMiden-compiler/hir/src/ir/symbols.rs`'s `thiserror` + `miette::Diagnostic`
//! style (derive-heavy, one variant per distinct failure shape, `#[diagnostic(code = ...)]`
//! per variant for tooling that wants a stable error code).

use miette::Diagnostic;
use thiserror::Error;

use crate::ir::{BlockId, FunctionId};

/// Conditions in the input IR that the analysis cannot proceed past for a
/// single function or block. The driver logs these at `warn` and skips the
/// offending function/block rather than panicking (`SPEC_FULL.md` §7).
#[derive(Debug, Error, Diagnostic)]
pub enum AnalysisError {
    #[error("function {function:?} has no blocks")]
    #[diagnostic(code(pathquery::empty_function))]
    EmptyFunction { function: FunctionId },

    #[error("block {block:?} in function {function:?} has no terminator")]
    #[diagnostic(code(pathquery::missing_terminator))]
    MissingTerminator { function: FunctionId, block: BlockId },

    #[error("call in function {function:?} targets unknown function id {callee:?}")]
    #[diagnostic(code(pathquery::dangling_call))]
    DanglingCall { function: FunctionId, callee: FunctionId },
}
