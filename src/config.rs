//! Analysis configuration. Grounded on `hir-analysis/src/config.rs`'s
//! `DataFlowConfig`: a plain builder-style struct with `with_*` setters
//! consumed by value, defaults chosen for an "interprocedural on,
//! depth-bounded" posture.

/// Tunables for a single analysis run, threaded through [`crate::driver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    interprocedural: bool,
    max_call_stack_depth: usize,
    def_use_interprocedural: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig { interprocedural: true, max_call_stack_depth: 64, def_use_interprocedural: true }
    }
}

impl AnalysisConfig {
    pub fn new() -> Self {
        AnalysisConfig::default()
    }

    /// Disables crossing call/return edges in the infeasible-path detector;
    /// a call is then treated as an opaque, transparent no-op.
    pub fn with_interprocedural(mut self, enabled: bool) -> Self {
        self.interprocedural = enabled;
        self
    }

    /// Caps how many call-stack frames a single backward walk may carry;
    /// exceeding it degrades the in-flight query to `Undefined` rather than
    /// growing the stack without bound on deep or mutually recursive call
    /// chains that the function-query cache's own guard does not cover
    /// (e.g. long non-recursive chains).
    pub fn with_max_call_stack_depth(mut self, depth: usize) -> Self {
        self.max_call_stack_depth = depth;
        self
    }

    /// Disables crossing call/return edges specifically in the def-use
    /// engine, independent of the infeasible-path detector's own setting.
    pub fn with_def_use_interprocedural(mut self, enabled: bool) -> Self {
        self.def_use_interprocedural = enabled;
        self
    }

    pub fn interprocedural(&self) -> bool {
        self.interprocedural
    }

    pub fn max_call_stack_depth(&self) -> usize {
        self.max_call_stack_depth
    }

    pub fn def_use_interprocedural(&self) -> bool {
        self.def_use_interprocedural
    }
}
