//! Infeasible-path detection and demand-driven def-use analysis over an
//! SSA-style control-flow graph.
//!
//! The crate is organized the way the system it replaces is: an IR layer
//! (`ir`), a flat interprocedural CFG built once per run (`node`), a query
//! algebra shared by both analyses (`query`), the intraprocedural detector
//! and its interprocedural extension (`intra`, `interproc`), the
//! demand-driven def-use engine (`defuse`), and a driver that ties the
//! above together (`driver`) plus a text reporter (`report`).

pub mod config;
pub mod defuse;
pub mod driver;
pub mod error;
pub mod interproc;
pub mod intra;
pub mod ir;
pub mod node;
pub mod query;
pub mod report;

pub use config::AnalysisConfig;
pub use driver::Driver;
pub use error::AnalysisError;
