//! Optimization phases.
//!
//! # Phase Order
//!
//! A session runs phases against its graph in rounds:
//!
//! 1. **Type inference** (`typeinfer.rs`): Demand-driven value evaluation
//!    over the lattice (`lattice.rs`)
//! 2. **Simplify** (`simplify.rs`): Identity simplification and constant
//!    replacement
//! 3. **GVN** (`gvn.rs`): Hash-consing of pure value nodes
//! 4. **Macro expansion** (`expand.rs`): One-shot barrier resolution,
//!    after the last simplification round
//!
//! The first three may repeat; expansion runs once per session and drains
//! the macro-node registry. Barrier nodes pass through the first three
//! phases untouched (apart from an early-folded proven conditional
//! constant) and are resolved only by the fourth.

pub mod expand;
pub mod gvn;
pub mod lattice;
pub mod simplify;
pub mod typeinfer;

pub use expand::{ExpandStats, MacroExpander};
pub use gvn::{Gvn, GvnStats};
pub use lattice::{Constant, Lattice};
pub use simplify::{Simplify, SimplifyStats};
pub use typeinfer::TypeInference;

use crate::ir::graph::Graph;

/// Common interface for graph-level optimization passes.
pub trait OptimizationPass {
    /// Pass name for diagnostics.
    fn name(&self) -> &'static str;

    /// Run the pass. Returns true if the graph changed.
    fn run(&mut self, graph: &mut Graph) -> bool;
}
