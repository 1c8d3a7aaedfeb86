//! Opaque barrier nodes for a Sea-of-Nodes JIT IR.
//!
//! Barrier nodes wrap a value and deliberately block the optimizer on it:
//! - Identity simplification never replaces a barrier with its input
//! - Value numbering never merges two structurally identical barriers
//! - Type inference forwards (or pins) the value without folding the node
//!
//! Loop transforms plant barriers around values they must keep stable
//! (original loop init and stride, the zero-trip guard test, assertion
//! predicates), run their rewrites, and rely on a single macro-expansion
//! pass at the end of the session to resolve every barrier exactly once.
//!
//! Construction goes through [`session::OptSession`], which couples node
//! creation with macro-registry registration so no barrier can escape
//! expansion.
#![deny(unsafe_op_in_unsafe_fn)]

pub mod ir;
pub mod opt;
pub mod session;

pub use ir::{Graph, NodeFlags, NodeId, OpaqueOp, Operator};
pub use opt::{Gvn, MacroExpander, OptimizationPass, Simplify, TypeInference};
pub use session::{BuildMode, OptSession};
