//! Sea-of-Nodes intermediate representation substrate.
//!
//! # Core Components
//!
//! - **Arena** (`arena.rs`): Node storage and side tables
//! - **Types** (`types.rs`): Declared result types
//! - **Operators** (`operators.rs`): Operator definitions, including the
//!   closed set of opaque barrier kinds
//! - **Node** (`node.rs`): IR node and lifecycle flags
//! - **Graph** (`graph.rs`): Graph structure with use-def chains
//! - **Opaque** (`opaque.rs`): Barrier and profile node accessors
//!
//! Barriers are constructed through the optimizer session (see the
//! `session` module), never directly on the graph, so that construction and
//! macro-registry registration cannot be separated.

pub mod arena;
pub mod graph;
pub mod node;
pub mod opaque;
pub mod operators;
pub mod types;

pub use arena::{Arena, BitSet, Id, SecondaryMap};
pub use graph::Graph;
pub use node::{InputVec, Node, NodeFlags, NodeId};
pub use operators::{ArithOp, CmpOp, ControlOp, OpaqueOp, Operator};
pub use types::ValueType;
