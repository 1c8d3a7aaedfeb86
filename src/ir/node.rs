//! IR node definitions for the Sea-of-Nodes IR.
//!
//! Each node has:
//! - **Operator**: What the node computes
//! - **Inputs**: Data and control dependencies (use-def edges)
//! - **Declared type**: The result type downstream consumers see
//! - **Flags**: Lifecycle bits (dead, macro-pending, profile state)
//!
//! Barrier nodes are ordinary nodes with `Operator::Opaque(_)` and the
//! `MACRO_PENDING` flag set; nothing about their storage is special. What is
//! special is how the phases treat them, which is driven entirely by the
//! operator kind and the flags.

use smallvec::SmallVec;

use super::arena::Id;
use super::operators::Operator;
use super::types::ValueType;

/// Unique identifier for a node in the graph.
pub type NodeId = Id<Node>;

/// Input edge list.
///
/// Barrier nodes have one or two inputs and most other nodes at most two,
/// so two inline slots cover the common case without allocation.
pub type InputVec = SmallVec<[NodeId; 2]>;

// =============================================================================
// Node Flags
// =============================================================================

bitflags::bitflags! {
    /// Flags for node lifecycle state.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct NodeFlags: u8 {
        /// Node has been removed from the graph (skipped by all passes).
        const DEAD = 0b0000_0001;
        /// Node is registered on the session's macro-node list and awaits
        /// resolution by macro expansion.
        const MACRO_PENDING = 0b0000_0010;
        /// Profile node: counts have been read by the branch they annotate.
        const CONSUMED = 0b0000_0100;
        /// Profile node: survive one more simplification round before
        /// becoming eligible for removal.
        const DELAY_REMOVAL = 0b0000_1000;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        NodeFlags::empty()
    }
}

// =============================================================================
// Node
// =============================================================================

/// A node in the Sea-of-Nodes IR graph.
#[derive(Clone)]
pub struct Node {
    /// The operation this node performs.
    pub op: Operator,

    /// Input nodes (dependencies).
    pub inputs: InputVec,

    /// Declared result type.
    pub ty: ValueType,

    /// Bytecode offset of the construction site (for diagnostics).
    pub bc_offset: u32,

    /// Lifecycle flags.
    pub flags: NodeFlags,
}

impl Node {
    /// Create a new node with operator, inputs, and declared type.
    pub fn with_type(op: Operator, inputs: InputVec, ty: ValueType) -> Self {
        Node {
            op,
            inputs,
            ty,
            bc_offset: 0,
            flags: NodeFlags::empty(),
        }
    }

    /// Get the first input (the protected input for barrier nodes).
    #[inline]
    pub fn input(&self, index: usize) -> Option<NodeId> {
        self.inputs.get(index).copied()
    }

    /// Check if this node is a constant.
    #[inline]
    pub fn is_constant(&self) -> bool {
        self.op.is_constant()
    }

    /// Check if this node is a control node.
    #[inline]
    pub fn is_control(&self) -> bool {
        matches!(self.op, Operator::Control(_))
    }

    /// Check if this node is an opaque barrier.
    #[inline]
    pub fn is_opaque(&self) -> bool {
        self.op.is_opaque()
    }

    /// Check if this node has been marked dead.
    #[inline]
    pub fn is_dead(&self) -> bool {
        self.flags.contains(NodeFlags::DEAD)
    }

    /// Mark this node as dead.
    #[inline]
    pub fn mark_dead(&mut self) {
        self.flags.insert(NodeFlags::DEAD);
    }

    /// Check if this node awaits macro expansion.
    #[inline]
    pub fn is_macro_pending(&self) -> bool {
        self.flags.contains(NodeFlags::MACRO_PENDING)
    }

    /// Get as integer constant if this is one.
    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self.op {
            Operator::ConstInt(v) => Some(v),
            _ => None,
        }
    }

    /// Get as bool constant if this is one.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self.op {
            Operator::ConstBool(v) => Some(v),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.op)?;
        if !self.inputs.is_empty() {
            write!(f, " [")?;
            for (i, id) in self.inputs.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{:?}", id)?;
            }
            write!(f, "]")?;
        }
        write!(f, " : {:?}", self.ty)?;
        if self.is_macro_pending() {
            write!(f, " (macro)")?;
        }
        if self.is_dead() {
            write!(f, " (dead)")?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
