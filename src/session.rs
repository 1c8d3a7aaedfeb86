//! Per-compilation optimizer session.
//!
//! One `OptSession` owns the graph for one compilation unit together with
//! the macro-node registry: the ordered list of barrier nodes that must be
//! resolved by macro expansion before the session can lower. Sessions are
//! never shared between workers; everything here is single-threaded by
//! construction.
//!
//! Barrier nodes are created through the session so that wiring the node
//! into the graph, setting its macro-pending flag, and registering it are a
//! single operation. The registry invariant (pending flag set ⇔ present in
//! the registry) can only be broken by a bug in this module, and
//! `verify_macro_state` checks for exactly that.

use smallvec::smallvec;

use crate::ir::graph::Graph;
use crate::ir::node::{NodeFlags, NodeId};
use crate::ir::operators::{CmpOp, OpaqueOp, Operator};

#[cfg(debug_assertions)]
use rustc_hash::FxHashMap;

// =============================================================================
// Build Mode
// =============================================================================

/// Expansion policy selector for assertion-predicate barriers.
///
/// A runtime value rather than a compile-time `cfg` so both policies can be
/// exercised against the same graph; the default follows the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// Keep initialized assertion predicates as live runtime self-checks.
    Verification,
    /// Elide initialized assertion predicates, replacing them with their
    /// wrapped boolean input.
    Optimized,
}

impl BuildMode {
    /// The mode matching the current build.
    pub const fn from_build() -> Self {
        if cfg!(debug_assertions) {
            BuildMode::Verification
        } else {
            BuildMode::Optimized
        }
    }
}

impl Default for BuildMode {
    fn default() -> Self {
        Self::from_build()
    }
}

// =============================================================================
// Zero-Trip Guard Back-References (verification builds only)
// =============================================================================

/// Non-owning back-references from a zero-trip guard to the loop it guards
/// and the branch it controls. Used only to cross-check structural
/// consistency before the guard is removed; compiled out of release builds.
#[cfg(debug_assertions)]
#[derive(Debug, Clone, Copy)]
pub struct ZeroTripRefs {
    /// The guarded loop header.
    pub loop_head: NodeId,
    /// The controlling branch.
    pub iff: NodeId,
}

// =============================================================================
// Optimizer Session
// =============================================================================

/// Owns one compilation unit's graph and macro-node registry.
pub struct OptSession {
    /// The IR graph under optimization.
    pub graph: Graph,

    /// Macro-node registry: barriers awaiting expansion, in construction
    /// order. Expansion drains this exactly once per session.
    macro_nodes: Vec<NodeId>,

    /// Expansion policy for initialized assertion predicates.
    mode: BuildMode,

    /// Debug-only lookup: zero-trip guard -> (loop header, branch).
    #[cfg(debug_assertions)]
    zero_trip_refs: FxHashMap<NodeId, ZeroTripRefs>,
}

impl OptSession {
    /// Create a session with a fresh graph and the build's default mode.
    pub fn new() -> Self {
        Self::with_mode(BuildMode::from_build())
    }

    /// Create a session with an explicit expansion mode.
    pub fn with_mode(mode: BuildMode) -> Self {
        OptSession {
            graph: Graph::new(),
            macro_nodes: Vec::new(),
            mode,
            #[cfg(debug_assertions)]
            zero_trip_refs: FxHashMap::default(),
        }
    }

    /// The session's expansion mode.
    #[inline]
    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    // =========================================================================
    // Macro-Node Registry
    // =========================================================================

    /// Register a node for mandatory processing by macro expansion.
    ///
    /// Barrier constructors call this automatically; it is exposed for
    /// transformations that re-register a node they temporarily took over.
    pub fn register_macro_node(&mut self, id: NodeId) {
        debug_assert!(
            !self.macro_nodes.contains(&id),
            "macro node {:?} registered twice",
            id
        );
        self.graph.node_mut(id).flags.insert(NodeFlags::MACRO_PENDING);
        self.macro_nodes.push(id);
    }

    /// Remove a node from the registry after it was resolved early (for
    /// instance by identity simplification folding a proven conditional
    /// constant). Clears the pending flag so the registry invariant holds.
    pub fn remove_macro_node(&mut self, id: NodeId) {
        if let Some(pos) = self.macro_nodes.iter().position(|&n| n == id) {
            self.macro_nodes.remove(pos);
        }
        self.graph
            .node_mut(id)
            .flags
            .remove(NodeFlags::MACRO_PENDING);
    }

    /// The registered macro nodes, in construction order.
    #[inline]
    pub fn macro_nodes(&self) -> &[NodeId] {
        &self.macro_nodes
    }

    /// Drain the registry for the expansion driver's single pass.
    pub(crate) fn take_macro_nodes(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.macro_nodes)
    }

    /// Check the registry invariant: the set of live macro-pending nodes
    /// equals the registry contents exactly, with no orphaned entries and no
    /// unregistered pending nodes.
    pub fn verify_macro_state(&self) -> Result<(), String> {
        for &id in &self.macro_nodes {
            let node = self.graph.node(id);
            if node.is_dead() {
                return Err(format!("macro registry holds dead node {:?}", id));
            }
            if !node.is_macro_pending() {
                return Err(format!(
                    "macro registry holds {:?} without its pending flag",
                    id
                ));
            }
        }

        for (id, node) in self.graph.iter() {
            if node.is_macro_pending() && !node.is_dead() && !self.macro_nodes.contains(&id) {
                return Err(format!("pending node {:?} missing from macro registry", id));
            }
        }
        Ok(())
    }

    // =========================================================================
    // Barrier Construction
    // =========================================================================

    fn add_opaque(&mut self, kind: OpaqueOp, inputs: crate::ir::node::InputVec) -> NodeId {
        let id = self.graph.add_node(Operator::Opaque(kind), inputs);
        self.register_macro_node(id);
        id
    }

    /// Generic barrier over a single value.
    pub fn opaque_barrier(&mut self, value: NodeId) -> NodeId {
        self.add_opaque(OpaqueOp::Barrier, smallvec![value])
    }

    /// Barrier over a loop's original initial value.
    pub fn opaque_loop_init(&mut self, init: NodeId) -> NodeId {
        self.add_opaque(OpaqueOp::LoopInit, smallvec![init])
    }

    /// Barrier over a loop's original initial value, also carrying the
    /// original loop limit for range check elimination to retrieve.
    pub fn opaque_loop_init_with_limit(&mut self, init: NodeId, orig_limit: NodeId) -> NodeId {
        self.add_opaque(OpaqueOp::LoopInit, smallvec![init, orig_limit])
    }

    /// Barrier over a loop's original stride value.
    pub fn opaque_loop_stride(&mut self, stride: NodeId) -> NodeId {
        self.add_opaque(OpaqueOp::LoopStride, smallvec![stride])
    }

    /// Barrier over the zero-trip guard test. `loop_entered` is the
    /// comparison sense under which the loop body executes at least once.
    pub fn opaque_zero_trip_guard(&mut self, test: NodeId, loop_entered: CmpOp) -> NodeId {
        self.add_opaque(OpaqueOp::ZeroTripGuard(loop_entered), smallvec![test])
    }

    /// Barrier asserting that `test` always evaluates to the constant
    /// `asserted`. The optimizer may prove this independently and fold;
    /// otherwise expansion keeps the test as a genuine runtime check.
    pub fn opaque_conditional_constant(&mut self, test: NodeId, asserted: NodeId) -> NodeId {
        self.add_opaque(OpaqueOp::ConditionalConstant, smallvec![test, asserted])
    }

    /// Barrier over an initialized assertion predicate's boolean.
    pub fn opaque_initialized_assertion(&mut self, predicate: NodeId) -> NodeId {
        self.add_opaque(OpaqueOp::InitializedAssertion, smallvec![predicate])
    }

    // =========================================================================
    // Zero-Trip Guard Back-References
    // =========================================================================

    /// Record which loop and branch a zero-trip guard belongs to, for the
    /// structural cross-check at expansion. Verification builds only.
    #[cfg(debug_assertions)]
    pub fn record_zero_trip_refs(&mut self, guard: NodeId, loop_head: NodeId, iff: NodeId) {
        debug_assert!(
            matches!(
                self.graph.node(guard).op.opaque_kind(),
                Some(OpaqueOp::ZeroTripGuard(_))
            ),
            "back-references recorded on non-guard node {:?}",
            guard
        );
        self.zero_trip_refs
            .insert(guard, ZeroTripRefs { loop_head, iff });
    }

    /// The loop a zero-trip guard protects, if recorded.
    #[cfg(debug_assertions)]
    pub fn guarded_loop(&self, guard: NodeId) -> Option<NodeId> {
        self.zero_trip_refs.get(&guard).map(|r| r.loop_head)
    }

    /// The recorded back-references for a guard, if any.
    #[cfg(debug_assertions)]
    pub(crate) fn zero_trip_refs(&self, guard: NodeId) -> Option<ZeroTripRefs> {
        self.zero_trip_refs.get(&guard).copied()
    }
}

impl Default for OptSession {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
