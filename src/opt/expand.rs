//! Macro expansion: the single resolution pass for barrier nodes.
//!
//! Every barrier registered in a session's macro-node registry is resolved
//! exactly once here. Pass-through barriers substitute their protected
//! input, conditional-constant barriers either fold to their proven
//! constant or hand downstream consumers the raw test, and initialized
//! assertion predicates are retained or elided per the session's build
//! mode. After expansion no macro-pending node remains in the graph.
//!
//! Expansion happens after the last simplification round, so a barrier
//! removed here can no longer re-expose its protected input to folding.

use super::typeinfer::TypeInference;
use crate::ir::arena::BitSet;
use crate::ir::node::{NodeFlags, NodeId};
use crate::ir::operators::OpaqueOp;
use crate::opt::lattice::Constant;
use crate::session::{BuildMode, OptSession};

#[cfg(debug_assertions)]
use crate::ir::operators::{ControlOp, Operator};

// =============================================================================
// Macro Expander
// =============================================================================

/// Drives the one-shot resolution of all registered barrier nodes.
#[derive(Debug, Default)]
pub struct MacroExpander {
    stats: ExpandStats,
}

/// Statistics from an expansion run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpandStats {
    /// Barriers processed.
    pub expanded: usize,
    /// Barriers replaced by their protected input.
    pub substituted: usize,
    /// Conditional-constant barriers folded to their proven constant.
    pub folded_constants: usize,
    /// Assertion predicates kept as live runtime checks.
    pub retained_assertions: usize,
}

impl MacroExpander {
    /// Create a new expander.
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics from the last run.
    #[inline]
    pub fn stats(&self) -> &ExpandStats {
        &self.stats
    }

    /// Resolve every registered barrier, draining the session's registry.
    ///
    /// On return the registry is empty and no live node carries the
    /// macro-pending flag. Retained assertion predicates (verification mode)
    /// stay in the graph as plain nodes with their flag cleared.
    pub fn expand(&mut self, session: &mut OptSession) -> ExpandStats {
        debug_assert!(
            session.verify_macro_state().is_ok(),
            "macro registry inconsistent before expansion"
        );

        let pending = session.take_macro_nodes();
        let mut visited = BitSet::with_capacity(session.graph.len());

        for id in pending {
            debug_assert!(
                !visited.contains(id.as_usize()),
                "barrier {:?} queued for expansion twice",
                id
            );
            visited.insert(id.as_usize());

            // A dead registry entry means some transform killed the barrier
            // without deregistering it; nothing is left to resolve.
            if session.graph.node(id).is_dead() {
                continue;
            }
            session
                .graph
                .node_mut(id)
                .flags
                .remove(NodeFlags::MACRO_PENDING);

            let kind = match session.graph.node(id).op.opaque_kind() {
                Some(kind) => kind,
                None => continue,
            };
            self.stats.expanded += 1;

            match kind {
                OpaqueOp::Barrier | OpaqueOp::LoopInit | OpaqueOp::LoopStride => {
                    self.substitute_input(session, id);
                }
                OpaqueOp::ZeroTripGuard(_) => {
                    #[cfg(debug_assertions)]
                    self.check_zero_trip_refs(session, id);
                    self.substitute_input(session, id);
                }
                OpaqueOp::ConditionalConstant => {
                    self.expand_conditional_constant(session, id);
                }
                OpaqueOp::InitializedAssertion => match session.mode() {
                    BuildMode::Verification => {
                        // Kept as a live runtime self-check; the node is now
                        // an ordinary boolean value.
                        self.stats.retained_assertions += 1;
                    }
                    BuildMode::Optimized => {
                        self.substitute_input(session, id);
                    }
                },
            }
        }

        debug_assert!(session.macro_nodes().is_empty());
        debug_assert!(
            session
                .graph
                .iter()
                .all(|(_, n)| n.is_dead() || !n.is_macro_pending()),
            "macro-pending node survived expansion"
        );

        self.stats
    }

    /// Replace a barrier by its protected input and remove it.
    fn substitute_input(&mut self, session: &mut OptSession, id: NodeId) {
        if let Some(input) = session.graph.node(id).input(0) {
            session.graph.replace_all_uses(id, input);
            session.graph.kill(id);
            self.stats.substituted += 1;
        }
    }

    /// Resolve a conditional-constant barrier.
    ///
    /// The proof is re-queried here rather than cached from earlier rounds:
    /// the graph may have changed since, and only a proof valid at expansion
    /// time justifies dropping the runtime test.
    fn expand_conditional_constant(&mut self, session: &mut OptSession, id: NodeId) {
        let proven = TypeInference::new(&session.graph).proven_constant(id);
        match proven {
            Some(constant) => {
                let replacement = match constant {
                    Constant::Int(v) => session.graph.const_int(v),
                    Constant::Bool(v) => session.graph.const_bool(v),
                };
                session.graph.replace_all_uses(id, replacement);
                session.graph.kill(id);
                self.stats.folded_constants += 1;
            }
            None => {
                // Unproven: the test becomes a genuine runtime check.
                self.substitute_input(session, id);
            }
        }
    }

    /// Structural cross-check before a zero-trip guard is removed: the
    /// recorded loop header must still be a live loop, and the recorded
    /// branch must still read the guard. A violation means some transform
    /// rewired the loop without updating its guard, which would make the
    /// substitution unsound.
    #[cfg(debug_assertions)]
    fn check_zero_trip_refs(&self, session: &OptSession, guard: NodeId) {
        let Some(refs) = session.zero_trip_refs(guard) else {
            return;
        };

        let loop_node = session.graph.node(refs.loop_head);
        assert!(
            !loop_node.is_dead() && matches!(loop_node.op, Operator::Control(ControlOp::Loop)),
            "zero-trip guard {:?} references invalid loop {:?}",
            guard,
            refs.loop_head
        );

        let iff = session.graph.node(refs.iff);
        assert!(
            !iff.is_dead() && matches!(iff.op, Operator::Control(ControlOp::If)),
            "zero-trip guard {:?} references invalid branch {:?}",
            guard,
            refs.iff
        );

        // The branch must read the guard, directly or through its test.
        let connected = iff.input(1).is_some_and(|pred| {
            pred == guard
                || session
                    .graph
                    .node(pred)
                    .inputs
                    .iter()
                    .any(|&input| input == guard)
        });
        assert!(
            connected,
            "zero-trip guard {:?} is no longer read by branch {:?}",
            guard,
            refs.iff
        );
    }
}

// =============================================================================
// Tests
// =============================================================================
