//! Accessors for opaque barrier and profile nodes.
//!
//! Barrier nodes are constructed through the session (construction and
//! macro-registry registration are one operation, see `session`); this
//! module provides the read side: kind queries, the optional original loop
//! limit, the zero-trip direction mask, the controlling-If lookup, and the
//! branch-profile lifecycle.
//!
//! All functions take the graph explicitly. Queries on the wrong node kind
//! return `None` rather than panicking; lifecycle contract violations
//! (double consume) are asserted in verification builds only.

use super::graph::Graph;
use super::node::{NodeFlags, NodeId};
use super::operators::{CmpOp, ControlOp, OpaqueOp, Operator};

// =============================================================================
// Barrier Queries
// =============================================================================

/// Get the barrier kind of a node, if it is one.
#[inline]
pub fn opaque_kind(graph: &Graph, id: NodeId) -> Option<OpaqueOp> {
    graph.node(id).op.opaque_kind()
}

/// The value or control edge a barrier shields. Input 0 for every kind.
#[inline]
pub fn protected_input(graph: &Graph, id: NodeId) -> Option<NodeId> {
    if graph.node(id).is_opaque() {
        graph.node(id).input(0)
    } else {
        None
    }
}

/// The original loop limit carried by a loop-init barrier.
///
/// Present only when the barrier was constructed with two inputs; a
/// one-input barrier does no original-limit tracking.
pub fn original_loop_limit(graph: &Graph, id: NodeId) -> Option<NodeId> {
    let node = graph.node(id);
    match node.op.opaque_kind() {
        Some(OpaqueOp::LoopInit) | Some(OpaqueOp::Barrier) if node.inputs.len() == 2 => {
            node.input(1)
        }
        _ => None,
    }
}

/// The direction mask of a zero-trip-guard barrier.
#[inline]
pub fn loop_entered_mask(graph: &Graph, id: NodeId) -> Option<CmpOp> {
    opaque_kind(graph, id).and_then(|k| k.loop_entered_mask())
}

/// Find the If node controlled by a zero-trip guard's test.
///
/// The guard feeds a comparison which feeds the branch, or in degenerate
/// graphs feeds the branch directly; this walks the use chains rather than
/// storing an edge, so it stays correct across input rewiring.
pub fn if_node(graph: &Graph, guard: NodeId) -> Option<NodeId> {
    for &user in graph.uses(guard) {
        if graph.node(user).is_dead() {
            continue;
        }
        match graph.node(user).op {
            Operator::Control(ControlOp::If) => return Some(user),
            Operator::IntCmp(_) => {
                for &user2 in graph.uses(user) {
                    if !graph.node(user2).is_dead()
                        && matches!(graph.node(user2).op, Operator::Control(ControlOp::If))
                    {
                        return Some(user2);
                    }
                }
            }
            _ => {}
        }
    }
    None
}

// =============================================================================
// Branch Profile Lifecycle
// =============================================================================

/// Count of times the annotated branch was observed false.
pub fn false_count(graph: &Graph, id: NodeId) -> Option<u32> {
    match graph.node(id).op {
        Operator::ProfileBoolean { false_count, .. } => Some(false_count),
        _ => None,
    }
}

/// Count of times the annotated branch was observed true.
pub fn true_count(graph: &Graph, id: NodeId) -> Option<u32> {
    match graph.node(id).op {
        Operator::ProfileBoolean { true_count, .. } => Some(true_count),
        _ => None,
    }
}

/// Check whether a profile node's counts have been read.
#[inline]
pub fn is_consumed(graph: &Graph, id: NodeId) -> bool {
    graph.node(id).flags.contains(NodeFlags::CONSUMED)
}

/// Check whether a profile node still holds its post-parse removal delay.
#[inline]
pub fn has_removal_delay(graph: &Graph, id: NodeId) -> bool {
    graph.node(id).flags.contains(NodeFlags::DELAY_REMOVAL)
}

/// Read a profile node's counts, transitioning it Fresh -> Consumed.
///
/// Exactly one branch node may do this, exactly once. A second call is a
/// caller contract violation: asserted in verification builds, and in
/// optimized builds the counts are simply returned again.
pub fn consume(graph: &mut Graph, id: NodeId) -> (u32, u32) {
    let node = graph.node(id);
    debug_assert!(
        matches!(node.op, Operator::ProfileBoolean { .. }),
        "consume() on a non-profile node {:?}",
        id
    );
    debug_assert!(
        !node.flags.contains(NodeFlags::CONSUMED),
        "profile node {:?} consumed twice",
        id
    );

    let counts = match node.op {
        Operator::ProfileBoolean {
            false_count,
            true_count,
        } => (false_count, true_count),
        _ => (0, 0),
    };
    graph.node_mut(id).flags.insert(NodeFlags::CONSUMED);
    counts
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::OptSession;

    #[test]
    fn test_protected_input() {
        let mut session = OptSession::new();
        let v = session.graph.const_int(7);
        let barrier = session.opaque_barrier(v);

        assert_eq!(protected_input(&session.graph, barrier), Some(v));
        assert_eq!(protected_input(&session.graph, v), None);
    }

    #[test]
    fn test_original_loop_limit_absent() {
        let mut session = OptSession::new();
        let init = session.graph.const_int(0);
        let barrier = session.opaque_loop_init(init);

        // One input: no original-limit tracking.
        assert_eq!(original_loop_limit(&session.graph, barrier), None);
    }

    #[test]
    fn test_original_loop_limit_present() {
        let mut session = OptSession::new();
        let init = session.graph.const_int(0);
        let limit = session.graph.const_int(100);
        let barrier = session.opaque_loop_init_with_limit(init, limit);

        assert_eq!(original_loop_limit(&session.graph, barrier), Some(limit));
        assert_eq!(protected_input(&session.graph, barrier), Some(init));
    }

    #[test]
    fn test_loop_entered_mask() {
        let mut session = OptSession::new();
        let limit = session.graph.const_int(10);
        let guard = session.opaque_zero_trip_guard(limit, CmpOp::Gt);

        assert_eq!(loop_entered_mask(&session.graph, guard), Some(CmpOp::Gt));
        assert_eq!(loop_entered_mask(&session.graph, limit), None);
    }

    #[test]
    fn test_if_node_lookup() {
        let mut session = OptSession::new();
        let g = &mut session.graph;
        let limit = g.parameter(0);
        let init = g.const_int(0);
        let guard = session.opaque_zero_trip_guard(limit, CmpOp::Gt);
        let cmp = session.graph.int_cmp(CmpOp::Gt, guard, init);
        let start = session.graph.start;
        let iff = session.graph.if_branch(start, cmp);

        assert_eq!(if_node(&session.graph, guard), Some(iff));
    }

    #[test]
    fn test_profile_counts() {
        let mut g = Graph::new();
        let test = g.parameter(0);
        let prof = g.profile_boolean(test, 10, 90);

        assert_eq!(false_count(&g, prof), Some(10));
        assert_eq!(true_count(&g, prof), Some(90));
        assert_eq!(false_count(&g, test), None);
    }

    #[test]
    fn test_profile_consume_once() {
        let mut g = Graph::new();
        let test = g.parameter(0);
        let prof = g.profile_boolean(test, 3, 5);

        assert!(!is_consumed(&g, prof));
        let (f, t) = consume(&mut g, prof);
        assert_eq!((f, t), (3, 5));
        assert!(is_consumed(&g, prof));
    }

    #[test]
    #[should_panic(expected = "consumed twice")]
    #[cfg(debug_assertions)]
    fn test_profile_double_consume_asserts() {
        let mut g = Graph::new();
        let test = g.parameter(0);
        let prof = g.profile_boolean(test, 3, 5);

        consume(&mut g, prof);
        consume(&mut g, prof);
    }
}
