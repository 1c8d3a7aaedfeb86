//! End-to-end barrier lifecycle tests.
//!
//! Exercises the full pipeline a compilation session runs: barrier
//! construction through the session, simplification and value-numbering
//! rounds that must leave barriers alone, and the final macro expansion
//! that resolves every barrier exactly once.

use opaque_ir::ir::opaque;
use opaque_ir::ir::operators::{ArithOp, CmpOp};
use opaque_ir::{
    BuildMode, Gvn, MacroExpander, OpaqueOp, OptSession, OptimizationPass, Simplify,
};

// =============================================================================
// Pipeline Survival
// =============================================================================

#[test]
fn test_barriers_survive_simplify_and_gvn() {
    let mut session = OptSession::new();
    let g = &mut session.graph;
    let a = g.const_int(2);
    let b = g.const_int(3);
    let sum = g.int_op(ArithOp::Add, a, b);
    let init = session.opaque_loop_init(sum);
    let stride_src = session.graph.const_int(1);
    let stride = session.opaque_loop_stride(stride_src);
    let body = session.graph.int_add(init, stride);
    let ret = session.graph.return_value(session.graph.start, body);

    let mut simplify = Simplify::new();
    let mut gvn = Gvn::new();
    for _ in 0..3 {
        simplify.run_on_session(&mut session);
        gvn.run(&mut session.graph);
    }

    // The protected expression folded (barriers mirror their input's value,
    // so consumers may fold), but the barrier nodes themselves did not.
    assert!(!session.graph.node(init).is_dead());
    assert!(!session.graph.node(stride).is_dead());
    assert!(session.graph.node(body).is_dead());
    assert_eq!(session.macro_nodes(), &[init, stride]);
    assert!(session.verify_macro_state().is_ok());

    // Expansion resolves both.
    MacroExpander::new().expand(&mut session);
    assert!(session.graph.node(init).is_dead());
    assert!(session.graph.node(stride).is_dead());
    assert!(session.macro_nodes().is_empty());

    let result = session.graph.node(ret).input(1).unwrap();
    assert_eq!(session.graph.node(result).as_int(), Some(6));
    assert!(session.graph.verify().is_ok());
}

#[test]
fn test_identical_barriers_stay_distinct_under_gvn() {
    let mut session = OptSession::new();
    let v = session.graph.parameter(0);
    let b1 = session.opaque_barrier(v);
    let b2 = session.opaque_barrier(v);

    let mut gvn = Gvn::new();
    gvn.run(&mut session.graph);

    assert!(!session.graph.node(b1).is_dead());
    assert!(!session.graph.node(b2).is_dead());
    assert_eq!(session.macro_nodes().len(), 2);
}

// =============================================================================
// Single Resolution
// =============================================================================

#[test]
fn test_each_barrier_resolved_exactly_once() {
    let mut session = OptSession::new();
    let v = session.graph.parameter(0);
    let t = session.graph.const_bool(true);
    session.opaque_barrier(v);
    session.opaque_loop_init(v);
    session.opaque_loop_stride(v);
    session.opaque_zero_trip_guard(v, CmpOp::Gt);
    session.opaque_conditional_constant(t, t);
    session.opaque_initialized_assertion(t);

    let mut expander = MacroExpander::new();
    let stats = expander.expand(&mut session);
    assert_eq!(stats.expanded, 6);
    assert!(session.macro_nodes().is_empty());
    for (_, node) in session.graph.iter() {
        assert!(node.is_dead() || !node.is_macro_pending());
    }

    // A second expansion has nothing left to do.
    let mut second = MacroExpander::new();
    let stats = second.expand(&mut session);
    assert_eq!(stats.expanded, 0);
}

// =============================================================================
// Conditional Constants
// =============================================================================

#[test]
fn test_conditional_constant_proof_lands_before_expansion() {
    let mut session = OptSession::new();
    // A test the parser could not prove, but constant folding can.
    let a = session.graph.const_int(4);
    let b = session.graph.const_int(2);
    let doubled = session.graph.int_op(ArithOp::Mul, b, b);
    let test = session.graph.int_cmp(CmpOp::Eq, a, doubled);
    let asserted = session.graph.const_bool(true);
    let barrier = session.opaque_conditional_constant(test, asserted);
    let iff = session.graph.if_branch(session.graph.start, barrier);

    let mut simplify = Simplify::new();
    simplify.run_on_session(&mut session);

    // Folded early and deregistered; expansion sees an empty registry.
    assert!(session.graph.node(barrier).is_dead());
    assert!(session.macro_nodes().is_empty());
    let pred = session.graph.node(iff).input(1).unwrap();
    assert_eq!(session.graph.node(pred).as_bool(), Some(true));

    let stats = MacroExpander::new().expand(&mut session);
    assert_eq!(stats.expanded, 0);
}

#[test]
fn test_conditional_constant_unproven_becomes_runtime_check() {
    let mut session = OptSession::new();
    let p = session.graph.parameter(0);
    let bound = session.graph.const_int(100);
    let test = session.graph.int_cmp(CmpOp::Lt, p, bound);
    let asserted = session.graph.const_bool(true);
    let barrier = session.opaque_conditional_constant(test, asserted);
    let iff = session.graph.if_branch(session.graph.start, barrier);

    let mut simplify = Simplify::new();
    simplify.run_on_session(&mut session);
    assert!(!session.graph.node(barrier).is_dead());

    MacroExpander::new().expand(&mut session);

    // The branch now tests the raw comparison at runtime.
    assert!(session.graph.node(barrier).is_dead());
    assert_eq!(session.graph.node(iff).input(1), Some(test));
    assert!(!session.graph.node(test).is_dead());
}

// =============================================================================
// Assertion Predicates
// =============================================================================

#[test]
fn test_assertion_predicate_mode_split() {
    for (mode, elided) in [(BuildMode::Verification, false), (BuildMode::Optimized, true)] {
        let mut session = OptSession::with_mode(mode);
        let p = session.graph.parameter(0);
        let zero = session.graph.const_int(0);
        let pred = session.graph.int_cmp(CmpOp::Ge, p, zero);
        let barrier = session.opaque_initialized_assertion(pred);
        let iff = session.graph.if_branch(session.graph.start, barrier);

        let stats = MacroExpander::new().expand(&mut session);

        if elided {
            assert!(session.graph.node(barrier).is_dead());
            assert_eq!(session.graph.node(iff).input(1), Some(pred));
            assert_eq!(stats.retained_assertions, 0);
        } else {
            assert!(!session.graph.node(barrier).is_dead());
            assert!(!session.graph.node(barrier).is_macro_pending());
            assert_eq!(session.graph.node(iff).input(1), Some(barrier));
            assert_eq!(stats.retained_assertions, 1);
        }
        assert!(session.macro_nodes().is_empty());
    }
}

// =============================================================================
// Loop Metadata Accessors
// =============================================================================

#[test]
fn test_loop_init_carries_original_limit() {
    let mut session = OptSession::new();
    let init = session.graph.const_int(0);
    let limit = session.graph.parameter(0);
    let plain = session.opaque_loop_init(init);
    let with_limit = session.opaque_loop_init_with_limit(init, limit);

    let g = &session.graph;
    assert_eq!(opaque::opaque_kind(g, plain), Some(OpaqueOp::LoopInit));
    assert_eq!(opaque::protected_input(g, with_limit), Some(init));
    assert_eq!(opaque::original_loop_limit(g, plain), None);
    assert_eq!(opaque::original_loop_limit(g, with_limit), Some(limit));
}

#[test]
fn test_zero_trip_guard_mask_and_branch_lookup() {
    let mut session = OptSession::new();
    let limit = session.graph.parameter(0);
    let guard = session.opaque_zero_trip_guard(limit, CmpOp::Gt);
    let zero = session.graph.const_int(0);
    let cmp = session.graph.int_cmp(CmpOp::Gt, guard, zero);
    let iff = session.graph.if_branch(session.graph.start, cmp);

    let g = &session.graph;
    assert_eq!(opaque::loop_entered_mask(g, guard), Some(CmpOp::Gt));
    assert_eq!(opaque::if_node(g, guard), Some(iff));
}

// =============================================================================
// Profile Node Lifecycle
// =============================================================================

#[test]
fn test_profile_node_full_lifecycle() {
    let mut session = OptSession::new();
    let test = session.graph.parameter(0);
    let prof = session.graph.profile_boolean(test, 30, 70);
    let iff = session.graph.if_branch(session.graph.start, prof);

    // Fresh: counts readable, removal delayed.
    assert_eq!(opaque::false_count(&session.graph, prof), Some(30));
    assert_eq!(opaque::true_count(&session.graph, prof), Some(70));
    assert!(opaque::has_removal_delay(&session.graph, prof));
    assert!(!opaque::is_consumed(&session.graph, prof));

    // The branch reads the counts once.
    let (f, t) = opaque::consume(&mut session.graph, prof);
    assert_eq!((f, t), (30, 70));
    assert!(opaque::is_consumed(&session.graph, prof));

    // One round of grace, then identity removes it.
    let mut simplify = Simplify::new();
    simplify.run(&mut session.graph);
    assert!(!session.graph.node(prof).is_dead());
    simplify.run(&mut session.graph);
    assert!(session.graph.node(prof).is_dead());
    assert_eq!(session.graph.node(iff).input(1), Some(test));
    assert!(session.graph.verify().is_ok());
}
