//! Identity simplification and local rewriting.
//!
//! This pass is the `Identity`/`Ideal` extension point for the whole graph:
//! it replaces nodes whose lattice value is a known constant with constant
//! nodes, and runs the profile-node removal protocol.
//!
//! It is also where the barrier contract shows its teeth: every opaque
//! barrier answers "no simplification" here, so a protected subgraph
//! survives rounds that would otherwise fold it. The one exception is a
//! conditional-constant barrier whose proof has landed: that one is
//! physically replaced by its proven constant, which requires the session
//! (not just the graph) so the macro registry stays consistent.

use super::typeinfer::TypeInference;
use super::OptimizationPass;
use crate::ir::graph::Graph;
use crate::ir::node::{NodeFlags, NodeId};
use crate::ir::operators::{OpaqueOp, Operator};
use crate::opt::lattice::Constant;
use crate::session::OptSession;

// =============================================================================
// Simplify Pass
// =============================================================================

/// Identity simplification pass.
#[derive(Debug, Default)]
pub struct Simplify {
    stats: SimplifyStats,
}

/// Statistics from a simplification run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplifyStats {
    /// Nodes replaced by constants.
    pub folded: usize,
    /// Profile nodes replaced by their input.
    pub profiles_removed: usize,
    /// Profile nodes whose removal delay was cleared this round.
    pub delays_cleared: usize,
    /// Proven conditional-constant barriers replaced by their constant.
    pub barriers_folded: usize,
}

impl Simplify {
    /// Create a new simplification pass.
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics from the last run.
    #[inline]
    pub fn stats(&self) -> &SimplifyStats {
        &self.stats
    }

    /// Run one simplification round over the graph.
    ///
    /// Barriers are untouched here, including proven conditional constants;
    /// use [`Simplify::run_on_session`] to let those fold.
    pub fn run_round(&mut self, graph: &mut Graph) -> bool {
        let mut changed = false;

        // Constant values are computed against the round's entry state;
        // replacements within the round only ever add constants.
        let folds = self.collect_constant_folds(graph);
        for (id, constant) in folds {
            let replacement = match constant {
                Constant::Int(v) => graph.const_int(v),
                Constant::Bool(v) => graph.const_bool(v),
            };
            graph.replace_all_uses(id, replacement);
            graph.kill(id);
            self.stats.folded += 1;
            changed = true;
        }

        // Profile-node protocol: one round of grace after parsing, then
        // identity hands consumers the profiled input once consumed.
        for id in graph.ids().collect::<Vec<_>>() {
            let node = graph.node(id);
            if node.is_dead() || !matches!(node.op, Operator::ProfileBoolean { .. }) {
                continue;
            }
            if node.flags.contains(NodeFlags::DELAY_REMOVAL) {
                graph.node_mut(id).flags.remove(NodeFlags::DELAY_REMOVAL);
                self.stats.delays_cleared += 1;
                changed = true;
            } else if node.flags.contains(NodeFlags::CONSUMED) {
                if let Some(input) = graph.node(id).input(0) {
                    graph.replace_all_uses(id, input);
                    graph.kill(id);
                    self.stats.profiles_removed += 1;
                    changed = true;
                }
            }
        }

        changed
    }

    /// Run a round including barrier folding.
    ///
    /// A conditional-constant barrier whose test the optimizer has proven
    /// equal to its asserted constant is replaced by that constant and
    /// deregistered from the session's macro list, exactly as if macro
    /// expansion had resolved it.
    pub fn run_on_session(&mut self, session: &mut OptSession) -> bool {
        let mut changed = self.run_round(&mut session.graph);

        let proven = self.collect_proven_barriers(session);
        for (id, constant) in proven {
            let replacement = match constant {
                Constant::Int(v) => session.graph.const_int(v),
                Constant::Bool(v) => session.graph.const_bool(v),
            };
            session.graph.replace_all_uses(id, replacement);
            session.remove_macro_node(id);
            session.graph.kill(id);
            self.stats.barriers_folded += 1;
            changed = true;
        }

        debug_assert!(session.verify_macro_state().is_ok());
        changed
    }

    fn collect_constant_folds(&self, graph: &Graph) -> Vec<(NodeId, Constant)> {
        let mut ti = TypeInference::new(graph);
        let mut folds = Vec::new();

        for (id, node) in graph.iter() {
            if node.is_dead() || node.is_constant() || node.is_control() {
                continue;
            }
            // Barriers and profile nodes never self-simplify.
            if node.is_opaque() || matches!(node.op, Operator::ProfileBoolean { .. }) {
                continue;
            }
            if let Some(constant) = ti.value_of(id).as_const() {
                folds.push((id, constant));
            }
        }
        folds
    }

    fn collect_proven_barriers(&self, session: &OptSession) -> Vec<(NodeId, Constant)> {
        let mut ti = TypeInference::new(&session.graph);
        let mut proven = Vec::new();

        for &id in session.macro_nodes() {
            if session.graph.node(id).op.opaque_kind() == Some(OpaqueOp::ConditionalConstant) {
                if let Some(constant) = ti.proven_constant(id) {
                    proven.push((id, constant));
                }
            }
        }
        proven
    }
}

impl OptimizationPass for Simplify {
    fn name(&self) -> &'static str {
        "simplify"
    }

    fn run(&mut self, graph: &mut Graph) -> bool {
        self.run_round(graph)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::opaque;
    use crate::ir::operators::{ArithOp, CmpOp};
    use crate::session::OptSession;

    #[test]
    fn test_folds_constant_expression() {
        let mut g = Graph::new();
        let a = g.const_int(2);
        let b = g.const_int(3);
        let sum = g.int_op(ArithOp::Add, a, b);
        let ret = g.return_value(g.start, sum);

        let mut pass = Simplify::new();
        assert!(pass.run(&mut g));

        assert!(g.node(sum).is_dead());
        let folded = g.node(ret).input(1).unwrap();
        assert_eq!(g.node(folded).as_int(), Some(5));
    }

    #[test]
    fn test_barrier_blocks_folding() {
        let mut session = OptSession::new();
        let a = session.graph.const_int(2);
        let b = session.graph.const_int(3);
        let sum = session.graph.int_add(a, b);
        let barrier = session.opaque_loop_init(sum);
        let ret = session.graph.return_value(session.graph.start, barrier);

        let mut pass = Simplify::new();
        pass.run_on_session(&mut session);

        // The barrier survives, and stays wired into its consumer. Its
        // protected expression may fold underneath it, but the barrier
        // itself never collapses to the constant.
        assert!(!session.graph.node(barrier).is_dead());
        assert_eq!(session.graph.node(ret).input(1), Some(barrier));
        assert!(session.graph.node(barrier).is_macro_pending());
    }

    #[test]
    fn test_proven_conditional_constant_folds_on_session() {
        let mut session = OptSession::new();
        let one = session.graph.const_int(1);
        let two = session.graph.const_int(2);
        let test = session.graph.int_cmp(CmpOp::Lt, one, two);
        let asserted = session.graph.const_bool(true);
        let barrier = session.opaque_conditional_constant(test, asserted);
        let ret = session.graph.return_value(session.graph.start, barrier);

        let mut pass = Simplify::new();
        assert!(pass.run_on_session(&mut session));

        // Replaced by the proven constant and deregistered.
        assert!(session.graph.node(barrier).is_dead());
        assert!(session.macro_nodes().is_empty());
        assert!(session.verify_macro_state().is_ok());
        let repl = session.graph.node(ret).input(1).unwrap();
        assert_eq!(session.graph.node(repl).as_bool(), Some(true));
        assert_eq!(pass.stats().barriers_folded, 1);
    }

    #[test]
    fn test_unproven_conditional_constant_survives() {
        let mut session = OptSession::new();
        let p = session.graph.parameter(0);
        let q = session.graph.parameter(1);
        let test = session.graph.int_cmp(CmpOp::Ne, p, q);
        let asserted = session.graph.const_bool(true);
        let barrier = session.opaque_conditional_constant(test, asserted);

        let mut pass = Simplify::new();
        pass.run_on_session(&mut session);

        assert!(!session.graph.node(barrier).is_dead());
        assert_eq!(session.macro_nodes(), &[barrier]);
    }

    #[test]
    fn test_profile_delay_then_removal() {
        let mut g = Graph::new();
        let test = g.parameter(0);
        let prof = g.profile_boolean(test, 10, 90);
        let iff = g.if_branch(g.start, prof);

        opaque::consume(&mut g, prof);

        let mut pass = Simplify::new();

        // Round 1: delay cleared, node survives.
        assert!(pass.run(&mut g));
        assert!(!g.node(prof).is_dead());
        assert!(!opaque::has_removal_delay(&g, prof));

        // Round 2: consumed and delay elapsed, identity hands the branch
        // the profiled input.
        assert!(pass.run(&mut g));
        assert!(g.node(prof).is_dead());
        assert_eq!(g.node(iff).input(1), Some(test));
        assert_eq!(pass.stats().profiles_removed, 1);
    }

    #[test]
    fn test_unconsumed_profile_is_not_removed() {
        let mut g = Graph::new();
        let test = g.parameter(0);
        let prof = g.profile_boolean(test, 1, 1);

        let mut pass = Simplify::new();
        pass.run(&mut g); // clears delay
        pass.run(&mut g);
        pass.run(&mut g);

        // Never consumed: stays in the graph.
        assert!(!g.node(prof).is_dead());
    }
}
