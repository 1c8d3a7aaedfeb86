//! Global value numbering.
//!
//! Hash-conses pure value nodes: two live nodes with the same operator and
//! the same input list collapse into one, the later merging into the
//! earlier. Only operators that report themselves as GVN candidates enter
//! the table at all.
//!
//! Opaque barriers and profile nodes opt out of value numbering entirely.
//! Two structurally identical barriers protect two distinct program points
//! and must resolve independently, so they are never even considered as
//! merge candidates.

use rustc_hash::FxHashMap;

use super::OptimizationPass;
use crate::ir::graph::Graph;
use crate::ir::node::{InputVec, NodeId};
use crate::ir::operators::Operator;

// =============================================================================
// GVN Pass
// =============================================================================

/// Global value numbering pass.
#[derive(Debug, Default)]
pub struct Gvn {
    stats: GvnStats,
}

/// Statistics from a value numbering run.
#[derive(Debug, Clone, Copy, Default)]
pub struct GvnStats {
    /// Live value nodes inspected.
    pub considered: usize,
    /// Nodes merged into an earlier equivalent.
    pub merged: usize,
    /// Nodes skipped because their operator opts out of value numbering.
    pub opted_out: usize,
}

/// Hash-cons key: operator plus exact input list.
type GvnKey = (Operator, InputVec);

impl Gvn {
    /// Create a new value numbering pass.
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics from the last run.
    #[inline]
    pub fn stats(&self) -> &GvnStats {
        &self.stats
    }
}

impl OptimizationPass for Gvn {
    fn name(&self) -> &'static str {
        "gvn"
    }

    fn run(&mut self, graph: &mut Graph) -> bool {
        let mut table: FxHashMap<GvnKey, NodeId> = FxHashMap::default();
        let mut merges: Vec<(NodeId, NodeId)> = Vec::new();

        // Arena order is creation order, so the table entry is always the
        // earliest representative of its equivalence class.
        for (id, node) in graph.iter() {
            if node.is_dead() || node.is_control() {
                continue;
            }
            if node.op.opts_out_of_gvn() {
                self.stats.opted_out += 1;
                continue;
            }
            if !node.op.is_gvn_candidate() {
                continue;
            }
            self.stats.considered += 1;

            let key = (node.op, node.inputs.clone());
            match table.get(&key) {
                Some(&existing) => merges.push((id, existing)),
                None => {
                    table.insert(key, id);
                }
            }
        }

        let changed = !merges.is_empty();
        for (dup, canonical) in merges {
            graph.replace_all_uses(dup, canonical);
            graph.kill(dup);
            self.stats.merged += 1;
        }
        changed
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::operators::CmpOp;
    use crate::session::OptSession;

    #[test]
    fn test_merges_identical_constants() {
        let mut g = Graph::new();
        let a = g.const_int(7);
        let b = g.const_int(7);
        let sum = g.int_add(a, b);

        let mut pass = Gvn::new();
        assert!(pass.run(&mut g));

        assert!(g.node(b).is_dead());
        assert_eq!(g.node(sum).input(0), Some(a));
        assert_eq!(g.node(sum).input(1), Some(a));
        assert_eq!(pass.stats().merged, 1);
    }

    #[test]
    fn test_merges_identical_expressions() {
        let mut g = Graph::new();
        let p = g.parameter(0);
        let q = g.parameter(1);
        let cmp1 = g.int_cmp(CmpOp::Lt, p, q);
        let cmp2 = g.int_cmp(CmpOp::Lt, p, q);
        let user = g.if_branch(g.start, cmp2);

        let mut pass = Gvn::new();
        assert!(pass.run(&mut g));

        assert!(g.node(cmp2).is_dead());
        assert_eq!(g.node(user).input(1), Some(cmp1));
    }

    #[test]
    fn test_distinct_values_not_merged() {
        let mut g = Graph::new();
        let a = g.const_int(1);
        let b = g.const_int(2);

        let mut pass = Gvn::new();
        assert!(!pass.run(&mut g));

        assert!(!g.node(a).is_dead());
        assert!(!g.node(b).is_dead());
    }

    #[test]
    fn test_identical_barriers_never_merge() {
        let mut session = OptSession::new();
        let v = session.graph.parameter(0);
        let b1 = session.opaque_loop_init(v);
        let b2 = session.opaque_loop_init(v);

        let mut pass = Gvn::new();
        assert!(!pass.run(&mut session.graph));

        // Same kind, same input, still two distinct nodes.
        assert!(!session.graph.node(b1).is_dead());
        assert!(!session.graph.node(b2).is_dead());
        assert_eq!(session.macro_nodes(), &[b1, b2]);
        assert_eq!(pass.stats().opted_out, 2);
        assert_eq!(pass.stats().merged, 0);
    }

    #[test]
    fn test_identical_profiles_never_merge() {
        let mut g = Graph::new();
        let test = g.parameter(0);
        let p1 = g.profile_boolean(test, 5, 5);
        let p2 = g.profile_boolean(test, 5, 5);

        let mut pass = Gvn::new();
        assert!(!pass.run(&mut g));

        assert!(!g.node(p1).is_dead());
        assert!(!g.node(p2).is_dead());
    }

    #[test]
    fn test_expression_over_merged_constants() {
        let mut g = Graph::new();
        let a = g.const_int(3);
        let b = g.const_int(3);
        let s1 = g.int_add(a, a);
        let s2 = g.int_add(b, b);
        let ret = g.return_value(g.start, s2);

        // First run merges the constants; the adds now have equal input
        // lists and a second run collapses them too.
        let mut pass = Gvn::new();
        assert!(pass.run(&mut g));
        assert!(pass.run(&mut g));

        assert!(g.node(s2).is_dead());
        assert_eq!(g.node(ret).input(1), Some(s1));
    }
}
