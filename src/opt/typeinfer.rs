//! Type inference over the value lattice.
//!
//! This is the `Value` extension point for every operator: a demand-driven
//! evaluator that computes what is known about each node's runtime value.
//! Results are memoized per instance; construct a fresh `TypeInference`
//! after mutating the graph.
//!
//! Barrier dispatch lives here:
//! - pass-through barriers (generic, loop-init, loop-stride, zero-trip
//!   guard) forward the protected input's value, so consumers keep seeing a
//!   consistent (possibly still symbolic) value while the barrier is live;
//! - a conditional-constant barrier stays an opaque boolean until the
//!   evaluation of its test input, computed from the test's own structure
//!   and never through the barrier, lands on the asserted constant;
//! - an initialized-assertion barrier forwards its wrapped boolean without
//!   forcing it constant;
//! - a comparison with a zero-trip-guard operand is decided by the guard's
//!   direction mask when both operand values are known.

use crate::ir::graph::Graph;
use crate::ir::node::NodeId;
use crate::ir::operators::{CmpOp, OpaqueOp, Operator};
use crate::ir::types::ValueType;

use super::lattice::{Constant, Lattice};

// =============================================================================
// Evaluator
// =============================================================================

#[derive(Clone, Copy, PartialEq, Eq)]
enum Slot {
    Unvisited,
    InProgress,
    Done(Lattice),
}

/// Demand-driven value evaluator over a frozen graph.
pub struct TypeInference<'g> {
    graph: &'g Graph,
    slots: Vec<Slot>,
}

impl<'g> TypeInference<'g> {
    /// Create an evaluator for the graph's current shape.
    pub fn new(graph: &'g Graph) -> Self {
        TypeInference {
            graph,
            slots: vec![Slot::Unvisited; graph.len()],
        }
    }

    /// What is known about `id`'s runtime value.
    pub fn value_of(&mut self, id: NodeId) -> Lattice {
        match self.slots[id.as_usize()] {
            Slot::Done(v) => return v,
            // Cycle (loop phi or loop-carried expression): answer with the
            // declared-type abstraction; a later query may still sharpen it.
            Slot::InProgress => return abstraction(self.graph.node(id).ty),
            Slot::Unvisited => {}
        }

        self.slots[id.as_usize()] = Slot::InProgress;
        let value = self.evaluate(id);
        self.slots[id.as_usize()] = Slot::Done(value);
        value
    }

    /// The proven constant of a conditional-constant barrier, if the
    /// optimizer's independent reasoning has landed on it.
    pub fn proven_constant(&mut self, barrier: NodeId) -> Option<Constant> {
        match self.graph.node(barrier).op.opaque_kind() {
            Some(OpaqueOp::ConditionalConstant) => self.value_of(barrier).as_const(),
            _ => None,
        }
    }

    fn evaluate(&mut self, id: NodeId) -> Lattice {
        let node = self.graph.node(id);
        if node.is_dead() {
            return Lattice::Bottom;
        }

        match node.op {
            Operator::ConstInt(v) => Lattice::Const(Constant::Int(v)),
            Operator::ConstBool(v) => Lattice::Const(Constant::Bool(v)),

            // Parameters vary at runtime.
            Operator::Parameter(_) => abstraction(node.ty),

            Operator::IntOp(op) => {
                let lhs = self.input_value(id, 0);
                let rhs = self.input_value(id, 1);
                match (lhs.as_const(), rhs.as_const()) {
                    (Some(Constant::Int(a)), Some(Constant::Int(b))) => match op.eval(a, b) {
                        Some(v) => Lattice::Const(Constant::Int(v)),
                        None => Lattice::Int,
                    },
                    _ => Lattice::Int,
                }
            }

            Operator::IntCmp(op) => self.evaluate_cmp(id, op),

            Operator::Control(_) => Lattice::Bottom,

            Operator::Phi | Operator::LoopPhi => {
                let inputs = node.inputs.clone();
                inputs
                    .iter()
                    .skip(1)
                    .fold(Lattice::Top, |acc, &input| acc.meet(self.value_of(input)))
            }

            Operator::Opaque(kind) => match kind {
                OpaqueOp::Barrier
                | OpaqueOp::LoopInit
                | OpaqueOp::LoopStride
                | OpaqueOp::ZeroTripGuard(_) => self.input_value(id, 0),

                OpaqueOp::ConditionalConstant => {
                    let test = self.input_value(id, 0);
                    let asserted = self.input_value(id, 1);
                    match (test.as_const(), asserted.as_const()) {
                        // Proof landed: the test is independently known to
                        // equal the asserted constant.
                        (Some(t), Some(a)) if t == a => Lattice::Const(t),
                        _ => Lattice::Bool,
                    }
                }

                OpaqueOp::InitializedAssertion => match self.input_value(id, 0) {
                    v @ (Lattice::Const(Constant::Bool(_)) | Lattice::Bool) => v,
                    _ => Lattice::Bool,
                },
            },

            Operator::ProfileBoolean { .. } => Lattice::Bool,
        }
    }

    fn evaluate_cmp(&mut self, id: NodeId, op: CmpOp) -> Lattice {
        let node = self.graph.node(id);
        let lhs_id = node.input(0);
        let rhs_id = node.input(1);
        let (Some(lhs_id), Some(rhs_id)) = (lhs_id, rhs_id) else {
            return Lattice::Bool;
        };

        // A zero-trip guard operand hands its direction mask to this
        // comparison: the mask, not the comparison's own opcode, states the
        // sense under which the loop is entered. The mask is defined with
        // the guarded operand on the left.
        let lhs_kind = self.graph.node(lhs_id).op.opaque_kind();
        if let Some(mask) = lhs_kind.and_then(|k| k.loop_entered_mask()) {
            return self.decide_zero_trip(mask, lhs_id, rhs_id);
        }
        let rhs_kind = self.graph.node(rhs_id).op.opaque_kind();
        if let Some(mask) = rhs_kind.and_then(|k| k.loop_entered_mask()) {
            return self.decide_zero_trip(mask.swap(), rhs_id, lhs_id);
        }

        let lhs = self.value_of(lhs_id);
        let rhs = self.value_of(rhs_id);
        match (lhs.as_const(), rhs.as_const()) {
            (Some(Constant::Int(a)), Some(Constant::Int(b))) => {
                Lattice::Const(Constant::Bool(op.eval(a, b)))
            }
            _ => Lattice::Bool,
        }
    }

    fn decide_zero_trip(&mut self, mask: CmpOp, guard: NodeId, other: NodeId) -> Lattice {
        let guard_value = self.value_of(guard);
        let other_value = self.value_of(other);
        match (guard_value.as_const(), other_value.as_const()) {
            (Some(Constant::Int(a)), Some(Constant::Int(b))) => {
                Lattice::Const(Constant::Bool(mask.eval(a, b)))
            }
            _ => Lattice::Bool,
        }
    }

    fn input_value(&mut self, id: NodeId, index: usize) -> Lattice {
        match self.graph.node(id).input(index) {
            Some(input) => self.value_of(input),
            None => Lattice::Bottom,
        }
    }
}

/// The lattice abstraction of a declared type: what is known about a value
/// when only its type is.
fn abstraction(ty: ValueType) -> Lattice {
    match ty {
        ValueType::Int64 => Lattice::Int,
        ValueType::Bool => Lattice::Bool,
        ValueType::Top | ValueType::Control | ValueType::Bottom => Lattice::Bottom,
    }
}

// =============================================================================
// Tests
// =============================================================================
