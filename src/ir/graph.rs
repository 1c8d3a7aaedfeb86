//! Sea-of-Nodes graph structure.
//!
//! The graph owns all nodes and maintains use-def chains so phases can
//! replace a node by another in one step (`replace_all_uses`), the
//! operation every barrier resolution ultimately performs.
//!
//! Graph mutation is single-threaded within a compilation session; phases
//! run to completion before the next begins, so no synchronization appears
//! anywhere in this structure.

use smallvec::smallvec;

use super::arena::{Arena, SecondaryMap};
use super::node::{InputVec, Node, NodeFlags, NodeId};
use super::operators::{ArithOp, CmpOp, ControlOp, Operator};
use super::types::ValueType;

// =============================================================================
// Graph Structure
// =============================================================================

/// A Sea-of-Nodes graph.
#[derive(Clone)]
pub struct Graph {
    /// Arena for node storage.
    nodes: Arena<Node>,

    /// Use chains: for each node, which nodes use its output.
    uses: SecondaryMap<Node, Vec<NodeId>>,

    /// The start node (control entry).
    pub start: NodeId,

    /// The end node (control exit).
    pub end: NodeId,

    /// Bytecode offset recorded on newly created nodes.
    next_bc_offset: u32,
}

impl Graph {
    /// Create a new empty graph with start and end nodes.
    pub fn new() -> Self {
        let mut nodes = Arena::with_capacity(64);
        let uses = SecondaryMap::new();

        let start = nodes.alloc(Node::with_type(
            Operator::Control(ControlOp::Start),
            InputVec::new(),
            ValueType::Control,
        ));
        let end = nodes.alloc(Node::with_type(
            Operator::Control(ControlOp::End),
            smallvec![start],
            ValueType::Control,
        ));

        let mut graph = Graph {
            nodes,
            uses,
            start,
            end,
            next_bc_offset: 0,
        };
        graph.add_use(start, end);
        graph
    }

    // =========================================================================
    // Node Access
    // =========================================================================

    /// Get a reference to a node.
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Get a mutable reference to a node.
    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    /// Get a node by ID (optional).
    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Get the number of nodes ever allocated (including dead ones).
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph is empty (only start/end).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 2
    }

    /// Count live (non-dead) nodes.
    pub fn live_count(&self) -> usize {
        self.nodes.iter().filter(|(_, n)| !n.is_dead()).count()
    }

    // =========================================================================
    // Node Creation
    // =========================================================================

    /// Add a new node, inferring its declared type from its inputs.
    pub fn add_node(&mut self, op: Operator, inputs: InputVec) -> NodeId {
        let ty = self.infer_declared_type(&op, &inputs);
        self.add_node_with_type(op, inputs, ty)
    }

    /// Add a node with an explicit declared type.
    pub fn add_node_with_type(&mut self, op: Operator, inputs: InputVec, ty: ValueType) -> NodeId {
        let mut node = Node::with_type(op, inputs.clone(), ty);
        node.bc_offset = self.next_bc_offset;

        let id = self.nodes.alloc(node);
        for input_id in inputs {
            self.add_use(input_id, id);
        }
        id
    }

    /// Set the bytecode offset recorded on new nodes.
    pub fn set_bc_offset(&mut self, offset: u32) {
        self.next_bc_offset = offset;
    }

    // =========================================================================
    // Use-Def Chains
    // =========================================================================

    /// Get all uses of a node (nodes that have this node as input).
    pub fn uses(&self, id: NodeId) -> &[NodeId] {
        self.uses.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Get the number of uses.
    pub fn use_count(&self, id: NodeId) -> usize {
        self.uses.get(id).map(|v| v.len()).unwrap_or(0)
    }

    /// Add a use relationship: `user` uses `def`.
    fn add_use(&mut self, def: NodeId, user: NodeId) {
        self.uses.resize(def.as_usize() + 1);
        if let Some(uses) = self.uses.get_mut(def) {
            uses.push(user);
        } else {
            self.uses.set(def, vec![user]);
        }
    }

    /// Remove a use relationship.
    fn remove_use(&mut self, def: NodeId, user: NodeId) {
        if let Some(uses) = self.uses.get_mut(def) {
            if let Some(pos) = uses.iter().position(|&u| u == user) {
                uses.swap_remove(pos);
            }
        }
    }

    // =========================================================================
    // Node Modification
    // =========================================================================

    /// Replace a node's input at the given index.
    pub fn replace_input(&mut self, node: NodeId, index: usize, new_input: NodeId) {
        let old_input = self.nodes[node].input(index);
        if let Some(old) = old_input {
            self.remove_use(old, node);
        }
        self.nodes[node].inputs[index] = new_input;
        self.add_use(new_input, node);
    }

    /// Replace all uses of `old` with `new`.
    pub fn replace_all_uses(&mut self, old: NodeId, new: NodeId) {
        // The use chain holds one entry per edge, so a user referencing
        // `old` through several inputs appears several times. Scan each
        // distinct user once and record one update per edge.
        let mut users: Vec<NodeId> = self.uses(old).to_vec();
        users.sort_unstable();
        users.dedup();

        let mut updates: Vec<(NodeId, usize)> = Vec::new();
        for &user in &users {
            for (i, &input) in self.nodes[user].inputs.iter().enumerate() {
                if input == old {
                    updates.push((user, i));
                }
            }
        }

        for (user, i) in updates {
            self.nodes[user].inputs[i] = new;
            self.add_use(new, user);
        }

        if let Some(uses) = self.uses.get_mut(old) {
            uses.clear();
        }
    }

    /// Mark a node as dead and detach it from its inputs' use lists.
    pub fn kill(&mut self, id: NodeId) {
        self.nodes[id].mark_dead();
        let inputs: Vec<NodeId> = self.nodes[id].inputs.iter().copied().collect();
        for input in inputs {
            self.remove_use(input, id);
        }
    }

    // =========================================================================
    // Declared Type Inference
    // =========================================================================

    fn infer_declared_type(&self, op: &Operator, inputs: &InputVec) -> ValueType {
        let input_types: Vec<ValueType> = inputs
            .iter()
            .filter_map(|&id| self.get(id).map(|n| n.ty))
            .collect();
        op.result_type(&input_types)
    }

    /// Recompute the declared type of a node from its current inputs.
    pub fn recompute_type(&mut self, id: NodeId) {
        let inputs = self.nodes[id].inputs.clone();
        let ty = self.infer_declared_type(&self.nodes[id].op, &inputs);
        self.nodes[id].ty = ty;
    }

    // =========================================================================
    // Builder Helpers
    // =========================================================================

    /// Create an integer constant.
    pub fn const_int(&mut self, value: i64) -> NodeId {
        self.add_node(Operator::ConstInt(value), InputVec::new())
    }

    /// Create a boolean constant.
    pub fn const_bool(&mut self, value: bool) -> NodeId {
        self.add_node(Operator::ConstBool(value), InputVec::new())
    }

    /// Create a parameter node.
    pub fn parameter(&mut self, index: u16) -> NodeId {
        self.add_node(Operator::Parameter(index), InputVec::new())
    }

    /// Create an integer arithmetic node.
    pub fn int_op(&mut self, op: ArithOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.add_node(Operator::IntOp(op), smallvec![lhs, rhs])
    }

    /// Create an integer add node.
    pub fn int_add(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.int_op(ArithOp::Add, lhs, rhs)
    }

    /// Create an integer comparison node.
    pub fn int_cmp(&mut self, op: CmpOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.add_node(Operator::IntCmp(op), smallvec![lhs, rhs])
    }

    /// Create a region (control merge) node.
    pub fn region(&mut self, preds: &[NodeId]) -> NodeId {
        self.add_node_with_type(
            Operator::Control(ControlOp::Region),
            InputVec::from_slice(preds),
            ValueType::Control,
        )
    }

    /// Create a loop header node with its entry control.
    pub fn loop_head(&mut self, entry: NodeId) -> NodeId {
        self.add_node_with_type(
            Operator::Control(ControlOp::Loop),
            smallvec![entry],
            ValueType::Control,
        )
    }

    /// Create an If branch controlled by `control`, testing `predicate`.
    pub fn if_branch(&mut self, control: NodeId, predicate: NodeId) -> NodeId {
        self.add_node_with_type(
            Operator::Control(ControlOp::If),
            smallvec![control, predicate],
            ValueType::Control,
        )
    }

    /// Create a Phi node merging `values` at `region`.
    pub fn phi(&mut self, region: NodeId, values: &[NodeId]) -> NodeId {
        let mut inputs: InputVec = smallvec![region];
        inputs.extend_from_slice(values);
        self.add_node(Operator::Phi, inputs)
    }

    /// Create a return node.
    pub fn return_value(&mut self, control: NodeId, value: NodeId) -> NodeId {
        self.add_node_with_type(
            Operator::Control(ControlOp::Return),
            smallvec![control, value],
            ValueType::Control,
        )
    }

    /// Create a branch profile node over `input` with parse-time counts.
    ///
    /// Profile nodes start with removal delayed: they must survive the first
    /// simplification round after parsing so the branch reading the counts
    /// never sees a dangling reference.
    pub fn profile_boolean(&mut self, input: NodeId, false_count: u32, true_count: u32) -> NodeId {
        let id = self.add_node(
            Operator::ProfileBoolean {
                false_count,
                true_count,
            },
            smallvec![input],
        );
        self.nodes[id].flags.insert(NodeFlags::DELAY_REMOVAL);
        id
    }

    // =========================================================================
    // Iteration
    // =========================================================================

    /// Iterate over all nodes with their IDs (including dead ones).
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    /// Iterate over all node IDs.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        self.nodes.ids()
    }

    // =========================================================================
    // Verification
    // =========================================================================

    /// Verify graph consistency (for debugging).
    pub fn verify(&self) -> Result<(), String> {
        for (id, node) in self.iter() {
            for &input in &node.inputs {
                if input.as_usize() >= self.nodes.len() {
                    return Err(format!("node {:?} has invalid input {:?}", id, input));
                }
                if !node.is_dead() && self.nodes[input].is_dead() {
                    return Err(format!("node {:?} uses dead input {:?}", id, input));
                }
            }
            if node.is_control() && !node.ty.is_control() {
                return Err(format!("control node {:?} declares type {:?}", id, node.ty));
            }
            if node.is_constant() && !node.ty.is_value() {
                return Err(format!("constant node {:?} declares type {:?}", id, node.ty));
            }
        }

        if !self.nodes[self.start].inputs.is_empty() {
            return Err("start node should have no inputs".into());
        }
        Ok(())
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Graph ({} nodes):", self.nodes.len())?;
        for (id, node) in self.iter() {
            writeln!(f, "  {:?}: {:?}", id, node)?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
