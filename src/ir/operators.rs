//! IR operator definitions.
//!
//! Operators are organized by category:
//! - **Constants**: Fixed values and parameters
//! - **Arithmetic**: Integer math
//! - **Comparison**: Relational and equality tests
//! - **Control**: Start, end, region, loop, branch, return
//! - **Opaque barriers**: Nodes that block specific optimizations on their
//!   protected input until macro expansion resolves them
//! - **Profile**: Parse-time branch profile annotations
//!
//! Each operator carries the semantic bits the optimizer dispatches on:
//! purity (for DCE), commutativity (for GVN canonicalization), and the
//! value-numbering opt-out that keeps barrier and profile nodes
//! identity-keyed.

use super::types::ValueType;

// =============================================================================
// Arithmetic Operators
// =============================================================================

/// Integer arithmetic operator kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ArithOp {
    /// Addition: a + b
    Add = 0,
    /// Subtraction: a - b
    Sub = 1,
    /// Multiplication: a * b
    Mul = 2,
}

impl ArithOp {
    /// Check if this operation is commutative.
    #[inline]
    pub const fn is_commutative(self) -> bool {
        matches!(self, ArithOp::Add | ArithOp::Mul)
    }

    /// Evaluate on constant operands. Returns `None` on overflow.
    #[inline]
    pub const fn eval(self, lhs: i64, rhs: i64) -> Option<i64> {
        match self {
            ArithOp::Add => lhs.checked_add(rhs),
            ArithOp::Sub => lhs.checked_sub(rhs),
            ArithOp::Mul => lhs.checked_mul(rhs),
        }
    }
}

// =============================================================================
// Comparison Operators / Boolean Test Masks
// =============================================================================

/// Comparison operator kind.
///
/// This type does double duty: it is the opcode of comparison nodes, and it
/// is the *direction mask* a zero-trip-guard barrier carries, the
/// comparison sense under which the guarded loop is entered. A downstream
/// comparison's type inference reads that mask to decide the guard
/// statically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CmpOp {
    /// Less than: a < b
    Lt = 0,
    /// Less than or equal: a <= b
    Le = 1,
    /// Equal: a == b
    Eq = 2,
    /// Not equal: a != b
    Ne = 3,
    /// Greater than: a > b
    Gt = 4,
    /// Greater than or equal: a >= b
    Ge = 5,
}

impl CmpOp {
    /// Get the negation of this test.
    #[inline]
    pub const fn negate(self) -> Self {
        match self {
            CmpOp::Lt => CmpOp::Ge,
            CmpOp::Le => CmpOp::Gt,
            CmpOp::Eq => CmpOp::Ne,
            CmpOp::Ne => CmpOp::Eq,
            CmpOp::Gt => CmpOp::Le,
            CmpOp::Ge => CmpOp::Lt,
        }
    }

    /// Get the swapped version (operands exchanged).
    #[inline]
    pub const fn swap(self) -> Self {
        match self {
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::Le => CmpOp::Ge,
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::Ge => CmpOp::Le,
            CmpOp::Eq => CmpOp::Eq,
            CmpOp::Ne => CmpOp::Ne,
        }
    }

    /// Check if this comparison is commutative.
    #[inline]
    pub const fn is_commutative(self) -> bool {
        matches!(self, CmpOp::Eq | CmpOp::Ne)
    }

    /// Evaluate on constant operands.
    #[inline]
    pub const fn eval(self, lhs: i64, rhs: i64) -> bool {
        match self {
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Ge => lhs >= rhs,
        }
    }
}

// =============================================================================
// Control Flow Operators
// =============================================================================

/// Control flow operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ControlOp {
    /// Start node (entry point).
    Start = 0,
    /// End node (exit point).
    End = 1,
    /// Region (control merge).
    Region = 2,
    /// Loop header.
    Loop = 3,
    /// If branch.
    If = 4,
    /// Return from function.
    Return = 5,
}

// =============================================================================
// Opaque Barrier Kinds
// =============================================================================

/// The closed set of opaque barrier kinds.
///
/// A barrier wraps a protected input and suppresses optimizer extension
/// points on it: identity simplification never fires, value numbering never
/// merges two barriers, and type inference forwards (or pins) the type
/// without letting folding collapse the node. Every barrier is registered
/// with its session's macro-node list at construction and is resolved
/// exactly once by macro expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpaqueOp {
    /// Generic barrier: pure pass-through placeholder.
    Barrier,

    /// Wraps a loop's original initial value for range check elimination.
    /// May carry the original loop limit as a second input.
    LoopInit,

    /// Wraps a loop's original stride value for range check elimination.
    LoopStride,

    /// Wraps the zero-trip guard test. The payload is the comparison sense
    /// under which the loop is entered; a comparison node's type inference
    /// consumes it to decide the guard statically.
    ZeroTripGuard(CmpOp),

    /// Input 0 is a test the compiler cannot prove; input 1 is the constant
    /// the test is known to equal. Collapses to that constant once the
    /// optimizer independently proves it; otherwise macro expansion
    /// substitutes the test unchanged.
    ConditionalConstant,

    /// Wraps an assertion-predicate boolean that must always hold once
    /// predicate initialization has run. Retained as a runtime self-check
    /// in verification builds, elided in optimized builds.
    InitializedAssertion,
}

impl OpaqueOp {
    /// The direction mask, for zero-trip guards.
    #[inline]
    pub const fn loop_entered_mask(self) -> Option<CmpOp> {
        match self {
            OpaqueOp::ZeroTripGuard(mask) => Some(mask),
            _ => None,
        }
    }

    /// Check if this kind simply substitutes its protected input at
    /// expansion, with no semantic injection.
    #[inline]
    pub const fn is_pass_through(self) -> bool {
        matches!(
            self,
            OpaqueOp::Barrier
                | OpaqueOp::LoopInit
                | OpaqueOp::LoopStride
                | OpaqueOp::ZeroTripGuard(_)
        )
    }

    /// Short name for diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            OpaqueOp::Barrier => "Opaque",
            OpaqueOp::LoopInit => "OpaqueLoopInit",
            OpaqueOp::LoopStride => "OpaqueLoopStride",
            OpaqueOp::ZeroTripGuard(_) => "OpaqueZeroTripGuard",
            OpaqueOp::ConditionalConstant => "OpaqueConditionalConstant",
            OpaqueOp::InitializedAssertion => "OpaqueInitializedAssertion",
        }
    }
}

// =============================================================================
// Operator (Unified)
// =============================================================================

/// Unified operator representation.
///
/// Mutable per-node lifecycle state (macro-pending, profile consumption)
/// lives in node flags, not here, so operators stay `Copy + Eq + Hash` and
/// can key the value-numbering table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Integer constant.
    ConstInt(i64),
    /// Boolean constant.
    ConstBool(bool),
    /// Parameter (function argument).
    Parameter(u16),

    /// Integer arithmetic.
    IntOp(ArithOp),
    /// Integer comparison.
    IntCmp(CmpOp),

    /// Control operation.
    Control(ControlOp),
    /// Phi node for value merging.
    Phi,
    /// LoopPhi for loop-carried values.
    LoopPhi,

    /// Opaque barrier.
    Opaque(OpaqueOp),

    /// Branch profile counts collected during parsing. Annotates a single
    /// branch site; consumed exactly once by the branch that reads it.
    ProfileBoolean { false_count: u32, true_count: u32 },
}

impl Operator {
    /// Check if this operator is a constant.
    #[inline]
    pub const fn is_constant(&self) -> bool {
        matches!(self, Operator::ConstInt(_) | Operator::ConstBool(_))
    }

    /// Check if this operator is pure (no side effects, freely movable).
    #[inline]
    pub const fn is_pure(&self) -> bool {
        match self {
            Operator::ConstInt(_)
            | Operator::ConstBool(_)
            | Operator::Parameter(_)
            | Operator::IntOp(_)
            | Operator::IntCmp(_)
            | Operator::Phi
            | Operator::LoopPhi => true,

            // Barriers and profile nodes are values, but they are pinned to
            // their role in the graph and must not be treated as movable
            // pure expressions.
            Operator::Opaque(_) | Operator::ProfileBoolean { .. } => false,

            Operator::Control(_) => false,
        }
    }

    /// Check if this is an opaque barrier.
    #[inline]
    pub const fn is_opaque(&self) -> bool {
        matches!(self, Operator::Opaque(_))
    }

    /// Get the barrier kind, if any.
    #[inline]
    pub const fn opaque_kind(&self) -> Option<OpaqueOp> {
        match self {
            Operator::Opaque(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Value-numbering opt-out marker.
    ///
    /// True for operators whose nodes must never be merged with a
    /// structurally identical node: barriers exist to be distinct
    /// placeholders, and two profile nodes with equal counts still annotate
    /// distinct branch sites. The GVN phase checks this predicate and keeps
    /// such nodes identity-keyed.
    #[inline]
    pub const fn opts_out_of_gvn(&self) -> bool {
        matches!(
            self,
            Operator::Opaque(_) | Operator::ProfileBoolean { .. }
        )
    }

    /// Check if this operator is eligible for hash-consing by GVN.
    #[inline]
    pub const fn is_gvn_candidate(&self) -> bool {
        // Phis are context-dependent (their region input orders their
        // operands), so only straight-line pure expressions are entered.
        match self {
            Operator::Phi | Operator::LoopPhi => false,
            op => op.is_pure() && !op.opts_out_of_gvn(),
        }
    }

    /// Infer the declared result type from input types.
    pub fn result_type(&self, input_types: &[ValueType]) -> ValueType {
        match self {
            Operator::ConstInt(_) => ValueType::Int64,
            Operator::ConstBool(_) => ValueType::Bool,
            Operator::Parameter(_) => ValueType::Top,

            Operator::IntOp(_) => ValueType::Int64,
            Operator::IntCmp(_) => ValueType::Bool,

            Operator::Control(_) => ValueType::Control,

            // Phi: meet of the value inputs; input 0 is the region.
            Operator::Phi | Operator::LoopPhi => input_types
                .iter()
                .skip(1)
                .fold(ValueType::Top, |acc, &t| acc.meet(t)),

            Operator::Opaque(kind) => match kind {
                // Pass-through barriers mirror the protected input's
                // declared type so downstream consumers stay consistent.
                OpaqueOp::Barrier
                | OpaqueOp::LoopInit
                | OpaqueOp::LoopStride
                | OpaqueOp::ZeroTripGuard(_) => {
                    input_types.first().copied().unwrap_or(ValueType::Top)
                }
                // Assertion-flavored barriers are always boolean.
                OpaqueOp::ConditionalConstant | OpaqueOp::InitializedAssertion => ValueType::Bool,
            },

            Operator::ProfileBoolean { .. } => ValueType::Bool,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
