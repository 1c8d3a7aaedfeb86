//! Declared value types for the IR.
//!
//! Every node carries a declared result type from a small lattice:
//!
//! ```text
//!          Top (unknown)
//!         /    \
//!      Int64   Bool
//!         \    /
//!         Bottom
//! ```
//!
//! plus a `Control` token for nodes that order execution instead of
//! computing a value. Barrier nodes mirror their protected input's declared
//! type (or pin it to `Bool` for the assertion kinds), so consumers see a
//! consistent type while the barrier is live. Constant-ness is tracked
//! separately by the optimizer's value lattice, not here.

use std::fmt;

// =============================================================================
// Value Type
// =============================================================================

/// Declared result type of a node.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueType {
    /// Unknown type (top of lattice).
    Top = 0,

    /// 64-bit signed integer.
    Int64 = 1,

    /// Boolean test result.
    Bool = 2,

    /// Control token (ordering, not a value).
    Control = 250,

    /// Unreachable/dead (bottom of lattice).
    Bottom = 255,
}

impl ValueType {
    /// Check if this type describes a computed value (not a control token).
    #[inline]
    pub const fn is_value(self) -> bool {
        matches!(self, ValueType::Top | ValueType::Int64 | ValueType::Bool)
    }

    /// Check if this is the control token type.
    #[inline]
    pub const fn is_control(self) -> bool {
        matches!(self, ValueType::Control)
    }

    /// Lattice meet: greatest lower bound of two declared types.
    ///
    /// Used when merging values at Phi nodes.
    #[inline]
    pub const fn meet(self, other: ValueType) -> ValueType {
        use ValueType::*;

        if self as u8 == other as u8 {
            return self;
        }
        if matches!(self, Top) {
            return other;
        }
        if matches!(other, Top) {
            return self;
        }
        if matches!(self, Bottom) || matches!(other, Bottom) {
            return Bottom;
        }
        // Int64 vs Bool, or a value meeting Control: incompatible.
        Bottom
    }

    /// Check if this type is a subtype of another.
    #[inline]
    pub const fn is_subtype_of(self, other: ValueType) -> bool {
        use ValueType::*;

        if self as u8 == other as u8 {
            return true;
        }
        if matches!(other, Top) {
            return true;
        }
        matches!(self, Bottom)
    }
}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Top => write!(f, "⊤"),
            ValueType::Int64 => write!(f, "i64"),
            ValueType::Bool => write!(f, "bool"),
            ValueType::Control => write!(f, "ctrl"),
            ValueType::Bottom => write!(f, "⊥"),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Default for ValueType {
    fn default() -> Self {
        ValueType::Top
    }
}

// =============================================================================
// Tests
// =============================================================================
