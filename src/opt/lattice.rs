//! Value lattice for type inference.
//!
//! Knowledge about a node's runtime value, finite-height so inference
//! terminates:
//!
//! ```text
//!              Top (no information yet)
//!               |
//!        Const(Int/Bool)
//!             /    \
//!           Int    Bool
//!             \    /
//!             Bottom (not a value)
//! ```
//!
//! The barrier contract is phrased in terms of this lattice: pass-through
//! barriers forward their protected input's lattice value, and a
//! conditional-constant barrier collapses to `Const` only when the
//! optimizer proves its test independently.

use std::fmt;

// =============================================================================
// Constants
// =============================================================================

/// Compile-time constant values the optimizer reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constant {
    /// 64-bit signed integer.
    Int(i64),
    /// Boolean value.
    Bool(bool),
}

impl Constant {
    /// Get as integer if applicable.
    #[inline]
    pub const fn as_int(self) -> Option<i64> {
        match self {
            Constant::Int(v) => Some(v),
            _ => None,
        }
    }

    /// Get as boolean if applicable.
    #[inline]
    pub const fn as_bool(self) -> Option<bool> {
        match self {
            Constant::Bool(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(v) => write!(f, "{}", v),
            Constant::Bool(v) => write!(f, "{}", v),
        }
    }
}

// =============================================================================
// Lattice
// =============================================================================

/// Inferred knowledge about one node's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lattice {
    /// Nothing known yet.
    Top,
    /// Known constant.
    Const(Constant),
    /// Some runtime integer.
    Int,
    /// Some runtime boolean.
    Bool,
    /// Not a value (control, dead, or conflicting).
    Bottom,
}

impl Lattice {
    /// Known-constant accessor.
    #[inline]
    pub const fn as_const(self) -> Option<Constant> {
        match self {
            Lattice::Const(c) => Some(c),
            _ => None,
        }
    }

    /// Check if this is a known constant.
    #[inline]
    pub const fn is_const(self) -> bool {
        matches!(self, Lattice::Const(_))
    }

    /// The abstraction of a constant: the level directly below it.
    const fn widened(self) -> Lattice {
        match self {
            Lattice::Const(Constant::Int(_)) => Lattice::Int,
            Lattice::Const(Constant::Bool(_)) => Lattice::Bool,
            other => other,
        }
    }

    /// Lattice meet: combine knowledge from two sources (e.g. Phi inputs).
    pub fn meet(self, other: Lattice) -> Lattice {
        use Lattice::*;

        match (self, other) {
            (a, b) if a == b => a,
            (Top, x) | (x, Top) => x,
            (Bottom, _) | (_, Bottom) => Bottom,

            // Unequal constants widen to their common abstraction.
            (Const(_), Const(_)) | (Const(_), _) | (_, Const(_)) => {
                let a = self.widened();
                let b = other.widened();
                if a == b {
                    a
                } else {
                    Bottom
                }
            }

            // Int meets Bool: conflicting.
            _ => Bottom,
        }
    }
}

impl Default for Lattice {
    fn default() -> Self {
        Lattice::Top
    }
}

impl fmt::Display for Lattice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lattice::Top => write!(f, "⊤"),
            Lattice::Const(c) => write!(f, "const {}", c),
            Lattice::Int => write!(f, "int"),
            Lattice::Bool => write!(f, "bool"),
            Lattice::Bottom => write!(f, "⊥"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meet_identity() {
        let c = Lattice::Const(Constant::Int(5));
        assert_eq!(c.meet(c), c);
        assert_eq!(Lattice::Int.meet(Lattice::Int), Lattice::Int);
    }

    #[test]
    fn test_meet_top() {
        let c = Lattice::Const(Constant::Bool(true));
        assert_eq!(Lattice::Top.meet(c), c);
        assert_eq!(c.meet(Lattice::Top), c);
    }

    #[test]
    fn test_meet_unequal_constants() {
        let a = Lattice::Const(Constant::Int(1));
        let b = Lattice::Const(Constant::Int(2));
        assert_eq!(a.meet(b), Lattice::Int);

        let t = Lattice::Const(Constant::Bool(true));
        let f = Lattice::Const(Constant::Bool(false));
        assert_eq!(t.meet(f), Lattice::Bool);
    }

    #[test]
    fn test_meet_conflicting() {
        let i = Lattice::Const(Constant::Int(1));
        let b = Lattice::Const(Constant::Bool(true));
        assert_eq!(i.meet(b), Lattice::Bottom);
        assert_eq!(Lattice::Int.meet(Lattice::Bool), Lattice::Bottom);
        assert_eq!(Lattice::Bottom.meet(i), Lattice::Bottom);
    }

    #[test]
    fn test_const_accessors() {
        assert_eq!(Constant::Int(3).as_int(), Some(3));
        assert_eq!(Constant::Int(3).as_bool(), None);
        assert!(Lattice::Const(Constant::Bool(false)).is_const());
        assert!(!Lattice::Bool.is_const());
    }
}
