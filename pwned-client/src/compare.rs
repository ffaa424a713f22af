use subtle::{Choice, ConstantTimeEq};

/// Compares two byte strings in time independent of their contents.
///
/// Only the lengths influence timing; for equal lengths every byte pair is
/// examined no matter where the first difference is. The result stays a
/// [`Choice`] so callers can fold several comparisons together without
/// branching on any of them.
#[inline]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> Choice {
    a.ct_eq(b)
}
