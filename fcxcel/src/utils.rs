//! Utilities.

/// Returns a mask of the lowest `width` bits.
///
/// ### Example
/// ```
/// assert_eq!(fcxcel::mask(12), 0xfff);
/// assert_eq!(fcxcel::mask(64), u64::MAX);
/// ```
pub const fn mask(width: usize) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1 << width) - 1
    }
}

/// Interprets the lowest `width` bits of `bits` as a two's-complement number.
///
/// Bits above `width` are ignored.
pub const fn sext(bits: u64, width: usize) -> i64 {
    if width == 0 {
        return 0;
    }
    if width >= 64 {
        return bits as i64;
    }
    let shift = 64 - width as u32;
    ((bits << shift) as i64) >> shift
}

/// Some or executing the given expression.
#[macro_export]
macro_rules! some_or {
    ($e:expr, $err:expr) => {{
        match $e {
            Some(r) => r,
            None => $err,
        }
    }};
}
