//! Bit manipulation primitives for address decomposition
//!
//! These helpers are the arithmetic base of the translation model: every
//! component that decomposes a virtual address or splices a physical one
//! goes through this module, so the results stay bit-exact across callers.

/// Floor of the base-2 logarithm of `x`.
///
/// `x` must be nonzero; for the power-of-two sizes used throughout this
/// crate this is the exact bit width of the field below `x`.
#[inline]
pub const fn lg2(x: u64) -> u32 {
    63 - x.leading_zeros()
}

/// A mask covering the low `bits` bits.
#[inline]
pub const fn bitmask(bits: u32) -> u64 {
    if bits >= u64::BITS {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Combine the high bits of `upper` with the low `bits` bits of `lower`.
///
/// This is a bit-splice, not an addition: the low field of `upper` is
/// discarded, so a page-aligned base combined with an intra-page offset
/// preserves the offset exactly.
#[inline]
pub const fn splice_bits(upper: u64, lower: u64, bits: u32) -> u64 {
    (upper & !bitmask(bits)) | (lower & bitmask(bits))
}
