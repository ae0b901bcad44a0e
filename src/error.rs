//! Error types for the virtual memory model
//!
//! All errors here are configuration errors detected at construction.
//! Running out of physical frames at allocation time is deliberately not
//! represented: the model performs no reclamation, so exhaustion of both
//! capacity tiers is unrecoverable and aborts with a diagnostic instead.

use core::fmt;

/// Configuration error detected while constructing the model
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Total physical capacity is zero or not a multiple of the base page size
    CapacityNotPageAligned(u64),
    /// Table page size is not a power of two greater than 1024 bytes
    InvalidPageSize(u64),
    /// Page-table level count is zero
    InvalidLevelCount(u32),
    /// The walk's index fields do not fit a 64-bit virtual address
    WalkExceedsAddressWidth {
        /// Configured number of page-table levels
        pt_levels: u32,
        /// Configured table page size
        page_size: u64,
    },
    /// Fast/slow capacity fractions are out of range or do not cover the capacity
    InvalidTierSplit {
        /// Fraction of capacity assigned to the fast tier
        fast: f64,
        /// Fraction of capacity assigned to the slow tier
        slow: f64,
    },
    /// Reserved region is not a multiple of the base page size
    ReserveNotPageAligned(u64),
    /// A capacity tier ended up with no frames after the split
    EmptyTier(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::CapacityNotPageAligned(capacity) => {
                write!(
                    f,
                    "physical capacity {capacity} is not a nonzero multiple of the base page size"
                )
            }
            Error::InvalidPageSize(page_size) => {
                write!(
                    f,
                    "table page size {page_size} must be a power of two greater than 1024"
                )
            }
            Error::InvalidLevelCount(levels) => {
                write!(f, "page table must have at least one level, got {levels}")
            }
            Error::WalkExceedsAddressWidth {
                pt_levels,
                page_size,
            } => {
                write!(
                    f,
                    "{pt_levels} levels of {page_size}-byte table pages index past \
                     the 64-bit virtual address width"
                )
            }
            Error::InvalidTierSplit { fast, slow } => {
                write!(
                    f,
                    "fast/slow capacity split {fast}/{slow} does not partition the capacity"
                )
            }
            Error::ReserveNotPageAligned(reserve) => {
                write!(
                    f,
                    "reserved capacity {reserve} is not a multiple of the base page size"
                )
            }
            Error::EmptyTier(tier) => {
                write!(f, "{tier} memory tier has no frames after the capacity split")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Result type for operations that can fail
pub type Result<T> = core::result::Result<T, Error>;
