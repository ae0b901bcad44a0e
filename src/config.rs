//! Simulation constants and model configuration
//!
//! Two page granularities coexist in this model and are deliberately kept
//! as independent constants: [`BASE_PAGE_SIZE`] is the fixed data-page
//! granularity of the simulated machine, while [`VmemConfig::page_size`]
//! is the configurable table-page granularity used for PTE packing.

use static_assertions::{const_assert, const_assert_eq};

use crate::bits::lg2;
use crate::error::{Error, Result};

/// Fixed data-page size of the simulated machine (4KB)
pub const BASE_PAGE_SIZE: u64 = 4096;
/// Base page shift (log2 of BASE_PAGE_SIZE)
pub const BASE_PAGE_SHIFT: u32 = 12;
/// Size of one page-table entry in bytes
pub const PTE_BYTES: u64 = 8;

/// Default fraction of physical capacity backed by the fast tier
pub const DEFAULT_FAST_RATE: f64 = 0.25;
/// Default fraction of physical capacity backed by the slow tier
pub const DEFAULT_SLOW_RATE: f64 = 0.75;
/// Default reserved region at the bottom of the physical address space (10MB)
pub const DEFAULT_RESERVE_CAPACITY: u64 = 10 * 1024 * 1024;

const_assert!(BASE_PAGE_SIZE.is_power_of_two());
const_assert_eq!(1u64 << BASE_PAGE_SHIFT, BASE_PAGE_SIZE);
const_assert!(PTE_BYTES.is_power_of_two());
const_assert_eq!(DEFAULT_RESERVE_CAPACITY % BASE_PAGE_SIZE, 0);

/// Construction parameters for the virtual memory model
///
/// All fields are validated by [`VmemConfig::validate`] before any state
/// is built; an invalid configuration never produces a partially
/// constructed model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VmemConfig {
    /// Total physical capacity in bytes (multiple of [`BASE_PAGE_SIZE`])
    pub capacity: u64,
    /// Table page size for PTE packing (power of two, greater than 1024)
    pub page_size: u64,
    /// Number of page-table levels in the simulated walk
    pub pt_levels: u32,
    /// Seed for the deterministic frame-pool permutation
    pub random_seed: u64,
    /// Latency cost of a minor fault, passed through to the caller's timing model
    pub minor_fault_penalty: u64,
    /// Fraction of capacity backing the fast memory tier
    pub fast_rate: f64,
    /// Fraction of capacity backing the slow memory tier
    pub slow_rate: f64,
    /// Region at the start of the physical address space excluded from the fast pool
    pub reserve_capacity: u64,
}

impl VmemConfig {
    /// Creates a configuration with the default tier split and reserve.
    pub fn new(
        capacity: u64,
        page_size: u64,
        pt_levels: u32,
        random_seed: u64,
        minor_fault_penalty: u64,
    ) -> Self {
        Self {
            capacity,
            page_size,
            pt_levels,
            random_seed,
            minor_fault_penalty,
            fast_rate: DEFAULT_FAST_RATE,
            slow_rate: DEFAULT_SLOW_RATE,
            reserve_capacity: DEFAULT_RESERVE_CAPACITY,
        }
    }

    /// Overrides the fast/slow capacity split.
    pub fn with_tier_split(mut self, fast_rate: f64, slow_rate: f64) -> Self {
        self.fast_rate = fast_rate;
        self.slow_rate = slow_rate;
        self
    }

    /// Overrides the reserved region at the bottom of the address space.
    pub fn with_reserve_capacity(mut self, reserve_capacity: u64) -> Self {
        self.reserve_capacity = reserve_capacity;
        self
    }

    /// Validates the configuration.
    ///
    /// Checks capacity alignment, the table page size domain, the level
    /// count, and that the tier split partitions the capacity into a
    /// reserved region plus two non-empty pools with no gap and no
    /// overlap.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 || self.capacity % BASE_PAGE_SIZE != 0 {
            return Err(Error::CapacityNotPageAligned(self.capacity));
        }
        if !self.page_size.is_power_of_two() || self.page_size <= 1024 {
            return Err(Error::InvalidPageSize(self.page_size));
        }
        if self.pt_levels == 0 {
            return Err(Error::InvalidLevelCount(self.pt_levels));
        }
        // The deepest shift amount, shamt(pt_levels), must stay below 64
        // or PTE key computation would shift past the address width.
        let index_bits = lg2(self.page_size / PTE_BYTES);
        if u64::from(BASE_PAGE_SHIFT) + u64::from(self.pt_levels) * u64::from(index_bits)
            >= u64::from(u64::BITS)
        {
            return Err(Error::WalkExceedsAddressWidth {
                pt_levels: self.pt_levels,
                page_size: self.page_size,
            });
        }
        if self.fast_rate <= 0.0
            || self.slow_rate <= 0.0
            || (self.fast_rate + self.slow_rate - 1.0).abs() > 1e-9
        {
            return Err(Error::InvalidTierSplit {
                fast: self.fast_rate,
                slow: self.slow_rate,
            });
        }
        if self.reserve_capacity % BASE_PAGE_SIZE != 0 {
            return Err(Error::ReserveNotPageAligned(self.reserve_capacity));
        }
        if self.fast_bytes() < self.reserve_capacity + BASE_PAGE_SIZE {
            return Err(Error::EmptyTier("fast"));
        }
        if self.slow_pages() == 0 {
            return Err(Error::EmptyTier("slow"));
        }
        // The split must account for every page of the configured capacity.
        let total_pages = self.capacity / BASE_PAGE_SIZE;
        if self.fast_pages() + self.slow_pages() + self.reserve_pages() != total_pages {
            return Err(Error::InvalidTierSplit {
                fast: self.fast_rate,
                slow: self.slow_rate,
            });
        }
        Ok(())
    }

    /// Bytes of capacity assigned to the fast tier, including the reserve.
    pub(crate) fn fast_bytes(&self) -> u64 {
        (self.capacity as f64 * self.fast_rate) as u64
    }

    /// Frames available in the fast pool.
    pub(crate) fn fast_pages(&self) -> u64 {
        (self.fast_bytes() - self.reserve_capacity) / BASE_PAGE_SIZE
    }

    /// Frames available in the slow pool.
    pub(crate) fn slow_pages(&self) -> u64 {
        (self.capacity as f64 * self.slow_rate) as u64 / BASE_PAGE_SIZE
    }

    /// Pages withheld for the reserved region.
    pub(crate) fn reserve_pages(&self) -> u64 {
        self.reserve_capacity / BASE_PAGE_SIZE
    }
}
