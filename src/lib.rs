//! vmem-sim
//!
//! A software model of virtual-to-physical address translation for a
//! simulated multi-core machine. Physical page frames are assigned to
//! virtual pages on demand from two capacity tiers (fast memory first,
//! slow memory once fast is exhausted), and page-table-entry storage
//! addresses are resolved across an arbitrary number of walk levels so a
//! surrounding timing simulator can charge realistic translation and
//! walk latency.
//!
//! The crate is a library with no I/O surface of its own. Typical use:
//!
//! ```
//! use vmem_sim::{VirtualMemory, VmemConfig};
//!
//! let config = VmemConfig::new(1 << 30, 4096, 5, 42, 200);
//! let mut vm = VirtualMemory::new(config).unwrap();
//!
//! let (pa, minor_fault) = vm.translate(0, 0xDEAD_B000);
//! let mut walk_latency = 0;
//! for level in (0..vm.pt_levels()).rev() {
//!     let (_pte_pa, pte_fault) = vm.locate_pte(0, 0xDEAD_B000, level);
//!     if pte_fault {
//!         walk_latency += vm.minor_fault_penalty();
//!     }
//! }
//! # let _ = (pa, minor_fault, walk_latency);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bits;
pub mod config;
pub mod error;
pub mod frame_pool;
pub mod vmem;

// Re-export commonly used types and functions
pub use bits::{bitmask, lg2, splice_bits};
pub use config::{
    VmemConfig, BASE_PAGE_SHIFT, BASE_PAGE_SIZE, DEFAULT_FAST_RATE, DEFAULT_RESERVE_CAPACITY,
    DEFAULT_SLOW_RATE, PTE_BYTES,
};
pub use error::{Error, Result};
pub use frame_pool::{FrameAllocator, FramePool, FrameUse};
pub use vmem::{VirtualMemory, VmemStats};
