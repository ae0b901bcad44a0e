//! Virtual-to-physical translation and page-table walk modeling
//!
//! [`VirtualMemory`] owns the authoritative translation state for one
//! simulated machine: the per-core virtual-page map, the per-level PTE
//! location map, the two-tier frame allocator, and the PTE packing
//! cursor. The surrounding timing simulator calls [`VirtualMemory::translate`]
//! once per memory reference and [`VirtualMemory::locate_pte`] once per
//! walk level, charging [`VirtualMemory::minor_fault_penalty`] whenever a
//! call reports a first touch.

use hashbrown::hash_map::Entry;
use hashbrown::HashMap;
use log::{debug, info};

use crate::bits::{bitmask, lg2, splice_bits};
use crate::config::{VmemConfig, BASE_PAGE_SHIFT, BASE_PAGE_SIZE, PTE_BYTES};
use crate::error::Result;
use crate::frame_pool::{FrameAllocator, FrameUse};

/// Running counters for on-demand allocations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VmemStats {
    /// First-touch data-page translations
    pub data_page_faults: u64,
    /// First-touch page-table page allocations
    pub table_page_faults: u64,
}

impl VmemStats {
    /// Total minor faults across data and table pages.
    pub fn total_faults(&self) -> u64 {
        self.data_page_faults + self.table_page_faults
    }
}

/// The virtual memory model for one simulated machine
///
/// All mutable state lives in this one value; there is no internal
/// locking, and callers driving it from multiple threads must serialize
/// access themselves. Mappings are insert-only: once a virtual page or a
/// table page is placed, it keeps its frame for the rest of the run.
pub struct VirtualMemory {
    page_size: u64,
    pt_levels: u32,
    minor_fault_penalty: u64,
    allocator: FrameAllocator,
    /// PTE packing cursor: `Some` while the last-assigned frame still has
    /// room for another table page, `None` when the next first touch must
    /// draw a fresh frame.
    next_pte_page: Option<u64>,
    vpage_to_ppage: HashMap<(u32, u64), u64>,
    pte_pages: HashMap<(u32, u64, u32), u64>,
    stats: VmemStats,
}

impl VirtualMemory {
    /// Builds the model from a configuration, validating it first.
    pub fn new(config: VmemConfig) -> Result<Self> {
        config.validate()?;
        let allocator = FrameAllocator::new(&config);
        info!(
            "virtual memory model: {} bytes capacity, {} byte table pages, {} walk levels",
            config.capacity, config.page_size, config.pt_levels
        );
        Ok(Self {
            page_size: config.page_size,
            pt_levels: config.pt_levels,
            minor_fault_penalty: config.minor_fault_penalty,
            allocator,
            next_pte_page: None,
            vpage_to_ppage: HashMap::new(),
            pte_pages: HashMap::new(),
            stats: VmemStats::default(),
        })
    }

    /// Bit position where level `level`'s index field begins.
    ///
    /// Each table page holds `page_size / PTE_BYTES` entries, so every
    /// level above the base page offset consumes another
    /// `lg2(page_size / PTE_BYTES)` bits of the virtual address.
    pub fn shamt(&self, level: u32) -> u32 {
        BASE_PAGE_SHIFT + level * lg2(self.page_size / PTE_BYTES)
    }

    /// Index into level `level`'s table page for `vaddr`.
    pub fn get_offset(&self, vaddr: u64, level: u32) -> u64 {
        (vaddr >> self.shamt(level)) & bitmask(lg2(self.page_size / PTE_BYTES))
    }

    /// Translates a virtual address for a core to a physical address.
    ///
    /// On the first touch of a `(core, virtual page)` pair a frame is
    /// drawn from the fast pool, or the slow pool once fast is exhausted,
    /// and the second element of the result is `true`. Repeated calls for
    /// the same pair are pure lookups.
    ///
    /// # Panics
    ///
    /// Panics if a first touch finds both frame pools empty.
    pub fn translate(&mut self, core_id: u32, vaddr: u64) -> (u64, bool) {
        let vpn = vaddr >> BASE_PAGE_SHIFT;
        let Self {
            vpage_to_ppage,
            allocator,
            stats,
            ..
        } = self;
        let (frame, first_touch) = match vpage_to_ppage.entry((core_id, vpn)) {
            Entry::Occupied(entry) => (*entry.get(), false),
            Entry::Vacant(entry) => {
                let frame = allocator.draw(FrameUse::DataPage);
                entry.insert(frame);
                stats.data_page_faults += 1;
                debug!("core {core_id} vpn {vpn:#x}: first touch, frame {frame:#x}");
                (frame, true)
            }
        };
        (splice_bits(frame, vaddr, BASE_PAGE_SHIFT), first_touch)
    }

    /// Resolves where level `level`'s page-table entry for `vaddr` lives.
    ///
    /// Addresses sharing the same prefix above `shamt(level + 1)` share
    /// one table page per core, so the walk for neighbouring pages mostly
    /// hits already-placed table pages. New table pages are packed into
    /// the cursor's current frame until it is full, then the cursor
    /// refills from the frame pools.
    ///
    /// `level` must be below the configured level count.
    ///
    /// # Panics
    ///
    /// Panics if a cursor refill finds both frame pools empty.
    pub fn locate_pte(&mut self, core_id: u32, vaddr: u64, level: u32) -> (u64, bool) {
        debug_assert!(level < self.pt_levels, "walk level {level} out of range");
        let key = (core_id, vaddr >> self.shamt(level + 1), level);
        let offset_bits = lg2(self.page_size);
        let pte_offset = self.get_offset(vaddr, level) * PTE_BYTES;
        let Self {
            pte_pages,
            allocator,
            next_pte_page,
            page_size,
            stats,
            ..
        } = self;
        let (page, first_touch) = match pte_pages.entry(key) {
            Entry::Occupied(entry) => (*entry.get(), false),
            Entry::Vacant(entry) => {
                let page = match next_pte_page.take() {
                    Some(page) => page,
                    None => allocator.draw(FrameUse::TablePage),
                };
                entry.insert(page);
                // Advance the packing cursor; a cursor landing on a base
                // page boundary means the frame is fully packed and the
                // next table page needs a fresh frame.
                let advanced = page + *page_size;
                if advanced % BASE_PAGE_SIZE != 0 {
                    *next_pte_page = Some(advanced);
                }
                stats.table_page_faults += 1;
                debug!("core {core_id} level {level}: table page placed at {page:#x}");
                (page, true)
            }
        };
        (splice_bits(page, pte_offset, offset_bits), first_touch)
    }

    /// Configured table page size in bytes.
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Number of page-table levels in the simulated walk.
    pub fn pt_levels(&self) -> u32 {
        self.pt_levels
    }

    /// Latency cost the caller should charge per minor fault.
    pub fn minor_fault_penalty(&self) -> u64 {
        self.minor_fault_penalty
    }

    /// First physical address past the fast memory tier.
    ///
    /// Callers modeling tiered DRAM latency compare returned physical
    /// addresses against this boundary.
    pub fn fast_end(&self) -> u64 {
        self.allocator.fast_end()
    }

    /// Frames still available in the fast pool.
    pub fn available_fast_pages(&self) -> usize {
        self.allocator.fast_len()
    }

    /// Frames still available in the slow pool.
    pub fn available_slow_pages(&self) -> usize {
        self.allocator.slow_len()
    }

    /// Allocation counters accumulated so far.
    pub fn stats(&self) -> VmemStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(page_size: u64) -> VirtualMemory {
        // 64 pages: 32 fast + 32 slow, nothing reserved.
        let config = VmemConfig::new(64 * BASE_PAGE_SIZE, page_size, 3, 11, 50)
            .with_tier_split(0.5, 0.5)
            .with_reserve_capacity(0);
        VirtualMemory::new(config).unwrap()
    }

    #[test]
    fn test_shamt_per_level() {
        let vm = model(4096);
        // 4096 / 8 = 512 entries per table page, 9 bits per level.
        assert_eq!(vm.shamt(0), 12);
        assert_eq!(vm.shamt(1), 21);
        assert_eq!(vm.shamt(2), 30);

        let vm = model(2048);
        // 256 entries per table page, 8 bits per level.
        assert_eq!(vm.shamt(1), 20);
    }

    #[test]
    fn test_get_offset_extracts_level_field() {
        let vm = model(4096);
        let vaddr = (0x1A5u64 << 21) | (0x0FFu64 << 12) | 0x7;
        assert_eq!(vm.get_offset(vaddr, 0), 0x0FF);
        assert_eq!(vm.get_offset(vaddr, 1), 0x1A5);
    }

    #[test]
    fn test_translate_preserves_page_offset() {
        let mut vm = model(4096);
        let (pa, first) = vm.translate(0, 0xDEAD_BEEF);
        assert!(first);
        assert_eq!(pa & 0xFFF, 0xEEF);
        assert_eq!(pa % BASE_PAGE_SIZE, 0xEEF);
    }

    #[test]
    fn test_translate_is_idempotent() {
        let mut vm = model(4096);
        let (pa1, first1) = vm.translate(2, 0x4_2000);
        let (pa2, first2) = vm.translate(2, 0x4_2000);
        assert!(first1);
        assert!(!first2);
        assert_eq!(pa1, pa2);
        assert_eq!(vm.stats().data_page_faults, 1);
    }

    #[test]
    fn test_cores_do_not_share_frames() {
        let mut vm = model(4096);
        let (pa0, _) = vm.translate(0, 0x1000);
        let (pa1, _) = vm.translate(1, 0x1000);
        assert_ne!(pa0 >> BASE_PAGE_SHIFT, pa1 >> BASE_PAGE_SHIFT);
    }

    #[test]
    fn test_pte_pages_pack_into_one_frame() {
        let mut vm = model(2048);
        let before = vm.available_fast_pages();

        // Three level-0 table pages; keys differ above shamt(1) = 20.
        let (pa1, first1) = vm.locate_pte(0, 0, 0);
        let (pa2, first2) = vm.locate_pte(0, 1 << 20, 0);
        let (_pa3, _) = vm.locate_pte(0, 2 << 20, 0);

        assert!(first1);
        assert!(first2);
        // Two 2048-byte table pages fit one 4096-byte frame, so only the
        // first and third placements draw from the pool.
        assert_eq!(vm.available_fast_pages(), before - 2);
        // The second table page sits in the upper half of the first frame.
        let base1 = pa1 & !bitmask(lg2(2048));
        let base2 = pa2 & !bitmask(lg2(2048));
        assert_eq!(base2, base1 + 2048);
    }

    #[test]
    fn test_pte_frame_per_table_page_at_base_granularity() {
        let mut vm = model(4096);
        let before = vm.available_fast_pages();
        vm.locate_pte(0, 0, 0);
        vm.locate_pte(0, 1 << 21, 0);
        // With table pages equal to the base page size each placement
        // consumes a whole frame.
        assert_eq!(vm.available_fast_pages(), before - 2);
    }

    #[test]
    fn test_locate_pte_is_idempotent() {
        let mut vm = model(4096);
        let (pa1, first1) = vm.locate_pte(3, 0xABCD_EF00, 1);
        let (pa2, first2) = vm.locate_pte(3, 0xABCD_EF00, 1);
        assert!(first1);
        assert!(!first2);
        assert_eq!(pa1, pa2);
        assert_eq!(vm.stats().table_page_faults, 1);
    }

    #[test]
    fn test_accessors_reflect_config() {
        let config = VmemConfig::new(64 * BASE_PAGE_SIZE, 2048, 4, 9, 777)
            .with_tier_split(0.5, 0.5)
            .with_reserve_capacity(0);
        let vm = VirtualMemory::new(config).unwrap();
        assert_eq!(vm.page_size(), 2048);
        assert_eq!(vm.pt_levels(), 4);
        assert_eq!(vm.minor_fault_penalty(), 777);
        assert_eq!(vm.fast_end(), 32 * BASE_PAGE_SIZE);
        assert_eq!(vm.available_fast_pages(), 32);
        assert_eq!(vm.available_slow_pages(), 32);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = VmemConfig::new(64 * BASE_PAGE_SIZE + 1, 4096, 3, 0, 0);
        assert!(VirtualMemory::new(config).is_err());
    }

    #[test]
    fn test_deepest_level_resolves_wide_addresses() {
        // A walk depth that would shift past 64 bits never constructs.
        let too_deep = VmemConfig::new(64 * BASE_PAGE_SIZE, 4096, 6, 11, 50)
            .with_tier_split(0.5, 0.5)
            .with_reserve_capacity(0);
        assert!(VirtualMemory::new(too_deep).is_err());

        // At the maximum valid depth the top level keys off shamt(5) = 57
        // and handles addresses using the full translatable range.
        let config = VmemConfig::new(64 * BASE_PAGE_SIZE, 4096, 5, 11, 50)
            .with_tier_split(0.5, 0.5)
            .with_reserve_capacity(0);
        let mut vm = VirtualMemory::new(config).unwrap();
        let (pa1, first1) = vm.locate_pte(0, 0x1234_5678_9ABC, 4);
        let (pa2, first2) = vm.locate_pte(0, 0x1234_5678_9ABC, 4);
        assert!(first1);
        assert!(!first2);
        assert_eq!(pa1, pa2);
    }
}
