//! Physical frame pools for the fast and slow memory tiers
//!
//! Each pool is a pre-populated, seeded random permutation of contiguous
//! page base addresses. Frames only ever leave a pool; the model performs
//! no reclamation, so a drained pool stays drained for the lifetime of the
//! simulation.

use std::collections::VecDeque;
use std::fmt;

use log::{error, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::config::{VmemConfig, BASE_PAGE_SIZE};

/// What a drawn frame will back, for exhaustion diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameUse {
    /// A data page claimed by a first-touch translation
    DataPage,
    /// A page holding packed page-table entries
    TablePage,
}

impl fmt::Display for FrameUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameUse::DataPage => write!(f, "data page"),
            FrameUse::TablePage => write!(f, "page-table page"),
        }
    }
}

/// A drainable sequence of physical frame base addresses
///
/// Construction produces `count` contiguous page-aligned addresses
/// starting at `base`, then permutes them with a seeded PRNG so the
/// hand-out order is deterministic for a given seed but not
/// address-ordered.
#[derive(Debug, Clone)]
pub struct FramePool {
    frames: VecDeque<u64>,
}

impl FramePool {
    /// Builds a shuffled pool of `count` frames starting at `base`.
    pub fn new(base: u64, count: u64, seed: u64) -> Self {
        let mut frames: Vec<u64> = (0..count).map(|i| base + i * BASE_PAGE_SIZE).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        frames.shuffle(&mut rng);
        Self {
            frames: VecDeque::from(frames),
        }
    }

    /// Number of frames remaining in the pool.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns `true` if the pool has been drained.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Peeks at the next frame that would be handed out.
    pub fn front(&self) -> Option<u64> {
        self.frames.front().copied()
    }

    /// Consumes and returns the next frame.
    pub fn pop_front(&mut self) -> Option<u64> {
        self.frames.pop_front()
    }
}

/// Two-tier frame allocator: fast pool first, slow pool as fallback
///
/// This is the single allocation primitive shared by the translator and
/// the PTE locator, so both exhaust the tiers in exactly the same order.
#[derive(Debug, Clone)]
pub struct FrameAllocator {
    fast: FramePool,
    slow: FramePool,
    fast_base: u64,
    fast_end: u64,
}

impl FrameAllocator {
    /// Builds both tier pools from a validated configuration.
    ///
    /// Fast frames occupy `[reserve, reserve + fast_pages * page)`; slow
    /// frames begin exactly where the fast range ends, leaving no gap and
    /// no overlap in the simulated physical address space.
    pub fn new(config: &VmemConfig) -> Self {
        let fast_base = config.reserve_capacity;
        let fast_pages = config.fast_pages();
        let slow_pages = config.slow_pages();
        let fast_end = fast_base + fast_pages * BASE_PAGE_SIZE;

        let fast = FramePool::new(fast_base, fast_pages, config.random_seed);
        let slow = FramePool::new(fast_end, slow_pages, config.random_seed);

        info!(
            "frame pools: {fast_pages} fast frames at {fast_base:#x}..{fast_end:#x}, \
             {slow_pages} slow frames at {fast_end:#x}..{:#x}",
            fast_end + slow_pages * BASE_PAGE_SIZE
        );

        Self {
            fast,
            slow,
            fast_base,
            fast_end,
        }
    }

    /// Draws one frame, fast tier first, slow tier as fallback.
    ///
    /// # Panics
    ///
    /// Panics when both pools are empty. The model performs no
    /// reclamation, so this means the simulated working set exceeds the
    /// configured physical capacity and the run cannot continue.
    pub fn draw(&mut self, purpose: FrameUse) -> u64 {
        if let Some(frame) = self.fast.pop_front() {
            return frame;
        }
        match self.slow.pop_front() {
            Some(frame) => frame,
            None => {
                error!("both frame pools exhausted while allocating a {purpose}");
                panic!(
                    "out of physical frames: allocating a {purpose} with both \
                     fast and slow pools empty (capacity misconfiguration)"
                );
            }
        }
    }

    /// Frames remaining in the fast pool.
    pub fn fast_len(&self) -> usize {
        self.fast.len()
    }

    /// Frames remaining in the slow pool.
    pub fn slow_len(&self) -> usize {
        self.slow.len()
    }

    /// First physical address past the fast tier.
    pub fn fast_end(&self) -> u64 {
        self.fast_end
    }

    /// Returns `true` if `addr` falls inside the fast tier.
    pub fn is_fast(&self, addr: u64) -> bool {
        addr >= self.fast_base && addr < self.fast_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> VmemConfig {
        // 8 pages: 2 reserved + 4 fast + 2 slow.
        VmemConfig::new(8 * BASE_PAGE_SIZE, 4096, 2, 7, 100)
            .with_tier_split(0.75, 0.25)
            .with_reserve_capacity(2 * BASE_PAGE_SIZE)
    }

    #[test]
    fn test_pool_covers_contiguous_range() {
        let pool = FramePool::new(0x2000, 4, 99);
        let mut frames: Vec<u64> = pool.frames.iter().copied().collect();
        frames.sort_unstable();
        assert_eq!(frames, vec![0x2000, 0x3000, 0x4000, 0x5000]);
    }

    #[test]
    fn test_pool_shuffle_is_deterministic() {
        let a = FramePool::new(0, 64, 1234);
        let b = FramePool::new(0, 64, 1234);
        assert_eq!(a.frames, b.frames);
    }

    #[test]
    fn test_pool_shuffle_varies_with_seed() {
        let a = FramePool::new(0, 64, 1);
        let b = FramePool::new(0, 64, 2);
        assert_eq!(a.len(), b.len());
        assert_ne!(a.frames, b.frames);
    }

    #[test]
    fn test_pop_front_drains_pool() {
        let mut pool = FramePool::new(0, 2, 0);
        assert_eq!(pool.len(), 2);
        let first = pool.front();
        assert_eq!(pool.pop_front(), first);
        assert!(pool.pop_front().is_some());
        assert!(pool.is_empty());
        assert_eq!(pool.pop_front(), None);
    }

    #[test]
    fn test_tiers_are_contiguous_and_disjoint() {
        let config = small_config();
        config.validate().unwrap();
        let alloc = FrameAllocator::new(&config);

        let mut fast: Vec<u64> = alloc.fast.frames.iter().copied().collect();
        let mut slow: Vec<u64> = alloc.slow.frames.iter().copied().collect();
        fast.sort_unstable();
        slow.sort_unstable();

        assert_eq!(fast.first(), Some(&(2 * BASE_PAGE_SIZE)));
        assert_eq!(fast.last(), Some(&(5 * BASE_PAGE_SIZE)));
        assert_eq!(slow.first(), Some(&(6 * BASE_PAGE_SIZE)));
        assert_eq!(slow.last(), Some(&(7 * BASE_PAGE_SIZE)));
        assert_eq!(alloc.fast_end(), 6 * BASE_PAGE_SIZE);
    }

    #[test]
    fn test_draw_prefers_fast_tier() {
        let config = small_config();
        let mut alloc = FrameAllocator::new(&config);

        for _ in 0..4 {
            let frame = alloc.draw(FrameUse::DataPage);
            assert!(alloc.is_fast(frame), "expected fast frame, got {frame:#x}");
        }
        for _ in 0..2 {
            let frame = alloc.draw(FrameUse::DataPage);
            assert!(!alloc.is_fast(frame), "expected slow frame, got {frame:#x}");
        }
        assert_eq!(alloc.fast_len(), 0);
        assert_eq!(alloc.slow_len(), 0);
    }

    #[test]
    #[should_panic(expected = "out of physical frames")]
    fn test_draw_panics_when_both_tiers_empty() {
        let mut alloc = FrameAllocator::new(&small_config());
        for _ in 0..7 {
            alloc.draw(FrameUse::TablePage);
        }
    }
}
