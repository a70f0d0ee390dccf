//! Frame bookkeeping and victim selection for the five replacement
//! strategies the buffer pool supports.
//!
//! [`select_victim`] is the one seam every strategy goes through: it
//! always prefers an empty frame, and otherwise asks [`Frame::score`]
//! for a per-strategy number, taking the minimum (ties broken by
//! lowest frame index). CLOCK is the one strategy that doesn't fit the
//! "lowest score wins" shape, so it's special-cased inside
//! `select_victim` rather than forced through `score`.

use std::collections::VecDeque;

use common::{NO_PAGE, PageNumber};
use storage::PageBuf;

/// Which rule picks the eviction victim when every frame is occupied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplacementStrategy {
    /// Evict whichever resident page was loaded longest ago.
    Fifo,
    /// Evict whichever resident page was accessed longest ago.
    Lru,
    /// Evict whichever resident page has been pinned the fewest times.
    Lfu,
    /// Evict using the K-th-most-recent access time; frames with fewer
    /// than `K` recorded accesses are preferred victims.
    LruK,
    /// Second-chance sweep starting at a rotating hand.
    Clock,
}

/// Default `K` for the [`ReplacementStrategy::LruK`] policy when the
/// caller doesn't supply one to [`crate::BufferPool::init`].
pub const DEFAULT_LRU_K: usize = 2;

/// One buffer pool slot.
#[derive(Debug)]
pub(crate) struct Frame {
    pub page_num: PageNumber,
    pub data: Box<PageBuf>,
    pub dirty: bool,
    pub fix_count: i32,
    pub load_time: u64,
    pub last_access_time: u64,
    pub access_count: u64,
    pub access_history: VecDeque<u64>,
}

impl Frame {
    pub fn empty() -> Self {
        Self {
            page_num: NO_PAGE,
            data: Box::new([0u8; storage::PAGE_SIZE]),
            dirty: false,
            fix_count: 0,
            load_time: 0,
            last_access_time: 0,
            access_count: 0,
            access_history: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.page_num == NO_PAGE
    }

    /// Reset bookkeeping for a freshly-loaded page, per the strategy's
    /// "updated on load" rule.
    pub fn reset_for_load(&mut self, page_num: PageNumber, clock: u64, strategy: ReplacementStrategy, k: usize) {
        self.page_num = page_num;
        self.dirty = false;
        self.fix_count = 1;
        self.load_time = clock;
        self.last_access_time = clock;
        self.access_count = 1;
        self.access_history.clear();
        if strategy == ReplacementStrategy::LruK {
            let _ = k;
            self.access_history.push_back(clock);
        }
    }

    /// Apply the strategy's "updated on hit" rule for a cache hit.
    pub fn record_hit(&mut self, clock: u64, strategy: ReplacementStrategy, k: usize) {
        match strategy {
            ReplacementStrategy::Fifo | ReplacementStrategy::Clock => {}
            ReplacementStrategy::Lru => self.last_access_time = clock,
            ReplacementStrategy::Lfu => self.access_count += 1,
            ReplacementStrategy::LruK => {
                self.access_history.push_back(clock);
                while self.access_history.len() > k {
                    self.access_history.pop_front();
                }
            }
        }
    }

    /// Score used by every strategy except [`ReplacementStrategy::Clock`];
    /// the lowest score among unpinned occupied frames is evicted.
    fn score(&self, strategy: ReplacementStrategy, k: usize) -> u64 {
        match strategy {
            ReplacementStrategy::Fifo => self.load_time,
            ReplacementStrategy::Lru => self.last_access_time,
            ReplacementStrategy::Lfu => self.access_count,
            ReplacementStrategy::LruK => {
                if self.access_history.len() >= k {
                    *self.access_history.front().unwrap()
                } else {
                    0
                }
            }
            ReplacementStrategy::Clock => unreachable!("CLOCK does not use score()"),
        }
    }
}

/// Pick the frame to evict, or `None` if every frame is pinned.
///
/// An empty unpinned frame always wins. Otherwise CLOCK sweeps forward
/// from `clock_hand` (wrapping) for the first unpinned occupied frame;
/// every other strategy scans all unpinned occupied frames and keeps
/// the minimum [`Frame::score`], breaking ties toward the lowest index.
pub(crate) fn select_victim(
    frames: &[Frame],
    strategy: ReplacementStrategy,
    k: usize,
    clock_hand: usize,
) -> Option<(usize, usize)> {
    if let Some(i) = frames.iter().position(|f| f.fix_count == 0 && f.is_empty()) {
        return Some((i, clock_hand));
    }

    match strategy {
        ReplacementStrategy::Clock => {
            let n = frames.len();
            for offset in 0..n {
                let i = (clock_hand + offset) % n;
                if frames[i].fix_count == 0 {
                    return Some((i, (i + 1) % n));
                }
            }
            None
        }
        _ => {
            let mut best: Option<(usize, u64)> = None;
            for (i, frame) in frames.iter().enumerate() {
                if frame.fix_count != 0 {
                    continue;
                }
                let score = frame.score(strategy, k);
                best = match best {
                    Some((_, best_score)) if best_score <= score => best,
                    _ => Some((i, score)),
                };
            }
            best.map(|(i, _)| (i, clock_hand))
        }
    }
}
