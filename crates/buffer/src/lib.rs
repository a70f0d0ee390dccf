//! Buffer pool manager: a fixed-size, pin-based page cache over a
//! [`storage::PageFileStore`].
//!
//! [`BufferPool`] owns a frame table sized at construction time. A
//! [`pin_page`](BufferPool::pin_page) either returns an already-resident
//! page or loads it, evicting an unpinned victim under the pool's
//! [`ReplacementStrategy`] if the table is full. Callers pair every
//! `pin_page` with [`unpin_page`](BufferPool::unpin_page); dirtied pages
//! must be marked with [`mark_dirty`](BufferPool::mark_dirty) so they
//! survive eviction and [`force_flush_pool`](BufferPool::force_flush_pool).
//!
//! # Example
//!
//! ```no_run
//! use buffer::{BufferPool, ReplacementStrategy};
//! use storage::PageFileStore;
//!
//! PageFileStore::create("/tmp/data.db").unwrap();
//! let mut pool = BufferPool::init("/tmp/data.db", 16, ReplacementStrategy::Lru, None).unwrap();
//!
//! {
//!     let page = pool.pin_page(0).unwrap();
//!     page.data[0] = 7;
//! }
//! pool.mark_dirty(0).unwrap();
//! pool.unpin_page(0).unwrap();
//! pool.force_flush_pool().unwrap();
//! ```

mod policy;


use hashbrown::HashMap;

use common::{NO_PAGE, PageNumber, StoreError, StoreResult};
use storage::{PageBuf, PageFileStore};

pub use policy::{DEFAULT_LRU_K, ReplacementStrategy};
use policy::{Frame, select_victim};

/// A borrowed view onto a resident page's bytes, returned by
/// [`BufferPool::pin_page`].
///
/// `data` borrows the pool's internal frame buffer for as long as the
/// handle lives; the borrow checker enforces that no other `&mut`
/// operation on the pool (including the matching `unpin_page`) can run
/// until the handle is dropped.
pub struct PageHandle<'a> {
    pub page_num: PageNumber,
    pub data: &'a mut PageBuf,
}

/// Construction parameters for [`BufferPool::init_with_config`].
///
/// Plain [`BufferPool::init`] covers the common case; this builder exists
/// for callers wiring a buffer pool up from a larger configuration object
/// (a server's startup config, a test harness) who want named,
/// defaulted fields instead of a fixed positional argument list.
#[derive(Clone, Debug, bon::Builder)]
pub struct BufferPoolConfig {
    /// Path to a page file already created via [`PageFileStore::create`].
    pub file_name: String,
    /// Number of frames to allocate.
    #[builder(default = DEFAULT_NUM_FRAMES)]
    pub num_pages: usize,
    /// Eviction policy. Defaults to LRU, matching `FilePager`'s
    /// single-policy default.
    #[builder(default = ReplacementStrategy::Lru)]
    pub strategy: ReplacementStrategy,
    /// LRU-K history window. Ignored by every strategy but `LruK`.
    pub strat_data: Option<usize>,
}

/// Default frame count when a [`BufferPoolConfig`] doesn't specify one.
pub const DEFAULT_NUM_FRAMES: usize = 256;

/// Fixed-size, pin-based page cache over one open page file.
pub struct BufferPool {
    file: PageFileStore,
    frames: Vec<Frame>,
    index: HashMap<PageNumber, usize>,
    strategy: ReplacementStrategy,
    lru_k: usize,
    clock_hand: usize,
    time_counter: u64,
    num_read_io: u64,
    num_write_io: u64,
}

impl BufferPool {
    /// Allocate `num_pages` frames and open `file_name` through
    /// `storage`. `strat_data` is the LRU-K `K` parameter; `None`
    /// defaults to [`DEFAULT_LRU_K`] and is ignored by every other
    /// strategy.
    ///
    /// # Panics
    ///
    /// Panics if `num_pages` is 0.
    pub fn init(
        file_name: &str,
        num_pages: usize,
        strategy: ReplacementStrategy,
        strat_data: Option<usize>,
    ) -> StoreResult<Self> {
        assert!(num_pages > 0, "num_pages must be > 0");

        let file = PageFileStore::open(file_name)?;
        let frames = (0..num_pages).map(|_| Frame::empty()).collect();

        Ok(Self {
            file,
            frames,
            index: HashMap::new(),
            strategy,
            lru_k: strat_data.unwrap_or(DEFAULT_LRU_K),
            clock_hand: 0,
            time_counter: 0,
            num_read_io: 0,
            num_write_io: 0,
        })
    }

    /// Equivalent to [`init`](Self::init), taking a [`BufferPoolConfig`]
    /// instead of positional arguments.
    pub fn init_with_config(config: BufferPoolConfig) -> StoreResult<Self> {
        Self::init(&config.file_name, config.num_pages, config.strategy, config.strat_data)
    }

    /// Number of frames in the pool.
    pub fn num_pages(&self) -> usize {
        self.frames.len()
    }

    /// The pool's replacement strategy.
    pub fn strategy(&self) -> ReplacementStrategy {
        self.strategy
    }

    fn tick(&mut self) -> u64 {
        self.time_counter += 1;
        self.time_counter
    }

    fn write_through(&mut self, frame_idx: usize) -> StoreResult<()> {
        let frame = &mut self.frames[frame_idx];
        if frame.dirty && frame.page_num != NO_PAGE {
            self.file.write_block(frame.page_num, &frame.data)?;
            frame.dirty = false;
            self.num_write_io += 1;
        }
        Ok(())
    }

    /// Fetch page `n`, loading it from disk and evicting a victim if
    /// necessary. Increments the frame's pin count.
    pub fn pin_page(&mut self, n: PageNumber) -> StoreResult<PageHandle<'_>> {
        if n < 0 {
            return Err(StoreError::NoSuchPage(format!("negative page number {n}")));
        }

        if let Some(&frame_idx) = self.index.get(&n) {
            let clock = self.tick();
            let frame = &mut self.frames[frame_idx];
            frame.fix_count += 1;
            frame.record_hit(clock, self.strategy, self.lru_k);
            return Ok(PageHandle {
                page_num: n,
                data: &mut frame.data,
            });
        }

        let (frame_idx, next_hand) = select_victim(&self.frames, self.strategy, self.lru_k, self.clock_hand)
            .ok_or_else(|| StoreError::WriteFailed("no unpinned frame available".into()))?;
        self.clock_hand = next_hand;

        self.write_through(frame_idx)?;
        let evicted = self.frames[frame_idx].page_num;
        if evicted != NO_PAGE {
            self.index.remove(&evicted);
        }

        self.file.read_block(n, &mut self.frames[frame_idx].data)?;
        self.num_read_io += 1;
        let clock = self.tick();
        self.frames[frame_idx].reset_for_load(n, clock, self.strategy, self.lru_k);
        self.index.insert(n, frame_idx);

        let frame = &mut self.frames[frame_idx];
        Ok(PageHandle {
            page_num: n,
            data: &mut frame.data,
        })
    }

    fn frame_of(&self, n: PageNumber) -> StoreResult<usize> {
        self.index
            .get(&n)
            .copied()
            .ok_or_else(|| StoreError::NoSuchPage(format!("page {n} is not resident")))
    }

    /// Decrement page `n`'s pin count. Never goes below zero.
    pub fn unpin_page(&mut self, n: PageNumber) -> StoreResult<()> {
        let frame_idx = self.frame_of(n)?;
        let frame = &mut self.frames[frame_idx];
        if frame.fix_count > 0 {
            frame.fix_count -= 1;
        }
        Ok(())
    }

    /// Mark page `n`'s frame dirty.
    pub fn mark_dirty(&mut self, n: PageNumber) -> StoreResult<()> {
        let frame_idx = self.frame_of(n)?;
        self.frames[frame_idx].dirty = true;
        Ok(())
    }

    /// Write page `n`'s frame through to disk if dirty.
    pub fn force_page(&mut self, n: PageNumber) -> StoreResult<()> {
        let frame_idx = self.frame_of(n)?;
        self.write_through(frame_idx)
    }

    /// Write every dirty resident frame to disk. Stops at the first
    /// failure.
    pub fn force_flush_pool(&mut self) -> StoreResult<()> {
        for i in 0..self.frames.len() {
            self.write_through(i)?;
        }
        Ok(())
    }

    /// Flush dirty pages and close the underlying file.
    ///
    /// Fails with [`StoreError::HandleNotInit`] if any frame still has
    /// a positive pin count — callers must unpin everything first.
    pub fn shutdown(mut self) -> StoreResult<()> {
        if let Some(pinned) = self.frames.iter().position(|f| f.fix_count > 0) {
            return Err(StoreError::HandleNotInit(format!(
                "frame {pinned} still pinned (page {})",
                self.frames[pinned].page_num
            )));
        }
        self.force_flush_pool()?;
        self.file.close()
    }

    /// Snapshot of each frame's resident page number, or [`NO_PAGE`].
    pub fn frame_contents(&self) -> Vec<PageNumber> {
        self.frames.iter().map(|f| f.page_num).collect()
    }

    /// Snapshot of each frame's dirty flag.
    pub fn dirty_flags(&self) -> Vec<bool> {
        self.frames.iter().map(|f| f.dirty).collect()
    }

    /// Snapshot of each frame's pin count.
    pub fn fix_counts(&self) -> Vec<i32> {
        self.frames.iter().map(|f| f.fix_count).collect()
    }

    /// Number of pages read from disk since `init`.
    pub fn num_read_io(&self) -> u64 {
        self.num_read_io
    }

    /// Number of pages written to disk since `init`.
    pub fn num_write_io(&self) -> u64 {
        self.num_write_io
    }
}
