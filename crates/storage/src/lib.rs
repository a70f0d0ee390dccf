//! Fixed-size page file storage.
//!
//! A page file is a single flat file on disk: a 4-byte little-endian
//! page count, followed by that many concatenated [`PAGE_SIZE`]-byte
//! pages. [`PageFileStore`] owns one open file and exposes random-access
//! read/write by page number plus append-only growth, the way the
//! buffer pool manager (see the `buffer` crate) expects to drive it.
//!
//! # Example
//!
//! ```no_run
//! use storage::{PageFileStore, PageBuf, PAGE_SIZE};
//!
//! PageFileStore::create("/tmp/data.db").unwrap();
//! let mut store = PageFileStore::open("/tmp/data.db").unwrap();
//!
//! let mut buf: PageBuf = [0u8; PAGE_SIZE];
//! buf[0] = 42;
//! store.write_block(0, &buf).unwrap();
//!
//! let mut back: PageBuf = [0u8; PAGE_SIZE];
//! store.read_block(0, &mut back).unwrap();
//! assert_eq!(back[0], 42);
//! ```


use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};

use common::{PageNumber, StoreError, StoreResult};

/// Size in bytes of every page. Not configurable at runtime: variable
/// page sizes are out of scope for this engine.
pub const PAGE_SIZE: usize = 4096;

/// Size in bytes of the leading page-count header.
const HEADER_BYTES: usize = 4;

/// One page's worth of bytes. A fixed-size array rather than a `Vec`
/// so the `PAGE_SIZE` invariant is a type-level guarantee instead of a
/// runtime check every caller has to remember to make.
pub type PageBuf = [u8; PAGE_SIZE];

/// An open, durable, fixed-size-page file.
///
/// Tracks the page count from the file header and a "current position"
/// cursor used by the `read_*_block`/`write_current_block` convenience
/// methods. Dropping a `PageFileStore` without calling [`close`](Self::close)
/// still flushes best-effort; `close` exists so callers can observe and
/// propagate a final flush failure.
#[derive(Debug)]
pub struct PageFileStore {
    file_name: String,
    file: File,
    total_num_pages: PageNumber,
    cur_page_pos: PageNumber,
}

impl PageFileStore {
    /// Create a new page file containing a header of `1` and one
    /// zero-filled page. Fails if the file already exists or cannot be
    /// written; any partially-written file is removed.
    pub fn create(name: &str) -> StoreResult<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(name)
            .map_err(|e| StoreError::WriteFailed(format!("create {name}: {e}")))?;

        let result = (|| -> std::io::Result<()> {
            file.write_all(&1i32.to_le_bytes())?;
            file.write_all(&[0u8; PAGE_SIZE])?;
            file.flush()?;
            Ok(())
        })();

        if let Err(e) = result {
            drop(file);
            let _ = fs::remove_file(name);
            return Err(StoreError::WriteFailed(format!("create {name}: {e}")));
        }
        Ok(())
    }

    /// Open an existing page file read/write.
    ///
    /// Reads the header page count and cross-checks it against the
    /// file's actual length: if the file is longer than the header
    /// claims, the header is recomputed from the file length and
    /// rewritten (a trailing-complete-page overrun is tolerated); if
    /// the file is shorter than the header claims, this fails.
    pub fn open(name: &str) -> StoreResult<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(name)
            .map_err(|_| StoreError::FileNotFound(name.to_string()))?;

        let file_len = file
            .metadata()
            .map_err(|e| StoreError::NoSuchPage(format!("stat {name}: {e}")))?
            .len();

        if file_len < HEADER_BYTES as u64 {
            return Err(StoreError::NoSuchPage(format!(
                "{name}: file too short to contain a header"
            )));
        }

        let mut header = [0u8; HEADER_BYTES];
        file.seek(SeekFrom::Start(0))
            .map_err(|e| StoreError::NoSuchPage(format!("seek {name}: {e}")))?;
        file.read_exact(&mut header)
            .map_err(|e| StoreError::NoSuchPage(format!("read header of {name}: {e}")))?;
        let mut total_num_pages = i32::from_le_bytes(header);

        let expected_len = HEADER_BYTES as u64 + total_num_pages as u64 * PAGE_SIZE as u64;
        if file_len < expected_len {
            return Err(StoreError::NoSuchPage(format!(
                "{name}: file length {file_len} shorter than header-declared {expected_len}"
            )));
        }
        if file_len > expected_len {
            total_num_pages = ((file_len - HEADER_BYTES as u64) / PAGE_SIZE as u64) as i32;
            file.seek(SeekFrom::Start(0))
                .map_err(|e| StoreError::WriteFailed(format!("seek {name}: {e}")))?;
            file.write_all(&total_num_pages.to_le_bytes())
                .map_err(|e| StoreError::WriteFailed(format!("rewrite header of {name}: {e}")))?;
            file.flush()
                .map_err(|e| StoreError::WriteFailed(format!("flush {name}: {e}")))?;
        }

        Ok(Self {
            file_name: name.to_string(),
            file,
            total_num_pages,
            cur_page_pos: 0,
        })
    }

    /// Flush and close the file. Consumes `self`; there is no
    /// "use after close" state to guard against.
    pub fn close(mut self) -> StoreResult<()> {
        self.file
            .flush()
            .map_err(|e| StoreError::WriteFailed(format!("close {}: {e}", self.file_name)))
    }

    /// Remove a page file from disk.
    pub fn destroy(name: &str) -> StoreResult<()> {
        fs::remove_file(name).map_err(|_| StoreError::FileNotFound(name.to_string()))
    }

    /// The file's name as passed to `create`/`open`.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Number of data pages currently addressable.
    pub fn total_num_pages(&self) -> PageNumber {
        self.total_num_pages
    }

    /// The page index most recently read or written, or `0` right
    /// after `open`.
    pub fn block_pos(&self) -> PageNumber {
        self.cur_page_pos
    }

    /// Bounds check for the read path. Out-of-range maps to
    /// `NoSuchPage`, matching `readBlock`'s `RC_READ_NON_EXISTING_PAGE`.
    fn check_read_bounds(&self, n: PageNumber) -> StoreResult<()> {
        if n < 0 || n >= self.total_num_pages {
            return Err(StoreError::NoSuchPage(format!(
                "page {n} out of range (0..{})",
                self.total_num_pages
            )));
        }
        Ok(())
    }

    /// Bounds check for the write path. Out-of-range maps to
    /// `WriteFailed`, matching `writeBlock`'s `RC_WRITE_FAILED` — the
    /// same condition as the read path, but the original gives it a
    /// different error code, so the checks aren't shared.
    fn check_write_bounds(&self, n: PageNumber) -> StoreResult<()> {
        if n < 0 || n >= self.total_num_pages {
            return Err(StoreError::WriteFailed(format!(
                "page {n} out of range (0..{})",
                self.total_num_pages
            )));
        }
        Ok(())
    }

    fn offset_of(n: PageNumber) -> u64 {
        HEADER_BYTES as u64 + n as u64 * PAGE_SIZE as u64
    }

    /// Read page `n` into `buf`. Requires `0 <= n < total_num_pages`.
    pub fn read_block(&mut self, n: PageNumber, buf: &mut PageBuf) -> StoreResult<()> {
        self.check_read_bounds(n)?;
        self.file
            .seek(SeekFrom::Start(Self::offset_of(n)))
            .map_err(|e| StoreError::NoSuchPage(format!("seek to page {n}: {e}")))?;
        self.file
            .read_exact(buf)
            .map_err(|e| StoreError::NoSuchPage(format!("read page {n}: {e}")))?;
        self.cur_page_pos = n;
        Ok(())
    }

    /// Write `buf` to page `n`, flushing afterward. Requires
    /// `0 <= n < total_num_pages`.
    pub fn write_block(&mut self, n: PageNumber, buf: &PageBuf) -> StoreResult<()> {
        self.check_write_bounds(n)?;
        self.file
            .seek(SeekFrom::Start(Self::offset_of(n)))
            .map_err(|e| StoreError::WriteFailed(format!("seek to page {n}: {e}")))?;
        self.file
            .write_all(buf)
            .map_err(|e| StoreError::WriteFailed(format!("write page {n}: {e}")))?;
        self.file
            .flush()
            .map_err(|e| StoreError::WriteFailed(format!("flush after writing page {n}: {e}")))?;
        self.cur_page_pos = n;
        Ok(())
    }

    /// Read page 0.
    pub fn read_first_block(&mut self, buf: &mut PageBuf) -> StoreResult<()> {
        self.read_block(0, buf)
    }

    /// Read the page before `block_pos()`.
    pub fn read_previous_block(&mut self, buf: &mut PageBuf) -> StoreResult<()> {
        self.read_block(self.cur_page_pos - 1, buf)
    }

    /// Read the page at `block_pos()` again.
    pub fn read_current_block(&mut self, buf: &mut PageBuf) -> StoreResult<()> {
        self.read_block(self.cur_page_pos, buf)
    }

    /// Read the page after `block_pos()`.
    pub fn read_next_block(&mut self, buf: &mut PageBuf) -> StoreResult<()> {
        self.read_block(self.cur_page_pos + 1, buf)
    }

    /// Read the last addressable page.
    pub fn read_last_block(&mut self, buf: &mut PageBuf) -> StoreResult<()> {
        self.read_block(self.total_num_pages - 1, buf)
    }

    /// Write `buf` to the page at `block_pos()`.
    pub fn write_current_block(&mut self, buf: &PageBuf) -> StoreResult<()> {
        self.write_block(self.cur_page_pos, buf)
    }

    /// Append one zero-filled page, growing `total_num_pages` by one
    /// and rewriting the header. Restores the pre-append file position
    /// (`block_pos()` is unchanged).
    pub fn append_empty_block(&mut self) -> StoreResult<()> {
        let restore_pos = self.cur_page_pos;
        let name = &self.file_name;

        self.file
            .seek(SeekFrom::End(0))
            .map_err(|e| StoreError::WriteFailed(format!("seek to end of {name}: {e}")))?;
        self.file
            .write_all(&[0u8; PAGE_SIZE])
            .map_err(|e| StoreError::WriteFailed(format!("append page to {name}: {e}")))?;

        let new_total = self.total_num_pages + 1;
        self.file
            .seek(SeekFrom::Start(0))
            .map_err(|e| StoreError::WriteFailed(format!("seek to header of {name}: {e}")))?;
        self.file
            .write_all(&new_total.to_le_bytes())
            .map_err(|e| StoreError::WriteFailed(format!("rewrite header of {name}: {e}")))?;
        self.total_num_pages = new_total;

        self.file
            .seek(SeekFrom::Start(Self::offset_of(restore_pos.max(0))))
            .map_err(|e| StoreError::WriteFailed(format!("restore cursor in {name}: {e}")))?;
        self.cur_page_pos = restore_pos;
        self.file
            .flush()
            .map_err(|e| StoreError::WriteFailed(format!("flush {name}: {e}")))?;
        Ok(())
    }

    /// Append empty pages until `total_num_pages >= k`. No-op if the
    /// file already has at least `k` pages.
    pub fn ensure_capacity(&mut self, k: PageNumber) -> StoreResult<()> {
        while self.total_num_pages < k {
            self.append_empty_block()?;
        }
        Ok(())
    }
}

impl Drop for PageFileStore {
    fn drop(&mut self) {
        let _ = self.file.flush();
    }
}
