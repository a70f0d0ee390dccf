//! Shared vocabulary for the paged storage engine: the page-number type
//! both `storage` and `buffer` index by, and the error/result types that
//! flow unchanged from `storage` through `buffer`.


use thiserror::Error;

/// Identifier for a page within a page file.
///
/// Examples:
/// - `let header_page: PageNumber = 0;`
/// - `let tenth_page: PageNumber = 9;`
/// - `let sentinel: PageNumber = NO_PAGE;`
pub type PageNumber = i32;

/// Sentinel meaning "no page resident in this frame".
pub const NO_PAGE: PageNumber = -1;

/// Canonical error type shared by the `storage` and `buffer` crates.
///
/// Each variant corresponds to one of the return codes the original
/// design documents: a missing/unopenable file, an operation on a
/// handle or pool that isn't in a usable state, an out-of-range or
/// non-resident page lookup, and any write/flush/allocation failure.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("file not found: {0}")]
    FileNotFound(String),
    #[error("handle not initialized: {0}")]
    HandleNotInit(String),
    #[error("page does not exist: {0}")]
    NoSuchPage(String),
    #[error("write failed: {0}")]
    WriteFailed(String),
}

/// Result alias that carries a [`StoreError`].
pub type StoreResult<T> = Result<T, StoreError>;
