// SPDX-License-Identifier: Apache-2.0
//! Server-side state for comment reactions.
//!
//! Three ports live here, each with a shipped implementation:
//!
//! * [`CounterStore`] — the persistent (comment, alias) → count matrix.
//!   Counts are sparse: a stored value is always > 0 and hitting zero deletes
//!   the entry. `apply` is atomic per increment, so two concurrent reacts
//!   from the same starting count both land.
//! * [`CommentDirectory`] — resolves a comment to its parent content, which
//!   is both the existence check for validation and the scope for cache
//!   invalidation.
//! * [`CacheInvalidator`] — observer port for cache layers sitting in front
//!   of the rendered page. Subscribers register on the [`InvalidationBus`];
//!   notification is fire-and-forget and never fails a request.

mod comments;
mod counter;
mod fs;
mod invalidate;

pub use comments::{CommentDirectory, StaticCommentDirectory};
pub use counter::{CounterStore, MemoryCounterStore};
pub use fs::FsCounterStore;
pub use invalidate::{CacheInvalidator, InvalidationBus};

use thiserror::Error;

/// Content (post/page) identifier a comment belongs to.
pub type ContentId = u64;

/// Error type for counter store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O failure in a persistent backend.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Corrupt or unwritable persisted counter data.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// A lock was poisoned by a panicking writer.
    #[error("counter lock poisoned")]
    Poisoned,
}
