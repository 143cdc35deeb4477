//! Shared block allocation.
//!
//! The core consumes physically-shared memory through the
//! [`SharedBlockAllocator`] trait and never cares how the block came to be.
//! The production implementation backs each block with a file under a
//! configured directory so a second process can map the same bytes; blocks
//! free themselves (and unlink their file) on drop.

use crate::error::ChanError;
use basalt_mmap::MmapFileMut;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};

/// One contiguous page-aligned block shared by every side of a channel.
pub trait SharedBlock: Send + Sync {
    /// Stable base address of the block for the life of the handle.
    fn base(&self) -> NonNull<u8>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Path a second process can map, when the block is file-backed.
    fn path(&self) -> Option<&Path> {
        None
    }
}

pub trait SharedBlockAllocator: Send + Sync {
    fn allocate(&self, size: usize) -> Result<Box<dyn SharedBlock>, ChanError>;
}

struct FileBlock {
    _mm: MmapFileMut,
    base: NonNull<u8>,
    len: usize,
    path: PathBuf,
}

// The mapping is shared memory by design; the ring protocol owns all
// synchronization of its contents.
unsafe impl Send for FileBlock {}
unsafe impl Sync for FileBlock {}

impl SharedBlock for FileBlock {
    fn base(&self) -> NonNull<u8> {
        self.base
    }

    fn len(&self) -> usize {
        self.len
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

impl Drop for FileBlock {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), %err, "failed to unlink block file");
        }
    }
}

/// Allocates blocks as mapped files under `dir`.
pub struct FileBlockAllocator {
    dir: PathBuf,
    next: AtomicU64,
}

impl FileBlockAllocator {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            next: AtomicU64::new(0),
        }
    }
}

impl SharedBlockAllocator for FileBlockAllocator {
    fn allocate(&self, size: usize) -> Result<Box<dyn SharedBlock>, ChanError> {
        let seq = self.next.fetch_add(1, Ordering::Relaxed);
        let path = self
            .dir
            .join(format!("basalt-chan-{}-{seq}", std::process::id()));

        let mut mm = MmapFileMut::create_rw(&path, size as u64).map_err(|err| {
            tracing::error!(path = %path.display(), size, %err, "block allocation failed");
            ChanError::AllocationFailed(size)
        })?;
        let base =
            NonNull::new(mm.as_mut_ptr()).ok_or(ChanError::AllocationFailed(size))?;

        Ok(Box::new(FileBlock {
            _mm: mm,
            base,
            len: size,
            path,
        }))
    }
}
