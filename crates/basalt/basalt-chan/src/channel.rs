//! A channel: one SQ and one CQ ring carved out of one shared block.

use crate::alloc::{SharedBlock, SharedBlockAllocator};
use crate::args::ArgTable;
use crate::error::ChanError;
use crate::layout::Layout;
use crate::ring::Ring;
use crate::wire::{ChannelInfo, LegacyDescriptor};
use std::path::Path;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, Ordering};

/// A live channel.
///
/// Owns the backing block exclusively until dropped; the rings are views
/// into it at explicit offsets (SQ at 0, CQ at `layout.cq_offset`). The
/// reference count tracks bound sessions and is only moved through zero
/// under the registry lock.
pub struct Channel {
    id: u32,
    sq_table: ArgTable,
    cq_table: ArgTable,
    layout: Layout,
    block: Box<dyn SharedBlock>,
    sq: Ring,
    cq: Ring,
    refs: AtomicU32,
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl Channel {
    /// Allocate the block and initialize both rings.
    ///
    /// Nothing is published anywhere: the caller (the registry) installs
    /// the channel only after this returns, so a half-constructed channel
    /// is never observable. On allocation failure the reserved id simply
    /// never gets installed.
    pub(crate) fn create(
        id: u32,
        sq_table: ArgTable,
        cq_table: ArgTable,
        layout: Layout,
        allocator: &dyn SharedBlockAllocator,
    ) -> Result<Channel, ChanError> {
        let block = allocator.allocate(layout.total_size)?;
        debug_assert!(block.len() >= layout.total_size);

        let base = block.base();
        // SAFETY: the block is at least total_size bytes, page-aligned at
        // the base, and cq_offset is 8-aligned inside it; this channel is
        // the only owner until the registry publishes it.
        let sq = unsafe { Ring::init_at(base, layout.capacity, layout.sq_slot) };
        let cq = unsafe {
            let cq_base = NonNull::new_unchecked(base.as_ptr().add(layout.cq_offset));
            Ring::init_at(cq_base, layout.capacity, layout.cq_slot)
        };

        tracing::debug!(
            id,
            capacity = layout.capacity,
            total = layout.total_size,
            cq_offset = layout.cq_offset,
            "channel block initialized"
        );

        Ok(Channel {
            id,
            sq_table,
            cq_table,
            layout,
            block,
            sq,
            cq,
            refs: AtomicU32::new(0),
        })
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Submit queue: produced by clients, consumed by the control plane.
    #[inline]
    pub fn sq(&self) -> &Ring {
        &self.sq
    }

    /// Completion queue: produced by the control plane side, consumed by
    /// the mapped client.
    #[inline]
    pub fn cq(&self) -> &Ring {
        &self.cq
    }

    /// Number of bound sessions.
    pub fn refs(&self) -> u32 {
        self.refs.load(Ordering::Acquire)
    }

    /// Path of the backing block, for out-of-process mapping.
    pub fn block_path(&self) -> Option<&Path> {
        self.block.path()
    }

    pub(crate) fn acquire(&self) -> u32 {
        self.refs.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Drop one binding, or fail if there are none to drop.
    ///
    /// Zero transitions only happen under the registry lock, so the
    /// load-then-sub pair cannot race another release.
    pub(crate) fn release(&self) -> Result<u32, ChanError> {
        if self.refs.load(Ordering::Acquire) == 0 {
            return Err(ChanError::InvalidArgument("channel has no bindings"));
        }
        Ok(self.refs.fetch_sub(1, Ordering::AcqRel) - 1)
    }

    /// Mapping descriptor handed back from create-or-bind.
    pub fn descriptor(&self) -> ChannelInfo {
        ChannelInfo {
            id: self.id as i32,
            sq_info: self.sq_table.to_raw(),
            cq_info: self.cq_table.to_raw(),
            cache_cnt: self.layout.capacity,
            mmap_sz: self.layout.total_size as u32,
            cq_offset: self.layout.cq_offset as u32,
            usr_cnt: self.refs(),
        }
    }

    /// Legacy single-channel layout descriptor.
    pub fn legacy_descriptor(&self) -> LegacyDescriptor {
        LegacyDescriptor {
            sq_offset: 0,
            cq_offset: self.layout.cq_offset as i32,
            memblk_size: self.layout.total_size as i32,
        }
    }
}
