//! Client-side view of a mapped channel block.
//!
//! Once a side has a [`ChannelInfo`] descriptor and a mapping of the
//! block, `ChannelView` rebuilds the SQ and CQ rings at their offsets.
//! Which ring a side produces into depends on its role (a submitting client
//! fills the SQ and drains the CQ; the servicing side does the reverse);
//! the header interpretation is byte-identical on both sides.

use crate::args::ArgTable;
use crate::error::ChanError;
use crate::ring::Ring;
use crate::wire::{ChannelInfo, HEADER_BYTES};
use basalt_mmap::MmapFileMut;
use std::path::Path;
use std::ptr::NonNull;

pub struct ChannelView {
    // Owns the mapping; the rings point into it.
    _mm: MmapFileMut,
    sq: Ring,
    cq: Ring,
}

impl ChannelView {
    /// Map the block file named by a [`MapGrant`](crate::MapGrant) and
    /// build ring views from the descriptor.
    pub fn map(path: &Path, info: &ChannelInfo) -> Result<Self, ChanError> {
        let mm = MmapFileMut::open_rw(path)
            .map_err(|_| ChanError::InvalidArgument("cannot map channel block"))?;
        Self::from_mapping(mm, info)
    }

    fn from_mapping(mut mm: MmapFileMut, info: &ChannelInfo) -> Result<Self, ChanError> {
        let total = info.mmap_sz as usize;
        if total > mm.len() {
            return Err(ChanError::MappingTooLarge {
                requested: total,
                block: mm.len(),
            });
        }

        let capacity = info.cache_cnt;
        if capacity < 2 {
            return Err(ChanError::InvalidArgument("capacity below minimum"));
        }
        let sq_slot = ArgTable::from_raw(&info.sq_info)?.slot_size();
        let cq_slot = ArgTable::from_raw(&info.cq_info)?.slot_size();

        let cq_offset = info.cq_offset as usize;
        let sq_end = HEADER_BYTES + capacity as usize * sq_slot;
        let cq_end = cq_offset + HEADER_BYTES + capacity as usize * cq_slot;
        if sq_end > cq_offset || cq_end > total {
            return Err(ChanError::InvalidArgument("descriptor regions overflow block"));
        }

        let base = NonNull::new(mm.as_mut_ptr())
            .ok_or(ChanError::InvalidArgument("null mapping"))?;
        // SAFETY: both regions were bounds-checked against the mapping just
        // above, and the other side already initialized them; the mapping is
        // owned by self and outlives the rings.
        let sq = unsafe { Ring::from_raw(base, capacity, sq_slot) };
        let cq = unsafe {
            let cq_base = NonNull::new_unchecked(base.as_ptr().add(cq_offset));
            Ring::from_raw(cq_base, capacity, cq_slot)
        };

        Ok(Self { _mm: mm, sq, cq })
    }

    /// Submit queue (this side produces).
    #[inline]
    pub fn sq(&self) -> &Ring {
        &self.sq
    }

    /// Completion queue (this side consumes).
    #[inline]
    pub fn cq(&self) -> &Ring {
        &self.cq
    }
}
