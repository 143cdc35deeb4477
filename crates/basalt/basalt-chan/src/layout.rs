//! Block layout arithmetic: sizing the SQ and CQ regions of a channel.

use crate::args::ArgTable;
use crate::error::ChanError;
use crate::wire::{CHAN_MAX, HEADER_BYTES};

/// Alignment of each queue region inside the block (pointer width).
pub const QUEUE_ALIGN: usize = 8;

/// Granularity of the shared block allocator.
pub const PAGE_SIZE: usize = 4096;

/// Configured ceilings applied before any sizing happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Hard ceiling on live channels.
    pub max_channels: usize,
    /// Slot-count ceiling a create request is clamped against.
    pub max_capacity: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_channels: CHAN_MAX,
            max_capacity: 1024,
        }
    }
}

/// Computed layout of one channel block.
///
/// The SQ region starts at offset 0, the CQ region at `cq_offset`, and the
/// whole block is `total_size` bytes, rounded up to the allocator's page
/// granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Slot count per queue, after clamping.
    pub capacity: u32,
    /// Payload bytes of one SQ slot.
    pub sq_slot: usize,
    /// Payload bytes of one CQ slot.
    pub cq_slot: usize,
    /// Bytes of the SQ region (header + slots, aligned).
    pub sq_size: usize,
    /// Bytes of the CQ region (header + slots, aligned).
    pub cq_size: usize,
    /// Byte offset of the CQ region: the aligned end of the SQ region.
    pub cq_offset: usize,
    /// Page-rounded size of the whole block.
    pub total_size: usize,
}

#[inline]
pub(crate) fn align_up(value: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    (value + align - 1) & !(align - 1)
}

fn queue_bytes(capacity: u32, slot: usize) -> usize {
    align_up(HEADER_BYTES + capacity as usize * slot, QUEUE_ALIGN)
}

impl Layout {
    /// Size both queue regions for `requested` slots per direction.
    ///
    /// The requested capacity is clamped into `[2, max_capacity]` rather
    /// than rejected; the clamped value is reported back in the layout. A
    /// ring needs at least two slots because one is sacrificed to
    /// distinguish full from empty.
    ///
    /// The descriptor carries `mmap_sz` and `cq_offset` as `u32`, so a
    /// block the descriptor cannot express is rejected here, before any
    /// allocation happens.
    pub fn compute(
        sq: &ArgTable,
        cq: &ArgTable,
        requested: u32,
        limits: &Limits,
    ) -> Result<Layout, ChanError> {
        let capacity = requested.clamp(2, limits.max_capacity.max(2));

        let sq_slot = sq.slot_size();
        let cq_slot = cq.slot_size();
        let sq_size = queue_bytes(capacity, sq_slot);
        let cq_size = queue_bytes(capacity, cq_slot);
        let total_size = align_up(sq_size + cq_size, PAGE_SIZE);
        if total_size > u32::MAX as usize {
            return Err(ChanError::InvalidArgument("channel block exceeds descriptor range"));
        }

        Ok(Layout {
            capacity,
            sq_slot,
            cq_slot,
            sq_size,
            cq_size,
            cq_offset: sq_size,
            total_size,
        })
    }
}
