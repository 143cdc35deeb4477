//! Cross-address-space binary contract.
//!
//! Every structure here is mapped or copied verbatim between the control
//! plane and its clients, so all of them are `repr(C)` with fixed field
//! order and no hidden padding. The channel block itself looks like:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  SQ  QueueHeader { head: u32, tail: u32 }    (8 bytes)    │
//! │      capacity × slot  (slot = sum of SQ arg sizes)        │
//! ├──────────────────────────────────────────────────────────┤ ← cq_offset
//! │  CQ  QueueHeader { head: u32, tail: u32 }    (8 bytes)    │
//! │      capacity × slot  (slot = sum of CQ arg sizes)        │
//! ├──────────────────────────────────────────────────────────┤
//! │  padding up to the page-rounded block size                │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Slots holding text are NUL-terminated; both sides interpret the header
//! fields with identical modulo-`capacity` arithmetic.

use std::mem::{align_of, size_of};
use std::sync::atomic::AtomicU32;

/// Maximum number of fields composing one message slot in one direction.
pub const MAX_ARGS: usize = 6;

/// Default ceiling on live channels.
pub const CHAN_MAX: usize = 16;

/// Payload bytes of the default single-field message slot.
pub const DEFAULT_SLOT_SIZE: u32 = 256;

/// Slot count used when a create request leaves the capacity at zero.
pub const DEFAULT_CAPACITY: u32 = 32;

/// Ceiling on one slot's payload (the summed field sizes of a direction).
pub const MAX_SLOT_BYTES: usize = 1 << 20;

/// Bytes occupied by a ring header inside the block.
pub const HEADER_BYTES: usize = size_of::<QueueHeader>();

/// Ring header at the start of each queue region.
///
/// `head` is the next slot to consume, `tail` the next slot to produce.
/// Both stay in `[0, capacity)`; empty iff `head == tail`, full iff
/// `(tail + 1) % capacity == head` (one slot is sacrificed to tell the two
/// apart). In-process access goes through atomics; the on-wire shape is two
/// plain 4-byte integers.
#[repr(C)]
pub struct QueueHeader {
    pub head: AtomicU32,
    pub tail: AtomicU32,
}

/// One direction's argument table: the byte sizes of the fields composing
/// a message slot. `arg_size[argc..]` is ignored.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArgTableRaw {
    pub argc: u32,
    pub arg_size: [u32; MAX_ARGS],
}

/// Create-or-bind request/response.
///
/// On request: `id < 0` asks for any free channel, `id >= 0` names one;
/// `cache_cnt` is the requested slot count (0 means the default). On
/// response every field is filled in, with `cache_cnt` holding the clamped
/// capacity actually used and `mmap_sz`/`cq_offset` describing the block
/// the caller should map.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelInfo {
    pub id: i32,
    pub sq_info: ArgTableRaw,
    pub cq_info: ArgTableRaw,
    pub cache_cnt: u32,
    pub mmap_sz: u32,
    pub cq_offset: u32,
    pub usr_cnt: u32,
}

/// Legacy single-channel layout response.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LegacyDescriptor {
    pub sq_offset: i32,
    pub cq_offset: i32,
    pub memblk_size: i32,
}

const _: () = assert!(size_of::<QueueHeader>() == 8);
const _: () = assert!(size_of::<ArgTableRaw>() == 28);
const _: () = assert!(size_of::<ChannelInfo>() == 76);
const _: () = assert!(size_of::<LegacyDescriptor>() == 12);
const _: () = assert!(align_of::<QueueHeader>() == 4);
