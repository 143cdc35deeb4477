//! Shared-memory SQ/CQ message channels.
//!
//! A channel is a submit queue and a completion queue laid out in one
//! contiguous shared block. The control plane creates channels and hands
//! out mapping descriptors; clients map the block and drive the rings
//! directly through the `repr(C)` header contract in [`wire`].

mod alloc;
mod args;
mod channel;
mod control;
mod error;
mod layout;
mod registry;
mod ring;
mod session;
mod view;
pub mod wire;

pub use alloc::{FileBlockAllocator, SharedBlock, SharedBlockAllocator};
pub use args::ArgTable;
pub use channel::Channel;
pub use control::{ControlPlane, MapGrant};
pub use error::ChanError;
pub use layout::{Layout, Limits, PAGE_SIZE, QUEUE_ALIGN};
pub use registry::ChannelRegistry;
pub use ring::Ring;
pub use session::Session;
pub use view::ChannelView;
