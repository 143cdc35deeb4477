//! Control-plane request surface.
//!
//! Clients obtain a mapping descriptor through [`ControlPlane::create_or_bind`]
//! (or the legacy [`ControlPlane::query_layout`]) and then transact against
//! the mapped rings directly; nothing on the data plane re-enters the
//! control plane. The `enqueue`/`dequeue` methods here are the fallback
//! path for callers that have not mapped the block, mirroring the original
//! device's read/write surface, and drive the submit queue.

use crate::alloc::SharedBlockAllocator;
use crate::args::ArgTable;
use crate::channel::Channel;
use crate::error::ChanError;
use crate::layout::Limits;
use crate::registry::ChannelRegistry;
use crate::wire::{ChannelInfo, DEFAULT_CAPACITY, LegacyDescriptor};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

/// Everything a client needs to map a channel's block.
#[derive(Debug)]
pub struct MapGrant {
    pub info: ChannelInfo,
    /// Backing path when the block is file-backed.
    pub path: Option<PathBuf>,
}

pub struct ControlPlane {
    registry: ChannelRegistry,
    allocator: Box<dyn SharedBlockAllocator>,
    /// First channel created; serves the legacy single-channel queries.
    default_id: Mutex<Option<u32>>,
}

impl ControlPlane {
    pub fn new(limits: Limits, allocator: Box<dyn SharedBlockAllocator>) -> Self {
        Self {
            registry: ChannelRegistry::new(limits),
            allocator,
            default_id: Mutex::new(None),
        }
    }

    #[inline]
    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    /// Create a channel, or return an existing one named by `req.id`.
    ///
    /// The requested capacity is clamped against the configured ceiling
    /// (zero selects the default) and the clamped value comes back in
    /// `cache_cnt`; `mmap_sz` and `cq_offset` describe the block to map.
    pub fn create_or_bind(&self, req: &ChannelInfo) -> Result<ChannelInfo, ChanError> {
        let sq = ArgTable::from_raw(&req.sq_info)?;
        let cq = ArgTable::from_raw(&req.cq_info)?;
        let capacity = if req.cache_cnt == 0 {
            DEFAULT_CAPACITY
        } else {
            req.cache_cnt
        };
        let requested_id = u32::try_from(req.id).ok();

        let chan = self
            .registry
            .create_or_bind(&sq, &cq, capacity, requested_id, self.allocator.as_ref())?;

        let mut default = self.default_id.lock().unwrap_or_else(PoisonError::into_inner);
        if default.is_none() {
            *default = Some(chan.id());
        }

        Ok(chan.descriptor())
    }

    /// Legacy single-channel layout query.
    ///
    /// Reports the default channel's region offsets without creating
    /// anything; `NotInitialized` until the first create (or after the
    /// default channel has been destroyed).
    pub fn query_layout(&self) -> Result<LegacyDescriptor, ChanError> {
        let mut default = self.default_id.lock().unwrap_or_else(PoisonError::into_inner);
        let id = default.ok_or(ChanError::NotInitialized)?;
        match self.registry.get(id) {
            Ok(chan) => Ok(chan.legacy_descriptor()),
            Err(_) => {
                *default = None;
                Err(ChanError::NotInitialized)
            }
        }
    }

    /// Validate a mapping request against the channel's block size.
    ///
    /// Mapping more than the block must fail; anything up to `mmap_sz` is
    /// granted.
    pub fn map(&self, id: u32, len: usize) -> Result<MapGrant, ChanError> {
        let chan = self.registry.get(id)?;
        let total = chan.layout().total_size;
        if len > total {
            return Err(ChanError::MappingTooLarge {
                requested: len,
                block: total,
            });
        }
        Ok(MapGrant {
            info: chan.descriptor(),
            path: chan.block_path().map(PathBuf::from),
        })
    }

    fn channel(&self, id: Option<u32>) -> Result<Arc<Channel>, ChanError> {
        let id = match id {
            Some(id) => id,
            None => self
                .default_id
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .ok_or(ChanError::NotInitialized)?,
        };
        self.registry.get(id)
    }

    /// Submit a raw payload to the channel's SQ (`None` = default channel).
    pub fn enqueue(&self, id: Option<u32>, payload: &[u8]) -> Result<u32, ChanError> {
        self.channel(id)?.sq().enqueue(payload)
    }

    /// Submit a text payload to the channel's SQ.
    pub fn enqueue_text(&self, id: Option<u32>, payload: &str) -> Result<u32, ChanError> {
        self.channel(id)?.sq().enqueue_text(payload)
    }

    /// Consume the next submission from the channel's SQ.
    pub fn dequeue(&self, id: Option<u32>) -> Result<Vec<u8>, ChanError> {
        self.channel(id)?.sq().dequeue()
    }

    /// Consume the next submission from the channel's SQ as text.
    pub fn dequeue_text(&self, id: Option<u32>) -> Result<String, ChanError> {
        self.channel(id)?.sq().dequeue_text()
    }
}
