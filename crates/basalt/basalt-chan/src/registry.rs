//! Fixed-capacity table of live channels.
//!
//! One mutex protects the whole table: free-slot scan-and-claim, channel
//! construction, bind/unbind reference counting, and destruction all happen
//! under it, so lookups never observe a half-built channel and the
//! refcount's zero transitions are atomic with respect to create/destroy.

use crate::alloc::SharedBlockAllocator;
use crate::args::ArgTable;
use crate::channel::Channel;
use crate::error::ChanError;
use crate::layout::{Layout, Limits};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct Inner {
    slots: Vec<Option<Arc<Channel>>>,
    /// Live channel ids in creation order.
    live: Vec<u32>,
}

pub struct ChannelRegistry {
    inner: Mutex<Inner>,
    limits: Limits,
}

impl ChannelRegistry {
    pub fn new(limits: Limits) -> Self {
        Self {
            inner: Mutex::new(Inner {
                slots: vec![None; limits.max_channels],
                live: Vec::new(),
            }),
            limits,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Get an existing channel, or create one.
    ///
    /// A `requested_id` naming a live channel returns it unchanged (the
    /// bind itself is the session's job). `None` claims the first free id;
    /// an in-range free id is claimed as asked; an out-of-range id is
    /// `InvalidChannel`. The whole scan-claim-construct sequence runs under
    /// the registry lock.
    pub fn create_or_bind(
        &self,
        sq: &ArgTable,
        cq: &ArgTable,
        capacity: u32,
        requested_id: Option<u32>,
        allocator: &dyn SharedBlockAllocator,
    ) -> Result<Arc<Channel>, ChanError> {
        let mut inner = self.lock();

        let id = match requested_id {
            Some(id) => {
                if id as usize >= self.limits.max_channels {
                    return Err(ChanError::InvalidChannel(id));
                }
                if let Some(chan) = &inner.slots[id as usize] {
                    tracing::debug!(id, refs = chan.refs(), "found existing channel");
                    return Ok(Arc::clone(chan));
                }
                id
            }
            None => inner
                .slots
                .iter()
                .position(Option::is_none)
                .ok_or(ChanError::RegistryExhausted)? as u32,
        };

        let layout = Layout::compute(sq, cq, capacity, &self.limits)?;
        let chan = Arc::new(Channel::create(id, *sq, *cq, layout, allocator)?);

        inner.slots[id as usize] = Some(Arc::clone(&chan));
        inner.live.push(id);
        tracing::info!(
            id,
            capacity = layout.capacity,
            total = layout.total_size,
            "channel created"
        );
        Ok(chan)
    }

    pub fn get(&self, id: u32) -> Result<Arc<Channel>, ChanError> {
        let inner = self.lock();
        inner
            .slots
            .get(id as usize)
            .and_then(Option::as_ref)
            .map(Arc::clone)
            .ok_or(ChanError::InvalidChannel(id))
    }

    /// Bind a session to a live channel, incrementing its reference count.
    pub fn bind(&self, id: u32) -> Result<Arc<Channel>, ChanError> {
        let inner = self.lock();
        let chan = inner
            .slots
            .get(id as usize)
            .and_then(Option::as_ref)
            .map(Arc::clone)
            .ok_or(ChanError::InvalidChannel(id))?;
        let refs = chan.acquire();
        tracing::debug!(id, refs, "channel bound");
        Ok(chan)
    }

    /// Drop one binding; when the count reaches zero the channel is
    /// destroyed and its id returned to the pool. Returns the remaining
    /// count. Unbinding a channel with no bindings is an error, not a
    /// destruction.
    pub fn unbind(&self, id: u32) -> Result<u32, ChanError> {
        let mut inner = self.lock();
        let chan = inner
            .slots
            .get(id as usize)
            .and_then(Option::as_ref)
            .map(Arc::clone)
            .ok_or(ChanError::InvalidChannel(id))?;

        let remaining = chan.release()?;
        tracing::debug!(id, refs = remaining, "channel unbound");
        if remaining == 0 {
            Self::remove(&mut inner, id);
        }
        Ok(remaining)
    }

    /// Destroy a channel outright. Only legal with no outstanding bindings.
    pub fn destroy(&self, id: u32) -> Result<(), ChanError> {
        let mut inner = self.lock();
        let refs = inner
            .slots
            .get(id as usize)
            .and_then(Option::as_ref)
            .map(|chan| chan.refs())
            .ok_or(ChanError::InvalidChannel(id))?;
        if refs > 0 {
            return Err(ChanError::InvalidArgument("channel still has bindings"));
        }
        Self::remove(&mut inner, id);
        Ok(())
    }

    fn remove(inner: &mut Inner, id: u32) {
        inner.slots[id as usize] = None;
        inner.live.retain(|&l| l != id);
        tracing::info!(id, "channel destroyed");
    }

    /// Live channel ids in creation order.
    pub fn live_ids(&self) -> Vec<u32> {
        self.lock().live.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
