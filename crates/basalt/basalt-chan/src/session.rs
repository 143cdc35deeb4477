//! Per-client session: at most one channel binding at a time.

use crate::control::ControlPlane;
use crate::error::ChanError;

#[derive(Debug, Default)]
pub struct Session {
    binding: Option<u32>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel this session is bound to, if any.
    pub fn channel(&self) -> Option<u32> {
        self.binding
    }

    /// Bind to a channel, contributing one reference.
    ///
    /// Rebinding to the same channel is a no-op; binding to a different
    /// one releases the previous binding first.
    pub fn bind(&mut self, plane: &ControlPlane, id: u32) -> Result<(), ChanError> {
        if self.binding == Some(id) {
            return Ok(());
        }
        plane.registry().bind(id)?;
        if let Some(prev) = self.binding.take() {
            plane.registry().unbind(prev)?;
        }
        self.binding = Some(id);
        Ok(())
    }

    /// Drop the binding. The last session to release a channel triggers
    /// its destruction; releasing an unbound session is a no-op.
    pub fn release(&mut self, plane: &ControlPlane) -> Result<(), ChanError> {
        match self.binding.take() {
            Some(id) => plane.registry().unbind(id).map(|_| ()),
            None => Ok(()),
        }
    }
}
