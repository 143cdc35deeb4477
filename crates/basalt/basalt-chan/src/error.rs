//! Error kinds returned by the channel subsystem.
//!
//! Every error is returned synchronously to the immediate caller; the core
//! never retries internally. `QueueFull`/`QueueEmpty` are ordinary results a
//! caller is expected to poll past, not failures.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChanError {
    #[error("channel {0} is not live")]
    InvalidChannel(u32),

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("payload of {len} bytes exceeds the {slot}-byte slot")]
    PayloadTooLarge { len: usize, slot: usize },

    #[error("ring has no free slot")]
    QueueFull,

    #[error("ring has nothing to dequeue")]
    QueueEmpty,

    #[error("no free channel slots remain")]
    RegistryExhausted,

    #[error("shared block allocation of {0} bytes failed")]
    AllocationFailed(usize),

    #[error("requested mapping of {requested} bytes exceeds the {block}-byte block")]
    MappingTooLarge { requested: usize, block: usize },

    #[error("no default channel has been created")]
    NotInitialized,
}
