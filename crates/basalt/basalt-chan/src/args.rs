//! Argument tables: the field sizes composing one message slot.

use crate::error::ChanError;
use crate::wire::{ArgTableRaw, MAX_ARGS, MAX_SLOT_BYTES};

/// Ordered field byte-sizes for one direction of a channel.
///
/// The sum of the sizes is the payload size of one slot in that direction's
/// ring. At most [`MAX_ARGS`] fields; every field is at least one byte and
/// the sum stays within [`MAX_SLOT_BYTES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgTable {
    argc: usize,
    sizes: [u32; MAX_ARGS],
}

impl ArgTable {
    pub fn new(sizes: &[u32]) -> Result<Self, ChanError> {
        if sizes.is_empty() {
            return Err(ChanError::InvalidArgument("argument table is empty"));
        }
        if sizes.len() > MAX_ARGS {
            return Err(ChanError::InvalidArgument("too many argument fields"));
        }
        if sizes.iter().any(|&s| s == 0) {
            return Err(ChanError::InvalidArgument("zero-sized argument field"));
        }
        if sizes.iter().map(|&s| u64::from(s)).sum::<u64>() > MAX_SLOT_BYTES as u64 {
            return Err(ChanError::InvalidArgument("slot size exceeds ceiling"));
        }

        let mut table = [0u32; MAX_ARGS];
        table[..sizes.len()].copy_from_slice(sizes);
        Ok(Self {
            argc: sizes.len(),
            sizes: table,
        })
    }

    pub fn from_raw(raw: &ArgTableRaw) -> Result<Self, ChanError> {
        let argc = raw.argc as usize;
        if argc > MAX_ARGS {
            return Err(ChanError::InvalidArgument("too many argument fields"));
        }
        Self::new(&raw.arg_size[..argc])
    }

    pub fn to_raw(&self) -> ArgTableRaw {
        ArgTableRaw {
            argc: self.argc as u32,
            arg_size: self.sizes,
        }
    }

    #[inline]
    pub fn argc(&self) -> usize {
        self.argc
    }

    /// Payload bytes of one slot: the sum of all field sizes.
    #[inline]
    pub fn slot_size(&self) -> usize {
        self.sizes[..self.argc].iter().map(|&s| s as usize).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_size_sums_fields() {
        let t = ArgTable::new(&[4, 8, 244]).unwrap();
        assert_eq!(t.argc(), 3);
        assert_eq!(t.slot_size(), 256);
    }

    #[test]
    fn rejects_bad_tables() {
        assert_eq!(
            ArgTable::new(&[]),
            Err(ChanError::InvalidArgument("argument table is empty"))
        );
        assert_eq!(
            ArgTable::new(&[1; MAX_ARGS + 1]),
            Err(ChanError::InvalidArgument("too many argument fields"))
        );
        assert_eq!(
            ArgTable::new(&[16, 0]),
            Err(ChanError::InvalidArgument("zero-sized argument field"))
        );
    }

    #[test]
    fn slot_ceiling_bounds_field_sum() {
        // The per-field values are u32, so the sum must be checked before
        // any layout math happens.
        assert!(ArgTable::new(&[MAX_SLOT_BYTES as u32]).is_ok());
        assert_eq!(
            ArgTable::new(&[u32::MAX]),
            Err(ChanError::InvalidArgument("slot size exceeds ceiling"))
        );
        assert_eq!(
            ArgTable::new(&[MAX_SLOT_BYTES as u32, 1]),
            Err(ChanError::InvalidArgument("slot size exceeds ceiling"))
        );
    }

    #[test]
    fn raw_roundtrip() {
        let t = ArgTable::new(&[256]).unwrap();
        let raw = t.to_raw();
        assert_eq!(raw.argc, 1);
        assert_eq!(raw.arg_size[0], 256);
        assert_eq!(ArgTable::from_raw(&raw).unwrap(), t);

        let bogus = ArgTableRaw {
            argc: MAX_ARGS as u32 + 1,
            arg_size: [1; MAX_ARGS],
        };
        assert!(ArgTable::from_raw(&bogus).is_err());
    }
}
