//! Identity types for the pipeline.
//!
//! IDs are newtypes over `u32` that index directly into `Pipeline`'s
//! declaration-ordered storage.

use std::fmt;

/// Index into `Pipeline::nodes`. Equal to the declaration position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct InstanceId(pub u32);

impl InstanceId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
