//! URL ownership across shards
//!
//! Every shard evaluates the same pure function over the same URL, so for a
//! fixed shard count each URL lands on exactly one shard without any
//! coordination. Changing the shard count reassigns URLs and is only valid
//! between full restarts.

use crate::ShardError;

/// A shard's fixed place in the partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    id: u32,
    num_shards: u32,
}

impl Assignment {
    /// Validates that `id` lies in `[0, num_shards)`
    pub fn new(id: u32, num_shards: u32) -> Result<Self, ShardError> {
        if id >= num_shards {
            return Err(ShardError::InvalidShard { id, num_shards });
        }
        Ok(Self { id, num_shards })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn num_shards(&self) -> u32 {
        self.num_shards
    }

    /// Returns true if this shard owns `url`
    pub fn owns(&self, url: &str) -> bool {
        owns(url, self.id, self.num_shards)
    }
}

/// Stable unsigned CRC32 of the URL's UTF-8 bytes
pub fn url_hash(url: &str) -> u32 {
    crc32fast::hash(url.as_bytes())
}

/// Returns the id of the shard that owns `url`
///
/// # Panics
///
/// Panics if `num_shards` is zero.
pub fn shard_for(url: &str, num_shards: u32) -> u32 {
    url_hash(url) % num_shards
}

/// Returns true if shard `shard_id` of `num_shards` owns `url`
///
/// # Example
///
/// ```
/// use shard_fetch::owns;
///
/// let url = "https://example.com/";
/// let owners = (0..4).filter(|id| owns(url, *id, 4)).count();
/// assert_eq!(owners, 1);
/// ```
pub fn owns(url: &str, shard_id: u32, num_shards: u32) -> bool {
    shard_for(url, num_shards) == shard_id
}
