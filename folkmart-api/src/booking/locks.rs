//! Per-artist serialization
//!
//! Holding an artist's lock means no other booking, status change, or rating
//! for that artist runs in this process until the guard drops.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Entries are pruned once the map grows past this
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Clone, Default)]
pub struct ArtistLocks {
    inner: Arc<Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>>,
}

impl ArtistLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the artist's lock
    pub async fn lock(&self, artist_id: Uuid) -> OwnedMutexGuard<()> {
        let slot = {
            let mut map = self
                .inner
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());

            if map.len() > PRUNE_THRESHOLD {
                // Only the map holds a reference: nobody is waiting or locked
                map.retain(|_, m| Arc::strong_count(m) > 1);
            }

            map.entry(artist_id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        slot.lock_owned().await
    }

    /// Number of tracked artists
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}
