use crate::model::SheetMetadata;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

struct CacheEntry {
    sheets: Arc<Vec<SheetMetadata>>,
    expires_at: Instant,
}

/// Bounded sheet-metadata cache: LRU on capacity, lazy TTL expiry on read,
/// and touch-on-read (a hit within the window resets the expiry clock).
pub(crate) struct MetadataCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl MetadataCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn get(&self, spreadsheet_id: &str) -> Option<Arc<Vec<SheetMetadata>>> {
        let mut entries = self.entries.lock();
        let now = Instant::now();

        let expired = match entries.get_mut(spreadsheet_id) {
            Some(entry) if entry.expires_at > now => {
                entry.expires_at = now + self.ttl;
                return Some(entry.sheets.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(spreadsheet_id);
        }
        None
    }

    pub fn put(&self, spreadsheet_id: String, sheets: Arc<Vec<SheetMetadata>>) {
        let entry = CacheEntry {
            sheets,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.lock().put(spreadsheet_id, entry);
    }

    pub fn invalidate(&self, spreadsheet_id: &str) -> bool {
        self.entries.lock().pop(spreadsheet_id).is_some()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
