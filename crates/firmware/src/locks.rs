use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per product name. Serializes manifest read-modify-write
/// inside this process only; separate instances can still interleave.
///
/// Entries live only while someone holds or waits for them, so the map does
/// not grow with every product name ever seen.
#[derive(Default)]
pub struct ProductLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Held lock for one product. Dropping it unlocks and prunes the entry when
/// nobody else is waiting on it.
pub struct ProductGuard<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    product_name: String,
}

impl Drop for ProductGuard<'_> {
    fn drop(&mut self) {
        // the owned guard keeps its own Arc; release it before counting
        drop(self.guard.take());
        self.locks
            .remove_if(&self.product_name, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl ProductLocks {
    pub fn new() -> Self {
        Self { locks: DashMap::new() }
    }

    pub async fn lock(&self, product_name: &str) -> ProductGuard<'_> {
        let lock = self
            .locks
            .entry(product_name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        ProductGuard {
            guard: Some(lock.lock_owned().await),
            locks: &self.locks,
            product_name: product_name.to_string(),
        }
    }

    /// Products with a live entry.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
