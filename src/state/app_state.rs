use std::sync::Arc;

use crate::db::store::AnalyticsStore;
use crate::utils::clock::Clock;
use crate::utils::fingerprint_lock::FingerprintLocks;

pub struct AppState {
    pub store: Arc<dyn AnalyticsStore>,
    pub clock: Arc<dyn Clock>,
    pub fingerprint_locks: FingerprintLocks,
}

impl AppState {
    pub fn new(store: Arc<dyn AnalyticsStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            fingerprint_locks: FingerprintLocks::default(),
        }
    }
}
