//! Shared handle for plugins that read the store concurrently.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::store::ReportStore;

/// Cloneable handle; many readers or one writer at a time.
#[derive(Debug, Clone)]
pub struct SharedReportStore {
    inner: Arc<RwLock<ReportStore>>,
}

impl SharedReportStore {
    #[must_use]
    pub fn new(store: ReportStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, ReportStore> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, ReportStore> {
        self.inner.write()
    }

    /// Unwrap the store when this is the last handle.
    ///
    /// # Errors
    ///
    /// Returns `self` unchanged while other handles are alive.
    pub fn try_into_inner(self) -> Result<ReportStore, Self> {
        Arc::try_unwrap(self.inner)
            .map(RwLock::into_inner)
            .map_err(|inner| Self { inner })
    }
}

impl From<ReportStore> for SharedReportStore {
    fn from(store: ReportStore) -> Self {
        Self::new(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freport_types::{RawTestResult, ReaderContext};

    #[test]
    fn readers_see_writes_across_threads() {
        let shared = SharedReportStore::new(ReportStore::default());
        let writer = shared.clone();
        std::thread::spawn(move || {
            writer.write().visit_test_result(
                RawTestResult {
                    name: Some("threaded".to_owned()),
                    start: Some(1),
                    ..RawTestResult::default()
                },
                &ReaderContext::new("thread"),
            );
        })
        .join()
        .expect("writer thread");
        assert_eq!(shared.read().all_test_results(false).len(), 1);
        assert!(shared.try_into_inner().is_ok());
    }
}
