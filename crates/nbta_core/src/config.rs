//! Configuration for replica stores.

/// Configuration for a [`crate::DurableStore`].
#[derive(Debug, Clone)]
pub struct DurableStoreConfig {
    /// Sync the log after every appended record.
    ///
    /// With this off a crash can lose the latest records; replay still
    /// recovers a consistent prefix.
    pub sync_on_write: bool,
}

impl DurableStoreConfig {
    /// Creates the default configuration (sync on every write).
    pub fn new() -> Self {
        Self {
            sync_on_write: true,
        }
    }

    /// Sets whether each append is synced.
    pub fn with_sync_on_write(mut self, sync_on_write: bool) -> Self {
        self.sync_on_write = sync_on_write;
        self
    }
}

impl Default for DurableStoreConfig {
    fn default() -> Self {
        Self::new()
    }
}
