//! Bulk-load invoker seam and the per-start location set

pub type LoadError = Box<dyn std::error::Error + Send + Sync>;

/// Source locations handed to every bulk-load pass.
///
/// Built once per adapter start from the listener's bound address, then
/// shared read-only with the background load loop.
#[derive(Debug, Default)]
pub struct RuntimeContext {
    locations: Vec<String>,
}

impl RuntimeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_location(&mut self, uri: String) {
        self.locations.push(uri);
    }

    pub fn locations(&self) -> &[String] {
        &self.locations
    }
}

/// One synchronous bulk-load pass pulling all currently-available
/// buffered data from the given locations into the target table.
///
/// May fail; the background loop logs the failure and retries at the
/// next period. A single pass is never retried within one call and is
/// never invoked concurrently with itself.
pub trait BulkLoad: Send + Sync {
    fn load(&self, context: &RuntimeContext) -> Result<(), LoadError>;
}
