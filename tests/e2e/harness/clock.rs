use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Controllable time for annotation timestamps.
///
/// Pass it to `AnnotationStore::with_time_provider()`; every read ticks one
/// second so records created in one step still order deterministically.
#[derive(Clone)]
pub struct MockClock {
    current: Arc<AtomicI64>,
}

impl MockClock {
    /// Creates a time provider function suitable for passing to the store.
    pub fn as_provider(&self) -> impl Fn() -> i64 + Send + Sync + 'static {
        let current = self.current.clone();
        move || current.fetch_add(1, Ordering::SeqCst)
    }
}

impl MockClock {
    /// Create a new mock clock at a fixed instant (2024-01-01T00:00:00Z)
    pub fn new() -> Self {
        Self {
            current: Arc::new(AtomicI64::new(1_704_067_200)),
        }
    }

    /// Get current timestamp
    pub fn now(&self) -> i64 {
        self.current.load(Ordering::SeqCst)
    }

    /// Advance time by duration
    pub fn advance(&self, duration: Duration) {
        let seconds = duration.as_secs() as i64;
        self.current.fetch_add(seconds, Ordering::SeqCst);
    }

    /// Advance time by hours
    pub fn advance_hours(&self, hours: u64) {
        self.advance(Duration::from_secs(hours * 3600));
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}
