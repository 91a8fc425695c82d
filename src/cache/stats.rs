/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from a fresh entry
    pub hits: usize,

    /// Lookups that found no fresh entry
    pub misses: usize,

    /// Network fetches actually issued
    pub fetches: usize,

    /// Fetches that failed
    pub failures: usize,

    /// Lookups that joined a fetch already in flight
    pub joined: usize,
}

impl CacheStats {
    /// Calculate hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Reset statistics
    pub fn reset(&mut self) {
        *self = CacheStats::default();
    }
}
