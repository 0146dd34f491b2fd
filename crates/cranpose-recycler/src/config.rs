use crate::cache::DEFAULT_CACHE_SIZE;

/// Tuning knobs of a [`RecyclerHost`](crate::RecyclerHost).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecyclerConfig {
    /// Bound of the working-set cache.
    pub cache_size: usize,

    /// Whether passes may run a predictive pre-layout when the arrangement
    /// policy supports one.
    pub predictive_animations: bool,
}

impl Default for RecyclerConfig {
    fn default() -> Self {
        Self {
            cache_size: DEFAULT_CACHE_SIZE,
            predictive_animations: true,
        }
    }
}

impl RecyclerConfig {
    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }

    /// Disables the predictive pre-layout; passes fall back to simple animations.
    pub fn without_predictive_animations(mut self) -> Self {
        self.predictive_animations = false;
        self
    }
}
