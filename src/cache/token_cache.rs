use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::cache::token::AccessTokenDetails;

/// Single-slot cache holding the most recent token of one client.
///
/// The slot stores an `Arc`, so readers get either the previous or the new token,
/// never a partially written one. The lock is never held across an await.
#[derive(Debug, Default)]
pub struct TokenCache {
    inner: RwLock<Option<Arc<AccessTokenDetails>>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Arc<AccessTokenDetails>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Cached token if it stays valid for at least `min_validity` after `now`.
    pub fn get_valid_for(
        &self,
        now: DateTime<Utc>,
        min_validity: Duration,
    ) -> Option<Arc<AccessTokenDetails>> {
        self.get()
            .filter(|token| token.is_valid_for_at(now, min_validity))
    }

    pub fn set(&self, token: Arc<AccessTokenDetails>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::token::sample_details;

    #[test]
    fn empty_cache_has_nothing_valid() {
        let cache = TokenCache::new();
        assert!(cache.get().is_none());
        assert!(cache.get_valid_for(Utc::now(), Duration::ZERO).is_none());
    }

    #[test]
    fn set_replaces_previous_token() {
        let cache = TokenCache::new();
        let first = Arc::new(sample_details(1_000, 60));
        let second = Arc::new(sample_details(2_000, 60));

        cache.set(first.clone());
        assert!(Arc::ptr_eq(&cache.get().unwrap(), &first));

        cache.set(second.clone());
        assert!(Arc::ptr_eq(&cache.get().unwrap(), &second));
    }

    #[test]
    fn get_valid_for_respects_horizon() {
        let cache = TokenCache::new();
        cache.set(Arc::new(sample_details(1_000, 100)));
        let now = DateTime::from_timestamp(1_000, 0).unwrap();

        assert!(cache.get_valid_for(now, Duration::from_secs(99)).is_some());
        assert!(cache.get_valid_for(now, Duration::from_secs(100)).is_none());
    }
}
