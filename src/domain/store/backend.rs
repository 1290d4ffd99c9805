//! Store backend trait definition

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::rate_limit::{BucketOutcome, BucketPolicy};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Operations the shared keyed store must provide.
///
/// Values are opaque strings; serialization is the caller's concern.
/// Every write carries an explicit TTL.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Short backend name used in logs
    fn name(&self) -> &'static str;

    /// Gets a raw value
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Sets a raw value with a TTL
    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError>;

    /// Deletes a key, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool, DomainError>;

    /// Deletes every key matching a glob pattern, returning the count
    async fn delete_pattern(&self, pattern: &str) -> Result<usize, DomainError>;

    /// Checks whether a live key exists
    async fn exists(&self, key: &str) -> Result<bool, DomainError>;

    /// Remaining TTL of a key, if it exists
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError>;

    /// Runs one token-bucket step for `key` as a single atomic unit
    async fn take_token(
        &self,
        key: &str,
        policy: &BucketPolicy,
        now: Duration,
    ) -> Result<BucketOutcome, DomainError>;

    /// Round-trips to the store
    async fn ping(&self) -> Result<(), DomainError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::domain::rate_limit::BucketState;
    use crate::domain::store::glob_to_regex;

    /// Mock store for testing. Entries never expire; use the in-memory
    /// backend with a manual clock for expiry tests.
    #[derive(Debug, Default)]
    pub struct MockStore {
        entries: Mutex<HashMap<String, (String, Duration)>>,
        buckets: Mutex<HashMap<String, BucketState>>,
        error: Mutex<Option<String>>,
    }

    impl MockStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_entry(self, key: &str, value: &str, ttl: Duration) -> Self {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), (value.to_string(), ttl));
            self
        }

        pub fn with_error(self, error: impl Into<String>) -> Self {
            self.fail_with(error);
            self
        }

        /// Makes every following call fail
        pub fn fail_with(&self, error: impl Into<String>) {
            *self.error.lock().unwrap() = Some(error.into());
        }

        /// Restores normal operation
        pub fn recover(&self) {
            *self.error.lock().unwrap() = None;
        }

        pub fn keys(&self) -> Vec<String> {
            let mut keys: Vec<String> = self.entries.lock().unwrap().keys().cloned().collect();
            keys.sort();
            keys
        }

        fn check_error(&self) -> Result<(), DomainError> {
            if let Some(error) = self.error.lock().unwrap().clone() {
                return Err(DomainError::store(error));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl StoreBackend for MockStore {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
            self.check_error()?;
            let entries = self.entries.lock().unwrap();

            Ok(entries.get(key).map(|(value, _)| value.clone()))
        }

        async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
            self.check_error()?;
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), (value.to_string(), ttl));
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<bool, DomainError> {
            self.check_error()?;
            Ok(self.entries.lock().unwrap().remove(key).is_some())
        }

        async fn delete_pattern(&self, pattern: &str) -> Result<usize, DomainError> {
            self.check_error()?;
            let regex = glob_to_regex(pattern)?;

            let mut entries = self.entries.lock().unwrap();
            let before = entries.len();
            entries.retain(|key, _| !regex.is_match(key));

            Ok(before - entries.len())
        }

        async fn exists(&self, key: &str) -> Result<bool, DomainError> {
            self.check_error()?;
            Ok(self.entries.lock().unwrap().contains_key(key))
        }

        async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError> {
            self.check_error()?;
            Ok(self.entries.lock().unwrap().get(key).map(|(_, ttl)| *ttl))
        }

        async fn take_token(
            &self,
            key: &str,
            policy: &BucketPolicy,
            now: Duration,
        ) -> Result<BucketOutcome, DomainError> {
            self.check_error()?;
            let mut buckets = self.buckets.lock().unwrap();

            let current = buckets.get(key).copied();
            let (outcome, next) = BucketState::take(current, policy, now.as_secs_f64());

            if let Some(next) = next {
                buckets.insert(key.to_string(), next);
            }

            Ok(outcome)
        }

        async fn ping(&self) -> Result<(), DomainError> {
            self.check_error()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_store_set_get() {
            let store = MockStore::new();
            store
                .set_raw("key1", "value1", Duration::from_secs(60))
                .await
                .unwrap();

            let result = store.get_raw("key1").await.unwrap();
            assert_eq!(result, Some("value1".to_string()));
        }

        #[tokio::test]
        async fn test_mock_store_with_error() {
            let store = MockStore::new().with_error("Test error");

            assert!(store.get_raw("key").await.is_err());

            store.recover();
            assert!(store.get_raw("key").await.unwrap().is_none());
        }

        #[tokio::test]
        async fn test_mock_store_delete_pattern() {
            let store = MockStore::new()
                .with_entry("region:1:profile", "a", Duration::from_secs(60))
                .with_entry("region:2:profile", "b", Duration::from_secs(60))
                .with_entry("other:key", "c", Duration::from_secs(60));

            let deleted = store.delete_pattern("region:*:profile").await.unwrap();
            assert_eq!(deleted, 2);
            assert_eq!(store.keys(), vec!["other:key".to_string()]);
        }
    }
}
