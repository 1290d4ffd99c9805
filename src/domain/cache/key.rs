//! Cache key construction

use std::collections::BTreeMap;
use std::fmt::Display;

use sha2::{Digest, Sha256};

/// Separator between key components
pub const KEY_DELIMITER: char = ':';

/// Default length above which keys are collapsed to a digest
pub const DEFAULT_MAX_KEY_LENGTH: usize = 200;

/// Hex characters of the SHA-256 digest kept in collapsed keys
pub const DIGEST_PREFIX_LEN: usize = 32;

/// Arguments a cache key is derived from.
///
/// Positional values keep call order; named values are kept sorted by name
/// so the same logical arguments always produce the same key. Absent values
/// are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheKeyParams {
    positional: Vec<String>,
    named: BTreeMap<String, String>,
}

impl CacheKeyParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional value
    pub fn arg(mut self, value: impl Display) -> Self {
        self.positional.push(value.to_string());
        self
    }

    /// Appends a positional value when present
    pub fn opt_arg<V: Display>(self, value: Option<V>) -> Self {
        match value {
            Some(value) => self.arg(value),
            None => self,
        }
    }

    /// Sets a named value
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Display) -> Self {
        self.named.insert(name.into(), value.to_string());
        self
    }

    /// Sets a named value when present
    pub fn opt_kwarg<V: Display>(self, name: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.kwarg(name, value),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}

/// Deterministic, human-debuggable key builder
#[derive(Debug, Clone, Copy)]
pub struct KeyBuilder {
    max_length: usize,
}

impl Default for KeyBuilder {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_KEY_LENGTH,
        }
    }
}

impl KeyBuilder {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Builds `namespace:pos1:pos2:name=value...`, collapsing keys longer
    /// than the threshold to `namespace:hash:<digest>`
    pub fn build(&self, namespace: &str, params: &CacheKeyParams) -> String {
        let mut key = String::from(namespace);

        for value in &params.positional {
            key.push(KEY_DELIMITER);
            key.push_str(value);
        }

        for (name, value) in &params.named {
            key.push(KEY_DELIMITER);
            key.push_str(name);
            key.push('=');
            key.push_str(value);
        }

        if key.len() > self.max_length {
            return format!(
                "{namespace}{d}hash{d}{}",
                Self::digest(&key),
                d = KEY_DELIMITER
            );
        }

        key
    }

    fn digest(input: &str) -> String {
        let hash = Sha256::digest(input.as_bytes());
        let mut hex = hex::encode(hash);
        hex.truncate(DIGEST_PREFIX_LEN);
        hex
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_positional_and_named() {
        let builder = KeyBuilder::default();
        let params = CacheKeyParams::new()
            .arg("FR")
            .arg(2024)
            .kwarg("page", 2)
            .kwarg("limit", 50);

        let key = builder.build("stats", &params);
        assert_eq!(key, "stats:FR:2024:limit=50:page=2");
    }

    #[test]
    fn test_named_order_does_not_matter() {
        let builder = KeyBuilder::default();

        let a = CacheKeyParams::new()
            .kwarg("zebra", "z")
            .kwarg("apple", "a")
            .kwarg("mango", "m");
        let b = CacheKeyParams::new()
            .kwarg("mango", "m")
            .kwarg("zebra", "z")
            .kwarg("apple", "a");

        assert_eq!(builder.build("ns", &a), builder.build("ns", &b));
        assert_eq!(builder.build("ns", &a), "ns:apple=a:mango=m:zebra=z");
    }

    #[test]
    fn test_absent_values_are_dropped() {
        let builder = KeyBuilder::default();
        let params = CacheKeyParams::new()
            .arg("x")
            .opt_arg(None::<u32>)
            .opt_kwarg("filter", None::<&str>)
            .opt_kwarg("sort", Some("name"));

        assert_eq!(builder.build("list", &params), "list:x:sort=name");
    }

    #[test]
    fn test_empty_params_yield_namespace() {
        let builder = KeyBuilder::default();
        let params = CacheKeyParams::new();

        let key = builder.build("countries", &params);
        assert_eq!(key, "countries");
        assert_eq!(key, builder.build("countries", &CacheKeyParams::new()));
        assert!(params.is_empty());
    }

    #[test]
    fn test_long_key_is_collapsed() {
        let builder = KeyBuilder::new(64);
        let params = CacheKeyParams::new().arg("x".repeat(10_000));

        let key = builder.build("search", &params);
        assert!(key.starts_with("search:hash:"));
        assert_eq!(key.len(), "search:hash:".len() + DIGEST_PREFIX_LEN);
    }

    #[test]
    fn test_key_at_threshold_is_kept() {
        let builder = KeyBuilder::new(10);
        let params = CacheKeyParams::new().arg("abcde");

        assert_eq!(builder.build("ns12", &params), "ns12:abcde");
    }

    #[test]
    fn test_collapsed_keys_do_not_collide() {
        let builder = KeyBuilder::new(64);
        let filler = "q".repeat(100);

        let keys: HashSet<String> = (0..10_000)
            .map(|i| {
                let params = CacheKeyParams::new().arg(&filler).kwarg("i", i);
                builder.build("search", &params)
            })
            .collect();

        assert_eq!(keys.len(), 10_000);
    }
}
