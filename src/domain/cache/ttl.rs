//! TTL tiers and the data category table

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Catalog of cache lifetimes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtlTier {
    /// 5 minutes
    Short,
    /// 30 minutes
    Medium,
    /// 1 hour
    Long,
    /// 6 hours
    VeryLong,
    /// 24 hours
    Day,
}

impl TtlTier {
    pub fn as_secs(&self) -> u64 {
        match self {
            Self::Short => 300,
            Self::Medium => 1800,
            Self::Long => 3600,
            Self::VeryLong => 21_600,
            Self::Day => 86_400,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.as_secs())
    }

    /// `Cache-Control` value advertising this tier to intermediaries
    pub fn cache_control(&self) -> String {
        format!("public, max-age={}", self.as_secs())
    }
}

/// Maps data categories to TTL tiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtlPolicy {
    /// Tier for categories missing from the table
    #[serde(default = "default_tier")]
    pub default_tier: TtlTier,
    /// Category name to tier
    #[serde(default = "default_categories")]
    pub categories: HashMap<String, TtlTier>,
}

fn default_tier() -> TtlTier {
    TtlTier::Medium
}

fn default_categories() -> HashMap<String, TtlTier> {
    [
        ("statistics", TtlTier::Short),
        ("aggregates", TtlTier::Short),
        ("search", TtlTier::Medium),
        ("entity", TtlTier::Medium),
        ("reference", TtlTier::Long),
        ("countries", TtlTier::VeryLong),
        ("geography", TtlTier::Day),
    ]
    .into_iter()
    .map(|(name, tier)| (name.to_string(), tier))
    .collect()
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            default_tier: default_tier(),
            categories: default_categories(),
        }
    }
}

impl TtlPolicy {
    pub fn tier_for(&self, category: &str) -> TtlTier {
        self.categories
            .get(category)
            .copied()
            .unwrap_or(self.default_tier)
    }

    pub fn ttl_for(&self, category: &str) -> Duration {
        self.tier_for(category).duration()
    }

    /// Overrides or adds one category
    pub fn with_category(mut self, category: impl Into<String>, tier: TtlTier) -> Self {
        self.categories.insert(category.into(), tier);
        self
    }
}
