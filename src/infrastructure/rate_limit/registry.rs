//! Limiter per endpoint class, selected by route prefix

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::rate_limit::{BucketPolicy, RateLimitClass};
use crate::domain::DomainError;
use crate::infrastructure::store::StoreClient;

use super::limiter::TokenBucketLimiter;

/// Maps a path prefix to a limiter class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteClass {
    pub prefix: String,
    pub class: RateLimitClass,
}

impl RouteClass {
    pub fn new(prefix: impl Into<String>, class: RateLimitClass) -> Self {
        Self {
            prefix: prefix.into(),
            class,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// General read traffic
    #[serde(default = "default_policy")]
    pub default: BucketPolicy,
    /// Credential and login endpoints
    #[serde(default = "auth_policy")]
    pub auth: BucketPolicy,
    #[serde(default = "search_policy")]
    pub search: BucketPolicy,
    #[serde(default = "default_routes")]
    pub routes: Vec<RouteClass>,
}

fn default_policy() -> BucketPolicy {
    BucketPolicy::new(120, 40)
}

fn auth_policy() -> BucketPolicy {
    BucketPolicy::new(10, 5)
}

fn search_policy() -> BucketPolicy {
    BucketPolicy::new(30, 10)
}

fn default_routes() -> Vec<RouteClass> {
    vec![
        RouteClass::new("/auth", RateLimitClass::Auth),
        RouteClass::new("/api/v1/auth", RateLimitClass::Auth),
        RouteClass::new("/api/v1/search", RateLimitClass::Search),
    ]
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default: default_policy(),
            auth: auth_policy(),
            search: search_policy(),
            routes: default_routes(),
        }
    }
}

impl RateLimitConfig {
    pub fn policy(&self, class: RateLimitClass) -> BucketPolicy {
        match class {
            RateLimitClass::Default => self.default,
            RateLimitClass::Auth => self.auth,
            RateLimitClass::Search => self.search,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        for class in [
            RateLimitClass::Default,
            RateLimitClass::Auth,
            RateLimitClass::Search,
        ] {
            self.policy(class).validate().map_err(|e| {
                DomainError::configuration(format!("rate_limit.{}: {}", class, e))
            })?;
        }

        if let Some(route) = self.routes.iter().find(|r| !r.prefix.starts_with('/')) {
            return Err(DomainError::configuration(format!(
                "rate_limit.routes prefix '{}' must start with '/'",
                route.prefix
            )));
        }

        Ok(())
    }
}

/// The set of limiters the admission layer chooses from
#[derive(Debug, Clone)]
pub struct RateLimiters {
    default: TokenBucketLimiter,
    auth: TokenBucketLimiter,
    search: TokenBucketLimiter,
    routes: Vec<RouteClass>,
}

impl RateLimiters {
    /// Builds one limiter per class; invalid policies are rejected
    pub fn from_config(
        store: Arc<StoreClient>,
        config: &RateLimitConfig,
    ) -> Result<Self, DomainError> {
        config.validate()?;

        let limiter =
            |class| TokenBucketLimiter::for_class(store.clone(), class, config.policy(class));

        let mut routes = config.routes.clone();
        routes.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));

        Ok(Self {
            default: limiter(RateLimitClass::Default),
            auth: limiter(RateLimitClass::Auth),
            search: limiter(RateLimitClass::Search),
            routes,
        })
    }

    pub fn get(&self, class: RateLimitClass) -> &TokenBucketLimiter {
        match class {
            RateLimitClass::Default => &self.default,
            RateLimitClass::Auth => &self.auth,
            RateLimitClass::Search => &self.search,
        }
    }

    /// Class of the longest configured prefix matching `path`
    pub fn class_for_path(&self, path: &str) -> RateLimitClass {
        self.routes
            .iter()
            .find(|route| path_has_prefix(path, &route.prefix))
            .map(|route| route.class)
            .unwrap_or_default()
    }

    pub fn for_path(&self, path: &str) -> (RateLimitClass, &TokenBucketLimiter) {
        let class = self.class_for_path(path);
        (class, self.get(class))
    }
}

/// Prefix match on whole path segments, so `/auth` does not match `/authors`
pub fn path_has_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');

    if prefix.is_empty() {
        return true;
    }

    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
