//! Resource Categories
//!
//! Classifies request targets into resource categories and maps each
//! category to a cache TTL.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// == Resource Category ==
/// Kind of resource a request targets, used to pick its TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceCategory {
    Categories,
    Stats,
    Search,
    Assets,
    User,
    Default,
}

impl ResourceCategory {
    /// Classifies a request target by case-sensitive substring match.
    ///
    /// Rules are checked in order: `/categories`, `/stats`, `/search`,
    /// `/assets`; anything else is `Default`.
    pub fn classify(target: &str) -> Self {
        if target.contains("/categories") {
            ResourceCategory::Categories
        } else if target.contains("/stats") {
            ResourceCategory::Stats
        } else if target.contains("/search") {
            ResourceCategory::Search
        } else if target.contains("/assets") {
            ResourceCategory::Assets
        } else {
            ResourceCategory::Default
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceCategory::Categories => "categories",
            ResourceCategory::Stats => "stats",
            ResourceCategory::Search => "search",
            ResourceCategory::Assets => "assets",
            ResourceCategory::User => "user",
            ResourceCategory::Default => "default",
        }
    }
}

// == TTL Policy ==
/// Category to TTL table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub categories: Duration,
    pub stats: Duration,
    pub search: Duration,
    pub assets: Duration,
    pub user: Duration,
    pub default: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            categories: Duration::from_secs(30 * 60),
            stats: Duration::from_secs(5 * 60),
            search: Duration::from_secs(2 * 60),
            assets: Duration::from_secs(3 * 60),
            user: Duration::from_secs(10 * 60),
            default: Duration::from_secs(5 * 60),
        }
    }
}

impl TtlPolicy {
    /// TTL for a category.
    pub fn ttl(&self, category: ResourceCategory) -> Duration {
        match category {
            ResourceCategory::Categories => self.categories,
            ResourceCategory::Stats => self.stats,
            ResourceCategory::Search => self.search,
            ResourceCategory::Assets => self.assets,
            ResourceCategory::User => self.user,
            ResourceCategory::Default => self.default,
        }
    }

    /// TTL for a target, honouring an explicit category override.
    pub fn ttl_for(&self, target: &str, category: Option<ResourceCategory>) -> Duration {
        self.ttl(category.unwrap_or_else(|| ResourceCategory::classify(target)))
    }
}
