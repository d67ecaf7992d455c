//! Core types for the resource pool engine.

pub mod config;
pub mod entry;
pub mod pool;
pub mod recommendation;
pub mod scope;

pub use config::{CaptureConfig, DiscoveryConfig, SearchConfig};
pub use entry::{Capabilities, EntryType, KeywordMode, NewSiteEntry, SiteEntry};
pub use pool::{AppendOutcome, AppendStats, NewPoolUrl, PoolUrl, UrlSource};
pub use recommendation::{ChannelKey, Recommendation, RecommendationSource};
pub use scope::Scope;
