//! Resource pool engine: endpoint discovery, classification, and unified
//! search for document sources.
//!
//! The engine turns a corpus of raw observed URLs into classified site
//! entries (home pages, sitemaps, feeds, search templates), and answers
//! per-item "unified search" queries by fanning out across an item's bound
//! entries and merging normalized document candidates.
//!
//! Applications provide the collaborators through traits: storage
//! ([`traits::PoolStore`]), page fetching ([`traits::PageFetcher`]), an
//! optional chat completer for the classification fallback
//! ([`traits::ChatCompleter`]), the source-item resolver, and the document
//! ingestor.

pub mod capture;
pub mod classify;
pub mod discovery;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod search;
pub mod stores;
pub mod traits;
pub mod types;

// Re-exports for clean API
pub use capture::{CaptureGate, CaptureOutcome};
pub use classify::{Classifier, ClassifyRequest, LlmClassifier, RuleClassifier};
pub use discovery::{
    BatchDiscoveryDriver, DiscoveryProber, DiscoveryProgress, DiscoveryRequest,
};
pub use error::{FetchError, PoolError};
pub use fetch::HttpFetcher;
pub use search::{
    SearchReport, UnifiedSearch, UnifiedSearchRequest, UnifiedSearchService,
};
pub use stores::MemoryStore;
#[cfg(feature = "postgres")]
pub use stores::PostgresStore;
pub use traits::{
    ChatCompleter, DocumentIngestor, IngestStats, ItemBinding, PageFetcher, PoolStore,
    SourceItemResolver,
};
pub use types::{
    AppendOutcome, AppendStats, Capabilities, CaptureConfig, DiscoveryConfig, EntryType,
    KeywordMode, NewPoolUrl, NewSiteEntry, PoolUrl, Recommendation, Scope, SearchConfig,
    SiteEntry, UrlSource,
};
