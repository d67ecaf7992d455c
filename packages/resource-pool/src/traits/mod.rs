//! Trait seams between the engine and its collaborators.
//!
//! The engine core stays free of transport and vendor specifics: storage,
//! page fetching, chat completion, source-item resolution, and document
//! ingestion are all injected through these traits.

pub mod completer;
pub mod fetcher;
pub mod ingestor;
pub mod resolver;
pub mod store;

pub use completer::ChatCompleter;
pub use fetcher::{FetchedPage, PageFetcher};
pub use ingestor::{DocumentIngestor, IngestStats};
pub use resolver::{ItemBinding, SourceItemResolver};
pub use store::{EntryFilter, Page, PoolStore, UrlFilter};
