//! Source-item resolver seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::EntryType;

/// An item's bound site entries, as resolved by the source library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemBinding {
    /// Ordered, de-duplicated list of normalized site-entry URLs.
    pub site_entries: Vec<String>,
    /// Fact constraint: every bound entry's type must equal this value.
    pub expected_entry_type: Option<EntryType>,
}

/// Resolves `(item_key, tenant)` to the item's binding.
///
/// The source-library configuration itself (channel/item definitions,
/// project-over-shared override merge) is an external collaborator; the
/// engine only reads the resolved binding.
#[async_trait]
pub trait SourceItemResolver: Send + Sync {
    async fn resolve(&self, item_key: &str, tenant: Option<&str>) -> Result<Option<ItemBinding>>;
}
