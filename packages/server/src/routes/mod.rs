// HTTP routes
pub mod capture;
pub mod discovery;
pub mod health;
pub mod site_entries;
pub mod unified_search;
pub mod urls;

use resource_pool::Scope;

use crate::error::ApiError;

/// Build a scope from the wire form shared by several request bodies.
pub(crate) fn parse_scope(kind: &str, tenant: Option<&str>) -> Result<Scope, ApiError> {
    Scope::from_parts(kind, tenant).map_err(ApiError::from)
}
