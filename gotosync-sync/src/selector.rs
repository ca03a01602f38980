//! Which product categories a run processes.

use gotosync_core::{ProductCategory, RemoteApi};

use crate::error::SyncError;

/// Resolve the ordered categories for a run.
///
/// - No request: every category in declaration order for which `api` reports
///   authorization. May be empty.
/// - Explicit request: that single category, validated against the closed
///   set. Authorization is deliberately not consulted here.
pub fn resolve(
    requested: Option<&str>,
    api: &dyn RemoteApi,
) -> Result<Vec<ProductCategory>, SyncError> {
    match requested {
        None => Ok(ProductCategory::ALL
            .into_iter()
            .filter(|category| api.is_authorized(*category))
            .collect()),
        Some(name) => name
            .parse::<ProductCategory>()
            .map(|category| vec![category])
            .map_err(|_| SyncError::InvalidProduct(name.to_owned())),
    }
}
