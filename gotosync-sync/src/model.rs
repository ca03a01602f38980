//! The persistence seam driven by the orchestrator.

use gotosync_core::{ProductCategory, ProductChoice};

use crate::error::SyncError;
use crate::progress::ProgressSink;

/// Local model of synchronized events and their contacts.
pub trait SyncModel {
    /// Create or update the local record of one remote item.
    fn sync_product(
        &mut self,
        category: ProductCategory,
        id: &str,
        choice: &ProductChoice,
        sink: &mut dyn ProgressSink,
    ) -> Result<(), SyncError>;

    /// Delete local items of `category` whose id is not in `ids`.
    /// Returns how many were removed.
    fn delete_removed_products(
        &mut self,
        category: ProductCategory,
        ids: &[String],
    ) -> Result<usize, SyncError>;

    /// Synchronize the registrants of one item. Returns how many contacts
    /// were synchronized.
    fn sync_event(
        &mut self,
        category: ProductCategory,
        id: &str,
        event_name: &str,
        event_description: &str,
        sink: &mut dyn ProgressSink,
    ) -> Result<usize, SyncError>;
}
