//! The remote-API seam.
//!
//! The sync engine never talks HTTP itself; it asks a [`RemoteApi`] whether
//! a category is usable and what the category's catalog and registrants are.
//! `gotosync-client` provides the HTTP implementation, tests provide fakes.

use crate::error::CoreError;
use crate::types::{Contact, ProductCategory, ProductChoices};

pub trait RemoteApi {
    /// Whether the configured credentials may be used for `category`.
    fn is_authorized(&self, category: ProductCategory) -> bool;

    /// Full catalog of schedulable items for `category`, in remote order.
    fn fetch_choices(&self, category: ProductCategory) -> Result<ProductChoices, CoreError>;

    /// Registrants / attendees of a single remote item.
    fn fetch_registrants(
        &self,
        category: ProductCategory,
        id: &str,
    ) -> Result<Vec<Contact>, CoreError>;
}

impl<T: RemoteApi + ?Sized> RemoteApi for &T {
    fn is_authorized(&self, category: ProductCategory) -> bool {
        (**self).is_authorized(category)
    }

    fn fetch_choices(&self, category: ProductCategory) -> Result<ProductChoices, CoreError> {
        (**self).fetch_choices(category)
    }

    fn fetch_registrants(
        &self,
        category: ProductCategory,
        id: &str,
    ) -> Result<Vec<Contact>, CoreError> {
        (**self).fetch_registrants(category, id)
    }
}
