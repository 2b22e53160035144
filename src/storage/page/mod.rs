//! Page types and layout.
//!
//! This module contains:
//! - [`Page`] - The raw fixed-size data container and its cell accessors
//! - [`PageHeader`] - Metadata at the start of every page
//! - [`PageType`] - Discriminator for internal / leaf / orphaned pages
//! - [`Row`] - The leaf record format

#[allow(clippy::module_inception)]
mod page;
mod page_header;
mod row;

pub use page::{InternalCell, Page};
pub use page_header::{PageHeader, PageType};
pub use row::Row;
