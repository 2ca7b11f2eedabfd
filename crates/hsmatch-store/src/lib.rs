//! Reference data for the lower HS levels: headings per chapter, tariff lines
//! per heading (fetched on miss and persisted), and the ISIC → HS mapping.

mod error;
pub use error::StoreError;

pub mod isic;
pub mod tables;
pub mod taxonomy;

pub use isic::IsicTable;
pub use tables::{Heading, ReferenceTables};
pub use taxonomy::{LeafSource, TaxonomyStore};
