//! Tariff line lookup against the paged KITA HS code search.
//!
//! [`LeafClient`] walks result pages through a [`PageSource`], parses each
//! page with [`parse_page`], and stops once a page adds nothing new.

mod error;
pub use error::SyncError;

pub mod client;
#[cfg(feature = "http")]
pub mod http;
pub mod parse;

pub use client::{DEFAULT_MAX_PAGES, LeafClient, PageSource};
#[cfg(feature = "http")]
pub use http::{DEFAULT_BASE_URL, FetchConfig, HttpPageSource};
pub use parse::parse_page;
