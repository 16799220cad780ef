//! Field extraction
//!
//! This module turns raw DOM content into typed records:
//! - `number`: abbreviated count parsing
//! - `locator`: selectors, locators and field schemas
//! - `resolver`: ordered locator fallback under a time budget
//! - `items`: per-item extraction and incremental collection

mod items;
mod locator;
mod number;
mod resolver;

pub use items::{ExtractionRecord, FieldValue, ItemCollector, ItemExtractor};
pub use locator::{Capture, FieldKind, FieldSchema, FieldSpec, Locator, LocatorSpec, Selector};
pub use number::parse_count;
pub use resolver::SelectorResolver;

use thiserror::Error;

/// Errors raised while building a field schema
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Duplicate field name: {0}")]
    DuplicateField(String),

    #[error("Field {0} has no locators")]
    EmptyLocators(String),

    #[error("Invalid capture pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}
