//! Repeated item extraction
//!
//! [`ItemExtractor`] applies a [`FieldSchema`] to every item of a list (posts,
//! videos, comments) and produces one [`ExtractionRecord`] per item. A failure
//! on one item never affects its neighbours: the item is recorded as partial
//! with default values.

use super::{parse_count, FieldKind, FieldSchema, Selector, SelectorResolver};
use crate::browser::{Browser, Scope};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// A typed field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Count(u64),
    Flag(bool),
    Text(String),
}

impl FieldValue {
    pub fn as_count(&self) -> Option<u64> {
        match self {
            Self::Count(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(value) => Some(*value),
            _ => None,
        }
    }
}

/// Values extracted from one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    /// 1-based discovery order
    pub index: usize,
    /// True if the item failed or a required field was missing
    pub partial: bool,
    pub fields: BTreeMap<String, FieldValue>,
}

impl ExtractionRecord {
    /// Record holding the default value of every field
    pub fn defaults(index: usize, schema: &FieldSchema) -> Self {
        Self {
            index,
            partial: true,
            fields: schema
                .iter()
                .map(|field| (field.name.clone(), field.kind.default_value()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Count value of a field, 0 if absent or not a count
    pub fn count(&self, name: &str) -> u64 {
        self.get(name).and_then(FieldValue::as_count).unwrap_or(0)
    }

    /// Text value of a field, empty if absent or not text
    pub fn text(&self, name: &str) -> &str {
        self.get(name).and_then(FieldValue::as_text).unwrap_or("")
    }

    /// Flag value of a field, false if absent or not a flag
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).and_then(FieldValue::as_flag).unwrap_or(false)
    }
}

/// Extracts records from a page with a resolver and a per-field budget
#[derive(Debug, Clone)]
pub struct ItemExtractor {
    resolver: SelectorResolver,
    field_budget: Duration,
    reveal_items: bool,
    target: String,
}

impl ItemExtractor {
    pub fn new(resolver: SelectorResolver, field_budget: Duration) -> Self {
        Self {
            resolver,
            field_budget,
            reveal_items: false,
            target: String::new(),
        }
    }

    /// Scroll each item into view before reading it
    pub fn with_reveal(mut self, reveal_items: bool) -> Self {
        self.reveal_items = reveal_items;
        self
    }

    /// Label used in log events
    pub fn with_target(mut self, target: &str) -> Self {
        self.target = target.to_string();
        self
    }

    pub fn resolver(&self) -> &SelectorResolver {
        &self.resolver
    }

    /// Extracts up to `max_items` items (0 means all) found under `scope`
    ///
    /// `item_selectors` is a fallback list: the first selector matching at
    /// least one node defines the items.
    pub async fn extract_all<B: Browser>(
        &self,
        page: &mut B,
        scope: &Scope<B::Node>,
        item_selectors: &[Selector],
        schema: &FieldSchema,
        max_items: usize,
    ) -> Vec<ExtractionRecord> {
        let mut collector = ItemCollector::new();
        collector
            .collect(self, page, scope, item_selectors, schema, max_items)
            .await;
        collector.into_records()
    }

    /// Extracts a single record from `scope`, e.g. a profile header
    pub async fn extract_one<B: Browser>(
        &self,
        page: &B,
        scope: &Scope<B::Node>,
        schema: &FieldSchema,
    ) -> ExtractionRecord {
        self.read_fields(page, scope, schema, 1).await
    }

    /// Finds item nodes using the first selector that matches anything
    pub async fn find_items<B: Browser>(
        &self,
        page: &B,
        scope: &Scope<B::Node>,
        item_selectors: &[Selector],
    ) -> Vec<B::Node> {
        for selector in item_selectors {
            match page.query_all(scope, selector).await {
                Ok(nodes) if !nodes.is_empty() => {
                    debug!(target = %self.target, selector = %selector, count = nodes.len(), "Found items");
                    return nodes;
                }
                Ok(_) => debug!(target = %self.target, selector = %selector, "No items for selector"),
                Err(e) => debug!(target = %self.target, selector = %selector, error = %e, "Item query failed"),
            }
        }
        Vec::new()
    }

    async fn extract_item<B: Browser>(
        &self,
        page: &mut B,
        node: &B::Node,
        schema: &FieldSchema,
        index: usize,
    ) -> ExtractionRecord {
        if self.reveal_items {
            if let Err(e) = page.scroll_into_view(node).await {
                warn!(target = %self.target, index, error = %e, "Item could not be revealed");
                return ExtractionRecord::defaults(index, schema);
            }
        }

        // A node that cannot be read at all has failed as a whole
        if let Err(e) = page.text(node).await {
            warn!(target = %self.target, index, error = %e, "Item extraction failed");
            return ExtractionRecord::defaults(index, schema);
        }

        let scope = Scope::Element(node.clone());
        self.read_fields(page, &scope, schema, index).await
    }

    async fn read_fields<B: Browser>(
        &self,
        page: &B,
        scope: &Scope<B::Node>,
        schema: &FieldSchema,
        index: usize,
    ) -> ExtractionRecord {
        let mut fields = BTreeMap::new();
        let mut partial = false;

        for field in schema.iter() {
            let resolved = self
                .resolver
                .resolve(page, scope, &field.locators, self.field_budget)
                .await;

            let value = match (field.kind, resolved) {
                (FieldKind::Flag, resolved) => FieldValue::Flag(resolved.is_some()),
                (FieldKind::Text, Some(raw)) => FieldValue::Text(raw),
                (FieldKind::Count, Some(raw)) => FieldValue::Count(parse_count(&raw)),
                (kind, None) => {
                    if field.required {
                        partial = true;
                        warn!(target = %self.target, index, field = %field.name, "Required field missing");
                    }
                    kind.default_value()
                }
            };
            fields.insert(field.name.clone(), value);
        }

        ExtractionRecord {
            index,
            partial,
            fields,
        }
    }
}

/// Accumulates records across the passes of one pagination session
///
/// Items are identified by their position in the list. Positions already
/// extracted keep their record and index; only new positions are read.
#[derive(Debug, Default)]
pub struct ItemCollector {
    records: Vec<ExtractionRecord>,
}

impl ItemCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extracts items not seen in earlier passes
    ///
    /// # Returns
    ///
    /// The number of records added by this pass
    pub async fn collect<B: Browser>(
        &mut self,
        extractor: &ItemExtractor,
        page: &mut B,
        scope: &Scope<B::Node>,
        item_selectors: &[Selector],
        schema: &FieldSchema,
        max_items: usize,
    ) -> usize {
        if self.is_full(max_items) {
            return 0;
        }

        let nodes = extractor.find_items(page, scope, item_selectors).await;
        let seen = self.records.len();
        let room = if max_items == 0 {
            usize::MAX
        } else {
            max_items - seen
        };

        let mut added = 0;
        for node in nodes.iter().skip(seen).take(room) {
            let index = self.records.len() + 1;
            let record = extractor.extract_item(page, node, schema, index).await;
            self.records.push(record);
            added += 1;
        }
        added
    }

    /// True once `max_items` records are held (never for 0)
    pub fn is_full(&self, max_items: usize) -> bool {
        max_items != 0 && self.records.len() >= max_items
    }

    pub fn records(&self) -> &[ExtractionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<ExtractionRecord> {
        self.records
    }
}
