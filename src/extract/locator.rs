//! Locators and field schemas
//!
//! A [`LocatorSpec`] is an ordered list of candidate [`Locator`]s for one
//! logical field. A [`FieldSchema`] names the fields to read from a scope and
//! how to convert the raw strings into typed values.

use super::{FieldValue, SchemaError};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Query strategy for locating an element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Selector {
    /// CSS selector
    Css(String),
    /// XPath expression
    Xpath(String),
    /// Innermost element whose text contains `contains` (case-insensitive),
    /// optionally restricted to elements matching the CSS query `within`
    Text {
        contains: String,
        #[serde(default)]
        within: Option<String>,
    },
    /// The scope element itself, for items whose field lives on the item node
    Scope,
}

impl Selector {
    pub fn css(query: &str) -> Self {
        Self::Css(query.to_string())
    }

    pub fn text(contains: &str) -> Self {
        Self::Text {
            contains: contains.to_string(),
            within: None,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(query) => write!(f, "css:{}", query),
            Self::Xpath(query) => write!(f, "xpath:{}", query),
            Self::Text {
                contains,
                within: Some(within),
            } => write!(f, "text:{}@{}", contains, within),
            Self::Text { contains, .. } => write!(f, "text:{}", contains),
            Self::Scope => write!(f, "scope"),
        }
    }
}

/// Regular expression applied to an extracted string
///
/// The first capture group is the value, or the whole match if the pattern
/// has no groups.
#[derive(Clone)]
pub struct Capture(Regex);

impl Capture {
    pub fn new(pattern: &str) -> Result<Self, SchemaError> {
        Regex::new(pattern)
            .map(Self)
            .map_err(|e| SchemaError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn apply(&self, input: &str) -> Option<String> {
        let caps = self.0.captures(input)?;
        caps.get(1)
            .or_else(|| caps.get(0))
            .map(|m| m.as_str().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Capture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Capture").field(&self.0.as_str()).finish()
    }
}

impl PartialEq for Capture {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Serialize for Capture {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Capture {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pattern = String::deserialize(deserializer)?;
        Capture::new(&pattern).map_err(serde::de::Error::custom)
    }
}

/// One candidate way of reading a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Locator {
    pub selector: Selector,
    /// Attribute to read instead of the element text
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(default)]
    pub capture: Option<Capture>,
}

impl Locator {
    /// Reads the normalized text of the first match
    pub fn text(selector: Selector) -> Self {
        Self {
            selector,
            attribute: None,
            capture: None,
        }
    }

    /// Reads an attribute of the first match
    pub fn attr(selector: Selector, attribute: &str) -> Self {
        Self {
            selector,
            attribute: Some(attribute.to_string()),
            capture: None,
        }
    }

    /// Shorthand for a CSS text locator
    pub fn css(query: &str) -> Self {
        Self::text(Selector::css(query))
    }

    /// Adds a capture pattern to this locator
    pub fn capture(mut self, pattern: &str) -> Result<Self, SchemaError> {
        self.capture = Some(Capture::new(pattern)?);
        Ok(self)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.selector)?;
        if let Some(attribute) = &self.attribute {
            write!(f, " @{}", attribute)?;
        }
        if let Some(capture) = &self.capture {
            write!(f, " ~/{}/", capture.as_str())?;
        }
        Ok(())
    }
}

/// Ordered candidate locators for a field, highest priority first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocatorSpec(pub Vec<Locator>);

impl LocatorSpec {
    pub fn new(locators: Vec<Locator>) -> Self {
        Self(locators)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Locator> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Locator>> for LocatorSpec {
    fn from(locators: Vec<Locator>) -> Self {
        Self(locators)
    }
}

/// Converts a resolved string into a typed value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Trimmed text
    Text,
    /// Abbreviated count, see [`crate::parse_count`]
    Count,
    /// True when any candidate resolves
    Flag,
}

impl FieldKind {
    /// Value recorded when the field could not be resolved
    pub fn default_value(self) -> FieldValue {
        match self {
            Self::Text => FieldValue::Text(String::new()),
            Self::Count => FieldValue::Count(0),
            Self::Flag => FieldValue::Flag(false),
        }
    }
}

fn default_required() -> bool {
    true
}

/// A named field and how to read it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub locators: LocatorSpec,
    pub kind: FieldKind,
    /// A missing required field marks the record partial
    #[serde(default = "default_required")]
    pub required: bool,
}

impl FieldSpec {
    pub fn new(name: &str, kind: FieldKind, locators: Vec<Locator>) -> Self {
        Self {
            name: name.to_string(),
            locators: LocatorSpec(locators),
            kind,
            required: true,
        }
    }

    pub fn text(name: &str, locators: Vec<Locator>) -> Self {
        Self::new(name, FieldKind::Text, locators)
    }

    pub fn count(name: &str, locators: Vec<Locator>) -> Self {
        Self::new(name, FieldKind::Count, locators)
    }

    pub fn flag(name: &str, locators: Vec<Locator>) -> Self {
        Self::new(name, FieldKind::Flag, locators).optional()
    }

    /// Marks the field as optional
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Ordered set of uniquely named fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FieldSpec>", into = "Vec<FieldSpec>")]
pub struct FieldSchema {
    fields: Vec<FieldSpec>,
}

impl FieldSchema {
    /// Builds a schema, rejecting duplicate names and fields without locators
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self, SchemaError> {
        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|other| other.name == field.name) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
            if field.locators.is_empty() {
                return Err(SchemaError::EmptyLocators(field.name.clone()));
            }
        }
        Ok(Self { fields })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldSpec> {
        self.fields.iter()
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl TryFrom<Vec<FieldSpec>> for FieldSchema {
    type Error = SchemaError;

    fn try_from(fields: Vec<FieldSpec>) -> Result<Self, Self::Error> {
        Self::new(fields)
    }
}

impl From<FieldSchema> for Vec<FieldSpec> {
    fn from(schema: FieldSchema) -> Self {
        schema.fields
    }
}
