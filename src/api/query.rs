use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key carrying the search type discriminator inside `jsonQuery`
pub const SEARCH_TYPE_KEY: &str = "_type";

/// A single scalar filter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

/// Inclusive numeric range, either side optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeBounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<serde_json::Number>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<serde_json::Number>,
}

/// Filter shapes the crawler understands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum KnownFilter {
    /// `{"type": "term", "value": 2}`
    Term(Scalar),
    /// `{"type": "terms", "value": [1, 2]}`
    Terms(Vec<Scalar>),
    /// `{"type": "range", "value": {"gte": 1, "lte": 5}}`
    Range(RangeBounds),
}

/// Any other `{type, value}` pair, kept verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFilter {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: serde_json::Value,
}

/// One entry of the filter map
///
/// Known shapes are parsed into typed values; anything else falls through to
/// [`RawFilter`] so new filter types reach the API unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterTerm {
    Known(KnownFilter),
    Raw(RawFilter),
}

/// The `jsonQuery` object: caller filters plus the search type discriminator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonQuery {
    #[serde(rename = "_type")]
    pub search_type: String,

    #[serde(flatten)]
    pub filters: BTreeMap<String, FilterTerm>,
}

impl JsonQuery {
    pub fn new(search_type: impl Into<String>, filters: BTreeMap<String, FilterTerm>) -> Self {
        Self {
            search_type: search_type.into(),
            filters,
        }
    }
}
