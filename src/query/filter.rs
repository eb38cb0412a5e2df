//! Filter tree construction
//!
//! Turns a target's flat, ordered filter list into the engine's nested
//! boolean filter tree, substituting template variables on the way.

use serde::{Deserialize, Serialize};

use crate::model::FilterSpec;
use crate::query::template::TemplateSrv;

/// Engine filter node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FilterNode {
    Selector { dimension: String, value: String },
    Regex { dimension: String, pattern: String },
    Not { field: Box<FilterNode> },
    And { fields: Vec<FilterNode> },
}

impl FilterNode {
    /// Wrap this node in a negation
    pub fn not(self) -> Self {
        FilterNode::Not {
            field: Box::new(self),
        }
    }
}

/// Copy of `filter` with template variables resolved in its value or pattern
pub fn substitute(filter: &FilterSpec, templates: &dyn TemplateSrv) -> FilterSpec {
    match filter {
        FilterSpec::Selector {
            dimension,
            value,
            negate,
        } => FilterSpec::Selector {
            dimension: dimension.clone(),
            value: templates.replace(value),
            negate: *negate,
        },
        FilterSpec::Regex {
            dimension,
            pattern,
            negate,
        } => FilterSpec::Regex {
            dimension: dimension.clone(),
            pattern: templates.replace(pattern),
            negate: *negate,
        },
    }
}

/// Translate one filter into its engine node, honoring `negate`
pub fn translate(filter: &FilterSpec) -> FilterNode {
    let leaf = match filter {
        FilterSpec::Selector {
            dimension, value, ..
        } => FilterNode::Selector {
            dimension: dimension.clone(),
            value: value.clone(),
        },
        FilterSpec::Regex {
            dimension, pattern, ..
        } => FilterNode::Regex {
            dimension: dimension.clone(),
            pattern: pattern.clone(),
        },
    };

    if filter.is_negated() {
        leaf.not()
    } else {
        leaf
    }
}

/// Build the filter tree for a target
///
/// No filters yields None (match all), a single filter is returned bare,
/// and two or more are combined under one `and` node in input order.
pub fn build_filter_tree(filters: &[FilterSpec], templates: &dyn TemplateSrv) -> Option<FilterNode> {
    let mut nodes: Vec<FilterNode> = filters
        .iter()
        .map(|filter| translate(&substitute(filter, templates)))
        .collect();

    match nodes.len() {
        0 => None,
        1 => nodes.pop(),
        _ => Some(FilterNode::And { fields: nodes }),
    }
}
