//! Applying classification results to DOM-like elements.
//!
//! Classification stays in [`crate::classify`]; this module only rewrites
//! presentation attributes. Every operation is idempotent: the class list is
//! first stripped of the style classes the taxonomy assigns, so re-applying
//! the same value never accumulates classes. Caller classes that only share
//! the prefix, such as a `status-cell` selector, are kept.

use std::collections::BTreeMap;

use tracing::debug;

use crate::classify::{CategoryDescriptor, RawValue, Taxonomy, classify};
use crate::heatmap::HeatmapBucket;

/// Attribute naming the taxonomy to classify with.
pub const COLOR_TYPE_ATTR: &str = "data-color-type";
/// Attribute holding the raw value to classify.
pub const COLOR_VALUE_ATTR: &str = "data-color-value";
/// Attribute receiving the classified label.
pub const COLOR_LABEL_ATTR: &str = "data-color-label";

/// A minimal stand-in for a rendered DOM node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub classes: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
}

impl Element {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// New class list: `previous` minus the taxonomy's classes, plus the descriptor's.
pub fn compute_classes(
    previous: &[String],
    taxonomy: Taxonomy,
    descriptor: &CategoryDescriptor,
) -> Vec<String> {
    let mut classes: Vec<String> = Vec::with_capacity(previous.len() + 1);
    for class in previous {
        if taxonomy.is_style_class(class) || classes.contains(class) {
            continue;
        }
        classes.push(class.clone());
    }
    classes.push(descriptor.style_class.to_string());
    classes
}

/// Write a descriptor onto an element.
pub fn apply_descriptor(
    element: &mut Element,
    taxonomy: Taxonomy,
    value: RawValue<'_>,
    descriptor: &CategoryDescriptor,
) {
    element.classes = compute_classes(&element.classes, taxonomy, descriptor);
    let attrs = &mut element.attributes;
    attrs.insert(COLOR_TYPE_ATTR.into(), taxonomy.as_str().into());
    attrs.insert(COLOR_VALUE_ATTR.into(), value.to_string());
    attrs.insert(COLOR_LABEL_ATTR.into(), descriptor.label.into());
    attrs.insert(
        "style".into(),
        format!("background-color: {}", descriptor.color),
    );
}

/// Classify and style one element.
pub fn classify_element<'a>(
    element: &mut Element,
    taxonomy: Taxonomy,
    value: impl Into<RawValue<'a>>,
) -> CategoryDescriptor {
    let value = value.into();
    let descriptor = classify(taxonomy, value);
    apply_descriptor(element, taxonomy, value, &descriptor);
    descriptor
}

/// Classify every element tagged with `data-color-type` / `data-color-value`.
///
/// Elements without both hooks, or naming an unknown taxonomy, are skipped.
/// Returns how many were styled.
pub fn auto_classify(elements: &mut [Element]) -> usize {
    let mut styled = 0;
    for element in elements.iter_mut() {
        let (Some(kind), Some(value)) = (element.attr(COLOR_TYPE_ATTR), element.attr(COLOR_VALUE_ATTR))
        else {
            continue;
        };
        let Ok(taxonomy) = kind.parse::<Taxonomy>() else {
            debug!(kind, "unknown taxonomy on color hook, skipped");
            continue;
        };
        let value = value.to_string();
        classify_element(element, taxonomy, &value);
        styled += 1;
    }
    styled
}

/// Re-classify every element carrying `selector` as a class.
///
/// `extractor` pulls the raw value out of each element; `None` skips it.
/// Returns how many were styled.
pub fn update_dynamic_colors<F>(
    elements: &mut [Element],
    selector: &str,
    taxonomy: Taxonomy,
    extractor: F,
) -> usize
where
    F: Fn(&Element) -> Option<String>,
{
    let mut styled = 0;
    for element in elements.iter_mut().filter(|e| e.has_class(selector)) {
        let Some(value) = extractor(element) else {
            continue;
        };
        classify_element(element, taxonomy, &value);
        styled += 1;
    }
    if styled == 0 {
        debug!(selector, %taxonomy, "no elements matched for color update");
    }
    styled
}

/// Styled heat-map cell for a bucket.
pub fn heatmap_cell(bucket: &HeatmapBucket) -> Element {
    let mut cell = Element::new()
        .with_class("heatmap-cell")
        .with_attr("data-probability", bucket.probability.to_string())
        .with_attr("data-impact", bucket.impact.to_string())
        .with_attr("data-count", bucket.count().to_string())
        .with_attr("data-severity", bucket.severity.to_string())
        .with_text(bucket.count().to_string());
    if bucket.count() > 0 {
        cell.classes.push("has-risks".into());
    }
    classify_element(&mut cell, Taxonomy::Risk, i64::from(bucket.score()));
    cell
}
