//! Deterministic classification of dashboard values into styled categories.
//!
//! A [`Taxonomy`] maps normalised keys to a [`CategoryDescriptor`]. Every
//! taxonomy carries a default descriptor, so [`classify`] is total: an
//! unknown key degrades to the most neutral category of that taxonomy.
//!
//! # Risk scores
//!
//! Risk keys are likelihood × impact products in 1..=25:
//!
//! | score | band |
//! |---|---|
//! | 1–4 | Low |
//! | 5–9 | Medium |
//! | 10–14 | High |
//! | 15–19 | Very High |
//! | 20–25 | Critical |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

/// A named set of classification rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Taxonomy {
    Risk,
    Status,
    Department,
    Priority,
    Compliance,
}

#[derive(Debug, Error)]
#[error("unknown taxonomy: {0}")]
pub struct UnknownTaxonomy(pub String);

impl Taxonomy {
    pub const ALL: [Taxonomy; 5] = [
        Taxonomy::Risk,
        Taxonomy::Status,
        Taxonomy::Department,
        Taxonomy::Priority,
        Taxonomy::Compliance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Risk => "risk",
            Self::Status => "status",
            Self::Department => "department",
            Self::Priority => "priority",
            Self::Compliance => "compliance",
        }
    }

    /// Prefix shared by every style class of this taxonomy.
    pub fn class_prefix(&self) -> &'static str {
        match self {
            Self::Risk => "risk-",
            Self::Status => "status-",
            Self::Department => "department-",
            Self::Priority => "priority-",
            Self::Compliance => "compliance-",
        }
    }

    /// Descriptor returned for keys the taxonomy does not know.
    pub fn default_descriptor(&self) -> CategoryDescriptor {
        match self {
            Self::Risk => RISK_LOW,
            Self::Status => STATUS_DRAFT,
            Self::Department => DEPARTMENT_GENERAL,
            Self::Priority => PRIORITY_MEDIUM,
            Self::Compliance => COMPLIANCE_PENDING,
        }
    }

    /// Whether `class` is one this taxonomy can assign.
    ///
    /// Other classes that merely share the prefix (`status-cell`) are not.
    pub fn is_style_class(&self, class: &str) -> bool {
        self.default_descriptor().style_class == class
            || self.table().iter().any(|(_, d)| d.style_class == class)
    }

    fn table(&self) -> &'static [(&'static str, CategoryDescriptor)] {
        match self {
            Self::Risk => RISK_NAMES,
            Self::Status => STATUS_TABLE,
            Self::Department => DEPARTMENT_TABLE,
            Self::Priority => PRIORITY_TABLE,
            Self::Compliance => COMPLIANCE_TABLE,
        }
    }
}

impl fmt::Display for Taxonomy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Taxonomy {
    type Err = UnknownTaxonomy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize_key(s);
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == key)
            .ok_or_else(|| UnknownTaxonomy(s.to_string()))
    }
}

/// Presentation of one classified value: CSS class, swatch color, and label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CategoryDescriptor {
    pub style_class: &'static str,
    /// `#RRGGBB`
    pub color: &'static str,
    pub label: &'static str,
}

const fn desc(
    style_class: &'static str,
    color: &'static str,
    label: &'static str,
) -> CategoryDescriptor {
    CategoryDescriptor {
        style_class,
        color,
        label,
    }
}

// ── Risk ──

pub const RISK_LOW: CategoryDescriptor = desc("risk-low", "#28a745", "Low");
pub const RISK_MEDIUM: CategoryDescriptor = desc("risk-medium", "#ffc107", "Medium");
pub const RISK_HIGH: CategoryDescriptor = desc("risk-high", "#fd7e14", "High");
pub const RISK_VERY_HIGH: CategoryDescriptor = desc("risk-very-high", "#dc3545", "Very High");
pub const RISK_CRITICAL: CategoryDescriptor = desc("risk-critical", "#8b0000", "Critical");

/// Risk bands in ascending severity.
pub const RISK_BANDS: [CategoryDescriptor; 5] =
    [RISK_LOW, RISK_MEDIUM, RISK_HIGH, RISK_VERY_HIGH, RISK_CRITICAL];

const RISK_NAMES: &[(&str, CategoryDescriptor)] = &[
    ("low", RISK_LOW),
    ("medium", RISK_MEDIUM),
    ("high", RISK_HIGH),
    ("very_high", RISK_VERY_HIGH),
    ("critical", RISK_CRITICAL),
];

// ── Status ──

const STATUS_DRAFT: CategoryDescriptor = desc("status-draft", "#6c757d", "Draft");

const STATUS_TABLE: &[(&str, CategoryDescriptor)] = &[
    ("draft", STATUS_DRAFT),
    ("active", desc("status-active", "#0d6efd", "Active")),
    ("open", desc("status-open", "#17a2b8", "Open")),
    ("in_progress", desc("status-in-progress", "#0dcaf0", "In Progress")),
    ("submitted", desc("status-submitted", "#6610f2", "Submitted")),
    ("under_review", desc("status-under-review", "#ffc107", "Under Review")),
    ("pending", desc("status-pending", "#fd7e14", "Pending")),
    ("approved", desc("status-approved", "#198754", "Approved")),
    ("completed", desc("status-completed", "#28a745", "Completed")),
    ("mitigated", desc("status-mitigated", "#20c997", "Mitigated")),
    ("closed", desc("status-closed", "#343a40", "Closed")),
    ("rejected", desc("status-rejected", "#dc3545", "Rejected")),
    ("archived", desc("status-archived", "#adb5bd", "Archived")),
    ("overdue", desc("status-overdue", "#b02a37", "Overdue")),
];

// ── Department ──

const DEPARTMENT_GENERAL: CategoryDescriptor =
    desc("department-general", "#6c757d", "General");
const DEPARTMENT_IT: CategoryDescriptor = desc(
    "department-information-technology",
    "#6610f2",
    "Information Technology",
);

const DEPARTMENT_TABLE: &[(&str, CategoryDescriptor)] = &[
    ("general", DEPARTMENT_GENERAL),
    (
        "risk_management",
        desc("department-risk-management", "#0d6efd", "Risk Management"),
    ),
    ("finance", desc("department-finance", "#198754", "Finance")),
    ("information_technology", DEPARTMENT_IT),
    ("it", DEPARTMENT_IT),
    ("operations", desc("department-operations", "#fd7e14", "Operations")),
    (
        "internal_audit",
        desc("department-internal-audit", "#d63384", "Internal Audit"),
    ),
    ("investments", desc("department-investments", "#20c997", "Investments")),
    ("compliance", desc("department-compliance", "#0dcaf0", "Compliance")),
    (
        "human_resources",
        desc("department-human-resources", "#6f42c1", "Human Resources"),
    ),
    ("legal", desc("department-legal", "#343a40", "Legal")),
    ("executive", desc("department-executive", "#212529", "Executive")),
    (
        "benefits_administration",
        desc(
            "department-benefits-administration",
            "#ffc107",
            "Benefits Administration",
        ),
    ),
    (
        "public_relations",
        desc("department-public-relations", "#17a2b8", "Public Relations"),
    ),
];

// ── Priority ──

const PRIORITY_MEDIUM: CategoryDescriptor = desc("priority-medium", "#ffc107", "Medium");

const PRIORITY_TABLE: &[(&str, CategoryDescriptor)] = &[
    ("low", desc("priority-low", "#28a745", "Low")),
    ("medium", PRIORITY_MEDIUM),
    ("high", desc("priority-high", "#fd7e14", "High")),
    ("critical", desc("priority-critical", "#dc3545", "Critical")),
    ("urgent", desc("priority-urgent", "#8b0000", "Urgent")),
];

// ── Compliance ──

const COMPLIANCE_PENDING: CategoryDescriptor =
    desc("compliance-pending", "#17a2b8", "Pending");
const COMPLIANCE_NON_COMPLIANT: CategoryDescriptor =
    desc("compliance-non-compliant", "#dc3545", "Non-Compliant");

const COMPLIANCE_TABLE: &[(&str, CategoryDescriptor)] = &[
    ("compliant", desc("compliance-compliant", "#28a745", "Compliant")),
    (
        "partially_compliant",
        desc(
            "compliance-partially-compliant",
            "#ffc107",
            "Partially Compliant",
        ),
    ),
    ("non-compliant", COMPLIANCE_NON_COMPLIANT),
    ("non_compliant", COMPLIANCE_NON_COMPLIANT),
    (
        "not_assessed",
        desc("compliance-not-assessed", "#6c757d", "Not Assessed"),
    ),
    ("pending", COMPLIANCE_PENDING),
    ("exempt", desc("compliance-exempt", "#adb5bd", "Exempt")),
];

// ── Raw values ──

/// A value as it arrives from a payload or a DOM hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawValue<'a> {
    Score(i64),
    Text(&'a str),
}

impl From<i64> for RawValue<'_> {
    fn from(v: i64) -> Self {
        RawValue::Score(v)
    }
}

impl From<i32> for RawValue<'_> {
    fn from(v: i32) -> Self {
        RawValue::Score(v.into())
    }
}

impl From<u32> for RawValue<'_> {
    fn from(v: u32) -> Self {
        RawValue::Score(v.into())
    }
}

impl From<u8> for RawValue<'_> {
    fn from(v: u8) -> Self {
        RawValue::Score(v.into())
    }
}

impl<'a> From<&'a str> for RawValue<'a> {
    fn from(v: &'a str) -> Self {
        RawValue::Text(v)
    }
}

impl<'a> From<&'a String> for RawValue<'a> {
    fn from(v: &'a String) -> Self {
        RawValue::Text(v.as_str())
    }
}

impl fmt::Display for RawValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Score(n) => write!(f, "{n}"),
            RawValue::Text(s) => f.write_str(s),
        }
    }
}

/// Normalise a string key: trim, lower-case, spaces to underscores.
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

/// Classify a raw value within a taxonomy. Never fails.
pub fn classify<'a>(taxonomy: Taxonomy, value: impl Into<RawValue<'a>>) -> CategoryDescriptor {
    match (taxonomy, value.into()) {
        (Taxonomy::Risk, RawValue::Score(score)) => risk_band(score),
        (Taxonomy::Risk, RawValue::Text(text)) => match text.trim().parse::<i64>() {
            Ok(score) => risk_band(score),
            Err(_) => lookup(taxonomy, &normalize_key(text)),
        },
        (_, RawValue::Score(n)) => lookup(taxonomy, &n.to_string()),
        (_, RawValue::Text(text)) => lookup(taxonomy, &normalize_key(text)),
    }
}

/// Band for a likelihood × impact score, clamped into 1..=25.
pub fn risk_band(score: i64) -> CategoryDescriptor {
    match score.clamp(1, 25) {
        1..=4 => RISK_LOW,
        5..=9 => RISK_MEDIUM,
        10..=14 => RISK_HIGH,
        15..=19 => RISK_VERY_HIGH,
        _ => RISK_CRITICAL,
    }
}

fn lookup(taxonomy: Taxonomy, key: &str) -> CategoryDescriptor {
    match taxonomy.table().iter().find(|(k, _)| *k == key) {
        Some((_, d)) => *d,
        None => {
            trace!(%taxonomy, key, "classification miss, using default");
            taxonomy.default_descriptor()
        }
    }
}

// ── Derived operations ──

/// One legend row: a color swatch and its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    pub swatch: &'static str,
    pub label: &'static str,
}

/// Render a badge `<span>` for a value.
///
/// `text` defaults to the title-cased value, or the number itself for scores.
pub fn badge_markup<'a>(
    taxonomy: Taxonomy,
    value: impl Into<RawValue<'a>>,
    text: Option<&str>,
) -> String {
    let value = value.into();
    let d = classify(taxonomy, value);
    let text = match (text, value) {
        (Some(t), _) => t.to_string(),
        (None, RawValue::Score(n)) => n.to_string(),
        (None, RawValue::Text(s)) => title_case(s),
    };
    format!(
        r#"<span class="badge {}" style="background-color: {}">{}</span>"#,
        d.style_class,
        d.color,
        escape_html(&text)
    )
}

/// De-duplicated legend for a set of values, in first-seen order.
pub fn legend<'a, I, V>(taxonomy: Taxonomy, values: I) -> Vec<LegendEntry>
where
    I: IntoIterator<Item = V>,
    V: Into<RawValue<'a>>,
{
    let mut seen: Vec<&'static str> = Vec::new();
    let mut out = Vec::new();
    for value in values {
        let d = classify(taxonomy, value);
        if seen.contains(&d.style_class) {
            continue;
        }
        seen.push(d.style_class);
        out.push(LegendEntry {
            swatch: d.color,
            label: d.label,
        });
    }
    out
}

/// Colors aligned positionally with `values`, for chart datasets.
pub fn series_colors<'a, I, V>(taxonomy: Taxonomy, values: I) -> Vec<&'static str>
where
    I: IntoIterator<Item = V>,
    V: Into<RawValue<'a>>,
{
    values
        .into_iter()
        .map(|v| classify(taxonomy, v).color)
        .collect()
}

/// `"in_progress"` → `"In Progress"`.
pub fn title_case(raw: &str) -> String {
    raw.split(|c: char| c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub(crate) fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
