//! Wire types for the dashboard-data and export contracts.
//!
//! The dashboard API answers `GET bi-tools/dashboard` with a summary block,
//! a daily risk trend, a category distribution and the heat-map records.
//! [`parse_dashboard`] is the only way a payload enters the system: anything
//! that fails to deserialise or validate is rejected whole.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::heatmap::RiskRecord;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("compliance score out of range: {0}")]
    ComplianceScore(f64),
    #[error("category distribution entry {0} has an empty name")]
    EmptyCategory(usize),
}

// ── Query ──

/// Reporting window for the dashboard query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "7d")]
    Week,
    #[default]
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
    #[serde(rename = "1y")]
    Year,
}

#[derive(Debug, Error)]
#[error("unknown time range: {0} (expected 7d, 30d, 90d or 1y)")]
pub struct UnknownTimeRange(pub String);

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Week => "7d",
            Self::Month => "30d",
            Self::Quarter => "90d",
            Self::Year => "1y",
        }
    }

    pub fn days(&self) -> u32 {
        match self {
            Self::Week => 7,
            Self::Month => 30,
            Self::Quarter => 90,
            Self::Year => 365,
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = UnknownTimeRange;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "7d" => Ok(Self::Week),
            "30d" => Ok(Self::Month),
            "90d" => Ok(Self::Quarter),
            "1y" => Ok(Self::Year),
            _ => Err(UnknownTimeRange(s.to_string())),
        }
    }
}

/// Parameters of a dashboard fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardQuery {
    pub time_range: TimeRange,
    pub department_id: Option<String>,
}

impl DashboardQuery {
    /// Query-string pairs, omitting the department filter when unset.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("time_range", self.time_range.as_str().to_string())];
        if let Some(dept) = &self.department_id {
            pairs.push(("department_id", dept.clone()));
        }
        pairs
    }
}

// ── Dashboard payload ──

/// Aggregate counters shown in the dashboard header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub total_risks: u64,
    pub high_risks: u64,
    pub medium_risks: u64,
    pub low_risks: u64,
    #[serde(default)]
    pub total_assessments: u64,
    #[serde(default)]
    pub completed_assessments: u64,
    #[serde(default)]
    pub pending_assessments: u64,
    #[serde(default)]
    pub total_controls: u64,
    #[serde(default)]
    pub effective_controls: u64,
    /// Percentage, 0..=100.
    #[serde(default)]
    pub compliance_score: f64,
}

impl SummaryMetrics {
    /// Display form of every metric, keyed by field name.
    ///
    /// Counters render as integers; the compliance score as a one-decimal
    /// percentage, which is what drives the animator's formatting.
    pub fn display_values(&self) -> Vec<(&'static str, String)> {
        vec![
            ("total_risks", self.total_risks.to_string()),
            ("high_risks", self.high_risks.to_string()),
            ("medium_risks", self.medium_risks.to_string()),
            ("low_risks", self.low_risks.to_string()),
            ("total_assessments", self.total_assessments.to_string()),
            ("completed_assessments", self.completed_assessments.to_string()),
            ("pending_assessments", self.pending_assessments.to_string()),
            ("total_controls", self.total_controls.to_string()),
            ("effective_controls", self.effective_controls.to_string()),
            ("compliance_score", format!("{:.1}%", self.compliance_score)),
        ]
    }
}

/// Daily count of newly raised risks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    #[serde(deserialize_with = "date_or_datetime")]
    pub date: NaiveDate,
    pub count: u64,
}

/// Accept `2026-10-15` or an ISO datetime such as `2026-10-15T00:00:00`,
/// keeping only the date.
fn date_or_datetime<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date()))
        .map_err(|_| serde::de::Error::custom(format!("invalid trend date: {raw:?}")))
}

/// Number of risks in one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

/// Response body of the dashboard-data endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardPayload {
    pub summary: SummaryMetrics,
    pub risk_trends: Vec<TrendPoint>,
    pub category_distribution: Vec<CategoryCount>,
    pub heatmap_data: Vec<RiskRecord>,
    #[serde(default)]
    pub time_range: Option<TimeRange>,
}

impl DashboardPayload {
    /// Semantic checks serde cannot express.
    pub fn validate(&self) -> Result<(), PayloadError> {
        let score = self.summary.compliance_score;
        if !score.is_finite() || !(0.0..=100.0).contains(&score) {
            return Err(PayloadError::ComplianceScore(score));
        }
        if let Some(idx) = self
            .category_distribution
            .iter()
            .position(|c| c.category.trim().is_empty())
        {
            return Err(PayloadError::EmptyCategory(idx));
        }
        Ok(())
    }
}

/// Deserialise and validate a dashboard response body.
pub fn parse_dashboard(body: &str) -> Result<DashboardPayload, PayloadError> {
    let payload: DashboardPayload = serde_json::from_str(body)?;
    payload.validate()?;
    Ok(payload)
}

// ── Export ──

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportDataType {
    #[default]
    Risks,
    Assessments,
    Controls,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Excel,
    Csv,
    Pdf,
}

/// Body of `POST bi-tools/export`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub data_type: ExportDataType,
    pub format: ExportFormat,
    #[serde(default)]
    pub filters: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportResponse {
    pub filename: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub download_url: Option<String>,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE: &str = r#"{
        "summary": {
            "total_risks": 42,
            "high_risks": 7,
            "medium_risks": 15,
            "low_risks": 20,
            "total_assessments": 12,
            "completed_assessments": 12,
            "pending_assessments": 0,
            "total_controls": 30,
            "effective_controls": 24,
            "compliance_score": 87.5
        },
        "risk_trends": [
            {"date": "2026-10-15", "count": 2},
            {"date": "2026-10-16", "count": 0}
        ],
        "category_distribution": [
            {"category": "Operational", "count": 18},
            {"category": "Financial", "count": 9}
        ],
        "heatmap_data": [
            {"risk_id": 1, "title": "Contribution arrears", "category": "Financial",
             "department": "Finance", "probability": 4, "impact": 5, "risk_score": 20},
            {"risk_id": 2, "title": "Core system outage", "category": "Technology",
             "department": "IT", "probability": 2, "impact": 4, "risk_score": 8}
        ],
        "time_range": "30d"
    }"#;

    #[test]
    fn parses_backend_shape() {
        let payload = parse_dashboard(SAMPLE).unwrap();
        assert_eq!(payload.summary.total_risks, 42);
        assert_eq!(payload.risk_trends.len(), 2);
        assert_eq!(
            payload.risk_trends[0].date,
            NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
        );
        assert_eq!(payload.category_distribution[1].category, "Financial");
        assert_eq!(payload.heatmap_data[0].id, "1");
        assert_eq!(payload.time_range, Some(TimeRange::Month));
    }

    #[test]
    fn optional_summary_fields_default() {
        let json = r#"{
            "summary": {"total_risks": 1, "high_risks": 0, "medium_risks": 1, "low_risks": 0},
            "risk_trends": [], "category_distribution": [], "heatmap_data": []
        }"#;
        let payload = parse_dashboard(json).unwrap();
        assert_eq!(payload.summary.total_controls, 0);
        assert_eq!(payload.summary.compliance_score, 0.0);
        assert!(payload.time_range.is_none());
    }

    #[test]
    fn rejects_missing_top_level_field() {
        let json = r#"{"summary": {"total_risks": 1, "high_risks": 0, "medium_risks": 1, "low_risks": 0}}"#;
        assert!(matches!(parse_dashboard(json), Err(PayloadError::Json(_))));
    }

    #[test]
    fn rejects_malformed_dates() {
        let json = SAMPLE.replace("2026-10-15", "yesterday");
        assert!(matches!(parse_dashboard(&json), Err(PayloadError::Json(_))));
    }

    #[test]
    fn trend_dates_accept_iso_datetimes() {
        let json = SAMPLE
            .replace("2026-10-15", "2026-10-15T00:00:00")
            .replace("2026-10-16", "2026-10-16T08:30:00.123456+00:00");
        let payload = parse_dashboard(&json).unwrap();
        assert_eq!(
            payload.risk_trends[0].date,
            NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
        );
        assert_eq!(
            payload.risk_trends[1].date,
            NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
        );
    }

    #[test]
    fn rejects_out_of_range_compliance() {
        let json = SAMPLE.replace("87.5", "187.5");
        assert!(matches!(
            parse_dashboard(&json),
            Err(PayloadError::ComplianceScore(_))
        ));
    }

    #[test]
    fn rejects_blank_category() {
        let json = SAMPLE.replace("\"Financial\", \"count\": 9", "\" \", \"count\": 9");
        assert!(matches!(
            parse_dashboard(&json),
            Err(PayloadError::EmptyCategory(1))
        ));
    }

    #[test]
    fn display_values_format_percent() {
        let payload = parse_dashboard(SAMPLE).unwrap();
        let values = payload.summary.display_values();
        assert_eq!(values[0], ("total_risks", "42".to_string()));
        assert_eq!(
            values.last().unwrap(),
            &("compliance_score", "87.5%".to_string())
        );
    }

    #[test]
    fn query_pairs_skip_missing_department() {
        let q = DashboardQuery::default();
        assert_eq!(q.query_pairs(), vec![("time_range", "30d".to_string())]);

        let q = DashboardQuery {
            time_range: TimeRange::Quarter,
            department_id: Some("4".into()),
        };
        assert_eq!(
            q.query_pairs(),
            vec![
                ("time_range", "90d".to_string()),
                ("department_id", "4".to_string())
            ]
        );
    }

    #[test]
    fn time_range_parsing() {
        assert_eq!("7D".parse::<TimeRange>().unwrap(), TimeRange::Week);
        assert_eq!("1y".parse::<TimeRange>().unwrap().days(), 365);
        assert!("2w".parse::<TimeRange>().is_err());
    }

    #[test]
    fn export_request_wire_shape() {
        let req = ExportRequest {
            data_type: ExportDataType::Controls,
            format: ExportFormat::Csv,
            filters: serde_json::Map::new(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["data_type"], "controls");
        assert_eq!(json["format"], "csv");

        let resp: ExportResponse =
            serde_json::from_str(r#"{"filename": "controls_20261017.csv", "size": 512}"#).unwrap();
        assert_eq!(resp.filename, "controls_20261017.csv");
        assert_eq!(resp.size, Some(512));
    }
}
