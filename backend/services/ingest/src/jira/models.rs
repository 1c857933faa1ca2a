use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One page of a Jira Agile listing.
///
/// Board and sprint listings carry their items under `values`, issue listings under `issues`.
/// `total` and `isLast` are optional: Jira omits them on some endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default, alias = "issues")]
    pub values: Vec<T>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub is_last: Option<bool>,
}

pub type RemotePage = Page<Value>;

impl RemotePage {
    /// Accepts either a page object or a bare JSON array (the teams endpoint returns one).
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::Array(values) => Ok(Self {
                values,
                total: None,
                is_last: Some(true),
            }),
            other => serde_json::from_value(other),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("malformed payload: {0}")]
    Shape(#[from] serde_json::Error),

    #[error("invalid value: {0}")]
    Invalid(String),
}

/// A board from `/rest/agile/1.0/board`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiBoard {
    #[serde(deserialize_with = "flexible_id")]
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub board_type: String,
    #[serde(default)]
    pub location: Option<ApiBoardLocation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiBoardLocation {
    pub project_key: Option<String>,
    pub key: Option<String>,
    pub project_id: Option<i64>,
    pub display_name: Option<String>,
}

/// A sprint from `/rest/agile/1.0/board/{id}/sprint`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSprint {
    #[serde(deserialize_with = "flexible_id")]
    pub id: i64,
    pub name: String,
    pub state: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub complete_date: Option<String>,
    pub goal: Option<String>,
}

/// An issue from `/rest/agile/1.0/board/{id}/issue`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiIssue {
    #[serde(deserialize_with = "flexible_id")]
    pub id: i64,
    pub key: String,
    #[serde(default)]
    pub fields: ApiIssueFields,
}

/// Issue fields. Every field is optional because the field set depends on the project's
/// configuration; sprint and estimation custom fields land in `extra`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiIssueFields {
    pub summary: Option<String>,
    pub description: Option<Value>,
    pub issuetype: Option<ApiNamed>,
    pub status: Option<ApiNamed>,
    pub priority: Option<ApiNamed>,
    pub assignee: Option<ApiUser>,
    pub reporter: Option<ApiUser>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub labels: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub components: Vec<ApiNamed>,
    #[serde(default, rename = "fixVersions", deserialize_with = "null_as_empty")]
    pub fix_versions: Vec<ApiNamed>,
    pub timetracking: Option<ApiTimeTracking>,
    pub timeoriginalestimate: Option<i64>,
    pub timeestimate: Option<i64>,
    pub timespent: Option<i64>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub resolutiondate: Option<String>,
    pub duedate: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiNamed {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUser {
    pub account_id: Option<String>,
    /// Jira Server / Data Center identify users by `name` instead of `accountId`.
    pub name: Option<String>,
    pub display_name: Option<String>,
}

impl ApiUser {
    pub fn id(&self) -> Option<String> {
        self.account_id.clone().or_else(|| self.name.clone())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTimeTracking {
    pub original_estimate_seconds: Option<i64>,
    pub remaining_estimate_seconds: Option<i64>,
    pub time_spent_seconds: Option<i64>,
}

impl ApiIssueFields {
    /// `(original, remaining, spent)` in seconds, preferring the `timetracking` block.
    pub fn time_tracking(&self) -> (Option<i64>, Option<i64>, Option<i64>) {
        let tt = self.timetracking.clone().unwrap_or_default();
        (
            tt.original_estimate_seconds.or(self.timeoriginalestimate),
            tt.remaining_estimate_seconds.or(self.timeestimate),
            tt.time_spent_seconds.or(self.timespent),
        )
    }

    /// First numeric value among the candidate estimation fields.
    pub fn story_points(&self, candidates: &[String]) -> Option<f64> {
        candidates
            .iter()
            .filter_map(|name| self.extra.get(name))
            .find_map(numeric_value)
    }

    pub fn description_text(&self) -> Option<String> {
        self.description.as_ref().and_then(plain_text)
    }
}

/// Parse a Jira timestamp into UTC.
///
/// Jira emits `2026-02-10T10:00:00.000+0000` (no colon in the offset), which RFC 3339
/// parsing rejects, so both forms are tried. Date-only values map to UTC midnight.
/// Unparseable input yields `None`.
pub fn parse_jira_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn parse_optional_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(parse_jira_timestamp)
}

fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Plain text from either a string description or an Atlassian Document Format tree.
fn plain_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Object(_) => {
            let mut out = String::new();
            collect_adf_text(value, &mut out);
            out
        }
        _ => return None,
    };
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn collect_adf_text(node: &Value, out: &mut String) {
    if let Some(text) = node.get("text").and_then(Value::as_str) {
        out.push_str(text);
    }
    if node.get("type").and_then(Value::as_str) == Some("hardBreak") {
        out.push('\n');
    }
    if let Some(children) = node.get("content").and_then(Value::as_array) {
        for child in children {
            collect_adf_text(child, out);
        }
        let is_block = matches!(
            node.get("type").and_then(Value::as_str),
            Some("paragraph" | "heading" | "listItem" | "codeBlock" | "blockquote")
        );
        if is_block && !out.ends_with('\n') {
            out.push('\n');
        }
    }
}

/// Jira ids arrive as strings on some endpoints and numbers on others.
fn flexible_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(n) => Ok(n),
        RawId::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
