use serde_json::{Map, Value};

/// Issue fields that may carry the issue's sprint, in priority order.
pub const SPRINT_FIELDS: [&str; 5] = [
    "sprint",
    "customfield_10020",
    "customfield_10010",
    "customfield_10007",
    "customfield_10104",
];

/// The shapes a sprint reference takes across Jira versions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SprintRef<'a> {
    /// Every sprint the issue has been in; the last entry is the current one.
    ArrayOfRefs(&'a [Value]),
    SingleRef(&'a Map<String, Value>),
    /// Jira Server's `com.atlassian.greenhopper.service.sprint.Sprint@1a2b[id=123,...]`.
    LegacyEncoded(&'a str),
    Absent,
}

impl<'a> SprintRef<'a> {
    pub fn classify(value: &'a Value) -> Self {
        match value {
            Value::Array(items) => Self::ArrayOfRefs(items),
            Value::Object(map) => Self::SingleRef(map),
            Value::String(s) => Self::LegacyEncoded(s),
            _ => Self::Absent,
        }
    }

    pub fn sprint_id(&self) -> Option<i64> {
        match self {
            Self::ArrayOfRefs(items) => items
                .last()
                .and_then(|last| SprintRef::classify(last).sprint_id()),
            Self::SingleRef(map) => map.get("id").and_then(numeric_id),
            Self::LegacyEncoded(raw) => legacy_id(raw),
            Self::Absent => None,
        }
    }
}

/// Remote sprint id of an issue: the first candidate field whose value yields one.
pub fn resolve_sprint_id(fields: &Map<String, Value>) -> Option<i64> {
    SPRINT_FIELDS
        .iter()
        .filter_map(|name| fields.get(*name))
        .find_map(|value| SprintRef::classify(value).sprint_id())
}

fn numeric_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Reads the `id=` attribute, ignoring names that merely end in `id` (`rapidViewId=`).
fn legacy_id(raw: &str) -> Option<i64> {
    raw.match_indices("id=").find_map(|(at, marker)| {
        let at_boundary = raw[..at]
            .chars()
            .next_back()
            .map_or(true, |c| c == '[' || c == ',' || c.is_whitespace());
        if !at_boundary {
            return None;
        }
        let rest = &raw[at + marker.len()..];
        let end = rest.find([',', ']']).unwrap_or(rest.len());
        rest[..end].trim().parse().ok()
    })
}
