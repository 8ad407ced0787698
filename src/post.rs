use std::fmt;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PostId(pub u64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub description: String,
    pub image: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|candidate| candidate == tag)
    }

    pub fn matching_tags(&self, selected: &[String]) -> usize {
        selected.iter().filter(|tag| self.has_tag(tag)).count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawPost {
    pub source_id: Option<u64>,
    pub title: String,
    pub description: String,
    pub image: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl RawPost {
    pub fn into_post(self, id: PostId) -> Post {
        Post {
            id,
            title: self.title,
            description: self.description,
            image: self.image,
            tags: self.tags,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("feed document is not valid JSON: {0}")]
    Syntax(String),
    #[error("feed document is not a JSON object")]
    NotAnObject,
    #[error("feed document has no `data` array")]
    MissingData,
    #[error("post #{index}: {reason}")]
    InvalidPost { index: usize, reason: String },
    #[error("post #{index}: unparseable createdAt {value}")]
    InvalidTimestamp { index: usize, value: String },
}

pub fn parse_document_str(text: &str) -> Result<Vec<RawPost>, LoadError> {
    let document: Value =
        serde_json::from_str(text).map_err(|err| LoadError::Syntax(err.to_string()))?;
    parse_document(&document)
}

pub fn parse_document(document: &Value) -> Result<Vec<RawPost>, LoadError> {
    let object = document.as_object().ok_or(LoadError::NotAnObject)?;
    let items = object
        .get("data")
        .and_then(Value::as_array)
        .ok_or(LoadError::MissingData)?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| parse_post(index, item))
        .collect()
}

fn parse_post(index: usize, value: &Value) -> Result<RawPost, LoadError> {
    let object = value
        .as_object()
        .ok_or_else(|| invalid(index, "not an object"))?;

    let title = match object.get("title") {
        Some(Value::String(title)) => title.clone(),
        Some(_) => return Err(invalid(index, "`title` is not a string")),
        None => return Err(invalid(index, "missing `title`")),
    };

    let tags = match object.get("tags") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|tag| {
                tag.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| invalid(index, "`tags` must only contain strings"))
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(invalid(index, "`tags` is not an array")),
        None => return Err(invalid(index, "missing `tags`")),
    };

    let created_at = match object.get("createdAt") {
        Some(raw) => parse_timestamp(raw).ok_or_else(|| LoadError::InvalidTimestamp {
            index,
            value: raw.to_string(),
        })?,
        None => return Err(invalid(index, "missing `createdAt`")),
    };

    Ok(RawPost {
        source_id: object.get("id").and_then(Value::as_u64),
        title,
        description: optional_text(object, "description"),
        image: optional_text(object, "image"),
        tags,
        created_at,
    })
}

fn optional_text(object: &Map<String, Value>, key: &str) -> String {
    object
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn invalid(index: usize, reason: &str) -> LoadError {
    LoadError::InvalidPost {
        index,
        reason: reason.to_string(),
    }
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Accepts epoch milliseconds, RFC 3339, and date-times or bare dates without
/// an offset, which are read in the local time zone.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(number) => {
            let millis = number
                .as_i64()
                .or_else(|| number.as_f64().map(|ms| ms.trunc() as i64))?;
            Utc.timestamp_millis_opt(millis).single()
        }
        Value::String(text) => parse_timestamp_text(text.trim()),
        _ => None,
    }
}

fn parse_timestamp_text(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return from_local(&naive);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .and_then(|naive| from_local(&naive))
}

// Ambiguous wall-clock times (DST fold) take the earlier instant.
fn from_local(naive: &NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}
