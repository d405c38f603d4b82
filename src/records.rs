//! Core data structures for the keepsake application.
//!
//! This module contains the records persisted in the three collections:
//! timeline events, album buckets with their photos, and diary entries with
//! their comments.
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Generates a fresh record identifier.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// A self-contained `data:` URL carrying base64 image bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedBlob(String);

impl EncodedBlob {
    pub fn new(data_url: String) -> Self {
        EncodedBlob(data_url)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The MIME type embedded in the data URL, if any.
    pub fn mime_type(&self) -> Option<&str> {
        self.0
            .strip_prefix("data:")
            .and_then(|rest| rest.split(';').next())
            .filter(|mime| !mime.is_empty())
    }
}

impl fmt::Display for EncodedBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What kind of day an event marks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Birthday,
    Anniversary,
    Holiday,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Category::Birthday => "birthday",
            Category::Anniversary => "anniversary",
            Category::Holiday => "holiday",
        };
        f.write_str(label)
    }
}

/// A dated entry on the timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier for the event
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    pub category: Category,
    /// Optional reminder time of day, stored as `HH:MM`
    #[serde(
        default,
        with = "reminder_format",
        skip_serializing_if = "Option::is_none"
    )]
    pub reminder: Option<NaiveTime>,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub photo: Option<EncodedBlob>,
}

/// A single photo inside an album bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub id: String,
    pub url: EncodedBlob,
    pub title: String,
}

impl Photo {
    /// Creates a photo titled after the file name it was loaded from
    pub fn from_file(file_name: &str, url: EncodedBlob) -> Self {
        Photo {
            id: new_id(),
            url,
            title: default_title(file_name),
        }
    }
}

/// Text preceding the first `.` of a file name.
pub fn default_title(file_name: &str) -> String {
    file_name.split('.').next().unwrap_or_default().to_string()
}

/// All photos uploaded on one calendar date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumBucket {
    pub id: String,
    pub date: NaiveDate,
    pub photos: Vec<Photo>,
}

/// A comment attached to a diary entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

/// A diary page and its comment thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiaryEntry {
    /// Empty until the entry is first saved
    #[serde(default)]
    pub id: String,
    pub date: NaiveDate,
    pub title: String,
    pub content: String,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub photo: Option<EncodedBlob>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    /// Display flag for the comment thread
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub show_comments: bool,
}

impl DiaryEntry {
    /// A blank draft for the given date, ready to be filled and saved
    pub fn draft(date: NaiveDate) -> Self {
        DiaryEntry {
            id: String::new(),
            date,
            title: String::new(),
            content: String::new(),
            photo: None,
            comments: Vec::new(),
            show_comments: false,
        }
    }
}

// Records written by older front ends store "" for a missing optional value.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<EncodedBlob>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()).map(EncodedBlob::new))
}

mod reminder_format {
    use super::*;

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(time) => serializer.serialize_str(&time.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => NaiveTime::parse_from_str(text, FORMAT)
                .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M:%S"))
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}
