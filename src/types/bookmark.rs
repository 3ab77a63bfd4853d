use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Deserializer, Serialize};

/// Favicon service queried by bookmark cards.
pub const FAVICON_SERVICE_URL: &str = "https://www.google.com/s2/favicons";

/// Image shown when the favicon service has nothing for a domain.
pub const FAVICON_FALLBACK_URL: &str = "https://www.google.com/favicon.ico";

/// Title stored when the user leaves the title empty.
pub const UNTITLED: &str = "Untitled";

/// A saved bookmark as returned by the store.
///
/// The wire column for `owner` is `user_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(rename = "user_id")]
    pub owner: String,
    pub created_at: DateTime<Utc>,
}

impl Bookmark {
    /// URL of the favicon for this bookmark's domain. The bookmark URL is
    /// percent-encoded into the query.
    pub fn favicon_url(&self) -> String {
        match Url::parse_with_params(
            FAVICON_SERVICE_URL,
            &[("domain", self.url.as_str()), ("sz", "128")],
        ) {
            Ok(url) => url.to_string(),
            Err(_) => FAVICON_FALLBACK_URL.to_string(),
        }
    }
}

/// A bookmark ready to be inserted. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBookmark {
    pub url: String,
    pub title: String,
    pub tags: Vec<String>,
    #[serde(rename = "user_id")]
    pub owner: String,
}

/// Raw form input as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkDraft {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tags: String,
}

impl BookmarkDraft {
    pub fn new(url: &str, title: &str, tags: &str) -> Self {
        Self {
            url: url.to_string(),
            title: title.to_string(),
            tags: tags.to_string(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
