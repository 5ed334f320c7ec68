use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Session value as kept in the store, keyed by session id
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Session {
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub menu: Vec<String>,
    #[serde(deserialize_with = "deserialize_expires_at")]
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(expires_at: DateTime<Utc>) -> Self {
        Self {
            participants: Vec::new(),
            menu: Vec::new(),
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

// Accept RFC 3339 as well as offset-less ISO-8601 stamps, the latter read as UTC.
fn deserialize_expires_at<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| serde::de::Error::custom(format!("invalid expires_at '{}': {}", raw, e)))
}

/// Serialize a session into the store value format
pub fn encode_session(session: &Session) -> Result<String, serde_json::Error> {
    serde_json::to_string(session)
}

/// Parse a store value into a session
pub fn decode_session(raw: &str) -> Result<Session, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Serialize a menu for the session channel and for outbound frames
pub fn encode_menu(menu: &[String]) -> Result<String, serde_json::Error> {
    serde_json::to_string(menu)
}

pub fn decode_menu(raw: &str) -> Result<Vec<String>, serde_json::Error> {
    serde_json::from_str(raw)
}
