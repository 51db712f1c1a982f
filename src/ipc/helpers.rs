use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::clock::CanonicalTime;
use crate::ipc::error::err;

/// Handler-internal failure, mapped to the wire error envelope at the edge.
#[derive(Debug)]
pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }

    pub fn bad_params(message: impl Into<String>) -> HandlerErr {
        HandlerErr {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> HandlerErr {
        HandlerErr {
            code: "not_found",
            message: message.into(),
            details: None,
        }
    }

    pub fn db(code: &'static str, e: rusqlite::Error) -> HandlerErr {
        HandlerErr {
            code,
            message: e.to_string(),
            details: None,
        }
    }
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

pub fn get_required_i64(params: &serde_json::Value, key: &str) -> Result<i64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

/// Weekday params are 1..7, Monday first.
pub fn get_required_weekday(params: &serde_json::Value, key: &str) -> Result<i64, HandlerErr> {
    let weekday = get_required_i64(params, key)?;
    if !(1..=7).contains(&weekday) {
        return Err(HandlerErr::bad_params(format!(
            "{} must be 1..7 (Monday=1)",
            key
        )));
    }
    Ok(weekday)
}

/// Required time param. Storage only ever holds canonical `HH:MM` values, so
/// malformed times are rejected here instead of silently persisted.
pub fn get_required_time(
    params: &serde_json::Value,
    key: &str,
) -> Result<CanonicalTime, HandlerErr> {
    let raw = get_required_str(params, key)?;
    parse_time_param(&raw, key)
}

/// Optional time param: absent or empty means "unset", which callers
/// materialize as the picker default (midnight).
pub fn get_optional_time(
    params: &serde_json::Value,
    key: &str,
) -> Result<Option<CanonicalTime>, HandlerErr> {
    match params.get(key).and_then(|v| v.as_str()) {
        None => Ok(None),
        Some("") => Ok(None),
        Some(raw) => parse_time_param(raw, key).map(Some),
    }
}

pub fn parse_time_param(raw: &str, key: &str) -> Result<CanonicalTime, HandlerErr> {
    raw.parse::<CanonicalTime>().map_err(|_| HandlerErr {
        code: "bad_params",
        message: format!("{} must be a 24-hour HH:MM time", key),
        details: Some(json!({ "value": raw })),
    })
}

pub fn class_exists(conn: &Connection, class_id: &str) -> Result<bool, HandlerErr> {
    conn.query_row("SELECT 1 FROM classes WHERE id = ?", [class_id], |r| {
        r.get::<_, i64>(0)
    })
    .optional()
    .map(|v| v.is_some())
    .map_err(|e| HandlerErr::db("db_query_failed", e))
}

pub fn now_ts() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    secs.to_string()
}
