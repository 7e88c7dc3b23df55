use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use crate::error::{PosError, Result};

/// Structured record for an HTTP-level failure surfaced as data rather
/// than as an error (the HEAD path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Correlation id; the service never fills this for local records
    pub request_id: Option<String>,
    /// HTTP status of the failed exchange
    pub error: u16,
    /// Generic description
    pub msg: String,
}

/// Normalized result of a call.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// Parsed JSON body of a successful response
    Data(Value),
    /// Raw response headers (successful HEAD)
    Headers(HashMap<String, String>),
    /// HTTP-level failure on a HEAD request
    Error(ErrorRecord),
}

impl Envelope {
    /// The JSON payload, if this is a data envelope
    pub fn data(&self) -> Option<&Value> {
        match self {
            Envelope::Data(value) => Some(value),
            _ => None,
        }
    }

    /// Unmarshal the JSON payload into a concrete type
    pub fn parse<T>(&self) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        match self {
            Envelope::Data(value) => serde_json::from_value(value.clone()).map_err(|e| e.into()),
            _ => Err(PosError::UnparsableResponse(
                "response carried no JSON payload".to_string(),
            )),
        }
    }
}

/// Generic description for a status code, mirroring the service docs.
fn status_message(status: u16) -> Option<&'static str> {
    match status {
        204 => Some("No content"),
        400 => Some("Bad Request"),
        401 => Some("Unauthorized"),
        404 => Some("Not Found"),
        405 => Some("Method Not Allowed"),
        500 => Some("Internal Server Error"),
        _ => None,
    }
}

/// Classify a completed HTTP exchange into an envelope or a typed error.
///
/// HEAD requests surface their headers on success and a structured
/// [`ErrorRecord`] on failure. Every other method parses the body as JSON
/// on a 2xx status and otherwise maps the status onto the error taxonomy,
/// recovering whatever upstream code/message the failing body carried.
pub fn build_response(
    method: &Method,
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
) -> Result<Envelope> {
    if *method == Method::HEAD {
        if status.is_success() {
            return Ok(Envelope::Headers(header_map(headers)));
        }
        return Ok(Envelope::Error(ErrorRecord {
            request_id: None,
            error: status.as_u16(),
            msg: "HTTP error code".to_string(),
        }));
    }

    if status.is_success() {
        return parse(body).map(Envelope::Data);
    }
    Err(check_status(status.as_u16(), body))
}

fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

/// Parse a successful body as JSON.
fn parse(content: &str) -> Result<Value> {
    if content.is_empty() {
        return Err(PosError::EmptyResponse);
    }
    serde_json::from_str(content).map_err(|err| PosError::UnparsableResponse(err.to_string()))
}

/// Turn a non-2xx exchange into the matching error kind.
fn check_status(status: u16, content: &str) -> PosError {
    if status == 401 {
        // auth failures return no parseable content
        return PosError::Authentication {
            msg: "Unauthorized".to_string(),
            status,
        };
    }

    let (pos_error_code, pos_error_msg) = parse_error(content);
    let msg = status_message(status).unwrap_or("Unknown error");
    PosError::WebService {
        msg: msg.to_string(),
        status,
        pos_error_code,
        pos_error_msg,
    }
}

/// Extract the upstream error code/message pair from a failing body.
///
/// JSON bodies nest the pair under `pos.errors.error` (first element when
/// the server returns a list). Anything else is treated as an HTML page
/// whose `<title>` is the only useful content.
pub(crate) fn parse_error(content: &str) -> (Option<i64>, Option<String>) {
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(map)) => {
            let mut node = map
                .get("pos")
                .and_then(|v| v.get("errors"))
                .and_then(|v| v.get("error"));
            if let Some(Value::Array(items)) = node {
                node = items.first();
            }
            match node {
                Some(Value::Object(error)) => (
                    error.get("code").and_then(Value::as_i64),
                    error
                        .get("title")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                ),
                _ => (None, None),
            }
        }
        _ => (None, html_title(content)),
    }
}

/// Pull the text of the first `<title>` element out of an HTML document.
///
/// Error pages from the service front end are full HTML; the title is
/// the only line worth surfacing. Returns None when no title exists or
/// the markup breaks before one is seen.
pub(crate) fn html_title(content: &str) -> Option<String> {
    let mut reader = Reader::from_str(content);
    reader.check_end_names(false);
    reader.trim_text(true);

    let mut inside_title = false;
    let mut title = String::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                if start.name().as_ref().eq_ignore_ascii_case(b"title") {
                    inside_title = true;
                }
            }
            Ok(Event::Text(text)) if inside_title => {
                if let Ok(unescaped) = text.unescape() {
                    title.push_str(&unescaped);
                }
            }
            Ok(Event::End(end)) => {
                if inside_title && end.name().as_ref().eq_ignore_ascii_case(b"title") {
                    break;
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    let title = title.trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

/// Identifier of a listed resource: numeric when the service returns one,
/// opaque text otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceId {
    /// Integer id
    Number(i64),
    /// Non-numeric id, kept verbatim
    Text(String),
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Number(n) => write!(f, "{}", n),
            ResourceId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Reduce a list/search payload to its identifiers, in response order.
///
/// A mapping payload carries its items under `data` (absent means empty);
/// a bare array is the item list itself. Numeric ids, native or numeric
/// strings, convert to integers; anything else stays textual. No
/// deduplication.
pub fn extract_ids(payload: &Value) -> Result<Vec<ResourceId>> {
    let empty: &[Value] = &[];
    let items: &[Value] = match payload {
        Value::Object(map) => match map.get("data") {
            Some(Value::Array(items)) => items,
            None => empty,
            Some(_) => {
                return Err(PosError::UnparsableResponse(
                    "list data field is not an array".to_string(),
                ))
            }
        },
        Value::Array(items) => items,
        _ => {
            return Err(PosError::UnparsableResponse(
                "list response is neither a mapping nor an array".to_string(),
            ))
        }
    };

    items
        .iter()
        .map(|item| {
            let id = item.get("id").ok_or_else(|| {
                PosError::UnparsableResponse("list item has no id field".to_string())
            })?;
            Ok(match id {
                Value::Number(n) => match n.as_i64() {
                    Some(i) => ResourceId::Number(i),
                    None => ResourceId::Text(n.to_string()),
                },
                Value::String(s) => match s.parse::<i64>() {
                    Ok(i) => ResourceId::Number(i),
                    Err(_) => ResourceId::Text(s.clone()),
                },
                other => ResourceId::Text(other.to_string()),
            })
        })
        .collect()
}
