use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;
use url::Url;

use crate::client::Config;
use crate::error::{PosError, Result};
use crate::options::Param;

/// Header carrying the authentication key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Fixed boundary used for multipart file uploads.
const MULTIPART_BOUNDARY: &str = "----------ThIs_Is_tHe_bouNdaRY_$";

/// Data attached to an outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestData {
    /// JSON value. Objects always travel as a JSON body (mapping data has
    /// mutating semantics on this service, whatever the method); other
    /// values are serialized into the query string for GET-class methods.
    Json(Value),
    /// Pre-encoded multipart/form-data body with its boundary content type
    Multipart {
        content_type: String,
        body: Vec<u8>,
    },
}

/// A fully resolved request: method, URL, headers and body, ready for the
/// transport.
///
/// Descriptors compare byte-for-byte; the endpoint-convention regression
/// tests rely on that.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    /// Resolved (upper-cased) HTTP method
    pub method: Method,
    /// Final URL, query parameters included
    pub url: Url,
    /// Merged headers, authentication included
    pub headers: HeaderMap,
    /// JSON or multipart body, if any
    pub body: Option<Vec<u8>>,
}

fn is_mutating(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}

/// Assemble the endpoint, headers and payload for one logical call.
///
/// `action` is appended as an extra path segment when supplied; the
/// embedded `resource/action` convention passes it inside `uri` instead
/// and both spellings resolve to the same descriptor. Caller headers are
/// applied first and the authentication header last, so a stray
/// `X-API-Key` from the caller cannot mask the configured key.
pub fn build_request(
    config: &Config,
    uri: &str,
    method: &str,
    action: Option<&str>,
    headers: Option<&HeaderMap>,
    data: Option<&RequestData>,
) -> Result<RequestDescriptor> {
    let upper = method.to_uppercase();
    let method = Method::from_bytes(upper.as_bytes())
        .map_err(|_| PosError::InvalidArgument(format!("invalid HTTP method: {}", upper)))?;

    let mut endpoint = config.endpoint(uri);
    if let Some(action) = action {
        endpoint = format!("{}/{}", endpoint, action);
    }
    let mut url = Url::parse(&endpoint)?;

    let mut request_headers = HeaderMap::new();
    if let Some(headers) = headers {
        for (name, value) in headers {
            request_headers.insert(name, value.clone());
        }
    }
    let api_key = HeaderValue::from_str(&config.api_key).map_err(|_| {
        PosError::InvalidArgument("API key contains characters not allowed in a header".to_string())
    })?;
    request_headers.insert(API_KEY_HEADER, api_key);

    let mut body = None;
    match data {
        None => {}
        Some(RequestData::Json(value)) => {
            if is_mutating(&method) || value.is_object() {
                body = Some(serde_json::to_vec(value)?);
                request_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            } else {
                for (key, val) in query_pairs(value)? {
                    url.query_pairs_mut().append_pair(&key, &val);
                }
            }
        }
        Some(RequestData::Multipart { content_type, body: encoded }) => {
            let value = HeaderValue::from_str(content_type).map_err(|_| {
                PosError::InvalidArgument("invalid multipart content type".to_string())
            })?;
            request_headers.insert(CONTENT_TYPE, value);
            body = Some(encoded.clone());
        }
    }

    Ok(RequestDescriptor {
        method,
        url,
        headers: request_headers,
        body,
    })
}

/// Serialize non-mapping data into query pairs.
///
/// The accepted shape is a sequence of `[key, value]` pairs; scalar values
/// keep their textual form, nested values are embedded as JSON text.
fn query_pairs(value: &Value) -> Result<Vec<(String, String)>> {
    let items = match value {
        Value::Array(items) => items,
        _ => {
            return Err(PosError::InvalidArgument(
                "query data must be a sequence of key/value pairs".to_string(),
            ))
        }
    };

    items
        .iter()
        .map(|item| match item {
            Value::Array(pair) if pair.len() == 2 => {
                Ok((scalar_text(&pair[0]), scalar_text(&pair[1])))
            }
            _ => Err(PosError::InvalidArgument(
                "query data must be a sequence of key/value pairs".to_string(),
            )),
        })
        .collect()
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One file attached to a multipart create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    /// MIME type reported for the file
    pub content_type: String,
    /// File name reported to the service
    pub filename: String,
    /// Raw file contents
    pub contents: Vec<u8>,
}

impl FileUpload {
    /// Describe a file to upload
    pub fn new(
        content_type: impl Into<String>,
        filename: impl Into<String>,
        contents: impl Into<Vec<u8>>,
    ) -> Self {
        FileUpload {
            content_type: content_type.into(),
            filename: filename.into(),
            contents: contents.into(),
        }
    }
}

/// Encode files and their accompanying options into a multipart/form-data
/// body.
///
/// Files land under the `files[]` field; the options mapping, when given,
/// is attached as JSON under a `data` field. Returns the content type
/// (with boundary) and the encoded body.
pub fn encode_multipart_formdata(
    files: &[FileUpload],
    options: Option<&Param>,
) -> Result<(String, Vec<u8>)> {
    const CRLF: &[u8] = b"\r\n";
    let mut lines: Vec<Vec<u8>> = Vec::new();

    for file in files {
        lines.push(format!("--{}", MULTIPART_BOUNDARY).into_bytes());
        lines.push(
            format!(
                "Content-Disposition: form-data; name=\"files[]\"; filename=\"{}\"",
                file.filename
            )
            .into_bytes(),
        );
        lines.push(format!("Content-Type: {}", file.content_type).into_bytes());
        lines.push(Vec::new());
        lines.push(file.contents.clone());
    }

    if let Some(options) = options {
        lines.push(format!("--{}", MULTIPART_BOUNDARY).into_bytes());
        lines.push(b"Content-Disposition: form-data; name=\"data\"".to_vec());
        lines.push(Vec::new());
        lines.push(serde_json::to_vec(options)?);
    }

    lines.push(format!("--{}--", MULTIPART_BOUNDARY).into_bytes());
    lines.push(Vec::new());

    let body = lines.join(CRLF);
    let content_type = format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY);
    Ok((content_type, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> Config {
        Config::new("http://localhost:8000/api", "BVWPFFYBT97WKM959D7AVVD0M4815Y1L")
    }

    #[test]
    fn test_method_is_upper_cased() {
        let request = build_request(&config(), "product", "get", Some("list"), None, None).unwrap();
        assert_eq!(request.method, Method::GET);
    }

    #[test]
    fn test_action_appends_path_segment() {
        let request = build_request(&config(), "order", "GET", Some("list"), None, None).unwrap();
        assert_eq!(request.url.as_str(), "http://localhost:8000/api/order/list");
    }

    #[test]
    fn test_embedded_and_separate_action_are_equivalent() {
        let mut data = Param::new();
        data.insert("limit".to_string(), json!(10));
        data.insert("page".to_string(), json!(1));
        let data = RequestData::Json(Value::Object(data));

        let embedded =
            build_request(&config(), "product/list", "GET", None, None, Some(&data)).unwrap();
        let separate =
            build_request(&config(), "product", "GET", Some("list"), None, Some(&data)).unwrap();

        assert_eq!(embedded, separate);
    }

    #[test]
    fn test_api_key_header_wins_over_caller_header() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("spoofed"));
        headers.insert("x-custom", HeaderValue::from_static("kept"));

        let request =
            build_request(&config(), "product", "GET", Some("read"), Some(&headers), None).unwrap();

        assert_eq!(
            request.headers.get(API_KEY_HEADER).map(|v| v.as_bytes()),
            Some("BVWPFFYBT97WKM959D7AVVD0M4815Y1L".as_bytes())
        );
        assert_eq!(
            request.headers.get("x-custom").map(|v| v.as_bytes()),
            Some("kept".as_bytes())
        );
    }

    #[test]
    fn test_mapping_data_travels_as_json_body_even_on_get() {
        let mut data = Param::new();
        data.insert("limit".to_string(), json!(2));
        let data = RequestData::Json(Value::Object(data));

        let request =
            build_request(&config(), "product", "GET", Some("list"), None, Some(&data)).unwrap();

        assert_eq!(request.body.as_deref(), Some(br#"{"limit":2}"#.as_ref()));
        assert_eq!(
            request.headers.get(CONTENT_TYPE).map(|v| v.as_bytes()),
            Some(b"application/json".as_ref())
        );
        assert_eq!(request.url.query(), None);
    }

    #[test]
    fn test_pair_sequence_data_travels_as_query_parameters() {
        let data = RequestData::Json(json!([["limit", 2], ["page", 1]]));

        let request =
            build_request(&config(), "product", "GET", Some("list"), None, Some(&data)).unwrap();

        assert_eq!(request.body, None);
        assert_eq!(request.url.query(), Some("limit=2&page=1"));
    }

    #[test]
    fn test_post_body_is_json_regardless_of_shape() {
        let data = RequestData::Json(json!([["k", "v"]]));
        let request =
            build_request(&config(), "product", "POST", Some("create"), None, Some(&data)).unwrap();
        assert_eq!(request.body.as_deref(), Some(br#"[["k","v"]]"#.as_ref()));
    }

    #[test]
    fn test_malformed_query_data_is_rejected() {
        let data = RequestData::Json(json!("just a string"));
        let result = build_request(&config(), "product", "GET", Some("list"), None, Some(&data));
        assert!(matches!(result, Err(PosError::InvalidArgument(_))));
    }

    #[test]
    fn test_multipart_encoding_shape() {
        let files = vec![FileUpload::new("image/png", "photo.png", b"PNGDATA".to_vec())];
        let mut options = Param::new();
        options.insert("action".to_string(), json!("create"));

        let (content_type, body) = encode_multipart_formdata(&files, Some(&options)).unwrap();
        let text = String::from_utf8(body).unwrap();

        assert!(content_type.starts_with("multipart/form-data; boundary="));
        assert!(text.contains("Content-Disposition: form-data; name=\"files[]\"; filename=\"photo.png\""));
        assert!(text.contains("Content-Type: image/png"));
        assert!(text.contains("PNGDATA"));
        assert!(text.contains("Content-Disposition: form-data; name=\"data\""));
        assert!(text.contains(r#"{"action":"create"}"#));
        assert!(text.trim_end().ends_with("--"));
    }
}
