use reqwest::header::HeaderMap;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::client::{create_pos_client, Config};
use crate::error::{PosError, Result};
use crate::facade::{EndpointStyle, Facade, ResourceEntry, REGISTERED_RESOURCES};
use crate::options::{self, Param};
use crate::request::{self, FileUpload, RequestData, RequestDescriptor};
use crate::response::{self, Envelope, ResourceId};

/// Read timeout applied when the caller doesn't override it.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the Pos web service.
///
/// Every verb, facade and calling convention funnels through the single
/// [`execute`](PosWebService::execute) path: option validation and date
/// normalization happen before any network I/O, the outgoing data is
/// stamped with a fresh timestamp, and the completed exchange is
/// normalized into an [`Envelope`] or a typed error.
pub struct PosWebService {
    client: reqwest::blocking::Client,
    config: Config,
    facades: Mutex<HashMap<String, Arc<ResourceEntry>>>,
}

impl PosWebService {
    /// Create a client for the service at `base_url`, authenticating with
    /// `api_key`
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_config(Config::new(base_url, api_key))
    }

    /// Create a client with an explicit configuration
    pub fn with_config(config: Config) -> Self {
        PosWebService {
            client: create_pos_client(),
            config,
            facades: Mutex::new(HashMap::new()),
        }
    }

    /// The active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Execute one request against the service.
    ///
    /// Data-less GET/HEAD calls receive the default pagination object; an
    /// explicitly empty mapping is honored as-is. A `timeout` key in the
    /// data is consumed (it never travels over the wire) and overrides
    /// the 10 second default. The fresh `timestamp` parameter wins over
    /// any caller-supplied one. Connection-level failures surface as
    /// [`PosError::Transport`]; everything the server actually answered
    /// goes through response normalization instead.
    pub fn execute(
        &self,
        uri: &str,
        method: &str,
        action: Option<&str>,
        data: Option<RequestData>,
        add_headers: Option<HeaderMap>,
    ) -> Result<Envelope> {
        let method_name = method.to_uppercase();
        let mut data = apply_defaults(&method_name, data);

        let mut timeout = DEFAULT_TIMEOUT;
        if let Some(RequestData::Json(value)) = &mut data {
            if let Some(explicit) = take_timeout(value)? {
                timeout = explicit;
            }
            merge_parameter(value, "timestamp", json!(make_timestamp()));
            if self.config.debug {
                merge_parameter(value, "debug", json!(true));
            }
        }

        let request = request::build_request(
            &self.config,
            uri,
            &method_name,
            action,
            add_headers.as_ref(),
            data.as_ref(),
        )?;

        if self.config.verbose {
            eprintln!("[pos] {} {}", request.method, request.url);
        }

        let RequestDescriptor {
            method: http_method,
            url,
            headers,
            body,
        } = request;

        let mut builder = self
            .client
            .request(http_method.clone(), url)
            .timeout(timeout)
            .headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let start = Instant::now();
        let http_response = builder.send()?;
        let status = http_response.status();
        let response_headers = http_response.headers().clone();
        let body = http_response.text()?;

        if self.config.debug {
            eprintln!(
                "[pos] {} {} => {:?} (status: {})",
                http_method,
                uri,
                start.elapsed(),
                status
            );
        }

        response::build_response(&http_method, status, &response_headers, &body)
    }

    /// Execute with mapping data; the shape every verb and facade uses
    pub(crate) fn execute_map(
        &self,
        uri: &str,
        method: &str,
        action: Option<&str>,
        data: Option<Param>,
        add_headers: Option<HeaderMap>,
    ) -> Result<Envelope> {
        let data = data.map(|map| RequestData::Json(Value::Object(map)));
        self.execute(uri, method, action, data, add_headers)
    }

    /// Retrieve resources matching the options; a clearer name for a GET
    /// without an id
    pub fn search(&self, resource: &str, options: impl Into<Param>) -> Result<Envelope> {
        self.get(resource, None, options)
    }

    /// Retrieve (GET) a resource.
    ///
    /// The options must name the server-side `action`; the optional id is
    /// merged into the options before dispatch.
    pub fn get(
        &self,
        resource: &str,
        resource_id: Option<i64>,
        options: impl Into<Param>,
    ) -> Result<Envelope> {
        self.retrieve(resource, "GET", resource_id, options.into())
    }

    /// Probe (HEAD) a resource; surfaces the response headers
    pub fn head(
        &self,
        resource: &str,
        resource_id: Option<i64>,
        options: impl Into<Param>,
    ) -> Result<Envelope> {
        self.retrieve(resource, "HEAD", resource_id, options.into())
    }

    fn retrieve(
        &self,
        resource: &str,
        method: &str,
        resource_id: Option<i64>,
        options: Param,
    ) -> Result<Envelope> {
        let mut options = prepare_options(options)?;
        if let Some(id) = resource_id {
            options.insert("id".to_string(), json!(id));
        }
        let action = required_action(&options, method, resource)?;
        self.execute_map(resource, method, Some(&action), Some(options), None)
    }

    /// Create (POST) a resource.
    ///
    /// `content` is the record to create, merged over the validated
    /// options; the options must name the `action`.
    pub fn add<P>(&self, resource: &str, content: P, options: impl Into<Param>) -> Result<Envelope>
    where
        P: Serialize,
    {
        let mut options = prepare_options(options.into())?;
        let action = required_action(&options, "POST", resource)?;
        for (key, value) in serialize_content(content)? {
            options.insert(key, value);
        }
        self.execute_map(resource, "POST", Some(&action), Some(options), None)
    }

    /// Create (POST) a resource with attached files, as multipart
    /// form-data.
    ///
    /// The merged content and options travel as a JSON `data` part next
    /// to the `files[]` parts.
    pub fn add_with_files<P>(
        &self,
        resource: &str,
        files: &[FileUpload],
        content: P,
        options: impl Into<Param>,
    ) -> Result<Envelope>
    where
        P: Serialize,
    {
        let mut options = prepare_options(options.into())?;
        let action = required_action(&options, "POST", resource)?;
        for (key, value) in serialize_content(content)? {
            options.insert(key, value);
        }
        let (content_type, body) = request::encode_multipart_formdata(files, Some(&options))?;
        self.execute(
            resource,
            "POST",
            Some(&action),
            Some(RequestData::Multipart { content_type, body }),
            None,
        )
    }

    /// Edit a resource. The changed fields are merged over the validated
    /// options; edits go over the wire as POST, which is what the live
    /// service accepts.
    pub fn edit<P>(&self, resource: &str, content: P, options: impl Into<Param>) -> Result<Envelope>
    where
        P: Serialize,
    {
        let mut options = prepare_options(options.into())?;
        for (key, value) in serialize_content(content)? {
            options.insert(key, value);
        }
        let action = required_action(&options, "UPDATE", resource)?;
        self.execute_map(resource, "POST", Some(&action), Some(options), None)
    }

    /// Delete (DELETE) one or more resources by id
    pub fn delete(&self, resource: &str, ids: &[i64]) -> Result<Envelope> {
        let mut body = Param::new();
        body.insert("id".to_string(), json!(ids));
        self.execute_map(resource, "DELETE", Some("delete"), Some(body), None)
    }

    /// Check (POST) that a path answers at all
    pub fn connect(&self, resource: &str) -> Result<Envelope> {
        self.execute(resource, "POST", None, None, None)
    }

    /// Facade for a registered resource name
    pub fn resource(&self, name: &str) -> Result<Facade<'_>> {
        let style = REGISTERED_RESOURCES
            .iter()
            .find(|(registered, _)| *registered == name)
            .map(|(_, style)| *style)
            .ok_or_else(|| PosError::InvalidArgument(format!("unknown resource: {}", name)))?;
        Ok(self.cached_facade(name, style))
    }

    fn registered(&self, name: &'static str) -> Facade<'_> {
        self.resource(name)
            .expect("name is in the resource registry")
    }

    fn cached_facade(&self, name: &str, style: EndpointStyle) -> Facade<'_> {
        let mut cache = self
            .facades
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = cache
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(ResourceEntry {
                    name: name.to_string(),
                    style,
                })
            })
            .clone();
        drop(cache);
        Facade { ws: self, entry }
    }

    /// Product facade
    pub fn product(&self) -> Facade<'_> {
        self.registered("product")
    }

    /// Category facade
    pub fn category(&self) -> Facade<'_> {
        self.registered("category")
    }

    /// Order facade
    pub fn order(&self) -> Facade<'_> {
        self.registered("order")
    }

    /// User facade
    pub fn user(&self) -> Facade<'_> {
        self.registered("user")
    }

    /// Store facade
    pub fn store(&self) -> Facade<'_> {
        self.registered("store")
    }

    /// Invoice facade
    pub fn invoice(&self) -> Facade<'_> {
        self.registered("invoice")
    }
}

/// Validate an option mapping and normalize its date bounds. Runs before
/// any network I/O, on a copy owned by the verb layer.
pub(crate) fn prepare_options(options: Param) -> Result<Param> {
    let mut options = options;
    options::validate_query_options(&options)?;
    options::normalize_date_option(&mut options)?;
    Ok(options)
}

/// Serialize record content into a mapping
pub(crate) fn serialize_content<P>(content: P) -> Result<Param>
where
    P: Serialize,
{
    match serde_json::to_value(content)? {
        Value::Object(map) => Ok(map),
        _ => Err(PosError::InvalidArgument(
            "record content must serialize to a mapping".to_string(),
        )),
    }
}

fn required_action(options: &Param, method: &str, resource: &str) -> Result<String> {
    match options.get("action").and_then(Value::as_str) {
        Some(action) => Ok(action.to_string()),
        None => Err(PosError::InvalidArgument(format!(
            "options of {} {} must have a specific action",
            method, resource
        ))),
    }
}

/// Substitute the default pagination object for data-less GET/HEAD calls.
/// An explicitly supplied mapping, even an empty one, is kept as-is.
fn apply_defaults(method: &str, data: Option<RequestData>) -> Option<RequestData> {
    if data.is_none() && (method == "GET" || method == "HEAD") {
        return Some(RequestData::Json(Value::Object(options::default_options())));
    }
    data
}

fn make_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs() as i64
}

/// Pull a `timeout` key out of the outgoing data; it configures the
/// transport and never travels over the wire.
fn take_timeout(data: &mut Value) -> Result<Option<Duration>> {
    let taken = match data {
        Value::Object(map) => map.remove("timeout"),
        _ => None,
    };
    match taken {
        None => Ok(None),
        Some(value) => {
            if let Some(secs) = value.as_u64() {
                Ok(Some(Duration::from_secs(secs)))
            } else if let Some(secs) = value.as_f64() {
                Duration::try_from_secs_f64(secs).map(Some).map_err(|_| {
                    PosError::InvalidArgument("timeout must be a positive number of seconds".to_string())
                })
            } else {
                Err(PosError::InvalidArgument(
                    "timeout must be a number of seconds".to_string(),
                ))
            }
        }
    }
}

/// Merge a reserved parameter into outgoing data, whatever its shape.
/// The merged value wins over a caller-supplied one.
fn merge_parameter(data: &mut Value, key: &str, value: Value) {
    match data {
        Value::Object(map) => {
            map.insert(key.to_string(), value);
        }
        Value::Array(pairs) => {
            pairs.retain(|pair| pair.get(0).and_then(Value::as_str) != Some(key));
            pairs.push(json!([key, value]));
        }
        _ => {}
    }
}

/// Variant of the client whose `search` returns plain identifier lists
/// instead of full envelopes, plus the partial create/edit helpers built
/// on top of the blank-envelope convention.
pub struct PosWebServiceDict {
    inner: PosWebService,
}

impl PosWebServiceDict {
    /// Create an id-flavored client
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        PosWebServiceDict {
            inner: PosWebService::new(base_url, api_key),
        }
    }

    /// Create an id-flavored client with an explicit configuration
    pub fn with_config(config: Config) -> Self {
        PosWebServiceDict {
            inner: PosWebService::with_config(config),
        }
    }

    /// The full client underneath the id-flavored surface
    pub fn client(&self) -> &PosWebService {
        &self.inner
    }

    /// Search and reduce the hits to their identifiers, response order
    /// preserved.
    pub fn search(&self, resource: &str, options: impl Into<Param>) -> Result<Vec<ResourceId>> {
        let envelope = self.inner.search(resource, options)?;
        match envelope.data() {
            Some(value) => response::extract_ids(value),
            None => Err(PosError::UnparsableResponse(
                "search returned no JSON payload".to_string(),
            )),
        }
    }

    /// Create a record from a partial one: fetch the blank envelope and
    /// merge the caller's fields over it.
    pub fn partial_add(&self, resource: &str, fields: Param) -> Result<Envelope> {
        let mut read_options = Param::new();
        read_options.insert("action".to_string(), json!("read"));
        read_options.insert("page".to_string(), json!("blank"));
        let blank = self.inner.get(resource, None, read_options)?;

        let mut content = match blank {
            Envelope::Data(Value::Object(map)) => map,
            _ => {
                return Err(PosError::UnparsableResponse(
                    "blank envelope is not a mapping".to_string(),
                ))
            }
        };
        for (key, value) in fields {
            content.insert(key, value);
        }

        let mut options = Param::new();
        options.insert("action".to_string(), json!("create"));
        self.inner.add(resource, Value::Object(content), options)
    }

    /// Edit only some fields of a record: read it, merge the fields in,
    /// write it back. Costs an extra read.
    pub fn partial_edit(&self, resource: &str, resource_id: i64, fields: Param) -> Result<Envelope> {
        let mut read_options = Param::new();
        read_options.insert("action".to_string(), json!("read"));
        let current = self.inner.get(resource, Some(resource_id), read_options)?;

        let mut content = match current {
            Envelope::Data(Value::Object(map)) => map,
            _ => {
                return Err(PosError::UnparsableResponse(
                    "record envelope is not a mapping".to_string(),
                ))
            }
        };
        for (key, value) in fields {
            match (content.get_mut(&key), value) {
                (Some(Value::Object(existing)), Value::Object(incoming)) => {
                    for (sub_key, sub_value) in incoming {
                        existing.insert(sub_key, sub_value);
                    }
                }
                (Some(slot), value) => {
                    *slot = value;
                }
                // fields outside the record shape are dropped; the read
                // envelope is authoritative for what the record contains
                (None, _) => {}
            }
        }

        let mut options = Param::new();
        options.insert("action".to_string(), json!("update"));
        self.inner.edit(resource, Value::Object(content), options)
    }
}
