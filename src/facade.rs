use serde::Serialize;
use std::sync::Arc;

use crate::error::Result;
use crate::options::Param;
use crate::response::Envelope;
use crate::rest::PosWebService;

/// How a resource spells its endpoints on the wire.
///
/// Two generations of the service coexist: one embeds the action in the
/// path handed to the dispatcher (`product/list`), the other passes the
/// action separately and lets the request builder append the segment.
/// Both spellings must produce identical requests; `tests/` asserts the
/// equivalence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointStyle {
    /// `resource/action` built into the URI string
    PathAction,
    /// `resource` plus a separate action argument
    ActionParam,
}

/// Resources the service exposes, with the endpoint style each one
/// historically uses.
pub(crate) const REGISTERED_RESOURCES: &[(&str, EndpointStyle)] = &[
    ("store", EndpointStyle::ActionParam),
    ("category", EndpointStyle::PathAction),
    ("product", EndpointStyle::PathAction),
    ("user", EndpointStyle::PathAction),
    ("invoice", EndpointStyle::ActionParam),
    ("order", EndpointStyle::ActionParam),
];

/// Cached registry entry backing a facade handle.
#[derive(Debug)]
pub(crate) struct ResourceEntry {
    pub(crate) name: String,
    pub(crate) style: EndpointStyle,
}

/// Thin per-resource surface over the dispatcher.
///
/// Obtained from [`PosWebService::resource`] or the typed accessors;
/// every verb forwards to the single execute path with a fixed endpoint
/// and HTTP verb.
#[derive(Clone)]
pub struct Facade<'a> {
    pub(crate) ws: &'a PosWebService,
    pub(crate) entry: Arc<ResourceEntry>,
}

impl<'a> Facade<'a> {
    /// Resource name this facade addresses
    pub fn name(&self) -> &str {
        &self.entry.name
    }

    /// Endpoint style this facade uses on the wire
    pub fn style(&self) -> EndpointStyle {
        self.entry.style
    }

    fn call(&self, action: &str, method: &str, data: Option<Param>) -> Result<Envelope> {
        match self.entry.style {
            EndpointStyle::PathAction => {
                let uri = format!("{}/{}", self.entry.name, action);
                self.ws.execute_map(&uri, method, None, data, None)
            }
            EndpointStyle::ActionParam => {
                self.ws
                    .execute_map(&self.entry.name, method, Some(action), data, None)
            }
        }
    }

    fn prepared(&self, action: &str, method: &str, options: impl Into<Param>) -> Result<Envelope> {
        let options = crate::rest::prepare_options(options.into())?;
        self.call(action, method, Some(options))
    }

    /// Create a record from a full data mapping (POST)
    pub fn create<P>(&self, data: P) -> Result<Envelope>
    where
        P: Serialize,
    {
        let data = crate::rest::serialize_content(data)?;
        self.call("create", "POST", Some(data))
    }

    /// Read a record; options select which (GET)
    pub fn read(&self, options: impl Into<Param>) -> Result<Envelope> {
        self.prepared("read", "GET", options)
    }

    /// Modify a record; the mapping carries the changed fields (PUT)
    pub fn update<P>(&self, data: P) -> Result<Envelope>
    where
        P: Serialize,
    {
        let data = crate::rest::serialize_content(data)?;
        self.call("update", "PUT", Some(data))
    }

    /// Delete records addressed by the options (POST)
    pub fn delete(&self, options: impl Into<Param>) -> Result<Envelope> {
        self.prepared("delete", "POST", options)
    }

    /// List records matching the options (GET)
    pub fn list(&self, options: impl Into<Param>) -> Result<Envelope> {
        self.prepared("list", "GET", options)
    }
}
