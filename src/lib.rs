//! # posrs - Pos web service client for Rust
//!
//! A Rust client for the Pos point-of-sale REST web service. The library
//! provides uniform CRUD-style calls (create, read, update, delete, list,
//! search) against the service's resources (product, category, order,
//! user, store, invoice), with API key authentication, JSON bodies and a
//! validated query-option vocabulary.
//!
//! ## Features
//!
//! - Single dispatch path for every call: options are validated and date
//!   bounds normalized before any network I/O, outgoing data is stamped
//!   with a fresh timestamp, and responses are normalized into a uniform
//!   envelope
//! - Typed error taxonomy: authentication failures, upstream service
//!   errors (with the service's own error code/message recovered from
//!   JSON or HTML bodies), malformed input and transport failures are
//!   distinct variants
//! - Both historical endpoint conventions (`product/list` embedded in the
//!   path vs. `order` + separate action) supported and wire-equivalent
//! - An id-flavored client variant whose `search` returns plain
//!   identifier lists
//!
//! ## Basic Usage
//!
//! ```no_run
//! use posrs::{Options, PosWebService, SortOrder};
//!
//! fn main() -> Result<(), posrs::PosError> {
//!     let ws = PosWebService::new(
//!         "http://localhost:8000/api",
//!         "BVWPFFYBT97WKM959D7AVVD0M4815Y1L",
//!     );
//!
//!     // Filtered listing through the product facade
//!     let envelope = ws.product().list(
//!         Options::new()
//!             .filter("price", "lt", 40000)
//!             .display(["name", "price", "updated_at"])
//!             .sort("price", SortOrder::Asc)
//!             .date_range("2021-10-20", "2021-11-20")
//!             .limit(2),
//!     )?;
//!     println!("{:?}", envelope.data());
//!     Ok(())
//! }
//! ```
//!
//! ## Identifier search
//!
//! ```no_run
//! use posrs::{Options, PosWebServiceDict};
//!
//! # fn main() -> Result<(), posrs::PosError> {
//! let ws = PosWebServiceDict::new("http://localhost:8000/api", "key");
//!
//! // Returns e.g. [Number(23), Number(25)]
//! let ids = ws.search("product", Options::new().action("list").limit(2))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error handling
//!
//! ```no_run
//! use posrs::{Options, PosError, PosWebService};
//!
//! # fn main() {
//! let ws = PosWebService::new("http://localhost:8000/api", "key");
//! match ws.get("product", Some(23), Options::new().action("read")) {
//!     Ok(envelope) => println!("{:?}", envelope.data()),
//!     Err(PosError::Authentication { .. }) => eprintln!("check the API key"),
//!     Err(PosError::WebService { status, pos_error_msg, .. }) => {
//!         eprintln!("service said {:?} (status {})", pos_error_msg, status)
//!     }
//!     Err(err) => eprintln!("{}", err),
//! }
//! # }
//! ```

pub mod client;
pub mod date;
pub mod error;
pub mod facade;
pub mod options;
pub mod request;
pub mod response;
pub mod rest;

// Re-export main types for convenience
pub use client::Config;
pub use date::DateLike;
pub use error::{PosError, Result};
pub use facade::{EndpointStyle, Facade};
pub use options::{Options, Param, SortOrder, SUPPORTED_OPTIONS};
pub use request::{build_request, FileUpload, RequestData, RequestDescriptor};
pub use response::{extract_ids, Envelope, ErrorRecord, ResourceId};
pub use rest::{PosWebService, PosWebServiceDict};

// Re-export serde_json for convenience
pub use serde_json::json;
