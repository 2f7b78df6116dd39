//! Blocking client for the Exotel telephony REST API.
//!
//! # Overview
//! Places calls, connects callers to flows, looks up calls and phone numbers,
//! and manages users and their devices. Responses are returned as opaque
//! `serde_json::Value`s; failures come back as a typed `ApiError`.
//!
//! # Design
//! - `ExotelApi` is stateless: it turns typed inputs into `HttpRequest` values
//!   and `HttpResponse` values into JSON, without touching the network.
//! - `ExotelClient` pairs it with an `HttpTransport` (ureq by default) and
//!   issues exactly one request per operation.
//! - Authentication is an `Authorization: Basic` header built from the
//!   credentials; secrets never appear in URLs or log events.
//!
//! ```no_run
//! use exotel_core::{CallRequest, Credentials, ExotelClient};
//!
//! let creds = Credentials::new("key", "secret", "acme1", "api.exotel.com");
//! let client = ExotelClient::new(&creds)?;
//! let call = client.place_call(&CallRequest::new("+919000000001", "+919000000002", "08030000000"))?;
//! println!("{}", call["Call"]["Sid"]);
//! # Ok::<(), exotel_core::ApiError>(())
//! ```

pub mod api;
pub mod client;
pub mod credentials;
pub mod error;
pub mod http;
pub mod types;

pub use api::{flow_url, ExotelApi};
pub use client::ExotelClient;
pub use credentials::Credentials;
pub use error::{ApiError, ErrorKind, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, UreqTransport};
pub use types::{CallRequest, DeviceStatus, FlowRequest, NewUser, UserUpdate, DEFAULT_ROLE, MAX_TIME_LIMIT};
