//! Agent API client.
//!
//! This module provides the layers between a caller and the game server,
//! leaf first:
//!
//! - `transport` - The [`Transport`] trait and its `reqwest` implementation
//! - `errors` - Mapping of transport failures to [`crate::ClientError`]
//! - `retry` - The [`RetryPolicy`] wrapping idempotent requests
//! - `client` - The async session facade [`GameClient`]
//! - `blocking` - The blocking session facade [`BlockingGameClient`]
//!
//! # Retries
//!
//! Only reads (`get`, `list`, `health`) are retried. `create`, `act` and
//! `abandon` change the game state server-side and are sent exactly once;
//! their failures are returned to the caller as is.

mod blocking;
mod client;
mod errors;
mod retry;
mod transport;

pub use crate::api::blocking::{BlockingGameClient, GameIter};
pub use crate::api::client::{DEFAULT_PAGE_SIZE, GameClient, ListQuery};
pub use crate::api::errors::{decode, map_transport_error};
pub use crate::api::retry::RetryPolicy;
pub use crate::api::transport::{
    ApiRequest, HttpTransport, MockTransport, RawResponse, Transport, TransportError, USER_AGENT,
};
