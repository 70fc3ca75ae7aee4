//! Mapping of transport failures to [`ClientError`] and decoding of
//! successful payloads.

use std::collections::BTreeMap;

use log::warn;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    api::transport::{RawResponse, TransportError},
    error::ClientError,
    models::Outcome,
};

/// Error body sent by the server alongside non-2xx statuses.
#[derive(Deserialize, Debug, Default)]
struct ErrorBody {
    error: Option<String>,
    details: Option<BTreeMap<String, Vec<String>>>,
    code: Option<String>,
    outcome: Option<Value>,
}

/// Converts a transport failure into the client error taxonomy.
///
/// | transport failure      | error                              |
/// |------------------------|------------------------------------|
/// | network                | [`ClientError::Network`]           |
/// | 400, 422               | [`ClientError::Validation`]        |
/// | 401, 403               | [`ClientError::Auth`]              |
/// | 404                    | [`ClientError::NotFound`]          |
/// | 409 with an outcome    | [`ClientError::GameOver`]          |
/// | 429                    | [`ClientError::RateLimited`]       |
/// | 5xx                    | [`ClientError::Server`]            |
/// | other statuses         | [`ClientError::UnexpectedStatus`]  |
/// | malformed 2xx body     | [`ClientError::Protocol`]          |
pub fn map_transport_error(error: TransportError) -> ClientError {
    match error {
        TransportError::Network(reason) => ClientError::Network(reason),
        TransportError::Decode(reason) => ClientError::Protocol(reason),
        TransportError::Http {
            status,
            body,
            retry_after,
        } => map_status(status, body, retry_after),
    }
}

fn map_status(status: u16, body: String, retry_after: Option<std::time::Duration>) -> ClientError {
    let parsed = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => parsed,
        Err(_) => {
            if !body.is_empty() {
                warn!("failed to parse error response as JSON (status={})", status);
            }
            ErrorBody::default()
        }
    };
    let message = parsed.error.unwrap_or_else(|| {
        if body.trim().is_empty() {
            "Unknown error".to_owned()
        } else {
            body.clone()
        }
    });

    match status {
        400 | 422 => ClientError::Validation {
            status: Some(status),
            message,
            code: parsed.code,
            details: parsed.details,
            body,
        },
        401 | 403 => ClientError::Auth {
            status,
            message,
            body,
        },
        404 => ClientError::NotFound { message, body },
        409 => match parsed.outcome {
            Some(outcome) => match serde_json::from_value::<Outcome>(outcome) {
                Ok(outcome) if outcome.is_terminal() => ClientError::GameOver {
                    message,
                    outcome,
                    body,
                },
                Ok(_) => ClientError::Protocol(format!(
                    "conflict response carries a non-terminal outcome: {}",
                    body
                )),
                Err(e) => ClientError::Protocol(format!("invalid outcome in conflict response: {}", e)),
            },
            None => ClientError::UnexpectedStatus {
                status,
                message,
                body,
            },
        },
        429 => ClientError::RateLimited {
            message,
            retry_after,
            body,
        },
        500..=599 => ClientError::Server {
            status,
            message,
            body,
        },
        _ => ClientError::UnexpectedStatus {
            status,
            message,
            body,
        },
    }
}

/// Decodes a successful payload into `T`.
///
/// A payload that does not match the schema is a [`ClientError::Protocol`]:
/// the client and the server disagree on the wire format.
pub fn decode<T: DeserializeOwned>(response: RawResponse) -> Result<T, ClientError> {
    serde_json::from_value(response.body).map_err(|e| {
        ClientError::Protocol(format!(
            "unexpected {} payload: {}",
            std::any::type_name::<T>().rsplit("::").next().unwrap_or("response"),
            e
        ))
    })
}
