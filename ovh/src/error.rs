//! Error types specific to the OVH client

use thiserror::Error;

/// The endpoint is neither a known region name nor an `http(s)://` URL
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown OVH endpoint: {0}")]
pub struct UnknownEndpoint(pub String);
