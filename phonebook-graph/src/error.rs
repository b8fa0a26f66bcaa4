//! Phonebook errors.

use std::net::SocketAddr;

use async_graphql::ErrorExtensions;
use displaydoc::Display;
use thiserror::Error;

pub use crate::configuration::ConfigurationError;

/// Errors raised while resolving an operation.
///
/// Looking up somebody who isn't there is not an error: those operations resolve to `null`.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DirectoryError {
    /// Name must be unique
    DuplicateName {
        /// The rejected name.
        name: String,
    },

    /// {0}
    Fetch(#[from] FetchError),
}

impl DirectoryError {
    pub fn extension_code(&self) -> &'static str {
        match self {
            DirectoryError::DuplicateName { .. } => "BAD_USER_INPUT",
            DirectoryError::Fetch(_) => "FETCH_ERROR",
        }
    }
}

impl ErrorExtensions for DirectoryError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_, extensions| {
            extensions.set("code", self.extension_code());
            match self {
                DirectoryError::DuplicateName { name } => {
                    extensions.set("invalidArgs", name.as_str());
                }
                DirectoryError::Fetch(error) => {
                    if let Some(url) = error.url() {
                        extensions.set("url", url);
                    }
                }
            }
        })
    }
}

/// Errors from the remote persons api.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FetchError {
    /// could not build the http client: {reason}
    Client { reason: String },

    /// HTTP fetch failed from '{url}': {reason}
    Request { url: String, reason: String },

    /// '{url}' answered with status {status}
    Status { url: String, status: u16 },

    /// response from '{url}' was malformed: {reason}
    MalformedResponse { url: String, reason: String },
}

impl FetchError {
    pub fn url(&self) -> Option<&str> {
        match self {
            FetchError::Client { .. } => None,
            FetchError::Request { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::MalformedResponse { url, .. } => Some(url),
        }
    }
}

/// Errors that stop the server.
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum ServerError {
    /// could not create the persons source: {0}
    Source(#[from] FetchError),

    /// could not build the http router: {0}
    Configuration(#[from] ConfigurationError),

    /// could not listen on {listen}: {source}
    Bind {
        listen: SocketAddr,
        source: std::io::Error,
    },

    /// http server failed: {0}
    Serve(std::io::Error),
}
