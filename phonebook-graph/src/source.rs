//! Where `allPersonsApi` reads people from.
//!
//! By default that is the local store. When a persons api is configured, people are fetched from
//! it on every request instead; its failures are handed back to the caller untouched.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::configuration::PersonsApi;
use crate::error::FetchError;
use crate::person::Person;
use crate::store::PersonStore;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PersonSource: Send + Sync + 'static {
    /// Every person the source knows about, in its own order.
    async fn fetch_persons(&self) -> Result<Vec<Person>, FetchError>;
}

/// Reads straight from the store.
#[derive(Clone, Debug)]
pub struct LocalSource {
    store: Arc<PersonStore>,
}

impl LocalSource {
    pub fn new(store: Arc<PersonStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PersonSource for LocalSource {
    async fn fetch_persons(&self) -> Result<Vec<Person>, FetchError> {
        Ok(self.store.snapshot())
    }
}

/// Fetches a JSON array of person records with a `GET`.
#[derive(Clone, Debug)]
pub struct RestSource {
    client: Client,
    url: Url,
}

impl RestSource {
    pub fn new(config: &PersonsApi) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| FetchError::Client {
                reason: err.to_string(),
            })?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl PersonSource for RestSource {
    async fn fetch_persons(&self) -> Result<Vec<Person>, FetchError> {
        let url = self.url.to_string();
        tracing::debug!(%url, "fetching persons");

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|err| FetchError::Request {
                url: url.clone(),
                reason: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        response
            .json::<Vec<Person>>()
            .await
            .map_err(|err| FetchError::MalformedResponse {
                url,
                reason: err.to_string(),
            })
    }
}
