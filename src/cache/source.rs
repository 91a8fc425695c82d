//! Where reference data comes from on a cache miss.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::CacheFetchError;

/// One SAP client, as listed by `GET /sap/clients`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub nomecliente: String,
}

/// One SAP system id of a client, as listed by `GET /sap/sids`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidRecord {
    pub sid: String,
    pub nomecliente: String,
}

/// Network side of the reference cache
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    async fn fetch_clients(&self) -> Result<Vec<ClientRecord>, CacheFetchError>;

    async fn fetch_sids(&self, client_name: &str) -> Result<Vec<SidRecord>, CacheFetchError>;
}

/// [`ReferenceSource`] over the dashboard HTTP API
#[derive(Clone)]
pub struct HttpReferenceSource {
    client: Client,
    base_url: String,
}

impl HttpReferenceSource {
    /// Fails only if the TLS backend cannot be initialized
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CacheFetchError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CacheFetchError::Request {
                url: base_url.clone(),
                message: e.to_string(),
            })?;
        Ok(HttpReferenceSource { client, base_url })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CacheFetchError> {
        let url = self.api_url(path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| CacheFetchError::Request {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CacheFetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CacheFetchError::Decode {
                url,
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl ReferenceSource for HttpReferenceSource {
    async fn fetch_clients(&self) -> Result<Vec<ClientRecord>, CacheFetchError> {
        self.get_json("/sap/clients", &[]).await
    }

    async fn fetch_sids(&self, client_name: &str) -> Result<Vec<SidRecord>, CacheFetchError> {
        self.get_json("/sap/sids", &[("clientName", client_name)])
            .await
    }
}
