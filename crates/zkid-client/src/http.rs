//! # HTTP Data Provider
//!
//! [`RemoteDataProvider`] over `reqwest`. Each environment has its own
//! [`EndpointConfig`]; the request timeout comes from the config of the
//! environment being queried.
//!
//! Tree endpoints serve the LeanIMT export either as a JSON-encoded string
//! or inline as nested arrays. Both forms are accepted.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use zkid_core::{
    AlternativeCscas, CircuitDnsMapping, DeployedCircuits, DocumentCategory, Environment,
};
use zkid_crypto::{FieldElement, LeanImt};

use crate::config::{endpoint, EndpointConfig};
use crate::error::ProviderError;
use crate::provider::RemoteDataProvider;
use crate::retry::retry_send;

/// `{ "status": "success", "data": ... }`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: String,
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct NullifierQuery {
    nullifier: String,
}

/// Tree, API and nullifier lookups over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDataProvider {
    http: reqwest::Client,
    prod: EndpointConfig,
    staging: EndpointConfig,
}

impl HttpDataProvider {
    pub fn new(prod: EndpointConfig, staging: EndpointConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|source| ProviderError::Http {
                endpoint: "client build".into(),
                source,
            })?;
        Ok(Self {
            http,
            prod,
            staging,
        })
    }

    /// Both environments served by the same endpoints (for testing).
    pub fn single(config: EndpointConfig) -> Result<Self, ProviderError> {
        Self::new(config.clone(), config)
    }

    fn config(&self, env: Environment) -> &EndpointConfig {
        match env {
            Environment::Prod => &self.prod,
            Environment::Staging => &self.staging,
        }
    }

    async fn get<T: DeserializeOwned>(&self, env: Environment, url: String) -> Result<T, ProviderError> {
        let timeout = Duration::from_secs(self.config(env).timeout_secs);
        let resp = retry_send(&url, || self.http.get(&url).timeout(timeout).send())
            .await
            .map_err(|source| ProviderError::Http {
                endpoint: url.clone(),
                source,
            })?;
        unwrap_envelope(url, resp).await
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        env: Environment,
        url: String,
        body: &B,
    ) -> Result<T, ProviderError> {
        let timeout = Duration::from_secs(self.config(env).timeout_secs);
        let resp = retry_send(&url, || {
            self.http.post(&url).timeout(timeout).json(body).send()
        })
        .await
        .map_err(|source| ProviderError::Http {
            endpoint: url.clone(),
            source,
        })?;
        unwrap_envelope(url, resp).await
    }

    async fn tree(
        &self,
        env: Environment,
        base: &str,
        category: DocumentCategory,
    ) -> Result<LeanImt, ProviderError> {
        let path = match category {
            DocumentCategory::Passport => base.to_string(),
            DocumentCategory::IdCard => format!("{base}-id"),
        };
        let url = endpoint(&self.config(env).tree_url, &path);
        let data: serde_json::Value = self.get(env, url.clone()).await?;
        let imported = match &data {
            serde_json::Value::String(export) => LeanImt::import(export),
            other => LeanImt::import(&other.to_string()),
        };
        let tree = imported.map_err(|source| ProviderError::Tree {
            endpoint: url.clone(),
            source,
        })?;
        tracing::debug!(endpoint = %url, size = tree.size(), "tree imported");
        Ok(tree)
    }
}

async fn unwrap_envelope<T: DeserializeOwned>(
    url: String,
    resp: reqwest::Response,
) -> Result<T, ProviderError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ProviderError::Api {
            endpoint: url,
            status: status.as_u16(),
            body,
        });
    }
    let envelope: Envelope<T> = resp.json().await.map_err(|e| ProviderError::Deserialization {
        endpoint: url.clone(),
        reason: e.to_string(),
    })?;
    if envelope.status != "success" {
        return Err(ProviderError::Api {
            endpoint: url,
            status: status.as_u16(),
            body: envelope
                .message
                .unwrap_or_else(|| format!("status {}", envelope.status)),
        });
    }
    envelope.data.ok_or_else(|| ProviderError::Deserialization {
        endpoint: url,
        reason: "missing data field".into(),
    })
}

#[async_trait]
impl RemoteDataProvider for HttpDataProvider {
    async fn commitment_tree(
        &self,
        env: Environment,
        category: DocumentCategory,
    ) -> Result<LeanImt, ProviderError> {
        self.tree(env, "identity", category).await
    }

    async fn dsc_tree(
        &self,
        env: Environment,
        category: DocumentCategory,
    ) -> Result<LeanImt, ProviderError> {
        self.tree(env, "dsc", category).await
    }

    async fn csca_tree(
        &self,
        env: Environment,
        category: DocumentCategory,
    ) -> Result<LeanImt, ProviderError> {
        self.tree(env, "csca", category).await
    }

    async fn deployed_circuits(&self, env: Environment) -> Result<DeployedCircuits, ProviderError> {
        let url = endpoint(&self.config(env).api_url, "deployed-circuits");
        self.get(env, url).await
    }

    async fn circuit_dns_mapping(
        &self,
        env: Environment,
    ) -> Result<CircuitDnsMapping, ProviderError> {
        let url = endpoint(&self.config(env).api_url, "circuit-dns-mapping");
        self.get(env, url).await
    }

    async fn alternative_cscas(
        &self,
        env: Environment,
        category: DocumentCategory,
    ) -> Result<AlternativeCscas, ProviderError> {
        let url = endpoint(
            &self.config(env).api_url,
            &format!("alternative-csca/{}", category.as_str()),
        );
        self.get(env, url).await
    }

    async fn is_nullifier_onchain(
        &self,
        env: Environment,
        nullifier: &FieldElement,
    ) -> Result<bool, ProviderError> {
        let url = endpoint(&self.config(env).api_url, "is-nullifier-onchain");
        let query = NullifierQuery {
            nullifier: nullifier.to_string(),
        };
        self.post(env, url, &query).await
    }
}
