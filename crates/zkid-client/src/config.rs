//! Endpoint configuration.
//!
//! One `EndpointConfig` per environment. Defaults point to the hosted
//! services; override via environment variables or explicit construction for
//! self-hosted deployments and tests.

use url::Url;

use zkid_core::Environment;

/// Base URLs and timeout for one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Tree service (identity / DSC / CSCA trees).
    pub tree_url: Url,
    /// API service (circuits, DNS mapping, alternative CSCAs, nullifiers).
    pub api_url: Url,
    /// Proof status WebSocket (Socket.IO) endpoint.
    pub status_url: Url,
    /// Per-request HTTP timeout in seconds.
    pub timeout_secs: u64,
}

const DEFAULT_TIMEOUT_SECS: u64 = 30;

fn defaults(env: Environment) -> (&'static str, &'static str, &'static str) {
    match env {
        Environment::Prod => (
            "https://tree.zkid.dev",
            "https://api.zkid.dev",
            "wss://status.zkid.dev",
        ),
        Environment::Staging => (
            "https://tree.staging.zkid.dev",
            "https://api.staging.zkid.dev",
            "wss://status.staging.zkid.dev",
        ),
    }
}

impl EndpointConfig {
    /// Hosted defaults for `env`.
    pub fn for_environment(env: Environment) -> Result<Self, ConfigError> {
        let (tree, api, status) = defaults(env);
        Ok(Self {
            tree_url: parse_url("tree_url", tree)?,
            api_url: parse_url("api_url", api)?,
            status_url: parse_url("status_url", status)?,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }

    /// Hosted defaults for `env`, overridden by environment variables.
    ///
    /// Variables:
    /// - `ZKID_TREE_URL`
    /// - `ZKID_API_URL`
    /// - `ZKID_STATUS_URL`
    /// - `ZKID_TIMEOUT_SECS` (default: 30)
    pub fn from_env(env: Environment) -> Result<Self, ConfigError> {
        let (tree, api, status) = defaults(env);
        Ok(Self {
            tree_url: env_url("ZKID_TREE_URL", tree)?,
            api_url: env_url("ZKID_API_URL", api)?,
            status_url: env_url("ZKID_STATUS_URL", status)?,
            timeout_secs: std::env::var("ZKID_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// All services on one local mock server (for testing).
    pub fn local_mock(base_url: &str) -> Result<Self, ConfigError> {
        let url = parse_url("local_mock", base_url)?;
        Ok(Self {
            tree_url: url.clone(),
            api_url: url.clone(),
            status_url: url,
            timeout_secs: 5,
        })
    }
}

/// Join `path` onto `base`, keeping any path prefix of the base.
pub(crate) fn endpoint(base: &Url, path: &str) -> String {
    format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn parse_url(name: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(name.to_string(), e.to_string()))
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    parse_url(var, &raw)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_and_prod_differ() {
        let prod = EndpointConfig::for_environment(Environment::Prod).unwrap();
        let staging = EndpointConfig::for_environment(Environment::Staging).unwrap();
        assert_ne!(prod.tree_url, staging.tree_url);
        assert_ne!(prod.status_url, staging.status_url);
        assert_eq!(prod.timeout_secs, 30);
    }

    #[test]
    fn local_mock_points_everything_at_one_server() {
        let cfg = EndpointConfig::local_mock("http://127.0.0.1:9000").unwrap();
        assert_eq!(cfg.tree_url.as_str(), "http://127.0.0.1:9000/");
        assert_eq!(cfg.api_url, cfg.tree_url);
        assert_eq!(cfg.timeout_secs, 5);
    }

    #[test]
    fn endpoint_join_handles_slashes() {
        let base = Url::parse("http://127.0.0.1:9000/").unwrap();
        assert_eq!(endpoint(&base, "/identity"), "http://127.0.0.1:9000/identity");
        let prefixed = Url::parse("https://api.example/v2/").unwrap();
        assert_eq!(
            endpoint(&prefixed, "deployed-circuits"),
            "https://api.example/v2/deployed-circuits"
        );
    }

    #[test]
    fn env_url_uses_default_when_var_absent() {
        let url = env_url("ZKID_NONEXISTENT_VAR_12345", "https://example.com").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn env_url_rejects_invalid_url() {
        std::env::set_var("ZKID_TEST_BAD_URL", "not a url");
        let result = env_url("ZKID_TEST_BAD_URL", "https://example.com");
        std::env::remove_var("ZKID_TEST_BAD_URL");
        assert!(result.is_err());
    }
}
