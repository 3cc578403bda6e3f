//! Prover configuration: default environment plus the endpoints of both
//! environments. Mock documents always run against staging, so both are
//! always configured.

use url::Url;

use zkid_client::{ConfigError, EndpointConfig};
use zkid_core::{EndpointType, Environment};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProverConfig {
    /// Environment for real documents.
    pub environment: Environment,
    pub prod: EndpointConfig,
    pub staging: EndpointConfig,
}

impl ProverConfig {
    pub fn new(environment: Environment, prod: EndpointConfig, staging: EndpointConfig) -> Self {
        Self {
            environment,
            prod,
            staging,
        }
    }

    /// Hosted endpoints for both environments.
    pub fn hosted(environment: Environment) -> Result<Self, ConfigError> {
        Ok(Self::new(
            environment,
            EndpointConfig::for_environment(Environment::Prod)?,
            EndpointConfig::for_environment(Environment::Staging)?,
        ))
    }

    /// Like [`hosted`](Self::hosted), with `ZKID_ENVIRONMENT` (`prod` or
    /// `staging`, default `prod`) selecting the environment whose endpoints
    /// the `ZKID_*_URL` variables override.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match std::env::var("ZKID_ENVIRONMENT").ok().as_deref() {
            Some("staging") => Environment::Staging,
            _ => Environment::Prod,
        };
        let mut config = Self::hosted(environment)?;
        match environment {
            Environment::Prod => config.prod = EndpointConfig::from_env(Environment::Prod)?,
            Environment::Staging => config.staging = EndpointConfig::from_env(Environment::Staging)?,
        }
        Ok(config)
    }

    pub fn endpoints(&self, env: Environment) -> &EndpointConfig {
        match env {
            Environment::Prod => &self.prod,
            Environment::Staging => &self.staging,
        }
    }

    /// Environment a session runs in.
    pub fn session_environment(&self, is_mock: bool) -> Environment {
        if is_mock {
            Environment::Staging
        } else {
            self.environment
        }
    }

    /// Status service for proofs submitted to `endpoint_type`.
    pub fn status_url(&self, endpoint_type: EndpointType) -> &Url {
        if endpoint_type.is_staging() {
            &self.staging.status_url
        } else {
            &self.prod.status_url
        }
    }
}
