//! # zkid-client — Remote Data for Proving Sessions
//!
//! Everything a proving session needs from the network before it can
//! validate a document:
//!
//! - the **identity**, **DSC** and **CSCA** trees for the document category,
//!   served as LeanIMT exports by the tree service;
//! - the **deployed circuit** lists and the **circuit DNS mapping** (which
//!   TEE serves which circuit), from the API service;
//! - the **alternative CSCAs** published for a category;
//! - whether a **nullifier** is already recorded on chain.
//!
//! ## Architecture
//!
//! [`RemoteDataProvider`] is the seam the orchestrator depends on.
//! [`HttpDataProvider`] implements it over `reqwest` with per-environment
//! base URLs from [`EndpointConfig`]. Tests substitute in-memory providers.
//!
//! ## Response Convention
//!
//! Every API response is wrapped as `{ "status": "success", "data": ... }`.
//! Any other status is reported as `ProviderError::Api`.

pub mod config;
pub mod error;
pub mod http;
pub mod provider;
pub(crate) mod retry;

pub use config::{ConfigError, EndpointConfig};
pub use error::ProviderError;
pub use http::HttpDataProvider;
pub use provider::{fetch_all, FetchedData, RemoteDataProvider};
