//! The remote data seam used by proving sessions.

use async_trait::async_trait;

use zkid_core::{AlternativeCscas, CircuitDnsMapping, DeployedCircuits, DocumentCategory, Environment};
use zkid_crypto::{FieldElement, LeanImt};

use crate::error::ProviderError;

/// Source of trees, circuit metadata and nullifier lookups.
///
/// Every fetch is scoped by environment; tree and alternative-CSCA fetches
/// are also scoped by document category.
#[async_trait]
pub trait RemoteDataProvider: Send + Sync {
    /// Identity commitment tree.
    async fn commitment_tree(
        &self,
        env: Environment,
        category: DocumentCategory,
    ) -> Result<LeanImt, ProviderError>;

    /// DSC tree (leaves bind a DSC to its CSCA).
    async fn dsc_tree(
        &self,
        env: Environment,
        category: DocumentCategory,
    ) -> Result<LeanImt, ProviderError>;

    /// CSCA tree.
    async fn csca_tree(
        &self,
        env: Environment,
        category: DocumentCategory,
    ) -> Result<LeanImt, ProviderError>;

    async fn deployed_circuits(&self, env: Environment) -> Result<DeployedCircuits, ProviderError>;

    async fn circuit_dns_mapping(&self, env: Environment)
        -> Result<CircuitDnsMapping, ProviderError>;

    /// Alternative CSCA PEMs published for `category`, keyed by key id.
    async fn alternative_cscas(
        &self,
        env: Environment,
        category: DocumentCategory,
    ) -> Result<AlternativeCscas, ProviderError>;

    /// Whether `nullifier` is already recorded on chain.
    async fn is_nullifier_onchain(
        &self,
        env: Environment,
        nullifier: &FieldElement,
    ) -> Result<bool, ProviderError>;
}

/// Everything a session fetches before validation.
#[derive(Debug, Clone)]
pub struct FetchedData {
    pub commitment_tree: LeanImt,
    pub dsc_tree: LeanImt,
    pub csca_tree: LeanImt,
    pub deployed_circuits: DeployedCircuits,
    pub dns_mapping: CircuitDnsMapping,
    pub alternative_cscas: AlternativeCscas,
}

/// Fetch all session data concurrently. The first failure wins.
pub async fn fetch_all(
    provider: &dyn RemoteDataProvider,
    env: Environment,
    category: DocumentCategory,
) -> Result<FetchedData, ProviderError> {
    let (commitment_tree, dsc_tree, csca_tree, deployed_circuits, dns_mapping, alternative_cscas) =
        tokio::try_join!(
            provider.commitment_tree(env, category),
            provider.dsc_tree(env, category),
            provider.csca_tree(env, category),
            provider.deployed_circuits(env),
            provider.circuit_dns_mapping(env),
            provider.alternative_cscas(env, category),
        )?;
    Ok(FetchedData {
        commitment_tree,
        dsc_tree,
        csca_tree,
        deployed_circuits,
        dns_mapping,
        alternative_cscas,
    })
}
