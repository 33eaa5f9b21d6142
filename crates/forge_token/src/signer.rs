//! Wallet capability consumed by the deployer.
//!
//! The pipeline never holds keys. Whatever owns the wallet (a browser
//! bridge, a local keystore, a test fake) implements [`ChainSigner`].

use alloy::dyn_abi::DynSolValue;
use alloy::json_abi::JsonAbi;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DeploymentError;

/// Read access to the chain the signer is connected to.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    async fn chain_id(&self) -> Result<u64, DeploymentError>;
}

/// A wallet able to sign and send a contract-creation transaction.
#[async_trait]
pub trait ChainSigner: Send + Sync {
    fn provider(&self) -> &dyn ChainProvider;

    async fn signer_address(&self) -> Result<String, DeploymentError>;

    /// Send the creation transaction. Returns once the wallet has accepted
    /// and broadcast it.
    async fn deploy_contract(
        &self,
        abi: &JsonAbi,
        bytecode: &str,
        args: &[DynSolValue],
    ) -> Result<Box<dyn PendingDeployment>, DeploymentError>;
}

/// A broadcast contract-creation transaction.
#[async_trait]
pub trait PendingDeployment: Send + Sync {
    fn tx_hash(&self) -> Option<String>;

    /// Wait until the creation transaction is mined and return the contract
    /// address.
    async fn wait_for_deployment(&self) -> Result<String, DeploymentError>;

    /// Wait for `confirmations` blocks on top of the creation block.
    /// `Ok(None)` means no receipt could be found afterwards.
    async fn wait(&self, confirmations: u64)
    -> Result<Option<DeploymentReceipt>, DeploymentError>;
}

/// Receipt of a confirmed creation transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentReceipt {
    pub block_number: u64,
    pub gas_used: u64,
    pub confirmations: u64,
}
