use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, U256};
use tracing::{debug, info, warn};

use crate::compiler::CompiledArtifact;
use crate::error::DeploymentError;
use crate::feature_config::FeatureConfig;
use crate::signer::{ChainSigner, DeploymentReceipt, PendingDeployment};

/// Confirmations awaited after the creation block unless configured.
pub const DEFAULT_CONFIRMATIONS: u64 = 2;

/// Arguments of the generated constructor, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorArgs {
    pub name: String,
    pub symbol: String,
    /// Initial supply in base units.
    pub initial_supply: U256,
    pub decimals: u8,
    /// `AccessManager` address, present for manager-controlled tokens.
    pub authority: Option<Address>,
}

impl ConstructorArgs {
    pub fn from_config(config: &FeatureConfig) -> Self {
        Self {
            name: config.token_name().to_string(),
            symbol: config.token_symbol().to_string(),
            initial_supply: config.initial_supply().base_units(),
            decimals: config.decimals(),
            authority: config.access_manager(),
        }
    }

    /// ABI values matching `(string, string, uint256, uint8)`, followed by
    /// `address` when the token has an authority.
    pub fn to_values(&self) -> Vec<DynSolValue> {
        let mut values = vec![
            DynSolValue::String(self.name.clone()),
            DynSolValue::String(self.symbol.clone()),
            DynSolValue::Uint(self.initial_supply, 256),
            DynSolValue::Uint(U256::from(self.decimals), 8),
        ];
        if let Some(authority) = self.authority {
            values.push(DynSolValue::Address(authority));
        }
        values
    }
}

/// A creation transaction that has been mined but not yet confirmed.
pub struct SubmittedDeployment {
    pub address: String,
    pub args: ConstructorArgs,
    pending: Box<dyn PendingDeployment>,
}

impl SubmittedDeployment {
    pub fn tx_hash(&self) -> Option<String> {
        self.pending.tx_hash()
    }
}

/// A confirmed deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedContract {
    pub address: String,
    pub tx_hash: Option<String>,
    pub args: ConstructorArgs,
    pub receipt: DeploymentReceipt,
}

/// Sends the creation transaction through a [`ChainSigner`] and waits for
/// it to settle.
#[derive(Debug, Clone)]
pub struct Deployer {
    confirmations: u64,
}

impl Default for Deployer {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIRMATIONS)
    }
}

impl Deployer {
    pub fn new(confirmations: u64) -> Self {
        Self { confirmations }
    }

    pub fn confirmations(&self) -> u64 {
        self.confirmations
    }

    /// Submit the creation transaction and wait until it is mined.
    pub async fn submit(
        &self,
        artifact: &CompiledArtifact,
        config: &FeatureConfig,
        signer: &dyn ChainSigner,
    ) -> Result<SubmittedDeployment, DeploymentError> {
        let args = ConstructorArgs::from_config(config);
        let from = signer.signer_address().await?;
        debug!(
            from = %from,
            contract = %config.contract_name(),
            initial_supply = %args.initial_supply,
            "sending contract creation"
        );

        let pending = signer
            .deploy_contract(&artifact.abi, &artifact.bytecode, &args.to_values())
            .await?;
        let address = pending.wait_for_deployment().await?;
        info!(address = %address, tx = ?pending.tx_hash(), "contract mined");

        Ok(SubmittedDeployment {
            address,
            args,
            pending,
        })
    }

    /// Wait for the configured number of confirmations.
    pub async fn confirm(
        &self,
        submitted: SubmittedDeployment,
    ) -> Result<DeployedContract, DeploymentError> {
        let receipt = match submitted.pending.wait(self.confirmations).await? {
            Some(receipt) => receipt,
            None => {
                warn!(
                    address = %submitted.address,
                    confirmations = self.confirmations,
                    "no receipt after confirmations"
                );
                return Err(DeploymentError::ReceiptUnavailable {
                    address: submitted.address,
                    confirmations: self.confirmations,
                });
            }
        };
        info!(
            address = %submitted.address,
            block = receipt.block_number,
            gas_used = receipt.gas_used,
            "deployment confirmed"
        );

        Ok(DeployedContract {
            tx_hash: submitted.pending.tx_hash(),
            address: submitted.address,
            args: submitted.args,
            receipt,
        })
    }

    /// [`submit`](Self::submit) followed by [`confirm`](Self::confirm).
    pub async fn deploy(
        &self,
        artifact: &CompiledArtifact,
        config: &FeatureConfig,
        signer: &dyn ChainSigner,
    ) -> Result<DeployedContract, DeploymentError> {
        let submitted = self.submit(artifact, config, signer).await?;
        self.confirm(submitted).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_config::FeatureConfigDraft;
    use crate::signer::ChainProvider;
    use alloy::json_abi::JsonAbi;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct FakeProvider;

    #[async_trait]
    impl ChainProvider for FakeProvider {
        async fn chain_id(&self) -> Result<u64, DeploymentError> {
            Ok(11_155_111)
        }
    }

    struct FakePending {
        receipt: Option<DeploymentReceipt>,
        waited: std::sync::Arc<Mutex<Option<u64>>>,
    }

    #[async_trait]
    impl PendingDeployment for FakePending {
        fn tx_hash(&self) -> Option<String> {
            Some("0xfeed".into())
        }

        async fn wait_for_deployment(&self) -> Result<String, DeploymentError> {
            Ok("0x00000000000000000000000000000000000000aa".into())
        }

        async fn wait(
            &self,
            confirmations: u64,
        ) -> Result<Option<DeploymentReceipt>, DeploymentError> {
            *self.waited.lock() = Some(confirmations);
            Ok(self.receipt.clone())
        }
    }

    struct FakeSigner {
        receipt: Option<DeploymentReceipt>,
        reject: bool,
        sent_args: Mutex<Vec<DynSolValue>>,
        waited: std::sync::Arc<Mutex<Option<u64>>>,
    }

    impl FakeSigner {
        fn new(receipt: Option<DeploymentReceipt>) -> Self {
            Self {
                receipt,
                reject: false,
                sent_args: Mutex::new(Vec::new()),
                waited: Default::default(),
            }
        }
    }

    #[async_trait]
    impl ChainSigner for FakeSigner {
        fn provider(&self) -> &dyn ChainProvider {
            &FakeProvider
        }

        async fn signer_address(&self) -> Result<String, DeploymentError> {
            Ok("0x00000000000000000000000000000000000000b0".into())
        }

        async fn deploy_contract(
            &self,
            _abi: &JsonAbi,
            _bytecode: &str,
            args: &[DynSolValue],
        ) -> Result<Box<dyn PendingDeployment>, DeploymentError> {
            if self.reject {
                return Err(DeploymentError::SignerRejected("user denied".into()));
            }
            *self.sent_args.lock() = args.to_vec();
            Ok(Box::new(FakePending {
                receipt: self.receipt.clone(),
                waited: self.waited.clone(),
            }))
        }
    }

    fn config() -> FeatureConfig {
        FeatureConfigDraft {
            network: "sepolia".into(),
            token_name: "My Token".into(),
            token_symbol: "MTK".into(),
            initial_supply: "1000000".into(),
            access_control: "ownable".into(),
            standard_functions: vec!["mint".into(), "burn".into()],
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    fn artifact() -> CompiledArtifact {
        CompiledArtifact {
            abi: JsonAbi::default(),
            bytecode: "0x6080".into(),
        }
    }

    fn receipt() -> DeploymentReceipt {
        DeploymentReceipt {
            block_number: 42,
            gas_used: 1_200_000,
            confirmations: 2,
        }
    }

    #[test]
    fn constructor_args_scale_initial_supply() {
        let args = ConstructorArgs::from_config(&config());
        let expected = U256::from(1_000_000u64) * U256::from(10u64).pow(U256::from(18u64));
        assert_eq!(args.initial_supply, expected);
        assert_eq!(args.name, "My Token");
        assert_eq!(args.decimals, 18);

        let values = args.to_values();
        assert_eq!(values.len(), 4);
        assert_eq!(values[2], DynSolValue::Uint(expected, 256));
        assert_eq!(values[3], DynSolValue::Uint(U256::from(18u64), 8));
        assert_eq!(args.authority, None);
    }

    #[test]
    fn manager_token_passes_authority_last() {
        let config = FeatureConfigDraft {
            network: "sepolia".into(),
            token_name: "My Token".into(),
            token_symbol: "MTK".into(),
            initial_supply: "1000000".into(),
            access_control: "manager".into(),
            access_manager: Some("0x00000000000000000000000000000000000000cc".into()),
            standard_functions: vec!["mint".into()],
            ..Default::default()
        }
        .validate()
        .unwrap();

        let values = ConstructorArgs::from_config(&config).to_values();
        assert_eq!(values.len(), 5);
        assert_eq!(
            values[4],
            DynSolValue::Address(Address::with_last_byte(0xcc))
        );
    }

    #[tokio::test]
    async fn deploy_waits_for_configured_confirmations() {
        let signer = FakeSigner::new(Some(receipt()));
        let deployed = Deployer::new(3)
            .deploy(&artifact(), &config(), &signer)
            .await
            .unwrap();

        assert_eq!(deployed.address, "0x00000000000000000000000000000000000000aa");
        assert_eq!(deployed.tx_hash.as_deref(), Some("0xfeed"));
        assert_eq!(*signer.waited.lock(), Some(3));
        assert_eq!(signer.sent_args.lock().len(), 4);
    }

    #[tokio::test]
    async fn missing_receipt_keeps_address() {
        let signer = FakeSigner::new(None);
        let err = Deployer::default()
            .deploy(&artifact(), &config(), &signer)
            .await
            .unwrap_err();

        assert_eq!(
            err.contract_address(),
            Some("0x00000000000000000000000000000000000000aa")
        );
        assert_eq!(*signer.waited.lock(), Some(DEFAULT_CONFIRMATIONS));
    }

    #[tokio::test]
    async fn signer_rejection_propagates() {
        let mut signer = FakeSigner::new(Some(receipt()));
        signer.reject = true;
        let err = Deployer::default()
            .deploy(&artifact(), &config(), &signer)
            .await
            .unwrap_err();
        assert!(matches!(err, DeploymentError::SignerRejected(_)));
        assert!(signer.waited.lock().is_none());
    }
}
