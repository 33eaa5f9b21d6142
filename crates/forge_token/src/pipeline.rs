//! Deployment pipeline: synthesis, compilation, deployment, confirmation and
//! verification for one token.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use forge_core::{ExplorerApiKeys, ForgeConfig};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::compiler::{CompilerService, RemoteCompiler};
use crate::deployer::Deployer;
use crate::error::PipelineError;
use crate::explorer_config::ExplorerConfigStore;
use crate::feature_config::{FeatureConfig, FeatureConfigDraft};
use crate::networks::{Network, verification_network_for_chain_id};
use crate::polling::{PollPolicy, Sleeper, TokioSleeper};
use crate::signer::ChainSigner;
use crate::synthesis;
use crate::verification::{
    EtherscanClient, VerificationOrchestrator, VerificationPhase, VerificationReport, VerificationService,
    VerificationState, VerificationTarget,
};

// ── Types ──────────────────────────────────────────────────────────────

/// Progress events, in the order a successful run emits them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    Preparing,
    Deploying,
    Confirming { address: String },
    Verifying { address: String },
    Polling { attempt: u32, max_attempts: u32 },
    Done(DeploymentRecord),
    Error(String),
}

/// Result of a completed deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub id: Uuid,
    pub contract_address: String,
    pub chain_id: u64,
    /// Explorer network used for verification, if the chain has one.
    pub network: Option<Network>,
    pub tx_hash: Option<String>,
    pub verification_state: VerificationState,
    pub deployed_at: DateTime<Utc>,
}

// ── Pipeline ───────────────────────────────────────────────────────────

pub struct DeploymentPipeline {
    compiler: Arc<dyn CompilerService>,
    deployer: Deployer,
    verifier: VerificationOrchestrator,
    explorers: ExplorerConfigStore,
    api_keys: ExplorerApiKeys,
    events: Option<mpsc::UnboundedSender<PipelineEvent>>,
}

impl DeploymentPipeline {
    pub fn new(
        config: &ForgeConfig,
        compiler: Arc<dyn CompilerService>,
        explorer: Arc<dyn VerificationService>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        let verifier = VerificationOrchestrator::new(
            compiler.clone(),
            explorer,
            sleeper,
            PollPolicy::from_config(config),
            config.settle_delay(),
        );
        Self {
            compiler,
            deployer: Deployer::new(config.confirmations),
            verifier,
            explorers: ExplorerConfigStore::with_defaults(),
            api_keys: config.explorer_api_keys.clone(),
            events: None,
        }
    }

    /// Pipeline backed by the remote compiler service, the Etherscan API
    /// and the tokio timer.
    pub fn from_config(config: &ForgeConfig) -> anyhow::Result<Self> {
        let compiler = RemoteCompiler::from_config(config)?;
        let explorer = EtherscanClient::new(config.request_timeout())?;
        Ok(Self::new(
            config,
            Arc::new(compiler),
            Arc::new(explorer),
            Arc::new(TokioSleeper),
        ))
    }

    /// Replace the explorer URL table (custom endpoints).
    pub fn with_explorers(mut self, explorers: ExplorerConfigStore) -> Self {
        self.explorers = explorers;
        self
    }

    /// Subscribe to progress events.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<PipelineEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.events {
            // A dropped receiver only means nobody is watching.
            let _ = tx.send(event);
        }
    }

    /// Validate a raw wizard payload, then [`run`](Self::run) it.
    pub async fn run_draft(
        &self,
        draft: &FeatureConfigDraft,
        signer: &dyn ChainSigner,
    ) -> Result<DeploymentRecord, PipelineError> {
        let config = match draft.validate() {
            Ok(config) => config,
            Err(err) => {
                self.emit(PipelineEvent::Error(err.to_string()));
                return Err(err.into());
            }
        };
        self.run(&config, signer).await
    }

    /// Deploy `config` through `signer`. Verification runs afterwards and its
    /// outcome is recorded on the returned record; it never turns a
    /// successful deployment into an error.
    pub async fn run(
        &self,
        config: &FeatureConfig,
        signer: &dyn ChainSigner,
    ) -> Result<DeploymentRecord, PipelineError> {
        let result = self.execute(config, signer).await;
        match &result {
            Ok(record) => self.emit(PipelineEvent::Done(record.clone())),
            Err(err) => {
                error!(error = %err, touched_chain = err.touched_chain(), "deployment pipeline failed");
                self.emit(PipelineEvent::Error(err.to_string()));
            }
        }
        result
    }

    async fn execute(
        &self,
        config: &FeatureConfig,
        signer: &dyn ChainSigner,
    ) -> Result<DeploymentRecord, PipelineError> {
        self.emit(PipelineEvent::Preparing);
        let source = synthesis::synthesize(config);
        let artifact = self.compiler.compile(&source).await?;
        info!(
            contract = %config.contract_name(),
            network = %config.network(),
            "contract compiled"
        );

        self.emit(PipelineEvent::Deploying);
        let submitted = self.deployer.submit(&artifact, config, signer).await?;

        self.emit(PipelineEvent::Confirming {
            address: submitted.address.clone(),
        });
        let deployed = self.deployer.confirm(submitted).await?;

        let chain_id = match signer.provider().chain_id().await {
            Ok(chain_id) => chain_id,
            Err(err) => {
                warn!(error = %err, "chain id unavailable, assuming selected network");
                config.network().chain_id()
            }
        };
        if chain_id != config.network().chain_id() {
            warn!(
                chain_id,
                selected = %config.network(),
                "signer is connected to a different chain than selected"
            );
        }

        let network = verification_network_for_chain_id(chain_id);
        let endpoint = network.and_then(|n| self.explorers.endpoint(n, &self.api_keys));
        let report = match endpoint {
            Some(endpoint) => {
                self.emit(PipelineEvent::Verifying {
                    address: deployed.address.clone(),
                });
                let target = VerificationTarget {
                    contract_address: deployed.address.clone(),
                    contract_name: config.contract_name().to_string(),
                    source,
                    abi: artifact.abi,
                    constructor_args: deployed.args.to_values(),
                    endpoint,
                };
                self.verifier
                    .verify(&target, |phase| {
                        if let VerificationPhase::Polling {
                            attempt,
                            max_attempts,
                        } = phase
                        {
                            self.emit(PipelineEvent::Polling {
                                attempt,
                                max_attempts,
                            });
                        }
                    })
                    .await
            }
            None => {
                info!(chain_id, "no verification endpoint for chain, skipping");
                VerificationReport::skipped()
            }
        };

        Ok(DeploymentRecord {
            id: Uuid::new_v4(),
            contract_address: deployed.address,
            chain_id,
            network,
            tx_hash: deployed.tx_hash,
            verification_state: report.state,
            deployed_at: Utc::now(),
        })
    }
}
