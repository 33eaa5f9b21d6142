// Token synthesis, deployment and explorer verification

pub mod compiler;
pub mod deployer;
pub mod error;
pub mod explorer_config;
pub mod feature_config;
pub mod networks;
pub mod pipeline;
pub mod polling;
pub mod signer;
pub mod synthesis;
pub mod verification;

// Re-export primary types for convenient access.
pub use compiler::{CompiledArtifact, CompilerService, RemoteCompiler};
pub use deployer::{ConstructorArgs, DeployedContract, Deployer};
pub use error::{
    ConfigValidationError, DeploymentError, PipelineError, RemoteCompilationError,
    VerificationError,
};
pub use explorer_config::{ExplorerConfig, ExplorerConfigStore, VerificationEndpoint, validate_url};
pub use feature_config::{
    AccessControl, FeatureConfig, FeatureConfigDraft, PresaleType, SecurityFunction,
    StandardFunction, TaxFunction, TokenAmount, Upgradeability,
};
pub use networks::{ExplorerProfile, Network, get_explorer_profiles, verification_network_for_chain_id};
pub use pipeline::{DeploymentPipeline, DeploymentRecord, PipelineEvent};
pub use polling::{PollPolicy, Sleeper, TokioSleeper};
pub use signer::{ChainProvider, ChainSigner, DeploymentReceipt, PendingDeployment};
pub use synthesis::{ContractBuilder, synthesize};
pub use verification::{
    EtherscanClient, VerificationOrchestrator, VerificationReport, VerificationService,
    VerificationState,
};
