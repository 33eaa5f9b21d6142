//! Error types for the synthesis / deployment / verification pipeline.

/// A wizard payload that cannot become a [`FeatureConfig`](crate::FeatureConfig).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Token name '{0}' does not reduce to a valid contract identifier")]
    InvalidContractName(String),

    #[error("Invalid {field}: '{value}' ({reason})")]
    InvalidNumber {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid {field} address: '{value}' ({reason})")]
    InvalidAddress {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Unknown {field} option: '{value}'")]
    UnknownOption { field: &'static str, value: String },

    #[error("Max supply {max_supply} must exceed initial supply {initial_supply}")]
    CapNotAboveInitialSupply {
        initial_supply: String,
        max_supply: String,
    },
}

/// The remote compiler or flattener returned a failure.
#[derive(Debug, thiserror::Error)]
pub enum RemoteCompilationError {
    #[error("Compiler service error ({status}): {payload}")]
    Upstream {
        status: reqwest::StatusCode,
        payload: String,
    },

    #[error("Compiler request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed compiler response: {0}")]
    MalformedResponse(String),
}

/// Contract creation failed. Fatal to the pipeline; the user must restart.
///
/// Apart from `ReceiptUnavailable`, these are produced by
/// [`ChainSigner`](crate::ChainSigner) and [`PendingDeployment`](crate::PendingDeployment)
/// implementations and pass through the deployer unchanged.
#[derive(Debug, thiserror::Error)]
pub enum DeploymentError {
    #[error("Signer rejected the transaction: {0}")]
    SignerRejected(String),

    /// The signing account cannot pay for the creation transaction.
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Broadcast or execution failure, including a constructor revert.
    #[error("Deployment transaction failed: {0}")]
    Transaction(String),

    /// The contract was created at `address` but no receipt was available
    /// after waiting for `confirmations` blocks (reorg or dropped tx).
    #[error("No receipt for contract {address} after {confirmations} confirmations")]
    ReceiptUnavailable { address: String, confirmations: u64 },
}

impl DeploymentError {
    /// The contract address, if the failure happened after creation.
    pub fn contract_address(&self) -> Option<&str> {
        match self {
            Self::ReceiptUnavailable { address, .. } => Some(address),
            _ => None,
        }
    }
}

/// Any failure during verification submission or polling. Always converted
/// into a terminal verification state, never propagated to the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("Flattening failed: {0}")]
    Flatten(#[from] RemoteCompilationError),

    #[error("Constructor encoding failed: {0}")]
    Encoding(String),

    #[error("Explorer request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Explorer rejected submission: {0}")]
    Rejected(String),

    #[error("Verification already in flight for {0}")]
    AlreadyInFlight(String),
}

/// Failure of the deployment pipeline as a whole.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigValidationError),

    #[error(transparent)]
    Compilation(#[from] RemoteCompilationError),

    #[error(transparent)]
    Deployment(#[from] DeploymentError),
}

impl PipelineError {
    /// Whether any chain state may have changed before the failure.
    pub fn touched_chain(&self) -> bool {
        matches!(self, Self::Deployment(_))
    }
}
