//! Source verification on Etherscan-family explorers.
//!
//! Verification is best effort. [`VerificationOrchestrator::verify`] always
//! returns a [`VerificationReport`]; failures are folded into its terminal
//! state and never reach the deployment result.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use alloy::dyn_abi::{DynSolValue, JsonAbiExt};
use alloy::json_abi::JsonAbi;
use alloy::primitives::hex;
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::compiler::CompilerService;
use crate::error::VerificationError;
use crate::explorer_config::VerificationEndpoint;
use crate::polling::{PollOutcome, PollPolicy, PollStep, Sleeper, poll_until};

pub const COMPILER_VERSION: &str = "v0.8.20+commit.a1b79de6";
pub const OPTIMIZATION_RUNS: u32 = 200;
pub const EVM_VERSION: &str = "paris";
/// Etherscan license code for MIT.
pub const LICENSE_TYPE: u8 = 3;

const PASS_VERIFIED: &str = "Pass - Verified";
const ALREADY_VERIFIED: &str = "Already Verified";

/// Explorers word this differently ("Already Verified", "Contract source
/// code already verified"), so match loosely.
fn is_already_verified(text: &str) -> bool {
    text.to_ascii_lowercase().contains("already verified")
}

// ── Types ──────────────────────────────────────────────────────────────

/// Verification state stored on a deployment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationState {
    Pending,
    Submitted,
    Verified,
    Failed,
    TimedOut,
    Skipped,
}

impl VerificationState {
    /// Whether no further progress will happen for this deployment.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Verified | Self::Failed | Self::TimedOut | Self::Skipped
        )
    }
}

/// Progress notification emitted while a verification runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationPhase {
    Submitting,
    Submitted { guid: String },
    Polling { attempt: u32, max_attempts: u32 },
}

/// What to verify and where.
#[derive(Debug, Clone)]
pub struct VerificationTarget {
    pub contract_address: String,
    pub contract_name: String,
    /// Unflattened source; flattened before submission.
    pub source: String,
    pub abi: JsonAbi,
    pub constructor_args: Vec<DynSolValue>,
    pub endpoint: VerificationEndpoint,
}

/// Explorer submission payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    pub contract_address: String,
    pub contract_name: String,
    pub source_code: String,
    /// ABI-encoded constructor arguments as hex without `0x`.
    pub constructor_arguments: String,
    pub chain_id: u64,
}

/// Accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Queued; poll with this GUID.
    Queued(String),
    AlreadyVerified,
}

/// Outcome of one verification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub state: VerificationState,
    pub guid: Option<String>,
    pub polls: u32,
    pub message: Option<String>,
}

impl VerificationReport {
    fn new(state: VerificationState) -> Self {
        Self {
            state,
            guid: None,
            polls: 0,
            message: None,
        }
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn skipped() -> Self {
        Self::new(VerificationState::Skipped)
    }
}

/// Map an explorer status string onto a terminal state, or `Pending` to
/// keep polling.
pub fn classify_status(result: &str) -> PollStep<VerificationState> {
    if result == PASS_VERIFIED || is_already_verified(result) {
        PollStep::Ready(VerificationState::Verified)
    } else if result.contains("Fail") {
        PollStep::Ready(VerificationState::Failed)
    } else {
        PollStep::Pending
    }
}

/// ABI-encode constructor arguments against the ABI's constructor, as hex
/// without a `0x` prefix. An ABI without a constructor encodes to `""`.
pub fn encode_constructor_args(
    abi: &JsonAbi,
    values: &[DynSolValue],
) -> Result<String, VerificationError> {
    match &abi.constructor {
        Some(constructor) => constructor
            .abi_encode_input(values)
            .map(hex::encode)
            .map_err(|e| VerificationError::Encoding(e.to_string())),
        None if values.is_empty() => Ok(String::new()),
        None => Err(VerificationError::Encoding(format!(
            "ABI has no constructor but {} arguments were given",
            values.len()
        ))),
    }
}

/// Explorer verification API.
#[async_trait]
pub trait VerificationService: Send + Sync {
    async fn submit(
        &self,
        endpoint: &VerificationEndpoint,
        request: &VerificationRequest,
    ) -> Result<Submission, VerificationError>;

    /// Raw status string for a queued GUID.
    async fn check_status(
        &self,
        endpoint: &VerificationEndpoint,
        guid: &str,
    ) -> Result<String, VerificationError>;
}

// ── Etherscan client ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: serde_json::Value,
}

impl ExplorerResponse {
    fn result_text(&self) -> String {
        match &self.result {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => self.message.clone(),
            other => other.to_string(),
        }
    }
}

/// Client for the Etherscan-compatible `verifysourcecode` API.
pub struct EtherscanClient {
    client: Client,
}

impl EtherscanClient {
    pub fn new(timeout: Duration) -> Result<Self, VerificationError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static("TokenForge/1.0"));

        let client = Client::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    fn submission_form(
        endpoint: &VerificationEndpoint,
        request: &VerificationRequest,
    ) -> Vec<(&'static str, String)> {
        vec![
            ("apikey", endpoint.api_key.clone()),
            ("module", "contract".into()),
            ("action", "verifysourcecode".into()),
            ("sourceCode", request.source_code.clone()),
            ("contractaddress", request.contract_address.clone()),
            ("codeformat", "solidity-single-file".into()),
            ("contractname", request.contract_name.clone()),
            ("compilerversion", COMPILER_VERSION.into()),
            ("optimizationUsed", "1".into()),
            ("runs", OPTIMIZATION_RUNS.to_string()),
            ("evmversion", EVM_VERSION.into()),
            ("licenseType", LICENSE_TYPE.to_string()),
            // Etherscan's parameter name is misspelled.
            ("constructorArguements", request.constructor_arguments.clone()),
            ("chainid", request.chain_id.to_string()),
        ]
    }

    async fn read_response(
        response: reqwest::Response,
    ) -> Result<ExplorerResponse, VerificationError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        if !status.is_success() {
            return Err(VerificationError::Rejected(format!(
                "explorer HTTP error ({status}): {body}"
            )));
        }
        serde_json::from_str(&body)
            .map_err(|e| VerificationError::Rejected(format!("unparseable response: {e}")))
    }
}

#[async_trait]
impl VerificationService for EtherscanClient {
    async fn submit(
        &self,
        endpoint: &VerificationEndpoint,
        request: &VerificationRequest,
    ) -> Result<Submission, VerificationError> {
        debug!(
            explorer = endpoint.name(),
            url = %endpoint.api_url,
            address = %request.contract_address,
            "submitting verification"
        );
        let response = self
            .client
            .post(&endpoint.api_url)
            .query(&[("apikey", endpoint.api_key.as_str())])
            .form(&Self::submission_form(endpoint, request))
            .send()
            .await?;
        let body = Self::read_response(response).await?;
        let result = body.result_text();

        if body.status == "1" {
            Ok(Submission::Queued(result))
        } else if is_already_verified(&result) {
            Ok(Submission::AlreadyVerified)
        } else {
            Err(VerificationError::Rejected(result))
        }
    }

    async fn check_status(
        &self,
        endpoint: &VerificationEndpoint,
        guid: &str,
    ) -> Result<String, VerificationError> {
        let response = self
            .client
            .get(&endpoint.api_url)
            .query(&[
                ("apikey", endpoint.api_key.as_str()),
                ("module", "contract"),
                ("action", "checkverifystatus"),
                ("guid", guid),
            ])
            .send()
            .await?;
        let body = Self::read_response(response).await?;
        Ok(body.result_text())
    }
}

// ── Orchestrator ───────────────────────────────────────────────────────

/// Removes an address from the in-flight set when dropped.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<String>>,
    key: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.key);
    }
}

/// Drives flatten, submit, settle and poll for one deployment at a time
/// per contract address.
pub struct VerificationOrchestrator {
    compiler: Arc<dyn CompilerService>,
    explorer: Arc<dyn VerificationService>,
    sleeper: Arc<dyn Sleeper>,
    policy: PollPolicy,
    settle_delay: Duration,
    in_flight: Mutex<HashSet<String>>,
}

impl VerificationOrchestrator {
    pub fn new(
        compiler: Arc<dyn CompilerService>,
        explorer: Arc<dyn VerificationService>,
        sleeper: Arc<dyn Sleeper>,
        policy: PollPolicy,
        settle_delay: Duration,
    ) -> Self {
        Self {
            compiler,
            explorer,
            sleeper,
            policy,
            settle_delay,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    fn claim(&self, address: &str) -> Option<InFlight<'_>> {
        let key = address.to_ascii_lowercase();
        if !self.in_flight.lock().insert(key.clone()) {
            return None;
        }
        Some(InFlight {
            set: &self.in_flight,
            key,
        })
    }

    /// Verify one deployed contract. `on_phase` is called as the attempt
    /// progresses.
    pub async fn verify<F>(&self, target: &VerificationTarget, on_phase: F) -> VerificationReport
    where
        F: Fn(VerificationPhase) + Send + Sync,
    {
        let Some(_claim) = self.claim(&target.contract_address) else {
            let err = VerificationError::AlreadyInFlight(target.contract_address.clone());
            warn!(address = %target.contract_address, "{err}");
            return VerificationReport::new(VerificationState::Pending).with_message(err.to_string());
        };

        on_phase(VerificationPhase::Submitting);
        let guid = match self.submit(target).await {
            Ok(Submission::Queued(guid)) => guid,
            Ok(Submission::AlreadyVerified) => {
                info!(address = %target.contract_address, "contract already verified");
                return VerificationReport::new(VerificationState::Verified)
                    .with_message(ALREADY_VERIFIED);
            }
            Err(err) => {
                warn!(address = %target.contract_address, error = %err, "verification submission failed");
                return VerificationReport::new(VerificationState::Failed)
                    .with_message(err.to_string());
            }
        };
        info!(
            address = %target.contract_address,
            explorer = target.endpoint.name(),
            guid = %guid,
            "verification submitted"
        );
        on_phase(VerificationPhase::Submitted { guid: guid.clone() });

        self.sleeper.sleep(self.settle_delay).await;

        let max_attempts = self.policy.max_attempts;
        let outcome = poll_until(&self.policy, self.sleeper.as_ref(), |attempt| {
            on_phase(VerificationPhase::Polling {
                attempt,
                max_attempts,
            });
            let guid = guid.as_str();
            async move {
                match self.explorer.check_status(&target.endpoint, guid).await {
                    Ok(result) => {
                        debug!(attempt, result = %result, "verification status");
                        classify_status(&result).with_result(result)
                    }
                    Err(err) => {
                        warn!(attempt, error = %err, "verification status check failed");
                        StatusStep::Pending
                    }
                }
            }
        })
        .await;

        let mut report = match outcome {
            PollOutcome::Done {
                value: (state, result),
                attempts,
            } => VerificationReport {
                state,
                guid: None,
                polls: attempts,
                message: Some(result),
            },
            PollOutcome::Exhausted { attempts } => VerificationReport {
                state: VerificationState::TimedOut,
                guid: None,
                polls: attempts,
                message: None,
            },
        };
        report.guid = Some(guid);
        info!(
            address = %target.contract_address,
            state = ?report.state,
            polls = report.polls,
            "verification finished"
        );
        report
    }

    async fn submit(&self, target: &VerificationTarget) -> Result<Submission, VerificationError> {
        let constructor_arguments =
            encode_constructor_args(&target.abi, &target.constructor_args)?;
        let source_code = self.compiler.flatten(&target.source).await?;
        let request = VerificationRequest {
            contract_address: target.contract_address.clone(),
            contract_name: target.contract_name.clone(),
            source_code,
            constructor_arguments,
            chain_id: target.endpoint.chain_id(),
        };
        self.explorer.submit(&target.endpoint, &request).await
    }
}

type StatusStep = PollStep<(VerificationState, String)>;

impl PollStep<VerificationState> {
    /// Attach the raw explorer result to a terminal state.
    fn with_result(self, result: String) -> StatusStep {
        match self {
            PollStep::Ready(state) => PollStep::Ready((state, result)),
            PollStep::Pending => PollStep::Pending,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────
