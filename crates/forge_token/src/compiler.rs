use std::time::Duration;

use alloy::json_abi::JsonAbi;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use forge_core::ForgeConfig;

use crate::error::RemoteCompilationError;

const DEFAULT_BASE_URL: &str = "http://localhost:3001";

// ── Types ──────────────────────────────────────────────────────────────

/// Output of a successful compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledArtifact {
    pub abi: JsonAbi,
    /// Creation bytecode as hex, with or without a `0x` prefix.
    pub bytecode: String,
}

impl CompiledArtifact {
    /// Bytecode length in bytes.
    pub fn bytecode_len(&self) -> usize {
        self.bytecode.trim_start_matches("0x").len() / 2
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceRequest<'a> {
    source_code: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlattenResponse {
    flattened_code: String,
}

/// Remote Solidity compilation and flattening.
#[async_trait]
pub trait CompilerService: Send + Sync {
    /// Compile a single-file contract source.
    async fn compile(&self, source: &str) -> Result<CompiledArtifact, RemoteCompilationError>;

    /// Inline every import into one source file.
    async fn flatten(&self, source: &str) -> Result<String, RemoteCompilationError>;
}

// ── Client ─────────────────────────────────────────────────────────────

/// HTTP client for the compiler service (`/api/compile`, `/api/flatten`).
///
/// Each call is a single request; failures are returned to the caller
/// without retrying.
pub struct RemoteCompiler {
    base_url: String,
    client: Client,
}

impl RemoteCompiler {
    pub fn new() -> Result<Self, RemoteCompilationError> {
        Self::with_base_url(DEFAULT_BASE_URL, Duration::from_secs(30))
    }

    /// Build a client from the loaded application config.
    pub fn from_config(config: &ForgeConfig) -> Result<Self, RemoteCompilationError> {
        Self::with_base_url(&config.compiler_url, config.request_timeout())
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteCompilationError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static("TokenForge/1.0"));

        let client = Client::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a JSON body and deserialize the JSON response.
    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        payload: &B,
    ) -> Result<T, RemoteCompilationError> {
        debug!(url = %url, "compiler request");
        let response = self.client.post(url).json(payload).send().await?;

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        if !status.is_success() {
            return Err(RemoteCompilationError::Upstream {
                status,
                payload: body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| RemoteCompilationError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl CompilerService for RemoteCompiler {
    async fn compile(&self, source: &str) -> Result<CompiledArtifact, RemoteCompilationError> {
        let url = format!("{}/api/compile", self.base_url);
        let artifact: CompiledArtifact = self
            .post_json(&url, &SourceRequest { source_code: source })
            .await?;

        if artifact.bytecode.trim_start_matches("0x").is_empty() {
            return Err(RemoteCompilationError::MalformedResponse(
                "compiler returned empty bytecode".into(),
            ));
        }
        debug!(
            abi_items = artifact.abi.len(),
            bytecode_bytes = artifact.bytecode_len(),
            "compiled contract"
        );
        Ok(artifact)
    }

    async fn flatten(&self, source: &str) -> Result<String, RemoteCompilationError> {
        let url = format!("{}/api/flatten", self.base_url);
        let response: FlattenResponse = self
            .post_json(&url, &SourceRequest { source_code: source })
            .await?;
        Ok(response.flattened_code)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_base_url_strips_trailing_slash() {
        let client = RemoteCompiler::with_base_url("http://compiler.local/", Duration::from_secs(5))
            .unwrap();
        assert_eq!(client.base_url(), "http://compiler.local");
    }

    #[test]
    fn default_base_url_is_local_service() {
        assert_eq!(RemoteCompiler::new().unwrap().base_url(), "http://localhost:3001");
    }

    #[test]
    fn from_config_uses_compiler_url() {
        let config = ForgeConfig {
            compiler_url: "https://solc.example.com".into(),
            ..Default::default()
        };
        let client = RemoteCompiler::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "https://solc.example.com");
    }

    #[test]
    fn source_request_uses_camel_case() {
        let json = serde_json::to_value(SourceRequest { source_code: "contract A {}" }).unwrap();
        assert_eq!(json, serde_json::json!({ "sourceCode": "contract A {}" }));
    }

    #[test]
    fn deserialize_artifact() {
        let json = r#"{
            "abi": [
                {
                    "type": "constructor",
                    "stateMutability": "nonpayable",
                    "inputs": [
                        { "name": "name_", "type": "string", "internalType": "string" },
                        { "name": "", "type": "uint8", "internalType": "uint8" }
                    ]
                },
                {
                    "type": "function",
                    "name": "totalSupply",
                    "stateMutability": "view",
                    "inputs": [],
                    "outputs": [{ "name": "", "type": "uint256", "internalType": "uint256" }]
                }
            ],
            "bytecode": "0x60806040"
        }"#;
        let artifact: CompiledArtifact = serde_json::from_str(json).unwrap();
        assert_eq!(artifact.abi.constructor.as_ref().unwrap().inputs.len(), 2);
        assert_eq!(artifact.abi.functions().count(), 1);
        assert_eq!(artifact.bytecode_len(), 4);
    }

    #[test]
    fn deserialize_flatten_response() {
        let json = r#"{ "flattenedCode": "// flat\ncontract A {}" }"#;
        let response: FlattenResponse = serde_json::from_str(json).unwrap();
        assert!(response.flattened_code.starts_with("// flat"));
    }

    #[tokio::test]
    async fn unreachable_service_is_transport_error() {
        let client =
            RemoteCompiler::with_base_url("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = client.compile("contract A {}").await.unwrap_err();
        assert!(matches!(err, RemoteCompilationError::Transport(_)));
    }
}
