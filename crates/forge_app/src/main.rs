use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use forge_core::ForgeConfig;
use forge_core::logging;
use forge_token::{
    CompilerService, FeatureConfig, FeatureConfigDraft, Network, RemoteCompiler, synthesize,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

/// Token contract synthesis and compilation.
#[derive(Debug, Parser)]
#[command(name = "forge", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
enum Command {
    /// Print the generated contract source
    Synth {
        /// Wizard payload (JSON)
        config: PathBuf,
    },
    /// Synthesize and compile through the compiler service
    Compile {
        /// Wizard payload (JSON)
        config: PathBuf,
    },
    /// List supported networks
    Networks,
}

/// Read a wizard payload from disk and validate it.
fn load_feature_config(path: &Path) -> Result<FeatureConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let draft: FeatureConfigDraft = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    draft
        .validate()
        .with_context(|| format!("invalid token configuration in {}", path.display()))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn run_synth(path: &Path) -> Result<()> {
    let config = load_feature_config(path)?;
    print!("{}", synthesize(&config));
    Ok(())
}

async fn run_compile(path: &Path, settings: &ForgeConfig) -> Result<()> {
    let config = load_feature_config(path)?;
    let source = synthesize(&config);

    let compiler = RemoteCompiler::from_config(settings)
        .context("failed to build compiler client")?;
    info!(url = %compiler.base_url(), contract = %config.contract_name(), "compiling");
    let artifact = compiler
        .compile(&source)
        .await
        .context("compilation failed")?;

    println!("contract:  {}", config.contract_name());
    println!("network:   {}", config.network());
    println!("abi items: {}", artifact.abi.len());
    println!("bytecode:  {} bytes", artifact.bytecode_len());
    Ok(())
}

fn run_networks() {
    for network in Network::ALL {
        let kind = if network.is_testnet() { "testnet" } else { "mainnet" };
        println!(
            "{:<16} {:>10}  {:<8} {}",
            network.slug(),
            network.chain_id(),
            kind,
            network.label()
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    ForgeConfig::ensure_dirs()?;
    let settings = ForgeConfig::load()?;

    let _log_guard =
        logging::init_logging(&settings.log_level).context("failed to initialize logging")?;
    info!("Starting TokenForge v{VERSION}");

    let result = match &cli.command {
        Command::Synth { config } => run_synth(config),
        Command::Compile { config } => run_compile(config, &settings).await,
        Command::Networks => {
            run_networks();
            Ok(())
        }
    };
    if let Err(e) = &result {
        error!("{:?} failed: {e:#}", cli.command);
    }
    result
}
