//! Definition of the CLI arguments of the deploy script

use std::path::PathBuf;

use clap::Parser;

use crate::{
    constants::{
        DEFAULT_ADDRESS_CONSTANTS_PATH, DEFAULT_ARTIFACTS_DIR, DEFAULT_ENCRYPTION_METHOD,
        DEFAULT_EXPLORER_LOG_PATH, DEFAULT_EXPLORER_URL, DEFAULT_RPC_URL,
        DEFAULT_SHIELDED_GAS_LIMIT, EXPLORER_API_PATH,
    },
    types::{DeployConfig, ExplorerConfig, OutputPaths},
};

/// Deploy `MyContractV1` behind a transparent upgradeable proxy, upgrade it
/// to `MyContractV2` with a shielded transaction, record the addresses and
/// verify the sources on the block explorer.
///
/// Every option has a default, so the script normally runs without flags.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Private key of the deployer
    #[arg(short, long, env = "PRIVATE_KEY", hide_env_values = true)]
    pub priv_key: String,

    /// Network RPC URL
    #[arg(short, long, env = "RPC_URL", default_value = DEFAULT_RPC_URL)]
    pub rpc_url: String,

    /// Endpoint producing encrypted transaction payloads, defaults to the RPC URL
    #[arg(long, env = "ENCRYPTION_URL")]
    pub encryption_url: Option<String>,

    /// JSON-RPC method returning the encrypted form of a payload
    #[arg(long, default_value = DEFAULT_ENCRYPTION_METHOD)]
    pub encryption_method: String,

    /// Gas limit of the shielded upgrade transaction
    #[arg(long, default_value_t = DEFAULT_SHIELDED_GAS_LIMIT)]
    pub gas_limit: u64,

    /// Directory containing the Hardhat compilation artifacts
    #[arg(long, default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts_dir: PathBuf,

    /// File to which explorer links of the deployed contracts are appended
    #[arg(long, default_value = DEFAULT_EXPLORER_LOG_PATH)]
    pub explorer_log: PathBuf,

    /// File overwritten with the deployed addresses
    #[arg(long, default_value = DEFAULT_ADDRESS_CONSTANTS_PATH)]
    pub address_constants: PathBuf,

    /// Base URL of the block explorer
    #[arg(long, default_value = DEFAULT_EXPLORER_URL)]
    pub explorer_url: String,

    /// Etherscan-compatible API of the block explorer, defaults to `<explorer-url>/api`
    #[arg(long, env = "EXPLORER_API_URL")]
    pub explorer_api_url: Option<String>,

    /// API key of the block explorer
    #[arg(long, env = "EXPLORER_API_KEY", default_value = "", hide_env_values = true)]
    pub explorer_api_key: String,

    /// Skip source verification of the deployed contracts
    #[arg(long)]
    pub skip_verify: bool,
}

impl Cli {
    /// Resolve the deployment settings from the parsed arguments
    pub fn deploy_config(&self) -> DeployConfig {
        let explorer_api_url = self.explorer_api_url.clone().unwrap_or_else(|| {
            format!(
                "{}/{EXPLORER_API_PATH}",
                self.explorer_url.trim_end_matches('/')
            )
        });

        DeployConfig {
            rpc_endpoint: self.rpc_url.clone(),
            encryption_endpoint: self
                .encryption_url
                .clone()
                .unwrap_or_else(|| self.rpc_url.clone()),
            encryption_method: self.encryption_method.clone(),
            gas_limit: self.gas_limit,
            output_paths: OutputPaths {
                explorer_log: self.explorer_log.clone(),
                address_constants: self.address_constants.clone(),
            },
            artifacts_dir: self.artifacts_dir.clone(),
            explorer: ExplorerConfig {
                url: self.explorer_url.clone(),
                api_url: explorer_api_url,
                api_key: self.explorer_api_key.clone(),
            },
            verify: !self.skip_verify,
        }
    }
}
