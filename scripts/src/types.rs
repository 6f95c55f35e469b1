//! Type definitions used throughout the deploy script

use std::{
    fmt::{self, Display},
    path::PathBuf,
};

use alloy::primitives::{Address, Bytes, TxHash, U256};

use crate::constants::{CONTRACTS_SOURCE_DIR, SOLIDITY_EXTENSION};

// -----------------
// | Configuration |
// -----------------

/// Settings for a deployment run, resolved once at start-up
#[derive(Clone, Debug)]
pub struct DeployConfig {
    /// The chain RPC endpoint
    pub rpc_endpoint: String,
    /// The endpoint producing encrypted transaction payloads
    pub encryption_endpoint: String,
    /// The JSON-RPC method invoked on the encryption endpoint
    pub encryption_method: String,
    /// The gas limit attached to shielded transactions
    pub gas_limit: u64,
    /// Where the deployed addresses are written
    pub output_paths: OutputPaths,
    /// The directory holding the Hardhat compilation artifacts
    pub artifacts_dir: PathBuf,
    /// The block explorer used for links and source verification
    pub explorer: ExplorerConfig,
    /// Whether to verify the deployed contracts' sources
    pub verify: bool,
}

/// The output files of a deployment run
#[derive(Clone, Debug)]
pub struct OutputPaths {
    /// Append-only log of explorer links to the proxy admin and the proxy
    pub explorer_log: PathBuf,
    /// Overwritten module exporting the proxy and implementation addresses
    pub address_constants: PathBuf,
}

/// Block explorer settings
#[derive(Clone, Debug)]
pub struct ExplorerConfig {
    /// Base URL of the explorer's web UI
    pub url: String,
    /// URL of the explorer's Etherscan-compatible API
    pub api_url: String,
    /// API key sent along with verification requests
    pub api_key: String,
}

impl ExplorerConfig {
    /// The explorer page of the given address
    pub fn address_link(&self, address: Address) -> String {
        format!("{}/address/{}", self.url.trim_end_matches('/'), address)
    }
}

// -------------
// | Contracts |
// -------------

/// The contracts deployed by the script, in deployment order
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ContractKind {
    /// The first implementation behind the proxy
    MyContractV1,
    /// The admin allowed to upgrade the proxy
    ProxyAdmin,
    /// The transparent upgradeable proxy
    TransparentUpgradeableProxy,
    /// The implementation the proxy is upgraded to
    MyContractV2,
}

impl ContractKind {
    /// All contracts, in deployment order
    pub const ALL: [ContractKind; 4] = [
        ContractKind::MyContractV1,
        ContractKind::ProxyAdmin,
        ContractKind::TransparentUpgradeableProxy,
        ContractKind::MyContractV2,
    ];

    /// The name of the Solidity contract
    pub fn name(&self) -> &'static str {
        match self {
            ContractKind::MyContractV1 => "MyContractV1",
            ContractKind::ProxyAdmin => "ProxyAdmin",
            ContractKind::TransparentUpgradeableProxy => "TransparentUpgradeableProxy",
            ContractKind::MyContractV2 => "MyContractV2",
        }
    }

    /// The path of the Solidity source, relative to the project root
    pub fn source_path(&self) -> String {
        format!(
            "{CONTRACTS_SOURCE_DIR}/{}.{SOLIDITY_EXTENSION}",
            self.name()
        )
    }

    /// The fully qualified name, e.g. `contracts/ProxyAdmin.sol:ProxyAdmin`
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.source_path(), self.name())
    }
}

impl Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A contract deployed on-chain
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeployedContract {
    /// Which contract was deployed
    pub kind: ContractKind,
    /// The address of the deployed contract
    pub address: Address,
    /// The ABI-encoded constructor arguments it was deployed with
    pub constructor_args: Bytes,
}

// ----------------
// | Transactions |
// ----------------

/// A transaction whose call-data is encrypted before submission
#[derive(Clone, Debug)]
pub struct ShieldedTransactionRequest {
    /// The account or contract the transaction is sent to
    pub destination: Address,
    /// The plaintext call-data
    pub data: Bytes,
    /// The value attached to the transaction, in wei
    pub value: U256,
}

/// A submitted shielded transaction
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ShieldedTransaction {
    /// The hash of the submitted transaction
    pub hash: TxHash,
    /// The recipient of the transaction
    pub to: Address,
}

/// The outcome of a mined transaction
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TxOutcome {
    /// The hash of the transaction
    pub hash: TxHash,
    /// Whether the transaction executed successfully
    pub success: bool,
}

// ---------------
// | Deployments |
// ---------------

/// Everything produced by the deploy-and-upgrade pipeline
#[derive(Clone, Debug)]
pub struct Deployment {
    /// The account that deployed the contracts
    pub deployer: Address,
    /// The first implementation
    pub implementation_v1: DeployedContract,
    /// The proxy admin
    pub proxy_admin: DeployedContract,
    /// The proxy, constructed around the first implementation
    pub proxy: DeployedContract,
    /// The implementation the proxy was upgraded to
    pub implementation_v2: DeployedContract,
    /// The shielded `upgradeAndCall` transaction
    pub upgrade_tx: ShieldedTransaction,
}

impl Deployment {
    /// The deployed contracts, in deployment order
    pub fn contracts(&self) -> [&DeployedContract; 4] {
        [
            &self.implementation_v1,
            &self.proxy_admin,
            &self.proxy,
            &self.implementation_v2,
        ]
    }

    /// The addresses persisted after a deployment
    pub fn record(&self) -> DeploymentRecord {
        DeploymentRecord {
            proxy_admin: self.proxy_admin.address,
            proxy: self.proxy.address,
            implementation_v1: self.implementation_v1.address,
            implementation_v2: self.implementation_v2.address,
        }
    }
}

/// The deployed addresses written to the output files
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DeploymentRecord {
    /// The proxy admin address
    pub proxy_admin: Address,
    /// The proxy address
    pub proxy: Address,
    /// The first implementation's address
    pub implementation_v1: Address,
    /// The second implementation's address
    pub implementation_v2: Address,
}

// ----------------
// | Verification |
// ----------------

/// The result of verifying a single contract
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationOutcome {
    /// The contract that was verified
    pub kind: ContractKind,
    /// Its address
    pub address: Address,
    /// `Err` holds the failure message
    pub result: Result<(), String>,
}

impl VerificationOutcome {
    /// Whether the contract was verified
    pub fn is_verified(&self) -> bool {
        self.result.is_ok()
    }
}

/// The per-contract results of a verification pass, in the order attempted
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VerificationReport {
    /// The individual outcomes
    pub outcomes: Vec<VerificationOutcome>,
}

impl VerificationReport {
    /// Whether every attempted verification succeeded
    pub fn all_verified(&self) -> bool {
        self.outcomes.iter().all(VerificationOutcome::is_verified)
    }

    /// The outcomes that failed
    pub fn failures(&self) -> impl Iterator<Item = &VerificationOutcome> {
        self.outcomes.iter().filter(|o| !o.is_verified())
    }
}
