//! Constants used in the deploy script

use alloy::primitives::{b256, B256};

/// The default chain RPC endpoint
pub const DEFAULT_RPC_URL: &str = "https://json-rpc.testnet.swisstronik.com";

/// The JSON-RPC method assumed to return the encrypted form of a transaction payload.
///
/// Not a documented node method; see [`crate::shielded::RpcEncryptor`]
pub const DEFAULT_ENCRYPTION_METHOD: &str = "eth_encryptDataField";

/// The gas limit attached to shielded transactions
pub const DEFAULT_SHIELDED_GAS_LIMIT: u64 = 2_000_000;

/// The default block explorer, used for the explorer-link log
pub const DEFAULT_EXPLORER_URL: &str = "https://explorer-evm.testnet.swisstronik.com";

/// The path segment of the Etherscan-compatible API below the explorer URL
pub const EXPLORER_API_PATH: &str = "api";

/// The default directory holding Hardhat compilation artifacts
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// The default path of the append-only explorer-link log
pub const DEFAULT_EXPLORER_LOG_PATH: &str = "utils/address-with-explorer.txt";

/// The default path of the generated address-constants module
pub const DEFAULT_ADDRESS_CONSTANTS_PATH: &str = "utils/deployed-address.ts";

/// The directory, relative to the project root, holding the Solidity sources
pub const CONTRACTS_SOURCE_DIR: &str = "contracts";

/// The extension of a Solidity source file
pub const SOLIDITY_EXTENSION: &str = "sol";

/// The suffix of the Hardhat debug file pointing at a contract's build info
pub const DBG_FILE_SUFFIX: &str = "dbg.json";

/// The storage slot holding the implementation address of an ERC-1967 proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#logic-contract-address
pub const PROXY_IMPLEMENTATION_STORAGE_SLOT: B256 =
    b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// The number of times a transaction receipt is polled for before giving up
pub const RECEIPT_POLL_ATTEMPTS: usize = 120;

/// The interval between two receipt polls, in milliseconds
pub const RECEIPT_POLL_INTERVAL_MS: u64 = 1_000;

/// The number of times the explorer is asked for a verification status
pub const VERIFY_STATUS_POLL_ATTEMPTS: usize = 10;

/// The interval between two verification status polls, in milliseconds
pub const VERIFY_STATUS_POLL_INTERVAL_MS: u64 = 3_000;

/// The `codeformat` value announcing a standard-JSON compiler input
pub const STANDARD_JSON_CODE_FORMAT: &str = "solidity-standard-json-input";

/// The explorer `status` value of a successful API call
pub const EXPLORER_STATUS_OK: &str = "1";

/// The content type of a `verifysourcecode` submission
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Substring of the explorer response for a contract that is already verified
pub const ALREADY_VERIFIED_MARKER: &str = "already verified";

/// Prefix of the explorer response for a finished, successful verification
pub const VERIFY_PASS_PREFIX: &str = "Pass";

/// Prefix of the explorer response for a finished, failed verification
pub const VERIFY_FAIL_PREFIX: &str = "Fail";
