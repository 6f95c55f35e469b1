//! Definitions of errors that can occur during the execution of the deploy script

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// Errors that can occur during the execution of the deploy script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// Error initializing the RPC client or the signer
    ClientInitialization(String),
    /// Error reading or parsing a compilation artifact
    ArtifactParsing(String),
    /// Error constructing calldata for a contract method
    CalldataConstruction(String),
    /// Error deploying a contract
    ContractDeployment(String),
    /// Error submitting a transaction or reading chain state
    ContractInteraction(String),
    /// Error obtaining the encrypted form of a transaction payload
    Encryption(String),
    /// Error verifying a contract's source on the block explorer
    Verification(String),
    /// Error writing one of the output files
    WriteFile(String),
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::ClientInitialization(s) => write!(f, "error initializing client: {}", s),
            ScriptError::ArtifactParsing(s) => write!(f, "error parsing artifact: {}", s),
            ScriptError::CalldataConstruction(s) => write!(f, "error constructing calldata: {}", s),
            ScriptError::ContractDeployment(s) => write!(f, "error deploying contract: {}", s),
            ScriptError::ContractInteraction(s) => {
                write!(f, "error interacting with contract: {}", s)
            }
            ScriptError::Encryption(s) => write!(f, "error encrypting payload: {}", s),
            ScriptError::Verification(s) => write!(f, "error verifying contract: {}", s),
            ScriptError::WriteFile(s) => write!(f, "error writing file: {}", s),
        }
    }
}

impl Error for ScriptError {}
