//! Loading of Hardhat compilation artifacts.
//!
//! Artifacts are laid out the way Hardhat writes them:
//!
//! ```text
//! artifacts/
//! ├── build-info/<id>.json
//! └── contracts/<Name>.sol/
//!     ├── <Name>.json
//!     └── <Name>.dbg.json
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use alloy::primitives::Bytes;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

use crate::{
    constants::DBG_FILE_SUFFIX,
    errors::ScriptError,
    types::ContractKind,
};

/// The parts of a Hardhat artifact needed to deploy a contract
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractArtifact {
    /// The contract the artifact was compiled from
    pub kind: ContractKind,
    /// The creation bytecode, without constructor arguments
    pub bytecode: Bytes,
}

/// The compiler input and version a contract was built with
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    /// The full compiler version, e.g. `0.8.20+commit.a1b79de6`
    pub solc_long_version: String,
    /// The standard-JSON compiler input
    pub input: Value,
}

/// The on-disk shape of `<Name>.json`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardhatArtifact {
    /// The contract's name, without its source path
    contract_name: String,
    /// The hex-encoded creation bytecode
    bytecode: String,
}

/// The on-disk shape of `<Name>.dbg.json`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardhatDebugFile {
    /// The build-info path, relative to the debug file's directory
    build_info: String,
}

/// A Hardhat artifacts directory
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    /// The root of the artifacts directory
    root: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at the given artifacts directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory holding the artifact files of the given contract
    fn contract_dir(&self, kind: ContractKind) -> PathBuf {
        self.root.join(kind.source_path())
    }

    /// The path of the given contract's artifact
    pub fn artifact_path(&self, kind: ContractKind) -> PathBuf {
        self.contract_dir(kind).join(format!("{}.json", kind.name()))
    }

    /// The path of the given contract's debug file
    pub fn debug_file_path(&self, kind: ContractKind) -> PathBuf {
        self.contract_dir(kind)
            .join(format!("{}.{DBG_FILE_SUFFIX}", kind.name()))
    }

    /// Load the deployable artifact of the given contract
    pub fn load(&self, kind: ContractKind) -> Result<ContractArtifact, ScriptError> {
        let artifact: HardhatArtifact = read_json(&self.artifact_path(kind))?;
        if artifact.contract_name != kind.name() {
            return Err(ScriptError::ArtifactParsing(format!(
                "expected artifact of {}, found {}",
                kind, artifact.contract_name
            )));
        }

        let bytecode = Bytes::from_str(&artifact.bytecode).map_err(|e| {
            ScriptError::ArtifactParsing(format!("invalid bytecode for {kind}: {e}"))
        })?;
        if bytecode.is_empty() {
            return Err(ScriptError::ArtifactParsing(format!(
                "{kind} has no creation bytecode"
            )));
        }

        Ok(ContractArtifact { kind, bytecode })
    }

    /// Load the build info the given contract was compiled in
    pub fn build_info(&self, kind: ContractKind) -> Result<BuildInfo, ScriptError> {
        let debug_file: HardhatDebugFile = read_json(&self.debug_file_path(kind))?;
        // The build info path is relative to the debug file
        let build_info_path = self.contract_dir(kind).join(debug_file.build_info);
        read_json(&build_info_path)
    }
}

/// The artifacts of every contract the script deploys
#[derive(Clone, Debug)]
pub struct DeploymentArtifacts {
    /// The first implementation
    pub implementation_v1: ContractArtifact,
    /// The proxy admin
    pub proxy_admin: ContractArtifact,
    /// The transparent upgradeable proxy
    pub proxy: ContractArtifact,
    /// The second implementation
    pub implementation_v2: ContractArtifact,
}

impl DeploymentArtifacts {
    /// Load all artifacts up front, so that a missing one is reported
    /// before anything is deployed
    pub fn load(store: &ArtifactStore) -> Result<Self, ScriptError> {
        Ok(Self {
            implementation_v1: store.load(ContractKind::MyContractV1)?,
            proxy_admin: store.load(ContractKind::ProxyAdmin)?,
            proxy: store.load(ContractKind::TransparentUpgradeableProxy)?,
            implementation_v2: store.load(ContractKind::MyContractV2)?,
        })
    }
}

/// Read and deserialize a JSON file
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ScriptError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&contents)
        .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {e}", path.display())))
}
