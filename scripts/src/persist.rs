//! Writing the deployed addresses to disk

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::Path,
};

use tracing::info;

use crate::{
    errors::ScriptError,
    types::{ContractKind, DeploymentRecord, ExplorerConfig, OutputPaths},
};

/// Append the explorer links of the proxy admin and the proxy to the
/// explorer log, and overwrite the address-constants module
pub fn persist(
    paths: &OutputPaths,
    explorer: &ExplorerConfig,
    record: &DeploymentRecord,
) -> Result<(), ScriptError> {
    append_to_file(&paths.explorer_log, &explorer_log_lines(explorer, record))?;
    info!("Explorer links appended to {}", paths.explorer_log.display());

    write_file(&paths.address_constants, &address_constants_module(record))?;
    info!("Addresses written to {}", paths.address_constants.display());

    Ok(())
}

/// The lines appended to the explorer log, one per contract
pub fn explorer_log_lines(explorer: &ExplorerConfig, record: &DeploymentRecord) -> String {
    format!(
        "{}: {}\n{}: {}\n",
        ContractKind::ProxyAdmin,
        explorer.address_link(record.proxy_admin),
        ContractKind::TransparentUpgradeableProxy,
        explorer.address_link(record.proxy),
    )
}

/// The contents of the address-constants module
pub fn address_constants_module(record: &DeploymentRecord) -> String {
    [
        (ContractKind::TransparentUpgradeableProxy, record.proxy),
        (ContractKind::MyContractV1, record.implementation_v1),
        (ContractKind::MyContractV2, record.implementation_v2),
    ]
    .iter()
    .map(|(kind, address)| format!("export const {kind} = '{address}'\n"))
    .collect()
}

/// Create the parent directory of `path` if it is missing
fn ensure_parent_dir(path: &Path) -> Result<(), ScriptError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| ScriptError::WriteFile(e.to_string()))
        }
        _ => Ok(()),
    }
}

/// Append `contents` to the file at `path`, creating it if needed
fn append_to_file(path: &Path, contents: &str) -> Result<(), ScriptError> {
    ensure_parent_dir(path)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut file| file.write_all(contents.as_bytes()))
        .map_err(|e| ScriptError::WriteFile(format!("{}: {e}", path.display())))
}

/// Replace the contents of the file at `path`
fn write_file(path: &Path, contents: &str) -> Result<(), ScriptError> {
    ensure_parent_dir(path)?;
    fs::write(path, contents)
        .map_err(|e| ScriptError::WriteFile(format!("{}: {e}", path.display())))
}
