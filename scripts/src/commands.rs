//! The deploy-and-upgrade pipeline.
//!
//! Every step is awaited before the next one starts, and any error aborts
//! the run. Contracts deployed before a failure stay on-chain.

use alloy::{
    primitives::{Bytes, U256},
    sol_types::{SolCall, SolValue},
};
use tracing::{info, warn};

use crate::{
    artifacts::{ContractArtifact, DeploymentArtifacts},
    client::DeployClient,
    errors::ScriptError,
    persist::persist,
    shielded::{send_shielded_transaction, PayloadEncryptor},
    solidity::upgradeAndCallCall,
    types::{
        DeployConfig, DeployedContract, Deployment, ShieldedTransaction,
        ShieldedTransactionRequest, VerificationReport,
    },
    verify::{verify_all, SourceVerifier},
};

/// Deploy a contract with the given ABI-encoded constructor arguments
pub async fn deploy_contract<C: DeployClient>(
    client: &C,
    artifact: &ContractArtifact,
    constructor_args: Bytes,
) -> Result<DeployedContract, ScriptError> {
    let address = client.deploy(artifact, &constructor_args).await?;
    info!("{} deployed to: {address}", artifact.kind);

    Ok(DeployedContract {
        kind: artifact.kind,
        address,
        constructor_args,
    })
}

/// Deploy the first implementation, which takes no constructor arguments
pub async fn deploy_implementation_v1<C: DeployClient>(
    client: &C,
    artifacts: &DeploymentArtifacts,
) -> Result<DeployedContract, ScriptError> {
    deploy_contract(client, &artifacts.implementation_v1, Bytes::new()).await
}

/// Deploy the proxy admin, owned by the deployer
pub async fn deploy_proxy_admin<C: DeployClient>(
    client: &C,
    artifacts: &DeploymentArtifacts,
) -> Result<DeployedContract, ScriptError> {
    let constructor_args = (client.deployer(),).abi_encode_params();
    deploy_contract(client, &artifacts.proxy_admin, constructor_args.into()).await
}

/// Deploy the transparent proxy in front of the first implementation.
///
/// No initialization call is made through the proxy.
pub async fn deploy_proxy<C: DeployClient>(
    client: &C,
    artifacts: &DeploymentArtifacts,
    implementation_v1: &DeployedContract,
    proxy_admin: &DeployedContract,
) -> Result<DeployedContract, ScriptError> {
    let constructor_args =
        (implementation_v1.address, proxy_admin.address, Bytes::new()).abi_encode_params();
    deploy_contract(client, &artifacts.proxy, constructor_args.into()).await
}

/// Deploy the implementation the proxy is upgraded to
pub async fn deploy_implementation_v2<C: DeployClient>(
    client: &C,
    artifacts: &DeploymentArtifacts,
) -> Result<DeployedContract, ScriptError> {
    deploy_contract(client, &artifacts.implementation_v2, Bytes::new()).await
}

/// Calldata for `ProxyAdmin.upgradeAndCall(proxy, implementation, 0x)`
pub fn upgrade_calldata(proxy: &DeployedContract, implementation: &DeployedContract) -> Bytes {
    upgradeAndCallCall {
        proxy: proxy.address,
        implementation: implementation.address,
        data: Bytes::new(),
    }
    .abi_encode()
    .into()
}

/// Point the proxy at the new implementation with a shielded
/// `upgradeAndCall` sent to the proxy admin, and wait for it to be mined
pub async fn upgrade_proxy<C: DeployClient, E: PayloadEncryptor>(
    client: &C,
    encryptor: &E,
    gas_limit: u64,
    proxy_admin: &DeployedContract,
    proxy: &DeployedContract,
    implementation: &DeployedContract,
) -> Result<ShieldedTransaction, ScriptError> {
    info!("Upgrading proxy...");

    let request = ShieldedTransactionRequest {
        destination: proxy_admin.address,
        data: upgrade_calldata(proxy, implementation),
        value: U256::ZERO,
    };
    let tx = send_shielded_transaction(client, encryptor, request, gas_limit).await?;

    let outcome = client.wait_for_receipt(tx.hash).await?;
    if !outcome.success {
        return Err(ScriptError::ContractInteraction(format!(
            "upgrade transaction {} reverted",
            tx.hash
        )));
    }

    // Confidential nodes may not expose proxy storage, so a mismatch is
    // only reported
    match client.implementation_of(proxy.address).await {
        Ok(current) if current == implementation.address => {}
        Ok(current) => warn!(
            "Proxy {} reports implementation {current} after upgrade, expected {}",
            proxy.address, implementation.address
        ),
        Err(e) => warn!("Could not read proxy implementation: {e}"),
    }

    info!(
        "Proxy upgraded to {} at: {}",
        implementation.kind, implementation.address
    );
    Ok(tx)
}

/// Deploy all four contracts and upgrade the proxy to the second
/// implementation
pub async fn deploy_and_upgrade<C: DeployClient, E: PayloadEncryptor>(
    client: &C,
    encryptor: &E,
    artifacts: &DeploymentArtifacts,
    gas_limit: u64,
) -> Result<Deployment, ScriptError> {
    let deployer = client.deployer();
    info!("Deploying contracts with the account: {deployer}");

    let implementation_v1 = deploy_implementation_v1(client, artifacts).await?;
    let proxy_admin = deploy_proxy_admin(client, artifacts).await?;
    let proxy = deploy_proxy(client, artifacts, &implementation_v1, &proxy_admin).await?;
    let implementation_v2 = deploy_implementation_v2(client, artifacts).await?;

    let upgrade_tx = upgrade_proxy(
        client,
        encryptor,
        gas_limit,
        &proxy_admin,
        &proxy,
        &implementation_v2,
    )
    .await?;

    Ok(Deployment {
        deployer,
        implementation_v1,
        proxy_admin,
        proxy,
        implementation_v2,
        upgrade_tx,
    })
}

/// Run the whole script: deploy and upgrade, persist the addresses, then
/// verify every deployed contract.
///
/// Only deployment, upgrade and persistence errors are returned; the
/// verification results are in the returned report.
pub async fn run<C, E, V>(
    config: &DeployConfig,
    client: &C,
    encryptor: &E,
    verifier: &V,
    artifacts: &DeploymentArtifacts,
) -> Result<VerificationReport, ScriptError>
where
    C: DeployClient,
    E: PayloadEncryptor,
    V: SourceVerifier,
{
    let deployment = deploy_and_upgrade(client, encryptor, artifacts, config.gas_limit).await?;

    persist(&config.output_paths, &config.explorer, &deployment.record())?;

    if !config.verify {
        info!("Skipping source verification");
        return Ok(VerificationReport::default());
    }

    Ok(verify_all(verifier, deployment.contracts()).await)
}
