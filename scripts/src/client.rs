//! The chain client used by the deploy script

use std::{str::FromStr, time::Duration};

use alloy::{
    network::{Ethereum, TransactionBuilder},
    primitives::{Address, Bytes, TxHash, B256, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::{TransactionReceipt, TransactionRequest},
    signers::local::PrivateKeySigner,
    transports::http::reqwest::Url,
};
use tokio::time::sleep;

use crate::{
    artifacts::ContractArtifact,
    constants::{PROXY_IMPLEMENTATION_STORAGE_SLOT, RECEIPT_POLL_ATTEMPTS, RECEIPT_POLL_INTERVAL_MS},
    errors::ScriptError,
    types::TxOutcome,
};

/// The chain operations the deploy script depends on.
///
/// Every method is awaited to completion before the script moves on,
/// so implementations need not be `Send`.
#[allow(async_fn_in_trait)]
pub trait DeployClient {
    /// The address of the account signing every transaction
    fn deployer(&self) -> Address;

    /// The chain ID of the connected network
    async fn chain_id(&self) -> Result<u64, ScriptError>;

    /// Deploy a contract and wait for it to be mined, returning its address
    async fn deploy(
        &self,
        artifact: &ContractArtifact,
        constructor_args: &Bytes,
    ) -> Result<Address, ScriptError>;

    /// Sign and broadcast a transaction without waiting for it to be mined
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, ScriptError>;

    /// Wait for the receipt of a broadcast transaction
    async fn wait_for_receipt(&self, hash: TxHash) -> Result<TxOutcome, ScriptError>;

    /// Read the implementation address an ERC-1967 proxy delegates to
    async fn implementation_of(&self, proxy: Address) -> Result<Address, ScriptError>;
}

/// A [`DeployClient`] talking to an RPC node, signing with a local private key
#[derive(Clone)]
pub struct RpcDeployClient {
    /// The provider, with the deployer's wallet attached
    provider: DynProvider<Ethereum>,
    /// The deployer's address
    deployer: Address,
}

/// Sets up the client with which the contracts are deployed
pub fn setup_client(priv_key: &str, rpc_url: &str) -> Result<RpcDeployClient, ScriptError> {
    let signer = PrivateKeySigner::from_str(priv_key)
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
    let url = Url::parse(rpc_url).map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;

    let deployer = signer.address();
    let provider = ProviderBuilder::new().wallet(signer).connect_http(url);

    Ok(RpcDeployClient {
        provider: DynProvider::new(provider),
        deployer,
    })
}

impl DeployClient for RpcDeployClient {
    fn deployer(&self) -> Address {
        self.deployer
    }

    async fn chain_id(&self) -> Result<u64, ScriptError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))
    }

    async fn deploy(
        &self,
        artifact: &ContractArtifact,
        constructor_args: &Bytes,
    ) -> Result<Address, ScriptError> {
        let init_code = [artifact.bytecode.as_ref(), constructor_args.as_ref()].concat();
        let tx = TransactionRequest::default()
            .with_from(self.deployer)
            .with_deploy_code(init_code);

        let pending_tx = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?;
        let receipt = poll_receipt(
            &self.provider,
            *pending_tx.tx_hash(),
            RECEIPT_POLL_ATTEMPTS,
            Duration::from_millis(RECEIPT_POLL_INTERVAL_MS),
            ScriptError::ContractDeployment,
        )
        .await?;

        if !receipt.status() {
            return Err(ScriptError::ContractDeployment(format!(
                "{} deployment reverted in {}",
                artifact.kind, receipt.transaction_hash
            )));
        }

        receipt.contract_address.ok_or_else(|| {
            ScriptError::ContractDeployment(format!(
                "no contract address in receipt of {} deployment",
                artifact.kind
            ))
        })
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, ScriptError> {
        let pending_tx = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

        Ok(*pending_tx.tx_hash())
    }

    async fn wait_for_receipt(&self, hash: TxHash) -> Result<TxOutcome, ScriptError> {
        let receipt = poll_receipt(
            &self.provider,
            hash,
            RECEIPT_POLL_ATTEMPTS,
            Duration::from_millis(RECEIPT_POLL_INTERVAL_MS),
            ScriptError::ContractInteraction,
        )
        .await?;

        Ok(TxOutcome {
            hash,
            success: receipt.status(),
        })
    }

    async fn implementation_of(&self, proxy: Address) -> Result<Address, ScriptError> {
        let slot = U256::from_be_bytes(PROXY_IMPLEMENTATION_STORAGE_SLOT.0);
        let word = self
            .provider
            .get_storage_at(proxy, slot)
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

        Ok(Address::from_word(B256::from(word)))
    }
}

/// Poll the node for the receipt of `hash`, giving up after `attempts` polls.
///
/// Errors are reported through `to_error` so that deployments and contract
/// interactions keep their own error variants.
async fn poll_receipt<P: Provider>(
    provider: &P,
    hash: TxHash,
    attempts: usize,
    interval: Duration,
    to_error: fn(String) -> ScriptError,
) -> Result<TransactionReceipt, ScriptError> {
    for _ in 0..attempts {
        let receipt = provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| to_error(e.to_string()))?;

        match receipt {
            Some(receipt) => return Ok(receipt),
            None => sleep(interval).await,
        }
    }

    Err(to_error(format!("no receipt for {hash} after {attempts} attempts")))
}
