//! Shielded transactions: transactions whose call-data is encrypted for the
//! node's confidential execution environment before being broadcast

use alloy::{
    network::TransactionBuilder,
    primitives::Bytes,
    rpc::{client::RpcClient, types::TransactionRequest},
    transports::http::reqwest::Url,
};
use tracing::debug;

use crate::{
    client::DeployClient,
    errors::ScriptError,
    types::{ShieldedTransaction, ShieldedTransactionRequest},
};

/// Produces the encrypted form of a transaction payload
#[allow(async_fn_in_trait)]
pub trait PayloadEncryptor {
    /// Encrypt the given plaintext call-data
    async fn encrypt(&self, plaintext: &Bytes) -> Result<Bytes, ScriptError>;
}

/// A [`PayloadEncryptor`] backed by a JSON-RPC encryption endpoint.
///
/// The endpoint is expected to take the hex-encoded plaintext as its only
/// parameter and to return the hex-encoded ciphertext. Swisstronik nodes do
/// not document such a method: the default `eth_encryptDataField` is an
/// assumed name, and a deployment has to point `--encryption-url` and
/// `--encryption-method` at a service implementing this protocol. Other
/// schemes, such as encrypting locally against the node's public key, can
/// be plugged in through [`PayloadEncryptor`].
pub struct RpcEncryptor {
    /// The JSON-RPC client of the encryption endpoint
    client: RpcClient,
    /// The method returning the encrypted payload
    method: String,
}

impl RpcEncryptor {
    /// Create an encryptor calling `method` on the given endpoint
    pub fn new(endpoint: &str, method: impl Into<String>) -> Result<Self, ScriptError> {
        let url =
            Url::parse(endpoint).map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;

        Ok(Self {
            client: RpcClient::new_http(url),
            method: method.into(),
        })
    }
}

impl PayloadEncryptor for RpcEncryptor {
    async fn encrypt(&self, plaintext: &Bytes) -> Result<Bytes, ScriptError> {
        let encrypted: Bytes = self
            .client
            .request(self.method.clone(), (plaintext.clone(),))
            .await
            .map_err(|e| ScriptError::Encryption(e.to_string()))?;

        if encrypted.is_empty() {
            return Err(ScriptError::Encryption(
                "endpoint returned an empty payload".to_string(),
            ));
        }

        Ok(encrypted)
    }
}

/// Encrypt the request's call-data and submit it as a regular transaction
/// signed by the client's deployer.
///
/// The plaintext never leaves the process unencrypted. If encryption fails,
/// nothing is submitted and the encryptor's error is returned as-is.
pub async fn send_shielded_transaction<C: DeployClient, E: PayloadEncryptor>(
    client: &C,
    encryptor: &E,
    request: ShieldedTransactionRequest,
    gas_limit: u64,
) -> Result<ShieldedTransaction, ScriptError> {
    let encrypted = encryptor.encrypt(&request.data).await?;
    debug!(
        "Encrypted {} bytes of call-data into {} bytes",
        request.data.len(),
        encrypted.len()
    );

    let chain_id = client.chain_id().await?;
    let tx = TransactionRequest::default()
        .with_from(client.deployer())
        .with_to(request.destination)
        .with_input(encrypted)
        .with_value(request.value)
        .with_gas_limit(gas_limit)
        .with_chain_id(chain_id);

    let hash = client.send_transaction(tx).await?;

    Ok(ShieldedTransaction {
        hash,
        to: request.destination,
    })
}

#[cfg(test)]
mod tests {
    use alloy::{
        primitives::{bytes, Address, Bytes, TxKind, U256},
        rpc::client::RpcClient,
        transports::mock::Asserter,
    };

    use crate::{
        constants::DEFAULT_SHIELDED_GAS_LIMIT,
        errors::ScriptError,
        test_helpers::{ChainEvent, FailingEncryptor, MockChain, MockEncryptor, MOCK_CHAIN_ID},
        types::ShieldedTransactionRequest,
    };

    use super::{send_shielded_transaction, PayloadEncryptor, RpcEncryptor};

    fn mocked_encryptor(asserter: Asserter) -> RpcEncryptor {
        RpcEncryptor {
            client: RpcClient::mocked(asserter),
            method: "eth_encryptDataField".to_string(),
        }
    }

    fn request() -> ShieldedTransactionRequest {
        ShieldedTransactionRequest {
            destination: Address::with_last_byte(0x42),
            data: bytes!("9623609d00000000"),
            value: U256::from(7),
        }
    }

    #[tokio::test]
    async fn test_submits_encrypted_payload() {
        let chain = MockChain::new();
        let encryptor = MockEncryptor::default();
        let request = request();

        let tx = send_shielded_transaction(
            &chain,
            &encryptor,
            request.clone(),
            DEFAULT_SHIELDED_GAS_LIMIT,
        )
        .await
        .unwrap();

        assert_eq!(tx.to, request.destination);
        assert_eq!(encryptor.calls(), 1);

        let txs = chain.transactions();
        assert_eq!(txs.len(), 1);
        let sent = &txs[0];
        let input = sent.input.input().cloned().unwrap();
        assert_ne!(input, request.data);
        assert_eq!(input, MockEncryptor::encrypt_bytes(&request.data));
        assert_eq!(sent.to, Some(TxKind::Call(request.destination)));
        assert_eq!(sent.from, Some(chain.deployer_address()));
        assert_eq!(sent.value, Some(request.value));
        assert_eq!(sent.gas, Some(2_000_000));
        assert_eq!(sent.chain_id, Some(MOCK_CHAIN_ID));
    }

    #[tokio::test]
    async fn test_encryption_failure_submits_nothing() {
        let chain = MockChain::new();

        let err = send_shielded_transaction(
            &chain,
            &FailingEncryptor,
            request(),
            DEFAULT_SHIELDED_GAS_LIMIT,
        )
        .await
        .unwrap_err();

        assert_eq!(err, FailingEncryptor::error());
        assert!(matches!(err, ScriptError::Encryption(_)));
        assert!(chain
            .events()
            .iter()
            .all(|e| !matches!(e, ChainEvent::Transaction(_))));
    }

    #[tokio::test]
    async fn test_each_send_encrypts_once() {
        let chain = MockChain::new();
        let encryptor = MockEncryptor::default();

        for _ in 0..3 {
            send_shielded_transaction(&chain, &encryptor, request(), DEFAULT_SHIELDED_GAS_LIMIT)
                .await
                .unwrap();
        }

        assert_eq!(encryptor.calls(), 3);
        assert_eq!(chain.transactions().len(), 3);
    }

    #[tokio::test]
    async fn test_rpc_encryptor_returns_ciphertext() {
        let asserter = Asserter::new();
        asserter.push_success(&bytes!("beef"));
        let encryptor = mocked_encryptor(asserter);

        let encrypted = encryptor.encrypt(&bytes!("9623609d")).await.unwrap();
        assert_eq!(encrypted, bytes!("beef"));
    }

    #[tokio::test]
    async fn test_rpc_encryptor_rejects_empty_payload() {
        let asserter = Asserter::new();
        asserter.push_success(&Bytes::new());
        let encryptor = mocked_encryptor(asserter);

        let err = encryptor.encrypt(&bytes!("9623609d")).await.unwrap_err();
        assert_eq!(
            err,
            ScriptError::Encryption("endpoint returned an empty payload".to_string())
        );
    }

    #[tokio::test]
    async fn test_rpc_encryptor_surfaces_endpoint_errors() {
        let asserter = Asserter::new();
        asserter.push_failure_msg("method not found");
        let encryptor = mocked_encryptor(asserter);

        let err = encryptor.encrypt(&bytes!("9623609d")).await.unwrap_err();
        match err {
            ScriptError::Encryption(msg) => assert!(msg.contains("method not found")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
