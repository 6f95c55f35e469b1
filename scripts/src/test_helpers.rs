//! In-memory stand-ins for the chain, the encryption endpoint and the
//! explorer, used by the unit tests

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use alloy::{
    primitives::{Address, Bytes, TxHash, TxKind},
    rpc::types::TransactionRequest,
    sol_types::{SolCall, SolValue},
};

use crate::{
    artifacts::{ContractArtifact, DeploymentArtifacts},
    client::DeployClient,
    errors::ScriptError,
    shielded::PayloadEncryptor,
    solidity::upgradeAndCallCall,
    types::{ContractKind, TxOutcome},
    verify::{SourceVerifier, VerificationRequest},
};

/// The chain ID reported by [`MockChain`]
pub(crate) const MOCK_CHAIN_ID: u64 = 1291;

/// Something that happened on the [`MockChain`]
#[derive(Clone, Debug)]
pub(crate) enum ChainEvent {
    /// A contract was deployed
    Deploy {
        /// The deployed contract
        kind: ContractKind,
        /// Its address
        address: Address,
        /// Its constructor arguments
        constructor_args: Bytes,
    },
    /// A transaction was submitted
    Transaction(TransactionRequest),
}

/// A chain that deploys contracts at sequential addresses and emulates the
/// implementation slot of transparent proxies.
///
/// Transactions sent to a proxy admin are decrypted with [`MockEncryptor`],
/// the way a confidential node would, and applied if they decode as
/// `upgradeAndCall`.
pub(crate) struct MockChain {
    /// The deployer's address
    deployer: Address,
    /// Everything that happened, in order
    events: Mutex<Vec<ChainEvent>>,
    /// Proxy address to implementation address
    implementations: Mutex<HashMap<Address, Address>>,
    /// Proxy address to admin address
    admins: Mutex<HashMap<Address, Address>>,
    /// Transaction hash to execution success
    receipts: Mutex<HashMap<TxHash, bool>>,
    /// The number of contracts deployed so far
    deployed: AtomicUsize,
    /// A contract whose deployment fails
    failing_deploy: Option<ContractKind>,
}

impl MockChain {
    /// An empty chain on which every deployment succeeds
    pub(crate) fn new() -> Self {
        Self {
            deployer: Address::repeat_byte(0xab),
            events: Mutex::new(Vec::new()),
            implementations: Mutex::new(HashMap::new()),
            admins: Mutex::new(HashMap::new()),
            receipts: Mutex::new(HashMap::new()),
            deployed: AtomicUsize::new(0),
            failing_deploy: None,
        }
    }

    /// A chain on which deploying `kind` fails
    pub(crate) fn failing_deploy_of(kind: ContractKind) -> Self {
        Self {
            failing_deploy: Some(kind),
            ..Self::new()
        }
    }

    /// The account deploying every contract
    pub(crate) fn deployer_address(&self) -> Address {
        self.deployer
    }

    /// Everything that happened so far, in order
    pub(crate) fn events(&self) -> Vec<ChainEvent> {
        self.events.lock().unwrap().clone()
    }

    /// The deployed contracts, in deployment order
    pub(crate) fn deployments(&self) -> Vec<(ContractKind, Address, Bytes)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ChainEvent::Deploy {
                    kind,
                    address,
                    constructor_args,
                } => Some((kind, address, constructor_args)),
                ChainEvent::Transaction(_) => None,
            })
            .collect()
    }

    /// The submitted transactions, in submission order
    pub(crate) fn transactions(&self) -> Vec<TransactionRequest> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ChainEvent::Transaction(tx) => Some(tx),
                ChainEvent::Deploy { .. } => None,
            })
            .collect()
    }

    /// Apply a transaction the way the confidential node would, returning
    /// whether it executed successfully
    fn execute(&self, tx: &TransactionRequest) -> bool {
        let Some(TxKind::Call(to)) = tx.to else {
            return false;
        };
        let Some(plaintext) = tx.input.input().and_then(MockEncryptor::decrypt_bytes) else {
            return false;
        };
        let Ok(call) = upgradeAndCallCall::abi_decode(&plaintext) else {
            return false;
        };

        let admins = self.admins.lock().unwrap();
        if admins.get(&call.proxy) != Some(&to) {
            return false;
        }
        self.implementations
            .lock()
            .unwrap()
            .insert(call.proxy, call.implementation);
        true
    }
}

impl DeployClient for MockChain {
    fn deployer(&self) -> Address {
        self.deployer
    }

    async fn chain_id(&self) -> Result<u64, ScriptError> {
        Ok(MOCK_CHAIN_ID)
    }

    async fn deploy(
        &self,
        artifact: &ContractArtifact,
        constructor_args: &Bytes,
    ) -> Result<Address, ScriptError> {
        if self.failing_deploy == Some(artifact.kind) {
            return Err(ScriptError::ContractDeployment(format!(
                "{} deployment reverted",
                artifact.kind
            )));
        }

        let index = self.deployed.fetch_add(1, Ordering::SeqCst);
        let address = Address::with_last_byte(0x10 + index as u8);

        if artifact.kind == ContractKind::TransparentUpgradeableProxy {
            let (logic, admin, _data) =
                <(Address, Address, Bytes)>::abi_decode_params(constructor_args)
                    .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?;
            self.implementations.lock().unwrap().insert(address, logic);
            self.admins.lock().unwrap().insert(address, admin);
        }

        self.events.lock().unwrap().push(ChainEvent::Deploy {
            kind: artifact.kind,
            address,
            constructor_args: constructor_args.clone(),
        });
        Ok(address)
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, ScriptError> {
        let success = self.execute(&tx);

        let mut events = self.events.lock().unwrap();
        let hash = TxHash::with_last_byte(events.len() as u8);
        events.push(ChainEvent::Transaction(tx));
        self.receipts.lock().unwrap().insert(hash, success);
        Ok(hash)
    }

    async fn wait_for_receipt(&self, hash: TxHash) -> Result<TxOutcome, ScriptError> {
        let success = self
            .receipts
            .lock()
            .unwrap()
            .get(&hash)
            .copied()
            .ok_or_else(|| ScriptError::ContractInteraction(format!("unknown tx {hash}")))?;

        Ok(TxOutcome { hash, success })
    }

    async fn implementation_of(&self, proxy: Address) -> Result<Address, ScriptError> {
        Ok(self
            .implementations
            .lock()
            .unwrap()
            .get(&proxy)
            .copied()
            .unwrap_or_default())
    }
}

/// A reversible stand-in for the encryption endpoint, counting its calls
#[derive(Default)]
pub(crate) struct MockEncryptor {
    /// The number of payloads encrypted so far
    calls: AtomicUsize,
}

impl MockEncryptor {
    /// Marks a payload as encrypted
    const MAGIC: [u8; 4] = [0xe5, 0xc0, 0xde, 0xd0];
    /// The key the payload is XORed with
    const KEY: u8 = 0x5a;

    /// The number of payloads encrypted so far
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The ciphertext the encryptor produces for `plaintext`
    pub(crate) fn encrypt_bytes(plaintext: &Bytes) -> Bytes {
        Self::MAGIC
            .iter()
            .copied()
            .chain(plaintext.iter().map(|b| b ^ Self::KEY))
            .collect::<Vec<u8>>()
            .into()
    }

    /// Returns `None` for payloads that were not encrypted
    pub(crate) fn decrypt_bytes(ciphertext: &Bytes) -> Option<Bytes> {
        let body = ciphertext.strip_prefix(Self::MAGIC.as_slice())?;
        Some(body.iter().map(|b| b ^ Self::KEY).collect::<Vec<u8>>().into())
    }
}

impl PayloadEncryptor for MockEncryptor {
    async fn encrypt(&self, plaintext: &Bytes) -> Result<Bytes, ScriptError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::encrypt_bytes(plaintext))
    }
}

/// An encryption endpoint that is unreachable
pub(crate) struct FailingEncryptor;

impl FailingEncryptor {
    /// The error every encryption attempt fails with
    pub(crate) fn error() -> ScriptError {
        ScriptError::Encryption("connection refused".to_string())
    }
}

impl PayloadEncryptor for FailingEncryptor {
    async fn encrypt(&self, _plaintext: &Bytes) -> Result<Bytes, ScriptError> {
        Err(Self::error())
    }
}

/// An explorer that records requests and rejects the configured contracts
#[derive(Default)]
pub(crate) struct MockVerifier {
    /// The contracts whose verification is rejected
    failing: HashSet<ContractKind>,
    /// Every request received, in order
    requests: Mutex<Vec<VerificationRequest>>,
}

impl MockVerifier {
    /// A verifier rejecting the given contracts
    pub(crate) fn failing(kinds: impl IntoIterator<Item = ContractKind>) -> Self {
        Self {
            failing: kinds.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Every request received so far, in order
    pub(crate) fn requests(&self) -> Vec<VerificationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl SourceVerifier for MockVerifier {
    async fn verify(&self, request: &VerificationRequest) -> Result<(), ScriptError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.failing.contains(&request.kind) {
            return Err(ScriptError::Verification(format!(
                "{} bytecode does not match",
                request.kind
            )));
        }

        Ok(())
    }
}

/// Artifacts with distinct dummy bytecode for every contract
pub(crate) fn mock_artifacts() -> DeploymentArtifacts {
    let artifact = |kind: ContractKind, tag: u8| ContractArtifact {
        kind,
        bytecode: Bytes::from(vec![0x60, 0x80, 0x60, 0x40, tag]),
    };

    DeploymentArtifacts {
        implementation_v1: artifact(ContractKind::MyContractV1, 1),
        proxy_admin: artifact(ContractKind::ProxyAdmin, 2),
        proxy: artifact(ContractKind::TransparentUpgradeableProxy, 3),
        implementation_v2: artifact(ContractKind::MyContractV2, 4),
    }
}
