//! Best-effort source verification of the deployed contracts on the block
//! explorer. A failed verification is reported, never propagated.

use std::{future::Future, time::Duration};

use alloy::{
    primitives::{hex, Address, Bytes},
    transports::http::reqwest::{self, header::CONTENT_TYPE, Url},
};
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{info, warn};
use url::form_urlencoded;

use crate::{
    artifacts::{ArtifactStore, BuildInfo},
    constants::{
        ALREADY_VERIFIED_MARKER, EXPLORER_STATUS_OK, FORM_CONTENT_TYPE,
        STANDARD_JSON_CODE_FORMAT, VERIFY_FAIL_PREFIX, VERIFY_PASS_PREFIX,
        VERIFY_STATUS_POLL_ATTEMPTS, VERIFY_STATUS_POLL_INTERVAL_MS,
    },
    errors::ScriptError,
    types::{
        ContractKind, DeployedContract, ExplorerConfig, VerificationOutcome, VerificationReport,
    },
};

/// What the explorer needs to know to verify a deployed contract
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationRequest {
    /// The contract being verified
    pub kind: ContractKind,
    /// Its on-chain address
    pub address: Address,
    /// Its fully qualified name, e.g. `contracts/ProxyAdmin.sol:ProxyAdmin`
    pub contract: String,
    /// The ABI-encoded constructor arguments it was deployed with
    pub constructor_args: Bytes,
}

impl From<&DeployedContract> for VerificationRequest {
    fn from(contract: &DeployedContract) -> Self {
        Self {
            kind: contract.kind,
            address: contract.address,
            contract: contract.kind.qualified_name(),
            constructor_args: contract.constructor_args.clone(),
        }
    }
}

/// A backend able to verify a deployed contract's source
#[allow(async_fn_in_trait)]
pub trait SourceVerifier {
    /// Verify a single contract
    async fn verify(&self, request: &VerificationRequest) -> Result<(), ScriptError>;
}

/// Verify a single contract, turning any failure into a failed outcome
pub async fn verify_contract<V: SourceVerifier>(
    verifier: &V,
    contract: &DeployedContract,
) -> VerificationOutcome {
    info!("Verifying contract at {} ...", contract.address);

    let request = VerificationRequest::from(contract);
    let result = match verifier.verify(&request).await {
        Ok(()) => {
            info!("Contract verified: {}", contract.address);
            Ok(())
        }
        Err(e) => {
            warn!("Verification failed for {}: {e}", contract.address);
            Err(e.to_string())
        }
    };

    VerificationOutcome {
        kind: contract.kind,
        address: contract.address,
        result,
    }
}

/// Verify the given contracts one after the other
pub async fn verify_all<'a, V: SourceVerifier>(
    verifier: &V,
    contracts: impl IntoIterator<Item = &'a DeployedContract>,
) -> VerificationReport {
    let mut report = VerificationReport::default();
    for contract in contracts {
        report.outcomes.push(verify_contract(verifier, contract).await);
    }

    report
}

// ---------------------
// | Explorer Verifier |
// ---------------------

/// The envelope of every Etherscan-compatible API response
#[derive(Debug, Deserialize)]
pub(crate) struct ExplorerResponse {
    /// `"1"` on success
    status: String,
    /// A short description of the status
    message: String,
    /// The payload: a GUID, a status string or an error
    result: String,
}

/// The state of a submitted verification, as reported by the explorer
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum VerificationStatus {
    /// The source matches the deployed bytecode
    Verified,
    /// The explorer rejected the source
    Failed(String),
    /// The explorer has not finished yet
    Pending,
}

impl VerificationStatus {
    /// Interpret the `result` of a `checkverifystatus` call
    pub(crate) fn from_result(result: &str) -> Self {
        if result.starts_with(VERIFY_PASS_PREFIX) || is_already_verified(result) {
            VerificationStatus::Verified
        } else if result.starts_with(VERIFY_FAIL_PREFIX) {
            VerificationStatus::Failed(result.to_string())
        } else {
            VerificationStatus::Pending
        }
    }
}

/// Whether an explorer message says the contract is already verified
fn is_already_verified(message: &str) -> bool {
    message.to_lowercase().contains(ALREADY_VERIFIED_MARKER)
}

/// Build the form of a `verifysourcecode` submission
pub(crate) fn verification_form(
    request: &VerificationRequest,
    build_info: &BuildInfo,
    api_key: &str,
) -> Result<Vec<(&'static str, String)>, ScriptError> {
    let source_code = serde_json::to_string(&build_info.input)
        .map_err(|e| ScriptError::Verification(e.to_string()))?;

    Ok(vec![
        ("apikey", api_key.to_string()),
        ("module", "contract".to_string()),
        ("action", "verifysourcecode".to_string()),
        ("contractaddress", request.address.to_string()),
        ("sourceCode", source_code),
        ("codeformat", STANDARD_JSON_CODE_FORMAT.to_string()),
        ("contractname", request.contract.clone()),
        (
            "compilerversion",
            format!("v{}", build_info.solc_long_version),
        ),
        // Sic: the Etherscan API spells the field this way
        ("constructorArguements", hex::encode(&request.constructor_args)),
    ])
}

/// A [`SourceVerifier`] submitting standard-JSON compiler input to an
/// Etherscan-compatible explorer API
pub struct ExplorerVerifier {
    /// The HTTP client used for API calls
    http: reqwest::Client,
    /// The explorer's API endpoint
    api_url: Url,
    /// The API key sent with every call
    api_key: String,
    /// Where the contracts' build info is read from
    artifacts: ArtifactStore,
}

impl ExplorerVerifier {
    /// Create a verifier for the given explorer
    pub fn new(explorer: &ExplorerConfig, artifacts: ArtifactStore) -> Result<Self, ScriptError> {
        let api_url = Url::parse(&explorer.api_url)
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;

        Ok(Self {
            http: reqwest::Client::new(),
            api_url,
            api_key: explorer.api_key.clone(),
            artifacts,
        })
    }

    /// Fetch the `checkverifystatus` result of the submission identified by `guid`
    async fn check_status(&self, guid: &str) -> Result<String, ScriptError> {
        let mut url = self.api_url.clone();
        url.query_pairs_mut().extend_pairs([
            ("apikey", self.api_key.as_str()),
            ("module", "contract"),
            ("action", "checkverifystatus"),
            ("guid", guid),
        ]);

        let response = read_body(self.http.get(url).send().await).await?;
        Ok(decode_response(&response)?.result)
    }
}

impl SourceVerifier for ExplorerVerifier {
    async fn verify(&self, request: &VerificationRequest) -> Result<(), ScriptError> {
        let build_info = self.artifacts.build_info(request.kind)?;
        let form = verification_form(request, &build_info, &self.api_key)?;
        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&form)
            .finish();

        let response = self
            .http
            .post(self.api_url.clone())
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await;
        let response = decode_response(&read_body(response).await?)?;

        match submission_outcome(&response)? {
            Some(guid) => {
                poll_verification_status(
                    VERIFY_STATUS_POLL_ATTEMPTS,
                    Duration::from_millis(VERIFY_STATUS_POLL_INTERVAL_MS),
                    || self.check_status(&guid),
                )
                .await
            }
            None => Ok(()),
        }
    }
}

/// Interpret the response to a `verifysourcecode` submission.
///
/// Returns the GUID of the queued verification, or `None` if the explorer
/// reports the contract as already verified.
pub(crate) fn submission_outcome(
    response: &ExplorerResponse,
) -> Result<Option<String>, ScriptError> {
    if is_already_verified(&response.result) {
        return Ok(None);
    }
    if response.status != EXPLORER_STATUS_OK {
        return Err(ScriptError::Verification(format!(
            "{}: {}",
            response.message, response.result
        )));
    }

    Ok(Some(response.result.clone()))
}

/// Call `check` until it reports a settled verification, at most `attempts`
/// times with `interval` between calls
pub(crate) async fn poll_verification_status<F, Fut>(
    attempts: usize,
    interval: Duration,
    mut check: F,
) -> Result<(), ScriptError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, ScriptError>>,
{
    for _ in 0..attempts {
        sleep(interval).await;

        match VerificationStatus::from_result(&check().await?) {
            VerificationStatus::Verified => return Ok(()),
            VerificationStatus::Failed(reason) => return Err(ScriptError::Verification(reason)),
            VerificationStatus::Pending => continue,
        }
    }

    Err(ScriptError::Verification(format!(
        "verification still pending after {attempts} attempts"
    )))
}

/// Read the body of an explorer API call
async fn read_body(
    response: Result<reqwest::Response, reqwest::Error>,
) -> Result<String, ScriptError> {
    response
        .and_then(|r| r.error_for_status())
        .map_err(|e| ScriptError::Verification(e.to_string()))?
        .text()
        .await
        .map_err(|e| ScriptError::Verification(e.to_string()))
}

/// Decode the body of an explorer API call
pub(crate) fn decode_response(body: &str) -> Result<ExplorerResponse, ScriptError> {
    serde_json::from_str(body)
        .map_err(|e| ScriptError::Verification(format!("unexpected explorer response: {e}")))
}
