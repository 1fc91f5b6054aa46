//! Submitting contract sources to Etherscan-compatible block explorers

use std::time::Duration;

use alloy::primitives::Address;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    abi::ConstructorArgs,
    artifacts::BuildInfo,
    config::{Config, ExplorerConfig},
    constants::{
        ALREADY_VERIFIED_RESULTS, MAX_VERIFY_STATUS_POLLS, MISSING_BYTECODE_RESULT,
        PENDING_RESULT, STANDARD_JSON_CODE_FORMAT, VERIFIED_RESULT, VERIFY_POLL_INTERVAL_SECS,
    },
    errors::ScriptError,
    plans::ContractId,
};

/// Everything an explorer needs to match a deployed contract to its source
#[derive(Debug, Clone)]
pub struct VerificationRequest {
    /// The address of the deployed contract
    pub address: Address,
    /// The contract, by source file and name
    pub contract: ContractId,
    /// The full compiler version, e.g. `v0.8.23+commit.f704f362`
    pub compiler_version: String,
    /// The solc standard JSON input, serialized
    pub source: String,
    /// The constructor arguments the contract was deployed with
    pub args: ConstructorArgs,
}

impl VerificationRequest {
    /// Build a request from the build that produced the contract
    pub fn new(
        address: Address,
        contract: ContractId,
        build_info: &BuildInfo,
        args: ConstructorArgs,
    ) -> Result<Self, ScriptError> {
        let source = serde_json::to_string(&build_info.input)
            .map_err(|e| ScriptError::Verification(e.to_string()))?;

        Ok(Self {
            address,
            contract,
            compiler_version: build_info.compiler_version(),
            source,
            args,
        })
    }
}

/// Submits contract sources for verification
#[async_trait]
pub trait SourceVerifier {
    /// Verify the contract described by `request`, resolving once the
    /// explorer has accepted or rejected it
    async fn verify(&self, request: &VerificationRequest) -> Result<(), ScriptError>;
}

/// The envelope of every Etherscan API response
#[derive(Debug, Clone, Deserialize)]
pub struct ExplorerResponse {
    /// `"1"` on success, `"0"` otherwise
    pub status: String,
    /// A short status message
    pub message: String,
    /// The GUID of a submission, or a human readable status
    pub result: String,
}

/// The state of a verification as reported by the explorer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    /// The submission is queued
    Pending,
    /// The source was verified
    Verified,
    /// The source had already been verified
    AlreadyVerified,
    /// The explorer rejected the submission
    Failed(String),
}

impl ExplorerResponse {
    /// Whether the request itself succeeded
    pub fn is_ok(&self) -> bool {
        self.status == "1"
    }

    /// Interpret a `checkverifystatus` response
    pub fn verification_status(&self) -> VerificationStatus {
        if self.result == PENDING_RESULT {
            VerificationStatus::Pending
        } else if self.result == VERIFIED_RESULT {
            VerificationStatus::Verified
        } else if self.is_already_verified() {
            VerificationStatus::AlreadyVerified
        } else {
            VerificationStatus::Failed(self.result.clone())
        }
    }

    /// Whether the explorer reports the source as already verified
    pub fn is_already_verified(&self) -> bool {
        ALREADY_VERIFIED_RESULTS
            .iter()
            .any(|prefix| self.result.starts_with(prefix))
    }
}

/// The HTTP exchanges of the Etherscan verification API
#[async_trait]
pub trait ExplorerClient {
    /// Submit a source for verification
    async fn submit(&self, request: &VerificationRequest) -> Result<ExplorerResponse, ScriptError>;

    /// Check the status of the submission identified by `guid`
    async fn check_status(&self, guid: &str) -> Result<ExplorerResponse, ScriptError>;
}

/// An [`ExplorerClient`] talking to an Etherscan-compatible API over HTTP
pub struct EtherscanClient {
    /// The HTTP client
    client: Client,
    /// The explorer endpoints
    explorer: ExplorerConfig,
    /// The explorer API key, required once a verification is submitted
    api_key: Option<String>,
}

impl EtherscanClient {
    /// Create a client for the configured network's explorer
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            explorer: config.network.explorer,
            api_key: config.explorer_api_key.clone(),
        }
    }

    fn api_key(&self) -> Result<&str, ScriptError> {
        self.api_key.as_deref().ok_or_else(|| {
            ScriptError::Verification(format!(
                "no explorer API key configured, set {} or --explorer-api-key",
                self.explorer.api_key_env
            ))
        })
    }
}

#[async_trait]
impl ExplorerClient for EtherscanClient {
    async fn submit(&self, request: &VerificationRequest) -> Result<ExplorerResponse, ScriptError> {
        let address = format!("{:#x}", request.address);
        let contract_name = request.contract.fully_qualified_name();
        let constructor_args = request.args.encoded_hex();
        let form = [
            ("apikey", self.api_key()?),
            ("module", "contract"),
            ("action", "verifysourcecode"),
            ("contractaddress", address.as_str()),
            ("sourceCode", request.source.as_str()),
            ("codeformat", STANDARD_JSON_CODE_FORMAT),
            ("contractname", contract_name.as_str()),
            ("compilerversion", request.compiler_version.as_str()),
            // Misspelled in the Etherscan API
            ("constructorArguements", constructor_args.as_str()),
        ];

        let response: ExplorerResponse = self
            .client
            .post(self.explorer.api_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ScriptError::Verification(e.to_string()))?
            .json()
            .await
            .map_err(|e| ScriptError::Verification(e.to_string()))?;
        debug!("Verification submission response: {response:?}");

        Ok(response)
    }

    async fn check_status(&self, guid: &str) -> Result<ExplorerResponse, ScriptError> {
        let query = [
            ("apikey", self.api_key()?),
            ("module", "contract"),
            ("action", "checkverifystatus"),
            ("guid", guid),
        ];

        let response: ExplorerResponse = self
            .client
            .get(self.explorer.api_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| ScriptError::Verification(e.to_string()))?
            .json()
            .await
            .map_err(|e| ScriptError::Verification(e.to_string()))?;
        debug!("Verification status response: {response:?}");

        Ok(response)
    }
}

/// Verifies sources through an Etherscan-compatible explorer, polling each
/// submission until the explorer accepts or rejects it
pub struct EtherscanVerifier<C = EtherscanClient> {
    /// The explorer API
    client: C,
    /// The explorer endpoints
    explorer: ExplorerConfig,
    /// The pause between status checks
    poll_interval: Duration,
}

impl EtherscanVerifier {
    /// Create a verifier for the configured network's explorer
    pub fn new(config: &Config) -> Self {
        Self::with_client(EtherscanClient::new(config), config.network.explorer)
    }
}

impl<C> EtherscanVerifier<C> {
    /// Create a verifier submitting through `client`
    pub fn with_client(client: C, explorer: ExplorerConfig) -> Self {
        Self {
            client,
            explorer,
            poll_interval: Duration::from_secs(VERIFY_POLL_INTERVAL_SECS),
        }
    }

    /// The explorer page of a verified contract
    pub fn contract_url(&self, address: Address) -> String {
        format!(
            "{}/address/{:#x}#code",
            self.explorer.browser_url.trim_end_matches('/'),
            address
        )
    }
}

#[async_trait]
impl<C: ExplorerClient + Send + Sync> SourceVerifier for EtherscanVerifier<C> {
    async fn verify(&self, request: &VerificationRequest) -> Result<(), ScriptError> {
        info!(
            "Verifying {} at {:#x}",
            request.contract.fully_qualified_name(),
            request.address
        );

        let submission = self.client.submit(request).await?;
        if !submission.is_ok() {
            if submission.is_already_verified() {
                info!("{} is already verified", request.contract);
                return Ok(());
            }
            if submission.result.starts_with(MISSING_BYTECODE_RESULT) {
                return Err(ScriptError::Verification(format!(
                    "{}, the explorer has not indexed the contract yet, \
                     retry with a longer --verify-delay-secs",
                    submission.result
                )));
            }
            return Err(ScriptError::Verification(submission.result));
        }

        let guid = submission.result;
        for _ in 0..MAX_VERIFY_STATUS_POLLS {
            tokio::time::sleep(self.poll_interval).await;
            match self.client.check_status(&guid).await?.verification_status() {
                VerificationStatus::Pending => continue,
                VerificationStatus::Verified => {
                    info!(
                        "Successfully verified {}: {}",
                        request.contract,
                        self.contract_url(request.address)
                    );
                    return Ok(());
                }
                VerificationStatus::AlreadyVerified => {
                    info!("{} is already verified", request.contract);
                    return Ok(());
                }
                VerificationStatus::Failed(reason) => {
                    return Err(ScriptError::Verification(reason));
                }
            }
        }

        Err(ScriptError::Verification(format!(
            "verification {guid} still pending after {MAX_VERIFY_STATUS_POLLS} status checks"
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, sync::Mutex, time::Duration};

    use alloy::{json_abi::JsonAbi, primitives::address};
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::time::Instant;

    use crate::{
        abi::ConstructorArgs,
        cli::TargetArgs,
        config::{find_network, Config},
        constants::MAX_VERIFY_STATUS_POLLS,
        errors::ScriptError,
        plans::GAME_CONTRACT,
    };

    use super::{
        EtherscanClient, EtherscanVerifier, ExplorerClient, ExplorerResponse, SourceVerifier,
        VerificationRequest, VerificationStatus,
    };

    fn response(status: &str, result: &str) -> ExplorerResponse {
        serde_json::from_value(json!({ "status": status, "message": "", "result": result }))
            .unwrap()
    }

    fn config(network: &str) -> Config {
        Config::resolve_with_env(TargetArgs::for_network(network), |_| None).unwrap()
    }

    fn request() -> VerificationRequest {
        VerificationRequest {
            address: address!("00000000000000000000000000000000000000aa"),
            contract: GAME_CONTRACT,
            compiler_version: "v0.8.23+commit.f704f362".to_string(),
            source: "{}".to_string(),
            args: ConstructorArgs::new(&JsonAbi::new(), vec![]).unwrap(),
        }
    }

    /// Replays canned explorer responses, recording when statuses are checked
    struct ScriptedExplorer {
        submission: ExplorerResponse,
        statuses: Mutex<VecDeque<ExplorerResponse>>,
        status_checks: Mutex<Vec<(String, Instant)>>,
    }

    impl ScriptedExplorer {
        /// Statuses past the scripted ones are reported as pending
        fn new(submission: ExplorerResponse, statuses: Vec<ExplorerResponse>) -> Self {
            Self {
                submission,
                statuses: Mutex::new(statuses.into()),
                status_checks: Mutex::new(Vec::new()),
            }
        }

        fn num_status_checks(&self) -> usize {
            self.status_checks.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ExplorerClient for ScriptedExplorer {
        async fn submit(
            &self,
            _request: &VerificationRequest,
        ) -> Result<ExplorerResponse, ScriptError> {
            Ok(self.submission.clone())
        }

        async fn check_status(&self, guid: &str) -> Result<ExplorerResponse, ScriptError> {
            self.status_checks
                .lock()
                .unwrap()
                .push((guid.to_string(), Instant::now()));
            let next = self.statuses.lock().unwrap().pop_front();
            Ok(next.unwrap_or_else(|| response("0", "Pending in queue")))
        }
    }

    fn scripted_verifier(explorer: ScriptedExplorer) -> EtherscanVerifier<ScriptedExplorer> {
        EtherscanVerifier::with_client(explorer, find_network("sepolia").unwrap().explorer)
    }

    #[test]
    fn test_verification_status() {
        assert_eq!(
            response("0", "Pending in queue").verification_status(),
            VerificationStatus::Pending
        );
        assert_eq!(
            response("1", "Pass - Verified").verification_status(),
            VerificationStatus::Verified
        );
        assert_eq!(
            response("1", "Already Verified").verification_status(),
            VerificationStatus::AlreadyVerified
        );
        assert_eq!(
            response("0", "Fail - Unable to verify").verification_status(),
            VerificationStatus::Failed("Fail - Unable to verify".to_string())
        );
    }

    #[test]
    fn test_submission_response() {
        assert!(response("1", "guid").is_ok());
        assert!(!response("0", "Contract source code already verified").is_ok());
        assert!(response("0", "Contract source code already verified").is_already_verified());
        assert!(!response("0", "Invalid API Key").is_already_verified());
    }

    #[test]
    fn test_contract_url() {
        let address = address!("00000000000000000000000000000000000000aa");
        assert_eq!(
            EtherscanVerifier::new(&config("optimismSepolia")).contract_url(address),
            "https://sepolia-optimism.etherscan.io/address/0x00000000000000000000000000000000000000aa#code"
        );
        assert_eq!(
            EtherscanVerifier::new(&config("sepolia")).contract_url(address),
            "https://sepolia.etherscan.io/address/0x00000000000000000000000000000000000000aa#code"
        );
    }

    #[test]
    fn test_missing_api_key() {
        let err = EtherscanClient::new(&config("lineaSepolia")).api_key().unwrap_err();
        assert!(matches!(err, ScriptError::Verification(msg) if msg.contains("LINEASCAN_API_KEY")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_then_verified() {
        let verifier = scripted_verifier(ScriptedExplorer::new(
            response("1", "guid-1"),
            vec![
                response("0", "Pending in queue"),
                response("0", "Pending in queue"),
                response("1", "Pass - Verified"),
            ],
        ));

        let start = Instant::now();
        verifier.verify(&request()).await.unwrap();

        let checks = verifier.client.status_checks.lock().unwrap();
        assert_eq!(checks.len(), 3);
        assert!(checks.iter().all(|(guid, _)| guid == "guid-1"));
        assert!(checks[0].1.duration_since(start) >= Duration::from_secs(3));
        assert!(checks[2].1.duration_since(checks[1].1) >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_then_failed() {
        let verifier = scripted_verifier(ScriptedExplorer::new(
            response("1", "guid-1"),
            vec![
                response("0", "Pending in queue"),
                response("0", "Fail - Unable to verify"),
            ],
        ));

        let err = verifier.verify(&request()).await.unwrap_err();
        assert!(
            matches!(err, ScriptError::Verification(msg) if msg == "Fail - Unable to verify")
        );
        assert_eq!(verifier.client.num_status_checks(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_verified_on_submit() {
        let verifier = scripted_verifier(ScriptedExplorer::new(
            response("0", "Contract source code already verified"),
            vec![],
        ));

        verifier.verify(&request()).await.unwrap();
        assert_eq!(verifier.client.num_status_checks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_verified_while_polling() {
        let verifier = scripted_verifier(ScriptedExplorer::new(
            response("1", "guid-1"),
            vec![response("1", "Already Verified")],
        ));

        verifier.verify(&request()).await.unwrap();
        assert_eq!(verifier.client.num_status_checks(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unindexed_contract_suggests_longer_delay() {
        let verifier = scripted_verifier(ScriptedExplorer::new(
            response(
                "0",
                "Unable to locate ContractCode at 0x00000000000000000000000000000000000000aa",
            ),
            vec![],
        ));

        let err = verifier.verify(&request()).await.unwrap_err();
        assert!(
            matches!(err, ScriptError::Verification(msg) if msg.contains("--verify-delay-secs"))
        );
        assert_eq!(verifier.client.num_status_checks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_submission() {
        let verifier =
            scripted_verifier(ScriptedExplorer::new(response("0", "Invalid API Key"), vec![]));

        let err = verifier.verify(&request()).await.unwrap_err();
        assert!(matches!(err, ScriptError::Verification(msg) if msg == "Invalid API Key"));
        assert_eq!(verifier.client.num_status_checks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_polls() {
        let verifier = scripted_verifier(ScriptedExplorer::new(response("1", "guid-1"), vec![]));

        let err = verifier.verify(&request()).await.unwrap_err();
        assert!(matches!(err, ScriptError::Verification(msg) if msg.contains("still pending")));
        assert_eq!(verifier.client.num_status_checks(), MAX_VERIFY_STATUS_POLLS);
    }
}
