//! Constants used in the deploy scripts

/// The exit status of a successful run
pub const SUCCESS_EXIT_STATUS: u8 = 0;

/// The exit status of a failed run, including invalid usage
pub const FAILURE_EXIT_STATUS: u8 = 1;

/// The number of confirmations to wait for the contract deployment transaction
pub const DEFAULT_NUM_DEPLOY_CONFIRMATIONS: u64 = 1;

/// The number of seconds to wait after a deployment is confirmed before
/// submitting it for verification, giving the explorer time to index the
/// new contract code
pub const DEFAULT_VERIFY_DELAY_SECS: u64 = 30;

/// The number of seconds between verification status checks
pub const VERIFY_POLL_INTERVAL_SECS: u64 = 3;

/// The maximum number of verification status checks before giving up
pub const MAX_VERIFY_STATUS_POLLS: usize = 40;

/// The name of the environment variable holding the deployer private key
pub const PRIVATE_KEY_ENV_VAR: &str = "PRIVATE_KEY";

/// The name of the environment variable overriding the explorer API key
/// of the selected network
pub const EXPLORER_API_KEY_ENV_VAR: &str = "EXPLORER_API_KEY";

/// The default directory holding compilation artifacts
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// The default directory holding the Solidity sources
pub const DEFAULT_CONTRACTS_DIR: &str = "contracts";

/// The default path of the deployments file
pub const DEFAULT_DEPLOYMENTS_PATH: &str = "deployments.json";

/// The name of the subdirectory of the artifacts directory holding build info files
pub const BUILD_INFO_DIR: &str = "build-info";

/// The extension of a Solidity source file
pub const SOLIDITY_EXTENSION: &str = "sol";

/// The suffix of the debug file pointing an artifact to its build info
pub const DBG_FILE_SUFFIX: &str = ".dbg.json";

/// The format tag of an artifact file
pub const ARTIFACT_FORMAT: &str = "hh-sol-artifact-1";

/// The format tag of a debug file
pub const DBG_FORMAT: &str = "hh-sol-dbg-1";

/// The format tag of a build info file
pub const BUILD_INFO_FORMAT: &str = "hh-sol-build-info-1";

// ------------
// | Compiler |
// ------------

/// The solc version the contracts are compiled and verified with
pub const SOLC_VERSION: &str = "0.8.23";

/// The number of optimizer runs
pub const OPTIMIZER_RUNS: u32 = 200;

/// The name of the solc command
pub const SOLC_COMMAND: &str = "solc";

/// The directory searched for imported library sources
pub const NODE_MODULES_DIR: &str = "node_modules";

/// The compiler outputs requested for every contract
pub const OUTPUT_SELECTION: [&str; 6] = [
    "abi",
    "evm.bytecode.object",
    "evm.bytecode.linkReferences",
    "evm.deployedBytecode.object",
    "evm.deployedBytecode.linkReferences",
    "metadata",
];

// ------------
// | Explorer |
// ------------

/// The code format used when submitting a verification
pub const STANDARD_JSON_CODE_FORMAT: &str = "solidity-standard-json-input";

/// The explorer result of a verification waiting to be processed
pub const PENDING_RESULT: &str = "Pending in queue";

/// The explorer result of a successful verification
pub const VERIFIED_RESULT: &str = "Pass - Verified";

/// Prefixes of explorer results reporting a contract as already verified
pub const ALREADY_VERIFIED_RESULTS: [&str; 2] =
    ["Already Verified", "Contract source code already verified"];

/// Prefix of the explorer result reporting that the contract code is not indexed yet
pub const MISSING_BYTECODE_RESULT: &str = "Unable to locate ContractCode at";
