//! Network, explorer, and compiler configuration for the deploy scripts

use std::{fmt, path::PathBuf, time::Duration};

use itertools::Itertools;
use serde_json::{json, Value};

use crate::{
    cli::TargetArgs,
    constants::{OPTIMIZER_RUNS, OUTPUT_SELECTION, SOLC_VERSION},
    errors::ScriptError,
};

/// A block explorer accepting source verifications for a network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplorerConfig {
    /// The Etherscan-compatible API endpoint
    pub api_url: &'static str,
    /// The human-facing explorer URL
    pub browser_url: &'static str,
    /// The environment variable holding the explorer API key
    pub api_key_env: &'static str,
}

/// A named target network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkProfile {
    /// The name the network is selected by
    pub name: &'static str,
    /// The default RPC endpoint
    pub rpc_url: &'static str,
    /// The chain ID the RPC endpoint must report
    pub chain_id: u64,
    /// The block explorer of the network
    pub explorer: ExplorerConfig,
}

/// The networks the contracts can be deployed to
pub const NETWORKS: [NetworkProfile; 6] = [
    NetworkProfile {
        name: "arbitrumSepolia",
        rpc_url: "https://arbitrum-sepolia.drpc.org",
        chain_id: 421614,
        explorer: ExplorerConfig {
            api_url: "https://api-sepolia.arbiscan.io/api",
            browser_url: "https://sepolia.arbiscan.io",
            api_key_env: "ARBISCAN_API_KEY",
        },
    },
    NetworkProfile {
        name: "sepolia",
        rpc_url: "https://sepolia.infura.io/v3/775081a490784e709d3457ed0e413b21",
        chain_id: 11155111,
        explorer: ExplorerConfig {
            api_url: "https://api-sepolia.etherscan.io/api",
            browser_url: "https://sepolia.etherscan.io",
            api_key_env: "ETHERSCAN_API_KEY",
        },
    },
    NetworkProfile {
        name: "lineaSepolia",
        rpc_url: "https://rpc.sepolia.linea.build",
        chain_id: 59141,
        explorer: ExplorerConfig {
            api_url: "https://api-sepolia.lineascan.build/api",
            browser_url: "https://sepolia.lineascan.build",
            api_key_env: "LINEASCAN_API_KEY",
        },
    },
    NetworkProfile {
        name: "optimismSepolia",
        rpc_url: "https://sepolia.optimism.io",
        chain_id: 11155420,
        explorer: ExplorerConfig {
            api_url: "https://api-sepolia-optimistic.etherscan.io/api",
            browser_url: "https://sepolia-optimism.etherscan.io/",
            api_key_env: "OPTIMISM_ETHERSCAN_API_KEY",
        },
    },
    NetworkProfile {
        name: "taikoHekla",
        rpc_url: "https://rpc.hekla.taiko.xyz.",
        chain_id: 167009,
        explorer: ExplorerConfig {
            api_url: "https://blockscoutapi.hekla.taiko.xyz/api",
            browser_url: "https://blockscoutapi.hekla.taiko.xyz/",
            api_key_env: "TAIKO_API_KEY",
        },
    },
    NetworkProfile {
        name: "immutableTestnet",
        rpc_url: "https://rpc.testnet.immutable.com",
        chain_id: 13473,
        explorer: ExplorerConfig {
            api_url: "https://explorer.testnet.immutable.com/api",
            browser_url: "https://explorer.testnet.immutable.com/",
            api_key_env: "IMMUTABLE_API_KEY",
        },
    },
];

/// Look up a network profile by name
pub fn find_network(name: &str) -> Result<&'static NetworkProfile, ScriptError> {
    NETWORKS.iter().find(|network| network.name == name).ok_or_else(|| {
        ScriptError::Config(format!(
            "unknown network `{}`, expected one of: {}",
            name,
            NETWORKS.iter().map(|network| network.name).join(", ")
        ))
    })
}

/// Settings the Solidity sources are compiled with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerSettings {
    /// The exact solc version
    pub version: String,
    /// Whether the optimizer is enabled
    pub optimizer: bool,
    /// The number of optimizer runs
    pub runs: u32,
    /// Whether to compile through the IR pipeline
    pub via_ir: bool,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            version: SOLC_VERSION.to_string(),
            optimizer: true,
            runs: OPTIMIZER_RUNS,
            via_ir: true,
        }
    }
}

impl CompilerSettings {
    /// The `settings` object of a solc standard JSON input
    pub fn to_solc_settings(&self) -> Value {
        json!({
            "optimizer": {
                "enabled": self.optimizer,
                "runs": self.runs,
            },
            "viaIR": self.via_ir,
            "outputSelection": {
                "*": {
                    "*": OUTPUT_SELECTION,
                    "": ["ast"],
                },
            },
        })
    }
}

/// The resolved configuration of a single deploy or verify run.
///
/// Credentials are read once while resolving and carried here, the deploy
/// pipeline never reads the environment itself.
#[derive(Clone)]
pub struct Config {
    /// The target network
    pub network: NetworkProfile,
    /// The RPC endpoint to submit transactions to
    pub rpc_url: String,
    /// The deployer private key, if one was configured
    pub priv_key: Option<String>,
    /// The explorer API key, if one was configured
    pub explorer_api_key: Option<String>,
    /// The directory holding compilation artifacts
    pub artifacts_dir: PathBuf,
    /// The file deployed addresses are recorded in
    pub deployments_path: PathBuf,
    /// The pause between deployment confirmation and verification
    pub verify_delay: Duration,
    /// The number of confirmations to wait for a deployment
    pub confirmations: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |secret: &Option<String>| secret.as_ref().map(|_| "<redacted>");
        f.debug_struct("Config")
            .field("network", &self.network)
            .field("rpc_url", &self.rpc_url)
            .field("priv_key", &redact(&self.priv_key))
            .field("explorer_api_key", &redact(&self.explorer_api_key))
            .field("artifacts_dir", &self.artifacts_dir)
            .field("deployments_path", &self.deployments_path)
            .field("verify_delay", &self.verify_delay)
            .field("confirmations", &self.confirmations)
            .finish()
    }
}

impl Config {
    /// Resolve the configuration from CLI arguments, reading the explorer API
    /// key from the process environment when it is not given explicitly
    pub fn resolve(args: TargetArgs) -> Result<Self, ScriptError> {
        Self::resolve_with_env(args, |var| std::env::var(var).ok())
    }

    /// Resolve the configuration from CLI arguments, looking up environment
    /// variables through `env`
    pub fn resolve_with_env(
        args: TargetArgs,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ScriptError> {
        let network = *find_network(&args.network)?;
        let rpc_url = args.rpc_url.unwrap_or_else(|| network.rpc_url.to_string());
        let explorer_api_key = args
            .explorer_api_key
            .or_else(|| env(network.explorer.api_key_env))
            .filter(|key| !key.is_empty());
        let priv_key = args.priv_key.filter(|key| !key.is_empty());

        Ok(Self {
            network,
            rpc_url,
            priv_key,
            explorer_api_key,
            artifacts_dir: args.artifacts,
            deployments_path: args.deployments,
            verify_delay: Duration::from_secs(args.verify_delay_secs),
            confirmations: args.confirmations,
        })
    }
}
