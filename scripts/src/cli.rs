//! Definitions of CLI arguments and commands for deploy scripts

use std::{ffi::OsString, path::PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::{
    commands::{compile, deploy, list_networks, verify},
    constants::{
        DEFAULT_ARTIFACTS_DIR, DEFAULT_CONTRACTS_DIR, DEFAULT_DEPLOYMENTS_PATH,
        DEFAULT_NUM_DEPLOY_CONFIRMATIONS, DEFAULT_VERIFY_DELAY_SECS, EXPLORER_API_KEY_ENV_VAR,
        FAILURE_EXIT_STATUS, PRIVATE_KEY_ENV_VAR, SUCCESS_EXIT_STATUS,
    },
    errors::ScriptError,
};
use tracing::error;

/// Deploy and verify the realm contracts on EVM test networks
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Deploy a contract, wait for the explorer to index it, then verify its source
    Deploy(DeployArgs),
    /// Verify the source of an already deployed contract
    Verify(VerifyArgs),
    /// Compile the Solidity sources into deployable artifacts
    Compile(CompileArgs),
    /// List the networks contracts can be deployed to
    ListNetworks,
}

impl Command {
    /// Run the command
    pub async fn run(self) -> Result<(), ScriptError> {
        match self {
            Command::Deploy(args) => deploy(args).await,
            Command::Verify(args) => verify(args).await,
            Command::Compile(args) => compile(args),
            Command::ListNetworks => {
                list_networks();
                Ok(())
            }
        }
    }
}

/// Parse `argv` and run the selected command, returning the exit status of
/// the process.
///
/// Invalid usage and failed commands both exit with [`FAILURE_EXIT_STATUS`].
pub async fn run<I, T>(argv: I) -> u8
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(argv) {
        Ok(Cli { command }) => exit_status(command.run().await),
        Err(e) => {
            e.print().ok();
            if e.use_stderr() {
                FAILURE_EXIT_STATUS
            } else {
                SUCCESS_EXIT_STATUS
            }
        }
    }
}

/// Map the result of a command to an exit status, logging the error of a
/// failed command
pub fn exit_status(result: Result<(), ScriptError>) -> u8 {
    match result {
        Ok(()) => SUCCESS_EXIT_STATUS,
        Err(e) => {
            error!("{e}");
            FAILURE_EXIT_STATUS
        }
    }
}

/// Arguments selecting and configuring the target network
#[derive(Args, Clone)]
pub struct TargetArgs {
    /// Name of the network to deploy to, see `list-networks`
    #[arg(short, long)]
    pub network: String,

    /// Private key of the deployer
    #[arg(short, long, env = PRIVATE_KEY_ENV_VAR, hide_env_values = true)]
    pub priv_key: Option<String>,

    /// Network RPC URL, overriding the network's default endpoint
    #[arg(short, long)]
    pub rpc_url: Option<String>,

    /// Block explorer API key, overriding the network's API key variable
    #[arg(long, env = EXPLORER_API_KEY_ENV_VAR, hide_env_values = true)]
    pub explorer_api_key: Option<String>,

    /// Directory containing the compilation artifacts
    #[arg(long, default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts: PathBuf,

    /// File in which deployed addresses are recorded
    #[arg(long, default_value = DEFAULT_DEPLOYMENTS_PATH)]
    pub deployments: PathBuf,

    /// Seconds to wait after deployment before submitting the verification
    #[arg(long, default_value_t = DEFAULT_VERIFY_DELAY_SECS)]
    pub verify_delay_secs: u64,

    /// Number of confirmations to wait for the deployment transaction
    #[arg(long, default_value_t = DEFAULT_NUM_DEPLOY_CONFIRMATIONS)]
    pub confirmations: u64,
}

#[cfg(test)]
impl TargetArgs {
    /// The default arguments for `network`, without consulting the process
    /// environment
    pub(crate) fn for_network(network: &str) -> Self {
        Self {
            network: network.to_string(),
            priv_key: None,
            rpc_url: None,
            explorer_api_key: None,
            artifacts: PathBuf::from(DEFAULT_ARTIFACTS_DIR),
            deployments: PathBuf::from(DEFAULT_DEPLOYMENTS_PATH),
            verify_delay_secs: DEFAULT_VERIFY_DELAY_SECS,
            confirmations: DEFAULT_NUM_DEPLOY_CONFIRMATIONS,
        }
    }
}

/// Deploy one of the realm contracts
#[derive(Args)]
pub struct DeployArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Stop after the deployment is confirmed, without verifying the source
    #[arg(long)]
    pub skip_verify: bool,

    #[command(subcommand)]
    pub contract: ContractArgs,
}

/// Verify the source of a deployed realm contract.
///
/// The constructor arguments must be the ones the contract was deployed with.
#[derive(Args)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Address of the deployed contract in hex, read from the deployments
    /// file when omitted
    #[arg(short, long)]
    pub address: Option<String>,

    #[command(subcommand)]
    pub contract: ContractArgs,
}

/// Compile the Solidity sources with the pinned compiler settings
#[derive(Args)]
pub struct CompileArgs {
    /// Directory containing the Solidity sources
    #[arg(long, default_value = DEFAULT_CONTRACTS_DIR)]
    pub contracts: PathBuf,

    /// Directory the artifacts are written to
    #[arg(long, default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts: PathBuf,
}

/// The contract to deploy or verify, along with its constructor arguments
#[derive(Subcommand, Clone)]
pub enum ContractArgs {
    /// The Building contract
    Building(BuildingArgs),
    /// The Game contract
    Game(GameArgs),
    /// The Resource contract
    Resource(ResourceArgs),
}

/// Constructor arguments of the Building contract
#[derive(Args, Clone)]
pub struct BuildingArgs {
    /// Token name of the building
    #[arg(long, default_value = "Castle")]
    pub name: String,

    /// Token symbol of the building
    #[arg(long, default_value = "CSTL")]
    pub symbol: String,

    /// Free-form description of the building
    #[arg(long, default_value = "")]
    pub description: String,

    /// Address owning the building contract
    #[arg(long, default_value = "0xC3a99178Ea1Ca514De13225Ccb907287667417FA")]
    pub owner: String,

    /// Resources consumed by the building, comma separated
    #[arg(long, value_delimiter = ',')]
    pub input_resources: Vec<String>,

    /// Resources produced by the building, comma separated
    #[arg(long, value_delimiter = ',')]
    pub output_resources: Vec<String>,

    /// Terrain types the building may be placed on, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = [1u8, 4])]
    pub allowed_terrain_types: Vec<u8>,

    /// The building type
    #[arg(long, default_value_t = 1)]
    pub building_type: u8,
}

/// Constructor arguments of the Game contract
#[derive(Args, Clone)]
pub struct GameArgs {
    /// Width of the map
    #[arg(long, default_value_t = 20)]
    pub map_width: u64,

    /// Height of the map
    #[arg(long, default_value_t = 20)]
    pub map_height: u64,

    /// Name of the map
    #[arg(long, default_value = "FantasyLand")]
    pub map_name: String,
}

/// Constructor arguments of the Resource contract
#[derive(Args, Clone)]
pub struct ResourceArgs {
    /// Width of the map
    #[arg(long, default_value_t = 10)]
    pub map_width: u64,

    /// Height of the map
    #[arg(long, default_value_t = 10)]
    pub map_height: u64,

    /// Length of the map
    #[arg(long, default_value_t = 10)]
    pub map_length: u64,

    /// Name of the map
    #[arg(long, default_value = "FantasyLand")]
    pub map_name: String,
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use crate::{
        constants::{FAILURE_EXIT_STATUS, SUCCESS_EXIT_STATUS},
        errors::ScriptError,
    };

    use super::{exit_status, run, Cli, Command, ContractArgs};

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verify_address_is_optional() {
        let argv = ["realm-scripts", "verify", "-n", "sepolia", "game"];
        let Command::Verify(args) = Cli::try_parse_from(argv).unwrap().command else {
            panic!("expected a verify command");
        };
        assert!(args.address.is_none());
        assert!(matches!(args.contract, ContractArgs::Game(_)));

        let argv = ["realm-scripts", "verify", "-n", "sepolia", "-a", "0xdead", "game"];
        let Command::Verify(args) = Cli::try_parse_from(argv).unwrap().command else {
            panic!("expected a verify command");
        };
        assert_eq!(args.address.as_deref(), Some("0xdead"));
    }

    #[test]
    fn test_building_resource_lists() {
        let argv = [
            "realm-scripts",
            "deploy",
            "-n",
            "sepolia",
            "building",
            "--input-resources",
            "0x00000000000000000000000000000000000000aa,0x00000000000000000000000000000000000000bb",
            "--allowed-terrain-types",
            "2,3",
        ];
        let Command::Deploy(args) = Cli::try_parse_from(argv).unwrap().command else {
            panic!("expected a deploy command");
        };
        let ContractArgs::Building(building) = args.contract else {
            panic!("expected the building contract");
        };
        assert_eq!(building.input_resources.len(), 2);
        assert!(building.output_resources.is_empty());
        assert_eq!(building.allowed_terrain_types, vec![2, 3]);
    }

    #[test]
    fn test_network_is_required() {
        assert!(Cli::try_parse_from(["realm-scripts", "deploy", "game"]).is_err());
    }

    #[test]
    fn test_exit_status() {
        assert_eq!(exit_status(Ok(())), SUCCESS_EXIT_STATUS);
        assert_eq!(exit_status(Err(ScriptError::MissingCredential)), FAILURE_EXIT_STATUS);
    }

    #[tokio::test]
    async fn test_usage_errors_fail() {
        assert_eq!(run(["realm-scripts", "redeploy"]).await, FAILURE_EXIT_STATUS);
        assert_eq!(run(["realm-scripts", "deploy", "game"]).await, FAILURE_EXIT_STATUS);
        assert_eq!(run(["realm-scripts", "--help"]).await, SUCCESS_EXIT_STATUS);
    }

    #[tokio::test]
    async fn test_failed_command_fails() {
        let argv = ["realm-scripts", "deploy", "-n", "mainnet", "game"];
        assert_eq!(run(argv).await, FAILURE_EXIT_STATUS);
    }

    #[tokio::test]
    async fn test_verify_without_deployments_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let deployments = dir.path().join("deployments.json");
        let argv = [
            "realm-scripts",
            "verify",
            "-n",
            "sepolia",
            "--deployments",
            deployments.to_str().unwrap(),
            "game",
        ];
        assert_eq!(run(argv).await, FAILURE_EXIT_STATUS);
    }
}
