//! Implementations of the various deploy scripts

use std::str::FromStr;

use alloy::primitives::Address;
use tracing::info;

use crate::{
    abi::ConstructorArgs,
    artifacts::{find_build_info, load_artifact},
    cli::{CompileArgs, DeployArgs, VerifyArgs},
    compile::compile_contracts,
    config::{CompilerSettings, Config, NETWORKS},
    deploy::{ContractDeployer, RpcDeployer},
    deployments::{read_deployed_address, write_deployed_address},
    errors::ScriptError,
    plans::DeploymentPlan,
    verify::{EtherscanVerifier, SourceVerifier, VerificationRequest},
};

/// Deploy a contract and verify its source
pub async fn deploy(args: DeployArgs) -> Result<(), ScriptError> {
    let plan = DeploymentPlan::from(args.contract);
    let config = Config::resolve(args.target)?;

    let deployer = RpcDeployer::connect(&config).await?;
    let verifier = (!args.skip_verify).then(|| EtherscanVerifier::new(&config));

    deploy_and_verify(&plan, &config, &deployer, verifier.as_ref()).await?;
    Ok(())
}

/// Verify the source of a deployed contract
pub async fn verify(args: VerifyArgs) -> Result<(), ScriptError> {
    let plan = DeploymentPlan::from(args.contract);
    let config = Config::resolve(args.target)?;

    let address = args
        .address
        .map(|address| {
            Address::from_str(&address)
                .map_err(|e| ScriptError::Config(format!("invalid address {}: {}", address, e)))
        })
        .transpose()?;

    verify_deployed(&plan, &config, address, &EtherscanVerifier::new(&config)).await
}

/// Compile the contract sources into artifacts
pub fn compile(args: CompileArgs) -> Result<(), ScriptError> {
    compile_contracts(&args.contracts, &args.artifacts, &CompilerSettings::default())?;
    Ok(())
}

/// Print the known networks
pub fn list_networks() {
    for network in NETWORKS.iter() {
        println!(
            "{:<18} chain {:<10} {:<45} {}",
            network.name, network.chain_id, network.rpc_url, network.explorer.browser_url
        );
    }
}

/// Deploy the planned contract, record its address, then verify its source
/// after the configured delay.
///
/// The constructor arguments are encoded once and handed unchanged to both
/// the deployer and the verifier. Verification is skipped when no verifier
/// is given.
pub async fn deploy_and_verify<D, V>(
    plan: &DeploymentPlan,
    config: &Config,
    deployer: &D,
    verifier: Option<&V>,
) -> Result<Address, ScriptError>
where
    D: ContractDeployer + Sync,
    V: SourceVerifier + Sync,
{
    let artifact = load_artifact(&config.artifacts_dir, &plan.contract)?;
    let constructor_args = ConstructorArgs::new(&artifact.abi, plan.args.clone())?;

    let deployment = deployer.deploy(&artifact, &constructor_args).await?;
    info!("{} contract deployed to: {:#x}", plan.contract, deployment.address);

    write_deployed_address(
        &config.deployments_path,
        config.network.name,
        plan.contract.name,
        deployment.address,
    )
    .map_err(|e| {
        ScriptError::WriteDeployments(format!(
            "{} was deployed to {:#x} but could not be recorded: {}",
            plan.contract, deployment.address, e
        ))
    })?;

    let Some(verifier) = verifier else {
        return Ok(deployment.address);
    };

    info!(
        "Waiting {}s for the explorer to index {}",
        config.verify_delay.as_secs(),
        plan.contract
    );
    tokio::time::sleep(config.verify_delay).await;

    verify_deployment(plan, config, deployment.address, constructor_args, verifier).await?;
    Ok(deployment.address)
}

/// Verify a contract deployed by an earlier run, with the same constructor
/// arguments it was planned with. The address is read from the deployments
/// file when not given.
pub async fn verify_deployed<V: SourceVerifier + Sync>(
    plan: &DeploymentPlan,
    config: &Config,
    address: Option<Address>,
    verifier: &V,
) -> Result<(), ScriptError> {
    let address = match address {
        Some(address) => address,
        None => read_deployed_address(
            &config.deployments_path,
            config.network.name,
            plan.contract.name,
        )?,
    };

    let artifact = load_artifact(&config.artifacts_dir, &plan.contract)?;
    let constructor_args = ConstructorArgs::new(&artifact.abi, plan.args.clone())?;
    verify_deployment(plan, config, address, constructor_args, verifier).await
}

/// Submit a deployed contract's source for verification
async fn verify_deployment<V: SourceVerifier + Sync>(
    plan: &DeploymentPlan,
    config: &Config,
    address: Address,
    constructor_args: ConstructorArgs,
    verifier: &V,
) -> Result<(), ScriptError> {
    let build_info = find_build_info(&config.artifacts_dir, &plan.contract)?;
    let request = VerificationRequest::new(address, plan.contract, &build_info, constructor_args)?;
    verifier.verify(&request).await
}
