//! Submitting contract-creation transactions

use std::str::FromStr;

use alloy::{
    network::{ReceiptResponse, TransactionBuilder},
    primitives::{Address, TxHash},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    transports::http::reqwest::Url,
};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::{abi::ConstructorArgs, artifacts::Artifact, config::Config, errors::ScriptError};

/// A confirmed contract deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deployment {
    /// The address of the deployed contract
    pub address: Address,
    /// The hash of the contract-creation transaction
    pub tx_hash: TxHash,
}

/// Deploys contracts, resolving once the deployment is confirmed
#[async_trait]
pub trait ContractDeployer {
    /// Deploy `artifact` with the given constructor arguments
    async fn deploy(
        &self,
        artifact: &Artifact,
        args: &ConstructorArgs,
    ) -> Result<Deployment, ScriptError>;
}

/// Deploys contracts through a JSON-RPC endpoint, signing with a local key
pub struct RpcDeployer {
    /// The provider, with the deployer's wallet attached
    provider: DynProvider,
    /// The number of confirmations to wait for
    confirmations: u64,
}

impl RpcDeployer {
    /// Connect to the configured network.
    ///
    /// Fails when no private key was configured, or when the endpoint
    /// reports a chain ID other than the network's.
    pub async fn connect(config: &Config) -> Result<Self, ScriptError> {
        let priv_key = config.priv_key.as_deref().ok_or(ScriptError::MissingCredential)?;
        let signer = PrivateKeySigner::from_str(priv_key)
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
        let url = Url::parse(&config.rpc_url)
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;

        let deployer_address = signer.address();
        let provider = ProviderBuilder::new().wallet(signer).connect_http(url).erased();

        let chain_id = provider
            .get_chain_id()
            .await
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
        if chain_id != config.network.chain_id {
            return Err(ScriptError::Config(format!(
                "{} reports chain ID {}, but {} has chain ID {}",
                config.rpc_url, chain_id, config.network.name, config.network.chain_id
            )));
        }

        debug!("Deploying from {deployer_address:#x} on chain {chain_id}");
        Ok(Self {
            provider,
            confirmations: config.confirmations,
        })
    }
}

#[async_trait]
impl ContractDeployer for RpcDeployer {
    async fn deploy(
        &self,
        artifact: &Artifact,
        args: &ConstructorArgs,
    ) -> Result<Deployment, ScriptError> {
        let tx = TransactionRequest::default().with_deploy_code(artifact.deploy_code(args.encoded()));

        let pending_tx = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?;
        let tx_hash = *pending_tx.tx_hash();
        info!("Sent {} deployment transaction {tx_hash:#x}", artifact.contract);

        let receipt = pending_tx
            .with_required_confirmations(self.confirmations)
            .get_receipt()
            .await
            .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?;

        if !receipt.status() {
            return Err(ScriptError::ContractDeployment(format!(
                "deployment transaction {tx_hash:#x} reverted"
            )));
        }
        let address = receipt.contract_address().ok_or_else(|| {
            ScriptError::ContractDeployment(format!(
                "receipt of {tx_hash:#x} holds no contract address"
            ))
        })?;

        Ok(Deployment { address, tx_hash })
    }
}
