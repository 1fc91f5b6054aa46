//! Utilities for recording deployed addresses in the deployments file.
//!
//! The file maps network names to the contracts deployed on them:
//! `{ "<network>": { "<contract>": "0x..." } }`

use std::{fs, path::Path, str::FromStr};

use alloy::primitives::Address;
use serde_json::{Map, Value};

use crate::errors::ScriptError;

/// Record the address of a deployed contract, creating the file if needed
/// and keeping every other entry intact
pub fn write_deployed_address(
    path: &Path,
    network: &str,
    contract_key: &str,
    address: Address,
) -> Result<(), ScriptError> {
    let mut deployments = if path.exists() {
        read_deployments(path)?
    } else {
        Value::Object(Map::new())
    };

    let root = deployments.as_object_mut().ok_or_else(|| {
        ScriptError::WriteDeployments(format!("{} is not a JSON object", path.display()))
    })?;
    let network_entry = root
        .entry(network)
        .or_insert_with(|| Value::Object(Map::new()));
    let network_entry = network_entry.as_object_mut().ok_or_else(|| {
        ScriptError::WriteDeployments(format!("entry for {} is not a JSON object", network))
    })?;
    network_entry.insert(contract_key.to_string(), Value::String(format!("{address:#x}")));

    let contents = serde_json::to_string_pretty(&deployments)
        .map_err(|e| ScriptError::WriteDeployments(e.to_string()))?;
    fs::write(path, contents).map_err(|e| ScriptError::WriteDeployments(e.to_string()))
}

/// Read the recorded address of a contract on a network
pub fn read_deployed_address(
    path: &Path,
    network: &str,
    contract_key: &str,
) -> Result<Address, ScriptError> {
    let deployments = read_deployments(path)?;
    let addr_str = deployments[network][contract_key].as_str().ok_or_else(|| {
        ScriptError::ReadDeployments(format!(
            "no {} deployment recorded for {}",
            contract_key, network
        ))
    })?;

    Address::from_str(addr_str).map_err(|e| ScriptError::ReadDeployments(e.to_string()))
}

fn read_deployments(path: &Path) -> Result<Value, ScriptError> {
    let contents =
        fs::read_to_string(path).map_err(|e| ScriptError::ReadDeployments(e.to_string()))?;
    serde_json::from_str(&contents).map_err(|e| ScriptError::ReadDeployments(e.to_string()))
}
