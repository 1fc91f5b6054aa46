//! Reading and writing compilation artifacts.
//!
//! Artifacts follow the Hardhat layout so that the same directory can be
//! produced by either `compile` or an existing Hardhat project:
//!
//! - `<artifacts>/<source>/<Name>.json`: ABI and bytecode of a contract
//! - `<artifacts>/<source>/<Name>.dbg.json`: pointer to the contract's build info
//! - `<artifacts>/build-info/<id>.json`: the full solc standard JSON input and output

use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy::{
    json_abi::JsonAbi,
    primitives::{hex, Bytes},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{
    constants::{BUILD_INFO_DIR, DBG_FILE_SUFFIX},
    errors::ScriptError,
    plans::ContractId,
};

/// The on-disk artifact of a single contract
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactFile {
    /// The artifact format tag
    #[serde(rename = "_format")]
    pub format: String,
    /// The name of the contract
    pub contract_name: String,
    /// The source file the contract is defined in
    pub source_name: String,
    /// The contract ABI
    pub abi: JsonAbi,
    /// The creation bytecode, `0x` prefixed
    pub bytecode: String,
    /// The runtime bytecode, `0x` prefixed
    pub deployed_bytecode: String,
    /// Unresolved library links in the creation bytecode
    #[serde(default)]
    pub link_references: Value,
    /// Unresolved library links in the runtime bytecode
    #[serde(default)]
    pub deployed_link_references: Value,
}

/// The debug file pointing an artifact to the build that produced it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbgFile {
    /// The debug file format tag
    #[serde(rename = "_format")]
    pub format: String,
    /// Path of the build info file, relative to the debug file
    pub build_info: String,
}

/// A single solc invocation: its standard JSON input and output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    /// The build info format tag
    #[serde(rename = "_format")]
    pub format: String,
    /// The identifier of the build
    pub id: String,
    /// The short solc version, e.g. `0.8.23`
    pub solc_version: String,
    /// The full solc version, e.g. `0.8.23+commit.f704f362`
    pub solc_long_version: String,
    /// The standard JSON input the compiler was invoked with
    pub input: Value,
    /// The standard JSON output of the compiler
    pub output: Value,
}

impl BuildInfo {
    /// Whether this build produced the given contract
    pub fn contains(&self, contract: &ContractId) -> bool {
        self.output["contracts"][contract.source][contract.name].is_object()
    }

    /// The compiler version in the form explorers expect, e.g. `v0.8.23+commit.f704f362`
    pub fn compiler_version(&self) -> String {
        format!("v{}", self.solc_long_version)
    }
}

/// A contract ready to be deployed
#[derive(Debug, Clone)]
pub struct Artifact {
    /// The contract the artifact belongs to
    pub contract: ContractId,
    /// The contract ABI
    pub abi: JsonAbi,
    /// The creation bytecode, without constructor arguments
    pub bytecode: Bytes,
}

impl Artifact {
    /// The creation bytecode followed by the encoded constructor arguments
    pub fn deploy_code(&self, encoded_args: &[u8]) -> Bytes {
        let mut code = self.bytecode.to_vec();
        code.extend_from_slice(encoded_args);
        code.into()
    }
}

/// The path of the artifact file of a contract
pub fn artifact_path(artifacts_dir: &Path, contract: &ContractId) -> PathBuf {
    artifacts_dir
        .join(contract.source)
        .join(format!("{}.json", contract.name))
}

/// The path of the debug file of a contract
pub fn dbg_path(artifacts_dir: &Path, contract: &ContractId) -> PathBuf {
    artifacts_dir
        .join(contract.source)
        .join(format!("{}{}", contract.name, DBG_FILE_SUFFIX))
}

/// Load the artifact of a contract and decode its creation bytecode
pub fn load_artifact(artifacts_dir: &Path, contract: &ContractId) -> Result<Artifact, ScriptError> {
    let path = artifact_path(artifacts_dir, contract);
    debug!("Loading artifact from {}", path.display());
    let file: ArtifactFile = read_json(&path)?;

    if file.contract_name != contract.name || file.source_name != contract.source {
        return Err(ScriptError::ArtifactParsing(format!(
            "{} holds {}:{}, expected {}",
            path.display(),
            file.source_name,
            file.contract_name,
            contract.fully_qualified_name()
        )));
    }

    if file.bytecode.contains("__$") {
        return Err(ScriptError::ArtifactParsing(format!(
            "{} has unlinked library references",
            contract.fully_qualified_name()
        )));
    }

    let bytecode: Bytes = hex::decode(&file.bytecode)
        .map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?
        .into();
    if bytecode.is_empty() {
        return Err(ScriptError::ArtifactParsing(format!(
            "{} has no creation bytecode, is it abstract or an interface?",
            contract.fully_qualified_name()
        )));
    }

    Ok(Artifact {
        contract: *contract,
        abi: file.abi,
        bytecode,
    })
}

/// Find the build info that produced a contract.
///
/// The contract's debug file is followed when present, otherwise the
/// build info directory is searched.
pub fn find_build_info(
    artifacts_dir: &Path,
    contract: &ContractId,
) -> Result<BuildInfo, ScriptError> {
    let dbg = dbg_path(artifacts_dir, contract);
    if dbg.exists() {
        let dbg_file: DbgFile = read_json(&dbg)?;
        let parent = dbg.parent().unwrap_or(artifacts_dir);
        let build_info: BuildInfo = read_json(&parent.join(&dbg_file.build_info))?;
        if build_info.contains(contract) {
            return Ok(build_info);
        }
    }

    let build_info_dir = artifacts_dir.join(BUILD_INFO_DIR);
    let mut paths = fs::read_dir(&build_info_dir)
        .map_err(|e| {
            ScriptError::ArtifactParsing(format!("{}: {}", build_info_dir.display(), e))
        })?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect::<Vec<_>>();
    paths.sort();

    for path in paths {
        let build_info: BuildInfo = read_json(&path)?;
        if build_info.contains(contract) {
            return Ok(build_info);
        }
    }

    Err(ScriptError::ArtifactParsing(format!(
        "no build info found for {}",
        contract.fully_qualified_name()
    )))
}

/// Serialize a value as pretty JSON into `path`, creating parent directories
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ScriptError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ScriptError::ContractCompilation(e.to_string()))?;
    }
    let contents = serde_json::to_string_pretty(value)
        .map_err(|e| ScriptError::ContractCompilation(e.to_string()))?;
    fs::write(path, contents).map_err(|e| ScriptError::ContractCompilation(e.to_string()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ScriptError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&contents)
        .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {}", path.display(), e)))
}
