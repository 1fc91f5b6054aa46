//! Compiling the Solidity sources into deployable artifacts.
//!
//! Assumes that `solc` is locally available, at the version pinned in the
//! compiler settings.

use std::{
    collections::BTreeMap,
    fs,
    io::Write,
    path::Path,
    process::{Command, Stdio},
};

use alloy::primitives::{hex, keccak256};
use serde_json::{json, Value};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::{
    artifacts::{write_json, ArtifactFile, BuildInfo, DbgFile},
    config::CompilerSettings,
    constants::{
        ARTIFACT_FORMAT, BUILD_INFO_DIR, BUILD_INFO_FORMAT, DBG_FILE_SUFFIX, DBG_FORMAT,
        NODE_MODULES_DIR, SOLC_COMMAND, SOLIDITY_EXTENSION,
    },
    errors::ScriptError,
};

/// Compile every source under `contracts_dir` and write the artifacts into
/// `artifacts_dir`, returning the number of contracts written
pub fn compile_contracts(
    contracts_dir: &Path,
    artifacts_dir: &Path,
    settings: &CompilerSettings,
) -> Result<usize, ScriptError> {
    let solc_long_version = solc_long_version()?;
    let solc_version = short_version(&solc_long_version);
    if solc_version != settings.version {
        return Err(ScriptError::ContractCompilation(format!(
            "found solc {}, but the contracts are compiled with {}",
            solc_version, settings.version
        )));
    }

    let sources = collect_sources(contracts_dir)?;
    info!("Compiling {} sources with solc {}", sources.len(), solc_long_version);

    let input = standard_json_input(sources, settings);
    let output = run_solc(&input)?;
    check_diagnostics(&output)?;

    let build_info = BuildInfo {
        format: BUILD_INFO_FORMAT.to_string(),
        id: build_id(&input)?,
        solc_version: solc_version.to_string(),
        solc_long_version,
        input,
        output,
    };
    let num_written = write_artifacts(artifacts_dir, &build_info)?;
    info!("Wrote {} artifacts to {}", num_written, artifacts_dir.display());

    Ok(num_written)
}

/// Read every Solidity file under `contracts_dir`, keyed by its path
/// relative to the directory containing `contracts_dir`. Symbolic links are
/// not followed.
pub fn collect_sources(contracts_dir: &Path) -> Result<BTreeMap<String, String>, ScriptError> {
    let root_name = contracts_dir
        .file_name()
        .ok_or_else(|| {
            ScriptError::ContractCompilation(format!(
                "invalid contracts directory {}",
                contracts_dir.display()
            ))
        })?
        .to_string_lossy()
        .to_string();

    let mut sources = BTreeMap::new();
    for entry in WalkDir::new(contracts_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| ScriptError::ContractCompilation(e.to_string()))?;
        let path = entry.path();
        if !entry.file_type().is_file()
            || !path.extension().is_some_and(|ext| ext == SOLIDITY_EXTENSION)
        {
            continue;
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ScriptError::ContractCompilation(e.to_string()))?;
        let relative_path = path
            .strip_prefix(contracts_dir)
            .map_err(|e| ScriptError::ContractCompilation(e.to_string()))?;
        let components = relative_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>();
        sources.insert(format!("{}/{}", root_name, components.join("/")), contents);
    }

    if sources.is_empty() {
        return Err(ScriptError::ContractCompilation(format!(
            "no Solidity sources found in {}",
            contracts_dir.display()
        )));
    }
    Ok(sources)
}

/// Build the solc standard JSON input for the given sources
pub fn standard_json_input(sources: BTreeMap<String, String>, settings: &CompilerSettings) -> Value {
    let sources = sources
        .into_iter()
        .map(|(name, content)| (name, json!({ "content": content })))
        .collect::<serde_json::Map<_, _>>();

    json!({
        "language": "Solidity",
        "sources": sources,
        "settings": settings.to_solc_settings(),
    })
}

/// Extract the full version, e.g. `0.8.23+commit.f704f362`, from the output
/// of `solc --version`
pub fn parse_solc_version(output: &str) -> Option<String> {
    let version = output
        .lines()
        .find_map(|line| line.trim().strip_prefix("Version: "))?;
    let (release, rest) = version.split_once("+commit.")?;
    let commit = rest.split('.').next().filter(|commit| !commit.is_empty())?;
    Some(format!("{release}+commit.{commit}"))
}

/// The release part of a full solc version
fn short_version(long_version: &str) -> &str {
    long_version.split('+').next().unwrap_or(long_version)
}

fn solc_long_version() -> Result<String, ScriptError> {
    let output = Command::new(SOLC_COMMAND)
        .arg("--version")
        .output()
        .map_err(|e| ScriptError::ContractCompilation(format!("failed to run solc: {e}")))?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_solc_version(&stdout).ok_or_else(|| {
        ScriptError::ContractCompilation("could not determine the solc version".to_string())
    })
}

fn run_solc(input: &Value) -> Result<Value, ScriptError> {
    let mut solc_cmd = Command::new(SOLC_COMMAND);
    solc_cmd
        .arg("--standard-json")
        .arg("--base-path")
        .arg(".")
        .arg("--include-path")
        .arg(NODE_MODULES_DIR)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());

    let mut child =
        solc_cmd.spawn().map_err(|e| ScriptError::ContractCompilation(e.to_string()))?;
    let input_bytes =
        serde_json::to_vec(input).map_err(|e| ScriptError::ContractCompilation(e.to_string()))?;
    child
        .stdin
        .take()
        .ok_or_else(|| ScriptError::ContractCompilation("solc stdin unavailable".to_string()))?
        .write_all(&input_bytes)
        .map_err(|e| ScriptError::ContractCompilation(e.to_string()))?;

    let output = child
        .wait_with_output()
        .map_err(|e| ScriptError::ContractCompilation(e.to_string()))?;
    if !output.status.success() {
        return Err(ScriptError::ContractCompilation(format!(
            "solc exited with {}",
            output.status
        )));
    }

    serde_json::from_slice(&output.stdout)
        .map_err(|e| ScriptError::ContractCompilation(e.to_string()))
}

/// Fail on compiler errors, logging warnings
pub fn check_diagnostics(output: &Value) -> Result<(), ScriptError> {
    let diagnostics = output["errors"].as_array().map(Vec::as_slice).unwrap_or_default();

    let mut errors = Vec::new();
    for diagnostic in diagnostics {
        let message = diagnostic["formattedMessage"]
            .as_str()
            .or_else(|| diagnostic["message"].as_str())
            .unwrap_or_default();
        if diagnostic["severity"] == "error" {
            errors.push(message.trim().to_string());
        } else {
            warn!("{}", message.trim());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ScriptError::ContractCompilation(errors.join("\n")))
    }
}

/// Write one artifact and debug file per compiled contract, plus the build
/// info they point to
pub fn write_artifacts(artifacts_dir: &Path, build_info: &BuildInfo) -> Result<usize, ScriptError> {
    let build_info_file = format!("{}.json", build_info.id);
    let mut num_written = 0;

    let contracts = build_info.output["contracts"].as_object().cloned().unwrap_or_default();
    for (source_name, source_contracts) in contracts {
        let Some(source_contracts) = source_contracts.as_object() else {
            continue;
        };
        let source_dir = artifacts_dir.join(&source_name);

        for (contract_name, output) in source_contracts {
            let artifact = ArtifactFile {
                format: ARTIFACT_FORMAT.to_string(),
                contract_name: contract_name.clone(),
                source_name: source_name.clone(),
                abi: serde_json::from_value(output["abi"].clone())
                    .map_err(|e| ScriptError::ContractCompilation(e.to_string()))?,
                bytecode: prefixed_hex(&output["evm"]["bytecode"]["object"]),
                deployed_bytecode: prefixed_hex(&output["evm"]["deployedBytecode"]["object"]),
                link_references: output["evm"]["bytecode"]["linkReferences"].clone(),
                deployed_link_references: output["evm"]["deployedBytecode"]["linkReferences"]
                    .clone(),
            };
            write_json(&source_dir.join(format!("{contract_name}.json")), &artifact)?;

            // The debug file is nested as deep as its source path
            let depth = Path::new(&source_name).components().count();
            let build_info_path =
                format!("{}{}/{}", "../".repeat(depth), BUILD_INFO_DIR, build_info_file);
            let dbg = DbgFile {
                format: DBG_FORMAT.to_string(),
                build_info: build_info_path,
            };
            write_json(&source_dir.join(format!("{contract_name}{DBG_FILE_SUFFIX}")), &dbg)?;

            num_written += 1;
        }
    }

    write_json(&artifacts_dir.join(BUILD_INFO_DIR).join(build_info_file), build_info)?;
    Ok(num_written)
}

fn prefixed_hex(object: &Value) -> String {
    format!("0x{}", object.as_str().unwrap_or_default().trim_start_matches("0x"))
}

fn build_id(input: &Value) -> Result<String, ScriptError> {
    let input_bytes =
        serde_json::to_vec(input).map_err(|e| ScriptError::ContractCompilation(e.to_string()))?;
    Ok(hex::encode(&keccak256(input_bytes)[..16]))
}
