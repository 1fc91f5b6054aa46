//! The deployment plans of the realm contracts: which contract to deploy and
//! the literal constructor arguments to deploy it with

use std::fmt::{self, Display};

use serde_json::{json, Value};

use crate::cli::{BuildingArgs, ContractArgs, GameArgs, ResourceArgs};

/// Identifies a contract by the source file it is defined in and its name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractId {
    /// The path of the source file, relative to the project root
    pub source: &'static str,
    /// The name of the contract within the source file
    pub name: &'static str,
}

impl ContractId {
    /// The fully qualified name, `<source>:<name>`
    pub fn fully_qualified_name(&self) -> String {
        format!("{}:{}", self.source, self.name)
    }
}

impl Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// The Building contract
pub const BUILDING_CONTRACT: ContractId = ContractId {
    source: "contracts/building.sol",
    name: "Building",
};

/// The Game contract
pub const GAME_CONTRACT: ContractId = ContractId {
    source: "contracts/game.sol",
    name: "Game",
};

/// The Resource contract
pub const RESOURCE_CONTRACT: ContractId = ContractId {
    source: "contracts/resource.sol",
    name: "Resource",
};

/// A contract together with the ordered constructor arguments to deploy it with
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentPlan {
    /// The contract to deploy
    pub contract: ContractId,
    /// The constructor arguments, in declaration order
    pub args: Vec<Value>,
}

impl From<ContractArgs> for DeploymentPlan {
    fn from(args: ContractArgs) -> Self {
        match args {
            ContractArgs::Building(args) => args.into(),
            ContractArgs::Game(args) => args.into(),
            ContractArgs::Resource(args) => args.into(),
        }
    }
}

impl From<BuildingArgs> for DeploymentPlan {
    fn from(args: BuildingArgs) -> Self {
        Self {
            contract: BUILDING_CONTRACT,
            args: vec![
                json!(args.name),
                json!(args.symbol),
                json!(args.description),
                json!(args.owner),
                json!(args.input_resources),
                json!(args.output_resources),
                json!(args.allowed_terrain_types),
                json!(args.building_type),
            ],
        }
    }
}

impl From<GameArgs> for DeploymentPlan {
    fn from(args: GameArgs) -> Self {
        Self {
            contract: GAME_CONTRACT,
            args: vec![json!(args.map_width), json!(args.map_height), json!(args.map_name)],
        }
    }
}

impl From<ResourceArgs> for DeploymentPlan {
    fn from(args: ResourceArgs) -> Self {
        Self {
            contract: RESOURCE_CONTRACT,
            args: vec![
                json!(args.map_width),
                json!(args.map_height),
                json!(args.map_length),
                json!(args.map_name),
            ],
        }
    }
}
